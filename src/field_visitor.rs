use crate::{AnnotationVisitor, Api, Attribute, ClassFileResult, TypePath, TypeReference};
use java_string::JavaStr;

pub trait FieldVisitor {
    fn api(&self) -> Api {
        Api::LATEST
    }

    fn delegate(&mut self) -> Option<&mut dyn FieldVisitor> {
        None
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_annotation(desc, visible))
    }

    /// Requires [`Api::V5`].
    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_type_annotation(
            type_ref,
            type_path,
            desc,
            visible
        ))
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        forward!(self.visit_attribute(attribute))
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        forward!(self.visit_end())
    }
}

impl<V: FieldVisitor> FieldVisitor for &mut V {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn FieldVisitor> {
        Some(&mut **self)
    }
}

impl<'a> FieldVisitor for Box<dyn FieldVisitor + 'a> {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn FieldVisitor> {
        Some(&mut **self)
    }
}
