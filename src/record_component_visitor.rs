use crate::{AnnotationVisitor, Api, Attribute, ClassFileResult, TypePath, TypeReference};
use java_string::JavaStr;

pub trait RecordComponentVisitor {
    fn api(&self) -> Api {
        Api::LATEST
    }

    fn delegate(&mut self) -> Option<&mut dyn RecordComponentVisitor> {
        None
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_annotation(desc, visible))
    }

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

impl<V: RecordComponentVisitor> RecordComponentVisitor for &mut V {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn RecordComponentVisitor> {
        Some(&mut **self)
    }
}

impl<'a> RecordComponentVisitor for Box<dyn RecordComponentVisitor + 'a> {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn RecordComponentVisitor> {
        Some(&mut **self)
    }
}
