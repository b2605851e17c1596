use crate::class_reader::supports;
use crate::tree::annotation::{
    push_annotation, push_type_annotation, AnnotationNode, TypeAnnotationNode,
};
use crate::tree::check_api;
use crate::{
    AnnotationVisitor, Api, Attribute, ClassFileResult, ClassVisitor, RecordComponentVisitor,
    TypePath, TypeReference,
};
use java_string::{JavaStr, JavaString};

#[derive(Debug, Clone)]
pub struct RecordComponentNode {
    pub name: JavaString,
    pub desc: JavaString,
    pub signature: Option<JavaString>,
    pub visible_annotations: Vec<AnnotationNode>,
    pub invisible_annotations: Vec<AnnotationNode>,
    pub visible_type_annotations: Vec<TypeAnnotationNode>,
    pub invisible_type_annotations: Vec<TypeAnnotationNode>,
    pub attributes: Vec<Box<dyn Attribute>>,
}

impl RecordComponentNode {
    pub fn new(name: &JavaStr, desc: &JavaStr, signature: Option<&JavaStr>) -> RecordComponentNode {
        RecordComponentNode {
            name: name.to_owned(),
            desc: desc.to_owned(),
            signature: signature.map(JavaStr::to_owned),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Visits the component on `cv`. Record components need [`Api::V8`].
    pub fn accept(&self, cv: &mut dyn ClassVisitor) -> ClassFileResult<()> {
        if !supports(cv.api(), Api::V8, "record components") {
            return Ok(());
        }
        let signature = self.signature.as_deref();
        let Some(mut rv) = cv.visit_record_component(&self.name, &self.desc, signature)? else {
            return Ok(());
        };
        for (annotations, visible) in [
            (&self.visible_annotations, true),
            (&self.invisible_annotations, false),
        ] {
            for annotation in annotations {
                if let Some(mut av) = rv.visit_annotation(&annotation.desc, visible)? {
                    annotation.accept(&mut *av)?;
                }
            }
        }
        for (annotations, visible) in [
            (&self.visible_type_annotations, true),
            (&self.invisible_type_annotations, false),
        ] {
            for annotation in annotations {
                if let Some(mut av) = rv.visit_type_annotation(
                    annotation.type_ref,
                    &annotation.type_path,
                    &annotation.annotation.desc,
                    visible,
                )? {
                    annotation.annotation.accept(&mut *av)?;
                }
            }
        }
        for attribute in &self.attributes {
            rv.visit_attribute(&**attribute)?;
        }
        rv.visit_end()
    }

    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        check_api(api, Api::V8, "record components")
    }
}

impl RecordComponentVisitor for RecordComponentNode {
    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let list = if visible {
            &mut self.visible_annotations
        } else {
            &mut self.invisible_annotations
        };
        Ok(Some(push_annotation(list, desc)))
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let list = if visible {
            &mut self.visible_type_annotations
        } else {
            &mut self.invisible_type_annotations
        };
        Ok(Some(push_type_annotation(list, type_ref, type_path, desc)))
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        self.attributes.push(attribute.copy());
        Ok(())
    }
}
