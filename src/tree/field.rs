use crate::class_reader::supports;
use crate::tree::annotation::{
    push_annotation, push_type_annotation, AnnotationNode, TypeAnnotationNode,
};
use crate::tree::check_api;
use crate::{
    AnnotationVisitor, Api, Attribute, ClassFileResult, ClassVisitor, FieldAccess, FieldValue,
    FieldVisitor, TypePath, TypeReference,
};
use java_string::{JavaStr, JavaString};

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub access: FieldAccess,
    pub name: JavaString,
    pub desc: JavaString,
    pub signature: Option<JavaString>,
    /// The `ConstantValue` of a static field.
    pub value: Option<FieldValue<'static>>,
    pub visible_annotations: Vec<AnnotationNode>,
    pub invisible_annotations: Vec<AnnotationNode>,
    pub visible_type_annotations: Vec<TypeAnnotationNode>,
    pub invisible_type_annotations: Vec<TypeAnnotationNode>,
    pub attributes: Vec<Box<dyn Attribute>>,
}

impl FieldNode {
    pub fn new(
        access: FieldAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        value: Option<&FieldValue<'_>>,
    ) -> FieldNode {
        FieldNode {
            access,
            name: name.to_owned(),
            desc: desc.to_owned(),
            signature: signature.map(JavaStr::to_owned),
            value: value.map(|value| value.clone().into_owned()),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn accept(&self, cv: &mut dyn ClassVisitor) -> ClassFileResult<()> {
        let Some(mut fv) = cv.visit_field(
            self.access,
            &self.name,
            &self.desc,
            self.signature.as_deref(),
            self.value.as_ref(),
        )?
        else {
            return Ok(());
        };
        let api = fv.api();

        for (annotations, visible) in [
            (&self.visible_annotations, true),
            (&self.invisible_annotations, false),
        ] {
            for annotation in annotations {
                if let Some(mut av) = fv.visit_annotation(&annotation.desc, visible)? {
                    annotation.accept(&mut *av)?;
                }
            }
        }
        if supports(api, Api::V5, "type annotations") {
            for (annotations, visible) in [
                (&self.visible_type_annotations, true),
                (&self.invisible_type_annotations, false),
            ] {
                for annotation in annotations {
                    if let Some(mut av) = fv.visit_type_annotation(
                        annotation.type_ref,
                        &annotation.type_path,
                        &annotation.annotation.desc,
                        visible,
                    )? {
                        annotation.annotation.accept(&mut *av)?;
                    }
                }
            }
        }
        for attribute in &self.attributes {
            fv.visit_attribute(&**attribute)?;
        }
        fv.visit_end()
    }

    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        if !self.visible_type_annotations.is_empty()
            || !self.invisible_type_annotations.is_empty()
        {
            check_api(api, Api::V5, "type annotations")?;
        }
        Ok(())
    }
}

impl FieldVisitor for FieldNode {
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::ClassFileError;
    use std::borrow::Cow;

    #[test]
    fn test_collects_and_checks() {
        let mut node = FieldNode::new(
            FieldAccess::Static | FieldAccess::Final,
            JavaStr::from_str("NAME"),
            JavaStr::from_str("Ljava/lang/String;"),
            None,
            Some(&FieldValue::String(Cow::Borrowed(JavaStr::from_str("x")))),
        );
        node.visit_annotation(JavaStr::from_str("LA;"), false)
            .unwrap()
            .unwrap()
            .visit_end()
            .unwrap();
        assert!(node.check(Api::V4).is_ok());

        node.visit_type_annotation(
            TypeReference::Field,
            &TypePath::default(),
            JavaStr::from_str("LB;"),
            true,
        )
        .unwrap();
        assert_eq!(1, node.invisible_annotations.len());
        assert!(matches!(
            node.check(Api::V4),
            Err(ClassFileError::UnsupportedApi {
                construct: "type annotations",
                ..
            })
        ));
        assert_eq!(
            Some(FieldValue::String(Cow::Owned(JavaString::from("x")))),
            node.value
        );
    }
}
