use crate::class_reader::supports;
use crate::tree::annotation::{
    push_annotation, push_type_annotation, AnnotationNode, TypeAnnotationNode,
};
use crate::tree::{check_api, FieldNode, MethodNode, ModuleNode, RecordComponentNode};
use crate::{
    AnnotationVisitor, Api, Attribute, ClassAccess, ClassFileResult, ClassReader, ClassVersion,
    ClassVisitor, ClassWriter, FieldAccess, FieldValue, FieldVisitor, InnerClassAccess,
    MethodAccess, MethodVisitor, ModuleAccess, ModuleVisitor, ReaderFlags, RecordComponentVisitor,
    TypePath, TypeReference, WriterFlags,
};
use java_string::{JavaStr, JavaString};

/// An entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassNode {
    pub name: JavaString,
    pub outer_name: Option<JavaString>,
    pub inner_name: Option<JavaString>,
    pub access: InnerClassAccess,
}

/// A whole class. Visiting a class into a `ClassNode` and accepting it back produces the same
/// events again, in canonical order.
#[derive(Debug, Clone)]
pub struct ClassNode {
    pub version: ClassVersion,
    pub access: ClassAccess,
    pub name: JavaString,
    pub signature: Option<JavaString>,
    pub super_name: Option<JavaString>,
    pub interfaces: Vec<JavaString>,
    pub source_file: Option<JavaString>,
    pub source_debug: Option<JavaString>,
    pub module: Option<ModuleNode>,
    pub nest_host: Option<JavaString>,
    pub outer_class: Option<JavaString>,
    pub outer_method: Option<JavaString>,
    pub outer_method_desc: Option<JavaString>,
    pub visible_annotations: Vec<AnnotationNode>,
    pub invisible_annotations: Vec<AnnotationNode>,
    pub visible_type_annotations: Vec<TypeAnnotationNode>,
    pub invisible_type_annotations: Vec<TypeAnnotationNode>,
    pub attributes: Vec<Box<dyn Attribute>>,
    pub nest_members: Vec<JavaString>,
    pub permitted_subclasses: Vec<JavaString>,
    pub inner_classes: Vec<InnerClassNode>,
    pub record_components: Vec<RecordComponentNode>,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
}

impl Default for ClassNode {
    fn default() -> ClassNode {
        ClassNode {
            version: ClassVersion::V1_8,
            access: ClassAccess::empty(),
            name: JavaString::new(),
            signature: None,
            super_name: None,
            interfaces: Vec::new(),
            source_file: None,
            source_debug: None,
            module: None,
            nest_host: None,
            outer_class: None,
            outer_method: None,
            outer_method_desc: None,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
            attributes: Vec::new(),
            nest_members: Vec::new(),
            permitted_subclasses: Vec::new(),
            inner_classes: Vec::new(),
            record_components: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }
}

impl ClassNode {
    pub fn from_bytes(bytes: &[u8], flags: ReaderFlags) -> ClassFileResult<ClassNode> {
        let mut node = ClassNode::default();
        ClassReader::new(bytes)?.accept(&mut node, flags)?;
        Ok(node)
    }

    pub fn to_bytes(&self, flags: WriterFlags) -> ClassFileResult<Vec<u8>> {
        let mut writer = ClassWriter::new(flags);
        self.accept(&mut writer)?;
        writer.to_bytes()
    }

    /// Replays the class into `cv`, dropping constructs its [`Api`] doesn't support.
    ///
    /// Use [`check`](ClassNode::check) first to fail instead.
    pub fn accept(&self, cv: &mut dyn ClassVisitor) -> ClassFileResult<()> {
        let api = cv.api();
        let interfaces: Vec<&JavaStr> = self.interfaces.iter().map(|itf| &**itf).collect();
        cv.visit(
            self.version,
            self.access,
            &self.name,
            self.signature.as_deref(),
            self.super_name.as_deref(),
            &interfaces,
        )?;

        if self.source_file.is_some() || self.source_debug.is_some() {
            cv.visit_source(self.source_file.as_deref(), self.source_debug.as_deref())?;
        }
        if let Some(module) = &self.module {
            if supports(api, Api::V6, "module") {
                module.accept(cv)?;
            }
        }
        if let Some(nest_host) = &self.nest_host {
            if supports(api, Api::V7, "nest host") {
                cv.visit_nest_host(nest_host)?;
            }
        }
        if let Some(outer_class) = &self.outer_class {
            cv.visit_outer_class(
                outer_class,
                self.outer_method.as_deref(),
                self.outer_method_desc.as_deref(),
            )?;
        }

        for (annotations, visible) in [
            (&self.visible_annotations, true),
            (&self.invisible_annotations, false),
        ] {
            for annotation in annotations {
                if let Some(mut av) = cv.visit_annotation(&annotation.desc, visible)? {
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
                    if let Some(mut av) = cv.visit_type_annotation(
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
            cv.visit_attribute(&**attribute)?;
        }

        if !self.nest_members.is_empty() && supports(api, Api::V7, "nest members") {
            for member in &self.nest_members {
                cv.visit_nest_member(member)?;
            }
        }
        if !self.permitted_subclasses.is_empty() && supports(api, Api::V9, "permitted subclasses") {
            for subclass in &self.permitted_subclasses {
                cv.visit_permitted_subclass(subclass)?;
            }
        }
        for inner_class in &self.inner_classes {
            cv.visit_inner_class(
                &inner_class.name,
                inner_class.outer_name.as_deref(),
                inner_class.inner_name.as_deref(),
                inner_class.access,
            )?;
        }
        for component in &self.record_components {
            component.accept(cv)?;
        }
        for field in &self.fields {
            field.accept(cv)?;
        }
        for method in &self.methods {
            method.accept(cv)?;
        }
        cv.visit_end()
    }

    /// Fails with the first construct, in visiting order, that `api` doesn't support.
    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        if let Some(module) = &self.module {
            module.check(api)?;
        }
        if self.nest_host.is_some() {
            check_api(api, Api::V7, "nest host")?;
        }
        if !self.visible_type_annotations.is_empty()
            || !self.invisible_type_annotations.is_empty()
        {
            check_api(api, Api::V5, "type annotations")?;
        }
        if !self.nest_members.is_empty() {
            check_api(api, Api::V7, "nest members")?;
        }
        if !self.permitted_subclasses.is_empty() {
            check_api(api, Api::V9, "permitted subclasses")?;
        }
        for component in &self.record_components {
            component.check(api)?;
        }
        for field in &self.fields {
            field.check(api)?;
        }
        for method in &self.methods {
            method.check(api)?;
        }
        Ok(())
    }
}

impl ClassVisitor for ClassNode {
    fn visit(
        &mut self,
        version: ClassVersion,
        access: ClassAccess,
        name: &JavaStr,
        signature: Option<&JavaStr>,
        super_name: Option<&JavaStr>,
        interfaces: &[&JavaStr],
    ) -> ClassFileResult<()> {
        self.version = version;
        self.access = access;
        self.name = name.to_owned();
        self.signature = signature.map(JavaStr::to_owned);
        self.super_name = super_name.map(JavaStr::to_owned);
        self.interfaces = interfaces.iter().map(|&itf| itf.to_owned()).collect();
        Ok(())
    }

    fn visit_source(
        &mut self,
        source: Option<&JavaStr>,
        debug: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        self.source_file = source.map(JavaStr::to_owned);
        self.source_debug = debug.map(JavaStr::to_owned);
        Ok(())
    }

    fn visit_module(
        &mut self,
        name: &JavaStr,
        access: ModuleAccess,
        version: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn ModuleVisitor + '_>>> {
        let module = self.module.insert(ModuleNode::new(name, access, version));
        Ok(Some(Box::new(module)))
    }

    fn visit_nest_host(&mut self, nest_host: &JavaStr) -> ClassFileResult<()> {
        self.nest_host = Some(nest_host.to_owned());
        Ok(())
    }

    fn visit_outer_class(
        &mut self,
        owner: &JavaStr,
        name: Option<&JavaStr>,
        desc: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        self.outer_class = Some(owner.to_owned());
        self.outer_method = name.map(JavaStr::to_owned);
        self.outer_method_desc = desc.map(JavaStr::to_owned);
        Ok(())
    }

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

    fn visit_nest_member(&mut self, nest_member: &JavaStr) -> ClassFileResult<()> {
        self.nest_members.push(nest_member.to_owned());
        Ok(())
    }

    fn visit_permitted_subclass(&mut self, permitted_subclass: &JavaStr) -> ClassFileResult<()> {
        self.permitted_subclasses.push(permitted_subclass.to_owned());
        Ok(())
    }

    fn visit_inner_class(
        &mut self,
        name: &JavaStr,
        outer_name: Option<&JavaStr>,
        inner_name: Option<&JavaStr>,
        access: InnerClassAccess,
    ) -> ClassFileResult<()> {
        self.inner_classes.push(InnerClassNode {
            name: name.to_owned(),
            outer_name: outer_name.map(JavaStr::to_owned),
            inner_name: inner_name.map(JavaStr::to_owned),
            access,
        });
        Ok(())
    }

    fn visit_record_component(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn RecordComponentVisitor + '_>>> {
        let index = self.record_components.len();
        self.record_components
            .push(RecordComponentNode::new(name, desc, signature));
        Ok(Some(Box::new(&mut self.record_components[index])))
    }

    fn visit_field(
        &mut self,
        access: FieldAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        value: Option<&FieldValue<'_>>,
    ) -> ClassFileResult<Option<Box<dyn FieldVisitor + '_>>> {
        let index = self.fields.len();
        self.fields
            .push(FieldNode::new(access, name, desc, signature, value));
        Ok(Some(Box::new(&mut self.fields[index])))
    }

    fn visit_method(
        &mut self,
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
        let index = self.methods.len();
        self.methods
            .push(MethodNode::new(access, name, desc, signature, exceptions));
        Ok(Some(Box::new(&mut self.methods[index])))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Label, Opcode};

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    fn sample() -> ClassNode {
        let mut node = ClassNode::default();
        node.visit(
            ClassVersion::V17,
            ClassAccess::Public | ClassAccess::Super,
            s("a/Sample"),
            None,
            Some(s("java/lang/Object")),
            &[s("java/lang/Runnable")],
        )
        .unwrap();
        node.visit_source(Some(s("Sample.java")), None).unwrap();
        {
            let mut mv = node
                .visit_method(MethodAccess::Public, s("run"), s("()V"), None, &[])
                .unwrap()
                .unwrap();
            let start = Label::new();
            mv.visit_code().unwrap();
            mv.visit_label(start).unwrap();
            mv.visit_line_number(7, start).unwrap();
            mv.visit_insn(Opcode::Return).unwrap();
            mv.visit_maxs(0, 1).unwrap();
            mv.visit_end().unwrap();
        }
        node.visit_end().unwrap();
        node
    }

    #[test]
    fn test_bytes_round_trip() {
        let node = sample();
        let bytes = node.to_bytes(WriterFlags::empty()).unwrap();
        let read = ClassNode::from_bytes(&bytes, ReaderFlags::empty()).unwrap();
        assert_eq!(node.name, read.name);
        assert_eq!(node.interfaces, read.interfaces);
        assert_eq!(node.source_file, read.source_file);
        assert_eq!(1, read.methods.len());
        let opcodes = |method: &MethodNode| {
            method
                .instructions
                .iter()
                .map(|(_, insn)| insn.opcode())
                .collect::<Vec<_>>()
        };
        assert_eq!(opcodes(&node.methods[0]), opcodes(&read.methods[0]));
        assert_eq!(bytes, read.to_bytes(WriterFlags::empty()).unwrap());
    }

    #[test]
    fn test_check_fails_on_first_unsupported_construct() {
        let mut node = sample();
        assert!(node.check(Api::V4).is_ok());

        node.visit_nest_host(s("a/Host")).unwrap();
        node.visit_permitted_subclass(s("a/Sub")).unwrap();
        match node.check(Api::V6) {
            Err(crate::ClassFileError::UnsupportedApi {
                construct, required, ..
            }) => {
                assert_eq!("nest host", construct);
                assert_eq!(Api::V7, required);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(node.check(Api::V8).is_err());
        assert!(node.check(Api::V9).is_ok());
    }

    #[test]
    fn test_accept_drops_what_the_visitor_cannot_take() {
        struct Old(ClassNode);

        impl ClassVisitor for Old {
            fn api(&self) -> Api {
                Api::V6
            }

            fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
                Some(&mut self.0)
            }
        }

        let mut node = sample();
        node.visit_nest_member(s("a/Sample$Inner")).unwrap();
        let mut old = Old(ClassNode::default());
        node.accept(&mut old).unwrap();
        assert!(old.0.nest_members.is_empty());
        assert_eq!(node.methods.len(), old.0.methods.len());
    }
}
