use crate::adapter::descriptor::{rename_descriptor, rename_signature};
use crate::{
    AnnotationConstant, AnnotationVisitor, Api, BootstrapMethodArgument, ClassAccess,
    ClassFileResult, ClassVersion, ClassVisitor, ConstantDynamic, FieldAccess, FieldValue,
    FieldVisitor, Frame, FrameValue, Handle, InnerClassAccess, Label, LdcConstant,
    LocalVariableRange, MethodAccess, MethodVisitor, Opcode, RecordComponentVisitor, TypePath,
    TypeReference,
};
use java_string::{JavaStr, JavaString};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

/// A mapping from old to new internal class names.
#[derive(Debug, Clone, Default)]
struct Names(HashMap<JavaString, JavaString>);

fn changed<'s>(original: &'s JavaStr, renamed: Option<JavaString>) -> Cow<'s, JavaStr> {
    match renamed {
        Some(renamed) => Cow::Owned(renamed),
        None => Cow::Borrowed(original),
    }
}

impl Names {
    fn lookup(&self, name: &JavaStr) -> Option<JavaString> {
        self.0.get(name).cloned()
    }

    /// An internal name, or an array descriptor where instructions allow one.
    fn class<'s>(&self, name: &'s JavaStr) -> Cow<'s, JavaStr> {
        if name.as_bytes().first() == Some(&b'[') {
            self.desc(name)
        } else {
            changed(name, self.lookup(name))
        }
    }

    fn desc<'s>(&self, desc: &'s JavaStr) -> Cow<'s, JavaStr> {
        changed(desc, rename_descriptor(desc, &mut |name| self.lookup(name)))
    }

    fn signature<'s>(&self, signature: Option<&'s JavaStr>) -> Option<Cow<'s, JavaStr>> {
        let signature = signature?;
        let renamed = rename_signature(signature, &mut |name| self.lookup(name));
        Some(changed(signature, renamed))
    }

    fn handle<'s>(&self, handle: &'s Handle<'_>) -> Handle<'s> {
        Handle {
            kind: handle.kind,
            owner: self.class(&handle.owner),
            name: Cow::Borrowed(&*handle.name),
            desc: self.desc(&handle.desc),
            is_interface: handle.is_interface,
        }
    }

    fn constant<'s>(&self, constant: &'s LdcConstant<'_>) -> LdcConstant<'s> {
        match constant {
            LdcConstant::Integer(value) => LdcConstant::Integer(*value),
            LdcConstant::Float(value) => LdcConstant::Float(*value),
            LdcConstant::Long(value) => LdcConstant::Long(*value),
            LdcConstant::Double(value) => LdcConstant::Double(*value),
            LdcConstant::String(value) => LdcConstant::String(Cow::Borrowed(&**value)),
            LdcConstant::Class(name) => LdcConstant::Class(self.class(name)),
            LdcConstant::MethodType(desc) => LdcConstant::MethodType(self.desc(desc)),
            LdcConstant::Handle(handle) => LdcConstant::Handle(self.handle(handle)),
            LdcConstant::ConstantDynamic(constant) => {
                LdcConstant::ConstantDynamic(self.constant_dynamic(constant))
            }
        }
    }

    fn constant_dynamic<'s>(&self, constant: &'s ConstantDynamic<'_>) -> ConstantDynamic<'s> {
        ConstantDynamic {
            name: Cow::Borrowed(&*constant.name),
            desc: self.desc(&constant.desc),
            bootstrap_method: self.handle(&constant.bootstrap_method),
            bootstrap_method_arguments: self.arguments(&constant.bootstrap_method_arguments),
        }
    }

    fn arguments<'s>(
        &self,
        arguments: &'s [BootstrapMethodArgument<'_>],
    ) -> Vec<BootstrapMethodArgument<'s>> {
        arguments
            .iter()
            .map(|argument| self.constant(argument))
            .collect()
    }

    fn frame_value<'s>(&self, value: &'s FrameValue<'_>) -> FrameValue<'s> {
        match value {
            FrameValue::Class(name) => FrameValue::Class(self.class(name)),
            FrameValue::Top => FrameValue::Top,
            FrameValue::Integer => FrameValue::Integer,
            FrameValue::Float => FrameValue::Float,
            FrameValue::Long => FrameValue::Long,
            FrameValue::Double => FrameValue::Double,
            FrameValue::Null => FrameValue::Null,
            FrameValue::UninitializedThis => FrameValue::UninitializedThis,
            FrameValue::Uninitialized(label) => FrameValue::Uninitialized(*label),
        }
    }

    fn frame_values<'s>(&self, values: &'s [FrameValue<'_>]) -> Vec<FrameValue<'s>> {
        values.iter().map(|value| self.frame_value(value)).collect()
    }

    fn frame<'s>(&self, frame: &'s Frame<'_>) -> Frame<'s> {
        match frame {
            Frame::Same => Frame::Same,
            Frame::Same1(value) => Frame::Same1(self.frame_value(value)),
            Frame::Chop(n) => Frame::Chop(*n),
            Frame::Append(locals) => Frame::Append(self.frame_values(locals)),
            Frame::Full { locals, stack } => Frame::Full {
                locals: self.frame_values(locals),
                stack: self.frame_values(stack),
            },
        }
    }

    fn annotation<'s>(
        &'s self,
        av: Option<Box<dyn AnnotationVisitor + 's>>,
    ) -> Option<Box<dyn AnnotationVisitor + 's>> {
        av.map(|next| {
            Box::new(AnnotationRenamer { next, names: self }) as Box<dyn AnnotationVisitor + 's>
        })
    }
}

/// Renames classes throughout a class: its header, descriptors and signatures, member
/// references, type instructions, constants, frames, try-catch types, local variables and
/// annotation values.
///
/// The names of the members themselves are left alone.
pub struct ClassRenamer<V> {
    next: V,
    names: Names,
}

impl<V> Debug for ClassRenamer<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRenamer")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl<V: ClassVisitor> ClassRenamer<V> {
    pub fn new(
        next: V,
        names: impl IntoIterator<Item = (JavaString, JavaString)>,
    ) -> ClassRenamer<V> {
        ClassRenamer {
            next,
            names: Names(names.into_iter().collect()),
        }
    }

    pub fn into_inner(self) -> V {
        self.next
    }
}

impl<V: ClassVisitor> ClassVisitor for ClassRenamer<V> {
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
        Some(&mut self.next)
    }

    fn visit(
        &mut self,
        version: ClassVersion,
        access: ClassAccess,
        name: &JavaStr,
        signature: Option<&JavaStr>,
        super_name: Option<&JavaStr>,
        interfaces: &[&JavaStr],
    ) -> ClassFileResult<()> {
        let names = &self.names;
        let interfaces: Vec<Cow<'_, JavaStr>> =
            interfaces.iter().map(|&itf| names.class(itf)).collect();
        let interface_refs: Vec<&JavaStr> = interfaces.iter().map(|itf| &**itf).collect();
        self.next.visit(
            version,
            access,
            &names.class(name),
            names.signature(signature).as_deref(),
            super_name.map(|super_name| names.class(super_name)).as_deref(),
            &interface_refs,
        )
    }

    fn visit_nest_host(&mut self, nest_host: &JavaStr) -> ClassFileResult<()> {
        self.next.visit_nest_host(&self.names.class(nest_host))
    }

    fn visit_outer_class(
        &mut self,
        owner: &JavaStr,
        name: Option<&JavaStr>,
        desc: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        let owner = self.names.class(owner);
        let desc = desc.map(|desc| self.names.desc(desc));
        self.next.visit_outer_class(&owner, name, desc.as_deref())
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_annotation(&self.names.desc(desc), visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let desc = self.names.desc(desc);
        let av = self
            .next
            .visit_type_annotation(type_ref, type_path, &desc, visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_nest_member(&mut self, nest_member: &JavaStr) -> ClassFileResult<()> {
        self.next.visit_nest_member(&self.names.class(nest_member))
    }

    fn visit_permitted_subclass(&mut self, permitted_subclass: &JavaStr) -> ClassFileResult<()> {
        let permitted_subclass = self.names.class(permitted_subclass);
        self.next.visit_permitted_subclass(&permitted_subclass)
    }

    fn visit_inner_class(
        &mut self,
        name: &JavaStr,
        outer_name: Option<&JavaStr>,
        inner_name: Option<&JavaStr>,
        access: InnerClassAccess,
    ) -> ClassFileResult<()> {
        let name = self.names.class(name);
        let outer_name = outer_name.map(|outer_name| self.names.class(outer_name));
        self.next
            .visit_inner_class(&name, outer_name.as_deref(), inner_name, access)
    }

    fn visit_record_component(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn RecordComponentVisitor + '_>>> {
        let names = &self.names;
        let next = self.next.visit_record_component(
            name,
            &names.desc(desc),
            names.signature(signature).as_deref(),
        )?;
        Ok(next.map(|next| {
            Box::new(MemberRenamer { next, names }) as Box<dyn RecordComponentVisitor + '_>
        }))
    }

    fn visit_field(
        &mut self,
        access: FieldAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        value: Option<&FieldValue<'_>>,
    ) -> ClassFileResult<Option<Box<dyn FieldVisitor + '_>>> {
        let names = &self.names;
        let next = self.next.visit_field(
            access,
            name,
            &names.desc(desc),
            names.signature(signature).as_deref(),
            value,
        )?;
        Ok(next.map(|next| {
            Box::new(MemberRenamer { next, names }) as Box<dyn FieldVisitor + '_>
        }))
    }

    fn visit_method(
        &mut self,
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
        let names = &self.names;
        let exceptions: Vec<Cow<'_, JavaStr>> =
            exceptions.iter().map(|&e| names.class(e)).collect();
        let exception_refs: Vec<&JavaStr> = exceptions.iter().map(|e| &**e).collect();
        let next = self.next.visit_method(
            access,
            name,
            &names.desc(desc),
            names.signature(signature).as_deref(),
            &exception_refs,
        )?;
        Ok(next.map(|next| {
            Box::new(MethodRenamer { next, names }) as Box<dyn MethodVisitor + '_>
        }))
    }
}

/// Renames the annotations of a field or a record component.
struct MemberRenamer<'a, V: ?Sized> {
    next: Box<V>,
    names: &'a Names,
}

impl<'a> FieldVisitor for MemberRenamer<'a, dyn FieldVisitor + 'a> {
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn FieldVisitor> {
        Some(&mut *self.next)
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_annotation(&self.names.desc(desc), visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let desc = self.names.desc(desc);
        let av = self
            .next
            .visit_type_annotation(type_ref, type_path, &desc, visible)?;
        Ok(self.names.annotation(av))
    }
}

impl<'a> RecordComponentVisitor for MemberRenamer<'a, dyn RecordComponentVisitor + 'a> {
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn RecordComponentVisitor> {
        Some(&mut *self.next)
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_annotation(&self.names.desc(desc), visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let desc = self.names.desc(desc);
        let av = self
            .next
            .visit_type_annotation(type_ref, type_path, &desc, visible)?;
        Ok(self.names.annotation(av))
    }
}

struct AnnotationRenamer<'a> {
    next: Box<dyn AnnotationVisitor + 'a>,
    names: &'a Names,
}

impl AnnotationVisitor for AnnotationRenamer<'_> {
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        Some(&mut *self.next)
    }

    fn visit(
        &mut self,
        name: Option<&JavaStr>,
        value: AnnotationConstant<'_>,
    ) -> ClassFileResult<()> {
        match value {
            AnnotationConstant::Class(desc) => {
                let desc = self.names.desc(desc);
                self.next.visit(name, AnnotationConstant::Class(&desc))
            }
            value => self.next.visit(name, value),
        }
    }

    fn visit_enum(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
        value: &JavaStr,
    ) -> ClassFileResult<()> {
        self.next.visit_enum(name, &self.names.desc(desc), value)
    }

    fn visit_annotation(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_annotation(name, &self.names.desc(desc))?;
        Ok(self.names.annotation(av))
    }

    fn visit_array(
        &mut self,
        name: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_array(name)?;
        Ok(self.names.annotation(av))
    }
}

struct MethodRenamer<'a> {
    next: Box<dyn MethodVisitor + 'a>,
    names: &'a Names,
}

impl MethodVisitor for MethodRenamer<'_> {
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(&mut *self.next)
    }

    fn visit_annotation_default(
        &mut self,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_annotation_default()?;
        Ok(self.names.annotation(av))
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_annotation(&self.names.desc(desc), visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let desc = self.names.desc(desc);
        let av = self
            .next
            .visit_type_annotation(type_ref, type_path, &desc, visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_parameter_annotation(
        &mut self,
        parameter: u8,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self
            .next
            .visit_parameter_annotation(parameter, &self.names.desc(desc), visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_frame(&mut self, frame: &Frame<'_>) -> ClassFileResult<()> {
        self.next.visit_frame(&self.names.frame(frame))
    }

    fn visit_type_insn(&mut self, opcode: Opcode, ty: &JavaStr) -> ClassFileResult<()> {
        self.next.visit_type_insn(opcode, &self.names.class(ty))
    }

    fn visit_field_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
    ) -> ClassFileResult<()> {
        let owner = self.names.class(owner);
        let desc = self.names.desc(desc);
        self.next.visit_field_insn(opcode, &owner, name, &desc)
    }

    fn visit_method_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
        is_interface: bool,
    ) -> ClassFileResult<()> {
        self.next.visit_method_insn(
            opcode,
            &self.names.class(owner),
            name,
            &self.names.desc(desc),
            is_interface,
        )
    }

    fn visit_invoke_dynamic_insn(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        bootstrap_method: &Handle<'_>,
        bootstrap_method_arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<()> {
        self.next.visit_invoke_dynamic_insn(
            name,
            &self.names.desc(desc),
            &self.names.handle(bootstrap_method),
            &self.names.arguments(bootstrap_method_arguments),
        )
    }

    fn visit_ldc_insn(&mut self, constant: &LdcConstant<'_>) -> ClassFileResult<()> {
        self.next.visit_ldc_insn(&self.names.constant(constant))
    }

    fn visit_multi_a_new_array_insn(
        &mut self,
        desc: &JavaStr,
        dimensions: u8,
    ) -> ClassFileResult<()> {
        let desc = self.names.desc(desc);
        self.next.visit_multi_a_new_array_insn(&desc, dimensions)
    }

    fn visit_insn_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let desc = self.names.desc(desc);
        let av = self
            .next
            .visit_insn_annotation(type_ref, type_path, &desc, visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_try_catch_block(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        ty: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        let ty = ty.map(|ty| self.names.class(ty));
        self.next
            .visit_try_catch_block(start, end, handler, ty.as_deref())
    }

    fn visit_try_catch_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let desc = self.names.desc(desc);
        let av = self
            .next
            .visit_try_catch_annotation(type_ref, type_path, &desc, visible)?;
        Ok(self.names.annotation(av))
    }

    fn visit_local_variable(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        start: Label,
        end: Label,
        index: u16,
    ) -> ClassFileResult<()> {
        self.next.visit_local_variable(
            name,
            &self.names.desc(desc),
            self.names.signature(signature).as_deref(),
            start,
            end,
            index,
        )
    }

    fn visit_local_variable_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        ranges: &[LocalVariableRange],
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let av = self.next.visit_local_variable_annotation(
            type_ref,
            type_path,
            ranges,
            &self.names.desc(desc),
            visible,
        )?;
        Ok(self.names.annotation(av))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::{ClassNode, Insn};
    use crate::{ClassReader, ClassWriter, ReaderFlags, WriterFlags};

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    fn mapping() -> Vec<(JavaString, JavaString)> {
        vec![
            (JavaString::from("a/Old"), JavaString::from("b/New")),
            (JavaString::from("a/Base"), JavaString::from("b/Root")),
        ]
    }

    fn source() -> ClassNode {
        let mut node = ClassNode::default();
        node.visit(
            ClassVersion::V1_8,
            ClassAccess::Public | ClassAccess::Super,
            s("a/Old"),
            Some(s("La/Base;Ljava/lang/Comparable<La/Old;>;")),
            Some(s("a/Base")),
            &[s("java/lang/Comparable")],
        )
        .unwrap();
        node.visit_field(FieldAccess::Private, s("next"), s("La/Old;"), None, None)
            .unwrap();
        {
            let mut mv = node
                .visit_method(
                    MethodAccess::Public,
                    s("copy"),
                    s("(La/Base;)[La/Old;"),
                    None,
                    &[],
                )
                .unwrap()
                .unwrap();
            let start = Label::new();
            let end = Label::new();
            mv.visit_code().unwrap();
            mv.visit_try_catch_block(start, end, end, Some(s("a/Old")))
                .unwrap();
            mv.visit_label(start).unwrap();
            mv.visit_type_insn(Opcode::New, s("a/Old")).unwrap();
            mv.visit_ldc_insn(&LdcConstant::Class(Cow::Borrowed(s("[La/Base;"))))
                .unwrap();
            mv.visit_field_insn(Opcode::GetField, s("a/Old"), s("next"), s("La/Old;"))
                .unwrap();
            mv.visit_label(end).unwrap();
            mv.visit_insn(Opcode::AThrow).unwrap();
            mv.visit_local_variable(s("this"), s("La/Old;"), None, start, end, 0)
                .unwrap();
            mv.visit_maxs(3, 2).unwrap();
            mv.visit_end().unwrap();
        }
        node.visit_end().unwrap();
        node
    }

    /// A consumer that only understands the Java 9 protocol.
    #[derive(Debug)]
    struct Java9Consumer;

    impl ClassVisitor for Java9Consumer {
        fn api(&self) -> Api {
            Api::V6
        }

        fn visit_method(
            &mut self,
            _access: MethodAccess,
            _name: &JavaStr,
            _desc: &JavaStr,
            _signature: Option<&JavaStr>,
            _exceptions: &[&JavaStr],
        ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
            Ok(Some(Box::new(Java9Method)))
        }
    }

    struct Java9Method;

    impl MethodVisitor for Java9Method {
        fn api(&self) -> Api {
            Api::V6
        }

        fn visit_annotation(
            &mut self,
            _desc: &JavaStr,
            _visible: bool,
        ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
            Ok(Some(Box::new(Java9Annotation)))
        }
    }

    struct Java9Annotation;

    impl AnnotationVisitor for Java9Annotation {
        fn api(&self) -> Api {
            Api::V6
        }
    }

    #[test]
    fn test_renamers_report_the_consumer_api() {
        let mut renamer = ClassRenamer::new(Java9Consumer, mapping());
        assert_eq!(Api::V6, renamer.api());
        let mut mv = renamer
            .visit_method(MethodAccess::Public, s("m"), s("()V"), None, &[])
            .unwrap()
            .unwrap();
        assert_eq!(Api::V6, mv.api());
        let av = mv.visit_annotation(s("La/Old;"), true).unwrap().unwrap();
        assert_eq!(Api::V6, av.api());
    }

    #[test]
    fn test_renames_references() {
        let mut renamer = ClassRenamer::new(ClassNode::default(), mapping());
        source().accept(&mut renamer).unwrap();
        let node = renamer.into_inner();

        assert_eq!(s("b/New"), &*node.name);
        assert_eq!(Some(JavaString::from("b/Root")), node.super_name);
        assert_eq!(
            Some(JavaString::from("Lb/Root;Ljava/lang/Comparable<Lb/New;>;")),
            node.signature
        );
        assert_eq!(s("Lb/New;"), &*node.fields[0].desc);
        let method = &node.methods[0];
        assert_eq!(s("(Lb/Root;)[Lb/New;"), &*method.desc);
        assert_eq!(
            Some(JavaString::from("b/New")),
            method.try_catch_blocks[0].ty
        );
        assert_eq!(s("Lb/New;"), &*method.local_variables[0].desc);

        let insns: Vec<&Insn> = method.instructions.iter().map(|(_, node)| &node.insn).collect();
        assert!(insns.contains(&&Insn::Type {
            opcode: Opcode::New,
            ty: JavaString::from("b/New"),
        }));
        assert!(insns.contains(&&Insn::Ldc(LdcConstant::Class(Cow::Owned(JavaString::from(
            "[Lb/Root;"
        ))))));
        assert!(insns.contains(&&Insn::Field {
            opcode: Opcode::GetField,
            owner: JavaString::from("b/New"),
            name: JavaString::from("next"),
            desc: JavaString::from("Lb/New;"),
        }));
    }

    #[test]
    fn test_renamed_class_encodes() {
        let mut renamer = ClassRenamer::new(ClassWriter::new(WriterFlags::empty()), mapping());
        source().accept(&mut renamer).unwrap();
        let bytes = renamer.into_inner().to_bytes().unwrap();
        let reader = ClassReader::new(&bytes).unwrap();
        assert_eq!(s("b/New"), &*reader.name().unwrap());
        let mut node = ClassNode::default();
        reader.accept(&mut node, ReaderFlags::empty()).unwrap();
        assert_eq!(s("(Lb/Root;)[Lb/New;"), &*node.methods[0].desc);
    }
}
