use crate::class_reader::supports;
use crate::tree::annotation::{
    accept_value, push_annotation, push_type_annotation, AnnotationNode, AnnotationValue,
    LocalVariableAnnotationNode, TypeAnnotationNode, ValueSink,
};
use crate::tree::{check_api, Insn, InsnList, InsnNode};
use crate::{
    AnnotationVisitor, Api, Attribute, BootstrapMethodArgument, ClassFileResult, ClassVisitor,
    Frame, Handle, IntInsn, Label, LdcConstant, LocalVariableRange, MethodAccess, MethodVisitor,
    Opcode, ParameterAccess, TypePath, TypeReference,
};
use java_string::{JavaStr, JavaString};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterNode {
    pub name: Option<JavaString>,
    pub access: ParameterAccess,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchBlockNode {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// `None` catches everything.
    pub ty: Option<JavaString>,
    pub visible_type_annotations: Vec<TypeAnnotationNode>,
    pub invisible_type_annotations: Vec<TypeAnnotationNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableNode {
    pub name: JavaString,
    pub desc: JavaString,
    pub signature: Option<JavaString>,
    pub start: Label,
    pub end: Label,
    pub index: u16,
}

/// A method, with its code as an [`InsnList`].
///
/// A method has code if its instruction list is not empty. `max_stack` and `max_locals` are
/// whatever was last visited; see [`compute_maxs`](crate::adapter::compute_maxs) to derive them.
#[derive(Debug, Clone)]
pub struct MethodNode {
    pub access: MethodAccess,
    pub name: JavaString,
    pub desc: JavaString,
    pub signature: Option<JavaString>,
    pub exceptions: Vec<JavaString>,
    pub parameters: Vec<ParameterNode>,
    pub annotation_default: Option<AnnotationValue>,
    pub visible_annotations: Vec<AnnotationNode>,
    pub invisible_annotations: Vec<AnnotationNode>,
    pub visible_type_annotations: Vec<TypeAnnotationNode>,
    pub invisible_type_annotations: Vec<TypeAnnotationNode>,
    pub visible_annotable_parameter_count: Option<u8>,
    pub visible_parameter_annotations: Vec<Vec<AnnotationNode>>,
    pub invisible_annotable_parameter_count: Option<u8>,
    pub invisible_parameter_annotations: Vec<Vec<AnnotationNode>>,
    pub attributes: Vec<Box<dyn Attribute>>,
    pub instructions: InsnList,
    pub try_catch_blocks: Vec<TryCatchBlockNode>,
    pub local_variables: Vec<LocalVariableNode>,
    pub visible_local_variable_annotations: Vec<LocalVariableAnnotationNode>,
    pub invisible_local_variable_annotations: Vec<LocalVariableAnnotationNode>,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl MethodNode {
    pub fn new(
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> MethodNode {
        MethodNode {
            access,
            name: name.to_owned(),
            desc: desc.to_owned(),
            signature: signature.map(JavaStr::to_owned),
            exceptions: exceptions.iter().map(|&e| e.to_owned()).collect(),
            parameters: Vec::new(),
            annotation_default: None,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
            visible_annotable_parameter_count: None,
            visible_parameter_annotations: Vec::new(),
            invisible_annotable_parameter_count: None,
            invisible_parameter_annotations: Vec::new(),
            attributes: Vec::new(),
            instructions: InsnList::new(),
            try_catch_blocks: Vec::new(),
            local_variables: Vec::new(),
            visible_local_variable_annotations: Vec::new(),
            invisible_local_variable_annotations: Vec::new(),
            max_stack: 0,
            max_locals: 0,
        }
    }

    pub fn has_code(&self) -> bool {
        !self.instructions.is_empty()
    }

    /// Visits the method on `cv` and replays its contents into the returned visitor.
    pub fn accept(&self, cv: &mut dyn ClassVisitor) -> ClassFileResult<()> {
        let exceptions: Vec<&JavaStr> = self.exceptions.iter().map(|e| &**e).collect();
        if let Some(mut mv) = cv.visit_method(
            self.access,
            &self.name,
            &self.desc,
            self.signature.as_deref(),
            &exceptions,
        )? {
            self.accept_method(&mut *mv)?;
        }
        Ok(())
    }

    /// Replays the contents of the method, from the parameters to `visit_end`.
    pub fn accept_method(&self, mv: &mut dyn MethodVisitor) -> ClassFileResult<()> {
        let api = mv.api();
        if !self.parameters.is_empty() && supports(api, Api::V5, "parameters") {
            for parameter in &self.parameters {
                mv.visit_parameter(parameter.name.as_deref(), parameter.access)?;
            }
        }

        if let Some(value) = &self.annotation_default {
            if let Some(mut av) = mv.visit_annotation_default()? {
                accept_value(&mut *av, None, value)?;
                av.visit_end()?;
            }
        }
        for (annotations, visible) in [
            (&self.visible_annotations, true),
            (&self.invisible_annotations, false),
        ] {
            for annotation in annotations {
                if let Some(mut av) = mv.visit_annotation(&annotation.desc, visible)? {
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
                    if let Some(mut av) = mv.visit_type_annotation(
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
        for (count, parameters, visible) in [
            (
                self.visible_annotable_parameter_count,
                &self.visible_parameter_annotations,
                true,
            ),
            (
                self.invisible_annotable_parameter_count,
                &self.invisible_parameter_annotations,
                false,
            ),
        ] {
            if let Some(count) = count {
                mv.visit_annotable_parameter_count(count, visible)?;
            }
            for (parameter, annotations) in parameters.iter().enumerate() {
                for annotation in annotations {
                    if let Some(mut av) =
                        mv.visit_parameter_annotation(parameter as u8, &annotation.desc, visible)?
                    {
                        annotation.accept(&mut *av)?;
                    }
                }
            }
        }
        for attribute in self.attributes.iter().filter(|a| !a.is_code_attribute()) {
            mv.visit_attribute(&**attribute)?;
        }

        if self.has_code() {
            mv.visit_code()?;
            self.accept_code(mv, api)?;
            mv.visit_maxs(self.max_stack, self.max_locals)?;
        }
        mv.visit_end()
    }

    fn accept_code(&self, mv: &mut dyn MethodVisitor, api: Api) -> ClassFileResult<()> {
        let annotations = supports(api, Api::V5, "code type annotations");
        for block in &self.try_catch_blocks {
            mv.visit_try_catch_block(block.start, block.end, block.handler, block.ty.as_deref())?;
        }
        if annotations {
            for block in &self.try_catch_blocks {
                for (list, visible) in [
                    (&block.visible_type_annotations, true),
                    (&block.invisible_type_annotations, false),
                ] {
                    for annotation in list {
                        if let Some(mut av) = mv.visit_try_catch_annotation(
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
        }

        self.instructions.accept(mv)?;

        for variable in &self.local_variables {
            mv.visit_local_variable(
                &variable.name,
                &variable.desc,
                variable.signature.as_deref(),
                variable.start,
                variable.end,
                variable.index,
            )?;
        }
        if annotations {
            for (list, visible) in [
                (&self.visible_local_variable_annotations, true),
                (&self.invisible_local_variable_annotations, false),
            ] {
                for annotation in list {
                    if let Some(mut av) = mv.visit_local_variable_annotation(
                        annotation.type_ref,
                        &annotation.type_path,
                        &annotation.ranges,
                        &annotation.annotation.desc,
                        visible,
                    )? {
                        annotation.annotation.accept(&mut *av)?;
                    }
                }
            }
        }
        for attribute in self.attributes.iter().filter(|a| a.is_code_attribute()) {
            mv.visit_attribute(&**attribute)?;
        }
        Ok(())
    }

    /// Fails with the first construct that `api` doesn't support.
    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        if !self.parameters.is_empty() {
            check_api(api, Api::V5, "parameters")?;
        }
        let type_annotated = !self.visible_type_annotations.is_empty()
            || !self.invisible_type_annotations.is_empty()
            || !self.visible_local_variable_annotations.is_empty()
            || !self.invisible_local_variable_annotations.is_empty()
            || self.try_catch_blocks.iter().any(|block| {
                !block.visible_type_annotations.is_empty()
                    || !block.invisible_type_annotations.is_empty()
            });
        if type_annotated {
            check_api(api, Api::V5, "type annotations")?;
        }
        self.instructions.check(api)
    }

    fn parameter_annotations(&mut self, visible: bool) -> &mut Vec<Vec<AnnotationNode>> {
        if visible {
            &mut self.visible_parameter_annotations
        } else {
            &mut self.invisible_parameter_annotations
        }
    }

    /// The instruction an annotation visited now applies to: the last real instruction.
    fn last_insn(&mut self) -> Option<&mut InsnNode> {
        let (id, _) = self
            .instructions
            .iter()
            .rev()
            .find(|(_, node)| node.insn.is_real())?;
        Some(&mut self.instructions[id])
    }

    fn add_insn(&mut self, insn: Insn) -> ClassFileResult<()> {
        self.instructions.add(insn);
        Ok(())
    }
}

impl MethodVisitor for MethodNode {
    fn visit_parameter(
        &mut self,
        name: Option<&JavaStr>,
        access: ParameterAccess,
    ) -> ClassFileResult<()> {
        self.parameters.push(ParameterNode {
            name: name.map(JavaStr::to_owned),
            access,
        });
        Ok(())
    }

    fn visit_annotation_default(
        &mut self,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let sink = ValueSink::Single(&mut self.annotation_default);
        Ok(Some(Box::new(sink)))
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

    fn visit_annotable_parameter_count(
        &mut self,
        parameter_count: u8,
        visible: bool,
    ) -> ClassFileResult<()> {
        if visible {
            self.visible_annotable_parameter_count = Some(parameter_count);
        } else {
            self.invisible_annotable_parameter_count = Some(parameter_count);
        }
        Ok(())
    }

    fn visit_parameter_annotation(
        &mut self,
        parameter: u8,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let parameters = self.parameter_annotations(visible);
        let index = parameter as usize;
        if parameters.len() <= index {
            parameters.resize_with(index + 1, Vec::new);
        }
        Ok(Some(push_annotation(&mut parameters[index], desc)))
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        self.attributes.push(attribute.copy());
        Ok(())
    }

    fn visit_frame(&mut self, frame: &Frame<'_>) -> ClassFileResult<()> {
        self.add_insn(Insn::Frame(frame.clone().into_owned()))
    }

    fn visit_insn(&mut self, opcode: Opcode) -> ClassFileResult<()> {
        self.add_insn(Insn::Simple(opcode))
    }

    fn visit_int_insn(&mut self, insn: IntInsn) -> ClassFileResult<()> {
        self.add_insn(Insn::Int(insn))
    }

    fn visit_var_insn(&mut self, opcode: Opcode, var_index: u16) -> ClassFileResult<()> {
        self.add_insn(Insn::Var { opcode, var_index })
    }

    fn visit_type_insn(&mut self, opcode: Opcode, ty: &JavaStr) -> ClassFileResult<()> {
        self.add_insn(Insn::Type {
            opcode,
            ty: ty.to_owned(),
        })
    }

    fn visit_field_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
    ) -> ClassFileResult<()> {
        self.add_insn(Insn::Field {
            opcode,
            owner: owner.to_owned(),
            name: name.to_owned(),
            desc: desc.to_owned(),
        })
    }

    fn visit_method_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
        is_interface: bool,
    ) -> ClassFileResult<()> {
        self.add_insn(Insn::Method {
            opcode,
            owner: owner.to_owned(),
            name: name.to_owned(),
            desc: desc.to_owned(),
            is_interface,
        })
    }

    fn visit_invoke_dynamic_insn(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        bootstrap_method: &Handle<'_>,
        bootstrap_method_arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<()> {
        self.add_insn(Insn::InvokeDynamic {
            name: name.to_owned(),
            desc: desc.to_owned(),
            bootstrap_method: bootstrap_method.clone().into_owned(),
            bootstrap_method_arguments: bootstrap_method_arguments
                .iter()
                .map(|argument| argument.clone().into_owned())
                .collect(),
        })
    }

    fn visit_jump_insn(&mut self, opcode: Opcode, label: Label) -> ClassFileResult<()> {
        self.add_insn(Insn::Jump { opcode, label })
    }

    fn visit_label(&mut self, label: Label) -> ClassFileResult<()> {
        self.add_insn(Insn::Label(label))
    }

    fn visit_ldc_insn(&mut self, constant: &LdcConstant<'_>) -> ClassFileResult<()> {
        self.add_insn(Insn::Ldc(constant.clone().into_owned()))
    }

    fn visit_iinc_insn(&mut self, var_index: u16, increment: i16) -> ClassFileResult<()> {
        self.add_insn(Insn::Iinc {
            var_index,
            increment,
        })
    }

    fn visit_table_switch_insn(
        &mut self,
        low: i32,
        high: i32,
        dflt: Label,
        labels: &[Label],
    ) -> ClassFileResult<()> {
        self.add_insn(Insn::TableSwitch {
            low,
            high,
            dflt,
            labels: labels.to_vec(),
        })
    }

    fn visit_lookup_switch_insn(
        &mut self,
        dflt: Label,
        values: &[(i32, Label)],
    ) -> ClassFileResult<()> {
        self.add_insn(Insn::LookupSwitch {
            dflt,
            values: values.to_vec(),
        })
    }

    fn visit_multi_a_new_array_insn(
        &mut self,
        desc: &JavaStr,
        dimensions: u8,
    ) -> ClassFileResult<()> {
        self.add_insn(Insn::MultiANewArray {
            desc: desc.to_owned(),
            dimensions,
        })
    }

    fn visit_insn_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        match self.last_insn() {
            Some(insn) => Ok(Some(insn.annotate(type_ref, type_path, desc, visible))),
            None => {
                log::debug!(
                    "dropping instruction annotation {desc:?} with no instruction before it"
                );
                Ok(None)
            }
        }
    }

    fn visit_try_catch_block(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        ty: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        self.try_catch_blocks.push(TryCatchBlockNode {
            start,
            end,
            handler,
            ty: ty.map(JavaStr::to_owned),
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
        });
        Ok(())
    }

    fn visit_try_catch_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let index = match type_ref {
            TypeReference::ExceptionParameter { exception_index } => exception_index as usize,
            _ => self.try_catch_blocks.len().saturating_sub(1),
        };
        let Some(block) = self.try_catch_blocks.get_mut(index) else {
            log::debug!(
                "dropping annotation {desc:?} on missing exception handler {index}"
            );
            return Ok(None);
        };
        let list = if visible {
            &mut block.visible_type_annotations
        } else {
            &mut block.invisible_type_annotations
        };
        Ok(Some(push_type_annotation(list, type_ref, type_path, desc)))
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
        self.local_variables.push(LocalVariableNode {
            name: name.to_owned(),
            desc: desc.to_owned(),
            signature: signature.map(JavaStr::to_owned),
            start,
            end,
            index,
        });
        Ok(())
    }

    fn visit_local_variable_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        ranges: &[LocalVariableRange],
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let list = if visible {
            &mut self.visible_local_variable_annotations
        } else {
            &mut self.invisible_local_variable_annotations
        };
        let index = list.len();
        list.push(LocalVariableAnnotationNode {
            type_ref,
            type_path: type_path.clone().into_owned(),
            ranges: ranges.to_vec(),
            annotation: AnnotationNode::new(desc),
        });
        Ok(Some(Box::new(&mut list[index])))
    }

    fn visit_line_number(&mut self, line: u16, start: Label) -> ClassFileResult<()> {
        self.add_insn(Insn::LineNumber { line, start })
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> ClassFileResult<()> {
        self.max_stack = max_stack;
        self.max_locals = max_locals;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ClassFileError;

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    fn sample() -> MethodNode {
        let mut node = MethodNode::new(MethodAccess::Static, s("m"), s("(I)I"), None, &[]);
        let start = Label::new();
        let end = Label::new();
        node.visit_code().unwrap();
        node.visit_label(start).unwrap();
        node.visit_line_number(3, start).unwrap();
        node.visit_var_insn(Opcode::ILoad, 0).unwrap();
        node.visit_insn(Opcode::IReturn).unwrap();
        node.visit_label(end).unwrap();
        node.visit_local_variable(s("x"), s("I"), None, start, end, 0)
            .unwrap();
        node.visit_maxs(1, 1).unwrap();
        node.visit_end().unwrap();
        node
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl MethodVisitor for Recorder {
        fn visit_code(&mut self) -> ClassFileResult<()> {
            self.0.push("code".into());
            Ok(())
        }

        fn visit_label(&mut self, _label: Label) -> ClassFileResult<()> {
            self.0.push("label".into());
            Ok(())
        }

        fn visit_line_number(&mut self, line: u16, _start: Label) -> ClassFileResult<()> {
            self.0.push(format!("line {line}"));
            Ok(())
        }

        fn visit_var_insn(&mut self, opcode: Opcode, var_index: u16) -> ClassFileResult<()> {
            self.0.push(format!("{opcode} {var_index}"));
            Ok(())
        }

        fn visit_insn(&mut self, opcode: Opcode) -> ClassFileResult<()> {
            self.0.push(opcode.to_string());
            Ok(())
        }

        fn visit_local_variable(
            &mut self,
            name: &JavaStr,
            _desc: &JavaStr,
            _signature: Option<&JavaStr>,
            _start: Label,
            _end: Label,
            _index: u16,
        ) -> ClassFileResult<()> {
            self.0.push(format!("local {name}"));
            Ok(())
        }

        fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> ClassFileResult<()> {
            self.0.push(format!("maxs {max_stack} {max_locals}"));
            Ok(())
        }

        fn visit_end(&mut self) -> ClassFileResult<()> {
            self.0.push("end".into());
            Ok(())
        }
    }

    #[test]
    fn test_accept_replays_in_order() {
        let mut recorder = Recorder::default();
        sample().accept_method(&mut recorder).unwrap();
        assert_eq!(
            vec![
                "code", "label", "line 3", "iload 0", "ireturn", "label", "local x", "maxs 1 1",
                "end"
            ],
            recorder.0
        );
    }

    #[test]
    fn test_insn_annotation_skips_pseudo_instructions() {
        let mut node = sample();
        node.visit_label(Label::new()).unwrap();
        node.visit_insn_annotation(TypeReference::New, &TypePath::default(), s("LA;"), true)
            .unwrap()
            .unwrap();
        let annotated: Vec<_> = node
            .instructions
            .iter()
            .filter(|(_, insn)| !insn.visible_type_annotations.is_empty())
            .map(|(_, insn)| insn.opcode())
            .collect();
        assert_eq!(vec![Some(Opcode::IReturn)], annotated);
        assert!(matches!(
            node.check(Api::V4),
            Err(ClassFileError::UnsupportedApi {
                required: Api::V5,
                ..
            })
        ));
        assert!(node.check(Api::V5).is_ok());
    }

    #[test]
    fn test_parameters_need_v5() {
        let mut node = MethodNode::new(MethodAccess::empty(), s("m"), s("(I)V"), None, &[]);
        node.visit_parameter(Some(s("x")), ParameterAccess::Final)
            .unwrap();
        assert!(node.check(Api::V4).is_err());
        assert!(node.check(Api::V5).is_ok());
    }

    #[test]
    fn test_annotation_default() {
        let mut node = MethodNode::new(MethodAccess::Abstract, s("value"), s("()I"), None, &[]);
        {
            let mut av = node.visit_annotation_default().unwrap().unwrap();
            av.visit(None, crate::AnnotationConstant::Int(4)).unwrap();
            av.visit_end().unwrap();
        }
        assert_eq!(Some(AnnotationValue::Int(4)), node.annotation_default);
        assert!(!node.has_code());
    }
}
