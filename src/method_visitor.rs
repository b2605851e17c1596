use crate::{
    AnnotationVisitor, Api, Attribute, BootstrapMethodArgument, ClassFileResult, Frame, Handle,
    IntInsn, Label, LdcConstant, Opcode, ParameterAccess, TypePath, TypeReference,
};
use java_string::JavaStr;

/// The code range over which a local variable lives in a given slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalVariableRange {
    pub start: Label,
    pub end: Label,
    pub index: u16,
}

/// Receives the contents of a method, in this order:
///
/// `visit_parameter`*, `visit_annotation_default`?, (`visit_annotation` |
/// `visit_annotable_parameter_count` | `visit_parameter_annotation` | `visit_type_annotation` |
/// `visit_attribute`)*, [`visit_code`, (`visit_frame` | `visit_*_insn` | `visit_label` |
/// `visit_insn_annotation` | `visit_try_catch_block` | `visit_try_catch_annotation` |
/// `visit_local_variable` | `visit_local_variable_annotation` | `visit_line_number` |
/// `visit_attribute`)*, `visit_maxs`], `visit_end`.
///
/// Labels passed to jump, switch, try-catch and debug events must eventually be visited with
/// `visit_label` between `visit_code` and `visit_maxs`.
pub trait MethodVisitor {
    /// Must not be newer than the delegate's version, as for
    /// [`ClassVisitor::api`](crate::ClassVisitor::api).
    fn api(&self) -> Api {
        Api::LATEST
    }

    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        None
    }

    /// Requires [`Api::V5`].
    fn visit_parameter(
        &mut self,
        name: Option<&JavaStr>,
        access: ParameterAccess,
    ) -> ClassFileResult<()> {
        forward!(self.visit_parameter(name, access))
    }

    /// The returned visitor receives a single unnamed value.
    fn visit_annotation_default(
        &mut self,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_annotation_default())
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

    /// The number of parameters that can have annotations, which may be lower than the number of
    /// parameters in the descriptor.
    fn visit_annotable_parameter_count(
        &mut self,
        parameter_count: u8,
        visible: bool,
    ) -> ClassFileResult<()> {
        forward!(self.visit_annotable_parameter_count(
            parameter_count,
            visible
        ))
    }

    fn visit_parameter_annotation(
        &mut self,
        parameter: u8,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_parameter_annotation(parameter, desc, visible))
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        forward!(self.visit_attribute(attribute))
    }

    fn visit_code(&mut self) -> ClassFileResult<()> {
        forward!(self.visit_code())
    }

    fn visit_frame(&mut self, frame: &Frame<'_>) -> ClassFileResult<()> {
        forward!(self.visit_frame(frame))
    }

    fn visit_insn(&mut self, opcode: Opcode) -> ClassFileResult<()> {
        forward!(self.visit_insn(opcode))
    }

    fn visit_int_insn(&mut self, insn: IntInsn) -> ClassFileResult<()> {
        forward!(self.visit_int_insn(insn))
    }

    fn visit_var_insn(&mut self, opcode: Opcode, var_index: u16) -> ClassFileResult<()> {
        forward!(self.visit_var_insn(opcode, var_index))
    }

    fn visit_type_insn(&mut self, opcode: Opcode, ty: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_type_insn(opcode, ty))
    }

    fn visit_field_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
    ) -> ClassFileResult<()> {
        forward!(self.visit_field_insn(opcode, owner, name, desc))
    }

    fn visit_method_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
        is_interface: bool,
    ) -> ClassFileResult<()> {
        forward!(self.visit_method_insn(
            opcode,
            owner,
            name,
            desc,
            is_interface
        ))
    }

    fn visit_invoke_dynamic_insn(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        bootstrap_method: &Handle<'_>,
        bootstrap_method_arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<()> {
        forward!(self.visit_invoke_dynamic_insn(
            name,
            desc,
            bootstrap_method,
            bootstrap_method_arguments
        ))
    }

    fn visit_jump_insn(&mut self, opcode: Opcode, label: Label) -> ClassFileResult<()> {
        forward!(self.visit_jump_insn(opcode, label))
    }

    fn visit_label(&mut self, label: Label) -> ClassFileResult<()> {
        forward!(self.visit_label(label))
    }

    /// Dynamic constants require [`Api::V7`].
    fn visit_ldc_insn(&mut self, constant: &LdcConstant<'_>) -> ClassFileResult<()> {
        forward!(self.visit_ldc_insn(constant))
    }

    fn visit_iinc_insn(&mut self, var_index: u16, increment: i16) -> ClassFileResult<()> {
        forward!(self.visit_iinc_insn(var_index, increment))
    }

    fn visit_table_switch_insn(
        &mut self,
        low: i32,
        high: i32,
        dflt: Label,
        labels: &[Label],
    ) -> ClassFileResult<()> {
        forward!(self.visit_table_switch_insn(low, high, dflt, labels))
    }

    fn visit_lookup_switch_insn(
        &mut self,
        dflt: Label,
        values: &[(i32, Label)],
    ) -> ClassFileResult<()> {
        forward!(self.visit_lookup_switch_insn(dflt, values))
    }

    fn visit_multi_a_new_array_insn(
        &mut self,
        desc: &JavaStr,
        dimensions: u8,
    ) -> ClassFileResult<()> {
        forward!(self.visit_multi_a_new_array_insn(desc, dimensions))
    }

    /// Annotates the instruction visited last. Requires [`Api::V5`].
    fn visit_insn_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_insn_annotation(
            type_ref,
            type_path,
            desc,
            visible
        ))
    }

    /// `ty` is `None` for a handler catching everything (`finally` blocks).
    fn visit_try_catch_block(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        ty: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        forward!(self.visit_try_catch_block(start, end, handler, ty))
    }

    /// Requires [`Api::V5`].
    fn visit_try_catch_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_try_catch_annotation(
            type_ref,
            type_path,
            desc,
            visible
        ))
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
        forward!(self.visit_local_variable(
            name,
            desc,
            signature,
            start,
            end,
            index
        ))
    }

    /// Requires [`Api::V5`].
    fn visit_local_variable_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        ranges: &[LocalVariableRange],
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_local_variable_annotation(
            type_ref,
            type_path,
            ranges,
            desc,
            visible
        ))
    }

    fn visit_line_number(&mut self, line: u16, start: Label) -> ClassFileResult<()> {
        forward!(self.visit_line_number(line, start))
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> ClassFileResult<()> {
        forward!(self.visit_maxs(max_stack, max_locals))
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        forward!(self.visit_end())
    }
}

impl<V: MethodVisitor> MethodVisitor for &mut V {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(&mut **self)
    }
}

impl<'a> MethodVisitor for Box<dyn MethodVisitor + 'a> {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(&mut **self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Counter {
        insns: usize,
        ended: bool,
    }

    impl MethodVisitor for Counter {
        fn visit_insn(&mut self, _opcode: Opcode) -> ClassFileResult<()> {
            self.insns += 1;
            Ok(())
        }

        fn visit_end(&mut self) -> ClassFileResult<()> {
            self.ended = true;
            Ok(())
        }
    }

    struct Forwarder<'a> {
        delegate: Box<dyn MethodVisitor + 'a>,
    }

    impl MethodVisitor for Forwarder<'_> {
        fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
            Some(&mut *self.delegate)
        }
    }

    #[test]
    fn test_events_reach_the_end_of_the_chain() {
        let mut counter = Counter::default();
        {
            let mut chain = Forwarder {
                delegate: Box::new(Forwarder {
                    delegate: Box::new(&mut counter),
                }),
            };
            chain.visit_insn(Opcode::Nop).unwrap();
            chain.visit_label(Label::new()).unwrap();
            chain.visit_insn(Opcode::Return).unwrap();
            chain.visit_end().unwrap();
        }
        assert_eq!(2, counter.insns);
        assert!(counter.ended);
    }

    #[test]
    fn test_terminal_visitor_skips_nested_scopes() {
        let mut counter = Counter::default();
        assert!(counter
            .visit_annotation(JavaStr::from_str("LA;"), true)
            .unwrap()
            .is_none());
    }
}
