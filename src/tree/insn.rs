use crate::class_reader::supports;
use crate::tree::annotation::{push_type_annotation, TypeAnnotationNode};
use crate::tree::check_api;
use crate::{
    AnnotationVisitor, Api, BootstrapMethodArgument, ClassFileResult, Frame, Handle, IntInsn, Label,
    LdcConstant, MethodVisitor, Opcode, TypePath, TypeReference,
};
use derive_more::IsVariant;
use java_string::{JavaStr, JavaString};

/// One element of a method body: an instruction, or a label, line number or frame.
#[derive(Debug, Clone, PartialEq, PartialOrd, IsVariant)]
pub enum Insn {
    /// An instruction without operands.
    Simple(Opcode),
    Int(IntInsn),
    Var {
        opcode: Opcode,
        var_index: u16,
    },
    Type {
        opcode: Opcode,
        ty: JavaString,
    },
    Field {
        opcode: Opcode,
        owner: JavaString,
        name: JavaString,
        desc: JavaString,
    },
    Method {
        opcode: Opcode,
        owner: JavaString,
        name: JavaString,
        desc: JavaString,
        is_interface: bool,
    },
    InvokeDynamic {
        name: JavaString,
        desc: JavaString,
        bootstrap_method: Handle<'static>,
        bootstrap_method_arguments: Vec<BootstrapMethodArgument<'static>>,
    },
    Jump {
        opcode: Opcode,
        label: Label,
    },
    Label(Label),
    Ldc(LdcConstant<'static>),
    Iinc {
        var_index: u16,
        increment: i16,
    },
    TableSwitch {
        low: i32,
        high: i32,
        dflt: Label,
        labels: Vec<Label>,
    },
    LookupSwitch {
        dflt: Label,
        values: Vec<(i32, Label)>,
    },
    MultiANewArray {
        desc: JavaString,
        dimensions: u8,
    },
    LineNumber {
        line: u16,
        start: Label,
    },
    Frame(Frame<'static>),
}

impl Insn {
    /// The opcode of a real instruction, `None` for labels, line numbers and frames.
    pub fn opcode(&self) -> Option<Opcode> {
        Some(match self {
            Insn::Simple(opcode)
            | Insn::Var { opcode, .. }
            | Insn::Type { opcode, .. }
            | Insn::Field { opcode, .. }
            | Insn::Method { opcode, .. }
            | Insn::Jump { opcode, .. } => *opcode,
            Insn::Int(insn) => insn.opcode(),
            Insn::InvokeDynamic { .. } => Opcode::InvokeDynamic,
            Insn::Ldc(_) => Opcode::Ldc,
            Insn::Iinc { .. } => Opcode::IInc,
            Insn::TableSwitch { .. } => Opcode::TableSwitch,
            Insn::LookupSwitch { .. } => Opcode::LookupSwitch,
            Insn::MultiANewArray { .. } => Opcode::MultiANewArray,
            Insn::Label(_) | Insn::LineNumber { .. } | Insn::Frame(_) => return None,
        })
    }

    pub fn is_real(&self) -> bool {
        self.opcode().is_some()
    }

    /// Sends the event describing this element to `mv`.
    /// Fails with [`UnsupportedApi`](crate::ClassFileError::UnsupportedApi) if `mv` predates
    /// a constant this instruction loads.
    pub fn accept(&self, mv: &mut dyn MethodVisitor) -> ClassFileResult<()> {
        self.check(mv.api())?;
        match self {
            Insn::Simple(opcode) => mv.visit_insn(*opcode),
            Insn::Int(insn) => mv.visit_int_insn(*insn),
            Insn::Var { opcode, var_index } => mv.visit_var_insn(*opcode, *var_index),
            Insn::Type { opcode, ty } => mv.visit_type_insn(*opcode, ty),
            Insn::Field {
                opcode,
                owner,
                name,
                desc,
            } => mv.visit_field_insn(*opcode, owner, name, desc),
            Insn::Method {
                opcode,
                owner,
                name,
                desc,
                is_interface,
            } => mv.visit_method_insn(*opcode, owner, name, desc, *is_interface),
            Insn::InvokeDynamic {
                name,
                desc,
                bootstrap_method,
                bootstrap_method_arguments,
            } => mv.visit_invoke_dynamic_insn(
                name,
                desc,
                bootstrap_method,
                bootstrap_method_arguments,
            ),
            Insn::Jump { opcode, label } => mv.visit_jump_insn(*opcode, *label),
            Insn::Label(label) => mv.visit_label(*label),
            Insn::Ldc(constant) => mv.visit_ldc_insn(constant),
            Insn::Iinc {
                var_index,
                increment,
            } => mv.visit_iinc_insn(*var_index, *increment),
            Insn::TableSwitch {
                low,
                high,
                dflt,
                labels,
            } => mv.visit_table_switch_insn(*low, *high, *dflt, labels),
            Insn::LookupSwitch { dflt, values } => mv.visit_lookup_switch_insn(*dflt, values),
            Insn::MultiANewArray { desc, dimensions } => {
                mv.visit_multi_a_new_array_insn(desc, *dimensions)
            }
            Insn::LineNumber { line, start } => mv.visit_line_number(*line, *start),
            Insn::Frame(frame) => mv.visit_frame(frame),
        }
    }

    fn check(&self, api: Api) -> ClassFileResult<()> {
        match self {
            Insn::Ldc(LdcConstant::ConstantDynamic(_)) => {
                check_api(api, Api::V7, "dynamic constants")
            }
            Insn::InvokeDynamic {
                bootstrap_method_arguments,
                ..
            } if bootstrap_method_arguments
                .iter()
                .any(|argument| argument.is_constant_dynamic()) =>
            {
                check_api(api, Api::V7, "dynamic constants")
            }
            _ => Ok(()),
        }
    }
}

/// An element of an [`InsnList`](crate::tree::InsnList) together with its type annotations.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct InsnNode {
    pub insn: Insn,
    pub visible_type_annotations: Vec<TypeAnnotationNode>,
    pub invisible_type_annotations: Vec<TypeAnnotationNode>,
}

impl InsnNode {
    pub fn new(insn: Insn) -> InsnNode {
        InsnNode {
            insn,
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
        }
    }

    pub fn opcode(&self) -> Option<Opcode> {
        self.insn.opcode()
    }

    pub fn accept(&self, mv: &mut dyn MethodVisitor) -> ClassFileResult<()> {
        self.insn.accept(mv)?;
        if !supports(mv.api(), Api::V5, "instruction annotations") {
            return Ok(());
        }
        for (annotations, visible) in [
            (&self.visible_type_annotations, true),
            (&self.invisible_type_annotations, false),
        ] {
            for annotation in annotations {
                if let Some(mut av) = mv.visit_insn_annotation(
                    annotation.type_ref,
                    &annotation.type_path,
                    &annotation.annotation.desc,
                    visible,
                )? {
                    annotation.annotation.accept(&mut *av)?;
                }
            }
        }
        Ok(())
    }

    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        if !self.visible_type_annotations.is_empty()
            || !self.invisible_type_annotations.is_empty()
        {
            check_api(api, Api::V5, "instruction annotations")?;
        }
        self.insn.check(api)
    }

    pub(crate) fn annotate(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> Box<dyn AnnotationVisitor + '_> {
        let list = if visible {
            &mut self.visible_type_annotations
        } else {
            &mut self.invisible_type_annotations
        };
        push_type_annotation(list, type_ref, type_path, desc)
    }
}

impl From<Insn> for InsnNode {
    fn from(insn: Insn) -> InsnNode {
        InsnNode::new(insn)
    }
}

impl From<Opcode> for InsnNode {
    fn from(opcode: Opcode) -> InsnNode {
        InsnNode::new(Insn::Simple(opcode))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_pseudo_instructions_have_no_opcode() {
        assert_eq!(None, Insn::Label(Label::new()).opcode());
        assert_eq!(None, Insn::Frame(Frame::Same).opcode());
        assert_eq!(Some(Opcode::Return), Insn::Simple(Opcode::Return).opcode());
        assert_eq!(
            Some(Opcode::BIPush),
            Insn::Int(IntInsn::Bipush(3)).opcode()
        );
        assert!(!Insn::LineNumber {
            line: 1,
            start: Label::new()
        }
        .is_real());
    }

    fn bootstrap() -> Handle<'static> {
        Handle {
            kind: crate::HandleKind::InvokeStatic,
            owner: Cow::Borrowed(JavaStr::from_str("B")),
            name: Cow::Borrowed(JavaStr::from_str("bsm")),
            desc: Cow::Borrowed(JavaStr::from_str("()V")),
            is_interface: false,
        }
    }

    fn dynamic_constant() -> LdcConstant<'static> {
        LdcConstant::ConstantDynamic(crate::ConstantDynamic {
            name: Cow::Borrowed(JavaStr::from_str("c")),
            desc: Cow::Borrowed(JavaStr::from_str("I")),
            bootstrap_method: bootstrap(),
            bootstrap_method_arguments: Vec::new(),
        })
    }

    #[derive(Default)]
    struct Counter {
        api: Option<Api>,
        events: usize,
    }

    impl MethodVisitor for Counter {
        fn api(&self) -> Api {
            self.api.unwrap_or(Api::LATEST)
        }

        fn visit_ldc_insn(&mut self, _constant: &LdcConstant<'_>) -> ClassFileResult<()> {
            self.events += 1;
            Ok(())
        }

        fn visit_invoke_dynamic_insn(
            &mut self,
            _name: &JavaStr,
            _desc: &JavaStr,
            _bootstrap_method: &Handle<'_>,
            _bootstrap_method_arguments: &[BootstrapMethodArgument<'_>],
        ) -> ClassFileResult<()> {
            self.events += 1;
            Ok(())
        }
    }

    #[test]
    fn test_dynamic_constant_needs_v7() {
        let node = InsnNode::new(Insn::Ldc(dynamic_constant()));
        assert!(node.check(Api::V6).is_err());
        assert!(node.check(Api::V7).is_ok());
    }

    #[test]
    fn test_dynamic_constants_not_sent_to_older_visitors() {
        let insns = [
            Insn::Ldc(dynamic_constant()),
            Insn::InvokeDynamic {
                name: JavaString::from("run"),
                desc: JavaString::from("()V"),
                bootstrap_method: bootstrap(),
                bootstrap_method_arguments: vec![LdcConstant::Integer(1), dynamic_constant()],
            },
        ];
        for insn in &insns {
            let mut old = Counter {
                api: Some(Api::V6),
                ..Counter::default()
            };
            assert!(matches!(
                insn.accept(&mut old),
                Err(crate::ClassFileError::UnsupportedApi {
                    required: Api::V7,
                    requested: Api::V6,
                    ..
                })
            ));
            assert_eq!(0, old.events);

            let mut current = Counter::default();
            insn.accept(&mut current).unwrap();
            assert_eq!(1, current.events);
        }
    }
}
