use crate::adapter::descriptor::{argument_slots, field_size, return_slots};
use crate::tree::{Insn, MethodNode};
use crate::{Api, ClassFileResult, IntInsn, Label, MethodAccess, MethodVisitor, Opcode};
use java_string::JavaStr;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

/// Buffers a method, then replays it into the next visitor with `max_stack` and `max_locals`
/// computed by [`compute_maxs`] in place of the ones it was given.
pub struct ComputeMaxs<'a> {
    method: MethodNode,
    next: Box<dyn MethodVisitor + 'a>,
}

impl Debug for ComputeMaxs<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeMaxs")
            .field("name", &self.method.name)
            .field("desc", &self.method.desc)
            .finish_non_exhaustive()
    }
}

impl<'a> ComputeMaxs<'a> {
    pub fn new(
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
        next: Box<dyn MethodVisitor + 'a>,
    ) -> ComputeMaxs<'a> {
        ComputeMaxs {
            method: MethodNode::new(access, name, desc, signature, exceptions),
            next,
        }
    }
}

impl MethodVisitor for ComputeMaxs<'_> {
    /// The buffered method is replayed into `next`, so this reports what `next` accepts.
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(&mut self.method)
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        if self.method.has_code() {
            let (max_stack, max_locals) = compute_maxs(&self.method);
            self.method.max_stack = max_stack;
            self.method.max_locals = max_locals;
        }
        self.method.accept_method(&mut *self.next)
    }
}

/// Net effect on the operand stack of an instruction whose operands don't matter.
fn simple_delta(opcode: Opcode) -> i32 {
    match opcode as u8 {
        0 => 0,
        1..=8 | 11..=13 | 16 | 17 => 1,
        9 | 10 | 14 | 15 => 2,
        21 | 23 | 25 => 1,
        22 | 24 => 2,
        46 | 48 | 50..=53 => -1,
        47 | 49 => 0,
        54 | 56 | 58 => -1,
        55 | 57 => -2,
        79 | 81 | 83..=86 => -3,
        80 | 82 => -4,
        87 => -1,
        88 => -2,
        89..=91 => 1,
        92..=94 => 2,
        95 => 0,
        // iadd ... drem, iand ... lxor: even opcodes are int or float, odd ones long or double
        96..=115 | 126..=131 => {
            if opcode as u8 % 2 == 0 {
                -1
            } else {
                -2
            }
        }
        116..=119 => 0,
        120..=125 => -1,
        132 => 0,
        133 | 135 | 140 | 141 => 1,
        134 | 138 | 139 | 143 | 145..=147 => 0,
        136 | 137 | 142 | 144 => -1,
        148 | 151 | 152 => -3,
        149 | 150 => -1,
        153..=158 | 198 | 199 => -1,
        159..=166 => -2,
        167..=169 => 0,
        170 | 171 => -1,
        172 | 174 | 176 => -1,
        173 | 175 => -2,
        177 => 0,
        187 => 1,
        188..=190 | 192 | 193 => 0,
        191 | 194 | 195 => -1,
        _ => 0,
    }
}

fn stack_delta(insn: &Insn) -> i32 {
    match insn {
        Insn::Simple(opcode)
        | Insn::Var { opcode, .. }
        | Insn::Type { opcode, .. }
        | Insn::Jump { opcode, .. } => simple_delta(*opcode),
        Insn::Int(IntInsn::NewArray(_)) => 0,
        Insn::Int(_) => 1,
        Insn::Field { opcode, desc, .. } => {
            let size = field_size(desc) as i32;
            match opcode {
                Opcode::GetStatic => size,
                Opcode::PutStatic => -size,
                Opcode::GetField => size - 1,
                _ => -size - 1,
            }
        }
        Insn::Method { opcode, desc, .. } => {
            let receiver = i32::from(*opcode != Opcode::InvokeStatic);
            return_slots(desc) as i32 - argument_slots(desc) as i32 - receiver
        }
        Insn::InvokeDynamic { desc, .. } => {
            return_slots(desc) as i32 - argument_slots(desc) as i32
        }
        Insn::Ldc(constant) => {
            if constant.is_wide() {
                2
            } else {
                1
            }
        }
        Insn::Iinc { .. } => 0,
        Insn::TableSwitch { .. } | Insn::LookupSwitch { .. } => -1,
        Insn::MultiANewArray { dimensions, .. } => 1 - *dimensions as i32,
        Insn::Label(_) | Insn::LineNumber { .. } | Insn::Frame(_) => 0,
    }
}

/// Where control can go after an instruction, besides falling through.
enum Flow {
    Next,
    Branch(Label),
    Goto(Label),
    Jsr(Label),
    Switch(Label, Vec<Label>),
    Stop,
}

fn flow(insn: &Insn) -> Flow {
    match insn {
        Insn::Jump { opcode: Opcode::Goto, label } => Flow::Goto(*label),
        Insn::Jump { opcode: Opcode::Jsr, label } => Flow::Jsr(*label),
        Insn::Jump { label, .. } => Flow::Branch(*label),
        Insn::TableSwitch { dflt, labels, .. } => Flow::Switch(*dflt, labels.clone()),
        Insn::LookupSwitch { dflt, values } => {
            Flow::Switch(*dflt, values.iter().map(|&(_, label)| label).collect())
        }
        Insn::Var { opcode: Opcode::Ret, .. } => Flow::Stop,
        Insn::Simple(opcode) if matches!(*opcode as u8, 172..=177 | 191) => Flow::Stop,
        _ => Flow::Next,
    }
}

/// Computes `(max_stack, max_locals)` for the code of `method`.
///
/// Every reachable instruction is visited once, with the stack height it is first reached with.
/// Exception handlers start with the caught exception on the stack.
pub fn compute_maxs(method: &MethodNode) -> (u16, u16) {
    let insns: Vec<&Insn> = method
        .instructions
        .iter()
        .map(|(_, node)| &node.insn)
        .collect();
    let labels: HashMap<Label, usize> = insns
        .iter()
        .enumerate()
        .filter_map(|(index, insn)| match insn {
            Insn::Label(label) => Some((*label, index)),
            _ => None,
        })
        .collect();

    let mut reached = vec![false; insns.len()];
    let mut worklist = vec![(0usize, 0i32)];
    for block in &method.try_catch_blocks {
        if let Some(&handler) = labels.get(&block.handler) {
            worklist.push((handler, 1));
        }
    }

    let mut max_stack = 0i32;
    while let Some((mut index, mut height)) = worklist.pop() {
        max_stack = max_stack.max(height);
        while index < insns.len() && !reached[index] {
            reached[index] = true;
            let insn = insns[index];
            height += stack_delta(insn);
            if height < 0 {
                log::debug!(
                    "stack underflow at instruction {index} of {:?}, assuming an empty stack",
                    method.name
                );
                height = 0;
            }
            max_stack = max_stack.max(height);
            let mut target = |label: &Label, height: i32| {
                if let Some(&target) = labels.get(label) {
                    worklist.push((target, height));
                }
            };
            match flow(insn) {
                Flow::Next => {}
                Flow::Branch(label) => target(&label, height),
                Flow::Goto(label) => {
                    target(&label, height);
                    break;
                }
                Flow::Jsr(label) => {
                    max_stack = max_stack.max(height + 1);
                    target(&label, height + 1);
                }
                Flow::Switch(dflt, targets) => {
                    target(&dflt, height);
                    for label in &targets {
                        target(label, height);
                    }
                    break;
                }
                Flow::Stop => break,
            }
            index += 1;
        }
    }

    (clamp(max_stack), compute_max_locals(method))
}

fn compute_max_locals(method: &MethodNode) -> u16 {
    let mut max_locals = argument_slots(&method.desc) as u32;
    if !method.access.contains(MethodAccess::Static) {
        max_locals += 1;
    }
    for (_, node) in &method.instructions {
        let end = match &node.insn {
            Insn::Var { opcode, var_index } => {
                let size = if matches!(
                    opcode,
                    Opcode::LLoad | Opcode::DLoad | Opcode::LStore | Opcode::DStore
                ) {
                    2
                } else {
                    1
                };
                *var_index as u32 + size
            }
            Insn::Iinc { var_index, .. } => *var_index as u32 + 1,
            _ => continue,
        };
        max_locals = max_locals.max(end);
    }
    for variable in &method.local_variables {
        let size = field_size(&variable.desc).max(1) as u32;
        max_locals = max_locals.max(variable.index as u32 + size);
    }
    clamp(max_locals as i32)
}

fn clamp(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::TryCatchBlockNode;
    use java_string::JavaString;
    use std::borrow::Cow;

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    fn method(access: MethodAccess, desc: &str) -> MethodNode {
        MethodNode::new(access, s("m"), s(desc), None, &[])
    }

    #[test]
    fn test_reports_next_api() {
        struct Java8Method;

        impl MethodVisitor for Java8Method {
            fn api(&self) -> Api {
                Api::V5
            }
        }

        let adapter = ComputeMaxs::new(
            MethodAccess::Static,
            s("m"),
            s("()V"),
            None,
            &[],
            Box::new(Java8Method),
        );
        assert_eq!(Api::V5, adapter.api());
    }

    #[test]
    fn test_underflow_counts_from_empty_stack() {
        let mut node = method(MethodAccess::Static, "()I");
        let list = &mut node.instructions;
        list.add(Opcode::Pop2);
        list.add(Opcode::IConst0);
        list.add(Opcode::IReturn);
        assert_eq!((1, 0), compute_maxs(&node));
    }

    #[test]
    fn test_straight_line() {
        let mut node = method(MethodAccess::Static, "(JI)J");
        let list = &mut node.instructions;
        list.add(Insn::Var {
            opcode: Opcode::LLoad,
            var_index: 0,
        });
        list.add(Insn::Ldc(crate::LdcConstant::Long(3)));
        list.add(Opcode::LMul);
        list.add(Insn::Var {
            opcode: Opcode::ILoad,
            var_index: 2,
        });
        list.add(Opcode::I2l);
        list.add(Opcode::LAdd);
        list.add(Opcode::LReturn);
        // lload, ldc2: 4; lmul: 2; iload: 3; i2l: 4
        assert_eq!((4, 3), compute_maxs(&node));
    }

    #[test]
    fn test_branches_and_handlers() {
        let mut node = method(MethodAccess::empty(), "()V");
        let start = Label::new();
        let end = Label::new();
        let handler = Label::new();
        let skip = Label::new();
        let list = &mut node.instructions;
        list.add(Insn::Label(start));
        list.add(Opcode::IConst0);
        list.add(Insn::Jump {
            opcode: Opcode::IfEq,
            label: skip,
        });
        list.add(Insn::Method {
            opcode: Opcode::InvokeStatic,
            owner: JavaString::from("A"),
            name: JavaString::from("f"),
            desc: JavaString::from("()V"),
            is_interface: false,
        });
        list.add(Insn::Label(skip));
        list.add(Insn::Label(end));
        list.add(Opcode::Return);
        list.add(Insn::Label(handler));
        list.add(Insn::Var {
            opcode: Opcode::AStore,
            var_index: 1,
        });
        list.add(Insn::Var {
            opcode: Opcode::ALoad,
            var_index: 1,
        });
        list.add(Opcode::Dup);
        list.add(Opcode::AThrow);
        node.try_catch_blocks.push(TryCatchBlockNode {
            start,
            end,
            handler,
            ty: None,
            visible_type_annotations: Vec::new(),
            invisible_type_annotations: Vec::new(),
        });
        assert_eq!((2, 2), compute_maxs(&node));
    }

    #[test]
    fn test_invocations() {
        let mut node = method(MethodAccess::Static, "()V");
        let list = &mut node.instructions;
        list.add(Insn::Type {
            opcode: Opcode::New,
            ty: JavaString::from("A"),
        });
        list.add(Opcode::Dup);
        list.add(Opcode::DConst1);
        list.add(Insn::Method {
            opcode: Opcode::InvokeSpecial,
            owner: JavaString::from("A"),
            name: JavaString::from("<init>"),
            desc: JavaString::from("(D)V"),
            is_interface: false,
        });
        list.add(Insn::Field {
            opcode: Opcode::GetField,
            owner: JavaString::from("A"),
            name: JavaString::from("x"),
            desc: JavaString::from("J"),
        });
        list.add(Opcode::Pop2);
        list.add(Insn::Ldc(crate::LdcConstant::String(Cow::Borrowed(s("s")))));
        list.add(Opcode::Pop);
        list.add(Opcode::Return);
        assert_eq!((4, 0), compute_maxs(&node));
    }
}
