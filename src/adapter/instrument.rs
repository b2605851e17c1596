use crate::{
    Api, ClassAccess, ClassFileResult, ClassVersion, ClassVisitor, LdcConstant, MethodAccess,
    MethodVisitor, Opcode,
};
use java_string::{JavaStr, JavaString};
use std::borrow::Cow;

const HOOK_DESC: &str = "(Ljava/lang/String;)V";

/// Calls a static hook at the start of every method body.
///
/// The hook has the descriptor `(Ljava/lang/String;)V` and receives the method being entered,
/// spelled `a/Owner.name(desc)`. Methods without code are left alone.
#[derive(Debug)]
pub struct MethodEntryHook<V> {
    next: V,
    hook_owner: JavaString,
    hook_name: JavaString,
    class_name: JavaString,
}

impl<V: ClassVisitor> MethodEntryHook<V> {
    pub fn new(next: V, hook_owner: &JavaStr, hook_name: &JavaStr) -> MethodEntryHook<V> {
        MethodEntryHook {
            next,
            hook_owner: hook_owner.to_owned(),
            hook_name: hook_name.to_owned(),
            class_name: JavaString::new(),
        }
    }

    pub fn into_inner(self) -> V {
        self.next
    }
}

impl<V: ClassVisitor> ClassVisitor for MethodEntryHook<V> {
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
        self.class_name = name.to_owned();
        self.next
            .visit(version, access, name, signature, super_name, interfaces)
    }

    fn visit_method(
        &mut self,
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
        let mut method = self.class_name.clone();
        method.push('.');
        method.push_java_str(name);
        method.push_java_str(desc);
        let Some(next) = self
            .next
            .visit_method(access, name, desc, signature, exceptions)?
        else {
            return Ok(None);
        };
        log::trace!("hooking entry of {method}");
        Ok(Some(Box::new(EntryCall {
            next,
            hook_owner: &self.hook_owner,
            hook_name: &self.hook_name,
            method,
        })))
    }
}

struct EntryCall<'a> {
    next: Box<dyn MethodVisitor + 'a>,
    hook_owner: &'a JavaStr,
    hook_name: &'a JavaStr,
    method: JavaString,
}

impl MethodVisitor for EntryCall<'_> {
    fn api(&self) -> Api {
        self.next.api()
    }

    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(&mut *self.next)
    }

    fn visit_code(&mut self) -> ClassFileResult<()> {
        self.next.visit_code()?;
        self.next
            .visit_ldc_insn(&LdcConstant::String(Cow::Borrowed(&self.method)))?;
        self.next.visit_method_insn(
            Opcode::InvokeStatic,
            self.hook_owner,
            self.hook_name,
            JavaStr::from_str(HOOK_DESC),
            false,
        )
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> ClassFileResult<()> {
        self.next.visit_maxs(max_stack.max(1), max_locals)
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

    fn source() -> ClassNode {
        let mut node = ClassNode::default();
        node.visit(
            ClassVersion::V1_8,
            ClassAccess::Public | ClassAccess::Super,
            s("a/Target"),
            None,
            Some(s("java/lang/Object")),
            &[],
        )
        .unwrap();
        {
            let mut mv = node
                .visit_method(MethodAccess::Static, s("f"), s("()V"), None, &[])
                .unwrap()
                .unwrap();
            mv.visit_code().unwrap();
            mv.visit_insn(Opcode::Return).unwrap();
            mv.visit_maxs(0, 0).unwrap();
            mv.visit_end().unwrap();
        }
        node.visit_method(MethodAccess::Abstract, s("g"), s("()I"), None, &[])
            .unwrap()
            .unwrap()
            .visit_end()
            .unwrap();
        node.visit_end().unwrap();
        node
    }

    #[test]
    fn test_calls_hook_first() {
        let mut hook = MethodEntryHook::new(ClassNode::default(), s("a/Trace"), s("enter"));
        source().accept(&mut hook).unwrap();
        let node = hook.into_inner();

        let f = &node.methods[0];
        let insns: Vec<&Insn> = f.instructions.iter().map(|(_, node)| &node.insn).collect();
        assert_eq!(
            vec![
                &Insn::Ldc(LdcConstant::String(Cow::Owned(JavaString::from(
                    "a/Target.f()V"
                )))),
                &Insn::Method {
                    opcode: Opcode::InvokeStatic,
                    owner: JavaString::from("a/Trace"),
                    name: JavaString::from("enter"),
                    desc: JavaString::from(HOOK_DESC),
                    is_interface: false,
                },
                &Insn::Simple(Opcode::Return),
            ],
            insns
        );
        assert_eq!(1, f.max_stack);
        assert!(node.methods[1].instructions.is_empty());
    }

    #[test]
    fn test_hooked_class_encodes() {
        let writer = ClassWriter::new(WriterFlags::COMPUTE_MAXS);
        let mut hook = MethodEntryHook::new(writer, s("a/Trace"), s("enter"));
        source().accept(&mut hook).unwrap();
        let bytes = hook.into_inner().to_bytes().unwrap();
        let mut node = ClassNode::default();
        ClassReader::new(&bytes)
            .unwrap()
            .accept(&mut node, ReaderFlags::empty())
            .unwrap();
        assert_eq!(3, node.methods[0].instructions.len());
        assert_eq!(1, node.methods[0].max_stack);
    }
}
