use classkit::adapter::{ClassRenamer, MethodEntryHook};
use classkit::tree::{ClassNode, Insn, MethodNode};
use classkit::{
    ClassAccess, ClassReader, ClassVersion, ClassWriter, Label, MethodAccess, Opcode, ReaderFlags,
    WriterFlags,
};
use java_string::{JavaStr, JavaString};
use test_helpers::{ClassFileBuilder, Code, ACC_PUBLIC, ACC_STATIC};

fn s(value: &str) -> &JavaStr {
    JavaStr::from_str(value)
}

fn sample() -> Vec<u8> {
    let mut builder = ClassFileBuilder::new("pkg/Sample", Some("java/lang/Object"));
    builder.interface("java/lang/Runnable");
    builder.source_file("Sample.java");
    builder.field(ACC_STATIC, "count", "I");

    let init = builder.method_ref("java/lang/Object", "<init>", "()V");
    let [high, low] = init.to_be_bytes();
    // aload_0; invokespecial Object.<init>; return
    let code = Code::new(1, 1, [0x2a, 0xb7, high, low, 0xb1]);
    builder.method(ACC_PUBLIC, "<init>", "()V", Some(code));

    let count = builder.field_ref("pkg/Sample", "count", "I");
    let [high, low] = count.to_be_bytes();
    // getstatic count; iconst_1; iadd; putstatic count; return
    let bump = [0xb2, high, low, 0x04, 0x60, 0xb3, high, low, 0xb1];
    builder.method(ACC_PUBLIC, "run", "()V", Some(Code::new(2, 1, bump)));

    // iload_0; ifeq +5; iconst_1; ireturn; iconst_0; ireturn
    let not = [0x1a, 0x99, 0x00, 0x05, 0x04, 0xac, 0x03, 0xac];
    builder.method(ACC_STATIC, "not", "(I)I", Some(Code::new(1, 1, not)));
    builder.build()
}

fn u16s(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_be_bytes()).collect()
}

/// `static int parse(String s)` returning -1 on a `NumberFormatException`, laid out the way
/// `javac -g` writes it: exception table, then line numbers, local variables and frames.
fn guarded() -> Vec<u8> {
    let mut builder = ClassFileBuilder::new("pkg/Guarded", Some("java/lang/Object"));
    let parse_int = builder.method_ref("java/lang/Integer", "parseInt", "(Ljava/lang/String;)I");
    let failure = builder.class("java/lang/NumberFormatException");
    let [high, low] = parse_int.to_be_bytes();
    // aload_0; invokestatic parseInt; ireturn; astore_1; iconst_m1; ireturn
    let bytecode = [0x2a, 0xb8, high, low, 0xac, 0x4c, 0x02, 0xac];
    let mut code = Code::new(1, 2, bytecode);
    code.exception_table.push((0, 5, 5, failure));

    let line_numbers = builder.utf8("LineNumberTable");
    code.attributes.push((line_numbers, u16s(&[3, 0, 3, 5, 4, 6, 5])));

    let local_variables = builder.utf8("LocalVariableTable");
    let s_name = builder.utf8("s");
    let s_desc = builder.utf8("Ljava/lang/String;");
    let e_name = builder.utf8("e");
    let e_desc = builder.utf8("Ljava/lang/NumberFormatException;");
    let table = u16s(&[2, 0, 8, s_name, s_desc, 0, 6, 2, e_name, e_desc, 1]);
    code.attributes.push((local_variables, table));

    let stack_map = builder.utf8("StackMapTable");
    // same_locals_1_stack_item at the handler, holding the caught exception
    let mut frames = u16s(&[1]);
    frames.extend([69, 7]);
    frames.extend(failure.to_be_bytes());
    code.attributes.push((stack_map, frames));

    builder.method(ACC_STATIC, "parse", "(Ljava/lang/String;)I", Some(code));
    builder.build()
}

fn opcodes(node: &ClassNode, method: usize) -> Vec<Option<Opcode>> {
    node.methods[method]
        .instructions
        .iter()
        .map(|(_, node)| node.insn.opcode())
        .collect()
}

#[test]
fn test_rewrite_is_exact() {
    let bytes = sample();
    let reader = ClassReader::new(&bytes).unwrap();
    let mut writer = ClassWriter::with_reader(&reader, WriterFlags::empty()).unwrap();
    reader.accept(&mut writer, ReaderFlags::empty()).unwrap();
    assert_eq!(bytes, writer.to_bytes().unwrap());
}

#[test]
fn test_rewrite_keeps_code_attribute_order() {
    let bytes = guarded();
    let reader = ClassReader::new(&bytes).unwrap();
    let mut writer = ClassWriter::with_reader(&reader, WriterFlags::empty()).unwrap();
    reader.accept(&mut writer, ReaderFlags::empty()).unwrap();
    assert_eq!(bytes, writer.to_bytes().unwrap());
}

#[test]
fn test_tree_round_trip_is_idempotent() {
    let first = ClassNode::from_bytes(&sample(), ReaderFlags::empty())
        .unwrap()
        .to_bytes(WriterFlags::empty())
        .unwrap();
    let second = ClassNode::from_bytes(&first, ReaderFlags::empty())
        .unwrap()
        .to_bytes(WriterFlags::empty())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_far_jumps_decode_to_one_label() {
    let mut node = ClassNode::default();
    node.version = ClassVersion::V1_8;
    node.access = ClassAccess::Public | ClassAccess::Super;
    node.name = JavaString::from("Far");
    node.super_name = Some(JavaString::from("java/lang/Object"));
    {
        let mut method = MethodNode::new(MethodAccess::Static, s("f"), s("()V"), None, &[]);
        let target = Label::new();
        let list = &mut method.instructions;
        for _ in 0..2 {
            list.add(Insn::Jump {
                opcode: Opcode::Goto,
                label: target,
            });
        }
        for _ in 0..40000 {
            list.add(Opcode::Nop);
        }
        list.add(Insn::Label(target));
        list.add(Opcode::Return);
        node.methods.push(method);
    }
    let bytes = node.to_bytes(WriterFlags::COMPUTE_MAXS).unwrap();

    // goto_w +40010, goto_w +40005
    let wide = [200, 0, 0, 0x9c, 0x4a, 200, 0, 0, 0x9c, 0x45];
    assert!(bytes.windows(wide.len()).any(|window| window == wide));

    let read = ClassNode::from_bytes(&bytes, ReaderFlags::empty()).unwrap();
    let insns: Vec<&Insn> = read.methods[0]
        .instructions
        .iter()
        .map(|(_, node)| &node.insn)
        .collect();
    let (Insn::Jump { label: first, .. }, Insn::Jump { label: second, .. }) = (insns[0], insns[1])
    else {
        panic!("expected two jumps, got {:?} and {:?}", insns[0], insns[1]);
    };
    assert_eq!(Some(Opcode::Goto), insns[0].opcode());
    assert_eq!(Some(Opcode::Goto), insns[1].opcode());
    assert_eq!(first, second);
    assert_eq!(&Insn::Label(*first), insns[insns.len() - 2]);
}

#[test]
fn test_rename_and_hook_pipeline() {
    let bytes = sample();
    let hook = MethodEntryHook::new(ClassNode::default(), s("trace/Hooks"), s("enter"));
    let mut renamer = ClassRenamer::new(
        hook,
        [(JavaString::from("pkg/Sample"), JavaString::from("pkg/Renamed"))],
    );
    ClassReader::new(&bytes)
        .unwrap()
        .accept(&mut renamer, ReaderFlags::empty())
        .unwrap();
    let node = renamer.into_inner().into_inner();

    assert_eq!(s("pkg/Renamed"), &*node.name);
    let run = &node.methods[1];
    let insns: Vec<&Insn> = run.instructions.iter().map(|(_, node)| &node.insn).collect();
    assert!(matches!(
        insns[1],
        Insn::Method { opcode: Opcode::InvokeStatic, owner, .. } if &**owner == s("trace/Hooks")
    ));
    assert!(matches!(
        insns[2],
        Insn::Field { opcode: Opcode::GetStatic, owner, .. } if &**owner == s("pkg/Renamed")
    ));

    let encoded = node.to_bytes(WriterFlags::COMPUTE_MAXS).unwrap();
    let read = ClassNode::from_bytes(&encoded, ReaderFlags::empty()).unwrap();
    assert_eq!(
        vec![
            Some(Opcode::Ldc),
            Some(Opcode::InvokeStatic),
            Some(Opcode::GetStatic),
            Some(Opcode::IConst1),
            Some(Opcode::IAdd),
            Some(Opcode::PutStatic),
            Some(Opcode::Return),
        ],
        opcodes(&read, 1)
    );
    assert_eq!(2, read.methods[1].max_stack);
}
