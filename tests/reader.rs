use classkit::tree::ClassNode;
use classkit::{
    Api, ClassAccess, ClassFileError, ClassFileResult, ClassReader, ClassVersion, ClassVisitor,
    Label, MethodAccess, MethodVisitor, Opcode, ReaderFlags,
};
use java_string::JavaStr;
use std::cell::RefCell;
use std::rc::Rc;
use test_helpers::{ClassFileBuilder, Code, ACC_PUBLIC, ACC_STATIC};

type Events = Rc<RefCell<Vec<String>>>;

struct ClassRecorder {
    events: Events,
    skip: &'static str,
    api: Api,
}

impl ClassVisitor for ClassRecorder {
    fn api(&self) -> Api {
        self.api
    }

    fn visit(
        &mut self,
        _version: ClassVersion,
        _access: ClassAccess,
        name: &JavaStr,
        _signature: Option<&JavaStr>,
        _super_name: Option<&JavaStr>,
        _interfaces: &[&JavaStr],
    ) -> ClassFileResult<()> {
        self.events.borrow_mut().push(format!("visit {name}"));
        Ok(())
    }

    fn visit_source(
        &mut self,
        source: Option<&JavaStr>,
        _debug: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        if let Some(source) = source {
            self.events.borrow_mut().push(format!("source {source}"));
        }
        Ok(())
    }

    fn visit_method(
        &mut self,
        _access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        _signature: Option<&JavaStr>,
        _exceptions: &[&JavaStr],
    ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
        self.events.borrow_mut().push(format!("method {name}{desc}"));
        if name == JavaStr::from_str(self.skip) {
            return Ok(None);
        }
        Ok(Some(Box::new(MethodRecorder {
            events: self.events.clone(),
        })))
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        self.events.borrow_mut().push("end".to_owned());
        Ok(())
    }
}

struct MethodRecorder {
    events: Events,
}

impl MethodVisitor for MethodRecorder {
    fn visit_code(&mut self) -> ClassFileResult<()> {
        self.events.borrow_mut().push("code".to_owned());
        Ok(())
    }

    fn visit_insn(&mut self, opcode: Opcode) -> ClassFileResult<()> {
        self.events.borrow_mut().push(format!("insn {opcode:?}"));
        Ok(())
    }

    fn visit_var_insn(&mut self, opcode: Opcode, var_index: u16) -> ClassFileResult<()> {
        self.events
            .borrow_mut()
            .push(format!("var {opcode:?} {var_index}"));
        Ok(())
    }

    fn visit_jump_insn(&mut self, opcode: Opcode, _label: Label) -> ClassFileResult<()> {
        self.events.borrow_mut().push(format!("jump {opcode:?}"));
        Ok(())
    }

    fn visit_label(&mut self, _label: Label) -> ClassFileResult<()> {
        self.events.borrow_mut().push("label".to_owned());
        Ok(())
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> ClassFileResult<()> {
        self.events
            .borrow_mut()
            .push(format!("maxs {max_stack} {max_locals}"));
        Ok(())
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        self.events.borrow_mut().push("method end".to_owned());
        Ok(())
    }
}

fn record(bytes: &[u8], skip: &'static str) -> Vec<String> {
    let events = Events::default();
    let mut recorder = ClassRecorder {
        events: events.clone(),
        skip,
        api: Api::LATEST,
    };
    ClassReader::new(bytes)
        .unwrap()
        .accept(&mut recorder, ReaderFlags::empty())
        .unwrap();
    let events = events.borrow().clone();
    events
}

#[test]
fn test_minimal_class_events() {
    let mut builder = ClassFileBuilder::new("Minimal", Some("java/lang/Object"));
    let code = Code::new(0, 0, [0xb1]);
    builder.method(ACC_PUBLIC | ACC_STATIC, "run", "()V", Some(code));
    assert_eq!(
        vec![
            "visit Minimal",
            "method run()V",
            "code",
            "insn Return",
            "maxs 0 0",
            "method end",
            "end",
        ],
        record(&builder.build(), "")
    );
}

#[test]
fn test_branch_target_gets_a_label() {
    let mut builder = ClassFileBuilder::new("Branchy", Some("java/lang/Object"));
    builder.source_file("Branchy.java");
    // iload_0; ifeq +5; iconst_1; ireturn; iconst_0; ireturn
    let code = Code::new(1, 1, [0x1a, 0x99, 0x00, 0x05, 0x04, 0xac, 0x03, 0xac]);
    builder.method(ACC_STATIC, "not", "(I)I", Some(code));
    assert_eq!(
        vec![
            "visit Branchy",
            "source Branchy.java",
            "method not(I)I",
            "code",
            "var ILoad 0",
            "jump IfEq",
            "insn IConst1",
            "insn IReturn",
            "label",
            "insn IConst0",
            "insn IReturn",
            "maxs 1 1",
            "method end",
            "end",
        ],
        record(&builder.build(), "")
    );
}

#[test]
fn test_skipped_method_has_no_nested_events() {
    let mut builder = ClassFileBuilder::new("Skips", Some("java/lang/Object"));
    let code = Code::new(0, 0, [0x00, 0xb1]);
    builder.method(ACC_STATIC, "skipped", "()V", Some(code));
    builder.method(ACC_STATIC, "kept", "()V", Some(Code::new(0, 0, [0xb1])));
    assert_eq!(
        vec![
            "visit Skips",
            "method skipped()V",
            "method kept()V",
            "code",
            "insn Return",
            "maxs 0 0",
            "method end",
            "end",
        ],
        record(&builder.build(), "skipped")
    );
}

#[test]
fn test_skip_code() {
    let mut builder = ClassFileBuilder::new("NoCode", Some("java/lang/Object"));
    builder.method(ACC_STATIC, "f", "()V", Some(Code::new(0, 0, [0xb1])));
    let bytes = builder.build();
    let node = ClassNode::from_bytes(&bytes, ReaderFlags::SKIP_CODE).unwrap();
    assert_eq!(1, node.methods.len());
    assert!(!node.methods[0].has_code());
}

#[test]
fn test_branch_out_of_code_is_malformed() {
    let mut builder = ClassFileBuilder::new("Broken", Some("java/lang/Object"));
    // goto +100; return
    let code = Code::new(0, 0, [0xa7, 0x00, 0x64, 0xb1]);
    builder.method(ACC_STATIC, "f", "()V", Some(code));
    let bytes = builder.build();
    let err = ClassNode::from_bytes(&bytes, ReaderFlags::empty()).unwrap_err();
    assert!(matches!(
        err,
        ClassFileError::BadBranchTarget { target: 100, .. }
    ));
    assert!(err.is_malformed());
}

#[test]
fn test_bad_this_class_index() {
    let mut bytes = ClassFileBuilder::new("A", None).build();
    // access, this_class and super_class, then empty interface, field, method and attribute counts
    let header = bytes.len() - 14;
    bytes[header + 2] = 0x7f;
    let reader = ClassReader::new(&bytes).unwrap();
    assert!(reader.name().unwrap_err().is_malformed());
}

#[test]
fn test_nest_host_needs_v7() {
    let mut builder = ClassFileBuilder::new("Outer$Inner", Some("java/lang/Object"));
    let host = builder.class("Outer");
    builder.attribute("NestHost", host.to_be_bytes());
    let node = ClassNode::from_bytes(&builder.build(), ReaderFlags::empty()).unwrap();
    assert_eq!(Some(JavaStr::from_str("Outer")), node.nest_host.as_deref());
    node.check(Api::V7).unwrap();
    let err = node.check(Api::V6).unwrap_err();
    assert!(matches!(
        err,
        ClassFileError::UnsupportedApi {
            required: Api::V7,
            requested: Api::V6,
            ..
        }
    ));
}

/// An `invokedynamic` whose bootstrap arguments include a dynamic constant.
fn dynamic_argument() -> Vec<u8> {
    let mut builder = ClassFileBuilder::new("Indy", Some("java/lang/Object"));
    builder.version(55, 0);
    let bsm = builder.method_ref("Bootstraps", "bsm", "()Ljava/lang/invoke/CallSite;");
    // REF_invokeStatic
    let handle = builder.method_handle(6, bsm);
    let constant = builder.dynamic(0, "value", "I");
    let call_site = builder.invoke_dynamic(1, "run", "()V");

    let mut bootstrap_methods = Vec::new();
    for value in [2, handle, 0, handle, 1, constant] {
        bootstrap_methods.extend_from_slice(&value.to_be_bytes());
    }
    let [high, low] = call_site.to_be_bytes();
    let code = Code::new(0, 0, [0xba, high, low, 0, 0, 0xb1]);
    builder.method(ACC_STATIC, "f", "()V", Some(code));
    builder.attribute("BootstrapMethods", bootstrap_methods);
    builder.build()
}

#[test]
fn test_dynamic_bootstrap_argument_needs_v7() {
    let bytes = dynamic_argument();
    let reader = ClassReader::new(&bytes).unwrap();
    for (api, supported) in [(Api::V6, false), (Api::V7, true)] {
        let mut recorder = ClassRecorder {
            events: Events::default(),
            skip: "",
            api,
        };
        let result = reader.accept(&mut recorder, ReaderFlags::empty());
        if supported {
            result.unwrap();
        } else {
            assert!(matches!(
                result,
                Err(ClassFileError::UnsupportedApi {
                    required: Api::V7,
                    requested: Api::V6,
                    ..
                })
            ));
        }
    }
}
