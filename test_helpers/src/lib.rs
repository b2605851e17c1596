//! Hand-assembled class files for tests.
//!
//! The bytes are built here without going through the library's writer, so that the reader is
//! tested against input it did not produce. Strings are written as their UTF-8 bytes, which is
//! only valid modified UTF-8 for text without NUL or supplementary characters.

use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;

/// Constant pool entries are deduplicated, so asking twice for the same constant returns the
/// same index.
#[derive(Debug)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
    entries: HashMap<Vec<u8>, u16>,
}

impl Pool {
    fn entry(&mut self, encoded: Vec<u8>, slots: u16) -> u16 {
        if let Some(&index) = self.entries.get(&encoded) {
            return index;
        }
        let index = self.count;
        self.bytes.extend_from_slice(&encoded);
        self.count += slots;
        self.entries.insert(encoded, index);
        index
    }
}

fn u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

fn with_u16s(tag: u8, values: &[u16]) -> Vec<u8> {
    let mut out = vec![tag];
    for value in values {
        out.extend_from_slice(&u16_be(*value));
    }
    out
}

/// The contents of a `Code` attribute.
#[derive(Debug, Clone, Default)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytecode: Vec<u8>,
    /// `(start_pc, end_pc, handler_pc, catch_type)` entries.
    pub exception_table: Vec<(u16, u16, u16, u16)>,
    /// Sub-attributes as `(name index, contents)`.
    pub attributes: Vec<(u16, Vec<u8>)>,
}

impl Code {
    pub fn new(max_stack: u16, max_locals: u16, bytecode: impl Into<Vec<u8>>) -> Code {
        Code {
            max_stack,
            max_locals,
            bytecode: bytecode.into(),
            ..Code::default()
        }
    }
}

#[derive(Debug)]
pub struct ClassFileBuilder {
    minor_version: u16,
    major_version: u16,
    access: u16,
    pool: Pool,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<(u16, Vec<u8>)>,
}

impl ClassFileBuilder {
    /// A public Java 8 class.
    pub fn new(name: &str, super_name: Option<&str>) -> ClassFileBuilder {
        let mut builder = ClassFileBuilder {
            minor_version: 0,
            major_version: 52,
            access: ACC_PUBLIC | ACC_SUPER,
            pool: Pool {
                bytes: Vec::new(),
                count: 1,
                entries: HashMap::new(),
            },
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        };
        builder.this_class = builder.class(name);
        if let Some(super_name) = super_name {
            builder.super_class = builder.class(super_name);
        }
        builder
    }

    pub fn version(&mut self, major: u16, minor: u16) -> &mut Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    pub fn access(&mut self, access: u16) -> &mut Self {
        self.access = access;
        self
    }

    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        let mut encoded = vec![1];
        encoded.extend_from_slice(&u16_be(value.len() as u16));
        encoded.extend_from_slice(value.as_bytes());
        self.pool.entry(encoded, 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut encoded = vec![3];
        encoded.extend_from_slice(&value.to_be_bytes());
        self.pool.entry(encoded, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut encoded = vec![5];
        encoded.extend_from_slice(&value.to_be_bytes());
        self.pool.entry(encoded, 2)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.pool.entry(with_u16s(7, &[name]), 1)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let value = self.utf8(value);
        self.pool.entry(with_u16s(8, &[value]), 1)
    }

    pub fn name_and_type(&mut self, name: &str, desc: &str) -> u16 {
        let name = self.utf8(name);
        let desc = self.utf8(desc);
        self.pool.entry(with_u16s(12, &[name, desc]), 1)
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, desc: &str) -> u16 {
        let owner = self.class(owner);
        let name_and_type = self.name_and_type(name, desc);
        self.pool.entry(with_u16s(9, &[owner, name_and_type]), 1)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, desc: &str) -> u16 {
        let owner = self.class(owner);
        let name_and_type = self.name_and_type(name, desc);
        self.pool.entry(with_u16s(10, &[owner, name_and_type]), 1)
    }

    pub fn method_handle(&mut self, kind: u8, reference: u16) -> u16 {
        let mut encoded = vec![15, kind];
        encoded.extend_from_slice(&u16_be(reference));
        self.pool.entry(encoded, 1)
    }

    /// A `CONSTANT_Dynamic` using the bootstrap method at `bootstrap` in `BootstrapMethods`.
    pub fn dynamic(&mut self, bootstrap: u16, name: &str, desc: &str) -> u16 {
        let name_and_type = self.name_and_type(name, desc);
        self.pool.entry(with_u16s(17, &[bootstrap, name_and_type]), 1)
    }

    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, desc: &str) -> u16 {
        let name_and_type = self.name_and_type(name, desc);
        self.pool.entry(with_u16s(18, &[bootstrap, name_and_type]), 1)
    }

    /// A field without attributes.
    pub fn field(&mut self, access: u16, name: &str, desc: &str) -> &mut Self {
        let name = self.utf8(name);
        let desc = self.utf8(desc);
        let mut field = Vec::new();
        for value in [access, name, desc, 0] {
            field.extend_from_slice(&u16_be(value));
        }
        self.fields.push(field);
        self
    }

    /// A method, with a `Code` attribute when `code` is given.
    pub fn method(
        &mut self,
        access: u16,
        name: &str,
        desc: &str,
        code: Option<Code>,
    ) -> &mut Self {
        let name = self.utf8(name);
        let desc = self.utf8(desc);
        let mut method = Vec::new();
        for value in [access, name, desc] {
            method.extend_from_slice(&u16_be(value));
        }
        match code {
            Some(code) => {
                let code_name = self.utf8("Code");
                method.extend_from_slice(&u16_be(1));
                push_attribute(&mut method, code_name, &encode_code(&code));
            }
            None => method.extend_from_slice(&u16_be(0)),
        }
        self.methods.push(method);
        self
    }

    /// A class attribute, written in call order.
    pub fn attribute(&mut self, name: &str, contents: impl Into<Vec<u8>>) -> &mut Self {
        let name = self.utf8(name);
        self.attributes.push((name, contents.into()));
        self
    }

    pub fn source_file(&mut self, file: &str) -> &mut Self {
        let file = self.utf8(file);
        self.attribute("SourceFile", u16_be(file))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xcafebabe_u32.to_be_bytes());
        out.extend_from_slice(&u16_be(self.minor_version));
        out.extend_from_slice(&u16_be(self.major_version));
        out.extend_from_slice(&u16_be(self.pool.count));
        out.extend_from_slice(&self.pool.bytes);
        for value in [self.access, self.this_class, self.super_class] {
            out.extend_from_slice(&u16_be(value));
        }
        out.extend_from_slice(&u16_be(self.interfaces.len() as u16));
        for interface in &self.interfaces {
            out.extend_from_slice(&u16_be(*interface));
        }
        for members in [&self.fields, &self.methods] {
            out.extend_from_slice(&u16_be(members.len() as u16));
            for member in members {
                out.extend_from_slice(member);
            }
        }
        out.extend_from_slice(&u16_be(self.attributes.len() as u16));
        for (name, contents) in &self.attributes {
            push_attribute(&mut out, *name, contents);
        }
        out
    }
}

fn push_attribute(out: &mut Vec<u8>, name: u16, contents: &[u8]) {
    out.extend_from_slice(&u16_be(name));
    out.extend_from_slice(&(contents.len() as u32).to_be_bytes());
    out.extend_from_slice(contents);
}

fn encode_code(code: &Code) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&u16_be(code.max_stack));
    out.extend_from_slice(&u16_be(code.max_locals));
    out.extend_from_slice(&(code.bytecode.len() as u32).to_be_bytes());
    out.extend_from_slice(&code.bytecode);
    out.extend_from_slice(&u16_be(code.exception_table.len() as u16));
    for &(start, end, handler, catch_type) in &code.exception_table {
        for value in [start, end, handler, catch_type] {
            out.extend_from_slice(&u16_be(value));
        }
    }
    out.extend_from_slice(&u16_be(code.attributes.len() as u16));
    for (name, contents) in &code.attributes {
        push_attribute(&mut out, *name, contents);
    }
    out
}
