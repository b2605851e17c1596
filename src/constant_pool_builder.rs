use crate::{
    BootstrapMethodArgument, ByteVector, ClassFileError, ClassFileResult, ClassReader,
    ConstantPoolTag, Handle, LdcConstant,
};
use java_string::{JavaStr, JavaString};
use std::collections::HashMap;

/// Identity of a constant pool entry: its tag and contents, with references to other entries
/// already resolved to indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Utf8(JavaString),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

impl ConstantKey {
    fn is_wide(&self) -> bool {
        matches!(self, ConstantKey::Long(_) | ConstantKey::Double(_))
    }

    fn write(&self, out: &mut ByteVector) -> ClassFileResult<()> {
        fn pair(out: &mut ByteVector, tag: ConstantPoolTag, a: u16, b: u16) {
            out.put_u8(tag as u8);
            out.put_u16(a);
            out.put_u16(b);
        }
        fn single(out: &mut ByteVector, tag: ConstantPoolTag, a: u16) {
            out.put_u8(tag as u8);
            out.put_u16(a);
        }

        match *self {
            ConstantKey::Utf8(ref value) => {
                out.put_u8(ConstantPoolTag::Utf8 as u8);
                out.put_utf8(value)?;
            }
            ConstantKey::Integer(value) => {
                out.put_u8(ConstantPoolTag::Integer as u8);
                out.put_i32(value);
            }
            ConstantKey::Float(bits) => {
                out.put_u8(ConstantPoolTag::Float as u8);
                out.put_u32(bits);
            }
            ConstantKey::Long(value) => {
                out.put_u8(ConstantPoolTag::Long as u8);
                out.put_i64(value);
            }
            ConstantKey::Double(bits) => {
                out.put_u8(ConstantPoolTag::Double as u8);
                out.put_u64(bits);
            }
            ConstantKey::Class(name) => single(out, ConstantPoolTag::Class, name),
            ConstantKey::String(value) => single(out, ConstantPoolTag::String, value),
            ConstantKey::FieldRef(owner, nat) => pair(out, ConstantPoolTag::FieldRef, owner, nat),
            ConstantKey::MethodRef(owner, nat) => {
                pair(out, ConstantPoolTag::MethodRef, owner, nat)
            }
            ConstantKey::InterfaceMethodRef(owner, nat) => {
                pair(out, ConstantPoolTag::InterfaceMethodRef, owner, nat)
            }
            ConstantKey::NameAndType(name, desc) => {
                pair(out, ConstantPoolTag::NameAndType, name, desc)
            }
            ConstantKey::MethodHandle(kind, reference) => {
                out.put_u8(ConstantPoolTag::MethodHandle as u8);
                out.put_u8(kind);
                out.put_u16(reference);
            }
            ConstantKey::MethodType(desc) => single(out, ConstantPoolTag::MethodType, desc),
            ConstantKey::Dynamic(bsm, nat) => pair(out, ConstantPoolTag::Dynamic, bsm, nat),
            ConstantKey::InvokeDynamic(bsm, nat) => {
                pair(out, ConstantPoolTag::InvokeDynamic, bsm, nat)
            }
            ConstantKey::Module(name) => single(out, ConstantPoolTag::Module, name),
            ConstantKey::Package(name) => single(out, ConstantPoolTag::Package, name),
        }
        Ok(())
    }

    /// Rebuilds the key of an entry from its encoded body.
    fn from_raw(tag: ConstantPoolTag, body: &[u8]) -> ClassFileResult<ConstantKey> {
        let u16_at = |i: usize| u16::from_be_bytes([body[i], body[i + 1]]);
        let u32_at =
            |i: usize| u32::from_be_bytes([body[i], body[i + 1], body[i + 2], body[i + 3]]);
        let u64_at = |i: usize| (u32_at(i) as u64) << 32 | u32_at(i + 4) as u64;
        Ok(match tag {
            ConstantPoolTag::Utf8 => {
                ConstantKey::Utf8(JavaStr::from_modified_utf8(&body[2..])?.into_owned())
            }
            ConstantPoolTag::Integer => ConstantKey::Integer(u32_at(0) as i32),
            ConstantPoolTag::Float => ConstantKey::Float(u32_at(0)),
            ConstantPoolTag::Long => ConstantKey::Long(u64_at(0) as i64),
            ConstantPoolTag::Double => ConstantKey::Double(u64_at(0)),
            ConstantPoolTag::Class => ConstantKey::Class(u16_at(0)),
            ConstantPoolTag::String => ConstantKey::String(u16_at(0)),
            ConstantPoolTag::FieldRef => ConstantKey::FieldRef(u16_at(0), u16_at(2)),
            ConstantPoolTag::MethodRef => ConstantKey::MethodRef(u16_at(0), u16_at(2)),
            ConstantPoolTag::InterfaceMethodRef => {
                ConstantKey::InterfaceMethodRef(u16_at(0), u16_at(2))
            }
            ConstantPoolTag::NameAndType => ConstantKey::NameAndType(u16_at(0), u16_at(2)),
            ConstantPoolTag::MethodHandle => {
                ConstantKey::MethodHandle(body[0], u16::from_be_bytes([body[1], body[2]]))
            }
            ConstantPoolTag::MethodType => ConstantKey::MethodType(u16_at(0)),
            ConstantPoolTag::Dynamic => ConstantKey::Dynamic(u16_at(0), u16_at(2)),
            ConstantPoolTag::InvokeDynamic => ConstantKey::InvokeDynamic(u16_at(0), u16_at(2)),
            ConstantPoolTag::Module => ConstantKey::Module(u16_at(0)),
            ConstantPoolTag::Package => ConstantKey::Package(u16_at(0)),
        })
    }
}

/// The constant pool and `BootstrapMethods` table of a class being written.
///
/// Adding a constant that is already present returns the existing index, so every distinct
/// constant is stored exactly once. Entries referenced by an entry are added before it.
#[derive(Debug, Clone)]
pub struct ConstantPoolBuilder {
    entries: HashMap<ConstantKey, u16>,
    data: ByteVector,
    /// The `constant_pool_count`: one more than the highest index in use.
    count: u16,
    bootstrap_methods: HashMap<Vec<u8>, u16>,
    bootstrap_data: ByteVector,
    bootstrap_count: u16,
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        ConstantPoolBuilder::new()
    }
}

impl ConstantPoolBuilder {
    pub fn new() -> ConstantPoolBuilder {
        ConstantPoolBuilder {
            entries: HashMap::new(),
            data: ByteVector::new(),
            count: 1,
            bootstrap_methods: HashMap::new(),
            bootstrap_data: ByteVector::new(),
            bootstrap_count: 0,
        }
    }

    /// Starts from the constant pool and bootstrap methods of `reader`, copied verbatim so that
    /// every index of the original class keeps its meaning. New constants are appended.
    pub fn from_reader(reader: &ClassReader<'_>) -> ClassFileResult<ConstantPoolBuilder> {
        let pool = &reader.constant_pool;
        let mut builder = ConstantPoolBuilder::new();
        builder.data.put_bytes(pool.raw_bytes()?);
        builder.count = pool.len().max(1);

        let mut index = 1;
        while index < pool.len() {
            let (tag, body) = pool.raw_entry(index)?;
            let key = ConstantKey::from_raw(tag, body)?;
            builder.entries.entry(key).or_insert(index);
            index += if tag.is_wide() { 2 } else { 1 };
        }

        for i in 0..pool.bootstrap_method_count() {
            let raw = pool.raw_bootstrap_method(i)?;
            builder.bootstrap_data.put_bytes(raw);
            builder.bootstrap_methods.entry(raw.to_vec()).or_insert(i);
        }
        builder.bootstrap_count = pool.bootstrap_method_count();
        log::trace!(
            "copied {} constant pool slots and {} bootstrap methods",
            builder.count,
            builder.bootstrap_count
        );
        Ok(builder)
    }

    fn push_constant(&mut self, key: ConstantKey) -> ClassFileResult<u16> {
        if let Some(&index) = self.entries.get(&key) {
            return Ok(index);
        }
        let width = if key.is_wide() { 2 } else { 1 };
        let index = self.count;
        if index as u32 + width > u16::MAX as u32 {
            return Err(ClassFileError::ConstantPoolOverflow);
        }
        key.write(&mut self.data)?;
        self.entries.insert(key, index);
        self.count += width as u16;
        Ok(index)
    }

    pub fn add_utf8(&mut self, value: &JavaStr) -> ClassFileResult<u16> {
        self.push_constant(ConstantKey::Utf8(value.to_owned()))
    }

    pub fn add_integer(&mut self, value: i32) -> ClassFileResult<u16> {
        self.push_constant(ConstantKey::Integer(value))
    }

    /// Floats are compared by bit pattern, so `-0.0` and every NaN payload stay distinct.
    pub fn add_float(&mut self, value: f32) -> ClassFileResult<u16> {
        self.push_constant(ConstantKey::Float(value.to_bits()))
    }

    pub fn add_long(&mut self, value: i64) -> ClassFileResult<u16> {
        self.push_constant(ConstantKey::Long(value))
    }

    pub fn add_double(&mut self, value: f64) -> ClassFileResult<u16> {
        self.push_constant(ConstantKey::Double(value.to_bits()))
    }

    pub fn add_class(&mut self, name: &JavaStr) -> ClassFileResult<u16> {
        let name = self.add_utf8(name)?;
        self.push_constant(ConstantKey::Class(name))
    }

    pub fn add_string(&mut self, value: &JavaStr) -> ClassFileResult<u16> {
        let value = self.add_utf8(value)?;
        self.push_constant(ConstantKey::String(value))
    }

    pub fn add_name_and_type(&mut self, name: &JavaStr, desc: &JavaStr) -> ClassFileResult<u16> {
        let name = self.add_utf8(name)?;
        let desc = self.add_utf8(desc)?;
        self.push_constant(ConstantKey::NameAndType(name, desc))
    }

    pub fn add_field_ref(
        &mut self,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
    ) -> ClassFileResult<u16> {
        let owner = self.add_class(owner)?;
        let name_and_type = self.add_name_and_type(name, desc)?;
        self.push_constant(ConstantKey::FieldRef(owner, name_and_type))
    }

    /// Adds a `Methodref`, or an `InterfaceMethodref` if `is_interface` is set.
    pub fn add_method_ref(
        &mut self,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
        is_interface: bool,
    ) -> ClassFileResult<u16> {
        let owner = self.add_class(owner)?;
        let name_and_type = self.add_name_and_type(name, desc)?;
        if is_interface {
            self.push_constant(ConstantKey::InterfaceMethodRef(owner, name_and_type))
        } else {
            self.push_constant(ConstantKey::MethodRef(owner, name_and_type))
        }
    }

    pub fn add_method_handle(&mut self, handle: &Handle<'_>) -> ClassFileResult<u16> {
        let reference = if handle.kind.is_field() {
            self.add_field_ref(&handle.owner, &handle.name, &handle.desc)?
        } else {
            self.add_method_ref(
                &handle.owner,
                &handle.name,
                &handle.desc,
                handle.is_interface,
            )?
        };
        self.push_constant(ConstantKey::MethodHandle(handle.kind as u8, reference))
    }

    pub fn add_method_type(&mut self, desc: &JavaStr) -> ClassFileResult<u16> {
        let desc = self.add_utf8(desc)?;
        self.push_constant(ConstantKey::MethodType(desc))
    }

    pub fn add_invoke_dynamic(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        bootstrap_method: &Handle<'_>,
        arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<u16> {
        let bootstrap_method = self.add_bootstrap_method(bootstrap_method, arguments)?;
        let name_and_type = self.add_name_and_type(name, desc)?;
        self.push_constant(ConstantKey::InvokeDynamic(bootstrap_method, name_and_type))
    }

    pub fn add_constant_dynamic(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        bootstrap_method: &Handle<'_>,
        arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<u16> {
        let bootstrap_method = self.add_bootstrap_method(bootstrap_method, arguments)?;
        let name_and_type = self.add_name_and_type(name, desc)?;
        self.push_constant(ConstantKey::Dynamic(bootstrap_method, name_and_type))
    }

    pub fn add_module(&mut self, name: &JavaStr) -> ClassFileResult<u16> {
        let name = self.add_utf8(name)?;
        self.push_constant(ConstantKey::Module(name))
    }

    pub fn add_package(&mut self, name: &JavaStr) -> ClassFileResult<u16> {
        let name = self.add_utf8(name)?;
        self.push_constant(ConstantKey::Package(name))
    }

    /// Adds any loadable constant, the operand of `ldc` or a bootstrap method argument.
    pub fn add_constant(&mut self, constant: &LdcConstant<'_>) -> ClassFileResult<u16> {
        match constant {
            LdcConstant::Integer(value) => self.add_integer(*value),
            LdcConstant::Float(value) => self.add_float(*value),
            LdcConstant::Long(value) => self.add_long(*value),
            LdcConstant::Double(value) => self.add_double(*value),
            LdcConstant::String(value) => self.add_string(value),
            LdcConstant::Class(name) => self.add_class(name),
            LdcConstant::MethodType(desc) => self.add_method_type(desc),
            LdcConstant::Handle(handle) => self.add_method_handle(handle),
            LdcConstant::ConstantDynamic(constant) => self.add_constant_dynamic(
                &constant.name,
                &constant.desc,
                &constant.bootstrap_method,
                &constant.bootstrap_method_arguments,
            ),
        }
    }

    /// Adds an entry to the `BootstrapMethods` table, returning its index in the table.
    pub fn add_bootstrap_method(
        &mut self,
        handle: &Handle<'_>,
        arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<u16> {
        let mut entry = ByteVector::with_capacity(4 + arguments.len() * 2);
        entry.put_u16(self.add_method_handle(handle)?);
        entry.put_u16(u16::try_from(arguments.len()).map_err(|_| {
            ClassFileError::TooManyEntries {
                what: "bootstrap method arguments",
            }
        })?);
        for argument in arguments {
            entry.put_u16(self.add_constant(argument)?);
        }
        let entry = entry.into_vec();
        if let Some(&index) = self.bootstrap_methods.get(&entry) {
            return Ok(index);
        }
        if self.bootstrap_count == u16::MAX {
            return Err(ClassFileError::TooManyEntries {
                what: "bootstrap methods",
            });
        }
        let index = self.bootstrap_count;
        self.bootstrap_data.put_bytes(&entry);
        self.bootstrap_methods.insert(entry, index);
        self.bootstrap_count += 1;
        Ok(index)
    }

    /// The `constant_pool_count` value.
    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn bootstrap_method_count(&self) -> u16 {
        self.bootstrap_count
    }

    /// Writes `constant_pool_count` followed by the entries.
    pub fn write(&self, out: &mut ByteVector) {
        out.put_u16(self.count);
        out.put_bytes(self.data.as_slice());
    }

    /// Writes the contents of the `BootstrapMethods` attribute, without its header.
    pub fn write_bootstrap_methods(&self, out: &mut ByteVector) {
        out.put_u16(self.bootstrap_count);
        out.put_bytes(self.bootstrap_data.as_slice());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::HandleKind;
    use std::borrow::Cow;

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    #[test]
    fn test_dedup() {
        let mut pool = ConstantPoolBuilder::new();
        let a = pool.add_utf8(s("Foo")).unwrap();
        let class = pool.add_class(s("Foo")).unwrap();
        assert_eq!(1, a);
        assert_eq!(2, class);
        assert_eq!(class, pool.add_class(s("Foo")).unwrap());
        assert_eq!(3, pool.count());
    }

    #[test]
    fn test_wide_entries_take_two_slots() {
        let mut pool = ConstantPoolBuilder::new();
        assert_eq!(1, pool.add_long(7).unwrap());
        assert_eq!(3, pool.add_integer(7).unwrap());
        assert_eq!(4, pool.add_double(1.5).unwrap());
        assert_eq!(6, pool.count());
    }

    #[test]
    fn test_floats_by_bits() {
        let mut pool = ConstantPoolBuilder::new();
        let zero = pool.add_float(0.0).unwrap();
        let negative_zero = pool.add_float(-0.0).unwrap();
        assert_ne!(zero, negative_zero);
        assert_eq!(zero, pool.add_float(0.0).unwrap());
    }

    #[test]
    fn test_method_ref_kinds_are_distinct() {
        let mut pool = ConstantPoolBuilder::new();
        let method = pool.add_method_ref(s("A"), s("m"), s("()V"), false).unwrap();
        let interface = pool.add_method_ref(s("A"), s("m"), s("()V"), true).unwrap();
        assert_ne!(method, interface);
    }

    #[test]
    fn test_bootstrap_methods_dedup() {
        let mut pool = ConstantPoolBuilder::new();
        let handle = Handle {
            kind: HandleKind::InvokeStatic,
            owner: Cow::Borrowed(s("Boot")),
            name: Cow::Borrowed(s("bsm")),
            desc: Cow::Borrowed(s("()V")),
            is_interface: false,
        };
        let args = [LdcConstant::Integer(1)];
        let first = pool.add_invoke_dynamic(s("run"), s("()V"), &handle, &args).unwrap();
        let second = pool.add_invoke_dynamic(s("run"), s("()V"), &handle, &args).unwrap();
        assert_eq!(first, second);
        assert_eq!(1, pool.bootstrap_method_count());
        pool.add_bootstrap_method(&handle, &[]).unwrap();
        assert_eq!(2, pool.bootstrap_method_count());
    }

    #[test]
    fn test_overflow() {
        let mut pool = ConstantPoolBuilder::new();
        for i in 0..65534 {
            pool.add_integer(i).unwrap();
        }
        assert_eq!(65535, pool.count());
        assert!(matches!(
            pool.add_integer(-1),
            Err(ClassFileError::ConstantPoolOverflow)
        ));
        // existing constants are still found
        assert_eq!(1, pool.add_integer(0).unwrap());
    }
}
