use crate::{
    BootstrapMethodArgument, ClassBuffer, ClassFileError, ClassFileResult, ConstantDynamic, Handle,
    HandleKind, LdcConstant,
};
use java_string::JavaStr;
use std::borrow::Cow;
use strum::{Display, FromRepr};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum ConstantPoolTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl ConstantPoolTag {
    pub fn from_u8(tag: u8, offset: usize) -> ClassFileResult<ConstantPoolTag> {
        Self::from_repr(tag).ok_or(ClassFileError::BadConstantPoolTag { tag, offset })
    }

    /// Whether the entry takes two constant pool slots.
    pub fn is_wide(self) -> bool {
        matches!(self, ConstantPoolTag::Long | ConstantPoolTag::Double)
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ConstantPoolEntry<'class> {
    Utf8(Cow<'class, JavaStr>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(Cow<'class, JavaStr>),
    String(Cow<'class, JavaStr>),
    FieldRef(MemberRef<'class>),
    MethodRef(MemberRef<'class>),
    InterfaceMethodRef(MemberRef<'class>),
    NameAndType(NameAndType<'class>),
    MethodHandle(Handle<'class>),
    MethodType(Cow<'class, JavaStr>),
    Dynamic(DynamicEntry<'class>),
    InvokeDynamic(DynamicEntry<'class>),
    Module(Cow<'class, JavaStr>),
    Package(Cow<'class, JavaStr>),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameAndType<'class> {
    pub name: Cow<'class, JavaStr>,
    pub desc: Cow<'class, JavaStr>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberRef<'class> {
    pub owner: Cow<'class, JavaStr>,
    pub name: Cow<'class, JavaStr>,
    pub desc: Cow<'class, JavaStr>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynamicEntry<'class> {
    pub bootstrap_method_attr_index: u16,
    pub name: Cow<'class, JavaStr>,
    pub desc: Cow<'class, JavaStr>,
}

/// Nesting limit for dynamic constants used as bootstrap arguments of other dynamic constants.
const MAX_DYNAMIC_DEPTH: usize = 64;

#[derive(Clone)]
pub struct ConstantPool<'class> {
    buffer: ClassBuffer<'class>,
    offset: Box<[usize]>,
    end: usize,
    bootstrap_methods: Box<[usize]>,
}

impl std::fmt::Debug for ConstantPool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantPool")
            .field("count", &self.offset.len())
            .field("bootstrap_methods", &self.bootstrap_methods.len())
            .finish()
    }
}

impl<'class> ConstantPool<'class> {
    pub(crate) fn new(
        buffer: ClassBuffer<'class>,
    ) -> ClassFileResult<(ConstantPool<'class>, usize)> {
        let constant_pool_count = buffer.read_u16(8)? as usize;
        let mut cp_offset = vec![0; constant_pool_count].into_boxed_slice();
        let mut current_offset = 10;
        let mut i = 1;
        while i < constant_pool_count {
            cp_offset[i] = current_offset;
            let tag = ConstantPoolTag::from_u8(buffer.read_u8(current_offset)?, current_offset)?;
            current_offset += 1;
            match tag {
                ConstantPoolTag::Class
                | ConstantPoolTag::MethodType
                | ConstantPoolTag::Module
                | ConstantPoolTag::String
                | ConstantPoolTag::Package => current_offset += 2,
                ConstantPoolTag::MethodHandle => current_offset += 3,
                ConstantPoolTag::Dynamic
                | ConstantPoolTag::FieldRef
                | ConstantPoolTag::Float
                | ConstantPoolTag::Integer
                | ConstantPoolTag::InterfaceMethodRef
                | ConstantPoolTag::InvokeDynamic
                | ConstantPoolTag::MethodRef
                | ConstantPoolTag::NameAndType => current_offset += 4,
                ConstantPoolTag::Double | ConstantPoolTag::Long => {
                    current_offset += 8;
                    i += 1;
                    if i >= constant_pool_count {
                        return Err(ClassFileError::BadConstantPoolIndex {
                            index: i as u16,
                            len: constant_pool_count,
                        });
                    }
                }
                ConstantPoolTag::Utf8 => {
                    current_offset += 2 + buffer.read_u16(current_offset)? as usize
                }
            }
            i += 1;
        }

        let constant_pool = ConstantPool {
            buffer,
            offset: cp_offset,
            end: current_offset,
            bootstrap_methods: Box::default(),
        };
        Ok((constant_pool, current_offset))
    }

    /// Indexes the entries of a `BootstrapMethods` attribute whose contents start at `offset`.
    pub(crate) fn set_bootstrap_methods(&mut self, offset: usize) -> ClassFileResult<()> {
        let count = self.buffer.read_u16(offset)? as usize;
        let mut offsets = Vec::with_capacity(count);
        let mut current_offset = offset + 2;
        for _ in 0..count {
            offsets.push(current_offset);
            let num_arguments = self.buffer.read_u16(current_offset + 2)? as usize;
            current_offset += 4 + num_arguments * 2;
        }
        self.bootstrap_methods = offsets.into_boxed_slice();
        Ok(())
    }

    /// The `constant_pool_count` value: one more than the highest index.
    pub fn len(&self) -> u16 {
        self.offset.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.offset.len() <= 1
    }

    pub fn bootstrap_method_count(&self) -> u16 {
        self.bootstrap_methods.len() as u16
    }

    /// The encoded entries, exactly as they appear in the class file.
    pub(crate) fn raw_bytes(&self) -> ClassFileResult<&'class [u8]> {
        self.buffer.read_bytes(10, self.end - 10)
    }

    /// The tag of an entry and the bytes following it.
    pub(crate) fn raw_entry(&self, index: u16) -> ClassFileResult<(ConstantPoolTag, &'class [u8])> {
        let offset = self.index_to_offset(index)?;
        let tag = self.read_tag(offset)?;
        let len = match tag {
            ConstantPoolTag::Utf8 => 2 + self.buffer.read_u16(offset + 1)? as usize,
            ConstantPoolTag::Class
            | ConstantPoolTag::MethodType
            | ConstantPoolTag::Module
            | ConstantPoolTag::String
            | ConstantPoolTag::Package => 2,
            ConstantPoolTag::MethodHandle => 3,
            ConstantPoolTag::Double | ConstantPoolTag::Long => 8,
            _ => 4,
        };
        Ok((tag, self.buffer.read_bytes(offset + 1, len)?))
    }

    /// The raw bytes of a bootstrap method entry: method handle index, argument count, arguments.
    pub(crate) fn raw_bootstrap_method(&self, index: u16) -> ClassFileResult<&'class [u8]> {
        let offset = self.bootstrap_method_offset(index)?;
        let num_arguments = self.buffer.read_u16(offset + 2)? as usize;
        self.buffer.read_bytes(offset, 4 + num_arguments * 2)
    }

    fn bootstrap_method_offset(&self, index: u16) -> ClassFileResult<usize> {
        self.bootstrap_methods
            .get(index as usize)
            .copied()
            .ok_or(ClassFileError::BadConstantPoolIndexNoEntry(index))
    }

    fn read_tag(&self, offset: usize) -> ClassFileResult<ConstantPoolTag> {
        ConstantPoolTag::from_u8(self.buffer.read_u8(offset)?, offset)
    }

    /// Resolves a bootstrap method: its handle and its static arguments.
    pub fn get_bootstrap_method(
        &self,
        index: u16,
    ) -> ClassFileResult<(Handle<'class>, Vec<BootstrapMethodArgument<'class>>)> {
        self.get_bootstrap_method_at_depth(index, 0)
    }

    fn get_bootstrap_method_at_depth(
        &self,
        index: u16,
        depth: usize,
    ) -> ClassFileResult<(Handle<'class>, Vec<BootstrapMethodArgument<'class>>)> {
        if depth > MAX_DYNAMIC_DEPTH {
            return Err(ClassFileError::TooDeepNesting);
        }
        let offset = self.bootstrap_method_offset(index)?;
        let handle = self.get_method_handle(self.buffer.read_u16(offset)?)?;
        let num_arguments = self.buffer.read_u16(offset + 2)? as usize;
        let mut arguments = Vec::with_capacity(num_arguments);
        for i in 0..num_arguments {
            let argument_index = self.buffer.read_u16(offset + 4 + i * 2)?;
            arguments.push(self.get_ldc_constant_at_depth(argument_index, depth + 1)?);
        }
        Ok((handle, arguments))
    }

    /// Reads any loadable entry, the operand of `ldc` and bootstrap method arguments.
    pub fn get_ldc_constant(&self, index: u16) -> ClassFileResult<LdcConstant<'class>> {
        self.get_ldc_constant_at_depth(index, 0)
    }

    fn get_ldc_constant_at_depth(
        &self,
        index: u16,
        depth: usize,
    ) -> ClassFileResult<LdcConstant<'class>> {
        let offset = self.index_to_offset(index)?;
        Ok(match self.read_tag(offset)? {
            ConstantPoolTag::Integer => LdcConstant::Integer(self.get_i32(index)?),
            ConstantPoolTag::Float => LdcConstant::Float(self.get_f32(index)?),
            ConstantPoolTag::Long => LdcConstant::Long(self.get_i64(index)?),
            ConstantPoolTag::Double => LdcConstant::Double(self.get_f64(index)?),
            ConstantPoolTag::String => LdcConstant::String(self.get_string(index)?),
            ConstantPoolTag::Class => LdcConstant::Class(self.get_class(index)?),
            ConstantPoolTag::MethodType => LdcConstant::MethodType(self.get_method_type(index)?),
            ConstantPoolTag::MethodHandle => LdcConstant::Handle(self.get_method_handle(index)?),
            ConstantPoolTag::Dynamic => {
                LdcConstant::ConstantDynamic(self.get_constant_dynamic_at_depth(index, depth)?)
            }
            actual => {
                return Err(ClassFileError::BadConstantPoolType {
                    expected: ConstantPoolTag::Integer,
                    actual,
                })
            }
        })
    }

    pub fn get_constant_dynamic(&self, index: u16) -> ClassFileResult<ConstantDynamic<'class>> {
        self.get_constant_dynamic_at_depth(index, 0)
    }

    fn get_constant_dynamic_at_depth(
        &self,
        index: u16,
        depth: usize,
    ) -> ClassFileResult<ConstantDynamic<'class>> {
        let entry = self.get_dynamic(index)?;
        let (bootstrap_method, bootstrap_method_arguments) =
            self.get_bootstrap_method_at_depth(entry.bootstrap_method_attr_index, depth + 1)?;
        Ok(ConstantDynamic {
            name: entry.name,
            desc: entry.desc,
            bootstrap_method,
            bootstrap_method_arguments,
        })
    }

    /// Reads a `Methodref` or `InterfaceMethodref`, also returning whether it was the latter.
    pub fn get_any_method_ref(&self, index: u16) -> ClassFileResult<(MemberRef<'class>, bool)> {
        let offset = self.index_to_offset(index)?;
        match self.read_tag(offset)? {
            ConstantPoolTag::MethodRef => Ok((self.get_method_ref(index)?, false)),
            ConstantPoolTag::InterfaceMethodRef => {
                Ok((self.get_interface_method_ref(index)?, true))
            }
            actual => Err(ClassFileError::BadConstantPoolType {
                expected: ConstantPoolTag::MethodRef,
                actual,
            }),
        }
    }

    fn index_to_offset(&self, index: u16) -> ClassFileResult<usize> {
        match self.offset.get(index as usize) {
            Some(&0) => Err(ClassFileError::BadConstantPoolIndexNoEntry(index)),
            Some(&offset) => Ok(offset),
            None => Err(ClassFileError::BadConstantPoolIndex {
                index,
                len: self.offset.len(),
            }),
        }
    }

    pub fn get_type(&self, index: u16) -> ClassFileResult<ConstantPoolTag> {
        let offset = self.index_to_offset(index)?;
        self.read_tag(offset)
    }

    pub fn get_utf8_as_bytes(&self, index: u16) -> ClassFileResult<&'class [u8]> {
        let offset = self.index_to_offset(index)?;
        let tag = self.read_tag(offset)?;

        if tag != ConstantPoolTag::Utf8 {
            return Err(ClassFileError::BadConstantPoolType {
                expected: ConstantPoolTag::Utf8,
                actual: tag,
            });
        }

        let len = self.buffer.read_u16(offset + 1)?;
        self.buffer.read_bytes(offset + 3, len as usize)
    }
}

macro_rules! generate_getters {
    ($($tag:ident, $getter:ident, $opt_getter:ident: $ty:ty => $read:expr;)*) => {
        impl<'class> ConstantPool<'class> {
            pub fn get(&self, index: u16) -> ClassFileResult<ConstantPoolEntry<'class>> {
                let offset = self.index_to_offset(index)?;
                let tag = self.read_tag(offset)?;

                match tag {
                    $(
                    ConstantPoolTag::$tag => Ok(ConstantPoolEntry::$tag($read(self, offset)?)),
                    )*
                }
            }

            $(
            pub fn $getter(&self, index: u16) -> ClassFileResult<$ty> {
                let offset = self.index_to_offset(index)?;
                let tag = self.read_tag(offset)?;

                if tag != ConstantPoolTag::$tag {
                    return Err(ClassFileError::BadConstantPoolType { expected: ConstantPoolTag::$tag, actual: tag });
                }

                $read(self, offset)
            }

            pub fn $opt_getter(&self, index: u16) -> ClassFileResult<Option<$ty>> {
                if index == 0 {
                    return Ok(None);
                }
                self.$getter(index).map(Some)
            }
            )*
        }
    }
}

generate_getters! {
    Utf8, get_utf8, get_optional_utf8: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        let len = this.buffer.read_u16(offset + 1)?;
        Ok(JavaStr::from_modified_utf8(this.buffer.read_bytes(offset + 3, len as usize)?)?)
    };
    Integer, get_i32, get_optional_i32: i32 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<i32> {
        this.buffer.read_i32(offset + 1)
    };
    Float, get_f32, get_optional_f32: f32 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<f32> {
        this.buffer.read_f32(offset + 1)
    };
    Long, get_i64, get_optional_i64: i64 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<i64> {
        this.buffer.read_i64(offset + 1)
    };
    Double, get_f64, get_optional_f64: f64 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<f64> {
        this.buffer.read_f64(offset + 1)
    };
    Class, get_class, get_optional_class: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        this.get_utf8(this.buffer.read_u16(offset + 1)?)
    };
    String, get_string, get_optional_string: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        this.get_utf8(this.buffer.read_u16(offset + 1)?)
    };
    FieldRef, get_field_ref, get_optional_field_ref: MemberRef<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MemberRef<'class>> {
        let owner = this.get_class(this.buffer.read_u16(offset + 1)?)?;
        let name_and_type = this.get_name_and_type(this.buffer.read_u16(offset + 3)?)?;
        Ok(MemberRef { owner, name: name_and_type.name, desc: name_and_type.desc })
    };
    MethodRef, get_method_ref, get_optional_method_ref: MemberRef<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MemberRef<'class>> {
        let owner = this.get_class(this.buffer.read_u16(offset + 1)?)?;
        let name_and_type = this.get_name_and_type(this.buffer.read_u16(offset + 3)?)?;
        Ok(MemberRef { owner, name: name_and_type.name, desc: name_and_type.desc })
    };
    InterfaceMethodRef, get_interface_method_ref, get_optional_interface_method_ref: MemberRef<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MemberRef<'class>> {
        let owner = this.get_class(this.buffer.read_u16(offset + 1)?)?;
        let name_and_type = this.get_name_and_type(this.buffer.read_u16(offset + 3)?)?;
        Ok(MemberRef { owner, name: name_and_type.name, desc: name_and_type.desc })
    };
    NameAndType, get_name_and_type, get_optional_name_and_type: NameAndType<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<NameAndType<'class>> {
        let name = this.get_utf8(this.buffer.read_u16(offset + 1)?)?;
        let desc = this.get_utf8(this.buffer.read_u16(offset + 3)?)?;
        Ok(NameAndType { name, desc })
    };
    MethodHandle, get_method_handle, get_optional_method_handle: Handle<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Handle<'class>> {
        let kind = HandleKind::from_u8(this.buffer.read_u8(offset + 1)?)?;
        let ref_index = this.buffer.read_u16(offset + 2)?;
        let (member_ref, is_interface) = match kind {
            HandleKind::GetField | HandleKind::GetStatic | HandleKind::PutField | HandleKind::PutStatic => (this.get_field_ref(ref_index)?, false),
            HandleKind::InvokeVirtual | HandleKind::NewInvokeSpecial => (this.get_method_ref(ref_index)?, false),
            HandleKind::InvokeInterface => (this.get_interface_method_ref(ref_index)?, true),
            HandleKind::InvokeStatic | HandleKind::InvokeSpecial => {
                let offset = this.index_to_offset(ref_index)?;
                let tag = this.read_tag(offset)?;

                if tag != ConstantPoolTag::MethodRef && tag != ConstantPoolTag::InterfaceMethodRef {
                    return Err(ClassFileError::BadConstantPoolType { expected: ConstantPoolTag::MethodRef, actual: tag });
                }

                let owner = this.get_class(this.buffer.read_u16(offset + 1)?)?;
                let name_and_type = this.get_name_and_type(this.buffer.read_u16(offset + 3)?)?;
                (MemberRef { owner, name: name_and_type.name, desc: name_and_type.desc }, tag == ConstantPoolTag::InterfaceMethodRef)
            }
        };
        Ok(Handle { kind, owner: member_ref.owner, name: member_ref.name, desc: member_ref.desc, is_interface })
    };
    MethodType, get_method_type, get_optional_method_type: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        this.get_utf8(this.buffer.read_u16(offset + 1)?)
    };
    Dynamic, get_dynamic, get_optional_dynamic: DynamicEntry<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<DynamicEntry<'class>> {
        let bootstrap_method_attr_index = this.buffer.read_u16(offset + 1)?;
        let name_and_type = this.get_name_and_type(this.buffer.read_u16(offset + 3)?)?;
        Ok(DynamicEntry { bootstrap_method_attr_index, name: name_and_type.name, desc: name_and_type.desc })
    };
    InvokeDynamic, get_invoke_dynamic, get_optional_invoke_dynamic: DynamicEntry<'class> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<DynamicEntry<'class>> {
        let bootstrap_method_attr_index = this.buffer.read_u16(offset + 1)?;
        let name_and_type = this.get_name_and_type(this.buffer.read_u16(offset + 3)?)?;
        Ok(DynamicEntry { bootstrap_method_attr_index, name: name_and_type.name, desc: name_and_type.desc })
    };
    Module, get_module, get_optional_module: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        this.get_utf8(this.buffer.read_u16(offset + 1)?)
    };
    Package, get_package, get_optional_package: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        this.get_utf8(this.buffer.read_u16(offset + 1)?)
    };
}

impl<'a, 'class> IntoIterator for &'a ConstantPool<'class> {
    type Item = ClassFileResult<ConstantPoolEntry<'class>>;
    type IntoIter = ConstantPoolIntoIter<'a, 'class>;

    fn into_iter(self) -> Self::IntoIter {
        ConstantPoolIntoIter {
            constant_pool: self,
            index: 0,
        }
    }
}

#[derive(Copy, Clone)]
pub struct ConstantPoolIntoIter<'a, 'class> {
    constant_pool: &'a ConstantPool<'class>,
    index: u16,
}

impl<'class> Iterator for ConstantPoolIntoIter<'_, 'class> {
    type Item = ClassFileResult<ConstantPoolEntry<'class>>;

    fn next(&mut self) -> Option<Self::Item> {
        let cp_max = self.constant_pool.offset.len().saturating_sub(1) as u16;

        if self.index == cp_max {
            return None;
        }

        self.index += 1;

        if self.constant_pool.offset[self.index as usize] == 0 && self.index < cp_max {
            self.index += 1;
        }

        if self.constant_pool.offset[self.index as usize] == 0 {
            return None;
        }

        Some(self.constant_pool.get(self.index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // lowest case: every entry takes 2 slots, (len - 1) / 2
        // highest case: no entry takes 2 slots, len - 1
        let slots = self.constant_pool.offset.len().saturating_sub(1);
        (slots / 2, Some(slots))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pool_bytes() -> Vec<u8> {
        let mut bytes = vec![0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 52, 0, 5];
        bytes.extend_from_slice(&[1, 0, 1, b'A']);
        bytes.extend_from_slice(&[7, 0, 1]);
        bytes.extend_from_slice(&[5, 0, 0, 0, 0, 0, 0, 0, 42]);
        bytes
    }

    #[test]
    fn test_entries() {
        let bytes = pool_bytes();
        let (pool, end) = ConstantPool::new(ClassBuffer::new(&bytes)).unwrap();
        assert_eq!(bytes.len(), end);
        assert_eq!(5, pool.len());
        assert_eq!(
            Cow::Borrowed(JavaStr::from_str("A")),
            pool.get_class(2).unwrap()
        );
        assert_eq!(LdcConstant::Long(42), pool.get_ldc_constant(3).unwrap());
        assert!(matches!(
            pool.get(4),
            Err(ClassFileError::BadConstantPoolIndexNoEntry(4))
        ));
        assert!(matches!(
            pool.get_utf8(2),
            Err(ClassFileError::BadConstantPoolType {
                expected: ConstantPoolTag::Utf8,
                actual: ConstantPoolTag::Class
            })
        ));
        assert_eq!(3, pool.into_iter().count());
    }

    #[test]
    fn test_bad_tag_reports_offset() {
        let mut bytes = pool_bytes();
        bytes[14] = 2;
        let err = ConstantPool::new(ClassBuffer::new(&bytes)).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(Some(14), err.offset());
    }

    #[test]
    fn test_raw_entry() {
        let bytes = pool_bytes();
        let (pool, _) = ConstantPool::new(ClassBuffer::new(&bytes)).unwrap();
        let (tag, body) = pool.raw_entry(2).unwrap();
        assert_eq!(ConstantPoolTag::Class, tag);
        assert_eq!(&[0, 1], body);
        assert_eq!(&bytes[10..], pool.raw_bytes().unwrap());
    }
}
