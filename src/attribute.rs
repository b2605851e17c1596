use crate::{ClassBuffer, ClassFileResult, ClassReader, ConstantPoolBuilder};
use java_string::{JavaStr, JavaString};
use std::any::Any;
use std::fmt::Debug;

/// An attribute the library doesn't interpret itself.
///
/// Custom attributes are decoded by [`AttributeReader`]s registered on the [`ClassReader`] and
/// encoded by [`Attribute::write`].
pub trait Attribute: Any + Debug {
    fn name(&self) -> &JavaStr;

    fn copy(&self) -> Box<dyn Attribute>;

    /// Whether the attribute belongs to a `Code` attribute rather than to a class, field or method.
    fn is_code_attribute(&self) -> bool {
        false
    }

    /// Encodes the attribute contents, without the name index and length header.
    fn write(&self, constant_pool: &mut ConstantPoolBuilder) -> ClassFileResult<Vec<u8>>;
}

impl Clone for Box<dyn Attribute> {
    fn clone(&self) -> Box<dyn Attribute> {
        self.copy()
    }
}

pub trait AttributeReader: Debug + 'static {
    /// Decodes the attribute named `name`, or returns `None` if this reader doesn't handle it.
    fn read<'class>(
        &self,
        name: &JavaStr,
        reader: &ClassReader<'class>,
        data: ClassBuffer<'class>,
    ) -> ClassFileResult<Option<Box<dyn Attribute>>>;

    fn copy(&self) -> Box<dyn AttributeReader>;
}

impl Clone for Box<dyn AttributeReader> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// The raw contents of an attribute no registered reader recognized.
///
/// Constant pool indices inside `data` are only meaningful when the writer shares the reader's
/// constant pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnknownAttribute {
    pub name: JavaString,
    pub data: Vec<u8>,
    pub in_code: bool,
}

impl Attribute for UnknownAttribute {
    fn name(&self) -> &JavaStr {
        &self.name
    }

    fn copy(&self) -> Box<dyn Attribute> {
        Box::new(self.clone())
    }

    fn is_code_attribute(&self) -> bool {
        self.in_code
    }

    fn write(&self, _constant_pool: &mut ConstantPoolBuilder) -> ClassFileResult<Vec<u8>> {
        Ok(self.data.clone())
    }
}
