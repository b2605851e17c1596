#![warn(missing_debug_implementations)]

/// Default body of a visitor event: forward to the delegate if there is one. The delegate's
/// `api()` isn't consulted.
macro_rules! forward {
    ($self:ident.$method:ident($($arg:expr),* $(,)?)) => {
        match $self.delegate() {
            Some(delegate) => delegate.$method($($arg),*),
            None => Ok(Default::default()),
        }
    };
}

mod access;
pub mod adapter;
mod annotation_visitor;
mod annotation_writer;
mod attribute;
mod byte_vector;
mod class_reader;
mod class_visitor;
mod class_writer;
mod code_reader;
mod constant_pool;
mod constant_pool_builder;
mod constants;
mod error;
mod field;
mod field_visitor;
mod frame;
mod handle;
mod jump_layout;
mod label;
mod method_visitor;
mod method_writer;
mod module_visitor;
mod opcodes;
mod record_component_visitor;
pub mod tree;
mod type_annotation;

pub use access::*;
pub use annotation_visitor::*;
pub use attribute::*;
pub use byte_vector::*;
pub use class_reader::*;
pub use class_visitor::*;
pub use class_writer::*;
pub use constant_pool::*;
pub use constant_pool_builder::*;
pub use constants::*;
pub use error::*;
pub use field::*;
pub use field_visitor::*;
pub use frame::*;
pub use handle::*;
pub use label::*;
pub use method_visitor::*;
pub use module_visitor::*;
pub use opcodes::*;
pub use record_component_visitor::*;
pub use type_annotation::*;

/// Parses `bytes` and replays the class into `visitor`.
pub fn decode(
    bytes: &[u8],
    visitor: &mut dyn ClassVisitor,
    flags: ReaderFlags,
) -> ClassFileResult<()> {
    ClassReader::new(bytes)?.accept(visitor, flags)
}

/// Runs `producer` against a fresh [`ClassWriter`] and returns the encoded class.
pub fn encode<F>(flags: WriterFlags, producer: F) -> ClassFileResult<Vec<u8>>
where
    F: FnOnce(&mut dyn ClassVisitor) -> ClassFileResult<()>,
{
    let mut writer = ClassWriter::new(flags);
    producer(&mut writer)?;
    writer.to_bytes()
}
