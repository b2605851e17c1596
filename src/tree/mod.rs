//! An in-memory representation of a class, built by visiting it and replayed with `accept`.
//!
//! Every node owns its data, so a tree outlives the bytes it was read from.

mod annotation;
mod class;
mod field;
mod insn;
mod insn_list;
mod method;
mod module;
mod record_component;

pub use annotation::{
    AnnotationNode, AnnotationValue, LocalVariableAnnotationNode, TypeAnnotationNode,
};
pub use class::*;
pub use field::*;
pub use insn::*;
pub use insn_list::*;
pub use method::*;
pub use module::*;
pub use record_component::*;

use crate::{Api, ClassFileError, ClassFileResult};

/// Fails if `construct`, introduced in `required`, cannot be sent to a visitor of version `api`.
pub(crate) fn check_api(api: Api, required: Api, construct: &'static str) -> ClassFileResult<()> {
    if api >= required {
        Ok(())
    } else {
        Err(ClassFileError::UnsupportedApi {
            construct,
            required,
            requested: api,
        })
    }
}
