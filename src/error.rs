use crate::{Api, ConstantPoolTag, Label};
use java_string::{JavaString, Utf8Error};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassFileError {
    #[error("bad annotation tag {tag} at offset {offset}")]
    BadAnnotationTag { tag: u8, offset: usize },
    #[error("bad attribute length at offset {offset}")]
    BadAttributeLength { offset: usize },
    #[error("branch target {target} out of the code array, at offset {offset}")]
    BadBranchTarget { target: i64, offset: usize },
    #[error("bad constant pool index: {index}, len {len}")]
    BadConstantPoolIndex { index: u16, len: usize },
    #[error("no entry at constant pool index: {0}")]
    BadConstantPoolIndexNoEntry(u16),
    #[error("bad constant pool tag {tag} at offset {offset}")]
    BadConstantPoolTag { tag: u8, offset: usize },
    #[error("bad constant pool tag: {actual}, expected {expected}")]
    BadConstantPoolType {
        expected: ConstantPoolTag,
        actual: ConstantPoolTag,
    },
    #[error("bad stack map frame type {frame_type} at offset {offset}")]
    BadFrameType { frame_type: u8, offset: usize },
    #[error("bad handle kind: {0}")]
    BadHandleKind(u8),
    #[error("bad magic number")]
    BadMagic,
    #[error("bad opcode {opcode} at offset {offset}")]
    BadOpcode { opcode: u8, offset: usize },
    #[error("bad type annotation target {target} at offset {offset}")]
    BadTypeAnnotationTarget { target: u8, offset: usize },
    #[error("bad verification type {tag} at offset {offset}")]
    BadVerificationType { tag: u8, offset: usize },
    #[error("read past the end of the class file, index {index}, len {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("too deep nesting")]
    TooDeepNesting,
    #[error("unsupported class file version: {0}")]
    UnsupportedVersion(u16),
    #[error("{construct} requires api {required}, but {requested} was requested")]
    UnsupportedApi {
        construct: &'static str,
        required: Api,
        requested: Api,
    },
    #[error("utf8 error: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("code of method {method:?} is too large: {len} bytes")]
    CodeTooLarge { method: JavaString, len: usize },
    #[error("constant pool has too many entries")]
    ConstantPoolOverflow,
    #[error("jump layout of method {method:?} did not converge")]
    JumpLayoutDiverged { method: JavaString },
    #[error("too many {what}")]
    TooManyEntries { what: &'static str },
    #[error("label {label:?} is used in method {method:?} but never visited")]
    UnresolvedLabel { method: JavaString, label: Label },
    #[error("string too long to encode: {len} bytes")]
    Utf8TooLong { len: usize },
}

impl ClassFileError {
    /// Whether this error was caused by an inconsistent input byte sequence.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ClassFileError::BadAnnotationTag { .. }
                | ClassFileError::BadAttributeLength { .. }
                | ClassFileError::BadBranchTarget { .. }
                | ClassFileError::BadConstantPoolIndex { .. }
                | ClassFileError::BadConstantPoolIndexNoEntry(_)
                | ClassFileError::BadConstantPoolTag { .. }
                | ClassFileError::BadConstantPoolType { .. }
                | ClassFileError::BadFrameType { .. }
                | ClassFileError::BadHandleKind(_)
                | ClassFileError::BadMagic
                | ClassFileError::BadOpcode { .. }
                | ClassFileError::BadTypeAnnotationTarget { .. }
                | ClassFileError::BadVerificationType { .. }
                | ClassFileError::OutOfBounds { .. }
                | ClassFileError::TooDeepNesting
                | ClassFileError::Utf8(_)
        )
    }

    /// The byte offset in the input at which the inconsistency was detected, if known.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ClassFileError::BadAnnotationTag { offset, .. }
            | ClassFileError::BadAttributeLength { offset }
            | ClassFileError::BadBranchTarget { offset, .. }
            | ClassFileError::BadConstantPoolTag { offset, .. }
            | ClassFileError::BadFrameType { offset, .. }
            | ClassFileError::BadOpcode { offset, .. }
            | ClassFileError::BadTypeAnnotationTarget { offset, .. }
            | ClassFileError::BadVerificationType { offset, .. } => Some(offset),
            ClassFileError::OutOfBounds { index, .. } => Some(index),
            ClassFileError::BadMagic => Some(0),
            _ => None,
        }
    }
}

pub type ClassFileResult<T> = Result<T, ClassFileError>;
