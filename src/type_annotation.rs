use crate::{ByteVector, ClassBuffer, ClassFileError, ClassFileResult};
use derive_more::TryFrom;
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFrom)]
#[repr(u8)]
#[try_from(repr)]
pub(crate) enum TypeReferenceTargetType {
    ClassTypeParameter = 0x00,
    MethodTypeParameter = 0x01,
    ClassExtends = 0x10,
    ClassTypeParameterBound = 0x11,
    MethodTypeParameterBound = 0x12,
    Field = 0x13,
    MethodReturn = 0x14,
    MethodReceiver = 0x15,
    MethodFormalParameter = 0x16,
    Throws = 0x17,
    LocalVariable = 0x40,
    ResourceVariable = 0x41,
    ExceptionParameter = 0x42,
    Instanceof = 0x43,
    New = 0x44,
    ConstructorReference = 0x45,
    MethodReference = 0x46,
    Cast = 0x47,
    ConstructorInvocationTypeArgument = 0x48,
    MethodInvocationTypeArgument = 0x49,
    ConstructorReferenceTypeArgument = 0x4A,
    MethodReferenceTypeArgument = 0x4B,
}

/// The kind of type use a type annotation targets.
///
/// Code targets that refer to a bytecode offset (`Instanceof`, `New`, `Cast` ...) don't carry
/// the offset: the annotation is attached to the instruction it annotates. Local variable
/// targets get their ranges from the `visit_local_variable_annotation` event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum TypeReference {
    ClassTypeParameter { param_index: u8 } = 0x00,
    MethodTypeParameter { param_index: u8 } = 0x01,
    /// `None` designates the super class.
    ClassExtends { interface_index: Option<u16> } = 0x10,
    ClassTypeParameterBound { param_index: u8, bound_index: u8 } = 0x11,
    MethodTypeParameterBound { param_index: u8, bound_index: u8 } = 0x12,
    Field = 0x13,
    MethodReturn = 0x14,
    MethodReceiver = 0x15,
    MethodFormalParameter { param_index: u8 } = 0x16,
    Throws { exception_index: u16 } = 0x17,
    LocalVariable = 0x40,
    ResourceVariable = 0x41,
    ExceptionParameter { exception_index: u16 } = 0x42,
    Instanceof = 0x43,
    New = 0x44,
    ConstructorReference = 0x45,
    MethodReference = 0x46,
    Cast { arg_index: u8 } = 0x47,
    ConstructorInvocationTypeArgument { arg_index: u8 } = 0x48,
    MethodInvocationTypeArgument { arg_index: u8 } = 0x49,
    ConstructorReferenceTypeArgument { arg_index: u8 } = 0x4A,
    MethodReferenceTypeArgument { arg_index: u8 } = 0x4B,
}

/// Where a type annotation is anchored inside a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetLocation {
    None,
    Offset(u16),
    /// `(start_pc, length, index)` triples.
    Ranges(Vec<(u16, u16, u16)>),
}

impl TypeReference {
    pub fn target_type(&self) -> u8 {
        match self {
            TypeReference::ClassTypeParameter { .. } => 0x00,
            TypeReference::MethodTypeParameter { .. } => 0x01,
            TypeReference::ClassExtends { .. } => 0x10,
            TypeReference::ClassTypeParameterBound { .. } => 0x11,
            TypeReference::MethodTypeParameterBound { .. } => 0x12,
            TypeReference::Field => 0x13,
            TypeReference::MethodReturn => 0x14,
            TypeReference::MethodReceiver => 0x15,
            TypeReference::MethodFormalParameter { .. } => 0x16,
            TypeReference::Throws { .. } => 0x17,
            TypeReference::LocalVariable => 0x40,
            TypeReference::ResourceVariable => 0x41,
            TypeReference::ExceptionParameter { .. } => 0x42,
            TypeReference::Instanceof => 0x43,
            TypeReference::New => 0x44,
            TypeReference::ConstructorReference => 0x45,
            TypeReference::MethodReference => 0x46,
            TypeReference::Cast { .. } => 0x47,
            TypeReference::ConstructorInvocationTypeArgument { .. } => 0x48,
            TypeReference::MethodInvocationTypeArgument { .. } => 0x49,
            TypeReference::ConstructorReferenceTypeArgument { .. } => 0x4A,
            TypeReference::MethodReferenceTypeArgument { .. } => 0x4B,
        }
    }

    /// Whether the target refers to an instruction offset.
    pub fn is_instruction_target(&self) -> bool {
        (0x43..=0x4B).contains(&self.target_type())
    }

    /// Reads a `target_type` and `target_info` pair, returning the offset just past them.
    pub(crate) fn read(
        buffer: &ClassBuffer<'_>,
        offset: usize,
    ) -> ClassFileResult<(TypeReference, TargetLocation, usize)> {
        let tag = buffer.read_u8(offset)?;
        let target_type = TypeReferenceTargetType::try_from(tag).map_err(|_| {
            ClassFileError::BadTypeAnnotationTarget {
                target: tag,
                offset,
            }
        })?;
        let info = offset + 1;
        let u8_at = |delta: usize| buffer.read_u8(info + delta);
        let u16_at = |delta: usize| buffer.read_u16(info + delta);
        use TypeReferenceTargetType as T;
        let result = match target_type {
            T::ClassTypeParameter => (
                TypeReference::ClassTypeParameter {
                    param_index: u8_at(0)?,
                },
                TargetLocation::None,
                info + 1,
            ),
            T::MethodTypeParameter => (
                TypeReference::MethodTypeParameter {
                    param_index: u8_at(0)?,
                },
                TargetLocation::None,
                info + 1,
            ),
            T::ClassExtends => {
                let index = u16_at(0)?;
                (
                    TypeReference::ClassExtends {
                        interface_index: (index != 0xffff).then_some(index),
                    },
                    TargetLocation::None,
                    info + 2,
                )
            }
            T::ClassTypeParameterBound => (
                TypeReference::ClassTypeParameterBound {
                    param_index: u8_at(0)?,
                    bound_index: u8_at(1)?,
                },
                TargetLocation::None,
                info + 2,
            ),
            T::MethodTypeParameterBound => (
                TypeReference::MethodTypeParameterBound {
                    param_index: u8_at(0)?,
                    bound_index: u8_at(1)?,
                },
                TargetLocation::None,
                info + 2,
            ),
            T::Field => (TypeReference::Field, TargetLocation::None, info),
            T::MethodReturn => (TypeReference::MethodReturn, TargetLocation::None, info),
            T::MethodReceiver => (TypeReference::MethodReceiver, TargetLocation::None, info),
            T::MethodFormalParameter => (
                TypeReference::MethodFormalParameter {
                    param_index: u8_at(0)?,
                },
                TargetLocation::None,
                info + 1,
            ),
            T::Throws => (
                TypeReference::Throws {
                    exception_index: u16_at(0)?,
                },
                TargetLocation::None,
                info + 2,
            ),
            T::LocalVariable | T::ResourceVariable => {
                let table_length = u16_at(0)? as usize;
                let mut ranges = Vec::with_capacity(table_length);
                for i in 0..table_length {
                    let entry = 2 + i * 6;
                    ranges.push((u16_at(entry)?, u16_at(entry + 2)?, u16_at(entry + 4)?));
                }
                let type_ref = if target_type == T::LocalVariable {
                    TypeReference::LocalVariable
                } else {
                    TypeReference::ResourceVariable
                };
                (
                    type_ref,
                    TargetLocation::Ranges(ranges),
                    info + 2 + table_length * 6,
                )
            }
            T::ExceptionParameter => (
                TypeReference::ExceptionParameter {
                    exception_index: u16_at(0)?,
                },
                TargetLocation::None,
                info + 2,
            ),
            T::Instanceof => (
                TypeReference::Instanceof,
                TargetLocation::Offset(u16_at(0)?),
                info + 2,
            ),
            T::New => (
                TypeReference::New,
                TargetLocation::Offset(u16_at(0)?),
                info + 2,
            ),
            T::ConstructorReference => (
                TypeReference::ConstructorReference,
                TargetLocation::Offset(u16_at(0)?),
                info + 2,
            ),
            T::MethodReference => (
                TypeReference::MethodReference,
                TargetLocation::Offset(u16_at(0)?),
                info + 2,
            ),
            T::Cast
            | T::ConstructorInvocationTypeArgument
            | T::MethodInvocationTypeArgument
            | T::ConstructorReferenceTypeArgument
            | T::MethodReferenceTypeArgument => {
                let arg_index = u8_at(2)?;
                let type_ref = match target_type {
                    T::Cast => TypeReference::Cast { arg_index },
                    T::ConstructorInvocationTypeArgument => {
                        TypeReference::ConstructorInvocationTypeArgument { arg_index }
                    }
                    T::MethodInvocationTypeArgument => {
                        TypeReference::MethodInvocationTypeArgument { arg_index }
                    }
                    T::ConstructorReferenceTypeArgument => {
                        TypeReference::ConstructorReferenceTypeArgument { arg_index }
                    }
                    _ => TypeReference::MethodReferenceTypeArgument { arg_index },
                };
                (type_ref, TargetLocation::Offset(u16_at(0)?), info + 3)
            }
        };
        Ok(result)
    }

    /// Writes `target_type` and `target_info`. `location` supplies the resolved offset or ranges
    /// for code targets.
    pub(crate) fn write(&self, location: &TargetLocation, out: &mut ByteVector) {
        out.put_u8(self.target_type());
        match *self {
            TypeReference::ClassTypeParameter { param_index }
            | TypeReference::MethodTypeParameter { param_index }
            | TypeReference::MethodFormalParameter { param_index } => out.put_u8(param_index),
            TypeReference::ClassExtends { interface_index } => {
                out.put_u16(interface_index.unwrap_or(0xffff))
            }
            TypeReference::ClassTypeParameterBound {
                param_index,
                bound_index,
            }
            | TypeReference::MethodTypeParameterBound {
                param_index,
                bound_index,
            } => {
                out.put_u8(param_index);
                out.put_u8(bound_index);
            }
            TypeReference::Field | TypeReference::MethodReturn | TypeReference::MethodReceiver => {}
            TypeReference::Throws { exception_index }
            | TypeReference::ExceptionParameter { exception_index } => {
                out.put_u16(exception_index)
            }
            TypeReference::LocalVariable | TypeReference::ResourceVariable => {
                let ranges = match location {
                    TargetLocation::Ranges(ranges) => ranges.as_slice(),
                    _ => &[],
                };
                out.put_u16(ranges.len() as u16);
                for &(start, length, index) in ranges {
                    out.put_u16(start);
                    out.put_u16(length);
                    out.put_u16(index);
                }
            }
            TypeReference::Instanceof
            | TypeReference::New
            | TypeReference::ConstructorReference
            | TypeReference::MethodReference => out.put_u16(location.offset()),
            TypeReference::Cast { arg_index }
            | TypeReference::ConstructorInvocationTypeArgument { arg_index }
            | TypeReference::MethodInvocationTypeArgument { arg_index }
            | TypeReference::ConstructorReferenceTypeArgument { arg_index }
            | TypeReference::MethodReferenceTypeArgument { arg_index } => {
                out.put_u16(location.offset());
                out.put_u8(arg_index);
            }
        }
    }
}

impl TargetLocation {
    fn offset(&self) -> u16 {
        match self {
            TargetLocation::Offset(offset) => *offset,
            _ => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypePathStep {
    ArrayElement,
    InnerType,
    WildcardBound,
    TypeArgument(u8),
}

/// A path to a type nested inside the annotated type, stored as the raw `path` pairs.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TypePath<'class> {
    path: Cow<'class, [u8]>,
}

impl<'class> TypePath<'class> {
    pub(crate) fn from_bytes(bytes: &'class [u8]) -> Self {
        TypePath { path: bytes.into() }
    }

    pub fn new(steps: &[TypePathStep]) -> TypePath<'static> {
        let mut path = Vec::with_capacity(steps.len() * 2);
        for step in steps {
            let (kind, arg) = match *step {
                TypePathStep::ArrayElement => (0, 0),
                TypePathStep::InnerType => (1, 0),
                TypePathStep::WildcardBound => (2, 0),
                TypePathStep::TypeArgument(arg) => (3, arg),
            };
            path.push(kind);
            path.push(arg);
        }
        TypePath { path: path.into() }
    }

    /// Reads a `type_path` structure, returning the offset just past it.
    pub(crate) fn read(
        buffer: &ClassBuffer<'class>,
        offset: usize,
    ) -> ClassFileResult<(TypePath<'class>, usize)> {
        let len = buffer.read_u8(offset)? as usize * 2;
        let bytes = buffer.read_bytes(offset + 1, len)?;
        Ok((TypePath::from_bytes(bytes), offset + 1 + len))
    }

    pub(crate) fn write(&self, out: &mut ByteVector) {
        out.put_u8((self.path.len() / 2) as u8);
        out.put_bytes(&self.path);
    }

    pub fn len(&self) -> usize {
        self.path.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = TypePathStep> + '_ {
        self.path.chunks_exact(2).map(|pair| match pair[0] {
            0 => TypePathStep::ArrayElement,
            1 => TypePathStep::InnerType,
            2 => TypePathStep::WildcardBound,
            _ => TypePathStep::TypeArgument(pair[1]),
        })
    }

    pub fn into_owned(self) -> TypePath<'static> {
        TypePath {
            path: Cow::Owned(self.path.into_owned()),
        }
    }
}

impl Debug for TypePath<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut result = String::with_capacity(self.path.len());
        for step in self.steps() {
            match step {
                TypePathStep::ArrayElement => result.push('['),
                TypePathStep::InnerType => result.push('.'),
                TypePathStep::WildcardBound => result.push('*'),
                TypePathStep::TypeArgument(arg) => {
                    result.push_str(&arg.to_string());
                    result.push(';');
                }
            }
        }
        Debug::fmt(&result, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_type_path_debug() {
        let path = TypePath::new(&[
            TypePathStep::ArrayElement,
            TypePathStep::TypeArgument(2),
            TypePathStep::WildcardBound,
            TypePathStep::InnerType,
        ]);
        assert_eq!(4, path.len());
        assert_eq!("\"[2;*.\"", format!("{path:?}"));
    }

    #[test]
    fn test_read_cast_target() {
        let bytes = [0x47, 0x00, 0x10, 0x01];
        let buffer = ClassBuffer::new(&bytes);
        let (type_ref, location, next) = TypeReference::read(&buffer, 0).unwrap();
        assert_eq!(TypeReference::Cast { arg_index: 1 }, type_ref);
        assert_eq!(TargetLocation::Offset(16), location);
        assert_eq!(4, next);

        let mut out = ByteVector::new();
        type_ref.write(&location, &mut out);
        assert_eq!(&bytes[..], out.as_slice());
    }

    #[test]
    fn test_read_local_variable_target() {
        let bytes = [0x40, 0x00, 0x01, 0x00, 0x02, 0x00, 0x05, 0x00, 0x03];
        let buffer = ClassBuffer::new(&bytes);
        let (type_ref, location, next) = TypeReference::read(&buffer, 0).unwrap();
        assert_eq!(TypeReference::LocalVariable, type_ref);
        assert_eq!(TargetLocation::Ranges(vec![(2, 5, 3)]), location);
        assert_eq!(bytes.len(), next);
    }

    #[test]
    fn test_bad_target() {
        let buffer = ClassBuffer::new(&[0x30]);
        let err = TypeReference::read(&buffer, 0).unwrap_err();
        assert_eq!(Some(0), err.offset());
    }
}
