use crate::{ClassFileError, ClassFileResult, LdcConstant};
use java_string::JavaStr;
use std::borrow::Cow;
use strum::{Display, FromRepr};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum HandleKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl HandleKind {
    pub fn from_u8(tag: u8) -> ClassFileResult<HandleKind> {
        Self::from_repr(tag).ok_or(ClassFileError::BadHandleKind(tag))
    }

    pub fn is_field(self) -> bool {
        self <= HandleKind::PutStatic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle<'class> {
    pub kind: HandleKind,
    pub owner: Cow<'class, JavaStr>,
    pub name: Cow<'class, JavaStr>,
    pub desc: Cow<'class, JavaStr>,
    pub is_interface: bool,
}

impl Handle<'_> {
    pub fn into_owned(self) -> Handle<'static> {
        Handle {
            kind: self.kind,
            owner: Cow::Owned(self.owner.into_owned()),
            name: Cow::Owned(self.name.into_owned()),
            desc: Cow::Owned(self.desc.into_owned()),
            is_interface: self.is_interface,
        }
    }
}

/// A constant computed at link time by a bootstrap method.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct ConstantDynamic<'class> {
    pub name: Cow<'class, JavaStr>,
    pub desc: Cow<'class, JavaStr>,
    pub bootstrap_method: Handle<'class>,
    pub bootstrap_method_arguments: Vec<BootstrapMethodArgument<'class>>,
}

impl ConstantDynamic<'_> {
    pub fn into_owned(self) -> ConstantDynamic<'static> {
        ConstantDynamic {
            name: Cow::Owned(self.name.into_owned()),
            desc: Cow::Owned(self.desc.into_owned()),
            bootstrap_method: self.bootstrap_method.into_owned(),
            bootstrap_method_arguments: self
                .bootstrap_method_arguments
                .into_iter()
                .map(LdcConstant::into_owned)
                .collect(),
        }
    }

    /// Whether the constant occupies two stack slots.
    pub fn is_wide(&self) -> bool {
        matches!(self.desc.as_bytes(), b"J" | b"D")
    }
}

/// Bootstrap method arguments are exactly the loadable constants.
pub type BootstrapMethodArgument<'class> = LdcConstant<'class>;
