use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ClassAccess: u32 {
        const Public = 0x0001;
        const Final = 0x0010;
        const Super = 0x0020;
        const Interface = 0x0200;
        const Abstract = 0x0400;
        const Synthetic = 0x1000;
        const Annotation = 0x2000;
        const Enum = 0x4000;
        const Module = 0x8000;
        // not in the access_flags item, mirrors the Record attribute
        const Record = 0x10000;
        // not in the access_flags item, mirrors the Deprecated attribute
        const Deprecated = 0x20000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct FieldAccess: u32 {
        const Public = 0x0001;
        const Private = 0x0002;
        const Protected = 0x0004;
        const Static = 0x0008;
        const Final = 0x0010;
        const Volatile = 0x0040;
        const Transient = 0x0080;
        const Synthetic = 0x1000;
        const Enum = 0x4000;
        const Deprecated = 0x20000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct MethodAccess: u32 {
        const Public = 0x0001;
        const Private = 0x0002;
        const Protected = 0x0004;
        const Static = 0x0008;
        const Final = 0x0010;
        const Synchronized = 0x0020;
        const Bridge = 0x0040;
        const Varargs = 0x0080;
        const Native = 0x0100;
        const Abstract = 0x0400;
        const Strict = 0x0800;
        const Synthetic = 0x1000;
        const Deprecated = 0x20000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct InnerClassAccess: u16 {
        const Public = 0x0001;
        const Private = 0x0002;
        const Protected = 0x0004;
        const Static = 0x0008;
        const Final = 0x0010;
        const Interface = 0x0200;
        const Abstract = 0x0400;
        const Synthetic = 0x1000;
        const Annotation = 0x2000;
        const Enum = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ParameterAccess: u16 {
        const Final = 0x0010;
        const Synthetic = 0x1000;
        const Mandated = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ModuleAccess: u16 {
        const Open = 0x0020;
        const Synthetic = 0x1000;
        const Mandated = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ModuleRequireAccess: u16 {
        const Transitive = 0x0020;
        const StaticPhase = 0x0040;
        const Synthetic = 0x1000;
        const Mandated = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct ModuleRelationAccess: u16 {
        const Synthetic = 0x1000;
        const Mandated = 0x8000;
    }
}

/// Strips the pseudo flags that are encoded as attributes rather than in `access_flags`.
pub(crate) fn raw_access_flags(access: u32, major_version: u16) -> u16 {
    let mut mask = 0x30000;
    if major_version < 49 {
        mask |= 0x1000;
    }
    (access & !mask) as u16
}

/// Whether a `Synthetic` attribute has to be emitted for these flags.
pub(crate) fn needs_synthetic_attribute(access: u32, major_version: u16) -> bool {
    major_version < 49 && access & 0x1000 != 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pseudo_flags_are_stripped() {
        let access = (ClassAccess::Public
            | ClassAccess::Deprecated
            | ClassAccess::Record
            | ClassAccess::Synthetic)
            .bits();
        assert_eq!(0x1001, raw_access_flags(access, 52));
        assert_eq!(0x0001, raw_access_flags(access, 48));
        assert!(needs_synthetic_attribute(access, 48));
        assert!(!needs_synthetic_attribute(access, 52));
    }
}
