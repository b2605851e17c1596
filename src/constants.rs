use bitflags::bitflags;
use derive_more::Display;
use std::fmt::Formatter;

pub const LATEST_MAJOR_VERSION: u16 = 69;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl ClassVersion {
    pub const V1_1: ClassVersion = ClassVersion::new(45, 3);
    pub const V1_2: ClassVersion = ClassVersion::new(46, 0);
    pub const V1_3: ClassVersion = ClassVersion::new(47, 0);
    pub const V1_4: ClassVersion = ClassVersion::new(48, 0);
    pub const V1_5: ClassVersion = ClassVersion::new(49, 0);
    pub const V1_6: ClassVersion = ClassVersion::new(50, 0);
    pub const V1_7: ClassVersion = ClassVersion::new(51, 0);
    pub const V1_8: ClassVersion = ClassVersion::new(52, 0);
    pub const V9: ClassVersion = ClassVersion::new(53, 0);
    pub const V10: ClassVersion = ClassVersion::new(54, 0);
    pub const V11: ClassVersion = ClassVersion::new(55, 0);
    pub const V12: ClassVersion = ClassVersion::new(56, 0);
    pub const V13: ClassVersion = ClassVersion::new(57, 0);
    pub const V14: ClassVersion = ClassVersion::new(58, 0);
    pub const V15: ClassVersion = ClassVersion::new(59, 0);
    pub const V16: ClassVersion = ClassVersion::new(60, 0);
    pub const V17: ClassVersion = ClassVersion::new(61, 0);
    pub const V18: ClassVersion = ClassVersion::new(62, 0);
    pub const V19: ClassVersion = ClassVersion::new(63, 0);
    pub const V20: ClassVersion = ClassVersion::new(64, 0);
    pub const V21: ClassVersion = ClassVersion::new(65, 0);
    pub const V22: ClassVersion = ClassVersion::new(66, 0);
    pub const V23: ClassVersion = ClassVersion::new(67, 0);
    pub const V24: ClassVersion = ClassVersion::new(68, 0);
    pub const V25: ClassVersion = ClassVersion::new(69, 0);

    pub const fn new(major: u16, minor: u16) -> ClassVersion {
        ClassVersion { major, minor }
    }
}

impl std::fmt::Display for ClassVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Version of the visitor protocol.
///
/// A visitor reports the highest version it understands through its `api()` method. Producers
/// never send it events that were introduced by a later version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[non_exhaustive]
pub enum Api {
    V4,
    /// Type annotations, method parameters.
    V5,
    /// Modules.
    V6,
    /// Nest mates and dynamic constants.
    V7,
    /// Records.
    V8,
    /// Permitted subclasses.
    V9,
}

impl Api {
    pub const LATEST: Api = Api::V9;
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct ReaderFlags: u8 {
        /// Don't visit method bodies.
        const SKIP_CODE = 0x01;
        /// Don't visit source file, line numbers, local variables or method parameters.
        const SKIP_DEBUG = 0x02;
        /// Don't visit stack map frames.
        const SKIP_FRAMES = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct WriterFlags: u8 {
        /// Ignore `visit_maxs` arguments and estimate max stack and max locals from the code.
        const COMPUTE_MAXS = 0x01;
    }
}

pub(crate) mod attribute_names {
    pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
    pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";
    pub const CODE: &str = "Code";
    pub const CONSTANT_VALUE: &str = "ConstantValue";
    pub const DEPRECATED: &str = "Deprecated";
    pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
    pub const EXCEPTIONS: &str = "Exceptions";
    pub const INNER_CLASSES: &str = "InnerClasses";
    pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
    pub const METHOD_PARAMETERS: &str = "MethodParameters";
    pub const MODULE: &str = "Module";
    pub const MODULE_MAIN_CLASS: &str = "ModuleMainClass";
    pub const MODULE_PACKAGES: &str = "ModulePackages";
    pub const NEST_HOST: &str = "NestHost";
    pub const NEST_MEMBERS: &str = "NestMembers";
    pub const PERMITTED_SUBCLASSES: &str = "PermittedSubclasses";
    pub const RECORD: &str = "Record";
    pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
    pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str =
        "RuntimeInvisibleParameterAnnotations";
    pub const RUNTIME_INVISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeInvisibleTypeAnnotations";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
    pub const RUNTIME_VISIBLE_TYPE_ANNOTATIONS: &str = "RuntimeVisibleTypeAnnotations";
    pub const SIGNATURE: &str = "Signature";
    pub const SOURCE_DEBUG_EXTENSION: &str = "SourceDebugExtension";
    pub const SOURCE_FILE: &str = "SourceFile";
    pub const STACK_MAP_TABLE: &str = "StackMapTable";
    pub const SYNTHETIC: &str = "Synthetic";
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_versions_are_ordered() {
        assert!(ClassVersion::V1_1 < ClassVersion::V1_2);
        assert!(ClassVersion::V1_8 < ClassVersion::V9);
        assert_eq!(LATEST_MAJOR_VERSION, ClassVersion::V25.major);
        assert_eq!("52.0", ClassVersion::V1_8.to_string());
    }

    #[test]
    fn test_api_order() {
        assert!(Api::V4 < Api::V5);
        assert!(Api::V8 < Api::LATEST);
        assert_eq!("V7", Api::V7.to_string());
    }
}
