use crate::ConstantDynamic;
use derive_more::IsVariant;
use java_string::JavaStr;
use std::borrow::Cow;
use strum::{Display, FromRepr};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    Nop = 0,
    #[strum(serialize = "aconst_null")]
    AConstNull = 1,
    #[strum(serialize = "iconst_m1")]
    IConstM1 = 2,
    #[strum(serialize = "iconst_0")]
    IConst0 = 3,
    #[strum(serialize = "iconst_1")]
    IConst1 = 4,
    #[strum(serialize = "iconst_2")]
    IConst2 = 5,
    #[strum(serialize = "iconst_3")]
    IConst3 = 6,
    #[strum(serialize = "iconst_4")]
    IConst4 = 7,
    #[strum(serialize = "iconst_5")]
    IConst5 = 8,
    #[strum(serialize = "lconst_0")]
    LConst0 = 9,
    #[strum(serialize = "lconst_1")]
    LConst1 = 10,
    #[strum(serialize = "fconst_0")]
    FConst0 = 11,
    #[strum(serialize = "fconst_1")]
    FConst1 = 12,
    #[strum(serialize = "fconst_2")]
    FConst2 = 13,
    #[strum(serialize = "dconst_0")]
    DConst0 = 14,
    #[strum(serialize = "dconst_1")]
    DConst1 = 15,
    BIPush = 16,
    SIPush = 17,
    Ldc = 18,
    ILoad = 21,
    LLoad = 22,
    FLoad = 23,
    DLoad = 24,
    ALoad = 25,
    IALoad = 46,
    LALoad = 47,
    FALoad = 48,
    DALoad = 49,
    AALoad = 50,
    BALoad = 51,
    CALoad = 52,
    SALoad = 53,
    IStore = 54,
    LStore = 55,
    FStore = 56,
    DStore = 57,
    AStore = 58,
    IAStore = 79,
    LAStore = 80,
    FAStore = 81,
    DAStore = 82,
    AAStore = 83,
    BAStore = 84,
    CAStore = 85,
    SAStore = 86,
    Pop = 87,
    Pop2 = 88,
    Dup = 89,
    #[strum(serialize = "dup_x1")]
    DupX1 = 90,
    #[strum(serialize = "dup_x2")]
    DupX2 = 91,
    Dup2 = 92,
    #[strum(serialize = "dup2_x1")]
    Dup2X1 = 93,
    #[strum(serialize = "dup2_x2")]
    Dup2X2 = 94,
    Swap = 95,
    IAdd = 96,
    LAdd = 97,
    FAdd = 98,
    DAdd = 99,
    ISub = 100,
    LSub = 101,
    FSub = 102,
    DSub = 103,
    IMul = 104,
    LMul = 105,
    FMul = 106,
    DMul = 107,
    IDiv = 108,
    LDiv = 109,
    FDiv = 110,
    DDiv = 111,
    IRem = 112,
    LRem = 113,
    FRem = 114,
    DRem = 115,
    INeg = 116,
    LNeg = 117,
    FNeg = 118,
    DNeg = 119,
    IShl = 120,
    LShl = 121,
    IShr = 122,
    LShr = 123,
    IUShr = 124,
    LUShr = 125,
    IAnd = 126,
    LAnd = 127,
    IOr = 128,
    LOr = 129,
    IXor = 130,
    LXor = 131,
    IInc = 132,
    I2l = 133,
    I2f = 134,
    I2d = 135,
    L2i = 136,
    L2f = 137,
    L2d = 138,
    F2i = 139,
    F2l = 140,
    F2d = 141,
    D2i = 142,
    D2l = 143,
    D2f = 144,
    I2b = 145,
    I2c = 146,
    I2s = 147,
    LCmp = 148,
    FCmpL = 149,
    FCmpG = 150,
    DCmpL = 151,
    DCmpG = 152,
    IfEq = 153,
    IfNe = 154,
    IfLt = 155,
    IfGe = 156,
    IfGt = 157,
    IfLe = 158,
    #[strum(serialize = "if_icmpeq")]
    IfICmpEq = 159,
    #[strum(serialize = "if_icmpne")]
    IfICmpNe = 160,
    #[strum(serialize = "if_icmplt")]
    IfICmpLt = 161,
    #[strum(serialize = "if_icmpge")]
    IfICmpGe = 162,
    #[strum(serialize = "if_icmpgt")]
    IfICmpGt = 163,
    #[strum(serialize = "if_icmple")]
    IfICmpLe = 164,
    #[strum(serialize = "if_acmpeq")]
    IfACmpEq = 165,
    #[strum(serialize = "if_acmpne")]
    IfACmpNe = 166,
    Goto = 167,
    Jsr = 168,
    Ret = 169,
    TableSwitch = 170,
    LookupSwitch = 171,
    IReturn = 172,
    LReturn = 173,
    FReturn = 174,
    DReturn = 175,
    AReturn = 176,
    Return = 177,
    GetStatic = 178,
    PutStatic = 179,
    GetField = 180,
    PutField = 181,
    InvokeVirtual = 182,
    InvokeSpecial = 183,
    InvokeStatic = 184,
    InvokeInterface = 185,
    InvokeDynamic = 186,
    New = 187,
    NewArray = 188,
    ANewArray = 189,
    ArrayLength = 190,
    AThrow = 191,
    CheckCast = 192,
    Instanceof = 193,
    MonitorEnter = 194,
    MonitorExit = 195,
    MultiANewArray = 197,
    IfNull = 198,
    IfNonNull = 199,
}

impl Opcode {
    /// The opcode testing the opposite condition, for conditional jumps.
    pub fn inverted_condition(self) -> Option<Opcode> {
        Some(match self {
            Opcode::IfEq => Opcode::IfNe,
            Opcode::IfNe => Opcode::IfEq,
            Opcode::IfLt => Opcode::IfGe,
            Opcode::IfGe => Opcode::IfLt,
            Opcode::IfGt => Opcode::IfLe,
            Opcode::IfLe => Opcode::IfGt,
            Opcode::IfICmpEq => Opcode::IfICmpNe,
            Opcode::IfICmpNe => Opcode::IfICmpEq,
            Opcode::IfICmpLt => Opcode::IfICmpGe,
            Opcode::IfICmpGe => Opcode::IfICmpLt,
            Opcode::IfICmpGt => Opcode::IfICmpLe,
            Opcode::IfICmpLe => Opcode::IfICmpGt,
            Opcode::IfACmpEq => Opcode::IfACmpNe,
            Opcode::IfACmpNe => Opcode::IfACmpEq,
            Opcode::IfNull => Opcode::IfNonNull,
            Opcode::IfNonNull => Opcode::IfNull,
            _ => return None,
        })
    }

    pub(crate) fn kind(self) -> InsnKind {
        // every public opcode has a kind
        insn_kind(self as u8).unwrap_or(InsnKind::NoOperand)
    }
}

pub(crate) struct InternalOpcodes;

impl InternalOpcodes {
    pub(crate) const LDC_W: u8 = 19;
    pub(crate) const LDC2_W: u8 = 20;
    pub(crate) const ILOAD_0: u8 = 26;
    pub(crate) const ISTORE_0: u8 = 59;
    pub(crate) const WIDE: u8 = 196;
    pub(crate) const GOTO_W: u8 = 200;
    pub(crate) const JSR_W: u8 = 201;
}

/// Operand layout of an instruction, determined by its opcode byte alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum InsnKind {
    NoOperand,
    Bipush,
    Sipush,
    NewArray,
    Ldc,
    LdcW,
    Ldc2W,
    Var,
    ImplicitVar,
    Iinc,
    Jump,
    JumpWide,
    TableSwitch,
    LookupSwitch,
    Field,
    Method,
    InvokeInterface,
    InvokeDynamic,
    Type,
    MultiANewArray,
    Wide,
}

pub(crate) fn insn_kind(opcode: u8) -> Option<InsnKind> {
    Some(match opcode {
        0..=15 | 46..=53 | 79..=131 | 133..=152 | 172..=177 | 190 | 191 | 194 | 195 => {
            InsnKind::NoOperand
        }
        16 => InsnKind::Bipush,
        17 => InsnKind::Sipush,
        18 => InsnKind::Ldc,
        19 => InsnKind::LdcW,
        20 => InsnKind::Ldc2W,
        21..=25 | 54..=58 | 169 => InsnKind::Var,
        26..=45 | 59..=78 => InsnKind::ImplicitVar,
        132 => InsnKind::Iinc,
        153..=168 | 198 | 199 => InsnKind::Jump,
        200 | 201 => InsnKind::JumpWide,
        170 => InsnKind::TableSwitch,
        171 => InsnKind::LookupSwitch,
        178..=181 => InsnKind::Field,
        182..=184 => InsnKind::Method,
        185 => InsnKind::InvokeInterface,
        186 => InsnKind::InvokeDynamic,
        187 | 189 | 192 | 193 => InsnKind::Type,
        188 => InsnKind::NewArray,
        196 => InsnKind::Wide,
        197 => InsnKind::MultiANewArray,
        _ => return None,
    })
}

/// Splits an implicit-index load/store opcode (`iload_0` ...) into its explicit opcode and index.
pub(crate) fn expand_implicit_var(opcode: u8) -> (u8, u16) {
    if opcode >= InternalOpcodes::ISTORE_0 {
        let rel = opcode - InternalOpcodes::ISTORE_0;
        (Opcode::IStore as u8 + rel / 4, (rel % 4) as u16)
    } else {
        let rel = opcode - InternalOpcodes::ILOAD_0;
        (Opcode::ILoad as u8 + rel / 4, (rel % 4) as u16)
    }
}

/// The inverse of [`expand_implicit_var`], for indices that have an implicit form.
pub(crate) fn implicit_var_opcode(opcode: Opcode, var_index: u16) -> Option<u8> {
    if var_index > 3 {
        return None;
    }
    let opcode = opcode as u8;
    let base = match opcode {
        21..=25 => InternalOpcodes::ILOAD_0 + (opcode - Opcode::ILoad as u8) * 4,
        54..=58 => InternalOpcodes::ISTORE_0 + (opcode - Opcode::IStore as u8) * 4,
        _ => return None,
    };
    Some(base + var_index as u8)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum NewArrayType {
    Boolean = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

/// An instruction with a single immediate integer-like operand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, IsVariant)]
pub enum IntInsn {
    Bipush(i8),
    Sipush(i16),
    NewArray(NewArrayType),
}

impl IntInsn {
    pub fn opcode(self) -> Opcode {
        match self {
            IntInsn::Bipush(_) => Opcode::BIPush,
            IntInsn::Sipush(_) => Opcode::SIPush,
            IntInsn::NewArray(_) => Opcode::NewArray,
        }
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd, IsVariant)]
pub enum LdcConstant<'class> {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(Cow<'class, JavaStr>),
    /// An internal name, or an array descriptor.
    Class(Cow<'class, JavaStr>),
    MethodType(Cow<'class, JavaStr>),
    Handle(crate::Handle<'class>),
    ConstantDynamic(ConstantDynamic<'class>),
}

impl LdcConstant<'_> {
    pub fn into_owned(self) -> LdcConstant<'static> {
        match self {
            LdcConstant::Integer(i) => LdcConstant::Integer(i),
            LdcConstant::Float(f) => LdcConstant::Float(f),
            LdcConstant::Long(l) => LdcConstant::Long(l),
            LdcConstant::Double(d) => LdcConstant::Double(d),
            LdcConstant::String(s) => LdcConstant::String(Cow::Owned(s.into_owned())),
            LdcConstant::Class(s) => LdcConstant::Class(Cow::Owned(s.into_owned())),
            LdcConstant::MethodType(s) => LdcConstant::MethodType(Cow::Owned(s.into_owned())),
            LdcConstant::Handle(h) => LdcConstant::Handle(h.into_owned()),
            LdcConstant::ConstantDynamic(c) => LdcConstant::ConstantDynamic(c.into_owned()),
        }
    }

    /// Whether the constant occupies two stack slots and needs `ldc2_w`.
    pub fn is_wide(&self) -> bool {
        match self {
            LdcConstant::Long(_) | LdcConstant::Double(_) => true,
            LdcConstant::ConstantDynamic(c) => c.is_wide(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_every_public_opcode_has_a_kind() {
        for byte in 0..=u8::MAX {
            if let Some(opcode) = Opcode::from_repr(byte) {
                assert!(insn_kind(byte).is_some(), "{opcode} has no kind");
            }
        }
        assert_eq!(None, insn_kind(0xca));
        assert_eq!(Some(InsnKind::Wide), insn_kind(InternalOpcodes::WIDE));
    }

    #[test]
    fn test_implicit_vars() {
        assert_eq!((Opcode::ILoad as u8, 0), expand_implicit_var(26));
        assert_eq!((Opcode::ALoad as u8, 3), expand_implicit_var(45));
        assert_eq!((Opcode::LStore as u8, 1), expand_implicit_var(64));
        assert_eq!(Some(45), implicit_var_opcode(Opcode::ALoad, 3));
        assert_eq!(Some(64), implicit_var_opcode(Opcode::LStore, 1));
        assert_eq!(None, implicit_var_opcode(Opcode::ILoad, 4));
        assert_eq!(None, implicit_var_opcode(Opcode::Ret, 0));
    }

    #[test]
    fn test_inverted_conditions() {
        assert_eq!(Some(Opcode::IfNe), Opcode::IfEq.inverted_condition());
        assert_eq!(Some(Opcode::IfNull), Opcode::IfNonNull.inverted_condition());
        assert_eq!(None, Opcode::Goto.inverted_condition());
        assert_eq!("if_icmpeq", Opcode::IfICmpEq.to_string());
    }
}
