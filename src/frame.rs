use crate::Label;
use java_string::JavaStr;
use std::borrow::Cow;

/// A stack map frame, in the compressed form used by the `StackMapTable` attribute.
///
/// Each frame is expressed relative to the previous one (or to the implicit frame derived from
/// the method descriptor, for the first one).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Frame<'class> {
    /// Same locals as the previous frame, empty stack.
    Same,
    /// Same locals as the previous frame, one stack item.
    Same1(FrameValue<'class>),
    /// The last `n` locals (1 to 3) are absent, empty stack.
    Chop(u8),
    /// 1 to 3 extra locals, empty stack.
    Append(Vec<FrameValue<'class>>),
    Full {
        locals: Vec<FrameValue<'class>>,
        stack: Vec<FrameValue<'class>>,
    },
}

impl Frame<'_> {
    pub fn into_owned(self) -> Frame<'static> {
        fn own(values: Vec<FrameValue<'_>>) -> Vec<FrameValue<'static>> {
            values.into_iter().map(FrameValue::into_owned).collect()
        }
        match self {
            Frame::Same => Frame::Same,
            Frame::Same1(value) => Frame::Same1(value.into_owned()),
            Frame::Chop(n) => Frame::Chop(n),
            Frame::Append(locals) => Frame::Append(own(locals)),
            Frame::Full { locals, stack } => Frame::Full {
                locals: own(locals),
                stack: own(stack),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameValue<'class> {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    Class(Cow<'class, JavaStr>),
    /// Result of the `new` instruction that directly follows the given label.
    Uninitialized(Label),
}

impl FrameValue<'_> {
    pub fn into_owned(self) -> FrameValue<'static> {
        match self {
            FrameValue::Top => FrameValue::Top,
            FrameValue::Integer => FrameValue::Integer,
            FrameValue::Float => FrameValue::Float,
            FrameValue::Long => FrameValue::Long,
            FrameValue::Double => FrameValue::Double,
            FrameValue::Null => FrameValue::Null,
            FrameValue::UninitializedThis => FrameValue::UninitializedThis,
            FrameValue::Class(name) => FrameValue::Class(Cow::Owned(name.into_owned())),
            FrameValue::Uninitialized(label) => FrameValue::Uninitialized(label),
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            FrameValue::Top => 0,
            FrameValue::Integer => 1,
            FrameValue::Float => 2,
            FrameValue::Double => 3,
            FrameValue::Long => 4,
            FrameValue::Null => 5,
            FrameValue::UninitializedThis => 6,
            FrameValue::Class(_) => 7,
            FrameValue::Uninitialized(_) => 8,
        }
    }
}
