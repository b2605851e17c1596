use java_string::JavaStr;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue<'class> {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(Cow<'class, JavaStr>),
}

impl FieldValue<'_> {
    pub fn into_owned(self) -> FieldValue<'static> {
        match self {
            FieldValue::Integer(i) => FieldValue::Integer(i),
            FieldValue::Float(f) => FieldValue::Float(f),
            FieldValue::Long(l) => FieldValue::Long(l),
            FieldValue::Double(d) => FieldValue::Double(d),
            FieldValue::String(s) => FieldValue::String(Cow::Owned(s.into_owned())),
        }
    }
}
