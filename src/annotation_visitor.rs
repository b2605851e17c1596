use crate::{Api, ClassFileResult};
use java_string::JavaStr;

/// A primitive, string or class value of an annotation element.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub enum AnnotationConstant<'a> {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(&'a JavaStr),
    /// A field descriptor.
    Class(&'a JavaStr),
}

impl AnnotationConstant<'_> {
    pub(crate) fn tag(&self) -> u8 {
        match self {
            AnnotationConstant::Byte(_) => b'B',
            AnnotationConstant::Char(_) => b'C',
            AnnotationConstant::Double(_) => b'D',
            AnnotationConstant::Float(_) => b'F',
            AnnotationConstant::Int(_) => b'I',
            AnnotationConstant::Long(_) => b'J',
            AnnotationConstant::Short(_) => b'S',
            AnnotationConstant::Boolean(_) => b'Z',
            AnnotationConstant::String(_) => b's',
            AnnotationConstant::Class(_) => b'c',
        }
    }
}

/// Receives the elements of an annotation, or the values of an array element.
///
/// `name` is `None` for array values and for annotation defaults.
pub trait AnnotationVisitor {
    fn api(&self) -> Api {
        Api::LATEST
    }

    fn delegate(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        None
    }

    fn visit(
        &mut self,
        name: Option<&JavaStr>,
        value: AnnotationConstant<'_>,
    ) -> ClassFileResult<()> {
        forward!(self.visit(name, value))
    }

    fn visit_enum(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
        value: &JavaStr,
    ) -> ClassFileResult<()> {
        forward!(self.visit_enum(name, desc, value))
    }

    fn visit_annotation(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_annotation(name, desc))
    }

    fn visit_array(
        &mut self,
        name: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_array(name))
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        forward!(self.visit_end())
    }
}

impl<V: AnnotationVisitor> AnnotationVisitor for &mut V {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        Some(&mut **self)
    }
}

impl<'a> AnnotationVisitor for Box<dyn AnnotationVisitor + 'a> {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        Some(&mut **self)
    }
}
