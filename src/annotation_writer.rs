use crate::{
    AnnotationConstant, AnnotationVisitor, ByteVector, ClassFileError, ClassFileResult,
    ConstantPoolBuilder, TargetLocation, TypePath, TypeReference,
};
use java_string::JavaStr;

/// Encodes the element values of one annotation (or array) into `out`, keeping the element
/// count in front of them up to date after every event.
#[derive(Debug)]
pub(crate) struct AnnotationWriter<'a> {
    constant_pool: &'a mut ConstantPoolBuilder,
    out: &'a mut ByteVector,
    named: bool,
    /// `None` for a lone element value, as in `AnnotationDefault`.
    count_offset: Option<usize>,
    count: u16,
}

impl<'a> AnnotationWriter<'a> {
    /// Starts an `element_value_pairs` table (if `named`) or an array's values.
    pub(crate) fn new(
        constant_pool: &'a mut ConstantPoolBuilder,
        out: &'a mut ByteVector,
        named: bool,
    ) -> AnnotationWriter<'a> {
        let count_offset = out.len();
        out.put_u16(0);
        AnnotationWriter {
            constant_pool,
            out,
            named,
            count_offset: Some(count_offset),
            count: 0,
        }
    }

    /// Writes a single unnamed element value with no count in front.
    pub(crate) fn single(
        constant_pool: &'a mut ConstantPoolBuilder,
        out: &'a mut ByteVector,
    ) -> AnnotationWriter<'a> {
        AnnotationWriter {
            constant_pool,
            out,
            named: false,
            count_offset: None,
            count: 0,
        }
    }

    fn element(&mut self, name: Option<&JavaStr>) -> ClassFileResult<()> {
        if let Some(count_offset) = self.count_offset {
            self.count = self.count.checked_add(1).ok_or(ClassFileError::TooManyEntries {
                what: "annotation elements",
            })?;
            self.out.put_u16_at(count_offset, self.count);
        }
        if self.named {
            let name = name.unwrap_or(JavaStr::from_str("value"));
            self.out.put_u16(self.constant_pool.add_utf8(name)?);
        }
        Ok(())
    }
}

impl AnnotationVisitor for AnnotationWriter<'_> {
    fn visit(
        &mut self,
        name: Option<&JavaStr>,
        value: AnnotationConstant<'_>,
    ) -> ClassFileResult<()> {
        self.element(name)?;
        self.out.put_u8(value.tag());
        let cp = &mut *self.constant_pool;
        let index = match value {
            AnnotationConstant::Byte(value) => cp.add_integer(value as i32)?,
            AnnotationConstant::Char(value) => cp.add_integer(value as i32)?,
            AnnotationConstant::Short(value) => cp.add_integer(value as i32)?,
            AnnotationConstant::Boolean(value) => cp.add_integer(value as i32)?,
            AnnotationConstant::Int(value) => cp.add_integer(value)?,
            AnnotationConstant::Long(value) => cp.add_long(value)?,
            AnnotationConstant::Float(value) => cp.add_float(value)?,
            AnnotationConstant::Double(value) => cp.add_double(value)?,
            AnnotationConstant::String(value) | AnnotationConstant::Class(value) => {
                cp.add_utf8(value)?
            }
        };
        self.out.put_u16(index);
        Ok(())
    }

    fn visit_enum(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
        value: &JavaStr,
    ) -> ClassFileResult<()> {
        self.element(name)?;
        self.out.put_u8(b'e');
        self.out.put_u16(self.constant_pool.add_utf8(desc)?);
        self.out.put_u16(self.constant_pool.add_utf8(value)?);
        Ok(())
    }

    fn visit_annotation(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.element(name)?;
        self.out.put_u8(b'@');
        self.out.put_u16(self.constant_pool.add_utf8(desc)?);
        Ok(Some(Box::new(AnnotationWriter::new(
            self.constant_pool,
            self.out,
            true,
        ))))
    }

    fn visit_array(
        &mut self,
        name: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.element(name)?;
        self.out.put_u8(b'[');
        Ok(Some(Box::new(AnnotationWriter::new(
            self.constant_pool,
            self.out,
            false,
        ))))
    }
}

/// The contents of one annotations attribute, minus its header: a count and the annotations.
#[derive(Debug, Clone, Default)]
pub(crate) struct AnnotationSet {
    count: u16,
    data: ByteVector,
}

impl AnnotationSet {
    fn bump(&mut self) -> ClassFileResult<()> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or(ClassFileError::TooManyEntries {
                what: "annotations",
            })?;
        Ok(())
    }

    /// Starts a new annotation of type `desc` and returns the writer for its elements.
    pub(crate) fn add<'a>(
        &'a mut self,
        constant_pool: &'a mut ConstantPoolBuilder,
        desc: &JavaStr,
    ) -> ClassFileResult<AnnotationWriter<'a>> {
        self.bump()?;
        self.data.put_u16(constant_pool.add_utf8(desc)?);
        Ok(AnnotationWriter::new(constant_pool, &mut self.data, true))
    }

    pub(crate) fn add_type_annotation<'a>(
        &'a mut self,
        constant_pool: &'a mut ConstantPoolBuilder,
        type_ref: TypeReference,
        location: &TargetLocation,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
    ) -> ClassFileResult<AnnotationWriter<'a>> {
        self.bump()?;
        type_ref.write(location, &mut self.data);
        type_path.write(&mut self.data);
        self.data.put_u16(constant_pool.add_utf8(desc)?);
        Ok(AnnotationWriter::new(constant_pool, &mut self.data, true))
    }

    /// Appends an annotation whose target and element values were encoded elsewhere.
    pub(crate) fn add_raw(&mut self, bytes: &[u8]) -> ClassFileResult<()> {
        self.bump()?;
        self.data.put_bytes(bytes);
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The attribute body: the count followed by the annotations.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = ByteVector::with_capacity(2 + self.data.len());
        out.put_u16(self.count);
        out.put_bytes(self.data.as_slice());
        out.into_vec()
    }
}

/// The body of a `Runtime(In)VisibleParameterAnnotations` attribute being built.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParameterAnnotations {
    /// The declared annotable parameter count, if one was visited.
    pub annotable_count: Option<u8>,
    pub parameters: Vec<AnnotationSet>,
}

impl ParameterAnnotations {
    pub(crate) fn parameter(&mut self, parameter: u8) -> &mut AnnotationSet {
        let index = parameter as usize;
        if self.parameters.len() <= index {
            self.parameters.resize_with(index + 1, AnnotationSet::default);
        }
        &mut self.parameters[index]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.annotable_count.is_none() && self.parameters.iter().all(AnnotationSet::is_empty)
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let count = self
            .annotable_count
            .map_or(self.parameters.len(), |count| {
                (count as usize).max(self.parameters.len())
            });
        let mut out = ByteVector::new();
        out.put_u8(count as u8);
        for i in 0..count {
            match self.parameters.get(i) {
                Some(set) => out.put_bytes(&set.to_bytes()),
                None => out.put_u16(0),
            }
        }
        out.into_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nested_values() {
        let mut pool = ConstantPoolBuilder::new();
        let mut set = AnnotationSet::default();
        {
            let mut writer = set.add(&mut pool, JavaStr::from_str("LA;")).unwrap();
            writer
                .visit(Some(JavaStr::from_str("x")), AnnotationConstant::Int(3))
                .unwrap();
            let mut array = writer
                .visit_array(Some(JavaStr::from_str("y")))
                .unwrap()
                .unwrap();
            array.visit(None, AnnotationConstant::Boolean(true)).unwrap();
            array.visit(None, AnnotationConstant::Boolean(false)).unwrap();
            array.visit_end().unwrap();
        }
        let bytes = set.to_bytes();
        // count, type, pair count
        assert_eq!(&[0, 1, 0, 1, 0, 2], &bytes[..6]);
        // "x" = I #3
        assert_eq!(&[0, 2, b'I', 0, 3], &bytes[6..11]);
        // "y" = [2 values]
        assert_eq!(&[0, 4, b'[', 0, 2, b'Z'], &bytes[11..17]);
        assert_eq!(22, bytes.len());
    }

    #[test]
    fn test_parameter_annotations_pad_missing_parameters() {
        let mut pool = ConstantPoolBuilder::new();
        let mut annotations = ParameterAnnotations::default();
        annotations.annotable_count = Some(3);
        annotations
            .parameter(1)
            .add(&mut pool, JavaStr::from_str("LA;"))
            .unwrap();
        assert_eq!(
            vec![3, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0],
            annotations.to_bytes()
        );
    }
}
