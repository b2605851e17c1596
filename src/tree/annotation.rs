use crate::{
    AnnotationConstant, AnnotationVisitor, ClassFileResult, LocalVariableRange, TypePath,
    TypeReference,
};
use java_string::{JavaStr, JavaString};

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct AnnotationNode {
    pub desc: JavaString,
    pub values: Vec<(JavaString, AnnotationValue)>,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct TypeAnnotationNode {
    pub type_ref: TypeReference,
    pub type_path: TypePath<'static>,
    pub annotation: AnnotationNode,
}

/// A type annotation on a local variable, which can live in several slots over several ranges.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct LocalVariableAnnotationNode {
    pub type_ref: TypeReference,
    pub type_path: TypePath<'static>,
    pub ranges: Vec<LocalVariableRange>,
    pub annotation: AnnotationNode,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum AnnotationValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(JavaString),
    Enum { desc: JavaString, name: JavaString },
    Class(JavaString),
    Annotation(AnnotationNode),
    Array(Vec<AnnotationValue>),
}

impl AnnotationNode {
    pub fn new(desc: &JavaStr) -> AnnotationNode {
        AnnotationNode {
            desc: desc.to_owned(),
            values: Vec::new(),
        }
    }

    /// Replays the element values into `av`, then ends it.
    pub fn accept(&self, av: &mut dyn AnnotationVisitor) -> ClassFileResult<()> {
        for (name, value) in &self.values {
            accept_value(av, Some(name), value)?;
        }
        av.visit_end()
    }
}

impl TypeAnnotationNode {
    pub fn new(
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
    ) -> TypeAnnotationNode {
        TypeAnnotationNode {
            type_ref,
            type_path: type_path.clone().into_owned(),
            annotation: AnnotationNode::new(desc),
        }
    }
}

impl AnnotationVisitor for TypeAnnotationNode {
    fn delegate(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        Some(&mut self.annotation)
    }
}

impl AnnotationVisitor for LocalVariableAnnotationNode {
    fn delegate(&mut self) -> Option<&mut dyn AnnotationVisitor> {
        Some(&mut self.annotation)
    }
}

impl AnnotationValue {
    fn from_constant(value: AnnotationConstant<'_>) -> AnnotationValue {
        match value {
            AnnotationConstant::Byte(value) => AnnotationValue::Byte(value),
            AnnotationConstant::Char(value) => AnnotationValue::Char(value),
            AnnotationConstant::Double(value) => AnnotationValue::Double(value),
            AnnotationConstant::Float(value) => AnnotationValue::Float(value),
            AnnotationConstant::Int(value) => AnnotationValue::Int(value),
            AnnotationConstant::Long(value) => AnnotationValue::Long(value),
            AnnotationConstant::Short(value) => AnnotationValue::Short(value),
            AnnotationConstant::Boolean(value) => AnnotationValue::Boolean(value),
            AnnotationConstant::String(value) => AnnotationValue::String(value.to_owned()),
            AnnotationConstant::Class(value) => AnnotationValue::Class(value.to_owned()),
        }
    }
}

/// Replays a single element value. `name` is `None` inside arrays and for annotation defaults.
pub(crate) fn accept_value(
    av: &mut dyn AnnotationVisitor,
    name: Option<&JavaStr>,
    value: &AnnotationValue,
) -> ClassFileResult<()> {
    let constant = match value {
        AnnotationValue::Byte(value) => AnnotationConstant::Byte(*value),
        AnnotationValue::Char(value) => AnnotationConstant::Char(*value),
        AnnotationValue::Double(value) => AnnotationConstant::Double(*value),
        AnnotationValue::Float(value) => AnnotationConstant::Float(*value),
        AnnotationValue::Int(value) => AnnotationConstant::Int(*value),
        AnnotationValue::Long(value) => AnnotationConstant::Long(*value),
        AnnotationValue::Short(value) => AnnotationConstant::Short(*value),
        AnnotationValue::Boolean(value) => AnnotationConstant::Boolean(*value),
        AnnotationValue::String(value) => AnnotationConstant::String(value),
        AnnotationValue::Class(value) => AnnotationConstant::Class(value),
        AnnotationValue::Enum { desc, name: value } => return av.visit_enum(name, desc, value),
        AnnotationValue::Annotation(node) => {
            if let Some(mut nested) = av.visit_annotation(name, &node.desc)? {
                node.accept(&mut *nested)?;
            }
            return Ok(());
        }
        AnnotationValue::Array(values) => {
            if let Some(mut array) = av.visit_array(name)? {
                for value in values {
                    accept_value(&mut *array, None, value)?;
                }
                array.visit_end()?;
            }
            return Ok(());
        }
    };
    av.visit(name, constant)
}

/// Where the values received by an annotation visitor end up.
#[derive(Debug)]
pub(crate) enum ValueSink<'a> {
    Named(&'a mut Vec<(JavaString, AnnotationValue)>),
    Array(&'a mut Vec<AnnotationValue>),
    Single(&'a mut Option<AnnotationValue>),
}

impl<'a> ValueSink<'a> {
    fn reborrow(&mut self) -> ValueSink<'_> {
        match self {
            ValueSink::Named(values) => ValueSink::Named(&mut **values),
            ValueSink::Array(values) => ValueSink::Array(&mut **values),
            ValueSink::Single(value) => ValueSink::Single(&mut **value),
        }
    }

    fn push(self, name: Option<&JavaStr>, value: AnnotationValue) -> &'a mut AnnotationValue {
        match self {
            ValueSink::Named(values) => {
                let name = name.unwrap_or(JavaStr::from_str("value")).to_owned();
                let index = values.len();
                values.push((name, value));
                &mut values[index].1
            }
            ValueSink::Array(values) => {
                let index = values.len();
                values.push(value);
                &mut values[index]
            }
            ValueSink::Single(slot) => slot.insert(value),
        }
    }
}

impl AnnotationVisitor for ValueSink<'_> {
    fn visit(
        &mut self,
        name: Option<&JavaStr>,
        value: AnnotationConstant<'_>,
    ) -> ClassFileResult<()> {
        self.reborrow().push(name, AnnotationValue::from_constant(value));
        Ok(())
    }

    fn visit_enum(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
        value: &JavaStr,
    ) -> ClassFileResult<()> {
        self.reborrow().push(
            name,
            AnnotationValue::Enum {
                desc: desc.to_owned(),
                name: value.to_owned(),
            },
        );
        Ok(())
    }

    fn visit_annotation(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        match self
            .reborrow()
            .push(name, AnnotationValue::Annotation(AnnotationNode::new(desc)))
        {
            AnnotationValue::Annotation(node) => {
                Ok(Some(Box::new(ValueSink::Named(&mut node.values))))
            }
            _ => Ok(None),
        }
    }

    fn visit_array(
        &mut self,
        name: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        match self.reborrow().push(name, AnnotationValue::Array(Vec::new())) {
            AnnotationValue::Array(values) => Ok(Some(Box::new(ValueSink::Array(values)))),
            _ => Ok(None),
        }
    }
}

impl AnnotationVisitor for AnnotationNode {
    fn visit(
        &mut self,
        name: Option<&JavaStr>,
        value: AnnotationConstant<'_>,
    ) -> ClassFileResult<()> {
        ValueSink::Named(&mut self.values).visit(name, value)
    }

    fn visit_enum(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
        value: &JavaStr,
    ) -> ClassFileResult<()> {
        ValueSink::Named(&mut self.values).visit_enum(name, desc, value)
    }

    fn visit_annotation(
        &mut self,
        name: Option<&JavaStr>,
        desc: &JavaStr,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let value = AnnotationValue::Annotation(AnnotationNode::new(desc));
        match ValueSink::Named(&mut self.values).push(name, value) {
            AnnotationValue::Annotation(node) => Ok(Some(Box::new(node))),
            _ => Ok(None),
        }
    }

    fn visit_array(
        &mut self,
        name: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        match ValueSink::Named(&mut self.values).push(name, AnnotationValue::Array(Vec::new())) {
            AnnotationValue::Array(values) => Ok(Some(Box::new(ValueSink::Array(values)))),
            _ => Ok(None),
        }
    }
}

/// Appends a new annotation to `list` and returns it, ready to receive its values.
pub(crate) fn push_annotation<'a>(
    list: &'a mut Vec<AnnotationNode>,
    desc: &JavaStr,
) -> Box<dyn AnnotationVisitor + 'a> {
    let index = list.len();
    list.push(AnnotationNode::new(desc));
    Box::new(&mut list[index])
}

pub(crate) fn push_type_annotation<'a>(
    list: &'a mut Vec<TypeAnnotationNode>,
    type_ref: TypeReference,
    type_path: &TypePath<'_>,
    desc: &JavaStr,
) -> Box<dyn AnnotationVisitor + 'a> {
    let index = list.len();
    list.push(TypeAnnotationNode::new(type_ref, type_path, desc));
    Box::new(&mut list[index])
}

#[cfg(test)]
mod test {
    use super::*;

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    #[test]
    fn test_collects_nested_values() {
        let mut node = AnnotationNode::new(s("LA;"));
        node.visit(Some(s("x")), AnnotationConstant::Int(1)).unwrap();
        {
            let mut array = node.visit_array(Some(s("y"))).unwrap().unwrap();
            array.visit(None, AnnotationConstant::Boolean(true)).unwrap();
            let mut nested = array.visit_annotation(None, s("LB;")).unwrap().unwrap();
            nested.visit_enum(Some(s("e")), s("LE;"), s("ONE")).unwrap();
        }
        assert_eq!(
            vec![
                (JavaString::from("x"), AnnotationValue::Int(1)),
                (
                    JavaString::from("y"),
                    AnnotationValue::Array(vec![
                        AnnotationValue::Boolean(true),
                        AnnotationValue::Annotation(AnnotationNode {
                            desc: JavaString::from("LB;"),
                            values: vec![(
                                JavaString::from("e"),
                                AnnotationValue::Enum {
                                    desc: JavaString::from("LE;"),
                                    name: JavaString::from("ONE"),
                                }
                            )],
                        }),
                    ])
                ),
            ],
            node.values
        );
    }

    #[test]
    fn test_accept_replays_into_another_node() {
        let mut node = AnnotationNode::new(s("LA;"));
        node.visit(Some(s("s")), AnnotationConstant::String(s("text"))).unwrap();
        node.visit_array(Some(s("empty"))).unwrap();
        let mut copy = AnnotationNode::new(s("LA;"));
        node.accept(&mut copy).unwrap();
        assert_eq!(node, copy);
    }
}
