use classkit::tree::ClassNode;
use classkit::{
    Attribute, AttributeReader, ClassBuffer, ClassFileResult, ClassReader, ConstantPoolBuilder,
    ReaderFlags, WriterFlags,
};
use java_string::JavaStr;
use test_helpers::ClassFileBuilder;

#[derive(Debug, Clone)]
struct Marker {
    value: u16,
}

impl Attribute for Marker {
    fn name(&self) -> &JavaStr {
        JavaStr::from_str("Marker")
    }

    fn copy(&self) -> Box<dyn Attribute> {
        Box::new(self.clone())
    }

    fn write(&self, _constant_pool: &mut ConstantPoolBuilder) -> ClassFileResult<Vec<u8>> {
        Ok(self.value.to_be_bytes().to_vec())
    }
}

#[derive(Debug, Clone)]
struct MarkerReader;

impl AttributeReader for MarkerReader {
    fn read<'class>(
        &self,
        name: &JavaStr,
        _reader: &ClassReader<'class>,
        data: ClassBuffer<'class>,
    ) -> ClassFileResult<Option<Box<dyn Attribute>>> {
        if name != JavaStr::from_str("Marker") {
            return Ok(None);
        }
        Ok(Some(Box::new(Marker {
            value: data.read_u16(0)?,
        })))
    }

    fn copy(&self) -> Box<dyn AttributeReader> {
        Box::new(self.clone())
    }
}

fn marked() -> Vec<u8> {
    let mut builder = ClassFileBuilder::new("Marked", Some("java/lang/Object"));
    builder.attribute("Marker", [0, 42]);
    builder.build()
}

#[test]
fn test_registered_reader_decodes_attribute() {
    let bytes = marked();
    let reader = ClassReader::new(&bytes)
        .unwrap()
        .with_attribute_reader(Box::new(MarkerReader));
    let mut node = ClassNode::default();
    reader.accept(&mut node, ReaderFlags::empty()).unwrap();
    assert_eq!(1, node.attributes.len());
    assert_eq!("Marker { value: 42 }", format!("{:?}", node.attributes[0]));
}

#[test]
fn test_unknown_attribute_passes_through() {
    let mut node = ClassNode::default();
    classkit::decode(&marked(), &mut node, ReaderFlags::empty()).unwrap();
    let attribute = &node.attributes[0];
    assert_eq!(JavaStr::from_str("Marker"), attribute.name());
    assert!(!attribute.is_code_attribute());
    assert_eq!(
        vec![0, 42],
        attribute.write(&mut ConstantPoolBuilder::new()).unwrap()
    );

    let encoded = classkit::encode(WriterFlags::empty(), |cv| node.accept(cv)).unwrap();
    let read = ClassNode::from_bytes(&encoded, ReaderFlags::empty()).unwrap();
    assert_eq!(JavaStr::from_str("Marker"), read.attributes[0].name());
}
