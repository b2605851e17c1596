use crate::{ClassFileError, ClassFileResult};
use java_string::JavaStr;

/// An append-only big-endian byte sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteVector {
    data: Vec<u8>,
}

impl ByteVector {
    pub fn new() -> ByteVector {
        ByteVector::default()
    }

    pub fn with_capacity(capacity: usize) -> ByteVector {
        ByteVector {
            data: Vec::with_capacity(capacity),
        }
    }

    fn reserve_for(&mut self, additional: usize) {
        let required = self.data.len() + additional;
        if required > self.data.capacity() {
            let doubled = self.data.capacity() * 2;
            self.data.reserve_exact(required.max(doubled) - self.data.len());
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.reserve_for(1);
        self.data.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.put_bytes(&value.to_be_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.put_bytes(&value.to_be_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.put_bytes(&value.to_be_bytes());
    }

    pub fn put_i8(&mut self, value: i8) {
        self.put_u8(value as u8);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.put_u16(value as u16);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.put_u32(value as u32);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.put_u64(value as u64);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.reserve_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Writes a `u16` length followed by the modified UTF-8 encoding of `value`.
    pub fn put_utf8(&mut self, value: &JavaStr) -> ClassFileResult<()> {
        let encoded = value.to_modified_utf8();
        if encoded.len() > u16::MAX as usize {
            return Err(ClassFileError::Utf8TooLong { len: encoded.len() });
        }
        self.put_u16(encoded.len() as u16);
        self.put_bytes(&encoded);
        Ok(())
    }

    /// Overwrites two bytes at `offset`, which must already have been written.
    pub fn put_u16_at(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn put_u32_at(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod test {
    use super::ByteVector;
    use crate::ClassFileError;
    use java_string::{JavaStr, JavaString};

    #[test]
    fn test_big_endian() {
        let mut out = ByteVector::new();
        out.put_u8(0xca);
        out.put_u16(0xfeba);
        out.put_i32(-2);
        out.put_u64(1);
        assert_eq!(
            &[0xca, 0xfe, 0xba, 0xff, 0xff, 0xff, 0xfe, 0, 0, 0, 0, 0, 0, 0, 1],
            out.as_slice()
        );
    }

    #[test]
    fn test_patching() {
        let mut out = ByteVector::new();
        out.put_u16(0);
        out.put_u32(0);
        out.put_u16_at(0, 0x1234);
        out.put_u32_at(2, 7);
        assert_eq!(&[0x12, 0x34, 0, 0, 0, 7], out.as_slice());
    }

    #[test]
    fn test_utf8_uses_modified_encoding() {
        let mut out = ByteVector::new();
        out.put_utf8(JavaStr::from_str("a\0")).unwrap();
        assert_eq!(&[0, 3, b'a', 0xc0, 0x80], out.as_slice());
    }

    #[test]
    fn test_utf8_too_long() {
        let long = JavaString::from("x".repeat(70000).as_str());
        let err = ByteVector::new().put_utf8(&long).unwrap_err();
        assert!(matches!(err, ClassFileError::Utf8TooLong { len: 70000 }));
    }
}
