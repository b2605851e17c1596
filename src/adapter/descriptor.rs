//! Slot arithmetic and class name rewriting on descriptors and generic signatures.
//!
//! Everything here is lenient: a malformed descriptor yields a best-effort size, and a malformed
//! signature is left untouched by the renaming functions.

use java_string::{JavaStr, JavaString};

/// Offset just past the field type starting at `i`.
fn skip_type(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'L') => match bytes[i..].iter().position(|&b| b == b';') {
            Some(end) => i + end + 1,
            None => bytes.len(),
        },
        Some(_) => i + 1,
        None => i,
    }
}

fn type_size(first: Option<&u8>) -> u16 {
    match first {
        None | Some(b'V') => 0,
        Some(b'J' | b'D') => 2,
        Some(_) => 1,
    }
}

/// Number of local variable or stack slots a value of the field type `desc` takes.
pub fn field_size(desc: &JavaStr) -> u16 {
    type_size(desc.as_bytes().first())
}

/// Calls `f` with the first byte of every argument type of a method descriptor.
fn for_each_argument(desc: &JavaStr, mut f: impl FnMut(u8)) {
    let bytes = desc.as_bytes();
    let mut i = usize::from(bytes.first() == Some(&b'('));
    while let Some(&first) = bytes.get(i) {
        if first == b')' {
            break;
        }
        f(first);
        i = skip_type(bytes, i);
    }
}

pub fn argument_count(desc: &JavaStr) -> usize {
    let mut count = 0;
    for_each_argument(desc, |_| count += 1);
    count
}

/// Slots taken by the arguments of a method descriptor, not counting `this`.
pub fn argument_slots(desc: &JavaStr) -> u16 {
    let mut slots = 0;
    for_each_argument(desc, |first| slots += type_size(Some(&first)));
    slots
}

/// Slots taken by the return value of a method descriptor: 0 for `void`.
pub fn return_slots(desc: &JavaStr) -> u16 {
    let bytes = desc.as_bytes();
    match bytes.iter().rposition(|&b| b == b')') {
        Some(close) => type_size(bytes.get(close + 1)),
        None => 0,
    }
}

/// Rewrites every class name in a field or method descriptor. Returns `None` when nothing
/// changed.
pub fn rename_descriptor(
    desc: &JavaStr,
    rename: &mut dyn FnMut(&JavaStr) -> Option<JavaString>,
) -> Option<JavaString> {
    let bytes = desc.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut changed = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'L' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let end = i + bytes[i..].iter().position(|&b| b == b';')?;
        out.push(b'L');
        changed |= push_class_name(&bytes[i + 1..end], &mut out, rename)?;
        out.push(b';');
        i = end + 1;
    }
    finish(out, changed)
}

/// Rewrites every class name in a class, method or field generic signature. Returns `None` when
/// nothing changed or the signature can't be parsed.
pub fn rename_signature(
    signature: &JavaStr,
    rename: &mut dyn FnMut(&JavaStr) -> Option<JavaString>,
) -> Option<JavaString> {
    let mut walker = SignatureRenamer {
        bytes: signature.as_bytes(),
        pos: 0,
        out: Vec::with_capacity(signature.as_bytes().len()),
        changed: false,
        rename,
    };
    walker.signature()?;
    finish(walker.out, walker.changed)
}

fn push_class_name(
    name: &[u8],
    out: &mut Vec<u8>,
    rename: &mut dyn FnMut(&JavaStr) -> Option<JavaString>,
) -> Option<bool> {
    let name = JavaStr::from_semi_utf8(name).ok()?;
    match rename(name) {
        Some(renamed) => {
            out.extend_from_slice(renamed.as_bytes());
            Some(true)
        }
        None => {
            out.extend_from_slice(name.as_bytes());
            Some(false)
        }
    }
}

fn finish(out: Vec<u8>, changed: bool) -> Option<JavaString> {
    if changed {
        JavaString::from_semi_utf8(out).ok()
    } else {
        None
    }
}

struct SignatureRenamer<'a, 'f> {
    bytes: &'a [u8],
    pos: usize,
    out: Vec<u8>,
    changed: bool,
    rename: &'f mut dyn FnMut(&JavaStr) -> Option<JavaString>,
}

impl SignatureRenamer<'_, '_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn copy(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.out.push(b);
        self.pos += 1;
        Some(b)
    }

    fn copy_until(&mut self, stops: &[u8]) -> Option<()> {
        while !stops.contains(&self.peek()?) {
            self.copy()?;
        }
        Some(())
    }

    fn signature(&mut self) -> Option<()> {
        if self.peek() == Some(b'<') {
            self.formal_type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.copy()?;
            while self.peek()? != b')' {
                self.type_signature()?;
            }
            self.copy()?;
            self.type_signature()?;
            while self.peek() == Some(b'^') {
                self.copy()?;
                self.type_signature()?;
            }
        } else {
            while self.peek().is_some() {
                self.type_signature()?;
            }
        }
        (self.pos == self.bytes.len()).then_some(())
    }

    fn formal_type_parameters(&mut self) -> Option<()> {
        self.copy()?;
        while self.peek()? != b'>' {
            // identifier, class bound, interface bounds
            self.copy_until(b":")?;
            while self.peek() == Some(b':') {
                self.copy()?;
                if matches!(self.peek()?, b'L' | b'[' | b'T') {
                    self.type_signature()?;
                }
            }
        }
        self.copy()?;
        Some(())
    }

    fn type_signature(&mut self) -> Option<()> {
        match self.peek()? {
            b'[' => {
                self.copy()?;
                self.type_signature()
            }
            b'T' => {
                self.copy_until(b";")?;
                self.copy()?;
                Some(())
            }
            b'L' => self.class_type_signature(),
            _ => {
                self.copy()?;
                Some(())
            }
        }
    }

    fn class_type_signature(&mut self) -> Option<()> {
        self.copy()?;
        let start = self.pos;
        while !matches!(self.peek()?, b';' | b'<' | b'.') {
            self.pos += 1;
        }
        let name = &self.bytes[start..self.pos];
        self.changed |= push_class_name(name, &mut self.out, self.rename)?;
        loop {
            match self.peek()? {
                b'<' => {
                    self.copy()?;
                    while self.peek()? != b'>' {
                        match self.peek()? {
                            b'*' => {
                                self.copy()?;
                            }
                            b'+' | b'-' => {
                                self.copy()?;
                                self.type_signature()?;
                            }
                            _ => self.type_signature()?,
                        }
                    }
                    self.copy()?;
                }
                b'.' => {
                    self.copy()?;
                    self.copy_until(b";<.")?;
                }
                _ => {
                    self.copy()?;
                    return Some(());
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    fn renamer(from: &'static str, to: &'static str) -> impl FnMut(&JavaStr) -> Option<JavaString> {
        move |name| (name == s(from)).then(|| JavaString::from(to))
    }

    #[test]
    fn test_slots() {
        assert_eq!(4, argument_slots(s("(IJLjava/lang/String;)V")));
        assert_eq!(3, argument_count(s("(IJLjava/lang/String;)V")));
        assert_eq!(2, argument_slots(s("([J[[D)I")));
        assert_eq!(0, return_slots(s("()V")));
        assert_eq!(2, return_slots(s("()D")));
        assert_eq!(1, return_slots(s("()[J")));
        assert_eq!(2, field_size(s("J")));
        assert_eq!(1, field_size(s("[D")));
    }

    #[test]
    fn test_rename_descriptor() {
        let mut rename = renamer("a/Old", "b/New");
        assert_eq!(
            s("(Lb/New;[Lb/New;I)Lb/New;"),
            &*rename_descriptor(s("(La/Old;[La/Old;I)La/Old;"), &mut rename).unwrap()
        );
        assert_eq!(
            None,
            rename_descriptor(s("(Ljava/lang/Object;)V"), &mut rename)
        );
    }

    #[test]
    fn test_rename_signature() {
        let mut rename = renamer("a/Old", "b/New");
        let generic = "<T:La/Old;U::Ljava/lang/Comparable<TT;>;>Ljava/util/List<+La/Old;>;";
        let renamed = "<T:Lb/New;U::Ljava/lang/Comparable<TT;>;>Ljava/util/List<+Lb/New;>;";
        assert_eq!(
            s(renamed),
            &*rename_signature(s(generic), &mut rename).unwrap()
        );
        assert_eq!(
            s("(TT;Lb/New<*>.Inner;)V^Lb/New;"),
            &*rename_signature(s("(TT;La/Old<*>.Inner;)V^La/Old;"), &mut rename).unwrap()
        );
        assert_eq!(None, rename_signature(s("TT;"), &mut rename));
        assert_eq!(None, rename_signature(s("La/Old"), &mut rename));
    }
}
