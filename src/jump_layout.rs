use crate::code_reader::switch_padding;
use crate::opcodes::InternalOpcodes;
use crate::{ByteVector, ClassFileError, ClassFileResult, Label, Opcode};
use java_string::JavaStr;
use std::collections::HashMap;
use std::ops::Range;

/// Longest code array the `Code` attribute can describe.
pub(crate) const MAX_CODE_LENGTH: usize = 65535;

/// One element of a method body as recorded by the writer, before offsets are known.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CodeItem {
    /// An instruction whose encoding doesn't depend on its position, stored in the writer's
    /// fixed byte buffer.
    Fixed(Range<usize>),
    Label(Label),
    Jump {
        opcode: Opcode,
        target: Label,
    },
    TableSwitch {
        low: i32,
        high: i32,
        dflt: Label,
        targets: Vec<Label>,
    },
    LookupSwitch {
        dflt: Label,
        pairs: Vec<(i32, Label)>,
    },
}

/// The final code array of a method and the resolved offsets of everything in it.
#[derive(Debug)]
pub(crate) struct CodeLayout {
    pub code: Vec<u8>,
    /// Offset of each item, followed by the code length.
    pub positions: Vec<usize>,
    labels: HashMap<Label, usize>,
}

impl CodeLayout {
    pub(crate) fn label_offset(&self, label: Label, method: &JavaStr) -> ClassFileResult<u16> {
        self.labels
            .get(&label)
            .map(|&offset| offset as u16)
            .ok_or_else(|| ClassFileError::UnresolvedLabel {
                method: method.to_owned(),
                label,
            })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum JumpWidth {
    Narrow,
    Wide,
    /// Was narrowed once, then stopped fitting. Never narrowed again.
    PinnedWide,
}

fn jump_size(opcode: Opcode, width: JumpWidth) -> usize {
    match width {
        JumpWidth::Narrow => 3,
        _ if matches!(opcode, Opcode::Goto | Opcode::Jsr) => 5,
        // inverted condition over a goto_w
        _ => 8,
    }
}

/// Whether a wide jump measured at `delta` still reaches its target once narrowed. A forward
/// target comes closer by the bytes the narrowing saves.
fn narrow_fits(opcode: Opcode, delta: i64) -> bool {
    let saved = (jump_size(opcode, JumpWidth::Wide) - jump_size(opcode, JumpWidth::Narrow)) as i64;
    let narrow_delta = if delta > 0 { delta - saved } else { delta };
    i16::try_from(narrow_delta).is_ok()
}

struct Offsets {
    positions: Vec<usize>,
    labels: HashMap<Label, usize>,
}

fn measure_offsets(items: &[CodeItem], widths: &[JumpWidth]) -> Offsets {
    let mut positions = Vec::with_capacity(items.len() + 1);
    let mut labels = HashMap::new();
    let mut offset = 0;
    for (item, &width) in items.iter().zip(widths) {
        positions.push(offset);
        offset += match item {
            CodeItem::Fixed(range) => range.len(),
            CodeItem::Label(label) => {
                labels.entry(*label).or_insert(offset);
                0
            }
            CodeItem::Jump { opcode, .. } => jump_size(*opcode, width),
            CodeItem::TableSwitch { targets, .. } => {
                1 + switch_padding(offset) + 12 + 4 * targets.len()
            }
            CodeItem::LookupSwitch { pairs, .. } => {
                1 + switch_padding(offset) + 8 + 8 * pairs.len()
            }
        };
    }
    positions.push(offset);
    Offsets { positions, labels }
}

/// Chooses the width of every jump, resolves every label and encodes the code array.
///
/// Jumps start wide and are narrowed while their offset delta fits in 16 bits. Narrowing can
/// move switch padding, so a narrowed jump may stop fitting. It then goes back to wide for
/// good, which bounds the number of rounds.
pub(crate) fn layout(
    items: &[CodeItem],
    fixed: &[u8],
    method: &JavaStr,
) -> ClassFileResult<CodeLayout> {
    let jump_count = items
        .iter()
        .filter(|item| matches!(item, CodeItem::Jump { .. }))
        .count();
    let max_rounds = 2 * jump_count + 2;
    let mut widths = vec![JumpWidth::Wide; items.len()];

    let mut round = 0;
    let measure = loop {
        let measure = measure_offsets(items, &widths);
        let mut changed = false;
        for (i, item) in items.iter().enumerate() {
            let CodeItem::Jump { opcode, target } = item else {
                continue;
            };
            let target_offset =
                *measure
                    .labels
                    .get(target)
                    .ok_or_else(|| ClassFileError::UnresolvedLabel {
                        method: method.to_owned(),
                        label: *target,
                    })?;
            let delta = target_offset as i64 - measure.positions[i] as i64;
            match widths[i] {
                JumpWidth::Wide if narrow_fits(*opcode, delta) => {
                    widths[i] = JumpWidth::Narrow;
                    changed = true;
                }
                JumpWidth::Narrow if i16::try_from(delta).is_err() => {
                    log::debug!(
                        "jump at {} in {method:?} no longer fits after narrowing, widening",
                        measure.positions[i]
                    );
                    widths[i] = JumpWidth::PinnedWide;
                    changed = true;
                }
                _ => {}
            }
        }
        if !changed {
            break measure;
        }
        round += 1;
        if round > max_rounds {
            return Err(ClassFileError::JumpLayoutDiverged {
                method: method.to_owned(),
            });
        }
    };
    log::debug!("jump layout of {method:?} converged after {round} rounds");

    let code_length = measure.positions[items.len()];
    if code_length > MAX_CODE_LENGTH {
        return Err(ClassFileError::CodeTooLarge {
            method: method.to_owned(),
            len: code_length,
        });
    }

    let resolve = |label: &Label| -> ClassFileResult<i64> {
        measure
            .labels
            .get(label)
            .map(|&offset| offset as i64)
            .ok_or_else(|| ClassFileError::UnresolvedLabel {
                method: method.to_owned(),
                label: *label,
            })
    };

    let mut code = ByteVector::with_capacity(code_length);
    for (i, item) in items.iter().enumerate() {
        let position = measure.positions[i];
        let pos = position as i64;
        match item {
            CodeItem::Fixed(range) => code.put_bytes(&fixed[range.clone()]),
            CodeItem::Label(_) => {}
            CodeItem::Jump { opcode, target } => {
                let delta = resolve(target)? - pos;
                match (widths[i], opcode) {
                    (JumpWidth::Narrow, _) => {
                        code.put_u8(*opcode as u8);
                        code.put_i16(delta as i16);
                    }
                    (_, Opcode::Goto) => {
                        code.put_u8(InternalOpcodes::GOTO_W);
                        code.put_i32(delta as i32);
                    }
                    (_, Opcode::Jsr) => {
                        code.put_u8(InternalOpcodes::JSR_W);
                        code.put_i32(delta as i32);
                    }
                    (_, opcode) => {
                        // if !cond goto next; goto_w target; next:
                        let inverted = opcode.inverted_condition().unwrap_or(*opcode);
                        code.put_u8(inverted as u8);
                        code.put_i16(8);
                        code.put_u8(InternalOpcodes::GOTO_W);
                        code.put_i32((delta - 3) as i32);
                    }
                }
            }
            CodeItem::TableSwitch {
                low,
                high,
                dflt,
                targets,
            } => {
                code.put_u8(Opcode::TableSwitch as u8);
                for _ in 0..switch_padding(position) {
                    code.put_u8(0);
                }
                code.put_i32((resolve(dflt)? - pos) as i32);
                code.put_i32(*low);
                code.put_i32(*high);
                for target in targets {
                    code.put_i32((resolve(target)? - pos) as i32);
                }
            }
            CodeItem::LookupSwitch { dflt, pairs } => {
                code.put_u8(Opcode::LookupSwitch as u8);
                for _ in 0..switch_padding(position) {
                    code.put_u8(0);
                }
                code.put_i32((resolve(dflt)? - pos) as i32);
                code.put_i32(pairs.len() as i32);
                for (key, target) in pairs {
                    code.put_i32(*key);
                    code.put_i32((resolve(target)? - pos) as i32);
                }
            }
        }
    }
    debug_assert_eq!(code_length, code.len());

    Ok(CodeLayout {
        code: code.into_vec(),
        positions: measure.positions,
        labels: measure.labels,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn method() -> &'static JavaStr {
        JavaStr::from_str("test")
    }

    #[test]
    fn test_short_jump_is_narrow() {
        let target = Label::new();
        let fixed = [Opcode::Nop as u8, Opcode::Return as u8];
        let items = vec![
            CodeItem::Jump {
                opcode: Opcode::Goto,
                target,
            },
            CodeItem::Fixed(0..1),
            CodeItem::Label(target),
            CodeItem::Fixed(1..2),
        ];
        let layout = layout(&items, &fixed, method()).unwrap();
        assert_eq!(vec![167, 0, 4, 0, 177], layout.code);
        assert_eq!(4, layout.label_offset(target, method()).unwrap());
        assert_eq!(vec![0, 3, 4, 4, 5], layout.positions);
    }

    #[test]
    fn test_far_jumps_are_wide() {
        let target = Label::new();
        let fixed = vec![Opcode::Nop as u8; 40000];
        let items = vec![
            CodeItem::Jump {
                opcode: Opcode::Goto,
                target,
            },
            CodeItem::Jump {
                opcode: Opcode::IfEq,
                target,
            },
            CodeItem::Fixed(0..40000),
            CodeItem::Label(target),
        ];
        let layout = layout(&items, &fixed, method()).unwrap();
        // goto_w +13
        assert_eq!(&[200, 0, 0, 0x9c, 0x4d], &layout.code[..5]);
        // ifne +8, goto_w +(40013 - 8)
        assert_eq!(&[154, 0, 8, 200, 0, 0, 0x9c, 0x45], &layout.code[5..13]);
        assert_eq!(40013, layout.label_offset(target, method()).unwrap());
    }

    fn forward(opcode: Opcode, distance: usize) -> Vec<u8> {
        let target = Label::new();
        let fixed = vec![Opcode::Nop as u8; distance];
        let items = vec![
            CodeItem::Jump { opcode, target },
            CodeItem::Fixed(0..distance),
            CodeItem::Label(target),
        ];
        let layout = layout(&items, &fixed, method()).unwrap();
        let jump_len = layout.code.len() - distance;
        layout.code[..jump_len].to_vec()
    }

    fn backward(distance: usize) -> Vec<u8> {
        let start = Label::new();
        let fixed = vec![Opcode::Nop as u8; distance];
        let items = vec![
            CodeItem::Label(start),
            CodeItem::Fixed(0..distance),
            CodeItem::Jump {
                opcode: Opcode::Goto,
                target: start,
            },
        ];
        let layout = layout(&items, &fixed, method()).unwrap();
        layout.code[distance..].to_vec()
    }

    #[test]
    fn test_forward_jump_narrow_limit() {
        // the narrow form lands exactly 32767 bytes ahead
        assert_eq!(vec![167, 0x7f, 0xff], forward(Opcode::Goto, 32764));
        assert_eq!(vec![200, 0, 0, 0x80, 0x02], forward(Opcode::Goto, 32765));
        assert_eq!(vec![153, 0x7f, 0xff], forward(Opcode::IfEq, 32764));
        assert_eq!(
            vec![154, 0, 8, 200, 0, 0, 0x80, 0x02],
            forward(Opcode::IfEq, 32765)
        );
    }

    #[test]
    fn test_backward_jump_narrow_limit() {
        assert_eq!(vec![167, 0x80, 0x00], backward(32768));
        assert_eq!(vec![200, 0xff, 0xff, 0x7f, 0xff], backward(32769));
    }

    #[test]
    fn test_backward_jump() {
        let start = Label::new();
        let fixed = [Opcode::Nop as u8];
        let items = vec![
            CodeItem::Label(start),
            CodeItem::Fixed(0..1),
            CodeItem::Jump {
                opcode: Opcode::Goto,
                target: start,
            },
        ];
        let layout = layout(&items, &fixed, method()).unwrap();
        assert_eq!(vec![0, 167, 0xff, 0xff], layout.code);
    }

    #[test]
    fn test_switch_padding_follows_position() {
        let dflt = Label::new();
        let fixed = [Opcode::Nop as u8];
        let items = vec![
            CodeItem::Fixed(0..1),
            CodeItem::LookupSwitch {
                dflt,
                pairs: vec![(1, dflt)],
            },
            CodeItem::Label(dflt),
        ];
        let layout = layout(&items, &fixed, method()).unwrap();
        // nop, lookupswitch at 1, 2 bytes of padding, default, npairs, one pair
        assert_eq!(1 + 1 + 2 + 8 + 8, layout.code.len());
        assert_eq!(&[0, 171, 0, 0, 0, 0, 0, 19], &layout.code[..8]);
    }

    #[test]
    fn test_unresolved_label() {
        let items = vec![CodeItem::Jump {
            opcode: Opcode::Goto,
            target: Label::new(),
        }];
        assert!(matches!(
            layout(&items, &[], method()),
            Err(ClassFileError::UnresolvedLabel { .. })
        ));
    }

    #[test]
    fn test_code_too_large() {
        let fixed = vec![0; MAX_CODE_LENGTH + 1];
        let items = vec![CodeItem::Fixed(0..fixed.len())];
        assert!(matches!(
            layout(&items, &fixed, method()),
            Err(ClassFileError::CodeTooLarge { len: 65536, .. })
        ));
    }
}
