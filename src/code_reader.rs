use crate::class_reader::{supports, CommonAttributes, RawAttribute, TypeAnnotationHeader};
use crate::constants::attribute_names;
use crate::opcodes::{expand_implicit_var, insn_kind, InsnKind, InternalOpcodes};
use crate::tree::check_api;
use crate::{
    Api, ClassFileError, ClassFileResult, ClassReader, Frame, FrameValue, IntInsn, Label,
    LocalVariableRange, MethodVisitor, NewArrayType, Opcode, ReaderFlags, TargetLocation,
    TypeReference,
};
use java_string::JavaStr;
use std::collections::BTreeMap;

/// The labels of one method body, keyed by bytecode offset.
#[derive(Debug)]
struct Labels {
    labels: BTreeMap<usize, Label>,
    code_length: usize,
}

impl Labels {
    /// The label at `target`, which may be the end of the code. `source` is the offset in the
    /// class file that referenced it.
    fn at(&mut self, target: usize, source: usize) -> ClassFileResult<Label> {
        if target > self.code_length {
            return Err(ClassFileError::BadBranchTarget {
                target: target as i64,
                offset: source,
            });
        }
        Ok(*self.labels.entry(target).or_insert_with(Label::new))
    }

    /// The label of a branch from the instruction at `insn` (code relative) to `insn + delta`.
    fn branch(&mut self, insn: usize, delta: i64, source: usize) -> ClassFileResult<Label> {
        let target = insn as i64 + delta;
        if target < 0 || target >= self.code_length as i64 {
            return Err(ClassFileError::BadBranchTarget {
                target,
                offset: source,
            });
        }
        self.at(target as usize, source)
    }

    fn get(&self, offset: usize) -> Option<Label> {
        self.labels.get(&offset).copied()
    }
}

struct CodeTypeAnnotation<'class> {
    header: TypeAnnotationHeader<'class>,
    visible: bool,
}

fn opcode(byte: u8, offset: usize) -> ClassFileResult<Opcode> {
    Opcode::from_repr(byte).ok_or(ClassFileError::BadOpcode {
        opcode: byte,
        offset,
    })
}

/// Bytes between a switch opcode and its 4-byte aligned operands.
pub(crate) fn switch_padding(insn: usize) -> usize {
    (4 - (insn + 1) % 4) % 4
}

impl<'class> ClassReader<'class> {
    pub(crate) fn read_code(
        &self,
        mv: &mut (dyn MethodVisitor + '_),
        code: RawAttribute<'class>,
        api: Api,
        flags: ReaderFlags,
        method_name: &JavaStr,
    ) -> ClassFileResult<()> {
        let buffer = self.buffer();
        let max_stack = buffer.read_u16(code.offset)?;
        let max_locals = buffer.read_u16(code.offset + 2)?;
        let code_length = buffer.read_u32(code.offset + 4)? as usize;
        let code_start = code.offset + 8;
        let code_end = code_start + code_length;
        if code_length == 0 || code_end > code.offset + code.len {
            return Err(ClassFileError::BadAttributeLength {
                offset: code.offset + 4,
            });
        }
        log::trace!("reading {code_length} bytes of code of {method_name:?}");

        let mut labels = Labels {
            labels: BTreeMap::new(),
            code_length,
        };

        // first pass: validate instructions and create the labels of branch targets
        let mut pc = code_start;
        while pc < code_end {
            let insn = pc - code_start;
            let byte = buffer.read_u8(pc)?;
            let kind = insn_kind(byte).ok_or(ClassFileError::BadOpcode {
                opcode: byte,
                offset: pc,
            })?;
            pc += match kind {
                InsnKind::Jump => {
                    labels.branch(insn, buffer.read_i16(pc + 1)? as i64, pc)?;
                    3
                }
                InsnKind::JumpWide => {
                    labels.branch(insn, buffer.read_i32(pc + 1)? as i64, pc)?;
                    5
                }
                InsnKind::TableSwitch => {
                    let (dflt, low, high, base) = self.table_switch_header(pc, insn, code_end)?;
                    labels.branch(insn, dflt as i64, pc)?;
                    for i in 0..(high as i64 - low as i64 + 1) as usize {
                        labels.branch(insn, buffer.read_i32(base + i * 4)? as i64, pc)?;
                    }
                    base + (high as i64 - low as i64 + 1) as usize * 4 - pc
                }
                InsnKind::LookupSwitch => {
                    let (dflt, pair_count, base) = self.lookup_switch_header(pc, insn, code_end)?;
                    labels.branch(insn, dflt as i64, pc)?;
                    for i in 0..pair_count {
                        labels.branch(insn, buffer.read_i32(base + i * 8 + 4)? as i64, pc)?;
                    }
                    base + pair_count * 8 - pc
                }
                InsnKind::Wide => {
                    let next = buffer.read_u8(pc + 1)?;
                    match insn_kind(next) {
                        Some(InsnKind::Iinc) => 6,
                        Some(InsnKind::Var) => 4,
                        _ => {
                            return Err(ClassFileError::BadOpcode {
                                opcode: next,
                                offset: pc + 1,
                            })
                        }
                    }
                }
                kind => fixed_insn_length(kind),
            };
        }
        if pc != code_end {
            return Err(ClassFileError::BadAttributeLength {
                offset: code.offset + 4,
            });
        }

        let exception_table = code_end + 2;
        let exception_count = buffer.read_u16(code_end)? as usize;
        for i in 0..exception_count {
            let entry = exception_table + i * 8;
            for field in 0..3 {
                labels.at(buffer.read_u16(entry + field * 2)? as usize, entry)?;
            }
        }

        let mut line_numbers: BTreeMap<usize, Vec<u16>> = BTreeMap::new();
        let mut local_variables = None;
        let mut local_variable_types = None;
        let mut frames = Vec::new();
        let mut type_annotations = Vec::new();
        let mut others = CommonAttributes::default();
        let (attributes, _) = self.read_raw_attributes(exception_table + exception_count * 8)?;
        let skip_debug = flags.contains(ReaderFlags::SKIP_DEBUG);
        for attribute in attributes {
            match attribute.name_str() {
                Some(attribute_names::LINE_NUMBER_TABLE) if !skip_debug => {
                    let count = buffer.read_u16(attribute.offset)? as usize;
                    for i in 0..count {
                        let entry = attribute.offset + 2 + i * 4;
                        let start = buffer.read_u16(entry)? as usize;
                        labels.at(start, entry)?;
                        line_numbers
                            .entry(start)
                            .or_default()
                            .push(buffer.read_u16(entry + 2)?);
                    }
                }
                Some(attribute_names::LOCAL_VARIABLE_TABLE) if !skip_debug => {
                    let count = buffer.read_u16(attribute.offset)? as usize;
                    for i in 0..count {
                        let entry = attribute.offset + 2 + i * 10;
                        let start = buffer.read_u16(entry)? as usize;
                        labels.at(start, entry)?;
                        labels.at(start + buffer.read_u16(entry + 2)? as usize, entry)?;
                    }
                    local_variables = Some(attribute.offset);
                }
                Some(attribute_names::LOCAL_VARIABLE_TYPE_TABLE) if !skip_debug => {
                    local_variable_types = Some(attribute.offset);
                }
                Some(attribute_names::STACK_MAP_TABLE) => {
                    if !flags.contains(ReaderFlags::SKIP_FRAMES) {
                        frames = self.read_frames(attribute.offset, &mut labels)?;
                    }
                }
                Some(
                    name @ (attribute_names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS
                    | attribute_names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS),
                ) => {
                    if !supports(api, Api::V5, "code type annotations") {
                        continue;
                    }
                    let visible = name == attribute_names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS;
                    let count = buffer.read_u16(attribute.offset)?;
                    let mut current = attribute.offset + 2;
                    for _ in 0..count {
                        let header = self.read_type_annotation_header(current)?;
                        current = self.read_element_values(header.values_offset, true, None, 0)?;
                        if let TargetLocation::Ranges(ranges) = &header.location {
                            for &(start, length, _) in ranges {
                                labels.at(start as usize, current)?;
                                labels.at(start as usize + length as usize, current)?;
                            }
                        }
                        type_annotations.push(CodeTypeAnnotation { header, visible });
                    }
                }
                Some(
                    attribute_names::LINE_NUMBER_TABLE
                    | attribute_names::LOCAL_VARIABLE_TABLE
                    | attribute_names::LOCAL_VARIABLE_TYPE_TABLE,
                ) => {}
                _ => others.others.push(attribute),
            }
        }

        // second pass: replay
        mv.visit_code()?;

        for i in 0..exception_count {
            let entry = exception_table + i * 8;
            let start = labels.at(buffer.read_u16(entry)? as usize, entry)?;
            let end = labels.at(buffer.read_u16(entry + 2)? as usize, entry)?;
            let handler = labels.at(buffer.read_u16(entry + 4)? as usize, entry)?;
            let ty = self
                .constant_pool
                .get_optional_class(buffer.read_u16(entry + 6)?)?;
            mv.visit_try_catch_block(start, end, handler, ty.as_deref())?;
        }
        for annotation in &type_annotations {
            if let TypeReference::ExceptionParameter { .. } = annotation.header.type_ref {
                let header = &annotation.header;
                let mut av = mv.visit_try_catch_annotation(
                    header.type_ref,
                    &header.type_path,
                    &header.desc,
                    annotation.visible,
                )?;
                self.read_element_values(header.values_offset, true, av.as_deref_mut(), 0)?;
                if let Some(mut av) = av {
                    av.visit_end()?;
                }
            }
        }

        let mut insn_annotations: BTreeMap<usize, Vec<&CodeTypeAnnotation<'class>>> =
            BTreeMap::new();
        for annotation in &type_annotations {
            match annotation.header.location {
                TargetLocation::Offset(offset)
                    if annotation.header.type_ref.is_instruction_target() =>
                {
                    insn_annotations
                        .entry(offset as usize)
                        .or_default()
                        .push(annotation)
                }
                _ => {}
            }
        }

        let mut frames = frames.into_iter().peekable();
        let mut pc = code_start;
        while pc < code_end {
            let insn = pc - code_start;
            if let Some(label) = labels.get(insn) {
                mv.visit_label(label)?;
                if let Some(lines) = line_numbers.get(&insn) {
                    for &line in lines {
                        mv.visit_line_number(line, label)?;
                    }
                }
            }
            while let Some((_, frame)) = frames.next_if(|(offset, _)| *offset == insn) {
                mv.visit_frame(&frame)?;
            }

            pc = self.read_insn(mv, pc, code_start, &mut labels, api)?;

            if let Some(annotations) = insn_annotations.get(&insn) {
                for annotation in annotations {
                    let header = &annotation.header;
                    let mut av = mv.visit_insn_annotation(
                        header.type_ref,
                        &header.type_path,
                        &header.desc,
                        annotation.visible,
                    )?;
                    self.read_element_values(header.values_offset, true, av.as_deref_mut(), 0)?;
                    if let Some(mut av) = av {
                        av.visit_end()?;
                    }
                }
            }
        }
        if let Some(label) = labels.get(code_length) {
            mv.visit_label(label)?;
        }

        if let Some(offset) = local_variables {
            let mut signatures = BTreeMap::new();
            if let Some(types) = local_variable_types {
                let count = buffer.read_u16(types)? as usize;
                for i in 0..count {
                    let entry = types + 2 + i * 10;
                    let key = (
                        buffer.read_u16(entry)?,
                        buffer.read_u16(entry + 2)?,
                        buffer.read_u16(entry + 8)?,
                    );
                    signatures.insert(key, self.read_utf8(entry + 6)?);
                }
            }
            let count = buffer.read_u16(offset)? as usize;
            for i in 0..count {
                let entry = offset + 2 + i * 10;
                let start = buffer.read_u16(entry)?;
                let length = buffer.read_u16(entry + 2)?;
                let name = self.read_utf8(entry + 4)?;
                let desc = self.read_utf8(entry + 6)?;
                let index = buffer.read_u16(entry + 8)?;
                let signature = signatures.get(&(start, length, index));
                mv.visit_local_variable(
                    &name,
                    &desc,
                    signature.map(|s| &**s),
                    labels.at(start as usize, entry)?,
                    labels.at(start as usize + length as usize, entry)?,
                    index,
                )?;
            }
        }

        for annotation in &type_annotations {
            let header = &annotation.header;
            let TargetLocation::Ranges(ranges) = &header.location else {
                continue;
            };
            let mut local_ranges = Vec::with_capacity(ranges.len());
            for &(start, length, index) in ranges {
                local_ranges.push(LocalVariableRange {
                    start: labels.at(start as usize, code.offset)?,
                    end: labels.at(start as usize + length as usize, code.offset)?,
                    index,
                });
            }
            let mut av = mv.visit_local_variable_annotation(
                header.type_ref,
                &header.type_path,
                &local_ranges,
                &header.desc,
                annotation.visible,
            )?;
            self.read_element_values(header.values_offset, true, av.as_deref_mut(), 0)?;
            if let Some(mut av) = av {
                av.visit_end()?;
            }
        }

        self.read_custom_attributes(mv, &others, true)?;

        mv.visit_maxs(max_stack, max_locals)
    }

    /// Reports the instruction at `pc` and returns the offset of the next one.
    fn read_insn(
        &self,
        mv: &mut (dyn MethodVisitor + '_),
        pc: usize,
        code_start: usize,
        labels: &mut Labels,
        api: Api,
    ) -> ClassFileResult<usize> {
        let buffer = self.buffer();
        let cp = &self.constant_pool;
        let insn = pc - code_start;
        let byte = buffer.read_u8(pc)?;
        let kind = insn_kind(byte).ok_or(ClassFileError::BadOpcode { opcode: byte, offset: pc })?;
        match kind {
            InsnKind::NoOperand => mv.visit_insn(opcode(byte, pc)?)?,
            InsnKind::Bipush => mv.visit_int_insn(IntInsn::Bipush(buffer.read_i8(pc + 1)?))?,
            InsnKind::Sipush => mv.visit_int_insn(IntInsn::Sipush(buffer.read_i16(pc + 1)?))?,
            InsnKind::NewArray => {
                let ty = buffer.read_u8(pc + 1)?;
                let ty = NewArrayType::from_repr(ty).ok_or(ClassFileError::BadOpcode {
                    opcode: ty,
                    offset: pc + 1,
                })?;
                mv.visit_int_insn(IntInsn::NewArray(ty))?
            }
            InsnKind::Ldc | InsnKind::LdcW | InsnKind::Ldc2W => {
                let index = if kind == InsnKind::Ldc {
                    buffer.read_u8(pc + 1)? as u16
                } else {
                    buffer.read_u16(pc + 1)?
                };
                let constant = cp.get_ldc_constant(index)?;
                if constant.is_constant_dynamic() {
                    check_api(api, Api::V7, "dynamic constants")?;
                }
                mv.visit_ldc_insn(&constant)?
            }
            InsnKind::Var => mv.visit_var_insn(opcode(byte, pc)?, buffer.read_u8(pc + 1)? as u16)?,
            InsnKind::ImplicitVar => {
                let (explicit, var_index) = expand_implicit_var(byte);
                mv.visit_var_insn(opcode(explicit, pc)?, var_index)?
            }
            InsnKind::Iinc => mv.visit_iinc_insn(
                buffer.read_u8(pc + 1)? as u16,
                buffer.read_i8(pc + 2)? as i16,
            )?,
            InsnKind::Jump => {
                let label = labels.branch(insn, buffer.read_i16(pc + 1)? as i64, pc)?;
                mv.visit_jump_insn(opcode(byte, pc)?, label)?
            }
            InsnKind::JumpWide => {
                let label = labels.branch(insn, buffer.read_i32(pc + 1)? as i64, pc)?;
                let opcode = if byte == InternalOpcodes::GOTO_W {
                    Opcode::Goto
                } else {
                    Opcode::Jsr
                };
                mv.visit_jump_insn(opcode, label)?
            }
            InsnKind::TableSwitch => {
                let (dflt, low, high, base) =
                    self.table_switch_header(pc, insn, code_start + labels.code_length)?;
                let dflt = labels.branch(insn, dflt as i64, pc)?;
                let count = (high as i64 - low as i64 + 1) as usize;
                let mut targets = Vec::with_capacity(count);
                for i in 0..count {
                    let delta = buffer.read_i32(base + i * 4)?;
                    targets.push(labels.branch(insn, delta as i64, pc)?);
                }
                mv.visit_table_switch_insn(low, high, dflt, &targets)?;
                return Ok(base + count * 4);
            }
            InsnKind::LookupSwitch => {
                let (dflt, pair_count, base) =
                    self.lookup_switch_header(pc, insn, code_start + labels.code_length)?;
                let dflt = labels.branch(insn, dflt as i64, pc)?;
                let mut pairs = Vec::with_capacity(pair_count);
                for i in 0..pair_count {
                    let key = buffer.read_i32(base + i * 8)?;
                    let delta = buffer.read_i32(base + i * 8 + 4)?;
                    let target = labels.branch(insn, delta as i64, pc)?;
                    pairs.push((key, target));
                }
                mv.visit_lookup_switch_insn(dflt, &pairs)?;
                return Ok(base + pair_count * 8);
            }
            InsnKind::Field => {
                let field = cp.get_field_ref(buffer.read_u16(pc + 1)?)?;
                mv.visit_field_insn(opcode(byte, pc)?, &field.owner, &field.name, &field.desc)?
            }
            InsnKind::Method => {
                let (method, is_interface) = cp.get_any_method_ref(buffer.read_u16(pc + 1)?)?;
                mv.visit_method_insn(
                    opcode(byte, pc)?,
                    &method.owner,
                    &method.name,
                    &method.desc,
                    is_interface,
                )?
            }
            InsnKind::InvokeInterface => {
                let method = cp.get_interface_method_ref(buffer.read_u16(pc + 1)?)?;
                mv.visit_method_insn(
                    Opcode::InvokeInterface,
                    &method.owner,
                    &method.name,
                    &method.desc,
                    true,
                )?
            }
            InsnKind::InvokeDynamic => {
                let entry = cp.get_invoke_dynamic(buffer.read_u16(pc + 1)?)?;
                let (bootstrap_method, arguments) =
                    cp.get_bootstrap_method(entry.bootstrap_method_attr_index)?;
                if arguments.iter().any(|argument| argument.is_constant_dynamic()) {
                    check_api(api, Api::V7, "dynamic constants")?;
                }
                mv.visit_invoke_dynamic_insn(
                    &entry.name,
                    &entry.desc,
                    &bootstrap_method,
                    &arguments,
                )?
            }
            InsnKind::Type => {
                let ty = cp.get_class(buffer.read_u16(pc + 1)?)?;
                mv.visit_type_insn(opcode(byte, pc)?, &ty)?
            }
            InsnKind::MultiANewArray => {
                let desc = cp.get_class(buffer.read_u16(pc + 1)?)?;
                mv.visit_multi_a_new_array_insn(&desc, buffer.read_u8(pc + 3)?)?
            }
            InsnKind::Wide => {
                let next = buffer.read_u8(pc + 1)?;
                let var_index = buffer.read_u16(pc + 2)?;
                if next == Opcode::IInc as u8 {
                    mv.visit_iinc_insn(var_index, buffer.read_i16(pc + 4)?)?;
                    return Ok(pc + 6);
                }
                mv.visit_var_insn(opcode(next, pc + 1)?, var_index)?;
                return Ok(pc + 4);
            }
        }
        Ok(pc + fixed_insn_length(kind))
    }

    /// Returns the default offset, low, high and the offset of the jump table.
    fn table_switch_header(
        &self,
        pc: usize,
        insn: usize,
        code_end: usize,
    ) -> ClassFileResult<(i32, i32, i32, usize)> {
        let buffer = self.buffer();
        let operands = pc + 1 + switch_padding(insn);
        let dflt = buffer.read_i32(operands)?;
        let low = buffer.read_i32(operands + 4)?;
        let high = buffer.read_i32(operands + 8)?;
        let base = operands + 12;
        let count = high as i64 - low as i64 + 1;
        if count <= 0 || base as i64 + count * 4 > code_end as i64 {
            return Err(ClassFileError::BadOpcode {
                opcode: Opcode::TableSwitch as u8,
                offset: pc,
            });
        }
        Ok((dflt, low, high, base))
    }

    /// Returns the default offset, the pair count and the offset of the pairs.
    fn lookup_switch_header(
        &self,
        pc: usize,
        insn: usize,
        code_end: usize,
    ) -> ClassFileResult<(i32, usize, usize)> {
        let buffer = self.buffer();
        let operands = pc + 1 + switch_padding(insn);
        let dflt = buffer.read_i32(operands)?;
        let pair_count = buffer.read_i32(operands + 4)?;
        let base = operands + 8;
        if pair_count < 0 || base as i64 + pair_count as i64 * 8 > code_end as i64 {
            return Err(ClassFileError::BadOpcode {
                opcode: Opcode::LookupSwitch as u8,
                offset: pc,
            });
        }
        Ok((dflt, pair_count as usize, base))
    }

    fn read_frames(
        &self,
        offset: usize,
        labels: &mut Labels,
    ) -> ClassFileResult<Vec<(usize, Frame<'class>)>> {
        let buffer = self.buffer();
        let count = buffer.read_u16(offset)? as usize;
        let mut frames = Vec::with_capacity(count);
        let mut current = offset + 2;
        let mut previous: Option<usize> = None;
        for _ in 0..count {
            let frame_type = buffer.read_u8(current)?;
            let frame_offset = current;
            current += 1;
            let (delta, frame) = match frame_type {
                0..=63 => (frame_type as usize, Frame::Same),
                64..=127 => {
                    let value = self.read_frame_value(&mut current, labels)?;
                    (frame_type as usize - 64, Frame::Same1(value))
                }
                247..=255 => {
                    let delta = buffer.read_u16(current)? as usize;
                    current += 2;
                    let frame = match frame_type {
                        247 => Frame::Same1(self.read_frame_value(&mut current, labels)?),
                        248..=250 => Frame::Chop(251 - frame_type),
                        251 => Frame::Same,
                        252..=254 => {
                            let mut locals = Vec::with_capacity(3);
                            for _ in 0..frame_type - 251 {
                                locals.push(self.read_frame_value(&mut current, labels)?);
                            }
                            Frame::Append(locals)
                        }
                        _ => {
                            let locals = self.read_frame_values(&mut current, labels)?;
                            let stack = self.read_frame_values(&mut current, labels)?;
                            Frame::Full { locals, stack }
                        }
                    };
                    (delta, frame)
                }
                _ => {
                    return Err(ClassFileError::BadFrameType {
                        frame_type,
                        offset: frame_offset,
                    })
                }
            };
            let insn = match previous {
                Some(previous) => previous + delta + 1,
                None => delta,
            };
            if insn >= labels.code_length {
                return Err(ClassFileError::BadBranchTarget {
                    target: insn as i64,
                    offset: frame_offset,
                });
            }
            labels.at(insn, frame_offset)?;
            previous = Some(insn);
            frames.push((insn, frame));
        }
        Ok(frames)
    }

    fn read_frame_values(
        &self,
        current: &mut usize,
        labels: &mut Labels,
    ) -> ClassFileResult<Vec<FrameValue<'class>>> {
        let count = self.buffer().read_u16(*current)? as usize;
        *current += 2;
        (0..count)
            .map(|_| self.read_frame_value(current, labels))
            .collect()
    }

    fn read_frame_value(
        &self,
        current: &mut usize,
        labels: &mut Labels,
    ) -> ClassFileResult<FrameValue<'class>> {
        let buffer = self.buffer();
        let offset = *current;
        let tag = buffer.read_u8(offset)?;
        *current += 1;
        Ok(match tag {
            0 => FrameValue::Top,
            1 => FrameValue::Integer,
            2 => FrameValue::Float,
            3 => FrameValue::Double,
            4 => FrameValue::Long,
            5 => FrameValue::Null,
            6 => FrameValue::UninitializedThis,
            7 => {
                *current += 2;
                FrameValue::Class(self.constant_pool.get_class(buffer.read_u16(offset + 1)?)?)
            }
            8 => {
                *current += 2;
                FrameValue::Uninitialized(labels.at(buffer.read_u16(offset + 1)? as usize, offset)?)
            }
            _ => return Err(ClassFileError::BadVerificationType { tag, offset }),
        })
    }
}

/// Length of instructions whose size doesn't depend on their operands or position.
pub(crate) fn fixed_insn_length(kind: InsnKind) -> usize {
    match kind {
        InsnKind::NoOperand | InsnKind::ImplicitVar => 1,
        InsnKind::Bipush | InsnKind::NewArray | InsnKind::Ldc | InsnKind::Var => 2,
        InsnKind::Sipush
        | InsnKind::LdcW
        | InsnKind::Ldc2W
        | InsnKind::Iinc
        | InsnKind::Jump
        | InsnKind::Field
        | InsnKind::Method
        | InsnKind::Type => 3,
        InsnKind::MultiANewArray => 4,
        InsnKind::JumpWide | InsnKind::InvokeInterface | InsnKind::InvokeDynamic => 5,
        // variable length, handled by the callers
        InsnKind::TableSwitch | InsnKind::LookupSwitch | InsnKind::Wide => 0,
    }
}

#[cfg(test)]
mod test {
    use super::switch_padding;

    #[test]
    fn test_switch_padding() {
        assert_eq!(3, switch_padding(0));
        assert_eq!(2, switch_padding(1));
        assert_eq!(1, switch_padding(2));
        assert_eq!(0, switch_padding(3));
        assert_eq!(3, switch_padding(4));
    }
}
