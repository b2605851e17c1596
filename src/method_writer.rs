use crate::access::raw_access_flags;
use crate::adapter::descriptor;
use crate::annotation_writer::{AnnotationSet, AnnotationWriter, ParameterAnnotations};
use crate::class_writer::{AttributeTable, CountedTable};
use crate::constants::attribute_names;
use crate::jump_layout::{self, CodeItem, CodeLayout};
use crate::opcodes::{implicit_var_opcode, InsnKind, InternalOpcodes};
use crate::{
    AnnotationVisitor, Attribute, BootstrapMethodArgument, ByteVector, ClassFileError,
    ClassFileResult, ConstantPoolBuilder, Frame, FrameValue, Handle, IntInsn, Label, LdcConstant,
    LocalVariableRange, MethodAccess, MethodVisitor, Opcode, ParameterAccess, TargetLocation,
    TypePath, TypeReference,
};
use java_string::{JavaStr, JavaString};

/// Where a code type annotation points, until offsets are known.
#[derive(Debug)]
enum Anchor {
    /// The instruction recorded as the code item at this index.
    Insn(usize),
    Ranges(Vec<LocalVariableRange>),
    /// Exception parameter annotations carry their exception table index in the type reference.
    TypeReferenceOnly,
}

#[derive(Debug)]
struct CodeTypeAnnotation {
    visible: bool,
    type_ref: TypeReference,
    anchor: Anchor,
    type_path: TypePath<'static>,
    /// The type index followed by the element value pairs.
    body: ByteVector,
}

#[derive(Debug)]
struct LocalVariable {
    name: u16,
    desc: u16,
    signature: Option<u16>,
    start: Label,
    end: Label,
    index: u16,
}

#[derive(Debug)]
struct TryCatchBlock {
    start: Label,
    end: Label,
    handler: Label,
    catch_type: u16,
}

/// The recorded contents of a `Code` attribute.
#[derive(Debug, Default)]
struct Code {
    items: Vec<CodeItem>,
    fixed: ByteVector,
    last_insn: Option<usize>,
    /// Frames with the index of the code item they precede.
    frames: Vec<(usize, Frame<'static>)>,
    line_numbers: Vec<(Label, u16)>,
    local_variables: Vec<LocalVariable>,
    try_catch_blocks: Vec<TryCatchBlock>,
    type_annotations: Vec<CodeTypeAnnotation>,
    attributes: Vec<Box<dyn Attribute>>,
    max_stack: u16,
    max_locals: u16,
}

impl Code {
    fn push_insn(&mut self, item: CodeItem) {
        self.last_insn = Some(self.items.len());
        self.items.push(item);
    }

    fn insn(&mut self, encode: impl FnOnce(&mut ByteVector)) {
        let start = self.fixed.len();
        encode(&mut self.fixed);
        let end = self.fixed.len();
        self.push_insn(CodeItem::Fixed(start..end));
    }

    fn encode(
        self,
        constant_pool: &mut ConstantPoolBuilder,
        method: &JavaStr,
    ) -> ClassFileResult<Vec<u8>> {
        let layout = jump_layout::layout(&self.items, self.fixed.as_slice(), method)?;

        let mut out = ByteVector::with_capacity(layout.code.len() + 32);
        out.put_u16(self.max_stack);
        out.put_u16(self.max_locals);
        out.put_u32(layout.code.len() as u32);
        out.put_bytes(&layout.code);

        let mut exception_table = CountedTable::default();
        for block in &self.try_catch_blocks {
            let entry = exception_table.entry("exception table entries")?;
            entry.put_u16(layout.label_offset(block.start, method)?);
            entry.put_u16(layout.label_offset(block.end, method)?);
            entry.put_u16(layout.label_offset(block.handler, method)?);
            entry.put_u16(block.catch_type);
        }
        exception_table.write(&mut out);

        // debug tables come before the frames, as javac writes them
        let mut attributes = AttributeTable::default();
        if !self.line_numbers.is_empty() {
            let mut table = CountedTable::default();
            for &(start, line) in &self.line_numbers {
                let entry = table.entry("line numbers")?;
                entry.put_u16(layout.label_offset(start, method)?);
                entry.put_u16(line);
            }
            attributes.add(
                constant_pool,
                attribute_names::LINE_NUMBER_TABLE,
                &table.to_bytes(),
            )?;
        }

        if !self.local_variables.is_empty() {
            let mut table = CountedTable::default();
            let mut type_table = CountedTable::default();
            for variable in &self.local_variables {
                let start = layout.label_offset(variable.start, method)?;
                let length = layout
                    .label_offset(variable.end, method)?
                    .saturating_sub(start);
                let entry = table.entry("local variables")?;
                entry.put_u16(start);
                entry.put_u16(length);
                entry.put_u16(variable.name);
                entry.put_u16(variable.desc);
                entry.put_u16(variable.index);
                if let Some(signature) = variable.signature {
                    let entry = type_table.entry("local variable types")?;
                    entry.put_u16(start);
                    entry.put_u16(length);
                    entry.put_u16(variable.name);
                    entry.put_u16(signature);
                    entry.put_u16(variable.index);
                }
            }
            attributes.add(
                constant_pool,
                attribute_names::LOCAL_VARIABLE_TABLE,
                &table.to_bytes(),
            )?;
            if !type_table.is_empty() {
                attributes.add(
                    constant_pool,
                    attribute_names::LOCAL_VARIABLE_TYPE_TABLE,
                    &type_table.to_bytes(),
                )?;
            }
        }

        if !self.frames.is_empty() {
            let body = encode_frames(&self.frames, &layout, constant_pool, method)?;
            attributes.add(constant_pool, attribute_names::STACK_MAP_TABLE, &body)?;
        }

        let mut visible = AnnotationSet::default();
        let mut invisible = AnnotationSet::default();
        for annotation in &self.type_annotations {
            let location = match &annotation.anchor {
                Anchor::Insn(item) => TargetLocation::Offset(layout.positions[*item] as u16),
                Anchor::Ranges(ranges) => TargetLocation::Ranges(
                    ranges
                        .iter()
                        .map(|range| {
                            let start = layout.label_offset(range.start, method)?;
                            let end = layout.label_offset(range.end, method)?;
                            Ok((start, end.saturating_sub(start), range.index))
                        })
                        .collect::<ClassFileResult<_>>()?,
                ),
                Anchor::TypeReferenceOnly => TargetLocation::None,
            };
            let mut bytes = ByteVector::new();
            annotation.type_ref.write(&location, &mut bytes);
            annotation.type_path.write(&mut bytes);
            bytes.put_bytes(annotation.body.as_slice());
            if annotation.visible {
                visible.add_raw(bytes.as_slice())?;
            } else {
                invisible.add_raw(bytes.as_slice())?;
            }
        }
        attributes.add_type_annotations(constant_pool, &visible, &invisible)?;

        for attribute in &self.attributes {
            attributes.add_custom(constant_pool, &**attribute)?;
        }
        attributes.write(&mut out);
        Ok(out.into_vec())
    }
}

fn encode_frames(
    frames: &[(usize, Frame<'static>)],
    layout: &CodeLayout,
    constant_pool: &mut ConstantPoolBuilder,
    method: &JavaStr,
) -> ClassFileResult<Vec<u8>> {
    let mut table = CountedTable::default();
    let mut previous: Option<usize> = None;
    for (item, frame) in frames {
        let offset = layout.positions[*item];
        let delta = match previous {
            None => offset,
            Some(previous) if offset > previous => offset - previous - 1,
            Some(_) => {
                log::warn!("dropping second frame at offset {offset} in {method:?}");
                continue;
            }
        };
        previous = Some(offset);
        let delta = delta as u16;

        let out = table.entry("stack map frames")?;
        match frame {
            Frame::Same if delta < 64 => out.put_u8(delta as u8),
            Frame::Same => {
                out.put_u8(251);
                out.put_u16(delta);
            }
            Frame::Same1(value) => {
                if delta < 64 {
                    out.put_u8(64 + delta as u8);
                } else {
                    out.put_u8(247);
                    out.put_u16(delta);
                }
                put_frame_value(out, value, layout, constant_pool, method)?;
            }
            Frame::Chop(count) => {
                assert!((1..=3).contains(count), "can't chop {count} locals");
                out.put_u8(251 - count);
                out.put_u16(delta);
            }
            Frame::Append(locals) => {
                assert!(
                    (1..=3).contains(&locals.len()),
                    "can't append {} locals",
                    locals.len()
                );
                out.put_u8(251 + locals.len() as u8);
                out.put_u16(delta);
                for value in locals {
                    put_frame_value(out, value, layout, constant_pool, method)?;
                }
            }
            Frame::Full { locals, stack } => {
                out.put_u8(255);
                out.put_u16(delta);
                for values in [locals, stack] {
                    out.put_u16(values.len() as u16);
                    for value in values {
                        put_frame_value(out, value, layout, constant_pool, method)?;
                    }
                }
            }
        }
    }
    Ok(table.to_bytes())
}

fn put_frame_value(
    out: &mut ByteVector,
    value: &FrameValue<'_>,
    layout: &CodeLayout,
    constant_pool: &mut ConstantPoolBuilder,
    method: &JavaStr,
) -> ClassFileResult<()> {
    out.put_u8(value.tag());
    match value {
        FrameValue::Class(name) => out.put_u16(constant_pool.add_class(name)?),
        FrameValue::Uninitialized(label) => out.put_u16(layout.label_offset(*label, method)?),
        _ => {}
    }
    Ok(())
}

/// Encodes one `method_info` structure as its events arrive, appending it to the class's method
/// table at `visit_end`.
#[derive(Debug)]
pub(crate) struct MethodWriter<'a> {
    constant_pool: &'a mut ConstantPoolBuilder,
    methods: &'a mut CountedTable,
    major_version: u16,
    access: MethodAccess,
    name: JavaString,
    name_index: u16,
    desc_index: u16,
    signature: Option<u16>,
    exceptions: Vec<u16>,
    parameters: Vec<(u16, ParameterAccess)>,
    annotation_default: Option<ByteVector>,
    visible_annotations: AnnotationSet,
    invisible_annotations: AnnotationSet,
    visible_type_annotations: AnnotationSet,
    invisible_type_annotations: AnnotationSet,
    visible_parameter_annotations: ParameterAnnotations,
    invisible_parameter_annotations: ParameterAnnotations,
    attributes: Vec<Box<dyn Attribute>>,
    code: Option<Code>,
}

impl<'a> MethodWriter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        constant_pool: &'a mut ConstantPoolBuilder,
        methods: &'a mut CountedTable,
        major_version: u16,
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> ClassFileResult<MethodWriter<'a>> {
        let name_index = constant_pool.add_utf8(name)?;
        let desc_index = constant_pool.add_utf8(desc)?;
        let signature = signature
            .map(|signature| constant_pool.add_utf8(signature))
            .transpose()?;
        let exceptions = exceptions
            .iter()
            .map(|exception| constant_pool.add_class(exception))
            .collect::<ClassFileResult<_>>()?;
        Ok(MethodWriter {
            constant_pool,
            methods,
            major_version,
            access,
            name: name.to_owned(),
            name_index,
            desc_index,
            signature,
            exceptions,
            parameters: Vec::new(),
            annotation_default: None,
            visible_annotations: AnnotationSet::default(),
            invisible_annotations: AnnotationSet::default(),
            visible_type_annotations: AnnotationSet::default(),
            invisible_type_annotations: AnnotationSet::default(),
            visible_parameter_annotations: ParameterAnnotations::default(),
            invisible_parameter_annotations: ParameterAnnotations::default(),
            attributes: Vec::new(),
            code: None,
        })
    }

    fn code(&mut self) -> &mut Code {
        self.code.get_or_insert_with(Code::default)
    }

    fn code_type_annotation(
        &mut self,
        type_ref: TypeReference,
        anchor: Anchor,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let mut body = ByteVector::new();
        body.put_u16(self.constant_pool.add_utf8(desc)?);
        let code = self.code.get_or_insert_with(Code::default);
        code.type_annotations.push(CodeTypeAnnotation {
            visible,
            type_ref,
            anchor,
            type_path: type_path.clone().into_owned(),
            body,
        });
        let index = code.type_annotations.len() - 1;
        Ok(Some(Box::new(AnnotationWriter::new(
            self.constant_pool,
            &mut code.type_annotations[index].body,
            true,
        ))))
    }
}

fn encode_parameters(parameters: &[(u16, ParameterAccess)]) -> ClassFileResult<Vec<u8>> {
    let count = u8::try_from(parameters.len()).map_err(|_| ClassFileError::TooManyEntries {
        what: "method parameters",
    })?;
    let mut out = ByteVector::with_capacity(1 + 4 * parameters.len());
    out.put_u8(count);
    for &(name, access) in parameters {
        out.put_u16(name);
        out.put_u16(access.bits());
    }
    Ok(out.into_vec())
}

fn assert_kind(opcode: Opcode, kinds: &[InsnKind], event: &str) {
    assert!(
        kinds.contains(&opcode.kind()),
        "{opcode} can't be visited with {event}"
    );
}

impl MethodVisitor for MethodWriter<'_> {
    fn visit_parameter(
        &mut self,
        name: Option<&JavaStr>,
        access: ParameterAccess,
    ) -> ClassFileResult<()> {
        let name = match name {
            Some(name) => self.constant_pool.add_utf8(name)?,
            None => 0,
        };
        self.parameters.push((name, access));
        Ok(())
    }

    fn visit_annotation_default(
        &mut self,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let out = self.annotation_default.insert(ByteVector::new());
        Ok(Some(Box::new(AnnotationWriter::single(
            self.constant_pool,
            out,
        ))))
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let set = if visible {
            &mut self.visible_annotations
        } else {
            &mut self.invisible_annotations
        };
        Ok(Some(Box::new(set.add(self.constant_pool, desc)?)))
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let set = if visible {
            &mut self.visible_type_annotations
        } else {
            &mut self.invisible_type_annotations
        };
        Ok(Some(Box::new(set.add_type_annotation(
            self.constant_pool,
            type_ref,
            &TargetLocation::None,
            type_path,
            desc,
        )?)))
    }

    fn visit_annotable_parameter_count(
        &mut self,
        parameter_count: u8,
        visible: bool,
    ) -> ClassFileResult<()> {
        let annotations = if visible {
            &mut self.visible_parameter_annotations
        } else {
            &mut self.invisible_parameter_annotations
        };
        annotations.annotable_count = Some(parameter_count);
        Ok(())
    }

    fn visit_parameter_annotation(
        &mut self,
        parameter: u8,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let annotations = if visible {
            &mut self.visible_parameter_annotations
        } else {
            &mut self.invisible_parameter_annotations
        };
        Ok(Some(Box::new(
            annotations
                .parameter(parameter)
                .add(self.constant_pool, desc)?,
        )))
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        if attribute.is_code_attribute() {
            self.code().attributes.push(attribute.copy());
        } else {
            self.attributes.push(attribute.copy());
        }
        Ok(())
    }

    fn visit_code(&mut self) -> ClassFileResult<()> {
        self.code();
        Ok(())
    }

    fn visit_frame(&mut self, frame: &Frame<'_>) -> ClassFileResult<()> {
        let code = self.code();
        let item = code.items.len();
        code.frames.push((item, frame.clone().into_owned()));
        Ok(())
    }

    fn visit_insn(&mut self, opcode: Opcode) -> ClassFileResult<()> {
        assert_kind(opcode, &[InsnKind::NoOperand], "visit_insn");
        self.code().insn(|out| out.put_u8(opcode as u8));
        Ok(())
    }

    fn visit_int_insn(&mut self, insn: IntInsn) -> ClassFileResult<()> {
        self.code().insn(|out| {
            out.put_u8(insn.opcode() as u8);
            match insn {
                IntInsn::Bipush(value) => out.put_i8(value),
                IntInsn::Sipush(value) => out.put_i16(value),
                IntInsn::NewArray(ty) => out.put_u8(ty as u8),
            }
        });
        Ok(())
    }

    fn visit_var_insn(&mut self, opcode: Opcode, var_index: u16) -> ClassFileResult<()> {
        assert_kind(opcode, &[InsnKind::Var], "visit_var_insn");
        self.code().insn(|out| {
            if let Some(implicit) = implicit_var_opcode(opcode, var_index) {
                out.put_u8(implicit);
            } else if var_index <= u8::MAX as u16 {
                out.put_u8(opcode as u8);
                out.put_u8(var_index as u8);
            } else {
                out.put_u8(InternalOpcodes::WIDE);
                out.put_u8(opcode as u8);
                out.put_u16(var_index);
            }
        });
        Ok(())
    }

    fn visit_type_insn(&mut self, opcode: Opcode, ty: &JavaStr) -> ClassFileResult<()> {
        assert_kind(opcode, &[InsnKind::Type], "visit_type_insn");
        let index = self.constant_pool.add_class(ty)?;
        self.code().insn(|out| {
            out.put_u8(opcode as u8);
            out.put_u16(index);
        });
        Ok(())
    }

    fn visit_field_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
    ) -> ClassFileResult<()> {
        assert_kind(opcode, &[InsnKind::Field], "visit_field_insn");
        let index = self.constant_pool.add_field_ref(owner, name, desc)?;
        self.code().insn(|out| {
            out.put_u8(opcode as u8);
            out.put_u16(index);
        });
        Ok(())
    }

    fn visit_method_insn(
        &mut self,
        opcode: Opcode,
        owner: &JavaStr,
        name: &JavaStr,
        desc: &JavaStr,
        is_interface: bool,
    ) -> ClassFileResult<()> {
        assert_kind(
            opcode,
            &[InsnKind::Method, InsnKind::InvokeInterface],
            "visit_method_insn",
        );
        let index = self
            .constant_pool
            .add_method_ref(owner, name, desc, is_interface)?;
        self.code().insn(|out| {
            out.put_u8(opcode as u8);
            out.put_u16(index);
            if opcode == Opcode::InvokeInterface {
                out.put_u8((descriptor::argument_slots(desc) + 1) as u8);
                out.put_u8(0);
            }
        });
        Ok(())
    }

    fn visit_invoke_dynamic_insn(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        bootstrap_method: &Handle<'_>,
        bootstrap_method_arguments: &[BootstrapMethodArgument<'_>],
    ) -> ClassFileResult<()> {
        let index = self.constant_pool.add_invoke_dynamic(
            name,
            desc,
            bootstrap_method,
            bootstrap_method_arguments,
        )?;
        self.code().insn(|out| {
            out.put_u8(Opcode::InvokeDynamic as u8);
            out.put_u16(index);
            out.put_u16(0);
        });
        Ok(())
    }

    fn visit_jump_insn(&mut self, opcode: Opcode, label: Label) -> ClassFileResult<()> {
        assert_kind(opcode, &[InsnKind::Jump], "visit_jump_insn");
        self.code().push_insn(CodeItem::Jump {
            opcode,
            target: label,
        });
        Ok(())
    }

    fn visit_label(&mut self, label: Label) -> ClassFileResult<()> {
        self.code().items.push(CodeItem::Label(label));
        Ok(())
    }

    fn visit_ldc_insn(&mut self, constant: &LdcConstant<'_>) -> ClassFileResult<()> {
        let index = self.constant_pool.add_constant(constant)?;
        let wide = constant.is_wide();
        self.code().insn(|out| {
            if wide {
                out.put_u8(InternalOpcodes::LDC2_W);
                out.put_u16(index);
            } else if index <= u8::MAX as u16 {
                out.put_u8(Opcode::Ldc as u8);
                out.put_u8(index as u8);
            } else {
                out.put_u8(InternalOpcodes::LDC_W);
                out.put_u16(index);
            }
        });
        Ok(())
    }

    fn visit_iinc_insn(&mut self, var_index: u16, increment: i16) -> ClassFileResult<()> {
        self.code().insn(|out| match i8::try_from(increment) {
            Ok(increment) if var_index <= u8::MAX as u16 => {
                out.put_u8(Opcode::IInc as u8);
                out.put_u8(var_index as u8);
                out.put_i8(increment);
            }
            _ => {
                out.put_u8(InternalOpcodes::WIDE);
                out.put_u8(Opcode::IInc as u8);
                out.put_u16(var_index);
                out.put_i16(increment);
            }
        });
        Ok(())
    }

    fn visit_table_switch_insn(
        &mut self,
        low: i32,
        high: i32,
        dflt: Label,
        labels: &[Label],
    ) -> ClassFileResult<()> {
        self.code().push_insn(CodeItem::TableSwitch {
            low,
            high,
            dflt,
            targets: labels.to_vec(),
        });
        Ok(())
    }

    fn visit_lookup_switch_insn(
        &mut self,
        dflt: Label,
        values: &[(i32, Label)],
    ) -> ClassFileResult<()> {
        self.code().push_insn(CodeItem::LookupSwitch {
            dflt,
            pairs: values.to_vec(),
        });
        Ok(())
    }

    fn visit_multi_a_new_array_insn(
        &mut self,
        desc: &JavaStr,
        dimensions: u8,
    ) -> ClassFileResult<()> {
        let index = self.constant_pool.add_class(desc)?;
        self.code().insn(|out| {
            out.put_u8(Opcode::MultiANewArray as u8);
            out.put_u16(index);
            out.put_u8(dimensions);
        });
        Ok(())
    }

    fn visit_insn_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        let anchor = Anchor::Insn(self.code().last_insn.unwrap_or(0));
        self.code_type_annotation(type_ref, anchor, type_path, desc, visible)
    }

    fn visit_try_catch_block(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        ty: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        let catch_type = match ty {
            Some(ty) => self.constant_pool.add_class(ty)?,
            None => 0,
        };
        self.code().try_catch_blocks.push(TryCatchBlock {
            start,
            end,
            handler,
            catch_type,
        });
        Ok(())
    }

    fn visit_try_catch_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.code_type_annotation(
            type_ref,
            Anchor::TypeReferenceOnly,
            type_path,
            desc,
            visible,
        )
    }

    fn visit_local_variable(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        start: Label,
        end: Label,
        index: u16,
    ) -> ClassFileResult<()> {
        let variable = LocalVariable {
            name: self.constant_pool.add_utf8(name)?,
            desc: self.constant_pool.add_utf8(desc)?,
            signature: signature
                .map(|signature| self.constant_pool.add_utf8(signature))
                .transpose()?,
            start,
            end,
            index,
        };
        self.code().local_variables.push(variable);
        Ok(())
    }

    fn visit_local_variable_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        ranges: &[LocalVariableRange],
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.code_type_annotation(
            type_ref,
            Anchor::Ranges(ranges.to_vec()),
            type_path,
            desc,
            visible,
        )
    }

    fn visit_line_number(&mut self, line: u16, start: Label) -> ClassFileResult<()> {
        self.code().line_numbers.push((start, line));
        Ok(())
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) -> ClassFileResult<()> {
        let code = self.code();
        code.max_stack = max_stack;
        code.max_locals = max_locals;
        Ok(())
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        let cp = &mut *self.constant_pool;
        let access = self.access.bits();
        let mut attributes = AttributeTable::default();

        if let Some(code) = self.code.take() {
            let body = code.encode(cp, &self.name)?;
            attributes.add(cp, attribute_names::CODE, &body)?;
        }
        if !self.exceptions.is_empty() {
            let mut table = CountedTable::default();
            for &exception in &self.exceptions {
                table.entry("exceptions")?.put_u16(exception);
            }
            attributes.add(cp, attribute_names::EXCEPTIONS, &table.to_bytes())?;
        }
        attributes.add_common(cp, access, self.major_version, self.signature)?;
        attributes.add_annotations(cp, &self.visible_annotations, &self.invisible_annotations)?;
        for (annotations, name) in [
            (
                &self.visible_parameter_annotations,
                attribute_names::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
            ),
            (
                &self.invisible_parameter_annotations,
                attribute_names::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
            ),
        ] {
            if !annotations.is_empty() {
                attributes.add(cp, name, &annotations.to_bytes())?;
            }
        }
        attributes.add_type_annotations(
            cp,
            &self.visible_type_annotations,
            &self.invisible_type_annotations,
        )?;
        if let Some(default) = &self.annotation_default {
            attributes.add(cp, attribute_names::ANNOTATION_DEFAULT, default.as_slice())?;
        }
        if !self.parameters.is_empty() {
            let body = encode_parameters(&self.parameters)?;
            attributes.add(cp, attribute_names::METHOD_PARAMETERS, &body)?;
        }
        for attribute in &self.attributes {
            attributes.add_custom(cp, &**attribute)?;
        }

        let out = self.methods.entry("methods")?;
        out.put_u16(raw_access_flags(access, self.major_version));
        out.put_u16(self.name_index);
        out.put_u16(self.desc_index);
        attributes.write(out);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_method(produce: impl FnOnce(&mut MethodWriter<'_>)) -> (ConstantPoolBuilder, Vec<u8>) {
        let mut pool = ConstantPoolBuilder::new();
        let mut methods = CountedTable::default();
        {
            let mut writer = MethodWriter::new(
                &mut pool,
                &mut methods,
                52,
                MethodAccess::Static,
                JavaStr::from_str("m"),
                JavaStr::from_str("()V"),
                None,
                &[],
            )
            .unwrap();
            produce(&mut writer);
            writer.visit_end().unwrap();
        }
        (pool, methods.to_bytes())
    }

    /// The code array inside a method table holding a single method with a `Code` attribute.
    fn code_array(method_table: &[u8]) -> &[u8] {
        // count, access, name, desc, attribute count, name, length, max stack, max locals
        let len = u32::from_be_bytes(method_table[20..24].try_into().unwrap()) as usize;
        &method_table[24..24 + len]
    }

    #[test]
    fn test_implicit_and_wide_vars() {
        let (_, methods) = write_method(|mv| {
            mv.visit_code().unwrap();
            mv.visit_var_insn(Opcode::ILoad, 2).unwrap();
            mv.visit_var_insn(Opcode::AStore, 7).unwrap();
            mv.visit_var_insn(Opcode::LLoad, 300).unwrap();
            mv.visit_iinc_insn(1, -1).unwrap();
            mv.visit_iinc_insn(1, 200).unwrap();
            mv.visit_insn(Opcode::Return).unwrap();
            mv.visit_maxs(2, 302).unwrap();
        });
        assert_eq!(
            &[
                28, // iload_2
                58, 7, // astore 7
                196, 22, 1, 44, // wide lload 300
                132, 1, 0xff, // iinc 1 -1
                196, 132, 0, 1, 0, 200, // wide iinc 1 200
                177
            ],
            code_array(&methods)
        );
    }

    #[test]
    fn test_invoke_interface_counts_argument_slots() {
        let (_, methods) = write_method(|mv| {
            mv.visit_code().unwrap();
            mv.visit_method_insn(
                Opcode::InvokeInterface,
                JavaStr::from_str("a/I"),
                JavaStr::from_str("f"),
                JavaStr::from_str("(JI)V"),
                true,
            )
            .unwrap();
            mv.visit_maxs(4, 0).unwrap();
        });
        let code = code_array(&methods);
        assert_eq!(185, code[0]);
        assert_eq!(&[4, 0], &code[3..5]);
    }

    #[test]
    fn test_frames_are_delta_encoded() {
        let first = Label::new();
        let second = Label::new();
        let (mut pool, methods) = write_method(|mv| {
            mv.visit_code().unwrap();
            mv.visit_jump_insn(Opcode::Goto, second).unwrap();
            mv.visit_label(first).unwrap();
            mv.visit_frame(&Frame::Same).unwrap();
            mv.visit_insn(Opcode::Nop).unwrap();
            mv.visit_label(second).unwrap();
            mv.visit_frame(&Frame::Same).unwrap();
            mv.visit_insn(Opcode::Return).unwrap();
            mv.visit_maxs(0, 0).unwrap();
        });
        let stack_map_table = pool
            .add_utf8(JavaStr::from_str(attribute_names::STACK_MAP_TABLE))
            .unwrap()
            .to_be_bytes();
        let code_end = 24 + 5;
        // no exception table, one code attribute
        assert_eq!(&[0, 0, 0, 1], &methods[code_end..code_end + 4]);
        assert_eq!(&stack_map_table, &methods[code_end + 4..code_end + 6]);
        // two frames: same at 3, then same at 4 (delta 4 - 3 - 1)
        assert_eq!(
            &[0, 0, 0, 4, 0, 2, 3, 0],
            &methods[code_end + 6..code_end + 14]
        );
    }

    #[test]
    fn test_unresolved_label_names_method() {
        let mut pool = ConstantPoolBuilder::new();
        let mut methods = CountedTable::default();
        let mut writer = MethodWriter::new(
            &mut pool,
            &mut methods,
            52,
            MethodAccess::empty(),
            JavaStr::from_str("broken"),
            JavaStr::from_str("()V"),
            None,
            &[],
        )
        .unwrap();
        writer.visit_code().unwrap();
        writer.visit_jump_insn(Opcode::Goto, Label::new()).unwrap();
        writer.visit_maxs(0, 0).unwrap();
        let err = writer.visit_end().unwrap_err();
        assert!(matches!(
            err,
            ClassFileError::UnresolvedLabel { ref method, .. }
                if &**method == JavaStr::from_str("broken")
        ));
    }

    #[test]
    #[should_panic]
    fn test_jump_with_non_jump_opcode() {
        let _ = write_method(|mv| {
            mv.visit_code().unwrap();
            mv.visit_jump_insn(Opcode::Nop, Label::new()).unwrap();
        });
    }
}
