use crate::constants::attribute_names;
use crate::{
    AnnotationConstant, AnnotationVisitor, Api, Attribute, AttributeReader, ClassAccess,
    ClassFileError, ClassFileResult, ClassVersion, ClassVisitor, ConstantPool, FieldAccess,
    FieldValue, FieldVisitor, InnerClassAccess, MethodAccess, MethodVisitor, ModuleAccess,
    ModuleRelationAccess, ModuleRequireAccess, ModuleVisitor, ParameterAccess, ReaderFlags,
    RecordComponentVisitor, TargetLocation, TypePath, TypeReference, UnknownAttribute,
    LATEST_MAJOR_VERSION,
};
use java_string::JavaStr;
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};

/// Nesting limit for annotation values inside annotation values.
const MAX_ANNOTATION_DEPTH: usize = 256;

pub struct ClassReader<'class> {
    buffer: ClassBuffer<'class>,
    pub constant_pool: ConstantPool<'class>,
    version: ClassVersion,
    metadata_start: usize,
    attributes_start: usize,
    attribute_readers: Vec<Box<dyn AttributeReader>>,
}

impl Debug for ClassReader<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassReader")
            .field("version", &self.version)
            .field("len", &self.buffer.len())
            .field("attribute_readers", &self.attribute_readers)
            .finish_non_exhaustive()
    }
}

impl<'class> ClassReader<'class> {
    pub fn new(data: &'class [u8]) -> ClassFileResult<ClassReader<'class>> {
        let buffer = ClassBuffer { data };

        if buffer.read_u32(0)? != 0xcafebabe {
            return Err(ClassFileError::BadMagic);
        }
        let version = ClassVersion::new(buffer.read_u16(6)?, buffer.read_u16(4)?);
        if version.major > LATEST_MAJOR_VERSION {
            return Err(ClassFileError::UnsupportedVersion(version.major));
        }

        let (constant_pool, metadata_start) = ConstantPool::new(buffer)?;

        let interface_count = buffer.read_u16(metadata_start + 6)? as usize;
        let mut offset = metadata_start + 8 + interface_count * 2;
        // fields, then methods
        for _ in 0..2 {
            let member_count = buffer.read_u16(offset)?;
            offset += 2;
            for _ in 0..member_count {
                offset = skip_attributes(&buffer, offset + 6)?;
            }
        }
        let attributes_start = offset;

        let mut reader = ClassReader {
            buffer,
            constant_pool,
            version,
            metadata_start,
            attributes_start,
            attribute_readers: Vec::new(),
        };
        for attribute in reader.read_raw_attributes(attributes_start)?.0 {
            if attribute.name == attribute_names::BOOTSTRAP_METHODS.as_bytes() {
                reader.constant_pool.set_bootstrap_methods(attribute.offset)?;
            }
        }
        Ok(reader)
    }

    /// Registers a decoder for custom attributes. Attributes no reader recognizes are reported as
    /// [`UnknownAttribute`]s.
    pub fn with_attribute_reader(mut self, reader: Box<dyn AttributeReader>) -> Self {
        self.attribute_readers.push(reader);
        self
    }

    pub fn version(&self) -> ClassVersion {
        self.version
    }

    pub fn access(&self) -> ClassFileResult<ClassAccess> {
        Ok(ClassAccess::from_bits_retain(
            self.buffer.read_u16(self.metadata_start)? as u32,
        ))
    }

    pub fn name(&self) -> ClassFileResult<Cow<'class, JavaStr>> {
        self.constant_pool
            .get_class(self.buffer.read_u16(self.metadata_start + 2)?)
    }

    pub fn super_name(&self) -> ClassFileResult<Option<Cow<'class, JavaStr>>> {
        self.constant_pool
            .get_optional_class(self.buffer.read_u16(self.metadata_start + 4)?)
    }

    pub fn interfaces(&self) -> ClassFileResult<InterfacesIterator<'_, 'class>> {
        let interface_count = self.buffer.read_u16(self.metadata_start + 6)? as usize;
        Ok(InterfacesIterator {
            reader: self,
            interface_count,
            index: 0,
        })
    }

    /// Reads the `Utf8` entry whose index is stored at `offset`.
    pub fn read_utf8(&self, offset: usize) -> ClassFileResult<Cow<'class, JavaStr>> {
        self.constant_pool.get_utf8(self.buffer.read_u16(offset)?)
    }

    pub fn buffer(&self) -> ClassBuffer<'class> {
        self.buffer
    }

    /// Replays the class into `visitor`.
    ///
    /// Events the visitor's [`Api`] doesn't know about are dropped, except for dynamic constants
    /// in `ldc` instructions, which fail with [`ClassFileError::UnsupportedApi`].
    pub fn accept(
        &self,
        visitor: &mut dyn ClassVisitor,
        flags: ReaderFlags,
    ) -> ClassFileResult<()> {
        let api = visitor.api();
        let header = self.metadata_start;
        let mut access = self.buffer.read_u16(header)? as u32;
        let name = self.name()?;
        let super_name = self.super_name()?;
        let interfaces = self.interfaces()?.collect::<ClassFileResult<Vec<_>>>()?;

        let mut common = CommonAttributes::default();
        let mut source_file = None;
        let mut source_debug = None;
        let mut module = None;
        let mut module_packages = None;
        let mut module_main_class = None;
        let mut nest_host = None;
        let mut enclosing_method = None;
        let mut nest_members = None;
        let mut permitted_subclasses = None;
        let mut inner_classes = None;
        let mut record = None;
        for attribute in self.read_raw_attributes(self.attributes_start)?.0 {
            match attribute.name_str() {
                Some(attribute_names::SOURCE_FILE) => source_file = Some(attribute.offset),
                Some(attribute_names::SOURCE_DEBUG_EXTENSION) => source_debug = Some(attribute),
                Some(attribute_names::MODULE) => module = Some(attribute.offset),
                Some(attribute_names::MODULE_PACKAGES) => module_packages = Some(attribute.offset),
                Some(attribute_names::MODULE_MAIN_CLASS) => {
                    module_main_class = Some(attribute.offset)
                }
                Some(attribute_names::NEST_HOST) => nest_host = Some(attribute.offset),
                Some(attribute_names::ENCLOSING_METHOD) => {
                    enclosing_method = Some(attribute.offset)
                }
                Some(attribute_names::NEST_MEMBERS) => nest_members = Some(attribute.offset),
                Some(attribute_names::PERMITTED_SUBCLASSES) => {
                    permitted_subclasses = Some(attribute.offset)
                }
                Some(attribute_names::INNER_CLASSES) => inner_classes = Some(attribute.offset),
                Some(attribute_names::RECORD) => record = Some(attribute.offset),
                Some(attribute_names::BOOTSTRAP_METHODS) => {}
                _ => common.collect(attribute),
            }
        }
        access |= common.access_flags();
        if record.is_some() {
            access |= ClassAccess::Record.bits();
        }

        let signature = self.optional_utf8(common.signature)?;
        let interface_refs: Vec<&JavaStr> = interfaces.iter().map(|itf| &**itf).collect();
        visitor.visit(
            self.version,
            ClassAccess::from_bits_retain(access),
            &name,
            signature.as_deref(),
            super_name.as_deref(),
            &interface_refs,
        )?;

        if !flags.contains(ReaderFlags::SKIP_DEBUG)
            && (source_file.is_some() || source_debug.is_some())
        {
            let source = self.optional_utf8(source_file)?;
            let debug = match source_debug {
                Some(attribute) => Some(JavaStr::from_modified_utf8(
                    self.buffer.read_bytes(attribute.offset, attribute.len)?,
                )?),
                None => None,
            };
            visitor.visit_source(source.as_deref(), debug.as_deref())?;
        }

        if let Some(offset) = module {
            if supports(api, Api::V6, "module") {
                self.read_module(visitor, offset, module_packages, module_main_class)?;
            }
        }

        if let Some(offset) = nest_host {
            if supports(api, Api::V7, "nest host") {
                let nest_host = self.constant_pool.get_class(self.buffer.read_u16(offset)?)?;
                visitor.visit_nest_host(&nest_host)?;
            }
        }

        if let Some(offset) = enclosing_method {
            let owner = self.constant_pool.get_class(self.buffer.read_u16(offset)?)?;
            let method = self
                .constant_pool
                .get_optional_name_and_type(self.buffer.read_u16(offset + 2)?)?;
            let (method_name, method_desc) = match &method {
                Some(method) => (Some(&*method.name), Some(&*method.desc)),
                None => (None, None),
            };
            visitor.visit_outer_class(&owner, method_name, method_desc)?;
        }

        self.read_annotations(visitor, &common, api)?;
        self.read_custom_attributes(visitor, &common, false)?;

        if let Some(offset) = nest_members {
            if supports(api, Api::V7, "nest members") {
                for member in self.read_class_list(offset)? {
                    visitor.visit_nest_member(&member)?;
                }
            }
        }

        if let Some(offset) = permitted_subclasses {
            if supports(api, Api::V9, "permitted subclasses") {
                for subclass in self.read_class_list(offset)? {
                    visitor.visit_permitted_subclass(&subclass)?;
                }
            }
        }

        if let Some(offset) = inner_classes {
            let count = self.buffer.read_u16(offset)? as usize;
            for i in 0..count {
                let entry = offset + 2 + i * 8;
                let name = self.constant_pool.get_class(self.buffer.read_u16(entry)?)?;
                let outer_name = self
                    .constant_pool
                    .get_optional_class(self.buffer.read_u16(entry + 2)?)?;
                let inner_name = self
                    .constant_pool
                    .get_optional_utf8(self.buffer.read_u16(entry + 4)?)?;
                let access = InnerClassAccess::from_bits_retain(self.buffer.read_u16(entry + 6)?);
                visitor.visit_inner_class(
                    &name,
                    outer_name.as_deref(),
                    inner_name.as_deref(),
                    access,
                )?;
            }
        }

        if let Some(offset) = record {
            if supports(api, Api::V8, "record components") {
                let count = self.buffer.read_u16(offset)?;
                let mut current = offset + 2;
                for _ in 0..count {
                    current = self.read_record_component(visitor, current)?;
                }
            }
        }

        let interface_count = self.buffer.read_u16(header + 6)? as usize;
        let mut offset = header + 8 + interface_count * 2;
        let field_count = self.buffer.read_u16(offset)?;
        offset += 2;
        for _ in 0..field_count {
            offset = self.read_field(visitor, offset, api)?;
        }
        let method_count = self.buffer.read_u16(offset)?;
        offset += 2;
        for _ in 0..method_count {
            offset = self.read_method(visitor, offset, api, flags)?;
        }

        visitor.visit_end()
    }

    fn read_module(
        &self,
        visitor: &mut (dyn ClassVisitor + '_),
        offset: usize,
        packages: Option<usize>,
        main_class: Option<usize>,
    ) -> ClassFileResult<()> {
        let cp = &self.constant_pool;
        let name = cp.get_module(self.buffer.read_u16(offset)?)?;
        let access = ModuleAccess::from_bits_retain(self.buffer.read_u16(offset + 2)?);
        let version = cp.get_optional_utf8(self.buffer.read_u16(offset + 4)?)?;
        let Some(mut mv) = visitor.visit_module(&name, access, version.as_deref())? else {
            return Ok(());
        };

        if let Some(main_class) = main_class {
            let main_class = cp.get_class(self.buffer.read_u16(main_class)?)?;
            mv.visit_main_class(&main_class)?;
        }
        if let Some(packages) = packages {
            let count = self.buffer.read_u16(packages)? as usize;
            for i in 0..count {
                let package = cp.get_package(self.buffer.read_u16(packages + 2 + i * 2)?)?;
                mv.visit_package(&package)?;
            }
        }

        let mut current = offset + 6;
        let requires_count = self.buffer.read_u16(current)?;
        current += 2;
        for _ in 0..requires_count {
            let module = cp.get_module(self.buffer.read_u16(current)?)?;
            let access = ModuleRequireAccess::from_bits_retain(self.buffer.read_u16(current + 2)?);
            let version = cp.get_optional_utf8(self.buffer.read_u16(current + 4)?)?;
            mv.visit_require(&module, access, version.as_deref())?;
            current += 6;
        }

        for opens in [false, true] {
            let count = self.buffer.read_u16(current)?;
            current += 2;
            for _ in 0..count {
                let package = cp.get_package(self.buffer.read_u16(current)?)?;
                let access =
                    ModuleRelationAccess::from_bits_retain(self.buffer.read_u16(current + 2)?);
                let to_count = self.buffer.read_u16(current + 4)? as usize;
                let mut modules = Vec::with_capacity(to_count);
                for i in 0..to_count {
                    modules.push(cp.get_module(self.buffer.read_u16(current + 6 + i * 2)?)?);
                }
                current += 6 + to_count * 2;
                let module_refs: Vec<&JavaStr> = modules.iter().map(|m| &**m).collect();
                if opens {
                    mv.visit_open(&package, access, &module_refs)?;
                } else {
                    mv.visit_export(&package, access, &module_refs)?;
                }
            }
        }

        let uses_count = self.buffer.read_u16(current)?;
        current += 2;
        for _ in 0..uses_count {
            let service = cp.get_class(self.buffer.read_u16(current)?)?;
            mv.visit_use(&service)?;
            current += 2;
        }

        let provides_count = self.buffer.read_u16(current)?;
        current += 2;
        for _ in 0..provides_count {
            let service = cp.get_class(self.buffer.read_u16(current)?)?;
            let with_count = self.buffer.read_u16(current + 2)? as usize;
            let mut providers = Vec::with_capacity(with_count);
            for i in 0..with_count {
                providers.push(cp.get_class(self.buffer.read_u16(current + 4 + i * 2)?)?);
            }
            current += 4 + with_count * 2;
            let provider_refs: Vec<&JavaStr> = providers.iter().map(|p| &**p).collect();
            mv.visit_provide(&service, &provider_refs)?;
        }

        mv.visit_end()
    }

    fn read_record_component(
        &self,
        visitor: &mut (dyn ClassVisitor + '_),
        offset: usize,
    ) -> ClassFileResult<usize> {
        let name = self.read_utf8(offset)?;
        let desc = self.read_utf8(offset + 2)?;
        let (attributes, end) = self.read_raw_attributes(offset + 4)?;
        let mut common = CommonAttributes::default();
        for attribute in attributes {
            common.collect(attribute);
        }
        let signature = self.optional_utf8(common.signature)?;

        let api = visitor.api();
        if let Some(mut rcv) = visitor.visit_record_component(&name, &desc, signature.as_deref())? {
            self.read_annotations(&mut *rcv, &common, api)?;
            self.read_custom_attributes(&mut *rcv, &common, false)?;
            rcv.visit_end()?;
        }
        Ok(end)
    }

    fn read_field(
        &self,
        visitor: &mut (dyn ClassVisitor + '_),
        offset: usize,
        api: Api,
    ) -> ClassFileResult<usize> {
        let mut access = self.buffer.read_u16(offset)? as u32;
        let name = self.read_utf8(offset + 2)?;
        let desc = self.read_utf8(offset + 4)?;
        let (attributes, end) = self.read_raw_attributes(offset + 6)?;
        let mut common = CommonAttributes::default();
        let mut constant_value = None;
        for attribute in attributes {
            match attribute.name_str() {
                Some(attribute_names::CONSTANT_VALUE) => {
                    constant_value = Some(self.buffer.read_u16(attribute.offset)?)
                }
                _ => common.collect(attribute),
            }
        }
        access |= common.access_flags();
        let signature = self.optional_utf8(common.signature)?;
        let value = match constant_value {
            Some(index) => Some(self.read_field_value(index)?),
            None => None,
        };

        if let Some(mut fv) = visitor.visit_field(
            FieldAccess::from_bits_retain(access),
            &name,
            &desc,
            signature.as_deref(),
            value.as_ref(),
        )? {
            self.read_annotations(&mut *fv, &common, api)?;
            self.read_custom_attributes(&mut *fv, &common, false)?;
            fv.visit_end()?;
        }
        Ok(end)
    }

    fn read_field_value(&self, index: u16) -> ClassFileResult<FieldValue<'class>> {
        use crate::ConstantPoolTag;
        let cp = &self.constant_pool;
        Ok(match cp.get_type(index)? {
            ConstantPoolTag::Integer => FieldValue::Integer(cp.get_i32(index)?),
            ConstantPoolTag::Float => FieldValue::Float(cp.get_f32(index)?),
            ConstantPoolTag::Long => FieldValue::Long(cp.get_i64(index)?),
            ConstantPoolTag::Double => FieldValue::Double(cp.get_f64(index)?),
            ConstantPoolTag::String => FieldValue::String(cp.get_string(index)?),
            actual => {
                return Err(ClassFileError::BadConstantPoolType {
                    expected: ConstantPoolTag::Integer,
                    actual,
                })
            }
        })
    }

    fn read_method(
        &self,
        visitor: &mut (dyn ClassVisitor + '_),
        offset: usize,
        api: Api,
        flags: ReaderFlags,
    ) -> ClassFileResult<usize> {
        let mut access = self.buffer.read_u16(offset)? as u32;
        let name = self.read_utf8(offset + 2)?;
        let desc = self.read_utf8(offset + 4)?;
        let (attributes, end) = self.read_raw_attributes(offset + 6)?;
        let mut common = CommonAttributes::default();
        let mut code = None;
        let mut exceptions = None;
        let mut method_parameters = None;
        let mut annotation_default = None;
        let mut visible_parameter_annotations = None;
        let mut invisible_parameter_annotations = None;
        for attribute in attributes {
            match attribute.name_str() {
                Some(attribute_names::CODE) => code = Some(attribute),
                Some(attribute_names::EXCEPTIONS) => exceptions = Some(attribute.offset),
                Some(attribute_names::METHOD_PARAMETERS) => {
                    method_parameters = Some(attribute.offset)
                }
                Some(attribute_names::ANNOTATION_DEFAULT) => {
                    annotation_default = Some(attribute.offset)
                }
                Some(attribute_names::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS) => {
                    visible_parameter_annotations = Some(attribute.offset)
                }
                Some(attribute_names::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS) => {
                    invisible_parameter_annotations = Some(attribute.offset)
                }
                _ => common.collect(attribute),
            }
        }
        access |= common.access_flags();
        let signature = self.optional_utf8(common.signature)?;
        let exceptions = match exceptions {
            Some(offset) => self.read_class_list(offset)?,
            None => Vec::new(),
        };
        let exception_refs: Vec<&JavaStr> = exceptions.iter().map(|e| &**e).collect();

        let Some(mut mv) = visitor.visit_method(
            MethodAccess::from_bits_retain(access),
            &name,
            &desc,
            signature.as_deref(),
            &exception_refs,
        )?
        else {
            return Ok(end);
        };

        if let Some(offset) = method_parameters {
            if !flags.contains(ReaderFlags::SKIP_DEBUG)
                && supports(api, Api::V5, "method parameters")
            {
                let count = self.buffer.read_u8(offset)? as usize;
                for i in 0..count {
                    let entry = offset + 1 + i * 4;
                    let name = self
                        .constant_pool
                        .get_optional_utf8(self.buffer.read_u16(entry)?)?;
                    let access =
                        ParameterAccess::from_bits_retain(self.buffer.read_u16(entry + 2)?);
                    mv.visit_parameter(name.as_deref(), access)?;
                }
            }
        }

        if let Some(offset) = annotation_default {
            let mut av = mv.visit_annotation_default()?;
            self.read_element_value(offset, None, av.as_deref_mut(), 0)?;
            if let Some(mut av) = av {
                av.visit_end()?;
            }
        }

        self.read_annotations(&mut *mv, &common, api)?;

        for (offset, visible) in [
            (visible_parameter_annotations, true),
            (invisible_parameter_annotations, false),
        ] {
            let Some(offset) = offset else { continue };
            let parameter_count = self.buffer.read_u8(offset)?;
            mv.visit_annotable_parameter_count(parameter_count, visible)?;
            let mut current = offset + 1;
            for parameter in 0..parameter_count {
                let annotation_count = self.buffer.read_u16(current)?;
                current += 2;
                for _ in 0..annotation_count {
                    let desc = self.read_utf8(current)?;
                    let mut av = mv.visit_parameter_annotation(parameter, &desc, visible)?;
                    current = self.read_element_values(current + 2, true, av.as_deref_mut(), 0)?;
                    if let Some(mut av) = av {
                        av.visit_end()?;
                    }
                }
            }
        }

        self.read_custom_attributes(&mut *mv, &common, false)?;

        if let Some(code) = code {
            if !flags.contains(ReaderFlags::SKIP_CODE) {
                self.read_code(&mut *mv, code, api, flags, &name)?;
            }
        }

        mv.visit_end()?;
        Ok(end)
    }

    fn read_annotations<V: AnnotatedVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        common: &CommonAttributes<'class>,
        api: Api,
    ) -> ClassFileResult<()> {
        for (offset, visible) in [
            (common.visible_annotations, true),
            (common.invisible_annotations, false),
        ] {
            let Some(offset) = offset else { continue };
            let count = self.buffer.read_u16(offset)?;
            let mut current = offset + 2;
            for _ in 0..count {
                let desc = self.read_utf8(current)?;
                let mut av = visitor.annotation(&desc, visible)?;
                current = self.read_element_values(current + 2, true, av.as_deref_mut(), 0)?;
                if let Some(mut av) = av {
                    av.visit_end()?;
                }
            }
        }

        for (offset, visible) in [
            (common.visible_type_annotations, true),
            (common.invisible_type_annotations, false),
        ] {
            let Some(offset) = offset else { continue };
            if !supports(api, Api::V5, "type annotations") {
                continue;
            }
            let count = self.buffer.read_u16(offset)?;
            let mut current = offset + 2;
            for _ in 0..count {
                let header = self.read_type_annotation_header(current)?;
                let mut av = visitor.type_annotation(
                    header.type_ref,
                    &header.type_path,
                    &header.desc,
                    visible,
                )?;
                current =
                    self.read_element_values(header.values_offset, true, av.as_deref_mut(), 0)?;
                if let Some(mut av) = av {
                    av.visit_end()?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn read_custom_attributes<V: AnnotatedVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        common: &CommonAttributes<'class>,
        in_code: bool,
    ) -> ClassFileResult<()> {
        for attribute in &common.others {
            let attribute = self.read_attribute(attribute, in_code)?;
            visitor.attribute(&*attribute)?;
        }
        Ok(())
    }

    fn read_attribute(
        &self,
        attribute: &RawAttribute<'class>,
        in_code: bool,
    ) -> ClassFileResult<Box<dyn Attribute>> {
        let name = self.constant_pool.get_utf8(attribute.name_index)?;
        let data = self.buffer.sub_buffer(attribute.offset, attribute.len)?;
        for reader in &self.attribute_readers {
            if let Some(attribute) = reader.read(&name, self, data)? {
                return Ok(attribute);
            }
        }
        log::trace!("passing through unknown attribute {name:?}");
        Ok(Box::new(UnknownAttribute {
            name: name.into_owned(),
            data: data.data.to_vec(),
            in_code,
        }))
    }

    pub(crate) fn read_type_annotation_header(
        &self,
        offset: usize,
    ) -> ClassFileResult<TypeAnnotationHeader<'class>> {
        let (type_ref, location, next) = TypeReference::read(&self.buffer, offset)?;
        let (type_path, next) = TypePath::read(&self.buffer, next)?;
        let desc = self.read_utf8(next)?;
        Ok(TypeAnnotationHeader {
            type_ref,
            location,
            type_path,
            desc,
            values_offset: next + 2,
        })
    }

    /// Reads `element_value_pairs` (or the values of an array when `named` is false) starting at
    /// the count, returning the offset just past them. With no visitor, the values are only
    /// validated and skipped.
    pub(crate) fn read_element_values(
        &self,
        offset: usize,
        named: bool,
        mut visitor: Option<&mut (dyn AnnotationVisitor + '_)>,
        depth: usize,
    ) -> ClassFileResult<usize> {
        let count = self.buffer.read_u16(offset)?;
        let mut current = offset + 2;
        for _ in 0..count {
            if named {
                let name = self.read_utf8(current)?;
                current = self.read_element_value(
                    current + 2,
                    Some(&name),
                    visitor.as_deref_mut(),
                    depth,
                )?;
            } else {
                current = self.read_element_value(current, None, visitor.as_deref_mut(), depth)?;
            }
        }
        Ok(current)
    }

    pub(crate) fn read_element_value(
        &self,
        offset: usize,
        name: Option<&JavaStr>,
        visitor: Option<&mut (dyn AnnotationVisitor + '_)>,
        depth: usize,
    ) -> ClassFileResult<usize> {
        if depth > MAX_ANNOTATION_DEPTH {
            return Err(ClassFileError::TooDeepNesting);
        }
        let cp = &self.constant_pool;
        let tag = self.buffer.read_u8(offset)?;
        let index = || self.buffer.read_u16(offset + 1);
        let constant = match tag {
            b'B' => AnnotationConstant::Byte(cp.get_i32(index()?)? as i8),
            b'C' => AnnotationConstant::Char(cp.get_i32(index()?)? as u16),
            b'D' => AnnotationConstant::Double(cp.get_f64(index()?)?),
            b'F' => AnnotationConstant::Float(cp.get_f32(index()?)?),
            b'I' => AnnotationConstant::Int(cp.get_i32(index()?)?),
            b'J' => AnnotationConstant::Long(cp.get_i64(index()?)?),
            b'S' => AnnotationConstant::Short(cp.get_i32(index()?)? as i16),
            b'Z' => AnnotationConstant::Boolean(cp.get_i32(index()?)? != 0),
            b's' | b'c' => {
                let value = cp.get_utf8(index()?)?;
                if let Some(visitor) = visitor {
                    let value = if tag == b's' {
                        AnnotationConstant::String(&value)
                    } else {
                        AnnotationConstant::Class(&value)
                    };
                    visitor.visit(name, value)?;
                }
                return Ok(offset + 3);
            }
            b'e' => {
                let desc = cp.get_utf8(index()?)?;
                let value = self.read_utf8(offset + 3)?;
                if let Some(visitor) = visitor {
                    visitor.visit_enum(name, &desc, &value)?;
                }
                return Ok(offset + 5);
            }
            b'@' => {
                let desc = cp.get_utf8(index()?)?;
                let mut nested = match visitor {
                    Some(visitor) => visitor.visit_annotation(name, &desc)?,
                    None => None,
                };
                let end = self.read_element_values(
                    offset + 3,
                    true,
                    nested.as_deref_mut(),
                    depth + 1,
                )?;
                if let Some(mut nested) = nested {
                    nested.visit_end()?;
                }
                return Ok(end);
            }
            b'[' => {
                let mut nested = match visitor {
                    Some(visitor) => visitor.visit_array(name)?,
                    None => None,
                };
                let end =
                    self.read_element_values(offset + 1, false, nested.as_deref_mut(), depth + 1)?;
                if let Some(mut nested) = nested {
                    nested.visit_end()?;
                }
                return Ok(end);
            }
            _ => return Err(ClassFileError::BadAnnotationTag { tag, offset }),
        };
        if let Some(visitor) = visitor {
            visitor.visit(name, constant)?;
        }
        Ok(offset + 3)
    }

    fn read_class_list(&self, offset: usize) -> ClassFileResult<Vec<Cow<'class, JavaStr>>> {
        let count = self.buffer.read_u16(offset)? as usize;
        (0..count)
            .map(|i| {
                self.constant_pool
                    .get_class(self.buffer.read_u16(offset + 2 + i * 2)?)
            })
            .collect()
    }

    fn optional_utf8(
        &self,
        offset: Option<usize>,
    ) -> ClassFileResult<Option<Cow<'class, JavaStr>>> {
        offset.map(|offset| self.read_utf8(offset)).transpose()
    }

    /// Lists the attributes of an `attributes_count` table, returning the offset just past it.
    pub(crate) fn read_raw_attributes(
        &self,
        offset: usize,
    ) -> ClassFileResult<(Vec<RawAttribute<'class>>, usize)> {
        let count = self.buffer.read_u16(offset)?;
        let mut attributes = Vec::with_capacity(count as usize);
        let mut current = offset + 2;
        for _ in 0..count {
            let name_index = self.buffer.read_u16(current)?;
            let len = self.buffer.read_u32(current + 2)? as usize;
            if current + 6 + len > self.buffer.len() {
                return Err(ClassFileError::BadAttributeLength { offset: current + 2 });
            }
            attributes.push(RawAttribute {
                name_index,
                name: self.constant_pool.get_utf8_as_bytes(name_index)?,
                offset: current + 6,
                len,
            });
            current += 6 + len;
        }
        Ok((attributes, current))
    }
}

/// Returns whether `api` has the events of `required`, logging what gets dropped if not.
pub(crate) fn supports(api: Api, required: Api, construct: &str) -> bool {
    if api >= required {
        true
    } else {
        log::debug!(
            "dropping {construct}: visitor api {api} is below {required}"
        );
        false
    }
}

fn skip_attributes(buffer: &ClassBuffer<'_>, offset: usize) -> ClassFileResult<usize> {
    let count = buffer.read_u16(offset)?;
    let mut current = offset + 2;
    for _ in 0..count {
        current += 6 + buffer.read_u32(current + 2)? as usize;
    }
    if current > buffer.len() {
        return Err(ClassFileError::BadAttributeLength { offset });
    }
    Ok(current)
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct RawAttribute<'class> {
    pub name_index: u16,
    pub name: &'class [u8],
    /// Offset of the contents, past the name and length.
    pub offset: usize,
    pub len: usize,
}

impl<'class> RawAttribute<'class> {
    /// The name, if it's plain ASCII, for matching against the predefined attribute names.
    pub fn name_str(&self) -> Option<&'class str> {
        if self.name.is_ascii() {
            std::str::from_utf8(self.name).ok()
        } else {
            None
        }
    }
}

/// Attributes that any class, field, method or record component may carry.
#[derive(Debug, Default)]
pub(crate) struct CommonAttributes<'class> {
    pub signature: Option<usize>,
    pub deprecated: bool,
    pub synthetic: bool,
    pub visible_annotations: Option<usize>,
    pub invisible_annotations: Option<usize>,
    pub visible_type_annotations: Option<usize>,
    pub invisible_type_annotations: Option<usize>,
    pub others: Vec<RawAttribute<'class>>,
}

impl<'class> CommonAttributes<'class> {
    pub fn collect(&mut self, attribute: RawAttribute<'class>) {
        match attribute.name_str() {
            Some(attribute_names::SIGNATURE) => self.signature = Some(attribute.offset),
            Some(attribute_names::DEPRECATED) => self.deprecated = true,
            Some(attribute_names::SYNTHETIC) => self.synthetic = true,
            Some(attribute_names::RUNTIME_VISIBLE_ANNOTATIONS) => {
                self.visible_annotations = Some(attribute.offset)
            }
            Some(attribute_names::RUNTIME_INVISIBLE_ANNOTATIONS) => {
                self.invisible_annotations = Some(attribute.offset)
            }
            Some(attribute_names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS) => {
                self.visible_type_annotations = Some(attribute.offset)
            }
            Some(attribute_names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS) => {
                self.invisible_type_annotations = Some(attribute.offset)
            }
            _ => self.others.push(attribute),
        }
    }

    /// Access flags carried by attributes rather than by the access field.
    pub fn access_flags(&self) -> u32 {
        let mut access = 0;
        if self.deprecated {
            access |= ClassAccess::Deprecated.bits();
        }
        if self.synthetic {
            access |= ClassAccess::Synthetic.bits();
        }
        access
    }
}

pub(crate) struct TypeAnnotationHeader<'class> {
    pub type_ref: TypeReference,
    pub location: TargetLocation,
    pub type_path: TypePath<'class>,
    pub desc: Cow<'class, JavaStr>,
    pub values_offset: usize,
}

/// The annotation and attribute events shared by every visitor type that has them.
pub(crate) trait AnnotatedVisitor {
    fn annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>>;

    fn type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>>;

    fn attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()>;
}

macro_rules! annotated_visitor {
    ($($visitor:ident),*) => {
        $(
        impl AnnotatedVisitor for dyn $visitor + '_ {
            fn annotation(
                &mut self,
                desc: &JavaStr,
                visible: bool,
            ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
                self.visit_annotation(desc, visible)
            }

            fn type_annotation(
                &mut self,
                type_ref: TypeReference,
                type_path: &TypePath<'_>,
                desc: &JavaStr,
                visible: bool,
            ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
                self.visit_type_annotation(type_ref, type_path, desc, visible)
            }

            fn attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
                self.visit_attribute(attribute)
            }
        }
        )*
    };
}

annotated_visitor!(
    ClassVisitor,
    FieldVisitor,
    MethodVisitor,
    RecordComponentVisitor
);

#[derive(Copy, Clone)]
pub struct InterfacesIterator<'a, 'class> {
    reader: &'a ClassReader<'class>,
    interface_count: usize,
    index: usize,
}

impl Debug for InterfacesIterator<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfacesIterator")
            .field("interface_count", &self.interface_count)
            .field("index", &self.index)
            .finish()
    }
}

impl<'class> Iterator for InterfacesIterator<'_, 'class> {
    type Item = ClassFileResult<Cow<'class, JavaStr>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.interface_count {
            return None;
        }

        let index = self.index;
        self.index += 1;

        Some(
            self.reader
                .buffer
                .read_u16(self.reader.metadata_start + 8 + index * 2)
                .and_then(|itf_index| self.reader.constant_pool.get_class(itf_index)),
        )
    }
}

/// Bounds-checked big-endian reads at explicit offsets.
#[derive(Copy, Clone)]
pub struct ClassBuffer<'class> {
    data: &'class [u8],
}

impl Debug for ClassBuffer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

impl<'class> ClassBuffer<'class> {
    pub fn new(data: &'class [u8]) -> ClassBuffer<'class> {
        ClassBuffer { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'class [u8] {
        self.data
    }

    fn read_array<const N: usize>(&self, index: usize) -> ClassFileResult<[u8; N]> {
        let slice = self.read_bytes(index, N)?;
        // SAFETY: just read the correct amount of bytes so the conversion to array should succeed
        let array = unsafe { slice.try_into().unwrap_unchecked() };
        Ok(array)
    }

    pub fn read_u8(&self, index: usize) -> ClassFileResult<u8> {
        self.read_array::<1>(index).map(|arr| arr[0])
    }

    pub fn read_u16(&self, index: usize) -> ClassFileResult<u16> {
        self.read_array::<2>(index).map(u16::from_be_bytes)
    }

    pub fn read_u32(&self, index: usize) -> ClassFileResult<u32> {
        self.read_array::<4>(index).map(u32::from_be_bytes)
    }

    pub fn read_u64(&self, index: usize) -> ClassFileResult<u64> {
        self.read_array::<8>(index).map(u64::from_be_bytes)
    }

    pub fn read_i8(&self, index: usize) -> ClassFileResult<i8> {
        self.read_u8(index).map(|u| u as i8)
    }

    pub fn read_i16(&self, index: usize) -> ClassFileResult<i16> {
        self.read_u16(index).map(|u| u as i16)
    }

    pub fn read_i32(&self, index: usize) -> ClassFileResult<i32> {
        self.read_u32(index).map(|u| u as i32)
    }

    pub fn read_i64(&self, index: usize) -> ClassFileResult<i64> {
        self.read_u64(index).map(|u| u as i64)
    }

    pub fn read_f32(&self, index: usize) -> ClassFileResult<f32> {
        self.read_u32(index).map(f32::from_bits)
    }

    pub fn read_f64(&self, index: usize) -> ClassFileResult<f64> {
        self.read_u64(index).map(f64::from_bits)
    }

    pub fn read_bytes(&self, index: usize, len: usize) -> ClassFileResult<&'class [u8]> {
        index
            .checked_add(len)
            .and_then(|end| self.data.get(index..end))
            .ok_or_else(|| ClassFileError::OutOfBounds {
                index: index.saturating_add(len.max(1) - 1),
                len: self.data.len(),
            })
    }

    pub fn sub_buffer(&self, index: usize, len: usize) -> ClassFileResult<ClassBuffer<'class>> {
        self.read_bytes(index, len).map(|data| ClassBuffer { data })
    }
}

#[cfg(test)]
mod test {
    use crate::{ClassAccess, ClassBuffer, ClassFileError, ClassReader, ClassVersion};
    use std::borrow::Cow;
    use test_helpers::ClassFileBuilder;

    #[test]
    fn test_header() {
        let mut builder = ClassFileBuilder::new("HelloWorld", Some("java/lang/Object"));
        builder.interface("java/lang/Runnable");
        let bytes = builder.build();
        let reader = ClassReader::new(&bytes).unwrap();
        assert_eq!(ClassVersion::V1_8, reader.version());
        assert_eq!(
            ClassAccess::Public | ClassAccess::Super,
            reader.access().unwrap()
        );
        assert_eq!(Cow::Borrowed("HelloWorld"), reader.name().unwrap());
        assert_eq!(
            Cow::Borrowed("java/lang/Object"),
            reader.super_name().unwrap().unwrap()
        );
        let interfaces: Vec<_> = reader.interfaces().unwrap().map(Result::unwrap).collect();
        assert_eq!(vec![Cow::Borrowed("java/lang/Runnable")], interfaces);
    }

    #[test]
    fn test_bad_magic() {
        let err = ClassReader::new(&[0xca, 0xfe, 0xba, 0xbf, 0, 0, 0, 52]).unwrap_err();
        assert!(matches!(err, ClassFileError::BadMagic));
        assert_eq!(Some(0), err.offset());
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = ClassFileBuilder::new("A", None).build();
        bytes[6] = 0x7f;
        let err = ClassReader::new(&bytes).unwrap_err();
        assert!(matches!(err, ClassFileError::UnsupportedVersion(0x7f00..)));
    }

    #[test]
    fn test_truncated() {
        let bytes = ClassFileBuilder::new("A", None).build();
        let err = ClassReader::new(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_read_bytes_overflow() {
        let buffer = ClassBuffer::new(&[1, 2, 3]);
        assert_eq!(&[2, 3], buffer.read_bytes(1, 2).unwrap());
        assert!(buffer.read_bytes(2, 2).is_err());
        assert!(buffer.read_bytes(usize::MAX, 2).is_err());
    }
}
