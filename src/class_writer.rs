use crate::access::{needs_synthetic_attribute, raw_access_flags};
use crate::adapter::ComputeMaxs;
use crate::annotation_writer::AnnotationSet;
use crate::constants::attribute_names;
use crate::method_writer::MethodWriter;
use crate::{
    AnnotationVisitor, Attribute, ByteVector, ClassAccess, ClassFileError, ClassFileResult,
    ClassReader, ClassVersion, ClassVisitor, ConstantPoolBuilder, FieldAccess, FieldValue,
    FieldVisitor, InnerClassAccess, MethodAccess, MethodVisitor, ModuleAccess, ModuleRelationAccess,
    ModuleRequireAccess, ModuleVisitor, RecordComponentVisitor, TargetLocation, TypePath,
    TypeReference, WriterFlags,
};
use java_string::JavaStr;

/// A `u16` count followed by that many entries.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountedTable {
    count: u16,
    data: ByteVector,
}

impl CountedTable {
    /// Counts one more entry and returns the buffer to append it to.
    pub(crate) fn entry(&mut self, what: &'static str) -> ClassFileResult<&mut ByteVector> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or(ClassFileError::TooManyEntries { what })?;
        Ok(&mut self.data)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn write(&self, out: &mut ByteVector) {
        out.put_u16(self.count);
        out.put_bytes(self.data.as_slice());
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = ByteVector::with_capacity(2 + self.data.len());
        self.write(&mut out);
        out.into_vec()
    }
}

/// An `attributes` table under construction.
#[derive(Debug, Default)]
pub(crate) struct AttributeTable {
    table: CountedTable,
}

impl AttributeTable {
    pub(crate) fn add(
        &mut self,
        constant_pool: &mut ConstantPoolBuilder,
        name: &str,
        body: &[u8],
    ) -> ClassFileResult<()> {
        let name = constant_pool.add_utf8(JavaStr::from_str(name))?;
        self.add_named(name, body)
    }

    fn add_named(&mut self, name: u16, body: &[u8]) -> ClassFileResult<()> {
        let len = u32::try_from(body.len()).map_err(|_| ClassFileError::TooManyEntries {
            what: "attribute bytes",
        })?;
        let out = self.table.entry("attributes")?;
        out.put_u16(name);
        out.put_u32(len);
        out.put_bytes(body);
        Ok(())
    }

    pub(crate) fn add_custom(
        &mut self,
        constant_pool: &mut ConstantPoolBuilder,
        attribute: &dyn Attribute,
    ) -> ClassFileResult<()> {
        let body = attribute.write(constant_pool)?;
        let name = constant_pool.add_utf8(attribute.name())?;
        self.add_named(name, &body)
    }

    /// `Synthetic`, `Signature` and `Deprecated`, as needed.
    pub(crate) fn add_common(
        &mut self,
        constant_pool: &mut ConstantPoolBuilder,
        access: u32,
        major_version: u16,
        signature: Option<u16>,
    ) -> ClassFileResult<()> {
        if needs_synthetic_attribute(access, major_version) {
            self.add(constant_pool, attribute_names::SYNTHETIC, &[])?;
        }
        if let Some(signature) = signature {
            self.add(
                constant_pool,
                attribute_names::SIGNATURE,
                &signature.to_be_bytes(),
            )?;
        }
        if access & ClassAccess::Deprecated.bits() != 0 {
            self.add(constant_pool, attribute_names::DEPRECATED, &[])?;
        }
        Ok(())
    }

    pub(crate) fn add_annotations(
        &mut self,
        constant_pool: &mut ConstantPoolBuilder,
        visible: &AnnotationSet,
        invisible: &AnnotationSet,
    ) -> ClassFileResult<()> {
        if !visible.is_empty() {
            self.add(
                constant_pool,
                attribute_names::RUNTIME_VISIBLE_ANNOTATIONS,
                &visible.to_bytes(),
            )?;
        }
        if !invisible.is_empty() {
            self.add(
                constant_pool,
                attribute_names::RUNTIME_INVISIBLE_ANNOTATIONS,
                &invisible.to_bytes(),
            )?;
        }
        Ok(())
    }

    pub(crate) fn add_type_annotations(
        &mut self,
        constant_pool: &mut ConstantPoolBuilder,
        visible: &AnnotationSet,
        invisible: &AnnotationSet,
    ) -> ClassFileResult<()> {
        if !visible.is_empty() {
            self.add(
                constant_pool,
                attribute_names::RUNTIME_VISIBLE_TYPE_ANNOTATIONS,
                &visible.to_bytes(),
            )?;
        }
        if !invisible.is_empty() {
            self.add(
                constant_pool,
                attribute_names::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS,
                &invisible.to_bytes(),
            )?;
        }
        Ok(())
    }

    pub(crate) fn write(&self, out: &mut ByteVector) {
        self.table.write(out);
    }
}

/// Annotations and custom attributes shared by fields, record components and classes.
#[derive(Debug, Default)]
struct Annotations {
    visible: AnnotationSet,
    invisible: AnnotationSet,
    visible_type: AnnotationSet,
    invisible_type: AnnotationSet,
    attributes: Vec<Box<dyn Attribute>>,
}

impl Annotations {
    fn annotation<'a>(
        &'a mut self,
        constant_pool: &'a mut ConstantPoolBuilder,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + 'a>>> {
        let set = if visible {
            &mut self.visible
        } else {
            &mut self.invisible
        };
        Ok(Some(Box::new(set.add(constant_pool, desc)?)))
    }

    fn type_annotation<'a>(
        &'a mut self,
        constant_pool: &'a mut ConstantPoolBuilder,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + 'a>>> {
        let set = if visible {
            &mut self.visible_type
        } else {
            &mut self.invisible_type
        };
        Ok(Some(Box::new(set.add_type_annotation(
            constant_pool,
            type_ref,
            &TargetLocation::None,
            type_path,
            desc,
        )?)))
    }

    fn write_annotations(
        &self,
        constant_pool: &mut ConstantPoolBuilder,
        attributes: &mut AttributeTable,
    ) -> ClassFileResult<()> {
        attributes.add_annotations(constant_pool, &self.visible, &self.invisible)?;
        attributes.add_type_annotations(constant_pool, &self.visible_type, &self.invisible_type)
    }

    fn write_custom(
        &self,
        constant_pool: &mut ConstantPoolBuilder,
        attributes: &mut AttributeTable,
    ) -> ClassFileResult<()> {
        for attribute in &self.attributes {
            attributes.add_custom(constant_pool, &**attribute)?;
        }
        Ok(())
    }
}

/// Encodes one `field_info` structure, appending it to the field table at `visit_end`.
#[derive(Debug)]
pub(crate) struct FieldWriter<'a> {
    constant_pool: &'a mut ConstantPoolBuilder,
    fields: &'a mut CountedTable,
    major_version: u16,
    access: FieldAccess,
    name: u16,
    desc: u16,
    signature: Option<u16>,
    constant_value: Option<u16>,
    annotations: Annotations,
}

impl FieldVisitor for FieldWriter<'_> {
    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.annotations
            .annotation(self.constant_pool, desc, visible)
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.annotations
            .type_annotation(self.constant_pool, type_ref, type_path, desc, visible)
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        self.annotations.attributes.push(attribute.copy());
        Ok(())
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        let cp = &mut *self.constant_pool;
        let access = self.access.bits();
        let mut attributes = AttributeTable::default();
        if let Some(value) = self.constant_value {
            attributes.add(cp, attribute_names::CONSTANT_VALUE, &value.to_be_bytes())?;
        }
        attributes.add_common(cp, access, self.major_version, self.signature)?;
        self.annotations.write_annotations(cp, &mut attributes)?;
        self.annotations.write_custom(cp, &mut attributes)?;

        let out = self.fields.entry("fields")?;
        out.put_u16(raw_access_flags(access, self.major_version));
        out.put_u16(self.name);
        out.put_u16(self.desc);
        attributes.write(out);
        Ok(())
    }
}

/// Encodes one `record_component_info`, appending it to the `Record` attribute at `visit_end`.
#[derive(Debug)]
pub(crate) struct RecordComponentWriter<'a> {
    constant_pool: &'a mut ConstantPoolBuilder,
    components: &'a mut CountedTable,
    name: u16,
    desc: u16,
    signature: Option<u16>,
    annotations: Annotations,
}

impl RecordComponentVisitor for RecordComponentWriter<'_> {
    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.annotations
            .annotation(self.constant_pool, desc, visible)
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.annotations
            .type_annotation(self.constant_pool, type_ref, type_path, desc, visible)
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        self.annotations.attributes.push(attribute.copy());
        Ok(())
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        let cp = &mut *self.constant_pool;
        let mut attributes = AttributeTable::default();
        if let Some(signature) = self.signature {
            attributes.add(cp, attribute_names::SIGNATURE, &signature.to_be_bytes())?;
        }
        self.annotations.write_annotations(cp, &mut attributes)?;
        self.annotations.write_custom(cp, &mut attributes)?;

        let out = self.components.entry("record components")?;
        out.put_u16(self.name);
        out.put_u16(self.desc);
        attributes.write(out);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ModuleData {
    name: u16,
    access: u16,
    version: u16,
    requires: CountedTable,
    exports: CountedTable,
    opens: CountedTable,
    uses: CountedTable,
    provides: CountedTable,
    packages: Option<CountedTable>,
    main_class: Option<u16>,
}

impl ModuleData {
    fn write(
        &self,
        constant_pool: &mut ConstantPoolBuilder,
        attributes: &mut AttributeTable,
    ) -> ClassFileResult<()> {
        let mut body = ByteVector::new();
        body.put_u16(self.name);
        body.put_u16(self.access);
        body.put_u16(self.version);
        for table in [
            &self.requires,
            &self.exports,
            &self.opens,
            &self.uses,
            &self.provides,
        ] {
            table.write(&mut body);
        }
        attributes.add(constant_pool, attribute_names::MODULE, body.as_slice())?;
        if let Some(packages) = &self.packages {
            attributes.add(
                constant_pool,
                attribute_names::MODULE_PACKAGES,
                &packages.to_bytes(),
            )?;
        }
        if let Some(main_class) = self.main_class {
            attributes.add(
                constant_pool,
                attribute_names::MODULE_MAIN_CLASS,
                &main_class.to_be_bytes(),
            )?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ModuleWriter<'a> {
    constant_pool: &'a mut ConstantPoolBuilder,
    module: &'a mut ModuleData,
}

impl ModuleWriter<'_> {
    fn relation(
        &mut self,
        opens: bool,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        let package = self.constant_pool.add_package(package)?;
        let modules = modules
            .iter()
            .map(|module| self.constant_pool.add_module(module))
            .collect::<ClassFileResult<Vec<_>>>()?;
        let (table, what) = if opens {
            (&mut self.module.opens, "opens")
        } else {
            (&mut self.module.exports, "exports")
        };
        let out = table.entry(what)?;
        out.put_u16(package);
        out.put_u16(access.bits());
        out.put_u16(modules.len() as u16);
        for module in modules {
            out.put_u16(module);
        }
        Ok(())
    }
}

impl ModuleVisitor for ModuleWriter<'_> {
    fn visit_main_class(&mut self, main_class: &JavaStr) -> ClassFileResult<()> {
        self.module.main_class = Some(self.constant_pool.add_class(main_class)?);
        Ok(())
    }

    fn visit_package(&mut self, package: &JavaStr) -> ClassFileResult<()> {
        let package = self.constant_pool.add_package(package)?;
        self.module
            .packages
            .get_or_insert_with(CountedTable::default)
            .entry("packages")?
            .put_u16(package);
        Ok(())
    }

    fn visit_require(
        &mut self,
        module: &JavaStr,
        access: ModuleRequireAccess,
        version: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        let module = self.constant_pool.add_module(module)?;
        let version = match version {
            Some(version) => self.constant_pool.add_utf8(version)?,
            None => 0,
        };
        let out = self.module.requires.entry("requires")?;
        out.put_u16(module);
        out.put_u16(access.bits());
        out.put_u16(version);
        Ok(())
    }

    fn visit_export(
        &mut self,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        self.relation(false, package, access, modules)
    }

    fn visit_open(
        &mut self,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        self.relation(true, package, access, modules)
    }

    fn visit_use(&mut self, service: &JavaStr) -> ClassFileResult<()> {
        let service = self.constant_pool.add_class(service)?;
        self.module.uses.entry("uses")?.put_u16(service);
        Ok(())
    }

    fn visit_provide(&mut self, service: &JavaStr, providers: &[&JavaStr]) -> ClassFileResult<()> {
        let service = self.constant_pool.add_class(service)?;
        let providers = providers
            .iter()
            .map(|provider| self.constant_pool.add_class(provider))
            .collect::<ClassFileResult<Vec<_>>>()?;
        let out = self.module.provides.entry("provides")?;
        out.put_u16(service);
        out.put_u16(providers.len() as u16);
        for provider in providers {
            out.put_u16(provider);
        }
        Ok(())
    }
}

/// A [`ClassVisitor`] that encodes the events it receives into a class file.
///
/// Nested writers (fields, methods ...) append their structure to this writer when their
/// `visit_end` is called. [`ClassWriter::to_bytes`] assembles the final class file.
#[derive(Debug)]
pub struct ClassWriter {
    flags: WriterFlags,
    constant_pool: ConstantPoolBuilder,
    version: ClassVersion,
    access: ClassAccess,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    signature: Option<u16>,
    source_file: Option<u16>,
    source_debug: Option<Vec<u8>>,
    module: Option<ModuleData>,
    nest_host: Option<u16>,
    enclosing_method: Option<(u16, u16)>,
    annotations: Annotations,
    nest_members: Option<CountedTable>,
    permitted_subclasses: Option<CountedTable>,
    inner_classes: Option<CountedTable>,
    record_components: CountedTable,
    fields: CountedTable,
    methods: CountedTable,
}

impl ClassWriter {
    pub fn new(flags: WriterFlags) -> ClassWriter {
        ClassWriter::with_constant_pool(flags, ConstantPoolBuilder::new())
    }

    /// Starts from a copy of the constant pool of `reader`.
    ///
    /// Constants keep their indices, so unknown attributes copied from the reader stay valid,
    /// and a class passed through unchanged encodes to the same bytes.
    pub fn with_reader(
        reader: &ClassReader<'_>,
        flags: WriterFlags,
    ) -> ClassFileResult<ClassWriter> {
        Ok(ClassWriter::with_constant_pool(
            flags,
            ConstantPoolBuilder::from_reader(reader)?,
        ))
    }

    fn with_constant_pool(flags: WriterFlags, constant_pool: ConstantPoolBuilder) -> ClassWriter {
        ClassWriter {
            flags,
            constant_pool,
            version: ClassVersion::V1_8,
            access: ClassAccess::empty(),
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            signature: None,
            source_file: None,
            source_debug: None,
            module: None,
            nest_host: None,
            enclosing_method: None,
            annotations: Annotations::default(),
            nest_members: None,
            permitted_subclasses: None,
            inner_classes: None,
            record_components: CountedTable::default(),
            fields: CountedTable::default(),
            methods: CountedTable::default(),
        }
    }

    pub fn constant_pool(&mut self) -> &mut ConstantPoolBuilder {
        &mut self.constant_pool
    }

    /// Assembles the class file from everything visited so far.
    pub fn to_bytes(&mut self) -> ClassFileResult<Vec<u8>> {
        let cp = &mut self.constant_pool;
        let access = self.access.bits();
        let major_version = self.version.major;

        let mut attributes = AttributeTable::default();
        if let Some(inner_classes) = &self.inner_classes {
            let bytes = inner_classes.to_bytes();
            attributes.add(cp, attribute_names::INNER_CLASSES, &bytes)?;
        }
        if let Some((owner, method)) = self.enclosing_method {
            let mut body = ByteVector::with_capacity(4);
            body.put_u16(owner);
            body.put_u16(method);
            attributes.add(cp, attribute_names::ENCLOSING_METHOD, body.as_slice())?;
        }
        attributes.add_common(cp, access, major_version, self.signature)?;
        if let Some(source_file) = self.source_file {
            attributes.add(cp, attribute_names::SOURCE_FILE, &source_file.to_be_bytes())?;
        }
        if let Some(debug) = &self.source_debug {
            attributes.add(cp, attribute_names::SOURCE_DEBUG_EXTENSION, debug)?;
        }
        self.annotations.write_annotations(cp, &mut attributes)?;
        if let Some(module) = &self.module {
            module.write(cp, &mut attributes)?;
        }
        if let Some(nest_host) = self.nest_host {
            attributes.add(cp, attribute_names::NEST_HOST, &nest_host.to_be_bytes())?;
        }
        if let Some(nest_members) = &self.nest_members {
            attributes.add(cp, attribute_names::NEST_MEMBERS, &nest_members.to_bytes())?;
        }
        if let Some(permitted_subclasses) = &self.permitted_subclasses {
            attributes.add(
                cp,
                attribute_names::PERMITTED_SUBCLASSES,
                &permitted_subclasses.to_bytes(),
            )?;
        }
        if self.access.contains(ClassAccess::Record) || !self.record_components.is_empty() {
            let bytes = self.record_components.to_bytes();
            attributes.add(cp, attribute_names::RECORD, &bytes)?;
        }
        self.annotations.write_custom(cp, &mut attributes)?;
        if cp.bootstrap_method_count() > 0 {
            let mut body = ByteVector::new();
            cp.write_bootstrap_methods(&mut body);
            attributes.add(cp, attribute_names::BOOTSTRAP_METHODS, body.as_slice())?;
        }

        let mut out = ByteVector::with_capacity(1024);
        out.put_u32(0xcafebabe);
        out.put_u16(self.version.minor);
        out.put_u16(major_version);
        cp.write(&mut out);
        out.put_u16(raw_access_flags(access, major_version));
        out.put_u16(self.this_class);
        out.put_u16(self.super_class);
        out.put_u16(self.interfaces.len() as u16);
        for &interface in &self.interfaces {
            out.put_u16(interface);
        }
        self.fields.write(&mut out);
        self.methods.write(&mut out);
        attributes.write(&mut out);
        log::debug!(
            "encoded class with {} constants, {} bytes",
            cp.count(),
            out.len()
        );
        Ok(out.into_vec())
    }
}

impl ClassVisitor for ClassWriter {
    fn visit(
        &mut self,
        version: ClassVersion,
        access: ClassAccess,
        name: &JavaStr,
        signature: Option<&JavaStr>,
        super_name: Option<&JavaStr>,
        interfaces: &[&JavaStr],
    ) -> ClassFileResult<()> {
        let cp = &mut self.constant_pool;
        self.version = version;
        self.access = access;
        self.this_class = cp.add_class(name)?;
        self.signature = signature.map(|signature| cp.add_utf8(signature)).transpose()?;
        self.super_class = match super_name {
            Some(super_name) => cp.add_class(super_name)?,
            None => 0,
        };
        if interfaces.len() > u16::MAX as usize {
            return Err(ClassFileError::TooManyEntries { what: "interfaces" });
        }
        self.interfaces = interfaces
            .iter()
            .map(|interface| cp.add_class(interface))
            .collect::<ClassFileResult<_>>()?;
        Ok(())
    }

    fn visit_source(
        &mut self,
        source: Option<&JavaStr>,
        debug: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        if let Some(source) = source {
            self.source_file = Some(self.constant_pool.add_utf8(source)?);
        }
        if let Some(debug) = debug {
            self.source_debug = Some(debug.to_modified_utf8().to_vec());
        }
        Ok(())
    }

    fn visit_module(
        &mut self,
        name: &JavaStr,
        access: ModuleAccess,
        version: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn ModuleVisitor + '_>>> {
        let name = self.constant_pool.add_module(name)?;
        let version = match version {
            Some(version) => self.constant_pool.add_utf8(version)?,
            None => 0,
        };
        let module = self.module.insert(ModuleData {
            name,
            access: access.bits(),
            version,
            ..ModuleData::default()
        });
        Ok(Some(Box::new(ModuleWriter {
            constant_pool: &mut self.constant_pool,
            module,
        })))
    }

    fn visit_nest_host(&mut self, nest_host: &JavaStr) -> ClassFileResult<()> {
        self.nest_host = Some(self.constant_pool.add_class(nest_host)?);
        Ok(())
    }

    fn visit_outer_class(
        &mut self,
        owner: &JavaStr,
        name: Option<&JavaStr>,
        desc: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        let owner = self.constant_pool.add_class(owner)?;
        let method = match (name, desc) {
            (Some(name), Some(desc)) => self.constant_pool.add_name_and_type(name, desc)?,
            _ => 0,
        };
        self.enclosing_method = Some((owner, method));
        Ok(())
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.annotations
            .annotation(&mut self.constant_pool, desc, visible)
    }

    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        self.annotations.type_annotation(
            &mut self.constant_pool,
            type_ref,
            type_path,
            desc,
            visible,
        )
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        self.annotations.attributes.push(attribute.copy());
        Ok(())
    }

    fn visit_nest_member(&mut self, nest_member: &JavaStr) -> ClassFileResult<()> {
        let member = self.constant_pool.add_class(nest_member)?;
        self.nest_members
            .get_or_insert_with(CountedTable::default)
            .entry("nest members")?
            .put_u16(member);
        Ok(())
    }

    fn visit_permitted_subclass(&mut self, permitted_subclass: &JavaStr) -> ClassFileResult<()> {
        let subclass = self.constant_pool.add_class(permitted_subclass)?;
        self.permitted_subclasses
            .get_or_insert_with(CountedTable::default)
            .entry("permitted subclasses")?
            .put_u16(subclass);
        Ok(())
    }

    fn visit_inner_class(
        &mut self,
        name: &JavaStr,
        outer_name: Option<&JavaStr>,
        inner_name: Option<&JavaStr>,
        access: InnerClassAccess,
    ) -> ClassFileResult<()> {
        let cp = &mut self.constant_pool;
        let name = cp.add_class(name)?;
        let outer_name = match outer_name {
            Some(outer_name) => cp.add_class(outer_name)?,
            None => 0,
        };
        let inner_name = match inner_name {
            Some(inner_name) => cp.add_utf8(inner_name)?,
            None => 0,
        };
        let out = self
            .inner_classes
            .get_or_insert_with(CountedTable::default)
            .entry("inner classes")?;
        out.put_u16(name);
        out.put_u16(outer_name);
        out.put_u16(inner_name);
        out.put_u16(access.bits());
        Ok(())
    }

    fn visit_record_component(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn RecordComponentVisitor + '_>>> {
        let cp = &mut self.constant_pool;
        let name = cp.add_utf8(name)?;
        let desc = cp.add_utf8(desc)?;
        let signature = signature.map(|signature| cp.add_utf8(signature)).transpose()?;
        Ok(Some(Box::new(RecordComponentWriter {
            constant_pool: cp,
            components: &mut self.record_components,
            name,
            desc,
            signature,
            annotations: Annotations::default(),
        })))
    }

    fn visit_field(
        &mut self,
        access: FieldAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        value: Option<&FieldValue<'_>>,
    ) -> ClassFileResult<Option<Box<dyn FieldVisitor + '_>>> {
        let cp = &mut self.constant_pool;
        let name = cp.add_utf8(name)?;
        let desc = cp.add_utf8(desc)?;
        let signature = signature.map(|signature| cp.add_utf8(signature)).transpose()?;
        let constant_value = match value {
            Some(FieldValue::Integer(value)) => Some(cp.add_integer(*value)?),
            Some(FieldValue::Float(value)) => Some(cp.add_float(*value)?),
            Some(FieldValue::Long(value)) => Some(cp.add_long(*value)?),
            Some(FieldValue::Double(value)) => Some(cp.add_double(*value)?),
            Some(FieldValue::String(value)) => Some(cp.add_string(value)?),
            None => None,
        };
        Ok(Some(Box::new(FieldWriter {
            constant_pool: cp,
            fields: &mut self.fields,
            major_version: self.version.major,
            access,
            name,
            desc,
            signature,
            constant_value,
            annotations: Annotations::default(),
        })))
    }

    fn visit_method(
        &mut self,
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
        let writer = MethodWriter::new(
            &mut self.constant_pool,
            &mut self.methods,
            self.version.major,
            access,
            name,
            desc,
            signature,
            exceptions,
        )?;
        if self.flags.contains(WriterFlags::COMPUTE_MAXS) {
            Ok(Some(Box::new(ComputeMaxs::new(
                access,
                name,
                desc,
                signature,
                exceptions,
                Box::new(writer),
            ))))
        } else {
            Ok(Some(Box::new(writer)))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Label, Opcode, ReaderFlags};
    use std::borrow::Cow;

    fn s(value: &str) -> &JavaStr {
        JavaStr::from_str(value)
    }

    fn hello_world(flags: WriterFlags) -> Vec<u8> {
        let mut writer = ClassWriter::new(flags);
        writer
            .visit(
                ClassVersion::V1_8,
                ClassAccess::Public | ClassAccess::Super,
                s("Hello"),
                None,
                Some(s("java/lang/Object")),
                &[],
            )
            .unwrap();
        writer.visit_source(Some(s("Hello.java")), None).unwrap();
        {
            let mut mv = writer
                .visit_method(
                    MethodAccess::Public | MethodAccess::Static,
                    s("main"),
                    s("([Ljava/lang/String;)V"),
                    None,
                    &[],
                )
                .unwrap()
                .unwrap();
            let end = Label::new();
            mv.visit_code().unwrap();
            mv.visit_field_insn(
                Opcode::GetStatic,
                s("java/lang/System"),
                s("out"),
                s("Ljava/io/PrintStream;"),
            )
            .unwrap();
            mv.visit_ldc_insn(&crate::LdcConstant::String(Cow::Borrowed(s("hi"))))
                .unwrap();
            mv.visit_method_insn(
                Opcode::InvokeVirtual,
                s("java/io/PrintStream"),
                s("println"),
                s("(Ljava/lang/String;)V"),
                false,
            )
            .unwrap();
            mv.visit_jump_insn(Opcode::Goto, end).unwrap();
            mv.visit_label(end).unwrap();
            mv.visit_insn(Opcode::Return).unwrap();
            mv.visit_maxs(0, 0).unwrap();
            mv.visit_end().unwrap();
        }
        writer.visit_end().unwrap();
        writer.to_bytes().unwrap()
    }

    #[test]
    fn test_written_class_reads_back() {
        let bytes = hello_world(WriterFlags::empty());
        let reader = ClassReader::new(&bytes).unwrap();
        assert_eq!(ClassVersion::V1_8, reader.version());
        assert_eq!(s("Hello"), &*reader.name().unwrap());
        assert_eq!(
            s("java/lang/Object"),
            &*reader.super_name().unwrap().unwrap()
        );
        assert_eq!(0, reader.interfaces().unwrap().count());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(
            hello_world(WriterFlags::empty()),
            hello_world(WriterFlags::empty())
        );
    }

    #[test]
    fn test_rewrite_with_reader_is_identical() {
        let bytes = hello_world(WriterFlags::empty());
        let reader = ClassReader::new(&bytes).unwrap();
        let mut writer = ClassWriter::with_reader(&reader, WriterFlags::empty()).unwrap();
        reader.accept(&mut writer, ReaderFlags::empty()).unwrap();
        assert_eq!(bytes, writer.to_bytes().unwrap());
    }

    #[test]
    fn test_compute_maxs() {
        let bytes = hello_world(WriterFlags::COMPUTE_MAXS);
        let reader = ClassReader::new(&bytes).unwrap();
        let mut node = crate::tree::ClassNode::default();
        reader.accept(&mut node, ReaderFlags::empty()).unwrap();
        let main = &node.methods[0];
        assert_eq!(2, main.max_stack);
        assert_eq!(1, main.max_locals);
    }

    #[test]
    fn test_empty_record_keeps_its_attribute() {
        let mut writer = ClassWriter::new(WriterFlags::empty());
        writer
            .visit(
                ClassVersion::V16,
                ClassAccess::Final | ClassAccess::Super | ClassAccess::Record,
                s("R"),
                None,
                Some(s("java/lang/Record")),
                &[],
            )
            .unwrap();
        writer.visit_end().unwrap();
        let bytes = writer.to_bytes().unwrap();
        let reader = ClassReader::new(&bytes).unwrap();
        let mut node = crate::tree::ClassNode::default();
        reader.accept(&mut node, ReaderFlags::empty()).unwrap();
        assert!(node.access.contains(ClassAccess::Record));
        // the pseudo flag stays out of the access_flags item
        assert_eq!(
            ClassAccess::Final | ClassAccess::Super,
            reader.access().unwrap()
        );
    }
}
