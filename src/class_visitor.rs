use crate::{
    AnnotationVisitor, Api, Attribute, ClassAccess, ClassFileResult, ClassVersion, FieldAccess,
    FieldValue, FieldVisitor, InnerClassAccess, MethodAccess, MethodVisitor, ModuleAccess,
    ModuleVisitor, RecordComponentVisitor, TypePath, TypeReference,
};
use java_string::JavaStr;

/// Receives the contents of a class, in this order:
///
/// `visit`, `visit_source`?, `visit_module`?, `visit_nest_host`?, `visit_outer_class`?,
/// (`visit_annotation` | `visit_type_annotation` | `visit_attribute`)*,
/// (`visit_nest_member` | `visit_permitted_subclass` | `visit_inner_class` |
/// `visit_record_component` | `visit_field` | `visit_method`)*, `visit_end`.
///
/// Events that open a nested scope return a visitor for it, or `None` to have the producer skip
/// everything nested inside.
pub trait ClassVisitor {
    /// The newest protocol version this visitor understands. Producers don't send it events of
    /// later versions.
    ///
    /// Default event bodies hand events to [`delegate`](ClassVisitor::delegate) unchecked, so a
    /// visitor with a delegate must report the delegate's version or an older one.
    fn api(&self) -> Api {
        Api::LATEST
    }

    fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
        None
    }

    fn visit(
        &mut self,
        version: ClassVersion,
        access: ClassAccess,
        name: &JavaStr,
        signature: Option<&JavaStr>,
        super_name: Option<&JavaStr>,
        interfaces: &[&JavaStr],
    ) -> ClassFileResult<()> {
        forward!(self.visit(
            version,
            access,
            name,
            signature,
            super_name,
            interfaces
        ))
    }

    fn visit_source(
        &mut self,
        source: Option<&JavaStr>,
        debug: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        forward!(self.visit_source(source, debug))
    }

    /// Requires [`Api::V6`].
    fn visit_module(
        &mut self,
        name: &JavaStr,
        access: ModuleAccess,
        version: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn ModuleVisitor + '_>>> {
        forward!(self.visit_module(name, access, version))
    }

    /// Requires [`Api::V7`].
    fn visit_nest_host(&mut self, nest_host: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_nest_host(nest_host))
    }

    fn visit_outer_class(
        &mut self,
        owner: &JavaStr,
        name: Option<&JavaStr>,
        desc: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        forward!(self.visit_outer_class(owner, name, desc))
    }

    fn visit_annotation(
        &mut self,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_annotation(desc, visible))
    }

    /// Requires [`Api::V5`].
    fn visit_type_annotation(
        &mut self,
        type_ref: TypeReference,
        type_path: &TypePath<'_>,
        desc: &JavaStr,
        visible: bool,
    ) -> ClassFileResult<Option<Box<dyn AnnotationVisitor + '_>>> {
        forward!(self.visit_type_annotation(
            type_ref,
            type_path,
            desc,
            visible
        ))
    }

    fn visit_attribute(&mut self, attribute: &dyn Attribute) -> ClassFileResult<()> {
        forward!(self.visit_attribute(attribute))
    }

    /// Requires [`Api::V7`].
    fn visit_nest_member(&mut self, nest_member: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_nest_member(nest_member))
    }

    /// Requires [`Api::V9`].
    fn visit_permitted_subclass(&mut self, permitted_subclass: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_permitted_subclass(permitted_subclass))
    }

    fn visit_inner_class(
        &mut self,
        name: &JavaStr,
        outer_name: Option<&JavaStr>,
        inner_name: Option<&JavaStr>,
        access: InnerClassAccess,
    ) -> ClassFileResult<()> {
        forward!(self.visit_inner_class(name, outer_name, inner_name, access))
    }

    /// Requires [`Api::V8`].
    fn visit_record_component(
        &mut self,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
    ) -> ClassFileResult<Option<Box<dyn RecordComponentVisitor + '_>>> {
        forward!(self.visit_record_component(name, desc, signature))
    }

    fn visit_field(
        &mut self,
        access: FieldAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        value: Option<&FieldValue<'_>>,
    ) -> ClassFileResult<Option<Box<dyn FieldVisitor + '_>>> {
        forward!(self.visit_field(access, name, desc, signature, value))
    }

    fn visit_method(
        &mut self,
        access: MethodAccess,
        name: &JavaStr,
        desc: &JavaStr,
        signature: Option<&JavaStr>,
        exceptions: &[&JavaStr],
    ) -> ClassFileResult<Option<Box<dyn MethodVisitor + '_>>> {
        forward!(self.visit_method(access, name, desc, signature, exceptions))
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        forward!(self.visit_end())
    }
}

impl<V: ClassVisitor> ClassVisitor for &mut V {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
        Some(&mut **self)
    }
}

impl<'a> ClassVisitor for Box<dyn ClassVisitor + 'a> {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn ClassVisitor> {
        Some(&mut **self)
    }
}
