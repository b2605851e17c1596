use crate::{Api, ClassFileResult, ModuleRelationAccess, ModuleRequireAccess};
use java_string::JavaStr;

/// Receives the directives of a module declaration. Package names are internal names
/// (`java/lang`), services and providers are internal class names.
pub trait ModuleVisitor {
    fn api(&self) -> Api {
        Api::LATEST
    }

    fn delegate(&mut self) -> Option<&mut dyn ModuleVisitor> {
        None
    }

    fn visit_main_class(&mut self, main_class: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_main_class(main_class))
    }

    fn visit_package(&mut self, package: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_package(package))
    }

    fn visit_require(
        &mut self,
        module: &JavaStr,
        access: ModuleRequireAccess,
        version: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        forward!(self.visit_require(module, access, version))
    }

    fn visit_export(
        &mut self,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        forward!(self.visit_export(package, access, modules))
    }

    fn visit_open(
        &mut self,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        forward!(self.visit_open(package, access, modules))
    }

    fn visit_use(&mut self, service: &JavaStr) -> ClassFileResult<()> {
        forward!(self.visit_use(service))
    }

    fn visit_provide(&mut self, service: &JavaStr, providers: &[&JavaStr]) -> ClassFileResult<()> {
        forward!(self.visit_provide(service, providers))
    }

    fn visit_end(&mut self) -> ClassFileResult<()> {
        forward!(self.visit_end())
    }
}

impl<V: ModuleVisitor> ModuleVisitor for &mut V {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn ModuleVisitor> {
        Some(&mut **self)
    }
}

impl<'a> ModuleVisitor for Box<dyn ModuleVisitor + 'a> {
    fn api(&self) -> Api {
        (**self).api()
    }

    fn delegate(&mut self) -> Option<&mut dyn ModuleVisitor> {
        Some(&mut **self)
    }
}
