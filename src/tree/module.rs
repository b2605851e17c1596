use crate::tree::check_api;
use crate::{
    Api, ClassFileResult, ClassVisitor, ModuleAccess, ModuleRelationAccess, ModuleRequireAccess,
    ModuleVisitor,
};
use java_string::{JavaStr, JavaString};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequireNode {
    pub module: JavaString,
    pub access: ModuleRequireAccess,
    pub version: Option<JavaString>,
}

/// An `exports` or `opens` directive. An empty `modules` list means the package is exported or
/// opened to everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRelationNode {
    pub package: JavaString,
    pub access: ModuleRelationAccess,
    pub modules: Vec<JavaString>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProvideNode {
    pub service: JavaString,
    pub providers: Vec<JavaString>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub name: JavaString,
    pub access: ModuleAccess,
    pub version: Option<JavaString>,
    pub main_class: Option<JavaString>,
    pub packages: Vec<JavaString>,
    pub requires: Vec<ModuleRequireNode>,
    pub exports: Vec<ModuleRelationNode>,
    pub opens: Vec<ModuleRelationNode>,
    pub uses: Vec<JavaString>,
    pub provides: Vec<ModuleProvideNode>,
}

fn borrowed(names: &[JavaString]) -> Vec<&JavaStr> {
    names.iter().map(|name| &**name).collect()
}

impl ModuleNode {
    pub fn new(name: &JavaStr, access: ModuleAccess, version: Option<&JavaStr>) -> ModuleNode {
        ModuleNode {
            name: name.to_owned(),
            access,
            version: version.map(JavaStr::to_owned),
            main_class: None,
            packages: Vec::new(),
            requires: Vec::new(),
            exports: Vec::new(),
            opens: Vec::new(),
            uses: Vec::new(),
            provides: Vec::new(),
        }
    }

    pub fn accept(&self, cv: &mut dyn ClassVisitor) -> ClassFileResult<()> {
        let Some(mut mv) = cv.visit_module(&self.name, self.access, self.version.as_deref())? else {
            return Ok(());
        };
        if let Some(main_class) = &self.main_class {
            mv.visit_main_class(main_class)?;
        }
        for package in &self.packages {
            mv.visit_package(package)?;
        }
        for require in &self.requires {
            mv.visit_require(&require.module, require.access, require.version.as_deref())?;
        }
        for export in &self.exports {
            mv.visit_export(&export.package, export.access, &borrowed(&export.modules))?;
        }
        for open in &self.opens {
            mv.visit_open(&open.package, open.access, &borrowed(&open.modules))?;
        }
        for service in &self.uses {
            mv.visit_use(service)?;
        }
        for provide in &self.provides {
            mv.visit_provide(&provide.service, &borrowed(&provide.providers))?;
        }
        mv.visit_end()
    }

    pub fn check(&self, api: Api) -> ClassFileResult<()> {
        check_api(api, Api::V6, "module")
    }
}

fn owned(names: &[&JavaStr]) -> Vec<JavaString> {
    names.iter().map(|&name| name.to_owned()).collect()
}

impl ModuleVisitor for ModuleNode {
    fn visit_main_class(&mut self, main_class: &JavaStr) -> ClassFileResult<()> {
        self.main_class = Some(main_class.to_owned());
        Ok(())
    }

    fn visit_package(&mut self, package: &JavaStr) -> ClassFileResult<()> {
        self.packages.push(package.to_owned());
        Ok(())
    }

    fn visit_require(
        &mut self,
        module: &JavaStr,
        access: ModuleRequireAccess,
        version: Option<&JavaStr>,
    ) -> ClassFileResult<()> {
        self.requires.push(ModuleRequireNode {
            module: module.to_owned(),
            access,
            version: version.map(JavaStr::to_owned),
        });
        Ok(())
    }

    fn visit_export(
        &mut self,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        self.exports.push(ModuleRelationNode {
            package: package.to_owned(),
            access,
            modules: owned(modules),
        });
        Ok(())
    }

    fn visit_open(
        &mut self,
        package: &JavaStr,
        access: ModuleRelationAccess,
        modules: &[&JavaStr],
    ) -> ClassFileResult<()> {
        self.opens.push(ModuleRelationNode {
            package: package.to_owned(),
            access,
            modules: owned(modules),
        });
        Ok(())
    }

    fn visit_use(&mut self, service: &JavaStr) -> ClassFileResult<()> {
        self.uses.push(service.to_owned());
        Ok(())
    }

    fn visit_provide(&mut self, service: &JavaStr, providers: &[&JavaStr]) -> ClassFileResult<()> {
        self.provides.push(ModuleProvideNode {
            service: service.to_owned(),
            providers: owned(providers),
        });
        Ok(())
    }
}
