//! Availability and platform annotation queries.
//!
//! These sit on top of the read model: an API is available on a framework
//! when an assembly declaring it ships in-box with that framework, or when a
//! package carries the assembly in a folder the framework would consume.

use std::fmt;

use ahash::AHashMap;

use crate::catalog::lazy::LazyIndex;
use crate::catalog::{Api, ApiCatalog, Declaration, Framework, Package, PlatformSupport};

/// Framework compatibility policy.
///
/// Package folders are named by framework; given the folders a package
/// provides, a resolver picks the one a target framework consumes.
pub trait FrameworkResolver: Send + Sync {
    fn nearest<'f>(&self, target: &str, folders: &[&'f str]) -> Option<&'f str>;
}

/// Resolver that only matches a folder named exactly like the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactFrameworkResolver;

impl FrameworkResolver for ExactFrameworkResolver {
    fn nearest<'f>(&self, target: &str, folders: &[&'f str]) -> Option<&'f str> {
        folders
            .iter()
            .copied()
            .find(|folder| folder.eq_ignore_ascii_case(target))
    }
}

/// How an API reaches a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilitySource<'a> {
    InBox,
    Package {
        package: Package<'a>,
        folder: Framework<'a>,
    },
}

/// One framework an API is available on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameworkAvailability<'a> {
    pub framework: Framework<'a>,
    pub declaration: Declaration<'a>,
    pub source: AvailabilitySource<'a>,
}

impl FrameworkAvailability<'_> {
    pub fn is_in_box(&self) -> bool {
        self.source == AvailabilitySource::InBox
    }
}

/// Shared per-catalog state for availability queries.
pub struct AvailabilityContext<'a> {
    catalog: &'a ApiCatalog,
    resolver: Box<dyn FrameworkResolver>,
    frameworks: LazyIndex<AHashMap<String, usize>>,
}

impl<'a> AvailabilityContext<'a> {
    pub fn new(catalog: &'a ApiCatalog) -> Self {
        Self::with_resolver(catalog, ExactFrameworkResolver)
    }

    pub fn with_resolver(catalog: &'a ApiCatalog, resolver: impl FrameworkResolver + 'static) -> Self {
        Self {
            catalog,
            resolver: Box::new(resolver),
            frameworks: LazyIndex::new(),
        }
    }

    pub fn catalog(&self) -> &'a ApiCatalog {
        self.catalog
    }

    pub fn framework(&self, name: &str) -> Option<Framework<'a>> {
        let index = self.frameworks.get_or_init(|| {
            self.catalog
                .frameworks()
                .map(|fx| (fx.name().to_string(), fx.offset()))
                .collect()
        });
        index
            .get(name)
            .map(|&offset| Framework::at(self.catalog, offset))
    }

    pub fn availability(&self, api: Api<'a>) -> ApiAvailability<'a> {
        ApiAvailability::of(self, api)
    }

    pub fn is_available(&self, api: Api<'a>, framework: &str) -> bool {
        self.availability(api).is_available_on(framework)
    }
}

impl fmt::Debug for AvailabilityContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityContext")
            .field("frameworks", &self.frameworks)
            .finish()
    }
}

/// Frameworks an API is available on, with the declaration providing it.
#[derive(Debug, Clone)]
pub struct ApiAvailability<'a> {
    entries: Vec<FrameworkAvailability<'a>>,
}

impl<'a> ApiAvailability<'a> {
    /// Compute availability of `api`.
    ///
    /// In-box availability wins; a package only counts for frameworks the
    /// API does not already ship in-box with.
    pub fn of(context: &AvailabilityContext<'a>, api: Api<'a>) -> Self {
        let mut entries: Vec<FrameworkAvailability<'a>> = Vec::new();
        let mut packaged: Vec<(Package<'a>, Framework<'a>, Declaration<'a>)> = Vec::new();

        for declaration in api.declarations() {
            let assembly = declaration.assembly();
            for framework in assembly.frameworks() {
                if !entries.iter().any(|e| e.framework == framework) {
                    entries.push(FrameworkAvailability {
                        framework,
                        declaration,
                        source: AvailabilitySource::InBox,
                    });
                }
            }
            for (package, folder) in assembly.packages() {
                packaged.push((package, folder, declaration));
            }
        }

        let mut by_package: Vec<(Package<'a>, Vec<(Framework<'a>, Declaration<'a>)>)> = Vec::new();
        for (package, folder, declaration) in packaged {
            match by_package.iter_mut().find(|(p, _)| *p == package) {
                Some((_, folders)) => folders.push((folder, declaration)),
                None => by_package.push((package, vec![(folder, declaration)])),
            }
        }

        for framework in context.catalog.frameworks() {
            if entries.iter().any(|e| e.framework == framework) {
                continue;
            }
            for (package, folders) in &by_package {
                let names: Vec<&str> = folders.iter().map(|(f, _)| f.name()).collect();
                let Some(chosen) = context.resolver.nearest(framework.name(), &names) else {
                    continue;
                };
                if let Some((folder, declaration)) = folders.iter().find(|(f, _)| f.name() == chosen) {
                    entries.push(FrameworkAvailability {
                        framework,
                        declaration: *declaration,
                        source: AvailabilitySource::Package {
                            package: *package,
                            folder: *folder,
                        },
                    });
                    break;
                }
            }
        }

        entries.sort_by(|a, b| a.framework.name().cmp(b.framework.name()));
        Self { entries }
    }

    pub fn entries(&self) -> &[FrameworkAvailability<'a>] {
        &self.entries
    }

    pub fn is_available_on(&self, framework: &str) -> bool {
        self.get(framework).is_some()
    }

    pub fn get(&self, framework: &str) -> Option<&FrameworkAvailability<'a>> {
        self.entries.iter().find(|e| e.framework.name() == framework)
    }

    pub fn frameworks(&self) -> impl Iterator<Item = Framework<'a>> + '_ {
        self.entries.iter().map(|e| e.framework)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Platform restrictions that apply to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformAnnotation<'a> {
    pub supported: Vec<&'a str>,
    pub unsupported: Vec<&'a str>,
}

impl<'a> PlatformAnnotation<'a> {
    /// Rows on the declaration itself, else on the nearest ancestor declared
    /// in the same assembly, else on the assembly.
    pub fn of(declaration: Declaration<'a>) -> Self {
        let catalog = declaration.api().catalog();
        let assembly = declaration.assembly();

        for api in declaration.api().ancestors_and_self() {
            let rows = catalog.platform_support_run(Some(api.offset()), assembly.offset());
            if !rows.is_empty() {
                return Self::from_rows(rows);
            }
        }
        Self::from_rows(assembly.platform_support())
    }

    fn from_rows(rows: impl Iterator<Item = PlatformSupport<'a>>) -> Self {
        let mut annotation = Self::default();
        for row in rows {
            if row.is_supported() {
                annotation.supported.push(row.platform_name());
            } else {
                annotation.unsupported.push(row.platform_name());
            }
        }
        annotation
    }

    /// No restrictions at all.
    pub fn is_unrestricted(&self) -> bool {
        self.supported.is_empty() && self.unsupported.is_empty()
    }

    /// An explicit supported list is an allow-list; otherwise every platform
    /// not listed as unsupported is supported.
    pub fn is_supported_on(&self, platform: &str) -> bool {
        if self.unsupported.iter().any(|p| p.eq_ignore_ascii_case(platform)) {
            return false;
        }
        self.supported.is_empty() || self.supported.iter().any(|p| p.eq_ignore_ascii_case(platform))
    }
}

impl fmt::Display for PlatformAnnotation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unrestricted() {
            return f.write_str("All platforms");
        }
        if !self.supported.is_empty() {
            write!(f, "Supported on: {}", self.supported.join(", "))?;
            if !self.unsupported.is_empty() {
                f.write_str("; ")?;
            }
        }
        if !self.unsupported.is_empty() {
            write!(f, "Unsupported on: {}", self.unsupported.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builder::PlatformSupportEntry;
    use crate::catalog::{ApiKind, CatalogBuilder, CatalogWriter, Markup};

    fn catalog() -> ApiCatalog {
        let mut b = CatalogBuilder::new();
        let inbox = b.define_assembly("System.Text.Json", "8.0.0.0", "cc7b13ffcd2ddd51");
        let packaged = b.define_assembly("System.Text.Json", "6.0.0.0", "cc7b13ffcd2ddd51");
        b.add_assembly_to_framework("net8.0", inbox).unwrap();
        b.define_framework("net6.0");
        b.define_framework("netstandard2.0");
        let package = b.define_package("System.Text.Json", "6.0.0");
        b.add_assembly_to_package(package, "net6.0", packaged).unwrap();
        b.add_assembly_to_package(package, "net8.0", packaged).unwrap();

        let ns = b.define_api(None, ApiKind::Namespace, "System.Text.Json", "").unwrap();
        let t = b.define_api(Some(ns), ApiKind::Class, "JsonSerializer", "").unwrap();
        let m = b.define_api(Some(t), ApiKind::Method, "Serialize", "(Object)").unwrap();
        for asm in [inbox, packaged] {
            b.add_declaration(t, asm, Markup::tokenize("public static class JsonSerializer"))
                .unwrap();
            b.add_declaration(m, asm, Markup::tokenize("public static string Serialize(object value)"))
                .unwrap();
        }

        b.add_platform_support(PlatformSupportEntry {
            api: Some(t),
            assembly: inbox,
            platform: "browser".to_string(),
            is_supported: false,
        });
        b.add_platform_support(PlatformSupportEntry {
            api: None,
            assembly: packaged,
            platform: "windows".to_string(),
            is_supported: true,
        });

        let data = CatalogWriter::new().write_to_vec(&b).unwrap();
        ApiCatalog::from_bytes(&data).unwrap()
    }

    #[test]
    fn test_exact_resolver() {
        let resolver = ExactFrameworkResolver;
        assert_eq!(resolver.nearest("net8.0", &["net6.0", "net8.0"]), Some("net8.0"));
        assert_eq!(resolver.nearest("net7.0", &["net6.0", "net8.0"]), None);
    }

    #[test]
    fn test_in_box_wins_over_package() {
        let catalog = catalog();
        let context = AvailabilityContext::new(&catalog);
        let api = catalog.find_api("System.Text.Json.JsonSerializer").unwrap();
        let availability = context.availability(api);

        let net8 = availability.get("net8.0").unwrap();
        assert!(net8.is_in_box());
        assert_eq!(net8.declaration.assembly().version(), "8.0.0.0");

        let net6 = availability.get("net6.0").unwrap();
        match net6.source {
            AvailabilitySource::Package { package, folder } => {
                assert_eq!(package.name(), "System.Text.Json");
                assert_eq!(folder.name(), "net6.0");
            }
            AvailabilitySource::InBox => panic!("net6.0 should come from the package"),
        }

        assert!(!availability.is_available_on("netstandard2.0"));
        assert!(context.is_available(api, "net6.0"));
        let names: Vec<&str> = availability.frameworks().map(|f| f.name()).collect();
        assert_eq!(names, vec!["net6.0", "net8.0"]);
    }

    #[test]
    fn test_framework_lookup_is_cached() {
        let catalog = catalog();
        let context = AvailabilityContext::new(&catalog);
        assert_eq!(context.framework("net8.0").unwrap().name(), "net8.0");
        assert!(context.framework("net9.0").is_none());
    }

    #[test]
    fn test_platform_annotation_inherits_from_ancestor() {
        let catalog = catalog();
        let method = catalog
            .find_api("System.Text.Json.JsonSerializer.Serialize")
            .unwrap();

        let inbox = method
            .declarations()
            .find(|d| d.assembly().version() == "8.0.0.0")
            .unwrap();
        let annotation = PlatformAnnotation::of(inbox);
        assert_eq!(annotation.unsupported, vec!["browser"]);
        assert!(!annotation.is_supported_on("browser"));
        assert!(annotation.is_supported_on("linux"));
        assert_eq!(annotation.to_string(), "Unsupported on: browser");

        let packaged = method
            .declarations()
            .find(|d| d.assembly().version() == "6.0.0.0")
            .unwrap();
        let annotation = PlatformAnnotation::of(packaged);
        assert_eq!(annotation.supported, vec!["windows"]);
        assert!(annotation.is_supported_on("Windows"));
        assert!(!annotation.is_supported_on("linux"));
    }
}
