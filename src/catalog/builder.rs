//! Construction-time intermediate representation of a catalog.
//!
//! Entities are keyed by identity (content fingerprint or name) and every
//! `define_*`/`add_*` call is idempotent, so the same input can be fed
//! repeatedly without producing duplicate rows.

use ahash::{AHashMap, AHashSet};
use chrono::NaiveDate;

use super::format::ApiKind;
use super::markup::Markup;
use crate::{Error, Guid, Result};

#[derive(Debug, Clone)]
pub struct FrameworkEntry {
    pub name: String,
    pub assemblies: Vec<Guid>,
}

#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub guid: Guid,
    pub name: String,
    pub version: String,
    /// (framework name, assembly)
    pub assemblies: Vec<(String, Guid)>,
}

#[derive(Debug, Clone)]
pub struct AssemblyEntry {
    pub guid: Guid,
    pub name: String,
    pub version: String,
    pub public_key_token: String,
}

#[derive(Debug, Clone)]
pub struct UsageSourceEntry {
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ApiEntry {
    pub guid: Guid,
    pub kind: ApiKind,
    pub parent: Option<Guid>,
    pub name: String,
    pub children: Vec<Guid>,
    /// (assembly, markup)
    pub declarations: Vec<(Guid, Markup)>,
    /// (usage source name, percentage)
    pub usages: Vec<(String, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObsoletionEntry {
    pub api: Option<Guid>,
    pub assembly: Guid,
    pub message: String,
    pub is_error: bool,
    pub diagnostic_id: String,
    pub url_format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSupportEntry {
    pub api: Option<Guid>,
    pub assembly: Guid,
    pub platform: String,
    pub is_supported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequirementEntry {
    pub api: Option<Guid>,
    pub assembly: Guid,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentalEntry {
    pub api: Option<Guid>,
    pub assembly: Guid,
    pub diagnostic_id: String,
    pub url_format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionMethodEntry {
    pub guid: Guid,
    pub extended_type: Guid,
    pub method: Guid,
}

/// Builder-side catalog contents, consumed by [`super::CatalogWriter`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    platforms: Vec<String>,
    frameworks: Vec<FrameworkEntry>,
    framework_index: AHashMap<String, usize>,
    packages: Vec<PackageEntry>,
    package_index: AHashMap<Guid, usize>,
    assemblies: Vec<AssemblyEntry>,
    assembly_index: AHashMap<Guid, usize>,
    usage_sources: Vec<UsageSourceEntry>,
    usage_source_index: AHashMap<String, usize>,
    apis: Vec<ApiEntry>,
    api_index: AHashMap<Guid, usize>,
    obsoletions: Vec<ObsoletionEntry>,
    platform_support: Vec<PlatformSupportEntry>,
    preview_requirements: Vec<PreviewRequirementEntry>,
    experimentals: Vec<ExperimentalEntry>,
    extension_methods: Vec<ExtensionMethodEntry>,
    extension_method_index: AHashSet<Guid>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_platform(&mut self, name: &str) {
        if !self.platforms.iter().any(|p| p.eq_ignore_ascii_case(name)) {
            self.platforms.push(name.to_string());
        }
    }

    pub fn define_framework(&mut self, name: &str) {
        if !self.framework_index.contains_key(name) {
            self.framework_index
                .insert(name.to_string(), self.frameworks.len());
            self.frameworks.push(FrameworkEntry {
                name: name.to_string(),
                assemblies: Vec::new(),
            });
        }
    }

    /// Define a package, returning its fingerprint.
    pub fn define_package(&mut self, name: &str, version: &str) -> Guid {
        let guid = Guid::for_package(name, version);
        if !self.package_index.contains_key(&guid) {
            self.package_index.insert(guid, self.packages.len());
            self.packages.push(PackageEntry {
                guid,
                name: name.to_string(),
                version: version.to_string(),
                assemblies: Vec::new(),
            });
        }
        guid
    }

    /// Define an assembly, returning its fingerprint.
    pub fn define_assembly(&mut self, name: &str, version: &str, public_key_token: &str) -> Guid {
        let guid = Guid::for_assembly(name, version, public_key_token);
        if !self.assembly_index.contains_key(&guid) {
            self.assembly_index.insert(guid, self.assemblies.len());
            self.assemblies.push(AssemblyEntry {
                guid,
                name: name.to_string(),
                version: version.to_string(),
                public_key_token: public_key_token.to_string(),
            });
        }
        guid
    }

    pub fn add_assembly_to_framework(&mut self, framework: &str, assembly: Guid) -> Result<()> {
        self.require_assembly(assembly)?;
        self.define_framework(framework);
        let index = self.framework_index[framework];
        let entry = &mut self.frameworks[index];
        if !entry.assemblies.contains(&assembly) {
            entry.assemblies.push(assembly);
        }
        Ok(())
    }

    pub fn add_assembly_to_package(
        &mut self,
        package: Guid,
        framework: &str,
        assembly: Guid,
    ) -> Result<()> {
        self.require_assembly(assembly)?;
        let index = *self
            .package_index
            .get(&package)
            .ok_or_else(|| Error::InvalidManifest(format!("unknown package {}", package)))?;
        self.define_framework(framework);
        let entry = &mut self.packages[index];
        if !entry
            .assemblies
            .iter()
            .any(|(fx, a)| fx == framework && *a == assembly)
        {
            entry.assemblies.push((framework.to_string(), assembly));
        }
        Ok(())
    }

    pub fn define_usage_source(&mut self, name: &str, date: NaiveDate) {
        if !self.usage_source_index.contains_key(name) {
            self.usage_source_index
                .insert(name.to_string(), self.usage_sources.len());
            self.usage_sources.push(UsageSourceEntry {
                name: name.to_string(),
                date,
            });
        }
    }

    /// Define an API under `parent` (which must already exist).
    ///
    /// The guid fingerprints the documentation-style identity
    /// `{prefix}:{full name}{signature}`, where `signature` disambiguates
    /// overloads and may be empty.
    pub fn define_api(
        &mut self,
        parent: Option<Guid>,
        kind: ApiKind,
        name: &str,
        signature: &str,
    ) -> Result<Guid> {
        let full_name = match parent {
            Some(p) => {
                let parent_name = self
                    .full_name(p)
                    .ok_or_else(|| Error::InvalidManifest(format!("unknown parent api {}", p)))?;
                if parent_name.is_empty() {
                    name.to_string()
                } else {
                    format!("{}.{}", parent_name, name)
                }
            }
            None => name.to_string(),
        };
        let guid = Guid::from_content(&format!("{}:{}{}", kind.doc_prefix(), full_name, signature));
        self.define_api_with_guid(guid, parent, kind, name)?;
        Ok(guid)
    }

    /// Define an API with an externally computed fingerprint.
    pub fn define_api_with_guid(
        &mut self,
        guid: Guid,
        parent: Option<Guid>,
        kind: ApiKind,
        name: &str,
    ) -> Result<()> {
        if self.api_index.contains_key(&guid) {
            return Ok(());
        }
        if let Some(p) = parent {
            let parent_index = *self
                .api_index
                .get(&p)
                .ok_or_else(|| Error::InvalidManifest(format!("unknown parent api {}", p)))?;
            self.apis[parent_index].children.push(guid);
        }
        self.api_index.insert(guid, self.apis.len());
        self.apis.push(ApiEntry {
            guid,
            kind,
            parent,
            name: name.to_string(),
            children: Vec::new(),
            declarations: Vec::new(),
            usages: Vec::new(),
        });
        Ok(())
    }

    /// Record that `assembly` declares `api` with the given markup.
    pub fn add_declaration(&mut self, api: Guid, assembly: Guid, markup: Markup) -> Result<()> {
        self.require_assembly(assembly)?;
        let entry = self.api_mut(api)?;
        if !entry.declarations.iter().any(|(a, _)| *a == assembly) {
            entry.declarations.push((assembly, markup));
        }
        Ok(())
    }

    pub fn add_usage(&mut self, api: Guid, source: &str, percentage: f32) -> Result<()> {
        if !self.usage_source_index.contains_key(source) {
            return Err(Error::InvalidManifest(format!(
                "unknown usage source {}",
                source
            )));
        }
        let entry = self.api_mut(api)?;
        if !entry.usages.iter().any(|(s, _)| s == source) {
            entry.usages.push((source.to_string(), percentage));
        }
        Ok(())
    }

    pub fn add_obsoletion(&mut self, entry: ObsoletionEntry) {
        if !self
            .obsoletions
            .iter()
            .any(|o| o.api == entry.api && o.assembly == entry.assembly)
        {
            self.obsoletions.push(entry);
        }
    }

    pub fn add_platform_support(&mut self, entry: PlatformSupportEntry) {
        self.add_platform(&entry.platform);
        if !self.platform_support.iter().any(|p| {
            p.api == entry.api
                && p.assembly == entry.assembly
                && p.platform.eq_ignore_ascii_case(&entry.platform)
        }) {
            self.platform_support.push(entry);
        }
    }

    pub fn add_preview_requirement(&mut self, entry: PreviewRequirementEntry) {
        if !self
            .preview_requirements
            .iter()
            .any(|p| p.api == entry.api && p.assembly == entry.assembly)
        {
            self.preview_requirements.push(entry);
        }
    }

    pub fn add_experimental(&mut self, entry: ExperimentalEntry) {
        if !self
            .experimentals
            .iter()
            .any(|e| e.api == entry.api && e.assembly == entry.assembly)
        {
            self.experimentals.push(entry);
        }
    }

    /// Record that `method` extends `extended_type`, returning the edge id.
    pub fn add_extension_method(&mut self, extended_type: Guid, method: Guid) -> Guid {
        let guid = Guid::for_extension_method(extended_type, method);
        if self.extension_method_index.insert(guid) {
            self.extension_methods.push(ExtensionMethodEntry {
                guid,
                extended_type,
                method,
            });
        }
        guid
    }

    /// Dotted name of an API built from its ancestors.
    ///
    /// The unnamed namespace contributes nothing, so its types are named
    /// as if they had no namespace at all.
    pub fn full_name(&self, api: Guid) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(api);
        while let Some(guid) = current {
            let entry = self.api(guid)?;
            if !entry.name.is_empty() {
                names.push(entry.name.as_str());
            }
            current = entry.parent;
        }
        names.reverse();
        Some(names.join("."))
    }

    fn require_assembly(&self, assembly: Guid) -> Result<()> {
        if self.assembly_index.contains_key(&assembly) {
            Ok(())
        } else {
            Err(Error::InvalidManifest(format!(
                "unknown assembly {}",
                assembly
            )))
        }
    }

    fn api_mut(&mut self, api: Guid) -> Result<&mut ApiEntry> {
        let index = *self
            .api_index
            .get(&api)
            .ok_or_else(|| Error::InvalidManifest(format!("unknown api {}", api)))?;
        Ok(&mut self.apis[index])
    }

    pub fn api(&self, guid: Guid) -> Option<&ApiEntry> {
        self.api_index.get(&guid).map(|&i| &self.apis[i])
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    pub fn frameworks(&self) -> &[FrameworkEntry] {
        &self.frameworks
    }

    pub fn packages(&self) -> &[PackageEntry] {
        &self.packages
    }

    pub fn assemblies(&self) -> &[AssemblyEntry] {
        &self.assemblies
    }

    pub fn usage_sources(&self) -> &[UsageSourceEntry] {
        &self.usage_sources
    }

    pub fn apis(&self) -> &[ApiEntry] {
        &self.apis
    }

    pub fn obsoletions(&self) -> &[ObsoletionEntry] {
        &self.obsoletions
    }

    pub fn platform_support(&self) -> &[PlatformSupportEntry] {
        &self.platform_support
    }

    pub fn preview_requirements(&self) -> &[PreviewRequirementEntry] {
        &self.preview_requirements
    }

    pub fn experimentals(&self) -> &[ExperimentalEntry] {
        &self.experimentals
    }

    pub fn extension_methods(&self) -> &[ExtensionMethodEntry] {
        &self.extension_methods
    }
}
