//! Input manifest describing an API surface to be catalogued.
//!
//! A manifest is the hand-written (or tool-emitted) stand-in for a full
//! assembly indexer. It is read from YAML or JSON and replayed into a
//! [`CatalogBuilder`].
//!
//! # Example
//!
//! ```yaml
//! platforms: [windows, linux]
//! usage-sources:
//!   - { name: nuget.org, date: 2024-01-01 }
//! assemblies:
//!   - id: runtime
//!     name: System.Runtime
//!     version: 8.0.0.0
//!     apis:
//!       - kind: namespace
//!         name: System
//!         members:
//!           - kind: class
//!             name: Object
//!             declaration: "public class Object"
//!             usages: { nuget.org: 1.0 }
//! frameworks:
//!   - { name: net8.0, assemblies: [runtime] }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::builder::{
    ExperimentalEntry, ObsoletionEntry, PlatformSupportEntry, PreviewRequirementEntry,
};
use crate::catalog::{ApiKind, CatalogBuilder, Markup, MarkupToken, MarkupTokenKind};
use crate::{Error, Guid, Result};

/// Root of a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Manifest {
    pub platforms: Vec<String>,
    pub usage_sources: Vec<UsageSourceSpec>,
    pub assemblies: Vec<AssemblySpec>,
    pub frameworks: Vec<FrameworkSpec>,
    pub packages: Vec<PackageSpec>,
    pub extension_methods: Vec<ExtensionMethodSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UsageSourceSpec {
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FrameworkSpec {
    pub name: String,
    /// Assembly ids shipped in-box
    #[serde(default)]
    pub assemblies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub assemblies: Vec<PackageAssemblySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageAssemblySpec {
    pub framework: String,
    pub assembly: String,
}

/// An assembly and the API tree it declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssemblySpec {
    /// Manifest-local key used by frameworks and packages
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub public_key_token: String,
    #[serde(flatten)]
    pub annotations: AnnotationSpec,
    #[serde(default)]
    pub apis: Vec<ApiSpec>,
}

/// One API node; `members` nest the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiSpec {
    pub kind: ApiKind,
    pub name: String,
    /// Overload discriminator appended to the identity, e.g. `(System.String)`
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub declaration: Option<MarkupSpec>,
    /// Usage source name to percentage in `[0, 1]`
    #[serde(default)]
    pub usages: BTreeMap<String, f32>,
    #[serde(flatten)]
    pub annotations: AnnotationSpec,
    #[serde(default)]
    pub members: Vec<ApiSpec>,
}

/// Side-table annotations shared by APIs and assemblies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnnotationSpec {
    pub obsoletion: Option<ObsoletionSpec>,
    /// Platform name to supported flag
    pub platforms: BTreeMap<String, bool>,
    pub preview: Option<PreviewSpec>,
    pub experimental: Option<ExperimentalSpec>,
}

impl AnnotationSpec {
    fn is_empty(&self) -> bool {
        self.obsoletion.is_none()
            && self.platforms.is_empty()
            && self.preview.is_none()
            && self.experimental.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ObsoletionSpec {
    pub message: String,
    pub is_error: bool,
    pub diagnostic_id: String,
    pub url_format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PreviewSpec {
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExperimentalSpec {
    pub diagnostic_id: String,
    pub url_format: String,
}

/// Declaration markup: plain text (tokenized on import) or explicit tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkupSpec {
    Text(String),
    Tokens(Vec<TokenSpec>),
}

/// A markup token whose reference names its target by guid or API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TokenSpec {
    pub kind: MarkupTokenKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Pairs an extension method with the type it extends, both by API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionMethodSpec {
    pub extended_type: String,
    pub method: String,
}

/// Counts reported after a manifest has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub assemblies: usize,
    pub apis: usize,
    pub declarations: usize,
    pub annotations: usize,
    pub extension_methods: usize,
}

struct PendingDeclaration<'m> {
    api: Guid,
    assembly: Guid,
    markup: &'m MarkupSpec,
}

/// Replay state: manifest-local keys resolved to fingerprints.
struct Import<'m> {
    assemblies: AHashMap<&'m str, Guid>,
    /// `{full name}{signature}` to api guid
    apis: AHashMap<String, Guid>,
    declarations: Vec<PendingDeclaration<'m>>,
    summary: ImportSummary,
}

impl Manifest {
    /// Load a manifest, choosing JSON or YAML by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Build a fresh catalog builder from this manifest.
    pub fn to_builder(&self) -> Result<CatalogBuilder> {
        let mut builder = CatalogBuilder::new();
        self.apply(&mut builder)?;
        Ok(builder)
    }

    /// Replay this manifest into `builder`.
    ///
    /// Declarations are added after the whole API tree exists so markup
    /// references may point forward.
    pub fn apply(&self, builder: &mut CatalogBuilder) -> Result<ImportSummary> {
        let mut import = Import {
            assemblies: AHashMap::new(),
            apis: AHashMap::new(),
            declarations: Vec::new(),
            summary: ImportSummary::default(),
        };

        for platform in &self.platforms {
            builder.add_platform(platform);
        }
        for source in &self.usage_sources {
            builder.define_usage_source(&source.name, source.date);
        }

        for assembly in &self.assemblies {
            let guid =
                builder.define_assembly(&assembly.name, &assembly.version, &assembly.public_key_token);
            if import.assemblies.insert(&assembly.id, guid).is_some() {
                return Err(Error::InvalidManifest(format!(
                    "duplicate assembly id {}",
                    assembly.id
                )));
            }
            import.summary.assemblies += 1;
        }

        for framework in &self.frameworks {
            builder.define_framework(&framework.name);
            for id in &framework.assemblies {
                let assembly = import.assembly(id)?;
                builder.add_assembly_to_framework(&framework.name, assembly)?;
            }
        }

        for package in &self.packages {
            let guid = builder.define_package(&package.name, &package.version);
            for entry in &package.assemblies {
                let assembly = import.assembly(&entry.assembly)?;
                builder.add_assembly_to_package(guid, &entry.framework, assembly)?;
            }
        }

        for assembly in &self.assemblies {
            let guid = import.assembly(&assembly.id)?;
            import.annotate(builder, None, guid, &assembly.annotations);
            for api in &assembly.apis {
                import.define(builder, guid, None, "", api)?;
            }
        }

        let pending = std::mem::take(&mut import.declarations);
        for declaration in pending {
            let markup = import.resolve_markup(declaration.markup)?;
            builder.add_declaration(declaration.api, declaration.assembly, markup)?;
            import.summary.declarations += 1;
        }

        for extension in &self.extension_methods {
            let extended_type = import.api(&extension.extended_type)?;
            let method = import.api(&extension.method)?;
            builder.add_extension_method(extended_type, method);
            import.summary.extension_methods += 1;
        }

        import.summary.apis = import.apis.len();
        log::info!(
            "Imported manifest: {} assemblies, {} apis, {} declarations, {} annotations",
            import.summary.assemblies,
            import.summary.apis,
            import.summary.declarations,
            import.summary.annotations
        );
        Ok(import.summary)
    }
}

impl<'m> Import<'m> {
    fn assembly(&self, id: &str) -> Result<Guid> {
        self.assemblies
            .get(id)
            .copied()
            .ok_or_else(|| Error::InvalidManifest(format!("unknown assembly id {}", id)))
    }

    fn api(&self, key: &str) -> Result<Guid> {
        if let Some(guid) = self.apis.get(key) {
            return Ok(*guid);
        }
        key.parse::<Guid>()
            .map_err(|_| Error::InvalidManifest(format!("unknown api {}", key)))
    }

    /// Define `spec` and its members; the same API may appear under several
    /// assemblies and is merged by identity.
    fn define(
        &mut self,
        builder: &mut CatalogBuilder,
        assembly: Guid,
        parent: Option<Guid>,
        parent_name: &str,
        spec: &'m ApiSpec,
    ) -> Result<()> {
        let guid = builder.define_api(parent, spec.kind, &spec.name, &spec.signature)?;
        let full_name = if parent_name.is_empty() {
            spec.name.clone()
        } else {
            format!("{}.{}", parent_name, spec.name)
        };
        self.apis.insert(format!("{}{}", full_name, spec.signature), guid);

        if let Some(markup) = &spec.declaration {
            self.declarations.push(PendingDeclaration {
                api: guid,
                assembly,
                markup,
            });
        }
        for (source, percentage) in &spec.usages {
            builder.add_usage(guid, source, *percentage)?;
        }
        self.annotate(builder, Some(guid), assembly, &spec.annotations);

        for member in &spec.members {
            self.define(builder, assembly, Some(guid), &full_name, member)?;
        }
        Ok(())
    }

    fn annotate(
        &mut self,
        builder: &mut CatalogBuilder,
        api: Option<Guid>,
        assembly: Guid,
        annotations: &AnnotationSpec,
    ) {
        if annotations.is_empty() {
            return;
        }
        if let Some(o) = &annotations.obsoletion {
            builder.add_obsoletion(ObsoletionEntry {
                api,
                assembly,
                message: o.message.clone(),
                is_error: o.is_error,
                diagnostic_id: o.diagnostic_id.clone(),
                url_format: o.url_format.clone(),
            });
            self.summary.annotations += 1;
        }
        for (platform, is_supported) in &annotations.platforms {
            builder.add_platform_support(PlatformSupportEntry {
                api,
                assembly,
                platform: platform.clone(),
                is_supported: *is_supported,
            });
            self.summary.annotations += 1;
        }
        if let Some(p) = &annotations.preview {
            builder.add_preview_requirement(PreviewRequirementEntry {
                api,
                assembly,
                message: p.message.clone(),
                url: p.url.clone(),
            });
            self.summary.annotations += 1;
        }
        if let Some(e) = &annotations.experimental {
            builder.add_experimental(ExperimentalEntry {
                api,
                assembly,
                diagnostic_id: e.diagnostic_id.clone(),
                url_format: e.url_format.clone(),
            });
            self.summary.annotations += 1;
        }
    }

    fn resolve_markup(&self, spec: &MarkupSpec) -> Result<Markup> {
        let tokens = match spec {
            MarkupSpec::Text(text) => return Ok(Markup::tokenize(text)),
            MarkupSpec::Tokens(tokens) => tokens,
        };
        let mut markup = Markup::default();
        for token in tokens {
            if token.kind != MarkupTokenKind::Reference {
                markup.push(MarkupToken::new(token.kind, token.text.as_str()));
                continue;
            }
            // Unresolvable references survive as plain reference text.
            let target = match &token.reference {
                Some(key) => match self.api(key) {
                    Ok(guid) => Some(guid),
                    Err(_) => {
                        log::debug!("Markup reference {} not in manifest", key);
                        None
                    }
                },
                None => None,
            };
            markup.push(MarkupToken::reference(token.text.as_str(), target));
        }
        Ok(markup)
    }
}
