//! Entity handles.
//!
//! Every entity is a `(catalog, offset)` pair. Handles are `Copy`, compare
//! by catalog identity plus offset, and decode their fields on access.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

use chrono::NaiveDate;

use super::codec::{read_f32, read_guid, read_i32, read_optional_offset, read_u8};
use super::cursor::{Ancestors, ArrayIter, Descendants, MarkupTokens, SortedRun};
use super::format::{ApiKind, TableKind};
use super::layout;
use super::markup::{Markup, MarkupToken, MarkupTokenKind};
use super::reader::ApiCatalog;
use crate::Guid;

/// Display name of the unnamed namespace.
pub const GLOBAL_NAMESPACE: &str = "<global namespace>";

const PLATFORM_NAME: usize = layout::PLATFORM.offset_of("name");

const FRAMEWORK_NAME: usize = layout::FRAMEWORK.offset_of("name");
const FRAMEWORK_ASSEMBLIES: usize = layout::FRAMEWORK.offset_of("assemblies");

const PACKAGE_NAME: usize = layout::PACKAGE.offset_of("name");
const PACKAGE_VERSION: usize = layout::PACKAGE.offset_of("version");
const PACKAGE_ASSEMBLIES: usize = layout::PACKAGE.offset_of("assemblies");

const ASSEMBLY_GUID: usize = layout::ASSEMBLY.offset_of("guid");
const ASSEMBLY_NAME: usize = layout::ASSEMBLY.offset_of("name");
const ASSEMBLY_TOKEN: usize = layout::ASSEMBLY.offset_of("publicKeyToken");
const ASSEMBLY_VERSION: usize = layout::ASSEMBLY.offset_of("version");
const ASSEMBLY_ROOT_APIS: usize = layout::ASSEMBLY.offset_of("rootApis");
const ASSEMBLY_FRAMEWORKS: usize = layout::ASSEMBLY.offset_of("frameworks");
const ASSEMBLY_PACKAGES: usize = layout::ASSEMBLY.offset_of("packages");

const USAGE_SOURCE_NAME: usize = layout::USAGE_SOURCE.offset_of("name");
const USAGE_SOURCE_DAY: usize = layout::USAGE_SOURCE.offset_of("dayNumber");

const API_GUID: usize = layout::API.offset_of("guid");
const API_KIND: usize = layout::API.offset_of("kind");
const API_PARENT: usize = layout::API.offset_of("parent");
const API_NAME: usize = layout::API.offset_of("name");
const API_CHILDREN: usize = layout::API.offset_of("children");
const API_DECLARATIONS: usize = layout::API.offset_of("declarations");
const API_USAGES: usize = layout::API.offset_of("usages");

/// Shared (api, assembly) prefix of every side-table row.
const SIDE_API: usize = layout::OBSOLETION.offset_of("api");
const SIDE_ASSEMBLY: usize = layout::OBSOLETION.offset_of("assembly");

const OBSOLETION_MESSAGE: usize = layout::OBSOLETION.offset_of("message");
const OBSOLETION_IS_ERROR: usize = layout::OBSOLETION.offset_of("isError");
const OBSOLETION_DIAGNOSTIC_ID: usize = layout::OBSOLETION.offset_of("diagnosticId");
const OBSOLETION_URL_FORMAT: usize = layout::OBSOLETION.offset_of("urlFormat");

const PLATFORM_SUPPORT_PLATFORM: usize = layout::PLATFORM_SUPPORT.offset_of("platform");
const PLATFORM_SUPPORT_IS_SUPPORTED: usize = layout::PLATFORM_SUPPORT.offset_of("isSupported");

const PREVIEW_MESSAGE: usize = layout::PREVIEW_REQUIREMENT.offset_of("message");
const PREVIEW_URL: usize = layout::PREVIEW_REQUIREMENT.offset_of("url");

const EXPERIMENTAL_DIAGNOSTIC_ID: usize = layout::EXPERIMENTAL.offset_of("diagnosticId");
const EXPERIMENTAL_URL_FORMAT: usize = layout::EXPERIMENTAL.offset_of("urlFormat");

const EXTENSION_GUID: usize = layout::EXTENSION_METHOD.offset_of("guid");
const EXTENSION_TYPE: usize = layout::EXTENSION_METHOD.offset_of("extendedType");
const EXTENSION_METHOD: usize = layout::EXTENSION_METHOD.offset_of("method");

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $table:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'a> {
            catalog: &'a ApiCatalog,
            offset: usize,
        }

        #[allow(dead_code)]
        impl<'a> $name<'a> {
            pub(crate) fn at(catalog: &'a ApiCatalog, offset: usize) -> Self {
                Self { catalog, offset }
            }

            pub fn catalog(&self) -> &'a ApiCatalog {
                self.catalog
            }

            /// Row offset within its table.
            pub fn offset(&self) -> usize {
                self.offset
            }

            fn data(&self) -> &'a [u8] {
                self.catalog.table($table)
            }

            fn i32_field(&self, field: usize) -> i32 {
                read_i32(self.data(), self.offset + field)
            }

            fn str_field(&self, field: usize) -> &'a str {
                self.catalog.string_at(self.i32_field(field) as usize)
            }
        }

        impl PartialEq for $name<'_> {
            fn eq(&self, other: &Self) -> bool {
                ptr::eq(self.catalog, other.catalog) && self.offset == other.offset
            }
        }

        impl Eq for $name<'_> {}

        impl Hash for $name<'_> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.offset.hash(state);
            }
        }
    };
}

handle!(
    /// An operating system platform name.
    Platform,
    TableKind::Platform
);

impl<'a> Platform<'a> {
    pub fn name(&self) -> &'a str {
        self.str_field(PLATFORM_NAME)
    }
}

handle!(
    /// A target framework and the assemblies it ships in-box.
    Framework,
    TableKind::Framework
);

impl<'a> Framework<'a> {
    pub fn name(&self) -> &'a str {
        self.str_field(FRAMEWORK_NAME)
    }

    pub fn assemblies(&self) -> ArrayIter<'a, Assembly<'a>> {
        ArrayIter::new(
            self.catalog,
            TableKind::Framework,
            self.offset,
            self.offset + FRAMEWORK_ASSEMBLIES,
            4,
            |catalog, _, pos| {
                Assembly::at(catalog, read_i32(catalog.table(TableKind::Framework), pos) as usize)
            },
        )
    }
}

handle!(
    /// A package id and version.
    Package,
    TableKind::Package
);

impl<'a> Package<'a> {
    pub fn name(&self) -> &'a str {
        self.str_field(PACKAGE_NAME)
    }

    pub fn version(&self) -> &'a str {
        self.str_field(PACKAGE_VERSION)
    }

    /// Assemblies shipped by this package, per target framework.
    pub fn assemblies(&self) -> ArrayIter<'a, (Framework<'a>, Assembly<'a>)> {
        ArrayIter::new(
            self.catalog,
            TableKind::Package,
            self.offset,
            self.offset + PACKAGE_ASSEMBLIES,
            8,
            |catalog, _, pos| {
                let data = catalog.table(TableKind::Package);
                (
                    Framework::at(catalog, read_i32(data, pos) as usize),
                    Assembly::at(catalog, read_i32(data, pos + 4) as usize),
                )
            },
        )
    }
}

handle!(
    /// One indexed assembly identity.
    Assembly,
    TableKind::Assembly
);

impl<'a> Assembly<'a> {
    pub fn guid(&self) -> Guid {
        read_guid(self.data(), self.offset + ASSEMBLY_GUID)
    }

    pub fn name(&self) -> &'a str {
        self.str_field(ASSEMBLY_NAME)
    }

    pub fn public_key_token(&self) -> &'a str {
        self.str_field(ASSEMBLY_TOKEN)
    }

    pub fn version(&self) -> &'a str {
        self.str_field(ASSEMBLY_VERSION)
    }

    /// Root APIs (namespaces) this assembly declares something in.
    pub fn root_apis(&self) -> ArrayIter<'a, Api<'a>> {
        ArrayIter::new(
            self.catalog,
            TableKind::Assembly,
            self.offset,
            self.offset + ASSEMBLY_ROOT_APIS,
            4,
            |catalog, _, pos| {
                Api::at(catalog, read_i32(catalog.table(TableKind::Assembly), pos) as usize)
            },
        )
    }

    /// Frameworks that ship this assembly in-box.
    pub fn frameworks(&self) -> ArrayIter<'a, Framework<'a>> {
        ArrayIter::new(
            self.catalog,
            TableKind::Assembly,
            self.offset,
            self.offset + ASSEMBLY_FRAMEWORKS,
            4,
            |catalog, _, pos| {
                Framework::at(catalog, read_i32(catalog.table(TableKind::Assembly), pos) as usize)
            },
        )
    }

    /// Packages shipping this assembly, with the framework folder used.
    pub fn packages(&self) -> ArrayIter<'a, (Package<'a>, Framework<'a>)> {
        ArrayIter::new(
            self.catalog,
            TableKind::Assembly,
            self.offset,
            self.offset + ASSEMBLY_PACKAGES,
            8,
            |catalog, _, pos| {
                let data = catalog.table(TableKind::Assembly);
                (
                    Package::at(catalog, read_i32(data, pos) as usize),
                    Framework::at(catalog, read_i32(data, pos + 4) as usize),
                )
            },
        )
    }

    /// Assembly-wide obsoletion.
    pub fn obsoletion(&self) -> Option<Obsoletion<'a>> {
        self.catalog
            .side_row(TableKind::Obsoletion, None, self.offset)
            .map(|row| Obsoletion::at(self.catalog, row))
    }

    /// Assembly-wide platform support rows.
    pub fn platform_support(&self) -> SortedRun<'a, PlatformSupport<'a>> {
        self.catalog.platform_support_run(None, self.offset)
    }

    pub fn preview_requirement(&self) -> Option<PreviewRequirement<'a>> {
        self.catalog
            .side_row(TableKind::PreviewRequirement, None, self.offset)
            .map(|row| PreviewRequirement::at(self.catalog, row))
    }

    pub fn experimental(&self) -> Option<Experimental<'a>> {
        self.catalog
            .side_row(TableKind::Experimental, None, self.offset)
            .map(|row| Experimental::at(self.catalog, row))
    }
}

handle!(
    /// A source of usage telemetry.
    UsageSource,
    TableKind::UsageSource
);

impl<'a> UsageSource<'a> {
    pub fn name(&self) -> &'a str {
        self.str_field(USAGE_SOURCE_NAME)
    }

    /// Days since 0001-01-01.
    pub fn day_number(&self) -> i32 {
        self.i32_field(USAGE_SOURCE_DAY)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_num_days_from_ce_opt(self.day_number() + 1)
    }
}

handle!(
    /// A namespace, type or member.
    Api,
    TableKind::Api
);

impl<'a> Api<'a> {
    pub fn guid(&self) -> Guid {
        read_guid(self.data(), self.offset + API_GUID)
    }

    pub fn kind(&self) -> ApiKind {
        let raw = read_u8(self.data(), self.offset + API_KIND);
        match ApiKind::from_u8(raw) {
            Some(kind) => kind,
            None => panic!("invalid api kind {} at offset {}", raw, self.offset),
        }
    }

    pub fn name(&self) -> &'a str {
        self.str_field(API_NAME)
    }

    pub fn parent(&self) -> Option<Api<'a>> {
        read_optional_offset(self.data(), self.offset + API_PARENT)
            .map(|offset| Api::at(self.catalog, offset))
    }

    pub fn children(&self) -> ArrayIter<'a, Api<'a>> {
        ArrayIter::new(
            self.catalog,
            TableKind::Api,
            self.offset,
            self.offset + API_CHILDREN,
            4,
            |catalog, _, pos| Api::at(catalog, read_i32(catalog.table(TableKind::Api), pos) as usize),
        )
    }

    pub fn declarations(&self) -> ArrayIter<'a, Declaration<'a>> {
        ArrayIter::new(
            self.catalog,
            TableKind::Api,
            self.offset,
            self.offset + API_DECLARATIONS,
            8,
            |catalog, owner, pos| {
                let data = catalog.table(TableKind::Api);
                Declaration {
                    catalog,
                    api: owner,
                    assembly: read_i32(data, pos) as usize,
                    markup: read_i32(data, pos + 4) as usize,
                }
            },
        )
    }

    pub fn usages(&self) -> ArrayIter<'a, ApiUsage<'a>> {
        ArrayIter::new(
            self.catalog,
            TableKind::Api,
            self.offset,
            self.offset + API_USAGES,
            8,
            |catalog, _, pos| {
                let data = catalog.table(TableKind::Api);
                ApiUsage {
                    source: UsageSource::at(catalog, read_i32(data, pos) as usize),
                    percentage: read_f32(data, pos + 4),
                }
            },
        )
    }

    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors::new(self.catalog, self.parent().map(|p| p.offset))
    }

    /// Self, then each parent up to the root.
    pub fn ancestors_and_self(&self) -> Ancestors<'a> {
        Ancestors::new(self.catalog, Some(self.offset))
    }

    pub fn descendants(&self) -> Descendants<'a> {
        Descendants::new(self.catalog, self.children().map(|c| c.offset).collect())
    }

    /// Self, then the subtree in pre-order.
    pub fn descendants_and_self(&self) -> Descendants<'a> {
        Descendants::new(self.catalog, vec![self.offset])
    }

    /// Name with the unnamed namespace spelled out.
    pub fn display_name(&self) -> &'a str {
        let name = self.name();
        if name.is_empty() && self.kind().is_namespace() {
            GLOBAL_NAMESPACE
        } else {
            name
        }
    }

    /// Dotted name from the root down to this API.
    pub fn full_name(&self) -> String {
        let mut names: Vec<&str> = self.ancestors_and_self().map(|a| a.display_name()).collect();
        names.reverse();
        names.join(".")
    }

    /// Name of the enclosing (or own) namespace.
    pub fn namespace_name(&self) -> &'a str {
        self.ancestors_and_self()
            .find(|a| a.kind().is_namespace())
            .map_or(GLOBAL_NAMESPACE, |ns| ns.display_name())
    }

    /// Extension methods whose extended type is this API.
    pub fn extension_methods(&self) -> SortedRun<'a, ExtensionMethod<'a>> {
        self.catalog.extension_method_run(self.offset)
    }

    /// Declarations are stored sorted by assembly offset.
    pub fn declaration_for(&self, assembly: Assembly<'a>) -> Option<Declaration<'a>> {
        self.declarations()
            .find_sorted(|d| d.assembly.cmp(&assembly.offset))
    }

    pub fn is_declared_in(&self, assembly: Assembly<'a>) -> bool {
        self.declaration_for(assembly).is_some()
    }
}

impl fmt::Debug for Api<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("offset", &self.offset)
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Debug for Assembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("offset", &self.offset)
            .field("name", &self.name())
            .field("version", &self.version())
            .finish()
    }
}

impl fmt::Debug for Framework<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Framework({})", self.name())
    }
}

impl fmt::Debug for Package<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package({} {})", self.name(), self.version())
    }
}

impl fmt::Debug for Platform<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Platform({})", self.name())
    }
}

impl fmt::Debug for UsageSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UsageSource({})", self.name())
    }
}

/// Share of a usage source's corpus that references an API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApiUsage<'a> {
    pub source: UsageSource<'a>,
    pub percentage: f32,
}

/// An API as declared by one assembly.
#[derive(Clone, Copy)]
pub struct Declaration<'a> {
    catalog: &'a ApiCatalog,
    api: usize,
    assembly: usize,
    markup: usize,
}

impl<'a> Declaration<'a> {
    pub fn api(&self) -> Api<'a> {
        Api::at(self.catalog, self.api)
    }

    pub fn assembly(&self) -> Assembly<'a> {
        Assembly::at(self.catalog, self.assembly)
    }

    /// The declaration's own signature.
    pub fn markup(&self) -> MarkupView<'a> {
        MarkupView {
            catalog: self.catalog,
            offset: self.markup,
        }
    }

    /// The signature nested inside the declarations of its ancestors in the
    /// same assembly, with braces opened outermost first.
    pub fn full_markup(&self) -> Markup {
        let assembly = self.assembly();
        let mut outer: Vec<Declaration<'a>> = self
            .api()
            .ancestors()
            .filter_map(|a| a.declaration_for(assembly))
            .collect();
        outer.reverse();

        let mut markup = Markup::default();
        for (depth, declaration) in outer.iter().enumerate() {
            append_indented(&mut markup, declaration.markup(), depth);
            markup.push(MarkupToken::new(MarkupTokenKind::LineBreak, "\n"));
            push_indent(&mut markup, depth);
            markup.push(MarkupToken::new(MarkupTokenKind::Punctuation, "{"));
            markup.push(MarkupToken::new(MarkupTokenKind::LineBreak, "\n"));
        }
        append_indented(&mut markup, self.markup(), outer.len());
        for depth in (0..outer.len()).rev() {
            markup.push(MarkupToken::new(MarkupTokenKind::LineBreak, "\n"));
            push_indent(&mut markup, depth);
            markup.push(MarkupToken::new(MarkupTokenKind::Punctuation, "}"));
        }
        markup
    }

    /// Obsoletion of this API in this assembly, else of the whole assembly.
    pub fn obsoletion(&self) -> Option<Obsoletion<'a>> {
        self.catalog
            .side_row(TableKind::Obsoletion, Some(self.api), self.assembly)
            .or_else(|| self.catalog.side_row(TableKind::Obsoletion, None, self.assembly))
            .map(|row| Obsoletion::at(self.catalog, row))
    }

    /// Platform support rows of this API, else of the whole assembly.
    pub fn platform_support(&self) -> SortedRun<'a, PlatformSupport<'a>> {
        let own = self.catalog.platform_support_run(Some(self.api), self.assembly);
        if own.is_empty() {
            self.catalog.platform_support_run(None, self.assembly)
        } else {
            own
        }
    }

    pub fn preview_requirement(&self) -> Option<PreviewRequirement<'a>> {
        self.catalog
            .side_row(TableKind::PreviewRequirement, Some(self.api), self.assembly)
            .or_else(|| {
                self.catalog
                    .side_row(TableKind::PreviewRequirement, None, self.assembly)
            })
            .map(|row| PreviewRequirement::at(self.catalog, row))
    }

    pub fn experimental(&self) -> Option<Experimental<'a>> {
        self.catalog
            .side_row(TableKind::Experimental, Some(self.api), self.assembly)
            .or_else(|| self.catalog.side_row(TableKind::Experimental, None, self.assembly))
            .map(|row| Experimental::at(self.catalog, row))
    }
}

impl PartialEq for Declaration<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.catalog, other.catalog)
            && self.api == other.api
            && self.assembly == other.assembly
    }
}

impl Eq for Declaration<'_> {}

impl fmt::Debug for Declaration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("api", &self.api)
            .field("assembly", &self.assembly)
            .field("markup", &self.markup)
            .finish()
    }
}

fn push_indent(markup: &mut Markup, depth: usize) {
    if depth > 0 {
        markup.push(MarkupToken::new(MarkupTokenKind::Whitespace, "    ".repeat(depth)));
    }
}

fn append_indented(markup: &mut Markup, view: MarkupView<'_>, depth: usize) {
    push_indent(markup, depth);
    for token in view.tokens() {
        let line_break = token.kind == MarkupTokenKind::LineBreak;
        markup.push(token.to_owned_token());
        if line_break {
            push_indent(markup, depth);
        }
    }
}

/// Shared accessors of the (api, assembly) side-table rows.
macro_rules! side_row_key {
    ($name:ident) => {
        impl<'a> $name<'a> {
            /// The API this row applies to, `None` for the whole assembly.
            pub fn api(&self) -> Option<Api<'a>> {
                read_optional_offset(self.data(), self.offset + SIDE_API)
                    .map(|offset| Api::at(self.catalog, offset))
            }

            pub fn assembly(&self) -> Assembly<'a> {
                Assembly::at(self.catalog, self.i32_field(SIDE_ASSEMBLY) as usize)
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}@{}", stringify!($name), self.offset)
            }
        }
    };
}

handle!(
    /// An `[Obsolete]` marker.
    Obsoletion,
    TableKind::Obsoletion
);
side_row_key!(Obsoletion);

impl<'a> Obsoletion<'a> {
    pub fn message(&self) -> &'a str {
        self.str_field(OBSOLETION_MESSAGE)
    }

    pub fn is_error(&self) -> bool {
        read_u8(self.data(), self.offset + OBSOLETION_IS_ERROR) != 0
    }

    pub fn diagnostic_id(&self) -> &'a str {
        self.str_field(OBSOLETION_DIAGNOSTIC_ID)
    }

    pub fn url_format(&self) -> &'a str {
        self.str_field(OBSOLETION_URL_FORMAT)
    }

    /// `url_format` with `{0}` replaced by the diagnostic id.
    pub fn url(&self) -> Option<String> {
        format_url(self.url_format(), self.diagnostic_id())
    }
}

handle!(
    /// A supported or unsupported platform annotation.
    PlatformSupport,
    TableKind::PlatformSupport
);
side_row_key!(PlatformSupport);

impl<'a> PlatformSupport<'a> {
    pub fn platform_name(&self) -> &'a str {
        self.str_field(PLATFORM_SUPPORT_PLATFORM)
    }

    pub fn is_supported(&self) -> bool {
        read_u8(self.data(), self.offset + PLATFORM_SUPPORT_IS_SUPPORTED) != 0
    }
}

handle!(
    /// A requirement to opt into preview features.
    PreviewRequirement,
    TableKind::PreviewRequirement
);
side_row_key!(PreviewRequirement);

impl<'a> PreviewRequirement<'a> {
    pub fn message(&self) -> &'a str {
        self.str_field(PREVIEW_MESSAGE)
    }

    pub fn url(&self) -> &'a str {
        self.str_field(PREVIEW_URL)
    }
}

handle!(
    /// An `[Experimental]` marker.
    Experimental,
    TableKind::Experimental
);
side_row_key!(Experimental);

impl<'a> Experimental<'a> {
    pub fn diagnostic_id(&self) -> &'a str {
        self.str_field(EXPERIMENTAL_DIAGNOSTIC_ID)
    }

    pub fn url_format(&self) -> &'a str {
        self.str_field(EXPERIMENTAL_URL_FORMAT)
    }

    pub fn url(&self) -> Option<String> {
        format_url(self.url_format(), self.diagnostic_id())
    }
}

fn format_url(url_format: &str, diagnostic_id: &str) -> Option<String> {
    if url_format.is_empty() {
        None
    } else {
        Some(url_format.replace("{0}", diagnostic_id))
    }
}

handle!(
    /// An extension method attached to the type it extends.
    ExtensionMethod,
    TableKind::ExtensionMethod
);

impl<'a> ExtensionMethod<'a> {
    pub fn guid(&self) -> Guid {
        read_guid(self.data(), self.offset + EXTENSION_GUID)
    }

    pub fn extended_type(&self) -> Api<'a> {
        Api::at(self.catalog, self.i32_field(EXTENSION_TYPE) as usize)
    }

    pub fn method(&self) -> Api<'a> {
        Api::at(self.catalog, self.i32_field(EXTENSION_METHOD) as usize)
    }
}

impl fmt::Debug for ExtensionMethod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionMethod")
            .field("extended_type", &self.extended_type().name())
            .field("method", &self.method().name())
            .finish()
    }
}

/// A markup entry in the string heap.
#[derive(Clone, Copy)]
pub struct MarkupView<'a> {
    catalog: &'a ApiCatalog,
    offset: usize,
}

impl<'a> MarkupView<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn tokens(&self) -> MarkupTokens<'a> {
        MarkupTokens::new(self.catalog, self.offset)
    }

    /// Owned copy with references resolved to guids.
    pub fn to_markup(&self) -> Markup {
        Markup::new(self.tokens().map(|t| t.to_owned_token()).collect())
    }
}

impl fmt::Display for MarkupView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.tokens() {
            f.write_str(token.text)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MarkupView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkupView({:?})", self.to_string())
    }
}

/// One decoded markup token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkupTokenView<'a> {
    pub kind: MarkupTokenKind,
    pub text: &'a str,
    /// Target of a reference token; `None` when it was never indexed
    pub reference: Option<Api<'a>>,
}

impl<'a> MarkupTokenView<'a> {
    pub(crate) fn new(kind: MarkupTokenKind, text: &'a str, reference: Option<Api<'a>>) -> Self {
        Self {
            kind,
            text,
            reference,
        }
    }

    pub fn to_owned_token(&self) -> MarkupToken {
        if self.kind == MarkupTokenKind::Reference {
            MarkupToken::reference(self.text, self.reference.map(|api| api.guid()))
        } else {
            MarkupToken::new(self.kind, self.text)
        }
    }
}
