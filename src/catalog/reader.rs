//! Catalog reader.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use flate2::read::DeflateDecoder;
use memmap2::Mmap;

use super::codec::{read_i32, read_str};
use super::cursor::{ArrayIter, Descendants, SortedRun, SortedTable, TableIter};
use super::format::{ApiKind, CatalogHeader, TableKind, NULL_OFFSET, TABLE_COUNT};
use super::layout::{self, FieldValue, TableLayout, TableShape};
use super::lazy::LazyIndex;
use super::markup::MarkupTokenKind;
use super::model::{
    Api, Assembly, Experimental, ExtensionMethod, Framework, Obsoletion, Package, Platform,
    PlatformSupport, PreviewRequirement, UsageSource,
};
use crate::{Error, Guid, Result};

/// Upper bound on the inflate buffer reserved before any data arrives.
const INITIAL_PAYLOAD_CAPACITY: usize = 1 << 20;

const EXTENSION_TYPE: usize = layout::EXTENSION_METHOD.offset_of("extendedType");

/// Keywords that do not change which member a signature denotes.
const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "protected", "internal", "private", "virtual", "override", "abstract", "sealed",
    "new", "extern", "unsafe", "readonly",
];

/// An immutable, fully inflated catalog.
///
/// All tables live in one buffer; entity handles borrow the catalog and
/// address rows by table-relative offset.
pub struct ApiCatalog {
    buffer: Vec<u8>,
    starts: [usize; TABLE_COUNT],
    lengths: [usize; TABLE_COUNT],
    api_by_guid: LazyIndex<AHashMap<Guid, usize>>,
    extension_by_guid: LazyIndex<AHashMap<Guid, usize>>,
    preview_frameworks: LazyIndex<AHashSet<String>>,
    forwarded: LazyIndex<AHashMap<usize, usize>>,
}

impl ApiCatalog {
    /// Read a catalog from a stream.
    ///
    /// The header is validated before anything is inflated; any failure
    /// returns an error and no catalog.
    pub fn load<R: Read>(mut input: R) -> Result<Self> {
        let header = CatalogHeader::read_from(&mut input)?;

        let payload_len = header.payload_len()?;

        // Lengths are untrusted until the stream backs them.
        let mut buffer = Vec::with_capacity(payload_len.min(INITIAL_PAYLOAD_CAPACITY));
        DeflateDecoder::new(input)
            .take(payload_len as u64)
            .read_to_end(&mut buffer)
            .map_err(Error::Decompress)?;
        if buffer.len() != payload_len {
            return Err(Error::Truncated {
                section: "table stream",
            });
        }

        let mut starts = [0usize; TABLE_COUNT];
        let mut lengths = [0usize; TABLE_COUNT];
        let mut position = 0;
        for kind in TableKind::ALL {
            let len = header.table_len(kind);
            starts[kind.index()] = position;
            lengths[kind.index()] = len;
            position += len;
        }

        log::debug!("Inflated catalog: {} bytes in {} tables", buffer.len(), TABLE_COUNT);

        Ok(Self {
            buffer,
            starts,
            lengths,
            api_by_guid: LazyIndex::new(),
            extension_by_guid: LazyIndex::new(),
            preview_frameworks: LazyIndex::new(),
            forwarded: LazyIndex::new(),
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::load(data)
    }

    /// Memory-map a catalog file and inflate it.
    ///
    /// The mapping only lives for the duration of the call; the returned
    /// catalog owns its inflated tables. The file must not be modified
    /// while it is being read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read once and dropped before returning. A
        // concurrent writer truncating the file is outside what we support.
        let mmap = unsafe { Mmap::map(&file)? };
        let catalog = Self::from_bytes(&mmap)?;
        log::info!(
            "Loaded catalog {} ({} bytes compressed, {} inflated)",
            path.display(),
            mmap.len(),
            catalog.buffer.len()
        );
        Ok(catalog)
    }

    /// Bytes of one table.
    pub fn table(&self, kind: TableKind) -> &[u8] {
        let start = self.starts[kind.index()];
        &self.buffer[start..start + self.lengths[kind.index()]]
    }

    pub fn table_len(&self, kind: TableKind) -> usize {
        self.lengths[kind.index()]
    }

    pub(crate) fn heap(&self) -> &[u8] {
        self.table(TableKind::String)
    }

    /// String at a heap offset.
    #[track_caller]
    pub fn string_at(&self, offset: usize) -> &str {
        read_str(self.heap(), offset)
    }

    pub fn platforms(&self) -> TableIter<'_, Platform<'_>> {
        TableIter::new(self, TableKind::Platform, Platform::at)
    }

    pub fn frameworks(&self) -> TableIter<'_, Framework<'_>> {
        TableIter::new(self, TableKind::Framework, Framework::at)
    }

    pub fn packages(&self) -> TableIter<'_, Package<'_>> {
        TableIter::new(self, TableKind::Package, Package::at)
    }

    pub fn assemblies(&self) -> TableIter<'_, Assembly<'_>> {
        TableIter::new(self, TableKind::Assembly, Assembly::at)
    }

    pub fn usage_sources(&self) -> TableIter<'_, UsageSource<'_>> {
        TableIter::new(self, TableKind::UsageSource, UsageSource::at)
    }

    /// Root APIs (namespaces) in catalog order.
    pub fn root_apis(&self) -> TableIter<'_, Api<'_>> {
        TableIter::new(self, TableKind::Api, Api::at)
    }

    /// Every API, depth-first from each root.
    pub fn all_apis(&self) -> Descendants<'_> {
        Descendants::new(self, self.root_apis().map(|api| api.offset()).collect())
    }

    pub fn extension_methods(&self) -> ArrayIter<'_, ExtensionMethod<'_>> {
        ArrayIter::rows(
            self,
            TableKind::ExtensionMethod,
            layout::EXTENSION_METHOD.row_size(),
            |catalog, _, row| ExtensionMethod::at(catalog, row),
        )
    }

    pub fn obsoletions(&self) -> ArrayIter<'_, Obsoletion<'_>> {
        ArrayIter::rows(
            self,
            TableKind::Obsoletion,
            layout::OBSOLETION.row_size(),
            |catalog, _, row| Obsoletion::at(catalog, row),
        )
    }

    pub fn platform_supports(&self) -> ArrayIter<'_, PlatformSupport<'_>> {
        ArrayIter::rows(
            self,
            TableKind::PlatformSupport,
            layout::PLATFORM_SUPPORT.row_size(),
            |catalog, _, row| PlatformSupport::at(catalog, row),
        )
    }

    pub fn preview_requirements(&self) -> ArrayIter<'_, PreviewRequirement<'_>> {
        ArrayIter::rows(
            self,
            TableKind::PreviewRequirement,
            layout::PREVIEW_REQUIREMENT.row_size(),
            |catalog, _, row| PreviewRequirement::at(catalog, row),
        )
    }

    pub fn experimentals(&self) -> ArrayIter<'_, Experimental<'_>> {
        ArrayIter::rows(
            self,
            TableKind::Experimental,
            layout::EXPERIMENTAL.row_size(),
            |catalog, _, row| Experimental::at(catalog, row),
        )
    }

    pub fn get_api_by_guid(&self, guid: Guid) -> Option<Api<'_>> {
        let index = self.api_by_guid.get_or_init(|| {
            self.all_apis()
                .map(|api| (api.guid(), api.offset()))
                .collect()
        });
        index.get(&guid).map(|&offset| Api::at(self, offset))
    }

    pub fn get_extension_method_by_guid(&self, guid: Guid) -> Option<ExtensionMethod<'_>> {
        let index = self.extension_by_guid.get_or_init(|| {
            self.extension_methods()
                .map(|method| (method.guid(), method.offset()))
                .collect()
        });
        index
            .get(&guid)
            .map(|&offset| ExtensionMethod::at(self, offset))
    }

    /// Look an API up by its dotted full name.
    pub fn find_api(&self, full_name: &str) -> Option<Api<'_>> {
        self.root_apis().find_map(|root| match_path(root, full_name))
    }

    pub fn framework_by_name(&self, name: &str) -> Option<Framework<'_>> {
        self.frameworks().find(|fx| fx.name() == name)
    }

    /// Frameworks whose every assembly requires preview opt-in.
    pub fn preview_framework_names(&self) -> Arc<AHashSet<String>> {
        self.preview_frameworks.get_or_init(|| {
            self.frameworks()
                .filter(|fx| {
                    fx.assemblies().len() > 0
                        && fx.assemblies().all(|a| a.preview_requirement().is_some())
                })
                .map(|fx| fx.name().to_string())
                .collect()
        })
    }

    pub fn is_preview_framework(&self, name: &str) -> bool {
        self.preview_framework_names().contains(name)
    }

    /// The `System.Type` member that a `System.Reflection.TypeInfo` member
    /// forwards to.
    pub fn forwarded_api<'a>(&'a self, api: Api<'a>) -> Option<Api<'a>> {
        let map = self.forwarded.get_or_init(|| self.build_forwarded_apis());
        map.get(&api.offset()).map(|&offset| Api::at(self, offset))
    }

    fn build_forwarded_apis(&self) -> AHashMap<usize, usize> {
        let mut forwarded = AHashMap::new();
        let (Some(type_info), Some(system_type)) = (
            self.find_api("System.Reflection.TypeInfo"),
            self.find_api("System.Type"),
        ) else {
            return forwarded;
        };

        let targets: AHashMap<(ApiKind, &str, String), usize> = system_type
            .children()
            .map(|member| (member_key(member), member.offset()))
            .collect();
        for member in type_info.children() {
            if let Some(&target) = targets.get(&member_key(member)) {
                forwarded.insert(member.offset(), target);
            }
        }
        log::debug!("Indexed {} forwarded members", forwarded.len());
        forwarded
    }

    /// First row of a side table keyed by `(api, assembly)`.
    pub(crate) fn side_row(
        &self,
        table: TableKind,
        api: Option<usize>,
        assembly: usize,
    ) -> Option<usize> {
        let data = self.table(table);
        let key = (api.map_or(NULL_OFFSET, |a| a as i32), assembly as i32);
        let sorted = SortedTable::new(data, row_size(table));
        sorted
            .first_match(|row| (read_i32(data, row), read_i32(data, row + 4)).cmp(&key))
            .map(|index| sorted.row(index))
    }

    pub(crate) fn platform_support_run(
        &self,
        api: Option<usize>,
        assembly: usize,
    ) -> SortedRun<'_, PlatformSupport<'_>> {
        let first = self.side_row(TableKind::PlatformSupport, api, assembly);
        let row_size = row_size(TableKind::PlatformSupport);
        SortedRun::new(
            self,
            TableKind::PlatformSupport,
            row_size,
            0,
            8,
            first.map(|row| (row - layout::COUNT_SIZE) / row_size),
            PlatformSupport::at,
        )
    }

    pub(crate) fn extension_method_run(&self, extended_type: usize) -> SortedRun<'_, ExtensionMethod<'_>> {
        let data = self.table(TableKind::ExtensionMethod);
        let row_size = layout::EXTENSION_METHOD.row_size();
        let first = SortedTable::new(data, row_size)
            .first_match(|row| read_i32(data, row + EXTENSION_TYPE).cmp(&(extended_type as i32)));
        SortedRun::new(
            self,
            TableKind::ExtensionMethod,
            row_size,
            EXTENSION_TYPE,
            4,
            first,
            ExtensionMethod::at,
        )
    }

    /// Offsets of every row of `kind`, in storage order.
    ///
    /// The API table yields all APIs depth-first since its directory
    /// only lists roots. The string heap has no rows.
    pub fn row_offsets(&self, kind: TableKind) -> Vec<usize> {
        let Some(table_layout) = TableLayout::for_table(kind) else {
            return Vec::new();
        };
        if kind == TableKind::Api {
            return self.all_apis().map(|api| api.offset()).collect();
        }
        let data = self.table(kind);
        let count = read_i32(data, 0).max(0) as usize;
        match table_layout.shape {
            TableShape::Directory => (0..count)
                .map(|i| read_i32(data, layout::directory_slot(i)) as usize)
                .collect(),
            TableShape::Sorted => (0..count).map(|i| table_layout.sorted_row(i)).collect(),
        }
    }

    /// Decode a row field by field through the table layout.
    pub fn decode_row(&self, kind: TableKind, row: usize) -> Vec<(&'static str, FieldValue<'_>)> {
        match TableLayout::for_table(kind) {
            Some(table_layout) => layout::decode_row(table_layout, self.heap(), self.table(kind), row),
            None => vec![("value", FieldValue::String(self.string_at(row)))],
        }
    }

    /// Row counts and table sizes.
    pub fn statistics(&self) -> CatalogStatistics {
        let mut apis = 0;
        let mut declarations = 0;
        for api in self.all_apis() {
            apis += 1;
            declarations += api.declarations().len();
        }
        CatalogStatistics {
            table_sizes: TableKind::ALL.map(|kind| (kind, self.table_len(kind))),
            platforms: self.platforms().len(),
            frameworks: self.frameworks().len(),
            packages: self.packages().len(),
            assemblies: self.assemblies().len(),
            usage_sources: self.usage_sources().len(),
            apis,
            declarations,
            obsoletions: self.obsoletions().len(),
            platform_supports: self.platform_supports().len(),
            preview_requirements: self.preview_requirements().len(),
            experimentals: self.experimentals().len(),
            extension_methods: self.extension_methods().len(),
        }
    }
}

impl fmt::Debug for ApiCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCatalog")
            .field("size", &self.buffer.len())
            .field("lengths", &self.lengths)
            .finish()
    }
}

fn row_size(table: TableKind) -> usize {
    TableLayout::for_table(table).map_or(0, TableLayout::row_size)
}

fn match_path<'a>(api: Api<'a>, path: &str) -> Option<Api<'a>> {
    let name = api.display_name();
    if path == name {
        return Some(api);
    }
    let rest = path.strip_prefix(name)?.strip_prefix('.')?;
    api.children().find_map(|child| match_path(child, rest))
}

/// Identity of a member independent of the type declaring it.
fn member_key(api: Api<'_>) -> (ApiKind, &str, String) {
    let signature = api
        .declarations()
        .next()
        .map(|declaration| {
            declaration
                .markup()
                .tokens()
                .filter(|t| !(t.kind == MarkupTokenKind::Keyword && MODIFIER_KEYWORDS.contains(&t.text)))
                .map(|t| t.text)
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    (api.kind(), api.name(), signature)
}

/// Row counts and table sizes of a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStatistics {
    pub table_sizes: [(TableKind, usize); TABLE_COUNT],
    pub platforms: usize,
    pub frameworks: usize,
    pub packages: usize,
    pub assemblies: usize,
    pub usage_sources: usize,
    pub apis: usize,
    pub declarations: usize,
    pub obsoletions: usize,
    pub platform_supports: usize,
    pub preview_requirements: usize,
    pub experimentals: usize,
    pub extension_methods: usize,
}

impl CatalogStatistics {
    pub fn total_size(&self) -> usize {
        self.table_sizes.iter().map(|(_, size)| size).sum()
    }
}

impl fmt::Display for CatalogStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Platforms:             {:>10}", self.platforms)?;
        writeln!(f, "Frameworks:            {:>10}", self.frameworks)?;
        writeln!(f, "Packages:              {:>10}", self.packages)?;
        writeln!(f, "Assemblies:            {:>10}", self.assemblies)?;
        writeln!(f, "Usage sources:         {:>10}", self.usage_sources)?;
        writeln!(f, "APIs:                  {:>10}", self.apis)?;
        writeln!(f, "Declarations:          {:>10}", self.declarations)?;
        writeln!(f, "Obsoletions:           {:>10}", self.obsoletions)?;
        writeln!(f, "Platform support:      {:>10}", self.platform_supports)?;
        writeln!(f, "Preview requirements:  {:>10}", self.preview_requirements)?;
        writeln!(f, "Experimentals:         {:>10}", self.experimentals)?;
        writeln!(f, "Extension methods:     {:>10}", self.extension_methods)?;
        writeln!(f)?;
        for (kind, size) in &self.table_sizes {
            writeln!(f, "{:<22} {:>10} bytes", format!("{} table:", kind), size)?;
        }
        write!(f, "{:<22} {:>10} bytes", "Total:", self.total_size())
    }
}
