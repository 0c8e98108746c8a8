//! Catalog writer.
//!
//! Tables are written in dependency order into separate buffers. Rows that
//! refer to rows not yet placed (frameworks and packages to assemblies,
//! assemblies to their root APIs, markup to APIs) get a provisional value and
//! a recorded fixup; once every table is laid out the fixups are resolved to
//! final offsets. Child arrays are preallocated with `-1` and backfilled as
//! each child is placed.

use std::cmp::Ordering;
use std::io::Write;

use ahash::AHashMap;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::builder::{ApiEntry, AssemblyEntry, CatalogBuilder};
use super::codec::BinaryWriter;
use super::format::{CatalogHeader, TableKind, NULL_OFFSET, TABLE_COUNT};
use super::layout::{self, directory_slot, COUNT_SIZE};
use super::markup::{Markup, MarkupTokenKind};
use crate::{Guid, Result, WriterConfig};

/// Catalog writer.
pub struct CatalogWriter {
    config: WriterConfig,
}

impl CatalogWriter {
    /// Create a writer with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Serialize `builder` as a compressed catalog into `out`.
    pub fn write<W: Write>(&self, builder: &CatalogBuilder, mut out: W) -> Result<()> {
        self.config.validate()?;

        let tables = Session::new(builder, &self.config).run();

        let mut lengths = [0i32; TABLE_COUNT];
        for (len, table) in lengths.iter_mut().zip(&tables) {
            *len = table.len() as i32;
        }
        CatalogHeader::new(lengths).write_to(&mut out)?;

        let mut encoder = DeflateEncoder::new(out, Compression::new(self.config.compression_level));
        for table in &tables {
            encoder.write_all(table.as_slice())?;
        }
        encoder.finish()?.flush()?;

        log::info!(
            "Wrote catalog: {} bytes uncompressed across {} tables",
            lengths.iter().map(|l| *l as usize).sum::<usize>(),
            TABLE_COUNT
        );
        Ok(())
    }

    /// Serialize into a byte vector.
    pub fn write_to_vec(&self, builder: &CatalogBuilder) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(64 * 1024);
        self.write(builder, &mut out)?;
        Ok(out)
    }
}

impl Default for CatalogWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A row reference resolved after all tables are laid out.
#[derive(Debug, Clone, Copy)]
enum FixupTarget {
    Assembly(Guid),
    Api(Guid),
}

#[derive(Debug)]
struct Fixup {
    table: TableKind,
    position: usize,
    target: FixupTarget,
}

/// State of a single write.
struct Session<'a> {
    builder: &'a CatalogBuilder,
    config: &'a WriterConfig,
    tables: Vec<BinaryWriter>,
    strings: AHashMap<&'a str, i32>,
    markups: AHashMap<&'a Markup, i32>,
    framework_offsets: AHashMap<&'a str, i32>,
    package_offsets: AHashMap<Guid, i32>,
    assembly_offsets: AHashMap<Guid, i32>,
    usage_source_offsets: AHashMap<&'a str, i32>,
    api_offsets: AHashMap<Guid, i32>,
    fixups: Vec<Fixup>,
    /// (string heap position, target api) of reference tokens
    markup_fixups: Vec<(usize, Guid)>,
}

impl<'a> Session<'a> {
    fn new(builder: &'a CatalogBuilder, config: &'a WriterConfig) -> Self {
        Self {
            builder,
            config,
            tables: (0..TABLE_COUNT).map(|_| BinaryWriter::new()).collect(),
            strings: AHashMap::new(),
            markups: AHashMap::new(),
            framework_offsets: AHashMap::new(),
            package_offsets: AHashMap::new(),
            assembly_offsets: AHashMap::new(),
            usage_source_offsets: AHashMap::new(),
            api_offsets: AHashMap::new(),
            fixups: Vec::new(),
            markup_fixups: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<BinaryWriter> {
        self.write_platforms();
        self.write_frameworks();
        self.write_packages();
        self.write_assemblies();
        self.write_usage_sources();
        self.write_apis();
        self.write_obsoletions();
        self.write_platform_support();
        self.write_preview_requirements();
        self.write_experimentals();
        self.write_extension_methods();
        self.apply_fixups();
        self.tables
    }

    fn table(&mut self, kind: TableKind) -> &mut BinaryWriter {
        &mut self.tables[kind.index()]
    }

    fn intern_string(&mut self, value: &'a str) -> i32 {
        if let Some(&offset) = self.strings.get(value) {
            return offset;
        }
        let heap = self.table(TableKind::String);
        heap.seek_to_end();
        let offset = heap.len() as i32;
        heap.write_str(value);
        self.strings.insert(value, offset);
        offset
    }

    /// Intern markup as `count, (kind, text, [api])*`.
    fn intern_markup(&mut self, markup: &'a Markup) -> i32 {
        if let Some(&offset) = self.markups.get(markup) {
            return offset;
        }

        // Token texts go first so the record itself stays contiguous.
        let texts: Vec<i32> = markup
            .tokens()
            .iter()
            .map(|t| self.intern_string(&t.text))
            .collect();

        let heap = &mut self.tables[TableKind::String.index()];
        heap.seek_to_end();
        let offset = heap.len() as i32;
        heap.write_i32(markup.tokens().len() as i32);
        for (token, text) in markup.tokens().iter().zip(texts) {
            heap.write_u8(token.kind.as_u8());
            heap.write_i32(text);
            if token.kind == MarkupTokenKind::Reference {
                if let Some(target) = token.reference {
                    self.markup_fixups.push((heap.position(), target));
                }
                heap.write_i32(NULL_OFFSET);
            }
        }
        self.markups.insert(markup, offset);
        offset
    }

    /// Write the row count and an empty directory.
    fn begin_directory(&mut self, kind: TableKind, count: usize) {
        let table = self.table(kind);
        table.write_i32(count as i32);
        for _ in 0..count {
            table.write_i32(NULL_OFFSET);
        }
    }

    /// Start row `index` at the end of the table and register it.
    fn begin_row(&mut self, kind: TableKind, index: usize) -> i32 {
        let table = self.table(kind);
        table.seek_to_end();
        let offset = table.len() as i32;
        table.patch_i32(directory_slot(index), offset);
        offset
    }

    /// Append `len, values` and point the row field at `field_pos` to it.
    ///
    /// Returns the position of the first value.
    fn write_array(&mut self, kind: TableKind, field_pos: usize, values: &[i32], per_element: usize) -> usize {
        let table = self.table(kind);
        table.seek_to_end();
        let start = table.len();
        table.patch_i32(field_pos, start as i32);
        table.write_i32((values.len() / per_element) as i32);
        for value in values {
            table.write_i32(*value);
        }
        start + COUNT_SIZE
    }

    fn write_platforms(&mut self) {
        let mut names: Vec<&'a str> = self.builder.platforms().iter().map(String::as_str).collect();
        names.sort_by_key(|n| n.to_lowercase());

        self.begin_directory(TableKind::Platform, names.len());
        for (index, name) in names.into_iter().enumerate() {
            let name_offset = self.intern_string(name);
            self.begin_row(TableKind::Platform, index);
            self.table(TableKind::Platform).write_i32(name_offset);
        }
    }

    fn sorted_assemblies(&self) -> Vec<&'a AssemblyEntry> {
        let builder = self.builder;
        let mut assemblies: Vec<_> = builder.assemblies().iter().collect();
        assemblies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        assemblies
    }

    /// Provisional value for an assembly reference: its position in write order.
    fn provisional_assembly(&self, order: &AHashMap<Guid, usize>, guid: Guid) -> i32 {
        order.get(&guid).map_or(NULL_OFFSET, |&i| i as i32)
    }

    fn assembly_order(&self) -> AHashMap<Guid, usize> {
        self.sorted_assemblies()
            .into_iter()
            .enumerate()
            .map(|(i, a)| (a.guid, i))
            .collect()
    }

    fn write_frameworks(&mut self) {
        let mut frameworks: Vec<_> = self.builder.frameworks().iter().collect();
        frameworks.sort_by(|a, b| a.name.cmp(&b.name));
        let order = self.assembly_order();

        self.begin_directory(TableKind::Framework, frameworks.len());
        for (index, framework) in frameworks.into_iter().enumerate() {
            let name = self.intern_string(&framework.name);
            let row = self.begin_row(TableKind::Framework, index);
            let table = self.table(TableKind::Framework);
            table.write_i32(name);
            table.write_i32(NULL_OFFSET);
            debug_assert_eq!(table.len() - row as usize, layout::FRAMEWORK.row_size());

            let values: Vec<i32> = framework
                .assemblies
                .iter()
                .map(|a| self.provisional_assembly(&order, *a))
                .collect();
            let field = row as usize + layout::FRAMEWORK.offset_of("assemblies");
            let start = self.write_array(TableKind::Framework, field, &values, 1);
            for (i, assembly) in framework.assemblies.iter().enumerate() {
                self.fixups.push(Fixup {
                    table: TableKind::Framework,
                    position: start + i * 4,
                    target: FixupTarget::Assembly(*assembly),
                });
            }
            self.framework_offsets.insert(&framework.name, row);
        }
    }

    fn framework_offset(&self, name: &str) -> i32 {
        self.framework_offsets.get(name).copied().unwrap_or(NULL_OFFSET)
    }

    fn write_packages(&mut self) {
        let mut packages: Vec<_> = self.builder.packages().iter().collect();
        packages.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.version.cmp(&b.version))
        });
        let order = self.assembly_order();

        self.begin_directory(TableKind::Package, packages.len());
        for (index, package) in packages.into_iter().enumerate() {
            let name = self.intern_string(&package.name);
            let version = self.intern_string(&package.version);
            let row = self.begin_row(TableKind::Package, index);
            let table = self.table(TableKind::Package);
            table.write_i32(name);
            table.write_i32(version);
            table.write_i32(NULL_OFFSET);
            debug_assert_eq!(table.len() - row as usize, layout::PACKAGE.row_size());

            let mut values = Vec::with_capacity(package.assemblies.len() * 2);
            for (framework, assembly) in &package.assemblies {
                values.push(self.framework_offset(framework));
                values.push(self.provisional_assembly(&order, *assembly));
            }
            let field = row as usize + layout::PACKAGE.offset_of("assemblies");
            let start = self.write_array(TableKind::Package, field, &values, 2);
            for (i, (_, assembly)) in package.assemblies.iter().enumerate() {
                self.fixups.push(Fixup {
                    table: TableKind::Package,
                    position: start + i * 8 + 4,
                    target: FixupTarget::Assembly(*assembly),
                });
            }
            self.package_offsets.insert(package.guid, row);
        }
    }

    /// Root APIs with anything in their subtree declared by each assembly,
    /// in write order.
    fn assembly_roots(&self) -> AHashMap<Guid, Vec<Guid>> {
        let mut roots: AHashMap<Guid, Vec<Guid>> = AHashMap::new();
        for root in self.sorted_roots() {
            let mut declaring = Vec::new();
            self.collect_declaring(root, &mut declaring);
            for assembly in declaring {
                roots.entry(assembly).or_default().push(root.guid);
            }
        }
        roots
    }

    fn collect_declaring(&self, api: &ApiEntry, declaring: &mut Vec<Guid>) {
        for (assembly, _) in &api.declarations {
            if !declaring.contains(assembly) {
                declaring.push(*assembly);
            }
        }
        for child in &api.children {
            if let Some(child) = self.builder.api(*child) {
                self.collect_declaring(child, declaring);
            }
        }
    }

    fn write_assemblies(&mut self) {
        let order = self.sorted_assemblies();
        let roots = self.assembly_roots();
        let api_order: AHashMap<Guid, usize> = self
            .builder
            .apis()
            .iter()
            .enumerate()
            .map(|(i, a)| (a.guid, i))
            .collect();

        let mut framework_lists: AHashMap<Guid, Vec<i32>> = AHashMap::new();
        for framework in self.builder.frameworks() {
            let offset = self.framework_offset(&framework.name);
            for assembly in &framework.assemblies {
                framework_lists.entry(*assembly).or_default().push(offset);
            }
        }
        let mut package_lists: AHashMap<Guid, Vec<i32>> = AHashMap::new();
        for package in self.builder.packages() {
            let offset = self.package_offsets.get(&package.guid).copied().unwrap_or(NULL_OFFSET);
            for (framework, assembly) in &package.assemblies {
                let list = package_lists.entry(*assembly).or_default();
                list.push(offset);
                list.push(self.framework_offset(framework));
            }
        }

        self.begin_directory(TableKind::Assembly, order.len());
        for (index, entry) in order.into_iter().enumerate() {
            let guid = entry.guid;
            let name = self.intern_string(&entry.name);
            let token = self.intern_string(&entry.public_key_token);
            let version = self.intern_string(&entry.version);

            let row = self.begin_row(TableKind::Assembly, index);
            let table = self.table(TableKind::Assembly);
            table.write_guid(&guid);
            table.write_i32(name);
            table.write_i32(token);
            table.write_i32(version);
            for _ in 0..3 {
                table.write_i32(NULL_OFFSET);
            }
            debug_assert_eq!(table.len() - row as usize, layout::ASSEMBLY.row_size());
            let row = row as usize;

            let root_apis = roots.get(&guid).cloned().unwrap_or_default();
            let provisional: Vec<i32> = root_apis
                .iter()
                .map(|a| api_order.get(a).map_or(NULL_OFFSET, |&i| i as i32))
                .collect();
            let start = self.write_array(
                TableKind::Assembly,
                row + layout::ASSEMBLY.offset_of("rootApis"),
                &provisional,
                1,
            );
            for (i, api) in root_apis.iter().enumerate() {
                self.fixups.push(Fixup {
                    table: TableKind::Assembly,
                    position: start + i * 4,
                    target: FixupTarget::Api(*api),
                });
            }

            let frameworks = framework_lists.remove(&guid).unwrap_or_default();
            self.write_array(
                TableKind::Assembly,
                row + layout::ASSEMBLY.offset_of("frameworks"),
                &frameworks,
                1,
            );
            let packages = package_lists.remove(&guid).unwrap_or_default();
            self.write_array(
                TableKind::Assembly,
                row + layout::ASSEMBLY.offset_of("packages"),
                &packages,
                2,
            );

            self.assembly_offsets.insert(guid, row as i32);
        }
    }

    fn write_usage_sources(&mut self) {
        let mut sources: Vec<_> = self.builder.usage_sources().iter().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));

        self.begin_directory(TableKind::UsageSource, sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            let name = self.intern_string(&source.name);
            let row = self.begin_row(TableKind::UsageSource, index);
            let table = self.table(TableKind::UsageSource);
            table.write_i32(name);
            table.write_i32(day_number(source.date));
            self.usage_source_offsets.insert(&source.name, row);
        }
    }

    fn sorted_roots(&self) -> Vec<&'a ApiEntry> {
        let mut roots: Vec<&'a ApiEntry> = self
            .builder
            .apis()
            .iter()
            .filter(|a| a.parent.is_none())
            .collect();
        roots.sort_by(|a, b| {
            self.config
                .compare_roots(&a.name, &b.name)
                .then_with(|| a.guid.cmp(&b.guid))
        });
        roots
    }

    fn sorted_children(&self, api: &ApiEntry) -> Vec<&'a ApiEntry> {
        let builder = self.builder;
        let mut children: Vec<&'a ApiEntry> =
            api.children.iter().filter_map(|g| builder.api(*g)).collect();
        children.sort_by(|a, b| compare_siblings(a, b));
        children
    }

    fn write_apis(&mut self) {
        let roots = self.sorted_roots();
        self.begin_directory(TableKind::Api, roots.len());
        for (index, root) in roots.into_iter().enumerate() {
            let offset = self.write_api(root, NULL_OFFSET);
            self.table(TableKind::Api).patch_i32(directory_slot(index), offset);
        }
    }

    /// Write `api` and its subtree depth-first, returning its row offset.
    fn write_api(&mut self, api: &'a ApiEntry, parent: i32) -> i32 {
        let name = self.intern_string(&api.name);

        let mut declarations = Vec::with_capacity(api.declarations.len() * 2);
        let mut sorted_declarations: Vec<_> = api.declarations.iter().collect();
        sorted_declarations.sort_by_key(|(assembly, _)| self.assembly_offsets.get(assembly).copied());
        for (assembly, markup) in sorted_declarations {
            let Some(&assembly_offset) = self.assembly_offsets.get(assembly) else {
                log::warn!("Skipping declaration of {} in unknown assembly {}", api.name, assembly);
                continue;
            };
            declarations.push(assembly_offset);
            declarations.push(self.intern_markup(markup));
        }

        let mut usages = Vec::with_capacity(api.usages.len() * 2);
        for (source, percentage) in &api.usages {
            if let Some(&source_offset) = self.usage_source_offsets.get(source.as_str()) {
                usages.push(source_offset);
                usages.push(percentage.to_bits() as i32);
            }
        }

        let table = self.table(TableKind::Api);
        table.seek_to_end();
        let row = table.len();
        table.write_guid(&api.guid);
        table.write_u8(api.kind.as_u8());
        table.write_i32(parent);
        table.write_i32(name);
        for _ in 0..3 {
            table.write_i32(NULL_OFFSET);
        }
        debug_assert_eq!(table.len() - row, layout::API.row_size());
        self.api_offsets.insert(api.guid, row as i32);

        let children = self.sorted_children(api);
        let placeholders = vec![NULL_OFFSET; children.len()];
        let children_start = self.write_array(
            TableKind::Api,
            row + layout::API.offset_of("children"),
            &placeholders,
            1,
        );
        self.write_array(
            TableKind::Api,
            row + layout::API.offset_of("declarations"),
            &declarations,
            2,
        );
        self.write_array(
            TableKind::Api,
            row + layout::API.offset_of("usages"),
            &usages,
            2,
        );

        for (i, child) in children.into_iter().enumerate() {
            let child_offset = self.write_api(child, row as i32);
            self.table(TableKind::Api)
                .patch_i32(children_start + i * 4, child_offset);
        }

        row as i32
    }

    /// Resolve (api, assembly) of a side-table row, or `None` to drop it.
    fn side_key(&self, table: TableKind, api: Option<Guid>, assembly: Guid) -> Option<(i32, i32)> {
        let Some(&assembly_offset) = self.assembly_offsets.get(&assembly) else {
            log::warn!("Dropping {} row for unknown assembly {}", table, assembly);
            return None;
        };
        let api_offset = match api {
            None => NULL_OFFSET,
            Some(guid) => match self.api_offsets.get(&guid) {
                Some(&offset) => offset,
                None => {
                    log::warn!("Dropping {} row for unknown api {}", table, guid);
                    return None;
                }
            },
        };
        Some((api_offset, assembly_offset))
    }

    /// Write sorted fixed-size rows: `count`, then each row via `write`.
    fn write_sorted<T, F>(&mut self, kind: TableKind, mut rows: Vec<((i32, i32), T)>, mut write: F)
    where
        F: FnMut(&mut Self, &T) -> Vec<RowField>,
    {
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let row_size = layout::TableLayout::for_table(kind).map_or(0, |l| l.row_size());

        let encoded: Vec<_> = rows.iter().map(|(key, value)| (*key, write(self, value))).collect();
        let table = self.table(kind);
        table.write_i32(encoded.len() as i32);
        for ((api, assembly), fields) in encoded {
            let start = table.len();
            table.write_i32(api);
            table.write_i32(assembly);
            for field in fields {
                match field {
                    RowField::Int(v) => table.write_i32(v),
                    RowField::Bool(v) => table.write_bool(v),
                }
            }
            debug_assert_eq!(table.len() - start, row_size);
        }
    }

    fn write_obsoletions(&mut self) {
        let builder = self.builder;
        let rows: Vec<_> = builder
            .obsoletions()
            .iter()
            .filter_map(|o| {
                self.side_key(TableKind::Obsoletion, o.api, o.assembly)
                    .map(|key| (key, o))
            })
            .collect();
        self.write_sorted(TableKind::Obsoletion, rows, |s, o| {
            vec![
                RowField::Int(s.intern_string(&o.message)),
                RowField::Bool(o.is_error),
                RowField::Int(s.intern_string(&o.diagnostic_id)),
                RowField::Int(s.intern_string(&o.url_format)),
            ]
        });
    }

    fn write_platform_support(&mut self) {
        let builder = self.builder;
        let mut rows: Vec<_> = builder
            .platform_support()
            .iter()
            .filter_map(|p| {
                self.side_key(TableKind::PlatformSupport, p.api, p.assembly)
                    .map(|key| (key, p))
            })
            .collect();
        rows.sort_by(|a, b| a.1.platform.cmp(&b.1.platform));
        self.write_sorted(TableKind::PlatformSupport, rows, |s, p| {
            vec![
                RowField::Int(s.intern_string(&p.platform)),
                RowField::Bool(p.is_supported),
            ]
        });
    }

    fn write_preview_requirements(&mut self) {
        let builder = self.builder;
        let rows: Vec<_> = builder
            .preview_requirements()
            .iter()
            .filter_map(|p| {
                self.side_key(TableKind::PreviewRequirement, p.api, p.assembly)
                    .map(|key| (key, p))
            })
            .collect();
        self.write_sorted(TableKind::PreviewRequirement, rows, |s, p| {
            vec![
                RowField::Int(s.intern_string(&p.message)),
                RowField::Int(s.intern_string(&p.url)),
            ]
        });
    }

    fn write_experimentals(&mut self) {
        let builder = self.builder;
        let rows: Vec<_> = builder
            .experimentals()
            .iter()
            .filter_map(|e| {
                self.side_key(TableKind::Experimental, e.api, e.assembly)
                    .map(|key| (key, e))
            })
            .collect();
        self.write_sorted(TableKind::Experimental, rows, |s, e| {
            vec![
                RowField::Int(s.intern_string(&e.diagnostic_id)),
                RowField::Int(s.intern_string(&e.url_format)),
            ]
        });
    }

    fn write_extension_methods(&mut self) {
        let mut rows: Vec<(i32, i32, Guid)> = Vec::new();
        for entry in self.builder.extension_methods() {
            match (
                self.api_offsets.get(&entry.extended_type),
                self.api_offsets.get(&entry.method),
            ) {
                (Some(&extended), Some(&method)) => rows.push((extended, method, entry.guid)),
                _ => log::warn!(
                    "Dropping extension method {} with unindexed endpoints",
                    entry.guid
                ),
            }
        }
        rows.sort();

        let table = self.table(TableKind::ExtensionMethod);
        table.write_i32(rows.len() as i32);
        for (extended, method, guid) in rows {
            table.write_guid(&guid);
            table.write_i32(extended);
            table.write_i32(method);
        }
    }

    fn apply_fixups(&mut self) {
        let fixups = std::mem::take(&mut self.fixups);
        for fixup in fixups {
            let offset = match fixup.target {
                FixupTarget::Assembly(guid) => self.assembly_offsets.get(&guid),
                FixupTarget::Api(guid) => self.api_offsets.get(&guid),
            }
            .copied()
            .unwrap_or(NULL_OFFSET);
            self.table(fixup.table).patch_i32(fixup.position, offset);
        }

        // References to APIs that were never indexed stay -1.
        let markup_fixups = std::mem::take(&mut self.markup_fixups);
        let mut unresolved = 0usize;
        for (position, target) in markup_fixups {
            let offset = match self.api_offsets.get(&target) {
                Some(&offset) => offset,
                None => {
                    unresolved += 1;
                    NULL_OFFSET
                }
            };
            self.table(TableKind::String).patch_i32(position, offset);
        }
        if unresolved > 0 {
            log::debug!("{} markup references point at unindexed APIs", unresolved);
        }
    }
}

/// Payload field of a sorted side-table row after its (api, assembly) key.
enum RowField {
    Int(i32),
    Bool(bool),
}

/// Sibling order: types before members, grouped by kind, then by name.
fn compare_siblings(a: &ApiEntry, b: &ApiEntry) -> Ordering {
    a.kind
        .sort_rank()
        .cmp(&b.kind.sort_rank())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.guid.cmp(&b.guid))
}

/// Days since 0001-01-01.
pub(crate) fn day_number(date: chrono::NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::format::{ApiKind, HEADER_SIZE, MAGIC};
    use crate::catalog::markup::MarkupBuilder;

    #[test]
    fn test_write_empty_catalog() {
        let builder = CatalogBuilder::new();
        let data = CatalogWriter::new().write_to_vec(&builder).unwrap();

        assert!(data.len() >= HEADER_SIZE);
        assert_eq!(&data[0..8], &MAGIC);
    }

    #[test]
    fn test_tables_written_in_order() {
        let mut builder = CatalogBuilder::new();
        builder.add_platform("windows");
        builder.define_framework("net8.0");
        let asm = builder.define_assembly("A", "1.0.0.0", "");
        builder.add_assembly_to_framework("net8.0", asm).unwrap();
        let ns = builder.define_api(None, ApiKind::Namespace, "N", "").unwrap();
        builder
            .add_declaration(ns, asm, MarkupBuilder::new().keyword("namespace").build())
            .unwrap();

        let config = WriterConfig::default();
        let tables = Session::new(&builder, &config).run();
        assert_eq!(tables.len(), TABLE_COUNT);
        // one platform: count + slot + row
        assert_eq!(tables[TableKind::Platform.index()].len(), 12);
        // side tables carry only their zero count
        assert_eq!(tables[TableKind::Obsoletion.index()].len(), 4);
        assert_eq!(tables[TableKind::ExtensionMethod.index()].len(), 4);
    }

    #[test]
    fn test_strings_are_deduplicated() {
        let mut builder = CatalogBuilder::new();
        let a = builder.define_assembly("Same", "1.0.0.0", "");
        let b = builder.define_assembly("Same", "2.0.0.0", "");
        assert_ne!(a, b);

        let config = WriterConfig::default();
        let tables = Session::new(&builder, &config).run();
        let heap = tables[TableKind::String.index()].as_slice();
        let occurrences = heap.windows(4).filter(|w| *w == b"Same").count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn test_day_number() {
        let epoch = chrono::NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        assert_eq!(day_number(epoch), 0);
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(day_number(date), 738_885);
    }
}
