//! Round-trip tests for the catalog format.
//!
//! These build catalogs through `CatalogBuilder`, write them, load them back
//! and check the read-side model against what was built.

use chrono::NaiveDate;

use super::builder::{
    CatalogBuilder, ExperimentalEntry, ObsoletionEntry, PlatformSupportEntry,
    PreviewRequirementEntry,
};
use super::format::*;
use super::markup::{Markup, MarkupBuilder, MarkupTokenKind};
use super::model::GLOBAL_NAMESPACE;
use super::reader::ApiCatalog;
use super::writer::CatalogWriter;
use crate::{Error, Guid};

fn write_and_read(builder: &CatalogBuilder) -> ApiCatalog {
    let data = CatalogWriter::new()
        .write_to_vec(builder)
        .expect("Failed to write catalog");
    ApiCatalog::from_bytes(&data).expect("Failed to read catalog")
}

/// Guids of interest in the sample catalog.
struct Sample {
    builder: CatalogBuilder,
    runtime: Guid,
    contoso: Guid,
    preview: Guid,
    the_class: Guid,
    method: Guid,
    global_class: Guid,
    system_type: Guid,
    type_info_get_methods: Guid,
    type_get_methods: Guid,
    ext_foo: Guid,
    ext_bar: Guid,
}

fn sample() -> Sample {
    let mut b = CatalogBuilder::new();

    let runtime = b.define_assembly("System.Runtime", "8.0.0.0", "b03f5f7f11d50a3a");
    let contoso = b.define_assembly("Contoso.Extensions", "1.0.0.0", "");
    let preview = b.define_assembly("System.Runtime.Experimental", "10.0.0.0", "cc7b13ffcd2ddd51");

    b.add_assembly_to_framework("net8.0", runtime).unwrap();
    b.add_assembly_to_framework("net10.0", preview).unwrap();
    let package = b.define_package("Contoso.Extensions", "1.0.0");
    b.add_assembly_to_package(package, "net8.0", contoso).unwrap();

    b.define_usage_source("nuget.org", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let system = b.define_api(None, ApiKind::Namespace, "System", "").unwrap();
    b.add_declaration(system, runtime, Markup::tokenize("namespace System")).unwrap();

    let the_class = b.define_api(Some(system), ApiKind::Class, "TheClass", "").unwrap();
    b.add_declaration(the_class, runtime, Markup::tokenize("public class TheClass"))
        .unwrap();
    b.add_usage(the_class, "nuget.org", 0.25).unwrap();

    let method = b.define_api(Some(the_class), ApiKind::Method, "M", "()").unwrap();
    b.add_declaration(method, runtime, Markup::tokenize("public void M()")).unwrap();
    let field = b.define_api(Some(the_class), ApiKind::Field, "Count", "").unwrap();
    b.add_declaration(field, runtime, Markup::tokenize("public int Count")).unwrap();

    let system_type = b.define_api(Some(system), ApiKind::Class, "Type", "").unwrap();
    b.add_declaration(system_type, runtime, Markup::tokenize("public abstract class Type"))
        .unwrap();
    let type_get_methods = b
        .define_api(Some(system_type), ApiKind::Method, "GetMethods", "()")
        .unwrap();
    b.add_declaration(
        type_get_methods,
        runtime,
        Markup::tokenize("public abstract MethodInfo[] GetMethods()"),
    )
    .unwrap();

    let reflection = b
        .define_api(None, ApiKind::Namespace, "System.Reflection", "")
        .unwrap();
    b.add_declaration(reflection, runtime, Markup::tokenize("namespace System.Reflection"))
        .unwrap();
    let type_info = b.define_api(Some(reflection), ApiKind::Class, "TypeInfo", "").unwrap();
    b.add_declaration(type_info, runtime, Markup::tokenize("public abstract class TypeInfo : Type"))
        .unwrap();
    let type_info_get_methods = b
        .define_api(Some(type_info), ApiKind::Method, "GetMethods", "()")
        .unwrap();
    b.add_declaration(
        type_info_get_methods,
        runtime,
        Markup::tokenize("public override MethodInfo[] GetMethods()"),
    )
    .unwrap();

    let global = b.define_api(None, ApiKind::Namespace, "", "").unwrap();
    let global_class = b.define_api(Some(global), ApiKind::Class, "TheClass", "").unwrap();
    b.add_declaration(global_class, contoso, Markup::tokenize("public class TheClass"))
        .unwrap();

    let contoso_ns = b.define_api(None, ApiKind::Namespace, "Contoso", "").unwrap();
    let extensions = b
        .define_api(Some(contoso_ns), ApiKind::Class, "Extensions", "")
        .unwrap();
    b.add_declaration(extensions, contoso, Markup::tokenize("public static class Extensions"))
        .unwrap();
    let foo = b
        .define_api(Some(extensions), ApiKind::Method, "Foo", "(System.TheClass)")
        .unwrap();
    let bar = b
        .define_api(Some(extensions), ApiKind::Method, "Bar", "(System.TheClass)")
        .unwrap();
    let baz = b
        .define_api(Some(extensions), ApiKind::Method, "Baz", "(System.Type)")
        .unwrap();
    for api in [foo, bar, baz] {
        let markup = MarkupBuilder::new()
            .keyword("public")
            .space()
            .keyword("static")
            .space()
            .keyword("void")
            .space()
            .reference("Ext", Some(api))
            .punctuation("(")
            .keyword("this")
            .space()
            .reference("TheClass", Some(the_class))
            .punctuation(")")
            .build();
        b.add_declaration(api, contoso, markup).unwrap();
    }
    let ext_foo = b.add_extension_method(the_class, foo);
    let ext_bar = b.add_extension_method(the_class, bar);
    b.add_extension_method(system_type, baz);

    b.add_obsoletion(ObsoletionEntry {
        api: Some(method),
        assembly: runtime,
        message: "Use N instead".to_string(),
        is_error: false,
        diagnostic_id: "SYSLIB0001".to_string(),
        url_format: "https://aka.example/{0}".to_string(),
    });
    b.add_obsoletion(ObsoletionEntry {
        api: None,
        assembly: contoso,
        message: "Package is deprecated".to_string(),
        is_error: true,
        diagnostic_id: String::new(),
        url_format: String::new(),
    });

    for (platform, is_supported) in [("windows", true), ("linux", false)] {
        b.add_platform_support(PlatformSupportEntry {
            api: Some(the_class),
            assembly: runtime,
            platform: platform.to_string(),
            is_supported,
        });
    }
    b.add_platform_support(PlatformSupportEntry {
        api: None,
        assembly: runtime,
        platform: "browser".to_string(),
        is_supported: false,
    });

    b.add_preview_requirement(PreviewRequirementEntry {
        api: None,
        assembly: preview,
        message: "Requires preview features".to_string(),
        url: "https://aka.example/preview".to_string(),
    });
    b.add_experimental(ExperimentalEntry {
        api: Some(field),
        assembly: runtime,
        diagnostic_id: "EXP001".to_string(),
        url_format: String::new(),
    });

    Sample {
        builder: b,
        runtime,
        contoso,
        preview,
        the_class,
        method,
        global_class,
        system_type,
        type_info_get_methods,
        type_get_methods,
        ext_foo,
        ext_bar,
    }
}

// ============================================================================
// Header and Format Tests
// ============================================================================

#[test]
fn test_empty_catalog_round_trips() {
    let catalog = write_and_read(&CatalogBuilder::new());
    assert_eq!(catalog.root_apis().len(), 0);
    assert_eq!(catalog.frameworks().len(), 0);
    assert_eq!(catalog.extension_methods().len(), 0);
    assert!(catalog.get_api_by_guid(Guid::from_content("T:Nope")).is_none());
}

#[test]
fn test_header_is_stamped() {
    let data = CatalogWriter::new()
        .write_to_vec(&sample().builder)
        .unwrap();
    assert_eq!(&data[0..8], b"APICATFB");
    assert_eq!(i32::from_le_bytes([data[8], data[9], data[10], data[11]]), FORMAT_VERSION);
    assert_eq!(
        i32::from_le_bytes([data[12], data[13], data[14], data[15]]),
        TABLE_COUNT as i32
    );
}

#[test]
fn test_empty_stream_is_rejected() {
    let err = ApiCatalog::from_bytes(&[]).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_wrong_magic_is_rejected() {
    let mut data = CatalogWriter::new()
        .write_to_vec(&sample().builder)
        .unwrap();
    data[..8].copy_from_slice(b"APIC_TFB");
    assert!(matches!(ApiCatalog::from_bytes(&data), Err(Error::InvalidMagic)));
}

#[test]
fn test_wrong_versions_are_rejected() {
    let data = CatalogWriter::new()
        .write_to_vec(&sample().builder)
        .unwrap();
    for version in [1i32, 999_999_999] {
        let mut patched = data.clone();
        patched[8..12].copy_from_slice(&version.to_le_bytes());
        match ApiCatalog::from_bytes(&patched) {
            Err(Error::UnsupportedVersion(v)) => assert_eq!(v, version),
            other => panic!("expected version error, got {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_truncated_stream_is_rejected() {
    let data = CatalogWriter::new()
        .write_to_vec(&sample().builder)
        .unwrap();
    let cut = HEADER_SIZE + (data.len() - HEADER_SIZE) / 2;
    let err = ApiCatalog::from_bytes(&data[..cut]).unwrap_err();
    assert!(err.is_format_error());

    let err = ApiCatalog::from_bytes(&data[..HEADER_SIZE - 3]).unwrap_err();
    assert!(matches!(err, Error::Truncated { .. }));
}

#[test]
fn test_oversized_table_lengths_are_rejected() {
    let mut data = CatalogWriter::new()
        .write_to_vec(&CatalogBuilder::new())
        .unwrap();
    for i in 0..TABLE_COUNT {
        let at = 16 + i * 4;
        data[at..at + 4].copy_from_slice(&i32::MAX.to_le_bytes());
    }
    let err = ApiCatalog::from_bytes(&data).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_declared_length_beyond_stream_is_rejected() {
    let data = CatalogWriter::new()
        .write_to_vec(&sample().builder)
        .unwrap();
    let mut patched = data.clone();
    let at = 16 + TableKind::ExtensionMethod.index() * 4;
    let declared = i32::from_le_bytes([patched[at], patched[at + 1], patched[at + 2], patched[at + 3]]);
    patched[at..at + 4].copy_from_slice(&(declared + 64).to_le_bytes());
    assert!(matches!(
        ApiCatalog::from_bytes(&patched),
        Err(Error::Truncated { section: "table stream" })
    ));
}

// ============================================================================
// Structure Tests
// ============================================================================

#[test]
fn test_roots_follow_namespace_priority() {
    let catalog = write_and_read(&sample().builder);
    let roots: Vec<&str> = catalog.root_apis().map(|api| api.name()).collect();
    assert_eq!(roots, vec!["System", "System.Reflection", "", "Contoso"]);
}

#[test]
fn test_parent_child_structure_round_trips() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    for entry in s.builder.apis() {
        let api = catalog
            .get_api_by_guid(entry.guid)
            .unwrap_or_else(|| panic!("missing api {}", entry.name));
        assert_eq!(api.name(), entry.name);
        assert_eq!(api.kind(), entry.kind);
        assert_eq!(api.parent().map(|p| p.guid()), entry.parent);

        let mut children: Vec<Guid> = api.children().map(|c| c.guid()).collect();
        let mut expected = entry.children.clone();
        children.sort();
        expected.sort();
        assert_eq!(children, expected);

        for (assembly, markup) in &entry.declarations {
            let declaration = api
                .declarations()
                .find(|d| d.assembly().guid() == *assembly)
                .expect("declaration");
            assert_eq!(declaration.markup().to_string(), markup.to_string());
        }
        assert_eq!(api.declarations().len(), entry.declarations.len());
    }
    assert_eq!(catalog.all_apis().count(), s.builder.apis().len());
}

#[test]
fn test_children_sorted_types_before_members() {
    let s = sample();
    let catalog = write_and_read(&s.builder);
    let system = catalog.find_api("System").unwrap();
    let names: Vec<&str> = system.children().map(|c| c.name()).collect();
    assert_eq!(names, vec!["TheClass", "Type"]);

    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    let kinds: Vec<ApiKind> = the_class.children().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec![ApiKind::Field, ApiKind::Method]);
}

#[test]
fn test_ancestor_laws() {
    let catalog = write_and_read(&sample().builder);
    for api in catalog.all_apis() {
        let chain: Vec<_> = api.ancestors_and_self().collect();
        assert_eq!(chain[0], api);
        assert!(chain.last().unwrap().parent().is_none());

        let ancestors: Vec<_> = api.ancestors().collect();
        assert_eq!(ancestors, chain[1..].to_vec());
    }
}

#[test]
fn test_descendant_laws() {
    let catalog = write_and_read(&sample().builder);
    for api in catalog.all_apis() {
        let subtree: Vec<_> = api.descendants_and_self().collect();
        assert_eq!(subtree[0], api);

        let descendants: Vec<_> = api.descendants().collect();
        assert_eq!(descendants, subtree[1..].to_vec());
        for descendant in descendants {
            assert!(descendant.ancestors().any(|a| a == api));
        }
    }
}

#[test]
fn test_full_names() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    assert_eq!(the_class.full_name(), "System.TheClass");
    assert_eq!(the_class.namespace_name(), "System");

    let global_class = catalog.get_api_by_guid(s.global_class).unwrap();
    assert_eq!(global_class.full_name(), "<global namespace>.TheClass");
    assert_eq!(global_class.namespace_name(), GLOBAL_NAMESPACE);

    let method = catalog.get_api_by_guid(s.method).unwrap();
    assert_eq!(method.full_name(), "System.TheClass.M");
    assert_eq!(catalog.find_api("System.TheClass.M"), Some(method));
    assert_eq!(catalog.find_api("<global namespace>.TheClass"), Some(global_class));
    assert!(catalog.find_api("System.Missing").is_none());
}

#[test]
fn test_assembly_relations() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let runtime = catalog
        .assemblies()
        .find(|a| a.guid() == s.runtime)
        .unwrap();
    assert_eq!(runtime.name(), "System.Runtime");
    assert_eq!(runtime.version(), "8.0.0.0");
    assert_eq!(runtime.public_key_token(), "b03f5f7f11d50a3a");

    let roots: Vec<&str> = runtime.root_apis().map(|a| a.name()).collect();
    assert_eq!(roots, vec!["System", "System.Reflection"]);
    let frameworks: Vec<&str> = runtime.frameworks().map(|f| f.name()).collect();
    assert_eq!(frameworks, vec!["net8.0"]);
    assert_eq!(runtime.packages().len(), 0);

    let contoso = catalog
        .assemblies()
        .find(|a| a.guid() == s.contoso)
        .unwrap();
    let roots: Vec<&str> = contoso.root_apis().map(|a| a.name()).collect();
    assert_eq!(roots, vec!["", "Contoso"]);
    let packages: Vec<_> = contoso
        .packages()
        .map(|(p, f)| (p.name(), p.version(), f.name()))
        .collect();
    assert_eq!(packages, vec![("Contoso.Extensions", "1.0.0", "net8.0")]);

    let package = catalog.packages().next().unwrap();
    let (framework, assembly) = package.assemblies().next().unwrap();
    assert_eq!(framework.name(), "net8.0");
    assert_eq!(assembly, contoso);

    let net8 = catalog.framework_by_name("net8.0").unwrap();
    assert_eq!(net8.assemblies().collect::<Vec<_>>(), vec![runtime]);
}

#[test]
fn test_declaration_for_uses_sorted_assemblies() {
    let mut builder = CatalogBuilder::new();
    let assemblies: Vec<Guid> = (0..6)
        .map(|i| builder.define_assembly(&format!("Lib{}", i), "1.0.0.0", ""))
        .collect();
    let ns = builder.define_api(None, ApiKind::Namespace, "Lib", "").unwrap();
    let t = builder.define_api(Some(ns), ApiKind::Class, "Widget", "").unwrap();
    for &i in &[4, 0, 5, 2] {
        builder
            .add_declaration(t, assemblies[i], Markup::tokenize("public class Widget"))
            .unwrap();
    }

    let catalog = write_and_read(&builder);
    let widget = catalog.get_api_by_guid(t).unwrap();
    let offsets: Vec<usize> = widget.declarations().map(|d| d.assembly().offset()).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);

    for assembly in catalog.assemblies() {
        let declared = [0, 2, 4, 5]
            .iter()
            .any(|&i| assemblies[i] == assembly.guid());
        let found = widget.declaration_for(assembly);
        assert_eq!(found.is_some(), declared, "{}", assembly.name());
        if let Some(declaration) = found {
            assert_eq!(declaration.assembly(), assembly);
            assert_eq!(declaration.api(), widget);
        }
        assert_eq!(widget.is_declared_in(assembly), declared);
    }
}

#[test]
fn test_usages_and_sources() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let source = catalog.usage_sources().next().unwrap();
    assert_eq!(source.name(), "nuget.org");
    assert_eq!(source.date(), NaiveDate::from_ymd_opt(2024, 1, 1));

    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    let usages: Vec<_> = the_class.usages().collect();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].source, source);
    assert_eq!(usages[0].percentage, 0.25);
}

// ============================================================================
// Sorted Table Tests
// ============================================================================

#[test]
fn test_platform_support_duplicate_key_run() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    let declaration = the_class.declarations().next().unwrap();
    let rows: Vec<_> = declaration
        .platform_support()
        .map(|p| (p.platform_name(), p.is_supported()))
        .collect();
    assert_eq!(rows, vec![("linux", false), ("windows", true)]);
    for row in declaration.platform_support() {
        assert_eq!(row.api(), Some(the_class));
    }

    // No API-level rows: falls back to the assembly-wide run
    let method = catalog.get_api_by_guid(s.method).unwrap();
    let rows: Vec<_> = method.declarations().next().unwrap().platform_support().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].platform_name(), "browser");
    assert!(rows[0].api().is_none());
}

#[test]
fn test_binary_search_finds_start_of_every_run() {
    let mut b = CatalogBuilder::new();
    let asm = b.define_assembly("A", "1.0.0.0", "");
    let ns = b.define_api(None, ApiKind::Namespace, "N", "").unwrap();
    let mut apis = Vec::new();
    for i in 0..25 {
        let api = b
            .define_api(Some(ns), ApiKind::Class, &format!("T{:02}", i), "")
            .unwrap();
        b.add_declaration(api, asm, Markup::tokenize("class T")).unwrap();
        for platform in ["android", "ios", "linux", "macos", "windows"].iter().take(1 + i % 5) {
            b.add_platform_support(PlatformSupportEntry {
                api: Some(api),
                assembly: asm,
                platform: platform.to_string(),
                is_supported: true,
            });
        }
        apis.push(api);
    }

    let catalog = write_and_read(&b);
    assert_eq!(catalog.platform_supports().len(), (0..25).map(|i| 1 + i % 5).sum::<usize>());
    for (i, guid) in apis.into_iter().enumerate() {
        let api = catalog.get_api_by_guid(guid).unwrap();
        let rows: Vec<&str> = api
            .declarations()
            .next()
            .unwrap()
            .platform_support()
            .map(|p| p.platform_name())
            .collect();
        assert_eq!(rows.len(), 1 + i % 5, "run for T{:02}", i);
        assert_eq!(rows[0], "android");
    }
}

#[test]
fn test_obsoletion_falls_back_to_assembly() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let method = catalog.get_api_by_guid(s.method).unwrap();
    let obsoletion = method.declarations().next().unwrap().obsoletion().unwrap();
    assert_eq!(obsoletion.message(), "Use N instead");
    assert!(!obsoletion.is_error());
    assert_eq!(obsoletion.url().as_deref(), Some("https://aka.example/SYSLIB0001"));
    assert_eq!(obsoletion.api(), Some(method));

    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    assert!(the_class.declarations().next().unwrap().obsoletion().is_none());

    let global_class = catalog.get_api_by_guid(s.global_class).unwrap();
    let inherited = global_class.declarations().next().unwrap().obsoletion().unwrap();
    assert!(inherited.is_error());
    assert!(inherited.api().is_none());
    assert!(inherited.url().is_none());
    assert_eq!(inherited.assembly().guid(), s.contoso);
}

#[test]
fn test_preview_and_experimental() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let preview = catalog
        .assemblies()
        .find(|a| a.guid() == s.preview)
        .unwrap();
    assert_eq!(
        preview.preview_requirement().unwrap().message(),
        "Requires preview features"
    );
    assert!(catalog.is_preview_framework("net10.0"));
    assert!(!catalog.is_preview_framework("net8.0"));
    assert_eq!(catalog.preview_framework_names().len(), 1);

    let count = catalog.find_api("System.TheClass.Count").unwrap();
    let experimental = count.declarations().next().unwrap().experimental().unwrap();
    assert_eq!(experimental.diagnostic_id(), "EXP001");
    assert!(experimental.url().is_none());
}

#[test]
fn test_extension_method_grouping() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    let mut methods: Vec<&str> = the_class
        .extension_methods()
        .map(|e| {
            assert_eq!(e.extended_type(), the_class);
            e.method().name()
        })
        .collect();
    methods.sort();
    assert_eq!(methods, vec!["Bar", "Foo"]);

    let system_type = catalog.get_api_by_guid(s.system_type).unwrap();
    let methods: Vec<&str> = system_type
        .extension_methods()
        .map(|e| e.method().name())
        .collect();
    assert_eq!(methods, vec!["Baz"]);

    let method = catalog.get_api_by_guid(s.method).unwrap();
    assert_eq!(method.extension_methods().count(), 0);

    let foo = catalog.get_extension_method_by_guid(s.ext_foo).unwrap();
    assert_eq!(foo.method().name(), "Foo");
    assert_eq!(foo.guid(), s.ext_foo);
    assert!(catalog.get_extension_method_by_guid(s.ext_bar).is_some());
    assert!(catalog.get_extension_method_by_guid(Guid::EMPTY).is_none());
}

// ============================================================================
// Markup Tests
// ============================================================================

#[test]
fn test_markup_references_resolve() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let foo = catalog.find_api("Contoso.Extensions.Foo").unwrap();
    let markup = foo.declarations().next().unwrap().markup();
    let targets: Vec<_> = markup
        .tokens()
        .filter(|t| t.kind == MarkupTokenKind::Reference)
        .map(|t| t.reference.map(|api| api.guid()))
        .collect();
    assert_eq!(targets, vec![Some(foo.guid()), Some(s.the_class)]);
    assert_eq!(markup.to_string(), "public static void Ext(this TheClass)");
}

#[test]
fn test_reference_to_unindexed_api_is_absent() {
    let mut b = CatalogBuilder::new();
    let asm = b.define_assembly("A", "1.0.0.0", "");
    let ns = b.define_api(None, ApiKind::Namespace, "N", "").unwrap();
    let t = b.define_api(Some(ns), ApiKind::Class, "C", "").unwrap();
    let filtered = Guid::from_content("T:Filtered.Away");
    let markup = MarkupBuilder::new()
        .keyword("class")
        .space()
        .reference("C", Some(t))
        .space()
        .punctuation(":")
        .space()
        .reference("Away", Some(filtered))
        .build();
    b.add_declaration(t, asm, markup).unwrap();

    let catalog = write_and_read(&b);
    let c = catalog.get_api_by_guid(t).unwrap();
    let view = c.declarations().next().unwrap().markup();
    let references: Vec<_> = view
        .tokens()
        .filter(|t| t.kind == MarkupTokenKind::Reference)
        .map(|t| (t.text, t.reference))
        .collect();
    assert_eq!(references, vec![("C", Some(c)), ("Away", None)]);

    let owned = view.to_markup();
    assert_eq!(owned.references().collect::<Vec<_>>(), vec![t]);
    assert_eq!(owned.to_string(), "class C : Away");
}

#[test]
fn test_full_markup_nests_ancestors() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let method = catalog.get_api_by_guid(s.method).unwrap();
    let declaration = method.declarations().next().unwrap();
    assert_eq!(
        declaration.full_markup().to_string(),
        "namespace System\n{\n    public class TheClass\n    {\n        public void M()\n    }\n}"
    );

    // Roots have nothing to nest inside
    let system = catalog.find_api("System").unwrap();
    let root = system.declarations().next().unwrap();
    assert_eq!(root.full_markup().to_string(), "namespace System");
}

#[test]
fn test_identical_markup_is_shared() {
    let mut b = CatalogBuilder::new();
    let asm = b.define_assembly("A", "1.0.0.0", "");
    let ns = b.define_api(None, ApiKind::Namespace, "N", "").unwrap();
    let x = b.define_api(Some(ns), ApiKind::Class, "X", "").unwrap();
    let y = b.define_api(Some(ns), ApiKind::Class, "Y", "").unwrap();
    b.add_declaration(x, asm, Markup::tokenize("public sealed class Z")).unwrap();
    b.add_declaration(y, asm, Markup::tokenize("public sealed class Z")).unwrap();

    let catalog = write_and_read(&b);
    let x = catalog.get_api_by_guid(x).unwrap().declarations().next().unwrap();
    let y = catalog.get_api_by_guid(y).unwrap().declarations().next().unwrap();
    assert_eq!(x.markup().offset(), y.markup().offset());
}

// ============================================================================
// Derived Index Tests
// ============================================================================

#[test]
fn test_forwarded_type_info_members() {
    let s = sample();
    let catalog = write_and_read(&s.builder);

    let from = catalog.get_api_by_guid(s.type_info_get_methods).unwrap();
    let to = catalog.get_api_by_guid(s.type_get_methods).unwrap();
    assert_eq!(catalog.forwarded_api(from), Some(to));
    assert!(catalog.forwarded_api(to).is_none());
}

#[test]
fn test_lazy_index_shared_across_threads() {
    let s = sample();
    let catalog = write_and_read(&s.builder);
    let guids: Vec<Guid> = s.builder.apis().iter().map(|a| a.guid).collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for guid in &guids {
                    assert_eq!(catalog.get_api_by_guid(*guid).unwrap().guid(), *guid);
                }
            });
        }
    });
}

#[test]
fn test_statistics() {
    let s = sample();
    let catalog = write_and_read(&s.builder);
    let stats = catalog.statistics();

    assert_eq!(stats.assemblies, 3);
    assert_eq!(stats.frameworks, 2);
    assert_eq!(stats.packages, 1);
    assert_eq!(stats.platforms, 3);
    assert_eq!(stats.apis, s.builder.apis().len());
    assert_eq!(stats.extension_methods, 3);
    assert_eq!(stats.obsoletions, 2);
    assert_eq!(stats.platform_supports, 3);
    assert_eq!(stats.preview_requirements, 1);
    assert_eq!(stats.experimentals, 1);
    assert!(stats.to_string().contains("Assemblies:"));
    assert_eq!(
        stats.total_size(),
        TableKind::ALL.iter().map(|k| catalog.table_len(*k)).sum::<usize>()
    );
}

#[test]
fn test_generic_row_dump() {
    use super::layout::FieldValue;

    let s = sample();
    let catalog = write_and_read(&s.builder);

    assert!(catalog.row_offsets(TableKind::String).is_empty());
    assert_eq!(catalog.row_offsets(TableKind::Api).len(), s.builder.apis().len());
    assert_eq!(catalog.row_offsets(TableKind::PlatformSupport).len(), 3);

    let names: Vec<_> = catalog
        .row_offsets(TableKind::Platform)
        .into_iter()
        .map(|row| catalog.decode_row(TableKind::Platform, row))
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names
        .iter()
        .all(|fields| fields.len() == 1 && matches!(fields[0], ("name", FieldValue::String(_)))));

    let row = catalog.row_offsets(TableKind::Assembly)[0];
    let fields = catalog.decode_row(TableKind::Assembly, row);
    assert_eq!(fields[0].0, "guid");
    assert!(fields.iter().any(|(name, _)| *name == "rootApis"));
}

// ============================================================================
// Builder Semantics
// ============================================================================

#[test]
fn test_repeated_definitions_write_identical_catalogs() {
    let once = sample().builder;

    let mut twice = sample().builder;
    let again = sample().builder;
    for entry in again.apis() {
        twice
            .define_api_with_guid(entry.guid, entry.parent, entry.kind, &entry.name)
            .unwrap();
        for (assembly, markup) in &entry.declarations {
            twice.add_declaration(entry.guid, *assembly, markup.clone()).unwrap();
        }
    }
    for entry in again.extension_methods() {
        twice.add_extension_method(entry.extended_type, entry.method);
    }

    let writer = CatalogWriter::new();
    assert_eq!(
        writer.write_to_vec(&once).unwrap(),
        writer.write_to_vec(&twice).unwrap()
    );
}

#[test]
fn test_side_rows_for_unknown_apis_are_dropped() {
    let mut b = CatalogBuilder::new();
    let asm = b.define_assembly("A", "1.0.0.0", "");
    b.add_obsoletion(ObsoletionEntry {
        api: Some(Guid::from_content("M:Nowhere")),
        assembly: asm,
        message: String::new(),
        is_error: false,
        diagnostic_id: String::new(),
        url_format: String::new(),
    });

    let catalog = write_and_read(&b);
    assert_eq!(catalog.obsoletions().len(), 0);
}

// ============================================================================
// Bounds Tests
// ============================================================================

#[test]
#[should_panic(expected = "out of range for array of length 2")]
fn test_array_index_past_count_panics() {
    let s = sample();
    let catalog = write_and_read(&s.builder);
    let the_class = catalog.get_api_by_guid(s.the_class).unwrap();
    the_class.children().get(2);
}

#[test]
#[should_panic(expected = "out of range for assembly table")]
fn test_directory_index_past_count_panics() {
    let catalog = write_and_read(&sample().builder);
    catalog.assemblies().get(3);
}

#[test]
fn test_handles_compare_by_catalog_identity() {
    let s = sample();
    let first = write_and_read(&s.builder);
    let second = write_and_read(&s.builder);

    let a = first.get_api_by_guid(s.the_class).unwrap();
    let b = second.get_api_by_guid(s.the_class).unwrap();
    assert_eq!(a.offset(), b.offset());
    assert_ne!(a, b);
    assert_eq!(a, first.find_api("System.TheClass").unwrap());
}
