//! apicat - A compact binary catalog of library API surfaces.
//!
//! This crate stores the public API surface of a set of assemblies (namespaces,
//! types and members with their declarations, frameworks, packages, usage
//! statistics and annotations) in a single compressed file that loads into one
//! buffer and answers navigation queries without deserializing entities.
//!
//! # Features
//!
//! - **Single-buffer catalog**: every entity is a copyable `(catalog, offset)` handle
//! - **Deflate-compressed tables**: twelve tables behind a small fixed header
//! - **Binary-searched side tables**: obsoletion, platform support, preview and
//!   experimental annotations with API-to-assembly fallback
//! - **Lazy derived indices**: guid lookup, forwarded APIs and preview frameworks
//!   are computed once and shared across threads
//! - **Manifest input**: catalogs are built from YAML or JSON manifests
//!
//! # Quick Start
//!
//! ```ignore
//! use apicat::{ApiCatalog, CatalogWriter, Manifest};
//!
//! // Build a catalog from a manifest
//! let builder = Manifest::load("surface.yaml")?.to_builder()?;
//! let mut file = std::fs::File::create("surface.apicat")?;
//! CatalogWriter::new().write(&builder, &mut file)?;
//!
//! // Query it
//! let catalog = ApiCatalog::open("surface.apicat")?;
//! if let Some(api) = catalog.find_api("System.Console") {
//!     println!("{} has {} declarations", api.full_name(), api.declarations().len());
//! }
//! ```
//!
//! # Availability
//!
//! [`AvailabilityContext`] answers which frameworks provide an API, either in
//! the box or through a package, and [`PlatformAnnotation`] folds platform
//! support rows along the API's ancestors.

mod error;
mod guid;

pub mod availability;
pub mod catalog;
pub mod config;
pub mod manifest;

// Re-export core types
pub use error::{Error, Result};
pub use guid::Guid;

// Re-export configuration and input
pub use config::WriterConfig;
pub use manifest::{ImportSummary, Manifest};

// Re-export catalog types
pub use catalog::{
    Api, ApiCatalog, ApiKind, Assembly, CatalogBuilder, CatalogStatistics, CatalogWriter,
    Declaration, Framework, Markup, MarkupBuilder, Package, Platform, TableKind, UsageSource,
};

// Re-export availability layer
pub use availability::{
    ApiAvailability, AvailabilityContext, ExactFrameworkResolver, FrameworkResolver,
    PlatformAnnotation,
};
