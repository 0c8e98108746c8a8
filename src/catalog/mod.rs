//! Binary API catalog format.
//!
//! A catalog is a fixed header followed by one deflate stream holding twelve
//! tables back to back. Rows address each other by table-relative `i32`
//! offsets, so a loaded catalog is a single buffer and every entity is a
//! `(catalog, offset)` handle.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |  "APICATFB"      |  8 bytes
//! |  version         |  i32
//! |  table count     |  i32 (12)
//! |  table lengths   |  12 x i32
//! +------------------+
//! |  DEFLATE STREAM  |  string heap, platform, framework, package,
//! |                  |  assembly, usageSource, api, obsoletion,
//! |                  |  platformSupport, previewRequirement,
//! |                  |  experimental, extensionMethod
//! +------------------+
//! ```

pub mod builder;
pub mod codec;
pub mod cursor;
pub mod format;
pub mod layout;
pub(crate) mod lazy;
pub mod markup;
pub mod model;
mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use builder::CatalogBuilder;
pub use format::{ApiKind, TableKind, FORMAT_VERSION, MAGIC};
pub use markup::{Markup, MarkupBuilder, MarkupToken, MarkupTokenKind};
pub use model::*;
pub use reader::{ApiCatalog, CatalogStatistics};
pub use writer::CatalogWriter;
