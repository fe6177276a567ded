//! Extracts the brand filter facet of a product-listing page into a
//! deduplicated `(brand, count)` table.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod normalize;
pub mod parsers;
pub mod pipeline;
pub mod source;
pub mod strategies;
pub mod utils;

pub use crate::config::Config;
pub use crate::error::{DecodeError, ExportError, ExtractError, FetchError, InputError, ParseError};
pub use crate::models::{BrandEntry, BrandTable, Diagnostic, RawDocument, RawEntry, Site};
pub use crate::pipeline::{ExtractionResult, Outcome, Pipeline, RunState};
