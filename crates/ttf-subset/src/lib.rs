//! TrueType font metrics extraction and subsetting for PDF embedding.
//!
//! The crate provides two modes of operation on a single TrueType font:
//!
//! - **Metadata mode** ([`Font::metrics()`]) decodes font-wide metadata (names, ascent / descent,
//!   bounding box, etc.) together with per-character advance widths.
//! - **Subset mode** ([`FontSubset`]) produces a minimal, self-consistent TrueType font containing
//!   only the glyphs necessary to render the requested character codes.
//!
//! # Crate features
//!
//! ## `std`
//!
//! *(On by default)*
//!
//! Enables `std`-specific functionality, such as [`Error`](std::error::Error) trait implementations
//! for error types. The crate is `no_std`-compatible (requires `alloc`) if this feature is disabled.
//!
//! ## `serde`
//!
//! *(Off by default)*
//!
//! Derives `serde::Serialize` for [`FontMetrics`] and related types.
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use ttf_subset::{Font, FontSubset, SubsetOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let font_bytes = std::fs::read("DejaVuSans.ttf")?;
//! let font = Font::new(&font_bytes)?;
//! let metrics = font.metrics()?;
//! println!("{}: ascent {}", metrics.names.postscript, metrics.ascent);
//!
//! let codes: BTreeSet<u16> = "Hello".encode_utf16().collect();
//! let subset = FontSubset::new(&font, &codes, SubsetOptions::default())?;
//! let ttf: Vec<u8> = subset.to_truetype();
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![doc(html_root_url = "https://docs.rs/ttf-subset/0.1.0")]

extern crate alloc as std_alloc;

mod alloc {
    pub(crate) use std_alloc::{
        borrow::ToOwned,
        collections::{BTreeMap, BTreeSet},
        string::String,
        vec,
        vec::Vec,
    };
}

mod errors;
mod font;
mod metrics;
mod subset;
#[cfg(test)]
pub(crate) mod tests;
mod write;

pub use crate::{
    errors::{ErrorCategory, ParseError, ParseErrorKind},
    font::{CharMap, Font, TableRecord, TableTag},
    metrics::{BoundingBox, DescriptorFlags, Fixed, FontMetrics, FontNames, WidthTable},
    subset::{FontSubset, SfntVersion, SubsetOptions},
};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
