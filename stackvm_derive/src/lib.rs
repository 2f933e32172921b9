//! Derive macros for the stackvm crate.
//!
//! Provides `#[derive(Error)]`, which generates `Display` and
//! `std::error::Error` implementations from `#[error("...")]` attributes.

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` for an error enum.
///
/// Every variant must carry an `#[error("...")]` attribute giving its display
/// message. Fields interpolate with `{name}` for named fields and `{0}`,
/// `{1}`, ... for tuple fields.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
