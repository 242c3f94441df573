//! Derive macros for daorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod record;

/// Derive `Record`, `FromRow` and `Writable` for a struct.
///
/// The struct must implement `Default`.
///
/// # Example
///
/// ```ignore
/// use daorm::Record;
///
/// #[derive(Default, Record)]
/// struct User {
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     tags: Vec<String>,
///     #[orm(skip)]
///     cache: Option<String>,
///     #[orm(flatten)]
///     audit: Audit,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Not a column
/// - `#[orm(json)]` - Store the field as JSON text
/// - `#[orm(scalar)]` - Bind the field directly (the type implements `ToValue` and
///   `FromValue`) even though it looks like a struct
/// - `#[orm(flatten)]` - Merge the columns of an embedded `Record`
///
/// Fields holding structs, maps, tuples and sequences other than `Vec<u8>` are
/// stored as JSON text.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
