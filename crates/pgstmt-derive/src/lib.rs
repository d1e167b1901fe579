//! Derive macros for pgstmt
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `FromRecord` and `FieldSource` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use pgstmt::Record;
///
/// #[derive(Record)]
/// struct Currency {
///     id: String,
///     #[record(column = "currencyName")]
///     name: String,
///     #[record(skip_insert)]
///     created_at: Option<chrono::DateTime<chrono::Utc>>,
/// }
/// ```
///
/// # Generated
///
/// - `FromRecord::FIELDS` - column names in declaration order
/// - `FromRecord::from_record` - reads each column with `Record::try_get`
/// - `FieldSource::into_field_set` - the struct's fields as column/value pairs
///
/// # Attributes
///
/// - `#[record(column = "name")]` - Map field to a different column name
/// - `#[record(skip_insert)]` - Read the field from rows but never write it
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
