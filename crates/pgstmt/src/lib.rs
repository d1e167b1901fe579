//! # pgstmt
//!
//! Parameter-safe INSERT, UPDATE and filtered reads for PostgreSQL.
//!
//! ## Features
//!
//! - **Values are always bound**: statement text never contains a caller value;
//!   identifiers are validated and quoted
//! - **Declarative filters**: `{column, operator, value}` predicates compiled to
//!   `WHERE` conditions, `IN` lists expanded to one parameter per element
//! - **Safe defaults**: UPDATE requires a filter unless `all_rows` is set
//! - **One session per call**: acquired, used for one statement or batch,
//!   released on every path
//! - **Typed results**: rows as [`Record`]s or projected through
//!   `#[derive(Record)]`
//!
//! ## Example
//!
//! ```ignore
//! use pgstmt::{FindOptions, InsertOptions, PgClient, Predicate, Record};
//!
//! #[derive(Record)]
//! struct Currency {
//!     id: String,
//!     currency_name: String,
//! }
//!
//! let client = PgClient::from_env().await?;
//!
//! client
//!     .insert(
//!         "currencies",
//!         Currency { id: "EEE".into(), currency_name: "name".into() },
//!         &InsertOptions::new().returning("*"),
//!     )
//!     .await?;
//!
//! let found: Vec<Currency> = client
//!     .find_all_as(
//!         "SELECT * FROM currencies",
//!         &FindOptions::new().filter(vec![
//!             Predicate::in_list("id", ["EEE", "USD"]),
//!             Predicate::is_null("deleted_at"),
//!         ]),
//!     )
//!     .await?;
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod fields;
pub mod filter;
pub mod fragment;
pub mod ident;
pub mod options;
pub mod record;
pub mod value;

pub use client::PgClient;
pub use config::{ClientConfig, ConnectionInfo, ConnectionParams};
pub use cursor::Cursor;
pub use engine::{ConnectionProvider, Executor, PgConnector, PgSession, QueryOutput, Session};
pub use error::{Diagnostic, StmtError, StmtResult};
pub use fields::{FieldSet, FieldSource};
pub use filter::{FilterExpr, FilterValue, Operator, Predicate, compile};
pub use fragment::{BatchStatement, Fragment, Param, Statement, quote_literal};
pub use ident::{Ident, quote_identifier};
pub use options::{Conflict, FindOptions, InsertOptions, Returning, UpdateOptions};
pub use record::{FromRecord, Record};
pub use value::{ConversionError, FromValue, Value};

#[cfg(feature = "derive")]
pub use pgstmt_derive::Record;
