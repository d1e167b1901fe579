//! Statement builders.
//!
//! Each builder turns a table name, a [`FieldSet`](crate::FieldSet) and the
//! operation's options into a [`Statement`](crate::Statement):
//!
//! - INSERT and UPDATE use named placeholders for the written fields, so the
//!   same statement can be executed with any field set of the same shape.
//! - Filter values are bound directly.
//! - Every error is raised here, before a session is opened.

mod find;
mod insert;
mod update;

pub use find::build_find;
pub use insert::{build_insert, build_insert_batch};
pub use update::build_update;
