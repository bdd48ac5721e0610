//! docquery-core
//!
//! Pure domain types and store-name conventions.
//! No HTTP dependency: this is the shared vocabulary of the docquery system.

pub mod error;
pub mod models;
pub mod store_names;
