//! docquery-cli library root.
//!
//! Re-exports the session, settings and local file modules so integration
//! tests can drive the document flows without going through the terminal.

pub mod config;
pub mod local_files;
pub mod session;
