pub mod apk;
pub mod cli;
pub mod dex;
pub mod errors;
pub mod flags;
pub mod manifest;
pub mod pattern;
pub mod query;
pub mod scan;

pub use apk::{Apk, DexEntry};
pub use errors::QueryError;
