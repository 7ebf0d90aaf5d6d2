//! Changelog parsing
//!
//! Projects free-text release notes into structured deprecation records.
//! Only literal backtick-delimited tokens are trusted; narrative prose that
//! does not match one of the fixed templates is skipped.

pub mod parser;
pub mod document;

pub use parser::{ChangelogParser, ParseStats};
pub use document::{split_releases, ReleaseSection};
