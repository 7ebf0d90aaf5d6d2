//! Pattern synthesis
//!
//! Turns deprecation records into Draft dynamic rules:
//! - pattern construction from the deprecated token
//! - stable `auto-{slug}-{release}` ids with collision suffixes
//! - severity, description and fix suggestion

pub mod pattern;
pub mod ids;
pub mod synthesizer;

pub use pattern::{build_pattern, PatternShape};
pub use ids::{slug, IdRegistry};
pub use synthesizer::{PatternSynthesizer, SynthesisError};
