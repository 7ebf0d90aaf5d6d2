//! Ruleforge Core
//!
//! Core domain model with stable, versioned types.
//! Never rename rule ids - they are part of the public API.

pub mod record;
pub mod rule;
pub mod knowledge;
pub mod finding;
pub mod report;
pub mod catalog;
pub mod config;

pub use record::{ChangeCategory, DeprecationRecord};
pub use rule::{DynamicRule, ReviewDecision, ReviewStatus, Rule, RuleOrigin, RuleSeverity, StaticRule};
pub use knowledge::{Confidence, KnowledgeEntry};
pub use finding::{CheckResult, Correction, Finding};
pub use report::{FileReport, Report, ReportSummary, ReportVersion};
pub use catalog::{Catalog, CatalogError};
pub use config::{Config, ConfigError};
