//! Ruleforge engine - rule lifecycle orchestration
//!
//! This crate ties the pieces together:
//! - Matching approved rules against source text
//! - Ingestion cycles (parse, synthesize, upsert) with coalescing
//! - The `RuleService` facade used by the CLI and other front ends

pub mod ingest;
pub mod matcher;
pub mod service;

pub use ingest::{IngestOutcome, IngestReport, Ingestor};
pub use matcher::MatchEngine;
pub use service::{RuleService, ServiceError};
