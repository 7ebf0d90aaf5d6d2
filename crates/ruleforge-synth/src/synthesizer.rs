//! Deprecation record -> Draft dynamic rule

use chrono::{DateTime, Utc};
use regex::Regex;
use ruleforge_core::config::SynthesisConfig;
use ruleforge_core::{ChangeCategory, DeprecationRecord, DynamicRule, ReviewStatus, RuleSeverity};

use crate::ids::{slug, IdRegistry};
use crate::pattern::build_pattern;

/// Why a record did not become a rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("Deprecated token is empty (release {release})")]
    EmptyToken { release: String },

    #[error("Record for '{token}' has no source release")]
    MissingRelease { token: String },

    #[error("Pattern for '{token}' does not compile: {reason}")]
    InvalidPattern { token: String, pattern: String, reason: String },

    #[error("Token '{token}' has no alphanumeric characters to build an id from")]
    EmptySlug { token: String },

    #[error("No free id for '{token}': '{base_id}' and all its suffixes are taken")]
    IdCollision { token: String, base_id: String },
}

impl SynthesisError {
    /// The deprecated token the failed record carried
    pub fn token(&self) -> &str {
        match self {
            Self::EmptyToken { .. } => "",
            Self::MissingRelease { token }
            | Self::EmptySlug { token }
            | Self::InvalidPattern { token, .. }
            | Self::IdCollision { token, .. } => token,
        }
    }
}

/// Converts deprecation records into candidate rules
#[derive(Debug, Clone)]
pub struct PatternSynthesizer {
    legacy_prefixes: Vec<String>,
    max_id_suffix: u32,
}

impl PatternSynthesizer {
    pub fn new(legacy_prefixes: Vec<String>, max_id_suffix: u32) -> Self {
        Self {
            legacy_prefixes,
            max_id_suffix,
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self::new(config.legacy_prefixes.clone(), config.max_id_suffix)
    }

    /// An empty id registry sized for this synthesizer
    pub fn registry(&self) -> IdRegistry {
        IdRegistry::new(self.max_id_suffix)
    }

    /// Synthesize one rule, stamped with the current time
    pub fn synthesize(
        &self,
        record: &DeprecationRecord,
        registry: &mut IdRegistry,
    ) -> Result<DynamicRule, SynthesisError> {
        self.synthesize_at(record, registry, Utc::now())
    }

    /// Synthesize one rule with an explicit generation time
    pub fn synthesize_at(
        &self,
        record: &DeprecationRecord,
        registry: &mut IdRegistry,
        generated_at: DateTime<Utc>,
    ) -> Result<DynamicRule, SynthesisError> {
        let token = record.deprecated_api.trim();
        let release = record.source_release.trim();

        if token.is_empty() {
            return Err(SynthesisError::EmptyToken {
                release: release.to_string(),
            });
        }
        if release.is_empty() {
            return Err(SynthesisError::MissingRelease {
                token: token.to_string(),
            });
        }

        let (shape, pattern) = build_pattern(token, &self.legacy_prefixes);
        if let Err(e) = Regex::new(&pattern) {
            return Err(SynthesisError::InvalidPattern {
                token: token.to_string(),
                pattern,
                reason: e.to_string(),
            });
        }

        let token_slug = slug(token);
        if token_slug.is_empty() {
            return Err(SynthesisError::EmptySlug {
                token: token.to_string(),
            });
        }
        let base_id = format!("auto-{}-{}", token_slug, release);
        let id = registry
            .claim(&base_id, token, record.category)
            .ok_or_else(|| SynthesisError::IdCollision {
                token: token.to_string(),
                base_id: base_id.clone(),
            })?;

        let replacement = record.replacement_api.as_deref().map(str::trim).filter(|r| !r.is_empty());

        tracing::debug!(rule_id = %id, token, ?shape, %pattern, "synthesized rule");

        Ok(DynamicRule {
            id,
            deprecated_api: token.to_string(),
            category: record.category,
            pattern,
            description: describe(token, replacement, record.category, release),
            severity: RuleSeverity::for_category(record.category),
            fix_suggestion: replacement.map(|r| format!("Replace '{}' with '{}'", token, r)),
            correction_id: None,
            source_release: release.to_string(),
            review_status: ReviewStatus::Draft,
            generated_at,
        })
    }
}

impl Default for PatternSynthesizer {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default())
    }
}

/// One sentence naming the change and, when known, the replacement
fn describe(token: &str, replacement: Option<&str>, category: ChangeCategory, release: &str) -> String {
    match (category, replacement) {
        (ChangeCategory::Renamed, Some(new)) => {
            format!("'{}' has been renamed to '{}' in release {}.", token, new, release)
        }
        (ChangeCategory::Renamed, None) => format!("'{}' has been renamed in release {}.", token, release),
        (ChangeCategory::Removed, _) => format!("'{}' was removed in release {}.", token, release),
        (ChangeCategory::Changed, Some(new)) => {
            format!("'{}' is deprecated in favor of '{}' as of release {}.", token, new, release)
        }
        (ChangeCategory::Changed, None) => format!("'{}' is deprecated as of release {}.", token, release),
    }
}
