//! Capability tags and optimization strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// A named skill dimension a worker is scored on (0-10).
///
/// Names outside the well-known set parse to [`CapabilityTag::Other`] and are
/// still valid. A worker that does not declare a tag scores 0 for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CapabilityTag {
    CodeGeneration,
    CodeReview,
    Debugging,
    Refactoring,
    Testing,
    Documentation,
    ImageAnalysis,
    ImageGeneration,
    UiDesign,
    ApiDesign,
    DatabaseDesign,
    BrandVoice,
    ContentWriting,
    Reasoning,
    DataAnalysis,
    Research,
    /// Any other tag, by its normalized wire name.
    Other(String),
}

impl CapabilityTag {
    /// Every well-known tag, in declaration order.
    pub const ALL: [CapabilityTag; 16] = [
        Self::CodeGeneration,
        Self::CodeReview,
        Self::Debugging,
        Self::Refactoring,
        Self::Testing,
        Self::Documentation,
        Self::ImageAnalysis,
        Self::ImageGeneration,
        Self::UiDesign,
        Self::ApiDesign,
        Self::DatabaseDesign,
        Self::BrandVoice,
        Self::ContentWriting,
        Self::Reasoning,
        Self::DataAnalysis,
        Self::Research,
    ];

    /// Wire name of the tag (e.g. `CODE_GENERATION`).
    pub fn as_str(&self) -> &str {
        match self {
            Self::CodeGeneration => "CODE_GENERATION",
            Self::CodeReview => "CODE_REVIEW",
            Self::Debugging => "DEBUGGING",
            Self::Refactoring => "REFACTORING",
            Self::Testing => "TESTING",
            Self::Documentation => "DOCUMENTATION",
            Self::ImageAnalysis => "IMAGE_ANALYSIS",
            Self::ImageGeneration => "IMAGE_GENERATION",
            Self::UiDesign => "UI_DESIGN",
            Self::ApiDesign => "API_DESIGN",
            Self::DatabaseDesign => "DATABASE_DESIGN",
            Self::BrandVoice => "BRAND_VOICE",
            Self::ContentWriting => "CONTENT_WRITING",
            Self::Reasoning => "REASONING",
            Self::DataAnalysis => "DATA_ANALYSIS",
            Self::Research => "RESEARCH",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityTag {
    type Err = CoreError;

    /// Accepts the wire name in any case, with `-` or `_` separators.
    /// Unrecognized names become [`CapabilityTag::Other`]; only blank input fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        if normalized.is_empty() {
            return Err(CoreError::InvalidInput(
                "capability tag must not be empty".to_string(),
            ));
        }
        Ok(Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == normalized)
            .unwrap_or_else(|| Self::Other(normalized)))
    }
}

impl TryFrom<String> for CapabilityTag {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CapabilityTag> for String {
    fn from(tag: CapabilityTag) -> Self {
        match tag {
            CapabilityTag::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Scoring modifier trading off quality, speed, or cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationStrategy {
    /// Capability scores only.
    Quality,
    /// Penalize average latency.
    Speed,
    /// Penalize blended per-1k-token cost.
    Cost,
    /// Weighted blend of quality, latency and cost.
    #[default]
    Balanced,
}

impl fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quality => "QUALITY",
            Self::Speed => "SPEED",
            Self::Cost => "COST",
            Self::Balanced => "BALANCED",
        };
        f.write_str(name)
    }
}

impl FromStr for OptimizationStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "speed" => Ok(Self::Speed),
            "cost" => Ok(Self::Cost),
            "balanced" => Ok(Self::Balanced),
            other => Err(CoreError::InvalidInput(format!(
                "unknown optimization strategy '{other}'"
            ))),
        }
    }
}
