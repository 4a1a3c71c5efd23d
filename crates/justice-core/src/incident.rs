//! Persisted incident entries and their classification vocabulary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of workplace injustice an incident was classified as.
///
/// The display strings are the persisted form. Parsing is tolerant because
/// labels come back from a language model: anything unrecognised becomes
/// [`Classification::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Classification {
    SexualHarassment,
    AbuseOfAuthority,
    Discrimination,
    Intimidation,
    Other,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Self::SexualHarassment,
        Self::AbuseOfAuthority,
        Self::Discrimination,
        Self::Intimidation,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SexualHarassment => "Sexual Harassment",
            Self::AbuseOfAuthority => "Abuse of Authority",
            Self::Discrimination => "Discrimination",
            Self::Intimidation => "Intimidation/Bullying",
            Self::Other => "Other",
        }
    }

    /// Map a free-form label onto the closed vocabulary.
    ///
    /// Case, surrounding whitespace, `-`/`_` separators and spacing around
    /// `/` are ignored.
    pub fn from_label(label: &str) -> Self {
        let normalized = label
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ")
            .replace(" / ", "/");

        match normalized.as_str() {
            "sexual harassment" | "harassment" => Self::SexualHarassment,
            "abuse of authority" | "abuse of power" => Self::AbuseOfAuthority,
            "discrimination" => Self::Discrimination,
            "intimidation/bullying" | "intimidation" | "bullying" => Self::Intimidation,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Classification {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<Classification> for &'static str {
    fn from(c: Classification) -> Self {
        c.as_str()
    }
}

/// Drop repeated classifications, keeping the order of first appearance.
pub fn dedup_classifications(items: impl IntoIterator<Item = Classification>) -> Vec<Classification> {
    let mut out: Vec<Classification> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[derive(Debug, Error)]
#[error("unknown urgency level: {0:?}")]
pub struct ParseUrgencyError(pub String);

/// How pressing an incident appears to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ParseUrgencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseUrgencyError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Urgency {
    type Error = ParseUrgencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A confirmed, redacted incident record as stored in the vault.
///
/// There is no raw-text field: the original narrative only
/// ever lives in memory while a draft is under review. Records written by
/// older builds that still carry `rawContent` load fine; the field is
/// dropped on the next write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentEntry {
    pub id: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    pub redacted_content: String,
    pub classifications: Vec<Classification>,
    pub urgency: Urgency,
    pub legal_context: String,
    /// Placeholder key → original value substituted during redaction.
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}
