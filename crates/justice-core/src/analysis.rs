//! Model analysis output and the transient draft built from it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::incident::{Classification, IncidentEntry, Urgency};

/// Jurisdiction-specific guidance attached to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalGuidance {
    pub what_the_law_says: String,
    pub why_it_matters: String,
    pub next_steps: String,
}

/// Structured classification and redaction of one incident narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub classifications: Vec<Classification>,
    pub urgency: Urgency,
    pub redacted_text: String,
    pub legal_guidance: LegalGuidance,
    /// Placeholder key → original value.
    pub placeholders: BTreeMap<String, String>,
    /// The model judged the narrative too vague to classify confidently.
    pub is_vague: bool,
}

/// An analysis awaiting the user's confirmation, paired with the raw text
/// that produced it.
///
/// A draft is never serialised. Converting it into an [`IncidentEntry`]
/// keeps only the redacted text and metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct Draft {
    analysis: AnalysisResult,
    raw: String,
}

impl Draft {
    pub fn new(analysis: AnalysisResult, raw: impl Into<String>) -> Self {
        Self {
            analysis,
            raw: raw.into(),
        }
    }

    pub fn analysis(&self) -> &AnalysisResult {
        &self.analysis
    }

    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    /// Give the raw text back, e.g. to reopen it for editing.
    pub fn into_raw_text(self) -> String {
        self.raw
    }

    /// Promote the draft into a permanent entry. The raw text is dropped.
    pub fn into_entry(self, id: String, timestamp: i64) -> IncidentEntry {
        let AnalysisResult {
            classifications,
            urgency,
            redacted_text,
            legal_guidance,
            placeholders,
            is_vague: _,
        } = self.analysis;

        IncidentEntry {
            id,
            timestamp,
            redacted_content: redacted_text,
            classifications,
            urgency,
            legal_context: legal_guidance.what_the_law_says,
            placeholders,
        }
    }
}

// Raw narratives must not leak into logs through `{:?}`.
impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("analysis", &self.analysis)
            .field("raw_len", &self.raw.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            classifications: vec![Classification::Intimidation],
            urgency: Urgency::Medium,
            redacted_text: "[SUPERVISOR] yelled at me daily".into(),
            legal_guidance: LegalGuidance {
                what_the_law_says: "The Employment Act protects you.".into(),
                why_it_matters: "Repeated conduct forms a pattern.".into(),
                next_steps: "Keep dated notes.".into(),
            },
            placeholders: BTreeMap::from([("[SUPERVISOR]".into(), "Mr. Otieno".into())]),
            is_vague: false,
        }
    }

    #[test]
    fn into_entry_keeps_redacted_text_verbatim() {
        let draft = Draft::new(analysis(), "Mr. Otieno yelled at me daily");
        let entry = draft.into_entry("42".into(), 42);
        assert_eq!(entry.redacted_content, "[SUPERVISOR] yelled at me daily");
        assert_eq!(entry.legal_context, "The Employment Act protects you.");
        assert_eq!(entry.classifications, vec![Classification::Intimidation]);
        assert_eq!(entry.urgency, Urgency::Medium);
        assert_eq!(entry.timestamp, 42);
    }

    #[test]
    fn into_entry_drops_raw_text() {
        let draft = Draft::new(analysis(), "a very identifying raw sentence");
        let entry = draft.into_entry("1".into(), 1);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("a very identifying raw sentence"));
    }

    #[test]
    fn debug_hides_raw_text() {
        let draft = Draft::new(analysis(), "secret narrative");
        let dbg = format!("{draft:?}");
        assert!(!dbg.contains("secret narrative"));
        assert!(dbg.contains("raw_len"));
    }
}
