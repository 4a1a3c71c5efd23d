//! Structured incident analysis: prompt, response schema, and payload parsing.

use std::collections::BTreeMap;

use justice_core::law::Statute;
use justice_core::{
    AnalysisResult, Classification, LegalGuidance, Urgency, dedup_classifications,
};
use serde::Deserialize;
use serde_json::json;

use crate::AiError;
use crate::wire::{Content, GenerateContentRequest, GenerationConfig};

const ANALYSIS_TEMPERATURE: f32 = 0.1;

const ANALYSIS_GUIDELINES: &str = "\
Analyze this Kenyan workplace incident report.
Guidelines: Assume vulnerability. Redact names/roles, replacing each with a bracketed placeholder \
such as [PERSON_1] or [EMPLOYER], and list every placeholder with the original value it replaced. \
Provide legal context (Employment Act, Constitution). Be tentative and supportive.
Classify using only these labels: Sexual Harassment, Abuse of Authority, Discrimination, \
Intimidation/Bullying, Other.
Urgency must be one of: high, medium, low.
Set isVague to true when the report lacks enough concrete detail to classify with confidence.";

/// Build the full analysis prompt for a raw narrative.
pub fn build_prompt(text: &str) -> String {
    let context: Vec<&str> = Statute::ALL.iter().map(|s| s.summary()).collect();
    format!(
        "{ANALYSIS_GUIDELINES}\nReference context:\n- {context}\nInput: \"{text}\"",
        context = context.join("\n- "),
    )
}

/// Response schema constraining the model's JSON output.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "classifications": { "type": "ARRAY", "items": { "type": "STRING" } },
            "urgency": { "type": "STRING" },
            "redactedText": { "type": "STRING" },
            "legalGuidance": {
                "type": "OBJECT",
                "properties": {
                    "whatTheLawSays": { "type": "STRING" },
                    "whyItMatters": { "type": "STRING" },
                    "nextSteps": { "type": "STRING" }
                },
                "required": ["whatTheLawSays", "whyItMatters", "nextSteps"]
            },
            "placeholdersList": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "key": { "type": "STRING" },
                        "value": { "type": "STRING" }
                    },
                    "required": ["key", "value"]
                }
            },
            "isVague": { "type": "BOOLEAN" }
        },
        "required": [
            "classifications", "urgency", "redactedText",
            "legalGuidance", "placeholdersList", "isVague"
        ]
    })
}

pub fn build_request(text: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(Some("user"), build_prompt(text))],
        system_instruction: None,
        generation_config: GenerationConfig {
            temperature: ANALYSIS_TEMPERATURE,
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(response_schema()),
        },
    }
}

#[derive(Deserialize)]
struct PlaceholderPair {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisPayload {
    classifications: Vec<Classification>,
    urgency: Urgency,
    redacted_text: String,
    legal_guidance: LegalGuidance,
    placeholders_list: Vec<PlaceholderPair>,
    is_vague: bool,
}

impl From<AnalysisPayload> for AnalysisResult {
    fn from(p: AnalysisPayload) -> Self {
        // Later duplicates win.
        let placeholders: BTreeMap<String, String> = p
            .placeholders_list
            .into_iter()
            .map(|pair| (pair.key, pair.value))
            .collect();

        AnalysisResult {
            classifications: dedup_classifications(p.classifications),
            urgency: p.urgency,
            redacted_text: p.redacted_text,
            legal_guidance: p.legal_guidance,
            placeholders,
            is_vague: p.is_vague,
        }
    }
}

/// Strip a surrounding Markdown code fence, if the model added one anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the model's JSON text into an [`AnalysisResult`].
///
/// Every field is required; a missing field, an unknown urgency, or
/// malformed JSON is an error.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AiError> {
    let payload: AnalysisPayload = serde_json::from_str(strip_code_fence(text))?;
    Ok(payload.into())
}
