//! Experiment summary prompt construction
//!
//! Sections are concatenated in a fixed order and the combined text is cut
//! to its last [`MAX_COMBINED_CHARS`] characters to bound model latency.

use serde::{Deserialize, Serialize};

pub const MAX_COMBINED_CHARS: usize = 4000;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an AI assistant that analyzes experiment data \
from multiple sources (Jira, Confluence, Slack, Snowflake, GitHub and additional notes) and \
generates insightful summaries that connect findings across different platforms. \
When an ADDITIONAL NOTES section is provided you must use it. \
Focus on identifying patterns, correlations, and key insights. \
Keep responses concise (2-3 sentences).";

/// Body of `POST /api/experiment/summarize`. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub performance: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub data_sources: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SummaryRequest {
    /// Present sections as (label, text), in prompt order
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("PERFORMANCE DATA", &self.performance),
            ("EXPERIMENT DESCRIPTION", &self.description),
            ("DATA SOURCES", &self.data_sources),
            ("ADDITIONAL NOTES", &self.notes),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(|text| (label, text))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    pub fn has_notes(&self) -> bool {
        self.notes.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// The trailing `max_chars` characters of `text` (never splits a character)
pub fn keep_last_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    text.char_indices()
        .nth(total - max_chars)
        .map(|(idx, _)| &text[idx..])
        .unwrap_or("")
}

/// Labeled sections joined and truncated to the last [`MAX_COMBINED_CHARS`] characters
pub fn combine_sections(request: &SummaryRequest) -> String {
    let mut combined = String::new();
    for (label, text) in request.sections() {
        combined.push_str(label);
        combined.push_str(":\n");
        combined.push_str(text);
        combined.push_str("\n\n");
    }

    let kept = keep_last_chars(&combined, MAX_COMBINED_CHARS);
    if kept.len() < combined.len() {
        log::info!(
            "Experiment text truncated from {} to {} characters",
            combined.chars().count(),
            MAX_COMBINED_CHARS
        );
    }
    kept.to_string()
}

pub fn build_summary_prompt(request: &SummaryRequest) -> String {
    let mut prompt = String::new();

    if request.has_notes() {
        prompt.push_str(
            "You must explicitly reference and incorporate insights from the \"ADDITIONAL NOTES\" section.\n\n",
        );
    }

    prompt.push_str(
        "Based on the following experiment information, generate a concise cross-source insight summary (2-3 sentences)\n\
         that highlights key findings and correlations across sources.\n\n",
    );
    prompt.push_str(&combine_sections(request));
    prompt
}
