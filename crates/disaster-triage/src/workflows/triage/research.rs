//! Boundary to the external research collaborator.
//!
//! Search and generation happen elsewhere; this module only describes what is
//! asked for and what comes back.

use super::rubric::Rubric;
use serde::{Deserialize, Serialize};

/// News and humanitarian domains offered for source targeting.
pub const DEFAULT_TARGET_SOURCES: [&str; 12] = [
    "reliefweb.int",
    "unocha.org",
    "bbc.com",
    "reuters.com",
    "aljazeera.com",
    "news.un.org",
    "cnn.com",
    "euronews.com",
    "apnews.com",
    "adaderana.lk",
    "dailymirror.lk",
    "newsfirst.lk",
];

/// How many of [`DEFAULT_TARGET_SOURCES`] are selected when nothing is configured.
pub const DEFAULT_SELECTION: usize = 6;

pub fn default_target_sources() -> Vec<String> {
    DEFAULT_TARGET_SOURCES[..DEFAULT_SELECTION]
        .iter()
        .map(|domain| domain.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    /// Empty means "use the service's configured defaults".
    #[serde(default)]
    pub target_sources: Vec<String>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            target_sources: default_target_sources(),
        }
    }

    pub fn with_target_sources(mut self, sources: Vec<String>) -> Self {
        self.target_sources = sources;
        self
    }

    /// Append a domain unless it is blank or already selected.
    pub fn with_custom_source(mut self, domain: &str) -> Self {
        let domain = domain.trim();
        if !domain.is_empty() && !self.target_sources.iter().any(|known| known == domain) {
            self.target_sources.push(domain.to_string());
        }
        self
    }

    /// Full instruction text for one research run.
    pub fn prompt(&self, rubric: &Rubric) -> String {
        let mut prompt = String::new();
        prompt.push_str(
            "You are the lead researcher for a disaster assessment unit. Populate the \
             disaster matrix with exact data and scores.\n\n",
        );
        prompt.push_str("### 1. SEARCH PROTOCOL\n");
        prompt.push_str(
            "- Search the target sources for current reports.\n\
             - Use real-world reports only. If nothing is found after a thorough search, \
             reply \"No data found\".\n\n",
        );
        prompt.push_str("### 2. KEY FIGURES\n");
        prompt.push_str(
            "For affected, fatalities, displaced and in_need report the value (e.g. \"1,200\"), \
             the report date, the publisher and the direct URL.\n\n",
        );
        prompt.push_str("### 3. SCORING RUBRIC\n");
        prompt.push_str(
            "Use the full 1-5 range. Scores 2 and 4 are allowed when the data sits between \
             two levels.\n",
        );
        prompt.push_str(&rubric.scoring_guide());
        prompt.push_str("\n### 4. QUALITATIVE INFERENCE\n");
        prompt.push_str(
            "If exact numbers are missing, score from the severity of the reporting \
             (\"catastrophic\" = 5). Do not default to 3.\n\n",
        );
        prompt.push_str("### 5. OUTPUT FORMAT\n");
        prompt.push_str(
            "Return one JSON object, without markdown fences, comments or ellipses, shaped as:\n",
        );
        prompt.push_str(&output_shape(rubric));
        prompt.push_str(&format!("\n\nUSER QUERY: {}\n", self.query));
        prompt.push_str(&format!(
            "TARGET SOURCES: {}\n",
            self.target_sources.join(", ")
        ));
        prompt.push_str(
            "INSTRUCTION: Find the latest data. Use descriptive text to infer scores if numbers \
             are missing.",
        );
        prompt
    }
}

fn output_shape(rubric: &Rubric) -> String {
    let figure = r#"{"value": "", "date": "", "source": "", "url": ""}"#;
    let score = r#"{"score": 1, "extracted_value": "", "justification": "", "source_urls": [""]}"#;

    let mut shape = String::from("{\n");
    shape.push_str(
        "  \"summary\": {\"title\": \"\", \"country\": \"\", \"date\": \"\", \"description\": \"\"},\n",
    );
    shape.push_str("  \"key_figures\": {\n");
    for (idx, name) in ["affected", "fatalities", "displaced", "in_need"]
        .iter()
        .enumerate()
    {
        let separator = if idx == 3 { "" } else { "," };
        shape.push_str(&format!("    \"{name}\": {figure}{separator}\n"));
    }
    shape.push_str("  },\n  \"scores\": {\n");
    let count = rubric.indicator_count();
    for (idx, id) in rubric.identifiers().enumerate() {
        let separator = if idx + 1 == count { "" } else { "," };
        shape.push_str(&format!("    \"{id}\": {score}{separator}\n"));
    }
    shape.push_str("  }\n}");
    shape
}

/// What a collaborator hands back: free-form text plus the URLs its search
/// was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub grounding_urls: Vec<String>,
}

impl CollaboratorResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            grounding_urls: Vec::new(),
        }
    }

    pub fn with_grounding_urls(mut self, urls: Vec<String>) -> Self {
        self.grounding_urls = urls;
        self
    }
}

/// Seam for whatever backend performs search-grounded generation.
pub trait ResearchCollaborator: Send + Sync {
    fn research(&self, request: &ResearchRequest)
        -> Result<CollaboratorResponse, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator transport failed: {0}")]
    Transport(String),
    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}
