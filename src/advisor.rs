//! Folder suggestion advisor backed by the Gemini text-completion API.
//!
//! The reply contract is deliberately loose: the completion text is returned
//! verbatim, with no validation that it names a known folder id and no retry.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::catalog::Folder;
use crate::config;
use crate::error::AdvisorError;

/// Default Gemini API endpoint.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Timeout for the completion call (seconds).
pub const ADVISOR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct Advisor {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl Advisor {
    pub fn new(cfg: &config::Advisor) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(ADVISOR_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_GEMINI_URL.to_string(),
            model: cfg.gemini_model.clone(),
            api_key: cfg.gemini_api_key.clone(),
        })
    }

    /// Asks the completion service to pick a folder for `url` and returns the
    /// raw reply text, ideally a bare folder id.
    pub async fn suggest(&self, url: &str, folders: &[Folder]) -> Result<String, AdvisorError> {
        let api_key = self.api_key.as_deref().ok_or(AdvisorError::NotConfigured)?;

        let request = GenerateRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: render_instruction(folders),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: url.to_string(),
                }],
            }],
        };

        let endpoint = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        let resp = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AdvisorError::Unavailable(format!(
                "completion service returned status {}",
                resp.status()
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AdvisorError::Unavailable(e.to_string()))?;

        parse_completion(body)
    }
}

fn parse_completion(body: GenerateResponse) -> Result<String, AdvisorError> {
    body.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or(AdvisorError::MalformedResponse)
}

/// Renders the current folder forest into the system instruction.
fn render_instruction(folders: &[Folder]) -> String {
    let mut instruction = String::from(
        "You sort bookmarks into folders. These folders exist (id, name, parent folder id):\n",
    );
    for folder in folders {
        let parent = folder
            .parent_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        instruction.push_str(&format!(
            "- id {}: \"{}\" (parent: {})\n",
            folder.id, folder.name, parent
        ));
    }
    instruction.push_str(
        "Reply with the id of the folder that best fits the URL the user sends. \
         Reply with the bare folder id only: no markdown, no quotes, no explanation.",
    );
    instruction
}
