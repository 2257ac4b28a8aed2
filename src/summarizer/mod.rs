//! LLM summarization
//!
//! Turns aggregated activity into a structured recap draft via a chat
//! completion, and a confirmed recap into a short first-person standup
//! script. Draft output is coerced field by field: a missing or non-string
//! field becomes an empty string so the draft shape is always stable, and
//! only a completely unreadable completion is an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::models::daily_recap;

/// Summarizer specific errors
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Completion request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unreadable completion: {0}")]
    MalformedCompletion(String),
}

/// A structured recap draft produced from activity context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecapDraft {
    pub progress: String,
    pub blockers: String,
    pub plan: String,
}

const DRAFT_INSTRUCTION: &str = "You are an assistant that writes concise daily standup recaps. \
Given a developer's recent activity, respond with a JSON object containing exactly three string \
fields: \"progress\" (what was accomplished), \"blockers\" (impediments, or an empty string if \
none), and \"plan\" (likely next steps). Keep each field to one or two sentences.";

const SCRIPT_INSTRUCTION: &str = "You are an assistant that turns a written standup recap into a \
short first-person script the author could read aloud in a standup meeting. Respond with plain \
text only, three to five sentences, no headings or bullet points.";

/// Chat-completion client for recap drafting.
#[derive(Debug, Clone)]
pub struct Summarizer {
    api_base: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl Summarizer {
    pub fn new(api_base: String, api_key: String, model: String) -> Self {
        Self {
            api_base,
            api_key,
            model,
            http: reqwest::Client::new(),
        }
    }

    /// Drafts a recap from rendered activity context.
    pub async fn generate(&self, context: &str) -> Result<RecapDraft, SummarizerError> {
        let content = self
            .complete(DRAFT_INSTRUCTION, context, true)
            .await?;
        let draft = coerce_draft(&content)?;
        debug!("generated recap draft");
        Ok(draft)
    }

    /// Writes a first-person standup script from a confirmed recap.
    pub async fn generate_script(&self, recap: &daily_recap::Model) -> Result<String, SummarizerError> {
        let mut prompt = format!(
            "Progress: {}\nBlockers: {}\nPlan: {}",
            recap.progress, recap.blockers, recap.plan
        );
        if let Some(ref notes) = recap.notes {
            if !notes.is_empty() {
                prompt.push_str(&format!("\nNotes: {}", notes));
            }
        }
        let script = self.complete(SCRIPT_INSTRUCTION, &prompt, false).await?;
        Ok(script.trim().to_string())
    }

    async fn complete(
        &self,
        instruction: &str,
        input: &str,
        json_output: bool,
    ) -> Result<String, SummarizerError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": instruction},
                {"role": "user", "content": input}
            ],
            "temperature": 0.3,
        });
        if json_output {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SummarizerError::ApiError { status, message });
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SummarizerError::MalformedCompletion("no choices returned".to_string()))
    }
}

/// Parses a draft completion, coercing each expected field to a string.
/// Missing or non-string fields become empty strings; a payload that is
/// not a JSON object at all is an error.
fn coerce_draft(content: &str) -> Result<RecapDraft, SummarizerError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| SummarizerError::MalformedCompletion(e.to_string()))?;
    if !value.is_object() {
        return Err(SummarizerError::MalformedCompletion(
            "completion is not a JSON object".to_string(),
        ));
    }

    let field = |name: &str| -> String {
        match value.get(name).and_then(|v| v.as_str()) {
            Some(s) => s.to_string(),
            None => {
                warn!(field = name, "draft field missing or not a string, coercing to empty");
                String::new()
            }
        }
    };

    Ok(RecapDraft {
        progress: field("progress"),
        blockers: field("blockers"),
        plan: field("plan"),
    })
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summarizer(server: &MockServer) -> Summarizer {
        Summarizer::new(server.uri(), "sk-test".to_string(), "gpt-4o-mini".to_string())
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn well_formed_completion_becomes_a_draft() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"progress": "Shipped the retry fix", "blockers": "", "plan": "Start on pagination"}"#,
            )))
            .mount(&server)
            .await;

        let draft = summarizer(&server).generate("Recent commits:\n- fix").await.unwrap();
        assert_eq!(draft.progress, "Shipped the retry fix");
        assert_eq!(draft.blockers, "");
        assert_eq!(draft.plan, "Start on pagination");
    }

    #[tokio::test]
    async fn missing_and_wrongly_typed_fields_coerce_to_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                r#"{"progress": "Did things", "blockers": ["not", "a", "string"]}"#,
            )))
            .mount(&server)
            .await;

        let draft = summarizer(&server).generate("context").await.unwrap();
        assert_eq!(draft.progress, "Did things");
        assert_eq!(draft.blockers, "");
        assert_eq!(draft.plan, "");
    }

    #[tokio::test]
    async fn non_json_completion_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "Sorry, I cannot help with that.",
            )))
            .mount(&server)
            .await;

        let err = summarizer(&server).generate("context").await.unwrap_err();
        assert!(matches!(err, SummarizerError::MalformedCompletion(_)));
    }

    #[tokio::test]
    async fn upstream_failure_is_an_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = summarizer(&server).generate("context").await.unwrap_err();
        match err {
            SummarizerError::ApiError { status, .. } => assert_eq!(status, 429),
            other => panic!("unexpected error: {other}"),
        }
    }
}
