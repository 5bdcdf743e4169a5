use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::SkillExtraction;

const SYSTEM_PROMPT: &str = r#"Extract technical and soft skills from the resume. Return ONLY a JSON object with no additional text, exactly like this:
{
    "skills": [
        {"type": "technical", "name": "Python"},
        {"type": "technical", "name": "JavaScript"},
        {"type": "soft", "name": "Leadership"}
    ]
}"#;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the chat-completion endpoint, passed in at
/// construction time instead of read from process-wide state.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub api_endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("inference response contained no choices")]
    EmptyChoices,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for the external skill-extraction inference service. One POST per
/// resume; 429 and 5xx responses are retried with exponential backoff, any
/// other non-success status is a hard failure for that document only.
pub struct SkillClient {
    client: Client,
    config: InferenceConfig,
}

impl SkillClient {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn extract_skills(&self, resume_text: &str) -> Result<SkillExtraction, InferenceError> {
        let content = self.complete(resume_text)?;
        Ok(parse_skill_payload(&content))
    }

    fn complete(&self, resume_text: &str) -> Result<String, InferenceError> {
        let request_body = ChatRequest {
            model: &self.config.model_id,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: resume_text,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut last_error: Option<InferenceError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying inference call"
                );
                thread::sleep(delay);
            }

            let response = self
                .client
                .post(&self.config.api_endpoint)
                .bearer_auth(&self.config.api_key)
                .json(&request_body)
                .send();

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    last_error = Some(InferenceError::Transport(err));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().unwrap_or_default();
                warn!(status = status.as_u16(), "inference API throttled or failing");
                last_error = Some(InferenceError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                let message = response.text().unwrap_or_default();
                return Err(InferenceError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat_response: ChatResponse = response.json()?;
            let Some(choice) = chat_response.choices.into_iter().next() else {
                return Err(InferenceError::EmptyChoices);
            };

            debug!("inference call succeeded");
            return Ok(choice.message.content);
        }

        Err(last_error.unwrap_or(InferenceError::EmptyChoices))
    }
}

/// Recovers the structured skill list from a model reply that may wrap the
/// JSON object in extraneous prose. A reply that still fails to parse, or
/// that carries no `skills` entries, degrades to an empty skill list.
pub fn parse_skill_payload(content: &str) -> SkillExtraction {
    let Some(json) = slice_json_object(content) else {
        warn!("inference reply contained no JSON object");
        return SkillExtraction::default();
    };

    match serde_json::from_str::<SkillExtraction>(json) {
        Ok(extraction) => {
            if extraction.skills.is_empty() {
                warn!("inference reply contained no skills");
            }
            extraction
        }
        Err(err) => {
            warn!(error = %err, "failed to parse inference reply as skill list");
            SkillExtraction::default()
        }
    }
}

/// Slices the substring between the first `{` and the last `}`.
fn slice_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_json_object_out_of_surrounding_prose() {
        let reply = "Sure! Here are the skills:\n{\"skills\": []}\nLet me know.";
        assert_eq!(slice_json_object(reply), Some("{\"skills\": []}"));
    }

    #[test]
    fn slice_returns_none_without_braces() {
        assert_eq!(slice_json_object("no json here"), None);
        assert_eq!(slice_json_object("} backwards {"), None);
    }

    #[test]
    fn parses_wrapped_skill_payload() {
        let reply = r#"Here is the result:
{"skills": [{"type": "technical", "name": "Python"}, {"type": "soft", "name": "Leadership"}]}
Hope that helps!"#;

        let extraction = parse_skill_payload(reply);
        assert_eq!(extraction.skills.len(), 2);
        assert_eq!(extraction.skills[0].skill_type, "technical");
        assert_eq!(extraction.skills[0].name, "Python");
        assert_eq!(extraction.skills[1].skill_type, "soft");
    }

    #[test]
    fn missing_skills_key_degrades_to_empty_list() {
        let extraction = parse_skill_payload(r#"{"message": "no skills field"}"#);
        assert!(extraction.skills.is_empty());
    }

    #[test]
    fn malformed_json_degrades_to_empty_list() {
        let extraction = parse_skill_payload(r#"{"skills": [{"type": "technical""#);
        assert!(extraction.skills.is_empty());

        let extraction = parse_skill_payload("plain prose without an object");
        assert!(extraction.skills.is_empty());
    }

    #[test]
    fn chat_response_shape_deserializes() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"skills\": []}"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;

        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "{\"skills\": []}");
    }
}
