use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion returned empty content")]
    EmptyContent,
}

/// Outbound language-model completion call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiCompletionClient {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.3
        });

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.timeout)
                } else {
                    CompletionError::Http(e)
                }
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, message });
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .ok_or(CompletionError::EmptyContent)
    }
}

/// Pulls the first top-level JSON object out of free-form model output,
/// tolerating code fences and prose around it.
pub fn extract_json_object(text: &str) -> Option<JsonValue> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (idx, &b) in bytes.iter().enumerate().skip(open) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Ok(value @ JsonValue::Object(_)) =
                            serde_json::from_str::<JsonValue>(&text[open..=idx])
                        {
                            return Some(value);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
        start = open + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_fenced_output() {
        let raw = "Here you go:\n```json\n{\"fitScore\": 71, \"notes\": \"uses {braces}\"}\n```";
        let value = extract_json_object(raw).expect("object");
        assert_eq!(value["fitScore"], 71);
        assert_eq!(value["notes"], "uses {braces}");
    }

    #[test]
    fn skips_broken_candidates() {
        let raw = "{not json} then {\"ok\": true}";
        let value = extract_json_object(raw).expect("object");
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn returns_none_without_object() {
        assert!(extract_json_object("no structured output here").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }
}
