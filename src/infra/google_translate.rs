use crate::app::ports::TranslatorPort;
use crate::error::TranslationError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client for the public `translate_a/single` endpoint.
pub struct GoogleTranslateClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslateClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nutrition_etl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslationError::Permanent(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

fn classify_status(status: StatusCode) -> Option<TranslationError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(TranslationError::Transient(format!("HTTP {}", status)))
    } else {
        Some(TranslationError::Permanent(format!("HTTP {}", status)))
    }
}

/// Joins the translated segments found at `body[0][*][0]`.
pub fn parse_response(body: &Value) -> Result<String, TranslationError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Permanent("response has no translation segments".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(TranslationError::Permanent("response has an empty translation".to_string()));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl TranslatorPort for GoogleTranslateClient {
    async fn translate_word(&self, word: &str, target_language: &str) -> Result<String, TranslationError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_language),
                ("dt", "t"),
                ("q", word),
            ])
            .send()
            .await
            .map_err(|e| TranslationError::Transient(e.to_string()))?;

        if let Some(err) = classify_status(resp.status()) {
            return Err(err);
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| TranslationError::Permanent(format!("malformed response: {}", e)))?;
        let translated = parse_response(&body)?;
        debug!("Translated '{}' -> '{}'", word, translated);
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response() {
        let body = json!([[["Κοτόπουλο ", "Chicken ", null, null], ["σάντουιτς", "Sandwich", null]], null, "en"]);
        assert_eq!(parse_response(&body).unwrap(), "Κοτόπουλο σάντουιτς");
    }

    #[test]
    fn test_malformed_response_is_permanent() {
        assert!(matches!(parse_response(&json!({"error": 1})), Err(TranslationError::Permanent(_))));
        assert!(matches!(parse_response(&json!([[]])), Err(TranslationError::Permanent(_))));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).unwrap().is_transient());
        assert!(classify_status(StatusCode::BAD_GATEWAY).unwrap().is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST).unwrap().is_transient());
    }
}
