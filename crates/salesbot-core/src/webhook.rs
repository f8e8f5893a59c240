//! Client for the externally hosted workflow webhook
//!
//! One POST per user turn: `{"message": <text>}` out, a JSON object with a
//! `response` or `text` field back. [`WebhookClient::reply`] folds every
//! failure into user-visible text so callers never see an error.

use std::fmt::Display;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::WebhookError;

/// Sentinel left in unedited configurations
pub const PLACEHOLDER_WEBHOOK_URL: &str = "YOUR_N8N_WEBHOOK_URL_HERE";

pub const CONFIGURATION_ERROR_TEXT: &str = "Error: Please configure your workflow webhook URL.";

/// Reply used when the workflow answers without a usable field
pub const FALLBACK_REPLY_TEXT: &str =
    "I'm sorry, I couldn't get a clear response from the workflow.";

const REPLY_FIELDS: [&str; 2] = ["response", "text"];

#[derive(Serialize)]
struct WebhookRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    endpoint: Option<String>,
    reply_delay: Duration,
}

impl WebhookClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            reply_delay: Duration::ZERO,
        }
    }

    /// Pause applied after validation and before the POST
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Validate the configured endpoint.
    pub fn endpoint(&self) -> Result<Url, WebhookError> {
        let raw = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::NotConfigured)?;

        if raw == PLACEHOLDER_WEBHOOK_URL {
            return Err(WebhookError::Placeholder(raw.to_string()));
        }

        let url = Url::parse(raw).map_err(|e| WebhookError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(WebhookError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {other:?}"),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint().is_ok()
    }

    /// Send one message to the workflow and return its reply text.
    pub async fn query(&self, message: &str) -> Result<String, WebhookError> {
        let url = self.endpoint()?;

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }

        debug!(host = url.host_str().unwrap_or_default(), "posting message to workflow");

        let response = self
            .client
            .post(url)
            .json(&WebhookRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status));
        }

        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)?;
        Ok(extract_reply(&value))
    }

    /// Like [`query`](Self::query), but every failure becomes the bot text
    /// the user should see.
    pub async fn reply(&self, message: &str) -> String {
        match self.query(message).await {
            Ok(text) => {
                info!(chars = text.chars().count(), "workflow replied");
                text
            }
            Err(err) if err.is_configuration() => {
                warn!(error = %err, "webhook URL is not configured");
                CONFIGURATION_ERROR_TEXT.to_string()
            }
            Err(err) => {
                error!(error = %err, "error fetching reply from workflow");
                connection_error_text(&err)
            }
        }
    }
}

/// Pull the reply out of a workflow response body.
///
/// Takes the first non-empty string among `response` then `text`. A top-level
/// array is read through its first element.
pub fn extract_reply(body: &Value) -> String {
    let body = match body {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return FALLBACK_REPLY_TEXT.to_string(),
        },
        other => other,
    };

    REPLY_FIELDS
        .iter()
        .find_map(|field| {
            body.get(field)
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
        })
        .unwrap_or(FALLBACK_REPLY_TEXT)
        .to_string()
}

pub fn connection_error_text(detail: impl Display) -> String {
    format!("There was an error connecting to the workflow: {detail}. Please check your setup.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WebhookClient {
        WebhookClient::new(Some(format!("{}/webhook/sales", server.uri())))
    }

    async fn mount_reply(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/webhook/sales"))
            .respond_with(template)
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_unset_endpoint_is_configuration_error() {
        let client = WebhookClient::new(None);
        assert!(matches!(client.endpoint(), Err(WebhookError::NotConfigured)));

        let blank = WebhookClient::new(Some("   ".to_string()));
        assert!(matches!(blank.endpoint(), Err(WebhookError::NotConfigured)));
    }

    #[test]
    fn test_placeholder_and_bad_urls_rejected() {
        let placeholder = WebhookClient::new(Some(PLACEHOLDER_WEBHOOK_URL.to_string()));
        assert!(matches!(placeholder.endpoint(), Err(WebhookError::Placeholder(_))));

        let relative = WebhookClient::new(Some("webhook/abc".to_string()));
        assert!(matches!(relative.endpoint(), Err(WebhookError::InvalidUrl { .. })));

        let ftp = WebhookClient::new(Some("ftp://example.com/hook".to_string()));
        assert!(matches!(ftp.endpoint(), Err(WebhookError::InvalidUrl { .. })));
        assert!(!ftp.is_configured());
    }

    #[test]
    fn test_extract_reply_field_precedence() {
        assert_eq!(extract_reply(&json!({"response": "a", "text": "b"})), "a");
        assert_eq!(extract_reply(&json!({"text": "b"})), "b");
        assert_eq!(extract_reply(&json!({"response": "", "text": "b"})), "b");
        assert_eq!(extract_reply(&json!({"response": 42})), FALLBACK_REPLY_TEXT);
        assert_eq!(extract_reply(&json!({})), FALLBACK_REPLY_TEXT);
        assert_eq!(extract_reply(&json!("plain string")), FALLBACK_REPLY_TEXT);
    }

    #[test]
    fn test_extract_reply_from_item_array() {
        assert_eq!(extract_reply(&json!([{"text": "first"}, {"text": "second"}])), "first");
        assert_eq!(extract_reply(&json!([])), FALLBACK_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_posts_json_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/sales"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"message": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Hi!"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.query("hello").await.unwrap(), "Hi!");
    }

    #[tokio::test]
    async fn test_text_field_fallback() {
        let server = MockServer::start().await;
        mount_reply(&server, ResponseTemplate::new(200).set_body_json(json!({"text": "Hi!"}))).await;

        let client = client_for(&server);
        assert_eq!(client.reply("hello").await, "Hi!");
    }

    #[tokio::test]
    async fn test_empty_object_gives_default_reply() {
        let server = MockServer::start().await;
        mount_reply(&server, ResponseTemplate::new(200).set_body_json(json!({}))).await;

        let client = client_for(&server);
        assert_eq!(client.reply("hello").await, FALLBACK_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.query("hello").await.unwrap_err();
        assert!(matches!(err, WebhookError::Status(s) if s.as_u16() == 500));

        let text = client.reply("hello").await;
        assert_eq!(
            text,
            "There was an error connecting to the workflow: HTTP error! status: 500. Please check your setup."
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.query("hello").await.unwrap_err();
        assert!(matches!(err, WebhookError::MalformedResponse(_)));
        assert!(client
            .reply("hello")
            .await
            .starts_with("There was an error connecting to the workflow: invalid JSON"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Bind then release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WebhookClient::new(Some(format!("http://{addr}/webhook/sales")));
        let err = client.query("hello").await.unwrap_err();
        assert!(matches!(err, WebhookError::Transport(_)));
        assert!(client.reply("hello").await.ends_with(". Please check your setup."));
    }

    #[tokio::test]
    async fn test_unconfigured_reply_text() {
        for endpoint in [None, Some(PLACEHOLDER_WEBHOOK_URL.to_string())] {
            let client = WebhookClient::new(endpoint);
            assert_eq!(client.reply("anything").await, CONFIGURATION_ERROR_TEXT);
        }
    }

    #[tokio::test]
    async fn test_delay_applied_before_post() {
        let server = MockServer::start().await;
        mount_reply(&server, ResponseTemplate::new(200).set_body_json(json!({"response": "ok"}))).await;

        let client = client_for(&server).with_reply_delay(Duration::from_millis(50));
        let started = std::time::Instant::now();
        assert_eq!(client.reply("hello").await, "ok");
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
