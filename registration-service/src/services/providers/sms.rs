use super::{ProviderError, ProviderResponse, SmsMessage, SmsProvider};
use crate::config::SmsConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// SMS gateway accepting `{to, message, sender}` JSON with a bearer API key.
pub struct HttpSmsProvider {
    config: SmsConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    to: &'a str,
    message: &'a str,
    sender: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
}

/// Keep digits and a leading `+`.
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') && !digits.is_empty() {
        format!("+{}", digits)
    } else {
        digits
    }
}

impl HttpSmsProvider {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SmsProvider for HttpSmsProvider {
    async fn send(&self, sms: &SmsMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "HTTP SMS provider is not enabled".to_string(),
            ));
        }

        let normalized_phone = normalize_phone(&sms.to);
        if normalized_phone.is_empty() {
            return Err(ProviderError::InvalidRecipient(
                "Phone number is empty".to_string(),
            ));
        }

        let request = GatewayRequest {
            to: &normalized_phone,
            message: &sms.body,
            sender: &self.config.sender_id,
        };

        let response = self
            .client
            .traced_post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .timeout(Duration::from_secs(10))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to SMS gateway: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::SendFailed(format!(
                "SMS gateway returned error status {}: {}",
                status, body
            )));
        }

        let provider_id = response
            .json::<GatewayResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id.or(r.id));

        tracing::info!(to = %normalized_phone, "SMS sent via gateway");

        Ok(ProviderResponse::success(provider_id))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if !self.config.enabled {
            return Ok(());
        }

        if self.config.api_url.is_empty() {
            return Err(ProviderError::Configuration(
                "SMS_API_URL is not configured".to_string(),
            ));
        }

        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::Configuration(
                "SMS_API_KEY is not configured".to_string(),
            ));
        }

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock SMS provider for testing
pub struct MockSmsProvider {
    enabled: bool,
    send_count: AtomicU64,
}

impl MockSmsProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            send_count: AtomicU64::new(0),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmsProvider for MockSmsProvider {
    async fn send(&self, sms: &SmsMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock SMS provider is not enabled".to_string(),
            ));
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            to = %sms.to,
            body_length = %sms.body.len(),
            "[MOCK] SMS would be sent"
        );

        Ok(ProviderResponse::success(Some(format!("mock-sms-{}", count))))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: String, enabled: bool) -> SmsConfig {
        SmsConfig {
            enabled,
            api_url,
            api_key: Secret::new("gateway-key".to_string()),
            sender_id: "SCHOOL".to_string(),
        }
    }

    #[test]
    fn phone_numbers_keep_digits_and_leading_plus() {
        assert_eq!(normalize_phone("+251 (911) 22-33-44"), "+251911223344");
        assert_eq!(normalize_phone("0911 223 344"), "0911223344");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[tokio::test]
    async fn posts_message_to_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sms"))
            .and(header("authorization", "Bearer gateway-key"))
            .and(body_json(serde_json::json!({
                "to": "+251911223344",
                "message": "Payment received",
                "sender": "SCHOOL"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "msg-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpSmsProvider::new(config(format!("{}/sms", server.uri()), true));
        let response = provider
            .send(&SmsMessage {
                to: "+251 911 223 344".to_string(),
                body: "Payment received".to_string(),
            })
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.provider_id.as_deref(), Some("msg-1"));
    }

    #[tokio::test]
    async fn gateway_errors_are_send_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = HttpSmsProvider::new(config(server.uri(), true));
        let err = provider
            .send(&SmsMessage {
                to: "0911223344".to_string(),
                body: "hello".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::SendFailed(_)));
    }

    #[tokio::test]
    async fn disabled_provider_does_not_send() {
        let provider = HttpSmsProvider::new(config("http://127.0.0.1:9".to_string(), false));
        assert!(!provider.is_enabled());
        assert!(provider.health_check().await.is_ok());

        let err = provider
            .send(&SmsMessage {
                to: "0911223344".to_string(),
                body: "hello".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotEnabled(_)));
    }

    #[tokio::test]
    async fn mock_counts_sends() {
        let provider = MockSmsProvider::new(true);
        provider
            .send(&SmsMessage {
                to: "1".to_string(),
                body: "a".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(provider.send_count(), 1);
    }
}
