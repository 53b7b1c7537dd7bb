use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use super::{BasePaymentGateway, PaymentInitRequest, PaymentInitResponse, PaymentVerification};

/// Chapa payment gateway client
pub struct ChapaClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct ChapaEnvelope {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ChapaEnvelope {
    fn message_or(&self, default: &str) -> String {
        match &self.message {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    fn data(&self) -> serde_json::Value {
        self.data
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
    }
}

impl ChapaClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    async fn read_envelope(response: reqwest::Response, action: &str) -> Result<ChapaEnvelope> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %body, "Chapa {} failed", action);
            bail!("Chapa {} failed with status {}: {}", action, status, body);
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Chapa {} returned an unexpected body", action))
    }
}

#[async_trait]
impl BasePaymentGateway for ChapaClient {
    async fn initialize_payment(&self, request: &PaymentInitRequest) -> Result<PaymentInitResponse> {
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await
            .context("Chapa initialize request failed")?;

        let envelope = Self::read_envelope(response, "initialize").await?;
        let data = envelope.data();
        let checkout_url = data
            .get("checkout_url")
            .and_then(|v| v.as_str())
            .map(String::from);

        info!(tx_ref = %request.tx_ref, "payment initialized with Chapa");

        Ok(PaymentInitResponse {
            checkout_url,
            message: envelope.message_or("Payment initialized successfully"),
            data,
        })
    }

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification> {
        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, tx_ref))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("Chapa verify request failed")?;

        let envelope = Self::read_envelope(response, "verify").await?;
        let data = envelope.data();
        let field = |name: &str| data.get(name).and_then(|v| v.as_str()).map(String::from);
        let status = field("status");
        let reference = field("reference");

        info!(tx_ref = %tx_ref, status = ?status, "payment verified with Chapa");

        Ok(PaymentVerification {
            status,
            reference,
            message: envelope.message_or("Payment verified successfully"),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ChapaClient::new("https://api.chapa.co/v1/", "sk").unwrap();
        assert_eq!(client.base_url, "https://api.chapa.co/v1");
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: ChapaEnvelope = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(envelope.message_or("fallback"), "fallback");
        assert_eq!(envelope.data(), serde_json::json!({}));

        let envelope: ChapaEnvelope = serde_json::from_str(
            r#"{"message":"Hosted Link","data":{"checkout_url":"https://checkout.chapa.co/x"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.message_or("fallback"), "Hosted Link");
        assert_eq!(
            envelope.data()["checkout_url"],
            serde_json::json!("https://checkout.chapa.co/x")
        );
    }
}
