//! SMS notifier over an HTTP messaging gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::port::{ClientError, NotifierPort, PortFuture, SendOutcome, mask_phone};
use crate::retry::{self, BASE_RETRY_DELAY};

const DEFAULT_BASE_URL: &str = "https://voice.googleapis.com";
const MAX_SEND_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    phone_number: &'a str,
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

pub struct SmsClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    phone_number: String,
}

impl SmsClient {
    pub fn new(api_token: String, phone_number: String, base_url: Option<String>) -> Self {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base.trim_end_matches('/').to_owned(),
            api_token,
            phone_number,
        }
    }

    fn send_url(&self) -> String {
        format!("{}/v1/messages:send", self.base_url)
    }

    async fn post_message(&self, text: &str) -> Result<String, ClientError> {
        let body = SendRequest { phone_number: &self.phone_number, text };
        let resp = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(retry::status_error(status, text));
        }

        // Gateways differ in how they name the id; an empty body still counts as sent.
        let parsed: SendResponse = resp.json().await.unwrap_or_default();
        Ok(parsed.message_id.or(parsed.id).unwrap_or_else(|| "unknown".to_owned()))
    }

    async fn deliver(&self, message: String) -> SendOutcome {
        let result = retry::with_retry("sms_send", MAX_SEND_ATTEMPTS, BASE_RETRY_DELAY, || {
            self.post_message(&message)
        })
        .await;

        match result {
            Ok(id) => {
                tracing::info!(recipient = %self.recipient_masked(), message_id = %id, "sms sent");
                SendOutcome::sent(id)
            }
            Err(e) => {
                tracing::warn!(recipient = %self.recipient_masked(), error = %e, "sms send failed");
                SendOutcome::failed(e.to_string())
            }
        }
    }
}

impl NotifierPort for SmsClient {
    fn recipient_masked(&self) -> String {
        mask_phone(&self.phone_number)
    }

    fn send(&self, message: String) -> PortFuture<'_, SendOutcome> {
        Box::pin(self.deliver(message))
    }
}

/// Build a notifier from `SMS_API_TOKEN`, `SMS_PHONE_NUMBER` and optional
/// `SMS_API_BASE`. Returns `None` when token or number is unset.
pub fn from_env() -> Option<SmsClient> {
    let token = std::env::var("SMS_API_TOKEN").ok().filter(|v| !v.is_empty())?;
    let phone = std::env::var("SMS_PHONE_NUMBER").ok().filter(|v| !v.is_empty())?;
    let base_url = std::env::var("SMS_API_BASE").ok();
    Some(SmsClient::new(token, phone, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_camel_case() {
        let body = SendRequest { phone_number: "+15551234567", text: "hi" };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["phoneNumber"], "+15551234567");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn response_accepts_either_id_field() {
        let a: SendResponse = serde_json::from_str(r#"{"messageId":"m1"}"#).unwrap();
        assert_eq!(a.message_id.as_deref(), Some("m1"));
        let b: SendResponse = serde_json::from_str(r#"{"id":"m2"}"#).unwrap();
        assert_eq!(b.id.as_deref(), Some("m2"));
    }

    #[test]
    fn recipient_is_masked_and_url_built() {
        let c = SmsClient::new("tok".into(), "+14805550123".into(), Some("http://gw.local/".into()));
        assert_eq!(c.recipient_masked(), "***-***-0123");
        assert_eq!(c.send_url(), "http://gw.local/v1/messages:send");
    }
}
