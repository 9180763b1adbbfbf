use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::delivery::DeliveryClient;
use crate::error::{ConfigError, DeliveryError};
use crate::message::{EmailAddress, EmailMessage};

pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";
pub const SENDGRID_API_KEY_ENV: &str = "SENDGRID_API_KEY";

/// Client for the SendGrid v3 mail send endpoint.
#[derive(Clone)]
pub struct SendGridClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl SendGridClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_http_client(Client::new(), api_key)
    }

    pub fn with_http_client(http: Client, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: SENDGRID_API_BASE.to_string(),
        }
    }

    /// Reads the API key from `SENDGRID_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(SENDGRID_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingEnvironment(SENDGRID_API_KEY_ENV))?;
        Ok(Self::new(&api_key))
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl DeliveryClient for SendGridClient {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&MailSendRequest::from(message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 2],
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

impl<'a> From<&'a EmailAddress> for Address<'a> {
    fn from(address: &'a EmailAddress) -> Self {
        Self {
            email: &address.email,
            name: address.name.as_deref(),
        }
    }
}

impl<'a> From<&'a EmailMessage> for MailSendRequest<'a> {
    fn from(message: &'a EmailMessage) -> Self {
        Self {
            personalizations: [Personalization {
                to: [Address::from(&message.to)],
            }],
            from: Address::from(&message.from),
            subject: &message.subject,
            content: [
                Content {
                    kind: "text/plain",
                    value: &message.text_body,
                },
                Content {
                    kind: "text/html",
                    value: &message.html_body,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage::new(
            EmailAddress::new("alerts@example.com").with_name("Alerts"),
            EmailAddress::new("ops@example.com"),
            "[Error] disk full".to_string(),
            "line one\nline two\n".to_string(),
        )
    }

    #[test]
    fn payload_carries_identical_text_and_html_content() {
        let payload = serde_json::to_value(MailSendRequest::from(&message())).unwrap();
        assert_eq!(
            payload,
            json!({
                "personalizations": [{ "to": [{ "email": "ops@example.com" }] }],
                "from": { "email": "alerts@example.com", "name": "Alerts" },
                "subject": "[Error] disk full",
                "content": [
                    { "type": "text/plain", "value": "line one\nline two\n" },
                    { "type": "text/html", "value": "line one\nline two\n" }
                ]
            })
        );
    }

    #[tokio::test]
    async fn sends_one_authenticated_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.test-key"))
            .and(body_json(
                serde_json::to_value(MailSendRequest::from(&message())).unwrap(),
            ))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = SendGridClient::new("SG.test-key").base_url(&server.uri());
        client.send_email(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_request_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = SendGridClient::new("SG.wrong").base_url(&server.uri());
        let err = client.send_email(&message()).await.unwrap_err();

        match err {
            DeliveryError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
