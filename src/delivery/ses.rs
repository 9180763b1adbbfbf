use async_trait::async_trait;
use rusoto_core::Region;
use rusoto_ses::{Body, Content, Destination, Message, SendEmailRequest, Ses, SesClient};

use crate::delivery::DeliveryClient;
use crate::error::DeliveryError;
use crate::message::EmailMessage;

const CHARSET: &str = "UTF-8";

/// Sends through Amazon SES with any rusoto [`Ses`] client.
pub struct SesDelivery<C> {
    client: C,
}

impl SesDelivery<SesClient> {
    pub fn default_client() -> Self {
        Self::with_client(SesClient::new(Region::default()))
    }

    pub fn new(region: Region) -> Self {
        Self::with_client(SesClient::new(region))
    }
}

impl<C> SesDelivery<C>
where
    C: Ses + Send + Sync,
{
    pub fn with_client(client: C) -> Self {
        Self { client }
    }
}

fn content(data: &str) -> Content {
    Content {
        charset: Some(CHARSET.to_string()),
        data: data.to_string(),
    }
}

fn send_email_request(message: &EmailMessage) -> SendEmailRequest {
    SendEmailRequest {
        source: message.from.to_string(),
        destination: Destination {
            to_addresses: Some(vec![message.to.to_string()]),
            ..Default::default()
        },
        message: Message {
            subject: content(&message.subject),
            body: Body {
                text: Some(content(&message.text_body)),
                html: Some(content(&message.html_body)),
            },
        },
        ..Default::default()
    }
}

#[async_trait]
impl<C> DeliveryClient for SesDelivery<C>
where
    C: Ses + Send + Sync,
{
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        self.client
            .send_email(send_email_request(message))
            .await?;
        Ok(())
    }
}
