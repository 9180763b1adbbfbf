use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::message::EmailMessage;

mod sendgrid;
mod ses;

pub use sendgrid::{SendGridClient, SENDGRID_API_BASE, SENDGRID_API_KEY_ENV};
pub use ses::SesDelivery;

/// A hosted email API. Shared across every flush and only ever called.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}
