use std::fmt;
use std::sync::Arc;

use crate::delivery::DeliveryClient;
use crate::message::EmailAddress;

/// Who the emails come from and go to, and the client that sends them.
#[derive(Clone)]
pub struct ConnectionInfo {
    from: EmailAddress,
    to: EmailAddress,
    email_subject: Option<String>,
    client: Arc<dyn DeliveryClient>,
}

impl ConnectionInfo {
    pub fn new<C>(client: C, from_email: &str, to_email: &str) -> Self
    where
        C: DeliveryClient + 'static,
    {
        Self::with_shared_client(Arc::new(client), from_email, to_email)
    }

    pub fn with_shared_client(
        client: Arc<dyn DeliveryClient>,
        from_email: &str,
        to_email: &str,
    ) -> Self {
        Self {
            from: EmailAddress::new(from_email),
            to: EmailAddress::new(to_email),
            email_subject: None,
            client,
        }
    }

    pub fn from_name(mut self, name: &str) -> Self {
        self.from = self.from.with_name(name);
        self
    }

    pub fn to_name(mut self, name: &str) -> Self {
        self.to = self.to.with_name(name);
        self
    }

    /// Literal subject used for every email instead of the subject template.
    pub fn email_subject(mut self, subject: &str) -> Self {
        self.email_subject = Some(subject.to_string()).filter(|subject| !subject.is_empty());
        self
    }

    pub fn sender(&self) -> &EmailAddress {
        &self.from
    }

    pub fn recipient(&self) -> &EmailAddress {
        &self.to
    }

    pub fn subject_override(&self) -> Option<&str> {
        self.email_subject.as_deref()
    }

    pub fn client(&self) -> &Arc<dyn DeliveryClient> {
        &self.client
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("email_subject", &self.email_subject)
            .finish_non_exhaustive()
    }
}
