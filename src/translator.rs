use crate::error::FormatError;
use crate::event::LogEvent;
use crate::message::{EmailAddress, EmailMessage};
use crate::template::TextFormatter;

/// How the subject line is produced, decided once when the sink is built.
pub enum SubjectLine {
    Override(String),
    Template(Box<dyn TextFormatter>),
}

impl SubjectLine {
    /// A non-empty override wins over the template.
    pub fn resolve(subject_override: Option<&str>, template: Box<dyn TextFormatter>) -> Self {
        match subject_override {
            Some(subject) if !subject.is_empty() => SubjectLine::Override(subject.to_string()),
            _ => SubjectLine::Template(template),
        }
    }
}

/// Turns a batch of events into a single email.
pub struct BatchTranslator {
    from: EmailAddress,
    to: EmailAddress,
    body: Box<dyn TextFormatter>,
    subject: SubjectLine,
}

impl BatchTranslator {
    pub fn new(
        from: EmailAddress,
        to: EmailAddress,
        body: Box<dyn TextFormatter>,
        subject: SubjectLine,
    ) -> Self {
        Self {
            from,
            to,
            body,
            subject,
        }
    }

    /// Returns `None` for an empty batch, without rendering anything.
    pub fn translate(&self, events: &[LogEvent]) -> Result<Option<EmailMessage>, FormatError> {
        let worst = match most_severe(events) {
            Some(event) => event,
            None => return Ok(None),
        };

        let mut body = String::new();
        for event in events {
            self.body.format(event, &mut body)?;
        }

        let subject = match &self.subject {
            SubjectLine::Override(subject) => subject.clone(),
            SubjectLine::Template(template) => {
                let mut subject = String::new();
                template.format(worst, &mut subject)?;
                subject
            }
        };

        Ok(Some(EmailMessage::new(
            self.from.clone(),
            self.to.clone(),
            subject,
            body,
        )))
    }
}

/// First event holding the highest level in the batch.
pub fn most_severe(events: &[LogEvent]) -> Option<&LogEvent> {
    let mut events = events.iter();
    let mut worst = events.next()?;
    for event in events {
        if event.level() > worst.level() {
            worst = event;
        }
    }
    Some(worst)
}
