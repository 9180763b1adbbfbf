use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing_email::{
    email, ConfigError, ConnectionInfo, DeliveryClient, DeliveryError, EmailLayerBuilder,
    EmailMessage, FormatProvider, Level,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[derive(Default)]
struct RecordingClient {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl DeliveryClient for RecordingClient {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

fn connection(client: &Arc<RecordingClient>) -> ConnectionInfo {
    ConnectionInfo::with_shared_client(client.clone(), "app@example.com", "ops@example.com")
        .from_name("My App")
}

#[test]
fn guard_drop_flushes_one_email_for_the_batch() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client))
        .output_template("[{Level:u3}] {Message}{NewLine}")
        .mail_subject("{Level}: {Message}")
        .format_provider(FormatProvider::Utc)
        .build()
        .unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::info!("service started");
        tracing::warn!(disk = "/var", "disk almost full");
        tracing::error!("write failed");
        tracing::error!("second failure");
    });
    drop(guard);

    let sent = client.sent.lock();
    assert_eq!(sent.len(), 1);
    let message = &sent[0];
    assert_eq!(message.subject, "Error: write failed");
    assert_eq!(
        message.text_body,
        "[INF] service started\n[WRN] disk almost full\n[ERR] write failed\n[ERR] second failure\n"
    );
    assert_eq!(message.html_body, message.text_body);
    assert_eq!(message.from.to_string(), "My App <app@example.com>");
    assert_eq!(message.to.email, "ops@example.com");
}

#[test]
fn events_below_minimum_level_are_ignored() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client))
        .output_template("{Message}{NewLine}")
        .minimum_level(Level::Warning)
        .build()
        .unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::debug!("noise");
        tracing::info!("more noise");
        tracing::warn!("worth a look");
    });
    drop(guard);

    let sent = client.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text_body, "worth a look\n");
    assert_eq!(sent[0].subject, "Log Email");
}

#[test]
fn no_events_means_no_email() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client)).build().unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {});
    drop(guard);

    assert!(client.sent.lock().is_empty());
}

#[test]
fn connection_subject_wins_over_mail_subject() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client).email_subject("Staging alerts"))
        .mail_subject("{Message}")
        .build()
        .unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!("database unreachable");
    });
    drop(guard);

    assert_eq!(client.sent.lock()[0].subject, "Staging alerts");
}

#[test]
fn errors_are_rendered_as_exceptions() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client))
        .output_template("{Message}{NewLine}{Exception}")
        .build()
        .unwrap();

    let err = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!(error = &err as &(dyn std::error::Error + 'static), "upload failed");
    });
    drop(guard);

    assert_eq!(
        client.sent.lock()[0].text_body,
        "upload failed\nconnection reset\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runs_on_a_supplied_runtime() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client))
        .output_template("{Message}")
        .runtime_handle(tokio::runtime::Handle::current())
        .build()
        .unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::info!("from the app runtime");
    });
    let finished = tokio::task::spawn_blocking(move || {
        guard.shutdown();
        guard.wait(Duration::from_secs(5))
    })
    .await
    .unwrap();
    assert!(finished);

    assert_eq!(client.sent.lock()[0].text_body, "from the app runtime");
}

#[test]
fn registration_requires_connection_info() {
    let result = EmailLayerBuilder::new().period(Duration::from_secs(5)).build();
    assert!(matches!(result, Err(ConfigError::MissingConnectionInfo)));
}

#[test]
fn invalid_templates_fail_registration() {
    let client = Arc::new(RecordingClient::default());
    let result = email(connection(&client))
        .output_template("{Message")
        .build();
    assert!(matches!(result, Err(ConfigError::InvalidTemplate { .. })));
}

#[test]
fn zero_limits_fail_registration() {
    let client = Arc::new(RecordingClient::default());
    let result = email(connection(&client)).queue_limit(0).build();
    assert!(matches!(result, Err(ConfigError::ZeroLimit("queue_limit"))));
}

#[test]
fn zero_period_fails_registration() {
    let client = Arc::new(RecordingClient::default());
    let result = email(connection(&client)).period(Duration::ZERO).build();
    assert!(matches!(result, Err(ConfigError::ZeroLimit("period"))));
}

#[test]
fn fatal_field_raises_the_subject_level() {
    let client = Arc::new(RecordingClient::default());
    let (layer, guard) = email(connection(&client))
        .output_template("[{Level:u3}] {Message}{NewLine}")
        .mail_subject("{Level}: {Message}")
        .minimum_level(Level::Fatal)
        .build()
        .unwrap();

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!("recoverable");
        tracing::error!(fatal = true, "process exiting");
    });
    drop(guard);

    let sent = client.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Fatal: process exiting");
    assert_eq!(sent[0].text_body, "[FTL] process exiting\n");
}
