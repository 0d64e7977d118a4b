// src/utils/notifier.rs

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AppError;

/// A queued outgoing e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivers e-mails drained from the notification queue.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), AppError>;
}

/// Transport that records each message in the application log.
/// Real SMTP delivery is handled outside this service.
pub struct LogTransport {
    pub from: String,
}

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), AppError> {
        tracing::info!(
            from = %self.from,
            to = %message.recipient,
            subject = %message.subject,
            "email dispatched"
        );
        Ok(())
    }
}

/// Fire-and-forget handle onto the e-mail queue.
///
/// `enqueue` never blocks and never fails the caller; a background worker
/// owns delivery and only logs failures.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<EmailMessage>,
}

impl Notifier {
    /// Starts the delivery worker on the current Tokio runtime.
    pub fn spawn(transport: Arc<dyn MailTransport>) -> Self {
        let (notifier, mut rx) = Self::channel();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = transport.deliver(&message).await {
                    tracing::warn!(to = %message.recipient, "Failed to deliver email: {}", e);
                }
            }
            tracing::debug!("Notification queue closed");
        });

        notifier
    }

    /// Creates a notifier whose queue is drained by the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EmailMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, recipient: &str, subject: String, body: String) {
        let message = EmailMessage {
            recipient: recipient.to_string(),
            subject,
            body,
        };
        if self.tx.send(message).is_err() {
            tracing::warn!(to = %recipient, "Notification worker is gone, dropping email");
        }
    }

    pub fn send_welcome(&self, email: &str, username: &str) {
        self.enqueue(
            email,
            "Welcome to Loopcraft!".to_string(),
            format!(
                "Hi {username},\n\n\
                 Welcome to Loopcraft! We're delighted to have you join our community \
                 of crochet and knitting enthusiasts.\n\n\
                 Dive into patterns, share your projects and connect with others who \
                 love the craft as much as you do.\n\n\
                 Warmest wishes,\nThe Loopcraft Team"
            ),
        );
    }

    /// Congratulates an author whose item reached a like/save milestone.
    pub fn send_milestone(&self, email: &str, username: &str, item: &str, title: &str, count: i64, noun: &str) {
        self.enqueue(
            email,
            format!("Your {item} '{title}' has reached {count} {noun}!"),
            format!(
                "Dear {username},\n\n\
                 Your {item} titled '{title}' has received {count} {noun}! \
                 Congratulations on reaching this milestone!\n\n\
                 Best wishes,\nThe Loopcraft Team"
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, message: &EmailMessage) -> Result<(), AppError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn channel_receives_enqueued_messages() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.send_milestone("a@b.c", "ann", "pattern", "Granny Square", 4, "saves");

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.recipient, "a@b.c");
        assert_eq!(msg.subject, "Your pattern 'Granny Square' has reached 4 saves!");
        assert!(msg.body.starts_with("Dear ann,"));
    }

    #[tokio::test]
    async fn worker_hands_messages_to_transport() {
        let transport = Arc::new(RecordingTransport { sent: Mutex::new(Vec::new()) });
        let notifier = Notifier::spawn(transport.clone());

        notifier.send_welcome("new@user.io", "newbie");

        for _ in 0..50 {
            if !transport.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Welcome to Loopcraft!");
    }

    #[test]
    fn enqueue_after_worker_drop_does_not_panic() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.enqueue("x@y.z", "s".into(), "b".into());
    }
}
