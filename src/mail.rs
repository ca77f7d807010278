// Outbound email: transport abstraction, SMTP implementation and message templates

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MimeAttachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Mail delivery errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Sender, recipient or attachment metadata could not be parsed
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The transport refused or failed to deliver the message
    #[error("Transport error: {0}")]
    Transport(String),
}

/// File attached to an outgoing email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A plain-text email ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

impl OutgoingEmail {
    /// Password-reset secret delivered from the organisation inbox to the account owner
    pub fn password_reset(
        org_inbox: &str,
        recipient: &str,
        secret: &str,
        valid_minutes: i64,
    ) -> Self {
        Self {
            to: recipient.to_string(),
            from: org_inbox.to_string(),
            subject: format!(
                "Your password reset token (valid for only {} minutes)",
                valid_minutes
            ),
            body: secret.to_string(),
            attachments: Vec::new(),
        }
    }

    /// Contact-us message relayed from a user to the organisation inbox
    pub fn contact_us(org_inbox: &str, full_name: &str, sender: &str, content: &str) -> Self {
        Self {
            to: org_inbox.to_string(),
            from: sender.to_string(),
            subject: format!("{} - New Contact Us Message", full_name),
            body: format!("From: {}\n\nMessage:\n{}", sender, content),
            attachments: Vec::new(),
        }
    }
}

/// Outbound mail transport
///
/// Failures are reported to the caller; nothing is retried here.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP mailer backed by lettre's async transport
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a TLS relay transport authenticated with the organisation account
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport })
    }

    fn build_message(email: OutgoingEmail) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(
                email
                    .from
                    .parse()
                    .map_err(|e| MailError::InvalidMessage(format!("from: {}", e)))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| MailError::InvalidMessage(format!("to: {}", e)))?)
            .subject(email.subject);

        let message = if email.attachments.is_empty() {
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.body)
        } else {
            let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body));
            for attachment in email.attachments {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| MailError::InvalidMessage(format!("content type: {}", e)))?;
                parts = parts.singlepart(
                    MimeAttachment::new(attachment.filename).body(attachment.content, content_type),
                );
            }
            builder.multipart(parts)
        };

        message.map_err(|e| MailError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let subject = email.subject.clone();
        let message = Self::build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!("Email sent: {}", subject);
        Ok(())
    }
}
