pub mod smtp;
pub mod template;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::{EcfResult, MailConfig};

pub use smtp::SmtpMailer;
pub use template::{render_invoice_email, EmailContext};

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Nombre visible del remitente; la dirección la pone el transporte.
    pub from_name: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: Option<EmailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> EcfResult<()>;

    /// Dirección con la que sale el correo.
    fn sender_address(&self) -> String;
}

/// Guarda los correos en memoria en vez de enviarlos.
pub struct MemoryMailer {
    sender: String,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl Default for MemoryMailer {
    fn default() -> Self {
        MemoryMailer {
            sender: MailConfig::default().from_address,
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> EcfResult<()> {
        tracing::debug!("Correo en memoria para {}: {}", email.to, email.subject);
        self.sent.lock().await.push(email);
        Ok(())
    }

    fn sender_address(&self) -> String {
        self.sender.clone()
    }
}
