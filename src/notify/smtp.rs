use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::core::{EcfError, EcfResult, MailConfig};
use super::{Mailer, OutgoingEmail};

/// Envío por SMTP con `lettre`.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: Address,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> EcfResult<Self> {
        if config.smtp_host.trim().is_empty() {
            return Err(EcfError::invalid_argument("Falta el servidor SMTP"));
        }

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| EcfError::internal(format!("Servidor SMTP inválido: {}", e)))?
                .port(config.smtp_port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
        };

        if !config.smtp_user.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ));
        }

        let from_address = config
            .from_address
            .parse::<Address>()
            .map_err(|_| EcfError::invalid_argument("Dirección de remitente inválida"))?;

        Ok(SmtpMailer {
            transport: builder.build(),
            from_address,
        })
    }

    fn build_message(&self, email: OutgoingEmail) -> EcfResult<Message> {
        let from = Mailbox::new(Some(email.from_name), self.from_address.clone());
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| EcfError::invalid_argument("Correo del destinatario inválido"))?;

        let body = MultiPart::alternative()
            .singlepart(SinglePart::plain(email.text))
            .singlepart(SinglePart::html(email.html));

        let content = match email.attachment {
            Some(file) => {
                let content_type = ContentType::parse(&file.content_type)
                    .map_err(|e| EcfError::internal(format!("Tipo de adjunto inválido: {}", e)))?;
                MultiPart::mixed()
                    .multipart(body)
                    .singlepart(Attachment::new(file.filename).body(file.bytes, content_type))
            }
            None => body,
        };

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject)
            .multipart(content)
            .map_err(|e| EcfError::internal(format!("No se pudo armar el correo: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> EcfResult<()> {
        let to = email.to.clone();
        let message = self.build_message(email)?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!("Error al enviar correo a {}: {}", to, e);
            EcfError::internal(format!("Error al enviar el correo: {}", e))
        })?;

        Ok(())
    }

    fn sender_address(&self) -> String {
        self.from_address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EmailAttachment;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(&MailConfig {
            smtp_host: "localhost".to_string(),
            use_tls: false,
            ..MailConfig::default()
        })
        .unwrap()
    }

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            from_name: "Fumigadora Caribe".to_string(),
            to: to.to_string(),
            subject: "Factura Electrónica #F-001".to_string(),
            text: "Adjunto".to_string(),
            html: "<p>Adjunto</p>".to_string(),
            attachment: Some(EmailAttachment {
                filename: "Factura_F-001.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF".to_vec(),
            }),
        }
    }

    #[tokio::test]
    async fn message_carries_attachment() {
        let message = mailer().build_message(email("cliente@example.com")).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Factura_F-001.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[tokio::test]
    async fn invalid_recipient_is_invalid_argument() {
        let err = mailer().build_message(email("no-es-correo")).unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
    }
}
