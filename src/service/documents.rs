use chrono::Utc;

use crate::core::{format_date, EcfError, EcfResult};
use crate::metrics;
use crate::notify::template::DEFAULT_MESSAGE;
use crate::notify::{render_invoice_email, EmailAttachment, EmailContext, OutgoingEmail};
use crate::pdf::pdf_key;
use super::{authorize, required, Caller, EmailResult, InvoiceService, PdfResult};

impl InvoiceService {
    /// Genera el PDF de la factura, lo sube y guarda la URL.
    pub async fn generate_invoice_pdf(
        &self,
        caller: Option<&Caller>,
        invoice_id: &str,
    ) -> EcfResult<PdfResult> {
        authorize(caller)?;
        let invoice_id = required(invoice_id, "Se requiere ID de factura.")?;

        let mut invoice = self.repo.invoice(invoice_id).await?;
        let company = self.repo.company().await?;
        let client = match invoice.client_id.trim() {
            "" => None,
            id => self.repo.find_client(id).await?,
        };

        let pdf_url = self
            .pdf
            .render_and_upload(&invoice, &company, client.as_ref())
            .await?;

        invoice.pdf_url = Some(pdf_url.clone());
        invoice.pdf_generated_date = Some(Utc::now());
        self.repo.save_invoice(&invoice).await?;

        tracing::info!("PDF generado para la factura {}: {}", invoice.id, pdf_url);

        Ok(PdfResult {
            success: true,
            pdf_url,
            message: "PDF generado correctamente".to_string(),
        })
    }

    /// Envía por correo el PDF ya generado de la factura.
    pub async fn send_invoice_email(
        &self,
        caller: Option<&Caller>,
        invoice_id: &str,
        recipient_email: &str,
        subject: Option<&str>,
        message: Option<&str>,
    ) -> EcfResult<EmailResult> {
        authorize(caller)?;
        let missing = "Se requiere ID de factura y correo del destinatario.";
        let invoice_id = required(invoice_id, missing)?;
        let recipient = required(recipient_email, missing)?;

        let mut invoice = self.repo.invoice(invoice_id).await?;
        if invoice.pdf_url.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(EcfError::failed_precondition(
                "La factura no tiene un PDF generado. Genere el PDF antes de enviarla.",
            ));
        }
        let pdf = self.storage.get(&pdf_key(&invoice.id)).await.map_err(|e| match e {
            EcfError::NotFound(_) => EcfError::failed_precondition(
                "No se encontró el PDF de la factura. Genere el PDF nuevamente.",
            ),
            other => other,
        })?;

        let company = self.repo.company().await?;
        let number = invoice.display_number().to_string();
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string();
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Factura Electrónica #{}", number));

        let context = EmailContext {
            company_name: company.display_name().to_string(),
            logo_url: company.logo_url.clone().filter(|u| !u.trim().is_empty()),
            message: message.clone(),
            invoice_number: number.clone(),
            date: format_date(invoice.date.as_ref()),
            total: invoice.total,
            address: company.address.clone().unwrap_or_default(),
            phone: company.phone.clone().unwrap_or_default(),
            email: company
                .email
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| self.mailer.sender_address()),
        };
        let html = render_invoice_email(&context)?;

        self.mailer
            .send(OutgoingEmail {
                from_name: company.display_name().to_string(),
                to: recipient.to_string(),
                subject,
                text: message,
                html,
                attachment: Some(EmailAttachment {
                    filename: format!("Factura_{}.pdf", number),
                    content_type: "application/pdf".to_string(),
                    bytes: pdf,
                }),
            })
            .await?;

        invoice.email_sent = true;
        invoice.email_sent_date = Some(Utc::now());
        invoice.email_recipient = Some(recipient.to_string());
        self.repo.save_invoice(&invoice).await?;

        metrics::EMAILS_SENT.inc();
        tracing::info!("Factura {} enviada por correo a {}", invoice.id, recipient);

        Ok(EmailResult {
            success: true,
            message: "Correo enviado correctamente".to_string(),
        })
    }
}
