use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::core::{EcfError, EcfResult};
use crate::ecf::xml::{build_cancellation_xml, build_invoice_xml, validate_xml, xml_filename};
use crate::ecf::{signer, transition, InvoiceEvent};
use crate::metrics;
use crate::models::{
    cancellation_reason_description, Cancellation, CertificateMaterial, CertificateRecord,
    EcfSettings, InvoiceEventRecord, OTHER_REASON_CODE,
};
use super::{
    authorize, required, CancellationResult, Caller, CertificateSummary, DgiiHealth,
    InvoiceService, StatusResult, SubmissionResult,
};

const XML_CONTENT_TYPE: &str = "application/xml";

pub(super) fn xml_key(filename: &str) -> String {
    format!("invoices/xml/{}", filename)
}

impl InvoiceService {
    /// Abre el certificado instalado si está vigente.
    async fn signing_material(&self, missing: EcfError) -> EcfResult<CertificateMaterial> {
        let record = self.repo.certificate().await?.ok_or(missing)?;

        if !record.is_valid_at(Utc::now()) {
            return Err(EcfError::failed_precondition(
                "El certificado digital está vencido o aún no es válido",
            ));
        }

        record.open(&self.options.certificate_key)
    }

    /// Genera, firma, guarda y envía el e-CF de una factura pendiente.
    pub async fn send_invoice_to_dgii(
        &self,
        caller: Option<&Caller>,
        invoice_id: &str,
        test_mode: Option<bool>,
    ) -> EcfResult<SubmissionResult> {
        authorize(caller)?;
        let invoice_id = required(invoice_id, "Se requiere ID de factura.")?;
        let test_mode = test_mode.unwrap_or(self.options.default_test_mode);

        let mut invoice = self.repo.invoice(invoice_id).await?;
        let next = transition(invoice.status, &InvoiceEvent::Submitted)?;

        let client = self.repo.client(&invoice.client_id).await?;
        let company = self
            .repo
            .find_company()
            .await?
            .ok_or_else(|| EcfError::not_found("No se encontraron datos de la empresa."))?;

        let xml = build_invoice_xml(&invoice, &company, &client)?;
        validate_xml(&xml)?;

        let material = self
            .signing_material(EcfError::not_found("No se encontró el certificado digital."))
            .await?;
        let signed = signer::sign(&xml, &material)?;
        signer::verify(&signed, &material)?;

        let filename = xml_filename(company.tax_id().unwrap_or_default(), invoice.encf());
        let xml_url = self
            .storage
            .put(&xml_key(&filename), signed.clone().into_bytes(), XML_CONTENT_TYPE)
            .await?;

        let receipt = match self.gateway.for_mode(test_mode).submit(&signed, &filename).await {
            Ok(receipt) => {
                metrics::DGII_SUBMISSIONS.with_label_values(&["ok"]).inc();
                receipt
            }
            Err(e) => {
                metrics::DGII_SUBMISSIONS.with_label_values(&["error"]).inc();
                tracing::error!("Error al enviar factura {} a la DGII: {}", invoice.id, e);
                return Err(e);
            }
        };

        invoice.status = next;
        invoice.track_id = Some(receipt.track_id.clone());
        invoice.xml_url = Some(xml_url.clone());
        invoice.dgii_submission_date = Some(Utc::now());
        invoice.dgii_response = Some(serde_json::to_value(&receipt)?);
        self.repo.save_invoice(&invoice).await?;

        tracing::info!(
            "Factura {} enviada a la DGII (trackId {}, prueba: {})",
            invoice.id,
            receipt.track_id,
            test_mode
        );

        Ok(SubmissionResult {
            success: true,
            track_id: receipt.track_id,
            xml_url,
            message: "Factura enviada correctamente a la DGII".to_string(),
        })
    }

    /// Consulta el estado del trackId y aplica la transición que corresponda.
    pub async fn check_invoice_status(
        &self,
        caller: Option<&Caller>,
        invoice_id: &str,
        test_mode: Option<bool>,
    ) -> EcfResult<StatusResult> {
        authorize(caller)?;
        let invoice_id = required(invoice_id, "Se requiere ID de factura.")?;
        let test_mode = test_mode.unwrap_or(self.options.default_test_mode);

        let mut invoice = self.repo.invoice(invoice_id).await?;
        let track_id = invoice
            .track_id
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EcfError::failed_precondition("La factura no ha sido enviada a la DGII."))?;

        let report = self.gateway.for_mode(test_mode).check_status(&track_id).await?;
        let next = transition(invoice.status, &InvoiceEvent::StatusReported(report.status.clone()))?;

        invoice.status = next;
        invoice.dgii_status_date = Some(Utc::now());
        invoice.dgii_status_response = Some(serde_json::to_value(&report)?);
        self.repo.save_invoice(&invoice).await?;

        metrics::STATUS_CHECKS.with_label_values(&[next.as_str()]).inc();
        tracing::info!("Factura {}: DGII reporta {} -> {}", invoice.id, report.status.as_str(), next);

        Ok(StatusResult {
            success: true,
            status: next,
            dgii_status: report.status.as_str().to_string(),
            track_id,
            message: report.message,
        })
    }

    /// Disponibilidad de los servicios de la DGII según `config/ecf`.
    pub async fn check_dgii_status(&self, caller: Option<&Caller>) -> EcfResult<DgiiHealth> {
        authorize(caller)?;
        let settings = self.repo.ecf_settings().await?;
        let report = self.gateway.probe(settings.test_mode).await;

        Ok(DgiiHealth {
            status: report.status,
            test_mode: settings.test_mode,
            message: report.message,
        })
    }

    /// Anula ante la DGII una factura aceptada.
    pub async fn cancel_invoice(
        &self,
        caller: Option<&Caller>,
        invoice_id: &str,
        reason_code: &str,
        reason: Option<&str>,
    ) -> EcfResult<CancellationResult> {
        let caller = authorize(caller)?;
        let invoice_id = required(invoice_id, "Se requiere el ID de la factura")?;
        let reason_code = required(reason_code, "Se requiere el código de motivo de anulación")?;

        let catalog = cancellation_reason_description(reason_code).ok_or_else(|| {
            EcfError::invalid_argument(format!("Código de motivo de anulación inválido: {}", reason_code))
        })?;
        let reason = if reason_code == OTHER_REASON_CODE {
            reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| EcfError::invalid_argument("Debe especificar el motivo de la anulación"))?
                .to_string()
        } else {
            catalog.to_string()
        };

        let mut invoice = self
            .repo
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| EcfError::not_found("Factura no encontrada"))?;

        if invoice.ncf.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(EcfError::failed_precondition("La factura no tiene un NCF válido"));
        }
        let next = transition(invoice.status, &InvoiceEvent::Cancelled)?;

        let settings = self.repo.ecf_settings().await?;
        let material = self
            .signing_material(EcfError::failed_precondition(
                "No hay un certificado digital configurado",
            ))
            .await?;
        let company = self.repo.company().await?;

        let now = Utc::now();
        let xml = build_cancellation_xml(&invoice, &company, reason_code, &reason, now)?;
        validate_xml(&xml)?;
        let signed = signer::sign(&xml, &material)?;
        signer::verify(&signed, &material)?;

        let receipt = self
            .gateway
            .for_mode(settings.test_mode)
            .submit_cancellation(&signed)
            .await?;

        invoice.status = next;
        invoice.cancellation = Some(Cancellation {
            reason_code: reason_code.to_string(),
            reason: reason.clone(),
            date: now,
            track_id: Some(receipt.track_id.clone()),
        });
        self.repo.save_invoice(&invoice).await?;

        self.repo
            .append_event(&InvoiceEventRecord {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                kind: "cancellation".to_string(),
                timestamp: now,
                user_id: caller.uid.clone(),
                details: json!({
                    "reasonCode": reason_code,
                    "reason": reason,
                    "trackId": receipt.track_id,
                }),
            })
            .await?;

        metrics::CANCELLATIONS.inc();
        tracing::info!("Factura {} anulada por {} (motivo {})", invoice.id, caller.uid, reason_code);

        Ok(CancellationResult {
            success: true,
            message: "Factura anulada correctamente".to_string(),
            track_id: Some(receipt.track_id),
        })
    }

    /// Instala un certificado de desarrollo; solo en modo de prueba.
    pub async fn install_development_certificate(
        &self,
        caller: Option<&Caller>,
    ) -> EcfResult<CertificateSummary> {
        authorize(caller)?;

        let settings = self.repo.ecf_settings().await?;
        if !settings.test_mode {
            return Err(EcfError::failed_precondition(
                "Solo se puede instalar un certificado de desarrollo en modo de prueba",
            ));
        }

        let record = CertificateRecord::development(&self.options.certificate_key, Utc::now())?;
        self.repo.save_certificate(&record).await?;
        tracing::info!("Certificado de desarrollo instalado, válido hasta {}", record.valid_to);

        Ok(CertificateSummary {
            kind: record.kind,
            valid_from: record.valid_from,
            valid_to: record.valid_to,
            issuer: record.issuer,
            subject: record.subject,
            serial_number: record.serial_number,
        })
    }

    /// Cambia el modo de operación guardado en `config/ecf`.
    pub async fn update_ecf_settings(
        &self,
        caller: Option<&Caller>,
        settings: EcfSettings,
    ) -> EcfResult<EcfSettings> {
        authorize(caller)?;
        self.repo.save_ecf_settings(&settings).await?;
        tracing::info!("Modo e-CF actualizado (prueba: {})", settings.test_mode);
        Ok(settings)
    }
}
