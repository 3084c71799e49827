//! Operaciones de facturación expuestas a los clientes.
//!
//! Cada operación recibe explícitamente la identidad de quien llama; sin
//! identidad la operación falla con `unauthenticated` antes de tocar datos.

mod dgii;
mod documents;
mod records;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::core::{EcfConfig, EcfError, EcfResult};
use crate::ecf::{GatewayClient, ServiceHealth};
use crate::models::{CertificateKind, Invoice, InvoiceStatus};
use crate::notify::Mailer;
use crate::pdf::PdfRenderer;
use crate::storage::{ObjectStorage, Repository};

pub use records::TriggerReport;

/// Usuario autenticado que invoca una operación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub uid: String,
}

impl Caller {
    pub fn new(uid: impl Into<String>) -> Self {
        Caller { uid: uid.into() }
    }

    /// Identidad usada por el procesamiento automático.
    pub fn system() -> Self {
        Caller::new("system")
    }
}

fn authorize(caller: Option<&Caller>) -> EcfResult<&Caller> {
    caller.ok_or_else(|| EcfError::unauthenticated("La función requiere autenticación"))
}

fn required<'a>(value: &'a str, message: &str) -> EcfResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(EcfError::invalid_argument(message))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Modo usado cuando la llamada no indica `testMode`.
    pub default_test_mode: bool,
    pub certificate_key: String,
}

impl From<&EcfConfig> for ServiceOptions {
    fn from(config: &EcfConfig) -> Self {
        ServiceOptions {
            default_test_mode: config.test_mode,
            certificate_key: config.certificate_key.clone(),
        }
    }
}

pub struct InvoiceService {
    repo: Repository,
    storage: Arc<dyn ObjectStorage>,
    gateway: GatewayClient,
    pdf: PdfRenderer,
    mailer: Arc<dyn Mailer>,
    options: ServiceOptions,
}

impl InvoiceService {
    pub fn new(
        repo: Repository,
        storage: Arc<dyn ObjectStorage>,
        gateway: GatewayClient,
        pdf: PdfRenderer,
        mailer: Arc<dyn Mailer>,
        options: ServiceOptions,
    ) -> Self {
        InvoiceService {
            repo,
            storage,
            gateway,
            pdf,
            mailer,
            options,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub success: bool,
    pub track_id: String,
    pub xml_url: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfResult {
    pub success: bool,
    pub pdf_url: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    pub success: bool,
    pub status: InvoiceStatus,
    pub dgii_status: String,
    pub track_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DgiiHealth {
    pub status: ServiceHealth,
    pub test_mode: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub success: bool,
    pub message: String,
    pub track_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInvoice {
    pub invoice: Invoice,
    pub processing: TriggerReport,
}

/// Datos públicos del certificado instalado; nunca incluye el material.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSummary {
    #[serde(rename = "type")]
    pub kind: CertificateKind,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub serial_number: Option<String>,
}
