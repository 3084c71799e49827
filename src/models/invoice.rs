use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ITBIS aplicado cuando la línea no indica tasa.
pub const DEFAULT_TAX_RATE: f64 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pendiente,
    Enviada,
    Aceptada,
    Rechazada,
    Anulada,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pendiente => "pendiente",
            InvoiceStatus::Enviada => "enviada",
            InvoiceStatus::Aceptada => "aceptada",
            InvoiceStatus::Rechazada => "rechazada",
            InvoiceStatus::Anulada => "anulada",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pendiente" => Some(InvoiceStatus::Pendiente),
            "enviada" => Some(InvoiceStatus::Enviada),
            "aceptada" => Some(InvoiceStatus::Aceptada),
            "rechazada" => Some(InvoiceStatus::Rechazada),
            "anulada" => Some(InvoiceStatus::Anulada),
            _ => None,
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Pendiente
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub price: f64,
    /// Tasa de ITBIS en porcentaje.
    #[serde(default)]
    pub tax: Option<f64>,
}

impl InvoiceItem {
    pub fn tax_rate(&self) -> f64 {
        self.tax.unwrap_or(DEFAULT_TAX_RATE)
    }

    pub fn subtotal(&self) -> f64 {
        self.quantity * self.price
    }

    pub fn tax_amount(&self) -> f64 {
        self.subtotal() * self.tax_rate() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

pub fn calculate_totals(items: &[InvoiceItem]) -> InvoiceTotals {
    let subtotal: f64 = items.iter().map(InvoiceItem::subtotal).sum();
    let tax: f64 = items.iter().map(InvoiceItem::tax_amount).sum();

    InvoiceTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub reason_code: String,
    pub reason: String,
    pub date: DateTime<Utc>,
    pub track_id: Option<String>,
}

/// Motivos de anulación aceptados por la DGII.
pub const CANCELLATION_REASONS: [(&str, &str); 5] = [
    ("01", "Factura emitida con errores"),
    ("02", "Factura con datos incorrectos"),
    ("03", "Factura duplicada"),
    ("04", "Orden de compra cancelada"),
    ("05", "Otros"),
];

/// Código que exige un motivo escrito por el usuario.
pub const OTHER_REASON_CODE: &str = "05";

pub fn cancellation_reason_description(code: &str) -> Option<&'static str> {
    CANCELLATION_REASONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, description)| *description)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub ncf: Option<String>,
    #[serde(default)]
    pub client_id: String,
    /// Nombre del cliente copiado al momento de facturar.
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub rnc: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub pdf_generated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub xml_url: Option<String>,
    #[serde(default)]
    pub dgii_submission_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dgii_response: Option<serde_json::Value>,
    #[serde(default)]
    pub dgii_status_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dgii_status_response: Option<serde_json::Value>,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub email_sent: bool,
    #[serde(default)]
    pub email_sent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_recipient: Option<String>,
    #[serde(default = "default_true")]
    pub auto_process: bool,
    #[serde(default, rename = "autoSendToDGII")]
    pub auto_send_to_dgii: bool,
}

fn default_true() -> bool {
    true
}

impl Invoice {
    /// Número visible de la factura; usa el id si no se asignó uno.
    pub fn display_number(&self) -> &str {
        self.invoice_number
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// e-NCF del documento: el NCF asignado, o el número de factura.
    pub fn encf(&self) -> &str {
        self.ncf
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.display_number())
    }

    pub fn recalculate_totals(&mut self) {
        let totals = calculate_totals(&self.items);
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
        }
    }

    /// Coincidencia de búsqueda libre sobre cliente, track id, estado y RNC.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let contains = |value: Option<&str>| {
            value
                .map(|v| v.to_lowercase().contains(&term))
                .unwrap_or(false)
        };

        contains(self.client.as_deref())
            || contains(self.track_id.as_deref())
            || self.status.as_str().contains(&term)
            || contains(self.rnc.as_deref())
    }
}

/// Datos de entrada para registrar una factura nueva.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub ncf: Option<String>,
    pub client_id: String,
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub auto_process: bool,
    #[serde(default, rename = "autoSendToDGII")]
    pub auto_send_to_dgii: bool,
}

/// Registro de auditoría en `invoiceEvents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceEventRecord {
    pub id: String,
    pub invoice_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub details: serde_json::Value,
}
