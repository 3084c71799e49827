#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;

use ecf_facturacion::core::{EcfResult, PdfSettings};
use ecf_facturacion::ecf::{GatewayClient, GatewayStatus, SimulatedGateway};
use ecf_facturacion::models::{Client, CompanySettings, Invoice, InvoiceItem, NewInvoice};
use ecf_facturacion::notify::MemoryMailer;
use ecf_facturacion::pdf::{Asset, PdfCompiler, PdfRenderer};
use ecf_facturacion::service::{Caller, InvoiceService, ServiceOptions};
use ecf_facturacion::storage::{MemoryStorage, MemoryStore, Repository};

pub const CERTIFICATE_KEY: &str = "clave-de-pruebas";

/// Compilador falso: devuelve la fuente Typst como "PDF".
pub struct EchoCompiler;

#[async_trait]
impl PdfCompiler for EchoCompiler {
    async fn compile(&self, source: &str, _assets: &[Asset]) -> EcfResult<Vec<u8>> {
        Ok(format!("%PDF-FAKE\n{}", source).into_bytes())
    }
}

pub struct Harness {
    pub service: Arc<InvoiceService>,
    pub repo: Repository,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn user() -> Caller {
    Caller::new("user-1")
}

pub fn harness(outcome: GatewayStatus) -> Harness {
    let repo = Repository::new(Arc::new(MemoryStore::new()));
    let storage = Arc::new(MemoryStorage::default());
    let mailer = Arc::new(MemoryMailer::new());

    let gateway = GatewayClient::new(
        Arc::new(SimulatedGateway::new(outcome.clone())),
        Arc::new(SimulatedGateway::default()),
        Arc::new(SimulatedGateway::new(outcome)),
    );

    let settings = PdfSettings {
        upload_retry_delay_ms: 1,
        logo_timeout_ms: 200,
        ..PdfSettings::default()
    };
    let pdf = PdfRenderer::new(Arc::new(EchoCompiler), storage.clone(), settings);

    let service = InvoiceService::new(
        repo.clone(),
        storage.clone(),
        gateway,
        pdf,
        mailer.clone(),
        ServiceOptions {
            default_test_mode: true,
            certificate_key: CERTIFICATE_KEY.to_string(),
        },
    );

    Harness {
        service: Arc::new(service),
        repo,
        storage,
        mailer,
    }
}

pub fn company() -> CompanySettings {
    CompanySettings {
        name: Some("Fumigadora Caribe SRL".to_string()),
        rnc: Some("131234567".to_string()),
        address: Some("Av. Churchill 12, Santo Domingo".to_string()),
        phone: Some("809-555-0100".to_string()),
        email: Some("facturas@fumigadora.do".to_string()),
        logo_url: None,
    }
}

pub fn client() -> Client {
    Client {
        id: "C1".to_string(),
        name: "Hotel Malecón".to_string(),
        rnc: Some("101000001".to_string()),
        address: Some("Malecón 5".to_string()),
        phone: None,
        email: Some("compras@hotel.do".to_string()),
    }
}

pub fn fumigation() -> InvoiceItem {
    InvoiceItem {
        description: "Fumigación".to_string(),
        quantity: 1.0,
        price: 1000.0,
        tax: Some(18.0),
    }
}

/// Empresa, cliente `C1` y certificado de desarrollo instalados.
pub async fn seeded(outcome: GatewayStatus) -> Harness {
    let h = harness(outcome);
    h.repo.save_company(&company()).await.unwrap();
    h.repo.save_client(&client()).await.unwrap();
    h.service
        .install_development_certificate(Some(&user()))
        .await
        .unwrap();
    h
}

/// Factura `pendiente` guardada directamente, sin procesamiento automático.
pub async fn pending_invoice(h: &Harness, id: &str) -> Invoice {
    let mut invoice: Invoice = serde_json::from_value(serde_json::json!({
        "id": id,
        "clientId": "C1",
        "client": "Hotel Malecón",
        "status": "pendiente",
        "ncf": format!("E31{:0>10}", id.len()),
        "date": "2024-01-15T10:30:00Z",
        "items": [{"description": "Fumigación", "quantity": 1, "price": 1000, "tax": 18}]
    }))
    .unwrap();
    invoice.recalculate_totals();
    h.repo.save_invoice(&invoice).await.unwrap();
    invoice
}

pub fn new_invoice(auto_process: bool, auto_send: bool) -> NewInvoice {
    NewInvoice {
        id: None,
        invoice_number: Some("F-0001".to_string()),
        ncf: Some("E310000000001".to_string()),
        client_id: "C1".to_string(),
        items: vec![fumigation()],
        date: None,
        auto_process,
        auto_send_to_dgii: auto_send,
    }
}
