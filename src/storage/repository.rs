use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::core::{EcfError, EcfResult};
use crate::models::{
    CertificateRecord, Client, CompanySettings, EcfSettings, InventoryItem, Invoice,
    InvoiceEventRecord,
};
use super::documents::DocumentStore;

pub const INVOICES: &str = "invoices";
pub const CLIENTS: &str = "clients";
pub const INVENTORY: &str = "inventory";
pub const SETTINGS: &str = "settings";
pub const CONFIG: &str = "config";
pub const INVOICE_EVENTS: &str = "invoiceEvents";

const COMPANY_DOC: &str = "company";
const CERTIFICATE_DOC: &str = "certificate";
const ECF_DOC: &str = "ecf";

/// Acceso tipado a las colecciones del sistema de facturación.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Repository { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn read<T: DeserializeOwned>(&self, collection: &str, id: &str) -> EcfResult<Option<T>> {
        match self.store.get(collection, id).await? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                EcfError::internal(format!("Documento {}/{} inválido: {}", collection, id, e))
            }),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> EcfResult<()> {
        self.store.set(collection, id, serde_json::to_value(value)?).await
    }

    async fn read_all<T: DeserializeOwned>(&self, collection: &str) -> EcfResult<Vec<T>> {
        self.store
            .list(collection)
            .await?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    EcfError::internal(format!("Documento inválido en {}: {}", collection, e))
                })
            })
            .collect()
    }

    // Facturas

    pub async fn find_invoice(&self, id: &str) -> EcfResult<Option<Invoice>> {
        self.read(INVOICES, id).await
    }

    pub async fn invoice(&self, id: &str) -> EcfResult<Invoice> {
        self.find_invoice(id)
            .await?
            .ok_or_else(|| EcfError::not_found("La factura especificada no existe."))
    }

    pub async fn save_invoice(&self, invoice: &Invoice) -> EcfResult<()> {
        self.write(INVOICES, &invoice.id, invoice).await
    }

    pub async fn list_invoices(&self) -> EcfResult<Vec<Invoice>> {
        self.read_all(INVOICES).await
    }

    pub async fn delete_invoice(&self, id: &str) -> EcfResult<bool> {
        self.store.delete(INVOICES, id).await
    }

    // Clientes

    pub async fn find_client(&self, id: &str) -> EcfResult<Option<Client>> {
        self.read(CLIENTS, id).await
    }

    pub async fn client(&self, id: &str) -> EcfResult<Client> {
        self.find_client(id)
            .await?
            .ok_or_else(|| EcfError::not_found("El cliente especificado no existe."))
    }

    pub async fn save_client(&self, client: &Client) -> EcfResult<()> {
        self.write(CLIENTS, &client.id, client).await
    }

    // Inventario

    pub async fn list_inventory(&self) -> EcfResult<Vec<InventoryItem>> {
        self.read_all(INVENTORY).await
    }

    pub async fn save_inventory_item(&self, item: &InventoryItem) -> EcfResult<()> {
        self.write(INVENTORY, &item.id, item).await
    }

    pub async fn delete_inventory_item(&self, id: &str) -> EcfResult<bool> {
        self.store.delete(INVENTORY, id).await
    }

    // Configuración

    pub async fn find_company(&self) -> EcfResult<Option<CompanySettings>> {
        self.read(SETTINGS, COMPANY_DOC).await
    }

    /// Datos de la empresa; vacíos si aún no se configuraron.
    pub async fn company(&self) -> EcfResult<CompanySettings> {
        Ok(self.find_company().await?.unwrap_or_default())
    }

    pub async fn save_company(&self, company: &CompanySettings) -> EcfResult<()> {
        self.write(SETTINGS, COMPANY_DOC, company).await
    }

    pub async fn certificate(&self) -> EcfResult<Option<CertificateRecord>> {
        self.read(SETTINGS, CERTIFICATE_DOC).await
    }

    pub async fn save_certificate(&self, certificate: &CertificateRecord) -> EcfResult<()> {
        self.write(SETTINGS, CERTIFICATE_DOC, certificate).await
    }

    pub async fn ecf_settings(&self) -> EcfResult<EcfSettings> {
        Ok(self.read(CONFIG, ECF_DOC).await?.unwrap_or_default())
    }

    pub async fn save_ecf_settings(&self, settings: &EcfSettings) -> EcfResult<()> {
        self.write(CONFIG, ECF_DOC, settings).await
    }

    // Auditoría

    pub async fn append_event(&self, event: &InvoiceEventRecord) -> EcfResult<()> {
        self.write(INVOICE_EVENTS, &event.id, event).await
    }

    pub async fn invoice_events(&self, invoice_id: &str) -> EcfResult<Vec<InvoiceEventRecord>> {
        let events: Vec<InvoiceEventRecord> = self.read_all(INVOICE_EVENTS).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.invoice_id == invoice_id)
            .collect())
    }
}
