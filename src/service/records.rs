use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{EcfError, EcfResult};
use crate::models::{
    Client, CompanySettings, InventoryFilter, InventoryItem, InventoryReport, Invoice,
    InvoiceStatus, NewInvoice,
};
use crate::pdf::pdf_key;

use super::{authorize, required, Caller, CreatedInvoice, InvoiceService};

/// Resultado del procesamiento automático de una factura nueva.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerReport {
    /// La factura no cumplía las condiciones para procesarse.
    pub skipped: bool,
    pub pdf_url: Option<String>,
    pub track_id: Option<String>,
    pub errors: Vec<String>,
}

fn validate_new_invoice(input: &NewInvoice) -> EcfResult<()> {
    required(&input.client_id, "Se requiere el cliente de la factura.")?;

    if input.items.is_empty() {
        return Err(EcfError::invalid_argument("La factura debe tener al menos un item."));
    }

    for (index, item) in input.items.iter().enumerate() {
        let line = index + 1;
        if item.description.trim().is_empty() {
            return Err(EcfError::invalid_argument(format!(
                "El item {} no tiene descripción.",
                line
            )));
        }
        if !(item.quantity > 0.0) {
            return Err(EcfError::invalid_argument(format!(
                "La cantidad del item {} debe ser mayor que cero.",
                line
            )));
        }
        if !(item.price >= 0.0) || item.tax.map(|t| !(t >= 0.0)).unwrap_or(false) {
            return Err(EcfError::invalid_argument(format!(
                "El precio o el ITBIS del item {} no es válido.",
                line
            )));
        }
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl InvoiceService {
    /// Registra una factura `pendiente` y ejecuta el procesamiento automático.
    pub async fn create_invoice(
        &self,
        caller: Option<&Caller>,
        input: NewInvoice,
    ) -> EcfResult<CreatedInvoice> {
        authorize(caller)?;
        validate_new_invoice(&input)?;

        let client = self.repo.client(input.client_id.trim()).await?;

        let id = non_empty(input.id).unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.repo.find_invoice(&id).await?.is_some() {
            return Err(EcfError::invalid_argument(format!(
                "Ya existe una factura con el ID {}.",
                id
            )));
        }

        let mut invoice = Invoice {
            id,
            invoice_number: non_empty(input.invoice_number),
            ncf: non_empty(input.ncf),
            client_id: client.id.clone(),
            client: Some(client.name.clone()),
            rnc: client.rnc.clone(),
            items: input.items,
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            date: Some(input.date.unwrap_or_else(Utc::now)),
            status: InvoiceStatus::Pendiente,
            track_id: None,
            pdf_url: None,
            pdf_generated_date: None,
            xml_url: None,
            dgii_submission_date: None,
            dgii_response: None,
            dgii_status_date: None,
            dgii_status_response: None,
            cancellation: None,
            email_sent: false,
            email_sent_date: None,
            email_recipient: None,
            auto_process: input.auto_process,
            auto_send_to_dgii: input.auto_send_to_dgii,
        };
        invoice.recalculate_totals();
        self.repo.save_invoice(&invoice).await?;

        tracing::info!(
            "Factura {} registrada para {} (total {:.2})",
            invoice.id,
            client.name,
            invoice.total
        );

        let processing = self.on_invoice_created(&invoice).await;
        let invoice = self.repo.invoice(&invoice.id).await?;

        Ok(CreatedInvoice { invoice, processing })
    }

    /// Procesamiento al crear una factura: PDF y, si se pidió, envío a la DGII
    /// en modo de prueba. Los errores se registran y se reportan, nunca se
    /// propagan.
    pub async fn on_invoice_created(&self, invoice: &Invoice) -> TriggerReport {
        let mut report = TriggerReport::default();

        if invoice.status != InvoiceStatus::Pendiente || !invoice.auto_process {
            tracing::debug!("Factura {} sin procesamiento automático", invoice.id);
            report.skipped = true;
            return report;
        }

        let system = Caller::system();

        match self.generate_invoice_pdf(Some(&system), &invoice.id).await {
            Ok(result) => report.pdf_url = Some(result.pdf_url),
            Err(e) => {
                tracing::error!("Error al generar el PDF de la factura {}: {}", invoice.id, e);
                report.errors.push(e.to_string());
                return report;
            }
        }

        if invoice.auto_send_to_dgii {
            match self.send_invoice_to_dgii(Some(&system), &invoice.id, Some(true)).await {
                Ok(result) => report.track_id = Some(result.track_id),
                Err(e) => {
                    tracing::error!("Error al enviar automáticamente la factura {}: {}", invoice.id, e);
                    report.errors.push(e.to_string());
                }
            }
        }

        report
    }

    /// Facturas ordenadas de la más reciente a la más antigua.
    pub async fn list_invoices(
        &self,
        caller: Option<&Caller>,
        status: Option<InvoiceStatus>,
        search: Option<&str>,
    ) -> EcfResult<Vec<Invoice>> {
        authorize(caller)?;

        let mut invoices: Vec<Invoice> = self
            .repo
            .list_invoices()
            .await?
            .into_iter()
            .filter(|i| status.map(|s| i.status == s).unwrap_or(true))
            .filter(|i| search.map(|term| i.matches_search(term)).unwrap_or(true))
            .collect();

        invoices.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(invoices)
    }

    pub async fn get_invoice(&self, caller: Option<&Caller>, invoice_id: &str) -> EcfResult<Invoice> {
        authorize(caller)?;
        let invoice_id = required(invoice_id, "Se requiere ID de factura.")?;
        self.repo.invoice(invoice_id).await
    }

    /// Solo se eliminan facturas que no han salido hacia la DGII.
    pub async fn delete_invoice(&self, caller: Option<&Caller>, invoice_id: &str) -> EcfResult<()> {
        authorize(caller)?;
        let invoice_id = required(invoice_id, "Se requiere ID de factura.")?;

        let invoice = self.repo.invoice(invoice_id).await?;
        if invoice.status != InvoiceStatus::Pendiente {
            return Err(EcfError::failed_precondition(format!(
                "Solo se pueden eliminar facturas pendientes (estado actual: {})",
                invoice.status
            )));
        }

        self.repo.delete_invoice(invoice_id).await?;
        if invoice.pdf_url.is_some() {
            if let Err(e) = self.storage.delete(&pdf_key(invoice_id)).await {
                tracing::warn!("No se pudo eliminar el PDF de la factura {}: {}", invoice_id, e);
            }
        }
        tracing::info!("Factura {} eliminada", invoice_id);
        Ok(())
    }

    pub async fn save_client(&self, caller: Option<&Caller>, mut client: Client) -> EcfResult<Client> {
        authorize(caller)?;
        required(&client.name, "Se requiere el nombre del cliente.")?;

        client.name = client.name.trim().to_string();
        if client.id.trim().is_empty() {
            client.id = Uuid::new_v4().to_string();
        }
        client.rnc = non_empty(client.rnc);
        client.address = non_empty(client.address);
        client.phone = non_empty(client.phone);
        client.email = non_empty(client.email);

        self.repo.save_client(&client).await?;
        Ok(client)
    }

    pub async fn get_client(&self, caller: Option<&Caller>, client_id: &str) -> EcfResult<Client> {
        authorize(caller)?;
        let client_id = required(client_id, "Se requiere ID de cliente.")?;
        self.repo.client(client_id).await
    }

    pub async fn list_inventory(
        &self,
        caller: Option<&Caller>,
        filter: Option<InventoryFilter>,
        search: Option<&str>,
    ) -> EcfResult<InventoryReport> {
        authorize(caller)?;
        let items = self.repo.list_inventory().await?;
        Ok(InventoryReport::build(items, filter, search, Utc::now()))
    }

    pub async fn save_inventory_item(
        &self,
        caller: Option<&Caller>,
        mut item: InventoryItem,
    ) -> EcfResult<InventoryItem> {
        authorize(caller)?;
        required(&item.name, "Se requiere el nombre del producto.")?;
        required(&item.lot, "Se requiere el lote del producto.")?;
        if item.quantity < 0.0 {
            return Err(EcfError::invalid_argument("La cantidad no puede ser negativa."));
        }

        if item.id.trim().is_empty() {
            item.id = Uuid::new_v4().to_string();
        }
        self.repo.save_inventory_item(&item).await?;
        Ok(item)
    }

    pub async fn delete_inventory_item(&self, caller: Option<&Caller>, item_id: &str) -> EcfResult<()> {
        authorize(caller)?;
        let item_id = required(item_id, "Se requiere ID del producto.")?;

        if !self.repo.delete_inventory_item(item_id).await? {
            return Err(EcfError::not_found("Producto no encontrado"));
        }
        tracing::info!("Producto {} eliminado del inventario", item_id);
        Ok(())
    }

    /// Reemplaza los datos de la empresa emisora.
    pub async fn update_company_settings(
        &self,
        caller: Option<&Caller>,
        company: CompanySettings,
    ) -> EcfResult<CompanySettings> {
        authorize(caller)?;

        let company = CompanySettings {
            name: non_empty(company.name),
            rnc: non_empty(company.rnc),
            address: non_empty(company.address),
            phone: non_empty(company.phone),
            email: non_empty(company.email),
            logo_url: non_empty(company.logo_url),
        };
        if let Some(rnc) = company.rnc.as_deref() {
            if !rnc.chars().all(|c| c.is_ascii_digit() || c == '-') {
                return Err(EcfError::invalid_argument("El RNC solo puede contener dígitos."));
            }
        }

        self.repo.save_company(&company).await?;
        tracing::info!("Datos de la empresa actualizados ({})", company.display_name());
        Ok(company)
    }
}
