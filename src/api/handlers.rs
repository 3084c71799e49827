use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::{
    Client, CompanySettings, EcfSettings, InventoryFilter, InventoryItem, InvoiceStatus, NewInvoice,
};
use crate::service::Caller;
use super::error::{ApiError, ApiResult};
use super::state::ApiState;

/// Usuario autenticado por el middleware; aplica el límite de solicitudes.
fn caller(req: &HttpRequest, state: &ApiState) -> ApiResult<Option<Caller>> {
    let caller = req.extensions().get::<Caller>().cloned();

    if let Some(caller) = &caller {
        if state.rate_limiter.check_key(&caller.uid).is_err() {
            tracing::warn!("Límite de solicitudes excedido para {}", caller.uid);
            return Err(ApiError::too_many_requests());
        }
    }

    Ok(caller)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeRequest {
    pub test_mode: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    #[serde(default)]
    pub recipient_email: String,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub reason_code: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub filter: Option<InventoryFilter>,
    pub search: Option<String>,
}

pub async fn create_invoice(
    req: HttpRequest,
    body: web::Json<NewInvoice>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let created = state.service.create_invoice(caller.as_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "invoice": created.invoice,
        "processing": created.processing,
    })))
}

pub async fn list_invoices(
    req: HttpRequest,
    query: web::Query<InvoiceQuery>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;

    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            InvoiceStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Estado desconocido: {}", raw)))?,
        ),
        None => None,
    };

    let invoices = state
        .service
        .list_invoices(caller.as_ref(), status, query.search.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "invoices": invoices,
    })))
}

pub async fn get_invoice(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let invoice = state.service.get_invoice(caller.as_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "invoice": invoice,
    })))
}

pub async fn delete_invoice(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    state.service.delete_invoice(caller.as_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Factura eliminada",
    })))
}

pub async fn generate_pdf(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let result = state.service.generate_invoice_pdf(caller.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn send_email(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<EmailRequest>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let result = state
        .service
        .send_invoice_email(
            caller.as_ref(),
            &path,
            &body.recipient_email,
            body.subject.as_deref(),
            body.message.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

pub async fn send_to_dgii(
    req: HttpRequest,
    path: web::Path<String>,
    body: Option<web::Json<ModeRequest>>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let test_mode = body.and_then(|b| b.test_mode);
    let result = state
        .service
        .send_invoice_to_dgii(caller.as_ref(), &path, test_mode)
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

pub async fn invoice_status(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ModeRequest>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let result = state
        .service
        .check_invoice_status(caller.as_ref(), &path, query.test_mode)
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

pub async fn cancel_invoice(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CancelRequest>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let result = state
        .service
        .cancel_invoice(caller.as_ref(), &path, &body.reason_code, body.reason.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

pub async fn dgii_status(req: HttpRequest, state: web::Data<ApiState>) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let health = state.service.check_dgii_status(caller.as_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "status": health.status,
        "testMode": health.test_mode,
        "message": health.message,
    })))
}

pub async fn save_client(
    req: HttpRequest,
    body: web::Json<Client>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let client = state.service.save_client(caller.as_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "client": client })))
}

pub async fn get_client(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let client = state.service.get_client(caller.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "client": client })))
}

pub async fn list_inventory(
    req: HttpRequest,
    query: web::Query<InventoryQuery>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let report = state
        .service
        .list_inventory(caller.as_ref(), query.filter, query.search.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(report))
}

pub async fn save_inventory_item(
    req: HttpRequest,
    body: web::Json<InventoryItem>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let item = state
        .service
        .save_inventory_item(caller.as_ref(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "item": item })))
}

pub async fn delete_inventory_item(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    state.service.delete_inventory_item(caller.as_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Producto eliminado",
    })))
}

pub async fn update_company(
    req: HttpRequest,
    body: web::Json<CompanySettings>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let company = state
        .service
        .update_company_settings(caller.as_ref(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "company": company })))
}

pub async fn update_ecf(
    req: HttpRequest,
    body: web::Json<EcfSettings>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let settings = state
        .service
        .update_ecf_settings(caller.as_ref(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "settings": settings })))
}

pub async fn install_development_certificate(
    req: HttpRequest,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let caller = caller(&req, &state)?;
    let certificate = state
        .service
        .install_development_certificate(caller.as_ref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "certificate": certificate })))
}
