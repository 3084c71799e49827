use actix_cors::Cors;
use actix_web::{web, HttpResponse};
use tracing_actix_web::TracingLogger;

use super::handlers;
use super::middleware::auth::create_auth_middleware;
use super::ApiError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Salud y métricas
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_endpoint))

        // API v1
        .service(
            web::scope("/api/v1")
                .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                    ApiError::bad_request(format!("Cuerpo de solicitud inválido: {}", err)).into()
                }))
                .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                    ApiError::bad_request(format!("Parámetros inválidos: {}", err)).into()
                }))
                .wrap(create_auth_middleware())
                .wrap(TracingLogger::default())
                .wrap(
                    Cors::default()
                        .allowed_origin_fn(|origin, _req_head| {
                            origin.as_bytes().starts_with(b"http://localhost") ||
                            origin.as_bytes().starts_with(b"https://")
                        })
                        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                        .allowed_headers(vec!["Content-Type", "Authorization"])
                        .max_age(3600)
                )

                .service(
                    web::scope("/invoices")
                        .route("", web::post().to(handlers::create_invoice))
                        .route("", web::get().to(handlers::list_invoices))
                        .route("/{id}", web::get().to(handlers::get_invoice))
                        .route("/{id}", web::delete().to(handlers::delete_invoice))
                        .route("/{id}/pdf", web::post().to(handlers::generate_pdf))
                        .route("/{id}/email", web::post().to(handlers::send_email))
                        .route("/{id}/dgii", web::post().to(handlers::send_to_dgii))
                        .route("/{id}/status", web::get().to(handlers::invoice_status))
                        .route("/{id}/cancel", web::post().to(handlers::cancel_invoice))
                )

                .route("/dgii/status", web::get().to(handlers::dgii_status))

                .service(
                    web::scope("/clients")
                        .route("", web::post().to(handlers::save_client))
                        .route("/{id}", web::get().to(handlers::get_client))
                )

                .service(
                    web::scope("/inventory")
                        .route("", web::get().to(handlers::list_inventory))
                        .route("", web::post().to(handlers::save_inventory_item))
                        .route("/{id}", web::delete().to(handlers::delete_inventory_item))
                )

                .service(
                    web::scope("/settings")
                        .route("/company", web::put().to(handlers::update_company))
                        .route("/ecf", web::put().to(handlers::update_ecf))
                        .route(
                            "/certificate/development",
                            web::post().to(handlers::install_development_certificate),
                        )
                )
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

async fn metrics_endpoint() -> HttpResponse {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("No se pudieron codificar las métricas: {}", e);
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}
