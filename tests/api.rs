mod common;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use common::*;
use ecf_facturacion::api::middleware::auth::issue_token;
use ecf_facturacion::api::{configure_routes, ApiState};
use ecf_facturacion::core::AuthConfig;
use ecf_facturacion::ecf::GatewayStatus;

const SECRET: &str = "secreto-de-pruebas";

fn state(h: &Harness, per_minute: u32, burst: u32) -> web::Data<ApiState> {
    web::Data::new(ApiState::new(
        h.service.clone(),
        AuthConfig {
            token_secret: SECRET.to_string(),
            rate_limit_per_minute: per_minute,
            rate_limit_burst: burst,
        },
    ))
}

fn bearer() -> (String, String) {
    let token = issue_token(SECRET, "user-1").unwrap();
    ("Authorization".to_string(), format!("Bearer {}", token))
}

#[actix_web::test]
async fn health_is_public() {
    let h = harness(GatewayStatus::Aceptado);
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn api_rejects_missing_or_forged_tokens() {
    let h = harness(GatewayStatus::Aceptado);
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/dgii/status").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["status"], 401);

    let forged = issue_token("otro-secreto", "user-1").unwrap();
    let req = test::TestRequest::get()
        .uri("/api/v1/dgii/status")
        .insert_header(("Authorization", format!("Bearer {}", forged)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unauthenticated");
    assert!(body["error"].as_str().is_some());
}

#[actix_web::test]
async fn malformed_bodies_use_error_shape() {
    let h = seeded(GatewayStatus::Aceptado).await;
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/invoices")
        .insert_header(bearer())
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "invalid-argument");
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("clientId"));

    let req = test::TestRequest::post()
        .uri("/api/v1/inventory")
        .insert_header(bearer())
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid-argument");
}

#[actix_web::test]
async fn inventory_items_can_be_deleted() {
    let h = harness(GatewayStatus::Aceptado);
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/inventory")
        .insert_header(bearer())
        .set_json(json!({
            "id": "P1",
            "lot": "L-77",
            "name": "Cipermetrina",
            "quantity": 12,
            "expiration": "2030-01-01T00:00:00Z"
        }))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::delete()
        .uri("/api/v1/inventory/P1")
        .insert_header(bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::delete()
        .uri("/api/v1/inventory/P1")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "not-found");
}

#[actix_web::test]
async fn submit_and_cancel_over_http() {
    let h = seeded(GatewayStatus::Aceptado).await;
    pending_invoice(&h, "INV1").await;
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/invoices/INV1/dgii")
        .insert_header(bearer())
        .set_json(json!({}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert!(body["trackId"].as_str().unwrap().starts_with("SIM-"));

    // Todavía `enviada`: la anulación se rechaza con 412.
    let req = test::TestRequest::post()
        .uri("/api/v1/invoices/INV1/cancel")
        .insert_header(bearer())
        .set_json(json!({"reasonCode": "01"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "failed-precondition");
    assert_eq!(body["status"], 412);

    let req = test::TestRequest::get()
        .uri("/api/v1/invoices/INV1/status")
        .insert_header(bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "aceptada");
    assert_eq!(body["dgiiStatus"], "Aceptado");

    let req = test::TestRequest::post()
        .uri("/api/v1/invoices/INV1/cancel")
        .insert_header(bearer())
        .set_json(json!({"reasonCode": "02"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn unknown_invoice_is_404() {
    let h = seeded(GatewayStatus::Aceptado).await;
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/invoices/NOPE/pdf")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "not-found");
}

#[actix_web::test]
async fn create_and_list_invoices() {
    let h = seeded(GatewayStatus::Aceptado).await;
    let app = test::init_service(
        App::new().app_data(state(&h, 100, 20)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/invoices")
        .insert_header(bearer())
        .set_json(json!({
            "clientId": "C1",
            "invoiceNumber": "F-0100",
            "items": [{"description": "Fumigación", "quantity": 2, "price": 500, "tax": 18}],
            "autoProcess": true
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["invoice"]["total"], 1180.0);
    assert_eq!(body["invoice"]["status"], "pendiente");
    assert!(body["processing"]["pdfUrl"].as_str().is_some());

    let req = test::TestRequest::get()
        .uri("/api/v1/invoices?status=pendiente")
        .insert_header(bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["invoices"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/invoices?status=pagada")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn rate_limit_applies_per_caller() {
    let h = harness(GatewayStatus::Aceptado);
    let app = test::init_service(
        App::new().app_data(state(&h, 1, 1)).configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/dgii/status")
        .insert_header(bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/dgii/status")
        .insert_header(bearer())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}
