use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::json;
use std::time::Duration;

use ecf_facturacion::ecf::{DgiiGateway, GatewayStatus, HttpGateway, ServiceHealth};

const HEALTH: &str = "/emisorreceptor-ws/EstatusDocumentosSolicitudes/status";

/// Levanta un servidor local con `routes` y devuelve su URL base.
fn serve<F>(routes: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(routes.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());
    format!("http://{}", addr)
}

fn gateway(base_url: &str, probe_timeout: Duration) -> HttpGateway {
    HttpGateway::new(base_url, Duration::from_secs(5), probe_timeout, None).unwrap()
}

#[actix_web::test]
async fn probe_reports_online_offline_and_degraded() {
    let online = serve(|cfg| {
        cfg.route(HEALTH, web::get().to(|| async { HttpResponse::Ok().finish() }));
    });
    let failing = serve(|cfg| {
        cfg.route(HEALTH, web::get().to(|| async { HttpResponse::ServiceUnavailable().finish() }));
    });
    let missing = serve(|_cfg| {});

    let timeout = Duration::from_secs(2);
    assert_eq!(gateway(&online, timeout).probe().await.status, ServiceHealth::Online);
    assert_eq!(gateway(&failing, timeout).probe().await.status, ServiceHealth::Offline);
    assert_eq!(gateway(&missing, timeout).probe().await.status, ServiceHealth::Degraded);
}

#[actix_web::test]
async fn slow_probe_is_degraded() {
    let slow = serve(|cfg| {
        cfg.route(
            HEALTH,
            web::get().to(|| async {
                actix_rt::time::sleep(Duration::from_secs(2)).await;
                HttpResponse::Ok().finish()
            }),
        );
    });

    let report = gateway(&slow, Duration::from_millis(100)).probe().await;
    assert_eq!(report.status, ServiceHealth::Degraded);
}

#[actix_web::test]
async fn unreachable_host_is_offline() {
    // Puerto reservado sin servicio: la conexión se rechaza.
    let report = gateway("http://127.0.0.1:9", Duration::from_secs(2)).probe().await;
    assert_eq!(report.status, ServiceHealth::Offline);
}

#[actix_web::test]
async fn submit_and_query_against_dgii_shape() {
    let base = serve(|cfg| {
        cfg.route(
            "/recepcion/api/FacturasElectronicas",
            web::post().to(|| async {
                HttpResponse::Ok().json(json!({"trackId": "T-123", "mensajes": [{"valor": "Recibido"}]}))
            }),
        )
        .route(
            "/consultaresultado/api/consultas/estado",
            web::get().to(|| async {
                HttpResponse::Ok().json(json!({"trackId": "T-123", "estado": "Rechazado"}))
            }),
        )
        .route(
            "/emisorreceptor-ws/AnulacionDocumentos",
            web::post().to(|| async { HttpResponse::Ok().finish() }),
        );
    });
    let gateway = gateway(&base, Duration::from_secs(2));

    let receipt = gateway.submit("<ECF/>", "131234567E310000000001.xml").await.unwrap();
    assert_eq!(receipt.track_id, "T-123");
    assert_eq!(receipt.message, "Recibido");

    let report = gateway.check_status("T-123").await.unwrap();
    assert_eq!(report.status, GatewayStatus::Rechazado);

    let cancellation = gateway.submit_cancellation("<Anulacion/>").await.unwrap();
    assert!(cancellation.track_id.starts_with("AN-"));
}

#[actix_web::test]
async fn gateway_errors_are_internal() {
    let base = serve(|cfg| {
        cfg.route(
            "/recepcion/api/FacturasElectronicas",
            web::post().to(|| async { HttpResponse::BadRequest().body("XML inválido") }),
        );
    });

    let err = gateway(&base, Duration::from_secs(2))
        .submit("<ECF/>", "doc.xml")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "internal");
    assert!(err.to_string().contains("400"));
}
