use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ecf_facturacion::api::{configure_routes, ApiState};
use ecf_facturacion::core::{AppConfig, StorageBackend};
use ecf_facturacion::ecf::{GatewayClient, HttpGateway, SimulatedGateway};
use ecf_facturacion::notify::SmtpMailer;
use ecf_facturacion::pdf::{PdfRenderer, TypstCompiler};
use ecf_facturacion::service::{InvoiceService, ServiceOptions};
use ecf_facturacion::storage::{
    DocumentStore, MemoryStorage, MemoryStore, ObjectStorage, Repository, S3Storage, SqlStore,
};

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    tracing::info!("Iniciando servicio de facturación electrónica");

    prometheus::default_registry()
        .register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

    let config = AppConfig::load()?;
    let service = build_service(&config).await?;
    let state = web::Data::new(ApiState::new(Arc::new(service), config.auth.clone()));

    let host = config.server.host.clone();
    let port = config.server.port;
    tracing::info!("Servidor escuchando en {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<InvoiceService> {
    let documents: Arc<dyn DocumentStore> = if config.database.url == "memory" {
        tracing::warn!("Usando almacén de documentos en memoria");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqlStore::connect(&config.database.url).await?)
    };

    let storage: Arc<dyn ObjectStorage> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(S3Storage::new(&config.storage).await?),
        StorageBackend::Memory => {
            tracing::warn!("Usando almacenamiento de archivos en memoria");
            Arc::new(MemoryStorage::new(config.storage.public_base_url.clone()))
        }
    };

    let ecf = &config.ecf;
    let test_env = HttpGateway::new(
        ecf.test_base_url.clone(),
        ecf.request_timeout(),
        ecf.probe_timeout(),
        ecf.auth_token.clone(),
    )?;
    let production = HttpGateway::new(
        ecf.production_base_url.clone(),
        ecf.request_timeout(),
        ecf.probe_timeout(),
        ecf.auth_token.clone(),
    )?;
    tracing::info!(
        "DGII pruebas: {}, producción: {} (modo prueba por defecto: {})",
        test_env.base_url(),
        production.base_url(),
        ecf.test_mode
    );
    let gateway = GatewayClient::new(
        Arc::new(SimulatedGateway::accepting()),
        Arc::new(test_env),
        Arc::new(production),
    );

    let compiler = Arc::new(TypstCompiler::new(
        config.pdf.typst_bin.clone(),
        config.pdf.work_dir.clone(),
    ));
    let pdf = PdfRenderer::new(compiler, storage.clone(), config.pdf.clone());
    let mailer = Arc::new(SmtpMailer::new(&config.mail)?);

    Ok(InvoiceService::new(
        Repository::new(documents),
        storage,
        gateway,
        pdf,
        mailer,
        ServiceOptions::from(ecf),
    ))
}
