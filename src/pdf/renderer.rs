use std::sync::Arc;
use std::time::Duration;

use crate::boundary::Boundary;
use crate::core::{EcfError, EcfResult, PdfConfig, PdfSettings};
use crate::metrics;
use crate::models::{Client, CompanySettings, Invoice};
use crate::storage::ObjectStorage;
use super::generator::{Asset, PdfCompiler};
use super::layout::{logo_image, InvoiceLayout, LogoBoundary};
use super::qr;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Clave del PDF de una factura en el almacenamiento.
pub fn pdf_key(invoice_id: &str) -> String {
    format!("invoices/{}.pdf", invoice_id)
}

/// Arma el layout, compila el PDF y lo sube con reintentos.
pub struct PdfRenderer {
    compiler: Arc<dyn PdfCompiler>,
    storage: Arc<dyn ObjectStorage>,
    http: reqwest::Client,
    settings: PdfSettings,
    page: PdfConfig,
}

impl PdfRenderer {
    pub fn new(
        compiler: Arc<dyn PdfCompiler>,
        storage: Arc<dyn ObjectStorage>,
        settings: PdfSettings,
    ) -> Self {
        PdfRenderer {
            compiler,
            storage,
            http: reqwest::Client::new(),
            page: PdfConfig::from(&settings),
            settings,
        }
    }

    pub async fn render(
        &self,
        invoice: &Invoice,
        company: &CompanySettings,
        client: Option<&Client>,
    ) -> EcfResult<Vec<u8>> {
        let mut assets = Vec::new();

        let fetched = match company.logo_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Some(self.fetch_logo(url).await),
            None => None,
        };
        let logo = LogoBoundary.render(|| {
            let bytes = match fetched {
                Some(result) => result?,
                None => return Err(EcfError::not_found("La empresa no tiene logo configurado")),
            };
            let format = image::guess_format(&bytes)
                .map_err(|e| EcfError::invalid_argument(format!("El logo no es una imagen válida: {}", e)))?;
            let extension = format.extensions_str().first().copied().unwrap_or("png");
            let name = format!("logo.{}", extension);
            assets.push(Asset {
                name: name.clone(),
                bytes,
            });
            Ok(logo_image(&name))
        });

        let qr_asset = match qr::stamp_url(invoice, company, client) {
            Some(url) => match qr::qr_png(&url) {
                Ok(png) => {
                    assets.push(Asset {
                        name: "qr.png".to_string(),
                        bytes: png,
                    });
                    Some("qr.png".to_string())
                }
                Err(e) => {
                    tracing::warn!("Factura {} sin QR: {}", invoice.id, e);
                    None
                }
            },
            None => None,
        };

        let source = InvoiceLayout {
            invoice,
            company,
            client,
            logo,
            qr_asset,
            page: self.page.clone(),
        }
        .to_typst();

        let pdf = self.compiler.compile(&source, &assets).await?;
        metrics::PDF_GENERATED.inc();
        Ok(pdf)
    }

    async fn fetch_logo(&self, url: &str) -> EcfResult<Vec<u8>> {
        if !url.starts_with("http") {
            return Err(EcfError::invalid_argument("URL del logo inválida"));
        }

        let timeout = Duration::from_millis(self.settings.logo_timeout_ms);
        let download = async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            Ok::<_, reqwest::Error>(response.bytes().await?.to_vec())
        };

        match tokio::time::timeout(timeout, download).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(EcfError::internal("Tiempo de espera agotado al cargar el logo")),
        }
    }

    /// Sube el PDF; reintenta hasta `upload_attempts` veces con una pausa fija.
    pub async fn upload(&self, key: &str, pdf: Vec<u8>) -> EcfResult<String> {
        let attempts = self.settings.upload_attempts.max(1);
        let delay = Duration::from_millis(self.settings.upload_retry_delay_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.storage.put(key, pdf.clone(), PDF_CONTENT_TYPE).await {
                Ok(url) => {
                    tracing::info!("PDF subido en el intento {}: {}", attempt, key);
                    return Ok(url);
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Error al subir PDF (intento {}/{}): {}",
                        attempt,
                        attempts,
                        e
                    );
                    metrics::PDF_UPLOAD_RETRIES.inc();
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!("No se pudo subir el PDF {} tras {} intentos: {}", key, attempts, e);
                    return Err(e);
                }
            }
        }
    }

    /// Genera y sube el PDF de la factura; devuelve la URL.
    pub async fn render_and_upload(
        &self,
        invoice: &Invoice,
        company: &CompanySettings,
        client: Option<&Client>,
    ) -> EcfResult<String> {
        let pdf = self.render(invoice, company, client).await?;
        self.upload(&pdf_key(&invoice.id), pdf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CapturingCompiler {
        sources: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl PdfCompiler for CapturingCompiler {
        async fn compile(&self, source: &str, assets: &[Asset]) -> EcfResult<Vec<u8>> {
            let names = assets.iter().map(|a| a.name.clone()).collect();
            self.sources.lock().unwrap().push((source.to_string(), names));
            Ok(b"%PDF-1.7".to_vec())
        }
    }

    struct FlakyStorage {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStorage for FlakyStorage {
        async fn put(&self, key: &str, _data: Vec<u8>, _content_type: &str) -> EcfResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(EcfError::internal("almacenamiento no disponible"))
            } else {
                Ok(format!("memory://{}", key))
            }
        }

        async fn get(&self, _key: &str) -> EcfResult<Vec<u8>> {
            Err(EcfError::not_found("nada"))
        }

        async fn delete(&self, _key: &str) -> EcfResult<()> {
            Ok(())
        }
    }

    fn renderer(failures: usize) -> (PdfRenderer, Arc<CapturingCompiler>, Arc<FlakyStorage>) {
        let compiler = Arc::new(CapturingCompiler {
            sources: Mutex::new(Vec::new()),
        });
        let storage = Arc::new(FlakyStorage {
            failures,
            calls: AtomicUsize::new(0),
        });
        let settings = PdfSettings {
            upload_retry_delay_ms: 1,
            logo_timeout_ms: 200,
            ..PdfSettings::default()
        };
        (
            PdfRenderer::new(compiler.clone(), storage.clone(), settings),
            compiler,
            storage,
        )
    }

    fn invoice(ncf: Option<&str>) -> Invoice {
        serde_json::from_value(serde_json::json!({
            "id": "INV1",
            "clientId": "C1",
            "ncf": ncf,
            "total": 1180.0
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn upload_succeeds_on_third_attempt() {
        let (renderer, _, storage) = renderer(2);
        let url = renderer.upload("invoices/INV1.pdf", b"%PDF".to_vec()).await.unwrap();
        assert_eq!(url, "memory://invoices/INV1.pdf");
        assert_eq!(storage.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn upload_gives_up_after_three_attempts() {
        let (renderer, _, storage) = renderer(5);
        let err = renderer.upload("invoices/INV1.pdf", b"%PDF".to_vec()).await.unwrap_err();
        assert_eq!(err.code(), "internal");
        assert_eq!(storage.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalid_logo_url_renders_placeholder() {
        let (renderer, compiler, _) = renderer(0);
        let company = CompanySettings {
            logo_url: Some("ftp://logo".to_string()),
            ..Default::default()
        };

        let pdf = renderer.render(&invoice(None), &company, None).await.unwrap();
        assert_eq!(pdf, b"%PDF-1.7");

        let sources = compiler.sources.lock().unwrap();
        let (source, assets) = &sources[0];
        assert!(source.contains("LOGO"));
        assert!(assets.is_empty());
    }

    #[tokio::test]
    async fn ncf_adds_qr_asset() {
        let (renderer, compiler, _) = renderer(0);
        renderer
            .render(&invoice(Some("E310000000001")), &CompanySettings::default(), None)
            .await
            .unwrap();

        let sources = compiler.sources.lock().unwrap();
        assert_eq!(sources[0].1, vec!["qr.png".to_string()]);
        assert!(sources[0].0.contains("qr.png"));
    }
}
