use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::core::{EcfError, EcfResult};
use super::gateway::{
    CancellationReceipt, DgiiGateway, HealthReport, ServiceHealth, StatusReport, SubmissionReceipt,
};
use super::status::GatewayStatus;

const RECEPTION_PATH: &str = "/recepcion/api/FacturasElectronicas";
const STATUS_PATH: &str = "/consultaresultado/api/consultas/estado";
const CANCELLATION_PATH: &str = "/emisorreceptor-ws/AnulacionDocumentos";
const HEALTH_PATH: &str = "/emisorreceptor-ws/EstatusDocumentosSolicitudes/status";

#[derive(Debug, Default, Deserialize)]
struct DgiiBody {
    #[serde(default, alias = "trackId", alias = "trackid")]
    track_id: Option<String>,
    #[serde(default)]
    estado: Option<String>,
    #[serde(default)]
    mensajes: Vec<DgiiMessage>,
}

#[derive(Debug, Deserialize)]
struct DgiiMessage {
    #[serde(default)]
    valor: String,
}

impl DgiiBody {
    fn message(&self) -> String {
        self.mensajes
            .iter()
            .map(|m| m.valor.as_str())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Cliente HTTP contra un ambiente de la DGII (`testecf` o `ecf`).
pub struct HttpGateway {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
    auth_token: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        probe_timeout: Duration,
        auth_token: Option<String>,
    ) -> EcfResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EcfError::internal(format!("No se pudo crear el cliente HTTP: {}", e)))?;

        Ok(HttpGateway {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            probe_timeout,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_body(response: reqwest::Response, action: &str) -> EcfResult<DgiiBody> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EcfError::internal(format!(
                "Error al {} en la DGII: {} {}",
                action,
                status.as_u16(),
                text
            )));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(DgiiBody::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| EcfError::internal(format!("Respuesta inesperada de la DGII: {}", e)))
    }
}

#[async_trait]
impl DgiiGateway for HttpGateway {
    async fn submit(&self, signed_xml: &str, filename: &str) -> EcfResult<SubmissionReceipt> {
        let request = self
            .client
            .post(self.url(RECEPTION_PATH))
            .header(header::CONTENT_TYPE, "application/xml")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            )
            .body(signed_xml.to_string());

        let response = self.authorized(request).send().await?;
        let body = Self::read_body(response, "enviar el comprobante").await?;

        let track_id = body
            .track_id
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EcfError::internal("La DGII no devolvió un trackId"))?;

        Ok(SubmissionReceipt {
            track_id,
            status: body.estado.clone().unwrap_or_else(|| "Recibido".to_string()),
            message: body.message(),
            received_at: Utc::now(),
        })
    }

    async fn check_status(&self, track_id: &str) -> EcfResult<StatusReport> {
        let request = self
            .client
            .get(self.url(STATUS_PATH))
            .query(&[("trackid", track_id)]);

        let response = self.authorized(request).send().await?;
        let body = Self::read_body(response, "consultar el estado").await?;

        Ok(StatusReport {
            track_id: track_id.to_string(),
            status: GatewayStatus::parse(body.estado.as_deref().unwrap_or_default()),
            message: body.message(),
            checked_at: Utc::now(),
        })
    }

    async fn submit_cancellation(&self, signed_xml: &str) -> EcfResult<CancellationReceipt> {
        let request = self
            .client
            .post(self.url(CANCELLATION_PATH))
            .header(header::CONTENT_TYPE, "application/xml")
            .body(signed_xml.to_string());

        let response = self.authorized(request).send().await?;
        let body = Self::read_body(response, "enviar la anulación").await?;

        Ok(CancellationReceipt {
            track_id: body
                .track_id
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("AN-{}", Utc::now().timestamp_millis())),
            message: body.message(),
        })
    }

    async fn probe(&self) -> HealthReport {
        let result = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.probe_timeout)
            .send()
            .await;

        match result {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(e) if e.is_timeout() => HealthReport {
                status: ServiceHealth::Degraded,
                message: "Tiempo de espera agotado al conectar con DGII".to_string(),
            },
            Err(e) => {
                tracing::warn!("Sondeo DGII falló: {}", e);
                HealthReport {
                    status: ServiceHealth::Offline,
                    message: format!("Error al conectar con DGII: {}", e),
                }
            }
        }
    }
}

/// Clasificación del código HTTP del sondeo de salud.
pub fn classify_status(code: u16) -> HealthReport {
    match code {
        200..=299 => HealthReport {
            status: ServiceHealth::Online,
            message: "Servicios DGII funcionando correctamente".to_string(),
        },
        500.. => HealthReport {
            status: ServiceHealth::Offline,
            message: format!("Error en el servidor DGII: {}", code),
        },
        _ => HealthReport {
            status: ServiceHealth::Degraded,
            message: format!("Respuesta inesperada: {}", code),
        },
    }
}
