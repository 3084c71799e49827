use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::core::EcfResult;
use super::status::GatewayStatus;

/// Respuesta de la DGII al recibir un e-CF.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub track_id: String,
    pub status: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub track_id: String,
    #[serde(serialize_with = "serialize_gateway_status")]
    pub status: GatewayStatus,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

fn serialize_gateway_status<S: serde::Serializer>(status: &GatewayStatus, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(status.as_str())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationReceipt {
    pub track_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    Online,
    Degraded,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: ServiceHealth,
    pub message: String,
}

/// Canal hacia los servicios de la DGII (real o simulado).
#[async_trait]
pub trait DgiiGateway: Send + Sync {
    async fn submit(&self, signed_xml: &str, filename: &str) -> EcfResult<SubmissionReceipt>;

    async fn check_status(&self, track_id: &str) -> EcfResult<StatusReport>;

    async fn submit_cancellation(&self, signed_xml: &str) -> EcfResult<CancellationReceipt>;

    /// Sondeo de disponibilidad; nunca falla, clasifica el resultado.
    async fn probe(&self) -> HealthReport;
}

/// Elige el canal según `testMode`.
///
/// Envíos, consultas y anulaciones van al simulador en modo prueba y a
/// producción en caso contrario. El sondeo de salud usa el ambiente de
/// pruebas de la DGII (no el simulador) cuando `testMode` es verdadero.
#[derive(Clone)]
pub struct GatewayClient {
    simulator: Arc<dyn DgiiGateway>,
    test_env: Arc<dyn DgiiGateway>,
    production: Arc<dyn DgiiGateway>,
}

impl GatewayClient {
    pub fn new(
        simulator: Arc<dyn DgiiGateway>,
        test_env: Arc<dyn DgiiGateway>,
        production: Arc<dyn DgiiGateway>,
    ) -> Self {
        GatewayClient {
            simulator,
            test_env,
            production,
        }
    }

    pub fn for_mode(&self, test_mode: bool) -> &dyn DgiiGateway {
        if test_mode {
            self.simulator.as_ref()
        } else {
            self.production.as_ref()
        }
    }

    pub async fn probe(&self, test_mode: bool) -> HealthReport {
        if test_mode {
            self.test_env.probe().await
        } else {
            self.production.probe().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecf::simulator::SimulatedGateway;

    struct FixedProbe(ServiceHealth);

    #[async_trait]
    impl DgiiGateway for FixedProbe {
        async fn submit(&self, _xml: &str, _filename: &str) -> EcfResult<SubmissionReceipt> {
            Err(crate::core::EcfError::internal("sin envíos"))
        }

        async fn check_status(&self, _track_id: &str) -> EcfResult<StatusReport> {
            Err(crate::core::EcfError::internal("sin consultas"))
        }

        async fn submit_cancellation(&self, _xml: &str) -> EcfResult<CancellationReceipt> {
            Err(crate::core::EcfError::internal("sin anulaciones"))
        }

        async fn probe(&self) -> HealthReport {
            HealthReport {
                status: self.0,
                message: String::new(),
            }
        }
    }

    fn client() -> GatewayClient {
        GatewayClient::new(
            Arc::new(SimulatedGateway::accepting()),
            Arc::new(FixedProbe(ServiceHealth::Degraded)),
            Arc::new(FixedProbe(ServiceHealth::Offline)),
        )
    }

    #[tokio::test]
    async fn test_mode_submits_to_simulator() {
        let gateway = client();
        let receipt = gateway.for_mode(true).submit("<ECF/>", "x.xml").await.unwrap();
        assert!(receipt.track_id.starts_with("SIM-"));
        assert!(gateway.for_mode(false).submit("<ECF/>", "x.xml").await.is_err());
    }

    #[tokio::test]
    async fn probe_routes_by_environment() {
        let gateway = client();
        assert_eq!(gateway.probe(true).await.status, ServiceHealth::Degraded);
        assert_eq!(gateway.probe(false).await.status, ServiceHealth::Offline);
    }

    #[test]
    fn status_report_serializes_raw_status() {
        let report = StatusReport {
            track_id: "SIM-1".to_string(),
            status: GatewayStatus::Pending("En Proceso".to_string()),
            message: String::new(),
            checked_at: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "En Proceso");
        assert_eq!(json["trackId"], "SIM-1");
    }
}
