use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::{EcfError, EcfResult};
use super::gateway::{
    CancellationReceipt, DgiiGateway, HealthReport, ServiceHealth, StatusReport, SubmissionReceipt,
};
use super::status::GatewayStatus;

/// Gateway en proceso para `testMode`: responde de inmediato con un trackId
/// sintético y reporta siempre el mismo resultado en las consultas.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    outcome: GatewayStatus,
}

impl SimulatedGateway {
    pub fn new(outcome: GatewayStatus) -> Self {
        SimulatedGateway { outcome }
    }

    pub fn accepting() -> Self {
        Self::new(GatewayStatus::Aceptado)
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl DgiiGateway for SimulatedGateway {
    async fn submit(&self, signed_xml: &str, filename: &str) -> EcfResult<SubmissionReceipt> {
        if signed_xml.trim().is_empty() {
            return Err(EcfError::invalid_argument("No hay XML que enviar"));
        }

        let track_id = format!("SIM-{}", Uuid::new_v4());
        tracing::debug!("Simulador DGII recibió {} ({})", filename, track_id);

        Ok(SubmissionReceipt {
            track_id,
            status: "Recibido".to_string(),
            message: "Documento recibido por el simulador DGII".to_string(),
            received_at: Utc::now(),
        })
    }

    async fn check_status(&self, track_id: &str) -> EcfResult<StatusReport> {
        let message = match &self.outcome {
            GatewayStatus::Aceptado => "Comprobante aceptado".to_string(),
            GatewayStatus::Rechazado => "Comprobante rechazado".to_string(),
            GatewayStatus::Pending(raw) => format!("Comprobante en estado {}", raw),
        };

        Ok(StatusReport {
            track_id: track_id.to_string(),
            status: self.outcome.clone(),
            message,
            checked_at: Utc::now(),
        })
    }

    async fn submit_cancellation(&self, _signed_xml: &str) -> EcfResult<CancellationReceipt> {
        Ok(CancellationReceipt {
            track_id: format!("AN-SIM-{}", Utc::now().timestamp_millis()),
            message: "Anulación recibida por el simulador DGII".to_string(),
        })
    }

    async fn probe(&self) -> HealthReport {
        HealthReport {
            status: ServiceHealth::Online,
            message: "Simulador DGII disponible".to_string(),
        }
    }
}
