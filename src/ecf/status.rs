use serde::{Deserialize, Serialize};

use crate::core::{EcfError, EcfResult};
use crate::models::InvoiceStatus;

/// Estado que reporta la DGII para un trackId.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    Aceptado,
    Rechazado,
    /// Cualquier otra respuesta (`En Proceso`, `Aceptado Condicional`, ...).
    Pending(String),
}

impl GatewayStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Aceptado" => GatewayStatus::Aceptado,
            "Rechazado" => GatewayStatus::Rechazado,
            other => GatewayStatus::Pending(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayStatus::Aceptado => "Aceptado",
            GatewayStatus::Rechazado => "Rechazado",
            GatewayStatus::Pending(raw) => raw,
        }
    }
}

/// Eventos que mueven una factura entre estados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceEvent {
    Submitted,
    StatusReported(GatewayStatus),
    Cancelled,
}

/// Estado resultante de aplicar `event` sobre `current`.
///
/// Solo existen las aristas `pendiente → enviada`, `enviada → aceptada |
/// rechazada | enviada` y `aceptada → anulada`; cualquier otra combinación
/// es un `failed-precondition` y el estado no cambia.
pub fn transition(current: InvoiceStatus, event: &InvoiceEvent) -> EcfResult<InvoiceStatus> {
    use InvoiceStatus::*;

    match (current, event) {
        (Pendiente, InvoiceEvent::Submitted) => Ok(Enviada),
        (Enviada, InvoiceEvent::StatusReported(status)) => Ok(match status {
            GatewayStatus::Aceptado => Aceptada,
            GatewayStatus::Rechazado => Rechazada,
            GatewayStatus::Pending(_) => Enviada,
        }),
        (Aceptada, InvoiceEvent::Cancelled) => Ok(Anulada),

        (Anulada, InvoiceEvent::Cancelled) => Err(EcfError::failed_precondition(
            "La factura ya está anulada",
        )),
        (_, InvoiceEvent::Cancelled) => Err(EcfError::failed_precondition(
            "Solo se pueden anular facturas que hayan sido aceptadas por la DGII",
        )),
        (status, InvoiceEvent::Submitted) => Err(EcfError::failed_precondition(format!(
            "Solo se pueden enviar a la DGII facturas pendientes (estado actual: {})",
            status
        ))),
        (status, InvoiceEvent::StatusReported(_)) => Err(EcfError::failed_precondition(format!(
            "La factura no está esperando respuesta de la DGII (estado actual: {})",
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InvoiceStatus::*;

    const ALL: [InvoiceStatus; 5] = [Pendiente, Enviada, Aceptada, Rechazada, Anulada];

    #[test]
    fn submit_only_from_pendiente() {
        for status in ALL {
            let result = transition(status, &InvoiceEvent::Submitted);
            if status == Pendiente {
                assert_eq!(result.unwrap(), Enviada);
            } else {
                assert_eq!(result.unwrap_err().code(), "failed-precondition");
            }
        }
    }

    #[test]
    fn cancel_only_from_aceptada() {
        for status in ALL {
            let result = transition(status, &InvoiceEvent::Cancelled);
            if status == Aceptada {
                assert_eq!(result.unwrap(), Anulada);
            } else {
                assert_eq!(result.unwrap_err().code(), "failed-precondition");
            }
        }
    }

    #[test]
    fn gateway_status_mapping() {
        let report = |raw: &str| InvoiceEvent::StatusReported(GatewayStatus::parse(raw));

        assert_eq!(transition(Enviada, &report("Aceptado")).unwrap(), Aceptada);
        assert_eq!(transition(Enviada, &report("Rechazado")).unwrap(), Rechazada);
        assert_eq!(transition(Enviada, &report("En Proceso")).unwrap(), Enviada);
        assert_eq!(transition(Enviada, &report("")).unwrap(), Enviada);
    }

    #[test]
    fn reports_do_not_regress_settled_invoices() {
        let event = InvoiceEvent::StatusReported(GatewayStatus::Rechazado);
        assert!(transition(Aceptada, &event).is_err());
        assert!(transition(Anulada, &event).is_err());
    }
}
