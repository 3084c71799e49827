//! Comprobante fiscal electrónico: generación del XML, firma, estados y el
//! canal hacia la DGII.

pub mod gateway;
pub mod http;
pub mod signer;
pub mod simulator;
pub mod status;
pub mod xml;

pub use gateway::{
    CancellationReceipt, DgiiGateway, GatewayClient, HealthReport, ServiceHealth, StatusReport,
    SubmissionReceipt,
};
pub use http::HttpGateway;
pub use simulator::SimulatedGateway;
pub use status::{transition, GatewayStatus, InvoiceEvent};
