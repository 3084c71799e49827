pub mod api;
pub mod boundary;
pub mod core;
pub mod ecf;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod pdf;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{AppConfig, EcfError, EcfResult};
pub use models::{Client, CompanySettings, Invoice, InvoiceItem, InvoiceStatus, NewInvoice};
pub use service::{Caller, InvoiceService, ServiceOptions};
