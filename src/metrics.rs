use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

/// Envíos a la DGII por resultado (`ok` / `error`).
pub static DGII_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ecf_dgii_submissions_total",
        "Comprobantes enviados a la DGII",
        &["result"]
    )
    .expect("registro de métrica ecf_dgii_submissions_total")
});

/// Consultas de estado por estado resultante de la factura.
pub static STATUS_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ecf_status_checks_total",
        "Consultas de estado a la DGII",
        &["status"]
    )
    .expect("registro de métrica ecf_status_checks_total")
});

pub static CANCELLATIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ecf_cancellations_total", "Facturas anuladas")
        .expect("registro de métrica ecf_cancellations_total")
});

pub static PDF_GENERATED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ecf_pdf_generated_total", "PDF de facturas generados")
        .expect("registro de métrica ecf_pdf_generated_total")
});

pub static PDF_UPLOAD_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ecf_pdf_upload_retries_total", "Reintentos al subir PDF")
        .expect("registro de métrica ecf_pdf_upload_retries_total")
});

pub static EMAILS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ecf_emails_sent_total", "Facturas enviadas por correo")
        .expect("registro de métrica ecf_emails_sent_total")
});
