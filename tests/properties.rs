mod common;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use common::{client, company, CERTIFICATE_KEY};
use ecf_facturacion::ecf::xml::{build_invoice_xml, validate_xml};
use ecf_facturacion::ecf::{signer, transition, InvoiceEvent};
use ecf_facturacion::models::{CertificateRecord, Invoice, InvoiceItem, InvoiceStatus};

fn item_strategy() -> impl Strategy<Value = InvoiceItem> {
    ("[a-zA-Z0-9 áéíóúñ&<>]{1,30}", 1u32..100, 0u32..1_000_000, prop::option::of(0u32..=18)).prop_map(
        |(description, quantity, cents, tax)| InvoiceItem {
            description,
            quantity: quantity as f64,
            price: cents as f64 / 100.0,
            tax: tax.map(|t| t as f64),
        },
    )
}

fn invoice(items: Vec<InvoiceItem>) -> Invoice {
    let mut invoice: Invoice = serde_json::from_value(serde_json::json!({
        "id": "INV1",
        "clientId": "C1",
        "ncf": "E310000000001",
    }))
    .unwrap();
    invoice.items = items;
    invoice.date = Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    invoice.recalculate_totals();
    invoice
}

fn status_strategy() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Pendiente),
        Just(InvoiceStatus::Enviada),
        Just(InvoiceStatus::Aceptada),
        Just(InvoiceStatus::Rechazada),
        Just(InvoiceStatus::Anulada),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invoice_xml_is_deterministic_and_well_formed(items in prop::collection::vec(item_strategy(), 0..6)) {
        let invoice = invoice(items);
        let first = build_invoice_xml(&invoice, &company(), &client()).unwrap();
        let second = build_invoice_xml(&invoice, &company(), &client()).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert!(validate_xml(&first).is_ok());
    }

    #[test]
    fn any_changed_byte_breaks_the_signature(position in any::<prop::sample::Index>(), replacement in b'a'..=b'z') {
        let xml = build_invoice_xml(&invoice(vec![]), &company(), &client()).unwrap();
        let material = CertificateRecord::development(CERTIFICATE_KEY, Utc::now())
            .unwrap()
            .open(CERTIFICATE_KEY)
            .unwrap();
        let signed = signer::sign(&xml, &material).unwrap();
        prop_assert!(signer::verify(&signed, &material).is_ok());

        let mut bytes = signed.into_bytes();
        let index = position.index(bytes.len());
        prop_assume!(bytes[index] != replacement);
        bytes[index] = replacement;
        let tampered = String::from_utf8_lossy(&bytes).to_string();

        prop_assert!(signer::verify(&tampered, &material).is_err());
    }

    #[test]
    fn cancellation_only_from_accepted(status in status_strategy()) {
        let result = transition(status, &InvoiceEvent::Cancelled);
        if status == InvoiceStatus::Aceptada {
            prop_assert_eq!(result.unwrap(), InvoiceStatus::Anulada);
        } else {
            prop_assert_eq!(result.unwrap_err().code(), "failed-precondition");
        }
    }
}
