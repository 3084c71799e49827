use image::{ImageBuffer, Rgb};
use qrcode::{Color, QrCode};
use std::io::Cursor;

use crate::core::{EcfError, EcfResult};
use crate::models::{Client, CompanySettings, Invoice};

pub const STAMP_LOOKUP_URL: &str = "https://ecf.dgii.gov.do/ecf/ConsultaTimbre";

/// URL de consulta del timbre fiscal que se codifica en el QR.
pub fn stamp_url(invoice: &Invoice, company: &CompanySettings, client: Option<&Client>) -> Option<String> {
    let ncf = invoice.ncf.as_deref().filter(|n| !n.trim().is_empty())?;
    let buyer = invoice
        .rnc
        .as_deref()
        .or_else(|| client.and_then(|c| c.rnc.as_deref()))
        .unwrap_or_default();
    let issued = invoice
        .date
        .map(|d| d.format("%d-%m-%Y").to_string())
        .unwrap_or_default();

    Some(format!(
        "{}?RncEmisor={}&RncComprador={}&ENCF={}&FechaEmision={}&MontoTotal={:.2}",
        STAMP_LOOKUP_URL,
        company.tax_id().unwrap_or_default(),
        buyer,
        ncf,
        issued,
        invoice.total
    ))
}

/// PNG del código QR, 5 px por módulo.
pub fn qr_png(data: &str) -> EcfResult<Vec<u8>> {
    let code = QrCode::new(data)
        .map_err(|e| EcfError::internal(format!("No se pudo generar el código QR: {}", e)))?;
    let width = code.width();
    let scale = 5;
    let img_size = (width * scale) as u32;

    let mut image = ImageBuffer::<Rgb<u8>, Vec<u8>>::new(img_size, img_size);

    for y in 0..width {
        for x in 0..width {
            let color = match code[(x, y)] {
                Color::Dark => Rgb([0, 0, 0]),
                Color::Light => Rgb([255, 255, 255]),
            };

            for dy in 0..scale {
                for dx in 0..scale {
                    image.put_pixel((x * scale + dx) as u32, (y * scale + dy) as u32, color);
                }
            }
        }
    }

    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), image::ImageOutputFormat::Png)
        .map_err(|e| EcfError::internal(format!("No se pudo codificar el QR: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_signature() {
        let png = qr_png("https://ecf.dgii.gov.do").unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']);
    }

    #[test]
    fn no_stamp_without_ncf() {
        let invoice: Invoice = serde_json::from_value(serde_json::json!({"id": "1", "clientId": "C"})).unwrap();
        assert!(stamp_url(&invoice, &CompanySettings::default(), None).is_none());
    }

    #[test]
    fn stamp_carries_ncf_and_total() {
        let invoice: Invoice = serde_json::from_value(serde_json::json!({
            "id": "1", "clientId": "C", "ncf": "E310000000007", "total": 1180.0
        }))
        .unwrap();
        let company = CompanySettings {
            rnc: Some("101000001".to_string()),
            ..Default::default()
        };
        let url = stamp_url(&invoice, &company, None).unwrap();
        assert!(url.contains("RncEmisor=101000001"));
        assert!(url.contains("ENCF=E310000000007"));
        assert!(url.contains("MontoTotal=1180.00"));
    }
}
