use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::core::{EcfError, EcfResult};
use crate::models::{Client, CompanySettings, Invoice};

pub const ECF_VERSION: &str = "1.0";
pub const CANCELLATION_NAMESPACE: &str = "http://dgii.gov.do/etf/anulaciones";

/// Factura de Crédito Fiscal Electrónica.
const TIPO_CREDITO_FISCAL: &str = "31";
/// Factura de Consumo Electrónica (cliente sin RNC).
const TIPO_CONSUMO: &str = "32";

fn xml_io(e: std::io::Error) -> EcfError {
    EcfError::internal(format!("Error escribiendo XML: {}", e))
}

/// Caracteres admitidos por XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Escritor sobre `quick-xml` con sangría fija; el texto siempre se escapa.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> EcfResult<Self> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> EcfResult<String> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| EcfError::internal(format!("XML no es UTF-8: {}", e)))
    }

    pub fn start_element(&mut self, name: &str) -> EcfResult<&mut Self> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> EcfResult<&mut Self> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer.write_event(Event::Start(elem)).map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> EcfResult<&mut Self> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    /// Los caracteres de control no admitidos por XML se descartan.
    pub fn text_element(&mut self, name: &str, text: &str) -> EcfResult<&mut Self> {
        let text: String = text.chars().filter(|c| is_xml_char(*c)).collect();
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    pub fn optional_element(&mut self, name: &str, text: Option<&str>) -> EcfResult<&mut Self> {
        match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => self.text_element(name, text),
            None => Ok(self),
        }
    }
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn required<'a>(value: Option<&'a str>, message: &str) -> EcfResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| EcfError::invalid_argument(message))
}

/// Genera el XML e-CF de una factura.
///
/// No usa la hora actual: la misma factura, empresa y cliente producen
/// siempre el mismo documento byte a byte.
pub fn build_invoice_xml(invoice: &Invoice, company: &CompanySettings, client: &Client) -> EcfResult<String> {
    let rnc_emisor = required(company.tax_id(), "La empresa no tiene RNC configurado")?;
    required(Some(invoice.id.as_str()), "La factura no tiene identificador")?;

    let client_rnc = client.rnc.as_deref().filter(|r| !r.trim().is_empty());
    let tipo = if client_rnc.is_some() {
        TIPO_CREDITO_FISCAL
    } else {
        TIPO_CONSUMO
    };

    let mut w = XmlWriter::new()?;
    w.start_element("ECF")?;

    w.start_element("Encabezado")?;
    w.text_element("Version", ECF_VERSION)?;

    w.start_element("IdDoc")?;
    w.text_element("TipoeCF", tipo)?;
    w.text_element("eNCF", invoice.encf())?;
    w.text_element("NumeroFactura", invoice.display_number())?;
    w.text_element("CodigoInterno", &invoice.id)?;
    if let Some(date) = &invoice.date {
        w.text_element("FechaEmision", &date.format("%d-%m-%Y").to_string())?;
    }
    w.end_element("IdDoc")?;

    w.start_element("Emisor")?;
    w.text_element("RNCEmisor", rnc_emisor)?;
    w.text_element("RazonSocialEmisor", company.display_name())?;
    w.optional_element("DireccionEmisor", company.address.as_deref())?;
    w.optional_element("TelefonoEmisor", company.phone.as_deref())?;
    w.optional_element("CorreoEmisor", company.email.as_deref())?;
    w.end_element("Emisor")?;

    w.start_element("Comprador")?;
    w.optional_element("RNCComprador", client_rnc)?;
    w.text_element("RazonSocialComprador", &client.name)?;
    w.optional_element("DireccionComprador", client.address.as_deref())?;
    w.optional_element("CorreoComprador", client.email.as_deref())?;
    w.end_element("Comprador")?;

    let totals = invoice.totals();
    w.start_element("Totales")?;
    w.text_element("MontoGravadoTotal", &amount(totals.subtotal))?;
    w.text_element("TotalITBIS", &amount(totals.tax))?;
    w.text_element("MontoTotal", &amount(totals.total))?;
    w.end_element("Totales")?;
    w.end_element("Encabezado")?;

    w.start_element("DetallesItems")?;
    for (index, item) in invoice.items.iter().enumerate() {
        w.start_element("Item")?;
        w.text_element("NumeroLinea", &(index + 1).to_string())?;
        w.text_element("NombreItem", &item.description)?;
        w.text_element("CantidadItem", &item.quantity.to_string())?;
        w.text_element("PrecioUnitarioItem", &amount(item.price))?;
        w.text_element("TasaITBIS", &amount(item.tax_rate()))?;
        w.text_element("MontoITBIS", &amount(item.tax_amount()))?;
        w.text_element("MontoItem", &amount(item.subtotal()))?;
        w.end_element("Item")?;
    }
    w.end_element("DetallesItems")?;

    // La fecha de firma se toma de la factura para no depender del reloj.
    let firma = invoice
        .date
        .map(|d| d.format("%d-%m-%Y %H:%M:%S").to_string())
        .unwrap_or_default();
    w.text_element("FechaHoraFirma", &firma)?;

    w.end_element("ECF")?;
    w.into_string()
}

/// Genera el XML de anulación de una factura ya aceptada.
pub fn build_cancellation_xml(
    invoice: &Invoice,
    company: &CompanySettings,
    reason_code: &str,
    reason: &str,
    timestamp: DateTime<Utc>,
) -> EcfResult<String> {
    let rnc_emisor = required(company.tax_id(), "La empresa no tiene RNC configurado")?;
    let ncf = required(invoice.ncf.as_deref(), "La factura no tiene un NCF válido")?;

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("Anulacion", &[("xmlns", CANCELLATION_NAMESPACE)])?;

    w.start_element("Encabezado")?;
    w.text_element("Version", ECF_VERSION)?;
    w.text_element("FechaHora", &timestamp.format("%Y-%m-%dT%H:%M:%S").to_string())?;
    w.text_element("RNCEmisor", rnc_emisor)?;
    w.text_element("RazonSocialEmisor", company.display_name())?;
    w.end_element("Encabezado")?;

    w.start_element("DetalleAnulacion")?;
    w.text_element("NCF", ncf)?;
    w.text_element("CodigoMotivo", reason_code)?;
    w.text_element("Motivo", reason)?;
    w.end_element("DetalleAnulacion")?;

    w.end_element("Anulacion")?;
    w.into_string()
}

/// Verifica que el documento esté bien formado y tenga un único elemento raíz.
pub fn validate_xml(xml: &str) -> EcfResult<()> {
    let invalid = |detail: String| EcfError::invalid_argument(format!("El XML generado no es válido: {}", detail));

    let mut reader = Reader::from_str(xml);
    let mut depth: usize = 0;
    let mut roots = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(_)) if depth == 0 => roots += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(text)) => {
                let raw = String::from_utf8_lossy(&text);
                if let Some(c) = raw.chars().find(|c| !is_xml_char(*c)) {
                    return Err(invalid(format!("carácter no permitido U+{:04X}", c as u32)));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(invalid(e.to_string())),
        }
    }

    if depth != 0 {
        return Err(invalid("elementos sin cerrar".to_string()));
    }
    if roots != 1 {
        return Err(invalid(format!("se esperaba un elemento raíz, hay {}", roots)));
    }
    Ok(())
}

/// Nombre del archivo XML: `{RNCEmisor}{eNCF}.xml`.
pub fn xml_filename(company_rnc: &str, encf: &str) -> String {
    let clean = |value: &str| -> String {
        value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    };
    format!("{}{}.xml", clean(company_rnc), clean(encf))
}
