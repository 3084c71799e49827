use crate::boundary::Boundary;
use crate::core::{format_date, format_number, or_placeholder, EcfError, Money, PdfConfig};
use crate::models::{Client, CompanySettings, Invoice};
use super::builder::{escape_typst, escape_typst_string, ColumnAlign, Table, TypstBuilder};

pub const NO_ITEMS_ROW: &str = "No hay items en esta factura";
pub const FOOTER: &str = "Gracias por su preferencia";

/// Recuadro que ocupa el lugar del logo cuando no hay imagen.
pub fn logo_placeholder() -> String {
    r#"#rect(width: 40mm, height: 20mm, stroke: 0.5pt)[
  #align(center + horizon)[#text(size: 10pt, weight: "bold")[LOGO]]
]"#
    .to_string()
}

pub fn logo_image(asset: &str) -> String {
    format!(
        "#image(\"{}\", width: 40mm, height: 20mm, fit: \"contain\")",
        escape_typst_string(asset)
    )
}

/// Frontera para el bloque del logo: cualquier falla pinta el recuadro.
pub struct LogoBoundary;

impl Boundary for LogoBoundary {
    type Output = String;

    fn name(&self) -> &str {
        "Logo de la empresa"
    }

    fn fallback(&self, _error: &EcfError) -> String {
        logo_placeholder()
    }
}

pub struct InvoiceLayout<'a> {
    pub invoice: &'a Invoice,
    pub company: &'a CompanySettings,
    pub client: Option<&'a Client>,
    /// Bloque Typst ya resuelto para el logo (imagen o recuadro).
    pub logo: String,
    /// Asset con el QR del timbre, si la factura tiene NCF.
    pub qr_asset: Option<String>,
    pub page: PdfConfig,
}

fn text(value: &str) -> String {
    escape_typst(value)
}

fn money(amount: f64) -> String {
    escape_typst(&Money::new(amount).format())
}

impl<'a> InvoiceLayout<'a> {
    pub fn to_typst(&self) -> String {
        let invoice = self.invoice;
        let company = self.company;

        let mut doc = TypstBuilder::new(self.page.clone());
        doc.add_raw(format!(
            "#set document(title: \"Factura {}\", author: \"{}\")",
            escape_typst_string(invoice.display_number()),
            escape_typst_string(company.display_name())
        ));

        // Encabezado: logo a la izquierda, empresa a la derecha
        doc.add_raw(format!(
            r#"#grid(
  columns: (1fr, 1fr),
  [
    {logo}
  ],
  [
    #align(right)[
      #text(size: 16pt, weight: "bold")[{name}] \
      RNC: {rnc} \
      {address} \
      Tel: {phone} \
      {email}
    ]
  ]
)"#,
            logo = self.logo,
            name = text(company.display_name()),
            rnc = text(or_placeholder(company.rnc.as_deref(), "N/A")),
            address = text(or_placeholder(company.address.as_deref(), "Dirección no disponible")),
            phone = text(or_placeholder(company.phone.as_deref(), "N/A")),
            email = text(or_placeholder(company.email.as_deref(), "N/A")),
        ));

        doc.add_space(10);
        doc.add_raw("#align(center)[#text(size: 14pt, weight: \"bold\")[FACTURA]]");
        doc.add_space(6);

        let mut info = format!(
            "#text(weight: \"bold\")[Número de Factura: {}] \\\n#text(weight: \"bold\")[Fecha de Emisión: {}]",
            text(invoice.display_number()),
            text(&format_date(invoice.date.as_ref())),
        );
        if let Some(ncf) = invoice.ncf.as_deref().filter(|n| !n.trim().is_empty()) {
            info.push_str(&format!(" \\\n#text(weight: \"bold\")[e-NCF: {}]", text(ncf)));
        }
        if let Some(track_id) = invoice.track_id.as_deref() {
            info.push_str(&format!(" \\\n#text(weight: \"bold\")[Track ID DGII: {}]", text(track_id)));
        }
        doc.add_raw(info);

        doc.add_space(10);
        doc.add_raw(self.client_block());
        doc.add_space(10);

        doc.add_table(&self.items_table());
        doc.add_space(10);
        doc.add_raw(self.totals_block());

        if let Some(qr) = &self.qr_asset {
            doc.add_space(10);
            doc.add_raw(format!(
                "#image(\"{}\", width: 30mm, height: 30mm)\n#text(size: 7pt)[Consulte este comprobante en la DGII]",
                escape_typst_string(qr)
            ));
        }

        doc.add_raw(format!(
            "#place(bottom + center)[#text(size: 8pt)[{}]]",
            text(FOOTER)
        ));

        doc.build()
    }

    fn client_block(&self) -> String {
        let client = self.client;
        let name = self
            .invoice
            .client
            .as_deref()
            .or_else(|| client.map(|c| c.name.as_str()));
        let rnc = self
            .invoice
            .rnc
            .as_deref()
            .or_else(|| client.and_then(|c| c.rnc.as_deref()));

        format!(
            "#text(size: 12pt, weight: \"bold\")[CLIENTE] \\\n\
Nombre/Razón Social: {} \\\n\
RNC/Cédula: {} \\\n\
Dirección: {} \\\n\
Teléfono: {} \\\n\
Correo: {}",
            text(or_placeholder(name, "N/A")),
            text(or_placeholder(rnc, "N/A")),
            text(or_placeholder(client.and_then(|c| c.address.as_deref()), "N/A")),
            text(or_placeholder(client.and_then(|c| c.phone.as_deref()), "N/A")),
            text(or_placeholder(client.and_then(|c| c.email.as_deref()), "N/A")),
        )
    }

    fn items_table(&self) -> Table {
        let rows = if self.invoice.items.is_empty() {
            vec![vec![
                text(NO_ITEMS_ROW),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ]]
        } else {
            self.invoice
                .items
                .iter()
                .map(|item| {
                    vec![
                        text(or_placeholder(Some(&item.description), "N/A")),
                        text(&format_number(item.quantity, if item.quantity.fract() == 0.0 { 0 } else { 2 })),
                        money(item.price),
                        money(item.tax_amount()),
                        money(item.subtotal()),
                    ]
                })
                .collect()
        };

        Table {
            widths: ["80mm", "20mm", "30mm", "30mm", "30mm"].iter().map(|w| w.to_string()).collect(),
            align: vec![
                ColumnAlign::Left,
                ColumnAlign::Center,
                ColumnAlign::Right,
                ColumnAlign::Right,
                ColumnAlign::Right,
            ],
            headers: ["Descripción", "Cantidad", "Precio Unitario", "ITBIS", "Subtotal"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows,
        }
    }

    /// `ITBIS (18%):` si todas las líneas comparten tasa; si no, `ITBIS:`.
    fn tax_label(&self) -> String {
        let mut rates = self.invoice.items.iter().map(|item| item.tax_rate());
        match rates.next() {
            Some(first) if rates.all(|rate| rate == first) => {
                let decimals = if first.fract() == 0.0 { 0 } else { 2 };
                format!("ITBIS ({}%):", format_number(first, decimals))
            }
            _ => "ITBIS:".to_string(),
        }
    }

    fn totals_block(&self) -> String {
        let totals = self.invoice.totals();
        format!(
            r#"#align(right)[
  #grid(
    columns: (35mm, 35mm),
    row-gutter: 4pt,
    align: (left, right),
    [#text(weight: "bold")[Subtotal:]], [{}],
    [#text(weight: "bold")[{}]], [{}],
    [#text(weight: "bold")[TOTAL:]], [{}],
  )
]"#,
            money(totals.subtotal),
            escape_typst(&self.tax_label()),
            money(totals.tax),
            money(totals.total),
        )
    }
}
