use crate::core::PdfConfig;

/// Escapa texto libre para usarlo dentro de un bloque de contenido Typst.
pub fn escape_typst(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '#' | '$' | '@' | '*' | '_' | '`' | '<' | '>' | '[' | ']' | '~' | '"' | '/' => {
                out.push('\\');
                out.push(c);
            }
            '\r' => {}
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Escapa texto para una cadena Typst entre comillas.
pub fn escape_typst_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Clone, Copy)]
pub enum ColumnAlign {
    Left,
    Center,
    Right,
}

impl ColumnAlign {
    fn to_typst(self) -> &'static str {
        match self {
            ColumnAlign::Left => "left",
            ColumnAlign::Center => "center",
            ColumnAlign::Right => "right",
        }
    }
}

/// Tabla simple; las celdas ya vienen escapadas.
pub struct Table {
    pub widths: Vec<String>,
    pub align: Vec<ColumnAlign>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Documento Typst armado por secciones.
pub struct TypstBuilder {
    sections: Vec<String>,
    config: PdfConfig,
}

impl TypstBuilder {
    pub fn new(config: PdfConfig) -> Self {
        TypstBuilder {
            sections: Vec::new(),
            config,
        }
    }

    pub fn add_raw(&mut self, typst_code: impl Into<String>) -> &mut Self {
        self.sections.push(typst_code.into());
        self
    }

    pub fn add_space(&mut self, points: u32) -> &mut Self {
        self.sections.push(format!("#v({}pt)", points));
        self
    }

    pub fn add_table(&mut self, table: &Table) -> &mut Self {
        let mut typst = String::from("#table(\n");
        typst.push_str(&format!("  columns: ({}),\n", table.widths.join(", ")));

        let aligns: Vec<&str> = table.align.iter().map(|a| a.to_typst()).collect();
        typst.push_str(&format!("  align: ({}),\n", aligns.join(", ")));
        typst.push_str("  stroke: 0.5pt + rgb(150, 150, 150),\n");
        typst.push_str("  fill: (x, y) => if y == 0 { rgb(66, 66, 66) } else { white },\n");
        typst.push_str("  inset: 6pt,\n\n");

        for header in &table.headers {
            typst.push_str(&format!(
                "  [#text(weight: \"bold\", fill: white)[{}]],\n",
                header
            ));
        }

        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|cell| format!("[{}]", cell)).collect();
            typst.push_str(&format!("  {},\n", cells.join(", ")));
        }

        typst.push(')');
        self.sections.push(typst);
        self
    }

    pub fn build(&self) -> String {
        format!("{}\n\n{}\n", self.config.to_typst_header(), self.sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_typst("Calle #5, RD$ 10"), "Calle \\#5, RD\\$ 10");
        assert_eq!(escape_typst("a_b*c [x] <y> @z"), "a\\_b\\*c \\[x\\] \\<y\\> \\@z");
        assert_eq!(escape_typst("línea\nnueva"), "línea nueva");
        // `//` y `/*` abren comentarios en Typst.
        assert_eq!(escape_typst("https://a.do/b"), "https:\\/\\/a.do\\/b");
        assert_eq!(escape_typst("/* nota */"), "\\/\\* nota \\*\\/");
        assert_eq!(escape_typst_string("dice \"hola\""), "dice \\\"hola\\\"");
    }

    #[test]
    fn table_rows_follow_headers() {
        let mut doc = TypstBuilder::new(PdfConfig::default());
        doc.add_table(&Table {
            widths: vec!["1fr".to_string(), "60pt".to_string()],
            align: vec![ColumnAlign::Left, ColumnAlign::Right],
            headers: vec!["Descripción".to_string(), "Cantidad".to_string()],
            rows: vec![vec!["Fumigación".to_string(), "1".to_string()]],
        });

        let source = doc.build();
        assert!(source.starts_with("#set page("));
        assert!(source.contains("align: (left, right)"));
        assert!(source.contains("[Fumigación], [1],"));
    }
}
