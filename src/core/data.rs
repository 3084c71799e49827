use chrono::{DateTime, Utc};

/// Monto en pesos dominicanos, formateado como en las facturas impresas.
#[derive(Debug, Clone, Copy)]
pub struct Money {
    pub amount: f64,
}

impl Money {
    pub fn new(amount: f64) -> Self {
        Money { amount }
    }

    /// `RD$ 1,234.50`
    pub fn format(&self) -> String {
        format!("RD$ {}", format_number(self.amount, 2))
    }
}

/// Formatea un número con separadores de miles y `decimals` decimales.
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, decimal) = match formatted.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, c) in integer.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut result: String = grouped.chars().rev().collect();

    if value < 0.0 && value.abs() >= 0.5 * 10f64.powi(-(decimals as i32)) {
        result.insert(0, '-');
    }
    if let Some(decimal) = decimal {
        result.push('.');
        result.push_str(decimal);
    }
    result
}

/// Fecha corta `dd/mm/aaaa`, o `N/A` si no hay fecha.
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => "N/A".to_string(),
    }
}

/// Devuelve el texto o el marcador indicado cuando falta o está vacío.
pub fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder,
    }
}
