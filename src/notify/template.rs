use minijinja::Environment;
use serde::Serialize;

use crate::core::{EcfError, EcfResult, Money};

const INVOICE_EMAIL: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; text-align: center;">
    {% if logo_url %}<img src="{{ logo_url }}" alt="Logo" style="max-height: 80px; margin-bottom: 15px;">{% endif %}
    <h2 style="color: #333;">{{ company_name }}</h2>
  </div>
  <div style="padding: 20px;">
    <p>Estimado cliente,</p>
    <p>{{ message }}</p>
    <p>Detalles de la factura:</p>
    <ul>
      <li><strong>Número de factura:</strong> {{ invoice_number }}</li>
      <li><strong>Fecha:</strong> {{ date }}</li>
      <li><strong>Total:</strong> {{ total | money }}</li>
    </ul>
    <p>Para cualquier consulta, no dude en contactarnos.</p>
    <p>Atentamente,</p>
    <p><strong>{{ company_name }}</strong><br>
    {{ address }}<br>
    {{ phone }}<br>
    {{ email }}</p>
  </div>
  <div style="background-color: #f8f9fa; padding: 15px; text-align: center; font-size: 12px; color: #666;">
    <p>Este es un correo electrónico automático. Por favor, no responda a este mensaje.</p>
  </div>
</div>
"#;

pub const DEFAULT_MESSAGE: &str = "Adjunto encontrará su factura electrónica. Gracias por su preferencia.";

#[derive(Debug, Clone, Serialize)]
pub struct EmailContext {
    pub company_name: String,
    pub logo_url: Option<String>,
    pub message: String,
    pub invoice_number: String,
    pub date: String,
    pub total: f64,
    pub address: String,
    pub phone: String,
    pub email: String,
}

fn money_filter(value: f64) -> String {
    Money::new(value).format()
}

fn environment() -> EcfResult<Environment<'static>> {
    let mut env = Environment::new();
    env.add_filter("money", money_filter);
    env.add_template("invoice_email.html", INVOICE_EMAIL)
        .map_err(|e| EcfError::internal(format!("Plantilla de correo inválida: {}", e)))?;
    Ok(env)
}

/// Cuerpo HTML del correo con la factura adjunta.
pub fn render_invoice_email(ctx: &EmailContext) -> EcfResult<String> {
    let env = environment()?;
    let template = env
        .get_template("invoice_email.html")
        .map_err(|e| EcfError::internal(format!("Plantilla de correo no encontrada: {}", e)))?;

    template
        .render(ctx)
        .map_err(|e| EcfError::internal(format!("Error al generar el correo: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EmailContext {
        EmailContext {
            company_name: "Fumigadora <Caribe>".to_string(),
            logo_url: None,
            message: DEFAULT_MESSAGE.to_string(),
            invoice_number: "F-001".to_string(),
            date: "15/01/2024".to_string(),
            total: 1180.0,
            address: "Santo Domingo".to_string(),
            phone: "809-555-0000".to_string(),
            email: "info@example.com".to_string(),
        }
    }

    #[test]
    fn renders_details_and_total() {
        let html = render_invoice_email(&ctx()).unwrap();
        assert!(html.contains("F-001"));
        assert!(html.contains("RD$ 1,180.00"));
        assert!(html.contains(DEFAULT_MESSAGE));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn escapes_company_name() {
        let html = render_invoice_email(&ctx()).unwrap();
        assert!(html.contains("Fumigadora &lt;Caribe&gt;"));
    }
}
