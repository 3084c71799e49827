use serde::Deserialize;
use std::time::Duration;

/// Configuración completa del servicio.
///
/// Se arma en capas: valores por defecto, `config/default.toml` (opcional) y
/// variables de entorno con prefijo `ECF_` (`ECF_ECF__TEST_MODE=false`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ecf: EcfConfig,
    pub pdf: PdfSettings,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("ECF")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: String,
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            token_secret: "cambiar-en-produccion".to_string(),
            rate_limit_per_minute: 100,
            rate_limit_burst: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `memory` o una URL de SQLite (`sqlite://facturacion.db?mode=rwc`).
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: "sqlite://facturacion.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub cdn_url: Option<String>,
    /// Base de las URLs públicas en el backend en memoria.
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::Memory,
            bucket: "facturacion".to_string(),
            endpoint_url: None,
            cdn_url: None,
            public_base_url: "memory://facturacion".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EcfConfig {
    /// Modo por defecto cuando la llamada no indica `testMode`.
    pub test_mode: bool,
    pub test_base_url: String,
    pub production_base_url: String,
    pub request_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub auth_token: Option<String>,
    /// Clave con la que se sellan el certificado y la llave privada.
    pub certificate_key: String,
}

impl Default for EcfConfig {
    fn default() -> Self {
        EcfConfig {
            test_mode: true,
            test_base_url: "https://ecf.dgii.gov.do/testecf".to_string(),
            production_base_url: "https://ecf.dgii.gov.do/ecf".to_string(),
            request_timeout_ms: 30_000,
            probe_timeout_ms: 5_000,
            auth_token: None,
            certificate_key: "default-encryption-key".to_string(),
        }
    }
}

impl EcfConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub typst_bin: String,
    pub work_dir: String,
    pub upload_attempts: u32,
    pub upload_retry_delay_ms: u64,
    pub logo_timeout_ms: u64,
    pub paper: PageSize,
    pub landscape: bool,
}

impl Default for PdfSettings {
    fn default() -> Self {
        PdfSettings {
            typst_bin: "typst".to_string(),
            work_dir: std::env::temp_dir().to_string_lossy().to_string(),
            upload_attempts: 3,
            upload_retry_delay_ms: 1_000,
            logo_timeout_ms: 3_000,
            paper: PageSize::A4,
            landscape: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from_address: String,
    pub use_tls: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        MailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_address: "facturacion@example.com".to_string(),
            use_tls: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    pub fn to_typst(&self) -> &'static str {
        match self {
            PageSize::A4 => "\"a4\"",
            PageSize::Letter => "\"us-letter\"",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone)]
pub struct Margin {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margin {
    fn default() -> Self {
        Margin::uniform(20.0)
    }
}

impl Margin {
    pub fn uniform(size: f32) -> Self {
        Margin {
            top: size,
            bottom: size,
            left: size,
            right: size,
        }
    }

    pub fn to_typst(&self) -> String {
        format!(
            "(top: {}mm, bottom: {}mm, left: {}mm, right: {}mm)",
            self.top, self.bottom, self.left, self.right
        )
    }
}

/// Configuración de página para el layout Typst de la factura.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin: Margin,
    pub font_family: String,
    pub font_size: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        PdfConfig {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: Margin::default(),
            font_family: "Helvetica".to_string(),
            font_size: 10.0,
        }
    }
}

impl From<&PdfSettings> for PdfConfig {
    fn from(settings: &PdfSettings) -> Self {
        PdfConfig {
            page_size: settings.paper.clone(),
            orientation: if settings.landscape {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            },
            ..PdfConfig::default()
        }
    }
}

impl PdfConfig {
    pub fn to_typst_header(&self) -> String {
        format!(
            r#"#set page(
  paper: {},
  margin: {},
  flipped: {}
)
#set text(
  font: "{}",
  size: {}pt,
  lang: "es"
)"#,
            self.page_size.to_typst(),
            self.margin.to_typst(),
            matches!(self.orientation, Orientation::Landscape),
            self.font_family,
            self.font_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_test_mode_and_three_upload_attempts() {
        let config = AppConfig::default();
        assert!(config.ecf.test_mode);
        assert_eq!(config.pdf.upload_attempts, 3);
        assert_eq!(config.ecf.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn typst_header_carries_paper_and_margins() {
        let header = PdfConfig::default().to_typst_header();
        assert!(header.contains("paper: \"a4\""));
        assert!(header.contains("top: 20mm"));
        assert!(header.contains("flipped: false"));
    }

    #[test]
    fn page_follows_pdf_settings() {
        let settings = PdfSettings {
            paper: PageSize::Letter,
            landscape: true,
            ..PdfSettings::default()
        };
        let header = PdfConfig::from(&settings).to_typst_header();
        assert!(header.contains("paper: \"us-letter\""));
        assert!(header.contains("flipped: true"));
    }
}
