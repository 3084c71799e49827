use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::core::{EcfError, EcfResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertificateKind {
    Produccion,
    Desarrollo,
}

/// Certificado digital de la empresa (`settings/certificate`).
///
/// El certificado y la llave privada se guardan sellados con [`seal`]; el
/// firmador solo los lee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub certificate: String,
    pub private_key: String,
    pub password: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: CertificateKind,
}

/// Material ya abierto, listo para firmar.
#[derive(Clone)]
pub struct CertificateMaterial {
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
    pub password: String,
}

impl CertificateRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_to
    }

    /// Abre el certificado y la llave con la clave de sellado configurada.
    pub fn open(&self, key: &str) -> EcfResult<CertificateMaterial> {
        Ok(CertificateMaterial {
            certificate: open(&self.certificate, key)?,
            private_key: open(&self.private_key, key)?,
            password: self.password.clone(),
        })
    }

    /// Certificado falso para ambientes de desarrollo, válido por un año.
    pub fn development(key: &str, now: DateTime<Utc>) -> EcfResult<Self> {
        let mut rng = rand::thread_rng();

        let mut certificate = vec![0u8; 2048];
        rng.fill_bytes(&mut certificate);
        let mut private_key = vec![0u8; 1024];
        rng.fill_bytes(&mut private_key);
        let mut serial = [0u8; 16];
        rng.fill_bytes(&mut serial);

        Ok(CertificateRecord {
            certificate: seal(&certificate, key)?,
            private_key: seal(&private_key, key)?,
            password: "password123".to_string(),
            valid_from: now,
            valid_to: now + Duration::days(365),
            issuer: Some("Entidad Certificadora de Prueba".to_string()),
            subject: Some("Certificado de Desarrollo".to_string()),
            serial_number: Some(serial.iter().map(|b| format!("{:02x}", b)).collect()),
            kind: CertificateKind::Desarrollo,
        })
    }
}

fn mac_for(key: &str) -> EcfResult<HmacSha256> {
    HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| EcfError::internal(format!("Clave de sellado inválida: {}", e)))
}

/// Sella `bytes` como `base64(datos).base64(hmac)`.
pub fn seal(bytes: &[u8], key: &str) -> EcfResult<String> {
    let mut mac = mac_for(key)?;
    mac.update(bytes);
    let tag = mac.finalize().into_bytes();
    Ok(format!("{}.{}", BASE64.encode(bytes), BASE64.encode(tag)))
}

pub fn open(sealed: &str, key: &str) -> EcfResult<Vec<u8>> {
    let corrupt = || EcfError::internal("El certificado está corrupto o la clave de sellado es incorrecta");

    let (data, tag) = sealed.split_once('.').ok_or_else(corrupt)?;
    let data = BASE64.decode(data).map_err(|_| corrupt())?;
    let tag = BASE64.decode(tag).map_err(|_| corrupt())?;

    let mut mac = mac_for(key)?;
    mac.update(&data);
    mac.verify_slice(&tag).map_err(|_| corrupt())?;

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_values_open_with_the_same_key() {
        let sealed = seal(b"certificado", "clave").unwrap();
        assert_eq!(open(&sealed, "clave").unwrap(), b"certificado");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sealed = seal(b"certificado", "clave").unwrap();
        let err = open(&sealed, "otra").unwrap_err();
        assert_eq!(err.code(), "internal");
    }

    #[test]
    fn development_certificate_is_valid_for_a_year() {
        let now = Utc::now();
        let record = CertificateRecord::development("clave", now).unwrap();

        assert!(record.is_valid_at(now + Duration::days(100)));
        assert!(!record.is_valid_at(now + Duration::days(400)));
        assert_eq!(record.kind, CertificateKind::Desarrollo);

        let material = record.open("clave").unwrap();
        assert_eq!(material.certificate.len(), 2048);
        assert_eq!(material.private_key.len(), 1024);
    }
}
