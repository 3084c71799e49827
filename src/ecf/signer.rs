use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::core::{EcfError, EcfResult};
use crate::models::CertificateMaterial;

type HmacSha256 = Hmac<Sha256>;

pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

const BLOCK_OPEN: &str = "<Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\">";
const BLOCK_CLOSE: &str = "</Signature>";

/// Firma un documento insertando el bloque `<Signature>` justo antes de la
/// etiqueta de cierre del elemento raíz.
///
/// `DigestValue` es el SHA-256 del documento sin firmar; `SignatureValue` es
/// un HMAC-SHA256 sobre el digest y el certificado, con una llave derivada de
/// la llave privada y la contraseña. No hay aleatoriedad: firmar dos veces el
/// mismo documento produce los mismos bytes.
pub fn sign(xml: &str, material: &CertificateMaterial) -> EcfResult<String> {
    if xml.contains(BLOCK_OPEN) {
        return Err(EcfError::invalid_argument("El documento ya está firmado"));
    }

    let insert_at = xml
        .rfind("</")
        .ok_or_else(|| EcfError::invalid_argument("El documento no tiene un elemento raíz que firmar"))?;

    let block = signature_block(xml, material)?;

    let mut signed = String::with_capacity(xml.len() + block.len());
    signed.push_str(&xml[..insert_at]);
    signed.push_str(&block);
    signed.push_str(&xml[insert_at..]);
    Ok(signed)
}

/// Comprueba que `signed` es exactamente la firma de su documento original
/// con este material; cualquier byte alterado hace fallar la verificación.
pub fn verify(signed: &str, material: &CertificateMaterial) -> EcfResult<()> {
    let invalid = || EcfError::invalid_argument("La firma del documento no es válida");

    let start = signed.find(BLOCK_OPEN).ok_or_else(invalid)?;
    let end = signed[start..]
        .find(BLOCK_CLOSE)
        .map(|offset| start + offset + BLOCK_CLOSE.len())
        .ok_or_else(invalid)?;

    let mut unsigned = String::with_capacity(signed.len());
    unsigned.push_str(&signed[..start]);
    unsigned.push_str(&signed[end..]);

    let expected = sign(&unsigned, material).map_err(|_| invalid())?;
    if expected == signed {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn signature_block(xml: &str, material: &CertificateMaterial) -> EcfResult<String> {
    let digest = BASE64.encode(Sha256::digest(xml.as_bytes()));
    let certificate = BASE64.encode(&material.certificate);

    let mut mac = HmacSha256::new_from_slice(&signing_key(material))
        .map_err(|e| EcfError::internal(format!("Llave de firma inválida: {}", e)))?;
    mac.update(digest.as_bytes());
    mac.update(b"\n");
    mac.update(certificate.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(format!(
        "{open}<SignedInfo><DigestMethod Algorithm=\"http://www.w3.org/2001/04/xmlenc#sha256\"/>\
<DigestValue>{digest}</DigestValue></SignedInfo>\
<SignatureValue>{signature}</SignatureValue>\
<KeyInfo><X509Data><X509Certificate>{certificate}</X509Certificate></X509Data></KeyInfo>{close}",
        open = BLOCK_OPEN,
        digest = digest,
        signature = signature,
        certificate = certificate,
        close = BLOCK_CLOSE,
    ))
}

fn signing_key(material: &CertificateMaterial) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(&material.private_key);
    hasher.update([0u8]);
    hasher.update(material.password.as_bytes());
    hasher.finalize().to_vec()
}
