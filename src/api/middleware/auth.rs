use actix_web::{dev::ServiceRequest, web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use actix_web_httpauth::middleware::HttpAuthentication;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::future::{ready, Ready};

use crate::api::{ApiError, ApiState};
use crate::core::EcfError;
use crate::service::Caller;

type HmacSha256 = Hmac<Sha256>;

type Validator =
    fn(ServiceRequest, Option<BearerAuth>) -> Ready<Result<ServiceRequest, (Error, ServiceRequest)>>;

/// Sin encabezado `Authorization` también responde con el cuerpo de error JSON.
pub fn create_auth_middleware() -> HttpAuthentication<Option<BearerAuth>, Validator> {
    HttpAuthentication::with_fn(validator)
}

fn mac(secret: &str, uid: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(uid.as_bytes());
    Some(mac)
}

/// Token `{uid}.{firma}` para el usuario `uid`.
pub fn issue_token(secret: &str, uid: &str) -> Option<String> {
    let tag = mac(secret, uid)?.finalize().into_bytes();
    Some(format!("{}.{}", uid, URL_SAFE_NO_PAD.encode(tag)))
}

/// Devuelve el usuario si la firma del token es válida.
pub fn verify_token(secret: &str, token: &str) -> Option<Caller> {
    let (uid, tag) = token.rsplit_once('.')?;
    if uid.is_empty() {
        return None;
    }
    let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
    mac(secret, uid)?.verify_slice(&tag).ok()?;
    Some(Caller::new(uid))
}

fn validator(
    req: ServiceRequest,
    credentials: Option<BearerAuth>,
) -> Ready<Result<ServiceRequest, (Error, ServiceRequest)>> {
    let caller = credentials.and_then(|credentials| {
        req.app_data::<web::Data<ApiState>>()
            .and_then(|state| verify_token(&state.auth.token_secret, credentials.token()))
    });

    match caller {
        Some(caller) => {
            req.extensions_mut().insert(caller);
            ready(Ok(req))
        }
        None => {
            tracing::warn!("Token rechazado para {}", req.path());
            let err = ApiError::from(EcfError::unauthenticated(
                "Se requiere un token de acceso válido.",
            ));
            ready(Err((err.into(), req)))
        }
    }
}
