use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor dos endpoints de administração: exige `Authorization: Bearer`
/// igual ao token configurado. Sem token configurado recusa sempre.
pub struct Admin;

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(ApiError::Unauthorized("administração desativada"));
        };

        let provided = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(Admin),
            Some(_) => {
                warn!("token de administração inválido ({} {})", parts.method, parts.uri.path());
                Err(ApiError::Unauthorized("token inválido"))
            }
            None => Err(ApiError::Unauthorized("token em falta")),
        }
    }
}
