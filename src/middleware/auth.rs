use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{ActorContext, Claims},
};

/// Decodifica o JWT (HS256) emitido pelo serviço de login.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<ActorContext, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Token rejeitado");
        AppError::InvalidToken
    })?;

    if token_data.claims.name.trim().is_empty() {
        return Err(AppError::InvalidToken);
    }
    Ok(token_data.claims.into())
}

// Extrator para obter quem está operando diretamente nos handlers
pub struct AuthenticatedActor(pub ActorContext);

impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidToken)?;

        validate_token(bearer.token(), &state.jwt_secret).map(AuthenticatedActor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "segredo-de-teste";

    fn token(name: &str, role: &str, exp_offset: i64, secret: &str) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            name: name.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_yields_actor() {
        let actor = validate_token(&token("Minh", "admin", 3600, SECRET), SECRET).unwrap();
        assert_eq!(actor.name, "Minh");
        assert!(actor.is_admin());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let err = validate_token(&token("Minh", "staff", 3600, "outro"), SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn expired_token_is_rejected() {
        let err = validate_token(&token("Minh", "staff", -3600, SECRET), SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn missing_role_is_not_admin() {
        let actor = validate_token(&token("Minh", "", 3600, SECRET), SECRET).unwrap();
        assert!(!actor.is_admin());
    }
}
