use sqlx::PgPool;
use tracing::{info, warn};

use crate::common::validation::require_present;
use crate::common::{ApiError, ValidationErrors};
use crate::domains::auth::data::{TokenRequest, TokenResponse};
use crate::domains::auth::jwt::JwtService;
use crate::domains::auth::password::verify_password_async;
use crate::domains::users::models::User;

pub async fn obtain_token(
    request: TokenRequest,
    jwt_service: &JwtService,
    pool: &PgPool,
) -> Result<TokenResponse, ApiError> {
    let mut errors = ValidationErrors::new();
    require_present(&mut errors, "email", &request.email);
    require_present(&mut errors, "password", &request.password);
    errors.into_result()?;

    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let user = match User::find_by_email(email.trim(), pool).await? {
        Some(user) if user.is_active => user,
        _ => {
            warn!(email = %email, "rejected token request");
            return Err(ApiError::InvalidCredentials);
        }
    };
    if !verify_password_async(password, user.password_hash.clone()).await? {
        warn!(email = %email, "rejected token request");
        return Err(ApiError::InvalidCredentials);
    }

    let access_token = jwt_service.create_token(user.user_id, user.email.clone())?;
    info!(user_id = %user.user_id, "issued access token");

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_service.ttl_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_fields_are_required() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = JwtService::new("secret", "travel-api".to_string(), 1);

        let err = obtain_token(TokenRequest::default(), &service, &pool)
            .await
            .unwrap_err();

        match err {
            ApiError::Validation(errors) => {
                assert!(errors.field("email").is_some());
                assert!(errors.field("password").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
