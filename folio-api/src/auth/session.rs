use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{app_state::AppState, domain::UserId, routes::ApiError};

/// The authenticated identity a request acts as.
///
/// Resolved from the `Authorization: Bearer` token against the profile
/// store; token issuance and invalidation belong to the external identity
/// provider. Handlers receive this as an extractor and pass it on
/// explicitly; there is no ambient current-user state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: UserId,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Missing bearer token"))?;

        let profile = state
            .profile_repo
            .profile_by_token(bearer.token())
            .await
            .map_err(|_| ApiError::unauthorized("Invalid session token"))?;

        Ok(SessionContext {
            user_id: profile.id,
            username: profile.username,
        })
    }
}
