use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{cookie::SESSION_COOKIE, jwt::JwtKeys},
    error::ApiError,
};

/// Session guard: validates the session cookie and yields the user id.
///
/// Only cryptographic integrity and expiry are checked here; whether the id
/// still resolves to a user is the check-auth handler's job. A missing,
/// malformed, expired or mis-signed token all collapse to the same
/// rejection.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or_else(ApiError::unauthorized)?;

        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::unauthorized()
        })?;

        Ok(AuthUser(claims.sub))
    }
}
