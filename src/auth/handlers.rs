use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookie::{clear_session_cookie, session_cookie},
        dto::{
            ForgotPasswordRequest, LoginRequest, MessageEnvelope, ResetPasswordRequest,
            SignupRequest, UserEnvelope, VerifyRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
        tokens,
    },
    error::ApiError,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;
const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("Password too short"));
    }
    Ok(())
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<UserEnvelope>), ApiError> {
    payload.email = payload.email.trim().to_string();
    payload.name = payload.name.trim().to_string();

    if payload.email.is_empty() || payload.password.is_empty() || payload.name.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    check_password(&payload.password)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let code = tokens::verification_code();
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(VERIFICATION_TTL_HOURS);

    let user = User::create(
        &state.db,
        &payload.email,
        &payload.name,
        &hash,
        &code,
        expires_at,
    )
    .await?;

    // Pre-verification sessions are allowed.
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let jar = jar.add(session_cookie(token, keys.session_ttl));

    // The insert is committed; a failed send surfaces to the caller but does
    // not roll the record back.
    state.mailer.send_verification(&user.email, &code).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(UserEnvelope {
            success: true,
            message: Some("Verification code sent successfully".into()),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserEnvelope>), ApiError> {
    payload.email = payload.email.trim().to_string();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("All fields are required"));
    }

    // Unknown email and wrong password produce byte-identical messages.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Authentication("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Authentication("Invalid credentials".into()));
    }

    let user = User::touch_last_login(&state.db, user.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;
    let jar = jar.add(session_cookie(token, keys.session_ttl));

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(UserEnvelope {
            success: true,
            message: Some("Logged in successfully".into()),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageEnvelope>) {
    let jar = jar.add(clear_session_cookie());
    (
        jar,
        Json(MessageEnvelope {
            success: true,
            message: "Logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    if payload.code.trim().is_empty() {
        return Err(ApiError::validation("Verification code is required"));
    }

    let user = User::consume_verification(&state.db, payload.code.trim())
        .await?
        .ok_or_else(|| {
            warn!("verification code invalid or expired");
            ApiError::Authentication("Invalid verification code".into())
        })?;

    state.mailer.send_welcome(&user.email, &user.name).await?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(UserEnvelope {
        success: true,
        message: Some("Email verified successfully".into()),
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let user = User::find_by_email(&state.db, email)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let token = tokens::reset_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(RESET_TTL_HOURS);
    User::set_reset_token(&state.db, user.id, &token, expires_at)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let reset_url = format!("{}/reset-password/{}", state.config.client_url, token);
    state
        .mailer
        .send_password_reset(&user.email, &reset_url)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = %user.id, "password reset link sent");
    Ok(Json(MessageEnvelope {
        success: true,
        message: "Password reset link sent to your email".into(),
    }))
}

#[instrument(skip(state, payload, token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    check_password(&payload.password)?;

    let hash = hash_password(&payload.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = User::consume_reset(&state.db, &token, &hash)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| {
            warn!("reset token invalid or expired");
            ApiError::Authentication("Invalid or expired reset token".into())
        })?;

    state
        .mailer
        .send_reset_success(&user.email)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageEnvelope {
        success: true,
        message: "Password reset successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn check_auth(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = User::find_public_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserEnvelope {
        success: true,
        message: None,
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn email_regex_rejects_junk() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(check_password("pw12345").is_err());
        assert!(check_password("pw123456").is_ok());
    }

    use sqlx::PgPool;

    fn test_state(pool: PgPool) -> AppState {
        let mut state = AppState::fake();
        state.db = pool;
        state
    }

    async fn signup_user(state: &AppState, email: &str, password: &str) {
        let (status, _jar, _body) = signup(
            State(state.clone()),
            CookieJar::default(),
            Json(SignupRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: "Test".to_string(),
            }),
        )
        .await
        .expect("signup");
        assert_eq!(status, StatusCode::CREATED);
    }

    #[sqlx::test]
    async fn signup_verify_login_lifecycle(pool: PgPool) {
        let state = test_state(pool);
        signup_user(&state, "a@x.com", "pw123456").await;

        // seven chars can never match a six-digit code
        let err = verify(
            State(state.clone()),
            Json(VerifyRequest {
                code: "1234567".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid verification code");

        let stored = User::find_by_email(&state.db, "a@x.com")
            .await
            .expect("query ok")
            .expect("user exists");
        let code = stored.verification_token.clone().expect("pending code");
        assert_eq!(code.len(), 6);

        let Json(verified) = verify(
            State(state.clone()),
            Json(VerifyRequest { code: code.clone() }),
        )
        .await
        .expect("verify");
        assert!(verified.user.is_verified);

        // the code is consumed, a second use fails
        let err = verify(State(state.clone()), Json(VerifyRequest { code }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid verification code");

        let (_jar, Json(logged_in)) = login(
            State(state.clone()),
            CookieJar::default(),
            Json(LoginRequest {
                email: "a@x.com".to_string(),
                password: "pw123456".to_string(),
            }),
        )
        .await
        .expect("login");
        assert!(logged_in.user.last_login.is_some());
    }

    #[sqlx::test]
    async fn login_failures_are_indistinguishable(pool: PgPool) {
        let state = test_state(pool);
        signup_user(&state, "a@x.com", "pw123456").await;

        let wrong_password = login(
            State(state.clone()),
            CookieJar::default(),
            Json(LoginRequest {
                email: "a@x.com".to_string(),
                password: "not-the-password".to_string(),
            }),
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            State(state.clone()),
            CookieJar::default(),
            Json(LoginRequest {
                email: "nobody@x.com".to_string(),
                password: "pw123456".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password.to_string(), "Invalid credentials");
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[sqlx::test]
    async fn reset_password_swaps_credentials(pool: PgPool) {
        let state = test_state(pool);
        signup_user(&state, "a@x.com", "pw123456").await;

        forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            }),
        )
        .await
        .expect("forgot password");

        let stored = User::find_by_email(&state.db, "a@x.com")
            .await
            .expect("query ok")
            .expect("user exists");
        let token = stored.reset_token.clone().expect("pending reset");

        reset_password(
            State(state.clone()),
            Path(token.clone()),
            Json(ResetPasswordRequest {
                password: "newpass123".to_string(),
            }),
        )
        .await
        .expect("reset password");

        login(
            State(state.clone()),
            CookieJar::default(),
            Json(LoginRequest {
                email: "a@x.com".to_string(),
                password: "newpass123".to_string(),
            }),
        )
        .await
        .expect("login with new password");

        let err = login(
            State(state.clone()),
            CookieJar::default(),
            Json(LoginRequest {
                email: "a@x.com".to_string(),
                password: "pw123456".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");

        // the reset token is consumed with the first use
        let err = reset_password(
            State(state),
            Path(token),
            Json(ResetPasswordRequest {
                password: "anotherpw1".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired reset token");
    }
}
