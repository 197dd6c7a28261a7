use anyhow::Context;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        repo_types::User,
    },
    error::{method_not_allowed, ApiError, ApiResult},
    extract::JsonBody,
    response::Envelope,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register).fallback(method_not_allowed))
        .route("/auth/login", post(login).fallback(method_not_allowed))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).fallback(method_not_allowed))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> ApiResult<Json<Envelope<PublicUser>>> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::BadRequest("invalid email".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let db = state.db.pool().await?;

    if User::email_exists(&db, &email).await? {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let password = payload.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task")??;

    let user = match User::create(&db, &email, &hash).await {
        Ok(u) => u,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!(email = %email, "lost registration race");
            return Err(ApiError::Conflict("email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(Json(Envelope::data(PublicUser {
        id: user.id,
        email: user.email,
    })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(&payload.email);
    let db = state.db.pool().await?;

    let Some(user) = User::find_by_email(&db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    };

    let password = payload.password;
    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .context("password verification task")?;
    if !ok {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    let token = state.jwt.issue(user.id, &user.email)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        ok: true,
        token,
        data: PublicUser {
            id: user.id,
            email: user.email,
        },
    }))
}

/// Answers from the verified token alone; no database round trip.
#[instrument]
pub async fn get_me(auth: AuthUser) -> Json<Envelope<PublicUser>> {
    Json(Envelope::data(PublicUser {
        id: auth.user_id,
        email: auth.email,
    }))
}
