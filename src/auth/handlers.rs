use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AccessTokenResponse, ExchangeRequest, LinkTokenResponse, LoginRequest, PublicUser,
            RefreshRequest, RegisterRequest, RegisterResponse, TokenPairResponse,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        link::generate_link_token,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::{ApiError, ApiResult},
    state::AppState,
    throttle::client_ip,
};

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register/", post(register))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/refresh/", post(refresh))
}

pub fn extension_link_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/extension/link-token/", post(issue_link_token))
        .route("/api/auth/extension/exchange/", post(exchange_link_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        return Err(ApiError::validation("username", "This field may not be blank."));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("email", "Enter a valid email address."));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::validation(
            "password",
            "Password must be at least 8 characters.",
        ));
    }

    if User::find_by_username(&state.db, &payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already registered");
        return Err(ApiError::conflict("A user with that username already exists."));
    }
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::conflict("A user with that email already exists."));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            access,
            refresh,
            user: PublicUser {
                id: user.id,
                username: user.username,
                email: user.email,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    payload.username = payload.username.trim().to_string();

    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::unauthorized("No active account found with the given credentials")
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized(
            "No active account found with the given credentials",
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(TokenPairResponse { access, refresh }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AccessTokenResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh)
        .map_err(|_| ApiError::unauthorized("Token is invalid or expired"))?;

    let access = keys.sign_access(claims.sub)?;
    Ok(Json(AccessTokenResponse { access }))
}

/// Issues a one-time token bridging this (already authenticated) session
/// to the browser extension. Re-issuing invalidates the previous token.
#[instrument(skip(state))]
pub async fn issue_link_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<LinkTokenResponse>> {
    let token = generate_link_token();
    User::set_link_token(&state.db, user_id, &token).await?;

    info!(user_id = %user_id, "extension link token issued");
    Ok(Json(LinkTokenResponse { token }))
}

/// Trades a link token for a credential pair. Reachable without prior
/// auth, so attempts are throttled per client IP.
#[instrument(skip(state, headers, payload))]
pub async fn exchange_link_token(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ExchangeRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let ip = client_ip(&headers, peer.ip());
    if !state.exchange_throttle.check(ip).await {
        warn!(%ip, "exchange attempts throttled");
        return Err(ApiError::Throttled);
    }

    let token = payload.token.trim();
    if token.is_empty() {
        return Err(ApiError::validation("token", "This field is required."));
    }

    let user = User::take_by_link_token(&state.db, token)
        .await?
        .ok_or_else(|| {
            warn!(%ip, "exchange with unknown link token");
            ApiError::unauthorized("Invalid link token.")
        })?;

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, "extension link token exchanged");
    Ok(Json(TokenPairResponse { access, refresh }))
}
