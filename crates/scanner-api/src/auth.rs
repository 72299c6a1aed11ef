use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use scanner_db::Database;
use scanner_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;
use crate::service::ReadService;

const TOKEN_TTL_HOURS: i64 = 12;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub service: ReadService,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.len() < 3 || email.len() > 254 || !email.contains('@') {
        return Err(ApiError::bad_request("email is not valid"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    // Hashing and the insert both block
    let db = state.db.clone();
    let user_id = tokio::task::spawn_blocking(move || {
        if db.get_web_user_by_email(&email)?.is_some() {
            return Err(ApiError::conflict(format!("user with email {email} already exists")));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow!("hash password: {e}"))?
            .to_string();

        match db.create_web_user(&email, &password_hash) {
            Ok(id) => Ok(id),
            Err(e) if scanner_db::is_unique_violation(&e) => Err(ApiError::conflict(format!(
                "user with email {email} already exists"
            ))),
            Err(e) => Err(e.into()),
        }
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    info!(user_id, "web user registered");
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        let user = db
            .get_web_user_by_email(&email)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;

        let parsed_hash =
            PasswordHash::new(&user.password).map_err(|e| anyhow!("parse password hash: {e}"))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::unauthorized("password is incorrect"))?;

        Ok::<_, ApiError>(user)
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let token = create_token(&state.jwt_secret, user.id, &user.email)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: i64, email: &str) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
