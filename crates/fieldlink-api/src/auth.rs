use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use jsonwebtoken::{EncodingKey, Header, encode};

use fieldlink_db::Database;
use fieldlink_gateway::hub::Hub;
use fieldlink_types::api::{Claims, LoginRequest, LoginResponse};
use fieldlink_types::error::ChatError;

use crate::error::ApiError;
use crate::run_blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub hub: Hub,
    pub jwt_secret: String,
    /// Admin login is disabled entirely when unset.
    pub admin_password: Option<String>,
    pub upload_dir: PathBuf,
    pub backup_url: Option<String>,
}

/// The admin identity is synthetic: id 0, role "Admin". It owns no
/// directory row, files no reports and joins no rooms.
pub const ADMIN_ID: i64 = 0;
pub const ADMIN_NAME: &str = "Admin";
pub const ADMIN_ROLE: &str = "Admin";

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.trim().to_string();

    if username == "admin" {
        let ok = state
            .admin_password
            .as_deref()
            .is_some_and(|expected| expected == req.password);
        if !ok {
            return Err(invalid_credentials());
        }

        let token = create_token(&state.jwt_secret, ADMIN_ID, ADMIN_NAME, ADMIN_ROLE, None)?;
        return Ok(Json(LoginResponse {
            technician_id: ADMIN_ID,
            name: ADMIN_NAME.to_string(),
            role: ADMIN_ROLE.to_string(),
            photo: None,
            token,
        }));
    }

    let db = state.db.clone();
    let row = run_blocking(move || db.technician_by_name(&username))
        .await?
        .ok_or_else(invalid_credentials)?;

    let hash = row.password.as_deref().ok_or_else(invalid_credentials)?;
    let parsed_hash = PasswordHash::new(hash).map_err(ChatError::persistence)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid_credentials())?;

    let role = row.role.clone().unwrap_or_default();
    let token = create_token(&state.jwt_secret, row.id, &row.name, &role, row.photo.clone())?;

    Ok(Json(LoginResponse {
        technician_id: row.id,
        name: row.name,
        role,
        photo: row.photo,
        token,
    }))
}

fn invalid_credentials() -> ApiError {
    ChatError::Unauthorized("invalid credentials".to_string()).into()
}

/// Hash a password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ChatError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(ChatError::persistence)?
        .to_string())
}

pub fn create_token(
    secret: &str,
    technician_id: i64,
    name: &str,
    role: &str,
    photo: Option<String>,
) -> Result<String, ChatError> {
    let claims = Claims {
        sub: technician_id,
        name: name.to_string(),
        role: role.to_string(),
        photo,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(ChatError::persistence)
}
