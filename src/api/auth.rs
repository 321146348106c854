//! Login endpoints and minimal JWT sessions.
//!
//! - Dashboard users log in with username/password at `/api/auth/login`
//! - Employees log in with their system credentials at `/api/auth/employee-login`
//! - When `DEV_MODE=false`, protected endpoints require `Authorization: Bearer <jwt>`
//!
//! # Security notes
//! Passwords are stored and compared as plaintext. Use a strong `JWT_SECRET`
//! outside development.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use super::error::{not_found, store_error, ApiError};
use super::routes::AppState;
use super::types::{
    EmployeeLoginRequest, EmployeeLoginResponse, LoginRequest, LoginResponse, LogoutRequest,
    VerifyFaceRequest, VerifyQrRequest, VerifyQrResponse,
};
use crate::attendance::{verify_qr as qr_matches, FaceMatch};
use crate::config::Config;
use crate::directory::{Employee, Role};
use crate::events::ChangeEvent;

/// Session claims. `require_auth` stores them in the request extensions.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct Claims {
    /// User or employee id
    pub(crate) sub: String,
    pub(crate) role: Role,
    /// Issued-at unix seconds
    pub(crate) iat: i64,
    /// Expiration unix seconds
    pub(crate) exp: i64,
}

fn issue_jwt(secret: &str, ttl_days: i64, sub: &str, role: Role) -> anyhow::Result<(String, i64)> {
    let now = Utc::now();
    let exp = now + Duration::days(ttl_days.max(1));
    let claims = Claims {
        sub: sub.to_string(),
        role,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims.exp))
}

fn verify_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Issue a session token when a signing secret is configured.
fn session_token(
    config: &Config,
    sub: &str,
    role: Role,
) -> Result<(Option<String>, Option<i64>), ApiError> {
    match config.auth.jwt_secret.as_deref() {
        Some(secret) => {
            let (token, exp) = issue_jwt(secret, config.auth.jwt_ttl_days, sub, role)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            Ok((Some(token), Some(exp)))
        }
        None => Ok((None, None)),
    }
}

/// Role a request acts as.
///
/// A session token always wins. Without one, the requested role is trusted
/// only in dev mode (defaulting to `employee`).
pub(crate) fn acting_role(
    config: &Config,
    claims: Option<Extension<Claims>>,
    requested: Option<&str>,
) -> Result<Role, ApiError> {
    if let Some(Extension(claims)) = claims {
        if let Some(name) = requested {
            if Role::parse(name) != Some(claims.role) {
                tracing::debug!(
                    "Ignoring requested role '{}' for {} ({})",
                    name,
                    claims.sub,
                    claims.role
                );
            }
        }
        return Ok(claims.role);
    }
    if !config.dev_mode {
        return Err((StatusCode::UNAUTHORIZED, "Missing session".to_string()));
    }
    match requested {
        None => Ok(Role::Employee),
        Some(name) => Role::parse(name)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown role '{}'", name))),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .store
        .find_user(req.username.trim(), &req.password)
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            )
        })?;

    let (token, exp) = session_token(&state.config, &user.id, user.role)?;
    tracing::info!("User {} logged in as {}", user.username, user.role);
    Ok(Json(LoginResponse { token, exp, user }))
}

pub async fn employee_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmployeeLoginRequest>,
) -> Result<Json<EmployeeLoginResponse>, ApiError> {
    let mut employee = state
        .store
        .find_employee_by_login(req.login.trim(), &req.password)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Invalid login or password".to_string()))?;

    if !employee.is_active() {
        return Err((
            StatusCode::UNAUTHORIZED,
            format!("Employee {} is {}", employee.id, employee.status.as_str()),
        ));
    }

    set_online(&state, &mut employee, true).await?;
    let (token, exp) = session_token(&state.config, &employee.id, Role::Employee)?;
    Ok(Json(EmployeeLoginResponse {
        token,
        exp,
        employee,
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<Employee>, ApiError> {
    let mut employee = state
        .store
        .get_employee(&req.employee_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Employee", &req.employee_id))?;
    set_online(&state, &mut employee, false).await?;
    Ok(Json(employee))
}

async fn set_online(state: &AppState, employee: &mut Employee, online: bool) -> Result<(), ApiError> {
    employee.is_online = online;
    state.store.put_employee(employee).await.map_err(store_error)?;
    tracing::debug!("Employee {} online={}", employee.id, online);
    state.events.publish(ChangeEvent::EmployeeChanged {
        employee: employee.clone(),
    });
    Ok(())
}

pub async fn verify_face(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyFaceRequest>,
) -> Result<Json<FaceMatch>, ApiError> {
    let employee = state
        .store
        .get_employee(&req.employee_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Employee", &req.employee_id))?;
    let result = state.face.verify(&employee, &req.image).await;
    if !result.success {
        tracing::info!("Face check failed for {}", employee.id);
    }
    Ok(Json(result))
}

pub async fn verify_qr(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyQrRequest>,
) -> Result<Json<VerifyQrResponse>, ApiError> {
    let employee = match req.employee_id.as_deref() {
        Some(id) => state.store.get_employee(id).await.map_err(store_error)?,
        None => state
            .store
            .list_employees()
            .await
            .map_err(store_error)?
            .into_iter()
            .find(|e| qr_matches(e, &req.payload)),
    };

    let employee = employee.filter(|e| qr_matches(e, &req.payload));
    Ok(Json(VerifyQrResponse {
        success: employee.is_some(),
        employee,
    }))
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Dev mode => no auth checks.
    if !state.config.auth.auth_required(state.config.dev_mode) {
        return next.run(req).await;
    }

    // Fail closed when no secret is configured.
    let secret = match state.config.auth.jwt_secret.as_deref() {
        Some(s) => s,
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "JWT_SECRET not configured",
            )
                .into_response();
        }
    };

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response();
    }

    match verify_jwt(token, secret) {
        Ok(claims) => {
            tracing::trace!("Authenticated {} ({})", claims.sub, claims.role);
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    }
}
