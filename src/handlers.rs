//! HTTP surface of the auth core: the `/auth` endpoints consumed by
//! the clients, plus the health probe.

use actix_web::{HttpResponse, web};
use log::{info, warn};
use std::sync::Arc;

use crate::directory::{EmployeeDirectory, EmployeeRecord};
use crate::error::AuthError;
use crate::guard::middleware::AuthenticatedEmployee;
use crate::models::session::{
    AuthDataResponse, LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest,
    RefreshResponse, UserProfile,
};
use crate::token::TokenService;

/// Shared state for the auth handlers.
pub struct AuthServerState {
    pub tokens: Arc<TokenService>,
    pub directory: Arc<dyn EmployeeDirectory>,
}

fn profile_from(record: EmployeeRecord) -> UserProfile {
    UserProfile {
        account_id: record.account_id,
        name: record.name,
        email: record.email,
        employment_status: record.employment_status,
        role: record.role,
    }
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "fieldforce-auth"
    }))
}

pub async fn login(
    state: web::Data<AuthServerState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    if body.identifier.trim().is_empty() || body.secret.trim().is_empty() {
        return Err(AuthError::Validation(
            "Identifier and secret are required".to_string(),
        ));
    }

    let record = state
        .directory
        .verify_credentials(&body.identifier, &body.secret)
        .await?
        .ok_or_else(|| AuthError::AuthenticationFailed("Invalid credentials".to_string()))?;

    let status = record.employment_status;
    if !status.can_login() {
        warn!(
            "login_denied: subject={}, status={}",
            record.subject, status
        );
        return Err(AuthError::denied_for_status(status));
    }

    let token = state
        .tokens
        .issue(&record.subject, &record.account_id, status)?;

    info!("login_ok: subject={}", record.subject);
    // The sliding-expiration model refreshes with the token itself;
    // no separate refresh token is issued.
    Ok(HttpResponse::Ok().json(AuthDataResponse {
        token,
        refresh_token: None,
        user: profile_from(record),
    }))
}

pub async fn refresh(
    state: web::Data<AuthServerState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AuthError> {
    let refreshed = state.tokens.refresh(&body.token)?;
    let claims = state
        .tokens
        .validate(&refreshed)
        .map_err(|_| AuthError::Internal("Refresh produced an invalid token".to_string()))?;

    // The employment-status flag is mutable: re-read it so a change
    // takes effect at the next refresh instead of riding the old
    // claims until the account next logs in.
    let token = match state.directory.employment_status(&claims.account_id).await? {
        Some(current) if !current.can_login() => {
            warn!(
                "refresh_denied: subject={}, status={}",
                claims.sub, current
            );
            return Err(AuthError::denied_for_status(current));
        }
        Some(current) if current != claims.employment_status => {
            state.tokens.issue(&claims.sub, &claims.account_id, current)?
        }
        _ => refreshed,
    };

    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

pub async fn logout(
    state: web::Data<AuthServerState>,
    body: web::Json<LogoutRequest>,
) -> Result<HttpResponse, AuthError> {
    // Token revocation lives with the data store, out of scope here;
    // the subject is logged for auditing when the token still decodes.
    match state.tokens.validate(&body.token) {
        Ok(claims) => info!("logout_ok: subject={}", claims.sub),
        Err(_) => info!("logout_ok: token already invalid"),
    }

    Ok(HttpResponse::Ok().json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}

pub async fn current_user(
    state: web::Data<AuthServerState>,
    employee: AuthenticatedEmployee,
) -> Result<HttpResponse, AuthError> {
    let profile = match state
        .directory
        .find_by_account_id(&employee.account_id)
        .await?
    {
        Some(record) => profile_from(record),
        // Directory unavailable for this account: answer from the
        // token identity.
        None => UserProfile {
            account_id: employee.account_id.clone(),
            name: employee.subject.clone(),
            email: None,
            employment_status: employee.employment_status,
            role: None,
        },
    };

    Ok(HttpResponse::Ok().json(profile))
}
