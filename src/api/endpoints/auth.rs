//! Login endpoint — fixed-table credential check.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::types::ApiContext;
use crate::users::{CredentialCheck, Role};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub role: Option<Role>,
    pub message: &'static str,
}

/// `POST /api/login` — verify credentials and return the role label.
///
/// Always answers 200; `success` carries the outcome. The service does
/// not enforce authorization on any other route, so no token is issued.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Json<LoginResponse> {
    let response = match ctx.core.users.verify(&req.username, &req.password) {
        CredentialCheck::Verified(role) => {
            tracing::info!(username = %req.username, %role, "Login successful");
            LoginResponse {
                success: true,
                role: Some(role),
                message: "Login successful",
            }
        }
        CredentialCheck::NotFound => LoginResponse {
            success: false,
            role: None,
            message: "User not found",
        },
        CredentialCheck::WrongPassword => LoginResponse {
            success: false,
            role: None,
            message: "Invalid password",
        },
    };
    Json(response)
}
