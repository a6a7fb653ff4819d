use serde::{Deserialize, Serialize};

use crate::entity::enums::VerificationType;
use crate::models::{AccessGate, User};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub college: String,
    pub verification_type: VerificationType,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub gate: AccessGate,
}
