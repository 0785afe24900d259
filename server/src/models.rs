use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// ─── Re-export entity models ───
// Route handlers use entities directly; the aliases below are the
// API-facing names for response bodies.

pub use crate::entities::settings::Model as Settings;
pub use crate::entities::transaction::Model as Transaction;
pub use crate::entities::user::Model as User;

// ─── Domain enumerations ───

/// Fixed transaction type set. Stored as its display string, which is also
/// the wire spelling ("Bill Pay" keeps its space).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Deposit,
    Withdrawal,
    Transfer,
    BillPay,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Deposit => "Deposit",
            TxType::Withdrawal => "Withdrawal",
            TxType::Transfer => "Transfer",
            TxType::BillPay => "Bill Pay",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ApiError> {
        match s {
            "Deposit" => Ok(TxType::Deposit),
            "Withdrawal" => Ok(TxType::Withdrawal),
            "Transfer" => Ok(TxType::Transfer),
            "Bill Pay" => Ok(TxType::BillPay),
            other => Err(ApiError::Validation(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ApiError> {
        match s {
            "Active" => Ok(UserStatus::Active),
            "Inactive" => Ok(UserStatus::Inactive),
            other => Err(ApiError::Validation(format!("unknown status: {other}"))),
        }
    }
}

// ─── Request types ───

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub pin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub pin: Option<String>,
    pub is_admin: Option<bool>,
    pub balance: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBalanceRequest {
    pub balance: f64,
}

#[derive(Debug, Deserialize)]
pub struct SetPinRequest {
    pub pin: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPinRequest {
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPinResponse {
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Admins may record a transaction for any user; everyone else only for
    /// themselves.
    pub user_id: Option<String>,
    pub tx_type: String,
    pub amount: f64,
    pub memo: Option<String>,
    pub recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub system_name: Option<String>,
    pub maintenance_mode: Option<bool>,
    pub allow_new_users: Option<bool>,
    pub contact_email: Option<String>,
}

// ─── Response types ───

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
}

// ─── Field validation ───

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be 3-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::Validation(
            "username can only contain letters, numbers, _ and -".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::Validation("invalid email address".into()));
    };
    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.contains(char::is_whitespace)
    {
        return Err(ApiError::Validation("invalid email address".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_full_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 64 {
        return Err(ApiError::Validation("name must be 1-64 characters".into()));
    }
    Ok(())
}

pub fn validate_pin(pin: &str) -> Result<(), ApiError> {
    if pin.len() < 4 || pin.len() > 6 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation("PIN must be 4-6 digits".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_type_round_trip() {
        for t in ["Deposit", "Withdrawal", "Transfer", "Bill Pay"] {
            assert_eq!(TxType::parse(t).unwrap().as_str(), t);
        }
        assert!(TxType::parse("Wire").is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(UserStatus::parse("Active").unwrap(), UserStatus::Active);
        assert!(UserStatus::parse("active").is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@nodot").is_err());
        assert!(validate_email("alice@.com").is_err());
        assert!(validate_email("a lice@example.com").is_err());
    }

    #[test]
    fn test_pin_validation() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("123456").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("1234567").is_err());
        assert!(validate_pin("12a4").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }
}
