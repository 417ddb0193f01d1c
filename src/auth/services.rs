use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{AuthResponse, RegisterRequest};
use super::jwt::JwtKeys;
use super::repo_types::User;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_DISPLAY_NAME_CHARS: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalizes the request in place and checks it.
pub(crate) fn validate_registration(payload: &mut RegisterRequest) -> Result<(), String> {
    payload.email = normalize_email(&payload.email);
    payload.display_name = payload.display_name.trim().to_string();

    if !is_valid_email(&payload.email) {
        return Err("Invalid email".into());
    }
    let name_len = payload.display_name.chars().count();
    if name_len == 0 || name_len > MAX_DISPLAY_NAME_CHARS {
        return Err(format!(
            "Display name must be between 1 and {MAX_DISPLAY_NAME_CHARS} characters"
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err("Password too short".into());
    }
    Ok(())
}

/// Signs a fresh access/refresh pair for `user`.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: User) -> anyhow::Result<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: user.into(),
    })
}
