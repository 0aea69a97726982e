//! Credential checks and admin session tokens.
//!
//! Passwords are stored and compared as plaintext, matching the original
//! app (see DESIGN.md). A successful login yields a JWT whose subject is the
//! company id; admin endpoints only accept a token for their own company.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::AuthPayload;
use crate::storage::Storage;

const SESSION_TTL_SECS: usize = 3600; // 1 hour, like the browser session

fn secret() -> Vec<u8> {
    std::env::var("FLUXO_JWT_SECRET")
        .unwrap_or_else(|_| "fluxoagil_dev_secret".to_string())
        .into_bytes()
}

/// Plaintext comparison against the credential store. A company with no
/// stored password cannot log in.
pub fn verify_password(storage: &Storage, company_id: &str, password: &str) -> bool {
    match storage.password_for(company_id) {
        Ok(Some(stored)) => stored == password,
        _ => false,
    }
}

pub fn create_jwt(company_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
        + SESSION_TTL_SECS;

    let claims = AuthPayload {
        sub: company_id.to_owned(),
        exp: expiration,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(&secret()))
}

pub fn validate_jwt(token: &str) -> Result<AuthPayload, jsonwebtoken::errors::Error> {
    let token_data = decode::<AuthPayload>(
        token,
        &DecodingKey::from_secret(&secret()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(token_data.claims)
}
