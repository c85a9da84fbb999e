//! Password hashing, bearer tokens and the request extractors built on them.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use argon2::{
    password_hash::{Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use model::entities::user;
use rand::RngCore;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthSettings;
use crate::error::ApiError;
use crate::logging::SECURITY_TARGET;
use crate::schemas::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Signs and validates the HS256 bearer tokens.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: chrono::Duration,
}

impl AuthManager {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            validation,
            token_ttl: settings.token_ttl(),
        }
    }

    pub fn issue_token(&self, user_id: i32) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.token_ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Returns the user id carried by a valid token.
    pub fn validate_token(&self, token: &str) -> Result<i32, ApiError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token expired".to_string()),
            other => {
                debug!("Rejected token: {:?}", other);
                ApiError::Unauthorized("Invalid token".to_string())
            }
        })?;
        data.claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))
    }

    pub fn expires_in_seconds(&self) -> i64 {
        self.token_ttl.num_seconds()
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| ApiError::Internal(format!("Failed to encode salt: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Checks a candidate against a stored PHC string. Malformed hashes never match.
pub fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return Ok(false);
    };
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(other) => Err(ApiError::Internal(format!("Password verification failed: {other}"))),
    }
}

/// The authenticated, active user behind the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;

        let user_id = state.auth.validate_token(token.trim())?;
        let user = user::Entity::find_by_id(user_id)
            .one(&state.db)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                warn!(target: SECURITY_TARGET, user_id, "Token presented for a missing or inactive user");
                ApiError::Unauthorized("Invalid token".to_string())
            })?;
        debug!("Authenticated user {}", user.id);
        Ok(CurrentUser(user))
    }
}

/// Client address used for lockout counters and audit events.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// Client address as seen by the outermost trusted proxy.
///
/// Proxies append the address they received the request from, so only the
/// last `trusted_proxies` hops of `X-Forwarded-For` are trustworthy. The
/// client address is the hop added by the outermost of them; anything to its
/// left is client supplied and ignored. Without trusted proxies, or when the
/// header has fewer hops than expected, the socket peer is used.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted_proxies: usize) -> String {
    let forwarded = (trusted_proxies > 0)
        .then(|| {
            let hops: Vec<&str> = headers
                .get_all("x-forwarded-for")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect();
            hops.len()
                .checked_sub(trusted_proxies)
                .and_then(|index| hops.get(index))
                .and_then(|hop| hop.parse::<IpAddr>().ok())
        })
        .flatten();
    forwarded
        .or(peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientIp(resolve_client_ip(
            &parts.headers,
            peer,
            state.settings.auth.trusted_proxies,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 30,
            failure_limit: 5,
            cooloff_minutes: 60,
            trusted_proxies: 1,
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(!verify_password("correct horse", "not-a-hash").unwrap());
    }

    #[test]
    fn test_token_carries_user_id() {
        let manager = AuthManager::new(&settings());
        let token = manager.issue_token(42).unwrap();
        assert_eq!(manager.validate_token(&token).unwrap(), 42);
        assert_eq!(manager.expires_in_seconds(), 30 * 60);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = AuthManager::new(&settings()).issue_token(1).unwrap();
        let mut other = settings();
        other.jwt_secret = "another-secret".to_string();
        let result = AuthManager::new(&other).validate_token(&token);
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_client_ip_uses_trusted_hop() {
        let peer = Some("10.0.0.2".parse().unwrap());
        let headers = forwarded("1.2.3.4, 203.0.113.7");

        assert_eq!(resolve_client_ip(&headers, peer, 1), "203.0.113.7");
        assert_eq!(resolve_client_ip(&headers, peer, 2), "1.2.3.4");
        assert_eq!(resolve_client_ip(&headers, peer, 3), "10.0.0.2");
    }

    #[test]
    fn test_client_ip_ignores_header_without_proxies() {
        let peer = Some("10.0.0.2".parse().unwrap());
        assert_eq!(resolve_client_ip(&forwarded("1.2.3.4"), peer, 0), "10.0.0.2");
        assert_eq!(resolve_client_ip(&forwarded("not-an-ip"), None, 1), "unknown");
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None, 0), "unknown");
    }
}
