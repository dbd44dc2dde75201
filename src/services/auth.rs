//! Authentication service: password hashing and JWT issuing

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        token::{AccessToken, TokenClaims, TokenPair, TokenType},
        user::{normalize_email, User},
    },
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Exchange email and password for an access/refresh pair
    pub async fn obtain_pair(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .repository
            .users
            .get_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password)? {
            tracing::debug!("Rejected credentials for user {}", user.id);
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        tracing::info!("Issued token pair for user {}", user.id);
        self.issue_pair(&user)
    }

    /// Build a fresh access/refresh pair for a user
    pub fn issue_pair(&self, user: &User) -> AppResult<TokenPair> {
        let template = TokenClaims {
            sub: user.id.to_string(),
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            token_type: TokenType::Access,
            jti: String::new(),
            exp: 0,
            iat: 0,
        };

        Ok(TokenPair {
            access: self.sign(&template, TokenType::Access)?,
            refresh: self.sign(&template, TokenType::Refresh)?,
        })
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> AppResult<AccessToken> {
        let claims = self.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication("Token has wrong type".to_string()));
        }

        Ok(AccessToken {
            access: self.sign(&claims, TokenType::Access)?,
        })
    }

    /// Check signature and expiry of any token
    pub fn verify(&self, token: &str) -> AppResult<TokenClaims> {
        self.decode(token)
    }

    /// Decode an access token presented as a bearer credential
    pub fn authenticate(&self, token: &str) -> AppResult<TokenClaims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::Authentication("Token has wrong type".to_string()));
        }
        Ok(claims)
    }

    fn decode(&self, token: &str) -> AppResult<TokenClaims> {
        TokenClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Token is invalid or expired".to_string()))
    }

    fn sign(&self, base: &TokenClaims, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now();
        let lifetime = match token_type {
            TokenType::Access => Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => Duration::hours(self.config.refresh_token_hours),
        };

        let claims = TokenClaims {
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            ..base.clone()
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}
