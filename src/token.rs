use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::AuthError, models::Role};

/// Audience
///
/// The `aud` claim may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Claims
///
/// The verified payload of a bearer credential issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the external identity of the caller.
    pub sub: String,
    /// Issuer (iss): the domain of the identity provider.
    #[serde(default)]
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Authorized party (azp): the origin the token was minted for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub nbf: i64,
    /// Unique id of the token.
    #[serde(default)]
    pub jti: String,
    /// Optional role claim. `null` and absent are equivalent.
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    /// Resolves the role claim, defaulting to [`Role::User`].
    pub fn role(&self) -> Role {
        Role::from_claim(self.role.as_deref())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Extracts the token from a raw `Authorization` header value.
///
/// The checks run in a fixed order: empty header, scheme, empty token.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::EmptyCredentials)?;

    let mut segments = header.split_whitespace();

    if segments.next() != Some("Bearer") {
        return Err(AuthError::InvalidAuthenticationType);
    }

    segments
        .next()
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::EmptyCredentials)
}

/// TokenVerifier
///
/// Verifies RS256 bearer tokens against a single RSA public key loaded at startup.
/// Holds no mutable state; cloning shares nothing but immutable key material.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Parses a PEM encoded RSA public key (SPKI or PKCS#1).
    ///
    /// Issuer and audience are not checked unless configured with
    /// [`with_issuer`](Self::with_issuer) / [`with_audience`](Self::with_audience).
    pub fn from_rsa_pem(pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self { key, validation })
    }

    /// Builds the verifier from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut verifier =
            Self::from_rsa_pem(&config.jwt_public_key)?.with_leeway(config.jwt_leeway_secs);
        if let Some(issuer) = &config.jwt_issuer {
            verifier = verifier.with_issuer(issuer);
        }
        if let Some(audience) = &config.jwt_audience {
            verifier = verifier.with_audience(audience);
        }
        Ok(verifier)
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.validation.leeway = leeway_secs;
        self
    }

    /// Verifies the raw `Authorization` header value and returns the decoded claims.
    pub fn verify(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let token = extract_bearer(authorization)?;
        self.verify_token(token)
    }

    /// Verifies a bare token (no `Bearer` prefix).
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(reason = ?e.kind(), "bearer token rejected");
            AuthError::InvalidCredentials
        })?;

        let claims = token_data.claims;

        if claims.sub.trim().is_empty() {
            tracing::debug!("bearer token rejected: empty subject");
            return Err(AuthError::InvalidCredentials);
        }
        if claims.exp <= claims.iat {
            tracing::debug!(
                exp = claims.exp,
                iat = claims.iat,
                "bearer token rejected: exp not after iat"
            );
            return Err(AuthError::InvalidCredentials);
        }

        Ok(claims)
    }
}
