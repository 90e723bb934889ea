//! Service Account Credentials
//!
//! Loads a Google service account key and signs RS256 JWT assertions for the
//! OAuth2 JWT-bearer grant. Key material is parsed once and never logged.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::auth;
use crate::types::{Result, SeoError};

/// Encode bytes as base64url without padding
pub fn base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Service account JSON as downloaded from the cloud console
#[derive(Deserialize)]
struct ServiceAccountFile {
    #[serde(rename = "type", default)]
    account_type: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    private_key_id: String,
    private_key: String,
    client_email: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A service account identity able to sign assertions
pub struct ServiceCredential {
    client_email: String,
    private_key_id: String,
    token_uri: String,
    project_id: Option<String>,
    signer: SigningKey<Sha256>,
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServiceCredential {
    /// Parse service account JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ServiceAccountFile = serde_json::from_str(json)
            .map_err(|e| SeoError::InvalidCredential(format!("not a service account key: {}", e)))?;

        if let Some(kind) = &file.account_type
            && kind != "service_account"
        {
            return Err(SeoError::InvalidCredential(format!(
                "expected type 'service_account', got '{}'",
                kind
            )));
        }

        let pem = SecretString::from(file.private_key);
        let key = parse_private_key(&pem)?;

        Ok(Self {
            client_email: file.client_email,
            private_key_id: file.private_key_id,
            token_uri: file
                .token_uri
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| auth::DEFAULT_TOKEN_URI.to_string()),
            project_id: file.project_id,
            signer: SigningKey::<Sha256>::new(key),
        })
    }

    /// Read service account JSON from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SeoError::CredentialsMissing(format!(
                "credentials file not found: {}",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Read service account JSON from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(json) if !json.trim().is_empty() => Self::from_json(&json),
            _ => Err(SeoError::CredentialsMissing(format!(
                "environment variable {} not set",
                var
            ))),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn key_id(&self) -> &str {
        &self.private_key_id
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Claims for an assertion requesting `scope`, issued at `now`
    pub fn claims(&self, scope: &str, now: DateTime<Utc>) -> JwtClaims {
        let iat = now.timestamp();
        JwtClaims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + auth::ASSERTION_LIFETIME_SECS,
            scope: scope.to_string(),
        }
    }

    /// Build and sign an assertion for `scope`
    pub fn sign_assertion(&self, scope: &str, now: DateTime<Utc>) -> Result<JwtAssertion> {
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: &self.private_key_id,
        };
        let claims = self.claims(scope, now);

        let signing_input = format!(
            "{}.{}",
            base64url(&serde_json::to_vec(&header)?),
            base64url(&serde_json::to_vec(&claims)?)
        );
        let signature = self
            .signer
            .try_sign(signing_input.as_bytes())
            .map_err(|e| SeoError::InvalidCredential(format!("signing failed: {}", e)))?;

        Ok(JwtAssertion {
            token: SecretString::from(format!(
                "{}.{}",
                signing_input,
                base64url(&signature.to_bytes())
            )),
            claims,
        })
    }
}

fn parse_private_key(pem: &SecretString) -> Result<RsaPrivateKey> {
    let pem = pem.expose_secret();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| {
            SeoError::InvalidCredential("private_key is not a PEM encoded RSA key".to_string())
        })
}

#[derive(Debug, Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
    kid: &'a str,
}

/// Assertion payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub scope: String,
}

/// A signed assertion, ready for the token endpoint
pub struct JwtAssertion {
    token: SecretString,
    pub claims: JwtClaims,
}

impl JwtAssertion {
    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

impl std::fmt::Debug for JwtAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAssertion")
            .field("token", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}
