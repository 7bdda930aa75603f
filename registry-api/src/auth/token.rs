//! Verification of bearer tokens issued to trusted applications.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;

/// Claims read from a verified token. The audience is checked during
/// verification and not kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Checks HS256 tokens signed with the shared internal secret whose `aud`
/// is this application's id.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    disabled: bool,
}

impl TokenVerifier {
    pub fn new(settings: &AuthSettings, disabled: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&settings.application_id]);
        // Tokens from the issuing application carry no expiry.
        validation.set_required_spec_claims(&["aud"]);

        Self {
            key: DecodingKey::from_secret(settings.internal_secret.as_bytes()),
            validation,
            disabled,
        }
    }

    /// Whether requests are let through without a token.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}
