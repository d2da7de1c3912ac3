//! Request authorization: anti-forgery token → principal → capability.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read counts and delete catalog/order records.
    ManageStore,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub capabilities: Vec<Capability>,
}

impl Principal {
    /// The operator of a local, in-process store.
    pub fn local_operator() -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
        Self {
            name: format!("{}@local", user),
            capabilities: vec![Capability::ManageStore],
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(format!(
                "{} lacks capability {:?}",
                self.name, capability
            )))
        }
    }
}

/// Configured token grant. Only the blake3 digest of the token is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub name: String,
    pub token_hash: String,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<Capability>,
}

fn default_capabilities() -> Vec<Capability> {
    vec![Capability::ManageStore]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), String> {
        for grant in &self.tokens {
            if grant.name.trim().is_empty() {
                return Err("Token grant name cannot be empty".to_string());
            }
            if grant.token_hash.len() != 64 || hex::decode(&grant.token_hash).is_err() {
                return Err(format!(
                    "Token grant '{}' must carry a 64-character hex blake3 digest",
                    grant.name
                ));
            }
        }
        Ok(())
    }
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, token: &str) -> Result<Principal, ApiError>;
}

/// Resolves tokens against configured grants.
pub struct TokenAuthorizer {
    grants: HashMap<String, TokenGrant>,
}

impl TokenAuthorizer {
    pub fn new(config: &AuthConfig) -> Self {
        let grants = config
            .tokens
            .iter()
            .map(|grant| (grant.token_hash.to_ascii_lowercase(), grant.clone()))
            .collect();
        Self { grants }
    }
}

impl Authorizer for TokenAuthorizer {
    fn authorize(&self, token: &str) -> Result<Principal, ApiError> {
        if token.is_empty() {
            return Err(ApiError::Unauthorized("missing token".to_string()));
        }
        match self.grants.get(&hash_token(token)) {
            Some(grant) => Ok(Principal {
                name: grant.name.clone(),
                capabilities: grant.capabilities.clone(),
            }),
            None => {
                warn!("Rejected request with unrecognised token");
                Err(ApiError::Unauthorized("unrecognised token".to_string()))
            }
        }
    }
}

/// Trusts every caller as the local operator. Used when the CLI drives an
/// in-process store it already has filesystem access to.
pub struct LocalAuthorizer;

impl Authorizer for LocalAuthorizer {
    fn authorize(&self, _token: &str) -> Result<Principal, ApiError> {
        Ok(Principal::local_operator())
    }
}

/// Hex blake3 digest of a token, as stored in `auth.tokens[].token_hash`.
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}
