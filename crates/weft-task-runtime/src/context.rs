use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A stored provider credential (API key, token, ...).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
  pub id: String,
  pub name: String,
  pub value: String,
  /// Provider the credential belongs to, e.g. "openai", "anthropic", "replicate".
  pub credential_type: String,
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credential")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("value", &"<redacted>")
      .field("credential_type", &self.credential_type)
      .finish()
  }
}

/// Opaque configuration handed to every executor invocation.
///
/// The orchestrator shares one context across all nodes of a run and never
/// reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
  /// Credentials keyed by credential id.
  #[serde(default)]
  pub credentials: HashMap<String, Credential>,
  /// Provider settings (base URLs, default models, polling intervals).
  #[serde(default)]
  pub provider_config: serde_json::Value,
}

impl ExecutionContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_credential(mut self, credential: Credential) -> Self {
    self.credentials.insert(credential.id.clone(), credential);
    self
  }

  pub fn with_provider_config(mut self, provider_config: serde_json::Value) -> Self {
    self.provider_config = provider_config;
    self
  }

  /// First credential for the given provider, ordered by id.
  pub fn credential_for(&self, credential_type: &str) -> Option<&Credential> {
    self
      .credentials
      .values()
      .filter(|c| c.credential_type == credential_type)
      .min_by(|a, b| a.id.cmp(&b.id))
  }
}
