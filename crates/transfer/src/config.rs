//! Uploader configuration.
//!
//! Configuration is usually built in code, but can also be read from a JSON
//! file or from the `AZURE_STORAGE_*` environment variables used by the Azure
//! tooling.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigField, UploadError};

const ENV_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
const ENV_CONTAINER: &str = "AZURE_STORAGE_CONTAINER";
const ENV_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";
const ENV_ENDPOINT: &str = "AZURE_STORAGE_ENDPOINT";

/// Connection settings for one blob container.
#[derive(Clone, Default, Deserialize)]
pub struct UploaderConfig {
    /// Storage account name.
    #[serde(default, alias = "storageAccount")]
    pub account: String,

    /// Target container.
    #[serde(default, alias = "containerName")]
    pub container: String,

    /// SAS query string, with or without the leading `?`.
    #[serde(default, alias = "sasToken")]
    pub sas_token: String,

    /// Origin override, e.g. a local emulator. Defaults to
    /// `https://{account}.blob.core.windows.net`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for UploaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploaderConfig")
            .field("account", &self.account)
            .field("container", &self.container)
            .field("sas_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl UploaderConfig {
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        sas_token: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            sas_token: sas_token.into(),
            endpoint: None,
        }
    }

    /// Sets a custom origin (scheme + host, optionally a path prefix).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Parses a JSON document. Both `snake_case` and the `storageAccount` /
    /// `containerName` / `sasToken` spellings are accepted.
    pub fn from_json_str(json: &str) -> Result<Self, UploadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Reads `AZURE_STORAGE_ACCOUNT`, `AZURE_STORAGE_CONTAINER`,
    /// `AZURE_STORAGE_SAS_TOKEN` and the optional `AZURE_STORAGE_ENDPOINT`.
    ///
    /// Missing variables become empty strings; [`validate`](Self::validate)
    /// reports them.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).unwrap_or_default();
        Self {
            account: var(ENV_ACCOUNT),
            container: var(ENV_CONTAINER),
            sas_token: var(ENV_SAS_TOKEN),
            endpoint: lookup(ENV_ENDPOINT).filter(|e| !e.is_empty()),
        }
    }

    /// Checks required fields in order: account, container, token.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.account.is_empty() {
            return Err(UploadError::MissingConfig(ConfigField::Account));
        }
        if self.container.is_empty() {
            return Err(UploadError::MissingConfig(ConfigField::Container));
        }
        if self.sas_token.is_empty() {
            return Err(UploadError::MissingConfig(ConfigField::SasToken));
        }
        Ok(())
    }

    /// `{origin}/{container}` without a trailing slash.
    pub(crate) fn base_url(&self) -> String {
        let origin = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account),
        };
        format!("{origin}/{}", self.container)
    }
}

/// Public view of the uploader configuration. Never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub account: String,
    pub container: String,
    pub base_url: String,
}
