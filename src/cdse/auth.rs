use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use super::CdseError;

/// Keycloak token endpoint of the CDSE identity service.
const TOKEN_URL: &str =
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";

/// Copernicus Data Space account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Load credentials from a `KEY=value` file with `USER` and `PASSWORD`
    /// entries. Blank lines and `#` comments are ignored; whitespace around
    /// keys and values is trimmed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CdseError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CdseError::CredentialsNotFound(path.to_path_buf()));
        }

        let mut entries = HashMap::new();
        for line in fs::read_to_string(path)?.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        let username = entries
            .remove("USER")
            .filter(|value| !value.is_empty())
            .ok_or(CdseError::MissingCredential("USER"))?;
        let password = entries
            .remove("PASSWORD")
            .filter(|value| !value.is_empty())
            .ok_or(CdseError::MissingCredential("PASSWORD"))?;

        info!("Loaded credentials from {:?}", path);
        Ok(Credentials { username, password })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Request a short-lived access token from the identity service.
///
/// Tokens expire after a few minutes, so batch downloads request a fresh
/// one per product instead of reusing a session-wide token.
pub fn request_access_token(
    client: &reqwest::blocking::Client,
    credentials: &Credentials,
) -> Result<String, CdseError> {
    request_token_from_url(client, TOKEN_URL, credentials)
}

fn request_token_from_url(
    client: &reqwest::blocking::Client,
    url: &str,
    credentials: &Credentials,
) -> Result<String, CdseError> {
    let form = [
        ("client_id", "cdse-public"),
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
        ("grant_type", "password"),
    ];
    let response = client.post(url).form(&form).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(CdseError::Auth {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }
    let token: TokenResponse = response.json()?;
    Ok(token.access_token)
}
