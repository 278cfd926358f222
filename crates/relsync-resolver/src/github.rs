use anyhow::{Context, Result};
use relsync_core::SyncError;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION};
use tracing::{debug, info};

use crate::{HttpTransport, TransportResponse};

pub const DEFAULT_USER_AGENT: &str = concat!("relsync/", env!("CARGO_PKG_VERSION"));

/// Release API transport backed by one long-lived blocking client, so
/// every request reuses the same connection pool.
#[derive(Debug, Clone)]
pub struct GithubTransport {
    client: Client,
    api_base: String,
    authenticated: bool,
}

impl GithubTransport {
    pub fn new(api_base: &str, user_agent: &str, api_token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("api_token contains characters not allowed in a header")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            authenticated: api_token.is_some(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Confirms the configured bearer credential is accepted. Without a
    /// credential there is nothing to check.
    pub fn validate_credential(&self) -> Result<()> {
        if !self.authenticated {
            return Ok(());
        }

        let url = format!("{}/user", self.api_base);
        let response = self.get(&url)?;
        if !response.is_success() {
            return Err(SyncError::Transport {
                url,
                reason: format!("api_token rejected with status {}", response.status),
            }
            .into());
        }

        info!("api token validated");
        Ok(())
    }
}

impl HttpTransport for GithubTransport {
    fn get(&self, url: &str) -> Result<TransportResponse> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SyncError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_disposition_file_name);

        Ok(TransportResponse {
            status: response.status().as_u16(),
            file_name,
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

/// Extracts the proposed file name from a content-disposition value,
/// preferring the RFC 5987 `filename*` form. Only the final path component
/// is kept.
pub fn parse_content_disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().trim_matches('"');
                let encoded = match encoded.split_once("''") {
                    Some((_, rest)) => rest,
                    None => encoded,
                };
                extended = percent_decode(encoded);
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    let name = extended.or(plain)?;
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = input.get(index + 1..index + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
