use std::time::Duration;

use prr_core::error::AppError;
use serde::de::DeserializeOwned;

const ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    base_url: String,
    token: String,
    agent: ureq::Agent,
}

fn invalid_base_url(base_url: &str) -> AppError {
    AppError::new(
        "PROVIDER_BASE_URL_INVALID",
        "PagerDuty base URL must use https (plain http is allowed only for 127.0.0.1)",
    )
    .with_details(format!("base_url={base_url}"))
}

fn validate_base_url(base_url: &str) -> Result<(), AppError> {
    if let Some(rest) = base_url.strip_prefix("https://") {
        let host = rest.split('/').next().unwrap_or("");
        if host.is_empty() || host.contains('@') || rest.chars().any(char::is_whitespace) {
            return Err(invalid_base_url(base_url));
        }
        return Ok(());
    }

    // Local test servers only.
    let Some(rest) = base_url.strip_prefix("http://127.0.0.1") else {
        return Err(invalid_base_url(base_url));
    };
    if rest.is_empty() {
        return Ok(());
    }
    let port = rest.strip_prefix(':').ok_or_else(|| invalid_base_url(base_url))?;
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(invalid_base_url(base_url)),
    }
}

/// Map an HTTP status returned by the API to the pipeline's error taxonomy.
pub fn status_error(context: &str, status: u16, body: &str) -> AppError {
    let details = format!("{context}; status={status}; body={}", truncate(body, 300));
    match status {
        414 => AppError::request_too_large(details),
        401 | 403 => AppError::new("PROVIDER_AUTH_FAILED", "PagerDuty rejected the API token")
            .with_details(details),
        404 => AppError::new("PROVIDER_NOT_FOUND", "PagerDuty resource not found")
            .with_details(details),
        _ => AppError::new("PROVIDER_HTTP_FAILED", "PagerDuty request failed")
            .with_details(details)
            .with_retryable(status == 429 || status >= 500),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn decode<T: DeserializeOwned>(context: &str, body: &str) -> Result<T, AppError> {
    serde_json::from_str(body).map_err(|e| {
        AppError::new("PROVIDER_DECODE_FAILED", "Failed to decode PagerDuty response")
            .with_details(format!("{context}; err={e}"))
    })
}

impl PagerDutyClient {
    /// Create a client for the PagerDuty REST API v2.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self {
            base_url,
            token: token.to_string(),
            agent,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `query` and decode the JSON body.
    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .agent
            .get(&url)
            .set("Accept", ACCEPT)
            .set("Authorization", &format!("Token token={}", self.token));
        for (k, v) in query {
            req = req.query(k, v);
        }

        tracing::debug!(path, params = query.len(), "PagerDuty GET");
        match req.call() {
            Ok(resp) => {
                let body = resp.into_string().map_err(|e| {
                    AppError::new("PROVIDER_DECODE_FAILED", "Failed to read PagerDuty response")
                        .with_details(format!("path={path}; err={e}"))
                })?;
                decode(&format!("path={path}"), &body)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(status_error(&format!("path={path}"), status, &body))
            }
            Err(e) => Err(AppError::new(
                "PROVIDER_UNREACHABLE",
                "Failed to reach PagerDuty",
            )
            .with_details(format!("path={path}; err={e}"))
            .with_retryable(true)),
        }
    }
}
