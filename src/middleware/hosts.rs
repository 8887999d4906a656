use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;

/// Host header allow-list. Entries are exact names, `*`, or `*.suffix`.
#[derive(Debug, Clone)]
pub struct HostAllowList {
    patterns: Vec<String>,
    allow_any: bool,
}

impl HostAllowList {
    pub fn new(patterns: &[String]) -> Self {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_ascii_lowercase()).collect();
        let allow_any = patterns.iter().any(|p| p == "*");
        Self {
            patterns,
            allow_any,
        }
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        if self.allow_any {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => host.ends_with(suffix),
            None => *pattern == host,
        })
    }
}

/// Host name without port; IPv6 literals keep their brackets stripped.
fn host_name(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    raw.split(':').next().unwrap_or(raw)
}

pub async fn enforce_allowed_hosts(
    State(allowed): State<Arc<HostAllowList>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .map(host_name)
        .unwrap_or_default();

    if !allowed.is_allowed(host) {
        tracing::warn!(%host, "host not in allow-list");
        return Err(ApiError::InvalidHost);
    }
    Ok(next.run(req).await)
}
