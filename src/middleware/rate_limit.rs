use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;

use crate::error::ApiError;

const WINDOW: Duration = Duration::from_secs(60);

/// How often stale client entries are swept from the map.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Requests allowed per client per minute, by route.
pub const DEFAULT_ROUTE_LIMITS: &[(&str, u32)] = &[
    ("/", 10),
    ("/health", 30),
    ("/register", 5),
    ("/login", 5),
    ("/profile", 30),
    ("/secure-data", 10),
];

#[derive(Debug)]
struct SlidingWindow {
    limit: u32,
    requests: HashMap<String, Vec<Instant>>,
}

impl SlidingWindow {
    /// Ok, or the wait until the oldest request in the window expires.
    fn check(&mut self, key: &str, now: Instant) -> Result<(), Duration> {
        let cutoff = now.checked_sub(WINDOW).unwrap_or(now);
        let entry = self.requests.entry(key.to_owned()).or_default();
        entry.retain(|t| *t > cutoff);

        if entry.len() >= self.limit as usize {
            let oldest = entry.first().copied().unwrap_or(now);
            return Err(WINDOW.saturating_sub(now.duration_since(oldest)));
        }
        entry.push(now);
        Ok(())
    }

    fn sweep(&mut self, cutoff: Instant) {
        self.requests.retain(|_, timestamps| {
            timestamps.retain(|t| *t > cutoff);
            !timestamps.is_empty()
        });
    }
}

/// Per-route, per-client sliding window limiter. Routes without a limit pass.
#[derive(Debug)]
pub struct RateLimiter {
    inner: Mutex<(HashMap<&'static str, SlidingWindow>, Instant)>,
}

impl RateLimiter {
    pub fn new(limits: &[(&'static str, u32)]) -> Self {
        let windows = limits
            .iter()
            .map(|(route, limit)| {
                (
                    *route,
                    SlidingWindow {
                        limit: *limit,
                        requests: HashMap::new(),
                    },
                )
            })
            .collect();
        Self {
            inner: Mutex::new((windows, Instant::now())),
        }
    }

    pub fn with_default_routes() -> Self {
        Self::new(DEFAULT_ROUTE_LIMITS)
    }

    pub fn disabled() -> Self {
        Self::new(&[])
    }

    pub fn check(&self, route: &str, client: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let (windows, last_sweep) = &mut *guard;

        if now.duration_since(*last_sweep) >= SWEEP_INTERVAL {
            let cutoff = now.checked_sub(WINDOW).unwrap_or(now);
            for window in windows.values_mut() {
                window.sweep(cutoff);
            }
            *last_sweep = now;
        }

        match windows.get_mut(route) {
            Some(window) => window.check(client, now),
            None => Ok(()),
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if let Err(wait) = limiter.check(req.uri().path(), &client) {
        tracing::warn!(%client, path = %req.uri().path(), "rate limit exceeded");
        return Err(ApiError::RateLimited {
            retry_after_secs: wait.as_secs().max(1),
        });
    }
    Ok(next.run(req).await)
}
