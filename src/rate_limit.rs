//! Per-IP fixed-window rate limiting.
//!
//! Each client address gets `max_requests` per `window`; the counter resets
//! when the window that started with the client's first request elapses.
//! Requests over the limit receive a 429 JSON error with `Retry-After`.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
    response::IntoResponse,
};
use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::AppError;

/// Rate limit configuration.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // 100 requests per 15 minutes
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
enum Decision {
    Allow,
    Deny { retry_after: Duration },
}

#[derive(Debug)]
struct RateLimitState {
    windows: HashMap<IpAddr, Window>,
    config: RateLimitConfig,
    last_cleanup: Instant,
}

impl RateLimitState {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: HashMap::new(),
            config,
            last_cleanup: Instant::now(),
        }
    }

    fn check(&mut self, ip: IpAddr, now: Instant) -> Decision {
        if now.duration_since(self.last_cleanup) > self.config.window {
            self.cleanup(now);
        }

        let window = self.config.window;
        let entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.config.max_requests {
            let retry_after = window.saturating_sub(now.duration_since(entry.started));
            return Decision::Deny { retry_after };
        }

        entry.count += 1;
        Decision::Allow
    }

    /// Drops windows that have already expired.
    fn cleanup(&mut self, now: Instant) {
        let window = self.config.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < window);
        let removed = before - self.windows.len();
        if removed > 0 {
            tracing::debug!("Cleaned up {} expired rate limit windows", removed);
        }
        self.last_cleanup = now;
    }
}

/// Rate limiting layer that wraps services.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<Mutex<RateLimitState>>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimitState::new(config))),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<Mutex<RateLimitState>>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Requests without connection info (in-process callers) are not limited.
        let decision = match client_ip(&req) {
            Some(ip) => {
                let mut state = self.state.lock().unwrap_or_else(|poisoned| {
                    warn!("Rate limit state was poisoned, recovering");
                    poisoned.into_inner()
                });
                let decision = state.check(ip, Instant::now());
                if matches!(decision, Decision::Deny { .. }) {
                    warn!("Rate limit exceeded for IP: {}", ip);
                }
                decision
            }
            None => Decision::Allow,
        };

        match decision {
            Decision::Allow => Box::pin(self.inner.call(req)),
            Decision::Deny { retry_after } => {
                let response = AppError::TooManyRequests {
                    retry_after_secs: retry_after.as_secs().max(1),
                }
                .into_response();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: u32) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        }
    }

    #[test]
    fn allows_up_to_the_limit_then_denies() {
        let mut state = RateLimitState::new(config(3));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(matches!(state.check(ip, now), Decision::Allow));
        }
        match state.check(ip, now + Duration::from_secs(10)) {
            Decision::Deny { retry_after } => assert_eq!(retry_after, Duration::from_secs(50)),
            Decision::Allow => panic!("fourth request should be denied"),
        }
    }

    #[test]
    fn clients_are_counted_separately() {
        let mut state = RateLimitState::new(config(1));
        let now = Instant::now();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(matches!(state.check(a, now), Decision::Allow));
        assert!(matches!(state.check(a, now), Decision::Deny { .. }));
        assert!(matches!(state.check(b, now), Decision::Allow));
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let mut state = RateLimitState::new(config(1));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let now = Instant::now();

        assert!(matches!(state.check(ip, now), Decision::Allow));
        assert!(matches!(state.check(ip, now), Decision::Deny { .. }));
        assert!(matches!(
            state.check(ip, now + Duration::from_secs(61)),
            Decision::Allow
        ));
    }

    #[test]
    fn cleanup_drops_expired_windows() {
        let mut state = RateLimitState::new(config(5));
        let now = Instant::now();
        state.check("10.0.0.1".parse().unwrap(), now);
        state.check("10.0.0.2".parse().unwrap(), now);

        state.cleanup(now + Duration::from_secs(120));
        assert!(state.windows.is_empty());
    }
}
