use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::ApiError;

const LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Upper bound on tracked clients; past it the oldest window is evicted.
const MAX_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct Clients {
    windows: HashMap<String, Window>,
    next_sweep: Option<Instant>,
}

/// Fixed-window request counter keyed by client address.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    max_clients: usize,
    trust_forwarded_for: bool,
    clients: Arc<Mutex<Clients>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            max_clients: MAX_CLIENTS,
            trust_forwarded_for: false,
            clients: Arc::new(Mutex::new(Clients {
                windows: HashMap::new(),
                next_sweep: None,
            })),
        }
    }

    /// Key on the first `X-Forwarded-For` hop instead of the socket peer.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Count one request from `client`; `false` once the window's budget is spent.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().windows.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Clients> {
        match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.lock();

        if !clients.windows.contains_key(client) && clients.windows.len() >= self.max_clients {
            self.make_room(&mut clients, now);
        }

        let entry = clients
            .windows
            .entry(client.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Sweep expired windows at most once per window, then evict the oldest if still full.
    fn make_room(&self, clients: &mut Clients, now: Instant) {
        if clients.next_sweep.map_or(true, |at| now >= at) {
            let window = self.window;
            clients.windows.retain(|_, w| now.duration_since(w.started) < window);
            clients.next_sweep = Some(now + window);
        }
        if clients.windows.len() >= self.max_clients {
            let oldest = clients
                .windows
                .iter()
                .min_by_key(|(_, w)| w.started)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                clients.windows.remove(&key);
            }
        }
    }
}

/// Socket peer address, or the first `X-Forwarded-For` hop when the proxy is trusted.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| trust_forwarded_for && !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer, limiter.trust_forwarded_for);

    if !limiter.check(&client) {
        tracing::warn!("Rate limit exceeded for {}", client);
        return Err(ApiError::too_many_requests(LIMIT_MESSAGE));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn window_budget_and_reset() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("10.0.0.1", start));
        assert!(limiter.check_at("10.0.0.1", start));
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(1)));
        // Separate budget per client
        assert!(limiter.check_at("10.0.0.2", start));
        // New window
        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(60)));
    }

    #[test]
    fn client_key_ignores_forwarded_for_unless_trusted() {
        let peer: SocketAddr = "192.168.1.9:4411".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(peer), false), "192.168.1.9");
        assert_eq!(client_key(&headers, None, false), "unknown");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&headers, Some(peer), false), "192.168.1.9");
        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");
    }

    #[test]
    fn rotating_forwarded_for_shares_the_peer_budget() {
        let limiter = RateLimiter::new(1, Duration::from_secs(900));
        let peer: SocketAddr = "198.51.100.9:50000".parse().unwrap();
        let allowed = (0..50)
            .filter(|i| {
                let mut headers = HeaderMap::new();
                let spoofed = format!("10.0.0.{}", i);
                headers.insert("x-forwarded-for", HeaderValue::from_str(&spoofed).unwrap());
                limiter.check(&client_key(&headers, Some(peer), limiter.trust_forwarded_for))
            })
            .count();
        assert_eq!(allowed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn client_map_is_bounded() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(900));
        limiter.max_clients = 4;
        let start = Instant::now();
        for i in 0..20u64 {
            assert!(limiter.check_at(&format!("10.0.1.{}", i), start + Duration::from_millis(i)));
        }
        assert_eq!(limiter.tracked_clients(), 4);
        // Most recent client is still counted
        assert!(!limiter.check_at("10.0.1.19", start + Duration::from_secs(1)));
    }

    #[test]
    fn expired_windows_are_swept_before_evicting() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.max_clients = 2;
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("b", start));
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("c", later));
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
