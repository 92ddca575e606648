use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tracing::warn;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Upper bound on tracked IPs so an attacker rotating addresses cannot
/// grow the map without limit.
const MAX_TRACKED_IPS: usize = 10_000;

/// Per-IP fixed quota, used to bound guessing attempts against the
/// unauthenticated link-token exchange endpoint.
#[derive(Clone)]
pub struct IpThrottle {
    limiters: Arc<RwLock<HashMap<IpAddr, (Arc<Limiter>, Instant)>>>,
    quota: Quota,
}

impl IpThrottle {
    pub fn new(attempts_per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::new(10).unwrap()),
        );
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            quota,
        }
    }

    /// Returns false once the IP has used up its quota for the window.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let limiter = self.limiter_for(ip).await;
        limiter.check().is_ok()
    }

    async fn limiter_for(&self, ip: IpAddr) -> Arc<Limiter> {
        {
            let limiters = self.limiters.read().await;
            if let Some((limiter, _)) = limiters.get(&ip) {
                return Arc::clone(limiter);
            }
        }

        let mut limiters = self.limiters.write().await;
        // Re-check: another task may have inserted while we waited.
        if let Some((limiter, _)) = limiters.get(&ip) {
            return Arc::clone(limiter);
        }

        if limiters.len() >= MAX_TRACKED_IPS {
            let mut entries: Vec<_> = limiters.iter().map(|(ip, (_, t))| (*ip, *t)).collect();
            entries.sort_by_key(|(_, t)| *t);
            let to_remove = entries.len() / 2;
            for (ip, _) in entries.into_iter().take(to_remove) {
                limiters.remove(&ip);
            }
            warn!(removed = to_remove, "throttle map at capacity, dropped oldest entries");
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        limiters.insert(ip, (Arc::clone(&limiter), Instant::now()));
        limiter
    }
}

/// Client address as seen through a reverse proxy, falling back to the
/// socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded) = forwarded.to_str() {
            if let Some(first) = forwarded.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return ip;
                }
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(real_ip) = real_ip.to_str() {
            if let Ok(ip) = real_ip.parse() {
                return ip;
            }
        }
    }
    peer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[tokio::test]
    async fn quota_is_enforced_per_ip() {
        let throttle = IpThrottle::new(2);
        assert!(throttle.check(ip(1)).await);
        assert!(throttle.check(ip(1)).await);
        assert!(!throttle.check(ip(1)).await);
        // A different address has its own budget.
        assert!(throttle.check(ip(2)).await);
    }

    #[test]
    fn forwarded_header_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(
            client_ip(&headers, ip(9)),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn falls_back_to_peer_on_garbage_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "not-an-ip".parse().unwrap());
        assert_eq!(client_ip(&headers, ip(9)), ip(9));
    }
}
