//! Endpoint pool with a shared rotation pointer.
//!
//! # Responsibilities
//! - Hold the ordered, de-duplicated list of RPC endpoints
//! - Remember which endpoint last answered successfully
//!
//! The rotation pointer is a hint shared by every concurrent call. Two
//! successes racing to store different indexes is harmless: whichever lands
//! last wins.

use std::sync::atomic::{AtomicUsize, Ordering};

use url::Url;

use crate::rpc::types::{RpcError, RpcResult};

/// Ordered list of RPC endpoints.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<String>,
    urls: Vec<Url>,
    start: AtomicUsize,
}

impl EndpointPool {
    /// Build a pool from configuration.
    ///
    /// Blank entries and duplicates are dropped (first occurrence wins).
    /// Fails if nothing is left or an entry is not a URL.
    pub fn new<I, S>(endpoints: I) -> RpcResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        let mut urls = Vec::new();

        for raw in endpoints {
            let raw = raw.as_ref().trim();
            if raw.is_empty() || list.iter().any(|e| e == raw) {
                continue;
            }
            let url = Url::parse(raw).map_err(|e| RpcError::InvalidEndpoint {
                url: raw.to_string(),
                reason: e.to_string(),
            })?;
            list.push(raw.to_string());
            urls.push(url);
        }

        if list.is_empty() {
            return Err(RpcError::EmptyPool);
        }

        Ok(Self {
            endpoints: list,
            urls,
            start: AtomicUsize::new(0),
        })
    }

    /// All endpoints in configured order. Never empty.
    pub fn list(&self) -> &[String] {
        &self.endpoints
    }

    /// Parsed URL for the endpoint at `index`.
    pub(crate) fn url(&self, index: usize) -> &Url {
        &self.urls[index]
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Index where the next failover pass begins.
    pub fn start_index(&self) -> usize {
        self.start.load(Ordering::Relaxed)
    }

    /// Endpoint at the current start index.
    pub fn current(&self) -> &str {
        &self.endpoints[self.start_index()]
    }

    /// Remember the endpoint that just answered.
    pub fn record_success(&self, index: usize) {
        if index < self.endpoints.len() {
            self.start.store(index, Ordering::Relaxed);
        }
    }

    /// Index of the `attempt`-th endpoint in a pass beginning at `start`.
    pub fn rotation_index(&self, start: usize, attempt: usize) -> usize {
        (start + attempt) % self.endpoints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(EndpointPool::new(empty), Err(RpcError::EmptyPool)));
        assert!(matches!(EndpointPool::new(["", "  "]), Err(RpcError::EmptyPool)));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = EndpointPool::new(["http://a.example", "not a url"]).unwrap_err();
        assert!(matches!(err, RpcError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_dedup_keeps_order() {
        let pool = EndpointPool::new([
            "http://a.example",
            "http://b.example",
            "http://a.example",
            " http://c.example ",
        ])
        .unwrap();
        assert_eq!(
            pool.list(),
            &["http://a.example", "http://b.example", "http://c.example"]
        );
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_record_success_moves_start() {
        let pool = EndpointPool::new(["http://a.example", "http://b.example"]).unwrap();
        assert_eq!(pool.start_index(), 0);
        assert_eq!(pool.current(), "http://a.example");

        pool.record_success(1);
        assert_eq!(pool.start_index(), 1);
        assert_eq!(pool.current(), "http://b.example");

        // Out-of-range hints are ignored.
        pool.record_success(9);
        assert_eq!(pool.start_index(), 1);
    }

    #[test]
    fn test_rotation_wraps() {
        let pool = EndpointPool::new(["http://a", "http://b", "http://c"]).unwrap();
        let order: Vec<usize> = (0..3).map(|i| pool.rotation_index(2, i)).collect();
        assert_eq!(order, vec![2, 0, 1]);
    }
}
