//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Limits decision requests per client IP using tower_governor. GCRA needs no
//! background task; quota state lives in the governor's keyed store.

use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config keyed by peer IP.
/// StateInformationMiddleware is used when use_headers() is called to add X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 20,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid rate limit: per_second={per_second}, burst_size={burst_size}")]
pub struct InvalidRateLimit {
    pub per_second: u64,
    pub burst_size: u32,
}

/// Build the governor config for the decision endpoint.
///
/// Requires the service to run with
/// `into_make_service_with_connect_info::<SocketAddr>()` for IP extraction.
/// Adds X-RateLimit-* headers to responses.
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Arc<DefaultGovernorConfig>, InvalidRateLimit> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or(InvalidRateLimit {
            per_second: config.per_second,
            burst_size: config.burst_size,
        })
}
