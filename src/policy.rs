//! Retry and cache-freshness policy.
//!
//! These are the only two pieces of policy the client applies on its own;
//! every call site goes through them instead of deciding ad hoc.

use std::time::Duration;

use crate::errors::StorefrontError;

/// Maximum number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Which class of request a retry decision is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// GET requests. Everything except 401/403 is retried.
    Query,
    /// POST/PUT/PATCH/DELETE. No 4xx is retried.
    Mutation,
}

/// Whether a failed query may be attempted again.
///
/// Authentication failures are never retried so an expired session is not
/// hammered. Decode failures are deterministic and not retried either.
pub fn is_retryable(err: &StorefrontError) -> bool {
    match err {
        StorefrontError::Api(api) => !api.is_auth_error(),
        StorefrontError::Transport(_) => true,
        _ => false,
    }
}

/// Stricter variant for mutations: nothing in the 4xx range is retried.
pub fn is_mutation_retryable(err: &StorefrontError) -> bool {
    match err {
        StorefrontError::Api(api) => !api.is_client_error(),
        StorefrontError::Transport(_) => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// `failures` is the number of attempts that have already failed.
    pub fn should_retry(&self, kind: RequestKind, failures: u32, err: &StorefrontError) -> bool {
        if failures > self.max_retries {
            return false;
        }
        match kind {
            RequestKind::Query => is_retryable(err),
            RequestKind::Mutation => is_mutation_retryable(err),
        }
    }

    /// Exponential delay before the next attempt, capped at 30 seconds.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.saturating_sub(1).min(5);
        self.base_delay
            .saturating_mul(factor)
            .min(Duration::from_secs(30))
    }
}

/// How usable a cached entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve from cache, no request.
    Fresh,
    /// Serve from cache and revalidate in the background.
    Stale,
    /// Too old to show; drop it and fetch in the foreground.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub stale_after: Duration,
    pub evict_after: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(60),
            evict_after: Duration::from_secs(5 * 60),
        }
    }
}

impl CachePolicy {
    pub fn freshness(&self, age: Duration) -> Freshness {
        if age < self.stale_after {
            Freshness::Fresh
        } else if age < self.evict_after {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}
