use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::core::AuthConfig;
use crate::service::InvoiceService;

pub type KeyedRateLimiter = Arc<RateLimiter<String, DashMapStateStore<String>, DefaultClock>>;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<InvoiceService>,
    pub rate_limiter: KeyedRateLimiter,
    pub auth: Arc<AuthConfig>,
}

impl ApiState {
    pub fn new(service: Arc<InvoiceService>, auth: AuthConfig) -> Self {
        let per_minute = NonZeroU32::new(auth.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(auth.rate_limit_burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        let rate_limiter = Arc::new(RateLimiter::dashmap_with_clock(quota, &DefaultClock::default()));

        ApiState {
            service,
            rate_limiter,
            auth: Arc::new(auth),
        }
    }
}
