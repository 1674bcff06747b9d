//! Insights - Observability for turnstile.
//!
//! Claim-loop tracing and profiling. Zero-cost when disabled.
//!
//! # Usage
//!
//! ## Basic tracing (console output)
//! ```toml
//! turnstile = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).init();
//! ```
//!
//! ## Tracy profiler (real-time visualization)
//! ```toml
//! turnstile = { version = "0.1", features = ["tracy"] }
//! ```
//! ```rust,ignore
//! turnstile::init_tracy();
//! ```
//!
//! Only the slow-path steps are reported: stale positions, lost CAS races
//! and full/empty observations. The fast path stays silent.

use crate::queue::{ClaimEvent, Role};

/// Initialize Tracy profiler (call once at startup)
#[cfg(feature = "tracy")]
pub fn init_tracy() {
    use tracing_subscriber::layer::SubscriberExt;
    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default()),
    )
    .expect("setup tracy layer");
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy() {}

/// Record one claim-loop step
#[cfg(feature = "tracing")]
#[inline]
pub fn record_claim(role: Role, event: ClaimEvent) {
    match event {
        ClaimEvent::Stale(pos) => tracing::trace!(?role, pos, "stale position, reloading"),
        ClaimEvent::Contended(pos) => tracing::trace!(?role, pos, "lost claim race"),
        ClaimEvent::Exhausted(pos) => match role {
            Role::Producer => tracing::trace!(pos, "queue full"),
            Role::Consumer => tracing::trace!(pos, "queue empty"),
        },
        ClaimEvent::Loaded(_) | ClaimEvent::Ready(_) => {}
    }
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_claim(_role: Role, _event: ClaimEvent) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insights_compile() {
        // Just verify it compiles (no-op when tracing disabled)
        record_claim(Role::Producer, ClaimEvent::Stale(1));
        record_claim(Role::Consumer, ClaimEvent::Exhausted(0));
        record_claim(Role::Consumer, ClaimEvent::Loaded(0));
    }
}
