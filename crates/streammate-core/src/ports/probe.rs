//! ReachabilityProbe port.

use async_trait::async_trait;

/// Answers "is the network reachable right now?".
///
/// Implementations must not fail: every error means `false`.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}
