//! Gateway application state.

use std::sync::Arc;

use capture_admin::CaptureAdmin;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
pub struct GatewayState<A>
where
    A: CaptureAdmin,
{
    /// The admin status service.
    pub admin: Arc<A>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<A> GatewayState<A>
where
    A: CaptureAdmin,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(admin: Arc<A>, config: GatewayConfig) -> Self {
        Self { admin, config }
    }
}

impl<A> Clone for GatewayState<A>
where
    A: CaptureAdmin,
{
    fn clone(&self) -> Self {
        Self {
            admin: Arc::clone(&self.admin),
            config: self.config.clone(),
        }
    }
}
