//! Hook handler trait and fault isolation.
//!
//! Any `Fn(HookCall) -> impl Future` whose output implements
//! [`IntoHookResult`] is a [`HookHandler`]:
//!
//! ```rust,ignore
//! registry.subscribe("bans", "CanClientLogin", |call: HookCall| async move {
//!     let session = call.session()?;
//!     is_banned(session.id()).then_some("Banned")
//! });
//! ```
//!
//! Plugins that keep state can implement the trait on their own type instead.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use tether_core::{HandlerFault, HookCall, HookResult, IntoHookResult};

// ============================================================================
// HookHandler Trait
// ============================================================================

/// A subscriber to one hook.
#[async_trait]
pub trait HookHandler: Send + Sync + 'static {
    /// Handles one call. `Err` carries a fault message.
    async fn call(&self, call: HookCall) -> Result<HookResult, String>;
}

#[async_trait]
impl<F, Fut, R> HookHandler for F
where
    F: Fn(HookCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHookResult + Send + 'static,
{
    async fn call(&self, call: HookCall) -> Result<HookResult, String> {
        (self)(call).await.into_hook_result()
    }
}

/// A shared, type-erased hook handler.
pub type BoxedHookHandler = Arc<dyn HookHandler>;

// ============================================================================
// Isolation
// ============================================================================

/// Runs `handler`, converting errors and panics into a [`HandlerFault`].
pub async fn invoke_isolated(
    handler: &dyn HookHandler,
    call: HookCall,
) -> Result<HookResult, HandlerFault> {
    match AssertUnwindSafe(handler.call(call)).catch_unwind().await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(message)) => Err(HandlerFault::Failed(message)),
        Err(payload) => Err(HandlerFault::from_panic(payload.as_ref())),
    }
}
