use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{ActionError, Context, Dispatcher};

/// Code that runs for an action or a hook
///
/// Handlers get the [`Dispatcher`] so they can invoke other actions, and the
/// shared [`Context`] for the whole dispatch tree.
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
#[async_trait]
pub trait Handler: Send + Sync {
    /// Run against `ctx`
    ///
    /// # Errors
    ///
    /// Any error aborts the surrounding dispatch.
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError>;
}

/// [`Handler`] backed by a closure; see [`handler_fn`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a Dispatcher, &'a mut Context) -> BoxFuture<'a, Result<(), ActionError>>
        + Send
        + Sync,
{
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        (self.0)(dispatcher, ctx).await
    }
}

/// Wrap a closure as a shareable [`Handler`]
///
/// ```
/// use stagecoach::action::handler_fn;
///
/// let handler = handler_fn(|_dispatcher, ctx| {
///     Box::pin(async move {
///         ctx.push_property("trace", "ran");
///         Ok(())
///     })
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: for<'a> Fn(&'a Dispatcher, &'a mut Context) -> BoxFuture<'a, Result<(), ActionError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler(f))
}
