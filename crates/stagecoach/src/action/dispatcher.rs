use std::{num::NonZeroUsize, sync::Arc};

use futures::future::BoxFuture;
use tracing::{Instrument, debug, debug_span};

use super::{Action, ActionError, Context, HookPhase, Registry};

const MAX_DEPTH_DEFAULT: usize = 32;

/// Runs actions and their hooks against a [`Context`]
///
/// Cheap to clone; every clone shares the same frozen [`Registry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    max_depth: usize,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            max_depth: MAX_DEPTH_DEFAULT,
        }
    }

    /// Limit how deeply dispatches may nest before failing with
    /// [`ActionError::RecursionLimit`]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: NonZeroUsize) -> Self {
        self.max_depth = max_depth.get();
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Run every pre-hook, the handler, then every post-hook of `name`
    ///
    /// The first error aborts the dispatch: remaining hooks of that phase and
    /// the post-hooks are skipped and the error is returned unchanged. An
    /// unknown `name` fails before any hook runs.
    pub fn dispatch<'a>(
        &'a self,
        name: &'a str,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin(async move {
            let action = self.registry.lookup(name)?;

            let outer_depth = ctx.depth();
            let depth = outer_depth + 1;
            if depth > self.max_depth {
                return Err(ActionError::RecursionLimit {
                    action: name.to_string(),
                    depth: self.max_depth,
                });
            }

            ctx.set_depth(depth);
            let span = debug_span!("dispatch", action = name, depth);
            let result = self.run(action, ctx).instrument(span).await;
            ctx.set_depth(outer_depth);

            result
        })
    }

    async fn run(&self, action: &Action, ctx: &mut Context) -> Result<(), ActionError> {
        let name = action.name();

        for hook in self.registry.hooks(name, HookPhase::Pre) {
            hook.handle(self, ctx).await?;
        }

        debug!("running handler");
        action.handler().handle(self, ctx).await?;

        for hook in self.registry.hooks(name, HookPhase::Post) {
            hook.handle(self, ctx).await?;
        }

        Ok(())
    }
}
