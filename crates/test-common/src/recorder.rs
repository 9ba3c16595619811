//! Handlers that record when they run.

use std::sync::{Arc, Mutex};

use stagecoach::action::{ActionError, Handler, handler_fn};

/// A shared trace that handlers append labels to
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends `label` and succeeds
    #[must_use]
    pub fn handler(&self, label: &str) -> Arc<dyn Handler> {
        self.labelled(label, None)
    }

    /// A handler that appends `label` and fails validation
    #[must_use]
    pub fn failing(&self, label: &str) -> Arc<dyn Handler> {
        self.labelled(label, Some(format!("{label} failed")))
    }

    /// A handler that appends `label`, then dispatches `nested`
    #[must_use]
    pub fn dispatching(&self, label: &str, nested: &str) -> Arc<dyn Handler> {
        let entries = Arc::clone(&self.entries);
        let label = label.to_string();
        let nested = nested.to_string();
        handler_fn(move |dispatcher, ctx| {
            entries.lock().unwrap().push(label.clone());
            let nested = nested.clone();
            Box::pin(async move { dispatcher.dispatch(&nested, ctx).await })
        })
    }

    fn labelled(&self, label: &str, failure: Option<String>) -> Arc<dyn Handler> {
        let entries = Arc::clone(&self.entries);
        let label = label.to_string();
        handler_fn(move |_, _| {
            entries.lock().unwrap().push(label.clone());
            let failure = failure.clone();
            Box::pin(async move {
                match failure {
                    Some(message) => Err(ActionError::Validation(message)),
                    None => Ok(()),
                }
            })
        })
    }

    /// Labels recorded so far, in order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}
