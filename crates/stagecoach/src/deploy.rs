//! Deployment fan-out: one action across many regions and many items
//!
//! Regions run one after another. Within a region, items are dispatched
//! concurrently up to a limit, each with a fresh [`Context`] carrying the
//! stage, the region and the item. A failing item is recorded and the rest
//! carry on; the caller gets a [`DeploymentReport`] for everything.

pub mod report;

pub use self::report::{DeployedItem, DeploymentReport};

use std::{future::Future, num::NonZeroUsize};

use futures::{StreamExt, stream};
use serde_json::{Value, json};
use tracing::{Instrument, error, info, info_span};

use crate::action::{ActionError, Context, Dispatcher, context::ITEM_PROPERTY};

/// Item name recorded when a region's completion callback fails
pub const REGION_COMPLETE_ITEM: &str = "(region state)";

const CONCURRENCY_DEFAULT: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// Applies one action over `regions × items`
#[derive(Debug, Clone)]
pub struct FanOut<'a> {
    dispatcher: &'a Dispatcher,
    action: &'a str,
    stage: &'a str,
    concurrency: NonZeroUsize,
}

impl<'a> FanOut<'a> {
    #[must_use]
    pub fn new(dispatcher: &'a Dispatcher, action: &'a str, stage: &'a str) -> Self {
        Self {
            dispatcher,
            action,
            stage,
            concurrency: CONCURRENCY_DEFAULT,
        }
    }

    /// Maximum number of items in flight within one region
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub async fn run(&self, regions: &[String], items: &[String]) -> DeploymentReport {
        self.run_with(regions, items, |_| async { Ok(()) }).await
    }

    /// Like [`run`](Self::run), calling `on_region_complete` after each region
    /// settles and before the next one starts
    ///
    /// A failing callback is recorded against the region under
    /// [`REGION_COMPLETE_ITEM`].
    pub async fn run_with<F, Fut>(
        &self,
        regions: &[String],
        items: &[String],
        mut on_region_complete: F,
    ) -> DeploymentReport
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<(), ActionError>>,
    {
        let mut report = DeploymentReport::default();

        for region in regions {
            let span = info_span!("fan_out", action = self.action, stage = self.stage, %region);
            self.run_region(region, items, &mut report)
                .instrument(span)
                .await;

            if let Err(e) = on_region_complete(region.clone()).await {
                error!(%region, error = %e, "region completion failed");
                report.record_failure(region, REGION_COMPLETE_ITEM, &e);
            }
        }

        info!(
            action = self.action,
            deployed = report.deployed_count(),
            failed = report.failed_count(),
            "fan-out finished"
        );
        report
    }

    async fn run_region(&self, region: &str, items: &[String], report: &mut DeploymentReport) {
        let deployments: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| async move {
                (index, item, self.deploy_item(region, item).await)
            })
            .collect();
        let mut outcomes: Vec<(usize, &String, Result<Value, ActionError>)> =
            stream::iter(deployments)
                .buffer_unordered(self.concurrency.get())
                .collect()
                .await;

        outcomes.sort_by_key(|(index, ..)| *index);
        for (_, item, outcome) in outcomes {
            match outcome {
                Ok(output) => report.record_success(region, item, output),
                Err(e) => {
                    error!(%item, error = %e, "item failed");
                    report.record_failure(region, item, &e);
                }
            }
        }
    }

    async fn deploy_item(&self, region: &str, item: &str) -> Result<Value, ActionError> {
        let mut ctx = Context::new()
            .with_stage(self.stage)
            .with_region(region)
            .with_property(ITEM_PROPERTY, json!(item));

        self.dispatcher.dispatch(self.action, &mut ctx).await?;
        Ok(ctx.take_output().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::action::{Action, RegistryBuilder, handler_fn};

    fn regions() -> Vec<String> {
        ["us-east-1", "eu-west-1", "ap-south-1"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn items() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(ToString::to_string).collect()
    }

    /// Deploys every item except `b` in `eu-west-1`
    fn dispatcher(log: Arc<Mutex<Vec<String>>>) -> Dispatcher {
        let mut builder = RegistryBuilder::new();
        builder
            .register(Action::new(
                "deployItem",
                handler_fn(move |_, ctx| {
                    let log = Arc::clone(&log);
                    Box::pin(async move {
                        let region = ctx.region().unwrap_or_default().to_string();
                        let item = ctx.item().unwrap_or_default().to_string();
                        log.lock().unwrap().push(format!("start {region}"));
                        tokio::task::yield_now().await;
                        log.lock().unwrap().push(format!("end {region}"));

                        if region == "eu-west-1" && item == "b" {
                            return Err(ActionError::RemoteOperation {
                                code: "Boom".into(),
                                message: format!("{item} failed"),
                            });
                        }
                        let stage = ctx.stage().map(ToString::to_string);
                        ctx.set_output(json!({ "item": item, "stage": stage }));
                        Ok(())
                    })
                }),
            ))
            .unwrap();
        Dispatcher::new(builder.freeze())
    }

    #[tokio::test]
    async fn test_partial_failure_is_contained_to_the_item() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = dispatcher(Arc::clone(&log));

        let report = FanOut::new(&dispatcher, "deployItem", "dev")
            .run(&regions(), &items())
            .await;

        assert_eq!(report.deployed["us-east-1"].len(), 4);
        assert_eq!(report.deployed["eu-west-1"].len(), 3);
        assert_eq!(report.deployed["ap-south-1"].len(), 4);
        assert_eq!(report.failed.len(), 1);
        let failed = &report.failed["eu-west-1"];
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].item, "b");
        assert!(failed[0].message.contains("Boom"));
        assert!(!report.is_success());

        let deployed: Vec<_> = report.deployed["eu-west-1"]
            .iter()
            .map(|d| d.item.as_str())
            .collect();
        assert_eq!(deployed, vec!["a", "c", "d"]);
        assert_eq!(
            report.deployed["us-east-1"][0].output,
            json!({"item": "a", "stage": "dev"})
        );
    }

    #[tokio::test]
    async fn test_regions_run_sequentially() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = dispatcher(Arc::clone(&log));

        FanOut::new(&dispatcher, "deployItem", "dev")
            .run(&regions(), &items())
            .await;

        let log = log.lock().unwrap();
        let region_of = |entry: &String| entry.split(' ').nth(1).unwrap_or_default().to_string();
        let mut seen: Vec<String> = Vec::new();
        for entry in log.iter() {
            let region = region_of(entry);
            if seen.last() != Some(&region) {
                assert!(!seen.contains(&region), "{region} resumed after another region");
                seen.push(region);
            }
        }
        assert_eq!(seen, regions());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut builder = RegistryBuilder::new();
        {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            builder
                .register(Action::new(
                    "slow",
                    handler_fn(move |_, _| {
                        let in_flight = Arc::clone(&in_flight);
                        let peak = Arc::clone(&peak);
                        Box::pin(async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                    }),
                ))
                .unwrap();
        }
        let dispatcher = Dispatcher::new(builder.freeze());
        let items: Vec<String> = (0..10).map(|i| format!("item{i}")).collect();

        let report = FanOut::new(&dispatcher, "slow", "dev")
            .with_concurrency(NonZeroUsize::new(3).unwrap())
            .run(&["us-east-1".to_string()], &items)
            .await;

        assert_eq!(report.deployed_count(), 10);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_region_callback_runs_after_each_region() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = dispatcher(Arc::clone(&log));
        let completed = Arc::new(Mutex::new(Vec::new()));

        let report = FanOut::new(&dispatcher, "deployItem", "dev")
            .run_with(&regions(), &items(), |region| {
                let completed = Arc::clone(&completed);
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("saved {region}"));
                    completed.lock().unwrap().push(region.clone());
                    if region == "ap-south-1" {
                        return Err(ActionError::validation("disk full"));
                    }
                    Ok(())
                }
            })
            .await;

        assert_eq!(*completed.lock().unwrap(), regions());
        let log = log.lock().unwrap();
        let saved_at = log.iter().position(|e| e == "saved us-east-1").unwrap();
        assert!(log[..saved_at].iter().all(|e| e.ends_with("us-east-1")));
        assert_eq!(report.failed["ap-south-1"][0].item, REGION_COMPLETE_ITEM);
    }

    fn assert_send<T: Send>(_: T) {}

    /// Handlers box their futures as `Send` for any caller lifetime
    fn boxed_run<'a>(
        fan_out: &'a FanOut<'a>,
        regions: &'a [String],
        items: &'a [String],
    ) -> futures::future::BoxFuture<'a, DeploymentReport> {
        Box::pin(fan_out.run_with(regions, items, |_| async { Ok(()) }))
    }

    #[tokio::test]
    async fn test_fan_out_future_is_send() {
        let dispatcher = Dispatcher::new(RegistryBuilder::new().freeze());
        let fan_out = FanOut::new(&dispatcher, "missing", "dev");
        let regions = regions();
        let items = items();

        assert_send(fan_out.run(&regions, &items));
        let report = boxed_run(&fan_out, &regions, &items).await;

        assert_eq!(report.failed_count(), 12);
    }

    #[tokio::test]
    async fn test_unknown_action_fails_every_item() {
        let dispatcher = Dispatcher::new(RegistryBuilder::new().freeze());

        let report = FanOut::new(&dispatcher, "missing", "dev")
            .run(&["us-east-1".to_string()], &items())
            .await;

        assert_eq!(report.failed_count(), 4);
        assert_eq!(report.deployed_count(), 0);
    }
}
