use std::collections::BTreeMap;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::ActionError;

/// Property key under which fan-out workers find the item they deploy
pub const ITEM_PROPERTY: &str = "item";

/// The mutable record threaded through a whole dispatch tree
///
/// The CLI router fills `options` and `params` from argv; `stage` and
/// `region` are copied out of the options of the same name. Everything else
/// an action wants to pass along goes into the JSON `properties` map, and an
/// action's result for the caller goes into `output`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Context {
    options: BTreeMap<String, String>,
    params: Vec<String>,
    stage: Option<String>,
    region: Option<String>,
    properties: Map<String, Value>,
    output: Option<Value>,

    #[serde(skip)]
    depth: usize,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_option(mut self, flag: &str, value: &str) -> Self {
        self.set_option(flag, value);
        self
    }

    #[must_use]
    pub fn with_param(mut self, value: &str) -> Self {
        self.params.push(value.to_string());
        self
    }

    #[must_use]
    pub fn with_stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    #[must_use]
    pub fn option(&self, flag: &str) -> Option<&str> {
        self.options.get(flag).map(String::as_str)
    }

    /// Whether a boolean switch was given
    #[must_use]
    pub fn switch(&self, flag: &str) -> bool {
        self.option(flag) == Some("true")
    }

    pub fn set_option(&mut self, flag: &str, value: &str) {
        self.options.insert(flag.to_string(), value.to_string());
    }

    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Vec<String> {
        &mut self.params
    }

    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn set_stage(&mut self, stage: Option<String>) {
        self.stage = stage;
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn set_region(&mut self, region: Option<String>) {
        self.region = region;
    }

    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Read a property and deserialize it into `T`
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Validation`] if the stored value does not have
    /// the shape of `T`.
    pub fn property<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ActionError> {
        self.properties
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ActionError::validation(format!("property '{key}' has the wrong shape: {e}"))
                })
            })
            .transpose()
    }

    /// Store `value` under `key`, replacing what was there
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Validation`] if `value` cannot be represented as
    /// JSON.
    pub fn set_property<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), ActionError> {
        let value = serde_json::to_value(value)
            .map_err(|e| ActionError::validation(format!("property '{key}': {e}")))?;
        self.properties.insert(key.to_string(), value);
        Ok(())
    }

    /// Append `value` to the JSON array stored under `key`, creating it first
    /// if needed. A non-array value under `key` is replaced.
    pub fn push_property(&mut self, key: &str, value: impl Into<Value>) {
        let entry = self
            .properties
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            items.push(value.into());
        }
    }

    /// Every string pushed under `key`, in order
    #[must_use]
    pub fn property_strings(&self, key: &str) -> Vec<String> {
        self.properties
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The fan-out item this context was created for, if any
    #[must_use]
    pub fn item(&self) -> Option<&str> {
        self.properties.get(ITEM_PROPERTY).and_then(Value::as_str)
    }

    #[must_use]
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: Value) {
        self.output = Some(output);
    }

    pub fn take_output(&mut self) -> Option<Value> {
        self.output.take()
    }

    /// How many dispatches are currently in flight on this context
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }
}
