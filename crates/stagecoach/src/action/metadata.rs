use std::collections::HashSet;

use super::ActionError;

/// How an action is exposed on the command line
///
/// Invoked as `stagecoach <context> <context_action> [params] [--flag value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliMetadata {
    context: String,
    context_action: String,
    description: String,
    options: Vec<CliOption>,
    parameters: Vec<CliParameter>,
}

/// A `--flag` accepted by an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOption {
    flag: String,
    shortcut: Option<char>,
    description: String,
    takes_value: bool,
}

/// A positional argument accepted by an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliParameter {
    name: String,
    description: String,
    position: usize,
    variadic: bool,
}

impl CliMetadata {
    #[must_use]
    pub fn new(context: &str, context_action: &str, description: &str) -> Self {
        Self {
            context: context.to_string(),
            context_action: context_action.to_string(),
            description: description.to_string(),
            options: Vec::new(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn option(mut self, option: CliOption) -> Self {
        self.options.push(option);
        self
    }

    #[must_use]
    pub fn parameter(mut self, parameter: CliParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[must_use]
    pub fn context_action(&self) -> &str {
        &self.context_action
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn options(&self) -> &[CliOption] {
        &self.options
    }

    #[must_use]
    pub fn parameters(&self) -> &[CliParameter] {
        &self.parameters
    }

    /// Check that the metadata can be turned into an unambiguous command line
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Validation`] when the context or action is empty,
    /// a flag, shortcut or parameter position is declared twice, or a
    /// variadic parameter is not the last one.
    pub fn validate(&self, action: &str) -> Result<(), ActionError> {
        let invalid = |reason: String| ActionError::validation(format!("action '{action}': {reason}"));

        if self.context.trim().is_empty() || self.context_action.trim().is_empty() {
            return Err(invalid(
                "CLI context and context action must not be empty".to_string(),
            ));
        }

        let mut flags = HashSet::new();
        let mut shortcuts = HashSet::new();
        for option in &self.options {
            if option.flag.is_empty() {
                return Err(invalid("option flag must not be empty".to_string()));
            }
            if !flags.insert(option.flag.as_str()) {
                return Err(invalid(format!("duplicate option --{}", option.flag)));
            }
            if let Some(short) = option.shortcut {
                if !shortcuts.insert(short) {
                    return Err(invalid(format!("duplicate shortcut -{short}")));
                }
            }
        }

        let mut positions = HashSet::new();
        let last = self.parameters.iter().map(|p| p.position).max();
        for parameter in &self.parameters {
            if parameter.name.is_empty() || !flags.insert(parameter.name.as_str()) {
                return Err(invalid(format!(
                    "parameter name '{}' is empty or clashes with another argument",
                    parameter.name
                )));
            }
            if !positions.insert(parameter.position) {
                return Err(invalid(format!(
                    "duplicate parameter position {}",
                    parameter.position
                )));
            }
            if parameter.variadic && Some(parameter.position) != last {
                return Err(invalid(format!(
                    "variadic parameter '{}' must be last",
                    parameter.name
                )));
            }
        }

        Ok(())
    }
}

impl CliOption {
    /// An option that takes a value, e.g. `--stage dev`
    #[must_use]
    pub fn value(flag: &str, shortcut: Option<char>, description: &str) -> Self {
        Self {
            flag: flag.to_string(),
            shortcut,
            description: description.to_string(),
            takes_value: true,
        }
    }

    /// A boolean switch, e.g. `--noExeCf`
    #[must_use]
    pub fn switch(flag: &str, shortcut: Option<char>, description: &str) -> Self {
        Self {
            takes_value: false,
            ..Self::value(flag, shortcut, description)
        }
    }

    #[must_use]
    pub fn flag(&self) -> &str {
        &self.flag
    }

    #[must_use]
    pub fn shortcut(&self) -> Option<char> {
        self.shortcut
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn takes_value(&self) -> bool {
        self.takes_value
    }
}

impl CliParameter {
    #[must_use]
    pub fn new(name: &str, position: usize, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            position,
            variadic: false,
        }
    }

    /// Accept any number of trailing values
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}
