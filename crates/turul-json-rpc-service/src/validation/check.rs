//! The contract every validation rule implements.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

/// A failed check: a message template plus the values substituted into it.
///
/// Templates reference substitutions as `%{name}`. Strings render without
/// quotes, every other value renders as compact JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleError {
    template: Cow<'static, str>,
    substitutions: Vec<(String, Value)>,
}

impl RuleError {
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
            substitutions: Vec::new(),
        }
    }

    /// Attach a substitution for `%{key}`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.substitutions.push((key.into(), value.into()));
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn substitutions(&self) -> &[(String, Value)] {
        &self.substitutions
    }

    pub fn substitution(&self, key: &str) -> Option<&Value> {
        self.substitutions
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Render the template with all substitutions applied
    pub fn render(&self) -> String {
        self.substitutions
            .iter()
            .fold(self.template.to_string(), |message, (key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                message.replace(&format!("%{{{}}}", key), &rendered)
            })
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A named validation check.
///
/// `value` is `None` when the field is absent from the params, and
/// `Some(Value::Null)` when it is present but null. `options` is whatever the
/// rule was declared with.
pub trait Check: Send + Sync {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError>;

    /// Every failure for one value. Rules that can fail in several ways at once
    /// (numeric bounds, for instance) override this.
    fn check_all(&self, value: Option<&Value>, options: &Value) -> Vec<RuleError> {
        self.check(value, options).err().into_iter().collect()
    }
}

impl<F> Check for F
where
    F: Fn(Option<&Value>, &Value) -> Result<(), RuleError> + Send + Sync,
{
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        self(value, options)
    }
}
