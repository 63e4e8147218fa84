//! # Parameter Validation
//!
//! A small rule engine methods use to check their params before they run.
//! Each field declares an ordered list of [`Rule`]s; every rule runs and every
//! failure is kept, so a caller sees all problems with a field at once.
//!
//! ```rust
//! use serde_json::json;
//! use turul_json_rpc_service::validation::{Kind, Rule, Validation, ValidationOutcome};
//! use turul_json_rpc_service::RequestParams;
//!
//! let params: RequestParams = serde_json::from_value(json!({"x": 10, "y": "0"})).unwrap();
//! let outcome = Validation::new(params)
//!     .field("x", &[Rule::required(), Rule::type_of(Kind::Integer)])
//!     .field("y", &[Rule::required(), Rule::type_of(Kind::Integer)])
//!     .finalize();
//!
//! match outcome {
//!     ValidationOutcome::Invalid(errors) => assert_eq!(errors["y"], vec!["is not an integer"]),
//!     ValidationOutcome::Valid(_) => unreachable!(),
//! }
//! ```

mod check;
mod registry;
mod rules;

pub use check::{Check, RuleError};
pub use registry::RuleRegistry;
pub use rules::{Bounds, CompiledFormat, Kind};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Value, json};

use crate::request::RequestParams;

/// Field name to the messages collected for it, in rule order
pub type ErrorMap = BTreeMap<String, Vec<String>>;

const REQUIRED: &str = "required";

/// Result of validating a request's params
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(RequestParams),
    Invalid(ErrorMap),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn into_result(self) -> Result<RequestParams, ErrorMap> {
        match self {
            ValidationOutcome::Valid(params) => Ok(params),
            ValidationOutcome::Invalid(errors) => Err(errors),
        }
    }
}

/// One rule declared on a field: a rule name and its options.
///
/// Named rules are resolved against a [`RuleRegistry`] when validation runs.
/// Rules built with [`Rule::custom`] or [`Rule::format`] carry their own check
/// and bypass the registry.
#[derive(Clone)]
pub struct Rule {
    name: Cow<'static, str>,
    options: Value,
    check: Option<Arc<dyn Check>>,
}

impl Rule {
    /// A rule looked up by name, e.g. `Rule::new("length", json!({"max": 3}))`
    pub fn new(name: impl Into<Cow<'static, str>>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
            check: None,
        }
    }

    /// A rule carrying its own implementation
    pub fn custom<C>(name: impl Into<Cow<'static, str>>, options: Value, check: C) -> Self
    where
        C: Check + 'static,
    {
        Self {
            name: name.into(),
            options,
            check: Some(Arc::new(check)),
        }
    }

    pub fn type_of(kind: Kind) -> Self {
        Self::new("type", Value::String(kind.as_str().to_string()))
    }

    pub fn required() -> Self {
        Self::new(REQUIRED, Value::Null)
    }

    pub fn not_empty() -> Self {
        Self::new("not_empty", Value::Null)
    }

    pub fn length(bounds: Bounds) -> Self {
        Self::new("length", bounds_options(&bounds))
    }

    pub fn number(bounds: Bounds) -> Self {
        Self::new("number", bounds_options(&bounds))
    }

    pub fn inclusion<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new("inclusion", json!({ "in": list }))
    }

    pub fn exclusion<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new("exclusion", json!({ "in": list }))
    }

    /// `format` with a pattern compiled by the caller
    pub fn format(regex: Regex) -> Self {
        let options = json!({ "pattern": regex.as_str() });
        Self::custom("format", options, CompiledFormat(regex))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Value {
        &self.options
    }
}

fn bounds_options(bounds: &Bounds) -> Value {
    serde_json::to_value(bounds).unwrap_or_else(|_| Value::Object(Default::default()))
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("inline", &self.check.is_some())
            .finish()
    }
}

/// Accumulating validation context: declare fields, then [`finalize`](Self::finalize)
pub struct Validation<'r> {
    params: RequestParams,
    registry: &'r RuleRegistry,
    errors: ErrorMap,
}

impl Validation<'static> {
    /// Validate against the built-in rules
    pub fn new(params: RequestParams) -> Self {
        Self::with_registry(params, RuleRegistry::builtin())
    }
}

impl<'r> Validation<'r> {
    pub fn with_registry(params: RequestParams, registry: &'r RuleRegistry) -> Self {
        Self {
            params,
            registry,
            errors: ErrorMap::new(),
        }
    }

    /// Run `rules` against `name`. Positional params are addressed by index ("0", "1", ...).
    pub fn field(mut self, name: &str, rules: &[Rule]) -> Self {
        let messages = self.evaluate(name, rules);
        if !messages.is_empty() {
            self.errors
                .entry(name.to_string())
                .or_default()
                .extend(messages);
        }
        self
    }

    fn evaluate(&self, name: &str, rules: &[Rule]) -> Vec<String> {
        let value = self.params.field(name);
        let required = rules.iter().any(|rule| rule.name() == REQUIRED);
        if !required && value.is_none_or(Value::is_null) {
            return Vec::new();
        }

        let mut messages = Vec::new();
        for rule in rules {
            let check = rule.check.as_ref().or_else(|| self.registry.get(rule.name()));
            match check {
                Some(check) => messages.extend(
                    check
                        .check_all(value, rule.options())
                        .iter()
                        .map(RuleError::render),
                ),
                None => messages.push(format!("has unknown rule {}", rule.name())),
            }
        }
        messages
    }

    /// Errors collected so far
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finalize(self) -> ValidationOutcome {
        if self.errors.is_empty() {
            ValidationOutcome::Valid(self.params)
        } else {
            ValidationOutcome::Invalid(self.errors)
        }
    }
}
