//! Built-in checks and their option types.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::check::{Check, RuleError};

/// Runtime shapes the `type` rule distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Integer,
    Float,
    /// Integer or float
    Number,
    Boolean,
    String,
    Array,
    Object,
    /// A string usable as an identifier (`[A-Za-z_][A-Za-z0-9_]*`)
    Symbol,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Symbol => "symbol",
        }
    }

    /// Exact-kind match: integers are never floats and floats never integers
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Kind::Integer => value.is_i64() || value.is_u64(),
            Kind::Float => value.is_f64(),
            Kind::Number => value.is_number(),
            Kind::Boolean => value.is_boolean(),
            Kind::String => value.is_string(),
            Kind::Array => value.is_array(),
            Kind::Object => value.is_object(),
            Kind::Symbol => value.as_str().is_some_and(is_identifier),
        }
    }

    fn mismatch(&self) -> RuleError {
        let template = match self {
            Kind::Integer => "is not an integer",
            Kind::Array => "is not an array",
            Kind::Object => "is not an object",
            _ => "is not a %{kind}",
        };
        RuleError::new(template).with("kind", self.as_str())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Numeric comparison options shared by `number` and `length`.
///
/// `length` also accepts the shorthands `is`, `min` and `max`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    #[serde(default, alias = "is", skip_serializing_if = "Option::is_none")]
    pub equal_to: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<Number>,
    #[serde(default, alias = "min", skip_serializing_if = "Option::is_none")]
    pub greater_than_or_equal_to: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than: Option<Number>,
    #[serde(default, alias = "max", skip_serializing_if = "Option::is_none")]
    pub less_than_or_equal_to: Option<Number>,
}

impl Bounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal_to(mut self, n: impl Into<Number>) -> Self {
        self.equal_to = Some(n.into());
        self
    }

    pub fn greater_than(mut self, n: impl Into<Number>) -> Self {
        self.greater_than = Some(n.into());
        self
    }

    pub fn greater_than_or_equal_to(mut self, n: impl Into<Number>) -> Self {
        self.greater_than_or_equal_to = Some(n.into());
        self
    }

    pub fn less_than(mut self, n: impl Into<Number>) -> Self {
        self.less_than = Some(n.into());
        self
    }

    pub fn less_than_or_equal_to(mut self, n: impl Into<Number>) -> Self {
        self.less_than_or_equal_to = Some(n.into());
        self
    }

    /// Shorthand for `equal_to`, reads better on lengths
    pub fn is(self, n: impl Into<Number>) -> Self {
        self.equal_to(n)
    }

    pub fn min(self, n: impl Into<Number>) -> Self {
        self.greater_than_or_equal_to(n)
    }

    pub fn max(self, n: impl Into<Number>) -> Self {
        self.less_than_or_equal_to(n)
    }

    /// Every comparison `actual` fails, in declaration order
    fn failures(&self, actual: &Number) -> Vec<(Comparison, &Number)> {
        let checks = [
            (Comparison::EqualTo, &self.equal_to),
            (Comparison::GreaterThan, &self.greater_than),
            (Comparison::GreaterThanOrEqualTo, &self.greater_than_or_equal_to),
            (Comparison::LessThan, &self.less_than),
            (Comparison::LessThanOrEqualTo, &self.less_than_or_equal_to),
        ];

        checks
            .into_iter()
            .filter_map(|(comparison, bound)| {
                let bound = bound.as_ref()?;
                let ordering = compare_numbers(actual, bound)?;
                (!comparison.holds(ordering)).then_some((comparison, bound))
            })
            .collect()
    }
}

/// Integers compare exactly; only a float on either side falls back to `f64`
fn compare_numbers(actual: &Number, limit: &Number) -> Option<Ordering> {
    match (exact_integer(actual), exact_integer(limit)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => actual.as_f64()?.partial_cmp(&limit.as_f64()?),
    }
}

fn exact_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    EqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl Comparison {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::EqualTo => ordering == Ordering::Equal,
            Comparison::GreaterThan => ordering == Ordering::Greater,
            Comparison::GreaterThanOrEqualTo => ordering != Ordering::Less,
            Comparison::LessThan => ordering == Ordering::Less,
            Comparison::LessThanOrEqualTo => ordering != Ordering::Greater,
        }
    }

    fn number_template(&self) -> &'static str {
        match self {
            Comparison::EqualTo => "must be equal to %{number}",
            Comparison::GreaterThan => "must be greater than %{number}",
            Comparison::GreaterThanOrEqualTo => "must be greater than or equal to %{number}",
            Comparison::LessThan => "must be less than %{number}",
            Comparison::LessThanOrEqualTo => "must be less than or equal to %{number}",
        }
    }

    fn length_template(&self) -> &'static str {
        match self {
            Comparison::EqualTo => "should be %{count} %{unit}",
            Comparison::GreaterThan => "should be more than %{count} %{unit}",
            Comparison::GreaterThanOrEqualTo => "should be at least %{count} %{unit}",
            Comparison::LessThan => "should be fewer than %{count} %{unit}",
            Comparison::LessThanOrEqualTo => "should be at most %{count} %{unit}",
        }
    }
}

fn invalid_options(rule: &'static str) -> RuleError {
    RuleError::new("has invalid options for rule %{rule}").with("rule", rule)
}

fn is_blank(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

/// `type`: options are the kind name, e.g. `"integer"`
pub struct TypeCheck;

impl Check for TypeCheck {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        let kind = Kind::deserialize(options).map_err(|_| invalid_options("type"))?;
        match value {
            Some(v) if !v.is_null() && !kind.matches(v) => Err(kind.mismatch()),
            _ => Ok(()),
        }
    }
}

/// `required`: fails only when the field is absent
pub struct RequiredCheck;

impl Check for RequiredCheck {
    fn check(&self, value: Option<&Value>, _options: &Value) -> Result<(), RuleError> {
        match value {
            None => Err(RuleError::new("is required")),
            Some(_) => Ok(()),
        }
    }
}

/// `not_empty`: fails on absent, null, `""`, `[]` and `{}`
pub struct NotEmptyCheck;

impl Check for NotEmptyCheck {
    fn check(&self, value: Option<&Value>, _options: &Value) -> Result<(), RuleError> {
        let empty = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(a)) => a.is_empty(),
            Some(Value::Object(o)) => o.is_empty(),
            Some(_) => false,
        };
        if empty {
            Err(RuleError::new("can't be empty"))
        } else {
            Ok(())
        }
    }
}

/// `length`: options are [`Bounds`]
pub struct LengthCheck;

impl Check for LengthCheck {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        match self.check_all(value, options).into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_all(&self, value: Option<&Value>, options: &Value) -> Vec<RuleError> {
        let bounds = match Bounds::deserialize(options) {
            Ok(bounds) => bounds,
            Err(_) => return vec![invalid_options("length")],
        };
        let (size, unit) = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::String(s)) => (s.chars().count(), "character(s)"),
            Some(Value::Array(a)) => (a.len(), "item(s)"),
            Some(Value::Object(o)) => (o.len(), "key(s)"),
            Some(_) => return vec![RuleError::new("is not a string, array or object")],
        };

        bounds
            .failures(&Number::from(size))
            .into_iter()
            .map(|(comparison, bound)| {
                RuleError::new(comparison.length_template())
                    .with("count", Value::Number(bound.clone()))
                    .with("unit", unit)
                    .with("length", size)
            })
            .collect()
    }
}

/// `number`: options are [`Bounds`]
pub struct NumberCheck;

impl Check for NumberCheck {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        match self.check_all(value, options).into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_all(&self, value: Option<&Value>, options: &Value) -> Vec<RuleError> {
        let bounds = match Bounds::deserialize(options) {
            Ok(bounds) => bounds,
            Err(_) => return vec![invalid_options("number")],
        };
        let actual = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Number(n)) => n,
            Some(_) => return vec![Kind::Number.mismatch()],
        };

        bounds
            .failures(actual)
            .into_iter()
            .map(|(comparison, bound)| {
                RuleError::new(comparison.number_template())
                    .with("number", Value::Number(bound.clone()))
            })
            .collect()
    }
}

/// Membership list from `{"in": [...]}`; anything that is not an array is an empty list
fn membership_list(options: &Value) -> Option<&Vec<Value>> {
    options.get("in").and_then(Value::as_array)
}

/// `inclusion`: options are `{"in": [...]}`
pub struct InclusionCheck;

impl Check for InclusionCheck {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        if is_blank(value) {
            return Ok(());
        }
        match (membership_list(options), value) {
            (Some(list), Some(v)) if list.contains(v) => Ok(()),
            (list, _) => Err(RuleError::new("must be one of %{enum}")
                .with("enum", Value::Array(list.cloned().unwrap_or_default()))),
        }
    }
}

/// `exclusion`: options are `{"in": [...]}`
pub struct ExclusionCheck;

impl Check for ExclusionCheck {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        if is_blank(value) {
            return Ok(());
        }
        match (membership_list(options), value) {
            (Some(list), Some(v)) if !list.contains(v) => Ok(()),
            (list, _) => Err(RuleError::new("must not be one of %{enum}")
                .with("enum", Value::Array(list.cloned().unwrap_or_default()))),
        }
    }
}

fn format_error() -> RuleError {
    RuleError::new("has invalid format")
}

/// `format` looked up by name: options are `{"pattern": "..."}`.
///
/// Each distinct pattern is compiled once and kept for the life of the check.
/// Patterns come from rule declarations, not from request data.
#[derive(Default)]
pub struct FormatCheck {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl FormatCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct patterns compiled so far
    pub fn cached_patterns(&self) -> usize {
        self.compiled.read().map_or(0, |compiled| compiled.len())
    }

    fn regex(&self, pattern: &str) -> Result<Regex, RuleError> {
        if let Some(regex) = self
            .compiled
            .read()
            .ok()
            .and_then(|compiled| compiled.get(pattern).cloned())
        {
            return Ok(regex);
        }

        let regex = Regex::new(pattern).map_err(|_| invalid_options("format"))?;
        if let Ok(mut compiled) = self.compiled.write() {
            compiled.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

impl Check for FormatCheck {
    fn check(&self, value: Option<&Value>, options: &Value) -> Result<(), RuleError> {
        if is_blank(value) {
            return Ok(());
        }
        let pattern = options
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_options("format"))?;
        CompiledFormat(self.regex(pattern)?).check(value, options)
    }
}

/// `format` with a pattern compiled up front
pub struct CompiledFormat(pub Regex);

impl Check for CompiledFormat {
    fn check(&self, value: Option<&Value>, _options: &Value) -> Result<(), RuleError> {
        match value {
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(s)) if self.0.is_match(s) => Ok(()),
            Some(_) => Err(format_error()),
        }
    }
}
