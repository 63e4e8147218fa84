use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::check::Check;
use super::rules::{
    ExclusionCheck, FormatCheck, InclusionCheck, LengthCheck, NotEmptyCheck, NumberCheck,
    RequiredCheck, TypeCheck,
};

static BUILTIN: Lazy<RuleRegistry> = Lazy::new(RuleRegistry::default);

/// Name-to-check table the validation engine resolves rules against
#[derive(Clone)]
pub struct RuleRegistry {
    checks: HashMap<String, Arc<dyn Check>>,
}

impl RuleRegistry {
    /// A registry with no rules at all
    pub fn empty() -> Self {
        Self {
            checks: HashMap::new(),
        }
    }

    /// Shared registry holding only the built-in rules
    pub fn builtin() -> &'static RuleRegistry {
        &BUILTIN
    }

    /// Register a check under `name`, returning the one it replaces
    pub fn register<C>(&mut self, name: impl Into<String>, check: C) -> Option<Arc<dyn Check>>
    where
        C: Check + 'static,
    {
        self.checks.insert(name.into(), Arc::new(check))
    }

    pub fn with<C>(mut self, name: impl Into<String>, check: C) -> Self
    where
        C: Check + 'static,
    {
        self.register(name, check);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Check>> {
        self.checks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.checks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::empty()
            .with("type", TypeCheck)
            .with("required", RequiredCheck)
            .with("not_empty", NotEmptyCheck)
            .with("length", LengthCheck)
            .with("number", NumberCheck)
            .with("inclusion", InclusionCheck)
            .with("exclusion", ExclusionCheck)
            .with("format", FormatCheck::new())
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::RuleError;
    use serde_json::{Value, json};

    #[test]
    fn test_builtin_rules_registered() {
        assert_eq!(
            RuleRegistry::builtin().names(),
            vec![
                "exclusion",
                "format",
                "inclusion",
                "length",
                "not_empty",
                "number",
                "required",
                "type"
            ]
        );
    }

    #[test]
    fn test_register_custom_rule() {
        let mut registry = RuleRegistry::default();
        let replaced = registry.register("even", |value: Option<&Value>, _: &Value| {
            match value.and_then(Value::as_i64) {
                Some(n) if n % 2 != 0 => Err(RuleError::new("must be even")),
                _ => Ok(()),
            }
        });

        assert!(replaced.is_none());
        let check = registry.get("even").unwrap();
        assert!(check.check(Some(&json!(3)), &Value::Null).is_err());
        assert!(!RuleRegistry::builtin().contains("even"));
    }
}
