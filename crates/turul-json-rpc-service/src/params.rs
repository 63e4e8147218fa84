use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::RpcError;
use crate::request::RequestParams;
use crate::validation::{ErrorMap, ValidationOutcome};

/// Params that passed a method's validation.
///
/// Only obtainable from a [`ValidationOutcome::Valid`], so a method body never
/// sees raw, unvalidated input. [`Params::parse`] turns them into the method's
/// own typed struct; serde maps every string key, nested ones included, onto
/// that struct's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Params(RequestParams);

impl Params {
    pub(crate) fn new(validated: RequestParams) -> Self {
        Self(validated)
    }

    /// Deserialize into the method's parameter type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        Self::decode(self.0.to_value())
    }

    pub fn into_parsed<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        Self::decode(self.0.into_value())
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
        serde_json::from_value(value).map_err(|e| {
            RpcError::invalid_params("params do not match the method signature")
                .with_data(json!({ "reason": e.to_string() }))
        })
    }

    /// Field by name, or by index for positional params
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.field(name)
    }

    pub fn as_request_params(&self) -> &RequestParams {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0.into_value()
    }
}

impl TryFrom<ValidationOutcome> for Params {
    type Error = ErrorMap;

    fn try_from(outcome: ValidationOutcome) -> Result<Self, Self::Error> {
        outcome.into_result().map(Params::new)
    }
}
