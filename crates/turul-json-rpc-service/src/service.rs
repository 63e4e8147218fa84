//! # Service Dispatcher
//!
//! [`JsonRpcService`] owns the routing table and runs the pipeline for every
//! decoded body: envelope check, method lookup, validation, invocation under
//! panic capture, and mapping of the outcome to a reply. Notifications run
//! the same pipeline but never produce a reply.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use tracing::{Instrument, debug, error, field, info_span, warn};

use crate::config::{BatchMode, DuplicatePolicy, ServiceConfig};
use crate::error::{JsonRpcError, JsonRpcErrorObject, RpcError, ServiceError};
use crate::method::{Escape, FaultKind, JsonRpcMethod, trace_panics};
use crate::params::Params;
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcReply};
use crate::validation::{ErrorMap, ValidationOutcome};

type ContextRenderer<C> = Arc<dyn Fn(&C) -> String + Send + Sync>;

/// Builder collecting method registrations before the routing table is frozen
pub struct JsonRpcServiceBuilder<C = ()>
where
    C: Send + Sync + 'static,
{
    config: ServiceConfig,
    registrations: Vec<(String, Arc<dyn JsonRpcMethod<C>>)>,
    describe_context: Option<ContextRenderer<C>>,
}

impl<C> JsonRpcServiceBuilder<C>
where
    C: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            registrations: Vec::new(),
            describe_context: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn batch_mode(mut self, mode: BatchMode) -> Self {
        self.config.batch_mode = mode;
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    pub fn max_batch_size(mut self, limit: usize) -> Self {
        self.config.max_batch_size = Some(limit);
        self
    }

    /// Render the per-call context into the `context` field of each
    /// `jsonrpc.invoke` span. Without it the field holds the context's type name.
    pub fn describe_context<F>(mut self, describe: F) -> Self
    where
        F: Fn(&C) -> String + Send + Sync + 'static,
    {
        self.describe_context = Some(Arc::new(describe));
        self
    }

    /// Register a method under `name`
    pub fn method<M>(self, name: impl Into<String>, method: M) -> Self
    where
        M: JsonRpcMethod<C> + 'static,
    {
        self.method_arc(name, Arc::new(method))
    }

    /// Register an already shared method, e.g. one serving several names
    pub fn method_arc(mut self, name: impl Into<String>, method: Arc<dyn JsonRpcMethod<C>>) -> Self {
        self.registrations.push((name.into(), method));
        self
    }

    /// Freeze the registrations into an immutable routing table
    pub fn build(self) -> Result<JsonRpcService<C>, ServiceError> {
        let mut methods: HashMap<String, Arc<dyn JsonRpcMethod<C>>> =
            HashMap::with_capacity(self.registrations.len());

        for (name, method) in self.registrations {
            if name.is_empty() {
                return Err(ServiceError::EmptyMethodName);
            }
            if self.config.duplicate_policy == DuplicatePolicy::Reject && methods.contains_key(&name) {
                return Err(ServiceError::DuplicateMethod(name));
            }
            if methods.insert(name.clone(), method).is_some() {
                debug!(method = %name, "Replaced earlier registration");
            }
        }

        debug!(methods = methods.len(), "Built JSON-RPC service");
        Ok(JsonRpcService {
            methods,
            config: self.config,
            describe_context: self.describe_context,
        })
    }
}

impl<C> Default for JsonRpcServiceBuilder<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Why an invocation did not produce a result
enum Failure {
    Rpc(RpcError),
    Invalid(ErrorMap),
}

fn error_map_value(errors: ErrorMap) -> Value {
    Value::Object(
        errors
            .into_iter()
            .map(|(field, messages)| (field, Value::from(messages)))
            .collect(),
    )
}

/// Transport-independent JSON-RPC 2.0 service.
///
/// Holds no mutable state after construction; share it behind an `Arc` and
/// dispatch from as many tasks as needed. `C` is an opaque per-call context
/// handed unchanged to every method.
pub struct JsonRpcService<C = ()>
where
    C: Send + Sync + 'static,
{
    methods: HashMap<String, Arc<dyn JsonRpcMethod<C>>>,
    config: ServiceConfig,
    describe_context: Option<ContextRenderer<C>>,
}

impl<C> JsonRpcService<C>
where
    C: Send + Sync + 'static,
{
    pub fn builder() -> JsonRpcServiceBuilder<C> {
        JsonRpcServiceBuilder::new()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get all registered methods, sorted by name
    pub fn registered_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Process one decoded body: a request object or a batch array.
    ///
    /// Returns `None` when nothing should be sent back (a lone notification).
    /// A batch always yields `Some`, possibly with an empty list.
    pub async fn handle(&self, body: Value, ctx: &C) -> Option<JsonRpcReply> {
        let (batch, size) = match &body {
            Value::Array(entries) => (true, entries.len()),
            _ => (false, 1),
        };
        let span = info_span!("jsonrpc.dispatch", batch, size, replies = field::Empty);

        let reply = self.dispatch_body(body, ctx).instrument(span.clone()).await;
        span.record("replies", reply.as_ref().map_or(0, |r| r.messages().len()));
        reply
    }

    /// Process a request that was already converted from its decoded form
    pub async fn handle_request(&self, request: JsonRpcRequest, ctx: &C) -> Option<JsonRpcMessage> {
        let span = info_span!(
            "jsonrpc.dispatch",
            batch = false,
            size = 1usize,
            replies = field::Empty
        );

        let reply = self.process_request(request, ctx).instrument(span.clone()).await;
        span.record("replies", usize::from(reply.is_some()));
        reply
    }

    async fn dispatch_body(&self, body: Value, ctx: &C) -> Option<JsonRpcReply> {
        match body {
            Value::Array(entries) => Some(self.dispatch_batch(entries, ctx).await),
            entry => self.dispatch_entry(entry, ctx).await.map(JsonRpcReply::Single),
        }
    }

    async fn dispatch_batch(&self, entries: Vec<Value>, ctx: &C) -> JsonRpcReply {
        if entries.is_empty() {
            warn!("Rejecting empty batch");
            return JsonRpcReply::Single(
                JsonRpcError::invalid_request(None, "batch must not be empty").into(),
            );
        }
        if let Some(limit) = self.config.max_batch_size {
            if entries.len() > limit {
                warn!(size = entries.len(), limit, "Rejecting oversized batch");
                return JsonRpcReply::Single(
                    JsonRpcError::invalid_request(None, "batch exceeds the maximum size").into(),
                );
            }
        }

        let replies = match self.config.batch_mode {
            BatchMode::Sequential => {
                let mut replies = Vec::with_capacity(entries.len());
                for entry in entries {
                    replies.push(self.dispatch_entry(entry, ctx).await);
                }
                replies
            }
            BatchMode::Concurrent => {
                join_all(entries.into_iter().map(|entry| self.dispatch_entry(entry, ctx))).await
            }
        };

        JsonRpcReply::Batch(replies.into_iter().flatten().collect())
    }

    async fn dispatch_entry(&self, entry: Value, ctx: &C) -> Option<JsonRpcMessage> {
        match JsonRpcRequest::from_value(entry) {
            Ok(request) => self.process_request(request, ctx).await,
            Err(rejection) => {
                warn!(reason = ?rejection.error.data, "Rejecting invalid request");
                Some(rejection.into())
            }
        }
    }

    async fn process_request(&self, request: JsonRpcRequest, ctx: &C) -> Option<JsonRpcMessage> {
        let Some(method) = self.methods.get(&request.method) else {
            debug!(method = %request.method, "Method not found");
            return request
                .id
                .map(|id| JsonRpcError::method_not_found(id, &request.method).into());
        };

        let outcome = self.invoke(method.as_ref(), &request, ctx).await;

        let Some(id) = request.id else {
            if let Err(error) = &outcome {
                debug!(method = %request.method, code = error.code, "Notification failed, nothing to reply");
            }
            return None;
        };

        Some(match outcome {
            Ok(result) => JsonRpcMessage::success(id, result),
            Err(error) => JsonRpcMessage::error(Some(id), error),
        })
    }

    /// Validate and run one method, turning every way it can end into a result or error object
    async fn invoke(
        &self,
        method: &dyn JsonRpcMethod<C>,
        request: &JsonRpcRequest,
        ctx: &C,
    ) -> Result<Value, JsonRpcErrorObject> {
        let context = match &self.describe_context {
            Some(describe) => describe(ctx),
            None => std::any::type_name::<C>().to_string(),
        };
        let span = info_span!(
            "jsonrpc.invoke",
            method = %request.method,
            id = ?request.id,
            request = ?request,
            context = %context,
            outcome = field::Empty,
            result = field::Empty,
            error.code = field::Empty,
            error.message = field::Empty
        );
        let started_at = Utc::now();
        let params = request.params.clone().unwrap_or_default();
        let notification = request.is_notification();

        let attempt = AssertUnwindSafe(trace_panics(async move {
            match method.validate(params) {
                ValidationOutcome::Valid(valid) => {
                    let params = Params::new(valid);
                    let result = if notification {
                        method.cast(params, ctx).await
                    } else {
                        method.call(params, ctx).await
                    };
                    result.map_err(Failure::Rpc)
                }
                ValidationOutcome::Invalid(errors) => Err(Failure::Invalid(errors)),
            }
        }))
        .catch_unwind()
        .instrument(span.clone())
        .await;

        let (label, outcome) = match attempt {
            Ok(Ok(value)) => ("ok", Ok(value)),
            Ok(Err(Failure::Rpc(error))) => ("error", Err(error.into())),
            Ok(Err(Failure::Invalid(errors))) => (
                "invalid_params",
                Err(JsonRpcErrorObject::invalid_params(Some(error_map_value(errors)))),
            ),
            Err(payload) => match Escape::from_panic(payload, started_at) {
                Escape::Thrown(error) => ("error", Err(error.into())),
                Escape::Fault(fault) => {
                    span.in_scope(|| {
                        error!(
                            kind = %fault.kind,
                            payload = %fault.payload,
                            started_at = %fault.started_at,
                            method = %request.method,
                            "Method invocation faulted"
                        )
                    });
                    let error = match fault.kind {
                        FaultKind::Exception => method.handle_exception(request, &fault),
                        FaultKind::Signal => method.handle_error(request, &fault),
                    };
                    (fault.kind.as_str(), Err(error.into()))
                }
            },
        };

        span.record("outcome", field::display(label));
        match &outcome {
            Ok(value) => {
                span.record("result", field::display(value));
            }
            Err(error) => {
                span.record("error.code", error.code);
                span.record("error.message", field::display(&error.message));
            }
        }
        span.in_scope(|| debug!("Invocation finished"));

        outcome
    }
}

impl<C> fmt::Debug for JsonRpcService<C>
where
    C: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcService")
            .field("methods", &self.registered_methods())
            .field("config", &self.config)
            .finish()
    }
}
