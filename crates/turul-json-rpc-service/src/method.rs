//! # Method Contract
//!
//! Every method a service exposes implements [`JsonRpcMethod`]. All hooks have
//! defaults, so a method overrides only what it needs:
//!
//! - `call` answers requests; by default it refuses with an invalid-params error.
//! - `cast` answers notifications; by default it runs `call`.
//! - `validate` checks the raw params; by default everything is valid.
//! - `handle_exception` / `handle_error` turn a panic inside the method into an
//!   error object.
//!
//! A method ends early by returning `Err(RpcError)`, usually through `?`. Code
//! that cannot return a `Result` may instead `std::panic::panic_any(RpcError)`;
//! the dispatcher replies with that error unchanged.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic;
use std::pin::pin;
use std::sync::Once;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::RpcError;
use crate::params::Params;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::validation::ValidationOutcome;

/// What a method body produces
pub type MethodResult = Result<Value, RpcError>;

/// Serialize a method's typed result into a [`MethodResult`].
///
/// A value that cannot be represented as JSON becomes an internal error.
pub fn to_method_result<T: Serialize>(value: T) -> MethodResult {
    serde_json::to_value(value)
        .map_err(|e| RpcError::internal_error(format!("Unrepresentable result: {}", e)))
}

/// How a method invocation escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A panic carrying a message (`panic!("...")`)
    Exception,
    /// A panic carrying any other payload (`std::panic::panic_any(..)`)
    Signal,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Exception => "exception",
            FaultKind::Signal => "signal",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured panic from a method invocation
#[derive(Debug, Clone)]
pub struct Fault {
    pub kind: FaultKind,
    /// Panic message, or a rendering of the opaque payload
    pub payload: String,
    /// Backtrace taken inside the panicking method, before unwinding.
    ///
    /// `None` when another panic hook replaced the one installed by the
    /// service.
    pub trace: Option<String>,
    /// When the invocation that faulted started
    pub started_at: DateTime<Utc>,
}

impl Fault {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>, started_at: DateTime<Utc>) -> Self {
        let (kind, payload) = match payload.downcast::<String>() {
            Ok(message) => (FaultKind::Exception, *message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (FaultKind::Exception, (*message).to_string()),
                Err(payload) => (FaultKind::Signal, render_opaque(payload)),
            },
        };

        Self {
            kind,
            payload,
            trace: take_panic_trace(),
            started_at,
        }
    }
}

/// How a panic out of a method is answered
pub(crate) enum Escape {
    /// An `RpcError` raised with `panic_any`, replied verbatim
    Thrown(RpcError),
    Fault(Fault),
}

impl Escape {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>, started_at: DateTime<Utc>) -> Self {
        match payload.downcast::<RpcError>() {
            Ok(error) => {
                take_panic_trace();
                Escape::Thrown(*error)
            }
            Err(payload) => Escape::Fault(Fault::from_panic(payload, started_at)),
        }
    }
}

thread_local! {
    static TRACING_PANICS: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a hook in front of the current one that records a backtrace for
/// panics raised while a method is being polled
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if TRACING_PANICS.with(Cell::get) {
                let trace = Backtrace::force_capture().to_string();
                PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

fn take_panic_trace() -> Option<String> {
    PANIC_TRACE.with(|slot| slot.borrow_mut().take())
}

/// Restores the previous flag when a poll returns or unwinds
struct TracingPanics(bool);

impl TracingPanics {
    fn enter() -> Self {
        Self(TRACING_PANICS.with(|flag| flag.replace(true)))
    }
}

impl Drop for TracingPanics {
    fn drop(&mut self) {
        TRACING_PANICS.with(|flag| flag.set(self.0));
    }
}

/// Poll `future` with panic backtraces enabled.
///
/// The trace is left in a thread-local slot that [`Fault::from_panic`] takes,
/// so the panic must be caught on the polling thread, e.g. by wrapping the
/// returned future in `catch_unwind`.
pub(crate) async fn trace_panics<F: Future>(future: F) -> F::Output {
    install_panic_hook();
    let mut future = pin!(future);
    futures::future::poll_fn(move |cx| {
        let _tracing = TracingPanics::enter();
        future.as_mut().poll(cx)
    })
    .await
}

fn render_opaque(payload: Box<dyn Any + Send>) -> String {
    if let Some(value) = payload.downcast_ref::<Value>() {
        value.to_string()
    } else if let Some(code) = payload.downcast_ref::<i64>() {
        code.to_string()
    } else {
        "<opaque>".to_string()
    }
}

/// Trait implemented by every JSON-RPC method
#[async_trait]
pub trait JsonRpcMethod<C = ()>: Send + Sync
where
    C: Send + Sync + 'static,
{
    /// Handle a request (has an id, expects a response)
    async fn call(&self, params: Params, ctx: &C) -> MethodResult {
        let _ = (params, ctx);
        Err(RpcError::invalid_params("Method does not support calls"))
    }

    /// Handle a notification (no id, response discarded)
    async fn cast(&self, params: Params, ctx: &C) -> MethodResult {
        self.call(params, ctx).await
    }

    /// Check raw params before `call`/`cast` runs
    fn validate(&self, params: RequestParams) -> ValidationOutcome {
        ValidationOutcome::Valid(params)
    }

    /// Translate a panic that carried a message
    fn handle_exception(&self, request: &JsonRpcRequest, fault: &Fault) -> RpcError {
        let _ = request;
        RpcError::server_error(fault.payload.clone())
    }

    /// Translate a panic that carried any other payload
    fn handle_error(&self, request: &JsonRpcRequest, fault: &Fault) -> RpcError {
        let _ = request;
        RpcError::internal_error("Method exited abnormally").with_data(json!({
            "kind": fault.kind.as_str(),
            "payload": fault.payload,
        }))
    }
}

type ValidatorFn = Box<dyn Fn(RequestParams) -> ValidationOutcome + Send + Sync>;

/// A method built from a closure over typed params.
///
/// The closure receives params already validated and deserialized into `P`;
/// its `Ok` value is serialized as the result.
///
/// ```rust
/// use serde::Deserialize;
/// use turul_json_rpc_service::{FnMethod, RpcError};
///
/// #[derive(Deserialize)]
/// struct Add { a: i64, b: i64 }
///
/// let add = FnMethod::new(|p: Add, _ctx: &()| Ok::<_, RpcError>(p.a + p.b));
/// # let _ = add;
/// ```
pub struct FnMethod<F, P, R, C = ()> {
    handler: F,
    validator: Option<ValidatorFn>,
    _marker: PhantomData<fn(P, &C) -> R>,
}

impl<F, P, R, C> FnMethod<F, P, R, C>
where
    F: Fn(P, &C) -> Result<R, RpcError> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            validator: None,
            _marker: PhantomData,
        }
    }

    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Fn(RequestParams) -> ValidationOutcome + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }
}

#[async_trait]
impl<F, P, R, C> JsonRpcMethod<C> for FnMethod<F, P, R, C>
where
    F: Fn(P, &C) -> Result<R, RpcError> + Send + Sync + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    C: Send + Sync + 'static,
{
    async fn call(&self, params: Params, ctx: &C) -> MethodResult {
        let parsed: P = params.into_parsed()?;
        to_method_result((self.handler)(parsed, ctx)?)
    }

    fn validate(&self, params: RequestParams) -> ValidationOutcome {
        match &self.validator {
            Some(validator) => validator(params),
            None => ValidationOutcome::Valid(params),
        }
    }
}
