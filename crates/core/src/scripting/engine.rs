//! Single-owner JavaScript execution engine.
//!
//! `boa_engine::Context` is `!Send`, so one dedicated OS thread owns the
//! runtime instance for the life of the process and evaluation requests reach
//! it through a bounded queue. Every request runs inside a freshly created
//! realm (its own global object and intrinsics) that is dropped afterwards,
//! so concurrent callers never observe each other's bindings.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::thread;
use std::time::Instant;

use boa_engine::vm::RuntimeLimits;
use boa_engine::{Context, JsError, Script, Source};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use super::value::{bind_environment, JsonIntrinsics};
use crate::error::CoreError;

/// Name of the worker thread that owns the runtime instance.
pub const ENGINE_THREAD_NAME: &str = "script-engine";

/// Engine worker configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Evaluations that may wait in the queue before callers are back-pressured.
    pub queue_capacity: usize,
    /// Stack size of the worker thread in bytes. Deeply recursive scripts need
    /// more than the default 2 MiB.
    pub stack_size_bytes: usize,
    /// Engine-native cap on loop iterations (`None` = unlimited).
    pub loop_iteration_limit: Option<u64>,
    /// Engine-native cap on call depth (`None` = engine default).
    pub recursion_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            stack_size_bytes: 16 * 1024 * 1024,
            loop_iteration_limit: None,
            recursion_limit: None,
        }
    }
}

/// One evaluation: script text, a diagnostic label and the caller bindings.
#[derive(Debug, Clone)]
pub struct EvalRequest {
    pub source: String,
    pub label: String,
    pub environment: Map<String, Value>,
}

struct EvalJob {
    request: EvalRequest,
    responder: oneshot::Sender<Result<Value, CoreError>>,
}

/// Handle to the engine worker. Cheap to clone; all clones feed the same
/// runtime instance.
#[derive(Clone)]
pub struct ScriptEngine {
    jobs: mpsc::Sender<EvalJob>,
}

impl ScriptEngine {
    /// Spawn the worker thread and build the runtime instance on it.
    ///
    /// Returns once the runtime is ready, or with the error that prevented it.
    pub fn start(config: EngineConfig) -> Result<Self, CoreError> {
        let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (init_tx, init_rx) = std::sync::mpsc::channel::<Result<(), CoreError>>();

        thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_string())
            .stack_size(config.stack_size_bytes)
            .spawn(move || {
                let worker = match Worker::new(config) {
                    Ok(worker) => {
                        let _ = init_tx.send(Ok(()));
                        worker
                    }
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                worker.run(jobs_rx);
            })
            .map_err(|err| {
                CoreError::Internal(format!("Failed to spawn script engine thread: {err}"))
            })?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(thread = ENGINE_THREAD_NAME, "Script engine started");
                Ok(Self { jobs: jobs_tx })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CoreError::Internal(
                "Script engine thread exited during initialization".to_string(),
            )),
        }
    }

    /// Evaluate a script in a fresh scope and return its final value.
    ///
    /// Runs to completion: there is no timeout. Dropping the returned future
    /// before the job is picked up skips the evaluation entirely.
    pub async fn evaluate(&self, request: EvalRequest) -> Result<Value, CoreError> {
        let (responder, reply) = oneshot::channel();
        self.jobs
            .send(EvalJob { request, responder })
            .await
            .map_err(|_| CoreError::Internal("Script engine is not running".to_string()))?;

        reply.await.map_err(|_| {
            CoreError::Internal("Script engine dropped the evaluation".to_string())
        })?
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    config: EngineConfig,
    context: Context,
}

impl Worker {
    fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let context = build_context(&config)?;
        Ok(Self { config, context })
    }

    fn run(mut self, mut jobs: mpsc::Receiver<EvalJob>) {
        while let Some(EvalJob { request, responder }) = jobs.blocking_recv() {
            if responder.is_closed() {
                tracing::debug!(label = %request.label, "Caller cancelled before evaluation, skipping");
                continue;
            }

            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.evaluate_isolated(&request)));
            let result = match outcome {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(label = %request.label, "Script engine panicked, rebuilding runtime");
                    self.rebuild();
                    Err(CoreError::Internal(
                        "Script engine panicked during evaluation".to_string(),
                    ))
                }
            };

            tracing::debug!(
                label = %request.label,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "Evaluation finished"
            );
            let _ = responder.send(result);
        }
        tracing::info!("Script engine queue closed, worker exiting");
    }

    /// Enter a brand-new realm, evaluate, and always return to the default one.
    fn evaluate_isolated(&mut self, request: &EvalRequest) -> Result<Value, CoreError> {
        let realm = self.context.create_realm().map_err(|err| {
            CoreError::Internal(format!("Failed to create execution scope: {err}"))
        })?;
        let default_realm = self.context.enter_realm(realm);
        let result = evaluate_in_scope(&mut self.context, request);
        self.context.enter_realm(default_realm);

        // Promise jobs queued before a failure are still in the shared job
        // queue and would otherwise run during a later evaluation.
        if matches!(result, Err(CoreError::Runtime(_) | CoreError::Serialization(_))) {
            tracing::debug!(label = %request.label, "Discarding runtime after failed evaluation");
            self.rebuild();
        }
        result
    }

    fn rebuild(&mut self) {
        match build_context(&self.config) {
            Ok(context) => self.context = context,
            Err(err) => tracing::error!(error = %err, "Failed to rebuild script runtime"),
        }
    }
}

fn build_context(config: &EngineConfig) -> Result<Context, CoreError> {
    let mut context = Context::builder().build().map_err(|err| {
        CoreError::Internal(format!("Failed to build JavaScript runtime: {err}"))
    })?;

    let mut limits = RuntimeLimits::default();
    if let Some(limit) = config.loop_iteration_limit {
        limits.set_loop_iteration_limit(limit);
    }
    if let Some(limit) = config.recursion_limit {
        limits.set_recursion_limit(limit);
    }
    context.set_runtime_limits(limits);
    Ok(context)
}

fn evaluate_in_scope(context: &mut Context, request: &EvalRequest) -> Result<Value, CoreError> {
    let intrinsics = JsonIntrinsics::capture(context)?;
    bind_environment(&request.environment, context)?;

    let source =
        Source::from_bytes(request.source.as_bytes()).with_path(Path::new(&request.label));
    let script = Script::parse(source, None, context)
        .map_err(|err| CoreError::Compile(describe(&err, context)))?;
    let value = script
        .evaluate(context)
        .map_err(|err| CoreError::Runtime(describe(&err, context)))?;

    // Promise reactions belong to this scope; settle them before it goes away.
    context.run_jobs();
    let converted = intrinsics.to_json(&value, context)?;
    // `toJSON` methods may have queued more.
    context.run_jobs();

    Ok(converted)
}

/// Render an engine error as `Kind: message` where possible.
fn describe(err: &JsError, context: &mut Context) -> String {
    match err.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => err.to_string(),
    }
}
