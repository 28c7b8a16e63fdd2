#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ascript::logging;
use ascript::{ActorRuntime, RuntimeConfig};
use ascript_api::actor::ActorDefinition;
use ascript_api::context::ActorContext;
use ascript_api::types::ActorResult;
use ascript_api::value::Value;

/// Values recorded by test handlers, in arrival order.
pub type Recorded = Arc<Mutex<Vec<Vec<Value>>>>;

pub fn recorded() -> Recorded {
    Arc::new(Mutex::new(Vec::new()))
}

/// Handler body that stores its arguments and returns `null`.
pub fn recorder(
    log: &Recorded,
) -> impl Fn(&mut dyn ActorContext, Vec<Value>) -> ActorResult<Value> + Send + Sync + use<> {
    let log = log.clone();
    move |_ctx: &mut dyn ActorContext, args: Vec<Value>| {
        log.lock().unwrap().push(args);
        Ok(Value::Null)
    }
}

/// First argument of every recorded call.
pub fn firsts(log: &Recorded) -> Vec<Value> {
    log.lock()
        .unwrap()
        .iter()
        .map(|args| args.first().cloned().unwrap_or(Value::Null))
        .collect()
}

/// Creates a single-threaded runtime with test logging.
pub fn setup_runtime() -> anyhow::Result<ActorRuntime> {
    logging::init_test();
    Ok(ActorRuntime::new(RuntimeConfig::current_thread())?)
}

/// Creates a runtime backed by a pool of `workers` tasks.
pub fn setup_pool_runtime(workers: usize) -> anyhow::Result<ActorRuntime> {
    logging::init_test();
    Ok(ActorRuntime::new(RuntimeConfig::shared_pool(workers))?)
}

/// `Echo`: `ping(text)` emits `pong("Echo: " + text)`.
pub fn echo_definition() -> ActorResult<ActorDefinition> {
    ActorDefinition::builder("Echo")
        .input("ping", &["text"], |ctx, args| {
            ctx.emit("pong", vec![Value::from(format!("Echo: {}", args[0]))])?;
            Ok(Value::Null)
        })
        .output("pong", &["msg"])
        .build()
}

/// `EchoTest`: spawns an `Echo`, binds `result <- this.echoActor.pong` and
/// pings it from the constructor.
pub fn echo_test_definition(log: &Recorded) -> ActorResult<ActorDefinition> {
    ActorDefinition::builder("EchoTest")
        .on_start(|ctx, _| {
            let echo = ctx.spawn("Echo", vec![])?;
            ctx.set_field("echoActor", Value::from(echo.clone()));
            ctx.send(&echo, "ping", vec![Value::from("hi")])?;
            Ok(Value::Null)
        })
        .input("result", &["msg"], recorder(log))
        .bind("result", "this.echoActor", "pong")
        .build()
}

/// Routine that stops right after its constructor with `value`.
pub fn returning(name: &str, value: Value) -> ActorResult<ActorDefinition> {
    ActorDefinition::builder(name)
        .on_start(move |_, _| Ok(value.clone()))
        .routine()
        .build()
}

/// Actor whose `boom` input throws `message`.
pub fn failing(name: &str, message: &'static str) -> ActorResult<ActorDefinition> {
    ActorDefinition::builder(name)
        .input("boom", &[], move |_, _| {
            Err(ascript_api::errors::ActorError::Thrown(Value::from(message)))
        })
        .build()
}
