mod test_helpers;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ascript::logging;
use ascript::{ActorRuntime, RuntimeConfig, SystemError};
use ascript_api::actor::ActorDefinition;
use ascript_api::errors::ActorError;
use ascript_api::value::Value;

use test_helpers::*;

/// `hit(n)` counts itself and sends `hit(n - 1)` to the same actor until zero.
fn countdown(name: &str, hits: &Arc<AtomicUsize>, log: Option<&Recorded>) -> ActorDefinition {
    let hits = hits.clone();
    let log = log.cloned();
    let tag = name.to_string();
    ActorDefinition::builder(name)
        .input("hit", &["n"], move |ctx, args| {
            hits.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &log {
                log.lock().unwrap().push(vec![Value::from(tag.as_str()), args[0].clone()]);
            }
            let n = args[0].as_number().unwrap_or(0.0);
            if n > 0.0 {
                let this = ctx.this();
                ctx.send(&this, "hit", vec![Value::from(n - 1.0)])?;
            }
            Ok(Value::Null)
        })
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handlers_of_one_actor_never_overlap() -> anyhow::Result<()> {
    let runtime = Arc::new(setup_pool_runtime(4)?);
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let log = recorded();

    let (flag, clashes) = (inside.clone(), overlaps.clone());
    runtime.define_actor(
        ActorDefinition::builder("Counter")
            .input("inc", &[], move |ctx, _| {
                if flag.swap(true, Ordering::SeqCst) {
                    clashes.fetch_add(1, Ordering::SeqCst);
                }
                let n = ctx.field("n").as_number().unwrap_or(0.0);
                std::thread::yield_now();
                ctx.set_field("n", Value::from(n + 1.0));
                flag.store(false, Ordering::SeqCst);
                Ok(Value::Null)
            })
            .input("report", &[], {
                let log = log.clone();
                move |ctx, _| {
                    log.lock().unwrap().push(vec![ctx.field("n")]);
                    Ok(Value::Null)
                }
            })
            .build()?,
    )?;
    let counter = runtime.spawn("Counter", vec![], None)?;

    let senders: Vec<_> = (0..4)
        .map(|_| {
            let runtime = runtime.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    runtime.send(&counter, "inc", vec![]).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for sender in senders {
        sender.await?;
    }
    runtime.run_until_quiescent().await?;
    runtime.send(&counter, "report", vec![])?;
    runtime.run_until_quiescent().await?;

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(firsts(&log), vec![Value::from(400)]);
    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_runs_many_actors_to_quiescence() -> anyhow::Result<()> {
    let runtime = setup_pool_runtime(4)?;
    let hits = Arc::new(AtomicUsize::new(0));
    runtime.define_actor(countdown("Countdown", &hits, None))?;

    for _ in 0..8 {
        let actor = runtime.spawn("Countdown", vec![], None)?;
        runtime.send(&actor, "hit", vec![Value::from(99)])?;
    }
    runtime.run_until_quiescent().await?;

    assert_eq!(hits.load(Ordering::SeqCst), 800);
    assert!(runtime.is_quiescent());
    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_routine_is_stopped_before_workers_see_it() -> anyhow::Result<()> {
    let runtime = setup_pool_runtime(4)?;
    let ticks = Arc::new(AtomicUsize::new(0));
    let counted = ticks.clone();
    runtime.define_actor(
        ActorDefinition::builder("SelfTicker")
            .on_start(|ctx, _| {
                let this = ctx.this();
                ctx.send(&this, "tick", vec![])?;
                Ok(Value::from("done"))
            })
            .input("tick", &[], move |_, _| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            })
            .routine()
            .build()?,
    )?;
    // Starts the workers before the spawns below
    runtime.run_until_quiescent().await?;

    for _ in 0..300 {
        let routine = runtime.spawn("SelfTicker", vec![], None)?;
        assert_eq!(routine.result(), Value::from("done"));
        tokio::task::yield_now().await;
    }
    runtime.run_until_quiescent().await?;

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(runtime.actor_count(), 0);
    assert!(runtime.is_quiescent());
    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abnormal_worker_exit_fails_shutdown() -> anyhow::Result<()> {
    logging::init_test();
    let config = RuntimeConfig {
        catch_handler_panics: false,
        ..RuntimeConfig::shared_pool(2)
    };
    let runtime = ActorRuntime::new(config)?;
    runtime.define_actor(
        ActorDefinition::builder("Panicky")
            .input("explode", &[], |_, _| panic!("worker goes down"))
            .build()?,
    )?;

    let actor = runtime.spawn("Panicky", vec![], None)?;
    runtime.send(&actor, "explode", vec![])?;
    // The lost message is never counted down, so quiescence is not reached
    let waited =
        tokio::time::timeout(Duration::from_millis(200), runtime.run_until_quiescent()).await;
    assert!(waited.is_err());

    assert!(matches!(runtime.shutdown().await, Err(SystemError::Other(_))));
    Ok(())
}

#[tokio::test]
async fn test_current_thread_reaches_quiescence() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    let hits = Arc::new(AtomicUsize::new(0));
    runtime.define_actor(countdown("Countdown", &hits, None))?;

    let actor = runtime.spawn("Countdown", vec![], None)?;
    runtime.send(&actor, "hit", vec![Value::from(500)])?;
    assert!(!runtime.is_quiescent());
    runtime.run_until_quiescent().await?;

    assert_eq!(hits.load(Ordering::SeqCst), 501);
    assert!(runtime.is_quiescent());
    Ok(())
}

#[tokio::test]
async fn test_run_budget_interleaves_runnable_actors() -> anyhow::Result<()> {
    let config = RuntimeConfig {
        max_messages_per_run: 1,
        ..RuntimeConfig::current_thread()
    };
    let runtime = ActorRuntime::new(config)?;
    let hits = Arc::new(AtomicUsize::new(0));
    let log = recorded();
    runtime.define_actor(countdown("A", &hits, Some(&log)))?;
    runtime.define_actor(countdown("B", &hits, Some(&log)))?;

    let a = runtime.spawn("A", vec![], None)?;
    let b = runtime.spawn("B", vec![], None)?;
    runtime.send(&a, "hit", vec![Value::from(2)])?;
    runtime.send(&b, "hit", vec![Value::from(2)])?;
    runtime.run_until_quiescent().await?;

    let order: Vec<String> = firsts(&log).iter().map(|v| v.to_string()).collect();
    assert_eq!(order, vec!["A", "B", "A", "B", "A", "B"]);
    Ok(())
}

#[tokio::test]
async fn test_sent_values_are_isolated_from_sender() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    let log = recorded();

    runtime.define_actor(
        ActorDefinition::builder("Receiver")
            .input("take", &["data"], {
                let log = log.clone();
                move |_, args| {
                    let data = args[0].clone();
                    let write = data.set("x", Value::from(99));
                    let nested = data.get("items").set("0", Value::from(99));
                    log.lock().unwrap().push(vec![
                        data,
                        Value::from(matches!(write, Err(ActorError::ImmutableWriteError { .. }))),
                        Value::from(nested.is_err()),
                    ]);
                    Ok(Value::Null)
                }
            })
            .build()?,
    )?;
    runtime.define_actor(
        ActorDefinition::builder("Sender")
            .params(&["peer"])
            .input("go", &[], |ctx, _| {
                let items = Value::array([Value::from(1)]);
                let data = Value::record([("x", Value::from(1)), ("items", items.clone())]);
                let peer = ctx.field("peer");
                if let Some(peer) = peer.as_actor() {
                    ctx.send(peer, "take", vec![data.clone()])?;
                }
                data.set("x", Value::from(2))?;
                items.set("0", Value::from(2))?;
                Ok(Value::Null)
            })
            .build()?,
    )?;

    let receiver = runtime.spawn("Receiver", vec![], None)?;
    let sender = runtime.spawn("Sender", vec![Value::from(receiver)], None)?;
    runtime.send(&sender, "go", vec![])?;
    runtime.run_until_quiescent().await?;

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let data = &calls[0][0];
    assert!(data.is_frozen());
    assert!(data.is_deep_frozen());
    assert_eq!(data.get("x"), Value::from(1));
    assert_eq!(data.get("items").get("0"), Value::from(1));
    assert_eq!(calls[0][1], Value::from(true));
    assert_eq!(calls[0][2], Value::from(true));
    assert!(sender.is_running());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_refuses_new_work() -> anyhow::Result<()> {
    let runtime = setup_pool_runtime(2)?;
    runtime.define_actor(echo_definition()?)?;
    let echo = runtime.spawn("Echo", vec![], None)?;
    runtime.run_until_quiescent().await?;

    runtime.shutdown().await?;

    assert!(!echo.is_running());
    assert_eq!(runtime.actor_count(), 0);
    assert!(matches!(
        runtime.spawn("Echo", vec![], None),
        Err(ActorError::SystemShutdown)
    ));
    assert!(matches!(
        runtime.send(&echo, "ping", vec![]),
        Err(ActorError::SystemShutdown)
    ));
    assert!(matches!(
        runtime.run_until_quiescent().await,
        Err(SystemError::ShuttingDown)
    ));
    Ok(())
}

#[tokio::test]
async fn test_actor_refs_do_not_cross_runtimes() -> anyhow::Result<()> {
    let first = setup_runtime()?;
    let second = setup_runtime()?;
    first.define_actor(echo_definition()?)?;
    let echo = first.spawn("Echo", vec![], None)?;

    assert_ne!(first.system_id(), second.system_id());
    assert!(matches!(
        second.send(&echo, "ping", vec![]),
        Err(ActorError::TypeError(_))
    ));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(matches!(
        ActorRuntime::new(RuntimeConfig::shared_pool(0)),
        Err(SystemError::ConfigError(_))
    ));
}
