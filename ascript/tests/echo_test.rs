mod test_helpers;

use ascript::RuntimeConfig;
use ascript::ActorRuntime;
use ascript_api::actor::ActorDefinition;
use ascript_api::address::ActorStatus;
use ascript_api::scope::RootScope;
use ascript_api::value::Value;

use test_helpers::*;

#[tokio::test]
async fn test_echo_reply_reaches_bound_input() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    let log = recorded();
    runtime.define_actor(echo_definition()?)?;
    runtime.define_actor(echo_test_definition(&log)?)?;

    let tester = runtime.spawn("EchoTest", vec![], None)?;
    runtime.run_until_quiescent().await?;

    assert_eq!(firsts(&log), vec![Value::from("Echo: hi")]);
    assert!(tester.is_running());
    assert_eq!(runtime.actor_count(), 2);
    assert_eq!(runtime.binding_count(), 1);

    runtime.shutdown().await?;
    assert_eq!(runtime.actor_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_echo_from_routine() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    let log = recorded();
    runtime.define_actor(echo_definition()?)?;
    runtime.define_actor(echo_test_definition(&log)?)?;

    let result = runtime
        .run_routine(|ctx, _| {
            ctx.spawn("EchoTest", vec![])?;
            Ok(Value::from("started"))
        })
        .await?;

    assert_eq!(result, Value::from("started"));
    assert_eq!(firsts(&log), vec![Value::from("Echo: hi")]);
    Ok(())
}

#[tokio::test]
async fn test_messages_are_handled_in_send_order() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    let log = recorded();
    runtime.define_actor(
        ActorDefinition::builder("Collector")
            .input("add", &["n"], recorder(&log))
            .build()?,
    )?;

    let collector = runtime.spawn("Collector", vec![], None)?;
    for n in 0..50 {
        runtime.send(&collector, "add", vec![Value::from(n)])?;
    }
    runtime.run_until_quiescent().await?;

    let expected: Vec<Value> = (0..50).map(Value::from).collect();
    assert_eq!(firsts(&log), expected);
    Ok(())
}

#[tokio::test]
async fn test_unbound_emission_is_dropped() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    runtime.define_actor(echo_definition()?)?;

    let echo = runtime.spawn("Echo", vec![], None)?;
    runtime.send(&echo, "ping", vec![Value::from("nobody listens")])?;
    runtime.run_until_quiescent().await?;

    assert!(echo.is_running());
    assert!(runtime.is_quiescent());
    assert_eq!(runtime.binding_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_host_emit_routes_to_subscribers() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    let log = recorded();
    runtime.define_actor(echo_definition()?)?;
    runtime.define_actor(
        ActorDefinition::builder("Listener")
            .params(&["source"])
            .input("heard", &["msg"], recorder(&log))
            .bind("heard", "source", "pong")
            .build()?,
    )?;

    let echo = runtime.spawn("Echo", vec![], None)?;
    runtime.spawn("Listener", vec![Value::from(echo.clone())], None)?;
    runtime.spawn("Listener", vec![Value::from(echo.clone())], None)?;
    runtime.emit(&echo, "pong", vec![Value::from("direct")])?;
    runtime.run_until_quiescent().await?;

    assert_eq!(firsts(&log), vec![Value::from("direct"), Value::from("direct")]);
    assert!(runtime.emit(&echo, "missing", vec![]).is_err());
    Ok(())
}

#[tokio::test]
async fn test_actor_reads_scope_as_of_spawn() -> anyhow::Result<()> {
    let scope = RootScope::new();
    scope.set("global1", Value::from(12));
    let runtime = ActorRuntime::with_scope(RuntimeConfig::current_thread(), scope.clone())?;
    let log = recorded();

    let sink = log.clone();
    runtime.define_actor(
        ActorDefinition::builder("Reader")
            .input("read", &[], move |ctx, _| {
                sink.lock().unwrap().push(vec![ctx.global("global1")]);
                Ok(Value::Null)
            })
            .input("write", &["value"], |ctx, args| {
                ctx.set_global("global1", args[0].clone());
                Ok(Value::Null)
            })
            .build()?,
    )?;

    let reader = runtime.spawn("Reader", vec![], None)?;
    scope.set("global1", Value::from(25));
    runtime.send(&reader, "read", vec![])?;
    runtime.send(&reader, "write", vec![Value::from(30)])?;
    runtime.send(&reader, "read", vec![])?;
    runtime.run_until_quiescent().await?;

    assert_eq!(firsts(&log), vec![Value::from(12), Value::from(30)]);
    assert_eq!(scope.get("global1"), Value::from(30));
    Ok(())
}

#[tokio::test]
async fn test_routine_stops_with_constructor_value() -> anyhow::Result<()> {
    let runtime = setup_runtime()?;
    runtime.define_actor(returning("Answer", Value::from(42))?)?;

    let answer = runtime.spawn("Answer", vec![], None)?;
    assert!(matches!(answer.status(), ActorStatus::Stopped(_)));
    assert_eq!(answer.result(), Value::from(42));
    assert!(answer.error().is_none());
    assert!(runtime.lookup(answer.id()).is_none());
    Ok(())
}
