use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ascript_api::actor::ActorDefinition;
use ascript_api::address::{ActorId, ActorRef};
use ascript_api::context::ActorContext;
use ascript_api::errors::ActorError;
use ascript_api::message::MessageOrigin;
use ascript_api::scope::RootScope;
use ascript_api::types::ActorResult;
use ascript_api::value::Value;

use crate::log_lifecycle;
use crate::runtime::binding::{resolve_source, BindingTable};
use crate::runtime::cell::{cell_of, ActorCell, Termination};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::error::SystemError;
use crate::runtime::registry::{ActorDirectory, DefinitionRegistry};
use crate::runtime::scheduler::{create_scheduler, RunQueue, Scheduler};

/// Definition name used by [`ActorRuntime::run_routine`].
const ROUTINE: &str = "Routine";

/// State shared by the runtime handle, its scheduler and every handler
/// context.
pub(crate) struct RuntimeCore {
    pub(crate) system_id: Uuid,
    pub(crate) config: RuntimeConfig,
    pub(crate) definitions: DefinitionRegistry,
    pub(crate) directory: ActorDirectory,
    pub(crate) bindings: BindingTable,
    pub(crate) run_queue: RunQueue,
    pub(crate) scope: RootScope,
    /// Messages queued but not yet handled
    pub(crate) in_flight: AtomicUsize,
    /// Signalled whenever `in_flight` drops to zero
    pub(crate) quiescent: Notify,
    /// Roots whose failure is reported by `run_until_quiescent`
    pub(crate) monitored: Mutex<HashSet<ActorId>>,
    pub(crate) root_failure: Mutex<Option<(String, ActorError)>>,
    pub(crate) shutting_down: AtomicBool,
    pub(crate) shutdown: Notify,
}

impl RuntimeCore {
    fn new(config: RuntimeConfig, scope: RootScope) -> Self {
        Self {
            system_id: Uuid::new_v4(),
            config,
            definitions: DefinitionRegistry::new(),
            directory: ActorDirectory::new(),
            bindings: BindingTable::new(),
            run_queue: RunQueue::new(),
            scope,
            in_flight: AtomicUsize::new(0),
            quiescent: Notify::new(),
            monitored: Mutex::new(HashSet::new()),
            root_failure: Mutex::new(None),
            shutting_down: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Refuses new work and wakes every worker and waiter. Idempotent.
    pub(crate) fn begin_shutdown(&self) -> bool {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shutdown.notify_waiters();
        self.quiescent.notify_waiters();
        true
    }

    /// Resolves once shutdown has begun.
    pub(crate) async fn shutdown_requested(&self) {
        loop {
            let notified = self.shutdown.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_shutting_down() {
                return;
            }
            notified.await;
        }
    }

    /// Resolves once no message is queued or being handled.
    pub(crate) async fn wait_quiescent(&self) -> Result<(), SystemError> {
        loop {
            // Registered before the check so a concurrent drop to zero is seen
            let notified = self.quiescent.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_shutting_down() {
                return Err(SystemError::ShuttingDown);
            }
            if self.in_flight() == 0 {
                return Ok(());
            }
            notified.await;
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Creates, constructs and starts one actor instance.
    ///
    /// Construction steps, in order:
    /// 1. Allocate fields from the definition's parameters
    /// 2. Run the constructor body
    /// 3. Resolve the binding declarations
    /// 4. Mark the actor running and publish what the constructor sent
    /// 5. Apply a stop the constructor requested; routines stop here with the
    ///    constructor's value
    pub(crate) fn spawn_actor(
        self: &Arc<Self>,
        definition: Arc<ActorDefinition>,
        args: Vec<Value>,
        parent: Option<&Arc<ActorCell>>,
        monitored: bool,
    ) -> ActorResult<ActorRef> {
        if self.is_shutting_down() {
            return Err(ActorError::SystemShutdown);
        }
        if args.len() > definition.params().len() {
            warn!(
                definition = definition.name(),
                expected = definition.params().len(),
                given = args.len(),
                "Extra constructor arguments ignored"
            );
        }
        let fields: HashMap<String, Value> = definition
            .params()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or(Value::Null)))
            .collect();

        let supervision = definition.supervision().merge(&self.config.supervision);
        let cell = ActorCell::new(
            self.system_id,
            definition.clone(),
            supervision,
            parent,
            fields,
            self.scope.snapshot(),
        );
        if let Some(parent) = parent {
            parent.add_child(&cell);
        }
        self.directory.insert(cell.clone());
        if monitored {
            self.monitored
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(cell.id());
        }
        log_lifecycle!(cell.path(), "spawned");

        let (value, outbox, pending) = match definition.constructor() {
            Some(constructor) => {
                let constructor = constructor.clone();
                let invocation = self.invoke(&cell, &constructor, args);
                match invocation.result {
                    Ok(value) => (value, invocation.outbox, invocation.pending),
                    Err(error) => {
                        let error = ActorError::ConstructorError {
                            actor: cell.path().to_string(),
                            reason: error.to_string(),
                        };
                        self.terminate(&cell, Termination::Fail(error.clone()));
                        return Err(error);
                    }
                }
            }
            None => (Value::Null, Vec::new(), None),
        };

        // Resolved all at once, so a failing declaration leaves nothing bound
        let resolved = {
            let state = cell.lock_state();
            definition
                .bindings()
                .iter()
                .map(|decl| resolve_source(&cell, &state.fields, decl).map(|source| (decl, source)))
                .collect::<Result<Vec<_>, _>>()
        };
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(error) => {
                self.abort_construction(&cell, error.clone());
                return Err(error);
            }
        };
        for (decl, source) in resolved {
            match source {
                Some(source) => self.bindings.bind(source.id(), &decl.output, cell.clone(), &decl.input),
                None => debug!(actor = cell.path(), binding = %decl, "Source already terminated, binding skipped"),
            }
        }

        // Construction keeps the execution slot until a stop requested by the
        // constructor is applied, so no worker picks the actor up before that
        cell.begin_run();
        cell.mark_running();
        log_lifecycle!(cell.path(), "running");
        self.flush(&cell, outbox);

        match pending {
            Some(termination) => self.terminate(&cell, termination),
            None if definition.is_routine() => self.terminate(&cell, Termination::Stop(value)),
            None => {}
        }
        cell.end_run();
        if !cell.mailbox.is_empty() {
            self.schedule(&cell);
        }
        Ok(cell.actor_ref())
    }
}

impl fmt::Debug for RuntimeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeCore")
            .field("system_id", &self.system_id)
            .field("actors", &self.directory.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// # Actor Runtime
///
/// Owns one actor system: its definitions, live actors, binding table,
/// scheduler and root scope. Several runtimes can coexist in one process
/// without sharing any of these.
///
/// ## Example
///
/// ```rust,no_run
/// use ascript::{ActorRuntime, RuntimeConfig};
/// use ascript_api::{ActorDefinition, Value};
///
/// # async fn demo() -> Result<(), ascript::SystemError> {
/// let runtime = ActorRuntime::new(RuntimeConfig::default())?;
/// runtime.define_actor(
///     ActorDefinition::builder("Echo")
///         .input("ping", &["x"], |ctx, args| {
///             ctx.emit("pong", args)?;
///             Ok(Value::Null)
///         })
///         .output("pong", &["x"])
///         .build()?,
/// )?;
/// let echo = runtime.spawn("Echo", vec![], None)?;
/// runtime.send(&echo, "ping", vec![Value::from(42)])?;
/// runtime.run_until_quiescent().await?;
/// runtime.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct ActorRuntime {
    core: Arc<RuntimeCore>,
    scheduler: Box<dyn Scheduler>,
}

impl ActorRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self, SystemError> {
        Self::with_scope(config, RootScope::new())
    }

    /// Creates a runtime whose actors read and write `scope`.
    pub fn with_scope(config: RuntimeConfig, scope: RootScope) -> Result<Self, SystemError> {
        config.validate()?;
        let scheduler = create_scheduler(&config.scheduling_mode);
        let core = Arc::new(RuntimeCore::new(config, scope));
        info!(
            system = %core.system_id,
            scheduler = scheduler.name(),
            "Actor runtime created"
        );
        Ok(Self { core, scheduler })
    }

    pub fn system_id(&self) -> Uuid {
        self.core.system_id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.core.config
    }

    pub fn scope(&self) -> &RootScope {
        &self.core.scope
    }

    /// Registers a definition under its name.
    ///
    /// # Errors
    /// `DuplicateDefinitionError` when the name is taken.
    pub fn define_actor(&self, definition: ActorDefinition) -> ActorResult<()> {
        let definition = self.core.definitions.register(definition)?;
        debug!(definition = definition.name(), "Actor definition registered");
        Ok(())
    }

    /// Spawns an instance of a registered definition, as a child of `parent`
    /// or as a root.
    ///
    /// # Errors
    /// * `UnknownDefinition` for an unregistered name
    /// * `ConstructorError` when the constructor body fails
    /// * `BindingResolutionError` when a binding declaration cannot be resolved
    pub fn spawn(
        &self,
        definition: &str,
        args: Vec<Value>,
        parent: Option<&ActorRef>,
    ) -> ActorResult<ActorRef> {
        let parent = parent.map(|p| self.own_cell(p)).transpose()?;
        let definition = self.definition(definition)?;
        self.core.spawn_actor(definition, args, parent.as_ref(), false)
    }

    /// Spawns a root actor whose failure `run_until_quiescent` reports.
    pub fn spawn_monitored(&self, definition: &str, args: Vec<Value>) -> ActorResult<ActorRef> {
        let definition = self.definition(definition)?;
        self.core.spawn_actor(definition, args, None, true)
    }

    /// Reports a later failure of `actor` from `run_until_quiescent`.
    pub fn monitor(&self, actor: &ActorRef) -> ActorResult<()> {
        let cell = self.own_cell(actor)?;
        if cell.status().is_terminated() {
            return Err(ActorError::Stopped);
        }
        self.core
            .monitored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cell.id());
        Ok(())
    }

    /// Queues a call of `input` on `target` from outside any actor.
    ///
    /// Messages to terminated actors are dropped.
    pub fn send(&self, target: &ActorRef, input: &str, args: Vec<Value>) -> ActorResult<()> {
        let cell = self.own_cell(target)?;
        if self.core.is_shutting_down() {
            return Err(ActorError::SystemShutdown);
        }
        self.core.enqueue(
            &cell,
            input,
            args.iter().map(Value::share).collect(),
            MessageOrigin::Direct { sender: None },
        );
        Ok(())
    }

    /// Emits through an output port of `source` as if its handler had.
    pub fn emit(&self, source: &ActorRef, output: &str, args: Vec<Value>) -> ActorResult<()> {
        let cell = self.own_cell(source)?;
        if !cell.definition().has_output(output) {
            return Err(ActorError::UnknownOutput {
                actor: cell.path().to_string(),
                output: output.to_string(),
            });
        }
        if !cell.is_running() {
            debug!(source = cell.path(), output, "Source not running, emission dropped");
            return Ok(());
        }
        self.core
            .route_emission(&cell, output, args.iter().map(Value::share).collect());
        Ok(())
    }

    /// Runs handlers until no message is queued or being handled.
    ///
    /// # Errors
    /// `RootActorFailed` for the first failure of a monitored root since the
    /// previous call. Each failure is reported once.
    pub async fn run_until_quiescent(&self) -> Result<(), SystemError> {
        self.scheduler.drive(&self.core).await?;
        match self.core.take_root_failure() {
            Some((actor, error)) => Err(SystemError::RootActorFailed { actor, error }),
            None => Ok(()),
        }
    }

    /// Runs `body` as the constructor of a monitored root routine, drives the
    /// runtime to quiescence and returns the routine's result.
    ///
    /// This is the entry point for executing a top-level script block.
    pub async fn run_routine<F>(&self, body: F) -> Result<Value, SystemError>
    where
        F: Fn(&mut dyn ActorContext, Vec<Value>) -> ActorResult<Value> + Send + Sync + 'static,
    {
        let definition = ActorDefinition::builder(ROUTINE)
            .on_start(body)
            .routine()
            .build()?;
        let routine = self
            .core
            .spawn_actor(Arc::new(definition), Vec::new(), None, true)
            .map_err(|error| {
                let failed = match &error {
                    ActorError::ConstructorError { actor, .. } => Some(actor.clone()),
                    _ => None,
                };
                match failed {
                    Some(actor) => {
                        // Reported through the returned error instead
                        self.core.take_root_failure();
                        SystemError::RootActorFailed { actor, error }
                    }
                    None => SystemError::Actor(error),
                }
            })?;
        self.run_until_quiescent().await?;
        Ok(routine.result())
    }

    /// Asks `actor` to stop with `result` once its earlier messages are
    /// handled.
    ///
    /// # Errors
    /// `Stopped` when the actor has already terminated.
    pub fn stop(&self, actor: &ActorRef, result: Value) -> ActorResult<()> {
        let cell = self.own_cell(actor)?;
        if self.core.request_stop(&cell, result) {
            Ok(())
        } else {
            Err(ActorError::Stopped)
        }
    }

    /// A live actor by id.
    pub fn lookup(&self, id: ActorId) -> Option<ActorRef> {
        self.core.directory.get(id).map(|cell| cell.actor_ref())
    }

    /// Number of starting or running actors.
    pub fn actor_count(&self) -> usize {
        self.core.directory.len()
    }

    /// Number of registered subscriptions in the binding table.
    pub fn binding_count(&self) -> usize {
        self.core.bindings.len()
    }

    pub fn is_quiescent(&self) -> bool {
        self.core.in_flight() == 0
    }

    /// Stops the scheduler and every remaining actor.
    ///
    /// Queued messages are discarded and parents are not notified.
    pub async fn shutdown(&self) -> Result<(), SystemError> {
        if !self.core.begin_shutdown() {
            return Ok(());
        }
        info!(system = %self.core.system_id, "Actor runtime shutting down");
        let stopped = self.scheduler.shutdown(&self.core).await;

        let actors = self.core.directory.all();
        let remaining = actors.len();
        for cell in actors {
            self.core.terminate(&cell, Termination::Stop(Value::Null));
        }
        info!(system = %self.core.system_id, remaining, "Actor runtime stopped");
        stopped
    }

    fn definition(&self, name: &str) -> ActorResult<Arc<ActorDefinition>> {
        self.core
            .definitions
            .get(name)
            .ok_or_else(|| ActorError::UnknownDefinition(name.to_string()))
    }

    fn own_cell(&self, actor: &ActorRef) -> ActorResult<Arc<ActorCell>> {
        let cell = cell_of(actor)?;
        if cell.system_id() != self.core.system_id {
            return Err(ActorError::TypeError(format!(
                "{} belongs to another runtime",
                cell.path()
            )));
        }
        Ok(cell)
    }
}

impl fmt::Debug for ActorRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRuntime")
            .field("core", &self.core)
            .field("scheduler", &self.scheduler.name())
            .finish()
    }
}

impl Drop for ActorRuntime {
    fn drop(&mut self) {
        // Lets pool workers exit; actors are released with the core
        self.core.begin_shutdown();
    }
}
