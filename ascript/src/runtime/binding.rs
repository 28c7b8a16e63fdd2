//! # Port Binding Table
//!
//! Routes emissions from an (emitter, output) pair to the inputs subscribed
//! to it. Entries are created while an actor is constructed, from its
//! `input <- source.output` declarations, and removed when either side
//! terminates.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use ascript_api::actor::{BindingDecl, SourcePath};
use ascript_api::address::ActorId;
use ascript_api::errors::ActorError;
use ascript_api::value::Value;

use crate::runtime::cell::{cell_of, ActorCell};

/// One subscribed input.
#[derive(Clone)]
pub struct Subscription {
    pub subscriber: Arc<ActorCell>,
    pub input: String,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subscriber.path(), self.input)
    }
}

/// Emitter -> output name -> subscriptions, in binding order.
#[derive(Default)]
pub struct BindingTable {
    routes: RwLock<HashMap<ActorId, HashMap<String, Vec<Subscription>>>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, source: ActorId, output: &str, subscriber: Arc<ActorCell>, input: &str) {
        trace!(
            source = %source,
            output,
            subscriber = subscriber.path(),
            input,
            "Binding registered"
        );
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        routes
            .entry(source)
            .or_default()
            .entry(output.to_string())
            .or_default()
            .push(Subscription {
                subscriber,
                input: input.to_string(),
            });
    }

    /// Subscriptions for an emission, in the order they were bound.
    pub fn subscribers(&self, source: ActorId, output: &str) -> Vec<Subscription> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&source)
            .and_then(|outputs| outputs.get(output))
            .cloned()
            .unwrap_or_default()
    }

    /// Drops every entry the actor takes part in, as emitter or as subscriber.
    ///
    /// Returns the number of removed subscriptions.
    pub fn remove_actor(&self, id: ActorId) -> usize {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = routes
            .remove(&id)
            .map(|outputs| outputs.values().map(Vec::len).sum())
            .unwrap_or(0);
        for outputs in routes.values_mut() {
            for subs in outputs.values_mut() {
                let before = subs.len();
                subs.retain(|s| s.subscriber.id() != id);
                removed += before - subs.len();
            }
            outputs.retain(|_, subs| !subs.is_empty());
        }
        routes.retain(|_, outputs| !outputs.is_empty());
        removed
    }

    /// Total number of subscriptions.
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flat_map(|outputs| outputs.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTable").field("subscriptions", &self.len()).finish()
    }
}

fn resolution_error(owner: &ActorCell, decl: &BindingDecl, reason: String) -> ActorError {
    ActorError::BindingResolutionError {
        actor: owner.path().to_string(),
        path: decl.to_string(),
        reason,
    }
}

/// Evaluates the source expression of `decl` against the owner's fields.
///
/// Returns `Ok(None)` when the source actor has already terminated: it can
/// never emit again, so the binding is skipped.
pub(crate) fn resolve_source(
    owner: &Arc<ActorCell>,
    fields: &HashMap<String, Value>,
    decl: &BindingDecl,
) -> Result<Option<Arc<ActorCell>>, ActorError> {
    if !owner.definition().has_input(&decl.input) {
        return Err(resolution_error(
            owner,
            decl,
            format!("no input handler '{}'", decl.input),
        ));
    }

    let source = match &decl.source {
        SourcePath::This => owner.clone(),
        SourcePath::Field(segments) => {
            let mut value = Value::Null;
            for (i, segment) in segments.iter().enumerate() {
                value = if i == 0 {
                    fields.get(segment).cloned().unwrap_or(Value::Null)
                } else {
                    value.get(segment)
                };
            }
            let actor = value.as_actor().ok_or_else(|| {
                resolution_error(
                    owner,
                    decl,
                    format!("'{}' is a {}, not an actor", decl.source, value.type_name()),
                )
            })?;
            cell_of(actor).map_err(|e| resolution_error(owner, decl, e.to_string()))?
        }
    };

    if !source.definition().has_output(&decl.output) {
        return Err(resolution_error(
            owner,
            decl,
            format!(
                "{} has no output '{}'",
                source.definition().name(),
                decl.output
            ),
        ));
    }
    if source.status().is_terminated() {
        return Ok(None);
    }
    Ok(Some(source))
}
