//! # Actor Definitions
//!
//! An [`ActorDefinition`] is the template an actor instance is spawned from:
//! constructor parameters, input handlers, output ports and binding
//! declarations. Definitions are built once, registered with the runtime and
//! never change afterwards.
//!
//! ## Usage Example
//!
//! ```rust
//! use ascript_api::actor::ActorDefinition;
//! use ascript_api::value::Value;
//!
//! let echo = ActorDefinition::builder("Echo")
//!     .input("ping", &["text"], |ctx, args| {
//!         let text = args[0].to_string();
//!         ctx.emit("pong", vec![Value::from(format!("Echo: {}", text))])?;
//!         Ok(Value::Null)
//!     })
//!     .output("pong", &["msg"])
//!     .build()
//!     .unwrap();
//! assert!(echo.has_input("ping"));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::context::ActorContext;
use crate::errors::ActorError;
use crate::message::CHILD_STOPPED;
use crate::supervisor::SupervisionConfig;
use crate::types::{ActorResult, BoxedHandler};
use crate::value::Value;

/// Evaluator callback executing a handler or constructor body.
///
/// The runtime never looks inside a body; it only calls it with the context of
/// the owning actor and the bound arguments.
pub trait Handler: Send + Sync {
    fn invoke(&self, ctx: &mut dyn ActorContext, args: Vec<Value>) -> ActorResult<Value>;
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ActorContext, Vec<Value>) -> ActorResult<Value> + Send + Sync,
{
    fn invoke(&self, ctx: &mut dyn ActorContext, args: Vec<Value>) -> ActorResult<Value> {
        self(ctx, args)
    }
}

/// Named entry point invoked for matching messages.
#[derive(Clone)]
pub struct InputHandler {
    pub name: String,
    pub params: Vec<String>,
    pub body: BoxedHandler,
}

impl fmt::Debug for InputHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputHandler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Named emission point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    pub name: String,
    pub params: Vec<String>,
}

/// Source expression of a binding, evaluated in the owning actor's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePath {
    /// The owning actor itself
    This,
    /// A field path: `this.a.b` or bare `a.b`
    Field(Vec<String>),
}

impl SourcePath {
    pub fn parse(expr: &str) -> Option<SourcePath> {
        let mut segments: Vec<&str> = expr.trim().split('.').collect();
        if segments.first() == Some(&"this") {
            segments.remove(0);
            if segments.is_empty() {
                return Some(SourcePath::This);
            }
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return None;
        }
        Some(SourcePath::Field(
            segments.into_iter().map(|s| s.trim().to_string()).collect(),
        ))
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePath::This => write!(f, "this"),
            SourcePath::Field(segments) => write!(f, "this.{}", segments.join(".")),
        }
    }
}

/// Binding declaration `input <- source.output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDecl {
    /// Input of the owning actor that receives the emissions
    pub input: String,
    pub source: SourcePath,
    pub output: String,
}

impl fmt::Display for BindingDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}.{}", self.input, self.source, self.output)
    }
}

/// Immutable actor template.
#[derive(Clone)]
pub struct ActorDefinition {
    name: Arc<str>,
    params: Vec<String>,
    inputs: HashMap<String, InputHandler>,
    outputs: HashMap<String, OutputPort>,
    bindings: Vec<BindingDecl>,
    constructor: Option<BoxedHandler>,
    routine: bool,
    supervision: SupervisionConfig,
}

impl ActorDefinition {
    pub fn builder(name: &str) -> ActorDefinitionBuilder {
        ActorDefinitionBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor parameters, which are also the initial fields.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn input(&self, name: &str) -> Option<&InputHandler> {
        self.inputs.get(name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.get(name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    pub fn bindings(&self) -> &[BindingDecl] {
        &self.bindings
    }

    pub fn constructor(&self) -> Option<&BoxedHandler> {
        self.constructor.as_ref()
    }

    /// Whether the actor stops with its constructor's value, like a block that
    /// runs to its end.
    pub fn is_routine(&self) -> bool {
        self.routine
    }

    /// Whether the definition declares the reserved `childStopped` input.
    pub fn handles_child_stopped(&self) -> bool {
        self.inputs.contains_key(CHILD_STOPPED)
    }

    pub fn supervision(&self) -> &SupervisionConfig {
        &self.supervision
    }
}

impl fmt::Debug for ActorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inputs: Vec<&String> = self.inputs.keys().collect();
        inputs.sort();
        let mut outputs: Vec<&String> = self.outputs.keys().collect();
        outputs.sort();
        f.debug_struct("ActorDefinition")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("inputs", &inputs)
            .field("outputs", &outputs)
            .field("bindings", &self.bindings)
            .field("routine", &self.routine)
            .finish()
    }
}

/// Builder for [`ActorDefinition`].
pub struct ActorDefinitionBuilder {
    name: String,
    params: Vec<String>,
    inputs: Vec<InputHandler>,
    outputs: Vec<OutputPort>,
    bindings: Vec<(String, String, String)>,
    constructor: Option<BoxedHandler>,
    routine: bool,
    supervision: SupervisionConfig,
}

fn to_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl ActorDefinitionBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            bindings: Vec::new(),
            constructor: None,
            routine: false,
            supervision: SupervisionConfig::default(),
        }
    }

    pub fn params(mut self, params: &[&str]) -> Self {
        self.params = to_names(params);
        self
    }

    pub fn input<F>(mut self, name: &str, params: &[&str], body: F) -> Self
    where
        F: Fn(&mut dyn ActorContext, Vec<Value>) -> ActorResult<Value> + Send + Sync + 'static,
    {
        self.inputs.push(InputHandler {
            name: name.to_string(),
            params: to_names(params),
            body: Arc::new(body),
        });
        self
    }

    pub fn output(mut self, name: &str, params: &[&str]) -> Self {
        self.outputs.push(OutputPort {
            name: name.to_string(),
            params: to_names(params),
        });
        self
    }

    /// Declares `input <- source.output`.
    pub fn bind(mut self, input: &str, source: &str, output: &str) -> Self {
        self.bindings
            .push((input.to_string(), source.to_string(), output.to_string()));
        self
    }

    /// Constructor body, run once with the constructor arguments after the
    /// fields are allocated.
    pub fn on_start<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut dyn ActorContext, Vec<Value>) -> ActorResult<Value> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(body));
        self
    }

    pub fn routine(mut self) -> Self {
        self.routine = true;
        self
    }

    pub fn supervision(mut self, config: SupervisionConfig) -> Self {
        self.supervision = config;
        self
    }

    /// Validates the declarations and builds the definition.
    ///
    /// # Errors
    /// * `DuplicateDefinitionError` for repeated parameter, input or output names
    /// * `BindingResolutionError` for a malformed source expression
    pub fn build(self) -> ActorResult<ActorDefinition> {
        if self.name.trim().is_empty() {
            return Err(ActorError::TypeError("Actor definition needs a name".to_string()));
        }
        let duplicate = |what: &str, item: &str| {
            ActorError::DuplicateDefinitionError(format!("{}.{} ({})", self.name, item, what))
        };

        let mut seen = HashSet::new();
        for param in &self.params {
            if !seen.insert(param.as_str()) {
                return Err(duplicate("parameter", param));
            }
        }

        let mut ports = HashSet::new();
        let mut inputs = HashMap::new();
        for handler in self.inputs.iter() {
            if !ports.insert(handler.name.as_str()) {
                return Err(duplicate("input", &handler.name));
            }
            inputs.insert(handler.name.clone(), handler.clone());
        }
        let mut outputs = HashMap::new();
        for port in self.outputs.iter() {
            if !ports.insert(port.name.as_str()) {
                return Err(duplicate("output", &port.name));
            }
            outputs.insert(port.name.clone(), port.clone());
        }

        let mut bindings = Vec::with_capacity(self.bindings.len());
        for (input, source, output) in &self.bindings {
            let path = SourcePath::parse(source).ok_or_else(|| ActorError::BindingResolutionError {
                actor: self.name.clone(),
                path: format!("{} <- {}.{}", input, source, output),
                reason: format!("malformed source expression '{}'", source),
            })?;
            bindings.push(BindingDecl {
                input: input.clone(),
                source: path,
                output: output.clone(),
            });
        }

        debug!(
            definition = %self.name,
            inputs = inputs.len(),
            outputs = outputs.len(),
            bindings = bindings.len(),
            "Actor definition built"
        );
        Ok(ActorDefinition {
            name: Arc::from(self.name.as_str()),
            params: self.params,
            inputs,
            outputs,
            bindings,
            constructor: self.constructor,
            routine: self.routine,
            supervision: self.supervision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_path_parsing() {
        assert_eq!(SourcePath::parse("this"), Some(SourcePath::This));
        assert_eq!(
            SourcePath::parse("this.echoActor"),
            Some(SourcePath::Field(vec!["echoActor".to_string()]))
        );
        assert_eq!(
            SourcePath::parse("a.b"),
            Some(SourcePath::Field(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(SourcePath::parse("this..a"), None);
        assert_eq!(SourcePath::parse(""), None);
    }

    #[test]
    fn test_binding_display() {
        let decl = BindingDecl {
            input: "result".to_string(),
            source: SourcePath::Field(vec!["echoActor".to_string()]),
            output: "pong".to_string(),
        };
        assert_eq!(decl.to_string(), "result <- this.echoActor.pong");
    }
}
