//! Supervision policy.
//!
//! Supervision is opt-in: a parent reacts to a child's termination through its
//! `childStopped` input. These policies decide what happens when no such input
//! is declared, and what happens to children when their parent terminates.

/// What a parent without a `childStopped` input does when a child terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnhandledChildStop {
    /// Drop the notification; the child's status is still inspectable
    Ignore,
    /// Normal stops are ignored; a failed child fails the parent with the same error
    #[default]
    Escalate,
}

/// What happens to still-running children when their parent terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildTermination {
    /// Children keep running until they terminate on their own
    #[default]
    Detach,
    /// Children are stopped with a `Null` result
    StopChildren,
}

/// Effective supervision settings of one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisionPolicy {
    pub unhandled_child_stop: UnhandledChildStop,
    /// Applied by a terminating actor to its running children
    pub child_termination: ChildTermination,
}

/// Per-definition overrides, merged over the runtime-wide [`SupervisionPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisionConfig {
    pub unhandled_child_stop: Option<UnhandledChildStop>,
    pub child_termination: Option<ChildTermination>,
}

impl SupervisionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unhandled_child_stop(mut self, policy: UnhandledChildStop) -> Self {
        self.unhandled_child_stop = Some(policy);
        self
    }

    pub fn with_child_termination(mut self, policy: ChildTermination) -> Self {
        self.child_termination = Some(policy);
        self
    }

    /// Applies the overrides on top of `defaults`.
    pub fn merge(&self, defaults: &SupervisionPolicy) -> SupervisionPolicy {
        SupervisionPolicy {
            unhandled_child_stop: self
                .unhandled_child_stop
                .unwrap_or(defaults.unhandled_child_stop),
            child_termination: self
                .child_termination
                .unwrap_or(defaults.child_termination),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_defaults_for_unset_fields() {
        let defaults = SupervisionPolicy {
            unhandled_child_stop: UnhandledChildStop::Ignore,
            child_termination: ChildTermination::Detach,
        };
        let merged = SupervisionConfig::new()
            .with_child_termination(ChildTermination::StopChildren)
            .merge(&defaults);
        assert_eq!(merged.unhandled_child_stop, UnhandledChildStop::Ignore);
        assert_eq!(merged.child_termination, ChildTermination::StopChildren);
    }
}
