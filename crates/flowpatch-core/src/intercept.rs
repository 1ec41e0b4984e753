#![forbid(unsafe_code)]

//! Listener interception registry.
//!
//! The host application registers its own listeners on elements it creates
//! on the fly. A listener attached after the host's fires after it, so a
//! corrective handler that must run *first* cannot simply wait for the
//! element to appear. Instead the host adapter routes every registration
//! attempt on selected element kinds through [`InterceptionRegistry::intercept`]
//! *before* performing it natively, and realizes the returned
//! [`Interception`]:
//!
//! - [`Interception::Forward`]: register unchanged.
//! - [`Interception::Guarded`]: register a wrapper that calls the original
//!   listener only when the guard accepts the event.
//! - [`Interception::Preceded`]: register the corrective listener, then the
//!   original one, so the corrective fires first.
//!
//! One-shot rules are removed after their first match. When no rule remains
//! for an element kind, [`InterceptionRegistry::is_intercepting`] turns false
//! and the adapter restores the native entry point for that kind.
//!
//! The registry is generic over the listener representation `L` so the same
//! rules drive the in-memory host (`Rc` closures) and the browser adapter
//! (`js_sys::Function`).

use std::rc::Rc;

use crate::cancellation::CancellationToken;
use crate::element::{ElementKind, ElementProbe};
use crate::event::{DomEvent, EventType};

/// Predicate deciding whether a guarded listener sees an event.
pub type EventGuard = Rc<dyn Fn(&DomEvent) -> bool>;

/// Options accompanying a listener registration.
#[derive(Debug, Clone, Default)]
pub struct ListenerOptions {
    /// `preventDefault` is ignored inside passive listeners.
    pub passive: bool,
    /// Listener is revoked once this token is cancelled.
    pub signal: Option<CancellationToken>,
}

impl ListenerOptions {
    /// Non-passive options without a signal.
    #[must_use]
    pub fn active() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn passive() -> Self {
        Self {
            passive: true,
            signal: None,
        }
    }

    #[must_use]
    pub fn with_signal(signal: CancellationToken) -> Self {
        Self {
            passive: false,
            signal: Some(signal),
        }
    }
}

/// One `addEventListener` call.
#[derive(Clone)]
pub struct Registration<L> {
    pub event_type: EventType,
    pub listener: L,
    pub options: ListenerOptions,
}

impl<L> Registration<L> {
    #[must_use]
    pub fn new(event_type: EventType, listener: L) -> Self {
        Self {
            event_type,
            listener,
            options: ListenerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }
}

impl<L> core::fmt::Debug for Registration<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("event_type", &self.event_type)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Which event names a rule reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMatch {
    Any,
    Named(EventType),
}

/// Which targets (within the rule's element kind) a rule reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMatch {
    Any,
    Id(Box<str>),
    Class(Box<str>),
}

/// Whether a rule survives its first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    OneShot,
    Persistent,
}

/// How a matched registration is rewritten.
pub enum WrapStrategy<L> {
    /// Replace the listener with one that forwards only when the guard holds.
    Guard(EventGuard),
    /// Register `listener` for `event_type` ahead of the original call.
    Precede { event_type: EventType, listener: L },
}

impl<L> core::fmt::Debug for WrapStrategy<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Guard(_) => f.write_str("Guard"),
            Self::Precede { event_type, .. } => {
                f.debug_struct("Precede").field("event_type", event_type).finish_non_exhaustive()
            }
        }
    }
}

/// Match + action pair owned by the registry.
#[derive(Debug)]
pub struct InterceptionRule<L> {
    name: &'static str,
    kind: ElementKind,
    event: EventMatch,
    target: TargetMatch,
    marker: Option<Box<str>>,
    strategy: WrapStrategy<L>,
    persistence: Persistence,
}

impl<L> InterceptionRule<L> {
    /// Rule that guards matching listeners.
    #[must_use]
    pub fn guard(name: &'static str, kind: ElementKind, guard: EventGuard) -> Self {
        Self::with_strategy(name, kind, WrapStrategy::Guard(guard))
    }

    /// Rule that installs `listener` ahead of matching registrations.
    #[must_use]
    pub fn precede(
        name: &'static str,
        kind: ElementKind,
        event_type: EventType,
        listener: L,
    ) -> Self {
        Self::with_strategy(
            name,
            kind,
            WrapStrategy::Precede {
                event_type,
                listener,
            },
        )
    }

    fn with_strategy(name: &'static str, kind: ElementKind, strategy: WrapStrategy<L>) -> Self {
        Self {
            name,
            kind,
            event: EventMatch::Any,
            target: TargetMatch::Any,
            marker: None,
            strategy,
            persistence: Persistence::OneShot,
        }
    }

    /// Only react to registrations for `event_type`.
    #[must_use]
    pub fn on_event(mut self, event_type: EventType) -> Self {
        self.event = EventMatch::Named(event_type);
        self
    }

    /// Only react to the element with this id.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.target = TargetMatch::Id(id.into());
        self
    }

    /// Only react to elements carrying this class.
    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.target = TargetMatch::Class(class.into());
        self
    }

    /// Patch each element at most once, remembering it through a data marker.
    #[must_use]
    pub fn once_per_target(mut self, marker: &str) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Keep the rule after it matches.
    #[must_use]
    pub fn persistent(mut self) -> Self {
        self.persistence = Persistence::Persistent;
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    #[must_use]
    pub const fn persistence(&self) -> Persistence {
        self.persistence
    }

    fn matches(&self, target: &dyn ElementProbe, event_type: &EventType) -> bool {
        if let EventMatch::Named(wanted) = &self.event
            && wanted != event_type
        {
            return false;
        }
        let target_ok = match &self.target {
            TargetMatch::Any => true,
            TargetMatch::Id(id) => target.has_id(id),
            TargetMatch::Class(class) => target.has_class(class),
        };
        target_ok
            && self
                .marker
                .as_deref()
                .is_none_or(|marker| !target.has_marker(marker))
    }
}

/// Decision for one registration attempt.
pub enum Interception<L> {
    Forward(Registration<L>),
    Guarded {
        rule: &'static str,
        registration: Registration<L>,
        guard: EventGuard,
    },
    Preceded {
        rule: &'static str,
        corrective: Registration<L>,
        registration: Registration<L>,
    },
}

impl<L> core::fmt::Debug for Interception<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Forward(registration) => f.debug_tuple("Forward").field(registration).finish(),
            Self::Guarded {
                rule, registration, ..
            } => f
                .debug_struct("Guarded")
                .field("rule", rule)
                .field("registration", registration)
                .finish_non_exhaustive(),
            Self::Preceded {
                rule,
                corrective,
                registration,
            } => f
                .debug_struct("Preceded")
                .field("rule", rule)
                .field("corrective", corrective)
                .field("registration", registration)
                .finish(),
        }
    }
}

impl<L> Interception<L> {
    /// Name of the rule that rewrote the registration, if any.
    #[must_use]
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            Self::Forward(_) => None,
            Self::Guarded { rule, .. } | Self::Preceded { rule, .. } => Some(rule),
        }
    }
}

/// Identifier for explicit rule removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u64);

/// Process-wide set of interception rules.
pub struct InterceptionRegistry<L> {
    rules: Vec<(RuleId, InterceptionRule<L>)>,
    next_id: u64,
}

impl<L> Default for InterceptionRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> core::fmt::Debug for InterceptionRegistry<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|(_, rule)| rule.name))
            .finish()
    }
}

impl<L> InterceptionRegistry<L> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rules: Vec::new(),
            next_id: 1,
        }
    }
}

impl<L: Clone> InterceptionRegistry<L> {
    /// Register a rule. Rules are consulted in insertion order.
    pub fn add_rule(&mut self, rule: InterceptionRule<L>) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id += 1;
        tracing::debug!(rule = rule.name, kind = rule.kind.tag(), "interception rule added");
        self.rules.push((id, rule));
        id
    }

    /// Deregister a rule. Returns `false` if it was already gone.
    pub fn remove_rule(&mut self, id: RuleId) -> bool {
        let Some(pos) = self.rules.iter().position(|(rule_id, _)| *rule_id == id) else {
            return false;
        };
        let (_, rule) = self.rules.remove(pos);
        self.log_restore_if_idle(&rule);
        true
    }

    /// Whether registrations on `kind` currently need to be routed here.
    #[must_use]
    pub fn is_intercepting(&self, kind: &ElementKind) -> bool {
        self.rules.iter().any(|(_, rule)| &rule.kind == kind)
    }

    /// Names of the live rules, in consultation order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|(_, rule)| rule.name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Inspect one registration attempt and decide how to perform it.
    pub fn intercept(
        &mut self,
        target: &mut dyn ElementProbe,
        registration: Registration<L>,
    ) -> Interception<L> {
        let kind = target.kind();
        let Some(pos) = self.rules.iter().position(|(_, rule)| {
            rule.kind == kind && rule.matches(&*target, &registration.event_type)
        }) else {
            return Interception::Forward(registration);
        };

        let rule = &self.rules[pos].1;
        if let Some(marker) = rule.marker.as_deref() {
            target.set_marker(marker);
        }
        let name = rule.name;
        tracing::debug!(
            rule = name,
            event = %registration.event_type,
            strategy = ?rule.strategy,
            "registration intercepted"
        );

        let decision = match &rule.strategy {
            WrapStrategy::Guard(guard) => Interception::Guarded {
                rule: name,
                registration,
                guard: Rc::clone(guard),
            },
            WrapStrategy::Precede {
                event_type,
                listener,
            } => Interception::Preceded {
                rule: name,
                corrective: Registration::new(event_type.clone(), listener.clone()),
                registration,
            },
        };

        if rule.persistence == Persistence::OneShot {
            let (_, rule) = self.rules.remove(pos);
            tracing::debug!(rule = rule.name, "one-shot interception rule completed");
            self.log_restore_if_idle(&rule);
        }
        decision
    }

    fn log_restore_if_idle(&self, removed: &InterceptionRule<L>) {
        if !self.is_intercepting(&removed.kind) {
            tracing::debug!(
                kind = removed.kind.tag(),
                "no rules left; native registration entry point restored"
            );
        }
    }
}
