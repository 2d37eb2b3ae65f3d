#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A small, allocation-friendly trace event.
///
/// This is intentionally "dumb data" so it can be recorded during
/// simulation and rendered later by tooling. The scheduler emits one event
/// per goal/instance transition; `goal` and `node` carry the arena ids of
/// the goal and behavior instance involved (0 when not applicable).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub goal: u64,
    pub node: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            goal: 0,
            node: 0,
        }
    }

    pub fn with_goal(mut self, goal: u64) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_node(mut self, node: u64) -> Self {
        self.node = node;
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl VecTraceSink {
    /// Tags in emission order, for compact test assertions.
    pub fn tags(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.tag.as_ref()).collect()
    }
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Shared-handle sink, convenient when the caller wants to keep reading
/// the events while the agent owns the sink.
impl<T: TraceSink> TraceSink for std::rc::Rc<std::cell::RefCell<T>> {
    fn emit(&mut self, event: TraceEvent) {
        self.borrow_mut().emit(event);
    }
}

/// Serializable event capture for offline inspection.
#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}
