use std::collections::BTreeMap;

use reflex_core::{Precondition, Value};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::{EngineError, EngineResult};

/// Small-integer identifier assigned to each behavior template by the
/// authoring tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TemplateId(pub u16);

/// Closed enumeration of behavior kinds; dispatch is a plain match, there
/// is no open registration of new kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum BehaviorKind {
    /// Children execute one at a time, in declaration order; the first
    /// failure fails the behavior, success of the last child succeeds it.
    Sequential,
    /// All children are spawned together; succeeds once
    /// `success_threshold` children have succeeded, fails once the
    /// threshold becomes unreachable.
    Parallel { success_threshold: u32 },
    /// Persistent root-level sibling set: children are re-posted as they
    /// resolve and the behavior itself never terminates.
    Collection,
    /// Terminal node backed by a registered [`LeafAction`], stepped once
    /// per tick until it reports an outcome.
    ///
    /// [`LeafAction`]: crate::LeafAction
    Leaf,
    /// Terminal node backed by a registered effect that updates the frame
    /// and/or working memory; resolves Succeeded in the same tick.
    MemoryExecute,
}

/// Argument expression evaluated against the spawning instance's frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Var(&'static str),
    Lit(Value),
}

/// One child step of a composite behavior: posts a goal for `intent`,
/// passing the evaluated arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDesc {
    pub intent: &'static str,
    pub args: Vec<Arg>,
}

/// Immutable description of one behavior, the semantic content of a
/// compiled behavior table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorTemplate {
    pub id: TemplateId,
    pub name: &'static str,
    pub kind: BehaviorKind,
    /// Names the positional spawn arguments bind to; they seed the
    /// variable table before precondition matching.
    pub params: Vec<&'static str>,
    /// Variables copied from the matched table into the instance frame at
    /// spawn time. Locals a leaf writes at runtime (timers) are not
    /// declared here.
    pub captures: Vec<&'static str>,
    pub steps: Vec<StepDesc>,
    pub precondition: Option<Precondition>,
}

impl BehaviorTemplate {
    pub fn new(id: u16, name: &'static str, kind: BehaviorKind) -> Self {
        Self {
            id: TemplateId(id),
            name,
            kind,
            params: Vec::new(),
            captures: Vec::new(),
            steps: Vec::new(),
            precondition: None,
        }
    }

    pub fn with_param(mut self, name: &'static str) -> Self {
        self.params.push(name);
        self
    }

    pub fn with_capture(mut self, name: &'static str) -> Self {
        self.captures.push(name);
        self
    }

    pub fn with_step(mut self, intent: &'static str, args: Vec<Arg>) -> Self {
        self.steps.push(StepDesc { intent, args });
        self
    }

    pub fn with_precondition(mut self, pre: Precondition) -> Self {
        self.precondition = Some(pre);
        self
    }
}

/// Data-driven registry of behavior templates, populated at load time.
///
/// Behaviors claiming the same intent are alternatives: goal selection
/// tries them in registration order, which therefore encodes the
/// authoring tool's specificity ordering.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<TemplateId, BehaviorTemplate>,
    intents: BTreeMap<&'static str, Vec<TemplateId>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `template` as a candidate for `intent`.
    pub fn register(
        &mut self,
        intent: &'static str,
        template: BehaviorTemplate,
    ) -> EngineResult<TemplateId> {
        let id = template.id;
        if self.templates.contains_key(&id) {
            return Err(EngineError::MalformedTemplate {
                id: id.0,
                name: template.name,
                message: "duplicate template id".to_string(),
            });
        }
        self.templates.insert(id, template);
        self.intents.entry(intent).or_default().push(id);
        Ok(id)
    }

    pub fn get(&self, id: TemplateId) -> Option<&BehaviorTemplate> {
        self.templates.get(&id)
    }

    /// Candidate templates for an intent, in registration order.
    pub fn candidates(&self, intent: &str) -> Option<&[TemplateId]> {
        self.intents.get(intent).map(Vec::as_slice)
    }

    /// Load-time structural checks; run once per agent before the first
    /// tick so malformed tables never reach the scheduler.
    pub fn validate(&self) -> EngineResult<()> {
        for template in self.templates.values() {
            self.validate_template(template)?;
        }
        Ok(())
    }

    fn validate_template(&self, template: &BehaviorTemplate) -> EngineResult<()> {
        let malformed = |message: String| EngineError::MalformedTemplate {
            id: template.id.0,
            name: template.name,
            message,
        };

        match template.kind {
            BehaviorKind::Parallel { success_threshold } => {
                if success_threshold == 0 || success_threshold as usize > template.steps.len() {
                    return Err(malformed(format!(
                        "success threshold {success_threshold} is outside 1..={}",
                        template.steps.len()
                    )));
                }
            }
            BehaviorKind::Leaf | BehaviorKind::MemoryExecute => {
                if !template.steps.is_empty() {
                    return Err(malformed("terminal behaviors take no steps".to_string()));
                }
            }
            BehaviorKind::Sequential | BehaviorKind::Collection => {}
        }

        for step in &template.steps {
            if !self.intents.contains_key(step.intent) {
                return Err(EngineError::UnknownIntent {
                    intent: step.intent,
                });
            }
        }

        // Every capture must be bindable at spawn: either a parameter or a
        // variable some precondition clause assigns.
        for capture in &template.captures {
            let from_param = template.params.contains(capture);
            let from_match = template.precondition.as_ref().is_some_and(|pre| {
                pre.clauses
                    .iter()
                    .any(|clause| clause.bindings.iter().any(|b| b.var == *capture))
            });
            if !from_param && !from_match {
                return Err(malformed(format!(
                    "frame variable `{capture}` is neither a parameter nor bound by the precondition"
                )));
            }
        }

        Ok(())
    }
}
