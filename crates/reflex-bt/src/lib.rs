//! Goal-driven reactive behavior tree runtime built on `reflex-core`.
//!
//! Behaviors are described by immutable templates in a [`TemplateRegistry`]
//! and selected per intent by precondition matching against working
//! memory; an [`Agent`] schedules the resulting goal/instance hierarchy
//! one tick at a time.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod error;
pub mod leaf;
pub mod scheduler;
pub mod template;
pub mod tree;

pub use error::{EngineError, EngineResult};
pub use leaf::{LeafAction, LeafRegistry, LeafStatus};
pub use scheduler::{tick_agents, Agent};
pub use template::{Arg, BehaviorKind, BehaviorTemplate, StepDesc, TemplateId, TemplateRegistry};
pub use tree::{BehaviorTree, Goal, GoalId, GoalState, InstanceId, Node, Outcome};
