//! Deterministic, engine-agnostic primitives for reactive agent behavior.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod fact;
pub mod frame;
pub mod pattern;
pub mod tick;
pub mod value;
pub mod world;

pub use fact::{Fact, FactHandle, WorkingMemory};
pub use frame::VarFrame;
pub use pattern::{match_first, Clause, FieldBinding, Precondition};
pub use tick::TickContext;
pub use value::Value;
pub use world::{AgentId, WorldMut, WorldView};
