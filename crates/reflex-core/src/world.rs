use core::fmt::Debug;

/// Stable identifier for a behaving entity.
///
/// Deterministic scheduling requires stable ordering (`Ord`) and a stable
/// numeric id for diagnostics and trace events.
pub trait AgentId: Copy + Ord + Eq + Debug {
    fn stable_id(self) -> u64;
}

impl AgentId for u64 {
    fn stable_id(self) -> u64 {
        self
    }
}

impl AgentId for u32 {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

/// Read-only world access.
///
/// The core crate does not prescribe which queries a world must expose;
/// sensors and leaf actions define extension traits for what they need.
pub trait WorldView {
    type Agent: AgentId;
}

/// Write access / effect sink for leaf actions.
pub trait WorldMut: WorldView {}
