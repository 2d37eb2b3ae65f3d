use reflex_core::{Value, VarFrame, WorldMut};

use crate::leaf::LeafAction;
use crate::template::TemplateId;

/// Generational handle to a goal in the agent's arena.
///
/// Handles carry the slot's generation, so a handle kept across a
/// release of its slot never aliases the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoalId {
    index: u32,
    gen: u32,
}

impl GoalId {
    /// Packed form for trace events and logs.
    pub fn raw(self) -> u64 {
        (self.gen as u64) << 32 | self.index as u64
    }
}

/// Generational handle to a behavior instance in the agent's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId {
    index: u32,
    gen: u32,
}

impl InstanceId {
    /// Packed form for trace events and logs.
    pub fn raw(self) -> u64 {
        (self.gen as u64) << 32 | self.index as u64
    }
}

/// Outcome state of one behavior instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Executing,
    Succeeded,
    Failed,
    Aborted,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Outcome::Succeeded | Outcome::Failed | Outcome::Aborted)
    }
}

/// Resolution state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalState {
    Active,
    Succeeded,
    Failed,
    Aborted,
}

impl GoalState {
    pub fn is_resolved(self) -> bool {
        !matches!(self, GoalState::Active)
    }
}

/// The commitment context for one posted intent: owns the candidate
/// ordering, tracks which behavior instance is currently committed, and
/// absorbs that instance's failure by re-selecting an alternative.
#[derive(Debug)]
pub struct Goal {
    pub intent: &'static str,
    pub args: Vec<Value>,
    /// Spawning instance, if any; a non-owning back-link into the arena.
    pub parent: Option<InstanceId>,
    pub state: GoalState,
    /// The instance currently (or, once the goal resolves, last) selected
    /// for this goal.
    pub committed: Option<InstanceId>,
    pub(crate) candidates: Vec<TemplateId>,
    pub(crate) next_candidate: usize,
    /// Every instance spawned while working this goal, including failed
    /// candidates; released together with the goal.
    pub(crate) attempts: Vec<InstanceId>,
}

/// A live behavior instance.
pub struct Node<W>
where
    W: WorldMut + 'static,
{
    pub template: TemplateId,
    pub outcome: Outcome,
    pub frame: VarFrame,
    /// Owning goal; non-owning back-link into the arena.
    pub goal: GoalId,
    /// Child goals posted by this instance's steps.
    pub children: Vec<GoalId>,
    /// Human-readable `intent/template` tag for diagnostics.
    pub signature: String,
    pub(crate) cursor: usize,
    pub(crate) spawned: bool,
    pub(crate) action: Option<Box<dyn LeafAction<W>>>,
}

struct GoalSlot {
    gen: u32,
    goal: Option<Goal>,
}

struct NodeSlot<W>
where
    W: WorldMut + 'static,
{
    gen: u32,
    node: Option<Node<W>>,
}

/// Arena owning every goal and behavior instance of one agent.
///
/// Linkage is expressed as generational indices, so there is no cyclic
/// ownership. Released slots go onto free lists and are reused with a
/// bumped generation; dereferencing a stale handle panics, the same
/// contract as an out-of-bounds index.
pub struct BehaviorTree<W>
where
    W: WorldMut + 'static,
{
    goals: Vec<GoalSlot>,
    nodes: Vec<NodeSlot<W>>,
    free_goals: Vec<u32>,
    free_nodes: Vec<u32>,
}

impl<W> BehaviorTree<W>
where
    W: WorldMut + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            goals: Vec::new(),
            nodes: Vec::new(),
            free_goals: Vec::new(),
            free_nodes: Vec::new(),
        }
    }

    pub(crate) fn post_goal(
        &mut self,
        intent: &'static str,
        args: Vec<Value>,
        parent: Option<InstanceId>,
        candidates: Vec<TemplateId>,
    ) -> GoalId {
        let goal = Goal {
            intent,
            args,
            parent,
            state: GoalState::Active,
            committed: None,
            candidates,
            next_candidate: 0,
            attempts: Vec::new(),
        };
        match self.free_goals.pop() {
            Some(index) => {
                let slot = &mut self.goals[index as usize];
                slot.gen += 1;
                slot.goal = Some(goal);
                GoalId {
                    index,
                    gen: slot.gen,
                }
            }
            None => {
                let index = self.goals.len() as u32;
                self.goals.push(GoalSlot {
                    gen: 0,
                    goal: Some(goal),
                });
                GoalId { index, gen: 0 }
            }
        }
    }

    pub(crate) fn push_node(&mut self, node: Node<W>) -> InstanceId {
        match self.free_nodes.pop() {
            Some(index) => {
                let slot = &mut self.nodes[index as usize];
                slot.gen += 1;
                slot.node = Some(node);
                InstanceId {
                    index,
                    gen: slot.gen,
                }
            }
            None => {
                let index = self.nodes.len() as u32;
                self.nodes.push(NodeSlot {
                    gen: 0,
                    node: Some(node),
                });
                InstanceId { index, gen: 0 }
            }
        }
    }

    /// Release a resolved goal and its whole subtree (attempted
    /// instances, their child goals, recursively) back to the free
    /// lists. The caller guarantees it holds no live handle into the
    /// subtree.
    pub(crate) fn release_goal(&mut self, id: GoalId) {
        let slot = &mut self.goals[id.index as usize];
        if slot.gen != id.gen {
            return;
        }
        let Some(goal) = slot.goal.take() else {
            return;
        };
        self.free_goals.push(id.index);
        for nid in goal.attempts {
            self.release_node(nid);
        }
    }

    fn release_node(&mut self, id: InstanceId) {
        let slot = &mut self.nodes[id.index as usize];
        if slot.gen != id.gen {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        self.free_nodes.push(id.index);
        for child in node.children {
            self.release_goal(child);
        }
    }

    pub fn goal(&self, id: GoalId) -> &Goal {
        let slot = &self.goals[id.index as usize];
        match &slot.goal {
            Some(goal) if slot.gen == id.gen => goal,
            _ => panic!("stale goal handle {id:?}"),
        }
    }

    pub(crate) fn goal_mut(&mut self, id: GoalId) -> &mut Goal {
        let slot = &mut self.goals[id.index as usize];
        match &mut slot.goal {
            Some(goal) if slot.gen == id.gen => goal,
            _ => panic!("stale goal handle {id:?}"),
        }
    }

    pub fn node(&self, id: InstanceId) -> &Node<W> {
        let slot = &self.nodes[id.index as usize];
        match &slot.node {
            Some(node) if slot.gen == id.gen => node,
            _ => panic!("stale instance handle {id:?}"),
        }
    }

    pub(crate) fn node_mut(&mut self, id: InstanceId) -> &mut Node<W> {
        let slot = &mut self.nodes[id.index as usize];
        match &mut slot.node {
            Some(node) if slot.gen == id.gen => node,
            _ => panic!("stale instance handle {id:?}"),
        }
    }

    /// Number of live goals.
    pub fn goal_count(&self) -> usize {
        self.goals.len() - self.free_goals.len()
    }

    /// Number of live behavior instances.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }
}
