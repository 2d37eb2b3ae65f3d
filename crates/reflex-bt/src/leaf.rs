use std::collections::BTreeMap;

use reflex_core::{TickContext, VarFrame, WorkingMemory, WorldMut};

use crate::template::TemplateId;

/// What a leaf action reports after one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafStatus {
    Running,
    Success,
    Failure,
}

/// External action invoked once per tick while its instance is executing.
///
/// The action object is constructed at spawn time and owned by the
/// instance, so it can carry state across ticks (counters, cooldowns).
/// Frame and working memory are handed in mutably: a leaf step is the one
/// place mid-tick mutation of working memory is allowed.
pub trait LeafAction<W>: 'static
where
    W: WorldMut + 'static,
{
    fn tick(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        memory: &mut WorkingMemory,
        frame: &mut VarFrame,
    ) -> LeafStatus;

    /// Called when the owning instance is aborted while the action is
    /// still running.
    fn cancel(
        &mut self,
        _ctx: &TickContext,
        _agent: W::Agent,
        _world: &mut W,
        _memory: &mut WorkingMemory,
        _frame: &mut VarFrame,
    ) {
    }
}

type LeafCtor<W> = Box<dyn Fn(&VarFrame) -> Box<dyn LeafAction<W>>>;

type MemoryEffect<W> = Box<
    dyn Fn(
        &TickContext,
        <W as reflex_core::WorldView>::Agent,
        &mut W,
        &mut WorkingMemory,
        &mut VarFrame,
    ),
>;

/// Per-template constructors for the terminal behavior kinds.
///
/// `Leaf` templates get an action constructor (invoked at spawn with the
/// instance frame); `MemoryExecute` templates get an effect run once, which
/// resolves the instance Succeeded in the same tick.
pub struct LeafRegistry<W>
where
    W: WorldMut + 'static,
{
    actions: BTreeMap<TemplateId, LeafCtor<W>>,
    effects: BTreeMap<TemplateId, MemoryEffect<W>>,
}

impl<W> LeafRegistry<W>
where
    W: WorldMut + 'static,
{
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
            effects: BTreeMap::new(),
        }
    }

    pub fn register_action<F>(&mut self, id: TemplateId, make: F)
    where
        F: Fn(&VarFrame) -> Box<dyn LeafAction<W>> + 'static,
    {
        self.actions.insert(id, Box::new(make));
    }

    pub fn register_effect<F>(&mut self, id: TemplateId, effect: F)
    where
        F: Fn(&TickContext, W::Agent, &mut W, &mut WorkingMemory, &mut VarFrame) + 'static,
    {
        self.effects.insert(id, Box::new(effect));
    }

    pub(crate) fn make_action(
        &self,
        id: TemplateId,
        frame: &VarFrame,
    ) -> Option<Box<dyn LeafAction<W>>> {
        self.actions.get(&id).map(|make| make(frame))
    }

    pub(crate) fn effect(&self, id: TemplateId) -> Option<&MemoryEffect<W>> {
        self.effects.get(&id)
    }
}

impl<W> Default for LeafRegistry<W>
where
    W: WorldMut + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
