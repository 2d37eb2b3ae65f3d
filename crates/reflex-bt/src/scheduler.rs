use std::sync::Arc;

use tracing::{debug, trace};

use reflex_core::{
    match_first, AgentId, TickContext, VarFrame, WorkingMemory, WorldMut,
};
use reflex_tools::{TraceEvent, TraceSink};

use crate::error::{EngineError, EngineResult};
use crate::leaf::{LeafRegistry, LeafStatus};
use crate::template::{Arg, BehaviorKind, BehaviorTemplate, StepDesc};
use crate::tree::{BehaviorTree, GoalId, GoalState, InstanceId, Node, Outcome};
use crate::TemplateRegistry;

/// One behaving entity: working memory, the goal/instance arena, and the
/// registries driving behavior selection.
///
/// `tick` runs one sense-think-act pass, depth-first from the root goal:
/// pending candidates are matched against working memory, executing
/// instances advance exactly one unit of work, and terminal outcomes
/// propagate to parents within the same tick. The only possible `Err` is
/// a configuration error; match and action failures are absorbed into
/// the outcome model.
pub struct Agent<W>
where
    W: WorldMut + 'static,
{
    pub id: W::Agent,
    pub memory: WorkingMemory,
    pub trace: Option<Box<dyn TraceSink>>,
    registry: Arc<TemplateRegistry>,
    leaves: LeafRegistry<W>,
    tree: BehaviorTree<W>,
    root: GoalId,
}

impl<W> Agent<W>
where
    W: WorldMut + 'static,
{
    pub fn new(
        id: W::Agent,
        registry: impl Into<Arc<TemplateRegistry>>,
        leaves: LeafRegistry<W>,
        root_intent: &'static str,
    ) -> EngineResult<Self> {
        let registry = registry.into();
        registry.validate()?;
        let candidates = registry
            .candidates(root_intent)
            .ok_or(EngineError::UnknownIntent { intent: root_intent })?
            .to_vec();

        let mut tree = BehaviorTree::new();
        let root = tree.post_goal(root_intent, Vec::new(), None, candidates);

        Ok(Self {
            id,
            memory: WorkingMemory::new(),
            trace: None,
            registry,
            leaves,
            tree,
            root,
        })
    }

    pub fn root(&self) -> GoalId {
        self.root
    }

    pub fn root_state(&self) -> GoalState {
        self.tree.goal(self.root).state
    }

    pub fn tree(&self) -> &BehaviorTree<W> {
        &self.tree
    }

    /// Run one scheduling pass over the whole goal hierarchy.
    pub fn tick(&mut self, ctx: &TickContext, world: &mut W) -> EngineResult<()> {
        trace!(tick = ctx.tick, agent = self.id.stable_id(), "agent tick");
        self.step_goal(self.root, ctx, world)
    }

    /// Synchronously abort a goal and every live descendant. Also used
    /// internally when a Parallel instance resolves with children still
    /// executing.
    pub fn abort_goal(&mut self, gid: GoalId, ctx: &TickContext, world: &mut W) {
        if self.tree.goal(gid).state.is_resolved() {
            return;
        }
        self.tree.goal_mut(gid).state = GoalState::Aborted;
        if let Some(nid) = self.tree.goal(gid).committed {
            self.abort_node(nid, ctx, world);
        }
        self.emit(ctx, "goal.aborted", gid.raw(), 0);
    }

    fn step_goal(&mut self, gid: GoalId, ctx: &TickContext, world: &mut W) -> EngineResult<()> {
        if self.tree.goal(gid).state.is_resolved() {
            return Ok(());
        }

        loop {
            let committed = self.tree.goal(gid).committed;
            let nid = match committed {
                Some(nid) if !self.tree.node(nid).outcome.is_terminal() => nid,
                _ => match self.select(gid, ctx)? {
                    Some(nid) => nid,
                    None => {
                        self.tree.goal_mut(gid).state = GoalState::Failed;
                        debug!(
                            goal = gid.raw(),
                            intent = self.tree.goal(gid).intent,
                            "goal failed: no applicable behavior"
                        );
                        self.emit(ctx, "goal.failed", gid.raw(), 0);
                        return Ok(());
                    }
                },
            };

            self.step_node(nid, ctx, world)?;

            match self.tree.node(nid).outcome {
                Outcome::Succeeded => {
                    self.tree.goal_mut(gid).state = GoalState::Succeeded;
                    self.emit(ctx, "goal.succeeded", gid.raw(), nid.raw());
                    return Ok(());
                }
                Outcome::Failed | Outcome::Aborted => {
                    // Fall back to the next alternative for the same intent
                    // within this tick. The commitment is kept until a new
                    // candidate actually commits, so a goal that resolves
                    // Failed still points at the instance that failed it.
                    self.emit(ctx, "goal.reselect", gid.raw(), nid.raw());
                }
                Outcome::Pending | Outcome::Executing => return Ok(()),
            }
        }
    }

    /// Try remaining candidate templates in registration order until one
    /// commits. Candidates whose precondition has no satisfying binding
    /// are consumed and left Failed; that is a normal outcome, not an
    /// error.
    fn select(&mut self, gid: GoalId, ctx: &TickContext) -> EngineResult<Option<InstanceId>> {
        let registry = Arc::clone(&self.registry);

        loop {
            let goal = self.tree.goal_mut(gid);
            let Some(template_id) = goal.candidates.get(goal.next_candidate).copied() else {
                return Ok(None);
            };
            goal.next_candidate += 1;
            let intent = goal.intent;

            let template =
                registry
                    .get(template_id)
                    .ok_or_else(|| EngineError::UnknownTemplate {
                        id: template_id.0,
                        signature: intent.to_string(),
                    })?;

            // Spawn arguments seed the variable table positionally.
            let args = self.tree.goal(gid).args.clone();
            if args.len() != template.params.len() {
                return Err(EngineError::ArityMismatch {
                    intent,
                    name: template.name,
                    expected: template.params.len(),
                    given: args.len(),
                });
            }
            let mut seed = VarFrame::new();
            for (name, value) in template.params.iter().copied().zip(args) {
                seed.set(name, value);
            }

            let nid = self.tree.push_node(Node {
                template: template_id,
                outcome: Outcome::Pending,
                frame: VarFrame::new(),
                goal: gid,
                children: Vec::new(),
                signature: format!("{intent}/{}", template.name),
                cursor: 0,
                spawned: false,
                action: None,
            });
            self.tree.goal_mut(gid).attempts.push(nid);

            let table = match &template.precondition {
                Some(pre) => match match_first(pre, &self.memory, &seed) {
                    Some(table) => table,
                    None => {
                        self.tree.node_mut(nid).outcome = Outcome::Failed;
                        self.emit(ctx, "node.no_match", gid.raw(), nid.raw());
                        continue;
                    }
                },
                None => seed,
            };

            // Capture the declared frame layout out of the matched table.
            let mut frame = VarFrame::new();
            for name in &template.captures {
                let value = table
                    .get(name)
                    .ok_or_else(|| EngineError::MalformedTemplate {
                        id: template_id.0,
                        name: template.name,
                        message: format!("frame variable `{name}` is not bound at spawn"),
                    })?
                    .clone();
                frame.set(name, value);
            }

            // Leaf actions are constructed at spawn so they can carry
            // per-instance state across ticks.
            let action = match template.kind {
                BehaviorKind::Leaf => Some(self.leaves.make_action(template_id, &frame).ok_or(
                    EngineError::NoLeafRegistered {
                        id: template_id.0,
                        signature: format!("{intent}/{}", template.name),
                    },
                )?),
                _ => None,
            };

            {
                let node = self.tree.node_mut(nid);
                node.frame = frame;
                node.action = action;
                node.outcome = Outcome::Executing;
            }
            self.tree.goal_mut(gid).committed = Some(nid);
            debug!(
                goal = gid.raw(),
                node = nid.raw(),
                signature = %self.tree.node(nid).signature,
                "goal committed"
            );
            self.emit(ctx, "goal.commit", gid.raw(), nid.raw());
            return Ok(Some(nid));
        }
    }

    /// Advance one instance by exactly one unit of work for this tick.
    fn step_node(&mut self, nid: InstanceId, ctx: &TickContext, world: &mut W) -> EngineResult<()> {
        if self.tree.node(nid).outcome.is_terminal() {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let template_id = self.tree.node(nid).template;
        let template = registry
            .get(template_id)
            .ok_or_else(|| EngineError::UnknownTemplate {
                id: template_id.0,
                signature: self.tree.node(nid).signature.clone(),
            })?;

        match template.kind {
            BehaviorKind::Sequential => self.step_sequential(nid, template, ctx, world),
            BehaviorKind::Parallel { success_threshold } => {
                self.step_parallel(nid, template, success_threshold as usize, ctx, world)
            }
            BehaviorKind::Collection => self.step_collection(nid, template, ctx, world),
            BehaviorKind::Leaf => self.step_leaf(nid, ctx, world),
            BehaviorKind::MemoryExecute => self.step_memory_execute(nid, template, ctx, world),
        }
    }

    fn step_sequential(
        &mut self,
        nid: InstanceId,
        template: &BehaviorTemplate,
        ctx: &TickContext,
        world: &mut W,
    ) -> EngineResult<()> {
        let cursor = self.tree.node(nid).cursor;
        if cursor >= template.steps.len() {
            // Zero-step behavior.
            self.finish_node(nid, Outcome::Succeeded, ctx);
            return Ok(());
        }

        // Children are posted lazily, in declaration order.
        if self.tree.node(nid).children.len() == cursor {
            let gid = self.post_step_goal(nid, &template.steps[cursor])?;
            self.tree.node_mut(nid).children.push(gid);
        }

        let child = self.tree.node(nid).children[cursor];
        self.step_goal(child, ctx, world)?;

        match self.tree.goal(child).state {
            GoalState::Succeeded => {
                self.tree.node_mut(nid).cursor += 1;
                if self.tree.node(nid).cursor >= template.steps.len() {
                    self.finish_node(nid, Outcome::Succeeded, ctx);
                }
            }
            GoalState::Failed | GoalState::Aborted => {
                // Short-circuit: later steps never run.
                self.finish_node(nid, Outcome::Failed, ctx);
            }
            GoalState::Active => {}
        }
        Ok(())
    }

    fn step_parallel(
        &mut self,
        nid: InstanceId,
        template: &BehaviorTemplate,
        threshold: usize,
        ctx: &TickContext,
        world: &mut W,
    ) -> EngineResult<()> {
        if !self.tree.node(nid).spawned {
            for step in &template.steps {
                let gid = self.post_step_goal(nid, step)?;
                self.tree.node_mut(nid).children.push(gid);
            }
            self.tree.node_mut(nid).spawned = true;
        }

        let children = self.tree.node(nid).children.clone();
        for &child in &children {
            if !self.tree.goal(child).state.is_resolved() {
                self.step_goal(child, ctx, world)?;
            }
        }

        // Aggregate only after every child has been stepped this tick.
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for &child in &children {
            match self.tree.goal(child).state {
                GoalState::Succeeded => succeeded += 1,
                GoalState::Failed => failed += 1,
                GoalState::Active | GoalState::Aborted => {}
            }
        }

        if succeeded >= threshold {
            self.finish_node(nid, Outcome::Succeeded, ctx);
            self.abort_children(nid, ctx, world);
        } else if failed > children.len().saturating_sub(threshold) {
            // The threshold is unreachable.
            self.finish_node(nid, Outcome::Failed, ctx);
            self.abort_children(nid, ctx, world);
        }
        Ok(())
    }

    fn step_collection(
        &mut self,
        nid: InstanceId,
        template: &BehaviorTemplate,
        ctx: &TickContext,
        world: &mut W,
    ) -> EngineResult<()> {
        if !self.tree.node(nid).spawned {
            for step in &template.steps {
                let gid = self.post_step_goal(nid, step)?;
                self.tree.node_mut(nid).children.push(gid);
            }
            self.tree.node_mut(nid).spawned = true;
        }

        // Standing sibling set: members resolved on an earlier tick are
        // re-posted fresh and reconsidered; the collection itself never
        // resolves. The resolved member's subtree is released so the
        // arena stays bounded however long the agent lives.
        for (i, step) in template.steps.iter().enumerate() {
            let mut child = self.tree.node(nid).children[i];
            if self.tree.goal(child).state.is_resolved() {
                let fresh = self.post_step_goal(nid, step)?;
                self.tree.node_mut(nid).children[i] = fresh;
                self.tree.release_goal(child);
                self.emit(ctx, "goal.respawn", fresh.raw(), nid.raw());
                child = fresh;
            }
            self.step_goal(child, ctx, world)?;
        }
        Ok(())
    }

    fn step_leaf(&mut self, nid: InstanceId, ctx: &TickContext, world: &mut W) -> EngineResult<()> {
        let agent = self.id;
        let status = {
            let node = self.tree.node_mut(nid);
            let Some(action) = node.action.as_mut() else {
                return Err(EngineError::NoLeafRegistered {
                    id: node.template.0,
                    signature: node.signature.clone(),
                });
            };
            action.tick(ctx, agent, world, &mut self.memory, &mut node.frame)
        };

        match status {
            LeafStatus::Running => {
                trace!(node = nid.raw(), "leaf still running");
            }
            LeafStatus::Success => self.finish_node(nid, Outcome::Succeeded, ctx),
            LeafStatus::Failure => self.finish_node(nid, Outcome::Failed, ctx),
        }
        Ok(())
    }

    fn step_memory_execute(
        &mut self,
        nid: InstanceId,
        template: &BehaviorTemplate,
        ctx: &TickContext,
        world: &mut W,
    ) -> EngineResult<()> {
        let agent = self.id;
        {
            let Some(effect) = self.leaves.effect(template.id) else {
                return Err(EngineError::NoLeafRegistered {
                    id: template.id.0,
                    signature: self.tree.node(nid).signature.clone(),
                });
            };
            let node = self.tree.node_mut(nid);
            effect(ctx, agent, world, &mut self.memory, &mut node.frame);
        }
        self.finish_node(nid, Outcome::Succeeded, ctx);
        Ok(())
    }

    fn post_step_goal(&mut self, parent: InstanceId, step: &StepDesc) -> EngineResult<GoalId> {
        let mut args = Vec::with_capacity(step.args.len());
        for arg in &step.args {
            match arg {
                Arg::Lit(value) => args.push(value.clone()),
                Arg::Var(name) => {
                    let node = self.tree.node(parent);
                    let value =
                        node.frame
                            .get(name)
                            .ok_or_else(|| EngineError::UnboundStepArg {
                                var: name,
                                signature: node.signature.clone(),
                            })?;
                    args.push(value.clone());
                }
            }
        }

        let intent = step.intent;
        let candidates = self
            .registry
            .candidates(intent)
            .ok_or(EngineError::UnknownIntent { intent })?
            .to_vec();
        Ok(self.tree.post_goal(intent, args, Some(parent), candidates))
    }

    fn abort_children(&mut self, nid: InstanceId, ctx: &TickContext, world: &mut W) {
        let children = self.tree.node(nid).children.clone();
        for child in children {
            self.abort_goal(child, ctx, world);
        }
    }

    fn abort_node(&mut self, nid: InstanceId, ctx: &TickContext, world: &mut W) {
        if self.tree.node(nid).outcome.is_terminal() {
            return;
        }

        // Give a live leaf action its cancel hook before marking the node.
        let agent = self.id;
        {
            let node = self.tree.node_mut(nid);
            if let Some(action) = node.action.as_mut() {
                action.cancel(ctx, agent, world, &mut self.memory, &mut node.frame);
            }
        }

        self.tree.node_mut(nid).outcome = Outcome::Aborted;
        let goal = self.tree.node(nid).goal;
        self.emit(ctx, "node.aborted", goal.raw(), nid.raw());
        self.abort_children(nid, ctx, world);
    }

    fn finish_node(&mut self, nid: InstanceId, outcome: Outcome, ctx: &TickContext) {
        let tag = match outcome {
            Outcome::Succeeded => "node.succeeded",
            Outcome::Failed => "node.failed",
            Outcome::Aborted => "node.aborted",
            Outcome::Pending | Outcome::Executing => return,
        };

        let goal = {
            let node = self.tree.node_mut(nid);
            node.outcome = outcome;
            debug!(node = nid.raw(), signature = %node.signature, ?outcome, "behavior resolved");
            node.goal
        };
        self.emit(ctx, tag, goal.raw(), nid.raw());
    }

    fn emit(&mut self, ctx: &TickContext, tag: &'static str, goal: u64, node: u64) {
        if let Some(sink) = self.trace.as_mut() {
            sink.emit(TraceEvent::new(ctx.tick, tag).with_goal(goal).with_node(node));
        }
    }
}

/// Deterministically tick a set of agents against a shared world.
pub fn tick_agents<W>(ctx: &TickContext, world: &mut W, agents: &mut [Agent<W>]) -> EngineResult<()>
where
    W: WorldMut + 'static,
{
    agents.sort_by_key(|a| a.id.stable_id());
    for agent in agents.iter_mut() {
        agent.tick(ctx, world)?;
    }
    Ok(())
}
