use reflex_bt::{
    Agent, BehaviorKind, BehaviorTemplate, GoalState, LeafAction, LeafRegistry, LeafStatus,
    Outcome, TemplateId, TemplateRegistry,
};
use reflex_core::{TickContext, Value, VarFrame, WorkingMemory, WorldMut, WorldView};

#[derive(Debug, Default)]
struct TestWorld {
    log: Vec<&'static str>,
}

impl WorldView for TestWorld {
    type Agent = u64;
}

impl WorldMut for TestWorld {}

/// Never finishes on its own; keeps an `elapsed` counter in its frame and
/// records cancellation.
struct WaitLeaf;

impl LeafAction<TestWorld> for WaitLeaf {
    fn tick(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        world: &mut TestWorld,
        _memory: &mut WorkingMemory,
        frame: &mut VarFrame,
    ) -> LeafStatus {
        world.log.push("wait");
        let elapsed = frame.get("elapsed").and_then(Value::as_int).unwrap_or(0);
        frame.set("elapsed", elapsed + 1);
        LeafStatus::Running
    }

    fn cancel(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        world: &mut TestWorld,
        _memory: &mut WorkingMemory,
        _frame: &mut VarFrame,
    ) {
        world.log.push("wait.cancel");
    }
}

struct ScriptedLeaf {
    name: &'static str,
    status: LeafStatus,
}

impl LeafAction<TestWorld> for ScriptedLeaf {
    fn tick(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        world: &mut TestWorld,
        _memory: &mut WorkingMemory,
        _frame: &mut VarFrame,
    ) -> LeafStatus {
        world.log.push(self.name);
        self.status
    }
}

fn ctx(tick: u64) -> TickContext {
    TickContext {
        tick,
        dt_seconds: 0.1,
    }
}

fn pair_registry(threshold: u32, first: &'static str, second: &'static str) -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
        .register(
            "pair",
            BehaviorTemplate::new(
                0,
                "pair_1",
                BehaviorKind::Parallel {
                    success_threshold: threshold,
                },
            )
            .with_step(first, vec![])
            .with_step(second, vec![]),
        )
        .unwrap();
    registry
        .register("win", BehaviorTemplate::new(1, "win_1", BehaviorKind::Leaf))
        .unwrap();
    registry
        .register("lose", BehaviorTemplate::new(2, "lose_1", BehaviorKind::Leaf))
        .unwrap();
    registry
        .register("wait", BehaviorTemplate::new(3, "wait_1", BehaviorKind::Leaf))
        .unwrap();
    registry
}

fn standard_leaves() -> LeafRegistry<TestWorld> {
    let mut leaves: LeafRegistry<TestWorld> = LeafRegistry::new();
    leaves.register_action(TemplateId(1), |_| {
        Box::new(ScriptedLeaf {
            name: "win",
            status: LeafStatus::Success,
        })
    });
    leaves.register_action(TemplateId(2), |_| {
        Box::new(ScriptedLeaf {
            name: "lose",
            status: LeafStatus::Failure,
        })
    });
    leaves.register_action(TemplateId(3), |_| Box::new(WaitLeaf));
    leaves
}

#[test]
fn threshold_one_succeeds_and_aborts_running_sibling() {
    let mut agent = Agent::new(1u64, pair_registry(1, "win", "wait"), standard_leaves(), "pair")
        .unwrap();
    let mut world = TestWorld::default();
    agent.tick(&ctx(0), &mut world).unwrap();

    // Both children were stepped this tick; the still-running sibling was
    // aborted after aggregation.
    assert_eq!(world.log, vec!["win", "wait", "wait.cancel"]);
    assert_eq!(agent.root_state(), GoalState::Succeeded);

    let tree = agent.tree();
    let pair_node = tree.goal(agent.root()).committed.unwrap();
    assert_eq!(tree.node(pair_node).outcome, Outcome::Succeeded);

    let wait_goal = tree.node(pair_node).children[1];
    assert_eq!(tree.goal(wait_goal).state, GoalState::Aborted);
    let wait_node = tree.goal(wait_goal).committed.unwrap();
    assert_eq!(tree.node(wait_node).outcome, Outcome::Aborted);
    // The leaf got one step in before the abort.
    assert_eq!(
        tree.node(wait_node).frame.get("elapsed").and_then(Value::as_int),
        Some(1)
    );
}

#[test]
fn abort_reaches_grandchildren_within_the_tick() {
    // The losing branch is a composite: aborting it must propagate
    // through the sequential down to the running leaf, same tick.
    let mut registry = pair_registry(1, "hold", "win");
    registry
        .register(
            "hold",
            BehaviorTemplate::new(4, "hold_1", BehaviorKind::Sequential).with_step("wait", vec![]),
        )
        .unwrap();

    let mut agent = Agent::new(1u64, registry, standard_leaves(), "pair").unwrap();
    let mut world = TestWorld::default();
    agent.tick(&ctx(0), &mut world).unwrap();

    assert_eq!(world.log, vec!["wait", "win", "wait.cancel"]);
    assert_eq!(agent.root_state(), GoalState::Succeeded);

    let tree = agent.tree();
    let pair_node = tree.goal(agent.root()).committed.unwrap();
    let hold_goal = tree.node(pair_node).children[0];
    assert_eq!(tree.goal(hold_goal).state, GoalState::Aborted);
    let hold_node = tree.goal(hold_goal).committed.unwrap();
    assert_eq!(tree.node(hold_node).outcome, Outcome::Aborted);

    let wait_goal = tree.node(hold_node).children[0];
    assert_eq!(tree.goal(wait_goal).state, GoalState::Aborted);
    let wait_node = tree.goal(wait_goal).committed.unwrap();
    assert_eq!(tree.node(wait_node).outcome, Outcome::Aborted);
}

#[test]
fn fails_once_threshold_is_unreachable() {
    let mut agent = Agent::new(1u64, pair_registry(2, "lose", "wait"), standard_leaves(), "pair")
        .unwrap();
    let mut world = TestWorld::default();
    agent.tick(&ctx(0), &mut world).unwrap();

    assert_eq!(world.log, vec!["lose", "wait", "wait.cancel"]);
    assert_eq!(agent.root_state(), GoalState::Failed);

    let tree = agent.tree();
    let pair_node = tree.goal(agent.root()).committed.unwrap();
    assert_eq!(tree.node(pair_node).outcome, Outcome::Failed);
}

#[test]
fn aggregation_happens_after_all_children_were_stepped() {
    // The succeeding child is declared second; the parallel must still
    // resolve within the same tick.
    let mut agent = Agent::new(1u64, pair_registry(1, "wait", "win"), standard_leaves(), "pair")
        .unwrap();
    let mut world = TestWorld::default();
    agent.tick(&ctx(0), &mut world).unwrap();

    assert_eq!(world.log, vec!["wait", "win", "wait.cancel"]);
    assert_eq!(agent.root_state(), GoalState::Succeeded);
}

#[test]
fn resolves_on_a_later_tick_when_children_are_slow() {
    struct SlowWin {
        remaining: u32,
    }

    impl LeafAction<TestWorld> for SlowWin {
        fn tick(
            &mut self,
            _ctx: &TickContext,
            _agent: u64,
            world: &mut TestWorld,
            _memory: &mut WorkingMemory,
            _frame: &mut VarFrame,
        ) -> LeafStatus {
            world.log.push("slow");
            if self.remaining == 0 {
                return LeafStatus::Success;
            }
            self.remaining -= 1;
            LeafStatus::Running
        }
    }

    let mut registry = pair_registry(1, "wait", "slow");
    registry
        .register("slow", BehaviorTemplate::new(4, "slow_1", BehaviorKind::Leaf))
        .unwrap();
    let mut leaves = standard_leaves();
    leaves.register_action(TemplateId(4), |_| Box::new(SlowWin { remaining: 1 }));

    let mut agent = Agent::new(1u64, registry, leaves, "pair").unwrap();
    let mut world = TestWorld::default();

    agent.tick(&ctx(0), &mut world).unwrap();
    assert_eq!(agent.root_state(), GoalState::Active);

    agent.tick(&ctx(1), &mut world).unwrap();
    assert_eq!(agent.root_state(), GoalState::Succeeded);
    assert_eq!(world.log, vec!["wait", "slow", "wait", "slow", "wait.cancel"]);
}
