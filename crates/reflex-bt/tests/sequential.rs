use reflex_bt::{
    Agent, BehaviorKind, BehaviorTemplate, GoalState, LeafAction, LeafRegistry, LeafStatus,
    TemplateId, TemplateRegistry,
};
use reflex_core::{TickContext, VarFrame, WorkingMemory, WorldMut, WorldView};

#[derive(Debug, Default)]
struct TestWorld {
    log: Vec<&'static str>,
}

impl WorldView for TestWorld {
    type Agent = u64;
}

impl WorldMut for TestWorld {}

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

fn registry_with_two_steps() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
        .register(
            "task",
            BehaviorTemplate::new(0, "task_1", BehaviorKind::Sequential)
                .with_step("a", vec![])
                .with_step("b", vec![]),
        )
        .unwrap();
    registry
        .register("a", BehaviorTemplate::new(1, "a_1", BehaviorKind::Leaf))
        .unwrap();
    registry
        .register("b", BehaviorTemplate::new(2, "b_1", BehaviorKind::Leaf))
        .unwrap();
    registry
}

#[test]
fn failing_child_short_circuits_later_steps() {
    let mut leaves: LeafRegistry<TestWorld> = LeafRegistry::new();
    leaves.register_action(TemplateId(1), |_| {
        Box::new(ScriptedLeaf {
            name: "a",
            status: LeafStatus::Failure,
        })
    });
    leaves.register_action(TemplateId(2), |_| {
        Box::new(ScriptedLeaf {
            name: "b",
            status: LeafStatus::Success,
        })
    });

    let mut agent = Agent::new(1u64, registry_with_two_steps(), leaves, "task").unwrap();
    let mut world = TestWorld::default();
    agent.tick(&ctx(0), &mut world).unwrap();

    // B must never be invoked.
    assert_eq!(world.log, vec!["a"]);
    assert_eq!(agent.root_state(), GoalState::Failed);
}

#[test]
fn children_run_in_declaration_order_one_per_tick() {
    let mut leaves: LeafRegistry<TestWorld> = LeafRegistry::new();
    leaves.register_action(TemplateId(1), |_| {
        Box::new(ScriptedLeaf {
            name: "a",
            status: LeafStatus::Success,
        })
    });
    leaves.register_action(TemplateId(2), |_| {
        Box::new(ScriptedLeaf {
            name: "b",
            status: LeafStatus::Success,
        })
    });

    let mut agent = Agent::new(1u64, registry_with_two_steps(), leaves, "task").unwrap();
    let mut world = TestWorld::default();

    agent.tick(&ctx(0), &mut world).unwrap();
    assert_eq!(world.log, vec!["a"]);
    assert_eq!(agent.root_state(), GoalState::Active);

    agent.tick(&ctx(1), &mut world).unwrap();
    assert_eq!(world.log, vec!["a", "b"]);
    assert_eq!(agent.root_state(), GoalState::Succeeded);
}

#[test]
fn zero_step_sequential_succeeds_immediately() {
    let mut registry = TemplateRegistry::new();
    registry
        .register(
            "noop",
            BehaviorTemplate::new(0, "noop_1", BehaviorKind::Sequential),
        )
        .unwrap();

    let mut agent = Agent::new(1u64, registry, LeafRegistry::<TestWorld>::new(), "noop").unwrap();
    let mut world = TestWorld::default();
    agent.tick(&ctx(0), &mut world).unwrap();

    assert_eq!(agent.root_state(), GoalState::Succeeded);
}

#[test]
fn leaf_runs_across_ticks_until_it_reports() {
    struct Countdown {
        remaining: u32,
    }

    impl LeafAction<TestWorld> for Countdown {
        fn tick(
            &mut self,
            _ctx: &TickContext,
            _agent: u64,
            world: &mut TestWorld,
            _memory: &mut WorkingMemory,
            _frame: &mut VarFrame,
        ) -> LeafStatus {
            world.log.push("step");
            if self.remaining == 0 {
                return LeafStatus::Success;
            }
            self.remaining -= 1;
            LeafStatus::Running
        }
    }

    let mut registry = TemplateRegistry::new();
    registry
        .register("work", BehaviorTemplate::new(0, "work_1", BehaviorKind::Leaf))
        .unwrap();

    let mut leaves: LeafRegistry<TestWorld> = LeafRegistry::new();
    leaves.register_action(TemplateId(0), |_| Box::new(Countdown { remaining: 2 }));

    let mut agent = Agent::new(1u64, registry, leaves, "work").unwrap();
    let mut world = TestWorld::default();

    for tick in 0..2 {
        agent.tick(&ctx(tick), &mut world).unwrap();
        assert_eq!(agent.root_state(), GoalState::Active);
    }
    agent.tick(&ctx(2), &mut world).unwrap();
    assert_eq!(agent.root_state(), GoalState::Succeeded);
    assert_eq!(world.log.len(), 3);
}
