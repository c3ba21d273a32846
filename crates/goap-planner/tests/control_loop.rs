use std::cell::{Cell, RefCell};
use std::rc::Rc;

use goap_core::{
    Action, ActionDef, ActionId, FinishHandle, GoalId, ScoredGoal, ScriptedAction, StartResult,
    SymEffect, TickContext, WorldProperty, WorldState,
};
use goap_planner::{FnSensor, Planner, PlannerConfig, PlannerState};
use goap_tools::{TraceLog, TRACE_LOG};

goap_core::world_keys! {
    enum Key {
        Hunger,
        HasFood,
        DoorOpen,
        Noise,
        Safe,
        Alerted,
    }
}

type Handles = Rc<RefCell<Vec<FinishHandle>>>;

/// Starts asynchronously and parks its finish handle for the test to complete.
fn parked(def: ActionDef<Key>, handles: &Handles) -> Box<dyn Action<Key>> {
    let handles = handles.clone();
    Box::new(ScriptedAction::new(def).on_start(move |_ctx, finish| {
        handles.borrow_mut().push(finish);
        StartResult::Running
    }))
}

fn instant(def: ActionDef<Key>) -> Box<dyn Action<Key>> {
    Box::new(ScriptedAction::new(def).on_start(|_ctx, _finish| StartResult::Success))
}

fn eat() -> ActionDef<Key> {
    ActionDef::new("Eat")
        .with_precondition(Key::HasFood, 1)
        .with_effect(SymEffect::set(Key::Hunger, 0))
}

fn forage() -> ActionDef<Key> {
    ActionDef::new("Forage")
        .with_cost(2)
        .with_effect(SymEffect::set(Key::HasFood, 1))
}

fn hungry_config() -> PlannerConfig {
    PlannerConfig {
        world_defaults: [("Hunger".to_owned(), 80)].into_iter().collect(),
        ..PlannerConfig::default()
    }
}

fn traced(config: PlannerConfig) -> Planner<Key> {
    let mut planner = Planner::new(1, config).expect("valid config");
    planner.blackboard_mut().set(TRACE_LOG, TraceLog::default());
    planner
}

fn trace(planner: &Planner<Key>) -> &TraceLog {
    planner.blackboard().get(TRACE_LOG).expect("trace log installed")
}

fn labels<'a>(planner: &'a Planner<Key>, tag: &str) -> Vec<&'a str> {
    trace(planner)
        .events
        .iter()
        .filter(|event| event.tag == tag)
        .map(|event| event.label.as_deref().unwrap_or(""))
        .collect()
}

fn finish_next(handles: &Handles) -> FinishHandle {
    handles.borrow_mut().remove(0)
}

struct Clock(TickContext);

impl Clock {
    fn new() -> Self {
        Self(TickContext::new(0, 0.1))
    }

    fn tick(&mut self, planner: &mut Planner<Key>) {
        planner.tick(&self.0);
        self.0 = self.0.next();
    }
}

struct Hungry {
    planner: Planner<Key>,
    handles: Handles,
    eat: ActionId,
    forage: ActionId,
    goal: GoalId,
}

fn hungry_agent(config: PlannerConfig) -> Hungry {
    let handles = Handles::default();
    let mut planner = traced(config);
    let eat = planner.add_action(parked(eat(), &handles));
    let forage = planner.add_action(parked(forage(), &handles));
    let goal = planner.add_goal(Box::new(ScoredGoal::constant(
        "Eat",
        vec![WorldProperty::new(Key::Hunger, 0)],
        5.0,
    )));
    Hungry {
        planner,
        handles,
        eat,
        forage,
        goal,
    }
}

#[test]
fn forages_then_eats_then_idles() {
    let Hungry {
        mut planner,
        handles,
        eat,
        forage,
        goal,
    } = hungry_agent(hungry_config());
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(planner.current_goal(), Some(goal));
    assert_eq!(planner.plan().iter().collect::<Vec<_>>(), vec![forage, eat]);

    finish_next(&handles).succeed();
    clock.tick(&mut planner);
    assert_eq!(planner.world().get(Key::HasFood), 1);
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(planner.plan().current(), Some(eat));

    finish_next(&handles).succeed();
    clock.tick(&mut planner);
    assert_eq!(planner.world().get(Key::Hunger), 0);
    assert_eq!(planner.state(), PlannerState::Idle);
    assert!(!planner.is_running_plan());
    assert_eq!(planner.current_goal(), None);

    assert_eq!(labels(&planner, "goap.action.start"), ["Forage", "Eat"]);
    assert_eq!(labels(&planner, "goap.action.success"), ["Forage", "Eat"]);
    assert_eq!(trace(&planner).count("goap.plan.start"), 1);
    assert_eq!(trace(&planner).count("goap.plan.complete"), 1);
    assert_eq!(trace(&planner).count("goap.plan.none"), 1);
}

#[test]
fn unpredicted_write_aborts_and_requests_replan() {
    let Hungry {
        mut planner,
        handles,
        eat,
        ..
    } = hungry_agent(hungry_config());
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    finish_next(&handles).succeed();
    clock.tick(&mut planner);
    assert_eq!(planner.plan().current(), Some(eat));
    assert_eq!(planner.state(), PlannerState::ActionActive);

    // Someone steals the food while Eat runs.
    assert!(planner.set_world_property(Key::HasFood, 0));
    assert_eq!(planner.state(), PlannerState::Idle);
    assert!(planner.plan().is_empty());
    assert!(planner.replan_requested());
    assert_eq!(trace(&planner).count("goap.mismatch"), 1);
    assert_eq!(labels(&planner, "goap.action.aborted"), ["Eat"]);

    clock.tick(&mut planner);
    assert_eq!(trace(&planner).count("goap.plan.start"), 2);
    assert_eq!(labels(&planner, "goap.action.start"), ["Forage", "Eat", "Forage"]);
}

#[test]
fn unchanged_or_idle_writes_are_not_mismatches() {
    let Hungry {
        mut planner,
        handles: _handles,
        ..
    } = hungry_agent(hungry_config());

    // Idle: nothing to diverge from.
    assert!(planner.set_world_property(Key::Noise, 1));
    assert!(!planner.replan_requested());

    let mut clock = Clock::new();
    clock.tick(&mut planner);
    assert!(!planner.set_world_property(Key::Hunger, 80));
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(trace(&planner).count("goap.mismatch"), 0);
}

#[test]
fn expected_effect_is_confirmed_by_a_sensor() {
    let handles = Handles::default();
    let door = Rc::new(Cell::new(0u8));
    let mut planner = traced(PlannerConfig::default());
    planner.add_action(parked(
        ActionDef::new("OpenDoor").with_effect(SymEffect::set(Key::DoorOpen, 1).expected()),
        &handles,
    ));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "GetOut",
        vec![WorldProperty::new(Key::DoorOpen, 1)],
        1.0,
    )));
    let sensed = door.clone();
    planner.add_sensor(Box::new(FnSensor::new(
        "door",
        move |_ctx: &TickContext, _world: &WorldState<Key>, out: &mut goap_planner::SensorWrites<Key>| {
            out.write(Key::DoorOpen, sensed.get());
        },
    )));
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(planner.predicted().get(&Key::DoorOpen), Some(&1));

    // The door swings open in the world; the sensor reports it next frame.
    door.set(1);
    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert!(planner.predicted().is_empty());
    assert_eq!(planner.world().get(Key::DoorOpen), 1);

    finish_next(&handles).succeed();
    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::Idle);
    assert_eq!(trace(&planner).count("goap.mismatch"), 0);
    assert_eq!(trace(&planner).count("goap.plan.complete"), 1);
}

#[test]
fn expected_effect_is_not_applied_on_success() {
    let handles = Handles::default();
    let mut planner = traced(hungry_config());
    planner.add_action(parked(eat(), &handles));
    planner.add_action(parked(
        ActionDef::new("Forage")
            .with_cost(2)
            .with_effect(SymEffect::set(Key::HasFood, 1).expected()),
        &handles,
    ));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Eat",
        vec![WorldProperty::new(Key::Hunger, 0)],
        5.0,
    )));
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    finish_next(&handles).succeed();
    clock.tick(&mut planner);

    // Nobody confirmed HasFood, so Eat's precondition fails when it is due.
    assert_eq!(planner.world().get(Key::HasFood), 0);
    assert_eq!(labels(&planner, "goap.precondition.violation"), ["Eat"]);
    assert_eq!(trace(&planner).count("goap.plan.abort"), 1);
    // The replan runs on the same frame and forages again.
    assert_eq!(labels(&planner, "goap.action.start"), ["Forage", "Forage"]);
    assert_eq!(planner.state(), PlannerState::ActionActive);
}

#[test]
fn asynchronous_abort_holds_the_next_plan_until_acknowledged() {
    let handles = Handles::default();
    let abort_calls = Rc::new(Cell::new(0));
    let mut planner = traced(PlannerConfig::default());

    let calls = abort_calls.clone();
    let started = handles.clone();
    let shout = planner.add_action(Box::new(
        ScriptedAction::new(ActionDef::new("Shout").with_effect(SymEffect::set(Key::Alerted, 1)))
            .on_start(move |_ctx, finish| {
                started.borrow_mut().push(finish);
                StartResult::Running
            })
            .on_abort(move |_ctx| calls.set(calls.get() + 1)),
    ));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Alert",
        vec![WorldProperty::new(Key::Alerted, 1)],
        1.0,
    )));
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::ActionActive);

    planner.set_world_property(Key::Noise, 1);
    assert_eq!(abort_calls.get(), 1);
    assert_eq!(planner.state(), PlannerState::ActionAborting);
    assert_eq!(planner.plan().iter().collect::<Vec<_>>(), vec![shout]);

    // The replan queues behind the aborting head; nothing new starts yet.
    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::ActionAborting);
    assert_eq!(planner.plan().iter().collect::<Vec<_>>(), vec![shout, shout]);
    assert_eq!(labels(&planner, "goap.action.start"), ["Shout"]);

    finish_next(&handles).aborted();
    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(planner.plan().len(), 1);
    assert_eq!(labels(&planner, "goap.action.aborted"), ["Shout"]);
    assert_eq!(labels(&planner, "goap.action.start"), ["Shout", "Shout"]);

    // The second run completes normally and its effect lands.
    finish_next(&handles).succeed();
    clock.tick(&mut planner);
    assert_eq!(planner.world().get(Key::Alerted), 1);
}

#[test]
fn stale_completion_is_ignored() {
    let Hungry {
        mut planner,
        handles: _handles,
        forage,
        ..
    } = hungry_agent(hungry_config());
    let mut clock = Clock::new();
    clock.tick(&mut planner);

    planner.completion_sender().handle(forage, 999).succeed();
    clock.tick(&mut planner);

    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(planner.world().get(Key::HasFood), 0);
    assert_eq!(trace(&planner).count("goap.action.success"), 0);
}

#[test]
fn completion_from_another_thread_is_drained_on_tick() {
    let mut planner = traced(hungry_config());
    planner.add_action(instant(eat()));
    planner.add_action(Box::new(ScriptedAction::new(forage()).on_start(
        |_ctx, finish| {
            std::thread::spawn(move || finish.succeed())
                .join()
                .expect("worker thread");
            StartResult::Running
        },
    )));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Eat",
        vec![WorldProperty::new(Key::Hunger, 0)],
        5.0,
    )));
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    assert_eq!(planner.world().get(Key::HasFood), 0);

    clock.tick(&mut planner);
    assert_eq!(planner.world().get(Key::HasFood), 1);
    // Eat finished synchronously when it started on the same frame.
    assert_eq!(planner.world().get(Key::Hunger), 0);
}

#[test]
fn replan_request_keeps_plan_for_the_same_goal() {
    let Hungry {
        mut planner,
        handles: _handles,
        forage,
        ..
    } = hungry_agent(hungry_config());
    let mut clock = Clock::new();
    clock.tick(&mut planner);

    planner.request_replan();
    clock.tick(&mut planner);

    assert!(!planner.replan_requested());
    assert_eq!(planner.state(), PlannerState::ActionActive);
    assert_eq!(planner.plan().current(), Some(forage));
    assert_eq!(trace(&planner).count("goap.plan.keep"), 1);
    assert_eq!(trace(&planner).count("goap.plan.start"), 1);
    assert_eq!(labels(&planner, "goap.action.start"), ["Forage"]);
}

#[test]
fn most_insistent_satisfiable_goal_wins() {
    let handles = Handles::default();
    let mut planner = traced(hungry_config());
    planner.add_action(parked(eat(), &handles));
    planner.add_action(parked(forage(), &handles));
    planner.add_action(parked(
        ActionDef::new("Hide").with_effect(SymEffect::set(Key::Safe, 1)),
        &handles,
    ));

    planner.add_goal(Box::new(ScoredGoal::constant(
        "Eat",
        vec![WorldProperty::new(Key::Hunger, 0)],
        5.0,
    )));
    let hide = planner.add_goal(Box::new(ScoredGoal::constant(
        "StaySafe",
        vec![WorldProperty::new(Key::Safe, 1)],
        9.0,
    )));
    // Most insistent of all, but nothing can open the door.
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Escape",
        vec![WorldProperty::new(Key::DoorOpen, 1)],
        20.0,
    )));
    // Inactive goals are never considered.
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Sulk",
        vec![WorldProperty::new(Key::Noise, 1)],
        0.0,
    )));
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    assert_eq!(planner.current_goal(), Some(hide));
    assert_eq!(labels(&planner, "goap.plan.call"), ["Escape", "StaySafe"]);
    let escape = trace(&planner).events.iter().find(|e| {
        e.tag == "goap.plan.result" && e.label.as_deref() == Some("Escape")
    });
    assert_eq!(escape.map(|e| e.b), Some(0));
}

#[test]
fn equal_insistence_prefers_earlier_goal() {
    let handles = Handles::default();
    let mut planner = traced(hungry_config());
    planner.add_action(parked(
        ActionDef::new("Hide").with_effect(SymEffect::set(Key::Safe, 1)),
        &handles,
    ));
    planner.add_action(parked(
        ActionDef::new("Shout").with_effect(SymEffect::set(Key::Alerted, 1)),
        &handles,
    ));
    let first = planner.add_goal(Box::new(ScoredGoal::constant(
        "StaySafe",
        vec![WorldProperty::new(Key::Safe, 1)],
        3.0,
    )));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Alert",
        vec![WorldProperty::new(Key::Alerted, 1)],
        3.0,
    )));

    Clock::new().tick(&mut planner);
    assert_eq!(planner.current_goal(), Some(first));
}

fn guarded_agent(config: PlannerConfig) -> (Planner<Key>, Handles, GoalId) {
    let handles = Handles::default();
    let mut planner = traced(config);
    planner.add_action(parked(eat(), &handles));
    planner.add_action(parked(forage(), &handles));
    planner.add_action(parked(
        ActionDef::new("Hide").with_effect(SymEffect::set(Key::Safe, 1)),
        &handles,
    ));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "Eat",
        vec![WorldProperty::new(Key::Hunger, 0)],
        5.0,
    )));
    // Carrying food draws attention.
    let hide = planner.add_goal(Box::new(ScoredGoal::new(
        "GuardFood",
        vec![WorldProperty::new(Key::Safe, 1)],
        |world: &WorldState<Key>| if world.get(Key::HasFood) == 1 { 10.0 } else { 0.0 },
    )));
    (planner, handles, hide)
}

#[test]
fn reprioritizes_on_world_change_when_enabled() {
    let (mut planner, handles, hide) = guarded_agent(PlannerConfig {
        reprioritize_on_world_change: true,
        ..hungry_config()
    });
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    finish_next(&handles).succeed();
    clock.tick(&mut planner);

    assert_eq!(planner.current_goal(), Some(hide));
    assert_eq!(labels(&planner, "goap.action.start"), ["Forage", "Eat", "Hide"]);
    assert_eq!(labels(&planner, "goap.action.aborted"), ["Eat"]);
}

#[test]
fn world_change_alone_never_forces_a_replan() {
    let (mut planner, handles, _hide) = guarded_agent(hungry_config());
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    finish_next(&handles).succeed();
    clock.tick(&mut planner);

    assert_eq!(planner.goal(planner.current_goal().unwrap()).unwrap().name(), "Eat");
    assert_eq!(labels(&planner, "goap.action.start"), ["Forage", "Eat"]);
}

#[test]
fn failed_start_aborts_and_requests_replan() {
    let mut planner = traced(PlannerConfig::default());
    planner.add_action(Box::new(ScriptedAction::new(
        ActionDef::new("Jam").with_effect(SymEffect::set(Key::DoorOpen, 1)),
    )));
    planner.add_goal(Box::new(ScoredGoal::constant(
        "GetOut",
        vec![WorldProperty::new(Key::DoorOpen, 1)],
        1.0,
    )));

    Clock::new().tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::Idle);
    assert!(planner.replan_requested());
    assert_eq!(labels(&planner, "goap.action.failure"), ["Jam"]);
}

#[test]
fn action_failure_aborts_the_rest_of_the_plan() {
    let Hungry {
        mut planner,
        handles,
        ..
    } = hungry_agent(hungry_config());
    let mut clock = Clock::new();

    clock.tick(&mut planner);
    finish_next(&handles).fail();
    clock.tick(&mut planner);

    assert_eq!(labels(&planner, "goap.action.failure"), ["Forage"]);
    assert_eq!(planner.world().get(Key::HasFood), 0);
    // Replanned on the same frame and started foraging again.
    assert_eq!(labels(&planner, "goap.action.start"), ["Forage", "Forage"]);
}

#[test]
fn run_all_actions_runs_every_action_in_order() {
    let mut planner = traced(PlannerConfig::default());
    planner.add_action(instant(
        ActionDef::new("Open").with_effect(SymEffect::set(Key::DoorOpen, 1)),
    ));
    planner.add_action(instant(
        ActionDef::new("Shout").with_effect(SymEffect::set(Key::Alerted, 1)),
    ));
    planner.add_action(instant(
        ActionDef::new("Hide").with_effect(SymEffect::set(Key::Safe, 1)),
    ));

    planner.run_all_actions();
    assert_eq!(planner.state(), PlannerState::PlanRunning);
    assert_eq!(planner.plan().len(), 3);

    let mut clock = Clock::new();
    for _ in 0..4 {
        clock.tick(&mut planner);
    }

    assert_eq!(labels(&planner, "goap.action.success"), ["Open", "Shout", "Hide"]);
    assert_eq!(trace(&planner).count("goap.plan.complete"), 1);
    assert_eq!(planner.world().get(Key::Safe), 1);
    assert_eq!(planner.state(), PlannerState::Idle);
}

#[test]
fn removing_the_running_action_aborts_the_plan() {
    let Hungry {
        mut planner,
        handles: _handles,
        forage,
        ..
    } = hungry_agent(hungry_config());
    let mut clock = Clock::new();
    clock.tick(&mut planner);

    assert!(planner.remove_action(forage).is_some());
    assert_eq!(planner.state(), PlannerState::Idle);
    assert!(planner.replan_requested());

    // Stale edges still mention Forage; the search skips it and finds nothing else.
    clock.tick(&mut planner);
    assert_eq!(planner.state(), PlannerState::Idle);
    assert_eq!(trace(&planner).count("goap.plan.none"), 1);

    planner.rebuild_edges();
    assert!(planner.edges().producers(Key::HasFood).is_empty());
}
