use std::cell::RefCell;
use std::rc::Rc;

use goap_core::{
    AbortResult, Action, ActionContext, ActionDef, ActionId, ActionOutcome, Blackboard,
    CompletionQueue, FinishHandle, ScriptedAction, StartResult, SymEffect, TickContext,
    WorldState,
};

goap_core::world_keys! {
    enum Key {
        Alerted,
        HasTarget,
    }
}

fn ctx<'a>(world: &'a WorldState<Key>, blackboard: &'a mut Blackboard) -> ActionContext<'a, Key> {
    ActionContext {
        tick: TickContext::new(0, 0.1),
        agent: 1,
        world,
        blackboard,
    }
}

#[test]
fn finish_handle_delivers_exactly_one_completion() {
    let queue = CompletionQueue::new();
    let handle = queue.sender().handle(ActionId(3), 9);
    assert_eq!(handle.action(), ActionId(3));
    assert_eq!(handle.run(), 9);

    handle.succeed();

    let drained = queue.drain();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].action, ActionId(3));
    assert_eq!(drained[0].run, 9);
    assert_eq!(drained[0].outcome, ActionOutcome::Success);
    assert!(queue.try_next().is_none());
}

#[test]
fn finish_handle_can_complete_from_another_thread() {
    let queue = CompletionQueue::new();
    let handle = queue.sender().handle(ActionId(0), 1);

    std::thread::spawn(move || handle.fail())
        .join()
        .expect("worker thread");

    let completion = queue.try_next().expect("completion from worker");
    assert_eq!(completion.outcome, ActionOutcome::Failure);
}

#[test]
fn scripted_action_without_start_callback_fails_to_start() {
    let mut action = ScriptedAction::new(ActionDef::<Key>::new("noop"));
    let world = WorldState::new();
    let mut bb = Blackboard::new();
    let queue = CompletionQueue::new();

    let result = action.start(&mut ctx(&world, &mut bb), queue.sender().handle(ActionId(0), 0));
    assert_eq!(result, StartResult::Failed);
    assert!(action.verify_context(&ctx(&world, &mut bb)));
}

#[test]
fn scripted_action_with_abort_callback_aborts_asynchronously() {
    let held: Rc<RefCell<Option<FinishHandle>>> = Rc::default();
    let held_start = held.clone();
    let held_abort = held.clone();

    let mut action = ScriptedAction::new(
        ActionDef::new("shout").with_effect(SymEffect::set(Key::Alerted, 1)),
    )
    .on_start(move |_ctx, finish| {
        *held_start.borrow_mut() = Some(finish);
        StartResult::Running
    })
    .on_abort(move |_ctx| {
        // Blend out first; the abort is acknowledged later.
        assert!(held_abort.borrow().is_some());
    });

    let world = WorldState::new();
    let mut bb = Blackboard::new();
    let queue = CompletionQueue::new();

    let started = action.start(&mut ctx(&world, &mut bb), queue.sender().handle(ActionId(2), 5));
    assert_eq!(started, StartResult::Running);
    assert_eq!(action.abort(&mut ctx(&world, &mut bb)), AbortResult::Running);
    assert!(queue.try_next().is_none());

    held.borrow_mut().take().expect("handle kept by script").aborted();
    let completion = queue.try_next().expect("abort acknowledgment");
    assert_eq!(completion.outcome, ActionOutcome::Aborted);
    assert_eq!(completion.run, 5);
}

#[test]
fn context_check_reads_the_blackboard() {
    const TARGET: goap_core::BbKey<u64> = goap_core::BbKey::new(10, "target");

    let action = ScriptedAction::new(ActionDef::<Key>::new("attack"))
        .with_verify(|ctx| ctx.blackboard.contains(TARGET));

    let world = WorldState::new();
    let mut bb = Blackboard::new();
    assert!(!action.verify_context(&ctx(&world, &mut bb)));

    bb.set(TARGET, 42);
    assert!(action.verify_context(&ctx(&world, &mut bb)));
}

#[test]
fn default_precondition_check_is_conjunctive() {
    let action = ScriptedAction::new(
        ActionDef::new("attack")
            .with_precondition(Key::HasTarget, 1)
            .with_precondition(Key::Alerted, 1),
    );
    let mut world = WorldState::new();
    world.set(Key::HasTarget, 1);
    assert!(!action.validate_preconditions(&world));
    world.set(Key::Alerted, 1);
    assert!(action.validate_preconditions(&world));
}
