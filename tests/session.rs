//! Tests for session control: time travel, breakpoints, overrides, choices
//! and artifact capture.
mod common;
use bincode::config::standard;
use bincode::serde::encode_to_vec;
use common::*;
use fabula::prelude::*;

#[test]
fn test_step_back_restores_the_previous_state_exactly() {
    let mut session = start_session(create_linear_flow());
    session.step().expect("Failed to step");
    session.step().expect("Failed to step");

    let before = session.state().clone();
    session.step().expect("Failed to step"); // Executes the instruction
    assert_ne!(*session.state(), before);

    session.step_back().expect("Failed to step back");
    assert_eq!(*session.state(), before);
}

#[test]
fn test_step_back_undoes_variable_writes() {
    let mut session = start_session(create_linear_flow());
    for _ in 0..3 {
        session.step().expect("Failed to step");
    }
    assert_eq!(
        session.state().variables.get("mc.jaime.health").unwrap().value,
        Value::Number(50.0)
    );

    session.step_back().expect("Failed to step back");
    let entry = session.state().variables.get("mc.jaime.health").unwrap();
    assert_eq!(entry.value, Value::Number(60.0));
    assert_eq!(entry.previous_value, None);
    assert!(session.state().history.is_empty());
}

#[test]
fn test_step_back_on_a_fresh_session_fails() {
    let mut session = start_session(create_linear_flow());
    assert!(matches!(
        session.step_back(),
        Err(SessionError::NothingToUndo)
    ));
}

#[test]
fn test_step_back_out_of_the_finished_state() {
    let mut session = start_session(create_linear_flow());
    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::Finished);
    assert!(matches!(session.step(), Err(SessionError::SessionFinished)));

    session.step_back().expect("Failed to step back");
    assert_eq!(session.state().status, Status::Paused);
    session.step().expect("Failed to step"); // The exit node runs again
    assert_eq!(session.state().status, Status::Finished);
}

#[test]
fn test_breakpoint_pauses_auto_play_after_the_node() {
    let mut session = start_session(create_linear_flow());
    assert!(session.toggle_breakpoint("tavern"));

    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::Paused);
    assert_eq!(session.state().step_count, 2); // start, then tavern
    assert!(console_contains(&session, "Hit breakpoint"));

    // Resuming picks up right behind the breakpoint node.
    session.step().expect("Failed to step");
    assert_eq!(logged_nodes(&session).last().map(String::as_str), Some("hit"));

    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::Finished);
}

#[test]
fn test_manual_stepping_walks_through_breakpoints() {
    let mut session = start_session(create_linear_flow());
    session.toggle_breakpoint("tavern");

    for _ in 0..4 {
        session.step().expect("Failed to step");
    }
    assert_eq!(session.state().status, Status::Finished);
    assert!(!console_contains(&session, "Hit breakpoint"));
}

#[test]
fn test_toggle_breakpoint_flips_and_reports() {
    let mut session = start_session(create_linear_flow());
    assert!(session.toggle_breakpoint("tavern"));
    assert!(!session.toggle_breakpoint("tavern"));
    assert!(session.view().breakpoints.is_empty());
}

#[test]
fn test_reset_returns_to_the_start_but_keeps_breakpoints() {
    let mut session = start_session(create_linear_flow());
    session.toggle_breakpoint("tavern");
    session.run_until_pause().expect("Failed to run");
    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::Finished);

    session.reset();
    let state = session.state();
    assert_eq!(state.status, Status::Paused);
    assert_eq!(state.step_count, 0);
    assert!(state.console.is_empty());
    assert!(state.execution_log.is_empty());
    assert!(state.history.is_empty());
    assert_eq!(
        state.variables.get("mc.jaime.health").unwrap().value,
        Value::Number(60.0)
    );
    assert_eq!(session.view().breakpoints, vec!["tavern"]);

    // The session runs again from scratch and breaks at the same node.
    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().step_count, 2);
    assert!(console_contains(&session, "Hit breakpoint"));
}

#[test]
fn test_step_limit_pauses_and_requires_an_explicit_continue() {
    let mut session = start_session(create_loop_flow()).with_max_steps(3);
    session.run_until_pause().expect("Failed to run");

    assert_eq!(session.state().status, Status::Paused);
    assert_eq!(session.state().step_count, 3);
    assert!(console_contains(
        &session,
        "Step limit of 3 reached; execution paused"
    ));
    assert!(matches!(
        session.step(),
        Err(SessionError::StepLimitReached(3))
    ));

    session.continue_past_limit().expect("Failed to continue");
    assert_eq!(session.view().max_steps, 3 + STEP_LIMIT_INCREMENT);
    assert!(console_contains(&session, "Step limit raised to 1003"));
    session.step().expect("Failed to step"); // The guard is lifted
    assert_eq!(session.state().step_count, 4);
}

#[test]
fn test_continue_past_limit_before_the_limit_fails() {
    let mut session = start_session(create_linear_flow());
    assert!(matches!(
        session.continue_past_limit(),
        Err(SessionError::LimitNotReached)
    ));
}

#[test]
fn test_tick_is_a_no_op_while_paused() {
    let mut session = start_session(create_linear_flow());
    assert_eq!(session.tick().expect("Failed to tick"), false);
    assert_eq!(session.state().step_count, 0);

    session.play().expect("Failed to play");
    assert!(session.tick().expect("Failed to tick"));
    assert_eq!(session.state().step_count, 1);

    session.pause();
    assert_eq!(session.state().status, Status::Paused);
    assert_eq!(session.tick().expect("Failed to tick"), false);
    assert_eq!(session.state().step_count, 1);
}

#[test]
fn test_play_refuses_finished_and_waiting_sessions() {
    let mut session = start_session(create_linear_flow());
    session.run_until_pause().expect("Failed to run");
    assert!(matches!(session.play(), Err(SessionError::SessionFinished)));

    let mut session = start_session(create_dialogue_flow());
    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::WaitingInput);
    assert!(matches!(session.play(), Err(SessionError::AwaitingChoice)));
    assert!(matches!(session.step(), Err(SessionError::AwaitingChoice)));
}

#[test]
fn test_set_variable_records_a_user_override() {
    let mut session = start_session(create_linear_flow());
    session
        .set_variable("mc.jaime.health", Value::Number(10.0))
        .expect("Failed to set variable");

    let entry = session.state().variables.get("mc.jaime.health").unwrap();
    assert_eq!(entry.value, Value::Number(10.0));
    assert_eq!(entry.previous_value, Some(Value::Number(60.0)));
    assert_eq!(entry.source, VarSource::UserOverride);

    let record = session.state().history.last().unwrap();
    assert_eq!(record.node_label, "user override");
    assert_eq!(record.variable_ref, "mc.jaime.health");
    assert_eq!(record.source, VarSource::UserOverride);
}

#[test]
fn test_setting_the_same_value_is_a_silent_no_op() {
    let mut session = start_session(create_linear_flow());
    session
        .set_variable("mc.jaime.health", Value::Number(60.0))
        .expect("Failed to set variable");

    assert!(session.state().history.is_empty());
    assert_eq!(
        session.state().variables.get("mc.jaime.health").unwrap().source,
        VarSource::Initial
    );
}

#[test]
fn test_setting_an_undeclared_variable_fails() {
    let mut session = start_session(create_linear_flow());
    assert!(matches!(
        session.set_variable("ghost.hp", Value::Number(1.0)),
        Err(SessionError::UnknownVariable(_))
    ));
}

#[test]
fn test_overrides_are_undone_with_the_step_they_preceded() {
    let mut session = start_session(create_linear_flow());
    session.step().expect("Failed to step");
    session
        .set_variable("mc.jaime.health", Value::Number(10.0))
        .expect("Failed to set variable");
    session.step().expect("Failed to step");

    // The first undo restores to just after the override.
    session.step_back().expect("Failed to step back");
    assert_eq!(
        session.state().variables.get("mc.jaime.health").unwrap().value,
        Value::Number(10.0)
    );

    // The second undo crosses the override.
    session.step_back().expect("Failed to step back");
    assert_eq!(
        session.state().variables.get("mc.jaime.health").unwrap().value,
        Value::Number(60.0)
    );
}

#[test]
fn test_choose_response_primes_the_target() {
    let mut session = start_session(create_dialogue_flow());
    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::WaitingInput);

    session.choose_response("r_fight").expect("Failed to choose");
    assert_eq!(session.state().status, Status::Paused);
    assert!(session.state().pending_choices.is_empty());
    assert!(console_contains(&session, "Chose: Fight"));

    // Choosing is not a step; the brawl runs on the next one.
    let steps_before = session.state().step_count;
    session.step().expect("Failed to step");
    assert_eq!(session.state().step_count, steps_before + 1);
    assert_eq!(logged_nodes(&session).last().map(String::as_str), Some("brawl"));

    session.run_until_pause().expect("Failed to run");
    assert_eq!(session.state().status, Status::Finished);
    assert_eq!(
        session.state().variables.get("mc.jaime.health").unwrap().value,
        Value::Number(40.0)
    );
}

#[test]
fn test_choose_response_rejects_bad_input() {
    let mut session = start_session(create_dialogue_flow());
    assert!(matches!(
        session.choose_response("r_fight"),
        Err(SessionError::NotWaitingForChoice)
    ));

    session.run_until_pause().expect("Failed to run");
    assert!(matches!(
        session.choose_response("r_missing"),
        Err(SessionError::UnknownResponse(_))
    ));
}

#[test]
fn test_choosing_an_invalid_response_is_refused() {
    let sheets = MemorySheetStore::new().declare(
        "mc.jaime",
        "health",
        VarType::Number,
        Value::Number(40.0),
    );
    let mut session = start_session_with_sheets(create_dialogue_flow(), &sheets);
    session.run_until_pause().expect("Failed to run");

    // The gated response is listed but not selectable.
    assert!(matches!(
        session.choose_response("r_fight"),
        Err(SessionError::ChoiceNotAvailable(_))
    ));
    session.choose_response("r_flee").expect("Failed to choose");
}

#[test]
fn test_choice_waits_survive_step_back() {
    let mut session = start_session(create_dialogue_flow());
    session.run_until_pause().expect("Failed to run");
    session.choose_response("r_flee").expect("Failed to choose");
    session.step().expect("Failed to step");
    assert_eq!(session.state().status, Status::Finished);

    // Undoing the fled exit lands back on the primed choice target.
    session.step_back().expect("Failed to step back");
    assert_eq!(session.state().status, Status::Paused);
    session.step().expect("Failed to step");
    assert_eq!(session.state().status, Status::Finished);
}

#[test]
fn test_artifact_save_and_load_round_trip() {
    let mut session = start_session(create_linear_flow());
    session.step().expect("Failed to step");
    session.step().expect("Failed to step");

    let path = std::env::temp_dir().join("fabula_session_test.artifact");
    let path = path.to_str().expect("temp path is not utf-8");

    let artifact = session.capture_artifact();
    assert_eq!(artifact.format_version, ARTIFACT_FORMAT_VERSION);
    artifact.save(path).expect("Failed to save artifact");

    let loaded = SessionArtifact::from_file(path).expect("Failed to load artifact");
    std::fs::remove_file(path).ok();

    assert_eq!(loaded.state, *session.state());
    assert_eq!(loaded.state.step_count, 2);
    assert_eq!(loaded.state.console.len(), session.state().console.len());
}

#[test]
fn test_artifact_version_mismatch_is_rejected() {
    let session = start_session(create_linear_flow());
    let mut artifact = session.capture_artifact();
    artifact.format_version = 9;

    let bytes = encode_to_vec(&artifact, standard()).expect("Failed to encode");
    match SessionArtifact::from_bytes(&bytes) {
        Err(ArtifactError::VersionMismatch { found, expected }) => {
            assert_eq!(found, 9);
            assert_eq!(expected, ARTIFACT_FORMAT_VERSION);
        }
        other => panic!("expected a version mismatch, got {:?}", other),
    }
}

#[test]
fn test_view_is_sorted_and_render_ready() {
    let mut session = start_session(create_linear_flow());
    session.toggle_breakpoint("tavern");
    session.toggle_breakpoint("done");
    session.step().expect("Failed to step");

    let view = session.view();
    assert_eq!(view.status, Status::Paused);
    assert_eq!(view.step_count, 1);
    assert_eq!(view.current_node_id.as_deref(), Some("start"));
    assert_eq!(view.breakpoints, vec!["done", "tavern"]);

    let keys: Vec<&str> = view.variables.iter().map(|v| v.key.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(view.call_stack.is_empty());
}
