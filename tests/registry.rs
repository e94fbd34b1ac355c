//! Integration tests for the battle registry: turn queueing, CPU scheduling
//! and battle lifecycle across channels.

use skirmish::{
    Battle, BattleEvent, BattleRegistry, EngineConfig, MoveDirection, Position, SkirmishError,
    SubAction, Submitter, Team, TeamSide, TurnOutcome, TurnSummary,
};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

const HUMANS: [&str; 2] = ["a, N/A, 10, 1, 1, 1", "b, N/A, 10, 1, 1, 1"];

async fn next_event(events: &mut UnboundedReceiver<BattleEvent>) -> BattleEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream closed")
}

#[tokio::test]
async fn test_cpu_turn_runs_after_human_turn() {
    let (registry, mut events) = BattleRegistry::with_events(EngineConfig::for_testing());
    assert_ok!(
        registry
            .start_battle("c", 6, 1, "", ["a, N/A, 10, 1, 1, 1", "b, CPU, 10, 1, 1, 2"])
            .await
    );

    assert!(matches!(next_event(&mut events).await, BattleEvent::Started { .. }));
    assert!(matches!(
        next_event(&mut events).await,
        BattleEvent::TurnStarted { letter: 'A', is_cpu: false, .. }
    ));

    assert_ok!(registry.submit_turn("c", Submitter::Human, Vec::new()).await);

    assert!(matches!(next_event(&mut events).await, BattleEvent::TurnResolved { .. }));
    assert!(matches!(
        next_event(&mut events).await,
        BattleEvent::TurnStarted { letter: 'B', is_cpu: true, .. }
    ));
    assert_eq!(
        next_event(&mut events).await,
        BattleEvent::CpuCommand {
            channel: "c".to_string(),
            command: "move 2 left".to_string(),
        }
    );
    match next_event(&mut events).await {
        BattleEvent::TurnResolved { summary, .. } => assert_eq!(summary.board, "A - - B - -"),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        next_event(&mut events).await,
        BattleEvent::TurnStarted { letter: 'A', .. }
    ));
}

#[tokio::test]
async fn test_humans_cannot_act_for_a_cpu() {
    let config = EngineConfig {
        cpu_delay: Duration::from_secs(60),
        ..EngineConfig::for_testing()
    };
    let registry = BattleRegistry::new(config);
    assert_ok!(
        registry
            .start_battle("c", 6, 1, "", ["*b, CPU, 10, 1, 1, 1", "a, N/A, 10, 1, 1, 1"])
            .await
    );

    let result = registry.submit_turn("c", Submitter::Human, Vec::new()).await;
    assert!(matches!(result, Err(SkirmishError::WrongTurn(_))));
}

/// Lets every spawned task run until it blocks.
async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

/// Spawns one submission per turn while the battle is locked, so they queue
/// in spawn order, then releases the lock and collects the results.
async fn queue_turns(
    registry: &BattleRegistry,
    turns: Vec<Vec<SubAction>>,
) -> Vec<Result<TurnSummary, SkirmishError>> {
    let handle = registry.get_battle("c").await.unwrap();
    let guard = handle.lock().await;

    let mut submissions = Vec::new();
    for actions in turns {
        let registry = registry.clone();
        submissions.push(tokio::spawn(async move {
            registry.submit_turn("c", Submitter::Human, actions).await
        }));
        settle().await;
    }
    drop(guard);

    let mut results = Vec::new();
    for submission in submissions {
        results.push(submission.await.unwrap());
    }
    results
}

#[tokio::test]
async fn test_queued_submissions_resolve_in_arrival_order() {
    let registry = BattleRegistry::new(EngineConfig::for_testing());
    assert_ok!(
        registry
            .start_battle("c", 6, 1, "", ["a, N/A, 10, 1, 2, 3", "b, N/A, 10, 1, 2, 3"])
            .await
    );

    // Each turn is only valid for the holder it reaches in arrival order.
    let results = queue_turns(
        &registry,
        vec![
            vec![SubAction::Move {
                distance: 3,
                direction: MoveDirection::Forward,
            }],
            vec![SubAction::Attack {
                count: 1,
                target: Some('A'),
            }],
            vec![SubAction::Attack {
                count: 1,
                target: Some('B'),
            }],
        ],
    )
    .await;

    let summaries: Vec<TurnSummary> = results.into_iter().map(Result::unwrap).collect();
    assert!(summaries[0].damage.is_empty());
    assert_eq!(summaries[1].damage[0].letter, 'A');
    assert_eq!(summaries[2].damage[0].letter, 'B');
    assert_eq!(summaries[2].board, "- - - A - B");

    let handle = registry.get_battle("c").await.unwrap();
    assert_eq!(handle.lock().await.turn_holder().unwrap().letter, 'B');
}

#[tokio::test]
async fn test_turn_queued_behind_a_victory_is_concluded() {
    let registry = BattleRegistry::new(EngineConfig::for_testing());
    assert_ok!(
        registry
            .start_battle("c", 2, 1, "", ["a, N/A, 10, 20, 1, 1", "b, N/A, 10, 1, 1, 1"])
            .await
    );

    let mut results = queue_turns(
        &registry,
        vec![
            vec![SubAction::Attack {
                count: 1,
                target: None,
            }],
            Vec::new(),
        ],
    )
    .await;

    assert!(matches!(results.pop(), Some(Err(SkirmishError::Concluded))));
    let victory = results.pop().unwrap().unwrap();
    assert!(victory.damage[0].defeated);
    assert_eq!(victory.outcome, TurnOutcome::Victory(TeamSide::First));
    assert_err!(registry.get_battle("c").await);
}

/// Moves a character to `to`, horizontally first.
fn place(battle: &mut Battle, letter: char, index: usize, to: Position) {
    let character = battle.characters_with_letter(letter)[index];
    let (id, from) = (character.id, character.position);

    let dx = to.x - from.x;
    if dx != 0 {
        let direction = if dx > 0 { MoveDirection::Right } else { MoveDirection::Left };
        battle.move_character(id, dx.unsigned_abs(), direction).unwrap();
    }
    let dy = to.y - from.y;
    if dy != 0 {
        let direction = if dy > 0 { MoveDirection::Down } else { MoveDirection::Up };
        battle.move_character(id, dy.unsigned_abs(), direction).unwrap();
    }
}

#[tokio::test]
async fn test_rejected_cpu_plan_passes_the_turn() {
    let (registry, mut events) = BattleRegistry::with_events(EngineConfig::for_testing());
    let mut battle =
        Battle::with_options("c".to_string(), 10, 6, "", registry.battle_options()).unwrap();
    Team::from_roster(&mut battle, "h, N/A, 10, 1, 1, 20\nc, CPU, 10, 1, 3, 20").unwrap();
    Team::from_roster(&mut battle, "e, N/A, 10, 1, 1, 20\ne, N/A, 10, 1, 1, 20").unwrap();

    // The first E is nearest at the start, so the CPU heads for it. After
    // two steps right the second E is nearer but out of range, and the
    // planned attack on letter E picks that one.
    place(&mut battle, 'C', 0, Position::new(2, 1));
    place(&mut battle, 'E', 0, Position::new(7, 4));
    place(&mut battle, 'E', 1, Position::new(8, 1));
    let handle = registry.register(battle).await.unwrap();

    assert_ok!(registry.submit_turn("c", Submitter::Human, Vec::new()).await);

    let mut seen = Vec::new();
    loop {
        let event = next_event(&mut events).await;
        let done = matches!(event, BattleEvent::TurnStarted { letter: 'E', .. });
        seen.push(event);
        if done {
            break;
        }
    }

    assert!(seen.contains(&BattleEvent::CpuCommand {
        channel: "c".to_string(),
        command: "move 2 right, attack E 18".to_string(),
    }));
    match &seen[seen.len() - 2] {
        BattleEvent::TurnResolved { summary, .. } => assert!(summary.damage.is_empty()),
        other => panic!("unexpected event {:?}", other),
    }

    let battle = handle.lock().await;
    assert_eq!(battle.characters_with_letter('C')[0].position, Position::new(2, 1));
    assert!(battle.characters_with_letter('E').iter().all(|e| e.hp == 10));
    assert_eq!(battle.turn_holder().unwrap().position, Position::new(7, 4));
}

#[tokio::test]
async fn test_victory_frees_the_channel() {
    let (registry, mut events) = BattleRegistry::with_events(EngineConfig::for_testing());
    assert_ok!(
        registry
            .start_battle("c", 2, 1, "", ["a, N/A, 10, 20, 1, 1", "b, N/A, 10, 1, 1, 1"])
            .await
    );

    let summary = registry
        .submit_turn(
            "c",
            Submitter::Human,
            vec![SubAction::Attack {
                count: 1,
                target: None,
            }],
        )
        .await
        .unwrap();
    assert!(summary.damage[0].defeated);

    let mut victory = None;
    while victory.is_none() {
        if let BattleEvent::Victory { winner, text, .. } = next_event(&mut events).await {
            victory = Some((winner, text));
        }
    }
    assert_eq!(
        victory,
        Some((TeamSide::First, "[A] wins! The battle has concluded.".to_string()))
    );

    assert_err!(registry.get_battle("c").await);
    assert_ok!(registry.start_battle("c", 6, 1, "", HUMANS).await);
}

#[tokio::test]
async fn test_channels_are_independent() {
    let registry = BattleRegistry::new(EngineConfig::for_testing());
    assert_ok!(registry.start_battle("one", 6, 1, "", HUMANS).await);
    assert_ok!(registry.start_battle("two", 6, 1, "", HUMANS).await);

    assert_ok!(registry.submit_turn("one", Submitter::Human, Vec::new()).await);
    assert_ok!(registry.end_battle("two").await);

    assert_eq!(registry.active_channels().await, vec!["one".to_string()]);
    let handle = registry.get_battle("one").await.unwrap();
    assert_eq!(handle.lock().await.turn_holder().unwrap().letter, 'B');
}

#[tokio::test]
async fn test_loaded_battle_resumes_with_saved_holder() {
    let registry = BattleRegistry::new(EngineConfig::for_testing());
    let handle = registry.start_battle("c", 6, 1, "origin", HUMANS).await.unwrap();
    assert_ok!(registry.submit_turn("c", Submitter::Human, Vec::new()).await);

    let persisted = handle.to_persisted().await;
    assert_eq!(persisted.turn_index, 1);

    let restored = registry.load_battle("elsewhere", &persisted).await.unwrap();
    assert_eq!(restored.lock().await.turn_holder().unwrap().letter, 'B');
    assert_eq!(restored.lock().await.origin_text(), "origin");
    assert!(matches!(
        registry.load_battle("c", &persisted).await,
        Err(SkirmishError::AlreadyExists(_))
    ));
}
