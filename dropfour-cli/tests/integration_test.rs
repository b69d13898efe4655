//! Integration tests for the DROPFOUR training system
//!
//! Tests the full stack: game engine, agents, match play, brackets,
//! training jobs, merge and persistence

use std::time::Duration;

use dropfour_core::agents::{
    PreferredColumnPolicy, RandomPolicy, UcbTableConfig, UcbTablePolicy,
};
use dropfour_core::{
    action_key, canonicalize, GameResult, GameState, Outcome, Perspective, Player, Policy,
    ValueTable, COLS,
};
use dropfour_mcts::{MctsConfig, MctsPolicy};
use dropfour_tournament::{
    play_match, rounds_needed, run_bracket, BracketConfig, Competitor, Contestant, Decision,
    GameRunner, MatchConfig,
};
use dropfour_train::{
    merge_tables, train, Participant, PolicySpec, Roster, ShutdownFlag, TrainConfig,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Column sequence filling the board without four in a row
const DRAW_SEQUENCE: [usize; 42] = [
    5, 3, 2, 3, 1, 5, 3, 1, 0, 1, 4, 1, 2, 5, 0, 5, 6, 6, 2, 0, 6, 0, 4, 2, 3, 0, 3, 4, 2, 3, 2,
    6, 0, 4, 1, 1, 5, 4, 4, 5, 6, 6,
];

fn random_game(seed: u64) -> Vec<GameState> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = GameState::new_empty();
    let mut states = vec![state.clone()];
    while !state.is_terminal() {
        let moves = state.legal_moves();
        let col = moves[rng.gen_range(0..moves.len())];
        state.apply_in_place(col).unwrap();
        states.push(state.clone());
    }
    states
}

fn competitors(n: usize) -> Vec<Competitor> {
    (0..n)
        .map(|i| {
            Competitor::new(format!("p{}", i + 1), Box::new(RandomPolicy::new(i as u64)) as Box<dyn Policy>)
        })
        .collect()
}

// ============================================================================
// GAME STATE
// ============================================================================

#[test]
fn test_counts_track_moves_in_random_games() {
    for seed in 0..20 {
        for (k, state) in random_game(seed).iter().enumerate() {
            assert_eq!(state.empty_count(), 42 - k);
            let placed: usize = state.heights().iter().map(|&h| h as usize).sum();
            assert_eq!(placed, k);
        }
    }
}

#[test]
fn test_full_column_is_never_legal() {
    let mut state = GameState::new_empty();
    for _ in 0..6 {
        state.apply_in_place(0).unwrap();
    }
    assert!(!state.legal_moves().contains(&0));
    assert!(state.apply(0).unwrap_err().is_invalid_move());
}

#[test]
fn test_scenario_full_board_draw() {
    let mut state = GameState::new_empty();
    for col in DRAW_SEQUENCE {
        assert!(!state.is_terminal());
        state.apply_in_place(col).unwrap();
    }
    assert_eq!(state.winner(), 0);
    assert!(state.is_terminal());
    assert_eq!(state.result(), GameResult::Draw);
}

#[test]
fn test_scenario_diagonal_win_on_fourth_piece() {
    // +1 lands on (5,0), (4,1), (3,2), (2,3); -1 fills the supports
    let moves = [0, 1, 1, 2, 3, 2, 2, 3, 4, 3, 3];
    let mut state = GameState::new_empty();
    for (i, &col) in moves.iter().enumerate() {
        state.apply_in_place(col).unwrap();
        if i + 1 < moves.len() {
            assert_eq!(state.winner(), 0, "early winner after move {}", i + 1);
        }
    }
    assert_eq!(state.board().get(2, 3), 1);
    assert_eq!(state.winner(), 1);
    assert!(state.is_terminal());
}

// ============================================================================
// CANONICALIZATION
// ============================================================================

#[test]
fn test_inverse_boards_share_keys() {
    for seed in 0..10 {
        for state in random_game(seed) {
            let board = *state.board();
            let inverse = board.inverted();
            if board.count(1) == board.count(-1) {
                continue;
            }
            let a = canonicalize(&board, Perspective::PieceCount, None);
            let b = canonicalize(&inverse, Perspective::PieceCount, None);
            assert_eq!(a.fingerprint(), b.fingerprint());
            assert_eq!(action_key(&a.fingerprint(), 3), action_key(&b.fingerprint(), 3));
        }
    }
}

#[test]
fn test_seat_perspective_uses_announced_side() {
    let mut state = GameState::new_empty();
    state.apply_in_place(3).unwrap();
    let board = *state.board();
    let as_minus = canonicalize(&board, Perspective::Seat, Some(Player::Minus));
    assert_eq!(as_minus, board.inverted());
    assert_eq!(canonicalize(&board, Perspective::Seat, Some(Player::Plus)), board);
}

// ============================================================================
// MATCH PLAY
// ============================================================================

#[test]
fn test_scenario_preferred_column_match_is_reproducible() {
    let run = |seed| {
        let mut a = PreferredColumnPolicy::default();
        let mut b = PreferredColumnPolicy::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let result = play_match(
            Contestant::new("a", &mut a),
            Contestant::new("b", &mut b),
            &MatchConfig::default(),
            &mut rng,
        )
        .unwrap();
        let histories: Vec<Vec<usize>> =
            result.games.iter().map(|g| g.history.iter().map(|&(_, c)| c).collect()).collect();
        (result.first_wins, result.second_wins, result.first_as_plus, histories)
    };
    let first = run(2024);
    assert_eq!(first, run(2024));
    // Whoever moves first wins every game of this pairing
    assert_eq!(first.0.max(first.1), 2);
    assert!(first.3.iter().all(|h| h.len() == 19));
}

#[test]
fn test_game_runner_pairs_outcomes() {
    let mut ucb = UcbTablePolicy::new(UcbTableConfig::default(), ValueTable::new(), 1);
    let mut random = RandomPolicy::new(2);
    let record = GameRunner::new(Some(Duration::from_millis(10)), true)
        .play_game(Contestant::new("ucb", &mut ucb), Contestant::new("random", &mut random))
        .unwrap();

    let table = ucb.value_table().unwrap();
    let expected = Outcome::for_seat(record.winner, Player::Plus).value() as f64 * 0.2;
    let (board, col) = record.history[0];
    let q = table.get(&action_key(&board.fingerprint(), col)).unwrap();
    assert!((q - expected).abs() < 1e-12);
}

#[test]
fn test_mcts_blocks_vertical_threat() {
    // -1 has three stacked in column 6; +1 to move must block
    let mut state = GameState::new_empty();
    for col in [0, 6, 1, 6, 0, 6] {
        state.apply_in_place(col).unwrap();
    }
    let mut policy = MctsPolicy::new(MctsConfig::default().with_simulations(2000), 11);
    policy.mount(None);
    assert_eq!(policy.act(state.board()), 6);
}

// ============================================================================
// BRACKETS
// ============================================================================

#[test]
fn test_scenario_five_participant_bracket() {
    let mut players = competitors(5);
    let result = run_bracket(&mut players, &BracketConfig::default().with_seed(5)).unwrap();

    assert_eq!(rounds_needed(5), 3);
    assert_eq!(result.rounds.len(), 3);
    let byes = result.rounds[0].matches.iter().filter(|m| m.decision == Decision::Walkover).count();
    assert_eq!(byes, 3);
    assert_eq!(result.rounds[2].matches.len(), 1);
    assert!(players.iter().any(|c| c.name == result.champion));
}

#[test]
fn test_bracket_sizes_take_ceil_log2_rounds() {
    for n in 2..=12 {
        let mut players = competitors(n);
        let config = BracketConfig::default()
            .with_seed(n as u64)
            .with_match_config(MatchConfig::single_game().with_history(false));
        let result = run_bracket(&mut players, &config).unwrap();
        assert_eq!(result.rounds.len() as u32, rounds_needed(n), "n = {n}");
        for round in &result.rounds {
            for m in &round.matches {
                assert!(m.decision != Decision::Walkover || m.second.is_none());
            }
        }
    }
}

// ============================================================================
// TRAINING, MERGE AND PERSISTENCE
// ============================================================================

#[test]
fn test_merge_is_order_independent() {
    let values = [0.1, -0.4, 0.7, 0.25];
    let tables: Vec<ValueTable> =
        values.iter().map(|&v| [("s|2".to_string(), v)].into_iter().collect()).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    let forward = merge_tables(tables.iter());
    let backward = merge_tables(tables.iter().rev());
    assert!((forward.get("s|2").unwrap() - mean).abs() < 1e-12);
    assert!((backward.get("s|2").unwrap() - mean).abs() < 1e-12);
}

#[test]
fn test_value_table_roundtrip_and_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.json");

    let table: ValueTable = [("abc|3".to_string(), 0.42)].into_iter().collect();
    table.save(&path).unwrap();
    assert_eq!(ValueTable::load(&path), table);

    std::fs::write(&path, "{\"abc|3\": 0.").unwrap();
    assert!(ValueTable::load(&path).is_empty());
    // recovery never removes the file
    assert!(path.exists());
}

#[test]
fn test_training_cycles_build_on_saved_tables() {
    let dir = tempfile::tempdir().unwrap();
    let roster = Roster::new(vec![
        Participant::new("learner", PolicySpec::UcbTable { config: UcbTableConfig::default() }),
        Participant::new("random", PolicySpec::Random),
        Participant::new("sticky", PolicySpec::Sticky),
    ])
    .unwrap();
    let config = TrainConfig::default()
        .with_jobs(2)
        .with_games_per_job(6)
        .with_max_workers(Some(2))
        .with_tables_dir(dir.path());

    let first = train(&roster, &config, &ShutdownFlag::new(), |_| {}).unwrap();
    let path = dir.path().join("learner.json");
    let after_first = ValueTable::read(&path).unwrap();
    assert_eq!(first.completed(), 2);
    assert!(!after_first.is_empty());

    let second =
        train(&roster, &config.clone().with_seed(500), &ShutdownFlag::new(), |_| {}).unwrap();
    let after_second = ValueTable::read(&path).unwrap();
    assert_eq!(second.completed(), 2);
    // keys learned in the first cycle survive the second
    for (key, _) in after_first.iter() {
        assert!(after_second.contains_key(key), "lost {key}");
    }
}

#[test]
fn test_empty_roster_is_fatal() {
    assert!(Roster::new(Vec::new()).is_err());
}

#[test]
fn test_every_builtin_agent_completes_games() {
    let roster = Roster::builtin();
    for (i, participant) in roster.iter().enumerate() {
        let mut policy = participant.policy.build(i as u64, ValueTable::new());
        let mut opponent = RandomPolicy::new(99);
        let record = GameRunner::default()
            .play_game(
                Contestant::new(&participant.name, policy.as_mut()),
                Contestant::new("random", &mut opponent),
            )
            .unwrap();
        assert!(record.moves as usize <= COLS * 6);
        assert!(record.moves >= 7);
    }
}
