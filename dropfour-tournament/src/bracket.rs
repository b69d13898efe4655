//! Single-elimination pairing
//!
//! Level 3 - Pure functions, no I/O and no game play. Generic over the
//! participant handle so callers can pair names, indices or anything else.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::BracketError;

/// One position in a round: a real participant or a BYE placeholder
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Slot<T> {
    Player(T),
    Bye,
}

/// A first-round or later pairing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Pairing<T> {
    /// Two real participants; a match decides who advances
    Match(T, T),
    /// Paired with a BYE; advances without playing
    Walkover(T),
}

/// What follows a completed round
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance<T> {
    Champion(T),
    Next(Vec<Pairing<T>>),
}

/// Smallest power of two >= n (1 for n <= 1)
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Rounds a bracket of `n` participants takes: ceil(log2 n)
pub fn rounds_needed(n: usize) -> u32 {
    next_power_of_two(n).trailing_zeros()
}

/// Append BYEs until the length is the next power of two
pub fn pad_to_power_of_two<T>(participants: Vec<T>) -> Vec<Slot<T>> {
    let size = next_power_of_two(participants.len());
    let mut slots: Vec<Slot<T>> = participants.into_iter().map(Slot::Player).collect();
    slots.resize_with(size, || Slot::Bye);
    slots
}

/// Pair adjacent slots. A lone trailing player (bracket of one) walks over.
pub fn pair_slots<T>(slots: Vec<Slot<T>>) -> Result<Vec<Pairing<T>>, BracketError> {
    let mut pairings = Vec::with_capacity(slots.len().div_ceil(2));
    let mut iter = slots.into_iter();

    while let Some(first) = iter.next() {
        let pairing = match (first, iter.next()) {
            (Slot::Player(a), Some(Slot::Player(b))) => Pairing::Match(a, b),
            (Slot::Player(a), Some(Slot::Bye) | None) | (Slot::Bye, Some(Slot::Player(a))) => {
                Pairing::Walkover(a)
            }
            (Slot::Bye, _) => return Err(BracketError::DoubleBye { pair: pairings.len() }),
        };
        pairings.push(pairing);
    }

    Ok(pairings)
}

/// First round: optional seeded shuffle, pad with BYEs, then pair.
///
/// BYEs are interleaved with the tail of the roster so each lands next to a
/// real participant. With `n` players and `b` BYEs the first `n - b` players
/// meet each other and the remaining `b` each receive a walkover.
pub fn initial_pairing<T>(
    mut participants: Vec<T>,
    shuffle: bool,
    seed: u64,
) -> Result<Vec<Pairing<T>>, BracketError> {
    if participants.is_empty() {
        return Err(BracketError::Empty);
    }
    if shuffle {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        participants.shuffle(&mut rng);
    }

    let padded = pad_to_power_of_two(participants);
    let byes = padded.iter().filter(|s| matches!(s, Slot::Bye)).count();
    let real = padded.len() - byes;
    let head = real.saturating_sub(byes);

    let mut arranged = Vec::with_capacity(padded.len());
    let mut players = padded.into_iter().filter(|s| matches!(s, Slot::Player(_)));
    arranged.extend(players.by_ref().take(head));
    for player in players {
        arranged.push(player);
        arranged.push(Slot::Bye);
    }
    // Only reachable if byes outnumbered players, which padding rules out
    arranged.resize_with(next_power_of_two(real), || Slot::Bye);

    pair_slots(arranged)
}

/// Pair the winners of the previous round, or crown the last one standing
pub fn advance_round<T>(winners: Vec<T>) -> Result<Advance<T>, BracketError> {
    match winners.len() {
        0 => Err(BracketError::Empty),
        1 => {
            let mut winners = winners;
            match winners.pop() {
                Some(champion) => Ok(Advance::Champion(champion)),
                None => Err(BracketError::Empty),
            }
        }
        n if n % 2 == 1 => Err(BracketError::OddWinners { count: n }),
        _ => {
            let slots = winners.into_iter().map(Slot::Player).collect();
            pair_slots(slots).map(Advance::Next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("p{i}")).collect()
    }

    /// Play every match by letting the first-listed side win
    fn run_to_champion(n: usize) -> (String, u32) {
        let mut pairings = initial_pairing(names(n), false, 0).unwrap();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let winners: Vec<String> = pairings
                .into_iter()
                .map(|p| match p {
                    Pairing::Match(a, _) | Pairing::Walkover(a) => a,
                })
                .collect();
            match advance_round(winners).unwrap() {
                Advance::Champion(c) => return (c, rounds),
                Advance::Next(next) => pairings = next,
            }
        }
    }

    #[test]
    fn test_pad_to_power_of_two() {
        assert_eq!(pad_to_power_of_two(vec![1]).len(), 1);
        assert_eq!(pad_to_power_of_two(vec![1, 2]).len(), 2);
        let padded = pad_to_power_of_two(vec![1, 2, 3, 4, 5]);
        assert_eq!(padded.len(), 8);
        assert_eq!(padded.iter().filter(|s| **s == Slot::Bye).count(), 3);
        assert_eq!(padded[0], Slot::Player(1));
    }

    #[test]
    fn test_five_players_get_three_byes() {
        let pairings = initial_pairing(names(5), false, 0).unwrap();
        assert_eq!(
            pairings,
            vec![
                Pairing::Match("p1".to_string(), "p2".to_string()),
                Pairing::Walkover("p3".to_string()),
                Pairing::Walkover("p4".to_string()),
                Pairing::Walkover("p5".to_string()),
            ]
        );
    }

    #[test]
    fn test_rounds_are_log2_ceiling() {
        for n in 1..=17 {
            let (_, rounds) = run_to_champion(n);
            let expected = if n == 1 { 1 } else { rounds_needed(n) };
            assert_eq!(rounds, expected, "n = {n}");
        }
        assert_eq!(rounds_needed(5), 3);
        assert_eq!(rounds_needed(8), 3);
        assert_eq!(rounds_needed(9), 4);
    }

    #[test]
    fn test_no_double_byes_for_any_size() {
        for n in 1..=33 {
            let pairings = initial_pairing(names(n), true, n as u64).unwrap();
            let entrants: usize = pairings
                .iter()
                .map(|p| match p {
                    Pairing::Match(..) => 2,
                    Pairing::Walkover(_) => 1,
                })
                .sum();
            assert_eq!(entrants, n);
        }
    }

    #[test]
    fn test_double_bye_is_rejected() {
        let slots: Vec<Slot<u8>> = vec![Slot::Player(1), Slot::Player(2), Slot::Bye, Slot::Bye];
        assert_eq!(pair_slots(slots), Err(BracketError::DoubleBye { pair: 1 }));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let a = initial_pairing(names(8), true, 42).unwrap();
        let b = initial_pairing(names(8), true, 42).unwrap();
        assert_eq!(a, b);
        let unshuffled = initial_pairing(names(8), false, 42).unwrap();
        let c = initial_pairing(names(8), true, 43).unwrap();
        assert!(a != unshuffled || c != unshuffled);
    }

    #[test]
    fn test_advance_round_rules() {
        assert_eq!(advance_round(vec!["a"]), Ok(Advance::Champion("a")));
        assert_eq!(advance_round(Vec::<u8>::new()), Err(BracketError::Empty));
        assert_eq!(advance_round(vec![1, 2, 3]), Err(BracketError::OddWinners { count: 3 }));
        assert_eq!(
            advance_round(vec![1, 2, 3, 4]),
            Ok(Advance::Next(vec![Pairing::Match(1, 2), Pairing::Match(3, 4)]))
        );
    }

    #[test]
    fn test_empty_roster_is_rejected() {
        assert_eq!(initial_pairing(Vec::<u8>::new(), true, 0), Err(BracketError::Empty));
    }
}
