/// Property-based tests for seeding and the scoring state machine.
use chrono::{DateTime, TimeZone, Utc};
use drawsheet_core::bracket::{bracket_size, generate_main_draw};
use drawsheet_core::model::{BracketKind, Entrant, Match, Side, Slot};
use drawsheet_core::scoring::{MatchScorer, ScoringRules};
use proptest::prelude::*;

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn entrants(n: usize) -> Vec<Entrant> {
    (1..=n)
        .map(|i| Entrant::new(format!("p{i}"), format!("P{i}"), i as u32))
        .collect()
}

fn fresh_scorer(rules: ScoringRules) -> MatchScorer {
    let m = Match::new(
        "R1-M1",
        BracketKind::Main,
        "Final",
        Slot::Entrant(Entrant::new("a", "Ana", 1)),
        Slot::Entrant(Entrant::new("b", "Bo", 2)),
    );
    MatchScorer::new(m, rules).unwrap().with_clock(fixed_clock)
}

fn side(one: bool) -> Side {
    if one {
        Side::One
    } else {
        Side::Two
    }
}

/// First-round match index (1-based) holding the entrant with `id`.
fn first_round_index(draw: &drawsheet_core::MatchCollection, id: &str) -> u32 {
    let first = draw.max_round_size(BracketKind::Main).unwrap();
    (1..=first)
        .find(|i| draw.get(&format!("R{first}-M{i}")).unwrap().involves(id))
        .unwrap()
}

// Up to 29 rallies: a best-of-five needs at least 33, so no sequence here can
// finish the match and every call is accepted.
fn rallies_and_undos() -> impl Strategy<Value = (Vec<bool>, usize)> {
    prop::collection::vec(any::<bool>(), 0..30)
        .prop_flat_map(|points| {
            let n = points.len();
            (Just(points), 0..=n)
        })
}

proptest! {
    #[test]
    fn undo_matches_replaying_a_prefix((points, undos) in rallies_and_undos()) {
        let mut played = fresh_scorer(ScoringRules::par11());
        for &p in &points {
            played.score(side(p)).unwrap();
        }
        for _ in 0..undos {
            played.undo().unwrap();
        }

        let mut replayed = fresh_scorer(ScoringRules::par11());
        for &p in &points[..points.len() - undos] {
            replayed.score(side(p)).unwrap();
        }

        prop_assert_eq!(played.state(), replayed.state());
        prop_assert_eq!(played.record(), replayed.record());
    }

    #[test]
    fn finished_games_are_won_by_two_at_or_past_target(points in prop::collection::vec(any::<bool>(), 0..200)) {
        let rules = ScoringRules::hiho9().best_of(5);
        let mut scorer = fresh_scorer(rules);
        for p in points {
            if scorer.is_finished() {
                break;
            }
            scorer.score(side(p)).unwrap();
        }

        for game in &scorer.record().scores {
            let (hi, lo) = (game.side1.max(game.side2), game.side1.min(game.side2));
            prop_assert_eq!(hi, (lo + 2).max(rules.target_points));
        }
        let [a, b] = scorer.games();
        prop_assert!(a <= rules.games_to_win && b <= rules.games_to_win);
        prop_assert_eq!(scorer.is_finished(), a == rules.games_to_win || b == rules.games_to_win);
    }

    #[test]
    fn top_two_seeds_start_in_opposite_halves(n in 3usize..=64) {
        let draw = generate_main_draw(&entrants(n));
        let half = (bracket_size(n) / 4) as u32;
        prop_assert!(first_round_index(&draw, "p1") <= half);
        prop_assert!(first_round_index(&draw, "p2") > half);
    }

    #[test]
    fn top_four_seeds_start_in_different_quarters(n in 5usize..=64) {
        let draw = generate_main_draw(&entrants(n));
        let quarter = (bracket_size(n) / 8) as u32;
        let mut quarters: Vec<u32> = ["p1", "p2", "p3", "p4"]
            .iter()
            .map(|id| (first_round_index(&draw, id) - 1) / quarter)
            .collect();
        quarters.sort_unstable();
        prop_assert_eq!(quarters, vec![0, 1, 2, 3]);
    }

    #[test]
    fn draw_has_one_match_per_eliminated_line(n in 1usize..=100) {
        let draw = generate_main_draw(&entrants(n));
        let size = bracket_size(n);
        prop_assert_eq!(draw.len(), size - 1);

        let rounds = draw.iter().filter_map(|m| m.round_size).collect::<std::collections::BTreeSet<_>>();
        prop_assert_eq!(rounds.len() as u32, size.trailing_zeros());
        prop_assert_eq!(draw.max_round_size(BracketKind::Main), Some((size / 2) as u32));

        let byes = draw.iter().filter(|m| m.side1.is_bye() || m.side2.is_bye()).count();
        prop_assert_eq!(byes, size - n);
    }
}
