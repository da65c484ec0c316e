//! Selection of the winning candidate

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use ordered_float::NotNan;
use serde::Serialize;

use super::TrajectoryCost;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Stateful selector, which remembers the previous winner to keep the selection stable.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    previous: Option<usize>,
}

/// Result of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Index of the winning candidate, `None` if there were no candidates
    pub index: Option<usize>,

    /// True if no free candidate could be selected
    pub blocked: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Selector {
    /// Select the cheapest candidate.
    ///
    /// Blocked candidates are only considered if no free candidate has a valid cost, the
    /// selection is then reported as blocked. Candidates whose cost is within `tie_tolerance` of
    /// the cheapest are tied, the one closest to the previous winner wins, and then the lowest
    /// index. Candidates with a NaN cost are never selected.
    pub fn select(&mut self, costs: &[TrajectoryCost], tie_tolerance: f64) -> Selection {
        // Fall back on the blocked candidates if no free one can be scored
        let mut pool = scoreable(costs, false);
        let all_blocked = pool.is_empty();
        if all_blocked {
            pool = scoreable(costs, true);
        }

        let min = match pool.iter().map(|(_, cost)| *cost).min() {
            Some(m) => m,
            None => {
                self.previous = None;
                return Selection {
                    index: None,
                    blocked: true,
                };
            }
        };

        let previous = self.previous;
        let winner = pool
            .iter()
            .filter(|(_, cost)| cost.into_inner() <= min.into_inner() + tie_tolerance)
            .min_by_key(|(c, _)| {
                let stability = previous.map(|p| abs_diff(c.index, p)).unwrap_or(0);
                (stability, c.index)
            })
            .map(|(c, _)| c.index);

        self.previous = winner;

        Selection {
            index: winner,
            blocked: all_blocked,
        }
    }

    /// Forget the previous winner, used when the candidates are no longer comparable.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }
}

/// Candidates with a valid cost, blocked ones only if `allow_blocked` is set.
fn scoreable(costs: &[TrajectoryCost], allow_blocked: bool) -> Vec<(&TrajectoryCost, NotNan<f64>)> {
    costs
        .iter()
        .filter(|c| allow_blocked || !c.blocked)
        .filter_map(|c| Some((c, NotNan::new(c.cost).ok()?)))
        .collect()
}

fn abs_diff(a: usize, b: usize) -> usize {
    if a > b {
        a - b
    } else {
        b - a
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cost(index: usize, cost: f64, blocked: bool) -> TrajectoryCost {
        TrajectoryCost {
            index,
            cost,
            blocked,
            closest_obstacle_distance_m: std::f64::INFINITY,
            closest_obstacle_velocity_ms: 0.0,
            collision: 0.0,
            continuity: 0.0,
            priority: cost,
        }
    }

    #[test]
    fn test_blocked_candidates_skipped() {
        let mut sel = Selector::default();

        let s = sel.select(
            &[cost(0, 0.8, false), cost(1, 0.1, true), cost(2, 0.5, false)],
            1e-3,
        );
        assert_eq!(s.index, Some(2));
        assert!(!s.blocked);
    }

    #[test]
    fn test_all_blocked_fallback() {
        let mut sel = Selector::default();

        let s = sel.select(&[cost(0, 3.0, true), cost(1, 2.0, true)], 1e-3);
        assert_eq!(s.index, Some(1));
        assert!(s.blocked);

        let s = sel.select(&[], 1e-3);
        assert_eq!(s.index, None);
        assert!(s.blocked);
    }

    #[test]
    fn test_tie_break_repeats_previous() {
        let mut sel = Selector::default();

        // No previous winner, lowest index wins the tie
        let costs = [cost(0, 1.0, false), cost(1, 0.5, false), cost(2, 0.5, false)];
        assert_eq!(sel.select(&costs, 1e-3).index, Some(1));

        // Previous winner was 2
        sel.previous = Some(2);
        assert_eq!(sel.select(&costs, 1e-3).index, Some(2));
        assert_eq!(sel.select(&costs, 1e-3).index, Some(2));

        // Two candidates, previous winner 1
        sel.previous = Some(1);
        let pair = [cost(0, 0.7, false), cost(1, 0.7, false)];
        assert_eq!(sel.select(&pair, 1e-3).index, Some(1));

        // Within tolerance counts as a tie
        sel.previous = Some(2);
        let costs = [cost(0, 0.5, false), cost(1, 0.9, false), cost(2, 0.5005, false)];
        assert_eq!(sel.select(&costs, 1e-3).index, Some(2));

        sel.reset();
        assert_eq!(sel.previous(), None);
        assert_eq!(sel.select(&costs, 1e-3).index, Some(0));
        assert_eq!(sel.previous(), Some(0));
    }

    #[test]
    fn test_nan_costs_ignored() {
        let mut sel = Selector::default();

        let s = sel.select(&[cost(0, std::f64::NAN, false), cost(1, 4.0, false)], 1e-3);
        assert_eq!(s.index, Some(1));

        let s = sel.select(&[cost(0, std::f64::NAN, false)], 1e-3);
        assert_eq!(s.index, None);
        assert!(s.blocked);

        // No free candidate has a valid cost, the blocked ones are used
        let s = sel.select(
            &[
                cost(0, std::f64::NAN, false),
                cost(1, 2.0, true),
                cost(2, 1.5, true),
            ],
            1e-3,
        );
        assert_eq!(s.index, Some(2));
        assert!(s.blocked);
    }
}
