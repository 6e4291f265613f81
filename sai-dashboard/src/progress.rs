//! Per-event progress summary and bar

use sai_core::domain::state::TaskState;

/// Task counts of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub good: u32,
    pub bad: u32,
    pub ongoing: u32,
    pub pending: u32,
    pub total: u32,
}

/// Bar segment widths in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BarWidths {
    pub good: u32,
    pub pending: u32,
    pub ongoing: u32,
    pub bad: u32,
}

impl BarWidths {
    pub fn sum(&self) -> u32 {
        self.good + self.pending + self.ongoing + self.bad
    }
}

/// Rounds `count / total` as a percentage up to the next multiple of five
fn round_up_5(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let step = 5 * total;
    (count * 100).div_ceil(step) * 5
}

impl Progress {
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = TaskState>,
    {
        let mut p = Progress::default();
        for state in states {
            match state {
                TaskState::Waiting | TaskState::Unknown(_) => p.pending += 1,
                TaskState::Dispatched | TaskState::Building | TaskState::BuildingWithFailures => {
                    p.ongoing += 1
                }
                TaskState::Success => p.good += 1,
                TaskState::Failed | TaskState::Cancelled => p.bad += 1,
            }
            p.total += 1;
        }
        p
    }

    /// One-line human summary, empty when there are no tasks
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return String::new();
        }
        if self.good == self.total {
            return format!("All {} passed", self.total);
        }
        if self.bad == self.total {
            return format!("All {} failed", self.total);
        }
        if self.pending == self.total {
            return format!("{} pending", self.total);
        }
        [
            (self.good, "passed"),
            (self.bad, "failed"),
            (self.ongoing, "ongoing"),
            (self.pending, "pending"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, what)| format!("{n} {what}"))
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Segment widths that never add up to more than 100
    ///
    /// Each share is rounded up to a multiple of 5; any overflow is taken
    /// off the widest segment, the first one found in the order good,
    /// pending, ongoing, bad.
    pub fn widths(&self) -> BarWidths {
        let mut w = [
            round_up_5(self.good, self.total),
            round_up_5(self.pending, self.total),
            round_up_5(self.ongoing, self.total),
            round_up_5(self.bad, self.total),
        ];
        let sum: u32 = w.iter().sum();
        if sum > 100 {
            let mut widest = 0;
            for (i, width) in w.iter().enumerate() {
                if *width > w[widest] {
                    widest = i;
                }
            }
            w[widest] = w[widest].saturating_sub(sum - 100);
        }
        BarWidths {
            good: w[0],
            pending: w[1],
            ongoing: w[2],
            bad: w[3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(good: u32, bad: u32, ongoing: u32, pending: u32) -> Progress {
        Progress {
            good,
            bad,
            ongoing,
            pending,
            total: good + bad + ongoing + pending,
        }
    }

    #[test]
    fn test_widths_exact_fit() {
        assert_eq!(
            progress(7, 2, 1, 0).widths(),
            BarWidths {
                good: 70,
                pending: 0,
                ongoing: 10,
                bad: 20
            }
        );
    }

    #[test]
    fn test_widths_surplus_taken_from_first_widest() {
        assert_eq!(
            progress(1, 1, 1, 0).widths(),
            BarWidths {
                good: 30,
                pending: 0,
                ongoing: 35,
                bad: 35
            }
        );
    }

    #[test]
    fn test_widths_never_overflow() {
        for total in 1..=40 {
            for good in 0..=total {
                for bad in 0..=(total - good) {
                    for ongoing in 0..=(total - good - bad) {
                        let pending = total - good - bad - ongoing;
                        let w = progress(good, bad, ongoing, pending).widths();
                        assert!(w.sum() <= 100, "{good}/{bad}/{ongoing}/{pending}: {w:?}");
                        assert!(w.sum() > 0);
                    }
                }
            }
        }
        assert_eq!(Progress::default().widths().sum(), 0);
    }

    #[test]
    fn test_summary_text() {
        assert_eq!(progress(4, 0, 0, 0).summary(), "All 4 passed");
        assert_eq!(progress(0, 2, 0, 0).summary(), "All 2 failed");
        assert_eq!(progress(0, 0, 0, 3).summary(), "3 pending");
        assert_eq!(progress(7, 2, 1, 0).summary(), "7 passed, 2 failed, 1 ongoing");
        assert_eq!(progress(0, 0, 2, 1).summary(), "2 ongoing, 1 pending");
        assert_eq!(Progress::default().summary(), "");
    }

    #[test]
    fn test_from_states_categories() {
        let p = Progress::from_states([
            TaskState::Waiting,
            TaskState::Dispatched,
            TaskState::Building,
            TaskState::BuildingWithFailures,
            TaskState::Success,
            TaskState::Failed,
            TaskState::Cancelled,
        ]);
        assert_eq!(p, progress(1, 2, 3, 1));
    }
}
