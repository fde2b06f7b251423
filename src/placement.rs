//! Launch plan resolution and window/pane placement.
//!
//! `LaunchPlan::resolve` turns the operator's count and layout inputs into a
//! validated plan; `place` decides, per worker, whether it opens a new
//! window or splits the current one. Placement is a pure function of the
//! worker index and the panes-per-window layout, so the mapping from index
//! to surface position is deterministic and independently testable.

use anyhow::{bail, Result};

use crate::config::SplitDirection;

/// Where one worker's surface goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Open a fresh window for this worker.
    NewWindow,
    /// Split the most recently created pane in the given direction.
    SplitPane(SplitDirection),
}

/// Validated worker count and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Total workers to launch.
    pub total: usize,
    /// Workers per window. 1 means every worker gets its own window.
    pub panes_per_window: usize,
}

impl LaunchPlan {
    /// Resolves count/layout inputs into a plan.
    ///
    /// Either a flat count or a complete windows×panes pair must be given.
    /// When both are present their product must agree with the count; a
    /// mismatch is a hard error rather than a silent override. A partial
    /// pair is always rejected.
    pub fn resolve(
        count: Option<usize>,
        windows: Option<usize>,
        panes: Option<usize>,
    ) -> Result<Self> {
        if let Some(0) = count {
            bail!("worker count must be positive");
        }
        if let Some(0) = windows {
            bail!("window count must be positive");
        }
        if let Some(0) = panes {
            bail!("panes per window must be positive");
        }
        match (count, windows, panes) {
            (Some(total), Some(windows), Some(panes)) => {
                if windows * panes != total {
                    bail!(
                        "layout mismatch: {} windows x {} panes != {} workers",
                        windows,
                        panes,
                        total
                    );
                }
                Ok(Self {
                    total,
                    panes_per_window: panes,
                })
            }
            (Some(total), None, None) => Ok(Self {
                total,
                panes_per_window: 1,
            }),
            (None, Some(windows), Some(panes)) => Ok(Self {
                total: windows * panes,
                panes_per_window: panes,
            }),
            (_, Some(_), None) | (_, None, Some(_)) => {
                bail!("incomplete layout: both --tabs and --panes are required together")
            }
            (None, None, None) => {
                bail!("no worker count given (use --num or --tabs with --panes)")
            }
        }
    }
}

/// Decides placement for the worker at `index` (1-based).
///
/// Worker 1 always opens a window; after that a new window starts whenever
/// the previous one is full, i.e. when `(index - 1)` is a multiple of
/// `panes_per_window`. Everything else splits the current window.
pub fn place(index: usize, panes_per_window: usize, split: SplitDirection) -> Placement {
    if index == 1 || (index - 1) % panes_per_window == 0 {
        Placement::NewWindow
    } else {
        Placement::SplitPane(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: SplitDirection = SplitDirection::Vertical;

    #[test]
    fn first_worker_always_opens_a_window() {
        for panes in 1..=8 {
            assert_eq!(place(1, panes, V), Placement::NewWindow);
        }
    }

    #[test]
    fn window_opens_exactly_when_previous_is_full() {
        for panes in 1..=6 {
            for index in 1..=36 {
                let expected = index == 1 || (index - 1) % panes == 0;
                let got = place(index, panes, V) == Placement::NewWindow;
                assert_eq!(got, expected, "index={} panes={}", index, panes);
            }
        }
    }

    #[test]
    fn two_windows_of_three_panes() {
        let decisions: Vec<Placement> = (1..=6).map(|i| place(i, 3, V)).collect();
        assert_eq!(decisions[0], Placement::NewWindow);
        assert_eq!(decisions[1], Placement::SplitPane(V));
        assert_eq!(decisions[2], Placement::SplitPane(V));
        assert_eq!(decisions[3], Placement::NewWindow);
        assert_eq!(decisions[4], Placement::SplitPane(V));
        assert_eq!(decisions[5], Placement::SplitPane(V));
    }

    #[test]
    fn window_count_matches_layout() {
        for windows in 1..=5 {
            for panes in 1..=5 {
                let total = windows * panes;
                let opened = (1..=total)
                    .filter(|&i| place(i, panes, V) == Placement::NewWindow)
                    .count();
                assert_eq!(opened, windows, "windows={} panes={}", windows, panes);
            }
        }
    }

    #[test]
    fn single_pane_layout_degenerates_to_pure_windows() {
        for index in 1..=10 {
            assert_eq!(place(index, 1, V), Placement::NewWindow);
        }
    }

    #[test]
    fn placement_is_stable_across_calls() {
        for index in 1..=12 {
            assert_eq!(place(index, 4, V), place(index, 4, V));
        }
    }

    #[test]
    fn split_direction_is_carried_through() {
        let h = SplitDirection::Horizontal;
        assert_eq!(place(2, 3, h), Placement::SplitPane(h));
    }

    #[test]
    fn resolve_count_only_is_flat_windows() {
        let plan = LaunchPlan::resolve(Some(5), None, None).unwrap();
        assert_eq!(plan.total, 5);
        assert_eq!(plan.panes_per_window, 1);
    }

    #[test]
    fn resolve_layout_pair_derives_count() {
        let plan = LaunchPlan::resolve(None, Some(2), Some(3)).unwrap();
        assert_eq!(plan.total, 6);
        assert_eq!(plan.panes_per_window, 3);
    }

    #[test]
    fn resolve_consistent_count_and_layout() {
        let plan = LaunchPlan::resolve(Some(6), Some(2), Some(3)).unwrap();
        assert_eq!(plan.total, 6);
        assert_eq!(plan.panes_per_window, 3);
    }

    #[test]
    fn resolve_rejects_product_mismatch() {
        assert!(LaunchPlan::resolve(Some(5), Some(2), Some(3)).is_err());
    }

    #[test]
    fn resolve_rejects_partial_layout() {
        assert!(LaunchPlan::resolve(None, Some(2), None).is_err());
        assert!(LaunchPlan::resolve(None, None, Some(3)).is_err());
        assert!(LaunchPlan::resolve(Some(6), Some(2), None).is_err());
    }

    #[test]
    fn resolve_rejects_zero_values() {
        assert!(LaunchPlan::resolve(Some(0), None, None).is_err());
        assert!(LaunchPlan::resolve(None, Some(0), Some(3)).is_err());
        assert!(LaunchPlan::resolve(None, Some(2), Some(0)).is_err());
    }

    #[test]
    fn resolve_rejects_nothing_supplied() {
        assert!(LaunchPlan::resolve(None, None, None).is_err());
    }
}
