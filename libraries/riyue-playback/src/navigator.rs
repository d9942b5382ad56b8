//! Next/previous selection
//!
//! Pure decision logic: given a list length, the selected index and the play
//! mode, decide which index plays next. No I/O, never fails; the absence of
//! a target is an explicit [`NavOutcome`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::types::{PlayMode, SingleLoopSkip};

/// Why "next" was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextTrigger {
    /// The user pressed next
    Explicit,

    /// The current track finished on its own
    AutoAdvance,
}

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavOutcome {
    /// Play the track at this index
    Play(usize),

    /// The list is empty
    NothingToPlay,

    /// Reached the end of the list without wraparound; stop
    EndOfList,
}

impl NavOutcome {
    pub fn index(self) -> Option<usize> {
        match self {
            NavOutcome::Play(index) => Some(index),
            NavOutcome::NothingToPlay | NavOutcome::EndOfList => None,
        }
    }
}

/// Play queue navigator
///
/// Generic over the random source so shuffle can be made deterministic.
/// The default source is seeded from OS entropy and is `Send`, so a
/// navigator can move onto the playback thread.
#[derive(Debug, Clone)]
pub struct PlayQueueNavigator<R = StdRng> {
    rng: R,
    single_loop_skip: SingleLoopSkip,
}

impl PlayQueueNavigator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for PlayQueueNavigator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PlayQueueNavigator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            single_loop_skip: SingleLoopSkip::default(),
        }
    }

    /// Set what an explicit next does in single-loop mode
    pub fn set_single_loop_skip(&mut self, policy: SingleLoopSkip) {
        self.single_loop_skip = policy;
    }

    pub fn single_loop_skip(&self) -> SingleLoopSkip {
        self.single_loop_skip
    }

    /// Index to play after `current`
    ///
    /// A `current` outside the list is treated as no selection.
    pub fn next(
        &mut self,
        len: usize,
        current: Option<usize>,
        mode: PlayMode,
        trigger: NextTrigger,
    ) -> NavOutcome {
        if len == 0 {
            return NavOutcome::NothingToPlay;
        }
        let current = current.filter(|&index| index < len);

        match mode {
            PlayMode::Shuffle => NavOutcome::Play(self.shuffle_pick(len, current)),
            PlayMode::Normal => Self::step_forward(len, current, false),
            PlayMode::ListLoop => Self::step_forward(len, current, true),
            PlayMode::SingleLoop => {
                if trigger == NextTrigger::Explicit
                    && self.single_loop_skip == SingleLoopSkip::Advance
                {
                    return Self::step_forward(len, current, false);
                }
                NavOutcome::Play(current.unwrap_or(0))
            }
        }
    }

    /// Index to play before `current`
    ///
    /// Only list-loop wraps to the last track; every other mode stays on the
    /// first one.
    pub fn previous(&self, len: usize, current: Option<usize>, mode: PlayMode) -> NavOutcome {
        if len == 0 {
            return NavOutcome::NothingToPlay;
        }
        let current = current.filter(|&index| index < len);

        match current {
            Some(index) if index > 0 => NavOutcome::Play(index - 1),
            _ => match mode {
                PlayMode::ListLoop => NavOutcome::Play(len - 1),
                PlayMode::Normal | PlayMode::Shuffle | PlayMode::SingleLoop => NavOutcome::Play(0),
            },
        }
    }

    fn step_forward(len: usize, current: Option<usize>, wrap: bool) -> NavOutcome {
        let candidate = current.map_or(0, |index| index + 1);
        if candidate < len {
            NavOutcome::Play(candidate)
        } else if wrap {
            NavOutcome::Play(0)
        } else {
            NavOutcome::EndOfList
        }
    }

    /// Uniform pick among all indices except `current`
    fn shuffle_pick(&mut self, len: usize, current: Option<usize>) -> usize {
        match current {
            None => self.rng.gen_range(0..len),
            Some(_) if len == 1 => 0,
            Some(excluded) => {
                let pick = self.rng.gen_range(0..len - 1);
                if pick >= excluded {
                    pick + 1
                } else {
                    pick
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [PlayMode; 4] = [
        PlayMode::Normal,
        PlayMode::ListLoop,
        PlayMode::Shuffle,
        PlayMode::SingleLoop,
    ];

    fn navigator() -> PlayQueueNavigator<StdRng> {
        PlayQueueNavigator::with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn empty_list_has_nothing_to_play() {
        let mut nav = navigator();
        for mode in ALL_MODES {
            for trigger in [NextTrigger::Explicit, NextTrigger::AutoAdvance] {
                assert_eq!(nav.next(0, None, mode, trigger), NavOutcome::NothingToPlay);
                assert_eq!(nav.next(0, Some(0), mode, trigger), NavOutcome::NothingToPlay);
            }
            assert_eq!(nav.previous(0, Some(0), mode), NavOutcome::NothingToPlay);
        }
    }

    #[test]
    fn normal_stops_at_end() {
        let mut nav = navigator();
        assert_eq!(
            nav.next(3, Some(1), PlayMode::Normal, NextTrigger::Explicit),
            NavOutcome::Play(2)
        );
        assert_eq!(
            nav.next(3, Some(2), PlayMode::Normal, NextTrigger::AutoAdvance),
            NavOutcome::EndOfList
        );
        assert_eq!(
            nav.next(1, Some(0), PlayMode::Normal, NextTrigger::Explicit),
            NavOutcome::EndOfList
        );
    }

    #[test]
    fn list_loop_wraps_both_ways() {
        let mut nav = navigator();
        assert_eq!(
            nav.next(3, Some(2), PlayMode::ListLoop, NextTrigger::AutoAdvance),
            NavOutcome::Play(0)
        );
        assert_eq!(nav.previous(3, Some(0), PlayMode::ListLoop), NavOutcome::Play(2));
    }

    #[test]
    fn previous_clamps_outside_list_loop() {
        let nav = navigator();
        for mode in [PlayMode::Normal, PlayMode::Shuffle, PlayMode::SingleLoop] {
            assert_eq!(nav.previous(4, Some(0), mode), NavOutcome::Play(0));
            assert_eq!(nav.previous(4, Some(3), mode), NavOutcome::Play(2));
        }
    }

    #[test]
    fn no_selection_starts_at_beginning() {
        let mut nav = navigator();
        assert_eq!(
            nav.next(3, None, PlayMode::Normal, NextTrigger::Explicit),
            NavOutcome::Play(0)
        );
        assert_eq!(
            nav.next(3, None, PlayMode::SingleLoop, NextTrigger::AutoAdvance),
            NavOutcome::Play(0)
        );
        assert_eq!(nav.previous(3, None, PlayMode::ListLoop), NavOutcome::Play(2));
        assert_eq!(nav.previous(3, None, PlayMode::Normal), NavOutcome::Play(0));
    }

    #[test]
    fn stale_index_is_treated_as_unselected() {
        let mut nav = navigator();
        assert_eq!(
            nav.next(2, Some(9), PlayMode::Normal, NextTrigger::Explicit),
            NavOutcome::Play(0)
        );
    }

    #[test]
    fn single_loop_repeats_current() {
        let mut nav = navigator();
        for trigger in [NextTrigger::Explicit, NextTrigger::AutoAdvance] {
            assert_eq!(
                nav.next(5, Some(3), PlayMode::SingleLoop, trigger),
                NavOutcome::Play(3)
            );
        }
    }

    #[test]
    fn single_loop_advance_policy_only_affects_explicit_skips() {
        let mut nav = navigator();
        nav.set_single_loop_skip(SingleLoopSkip::Advance);

        assert_eq!(
            nav.next(5, Some(3), PlayMode::SingleLoop, NextTrigger::Explicit),
            NavOutcome::Play(4)
        );
        assert_eq!(
            nav.next(5, Some(4), PlayMode::SingleLoop, NextTrigger::Explicit),
            NavOutcome::EndOfList
        );
        assert_eq!(
            nav.next(5, Some(3), PlayMode::SingleLoop, NextTrigger::AutoAdvance),
            NavOutcome::Play(3)
        );
    }

    #[test]
    fn shuffle_two_tracks_is_deterministic() {
        let mut nav = navigator();
        for _ in 0..20 {
            assert_eq!(
                nav.next(2, Some(0), PlayMode::Shuffle, NextTrigger::Explicit),
                NavOutcome::Play(1)
            );
        }
    }

    #[test]
    fn shuffle_single_track_replays_it() {
        let mut nav = navigator();
        assert_eq!(
            nav.next(1, Some(0), PlayMode::Shuffle, NextTrigger::AutoAdvance),
            NavOutcome::Play(0)
        );
    }

    #[test]
    fn shuffle_reaches_every_other_index() {
        let mut nav = navigator();
        let mut seen = [false; 5];
        for _ in 0..500 {
            let index = nav
                .next(5, Some(2), PlayMode::Shuffle, NextTrigger::Explicit)
                .index()
                .unwrap();
            assert_ne!(index, 2);
            seen[index] = true;
        }
        assert_eq!(seen, [true, true, false, true, true]);
    }
}
