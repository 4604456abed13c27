//! Track advance rules
//!
//! Decides which index plays next. The controller only asks; it never
//! computes indices itself, so alternative orderings can be plugged in.

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::HashSet;

use crate::types::RepeatMode;

/// Next/previous selection over a track list of `len` entries
pub trait TrackAdvance: Send + Sync {
    /// Index after `current`, or `None` at the end of the list
    fn next(&self, current: usize, len: usize, repeat: RepeatMode, shuffle: bool) -> Option<usize>;

    /// Index before `current`, or `None` at the start of the list
    fn previous(&self, current: usize, len: usize, repeat: RepeatMode) -> Option<usize>;
}

/// Tracks already heard in the current shuffle pass
#[derive(Debug, Default)]
struct ShufflePass {
    len: usize,
    played: HashSet<usize>,
}

/// Sequential order with repeat-all wrap-around, and shuffle without repeats
///
/// A shuffle pass visits every track once. With repeat off the list then
/// ends; with repeat on a new pass starts. Repeat-one is handled by the
/// controller on track end; for explicit navigation it wraps like repeat-all.
#[derive(Debug, Default)]
pub struct DefaultAdvance {
    pass: Mutex<ShufflePass>,
}

impl DefaultAdvance {
    pub fn new() -> Self {
        Self::default()
    }

    fn shuffled_next(&self, current: usize, len: usize, wraps: bool) -> Option<usize> {
        let mut pass = self.pass.lock();
        if pass.len != len {
            pass.len = len;
            pass.played.clear();
        }
        pass.played.insert(current);

        let mut remaining: Vec<usize> = (0..len).filter(|i| !pass.played.contains(i)).collect();
        if remaining.is_empty() {
            if !wraps {
                pass.played.clear();
                return None;
            }
            pass.played.clear();
            pass.played.insert(current);
            remaining = (0..len).filter(|i| *i != current).collect();
        }
        remaining.shuffle(&mut thread_rng());
        remaining.first().copied()
    }
}

impl TrackAdvance for DefaultAdvance {
    fn next(&self, current: usize, len: usize, repeat: RepeatMode, shuffle: bool) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let wraps = repeat != RepeatMode::Off;

        if shuffle && len > 1 {
            return self.shuffled_next(current, len, wraps);
        }

        if current + 1 < len {
            Some(current + 1)
        } else if wraps {
            Some(0)
        } else {
            None
        }
    }

    fn previous(&self, current: usize, len: usize, repeat: RepeatMode) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if current > 0 {
            Some(current.min(len) - 1)
        } else if repeat != RepeatMode::Off {
            Some(len - 1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sequential_next() {
        let advance = DefaultAdvance::new();
        assert_eq!(advance.next(0, 3, RepeatMode::Off, false), Some(1));
        assert_eq!(advance.next(2, 3, RepeatMode::Off, false), None);
        assert_eq!(advance.next(2, 3, RepeatMode::All, false), Some(0));
        assert_eq!(advance.next(2, 3, RepeatMode::One, false), Some(0));
    }

    #[test]
    fn empty_list_has_no_next() {
        let advance = DefaultAdvance::new();
        assert_eq!(advance.next(0, 0, RepeatMode::All, true), None);
        assert_eq!(advance.previous(0, 0, RepeatMode::All), None);
    }

    #[test]
    fn previous_wraps_only_when_repeating() {
        let advance = DefaultAdvance::new();
        assert_eq!(advance.previous(2, 3, RepeatMode::Off), Some(1));
        assert_eq!(advance.previous(0, 3, RepeatMode::Off), None);
        assert_eq!(advance.previous(0, 3, RepeatMode::All), Some(2));
    }

    #[test]
    fn single_track_shuffle_follows_repeat() {
        let advance = DefaultAdvance::new();
        assert_eq!(advance.next(0, 1, RepeatMode::Off, true), None);
        assert_eq!(advance.next(0, 1, RepeatMode::All, true), Some(0));
    }

    #[test]
    fn shuffle_without_repeat_ends_after_one_pass() {
        let advance = DefaultAdvance::new();
        let mut seen = HashSet::from([2]);
        let mut current = 2;

        while let Some(next) = advance.next(current, 5, RepeatMode::Off, true) {
            assert!(seen.insert(next), "track {next} played twice");
            current = next;
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn shuffle_with_repeat_starts_a_new_pass() {
        let advance = DefaultAdvance::new();
        let mut current = 0;
        for _ in 0..3 {
            current = advance.next(current, 3, RepeatMode::All, true).unwrap();
        }
        // Past the end of a pass a new one begins instead of ending
        let next = advance.next(current, 3, RepeatMode::All, true).unwrap();
        assert_ne!(next, current);
    }

    #[test]
    fn shuffle_pass_resets_when_list_changes() {
        let advance = DefaultAdvance::new();
        assert!(advance.next(0, 2, RepeatMode::Off, true).is_some());
        assert_eq!(advance.next(1, 2, RepeatMode::Off, true), None);

        // A longer list is a fresh pass
        assert!(advance.next(0, 4, RepeatMode::Off, true).is_some());
    }

    proptest! {
        #[test]
        fn shuffle_picks_another_valid_index(len in 2usize..50, seed in 0usize..1000) {
            let current = seed % len;
            let next = DefaultAdvance::new().next(current, len, RepeatMode::Off, true);
            let next = next.expect("a fresh pass always has a next track");
            prop_assert!(next < len);
            prop_assert_ne!(next, current);
        }
    }
}
