//! Playback clock: a cursor stepping through `[start_index, end_index]`.
//!
//! Phases: Idle -> Running <-> Paused -> Finished, and `reset` back to Idle
//! from anywhere. Rejected transitions return an error and leave the clock
//! exactly as it was.

use std::fmt;
use std::ops::RangeInclusive;

use super::error::ReplayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Running,
    Paused,
    Finished,
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Running => "running",
            PlaybackPhase::Paused => "paused",
            PlaybackPhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Invariant: `start_index <= current_index <= end_index < series_len`,
/// `step_size >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub start_index: usize,
    pub end_index: usize,
    pub current_index: usize,
    pub step_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackClock {
    state: PlaybackState,
    phase: PlaybackPhase,
}

impl PlaybackClock {
    pub fn new(
        series_len: usize,
        start_index: usize,
        end_index: usize,
        step_size: usize,
    ) -> Result<Self, ReplayError> {
        if series_len == 0 {
            return Err(ReplayError::out_of_range("series is empty"));
        }
        if step_size == 0 {
            return Err(ReplayError::out_of_range("step_size must be at least 1"));
        }
        if end_index >= series_len {
            return Err(ReplayError::out_of_range(format!(
                "end_index {} beyond last index {}",
                end_index,
                series_len - 1
            )));
        }
        if start_index > end_index {
            return Err(ReplayError::out_of_range(format!(
                "start_index {} after end_index {}",
                start_index, end_index
            )));
        }

        Ok(PlaybackClock {
            state: PlaybackState {
                start_index,
                end_index,
                current_index: start_index,
                step_size,
            },
            phase: PlaybackPhase::Idle,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn is_finished(&self) -> bool {
        self.phase == PlaybackPhase::Finished
    }

    /// Series indices the rest of the system may observe.
    pub fn visible_range(&self) -> RangeInclusive<usize> {
        self.state.start_index..=self.state.current_index
    }

    pub fn start(&mut self) -> Result<PlaybackState, ReplayError> {
        if self.phase != PlaybackPhase::Idle {
            return Err(ReplayError::invalid_state(
                "start",
                format!("playback is {}", self.phase),
            ));
        }
        self.state.current_index = self.state.start_index;
        self.phase = if self.state.start_index == self.state.end_index {
            PlaybackPhase::Finished
        } else {
            PlaybackPhase::Running
        };
        Ok(self.state)
    }

    /// Advance by `step_size`, clamped to `end_index`.
    pub fn tick(&mut self) -> Result<PlaybackState, ReplayError> {
        match self.phase {
            PlaybackPhase::Running => {}
            PlaybackPhase::Finished => {
                return Err(ReplayError::AlreadyFinished {
                    index: self.state.current_index,
                });
            }
            phase => {
                return Err(ReplayError::invalid_state(
                    "tick",
                    format!("playback is {}", phase),
                ));
            }
        }

        let next = self
            .state
            .current_index
            .saturating_add(self.state.step_size)
            .min(self.state.end_index);
        self.state.current_index = next;
        if next == self.state.end_index {
            self.phase = PlaybackPhase::Finished;
        }
        Ok(self.state)
    }

    pub fn pause(&mut self) -> Result<(), ReplayError> {
        if self.phase != PlaybackPhase::Running {
            return Err(ReplayError::invalid_state(
                "pause",
                format!("playback is {}", self.phase),
            ));
        }
        self.phase = PlaybackPhase::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ReplayError> {
        if self.phase != PlaybackPhase::Paused {
            return Err(ReplayError::invalid_state(
                "resume",
                format!("playback is {}", self.phase),
            ));
        }
        self.phase = PlaybackPhase::Running;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state.current_index = self.state.start_index;
        self.phase = PlaybackPhase::Idle;
    }
}
