//! Playback sequencer
//!
//! [`transition`] is the pure state machine over a step count. [`Player`]
//! drives it over a concrete list of steps and owns the one-shot timer of a
//! timed step. Expired timers are delivered through [`TimerEvents`] so the
//! host can wait on them from its own event loop and feed them back with
//! [`Player::on_timer_expired`].

use log::debug;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    NotStarted,
    /// `index` is a position in the ordered step list, not a step's `index` field
    Active { index: usize },
    Finished,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Active { index } => write!(f, "step #{}", index + 1),
            Self::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Start,
    Advance,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved(PlaybackState),
    /// The signal does not apply to the current state
    Unchanged,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("Illegal step reached: position {index} of {step_count} steps")]
    IllegalState { index: usize, step_count: usize },
}

/// Compute the state that follows `state` on `signal`
///
/// Signals that do not apply to a state are [`Transition::Unchanged`], so a
/// late duplicate signal on an already settled state is a no-op.
pub fn transition(
    state: PlaybackState,
    signal: Signal,
    step_count: usize,
) -> Result<Transition, SequencerError> {
    let next = match (state, signal) {
        (PlaybackState::Active { index }, _) if index >= step_count => {
            return Err(SequencerError::IllegalState { index, step_count });
        }
        (PlaybackState::NotStarted, Signal::Start) => {
            if step_count > 0 {
                PlaybackState::Active { index: 0 }
            } else {
                PlaybackState::Finished
            }
        }
        (PlaybackState::Active { index }, Signal::Advance) => {
            if index + 1 < step_count {
                PlaybackState::Active { index: index + 1 }
            } else {
                PlaybackState::Finished
            }
        }
        (PlaybackState::Finished, Signal::Restart) => PlaybackState::NotStarted,
        _ => return Ok(Transition::Unchanged),
    };
    Ok(Transition::Moved(next))
}

/// Delivered when a timed step's duration has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    generation: u64,
}

/// Receiving side of a player's timers
pub struct TimerEvents {
    rx: mpsc::UnboundedReceiver<TimerExpired>,
}

impl TimerEvents {
    /// Wait for the next expiry; `None` once the player is gone
    pub async fn recv(&mut self) -> Option<TimerExpired> {
        self.rx.recv().await
    }
}

/// The single pending timer; aborted when dropped
struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Drop for PendingTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Walks an ordered list of steps, auto-advancing timed ones
///
/// Entering a timed step spawns a tokio task, so signals that may enter one
/// must be dispatched from within a tokio runtime.
pub struct Player {
    steps: Vec<Step>,
    state: PlaybackState,
    timer: Option<PendingTimer>,
    generation: u64,
    tx: mpsc::UnboundedSender<TimerExpired>,
}

impl Player {
    /// `steps` must already be in playback order
    pub fn new(steps: Vec<Step>) -> (Self, TimerEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let player = Self {
            steps,
            state: PlaybackState::NotStarted,
            timer: None,
            generation: 0,
            tx,
        };
        (player, TimerEvents { rx })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&Step> {
        match self.state {
            PlaybackState::Active { index } => self.steps.get(index),
            _ => None,
        }
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn start(&mut self) -> Result<PlaybackState, SequencerError> {
        self.dispatch(Signal::Start)
    }

    pub fn advance(&mut self) -> Result<PlaybackState, SequencerError> {
        self.dispatch(Signal::Advance)
    }

    pub fn restart(&mut self) -> Result<PlaybackState, SequencerError> {
        self.dispatch(Signal::Restart)
    }

    /// Apply an expiry; one from a timer that is no longer pending is ignored
    pub fn on_timer_expired(
        &mut self,
        expired: TimerExpired,
    ) -> Result<PlaybackState, SequencerError> {
        let is_pending = self
            .timer
            .as_ref()
            .is_some_and(|pending| pending.generation == expired.generation);
        if !is_pending {
            debug!(
                "Ignoring stale timer (generation={}) in state {}",
                expired.generation, self.state
            );
            return Ok(self.state);
        }

        self.timer = None;
        self.dispatch(Signal::Advance)
    }

    pub fn dispatch(&mut self, signal: Signal) -> Result<PlaybackState, SequencerError> {
        match transition(self.state, signal, self.steps.len())? {
            Transition::Moved(next) => {
                self.enter(next);
                Ok(next)
            }
            Transition::Unchanged => {
                debug!("{:?} ignored in state {}", signal, self.state);
                Ok(self.state)
            }
        }
    }

    fn enter(&mut self, next: PlaybackState) {
        // Cancel the outgoing state's timer before the new state is visible
        self.timer = None;
        self.generation += 1;
        debug!("{} -> {}", self.state, next);
        self.state = next;

        let duration = match next {
            PlaybackState::Active { index } => {
                self.steps.get(index).and_then(|s| s.duration_seconds)
            }
            _ => None,
        };
        if let Some(seconds) = duration {
            self.timer = Some(self.schedule(Duration::from_secs(u64::from(seconds))));
        }
    }

    fn schedule(&self, after: Duration) -> PendingTimer {
        let generation = self.generation;
        let tx = self.tx.clone();
        let deadline = tokio::time::Instant::now() + after;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(TimerExpired { generation });
        });
        debug!("Scheduled timer (generation={}) for {:?}", generation, after);
        PendingTimer { generation, handle }
    }
}
