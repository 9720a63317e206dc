//! Timed reveal of advisor replies
//!
//! Turns one advisor reply's structured payload into a sequence of
//! visible segments with a "composing" indicator between them. The
//! sequencer is an explicit state machine (idle → composing(i) →
//! revealed(i) → … → done) advanced by a single cancellable timer, so it
//! can be cancelled and tested without nested callback scheduling. It
//! holds no network or persisted state and is fully restartable per
//! message.

use crate::chat::message::AdvisorReply;
use crate::config::RevealConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Events emitted while a reply is revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEvent {
    /// The composing indicator became active
    ComposingStarted,
    /// Segment `i` became visible (and the indicator cleared)
    Revealed(usize),
    /// The sequence finished; fired exactly once
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealState {
    Idle,
    Composing(usize),
    Revealed(usize),
    Done,
}

/// One step of the machine: the events it emitted and how long to wait
/// before advancing again (`None` once done)
#[derive(Debug)]
pub struct RevealStep {
    pub events: Vec<RevealEvent>,
    pub delay: Option<Duration>,
}

/// Sequencer for one assistant reply
///
/// With animation off, a single [`RevealSequencer::advance`] makes every
/// segment visible and completes. With animation on, each segment is
/// preceded by a composing phase and followed by a short pause before
/// the next composing phase begins.
#[derive(Debug)]
pub struct RevealSequencer {
    segments: Vec<String>,
    animate: bool,
    state: RevealState,
    visible: usize,
    composing_delay: Duration,
    pause_delay: Duration,
}

impl RevealSequencer {
    /// Build a sequencer for an advisor reply
    ///
    /// Blank segments have already been filtered by
    /// [`AdvisorReply::segments`]; they are never shown and never count
    /// toward timing.
    pub fn new(reply: &AdvisorReply, animate: bool, config: &RevealConfig) -> Self {
        Self::from_segments(
            reply.segments(),
            animate,
            config.composing_delay(),
            config.pause_delay(),
        )
    }

    /// Build a sequencer from raw segments
    pub fn from_segments(
        segments: Vec<String>,
        animate: bool,
        composing_delay: Duration,
        pause_delay: Duration,
    ) -> Self {
        Self {
            segments,
            animate,
            state: RevealState::Idle,
            visible: 0,
            composing_delay,
            pause_delay,
        }
    }

    /// The segments this sequencer reveals, in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// How many segments are currently visible
    pub fn visible_count(&self) -> usize {
        self.visible
    }

    /// True while the composing indicator is active
    pub fn is_composing(&self) -> bool {
        matches!(self.state, RevealState::Composing(_))
    }

    /// True once the sequence has completed
    pub fn is_done(&self) -> bool {
        self.state == RevealState::Done
    }

    /// Advance the machine one step
    ///
    /// Returns the events emitted by this step and the delay to wait
    /// before the next `advance` call. Advancing a finished sequencer is
    /// a no-op.
    pub fn advance(&mut self) -> RevealStep {
        match self.state {
            RevealState::Done => RevealStep {
                events: Vec::new(),
                delay: None,
            },
            RevealState::Idle => {
                if !self.animate || self.segments.is_empty() {
                    self.visible = self.segments.len();
                    self.state = RevealState::Done;
                    return RevealStep {
                        events: vec![RevealEvent::Completed],
                        delay: None,
                    };
                }
                self.state = RevealState::Composing(0);
                RevealStep {
                    events: vec![RevealEvent::ComposingStarted],
                    delay: Some(self.composing_delay),
                }
            }
            RevealState::Composing(i) => {
                self.visible = i + 1;
                self.state = RevealState::Revealed(i);
                RevealStep {
                    events: vec![RevealEvent::Revealed(i)],
                    delay: Some(self.pause_delay),
                }
            }
            RevealState::Revealed(i) => {
                if i + 1 < self.segments.len() {
                    self.state = RevealState::Composing(i + 1);
                    RevealStep {
                        events: vec![RevealEvent::ComposingStarted],
                        delay: Some(self.composing_delay),
                    }
                } else {
                    self.state = RevealState::Done;
                    RevealStep {
                        events: vec![RevealEvent::Completed],
                        delay: None,
                    }
                }
            }
        }
    }

    /// Run the sequence to completion on a single timer
    ///
    /// Emits every event through `on_event`. Returns early without the
    /// completion event when `cancel` fires mid-sequence.
    pub async fn drive<F>(&mut self, cancel: &CancellationToken, mut on_event: F)
    where
        F: FnMut(RevealEvent),
    {
        loop {
            let step = self.advance();
            for event in step.events {
                on_event(event);
            }
            match step.delay {
                Some(delay) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => return,
            }
        }
    }
}
