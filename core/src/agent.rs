//! Headless stand-ins for the participant and the display.
//!
//! SimulatedParticipant answers prompts from a fixed policy and advances
//! a ManualClock by its response latency, so whole sessions run in
//! tests and batch mode without a terminal. HeadlessPresenter keeps
//! every screen it was asked to render.

use crate::{
    clock::ManualClock,
    error::{TaskError, TaskResult},
    interface::{InputRequest, InputSource, Key, Presenter, Screen},
    types::Seconds,
};
use std::collections::VecDeque;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    /// Continue `n` times in every trial, then cash out.
    StopAfter(u32),
    /// Let every response window run out.
    AlwaysTimeout,
    /// Answer multi-key prompts from this queue (`None` = let it time out).
    /// Fails with InputClosed once the queue is empty.
    Scripted(VecDeque<Option<Key>>),
    /// Pick choice keys round-robin (point-subtraction task).
    Cycle(Vec<Key>),
}

impl FromStr for Policy {
    type Err = TaskError;

    /// `stop-after:<n>`, `timeout`, or `cycle:<keys>` (e.g. `cycle:shl`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TaskError::InvalidConfig { reason: format!("unknown agent policy '{s}'") };
        match s.split_once(':') {
            Some(("stop-after", n)) => n.parse().map(Self::StopAfter).map_err(|_| invalid()),
            Some(("cycle", keys)) if !keys.is_empty() => {
                Ok(Self::Cycle(keys.chars().map(|c| Key::Char(c.to_ascii_lowercase())).collect()))
            }
            None if s == "timeout" => Ok(Self::AlwaysTimeout),
            _ => Err(invalid()),
        }
    }
}

pub struct SimulatedParticipant {
    policy:    Policy,
    clock:     Option<ManualClock>,
    latency:   Seconds,
    cursor:    usize,
    responses: u64,
}

impl SimulatedParticipant {
    pub fn new(policy: Policy) -> Self {
        Self { policy, clock: None, latency: 0.0, cursor: 0, responses: 0 }
    }

    /// Advance `clock` by `latency` on every answer, and by the full
    /// window on every timeout.
    pub fn with_clock(mut self, clock: ManualClock, latency: Seconds) -> Self {
        self.clock = Some(clock);
        self.latency = latency;
        self
    }

    /// Keys pressed so far, timeouts excluded.
    pub fn responses(&self) -> u64 {
        self.responses
    }

    fn choose(&mut self, request: &InputRequest<'_>) -> TaskResult<Option<Key>> {
        // Acknowledgement and press-counting prompts have a single answer.
        if let [only] = request.accepted {
            return Ok(Some(*only));
        }
        let pick = match &mut self.policy {
            Policy::StopAfter(n) => {
                if request.step < *n { Some(Key::Space) } else { Some(Key::Enter) }
            }
            Policy::AlwaysTimeout => match request.timeout {
                Some(_) => None,
                None => request.accepted.first().copied(),
            },
            Policy::Scripted(queue) => queue.pop_front().ok_or(TaskError::InputClosed)?,
            Policy::Cycle(keys) => {
                let key = keys.get(self.cursor % keys.len().max(1)).copied();
                self.cursor += 1;
                key
            }
        };
        Ok(pick)
    }
}

impl InputSource for SimulatedParticipant {
    fn await_input(&mut self, request: &InputRequest<'_>) -> TaskResult<Option<Key>> {
        let mut pick = self.choose(request)?;
        // Keys outside the accepted set are ignored, as on a real keyboard.
        if let Some(key) = pick {
            if !request.accepted.contains(&key) {
                pick = if request.timeout.is_some() { None } else { request.accepted.first().copied() };
            }
        }

        if let Some(clock) = &self.clock {
            match (pick, request.timeout) {
                (Some(_), Some(window)) => clock.advance(self.latency.min(window)),
                (Some(_), None) => clock.advance(self.latency),
                (None, Some(window)) => clock.advance(window),
                (None, None) => {}
            }
        }
        if pick.is_some() {
            self.responses += 1;
        }
        Ok(pick)
    }
}

/// Records screens instead of drawing them.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    screens: Vec<Screen>,
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn count(&self, pred: impl Fn(&Screen) -> bool) -> usize {
        self.screens.iter().filter(|s| pred(s)).count()
    }
}

impl Presenter for HeadlessPresenter {
    fn render(&mut self, screen: &Screen) -> TaskResult<()> {
        log::trace!("screen: {screen:?}");
        self.screens.push(screen.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;

    const DECISION: [Key; 3] = [Key::Space, Key::Enter, Key::Escape];

    #[test]
    fn stop_after_draws_then_cashes_out() {
        let mut agent = SimulatedParticipant::new(Policy::StopAfter(2));
        let ask = |agent: &mut SimulatedParticipant, step| {
            agent.await_input(&InputRequest::new(&DECISION, Some(5.0), step)).unwrap()
        };
        assert_eq!(ask(&mut agent, 0), Some(Key::Space));
        assert_eq!(ask(&mut agent, 1), Some(Key::Space));
        assert_eq!(ask(&mut agent, 2), Some(Key::Enter));
    }

    #[test]
    fn timeouts_advance_the_clock_by_the_window() {
        let clock = ManualClock::new();
        let mut agent = SimulatedParticipant::new(Policy::AlwaysTimeout).with_clock(clock.clone(), 0.3);

        let pick = agent.await_input(&InputRequest::new(&DECISION, Some(5.0), 0)).unwrap();
        assert_eq!(pick, None);
        assert_eq!(clock.now(), 5.0);

        // Acknowledgements are always answered.
        let ack = agent.await_input(&InputRequest::acknowledge()).unwrap();
        assert_eq!(ack, Some(Key::Enter));
        assert!((clock.now() - 5.3).abs() < 1e-9);
    }

    #[test]
    fn parses_policies() {
        assert_eq!("stop-after:4".parse::<Policy>().unwrap(), Policy::StopAfter(4));
        assert_eq!("timeout".parse::<Policy>().unwrap(), Policy::AlwaysTimeout);
        assert_eq!(
            "cycle:SH".parse::<Policy>().unwrap(),
            Policy::Cycle(vec![Key::Char('s'), Key::Char('h')])
        );
        assert!("draw-forever".parse::<Policy>().is_err());
    }

    #[test]
    fn scripted_queue_runs_dry() {
        let mut agent = SimulatedParticipant::new(Policy::Scripted(VecDeque::from([Some(Key::Space)])));
        assert_eq!(agent.await_input(&InputRequest::new(&DECISION, None, 0)).unwrap(), Some(Key::Space));
        assert!(matches!(
            agent.await_input(&InputRequest::new(&DECISION, None, 1)),
            Err(TaskError::InputClosed)
        ));
    }
}
