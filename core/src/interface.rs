//! The boundary between trial logic and whatever draws the screen.
//!
//! RULE: Tasks never print, sleep on their own, or read the keyboard.
//! They describe what to show with a Screen, hand it to a Presenter,
//! and ask an InputSource for the next key.

use crate::{
    error::TaskResult,
    psap_task::{IncidentKind, PsapAction},
    types::{Seconds, TaskKind},
};
use serde::Serialize;
use std::fmt;

/// A key the participant can press.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    Enter,
    Escape,
    Char(char),
}

impl Key {
    /// Label written to data files and shown in prompts.
    pub fn label(&self) -> String {
        match self {
            Self::Space => "space".to_string(),
            Self::Enter => "return".to_string(),
            Self::Escape => "escape".to_string(),
            Self::Char(c) => c.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Self::Space => f.write_str("SPACE"),
            Self::Enter => f.write_str("ENTER"),
            Self::Escape => f.write_str("ESC"),
        }
    }
}

/// One blocking request for input.
#[derive(Debug, Clone, Copy)]
pub struct InputRequest<'a> {
    /// Keys that resolve the request; everything else is ignored.
    pub accepted: &'a [Key],
    /// Give up after this many seconds. `None` waits forever.
    pub timeout: Option<Seconds>,
    /// Steps already taken in the current trial (draws, pumps, presses).
    pub step: u32,
}

impl<'a> InputRequest<'a> {
    pub fn new(accepted: &'a [Key], timeout: Option<Seconds>, step: u32) -> Self {
        Self { accepted, timeout, step }
    }

    /// A prompt that only continues on ENTER, with no timeout.
    pub fn acknowledge() -> InputRequest<'static> {
        InputRequest { accepted: &[Key::Enter], timeout: None, step: 0 }
    }
}

/// Everything a task can put on screen.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    // ── Card task ───────────────────────────────
    CardDecision {
        deck_color: String,
        cards_left: u32,
        draw_value: f64,
        pot: f64,
    },
    CardDrawn {
        card: String,
        /// 0 when the bad card was drawn and the pot is lost.
        reward: f64,
    },
    BankSummary {
        collected: f64,
        total: f64,
        lost: bool,
    },

    // ── Balloon task ────────────────────────────
    BalloonPrompt {
        shape: String,
        last_collected: f64,
        total: f64,
    },
    BalloonPopped,
    NextRound,

    // ── Point-subtraction task ──────────────────
    Lobby {
        player: String,
        opponent: String,
    },
    ActionChoice {
        score: f64,
        options: Vec<(Key, PsapAction)>,
        shielded: bool,
    },
    ActionProgress {
        action: PsapAction,
        key: Key,
        presses: u32,
        threshold: u32,
    },
    ActionOutcome {
        action: PsapAction,
        score: f64,
    },
    Incident {
        kind: IncidentKind,
        opponent: String,
        lost: f64,
        score: f64,
    },

    // ── Shared ──────────────────────────────────
    TimedOut {
        task: TaskKind,
    },
    Final {
        task: TaskKind,
        total: f64,
        practice: bool,
    },
}

pub trait Presenter {
    fn render(&mut self, screen: &Screen) -> TaskResult<()>;
}

pub trait InputSource {
    /// Block until one of `request.accepted` is pressed.
    /// Returns `None` when the timeout elapses first.
    fn await_input(&mut self, request: &InputRequest<'_>) -> TaskResult<Option<Key>>;
}
