//! Task parameters. `Default` carries the standard protocol;
//! a JSON file may override any subset of fields.

use crate::{
    error::{TaskError, TaskResult},
    types::Seconds,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A closed range sampled uniformly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Interval {
    pub min: Seconds,
    pub max: Seconds,
}

impl Interval {
    pub const fn new(min: Seconds, max: Seconds) -> Self {
        Self { min, max }
    }

    /// A degenerate interval that always yields `value`.
    pub const fn fixed(value: Seconds) -> Self {
        Self { min: value, max: value }
    }

    fn check(&self, what: &str) -> TaskResult<()> {
        if self.min < 0.0 || self.max < self.min {
            return Err(invalid(format!("{what}: bad interval [{}, {}]", self.min, self.max)));
        }
        Ok(())
    }
}

// ── Card task ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrcpConfig {
    /// Deck sizes, one per risk level (low, medium, high).
    pub max_draws: Vec<u32>,
    pub trials_per_risk: u32,
    pub practice_trials_per_risk: u32,
    pub response_window: Seconds,
    /// Expected value of every draw under the generated reward schedule.
    pub draw_ev: f64,
    /// Explicit per-risk reward schedules, indexed by draws taken.
    /// Overrides the generated schedule when present.
    pub reward_schedules: Option<Vec<Vec<f64>>>,
    pub deck_colors: Vec<String>,
    pub card_faces: Vec<String>,
    pub reveal_delay: Interval,
    pub timeout_notice: Seconds,
    pub final_hold: Seconds,
}

impl Default for CrcpConfig {
    fn default() -> Self {
        Self {
            max_draws: vec![65, 33, 17],
            trials_per_risk: 30,
            practice_trials_per_risk: 1,
            response_window: 5.0,
            draw_ev: 1.0,
            reward_schedules: None,
            deck_colors: vec!["blue".into(), "green".into(), "orange".into()],
            card_faces: playing_card_faces(),
            reveal_delay: Interval::new(0.7, 1.0),
            timeout_notice: 3.0,
            final_hold: 4.0,
        }
    }
}

fn playing_card_faces() -> Vec<String> {
    const RANKS: [&str; 13] = ["a", "2", "3", "4", "5", "6", "7", "8", "9", "10", "j", "q", "k"];
    const SUITS: [&str; 4] = ["c", "d", "h", "s"];
    SUITS
        .iter()
        .flat_map(|suit| RANKS.iter().map(move |rank| format!("{rank}{suit}")))
        .collect()
}

// ── Balloon task ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BartConfig {
    /// Pump limits, assigned to shapes round-robin.
    pub max_pumps: Vec<u32>,
    pub shape_count: u32,
    pub repetitions: u32,
    pub practice_repetitions: u32,
    pub reward: f64,
    pub response_window: Seconds,
    /// Trial order is the same for every participant.
    pub order_seed: u64,
    pub absent_notice: Seconds,
    pub pop_display: Seconds,
    pub next_round_notice: Seconds,
    pub final_hold: Seconds,
}

impl Default for BartConfig {
    fn default() -> Self {
        Self {
            max_pumps: vec![8, 32, 128],
            shape_count: 13,
            repetitions: 30,
            practice_repetitions: 1,
            reward: 1.0,
            response_window: 15.0,
            order_seed: 52472,
            absent_notice: 5.0,
            pop_display: 1.0,
            next_round_notice: 1.0,
            final_hold: 5.0,
        }
    }
}

// ── Point-subtraction task ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PsapConfig {
    pub task_duration: Seconds,
    pub practice_duration: Seconds,
    pub earn_presses: u32,
    pub deduct_presses: u32,
    pub protect_presses: u32,
    /// Time between steals in condition A.
    pub steal_interval: Interval,
    /// Time between glitches in condition B.
    pub glitch_interval: Interval,
    pub practice_adverse_interval: Seconds,
    pub initial_shield: Interval,
    pub renewed_shield: Interval,
    pub practice_shield: Seconds,
    pub outcome_interval: Interval,
    pub button_colors: Vec<String>,
    /// Added to the participant id to label the fictitious opponent.
    pub opponent_offset: u64,
}

impl Default for PsapConfig {
    fn default() -> Self {
        Self {
            task_duration: 1500.0,
            practice_duration: 90.0,
            earn_presses: 30,
            deduct_presses: 10,
            protect_presses: 10,
            steal_interval: Interval::new(6.0, 60.0),
            glitch_interval: Interval::new(400.0, 500.0),
            practice_adverse_interval: 20.0,
            initial_shield: Interval::new(4.0, 5.8),
            renewed_shield: Interval::new(4.5, 5.5),
            practice_shield: 4.0,
            outcome_interval: Interval::new(0.9, 1.1),
            button_colors: vec!["#9E005D".into(), "#2E5892".into(), "#F7931E".into()],
            opponent_offset: 2,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub crcp: CrcpConfig,
    pub bart: BartConfig,
    pub psap: PsapConfig,
}

impl TaskConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: TaskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        config.validate()?;
        log::debug!("Loaded task config from {}", path.display());
        Ok(config)
    }

    /// Reject parameters no trial loop can run with.
    pub fn validate(&self) -> TaskResult<()> {
        let crcp = &self.crcp;
        if crcp.max_draws.is_empty() {
            return Err(invalid("crcp.max_draws is empty"));
        }
        if crcp.max_draws.iter().any(|&n| n < 2) {
            return Err(invalid("crcp.max_draws entries must be at least 2"));
        }
        if crcp.deck_colors.len() < crcp.max_draws.len() {
            return Err(invalid("crcp.deck_colors needs one color per risk level"));
        }
        if crcp.card_faces.is_empty() {
            return Err(invalid("crcp.card_faces is empty"));
        }
        if crcp.draw_ev < 0.0 {
            return Err(invalid("crcp.draw_ev must not be negative"));
        }
        if let Some(schedules) = &crcp.reward_schedules {
            if schedules.len() != crcp.max_draws.len() {
                return Err(invalid("crcp.reward_schedules needs one schedule per risk level"));
            }
            for (schedule, &max) in schedules.iter().zip(&crcp.max_draws) {
                if schedule.len() < max as usize {
                    return Err(invalid(format!(
                        "crcp.reward_schedules: {max}-card deck needs {max} rewards, got {}",
                        schedule.len()
                    )));
                }
                if schedule.iter().any(|&r| r < 0.0) {
                    return Err(invalid("crcp.reward_schedules must not contain negative rewards"));
                }
            }
        }
        crcp.reveal_delay.check("crcp.reveal_delay")?;

        let bart = &self.bart;
        if bart.max_pumps.is_empty() || bart.max_pumps.iter().any(|&n| n < 2) {
            return Err(invalid("bart.max_pumps entries must be at least 2"));
        }
        if bart.shape_count == 0 || bart.shape_count > 26 {
            return Err(invalid("bart.shape_count must be between 1 and 26"));
        }
        if bart.reward < 0.0 {
            return Err(invalid("bart.reward must not be negative"));
        }

        let psap = &self.psap;
        if psap.earn_presses == 0 || psap.deduct_presses == 0 || psap.protect_presses == 0 {
            return Err(invalid("psap press thresholds must be at least 1"));
        }
        if psap.button_colors.len() < 3 {
            return Err(invalid("psap.button_colors needs three colors"));
        }
        psap.steal_interval.check("psap.steal_interval")?;
        psap.glitch_interval.check("psap.glitch_interval")?;
        psap.initial_shield.check("psap.initial_shield")?;
        psap.renewed_shield.check("psap.renewed_shield")?;
        psap.outcome_interval.check("psap.outcome_interval")?;
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> TaskError {
    TaskError::InvalidConfig { reason: reason.into() }
}
