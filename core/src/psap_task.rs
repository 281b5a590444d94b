//! Point Subtraction Aggression Paradigm.
//!
//! Every trial the participant picks one of three actions and then has
//! to press its key a number of times before it takes effect:
//!   - Earn:    +1 point.
//!   - Deduct:  takes a point from the (fictitious) opponent; resets the
//!              adverse-event timer, no gain for the participant.
//!   - Protect: raises a shield for a few seconds; resets the adverse-event
//!              and shield timers.
//!
//! Adverse events are driven by timers, not by the opponent:
//!   - Condition A: the opponent "steals" one point every U(6, 60) s.
//!   - Condition B: a "glitch" halves the score every U(400, 500) s.
//!   - Condition C: nothing happens.
//!   - Practice: every 20 s, alternating glitch and steal.
//! An event only fires at the start of a trial and never while shielded.
//!
//! The task runs for a fixed duration; the trial that starts past the
//! limit still completes. One CSV row per completed choice.

use crate::{
    clock::Stopwatch,
    config::{Interval, PsapConfig},
    error::{TaskError, TaskResult},
    interface::{Key, Screen},
    rng::{StreamSlot, TaskRng},
    store::{fmt_time, CsvRecord},
    task::{ExperimentTask, RunOutcome, RunSummary, TaskContext},
    types::{Condition, ParticipantId, Seconds, TaskKind},
};
use serde::Serialize;

const ACTION_KEYS: [Key; 3] = [Key::Char('s'), Key::Char('h'), Key::Char('l')];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum PsapAction {
    Earn,
    Deduct,
    Protect,
}

impl PsapAction {
    pub const ALL: [PsapAction; 3] = [Self::Earn, Self::Deduct, Self::Protect];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Earn => "Earn",
            Self::Deduct => "Deduct",
            Self::Protect => "Protect",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Steal,
    Glitch,
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Which key triggers which action, and the button color behind each key.
/// Shuffled once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionLayout {
    actions: [PsapAction; 3],
    colors:  [String; 3],
}

impl ActionLayout {
    pub fn shuffled(rng: &mut TaskRng, colors: &[String]) -> Self {
        let mut actions = PsapAction::ALL;
        rng.shuffle(&mut actions);
        let mut colors: Vec<String> = colors.iter().take(3).cloned().collect();
        rng.shuffle(&mut colors);
        let [a, b, c]: [String; 3] = colors
            .try_into()
            .unwrap_or_else(|_| [String::new(), String::new(), String::new()]);
        Self { actions, colors: [a, b, c] }
    }

    pub fn actions(&self) -> &[PsapAction; 3] { &self.actions }
    pub fn colors(&self) -> &[String; 3] { &self.colors }

    pub fn action_for(&self, key: Key) -> Option<PsapAction> {
        ACTION_KEYS.iter().position(|&k| k == key).map(|i| self.actions[i])
    }

    pub fn key_for(&self, action: PsapAction) -> Key {
        let slot = self.actions.iter().position(|&a| a == action).unwrap_or(0);
        ACTION_KEYS[slot]
    }

    pub fn options(&self) -> Vec<(Key, PsapAction)> {
        ACTION_KEYS.iter().copied().zip(self.actions.iter().copied()).collect()
    }
}

// ── Adverse-event schedule ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AdverseSchedule {
    condition: Condition,
    practice:  bool,
    steal:     Interval,
    glitch:    Interval,
    practice_interval: Seconds,
}

impl AdverseSchedule {
    pub fn new(condition: Condition, practice: bool, config: &PsapConfig) -> Self {
        Self {
            condition,
            practice,
            steal: config.steal_interval,
            glitch: config.glitch_interval,
            practice_interval: config.practice_adverse_interval,
        }
    }

    /// Seconds until the next event, or `None` when events never fire.
    pub fn next_threshold(&self, rng: &mut TaskRng) -> Option<Seconds> {
        if self.practice {
            return Some(self.practice_interval);
        }
        match self.condition {
            Condition::A => Some(rng.uniform(self.steal.min, self.steal.max)),
            Condition::B => Some(rng.uniform(self.glitch.min, self.glitch.max)),
            Condition::C => None,
        }
    }

    /// Kind of the `incident_number`-th event (1-based).
    pub fn kind_for(&self, incident_number: u32) -> Option<IncidentKind> {
        if self.practice {
            return Some(if incident_number % 2 == 0 { IncidentKind::Steal } else { IncidentKind::Glitch });
        }
        match self.condition {
            Condition::A => Some(IncidentKind::Steal),
            Condition::B => Some(IncidentKind::Glitch),
            Condition::C => None,
        }
    }
}

// ── Score state ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreState {
    pub score:            f64,
    pub shielded:         bool,
    pub incidents:        u32,
    pub last_incident_at: Seconds,
}

impl ScoreState {
    /// Apply an adverse event. Returns the points lost.
    pub fn apply_incident(&mut self, kind: IncidentKind, at: Seconds) -> f64 {
        self.incidents += 1;
        self.last_incident_at = at;
        let lost = match kind {
            IncidentKind::Steal => 1.0,
            IncidentKind::Glitch => self.score / 2.0,
        };
        self.score -= lost;
        lost
    }

    pub fn apply_action(&mut self, action: PsapAction) {
        match action {
            PsapAction::Earn => self.score += 1.0,
            PsapAction::Protect => self.shielded = true,
            PsapAction::Deduct => {}
        }
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PsapRecord {
    pub participant_id:   ParticipantId,
    pub condition:        Condition,
    pub colors:           [String; 3],
    pub actions:          [PsapAction; 3],
    pub choice:           Key,
    pub incidents:        u32,
    pub last_incident_at: Seconds,
    pub start:            Seconds,
    pub end:              Seconds,
}

impl CsvRecord for PsapRecord {
    fn header() -> &'static [&'static str] {
        &[
            "id", "condition", "color_01", "color_02", "color_03", "action_01", "action_02",
            "action_03", "choice", "n_incidents", "t_last_incident", "start", "end",
        ]
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![self.participant_id.to_string(), self.condition.to_string()];
        fields.extend(self.colors.iter().cloned());
        fields.extend(self.actions.iter().map(|a| a.name().to_string()));
        fields.push(self.choice.label());
        fields.push(self.incidents.to_string());
        fields.push(fmt_time(self.last_incident_at));
        fields.push(fmt_time(self.start));
        fields.push(fmt_time(self.end));
        fields
    }
}

// ── Task ─────────────────────────────────────────────────────────────────────

pub struct PsapTask {
    config:    PsapConfig,
    condition: Condition,
    practice:  bool,
}

impl PsapTask {
    pub fn new(config: PsapConfig, condition: Condition, practice: bool) -> Self {
        Self { config, condition, practice }
    }

    pub fn duration(&self) -> Seconds {
        if self.practice {
            self.config.practice_duration
        } else {
            self.config.task_duration
        }
    }

    pub fn press_threshold(&self, action: PsapAction) -> u32 {
        match action {
            PsapAction::Earn => self.config.earn_presses,
            PsapAction::Deduct => self.config.deduct_presses,
            PsapAction::Protect => self.config.protect_presses,
        }
    }

    pub fn opponent_label(&self, participant_id: ParticipantId) -> String {
        if self.practice {
            "PRACTICE".to_string()
        } else {
            participant_id.saturating_add(self.config.opponent_offset).to_string()
        }
    }

    fn initial_shield(&self, rng: &mut TaskRng) -> Seconds {
        if self.practice {
            self.config.practice_shield
        } else {
            rng.uniform(self.config.initial_shield.min, self.config.initial_shield.max)
        }
    }
}

impl ExperimentTask for PsapTask {
    fn kind(&self) -> TaskKind { TaskKind::Psap }

    fn header(&self) -> &'static [&'static str] { PsapRecord::header() }

    fn run(&mut self, ctx: &mut TaskContext<'_>) -> TaskResult<RunOutcome> {
        let mut layout_rng = ctx.rng_bank.for_stream(StreamSlot::StimulusLayout);
        let mut adverse_rng = ctx.rng_bank.for_stream(StreamSlot::Adverse);
        let mut shield_rng = ctx.rng_bank.for_stream(StreamSlot::Shield);
        let mut timing_rng = ctx.rng_bank.for_stream(StreamSlot::Timing);

        let layout = ActionLayout::shuffled(&mut layout_rng, &self.config.button_colors);
        let schedule = AdverseSchedule::new(self.condition, self.practice, &self.config);
        let participant_id = ctx.session.participant_id;
        let opponent = self.opponent_label(participant_id);
        let duration = self.duration();

        log::info!(
            "psap: participant={participant_id} condition={} practice={} layout={:?}",
            self.condition,
            self.practice,
            layout.actions()
        );

        if !self.practice {
            ctx.acknowledge(&Screen::Lobby {
                player: participant_id.to_string(),
                opponent: opponent.clone(),
            })?;
        }

        let mut state = ScoreState::default();
        let mut adverse_threshold = schedule.next_threshold(&mut adverse_rng);
        let mut shield_threshold = self.initial_shield(&mut shield_rng);

        let task_clock = Stopwatch::start(ctx.clock);
        let mut adverse_clock = Stopwatch::start(ctx.clock);
        let mut shield_clock = Stopwatch::start(ctx.clock);

        let mut choices: u32 = 0;
        let mut rows: u64 = 0;
        let mut finished = false;
        let mut choice_keys = ACTION_KEYS.to_vec();
        choice_keys.push(Key::Escape);

        while !finished {
            let trial_start = task_clock.elapsed(ctx.clock);
            let outcome_interval =
                timing_rng.uniform(self.config.outcome_interval.min, self.config.outcome_interval.max);

            if trial_start > duration {
                finished = true;
            }

            // Adverse event, unless shielded.
            if let Some(threshold) = adverse_threshold {
                if adverse_clock.elapsed(ctx.clock) > threshold && !state.shielded {
                    if let Some(kind) = schedule.kind_for(state.incidents + 1) {
                        let lost = state.apply_incident(kind, task_clock.elapsed(ctx.clock));
                        log::debug!(
                            "psap: incident #{} {:?} lost={lost:.2} score={:.2}",
                            state.incidents, kind, state.score
                        );
                        ctx.show_for(
                            &Screen::Incident { kind, opponent: opponent.clone(), lost, score: state.score },
                            outcome_interval,
                        )?;
                    }
                    adverse_threshold = schedule.next_threshold(&mut adverse_rng);
                    adverse_clock.reset(ctx.clock);
                }
            }

            // Shield wears off.
            if state.shielded && shield_clock.elapsed(ctx.clock) > shield_threshold {
                shield_threshold =
                    shield_rng.uniform(self.config.renewed_shield.min, self.config.renewed_shield.max);
                shield_clock.reset(ctx.clock);
                state.shielded = false;
            }

            let choice = ctx
                .prompt(
                    &Screen::ActionChoice {
                        score: state.score,
                        options: layout.options(),
                        shielded: state.shielded,
                    },
                    &choice_keys,
                    None,
                    0,
                )?
                .ok_or(TaskError::InputClosed)?;

            if choice == Key::Escape {
                return Ok(ctx.aborted(choices + 1));
            }
            let Some(action) = layout.action_for(choice) else {
                continue;
            };
            choices += 1;

            // The choosing press counts as the first of the threshold.
            let threshold = self.press_threshold(action);
            let action_key = [choice];
            let mut presses = 1;
            while presses < threshold {
                ctx.prompt(
                    &Screen::ActionProgress { action, key: choice, presses, threshold },
                    &action_key,
                    None,
                    presses,
                )?
                .ok_or(TaskError::InputClosed)?;
                presses += 1;
            }
            let trial_stop = ctx.clock.now();

            ctx.store.append(&PsapRecord {
                participant_id,
                condition: self.condition,
                colors: layout.colors().clone(),
                actions: *layout.actions(),
                choice,
                incidents: state.incidents,
                last_incident_at: state.last_incident_at,
                start: trial_start,
                end: trial_stop,
            })?;
            rows += 1;

            state.apply_action(action);
            match action {
                PsapAction::Protect => {
                    adverse_clock.reset(ctx.clock);
                    shield_clock.reset(ctx.clock);
                }
                PsapAction::Deduct => adverse_clock.reset(ctx.clock),
                PsapAction::Earn => {}
            }
            ctx.show_for(&Screen::ActionOutcome { action, score: state.score }, outcome_interval)?;
        }

        ctx.show_for(
            &Screen::Final { task: TaskKind::Psap, total: state.score, practice: self.practice },
            0.0,
        )?;

        log::info!(
            "psap: finished choices={choices} score={:.2} incidents={}",
            state.score,
            state.incidents
        );

        Ok(RunOutcome::Completed(RunSummary {
            task: TaskKind::Psap,
            trials: choices,
            rows_written: rows,
            total: state.score,
            failures: 0,
            timeouts: 0,
            incidents: state.incidents,
            ended_at: ctx.clock.now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngBank;

    #[test]
    fn glitch_halves_and_steal_subtracts() {
        let mut state = ScoreState { score: 10.0, ..Default::default() };

        assert_eq!(state.apply_incident(IncidentKind::Glitch, 5.0), 5.0);
        assert_eq!(state.score, 5.0);

        assert_eq!(state.apply_incident(IncidentKind::Steal, 9.0), 1.0);
        assert_eq!(state.score, 4.0);
        assert_eq!(state.incidents, 2);
        assert_eq!(state.last_incident_at, 9.0);
    }

    #[test]
    fn practice_alternates_glitch_and_steal() {
        let schedule = AdverseSchedule::new(Condition::C, true, &PsapConfig::default());
        assert_eq!(schedule.kind_for(1), Some(IncidentKind::Glitch));
        assert_eq!(schedule.kind_for(2), Some(IncidentKind::Steal));
        assert_eq!(schedule.kind_for(3), Some(IncidentKind::Glitch));
    }

    #[test]
    fn neutral_condition_never_fires() {
        let mut rng = RngBank::new(1).for_stream(StreamSlot::Adverse);
        let schedule = AdverseSchedule::new(Condition::C, false, &PsapConfig::default());
        assert_eq!(schedule.next_threshold(&mut rng), None);
        assert_eq!(schedule.kind_for(1), None);
    }

    #[test]
    fn layout_maps_every_key_to_a_distinct_action() {
        let mut rng = RngBank::new(77).for_stream(StreamSlot::StimulusLayout);
        let layout = ActionLayout::shuffled(&mut rng, &PsapConfig::default().button_colors);

        let mut seen: Vec<PsapAction> = ACTION_KEYS
            .iter()
            .map(|&k| layout.action_for(k).expect("mapped key"))
            .collect();
        seen.sort_by_key(|a| a.name());
        seen.dedup();
        assert_eq!(seen.len(), 3);

        for action in PsapAction::ALL {
            assert_eq!(layout.action_for(layout.key_for(action)), Some(action));
        }
        assert_eq!(layout.action_for(Key::Space), None);
    }

    #[test]
    fn opponent_label_saturates_at_the_largest_id() {
        let task = PsapTask::new(PsapConfig::default(), Condition::A, false);
        assert_eq!(task.opponent_label(20), "22");
        assert_eq!(task.opponent_label(u64::MAX), u64::MAX.to_string());

        let practice = PsapTask::new(PsapConfig::default(), Condition::A, true);
        assert_eq!(practice.opponent_label(u64::MAX), "PRACTICE");
    }
}
