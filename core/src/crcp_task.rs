//! Cumulative Risk Card Paradigm.
//!
//! The participant draws cards from a deck of known size. Every deck
//! holds one bad card; drawing it ends the deck and empties the pot.
//! The participant can bank the pot at any point instead.
//!
//! Per session:
//!   1. Each risk level is repeated `trials_per_risk` times and the
//!      resulting deck sequence is shuffled.
//!   2. Deck colors are shuffled across risk levels.
//!   3. Each deck gets its own face sequence from the face pool.
//!
//! One CSV row per resolved input (draw, cash-out or timeout).

use crate::{
    config::CrcpConfig,
    error::TaskResult,
    interface::{InputRequest, Key, Screen},
    rng::{StreamSlot, TaskRng},
    store::{fmt_points, fmt_time, CsvRecord},
    task::{ExperimentTask, RunOutcome, RunSummary, TaskContext},
    trial::{Bank, Resolution, RiskTrial, TrialInput},
    types::{ParticipantId, Seconds, TaskKind},
};

const KEYS: [Key; 3] = [Key::Space, Key::Enter, Key::Escape];

// ── Records ──────────────────────────────────────────────────────────────────

/// What the participant saw after the input.
#[derive(Debug, Clone, PartialEq)]
pub enum CardShown {
    None,
    Bad,
    Face(String),
}

impl CardShown {
    fn label(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Bad => "bad",
            Self::Face(face) => face,
        }
    }
}

/// Choice codes used by the analysis scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceCode {
    CashOut = 0,
    Draw = 1,
    NoResponse = 99,
}

/// `failed` column: True / False, or 99 when nothing was chosen.
fn failed_label(failed: Option<bool>) -> &'static str {
    match failed {
        Some(true) => "True",
        Some(false) => "False",
        None => "99",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrcpRecord {
    pub participant_id: ParticipantId,
    pub deck_id:        usize,
    pub risk:           u32,
    pub color:          String,
    pub card:           CardShown,
    pub reward:         f64,
    pub pot:            f64,
    pub draws:          u32,
    pub choice:         ChoiceCode,
    pub failed:         Option<bool>,
    pub start:          Seconds,
    pub end:            Seconds,
}

impl CsvRecord for CrcpRecord {
    fn header() -> &'static [&'static str] {
        &["id", "deck_id", "risk", "color", "card", "reward", "pot", "draw", "choice", "failed", "start", "end"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.participant_id.to_string(),
            self.deck_id.to_string(),
            self.risk.to_string(),
            self.color.clone(),
            self.card.label().to_string(),
            fmt_points(self.reward),
            fmt_points(self.pot),
            self.draws.to_string(),
            (self.choice as u8).to_string(),
            failed_label(self.failed).to_string(),
            fmt_time(self.start),
            fmt_time(self.end),
        ]
    }
}

// ── Reward schedule ──────────────────────────────────────────────────────────

/// Reward for each draw of a `max_draws` deck, indexed by draws taken.
///
/// The expected gain of every draw is held at `ev`: a draw that survives
/// with probability (n-1)/n pays ev·n/(n-1), rounded to cents. The last
/// card cannot survive and pays 0.
pub fn reward_schedule(max_draws: u32, ev: f64) -> Vec<f64> {
    (0..max_draws)
        .map(|taken| {
            let remaining = (max_draws - taken) as f64;
            if remaining <= 1.0 {
                0.0
            } else {
                round_cents(ev * remaining / (remaining - 1.0))
            }
        })
        .collect()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Task ─────────────────────────────────────────────────────────────────────

pub struct CrcpTask {
    config:   CrcpConfig,
    practice: bool,
}

impl CrcpTask {
    pub fn new(config: CrcpConfig, practice: bool) -> Self {
        Self { config, practice }
    }

    pub fn trials_per_risk(&self) -> u32 {
        if self.practice {
            self.config.practice_trials_per_risk
        } else {
            self.config.trials_per_risk
        }
    }

    /// Risk-level index for every deck of the session, in play order.
    pub fn deck_sequence(&self, rng: &mut TaskRng) -> Vec<usize> {
        let per_risk = self.trials_per_risk() as usize;
        let mut sequence: Vec<usize> = (0..self.config.max_draws.len())
            .flat_map(|risk| std::iter::repeat(risk).take(per_risk))
            .collect();
        rng.shuffle(&mut sequence);
        sequence
    }

    fn schedule_for(&self, risk: usize) -> Vec<f64> {
        match &self.config.reward_schedules {
            Some(schedules) => schedules[risk].clone(),
            None => reward_schedule(self.config.max_draws[risk], self.config.draw_ev),
        }
    }
}

impl ExperimentTask for CrcpTask {
    fn kind(&self) -> TaskKind { TaskKind::Crcp }

    fn header(&self) -> &'static [&'static str] { CrcpRecord::header() }

    fn run(&mut self, ctx: &mut TaskContext<'_>) -> TaskResult<RunOutcome> {
        let mut order_rng = ctx.rng_bank.for_stream(StreamSlot::TrialOrder);
        let mut layout_rng = ctx.rng_bank.for_stream(StreamSlot::StimulusLayout);
        let mut face_rng = ctx.rng_bank.for_stream(StreamSlot::CardFaces);
        let mut risk_rng = ctx.rng_bank.for_stream(StreamSlot::RiskCheck);
        let mut timing_rng = ctx.rng_bank.for_stream(StreamSlot::Timing);

        let sequence = self.deck_sequence(&mut order_rng);
        let mut colors = self.config.deck_colors.clone();
        layout_rng.shuffle(&mut colors);
        let schedules: Vec<Vec<f64>> =
            (0..self.config.max_draws.len()).map(|risk| self.schedule_for(risk)).collect();
        let window = self.config.response_window;

        log::info!(
            "crcp: participant={} decks={} practice={}",
            ctx.session.participant_id,
            sequence.len(),
            self.practice
        );

        let mut bank = Bank::new();
        let mut rows: u64 = 0;

        for (deck_number, &risk) in sequence.iter().enumerate() {
            let max_draws = self.config.max_draws[risk];
            let color = colors[risk].clone();
            let faces = face_rng.sample(&self.config.card_faces, max_draws as usize);
            let schedule = &schedules[risk];
            let mut trial = RiskTrial::new(deck_number as u32, max_draws);

            while !trial.is_finished() {
                let step = trial.steps();
                let draw_value = schedule.get(step as usize).copied().unwrap_or(0.0);

                let screen = Screen::CardDecision {
                    deck_color: color.clone(),
                    cards_left: trial.remaining(),
                    draw_value,
                    pot: trial.pot(),
                };
                ctx.presenter.render(&screen)?;
                trial.begin_wait()?;
                let start = ctx.clock.now();
                let key = ctx.input.await_input(&InputRequest::new(&KEYS, Some(window), step))?;

                let input = match key {
                    None => None,
                    Some(Key::Escape) => return Ok(ctx.aborted(deck_number as u32 + 1)),
                    Some(Key::Enter) => Some(TrialInput::CashOut),
                    Some(_) => Some(TrialInput::Continue),
                };
                let end = if input.is_some() { ctx.clock.now() } else { 0.0 };
                let outcome = trial.resolve(input, draw_value, &mut risk_rng)?;

                let (card, reward, choice, failed) = match outcome.resolution {
                    Resolution::Continued => (
                        CardShown::Face(faces[(outcome.steps - 1) as usize].clone()),
                        draw_value,
                        ChoiceCode::Draw,
                        Some(false),
                    ),
                    Resolution::Failed => (CardShown::Bad, 0.0, ChoiceCode::Draw, Some(true)),
                    Resolution::CashedOut => (CardShown::None, draw_value, ChoiceCode::CashOut, Some(false)),
                    Resolution::TimedOut => (CardShown::None, draw_value, ChoiceCode::NoResponse, None),
                };

                if outcome.resolution.is_terminal() {
                    bank.settle(&mut trial)?;
                }

                ctx.store.append(&CrcpRecord {
                    participant_id: ctx.session.participant_id,
                    deck_id: risk,
                    risk: max_draws,
                    color: color.clone(),
                    card: card.clone(),
                    reward,
                    pot: trial.pot(),
                    draws: trial.steps(),
                    choice,
                    failed,
                    start,
                    end,
                })?;
                rows += 1;
                trial.mark_logged()?;

                let reveal = timing_rng.uniform(self.config.reveal_delay.min, self.config.reveal_delay.max);
                match outcome.resolution {
                    Resolution::Continued => {
                        ctx.show_for(&Screen::CardDrawn { card: card.label().to_string(), reward }, reveal)?;
                    }
                    Resolution::Failed => {
                        ctx.show_for(&Screen::CardDrawn { card: card.label().to_string(), reward: 0.0 }, reveal)?;
                        ctx.acknowledge(&Screen::BankSummary { collected: 0.0, total: bank.total(), lost: true })?;
                    }
                    Resolution::TimedOut => {
                        ctx.show_for(&Screen::TimedOut { task: TaskKind::Crcp }, self.config.timeout_notice)?;
                        ctx.acknowledge(&Screen::BankSummary { collected: 0.0, total: bank.total(), lost: true })?;
                    }
                    Resolution::CashedOut => {
                        ctx.acknowledge(&Screen::BankSummary {
                            collected: bank.last_settled(),
                            total: bank.total(),
                            lost: false,
                        })?;
                    }
                }

                trial.advance()?;
            }
        }

        ctx.show_for(
            &Screen::Final { task: TaskKind::Crcp, total: bank.total(), practice: self.practice },
            self.config.final_hold,
        )?;

        log::info!(
            "crcp: finished decks={} total={:.2} failures={} timeouts={}",
            bank.settled_trials(),
            bank.total(),
            bank.failures(),
            bank.timeouts()
        );

        Ok(RunOutcome::Completed(RunSummary {
            task: TaskKind::Crcp,
            trials: bank.settled_trials(),
            rows_written: rows,
            total: bank.total(),
            failures: bank.failures(),
            timeouts: bank.timeouts(),
            incidents: 0,
            ended_at: ctx.clock.now(),
        }))
    }
}
