//! Plain-text front end: screens printed to stdout, keys read as lines.
//!
//! Stdin is read on a helper thread that forwards lines over a channel,
//! so a prompt can give up when its response window runs out.

use aidm_core::{
    error::{TaskError, TaskResult},
    interface::{InputRequest, InputSource, Key, Presenter, Screen},
    psap_task::IncidentKind,
    types::TaskKind,
};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

pub struct TerminalPresenter {
    out: io::Stdout,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self { out: io::stdout() }
    }
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, screen: &Screen) -> TaskResult<()> {
        let mut out = self.out.lock();
        writeln!(out)?;
        match screen {
            Screen::CardDecision { deck_color, cards_left, draw_value, pot } => {
                writeln!(out, "[{deck_color} deck] cards left: {cards_left}")?;
                writeln!(out, "  next card pays {draw_value:.2}   pot: {pot:.2}")?;
                writeln!(out, "  SPACE + ENTER = draw   ENTER = collect   q = quit")?;
            }
            Screen::CardDrawn { card, reward } => {
                if card == "bad" {
                    writeln!(out, "  BAD CARD. The pot is lost.")?;
                } else {
                    writeln!(out, "  {card}: +{reward:.2}")?;
                }
            }
            Screen::BankSummary { collected, total, lost } => {
                if *lost {
                    writeln!(out, "Nothing collected this round. Total: {total:.2}")?;
                } else {
                    writeln!(out, "Collected {collected:.2}. Total: {total:.2}")?;
                }
                writeln!(out, "  ENTER to continue")?;
            }
            Screen::BalloonPrompt { shape, last_collected, total } => {
                writeln!(out, "Balloon [{shape}]   last collected: {last_collected:.2}   total: {total:.2}")?;
                writeln!(out, "  SPACE + ENTER = pump   ENTER = collect   q = quit")?;
            }
            Screen::BalloonPopped => writeln!(out, "  POP!")?,
            Screen::NextRound => writeln!(out, "Next balloon...")?,
            Screen::Lobby { player, opponent } => {
                writeln!(out, "You are player {player}. Connected to player {opponent}.")?;
                writeln!(out, "  ENTER to start")?;
            }
            Screen::ActionChoice { score, options, shielded } => {
                let shield = if *shielded { "   [shield up]" } else { "" };
                writeln!(out, "Score: {score:.2}{shield}")?;
                for (key, action) in options {
                    writeln!(out, "  {key} = {}", action.name())?;
                }
            }
            Screen::ActionProgress { action, key, presses, threshold } => {
                writeln!(out, "  {} {presses}/{threshold}  (press {key})", action.name())?;
            }
            Screen::ActionOutcome { action, score } => {
                writeln!(out, "  {} done. Score: {score:.2}", action.name())?;
            }
            Screen::Incident { kind, opponent, lost, score } => match kind {
                IncidentKind::Steal => {
                    writeln!(out, "Player {opponent} took {lost:.2} point(s). Score: {score:.2}")?
                }
                IncidentKind::Glitch => {
                    writeln!(out, "Connection glitch: lost {lost:.2} point(s). Score: {score:.2}")?
                }
            },
            Screen::TimedOut { task } => match task {
                TaskKind::Bart => writeln!(out, "Too slow. The balloon is gone.")?,
                _ => writeln!(out, "Too slow. The pot is lost.")?,
            },
            Screen::Final { task, total, practice } => {
                let mode = if *practice { " (practice)" } else { "" };
                writeln!(out, "=== {} finished{mode} ===", task.experiment_name())?;
                writeln!(out, "  total: {total:.2}")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

pub struct TerminalInput {
    lines: Receiver<String>,
}

impl TerminalInput {
    /// Spawn the stdin reader. The thread ends when stdin closes.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }
}

/// One line of input as a key. An empty line is ENTER.
pub fn parse_key(line: &str) -> Key {
    match line.trim_end_matches(['\r', '\n']) {
        "" => Key::Enter,
        " " => Key::Space,
        other => match other.trim().to_ascii_lowercase().as_str() {
            "" | "space" => Key::Space,
            "q" | "esc" | "escape" => Key::Escape,
            "enter" | "return" => Key::Enter,
            word => word.chars().next().map(Key::Char).unwrap_or(Key::Enter),
        },
    }
}

impl InputSource for TerminalInput {
    fn await_input(&mut self, request: &InputRequest<'_>) -> TaskResult<Option<Key>> {
        let deadline = request.timeout.map(|t| Instant::now() + Duration::from_secs_f64(t.max(0.0)));
        loop {
            let line = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    match self.lines.recv_timeout(left) {
                        Ok(line) => line,
                        Err(RecvTimeoutError::Timeout) => return Ok(None),
                        Err(RecvTimeoutError::Disconnected) => return Err(TaskError::InputClosed),
                    }
                }
                None => self.lines.recv().map_err(|_| TaskError::InputClosed)?,
            };
            let key = parse_key(&line);
            if request.accepted.contains(&key) {
                return Ok(Some(key));
            }
            log::debug!("ignored key {key:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_map_to_keys() {
        assert_eq!(parse_key(""), Key::Enter);
        assert_eq!(parse_key(" "), Key::Space);
        assert_eq!(parse_key("space"), Key::Space);
        assert_eq!(parse_key("q"), Key::Escape);
        assert_eq!(parse_key("ESC"), Key::Escape);
        assert_eq!(parse_key("S"), Key::Char('s'));
        assert_eq!(parse_key("h\r"), Key::Char('h'));
    }

    #[test]
    fn default_presenter_renders() {
        let mut presenter = TerminalPresenter::default();
        presenter.render(&Screen::NextRound).expect("render to stdout");
    }
}
