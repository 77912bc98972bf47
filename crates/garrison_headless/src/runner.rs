//! Headless runner: one match driven by JSON-line commands.

use std::io::{self, BufRead, Write};

use garrison_core::prelude::*;

use crate::game_runner::DEFAULT_TICK_MS;
use crate::protocol::{Command, Response};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Output state after every `tick` command (vs only on `query`).
    pub auto_state_output: bool,
    /// Milliseconds per tick when a `tick` command names none.
    pub tick_ms: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            auto_state_output: false,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

/// Drives a [`Match`] from protocol commands.
#[derive(Debug)]
pub struct HeadlessRunner {
    game: Match,
    config: HeadlessConfig,
    game_over_sent: bool,
    quit: bool,
}

impl HeadlessRunner {
    /// Create a runner around `game`.
    #[must_use]
    pub fn new(game: Match, config: HeadlessConfig) -> Self {
        Self {
            game,
            config,
            game_over_sent: false,
            quit: false,
        }
    }

    /// Create a runner for `scenario`.
    pub fn from_scenario(
        scenario: &Scenario,
        config: HeadlessConfig,
    ) -> Result<Self, ScenarioError> {
        Ok(Self::new(scenario.build_match()?, config))
    }

    /// The match being driven.
    #[must_use]
    pub const fn game(&self) -> &Match {
        &self.game
    }

    /// Whether `quit` was received.
    #[must_use]
    pub const fn has_quit(&self) -> bool {
        self.quit
    }

    /// Run the command loop until `quit` or end of input.
    ///
    /// Writes `ready` first and flushes after every command.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &Response::ready(self.game.tick_count()))?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            for response in self.handle_line(line) {
                write_response(&mut output, &response)?;
            }
            output.flush()?;
            if self.quit {
                break;
            }
        }

        if !self.quit {
            tracing::debug!("Input closed without quit");
        }
        Ok(())
    }

    /// Parse and apply one line.
    pub fn handle_line(&mut self, line: &str) -> Vec<Response> {
        match Command::from_json(line) {
            Ok(cmd) => self.handle(cmd),
            Err(e) => {
                tracing::debug!(error = %e, "Unparseable command");
                vec![Response::error(format!("Parse error: {e}"), None)]
            }
        }
    }

    /// Apply one command.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();
        tracing::debug!(cmd = name, "Command");
        match cmd {
            Command::Tick { count, ms } => self.tick(count, ms.unwrap_or(self.config.tick_ms)),
            Command::Query => vec![Response::state(&self.game)],
            Command::Select { building } => {
                vec![Response::outcome(name, self.game.select_building(BuildingId(building)))]
            }
            Command::Order { source, target } => vec![Response::outcome(
                name,
                self.game.issue_order(BuildingId(source), BuildingId(target)),
            )],
            Command::OrderSelected { target } => {
                vec![Response::outcome(name, self.game.order_selected(BuildingId(target)))]
            }
            Command::Upgrade { building } => {
                vec![Response::outcome(name, self.game.request_upgrade(BuildingId(building)))]
            }
            Command::SetDifficulty { difficulty } => match difficulty.parse::<Difficulty>() {
                Ok(level) => vec![Response::outcome(name, self.game.set_difficulty(level))],
                Err(e) => vec![Response::error(e.to_string(), Some(name))],
            },
            Command::Reset => {
                self.game.reset();
                self.game_over_sent = false;
                vec![Response::ack(name)]
            }
            Command::Hash => vec![Response::StateHash {
                tick: self.game.tick_count(),
                hash: self.game.state_hash(),
            }],
            Command::Quit => {
                self.quit = true;
                vec![Response::Bye]
            }
        }
    }

    fn tick(&mut self, count: u32, tick_ms: u32) -> Vec<Response> {
        let mut events = Vec::new();
        for _ in 0..count {
            events.extend(self.game.tick(tick_ms).events);
            if self.game.is_over() {
                break;
            }
        }

        let mut responses = Vec::new();
        if !events.is_empty() {
            responses.push(Response::Events {
                tick: self.game.tick_count(),
                events,
            });
        }
        if self.config.auto_state_output {
            responses.push(Response::state(&self.game));
        } else {
            responses.push(Response::ack("tick"));
        }
        if !self.game_over_sent {
            if let Some(over) = Response::game_over(&self.game) {
                self.game_over_sent = true;
                responses.push(over);
            }
        }
        responses
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GameResult;
    use garrison_test_utils::fixtures::frozen_duel;

    fn runner(game: Match) -> HeadlessRunner {
        HeadlessRunner::new(game, HeadlessConfig::default())
    }

    #[test]
    fn test_session_over_buffers() {
        let input = concat!(
            r#"{"cmd":"order","source":0,"target":2}"#,
            "\n",
            r#"{"cmd":"tick","count":10}"#,
            "\n\n",
            r#"{"cmd":"hash"}"#,
            "\n",
            r#"{"cmd":"quit"}"#,
            "\n",
            r#"{"cmd":"query"}"#,
            "\n",
        );
        let mut out = Vec::new();
        let mut r = runner(frozen_duel(8, 1, 5, 2));
        r.run(input.as_bytes(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains(r#""type":"ready""#));
        assert!(lines[1].contains(r#""type":"ack""#));
        assert!(lines.iter().any(|l| l.contains(r#""type":"events""#)));
        assert!(lines.iter().any(|l| l.contains(r#""type":"state_hash""#)));
        assert!(lines.last().unwrap().contains(r#""type":"bye""#));
        assert!(r.has_quit());
    }

    #[test]
    fn test_ignored_command_reports_reason() {
        let mut r = runner(frozen_duel(8, 1, 5, 2));
        let responses = r.handle_line(r#"{"cmd":"order","source":1,"target":0}"#);
        assert!(matches!(
            &responses[..],
            [Response::Ignored { cmd, .. }] if cmd == "order"
        ));
    }

    #[test]
    fn test_parse_error() {
        let mut r = runner(frozen_duel(8, 1, 5, 2));
        let responses = r.handle_line(r#"{"cmd":"teleport"}"#);
        assert!(matches!(&responses[..], [Response::Error { cmd: None, .. }]));
    }

    #[test]
    fn test_bad_difficulty() {
        let mut r = runner(frozen_duel(8, 1, 5, 2));
        let responses = r.handle(Command::SetDifficulty {
            difficulty: "brutal".to_string(),
        });
        assert!(matches!(&responses[..], [Response::Error { .. }]));

        let responses = r.handle(Command::SetDifficulty {
            difficulty: "hard".to_string(),
        });
        assert!(matches!(&responses[..], [Response::Ack { .. }]));
        assert_eq!(r.game().difficulty(), Difficulty::Hard);
    }

    #[test]
    fn test_game_over_sent_once() {
        let mut r = runner(frozen_duel(20, 1, 5, 6));
        r.handle(Command::Order { source: 0, target: 1 });

        let mut game_overs = 0;
        for _ in 0..20 {
            for response in r.handle(Command::Tick { count: 50, ms: None }) {
                if let Response::GameOver { result, .. } = response {
                    assert_eq!(result, GameResult::Victory);
                    game_overs += 1;
                }
            }
        }
        assert_eq!(game_overs, 1);

        let responses = r.handle(Command::Upgrade { building: 0 });
        assert!(matches!(&responses[..], [Response::Ignored { .. }]));
    }

    #[test]
    fn test_reset_restores_start() {
        let mut r = runner(frozen_duel(8, 1, 5, 2));
        let start = r.game().state_hash();

        r.handle(Command::Order { source: 0, target: 2 });
        r.handle(Command::Tick { count: 30, ms: None });
        assert_ne!(r.game().state_hash(), start);

        r.handle(Command::Reset);
        assert_eq!(r.game().state_hash(), start);
    }

    #[test]
    fn test_auto_state_output() {
        let config = HeadlessConfig {
            auto_state_output: true,
            ..HeadlessConfig::default()
        };
        let mut r = HeadlessRunner::new(frozen_duel(8, 1, 5, 2), config);
        let responses = r.handle(Command::Tick { count: 1, ms: Some(100) });
        assert!(matches!(responses.last(), Some(Response::State(state)) if state.clock_ms == 100));
    }
}
