//! Bundled scenario files load and play.

use std::path::PathBuf;

use garrison_core::prelude::*;
use garrison_headless::protocol::Response;
use garrison_headless::{run_game, GameConfig, HeadlessConfig, HeadlessRunner, Scenario};

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn bundled_scenarios_parse_and_build() {
    for file in ["crossroads.ron", "open_field.ron"] {
        let scenario = Scenario::load(scenario_path(file)).unwrap();
        let game = scenario.build_match().unwrap();
        assert_eq!(game.owned_count(Faction::Player), 1, "{file}");
        assert_eq!(game.owned_count(Faction::Enemy), 1, "{file}");
        assert!(game.owned_count(Faction::Neutral) > 0, "{file}");
    }
}

#[test]
fn open_field_overrides_rules() {
    let scenario = Scenario::load(scenario_path("open_field.ron")).unwrap();
    assert_eq!(scenario.rules().base_generation_interval_ms, 700);
    assert_eq!(scenario.difficulty, Difficulty::Hard);
    assert_eq!(scenario.autopilot, Some(Difficulty::Medium));
}

#[test]
fn crossroads_session_over_protocol() {
    let scenario = Scenario::resolve(scenario_path("crossroads.ron").to_str().unwrap()).unwrap();
    let mut runner = HeadlessRunner::from_scenario(&scenario, HeadlessConfig::default()).unwrap();

    let input = [
        r#"{"cmd":"select","building":0}"#,
        r#"{"cmd":"order_selected","target":3}"#,
        r#"{"cmd":"tick","count":300}"#,
        r#"{"cmd":"query"}"#,
        r#"{"cmd":"quit"}"#,
    ]
    .join("\n");
    let mut out = Vec::new();
    runner.run(input.as_bytes(), &mut out).unwrap();

    let responses: Vec<Response> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(matches!(responses[0], Response::Ready { tick: 0, .. }));
    assert!(matches!(&responses[1], Response::Ack { cmd } if cmd == "select"));
    assert!(matches!(&responses[2], Response::Ack { cmd } if cmd == "order_selected"));

    let state = responses
        .iter()
        .find_map(|r| match r {
            Response::State(state) => Some(state),
            _ => None,
        })
        .unwrap();
    assert_eq!(state.tick, 300);
    assert_eq!(state.buildings[3].faction, Faction::Player);
    assert!(matches!(responses.last(), Some(Response::Bye)));
}

#[test]
fn crossroads_simulation_is_repeatable() {
    let scenario = Scenario::load(scenario_path("crossroads.ron")).unwrap();
    let config = GameConfig {
        max_duration_ms: 15_000,
        ..GameConfig::with_seed(scenario.seed)
    };
    let a = run_game(&scenario, &config).unwrap();
    let b = run_game(&scenario, &config).unwrap();
    assert_eq!(a.final_state_hash, b.final_state_hash);
    assert_eq!(a.scenario, "crossroads");
}
