//! List command: fixtures and the scenario catalog

use std::fmt::Write as _;

use select_parity::scenario::filtered;
use select_parity::{default_fixtures, Applicability, FixtureDescriptor, Scenario};
use serde::Serialize;

use crate::commands::ListArgs;
use crate::error::CliResult;

#[derive(Debug, Serialize)]
struct ScenarioEntry<'a> {
    name: &'a str,
    title: &'a str,
    applies_to: String,
}

#[derive(Debug, Serialize)]
struct Listing<'a> {
    fixtures: Vec<FixtureDescriptor>,
    scenarios: Vec<ScenarioEntry<'a>>,
}

fn applies_to(applicability: Applicability) -> String {
    match applicability {
        Applicability::Both => "both".to_string(),
        Applicability::Only(variant) => variant.to_string(),
    }
}

/// Render the listing as text
#[must_use]
pub fn render_list(fixtures: &[FixtureDescriptor], scenarios: &[Scenario]) -> String {
    let mut out = String::from("Fixtures:\n");
    for fixture in fixtures {
        let _ = writeln!(
            out,
            "  {:<8} {:<10} {}",
            fixture.route, fixture.variant, fixture.description
        );
    }
    let _ = writeln!(out, "\nScenarios ({}):", scenarios.len());
    let width = scenarios.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for scenario in scenarios {
        let _ = writeln!(
            out,
            "  {:<width$}  [{}] {}",
            scenario.name,
            applies_to(scenario.applicability),
            scenario.title
        );
    }
    out
}

/// Render the listing as JSON
pub fn render_list_json(fixtures: &[FixtureDescriptor], scenarios: &[Scenario]) -> CliResult<String> {
    let listing = Listing {
        fixtures: fixtures.to_vec(),
        scenarios: scenarios
            .iter()
            .map(|s| ScenarioEntry {
                name: s.name,
                title: s.title,
                applies_to: applies_to(s.applicability),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&listing).map_err(|e| std::io::Error::other(e).into())
}

/// Execute the list command
pub fn execute_list(args: &ListArgs) -> CliResult<String> {
    let fixtures = default_fixtures();
    let scenarios = filtered(args.filter.as_deref());
    if args.json {
        render_list_json(&fixtures, &scenarios)
    } else {
        Ok(render_list(&fixtures, &scenarios))
    }
}
