// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Runs the scenario suite against every configured root.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use gateway::{GatewayRegistry, OpenedGateway};

use crate::config::{HarnessConfig, HarnessError, Result};
use crate::scenario::{Context, Report, Scenario, ScenarioOutcome, ScenarioResult};
use crate::scratch::with_scratch;
use crate::suite::standard_suite;

pub struct Harness {
    registry: GatewayRegistry,
    scenarios: Vec<Scenario>,
}

impl Harness {
    pub fn new(registry: GatewayRegistry) -> Self {
        Self {
            registry,
            scenarios: standard_suite(),
        }
    }

    /// Replaces the standard suite
    #[must_use]
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn registry(&self) -> &GatewayRegistry {
        &self.registry
    }

    /// Opens every root first, so a declaration error stops the run before
    /// any backend is touched
    pub async fn run(&self, config: &HarnessConfig) -> Result<Report> {
        let opened = config
            .roots
            .iter()
            .map(|root| {
                self.registry.open(root).map_err(|source| HarnessError::Root {
                    root: root.root.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = Report::default();
        for root in &opened {
            report.outcomes.extend(self.run_root(root).await);
        }
        Ok(report)
    }

    /// Scenarios for capabilities the root does not declare are left out of
    /// the report entirely
    pub async fn run_root(&self, opened: &OpenedGateway) -> Vec<ScenarioOutcome> {
        let root_text = opened.root.to_string();
        diagnostics::info!(
            "Checking {root} ({count} capabilities)",
            root: root_text.as_str(),
            count: opened.capabilities.len()
        );

        let mut outcomes = Vec::new();
        for scenario in &self.scenarios {
            if !opened.capabilities.contains(scenario.capability) {
                continue;
            }
            let result = self.run_scenario(opened, scenario).await;
            match &result {
                ScenarioResult::Passed => diagnostics::debug!(
                    "{root} {capability}: passed",
                    root: root_text.as_str(),
                    capability: scenario.capability.as_str()
                ),
                ScenarioResult::Failed { message } => diagnostics::warn!(
                    "{root} {capability}: {message}",
                    root: root_text.as_str(),
                    capability: scenario.capability.as_str(),
                    message: message.as_str()
                ),
                ScenarioResult::Skipped { missing } => diagnostics::info!(
                    "{root} {capability}: skipped, missing {missing}",
                    root: root_text.as_str(),
                    capability: scenario.capability.as_str(),
                    missing: missing.to_string()
                ),
            }
            outcomes.push(ScenarioOutcome {
                root: opened.root.clone(),
                scenario: scenario.name.to_string(),
                capability: scenario.capability,
                result,
            });
        }
        outcomes
    }

    async fn run_scenario(&self, opened: &OpenedGateway, scenario: &Scenario) -> ScenarioResult {
        let missing = scenario.needs().missing_from(&opened.capabilities);
        if !missing.is_empty() {
            return ScenarioResult::Skipped { missing };
        }

        let cx = Context {
            gateway: opened.gateway.clone(),
            root: opened.root.clone(),
            scratch: None,
        };
        let run = scenario.run;
        let body = async move {
            if scenario.uses_scratch {
                with_scratch(&opened.gateway, &opened.root, |scratch| {
                    run(Context {
                        scratch: Some(scratch),
                        ..cx
                    })
                })
                .await
            } else {
                run(cx).await
            }
        };

        match AssertUnwindSafe(body).catch_unwind().await {
            Ok(Ok(())) => ScenarioResult::Passed,
            Ok(Err(e)) => ScenarioResult::Failed {
                message: e.to_string(),
            },
            Err(panic) => ScenarioResult::Failed {
                message: panic_message(panic.as_ref()),
            },
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
