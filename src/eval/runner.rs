use crate::{
    error::ScenarioError,
    eval::{
        report::{CaseReport, EvalReport},
        scenario::{EvalScenario, Expectation},
    },
    scenario::ScenarioRunner,
    verdict::ScenarioResult,
};

/// Runs file-defined scenarios one after another and checks each outcome
/// against its expectation.
#[derive(Clone, Default)]
pub struct EvalRunner {
    runner: ScenarioRunner,
    verbose: bool,
}

impl EvalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner used for every case, e.g. one reporting to an event bus.
    pub fn with_runner(mut self, runner: ScenarioRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub async fn run(&self, scenarios: &[EvalScenario]) -> EvalReport {
        let mut cases = Vec::with_capacity(scenarios.len());
        let mut passed = 0;

        for scenario in scenarios {
            let case = self.run_scenario(scenario).await;
            if case.pass {
                passed += 1;
            }
            cases.push(case);
        }

        EvalReport {
            total: scenarios.len(),
            passed,
            cases,
        }
    }

    pub async fn run_scenario(&self, scenario: &EvalScenario) -> CaseReport {
        let config = scenario.to_config().with_verbose(self.verbose);
        let outcome = self.runner.run(config).await;

        let failures = check(&scenario.expect, &outcome);
        tracing::debug!(case = %scenario.name, failures = failures.len(), "eval case checked");

        CaseReport {
            name: scenario.name.clone(),
            pass: failures.is_empty(),
            failures,
            result: outcome.ok(),
        }
    }
}

fn check(expect: &Expectation, outcome: &Result<ScenarioResult, ScenarioError>) -> Vec<String> {
    let mut failures = Vec::new();

    let result = match (outcome, &expect.error_contains) {
        (Err(error), Some(needle)) => {
            if !error.to_string().contains(needle.as_str()) {
                failures.push(format!("error '{error}' does not contain '{needle}'"));
            }
            return failures;
        }
        (Err(error), None) => {
            failures.push(format!("scenario error: {error}"));
            return failures;
        }
        (Ok(_), Some(needle)) => {
            failures.push(format!("expected an error containing '{needle}', but the run completed"));
            return failures;
        }
        (Ok(result), None) => result,
    };

    if let Some(success) = expect.success {
        if result.success != success {
            failures.push(format!(
                "expected success={success}, got success={} ({})",
                result.success, result.reasoning
            ));
        }
    }

    if let Some(needle) = &expect.reasoning_contains {
        if !result.reasoning.contains(needle.as_str()) {
            failures.push(format!("reasoning '{}' does not contain '{needle}'", result.reasoning));
        }
    }

    if let Some(expected) = expect.history_len {
        if result.messages.len() != expected {
            failures.push(format!(
                "expected {expected} messages in history, got {}",
                result.messages.len()
            ));
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(yaml: &str) -> EvalScenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn reports_expectation_mismatches() {
        let case = scenario(
            r#"
name: turn limit
description: nobody concludes
max_turns: 2
participants:
  - { name: user, roles: [user], repeat: hi }
  - { name: bot, roles: [agent], repeat: ok }
expect:
  success: true
  history_len: 4
"#,
        );

        let report = EvalRunner::new().run(&[case]).await;
        assert_eq!(report.total, 1);
        assert!(!report.all_passed());
        let failures = &report.cases[0].failures;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("maximum turns (2)"));
    }

    #[tokio::test]
    async fn expected_configuration_errors_pass() {
        let case = scenario(
            r#"
name: no judge
description: script asks for a judge that does not exist
participants:
  - { name: bot, roles: [agent], repeat: ok }
script:
  - action: judge
expect:
  error_contains: JudgeAgent
"#,
        );

        let report = EvalRunner::new().run(&[case]).await;
        assert!(report.all_passed(), "{:?}", report.cases[0].failures);
        assert!(report.cases[0].result.is_none());
    }
}
