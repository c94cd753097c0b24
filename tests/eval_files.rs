use std::path::{Path, PathBuf};

use rehearsal::eval::{EvalRunner, EvalScenario};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scenarios")
}

#[test]
fn loads_every_scenario_file_in_name_order() {
    let scenarios = EvalScenario::load(&fixtures()).unwrap();
    let names: Vec<&str> = scenarios.iter().map(|scenario| scenario.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["vegetarian recipe", "scripted greeting", "provider outage", "missing judge"]
    );
}

#[tokio::test]
async fn fixture_scenarios_meet_their_expectations() {
    // Runs the same files the rehearsal-eval binary would
    let scenarios = EvalScenario::load(&fixtures()).unwrap();
    let report = EvalRunner::new().run(&scenarios).await;

    for case in &report.cases {
        assert!(case.pass, "{} failed: {:?}", case.name, case.failures);
    }
    assert_eq!(report.total, 4);
    assert!(report.all_passed());

    let outage = &report.cases[2];
    let result = outage.result.as_ref().unwrap();
    assert_eq!(result.reasoning, "Agent error: network timeout");
    assert!(report.cases[3].result.is_none());
}

#[tokio::test]
async fn single_file_loads_on_its_own() {
    let path = fixtures().join("02_scripted.yaml");
    let scenarios = EvalScenario::load(&path).unwrap();
    assert_eq!(scenarios.len(), 1);

    let case = EvalRunner::new().run_scenario(&scenarios[0]).await;
    assert!(case.pass, "{:?}", case.failures);
    let result = case.result.unwrap();
    assert_eq!(result.messages[0].text(), Some("You are a cooking assistant."));
}
