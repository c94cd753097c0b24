use serde::Serialize;

use crate::verdict::ScenarioResult;

#[derive(Debug, Serialize)]
pub struct EvalReport {
    pub total: usize,
    pub passed: usize,
    pub cases: Vec<CaseReport>,
}

impl EvalReport {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

#[derive(Debug, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub pass: bool,
    pub failures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScenarioResult>,
}
