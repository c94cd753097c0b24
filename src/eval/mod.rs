//! Scenario files with expectations, run in bulk by the `rehearsal-eval`
//! binary.

pub mod report;
pub mod runner;
pub mod scenario;

pub use report::{CaseReport, EvalReport};
pub use runner::EvalRunner;
pub use scenario::{EvalError, EvalParticipant, EvalScenario, EvalStep, Expectation, ScriptedVerdict};
