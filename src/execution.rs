//! The scenario engine: resolves which participant acts next, advances turns,
//! enforces the turn limit and exposes the scripting primitives.

use std::{fmt, sync::Arc, time::Instant};

use tokio_util::sync::CancellationToken;

use crate::{
    agents::{AgentError, AgentInput, AgentRole, ScenarioInfo},
    error::ScenarioError,
    events::{RunEmitter, RunStatus},
    ids,
    scenario::ScenarioConfig,
    script::{ScriptContent, ScriptStep},
    state::ExecutionState,
    types::{ChatMessage, MessageRole},
    verdict::ScenarioResult,
};

const SCRIPT_EXHAUSTED: &str = "Reached end of script without conclusion, add one of the following to the end of the script:\n\
- `ScriptStep::proceed()` to let the simulation continue to play out\n\
- `ScriptStep::judge()` to force criteria judgement\n\
- `ScriptStep::succeed()` or `ScriptStep::fail()` to end the test with an explicit result";

/// Read-only observer invoked by [`ScenarioExecution::proceed`].
pub type ExecutionHook = Arc<dyn Fn(&ScenarioExecution) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ProceedOptions {
    /// Turns to play before handing control back. `None` runs until a verdict.
    pub turns: Option<usize>,
    /// Runs once per newly started turn.
    pub on_turn: Option<ExecutionHook>,
    /// Runs after every resolved action.
    pub on_step: Option<ExecutionHook>,
}

impl fmt::Debug for ProceedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedOptions")
            .field("turns", &self.turns)
            .field("on_turn", &self.on_turn.is_some())
            .field("on_step", &self.on_step.is_some())
            .finish()
    }
}

impl ProceedOptions {
    pub fn turns(mut self, turns: usize) -> Self {
        self.turns = Some(turns);
        self
    }

    pub fn on_turn<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ScenarioExecution) + Send + Sync + 'static,
    {
        self.on_turn = Some(Arc::new(hook));
        self
    }

    pub fn on_step<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ScenarioExecution) + Send + Sync + 'static,
    {
        self.on_step = Some(Arc::new(hook));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Messages appended to history; the simulation goes on.
    Messages(Vec<ChatMessage>),
    Finished(ScenarioResult),
}

impl StepOutcome {
    pub fn into_result(self) -> Option<ScenarioResult> {
        match self {
            StepOutcome::Messages(_) => None,
            StepOutcome::Finished(result) => Some(result),
        }
    }
}

pub struct ScenarioExecution {
    config: Arc<ScenarioConfig>,
    state: ExecutionState,
    cancellation: CancellationToken,
    emitter: Option<RunEmitter>,
    participant_failed: bool,
}

impl fmt::Debug for ScenarioExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioExecution")
            .field("scenario", &self.config.name)
            .field("state", &self.state)
            .field("participant_failed", &self.participant_failed)
            .finish()
    }
}

impl ScenarioExecution {
    pub fn new(config: impl Into<Arc<ScenarioConfig>>) -> Self {
        let config = config.into();
        let state = fresh_state(&config);
        Self {
            config,
            state,
            cancellation: CancellationToken::new(),
            emitter: None,
            participant_failed: false,
        }
    }

    /// Token handed to every participant call.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Publishes a message snapshot after every history change.
    pub fn with_emitter(mut self, emitter: RunEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn history(&self) -> &[ChatMessage] {
        self.state.history().messages()
    }

    pub fn thread_id(&self) -> &str {
        self.state.thread_id()
    }

    pub fn turn(&self) -> Option<usize> {
        self.state.turn()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn participant_failed(&self) -> bool {
        self.participant_failed
    }

    /// Discards the current state and starts over with a new thread.
    pub fn reset(&mut self) {
        self.state = fresh_state(&self.config);
        self.participant_failed = false;
    }

    /// Resets, then runs the script (a single unbounded `proceed` when none is
    /// configured) and returns the first verdict.
    pub async fn execute(&mut self) -> Result<ScenarioResult, ScenarioError> {
        self.config.validate()?;
        self.reset();

        let config = Arc::clone(&self.config);
        let default_script = [ScriptStep::proceed()];
        let script = config.script.as_deref().unwrap_or(&default_script);

        tracing::debug!(
            scenario = %config.name,
            thread_id = %self.state.thread_id(),
            steps = script.len(),
            "executing scenario"
        );

        for (index, step) in script.iter().enumerate() {
            tracing::debug!(scenario = %config.name, index, step = step.label(), "running script step");
            if let Some(result) = step.run(self).await? {
                let result = self.conclude(result);
                self.state.set_result(result.clone());
                return Ok(result);
            }
        }

        tracing::warn!(scenario = %config.name, "script ended without a verdict");
        Ok(self.max_turns_result(Some(SCRIPT_EXHAUSTED)))
    }

    /// Resolves exactly one role and participant, starting a new turn when
    /// the current one is exhausted.
    pub async fn step(&mut self) -> StepOutcome {
        match self.resolve_next(true, None).await {
            Some(outcome) => outcome,
            None => StepOutcome::Messages(Vec::new()),
        }
    }

    /// Steps until a verdict appears, or until `options.turns` turns have been
    /// played, in which case `None` is returned.
    pub async fn proceed(&mut self, options: ProceedOptions) -> Option<ScenarioResult> {
        let mut initial_turn = self.state.turn();

        loop {
            let advance = match (options.turns, initial_turn, self.state.turn()) {
                (None, _, _) | (_, None, _) => true,
                (Some(turns), Some(initial), Some(turn)) => turn + 1 < initial + turns,
                (Some(_), Some(_), None) => false,
            };

            let outcome = self.resolve_next(advance, options.on_turn.as_ref()).await;
            if initial_turn.is_none() {
                initial_turn = self.state.turn();
            }

            let outcome = outcome?;
            if let Some(hook) = &options.on_step {
                hook(self);
            }
            if let StepOutcome::Finished(result) = outcome {
                return Some(result);
            }
        }
    }

    /// User and assistant messages consume the matching role's slot; any other
    /// role is appended for everyone without touching the turn bookkeeping.
    pub async fn message(&mut self, message: ChatMessage) -> Result<Option<ScenarioResult>, ScenarioError> {
        match message.role {
            MessageRole::User => self.script_call_agent(AgentRole::User, Some(message.into())).await,
            MessageRole::Assistant => {
                self.script_call_agent(AgentRole::Agent, Some(message.into())).await
            }
            MessageRole::System | MessageRole::Tool => {
                self.append(vec![message], None);
                Ok(None)
            }
        }
    }

    pub async fn user(&mut self) -> Result<Option<ScenarioResult>, ScenarioError> {
        self.script_call_agent(AgentRole::User, None).await
    }

    pub async fn user_says(
        &mut self,
        content: impl Into<ScriptContent>,
    ) -> Result<Option<ScenarioResult>, ScenarioError> {
        self.script_call_agent(AgentRole::User, Some(content.into())).await
    }

    pub async fn agent(&mut self) -> Result<Option<ScenarioResult>, ScenarioError> {
        self.script_call_agent(AgentRole::Agent, None).await
    }

    pub async fn agent_says(
        &mut self,
        content: impl Into<ScriptContent>,
    ) -> Result<Option<ScenarioResult>, ScenarioError> {
        self.script_call_agent(AgentRole::Agent, Some(content.into())).await
    }

    /// Asks the next judge for a verdict; the judge may still decline.
    pub async fn judge(&mut self) -> Result<Option<ScenarioResult>, ScenarioError> {
        self.script_call_agent(AgentRole::Judge, None).await
    }

    pub async fn judge_says(
        &mut self,
        content: impl Into<ScriptContent>,
    ) -> Result<Option<ScenarioResult>, ScenarioError> {
        self.script_call_agent(AgentRole::Judge, Some(content.into())).await
    }

    pub fn succeed(&self) -> ScenarioResult {
        self.succeed_with("Scenario marked as successful with succeed()")
    }

    pub fn succeed_with(&self, reasoning: impl Into<String>) -> ScenarioResult {
        self.conclude(ScenarioResult::success(reasoning).with_passed_criteria(self.judge_criteria()))
    }

    pub fn fail(&self) -> ScenarioResult {
        self.fail_with("Scenario marked as failed with fail()")
    }

    pub fn fail_with(&self, reasoning: impl Into<String>) -> ScenarioResult {
        self.conclude(ScenarioResult::failure(reasoning).with_failed_criteria(self.judge_criteria()))
    }

    /// Failure verdict for an exhausted turn budget. `message` replaces the
    /// default reasoning.
    pub fn max_turns_result(&self, message: Option<&str>) -> ScenarioResult {
        let reasoning = match message {
            Some(message) => message.to_string(),
            None => format!(
                "Reached maximum turns ({}) without conclusion",
                self.config.max_turns
            ),
        };
        self.conclude(ScenarioResult::failure(reasoning).with_failed_criteria(self.judge_criteria()))
    }

    /// Status reported for a finished run.
    pub fn run_status(&self, result: &ScenarioResult) -> RunStatus {
        if result.success {
            RunStatus::Success
        } else if self.cancellation.is_cancelled() {
            RunStatus::Cancelled
        } else if self.participant_failed {
            RunStatus::Error
        } else {
            RunStatus::Failed
        }
    }

    async fn resolve_next(
        &mut self,
        advance: bool,
        on_turn: Option<&ExecutionHook>,
    ) -> Option<StepOutcome> {
        loop {
            let Some(&role) = self.state.pending_roles_on_turn().first() else {
                if !advance {
                    return None;
                }

                self.state.new_turn();
                tracing::debug!(
                    scenario = %self.config.name,
                    turn = self.state.turn(),
                    roles = ?self.state.pending_roles_on_turn(),
                    "starting turn"
                );
                if let Some(hook) = on_turn {
                    hook(self);
                }
                if self.reached_max_turns() {
                    tracing::debug!(scenario = %self.config.name, "turn limit reached");
                    return Some(StepOutcome::Finished(self.max_turns_result(None)));
                }
                continue;
            };

            match self.state.next_participant_for_role(role) {
                Some(idx) => {
                    self.state.remove_pending_participant(idx);
                    return Some(self.call_agent(idx, role, false).await);
                }
                None => self.state.remove_pending_role(role),
            }
        }
    }

    async fn script_call_agent(
        &mut self,
        role: AgentRole,
        content: Option<ScriptContent>,
    ) -> Result<Option<ScenarioResult>, ScenarioError> {
        let missing = || ScenarioError::NoParticipantForRole {
            role,
            content: content.as_ref().map(ScriptContent::describe),
        };
        // Nobody declares the role: fail before touching the turn state.
        if !self.state.agents().iter().any(|agent| agent.has_role(role)) {
            return Err(missing());
        }

        self.state.skip_roles_before(role);

        let idx = match self.state.next_participant_for_role(role) {
            Some(idx) => idx,
            None => {
                self.state.new_turn();
                self.state.skip_roles_before(role);
                self.state.next_participant_for_role(role).ok_or_else(missing)?
            }
        };

        self.state.remove_pending_participant(idx);

        if let Some(content) = content {
            self.append(vec![content.into_message(role)], None);
            return Ok(None);
        }

        let outcome = self.call_agent(idx, role, role == AgentRole::Judge).await;
        Ok(outcome.into_result())
    }

    async fn call_agent(&mut self, idx: usize, role: AgentRole, must_render_verdict: bool) -> StepOutcome {
        let agent = Arc::clone(&self.state.agents()[idx]);
        let input = AgentInput {
            thread_id: self.state.thread_id().to_string(),
            history: self.state.history().to_vec(),
            unseen_messages: self.state.pending_messages(idx).to_vec(),
            requested_role: role,
            must_render_verdict,
            turn: self.state.turn().unwrap_or(0) + 1,
            scenario: self.scenario_info(),
            cancellation: self.cancellation.clone(),
        };

        tracing::debug!(
            scenario = %self.config.name,
            participant = agent.name(),
            %role,
            turn = input.turn,
            unseen = input.unseen_messages.len(),
            "calling participant"
        );

        let started = Instant::now();
        let response = agent.call(input).await;
        self.state.add_agent_time(idx, started.elapsed());
        self.state.clear_pending_messages(idx);

        let output = match response {
            Ok(output) => output,
            Err(error) => return StepOutcome::Finished(self.participant_error(agent.name(), &error)),
        };

        match output.into_messages(role) {
            Ok(messages) => {
                self.append(messages.clone(), Some(idx));
                StepOutcome::Messages(messages)
            }
            Err(verdict) => {
                tracing::debug!(
                    scenario = %self.config.name,
                    participant = agent.name(),
                    success = verdict.success,
                    "participant rendered a verdict"
                );
                let verdict = self.conclude(verdict);
                self.state.set_result(verdict.clone());
                StepOutcome::Finished(verdict)
            }
        }
    }

    fn participant_error(&mut self, participant: &str, error: &AgentError) -> ScenarioResult {
        self.participant_failed = true;
        tracing::error!(scenario = %self.config.name, participant, %error, "participant call failed");
        self.conclude(
            ScenarioResult::failure(format!("Agent error: {error}"))
                .with_failed_criteria(self.judge_criteria()),
        )
    }

    fn append(&mut self, messages: Vec<ChatMessage>, from: Option<usize>) {
        if messages.is_empty() {
            return;
        }

        for message in messages {
            if self.config.debug {
                tracing::debug!(
                    scenario = %self.config.name,
                    role = %message.role,
                    content = message.text().unwrap_or_default(),
                    "message appended"
                );
            }
            self.state.add_message(message, from);
        }

        if let Some(emitter) = &self.emitter {
            emitter.message_snapshot(self.state.history().messages());
        }
    }

    fn reached_max_turns(&self) -> bool {
        self.state
            .turn()
            .is_some_and(|turn| turn >= self.config.max_turns)
    }

    fn judge_criteria(&self) -> Vec<String> {
        self.state
            .agents()
            .iter()
            .filter(|agent| agent.has_role(AgentRole::Judge))
            .flat_map(|agent| agent.criteria().iter().cloned())
            .collect()
    }

    fn scenario_info(&self) -> ScenarioInfo {
        ScenarioInfo {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            criteria: self.config.criteria.clone(),
            max_turns: self.config.max_turns,
        }
    }

    /// Stamps the history snapshot and timing onto a verdict.
    fn conclude(&self, result: ScenarioResult) -> ScenarioResult {
        let agent_time = self
            .state
            .agents()
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.has_role(AgentRole::Agent))
            .map(|(idx, _)| self.state.agent_time(idx))
            .sum();

        result
            .with_messages(self.state.history().to_vec())
            .with_timing(self.state.total_time(), agent_time)
    }
}

fn fresh_state(config: &ScenarioConfig) -> ExecutionState {
    let thread_id = config.thread_id.clone().unwrap_or_else(ids::thread_id);
    let mut state = ExecutionState::new(thread_id, config.agents.clone());
    state.new_turn();
    state.reset_turn_counter();
    state
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::agents::{AgentAdapter, AgentOutput, ScriptedAgent};

    fn scenario<const N: usize>(agents: [Arc<dyn AgentAdapter>; N]) -> ScenarioConfig {
        ScenarioConfig::new("dinner", "User asks for a dinner idea").with_agents(agents.to_vec())
    }

    fn bot() -> Arc<ScriptedAgent> {
        Arc::new(ScriptedAgent::new("bot", [AgentRole::Agent]).repeating("ok"))
    }

    fn user() -> Arc<ScriptedAgent> {
        Arc::new(ScriptedAgent::new("user", [AgentRole::User]).repeating("hi"))
    }

    #[tokio::test]
    async fn reset_leaves_turn_zero_with_every_role_pending() {
        let execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>, user()]));
        assert_eq!(execution.turn(), Some(0));
        assert_eq!(
            execution.state().pending_roles_on_turn(),
            &[AgentRole::User, AgentRole::Agent]
        );
        assert!(execution.thread_id().starts_with("thread_"));
    }

    #[tokio::test]
    async fn steps_follow_role_precedence() {
        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>, user()]));

        let first = execution.step().await;
        assert_eq!(first, StepOutcome::Messages(vec![ChatMessage::user("hi")]));
        let second = execution.step().await;
        assert_eq!(second, StepOutcome::Messages(vec![ChatMessage::assistant("ok")]));

        // turn exhausted; the next step opens turn 1
        execution.step().await;
        assert_eq!(execution.turn(), Some(1));
        assert_eq!(execution.history().len(), 3);
    }

    #[tokio::test]
    async fn participants_see_only_what_others_said() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = {
            let seen = Arc::clone(&seen);
            ScriptedAgent::from_fn("bot", [AgentRole::Agent], move |input| {
                seen.lock().unwrap().push(input.unseen_messages.len());
                Ok(AgentOutput::from("ok"))
            })
        };
        let mut execution = ScenarioExecution::new(scenario([Arc::new(recorder) as Arc<dyn AgentAdapter>, user()]));

        execution.proceed(ProceedOptions::default().turns(2)).await;
        // turn 0: the user's "hi"; turn 1: the user's second "hi" only
        assert_eq!(*seen.lock().unwrap(), vec![1, 1]);
    }

    #[tokio::test]
    async fn bounded_proceed_hands_control_back() {
        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>, user()]));

        let result = execution.proceed(ProceedOptions::default().turns(1)).await;
        assert!(result.is_none());
        assert_eq!(execution.turn(), Some(0));
        assert_eq!(execution.history().len(), 2);

        // the bound counts from the current turn, which is already played out
        let result = execution.proceed(ProceedOptions::default().turns(2)).await;
        assert!(result.is_none());
        assert_eq!(execution.turn(), Some(1));
        assert_eq!(execution.history().len(), 4);
    }

    #[tokio::test]
    async fn hooks_fire_per_turn_and_per_step() {
        let turns = Arc::new(AtomicUsize::new(0));
        let steps = Arc::new(AtomicUsize::new(0));
        let options = {
            let turns = Arc::clone(&turns);
            let steps = Arc::clone(&steps);
            ProceedOptions::default()
                .turns(3)
                .on_turn(move |_| {
                    turns.fetch_add(1, Ordering::SeqCst);
                })
                .on_step(move |_| {
                    steps.fetch_add(1, Ordering::SeqCst);
                })
        };

        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>, user()]));
        execution.proceed(options).await;

        assert_eq!(turns.load(Ordering::SeqCst), 2);
        assert_eq!(steps.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn injected_content_consumes_the_slot_without_calling() {
        let bot = bot();
        let user = user();
        let mut execution = ScenarioExecution::new(scenario([bot.clone() as Arc<dyn AgentAdapter>, user.clone()]));

        assert!(execution.user_says("vegan please").await.unwrap().is_none());
        assert!(execution
            .message(ChatMessage::assistant("sure"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(user.calls() + bot.calls(), 0);
        assert!(execution.state().pending_participants_on_turn().is_empty());

        // a third injection has to open a new turn first
        execution.user_says("thanks").await.unwrap();
        assert_eq!(execution.turn(), Some(1));
        assert_eq!(execution.history().len(), 3);
    }

    #[tokio::test]
    async fn system_messages_skip_turn_bookkeeping() {
        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>]));
        execution.message(ChatMessage::system("be brief")).await.unwrap();
        assert_eq!(execution.history(), &[ChatMessage::system("be brief")]);
        assert_eq!(execution.state().pending_participants_on_turn(), vec![0]);
        assert_eq!(execution.state().pending_messages(0).len(), 1);
    }

    #[tokio::test]
    async fn missing_role_is_a_configuration_error() {
        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>]));
        let error = execution.user_says("hello?").await.unwrap_err();
        assert!(matches!(
            error,
            ScenarioError::NoParticipantForRole { role: AgentRole::User, content: Some(ref content) }
                if content == "hello?"
        ));
    }

    #[tokio::test]
    async fn missing_role_leaves_the_turn_untouched() {
        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>]));
        let turn = execution.turn();
        let roles = execution.state().pending_roles_on_turn().to_vec();
        let participants = execution.state().pending_participants_on_turn();

        assert!(execution.judge().await.is_err());
        assert_eq!(execution.turn(), turn);
        assert_eq!(execution.state().pending_roles_on_turn(), roles.as_slice());
        assert_eq!(execution.state().pending_participants_on_turn(), participants);
    }

    #[tokio::test]
    async fn judge_is_asked_for_a_verdict() {
        let judge = ScriptedAgent::from_fn("judge", [AgentRole::Judge], |input| {
            Ok(if input.must_render_verdict {
                ScenarioResult::success("asked").into()
            } else {
                AgentOutput::Messages(Vec::new())
            })
        })
        .with_criteria(["answers politely"]);
        let mut execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>, Arc::new(judge)]));

        execution.agent().await.unwrap();
        let verdict = execution.judge().await.unwrap().unwrap();
        assert!(verdict.success);
        assert_eq!(verdict.messages, vec![ChatMessage::assistant("ok")]);
        assert!(execution.state().has_result());
    }

    #[tokio::test]
    async fn explicit_verdicts_carry_judge_criteria() {
        let judge = ScriptedAgent::new("judge", [AgentRole::Judge]).with_criteria(["polite", "brief"]);
        let execution = ScenarioExecution::new(scenario([bot() as Arc<dyn AgentAdapter>, Arc::new(judge)]));

        let passed = execution.succeed();
        assert!(passed.success);
        assert_eq!(passed.passed_criteria, vec!["polite", "brief"]);

        let failed = execution.fail_with("not brief");
        assert!(!failed.success);
        assert_eq!(failed.reasoning, "not brief");
        assert_eq!(failed.failed_criteria, vec!["polite", "brief"]);
    }

    #[tokio::test]
    async fn participant_errors_become_failure_verdicts() {
        let broken = Arc::new(ScriptedAgent::new("bot", [AgentRole::Agent]).failing("network timeout"));
        let mut execution = ScenarioExecution::new(scenario([broken as Arc<dyn AgentAdapter>, user()]));

        let StepOutcome::Messages(_) = execution.step().await else {
            panic!("user should speak first");
        };
        let StepOutcome::Finished(result) = execution.step().await else {
            panic!("expected a verdict");
        };
        assert_eq!(result.reasoning, "Agent error: network timeout");
        assert_eq!(result.messages, vec![ChatMessage::user("hi")]);
        assert!(execution.participant_failed());
        assert_eq!(execution.run_status(&result), RunStatus::Error);
    }

    #[tokio::test]
    async fn cancelled_runs_report_cancelled() {
        let token = CancellationToken::new();
        let slow = Arc::new(
            ScriptedAgent::new("bot", [AgentRole::Agent])
                .repeating("ok")
                .with_latency(std::time::Duration::from_secs(30)),
        );
        let mut execution = ScenarioExecution::new(scenario([slow as Arc<dyn AgentAdapter>])).with_cancellation(token.clone());
        token.cancel();

        let StepOutcome::Finished(result) = execution.step().await else {
            panic!("expected a verdict");
        };
        assert!(result.reasoning.contains("cancelled"));
        assert_eq!(execution.run_status(&result), RunStatus::Cancelled);
    }
}
