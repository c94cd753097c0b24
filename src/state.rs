//! Per-run bookkeeping: history, turn counter, who still owes an action this
//! turn, and what each participant has not seen yet.
//!
//! Pure data manipulation. Nothing here performs I/O or calls a participant.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    agents::{AgentAdapter, AgentRole},
    history::ConversationHistory,
    types::ChatMessage,
    verdict::ScenarioResult,
};

pub struct ExecutionState {
    thread_id: String,
    agents: Vec<Arc<dyn AgentAdapter>>,
    history: ConversationHistory,
    turn: Option<usize>,
    pending_roles_on_turn: Vec<AgentRole>,
    pending_agents_on_turn: BTreeSet<usize>,
    pending_messages: HashMap<usize, Vec<ChatMessage>>,
    agent_times: HashMap<usize, Duration>,
    partial_result: Option<ScenarioResult>,
    started_at: Instant,
}

impl fmt::Debug for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionState")
            .field("thread_id", &self.thread_id)
            .field("agents", &self.agents.len())
            .field("history", &self.history.len())
            .field("turn", &self.turn)
            .field("pending_roles_on_turn", &self.pending_roles_on_turn)
            .field("pending_agents_on_turn", &self.pending_agents_on_turn)
            .field("has_result", &self.partial_result.is_some())
            .finish()
    }
}

impl ExecutionState {
    pub fn new(thread_id: impl Into<String>, agents: Vec<Arc<dyn AgentAdapter>>) -> Self {
        Self {
            thread_id: thread_id.into(),
            agents,
            history: ConversationHistory::new(),
            turn: None,
            pending_roles_on_turn: Vec::new(),
            pending_agents_on_turn: BTreeSet::new(),
            pending_messages: HashMap::new(),
            agent_times: HashMap::new(),
            partial_result: None,
            started_at: Instant::now(),
        }
    }

    /// Starts a turn: every configured role and participant owes an action
    /// again and the counter advances.
    pub fn new_turn(&mut self) {
        self.pending_agents_on_turn = (0..self.agents.len()).collect();
        self.pending_roles_on_turn = AgentRole::PRECEDENCE
            .into_iter()
            .filter(|role| self.agents.iter().any(|agent| agent.has_role(*role)))
            .collect();
        self.turn = Some(self.turn.map_or(1, |turn| turn + 1));
    }

    /// Rewinds the counter after the priming turn a fresh run starts with.
    pub(crate) fn reset_turn_counter(&mut self) {
        self.turn = Some(0);
    }

    /// Appends to history and queues the message for everyone except `from`.
    pub fn add_message(&mut self, message: ChatMessage, from: Option<usize>) {
        for idx in (0..self.agents.len()).filter(|idx| Some(*idx) != from) {
            self.pending_messages
                .entry(idx)
                .or_default()
                .push(message.clone());
        }
        self.history.push(message);
    }

    pub fn add_messages(&mut self, messages: &[ChatMessage], from: Option<usize>) {
        for message in messages {
            self.add_message(message.clone(), from);
        }
    }

    pub fn pending_messages(&self, idx: usize) -> &[ChatMessage] {
        self.pending_messages
            .get(&idx)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clear_pending_messages(&mut self, idx: usize) {
        self.pending_messages.insert(idx, Vec::new());
    }

    /// First participant, in configuration order, that declares `role` and has
    /// not acted yet this turn.
    pub fn next_participant_for_role(&self, role: AgentRole) -> Option<usize> {
        self.agents
            .iter()
            .enumerate()
            .find(|(idx, agent)| agent.has_role(role) && self.pending_agents_on_turn.contains(idx))
            .map(|(idx, _)| idx)
    }

    pub fn remove_pending_role(&mut self, role: AgentRole) {
        self.pending_roles_on_turn.retain(|pending| *pending != role);
    }

    pub fn remove_pending_participant(&mut self, idx: usize) {
        self.pending_agents_on_turn.remove(&idx);
    }

    /// Drops every pending role queued ahead of `role`.
    pub fn skip_roles_before(&mut self, role: AgentRole) {
        let keep_from = self
            .pending_roles_on_turn
            .iter()
            .position(|pending| *pending == role)
            .unwrap_or(self.pending_roles_on_turn.len());
        self.pending_roles_on_turn.drain(..keep_from);
    }

    pub fn add_agent_time(&mut self, idx: usize, elapsed: Duration) {
        *self.agent_times.entry(idx).or_default() += elapsed;
    }

    pub fn agent_time(&self, idx: usize) -> Duration {
        self.agent_times.get(&idx).copied().unwrap_or_default()
    }

    pub fn agent_times(&self) -> &HashMap<usize, Duration> {
        &self.agent_times
    }

    pub fn has_result(&self) -> bool {
        self.partial_result.is_some()
    }

    pub fn set_result(&mut self, result: ScenarioResult) {
        self.partial_result = Some(result);
    }

    pub fn partial_result(&self) -> Option<&ScenarioResult> {
        self.partial_result.as_ref()
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn agents(&self) -> &[Arc<dyn AgentAdapter>] {
        &self.agents
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn turn(&self) -> Option<usize> {
        self.turn
    }

    pub fn pending_roles_on_turn(&self) -> &[AgentRole] {
        &self.pending_roles_on_turn
    }

    pub fn pending_participants_on_turn(&self) -> Vec<usize> {
        self.pending_agents_on_turn.iter().copied().collect()
    }

    pub fn total_time(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.history.last()
    }

    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.history.last_user_message()
    }

    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.history.last_assistant_message()
    }

    pub fn last_tool_message(&self) -> Option<&ChatMessage> {
        self.history.last_tool_message()
    }

    pub fn last_tool_call_by_name(&self, tool_name: &str) -> Option<&ChatMessage> {
        self.history.last_tool_call_by_name(tool_name)
    }

    pub fn has_tool_call(&self, tool_name: &str) -> bool {
        self.history.has_tool_call(tool_name)
    }

    pub fn history_without_last_message(&self) -> &[ChatMessage] {
        self.history.without_last_message()
    }

    pub fn history_without_last_user_message(&self) -> &[ChatMessage] {
        self.history.without_last_user_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::ScriptedAgent;

    fn agent(name: &str, roles: &[AgentRole]) -> Arc<dyn AgentAdapter> {
        Arc::new(ScriptedAgent::new(name, roles.iter().copied()))
    }

    fn state() -> ExecutionState {
        ExecutionState::new(
            "thread_test",
            vec![
                agent("bot", &[AgentRole::Agent]),
                agent("tester", &[AgentRole::User, AgentRole::Judge]),
                agent("bot-2", &[AgentRole::Agent]),
            ],
        )
    }

    #[test]
    fn new_turn_orders_declared_roles_and_counts_up() {
        let mut state = ExecutionState::new("t", vec![agent("bot", &[AgentRole::Agent])]);
        assert_eq!(state.turn(), None);

        state.new_turn();
        assert_eq!(state.turn(), Some(1));
        assert_eq!(state.pending_roles_on_turn(), &[AgentRole::Agent]);

        let mut state = self::state();
        state.new_turn();
        state.new_turn();
        assert_eq!(state.turn(), Some(2));
        assert_eq!(state.pending_roles_on_turn(), &AgentRole::PRECEDENCE);
        assert_eq!(state.pending_participants_on_turn(), vec![0, 1, 2]);
    }

    #[test]
    fn messages_propagate_to_everyone_but_the_source() {
        let mut state = state();
        state.add_message(ChatMessage::user("hi"), Some(1));

        assert_eq!(state.pending_messages(0).last(), Some(&ChatMessage::user("hi")));
        assert_eq!(state.pending_messages(2).last(), Some(&ChatMessage::user("hi")));
        assert!(state.pending_messages(1).is_empty());

        state.add_message(ChatMessage::assistant("hello"), Some(0));
        assert_eq!(state.pending_messages(0).len(), 1);
        assert_eq!(
            state.pending_messages(1).last(),
            Some(&ChatMessage::assistant("hello"))
        );
        assert_eq!(state.pending_messages(2).len(), 2);

        state.add_message(ChatMessage::system("note"), None);
        assert!((0..3).all(|idx| state.pending_messages(idx).last()
            == Some(&ChatMessage::system("note"))));
        assert_eq!(state.history().len(), 3);

        state.clear_pending_messages(2);
        assert!(state.pending_messages(2).is_empty());
    }

    #[test]
    fn dispatch_follows_configuration_order_within_a_turn() {
        let mut state = state();
        state.new_turn();

        assert_eq!(state.next_participant_for_role(AgentRole::Agent), Some(0));
        state.remove_pending_participant(0);
        assert_eq!(state.next_participant_for_role(AgentRole::Agent), Some(2));

        state.remove_pending_participant(1);
        assert_eq!(state.next_participant_for_role(AgentRole::Judge), None);
        assert_eq!(state.next_participant_for_role(AgentRole::User), None);
    }

    #[test]
    fn pending_mutations_are_idempotent() {
        let mut state = state();
        state.new_turn();

        state.remove_pending_role(AgentRole::Agent);
        state.remove_pending_role(AgentRole::Agent);
        assert_eq!(state.pending_roles_on_turn(), &[AgentRole::User, AgentRole::Judge]);

        state.remove_pending_participant(2);
        state.remove_pending_participant(2);
        assert_eq!(state.pending_participants_on_turn(), vec![0, 1]);
    }

    #[test]
    fn skipping_roles_keeps_the_target_and_later_roles() {
        let mut state = state();
        state.new_turn();
        state.skip_roles_before(AgentRole::Agent);
        assert_eq!(state.pending_roles_on_turn(), &[AgentRole::Agent, AgentRole::Judge]);

        state.remove_pending_role(AgentRole::Agent);
        state.remove_pending_role(AgentRole::Judge);
        state.skip_roles_before(AgentRole::User);
        assert!(state.pending_roles_on_turn().is_empty());
    }

    #[test]
    fn agent_time_accumulates() {
        let mut state = state();
        state.add_agent_time(0, Duration::from_millis(40));
        state.add_agent_time(0, Duration::from_millis(60));
        assert_eq!(state.agent_time(0), Duration::from_millis(100));
        assert_eq!(state.agent_time(1), Duration::ZERO);
    }
}
