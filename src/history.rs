use crate::types::{ChatMessage, MessageRole};

/// Append-only conversation log shared by every participant of a run.
///
/// Messages are never reordered or edited once pushed; callers only ever get
/// read-only views.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.last_with_role(MessageRole::User)
    }

    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.last_with_role(MessageRole::Assistant)
    }

    pub fn last_tool_message(&self) -> Option<&ChatMessage> {
        self.last_with_role(MessageRole::Tool)
    }

    /// Most recent tool result produced by the tool called `tool_name`.
    pub fn last_tool_call_by_name(&self, tool_name: &str) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|message| is_tool_result_for(message, tool_name))
    }

    pub fn has_tool_call(&self, tool_name: &str) -> bool {
        self.messages
            .iter()
            .any(|message| is_tool_result_for(message, tool_name))
    }

    pub fn without_last_message(&self) -> &[ChatMessage] {
        let end = self.messages.len().saturating_sub(1);
        &self.messages[..end]
    }

    /// Everything before the last user message, or the whole log when no user
    /// has spoken yet.
    pub fn without_last_user_message(&self) -> &[ChatMessage] {
        match self
            .messages
            .iter()
            .rposition(|message| message.role == MessageRole::User)
        {
            Some(index) => &self.messages[..index],
            None => &self.messages,
        }
    }

    fn last_with_role(&self, role: MessageRole) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|message| message.role == role)
    }
}

fn is_tool_result_for(message: &ChatMessage, tool_name: &str) -> bool {
    message.role == MessageRole::Tool && message.name.as_deref() == Some(tool_name)
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
