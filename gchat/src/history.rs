//! Ordered message history with change notifications.
//!
//! ```rust
//! use gchat::{ConversationHistory, Role};
//!
//! let history = ConversationHistory::new();
//! let user = history.add_user_message("hello").expect("user message");
//! history.add_function_message("{}", "lookup").expect("function message");
//!
//! assert_eq!(history.len(), 2);
//! history.remove_message(&user.id).expect("remove");
//! history.remove_message(&user.id).expect("removing twice is a no-op");
//! assert_eq!(history.messages()[0].role, Role::Function);
//! ```

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use gcommon::MessageId;
use gprovider::{ChatMessage, Role};
use tokio::sync::broadcast;

use crate::{ChatError, Message};

const EVENT_CAPACITY: usize = 256;

/// Change published whenever the history is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    MessageAdded(Message),
    MessageUpdated(Message),
    MessageRemoved(MessageId),
}

/// Ordered message sequence owned by one conversation.
///
/// The lock is held only for the duration of each call, never across an
/// await, so readers always observe whole mutations.
#[derive(Debug)]
pub struct ConversationHistory {
    messages: RwLock<Vec<Message>>,
    events: broadcast::Sender<ConversationEvent>,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationHistory {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Restores a persisted sequence, enforcing message invariants.
    ///
    /// Messages persisted mid-stream are finalized.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self, ChatError> {
        let mut seen = HashSet::new();
        for (index, message) in messages.iter().enumerate() {
            if message.id.is_blank() {
                return Err(ChatError::validation("message id must not be blank"));
            }

            if !seen.insert(message.id.clone()) {
                return Err(ChatError::validation(format!(
                    "duplicate message id '{}'",
                    message.id
                )));
            }

            if message.role == Role::System && index != 0 {
                return Err(ChatError::validation(
                    "system message must be the first message",
                ));
            }

            validate_function_name(message)?;
        }

        let history = Self::new();
        {
            let mut guard = history.write()?;
            *guard = messages
                .into_iter()
                .map(|mut message| {
                    message.streaming = false;
                    message
                })
                .collect();
        }
        Ok(history)
    }

    /// Sets the system message at index 0, replacing its content if present.
    pub fn set_system_message(&self, content: impl Into<String>) -> Result<Message, ChatError> {
        let content = content.into();
        let mut messages = self.write()?;

        if let Some(first) = messages.first_mut()
            && first.role == Role::System
        {
            first.content = Some(content);
            let updated = first.clone();
            drop(messages);
            self.publish(ConversationEvent::MessageUpdated(updated.clone()));
            return Ok(updated);
        }

        let message = Message::system(content);
        messages.insert(0, message.clone());
        drop(messages);
        self.publish(ConversationEvent::MessageAdded(message.clone()));
        Ok(message)
    }

    /// Appends a user message. Empty content is accepted.
    pub fn add_user_message(&self, content: impl Into<String>) -> Result<Message, ChatError> {
        self.push(Message::user(content))
    }

    pub fn add_function_message(
        &self,
        content: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Message, ChatError> {
        let message = Message::function(name, content);
        validate_function_name(&message)?;
        self.push(message)
    }

    pub(crate) fn add_assistant_message(&self, message: Message) -> Result<Message, ChatError> {
        if message.role != Role::Assistant {
            return Err(ChatError::validation(
                "assistant responses must carry the assistant role",
            ));
        }
        self.push(message)
    }

    /// Applies `update` to the message with `id` and publishes the result.
    pub(crate) fn update_message(
        &self,
        id: &MessageId,
        update: impl FnOnce(&mut Message),
    ) -> Result<Option<Message>, ChatError> {
        let mut messages = self.write()?;
        let Some(message) = messages.iter_mut().find(|message| &message.id == id) else {
            return Ok(None);
        };

        update(message);
        let updated = message.clone();
        drop(messages);
        self.publish(ConversationEvent::MessageUpdated(updated.clone()));
        Ok(Some(updated))
    }

    /// Removes the message with `id`; absent ids are a no-op.
    pub fn remove_message(&self, id: &MessageId) -> Result<Option<Message>, ChatError> {
        let mut messages = self.write()?;
        let Some(index) = messages.iter().position(|message| &message.id == id) else {
            return Ok(None);
        };

        let removed = messages.remove(index);
        drop(messages);
        self.publish(ConversationEvent::MessageRemoved(removed.id.clone()));
        Ok(Some(removed))
    }

    pub fn get_message(&self, id: &MessageId) -> Result<Option<Message>, ChatError> {
        Ok(self
            .read()?
            .iter()
            .find(|message| &message.id == id)
            .cloned())
    }

    pub fn position(&self, id: &MessageId) -> Result<Option<usize>, ChatError> {
        Ok(self.read()?.iter().position(|message| &message.id == id))
    }

    /// Detached copy of the current sequence.
    pub fn messages(&self) -> Vec<Message> {
        self.read_recovering().clone()
    }

    /// Wire projection of every settled message, in order.
    pub fn wire_snapshot(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self
            .read()?
            .iter()
            .filter(|message| !message.streaming)
            .map(Message::to_wire)
            .collect())
    }

    pub fn last_message(&self) -> Result<Option<Message>, ChatError> {
        Ok(self.read()?.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.read_recovering().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    fn push(&self, message: Message) -> Result<Message, ChatError> {
        self.write()?.push(message.clone());
        self.publish(ConversationEvent::MessageAdded(message.clone()));
        Ok(message)
    }

    fn publish(&self, event: ConversationEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Read access that keeps serving data after a writer panicked.
    fn read_recovering(&self) -> RwLockReadGuard<'_, Vec<Message>> {
        self.messages.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Message>>, ChatError> {
        self.messages
            .read()
            .map_err(|_| ChatError::configuration("conversation history lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Message>>, ChatError> {
        self.messages
            .write()
            .map_err(|_| ChatError::configuration("conversation history lock poisoned"))
    }
}

fn validate_function_name(message: &Message) -> Result<(), ChatError> {
    if message.role == Role::Function
        && message
            .name
            .as_deref()
            .is_none_or(|name| name.trim().is_empty())
    {
        return Err(ChatError::validation(
            "function messages require a non-empty name",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatErrorKind;

    #[test]
    fn system_message_is_unique_and_first() {
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");
        history.set_system_message("be brief").expect("system");
        history.set_system_message("be verbose").expect("system again");

        let messages = history.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content_str(), "be verbose");
        assert_eq!(
            messages
                .iter()
                .filter(|message| message.role == Role::System)
                .count(),
            1
        );
    }

    #[test]
    fn function_messages_require_name() {
        let history = ConversationHistory::new();
        let error = history
            .add_function_message("{}", "  ")
            .expect_err("blank name must fail");
        assert_eq!(error.kind, ChatErrorKind::Validation);
        assert!(history.is_empty());
    }

    #[test]
    fn empty_user_prompt_is_accepted() {
        let history = ConversationHistory::new();
        let message = history.add_user_message("").expect("empty prompt is legal");
        assert_eq!(message.content_str(), "");
    }

    #[test]
    fn returned_messages_are_detached() {
        let history = ConversationHistory::new();
        history.add_user_message("original").expect("user");

        let mut copy = history.messages();
        copy[0].content = Some("mutated".to_string());
        copy.clear();

        assert_eq!(history.messages()[0].content_str(), "original");
    }

    #[test]
    fn wire_snapshot_skips_streaming_messages() {
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");
        history
            .add_assistant_message(Message::streaming_assistant())
            .expect("placeholder");

        let wire = history.wire_snapshot().expect("snapshot");
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, Role::User);
    }

    #[test]
    fn from_messages_rejects_misplaced_system_and_duplicate_ids() {
        let user = Message::user("hi");
        let error = ConversationHistory::from_messages(vec![user.clone(), Message::system("x")])
            .expect_err("late system message must fail");
        assert_eq!(error.kind, ChatErrorKind::Validation);

        let error = ConversationHistory::from_messages(vec![user.clone(), user])
            .expect_err("duplicate ids must fail");
        assert_eq!(error.kind, ChatErrorKind::Validation);
    }

    #[test]
    fn from_messages_finalizes_streaming_entries() {
        let mut partial = Message::assistant("half");
        partial.streaming = true;

        let history = ConversationHistory::from_messages(vec![Message::user("hi"), partial])
            .expect("history should load");
        assert!(history.messages().iter().all(|message| !message.streaming));
    }

    #[test]
    fn reads_survive_a_poisoned_lock() {
        let history = ConversationHistory::new();
        history.add_user_message("hi").expect("user");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = history.messages.write().expect("write lock");
            panic!("writer panicked");
        }));
        assert!(outcome.is_err());
        assert!(history.messages.is_poisoned());

        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
        assert_eq!(history.messages().len(), 1);
    }

    #[tokio::test]
    async fn mutations_are_published_in_order() {
        let history = ConversationHistory::new();
        let mut events = history.subscribe();

        let user = history.add_user_message("hi").expect("user");
        history
            .update_message(&user.id, |message| {
                message.flags.insert("hate".to_string());
            })
            .expect("update");
        history.remove_message(&user.id).expect("remove");

        assert!(matches!(
            events.recv().await.expect("added"),
            ConversationEvent::MessageAdded(message) if message.id == user.id
        ));
        assert!(matches!(
            events.recv().await.expect("updated"),
            ConversationEvent::MessageUpdated(message) if message.is_flagged()
        ));
        assert_eq!(
            events.recv().await.expect("removed"),
            ConversationEvent::MessageRemoved(user.id)
        );
    }
}
