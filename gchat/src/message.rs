//! Conversation message record.
//!
//! ```rust
//! use gchat::{Message, Role};
//!
//! let message = Message::user("What's the weather?");
//! assert_eq!(message.role, Role::User);
//! assert!(message.flags.is_empty());
//! assert!(!message.streaming);
//! ```

use std::collections::BTreeSet;

use gcommon::MessageId;
use gprovider::{ChatMessage, FunctionCall, Role};
use serde::{Deserialize, Serialize};

/// One entry of a conversation, tagged by role.
///
/// `name` is only meaningful for function messages, and `content` is only
/// absent on an assistant message that carries a `function_call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<String>,
    #[serde(default)]
    pub streaming: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
            flags: BTreeSet::new(),
            streaming: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut message = Self::new(Role::Function, content);
        message.name = Some(name.into());
        message
    }

    /// Assistant placeholder that receives streamed deltas.
    pub(crate) fn streaming_assistant() -> Self {
        let mut message = Self::new(Role::Assistant, String::new());
        message.streaming = true;
        message
    }

    pub(crate) fn from_completion(message: ChatMessage) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: message.content,
            name: None,
            function_call: message.function_call,
            flags: BTreeSet::new(),
            streaming: false,
        }
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Projection sent to the completion service.
    pub fn to_wire(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
            name: match self.role {
                Role::Function => self.name.clone(),
                _ => None,
            },
            function_call: self.function_call.clone(),
        }
    }

    pub(crate) fn append_content(&mut self, delta: &str) {
        self.content.get_or_insert_with(String::new).push_str(delta);
    }

    pub(crate) fn append_function_call(&mut self, name: Option<String>, arguments: &str) {
        let call = self.function_call.get_or_insert_with(FunctionCall::default);
        if let Some(name) = name {
            call.name.push_str(&name);
        }
        call.arguments.push_str(arguments);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_projection_keeps_name_only_for_function_messages() {
        let function = Message::function("get_weather", "{\"temp\":21}");
        let wire = function.to_wire();
        assert_eq!(wire.role, Role::Function);
        assert_eq!(wire.name.as_deref(), Some("get_weather"));

        let mut user = Message::user("hi");
        user.name = Some("ignored".to_string());
        assert_eq!(user.to_wire().name, None);
    }

    #[test]
    fn streamed_function_call_fragments_accumulate() {
        let mut message = Message::streaming_assistant();
        message.append_function_call(Some("look".to_string()), "{\"id\"");
        message.append_function_call(Some("up".to_string()), ":1}");
        message.append_function_call(None, "");

        let call = message.function_call.expect("function call should exist");
        assert_eq!(call.name, "lookup");
        assert_eq!(call.arguments, "{\"id\":1}");
    }

    #[test]
    fn serde_uses_camel_case_and_defaults() {
        let parsed: Message = serde_json::from_value(json!({
            "id": "m-1",
            "role": "function",
            "content": "42",
            "name": "answer"
        }))
        .expect("message should parse");

        assert_eq!(parsed.id.as_str(), "m-1");
        assert!(parsed.flags.is_empty());
        assert!(!parsed.streaming);

        let mut flagged = Message::assistant("x");
        flagged.function_call = Some(FunctionCall::new("f", "{}"));
        flagged.flags.insert("hate".to_string());
        let json = serde_json::to_value(&flagged).expect("message should serialize");
        assert_eq!(json["functionCall"]["name"], "f");
        assert_eq!(json["flags"], json!(["hate"]));
    }
}
