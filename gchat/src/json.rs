//! Persisted conversation shape.

use std::collections::BTreeMap;

use gcommon::{ConversationId, RequestOptions};
use gfunctions::CallableFunctions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConversationConfig, Message};

/// `{ id, config, requestOptions, callableFunctions, history, pluginsData }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationJson {
    pub id: ConversationId,
    pub config: ConversationConfig,
    #[serde(default)]
    pub request_options: RequestOptions,
    #[serde(default)]
    pub callable_functions: CallableFunctions,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub plugins_data: BTreeMap<String, Value>,
}

impl ConversationJson {
    /// Parses and checks a JSON value against the persisted shape.
    pub fn parse(value: Value) -> Result<Self, crate::ChatError> {
        let parsed: Self = serde_json::from_value(value)?;
        if parsed.id.is_blank() {
            return Err(crate::ChatError::validation(
                "conversation id must not be blank",
            ));
        }
        Ok(parsed)
    }
}
