//! Plugin records: a name plus whichever hooks the plugin implements.
//!
//! ```rust
//! use gchat::Plugin;
//!
//! let plugin = Plugin::builder("redactor")
//!     .transform_function_result(|result| async move { Ok(result) })
//!     .build();
//!
//! assert_eq!(plugin.name(), "redactor");
//! assert!(plugin.hooks().contains(&"transform_function_result"));
//! ```

use std::future::Future;
use std::sync::Arc;

use gcommon::{BoxFuture, ConversationId};
use serde_json::Value;

use crate::{ChatError, ConversationConfig, Message};

pub type PluginFuture<T> = BoxFuture<'static, Result<T, ChatError>>;

type InitHook = dyn Fn(PluginContext, Option<Value>) -> PluginFuture<()> + Send + Sync;
type MessageHook = dyn Fn(Message) -> PluginFuture<()> + Send + Sync;
type ErrorHook = dyn Fn(ChatError) -> PluginFuture<()> + Send + Sync;
type TransformHook = dyn Fn(Value) -> PluginFuture<Value> + Send + Sync;
type DataHook = dyn Fn() -> Option<Value> + Send + Sync;

/// Conversation facts handed to `on_init`.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginContext {
    pub conversation_id: ConversationId,
    pub config: ConversationConfig,
}

#[derive(Clone)]
pub struct Plugin {
    name: String,
    pub(crate) on_init: Option<Arc<InitHook>>,
    pub(crate) on_user_prompt: Option<Arc<MessageHook>>,
    pub(crate) on_function_prompt: Option<Arc<MessageHook>>,
    pub(crate) on_user_prompt_error: Option<Arc<ErrorHook>>,
    pub(crate) on_function_prompt_error: Option<Arc<ErrorHook>>,
    pub(crate) transform_function_result: Option<Arc<TransformHook>>,
    pub(crate) transform_conversation_json: Option<Arc<TransformHook>>,
    pub(crate) data: Option<Arc<DataHook>>,
}

impl Plugin {
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            plugin: Plugin {
                name: name.into(),
                on_init: None,
                on_user_prompt: None,
                on_function_prompt: None,
                on_user_prompt_error: None,
                on_function_prompt_error: None,
                transform_function_result: None,
                transform_conversation_json: None,
                data: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the hooks this plugin implements.
    pub fn hooks(&self) -> Vec<&'static str> {
        [
            ("on_init", self.on_init.is_some()),
            ("on_user_prompt", self.on_user_prompt.is_some()),
            ("on_function_prompt", self.on_function_prompt.is_some()),
            ("on_user_prompt_error", self.on_user_prompt_error.is_some()),
            (
                "on_function_prompt_error",
                self.on_function_prompt_error.is_some(),
            ),
            (
                "transform_function_result",
                self.transform_function_result.is_some(),
            ),
            (
                "transform_conversation_json",
                self.transform_conversation_json.is_some(),
            ),
            ("data", self.data.is_some()),
        ]
        .into_iter()
        .filter_map(|(hook, present)| present.then_some(hook))
        .collect()
    }

    /// Current private state, persisted under this plugin's name.
    pub fn data(&self) -> Option<Value> {
        self.data.as_ref().and_then(|data| data())
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &self.hooks())
            .finish()
    }
}

pub struct PluginBuilder {
    plugin: Plugin,
}

impl PluginBuilder {
    pub fn on_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(PluginContext, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChatError>> + Send + 'static,
    {
        self.plugin.on_init = Some(Arc::new(move |context, data| -> PluginFuture<()> {
            Box::pin(hook(context, data))
        }));
        self
    }

    pub fn on_user_prompt<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChatError>> + Send + 'static,
    {
        self.plugin.on_user_prompt = Some(Arc::new(move |message| -> PluginFuture<()> {
            Box::pin(hook(message))
        }));
        self
    }

    pub fn on_function_prompt<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChatError>> + Send + 'static,
    {
        self.plugin.on_function_prompt = Some(Arc::new(move |message| -> PluginFuture<()> {
            Box::pin(hook(message))
        }));
        self
    }

    pub fn on_user_prompt_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ChatError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChatError>> + Send + 'static,
    {
        self.plugin.on_user_prompt_error = Some(Arc::new(move |error| -> PluginFuture<()> {
            Box::pin(hook(error))
        }));
        self
    }

    pub fn on_function_prompt_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ChatError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChatError>> + Send + 'static,
    {
        self.plugin.on_function_prompt_error =
            Some(Arc::new(move |error| -> PluginFuture<()> {
                Box::pin(hook(error))
            }));
        self
    }

    pub fn transform_function_result<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ChatError>> + Send + 'static,
    {
        self.plugin.transform_function_result =
            Some(Arc::new(move |value| -> PluginFuture<Value> {
                Box::pin(hook(value))
            }));
        self
    }

    pub fn transform_conversation_json<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ChatError>> + Send + 'static,
    {
        self.plugin.transform_conversation_json =
            Some(Arc::new(move |value| -> PluginFuture<Value> {
                Box::pin(hook(value))
            }));
        self
    }

    pub fn data<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        self.plugin.data = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Plugin {
        self.plugin
    }
}
