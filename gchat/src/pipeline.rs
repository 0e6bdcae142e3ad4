//! Ordered, sequential plugin hook dispatch.
//!
//! Hooks run one plugin at a time in registration order, each awaited before
//! the next starts. The first failure stops the dispatch and is returned
//! as-is.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::{ChatError, Message, Plugin, PluginContext};

#[derive(Debug, Clone, Default)]
pub struct PluginPipeline {
    plugins: Vec<Plugin>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Plugin>) -> Result<Self, ChatError> {
        ensure_unique_names(&plugins)?;
        Ok(Self { plugins })
    }

    /// Process defaults first, then `plugins`.
    pub fn with_defaults(plugins: Vec<Plugin>) -> Result<Self, ChatError> {
        let mut all = crate::default_plugins();
        all.extend(plugins);
        Self::new(all)
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Each plugin receives the entry persisted under its own name.
    pub async fn on_init(
        &self,
        context: &PluginContext,
        plugins_data: &BTreeMap<String, Value>,
    ) -> Result<(), ChatError> {
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.on_init {
                trace_dispatch(plugin, "on_init");
                hook(context.clone(), plugins_data.get(plugin.name()).cloned()).await?;
            }
        }
        Ok(())
    }

    pub async fn on_user_prompt(&self, message: &Message) -> Result<(), ChatError> {
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.on_user_prompt {
                trace_dispatch(plugin, "on_user_prompt");
                hook(message.clone()).await?;
            }
        }
        Ok(())
    }

    pub async fn on_function_prompt(&self, message: &Message) -> Result<(), ChatError> {
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.on_function_prompt {
                trace_dispatch(plugin, "on_function_prompt");
                hook(message.clone()).await?;
            }
        }
        Ok(())
    }

    pub async fn on_user_prompt_error(&self, error: &ChatError) -> Result<(), ChatError> {
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.on_user_prompt_error {
                trace_dispatch(plugin, "on_user_prompt_error");
                hook(error.clone()).await?;
            }
        }
        Ok(())
    }

    pub async fn on_function_prompt_error(&self, error: &ChatError) -> Result<(), ChatError> {
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.on_function_prompt_error {
                trace_dispatch(plugin, "on_function_prompt_error");
                hook(error.clone()).await?;
            }
        }
        Ok(())
    }

    /// Pipes `result` through every plugin; each sees the previous output.
    pub async fn transform_function_result(&self, result: Value) -> Result<Value, ChatError> {
        let mut current = result;
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.transform_function_result {
                trace_dispatch(plugin, "transform_function_result");
                current = hook(current).await?;
            }
        }
        Ok(current)
    }

    pub async fn transform_conversation_json(&self, json: Value) -> Result<Value, ChatError> {
        let mut current = json;
        for plugin in &self.plugins {
            if let Some(hook) = &plugin.transform_conversation_json {
                trace_dispatch(plugin, "transform_conversation_json");
                current = hook(current).await?;
            }
        }
        Ok(current)
    }

    /// Private state of every plugin that reports some, keyed by plugin name.
    pub fn plugins_data(&self) -> BTreeMap<String, Value> {
        self.plugins
            .iter()
            .filter_map(|plugin| plugin.data().map(|data| (plugin.name().to_string(), data)))
            .collect()
    }
}

pub(crate) fn ensure_unique_names(plugins: &[Plugin]) -> Result<(), ChatError> {
    let mut seen = HashSet::new();
    for plugin in plugins {
        if plugin.name().trim().is_empty() {
            return Err(ChatError::validation("plugin name must not be empty"));
        }

        if !seen.insert(plugin.name()) {
            return Err(ChatError::validation(format!(
                "duplicate plugin name '{}'",
                plugin.name()
            )));
        }
    }
    Ok(())
}

fn trace_dispatch(plugin: &Plugin, hook: &'static str) {
    tracing::debug!(phase = "plugin", event = "dispatch", plugin = plugin.name(), hook);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::ChatErrorKind;

    fn recorder(name: &'static str, log: Arc<Mutex<Vec<String>>>, fail: bool) -> Plugin {
        Plugin::builder(name)
            .on_user_prompt(move |message| {
                let log = log.clone();
                async move {
                    log.lock()
                        .expect("log lock")
                        .push(format!("{name}:{}", message.content_str()));
                    if fail {
                        Err(ChatError::plugin(format!("{name} refused")))
                    } else {
                        Ok(())
                    }
                }
            })
            .build()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let error = PluginPipeline::new(vec![
            recorder("a", log.clone(), false),
            recorder("a", log, false),
        ])
        .expect_err("duplicates must fail");
        assert_eq!(error.kind, ChatErrorKind::Validation);
    }

    #[tokio::test]
    async fn hooks_run_in_order_and_stop_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PluginPipeline::new(vec![
            recorder("first", log.clone(), false),
            recorder("second", log.clone(), true),
            recorder("third", log.clone(), false),
        ])
        .expect("pipeline should build");

        let error = pipeline
            .on_user_prompt(&Message::user("hi"))
            .await
            .expect_err("second plugin fails");
        assert_eq!(error.message, "second refused");
        assert_eq!(
            *log.lock().expect("log lock"),
            vec!["first:hi".to_string(), "second:hi".to_string()]
        );
    }

    #[tokio::test]
    async fn transforms_chain_previous_output() {
        let pipeline = PluginPipeline::new(vec![
            Plugin::builder("wrap")
                .transform_function_result(|value| async move { Ok(json!({ "wrapped": value })) })
                .build(),
            Plugin::builder("tag")
                .transform_function_result(|mut value| async move {
                    value["tagged"] = json!(true);
                    Ok(value)
                })
                .build(),
        ])
        .expect("pipeline should build");

        let result = pipeline
            .transform_function_result(json!(7))
            .await
            .expect("transforms should succeed");
        assert_eq!(result, json!({"wrapped": 7, "tagged": true}));
    }

    #[tokio::test]
    async fn on_init_receives_own_data_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let capture = seen.clone();
        let pipeline = PluginPipeline::new(vec![
            Plugin::builder("memo")
                .on_init(move |_context, data| {
                    let capture = capture.clone();
                    async move {
                        capture.lock().expect("seen lock").push(data);
                        Ok(())
                    }
                })
                .data(|| Some(json!({"notes": 1})))
                .build(),
            Plugin::builder("stateless").build(),
        ])
        .expect("pipeline should build");

        let context = PluginContext {
            conversation_id: gcommon::ConversationId::new("c-1"),
            config: Default::default(),
        };
        let persisted = BTreeMap::from([
            ("memo".to_string(), json!({"notes": 0})),
            ("other".to_string(), json!(null)),
        ]);
        pipeline
            .on_init(&context, &persisted)
            .await
            .expect("init should succeed");

        assert_eq!(
            *seen.lock().expect("seen lock"),
            vec![Some(json!({"notes": 0}))]
        );
        assert_eq!(
            pipeline.plugins_data(),
            BTreeMap::from([("memo".to_string(), json!({"notes": 1}))])
        );
    }
}
