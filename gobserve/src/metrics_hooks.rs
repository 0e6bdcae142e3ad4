//! Metrics plugin: counters for turns, errors, and serialization.
//!
//! ```rust
//! use gobserve::metrics_plugin;
//!
//! let plugin = metrics_plugin();
//! assert!(plugin.hooks().contains(&"on_user_prompt_error"));
//! ```

use gchat::Plugin;

pub const METRICS_PLUGIN_NAME: &str = "metrics";

pub fn metrics_plugin() -> Plugin {
    Plugin::builder(METRICS_PLUGIN_NAME)
        .on_user_prompt(|message| async move {
            metrics::counter!(
                "gabble_user_prompt_total",
                "flagged" => message.is_flagged().to_string()
            )
            .increment(1);
            Ok(())
        })
        .on_function_prompt(|message| async move {
            metrics::counter!(
                "gabble_function_prompt_total",
                "function" => message.name.unwrap_or_default()
            )
            .increment(1);
            Ok(())
        })
        .on_user_prompt_error(|error| async move {
            metrics::counter!(
                "gabble_prompt_error_total",
                "turn" => "user",
                "kind" => error.kind.as_str()
            )
            .increment(1);
            Ok(())
        })
        .on_function_prompt_error(|error| async move {
            metrics::counter!(
                "gabble_prompt_error_total",
                "turn" => "function",
                "kind" => error.kind.as_str()
            )
            .increment(1);
            Ok(())
        })
        .transform_function_result(|result| async move {
            metrics::counter!("gabble_function_result_transform_total").increment(1);
            Ok(result)
        })
        .transform_conversation_json(|json| async move {
            metrics::counter!("gabble_conversation_serialize_total").increment(1);
            Ok(json)
        })
        .build()
}
