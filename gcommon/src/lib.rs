//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use gcommon::{ConversationId, GenerationOptions, MessageId};
//!
//! let conversation = ConversationId::from("conversation-1");
//! let message = MessageId::new("message-1");
//!
//! let options = GenerationOptions::default().with_temperature(0.3).enable_streaming();
//! assert_eq!(conversation.as_str(), "conversation-1");
//! assert_eq!(message.to_string(), "message-1");
//! assert_eq!(options.stream, Some(true));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use gcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use gcommon::{ConversationId, MessageId};
    //!
    //! let conversation = ConversationId::new("conversation-42");
    //! let generated = MessageId::generate();
    //!
    //! assert_eq!(conversation.to_string(), "conversation-42");
    //! assert!(!generated.as_str().is_empty());
    //! ```

    use std::fmt::{Display, Formatter};

    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    macro_rules! string_id {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                /// Creates a fresh random (UUID v4) identifier.
                pub fn generate() -> Self {
                    Self(Uuid::new_v4().to_string())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }

                pub fn is_blank(&self) -> bool {
                    self.0.trim().is_empty()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }

            impl From<&$name> for $name {
                fn from(value: &$name) -> Self {
                    value.clone()
                }
            }
        };
    }

    string_id!(
        /// Opaque identifier of one conversation.
        ConversationId
    );

    string_id!(
        /// Opaque identifier of one message within a conversation history.
        MessageId
    );
}

pub mod model {
    //! Shared sampling and transport settings used by request types.
    //!
    //! Every field is optional so that layered settings can be merged: built-in
    //! defaults, then stored conversation settings, then per-call overrides.
    //!
    //! ```rust
    //! use gcommon::GenerationOptions;
    //!
    //! let stored = GenerationOptions::default().with_temperature(0.2).with_max_tokens(128);
    //! let call = GenerationOptions::default().with_temperature(0.9);
    //! let merged = stored.merged_with(&call);
    //!
    //! assert_eq!(merged.temperature, Some(0.9));
    //! assert_eq!(merged.max_tokens, Some(128));
    //! ```

    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct GenerationOptions {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub model: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub top_p: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub frequency_penalty: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub presence_penalty: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub max_tokens: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub logit_bias: Option<BTreeMap<String, f32>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stop: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub user: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stream: Option<bool>,
    }

    impl GenerationOptions {
        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = Some(model.into());
            self
        }

        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }

        pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
            self.frequency_penalty = Some(penalty);
            self
        }

        pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
            self.presence_penalty = Some(penalty);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_logit_bias(mut self, token: impl Into<String>, bias: f32) -> Self {
            self.logit_bias
                .get_or_insert_with(BTreeMap::new)
                .insert(token.into(), bias);
            self
        }

        pub fn with_stop(mut self, stop: impl IntoIterator<Item = impl Into<String>>) -> Self {
            self.stop = Some(stop.into_iter().map(Into::into).collect());
            self
        }

        pub fn with_user(mut self, user: impl Into<String>) -> Self {
            self.user = Some(user.into());
            self
        }

        pub fn with_streaming(mut self, stream: bool) -> Self {
            self.stream = Some(stream);
            self
        }

        pub fn enable_streaming(self) -> Self {
            self.with_streaming(true)
        }

        /// Returns a copy where every value set in `overrides` replaces ours.
        pub fn merged_with(&self, overrides: &GenerationOptions) -> GenerationOptions {
            GenerationOptions {
                model: overrides.model.clone().or_else(|| self.model.clone()),
                temperature: overrides.temperature.or(self.temperature),
                top_p: overrides.top_p.or(self.top_p),
                frequency_penalty: overrides.frequency_penalty.or(self.frequency_penalty),
                presence_penalty: overrides.presence_penalty.or(self.presence_penalty),
                max_tokens: overrides.max_tokens.or(self.max_tokens),
                logit_bias: overrides
                    .logit_bias
                    .clone()
                    .or_else(|| self.logit_bias.clone()),
                stop: overrides.stop.clone().or_else(|| self.stop.clone()),
                user: overrides.user.clone().or_else(|| self.user.clone()),
                stream: overrides.stream.or(self.stream),
            }
        }
    }

    /// Transport-level options forwarded to the remote service client.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct RequestOptions {
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        pub headers: BTreeMap<String, String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub timeout_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub base_url: Option<String>,
    }

    impl RequestOptions {
        pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
            self.headers.insert(name.into(), value.into());
            self
        }

        pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
            self.timeout_ms = Some(timeout_ms);
            self
        }

        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = Some(base_url.into());
            self
        }

        /// Header maps merge key-wise; scalar values in `overrides` win.
        pub fn merged_with(&self, overrides: &RequestOptions) -> RequestOptions {
            let mut headers = self.headers.clone();
            headers.extend(
                overrides
                    .headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );

            RequestOptions {
                headers,
                timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
                base_url: overrides
                    .base_url
                    .clone()
                    .or_else(|| self.base_url.clone()),
            }
        }
    }
}

pub mod registry {
    //! Insertion-ordered registry map wrapper used by runtime registries.
    //!
    //! ```rust
    //! use gcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("beta".to_string(), 2_u32);
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["beta", "alpha"]);
    //! ```

    use std::borrow::Borrow;
    use std::hash::Hash;

    use indexmap::IndexMap;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: IndexMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: IndexMap::new(),
            }
        }
    }

    impl<K, V> PartialEq for Registry<K, V>
    where
        K: Eq + Hash,
        V: PartialEq,
    {
        fn eq(&self, other: &Self) -> bool {
            self.items == other.items
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        /// Removes an entry while keeping the order of the remaining ones.
        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.shift_remove(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.items.values()
        }

        pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
            self.items.iter()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{ConversationId, MessageId};
pub use future::BoxFuture;
pub use model::{GenerationOptions, RequestOptions};
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::{ConversationId, GenerationOptions, MessageId, Registry, RequestOptions};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let conversation = ConversationId::new("conversation-1");
        let message = MessageId::from("message-1");

        assert_eq!(conversation.as_str(), "conversation-1");
        assert_eq!(message.as_str(), "message-1");
        assert_eq!(conversation.to_string(), "conversation-1");
        assert!(MessageId::from("  ").is_blank());
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = MessageId::generate();
        let second = MessageId::generate();
        assert_ne!(first, second);
        assert!(!first.is_blank());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = MessageId::new("m-1");
        let json = serde_json::to_string(&id).expect("id should serialize");
        assert_eq!(json, "\"m-1\"");
    }

    #[test]
    fn generation_options_merge_prefers_overrides() {
        let stored = GenerationOptions::default()
            .with_model("gpt-4o-mini")
            .with_temperature(0.3)
            .with_max_tokens(123)
            .with_stop(["END"]);
        let overrides = GenerationOptions::default()
            .with_temperature(1.1)
            .enable_streaming();

        let merged = stored.merged_with(&overrides);
        assert_eq!(merged.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(merged.temperature, Some(1.1));
        assert_eq!(merged.max_tokens, Some(123));
        assert_eq!(merged.stop, Some(vec!["END".to_string()]));
        assert_eq!(merged.stream, Some(true));
    }

    #[test]
    fn request_options_merge_headers_key_wise() {
        let stored = RequestOptions::default()
            .with_header("x-team", "core")
            .with_header("x-env", "prod")
            .with_timeout_ms(1_000);
        let overrides = RequestOptions::default().with_header("x-env", "staging");

        let merged = stored.merged_with(&overrides);
        assert_eq!(merged.headers.get("x-team").map(String::as_str), Some("core"));
        assert_eq!(merged.headers.get("x-env").map(String::as_str), Some("staging"));
        assert_eq!(merged.timeout_ms, Some(1_000));
    }

    #[test]
    fn registry_keeps_insertion_order_across_removals() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert("gamma".to_string(), 3_u32);
        registry.insert("alpha".to_string(), 1_u32);
        registry.insert("beta".to_string(), 2_u32);
        assert_eq!(registry.remove("alpha"), Some(1));

        let keys = registry.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, vec!["gamma".to_string(), "beta".to_string()]);
        assert_eq!(registry.len(), 2);
    }
}
