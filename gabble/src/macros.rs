/// Creates a single conversation [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use gabble::{Role, gb_msg};
///
/// let message = gb_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content_str(), "Done.");
///
/// let result = gb_msg!(function("lookup") => "42");
/// assert_eq!(result.name.as_deref(), Some("lookup"));
/// ```
#[macro_export]
macro_rules! gb_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::system($content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::user($content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::assistant($content)
    };
    (function($name:expr) => $content:expr $(,)?) => {
        $crate::Message::function($name, $content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, assistant, or function(name)");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use gabble::{Role, gb_messages};
///
/// let messages = gb_messages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! gb_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident $(($name:expr))? => $content:expr),+ $(,)?) => {
        vec![$($crate::gb_msg!($role $(($name))? => $content)),+]
    };
}

/// Starts a [`ConversationBuilder`](crate::ConversationBuilder) with an
/// optional system message.
///
/// ```rust
/// use gabble::gb_conversation;
///
/// let _builder = gb_conversation!("You are concise.");
/// let _empty = gb_conversation!();
/// ```
#[macro_export]
macro_rules! gb_conversation {
    () => {
        $crate::Conversation::builder()
    };
    ($system:expr $(,)?) => {
        $crate::Conversation::builder().system_message($system)
    };
}
