/// Creates a single chat [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use petchat::{Role, pet_msg};
///
/// let message = pet_msg!(assistant => "Purr.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Purr.");
/// ```
#[macro_export]
macro_rules! pet_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::System, $content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::User, $content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::Assistant, $content)
    };
    (function => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::Function, $content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, assistant, or function");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use petchat::{Role, pet_messages};
///
/// let messages = pet_messages![
///     system => "You are Mochi, a sleepy cat.",
///     user => "Good morning!",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! pet_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::pet_msg!($role => $content)),+]
    };
}
