//! Live conversation history and local token estimation.
//!
//! ```rust
//! use pchat::ChatHistory;
//! use pprovider::{Message, Role};
//!
//! let mut history = ChatHistory::new();
//! history.push(Message::new(Role::User, "hello there"));
//! let before = history.token_count();
//! history.push(Message::new(Role::Assistant, "meow"));
//!
//! assert!(history.token_count() >= before);
//! ```

use pprovider::{Message, Role};

/// Fixed cost per message for role and framing.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;
/// Flat cost of an attached image.
pub const IMAGE_TOKENS: usize = 85;

/// Roughly one token per four characters, rounded up.
pub fn estimate_tokens(message: &Message) -> usize {
    let text = message.content.chars().count().div_ceil(4);
    let image = if message.has_image() { IMAGE_TOKENS } else { 0 };
    text + MESSAGE_OVERHEAD_TOKENS + image
}

pub fn estimate_total(messages: &[Message]) -> usize {
    messages.iter().map(estimate_tokens).sum()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatHistory {
    messages: Vec<Message>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Whole-sequence replace.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn token_count(&self) -> usize {
        estimate_total(&self.messages)
    }

    /// History plus `pending`, trimmed to `budget` by dropping the oldest
    /// non-system messages. The last message always survives.
    pub fn request_window(&self, pending: &[Message], budget: usize) -> Vec<Message> {
        let mut candidates = self.messages.clone();
        candidates.extend_from_slice(pending);
        fit_to_budget(candidates, budget)
    }
}

pub fn fit_to_budget(messages: Vec<Message>, budget: usize) -> Vec<Message> {
    let mut total = estimate_total(&messages);
    if total <= budget {
        return messages;
    }

    let last = messages.len().saturating_sub(1);
    let mut keep = vec![true; messages.len()];
    for (index, message) in messages.iter().enumerate() {
        if total <= budget || index == last {
            break;
        }
        if message.role == Role::System {
            continue;
        }
        keep[index] = false;
        total -= estimate_tokens(message);
    }

    messages
        .into_iter()
        .zip(keep)
        .filter_map(|(message, keep)| keep.then_some(message))
        .collect()
}

#[cfg(test)]
mod tests {
    use pprovider::ImagePayload;

    use super::*;

    #[test]
    fn estimate_rounds_up_and_counts_images() {
        assert_eq!(estimate_tokens(&Message::new(Role::User, "")), 4);
        assert_eq!(estimate_tokens(&Message::new(Role::User, "abcde")), 6);

        let with_image = Message::new(Role::User, "abcd")
            .with_image(ImagePayload::new("image/png", vec![1, 2, 3]));
        assert_eq!(estimate_tokens(&with_image), 1 + 4 + IMAGE_TOKENS);
    }

    #[test]
    fn multibyte_text_is_counted_by_chars() {
        assert_eq!(estimate_tokens(&Message::new(Role::User, "猫猫猫猫")), 5);
    }

    #[test]
    fn window_drops_oldest_non_system_messages() {
        let mut history = ChatHistory::new();
        history.push(Message::new(Role::System, "rules"));
        for index in 0..6 {
            history.push(Message::new(Role::User, format!("message number {index}")));
        }

        let pending = [Message::new(Role::User, "newest")];
        let window = history.request_window(&pending, 24);

        assert_eq!(window[0].content, "rules");
        assert_eq!(window.last().map(|m| m.content.as_str()), Some("newest"));
        assert!(estimate_total(&window) <= 24);
        assert!(window.len() < history.len() + 1);
        assert_eq!(history.len(), 7);
    }

    #[test]
    fn newest_message_is_sent_even_over_budget() {
        let history = ChatHistory::new();
        let pending = [Message::new(Role::User, "x".repeat(400))];
        let window = history.request_window(&pending, 10);
        assert_eq!(window.len(), 1);
    }
}
