pub mod telegram;

/// A text message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat the reply goes back to
    pub chat_id: i64,
    /// Display name of the sender, for logging only
    pub user_name: String,
    /// The message text, exactly as sent
    pub text: String,
}
