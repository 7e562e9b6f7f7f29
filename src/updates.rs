use tracing::{error, info};

use crate::telegram::{MessageSender, Update};

const START_COMMAND: &str = "/start";

const HELP_TEXT: &str = "Please use the _/start_ command to fetch a new token.";

/// Derives the canned reply for an update: the destination chat id and the
/// Markdown text to send back.
pub fn reply_for(update: &Update) -> (String, String) {
    let chat_id = update.message.chat.id.to_string();
    let text = if update.message.text.starts_with(START_COMMAND) {
        format!(
            "Here is your chatId you can use to send messages to your Telegram account:\n\n_{chat_id}_"
        )
    } else {
        HELP_TEXT.to_string()
    };
    (chat_id, text)
}

/// Answers an update. Send failures are logged and dropped.
pub async fn process_update(sender: &dyn MessageSender, update: &Update) {
    let (chat_id, text) = reply_for(update);

    info!(update_id = update.update_id, %chat_id, "Replying to update");

    if let Err(e) = sender.send_message(&chat_id, &text).await {
        error!(%chat_id, "Failed to reply to update: {:#}", e);
    }
}
