//! Fixed user-facing texts.

use crate::domain::UserId;

/// Sent in reply to `/start`.
pub const WELCOME: &str = "Здравствуйте. Напишите, пожалуйста, подробно одним сообщением \
какой у вас вопрос. Оператор ответит в течение 10 минут.";

/// Sent to the user after their request has been forwarded to the operators.
pub const FORWARDED: &str = "Ваше сообщение отправлено в поддержку. Ожидайте ответа.";

/// One-time onboarding nudge for users who message the bot outside support mode.
pub const NUDGE: &str = "Пожалуйста, используйте /start для начала взаимодействия.";

/// Confirmation shown to an operator after their reply was delivered.
pub fn reply_delivered(user: UserId) -> String {
    format!("Ответ отправлен пользователю {}.", user.0)
}
