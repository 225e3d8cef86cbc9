//! Reply texts sent to users and administrators.

pub const WELCOME: &str = "👋 Привет! Я превращаю текст в голосовые сообщения.\n\n\
Просто отправь мне текст, и я отвечу голосом.\n\
Используй /help, чтобы узнать о паузах и ударениях.";

pub const HELP: &str = "ℹ️ Как пользоваться ботом:\n\n\
Отправь любой текст, и я озвучу его.\n\n\
⏸ Паузы:\n\
| короткая пауза\n\
|| средняя пауза\n\
||| длинная пауза\n\
|0.5| пауза в секундах\n\
<break time=\"1s\"/> пауза в секундах\n\n\
🔤 Ударения:\n\
з[а]мок или з{а}мок\n\
у'дарение\n\n\
Команды:\n\
/start приветствие\n\
/help эта справка";

pub const EMPTY_TEXT: &str = "❌ Сообщение пустое. Отправь текст, который нужно озвучить.";

pub const ADMIN_COMMANDS: &str = "Доступные команды:\n\
/block <vk_id> - заблокировать пользователя\n\
/unblock <vk_id> - разблокировать пользователя\n\
/send <vk_id> <текст> - отправить сообщение\n\
/admin <vk_id> - назначить админа\n\
/stats - статистика бота\n\
/broadcast <условия> <текст> - рассылка";

pub const INVALID_ID: &str = "❌ Неверный формат ID. Используйте числовое значение.";

pub const BLOCK_USAGE: &str = "❌ Использование: /block <vk_id>\nПример: /block 123456789";
pub const UNBLOCK_USAGE: &str = "❌ Использование: /unblock <vk_id>\nПример: /unblock 123456789";
pub const SEND_USAGE: &str =
    "❌ Использование: /send <vk_id> <текст сообщения>\nПример: /send 123456789 Привет!";
pub const ADMIN_USAGE: &str = "❌ Использование: /admin <vk_id>\nПример: /admin 123456789";
pub const BROADCAST_USAGE: &str = "❌ Использование: /broadcast [условия] <текст>\n\n\
Условия:\n\
gender=1 - только женщины\n\
gender=2 - только мужчины\n\
blocked=0 - только активные\n\
blocked=1 - только заблокированные\n\n\
Примеры:\n\
/broadcast gender=1 Привет, девушки!\n\
/broadcast gender=2 blocked=0 Привет, активные парни!";

pub const CANNOT_BLOCK_SELF: &str = "❌ Нельзя заблокировать самого себя!";
pub const CANNOT_BLOCK_ADMIN: &str = "❌ Нельзя заблокировать администратора!";
pub const SEND_MISSING_TEXT: &str = "❌ Не указан текст сообщения";
pub const BROADCAST_MISSING_TEXT: &str = "❌ Не указан текст для рассылки";
pub const BROADCAST_NO_RECIPIENTS: &str = "❌ Не найдено пользователей по указанным критериям";

pub fn generation_error(err: &str) -> String {
    format!("😔 Не удалось создать голосовое сообщение: {}", err)
}

pub fn unknown_command(command: &str) -> String {
    format!(
        "❓ Неизвестная команда: /{}\nИспользуйте /help для справки.",
        command
    )
}

pub fn new_admin_notice() -> String {
    format!("👑 Вы назначены администратором бота!\n\n{}", ADMIN_COMMANDS)
}

pub fn user_not_found(vk_id: i64) -> String {
    format!("❌ Пользователь с ID {} не найден", vk_id)
}

pub fn user_blocked(name: &str, vk_id: i64) -> String {
    format!("✅ Пользователь {} (ID: {}) заблокирован", name, vk_id)
}

pub fn user_unblocked(name: &str, vk_id: i64) -> String {
    format!("✅ Пользователь {} (ID: {}) разблокирован", name, vk_id)
}

pub fn message_sent(name: &str, vk_id: i64) -> String {
    format!("✅ Сообщение отправлено пользователю {} (ID: {})", name, vk_id)
}

pub fn send_failed(err: &str) -> String {
    format!("❌ Ошибка при отправке сообщения: {}", err)
}

pub fn already_admin(vk_id: i64) -> String {
    format!("❌ Пользователь с ID {} уже является администратором", vk_id)
}

pub fn admin_added(name: &str, vk_id: i64) -> String {
    format!("✅ Пользователь {} (ID: {}) назначен администратором", name, vk_id)
}

pub fn command_failed(err: &str) -> String {
    format!("❌ Ошибка: {}", err)
}

pub fn stats_failed(err: &str) -> String {
    format!("❌ Ошибка при получении статистики: {}", err)
}

pub fn invalid_filter(token: &str) -> String {
    format!("❌ Неверное условие рассылки: {}", token)
}

pub fn stats(total: i64, blocked: i64, active: i64, admins: i64) -> String {
    format!(
        "📊 Статистика бота:\n\n\
         👥 Всего пользователей: {}\n\
         🚫 Заблокированных: {}\n\
         ✅ Активных: {}\n\
         👑 Администраторов: {}\n\n",
        total, blocked, active, admins
    )
}

pub fn gender_breakdown(male: i64, female: i64, unknown: i64) -> String {
    format!(
        "👨 Мужчин: {}\n👩 Женщин: {}\n❓ Не указано: {}\n",
        male, female, unknown
    )
}

pub fn broadcast_report(sent: usize, failed: usize, total: usize) -> String {
    format!(
        "✅ Рассылка завершена!\n\n📤 Отправлено: {}\n❌ Ошибок: {}\n👥 Всего получателей: {}",
        sent, failed, total
    )
}
