/// 通知機能モジュール
///
/// 課金確定と期日間近のメッセージをユーザーの通知チャネルへ届けます。
/// 配信はベストエフォートであり、失敗しても確定済みの課金を
/// 巻き戻すことはありません。
pub mod dispatcher;
pub mod models;
pub mod telegram;

pub use dispatcher::dispatch_all;
pub use models::{NotificationJob, Notifier};
pub use telegram::TelegramNotifier;
