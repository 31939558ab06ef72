use super::models::Notifier;
use crate::features::billing::orchestrator::REMINDER_LEAD_DAYS;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::format_amount;
use async_trait::async_trait;
use chrono::NaiveDate;

/// メッセージ装飾の定数
const HEADER: &str = "💎 <b>Feednances</b>";
const SEPARATOR: &str = "▬▬▬▬▬▬▬▬▬▬▬▬▬▬";
const BADGE_SUCCESS: &str = "✅ <b>PAYMENT CONFIRMED</b>";
const BADGE_WARNING: &str = "⚠️ <b>PAYMENT REMINDER</b>";
const ICON_CALENDAR: &str = "📅";
const INDENT: &str = "   ";

/// Telegram Bot APIを使う通知クライアント
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: Option<String>,
}

impl TelegramNotifier {
    /// 新しい通知クライアントを作成する
    ///
    /// # 引数
    /// * `bot_token` - Botトークン（未設定の場合、送信はスキップされる）
    pub fn new(bot_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
        }
    }

    /// Telegramへメッセージを送信する
    ///
    /// # 引数
    /// * `chat_id` - 送信先のチャットID
    /// * `text` - HTML形式のメッセージ本文
    ///
    /// # 戻り値
    /// 成功時はOk(())、失敗時はエラー
    async fn send_message(&self, chat_id: &str, text: &str) -> AppResult<()> {
        let Some(token) = &self.bot_token else {
            log::warn!("TELEGRAM_BOT_TOKEN が未設定のため通知をスキップします");
            return Ok(());
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service("Telegram", e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "Telegram",
                format!("HTTP {}", response.status()),
            ));
        }

        log::info!("Telegram通知を送信しました: chat_id={chat_id}");

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_charged(
        &self,
        chat_id: &str,
        name: &str,
        amount: f64,
        next_date: NaiveDate,
    ) -> AppResult<()> {
        self.send_message(chat_id, &build_charged_message(name, amount, next_date))
            .await
    }

    async fn send_upcoming(
        &self,
        chat_id: &str,
        name: &str,
        amount: f64,
        due_date: NaiveDate,
    ) -> AppResult<()> {
        self.send_message(chat_id, &build_upcoming_message(name, amount, due_date))
            .await
    }
}

/// 課金確定メッセージを組み立てる
///
/// # 引数
/// * `name` - サブスクリプション名
/// * `amount` - 課金額
/// * `next_date` - 次回更新日
fn build_charged_message(name: &str, amount: f64, next_date: NaiveDate) -> String {
    let date_str = next_date.format("%b %-d");
    let amount_str = format_amount(amount);

    format!(
        "\n{HEADER}\n{SEPARATOR}\n\n{BADGE_SUCCESS}\n\n\
         Your subscription payment has been successfully processed.\n\n\
         <b>{name}</b>\n{INDENT}👉 <code>{amount_str}€</code>\n\n\
         {SEPARATOR}\n{ICON_CALENDAR} Next renewal: <b>{date_str}</b>\n"
    )
}

/// 期日間近のリマインドメッセージを組み立てる
///
/// # 引数
/// * `name` - サブスクリプション名
/// * `amount` - 課金額
/// * `due_date` - 期日
fn build_upcoming_message(name: &str, amount: f64, due_date: NaiveDate) -> String {
    let date_str = due_date.format("%-d %B");
    let amount_str = format_amount(amount);

    format!(
        "\n{HEADER}\n{SEPARATOR}\n\n{BADGE_WARNING}\n\n\
         Your subscription is due in <b>{REMINDER_LEAD_DAYS} days</b>.\n\n\
         <b>{name}</b>\n{INDENT}👉 <code>{amount_str}€</code>\n\n\
         {ICON_CALENDAR} Due date: <b>{date_str}</b>\n\n\
         {SEPARATOR}\n<i>💡 If you do not wish to renew, please cancel before this date to avoid charges.</i>\n"
    )
}
