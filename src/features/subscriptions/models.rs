use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 課金間隔の単位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// 日単位
    Day,
    /// 週単位
    Week,
    /// 月単位
    Month,
    /// 年単位
    Year,
}

impl TimeUnit {
    /// 外部入力の文字列を課金間隔の単位に変換する
    ///
    /// # 引数
    /// * `value` - 単位文字列（大文字小文字を区別しない）
    ///
    /// # 戻り値
    /// 対応する単位、または未知の文字列の場合はNone
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "day" => Some(TimeUnit::Day),
            "week" => Some(TimeUnit::Week),
            "month" => Some(TimeUnit::Month),
            "year" => Some(TimeUnit::Year),
            _ => None,
        }
    }

    /// 格納用の文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

/// サブスクリプションデータモデル
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Subscription {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub frequency_value: i64,
    /// 課金間隔の単位（外部入力由来のため生の文字列で保持する）
    pub time_unit: String,
    /// 次回発生日（この日が到来したら期日扱い、境界を含む）
    pub next_run: NaiveDate,
    pub starts_at: NaiveDate,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// サブスクリプション作成用DTO
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionDto {
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub frequency_value: i64,
    pub time_unit: String,
    /// 課金スケジュールの開始日（未指定の場合は当日）
    pub starts_at: Option<NaiveDate>,
}

/// 課金処理用のサブスクリプションビュー
///
/// due 解決クエリの結果行。追加の問い合わせなしに課金と通知を
/// 完了できるよう、通知先チャットIDまで含めてひとまとめに取得する。
#[derive(Debug, Clone)]
pub struct DueSubscription {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub frequency_value: i64,
    pub time_unit: String,
    pub next_run: NaiveDate,
    /// 所有ユーザーの通知チャネル識別子（未設定の場合は通知をスキップ）
    pub telegram_chat_id: Option<String>,
}
