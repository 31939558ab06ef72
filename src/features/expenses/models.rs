use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 経費データモデル（不変の台帳エントリ）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    pub concept: String,
    pub amount: f64,
    pub category: String,
    /// 処理時刻（RFC 3339）
    pub date: String,
    /// 経済的な発生日（課金由来の場合は支払対象の周期日）
    pub expense_date: NaiveDate,
    /// サブスクリプション由来の課金かどうか
    pub is_recurring: bool,
    pub created_at: String,
}

/// 経費作成用データ
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_id: String,
    pub concept: String,
    pub amount: f64,
    pub category: String,
    pub expense_date: NaiveDate,
    pub is_recurring: bool,
}
