use chrono::{DateTime, Utc};
use chrono_tz::Europe::Madrid;

/// 監査用タイムスタンプ文字列を生成する
///
/// # 引数
/// * `now` - 基準時刻（UTC）
///
/// # 戻り値
/// マドリード時間に変換したRFC 3339形式の文字列
///
/// created_at / updated_at / 処理時刻の記録に使用する。
pub fn audit_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Madrid).to_rfc3339()
}

/// 金額を表示用文字列に整形する
///
/// # 引数
/// * `amount` - 金額
///
/// # 戻り値
/// 小数点以下2桁の文字列
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}
