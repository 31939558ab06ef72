use crate::features::subscriptions::models::TimeUnit;
use chrono::{Days, Months, NaiveDate};

/// 単位や間隔値が不正な場合に適用する既定の繰り上げ日数
pub const FALLBACK_ADVANCE_DAYS: u64 = 30;

/// 次回発生日を計算する
///
/// # 引数
/// * `unit` - 課金間隔の単位
/// * `magnitude` - 間隔値（1以上）
/// * `anchor` - 起点日。通常は現在のnext_runであり「今日」ではない。
///   複数周期ぶん延滞しているサブスクリプションも、1回の課金処理で
///   ちょうど1周期だけ前進する。
///
/// # 戻り値
/// anchorを単位×間隔値ぶん進めた日付
///
/// # 動作
/// 月・年の加算はカレンダー準拠で、月末を超える場合はその月の末日に
/// 丸める（2024-01-31の1か月後は2024-02-29）。間隔値が1未満の場合は
/// 警告を出して30日後にフォールバックする。副作用はなく決定的。
pub fn next_occurrence(unit: TimeUnit, magnitude: i64, anchor: NaiveDate) -> NaiveDate {
    if magnitude < 1 {
        log::warn!("不正な間隔値のため30日フォールバックを適用します: magnitude={magnitude}");
        return fallback_advance(anchor);
    }

    let advanced = match unit {
        TimeUnit::Day => anchor.checked_add_days(Days::new(magnitude as u64)),
        TimeUnit::Week => anchor.checked_add_days(Days::new(magnitude as u64 * 7)),
        TimeUnit::Month => u32::try_from(magnitude)
            .ok()
            .and_then(|m| anchor.checked_add_months(Months::new(m))),
        TimeUnit::Year => u32::try_from(magnitude)
            .ok()
            .and_then(|m| m.checked_mul(12))
            .and_then(|m| anchor.checked_add_months(Months::new(m))),
    };

    match advanced {
        Some(date) => date,
        None => {
            log::warn!(
                "日付計算が範囲外のため30日フォールバックを適用します: anchor={anchor}, magnitude={magnitude}"
            );
            fallback_advance(anchor)
        }
    }
}

/// 生の単位文字列から次回発生日を計算する
///
/// # 引数
/// * `unit` - 外部入力由来の単位文字列
/// * `magnitude` - 間隔値
/// * `anchor` - 起点日
///
/// # 戻り値
/// 次回発生日
///
/// データベースには外部入力由来の単位文字列がそのまま格納されているため、
/// 解析に失敗した場合は警告を出して30日フォールバックに切り替える。
/// 致命的エラーにはしない（運用者がデータを修正するまでの縮退動作）。
pub fn next_occurrence_from_raw(unit: &str, magnitude: i64, anchor: NaiveDate) -> NaiveDate {
    match TimeUnit::parse(unit) {
        Some(parsed) => next_occurrence(parsed, magnitude, anchor),
        None => {
            log::warn!("未知の間隔単位のため30日フォールバックを適用します: unit={unit}");
            fallback_advance(anchor)
        }
    }
}

/// 既定の繰り上げ日数ぶん前進させる
fn fallback_advance(anchor: NaiveDate) -> NaiveDate {
    anchor
        .checked_add_days(Days::new(FALLBACK_ADVANCE_DAYS))
        .unwrap_or(anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_occurrence_each_unit() {
        let anchor = date(2024, 3, 1);

        assert_eq!(
            next_occurrence(TimeUnit::Day, 1, anchor),
            date(2024, 3, 2)
        );
        assert_eq!(
            next_occurrence(TimeUnit::Week, 2, anchor),
            date(2024, 3, 15)
        );
        assert_eq!(
            next_occurrence(TimeUnit::Month, 1, anchor),
            date(2024, 4, 1)
        );
        assert_eq!(
            next_occurrence(TimeUnit::Year, 1, anchor),
            date(2025, 3, 1)
        );
    }

    #[test]
    fn test_month_end_clamps_to_last_day() {
        // 閏年: 2024-01-31 の1か月後は 2024-02-29
        assert_eq!(
            next_occurrence(TimeUnit::Month, 1, date(2024, 1, 31)),
            date(2024, 2, 29)
        );

        // 平年: 2023-01-31 の1か月後は 2023-02-28
        assert_eq!(
            next_occurrence(TimeUnit::Month, 1, date(2023, 1, 31)),
            date(2023, 2, 28)
        );

        // 閏日起点の1年後は 2025-02-28
        assert_eq!(
            next_occurrence(TimeUnit::Year, 1, date(2024, 2, 29)),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn test_deterministic() {
        let anchor = date(2024, 1, 31);

        let first = next_occurrence(TimeUnit::Month, 1, anchor);
        let second = next_occurrence(TimeUnit::Month, 1, anchor);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fallback_on_unknown_unit() {
        // 未知の単位は起点日からちょうど30日後にフォールバックする
        let anchor = date(2024, 3, 1);
        assert_eq!(
            next_occurrence_from_raw("fortnight", 1, anchor),
            date(2024, 3, 31)
        );
    }

    #[test]
    fn test_fallback_on_invalid_magnitude() {
        let anchor = date(2024, 3, 1);

        assert_eq!(
            next_occurrence(TimeUnit::Month, 0, anchor),
            date(2024, 3, 31)
        );
        assert_eq!(
            next_occurrence(TimeUnit::Day, -5, anchor),
            date(2024, 3, 31)
        );
    }

    #[test]
    fn test_raw_unit_is_case_insensitive() {
        let anchor = date(2024, 3, 1);
        assert_eq!(
            next_occurrence_from_raw("Month", 1, anchor),
            date(2024, 4, 1)
        );
    }

    #[quickcheck]
    fn prop_next_occurrence_advances(unit_index: u8, magnitude: u8, offset: u16) -> bool {
        // 単調前進: 有効な入力では必ず anchor より後の日付になる
        let unit = match unit_index % 4 {
            0 => TimeUnit::Day,
            1 => TimeUnit::Week,
            2 => TimeUnit::Month,
            _ => TimeUnit::Year,
        };
        let magnitude = i64::from(magnitude % 48) + 1;
        let anchor = date(2020, 1, 1) + Days::new(u64::from(offset));

        next_occurrence(unit, magnitude, anchor) > anchor
    }
}
