use serde::Serialize;

/// 課金サイクル1回分の実行レポート（永続化しない）
///
/// 呼び出し元のラッパーがログ出力や監視のために消費する。
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// 課金に成功したサブスクリプション名
    pub charged: Vec<String>,
    /// リマインド対象になったサブスクリプション名
    pub reminded: Vec<String>,
    /// 課金に失敗した項目（次回実行時に自動的に再試行される）
    pub failed: Vec<FailedCharge>,
    /// 通知送信の失敗など、成否の分類に影響しない情報
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// 課金に失敗した項目の詳細
#[derive(Debug, Serialize)]
pub struct FailedCharge {
    pub subscription_id: i64,
    pub name: String,
    pub error: String,
}

impl RunReport {
    /// 処理件数を取得する（課金＋リマインド、失敗分は含めない）
    pub fn processed(&self) -> usize {
        self.charged.len() + self.reminded.len()
    }

    /// 呼び出し元へ返す明細文字列を生成する
    pub fn details(&self) -> Vec<String> {
        let mut details = Vec::with_capacity(self.charged.len() + self.reminded.len() + self.failed.len());

        for name in &self.charged {
            details.push(format!("✅ Charged: {name}"));
        }
        for name in &self.reminded {
            details.push(format!("⚠️ Telegram sent: {name}"));
        }
        for failed in &self.failed {
            details.push(format!("❌ Failed: {} ({})", failed.name, failed.error));
        }

        details
    }
}
