use crate::shared::errors::{AppError, AppResult};
use log::info;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 現在の実行環境を判定する
///
/// # 戻り値
/// 現在の実行環境（Development または Production）
///
/// # 判定ロジック
/// 1. コンパイル時埋め込み環境変数を最優先
/// 2. 実行時環境変数 ENVIRONMENT を確認
/// 3. デバッグビルドの場合は Development
/// 4. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    // コンパイル時埋め込み環境変数を最優先
    if let Some(embedded_env) = option_env!("EMBEDDED_ENVIRONMENT") {
        return match embedded_env {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
    }

    // 実行時環境変数を確認
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        return match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
    }

    // フォールバック: ビルド設定に基づく判定
    if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    }
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # 引数
/// * `env` - 実行環境
///
/// # 戻り値
/// データベースファイル名
///
/// # ファイル名の規則
/// - 開発環境: "dev_billing.db"
/// - プロダクション環境: "billing.db"
pub fn get_database_filename(env: &Environment) -> &'static str {
    match env {
        Environment::Development => "dev_billing.db",
        Environment::Production => "billing.db",
    }
}

/// アプリケーション設定
///
/// 環境変数から読み込まれる。CRON_SECRET だけは必須で、
/// 未設定の場合は起動できない。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 実行環境
    pub environment: Environment,
    /// ログレベル（error / warn / info / debug / trace）
    pub log_level: String,
    /// 課金トリガーの認証に使う共有シークレット
    pub cron_secret: String,
    /// Telegram Bot APIのトークン（未設定の場合は通知をスキップ）
    pub telegram_bot_token: Option<String>,
    /// HTTPサーバーの待ち受けポート
    pub port: u16,
}

/// 既定の待ち受けポート
const DEFAULT_PORT: u16 = 8787;

impl AppConfig {
    /// 環境変数からアプリケーション設定を読み込む
    ///
    /// # 戻り値
    /// アプリケーション設定、または必須項目欠落時はエラー
    pub fn from_env() -> AppResult<Self> {
        let cron_secret = std::env::var("CRON_SECRET")
            .map_err(|_| AppError::configuration("CRON_SECRET が設定されていません"))?;

        if cron_secret.trim().is_empty() {
            return Err(AppError::configuration("CRON_SECRET が空です"));
        }

        let telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Ok(Self {
            environment: get_environment(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cron_secret,
            telegram_bot_token,
            port: parse_port(std::env::var("PORT").ok()),
        })
    }
}

/// PORT環境変数を解析する
///
/// # 引数
/// * `value` - PORT環境変数の値（未設定の場合はNone）
///
/// # 戻り値
/// ポート番号（解析できない場合は既定値）
fn parse_port(value: Option<String>) -> u16 {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("PORT の値が不正なため既定値を使用します: {raw}");
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

/// ログシステムを初期化する
///
/// # 引数
/// * `log_level` - ログレベル文字列
pub fn initialize_logging_system(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .init();

    info!("ログシステムを初期化しました: level={log_level}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_database_filename() {
        // 開発環境のデータベースファイル名をテスト
        assert_eq!(
            get_database_filename(&Environment::Development),
            "dev_billing.db"
        );

        // プロダクション環境のデータベースファイル名をテスト
        assert_eq!(get_database_filename(&Environment::Production), "billing.db");
    }

    #[test]
    fn test_environment_equality() {
        // Environment列挙型の等価性をテスト
        assert_eq!(Environment::Development, Environment::Development);
        assert_eq!(Environment::Production, Environment::Production);
        assert_ne!(Environment::Development, Environment::Production);
    }

    #[test]
    fn test_get_environment() {
        // 現在の環境を取得（実際の値はビルド設定に依存）
        let env = get_environment();
        assert!(matches!(
            env,
            Environment::Development | Environment::Production
        ));
    }

    #[test]
    fn test_parse_port() {
        // 未設定の場合は既定値
        assert_eq!(parse_port(None), DEFAULT_PORT);

        // 正常な値
        assert_eq!(parse_port(Some("9000".to_string())), 9000);

        // 解析できない値は既定値にフォールバック
        assert_eq!(parse_port(Some("abc".to_string())), DEFAULT_PORT);
    }
}
