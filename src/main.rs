use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use subscription_billing::features::cron;
use subscription_billing::features::notifications::telegram::TelegramNotifier;
use subscription_billing::shared::config::environment::{initialize_logging_system, AppConfig};
use subscription_billing::shared::database;
use subscription_billing::AppState;

#[tokio::main]
async fn main() {
    // 環境変数を読み込み（.envファイルがある場合）
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // アプリケーション設定を読み込む
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("設定の読み込みに失敗しました: {e}");
            std::process::exit(1);
        }
    };

    // ログシステムを初期化
    initialize_logging_system(&config.log_level);

    info!("アプリケーション初期化を開始します...");

    if !dotenv_loaded {
        // .envファイルがない場合は無視（本番環境では環境変数が直接設定される）
        warn!(".envファイルが見つかりません。環境変数が直接設定されていることを確認してください。");
    }

    if config.telegram_bot_token.is_none() {
        warn!("TELEGRAM_BOT_TOKEN が未設定のため、通知は送信されません");
    }

    // データベースを初期化
    info!("データベースを初期化しています...");
    let db_conn = match database::initialize_database(&config.environment) {
        Ok(conn) => conn,
        Err(e) => {
            error!("データベースの初期化に失敗しました: {e}");
            std::process::exit(1);
        }
    };
    info!("データベースの初期化が完了しました");

    let notifier = TelegramNotifier::new(config.telegram_bot_token.clone());
    let port = config.port;

    let state = Arc::new(AppState {
        db: Mutex::new(db_conn),
        notifier,
        config,
    });

    info!("アプリケーション初期化が完了しました");

    // 課金トリガーサーバーを起動
    if let Err(e) = cron::serve(state, port).await {
        error!("サーバーの実行中にエラーが発生しました: {e}");
        std::process::exit(1);
    }
}
