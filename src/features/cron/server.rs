use crate::features::billing::orchestrator::run_billing_cycle;
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use chrono::Utc;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// 課金トリガーのエンドポイントパス
const PROCESS_PATH: &str = "/cron/process-subscriptions";

/// 課金トリガー用HTTPサーバーを起動する
///
/// # 引数
/// * `state` - アプリケーション状態
/// * `port` - 待ち受けポート
///
/// # 戻り値
/// 待ち受けの継続中は返らない。バインド失敗時はエラー
pub async fn serve(state: Arc<AppState>, port: u16) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    log::info!("課金トリガーサーバーを開始しました: http://{addr}");

    loop {
        let (stream, _) = listener.accept().await.map_err(AppError::Io)?;
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                log::error!("HTTP接続処理エラー: {err}");
            }
        });
    }
}

/// HTTPリクエストを処理する
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    log::debug!("リクエストを受信: {} {}", req.method(), req.uri());

    match (req.method(), req.uri().path()) {
        (&Method::GET, PROCESS_PATH) => {
            let header = req
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok());

            if !is_authorized(header, &state.config.cron_secret) {
                log::warn!("認証に失敗した課金トリガー呼び出しを拒否しました");
                return Ok(plain_response(StatusCode::UNAUTHORIZED, "Unauthorized"));
            }

            // 基準時刻はシェル側で1度だけ取得し、エンジンには注入する
            let now = Utc::now();

            match run_billing_cycle(&state.db, &state.notifier, now).await {
                Ok(report) => {
                    let body = serde_json::json!({
                        "success": true,
                        "processed": report.processed(),
                        "details": report.details(),
                    });
                    Ok(json_response(StatusCode::OK, body.to_string()))
                }
                Err(e) => {
                    // インフラ由来の失敗のみがここに到達する。
                    // 件単位の失敗は200のレポートに含まれて返る。
                    log::error!("課金サイクルの実行に失敗しました: {e}");
                    let body = serde_json::json!({ "error": "Internal Server Error" });
                    Ok(json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        body.to_string(),
                    ))
                }
            }
        }
        _ => {
            log::debug!("未対応のリクエスト: {} {}", req.method(), req.uri().path());
            Ok(plain_response(StatusCode::NOT_FOUND, "Not Found"))
        }
    }
}

/// Authorizationヘッダーが共有シークレットと一致するか検証する
///
/// # 引数
/// * `header` - Authorizationヘッダーの値
/// * `secret` - 共有シークレット
///
/// # 戻り値
/// 認証成功の場合はtrue
fn is_authorized(header: Option<&str>, secret: &str) -> bool {
    match header {
        Some(value) => value == format!("Bearer {secret}"),
        None => false,
    }
}

/// JSONレスポンスを作成する
fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// プレーンテキストレスポンスを作成する
fn plain_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_authorized_success() {
        assert!(is_authorized(Some("Bearer secret-token"), "secret-token"));
    }

    #[test]
    fn test_is_authorized_missing_header() {
        assert!(!is_authorized(None, "secret-token"));
    }

    #[test]
    fn test_is_authorized_wrong_secret() {
        assert!(!is_authorized(Some("Bearer wrong"), "secret-token"));
    }

    #[test]
    fn test_is_authorized_wrong_scheme() {
        // Bearer以外のスキームは拒否する
        assert!(!is_authorized(Some("Basic secret-token"), "secret-token"));
        assert!(!is_authorized(Some("secret-token"), "secret-token"));
    }

    #[test]
    fn test_json_response_content_type() {
        let response = json_response(StatusCode::OK, "{}".to_string());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
