/// Conversions API中継HTTP Lambdaエントリポイント
///
/// Lambda Function URL経由で受信した購入イベントをConversions APIへ中継する。
/// 設定は起動時に一度だけ環境変数から読み込み、全リクエストで共有する。
use std::sync::Arc;

use capi_relay::application::CapiHandler;
use capi_relay::infrastructure::{init_logging, CapiConfig, GraphApiClient};
use lambda_http::{run, service_fn, Error, Request};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    info!("CAPI Lambda関数を初期化");

    let config = CapiConfig::from_env()?;
    let handler = Arc::new(CapiHandler::new(config, GraphApiClient::new()));

    run(service_fn(move |request: Request| {
        let handler = Arc::clone(&handler);
        async move {
            info!(method = %request.method(), "CAPIリクエスト受信");
            Ok::<_, Error>(handler.handle(request).await)
        }
    }))
    .await
}
