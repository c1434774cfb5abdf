/// Conversions API中継ハンドラー
///
/// 受信した購入イベントを正規化・ハッシュ化してConversions APIへ1件送信し、
/// 外部サービスの応答を呼び出し元に返す。
///
/// # 結果の対応
/// - OPTIONS → 204（CORSプリフライト）
/// - POST/OPTIONS以外 → 405
/// - 外部2xx → 200 `{ok:true, fb}`
/// - 外部非2xx → 502 `{ok:false, fb}`
/// - ローカルエラー → 500 `{ok:false, error}`
use lambda_http::http::header::REFERER;
use lambda_http::http::{Method, StatusCode};
use lambda_http::{Body, Request, Response};
use tracing::{debug, error, info, warn};

use crate::application::relay_response::{json_response, preflight_response, RelayResponseBody};
use crate::application::RelayError;
use crate::domain::{
    Clock, EventIdGenerator, EventsPayload, InboundEventRequest, OutboundEvent, SystemClock,
    UuidEventIdGenerator,
};
use crate::infrastructure::{CapiConfig, ConversionsApiClient, ConversionsApiResponse};

/// 共有シークレットのヘッダー名
pub const CAPI_SECRET_HEADER: &str = "x-capi-secret";

/// Conversions API中継ハンドラー
///
/// 設定・送信クライアント・ID生成器・時計はすべて外部から注入する。
/// 呼び出し間で可変状態は持たない。
pub struct CapiHandler<C, G = UuidEventIdGenerator, K = SystemClock>
where
    C: ConversionsApiClient,
    G: EventIdGenerator,
    K: Clock,
{
    /// 起動時に読み込んだ設定
    config: CapiConfig,
    /// Conversions API送信クライアント
    client: C,
    /// event_id生成器
    id_generator: G,
    /// event_time用の時計
    clock: K,
}

impl<C> CapiHandler<C>
where
    C: ConversionsApiClient,
{
    /// UUID生成器とシステム時計で作成
    pub fn new(config: CapiConfig, client: C) -> Self {
        Self::with_dependencies(config, client, UuidEventIdGenerator, SystemClock)
    }
}

impl<C, G, K> CapiHandler<C, G, K>
where
    C: ConversionsApiClient,
    G: EventIdGenerator,
    K: Clock,
{
    /// 依存をすべて指定して作成
    pub fn with_dependencies(config: CapiConfig, client: C, id_generator: G, clock: K) -> Self {
        Self {
            config,
            client,
            id_generator,
            clock,
        }
    }

    /// HTTPリクエストを処理してレスポンスを返す
    ///
    /// 失敗はすべてJSONレスポンスに変換されるため、このメソッド自体は失敗しない。
    pub async fn handle(&self, request: Request) -> Response<Body> {
        if request.method() == Method::OPTIONS {
            debug!("CORSプリフライト応答");
            return preflight_response();
        }

        match self.relay(&request).await {
            Ok(response) if response.is_success() => {
                info!(status = response.status, "Conversions APIへの中継成功");
                json_response(StatusCode::OK, &RelayResponseBody::accepted(response.body))
            }
            Ok(response) => {
                error!(
                    status = response.status,
                    fb = %response.body,
                    "Conversions APIがイベントを拒否"
                );
                json_response(
                    StatusCode::BAD_GATEWAY,
                    &RelayResponseBody::rejected(response.body),
                )
            }
            Err(err) => {
                match &err {
                    RelayError::MethodNotAllowed { method } => {
                        warn!(method = %method, "許可されていないメソッド");
                    }
                    RelayError::InvalidSecret => warn!("x-capi-secretが一致しません"),
                    other => error!(error = %other, "CAPIハンドラーエラー"),
                }
                err.into_response()
            }
        }
    }

    /// 検証・変換・送信を行う
    async fn relay(&self, request: &Request) -> Result<ConversionsApiResponse, RelayError> {
        if request.method() != Method::POST {
            return Err(RelayError::MethodNotAllowed {
                method: request.method().to_string(),
            });
        }

        let secret = request
            .headers()
            .get(CAPI_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !self.config.secret_policy().verify(secret) {
            return Err(RelayError::InvalidSecret);
        }

        let inbound = InboundEventRequest::from_body(request.body().as_ref())?;

        let access_token = self
            .config
            .access_token()
            .ok_or(RelayError::MissingAccessToken)?;

        let event_id = match inbound.event_id() {
            Some(id) => id.to_string(),
            None => self.id_generator.generate(),
        };

        let referer = request
            .headers()
            .get(REFERER)
            .and_then(|v| v.to_str().ok());

        let event = OutboundEvent::from_request(
            &inbound,
            event_id,
            self.clock.now_unix_seconds(),
            referer,
        );

        info!(
            pixel_id = self.config.pixel_id(),
            event_name = %event.event_name,
            event_id = %event.event_id,
            has_user_data = event.user_data.is_some(),
            "イベントを中継"
        );

        let payload = EventsPayload::single(event);
        debug!(
            payload = %serde_json::to_string(&payload).unwrap_or_default(),
            "Conversions API送信ペイロード"
        );

        let response = self
            .client
            .send_events(&self.config.events_url(), access_token, &payload)
            .await?;

        Ok(response)
    }
}
