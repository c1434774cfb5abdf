/// Conversions API（Graph API）へのイベント送信
///
/// 1リクエストにつき1回だけPOSTする。再試行・タイムアウト上書きは行わない。
/// アクセストークンはクエリパラメータで渡すため、エラーメッセージやログにURLを含めないこと。
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::domain::EventsPayload;

/// 送信処理のエラー型
///
/// 外部サービスが非2xxを返した場合はエラーではなく`ConversionsApiResponse`として返す。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionsClientError {
    /// ネットワークエラー（接続失敗・タイムアウト等）
    #[error("Conversions API request failed: {0}")]
    Network(String),

    /// レスポンスボディの読み込みエラー
    #[error("Failed to read Conversions API response: {0}")]
    ResponseBody(String),
}

/// 外部サービスからのレスポンス
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionsApiResponse {
    /// HTTPステータスコード
    pub status: u16,
    /// レスポンスボディ（JSONでない場合は文字列として保持）
    pub body: Value,
}

impl ConversionsApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 2xxかどうか
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Conversions API送信トレイト
///
/// 実際のHTTPクライアントとテスト用モックを差し替えられるようにする。
#[async_trait]
pub trait ConversionsApiClient: Send + Sync {
    /// イベントを送信する
    ///
    /// # 引数
    /// * `events_url` - `<base>/<version>/<pixel_id>/events`
    /// * `access_token` - クエリパラメータとして付与するアクセストークン
    /// * `payload` - `{data: [event]}`
    ///
    /// # 戻り値
    /// * `Ok(ConversionsApiResponse)` - ステータスに関わらずレスポンスを受信できた
    /// * `Err(ConversionsClientError)` - 送信またはボディ読み込みに失敗
    async fn send_events(
        &self,
        events_url: &Url,
        access_token: &str,
        payload: &EventsPayload,
    ) -> Result<ConversionsApiResponse, ConversionsClientError>;
}

/// reqwestを使ったGraph APIクライアント
#[derive(Debug, Clone, Default)]
pub struct GraphApiClient {
    client: Client,
}

impl GraphApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 送信リクエストを構築
    fn build_request(
        &self,
        events_url: &Url,
        access_token: &str,
        payload: &EventsPayload,
    ) -> Result<reqwest::Request, reqwest::Error> {
        self.client
            .post(events_url.clone())
            .query(&[("access_token", access_token)])
            .json(payload)
            .build()
    }
}

#[async_trait]
impl ConversionsApiClient for GraphApiClient {
    #[instrument(skip_all, fields(url = %events_url))]
    async fn send_events(
        &self,
        events_url: &Url,
        access_token: &str,
        payload: &EventsPayload,
    ) -> Result<ConversionsApiResponse, ConversionsClientError> {
        let request = self
            .build_request(events_url, access_token, payload)
            .map_err(|e| ConversionsClientError::Network(e.without_url().to_string()))?;

        let response = self.client.execute(request).await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Conversions APIへのリクエスト失敗");
            ConversionsClientError::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            let e = e.without_url();
            error!(status, error = %e, "Conversions APIレスポンスの読み込み失敗");
            ConversionsClientError::ResponseBody(e.to_string())
        })?;

        debug!(status, body_len = text.len(), "Conversions APIレスポンス受信");

        Ok(ConversionsApiResponse::new(status, parse_response_body(text)))
    }
}

/// レスポンスボディをJSONとして解釈する（空ならnull、JSONでなければ文字列）
pub fn parse_response_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FixedEventIdGenerator, InboundEventRequest, OutboundEvent};
    use crate::domain::EventIdGenerator;
    use serde_json::json;

    fn payload() -> EventsPayload {
        let request = InboundEventRequest::from_body(br#"{"order_id":"A1"}"#).unwrap();
        let event_id = FixedEventIdGenerator("evt-1".to_string()).generate();
        EventsPayload::single(OutboundEvent::from_request(&request, event_id, 1_700_000_000, None))
    }

    #[test]
    fn test_response_is_success() {
        assert!(ConversionsApiResponse::new(200, Value::Null).is_success());
        assert!(ConversionsApiResponse::new(204, Value::Null).is_success());
        assert!(!ConversionsApiResponse::new(400, Value::Null).is_success());
        assert!(!ConversionsApiResponse::new(500, Value::Null).is_success());
    }

    #[test]
    fn test_parse_response_body() {
        assert_eq!(
            parse_response_body(r#"{"events_received":1}"#.to_string()),
            json!({"events_received": 1})
        );
        assert_eq!(parse_response_body("".to_string()), Value::Null);
        assert_eq!(
            parse_response_body("<html>Bad Gateway</html>".to_string()),
            json!("<html>Bad Gateway</html>")
        );
    }

    #[test]
    fn test_build_request_adds_token_query_and_json_body() {
        let client = GraphApiClient::new();
        let url = Url::parse("https://graph.facebook.com/v17.0/123/events").unwrap();

        let request = client.build_request(&url, "tok&en", &payload()).unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://graph.facebook.com/v17.0/123/events?access_token=tok%26en"
        );
        assert_eq!(
            request.headers().get(reqwest::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["event_id"], "evt-1");
        assert_eq!(json["data"][0]["custom_data"]["content_ids"], json!(["A1"]));
    }

    #[tokio::test]
    async fn test_network_error_does_not_leak_token() {
        let client = GraphApiClient::new();
        // 接続拒否されるポート
        let url = Url::parse("http://127.0.0.1:1/v17.0/123/events").unwrap();

        let err = client
            .send_events(&url, "super-secret-token", &payload())
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionsClientError::Network(_)));
        assert!(!err.to_string().contains("super-secret-token"));
    }
}
