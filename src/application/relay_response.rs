// 中継レスポンス生成
//
// 呼び出し元へ返すJSONボディ（`{ok, fb?, error?}`）とCORSヘッダーを構築する。

use lambda_http::http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// シリアライズ失敗時のボディ（通常は到達しない）
const FALLBACK_ERROR_BODY: &str = r#"{"ok":false,"error":"Failed to serialize response"}"#;

/// レスポンスボディ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponseBody {
    pub ok: bool,

    /// 外部サービスのレスポンス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fb: Option<Value>,

    /// ローカルエラーのメッセージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponseBody {
    /// 外部サービスが受理した
    pub fn accepted(fb: Value) -> Self {
        Self { ok: true, fb: Some(fb), error: None }
    }

    /// 外部サービスが拒否した
    pub fn rejected(fb: Value) -> Self {
        Self { ok: false, fb: Some(fb), error: None }
    }

    /// ローカルエラー
    pub fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, fb: None, error: Some(message.into()) }
    }
}

/// CORSヘッダーを生成
///
/// - Access-Control-Allow-Origin: *
/// - Access-Control-Allow-Methods: POST, OPTIONS
/// - Access-Control-Allow-Headers: Content-Type, x-capi-secret
pub fn build_cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, x-capi-secret"),
    );
    headers
}

/// JSONレスポンスを生成（CORSヘッダー付き）
pub fn json_response(status: StatusCode, body: &RelayResponseBody) -> Response<Body> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| FALLBACK_ERROR_BODY.to_string());

    let mut headers = build_cors_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut response = Response::new(Body::Text(json));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// CORSプリフライトへの応答（204、ボディなし）
pub fn preflight_response() -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = StatusCode::NO_CONTENT;
    *response.headers_mut() = build_cors_headers();
    response
}
