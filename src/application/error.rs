// 中継処理のエラー型
//
// ローカルで発生した失敗とHTTPステータスの対応を定義する。
// 外部サービスの非2xx応答はエラーではなく正常系の結果として扱う（502）。

use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use thiserror::Error;

use crate::application::relay_response::{json_response, RelayResponseBody};
use crate::domain::InboundEventError;
use crate::infrastructure::ConversionsClientError;

/// 中継処理のエラー
#[derive(Debug, Error)]
pub enum RelayError {
    /// POST/OPTIONS以外のメソッド
    #[error("Method not allowed")]
    MethodNotAllowed { method: String },

    /// x-capi-secretの不一致（検証有効時のみ）
    #[error("Invalid x-capi-secret")]
    InvalidSecret,

    /// ピクセルのアクセストークンが解決できない
    #[error("Missing access token for pixel. Check PIXEL_TOKENS env.")]
    MissingAccessToken,

    /// ボディのデコード失敗
    #[error(transparent)]
    MalformedBody(#[from] InboundEventError),

    /// 外部サービスへの送信失敗
    #[error(transparent)]
    Client(#[from] ConversionsClientError),
}

impl RelayError {
    /// 対応するHTTPステータス
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::InvalidSecret => StatusCode::UNAUTHORIZED,
            RelayError::MissingAccessToken
            | RelayError::MalformedBody(_)
            | RelayError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `{ok:false, error}`形式のレスポンスに変換
    pub fn into_response(self) -> Response<Body> {
        json_response(self.status(), &RelayResponseBody::failure(self.to_string()))
    }
}
