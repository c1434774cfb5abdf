// 受信イベントリクエスト
//
// 呼び出し元から受け取るJSONボディのモデルとデコード処理。
// ボディはJSONオブジェクト、またはJSONオブジェクトを文字列化したJSON文字列のどちらも受け付ける。

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// `event_name`未指定時の既定値
pub const DEFAULT_EVENT_NAME: &str = "Purchase";

/// `currency`未指定時の既定値
pub const DEFAULT_CURRENCY: &str = "VND";

/// ボディデコードのエラー型
#[derive(Debug, Error)]
pub enum InboundEventError {
    /// JSONとしてパースできない
    #[error("Invalid JSON body: {0}")]
    InvalidJson(serde_json::Error),

    /// JSONだがオブジェクトではない
    #[error("Request body must be a JSON object")]
    NotAnObject,

    /// フィールドの型が不正
    #[error("Invalid event field: {0}")]
    InvalidField(serde_json::Error),
}

/// 受信ユーザーデータ（ハッシュ化前）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserDataInput {
    #[serde(default, deserialize_with = "string_like")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub phone: Option<String>,
    #[serde(default)]
    pub client_ip_address: Option<String>,
    #[serde(default)]
    pub client_user_agent: Option<String>,
}

/// 受信イベントリクエスト
///
/// 既定値を持つフィールド（`event_name`, `currency`）は`null`・未指定のどちらでも
/// アクセサ経由で既定値が返る。未知のフィールドは無視する。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundEventRequest {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub event_id: Option<String>,
    #[serde(default, deserialize_with = "string_like")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "string_like_list")]
    pub content_ids: Option<Vec<String>>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub user_data: Option<UserDataInput>,
    #[serde(default)]
    pub event_source_url: Option<String>,
}

impl InboundEventRequest {
    /// HTTPボディをデコードする
    ///
    /// - 空ボディは`{}`として扱う
    /// - JSON文字列の場合は中身をもう一度JSONとしてパースする
    pub fn from_body(body: &[u8]) -> Result<Self, InboundEventError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let mut value: Value =
            serde_json::from_slice(body).map_err(InboundEventError::InvalidJson)?;

        if let Value::String(inner) = &value {
            if inner.trim().is_empty() {
                return Ok(Self::default());
            }
            value = serde_json::from_str(inner).map_err(InboundEventError::InvalidJson)?;
        }

        if !value.is_object() {
            return Err(InboundEventError::NotAnObject);
        }

        serde_json::from_value(value).map_err(InboundEventError::InvalidField)
    }

    /// イベント名（未指定時は"Purchase"）
    pub fn event_name(&self) -> &str {
        self.event_name.as_deref().unwrap_or(DEFAULT_EVENT_NAME)
    }

    /// 通貨コード（未指定時は"VND"）
    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    /// クライアント指定のevent_id（空文字は未指定扱い）
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// 送信用のcontent_ids
    ///
    /// 空でない`content_ids`があればそのまま、なければ`order_id`から`[order_id]`を作る。
    /// どちらもない場合は`None`。
    pub fn resolved_content_ids(&self) -> Option<Vec<String>> {
        if let Some(ids) = self.content_ids.as_ref().filter(|ids| !ids.is_empty()) {
            return Some(ids.clone());
        }
        self.order_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| vec![id.to_string()])
    }

    /// ユーザーデータ（未指定時は空）
    pub fn user_data(&self) -> UserDataInput {
        self.user_data.clone().unwrap_or_default()
    }
}

/// 文字列または数値
#[derive(Deserialize)]
#[serde(untagged)]
enum StringLike {
    Text(String),
    Number(serde_json::Number),
}

impl From<StringLike> for String {
    fn from(value: StringLike) -> Self {
        match value {
            StringLike::Text(s) => s,
            StringLike::Number(n) => n.to_string(),
        }
    }
}

fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringLike>::deserialize(deserializer).map(|v| v.map(String::from))
}

fn string_like_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<StringLike>>::deserialize(deserializer)
        .map(|v| v.map(|items| items.into_iter().map(String::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_body_uses_defaults() {
        let request = InboundEventRequest::from_body(b"").unwrap();

        assert_eq!(request.event_name(), "Purchase");
        assert_eq!(request.currency(), "VND");
        assert!(request.event_id().is_none());
        assert!(request.resolved_content_ids().is_none());
        assert!(request.value.is_none());
        assert_eq!(request.user_data(), UserDataInput::default());
    }

    #[test]
    fn test_object_body() {
        let body = json!({
            "event_name": "AddToCart",
            "event_id": "evt-1",
            "order_id": "ORD123",
            "currency": "USD",
            "content_ids": ["P1", "P2"],
            "value": "699k",
            "user_data": {"email": "a@b.c", "phone": "0912 345 678"},
            "event_source_url": "https://shop.example.com/checkout"
        });

        let request = InboundEventRequest::from_body(body.to_string().as_bytes()).unwrap();

        assert_eq!(request.event_name(), "AddToCart");
        assert_eq!(request.event_id(), Some("evt-1"));
        assert_eq!(request.currency(), "USD");
        assert_eq!(request.resolved_content_ids(), Some(vec!["P1".to_string(), "P2".to_string()]));
        assert_eq!(request.value, Some(json!("699k")));
        assert_eq!(request.user_data().email.as_deref(), Some("a@b.c"));
        assert_eq!(request.event_source_url.as_deref(), Some("https://shop.example.com/checkout"));
    }

    #[test]
    fn test_json_encoded_string_body() {
        let inner = json!({"order_id": "A1"}).to_string();
        let body = serde_json::to_string(&inner).unwrap();

        let request = InboundEventRequest::from_body(body.as_bytes()).unwrap();

        assert_eq!(request.order_id.as_deref(), Some("A1"));
    }

    #[test]
    fn test_content_ids_default_to_order_id() {
        let request = InboundEventRequest::from_body(br#"{"order_id":"ORD123"}"#).unwrap();
        assert_eq!(request.resolved_content_ids(), Some(vec!["ORD123".to_string()]));
    }

    #[test]
    fn test_empty_content_ids_fall_back_to_order_id() {
        let request =
            InboundEventRequest::from_body(br#"{"order_id":"ORD123","content_ids":[]}"#).unwrap();
        assert_eq!(request.resolved_content_ids(), Some(vec!["ORD123".to_string()]));
    }

    #[test]
    fn test_numeric_identifiers_are_stringified() {
        let request = InboundEventRequest::from_body(
            br#"{"order_id":1001,"content_ids":[5,"SKU-6"],"user_data":{"phone":84912345678}}"#,
        )
        .unwrap();

        assert_eq!(request.order_id.as_deref(), Some("1001"));
        assert_eq!(request.resolved_content_ids(), Some(vec!["5".to_string(), "SKU-6".to_string()]));
        assert_eq!(request.user_data().phone.as_deref(), Some("84912345678"));
    }

    #[test]
    fn test_null_fields_use_defaults() {
        let request = InboundEventRequest::from_body(
            br#"{"event_name":null,"currency":null,"user_data":null,"event_id":""}"#,
        )
        .unwrap();

        assert_eq!(request.event_name(), "Purchase");
        assert_eq!(request.currency(), "VND");
        assert!(request.event_id().is_none());
        assert_eq!(request.user_data(), UserDataInput::default());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let request = InboundEventRequest::from_body(br#"{"foo":"bar","order_id":"X"}"#).unwrap();
        assert_eq!(request.order_id.as_deref(), Some("X"));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = InboundEventRequest::from_body(b"{not json").unwrap_err();
        assert!(matches!(err, InboundEventError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = InboundEventRequest::from_body(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, InboundEventError::NotAnObject));
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let err = InboundEventRequest::from_body(br#"{"content_ids":"P1"}"#).unwrap_err();
        assert!(matches!(err, InboundEventError::InvalidField(_)));
    }
}
