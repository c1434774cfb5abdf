// Conversions API送信イベント
//
// 受信リクエストを外部サービスが期待する形（`{data: [event]}`）に変換する。

use serde::Serialize;

use crate::domain::{parse_currency_amount, CurrencyAmount, HashedUserData, InboundEventRequest};

/// custom_data.content_typeの固定値
pub const CONTENT_TYPE_PRODUCT: &str = "product";

/// custom_data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomData {
    /// 正規化済み金額
    pub value: CurrencyAmount,

    /// 通貨コード
    #[serde(skip_serializing_if = "String::is_empty")]
    pub currency: String,

    /// 常に"product"
    pub content_type: String,

    /// 商品ID（なければ省略）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_ids: Option<Vec<String>>,
}

/// 外部サービスへ送る1件のイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    pub event_name: String,

    /// UNIX秒
    pub event_time: i64,

    /// 重複排除キー
    pub event_id: String,

    /// 未設定時は`null`として送る
    pub event_source_url: Option<String>,

    /// ハッシュ化済みユーザーデータ（空の場合は省略）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<HashedUserData>,

    pub custom_data: CustomData,
}

impl OutboundEvent {
    /// 受信リクエストから送信イベントを構築する
    ///
    /// # Arguments
    /// * `request` - 受信リクエスト
    /// * `event_id` - 確定済みのevent_id（クライアント指定または生成値）
    /// * `event_time` - 送信時刻（UNIX秒）
    /// * `referer` - `event_source_url`未指定時に使うRefererヘッダー
    pub fn from_request(
        request: &InboundEventRequest,
        event_id: String,
        event_time: i64,
        referer: Option<&str>,
    ) -> Self {
        let hashed = HashedUserData::from_input(&request.user_data());

        let event_source_url = request
            .event_source_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .or(referer.filter(|url| !url.trim().is_empty()))
            .map(str::to_string);

        Self {
            event_name: request.event_name().to_string(),
            event_time,
            event_id,
            event_source_url,
            user_data: (!hashed.is_empty()).then_some(hashed),
            custom_data: CustomData {
                value: parse_currency_amount(request.value.as_ref()),
                currency: request.currency().to_string(),
                content_type: CONTENT_TYPE_PRODUCT.to_string(),
                content_ids: request.resolved_content_ids(),
            },
        }
    }
}

/// Graph APIへ送るリクエストボディ
///
/// 1リクエストにつき常に1件のイベントのみを含む。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsPayload {
    pub data: Vec<OutboundEvent>,
}

impl EventsPayload {
    pub fn single(event: OutboundEvent) -> Self {
        Self { data: vec![event] }
    }
}
