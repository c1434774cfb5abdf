// ドメイン層モジュール
pub mod clock;
pub mod currency_amount;
pub mod event_id;
pub mod inbound_event;
pub mod outbound_event;
pub mod pii_hasher;

// 再エクスポート
pub use clock::{Clock, FixedClock, SystemClock};
pub use currency_amount::{parse_amount_str, parse_currency_amount, CurrencyAmount, FALLBACK_AMOUNT};
pub use event_id::{EventIdGenerator, FixedEventIdGenerator, UuidEventIdGenerator};
pub use inbound_event::{
    InboundEventError, InboundEventRequest, UserDataInput, DEFAULT_CURRENCY, DEFAULT_EVENT_NAME,
};
pub use outbound_event::{CustomData, EventsPayload, OutboundEvent, CONTENT_TYPE_PRODUCT};
pub use pii_hasher::{hash_email, hash_phone, normalize_phone, sha256_normalized, HashedUserData};
