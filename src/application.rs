// アプリケーション層モジュール
pub mod capi_handler;
pub mod error;
pub mod relay_response;

// 再エクスポート
pub use capi_handler::{CapiHandler, CAPI_SECRET_HEADER};
pub use error::RelayError;
pub use relay_response::{build_cors_headers, json_response, preflight_response, RelayResponseBody};
