// インフラストラクチャ層モジュール
pub mod conversions_client;
pub mod logging;
pub mod pixel_config;

// 再エクスポート
pub use conversions_client::{
    parse_response_body, ConversionsApiClient, ConversionsApiResponse, ConversionsClientError,
    GraphApiClient,
};
pub use logging::init_logging;
#[cfg(test)]
pub use logging::init_test_logging;
pub use pixel_config::{
    CapiConfig, CapiConfigError, PixelTokens, SecretPolicy, DEFAULT_GRAPH_API_BASE_URL,
    DEFAULT_GRAPH_API_VERSION, DEFAULT_PIXEL_ID,
};
