// ピクセル設定
//
// 環境変数からピクセルIDとアクセストークンのマッピングを読み込む。
// プロセス起動時に一度だけ読み込み、以降は読み取り専用としてハンドラーに注入する。
//
// PIXEL_TOKENSは次の3形式を受け付ける（先に成功した解釈を採用）:
//   1. JSONオブジェクト   {"<pixel_id>": "<token>"}
//   2. 区切り文字列       "<pixel_id>|<token>" または "<pixel_id>,<token>"
//   3. トークン単体       "<token>"（デフォルトピクセルにのみ適用）

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// PIXEL_ID未設定時のピクセルID
pub const DEFAULT_PIXEL_ID: &str = "1340570021110699";

/// Graph APIのベースURL既定値
pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.facebook.com";

/// Graph APIバージョン既定値
pub const DEFAULT_GRAPH_API_VERSION: &str = "v17.0";

/// トークン単体として扱う最小長（これ以下は誤設定とみなす）
const RAW_TOKEN_MIN_LENGTH: usize = 10;

const ENV_PIXEL_ID: &str = "PIXEL_ID";
const ENV_PIXEL_TOKENS: &str = "PIXEL_TOKENS";
const ENV_CAPI_SECRET: &str = "CAPI_SECRET";
const ENV_CAPI_SECRET_ENFORCED: &str = "CAPI_SECRET_ENFORCED";
const ENV_GRAPH_API_BASE_URL: &str = "CAPI_GRAPH_API_BASE_URL";
const ENV_GRAPH_API_VERSION: &str = "CAPI_GRAPH_API_VERSION";

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum CapiConfigError {
    /// Graph APIのベースURLが不正
    #[error("Graph APIのベースURLが不正です: {0}")]
    InvalidBaseUrl(String),
}

/// PIXEL_TOKENSの解釈結果
#[derive(Clone, PartialEq, Eq)]
pub enum PixelTokens {
    /// JSONオブジェクト（ピクセルID → トークン）
    JsonMap(HashMap<String, String>),
    /// "ID|TOKEN" / "ID,TOKEN"
    Pair { pixel_id: String, token: String },
    /// トークン単体
    Raw(String),
    /// どの形式にも当てはまらない
    Empty,
}

/// PIXEL_TOKENSの解釈戦略
pub type ParseStrategy = fn(&str) -> Option<PixelTokens>;

/// 解釈戦略（この順に試行し、最初に成功したものを採用）
pub const PARSE_STRATEGIES: &[(&str, ParseStrategy)] = &[
    ("json_map", parse_json_map),
    ("delimited_pair", parse_delimited_pair),
    ("raw_token", parse_raw_token),
];

impl PixelTokens {
    /// PIXEL_TOKENSの生文字列を解釈する
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        PARSE_STRATEGIES
            .iter()
            .find_map(|(_, strategy)| strategy(raw))
            .unwrap_or(PixelTokens::Empty)
    }

    /// 解釈された形式名（ログ用）
    pub fn kind(&self) -> &'static str {
        match self {
            PixelTokens::JsonMap(_) => "json_map",
            PixelTokens::Pair { .. } => "delimited_pair",
            PixelTokens::Raw(_) => "raw_token",
            PixelTokens::Empty => "empty",
        }
    }

    /// ピクセルIDに対応するアクセストークンを取得
    ///
    /// トークン単体形式は`pixel_id`がデフォルトピクセルと一致する場合のみ有効。
    pub fn token_for(&self, pixel_id: &str, default_pixel_id: &str) -> Option<&str> {
        let token = match self {
            PixelTokens::JsonMap(map) => map.get(pixel_id).map(String::as_str),
            PixelTokens::Pair { pixel_id: id, token } if id == pixel_id => Some(token.as_str()),
            PixelTokens::Raw(token) if pixel_id == default_pixel_id => Some(token.as_str()),
            _ => None,
        };
        token.filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for PixelTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // トークンはログに出さない
        match self {
            PixelTokens::JsonMap(map) => {
                let mut ids: Vec<&String> = map.keys().collect();
                ids.sort();
                f.debug_struct("JsonMap").field("pixel_ids", &ids).finish_non_exhaustive()
            }
            PixelTokens::Pair { pixel_id, .. } => f
                .debug_struct("Pair")
                .field("pixel_id", pixel_id)
                .finish_non_exhaustive(),
            PixelTokens::Raw(_) => f.write_str("Raw(..)"),
            PixelTokens::Empty => f.write_str("Empty"),
        }
    }
}

/// JSONオブジェクト形式（文字列値のみ採用）
///
/// JSONとして解釈できるがオブジェクトでない値（`"\"EAAB...\""`, `123`）は
/// 後続の戦略に回さず`Empty`とする。
fn parse_json_map(raw: &str) -> Option<PixelTokens> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let Some(object) = parsed.as_object() else {
        return Some(PixelTokens::Empty);
    };

    let map = object
        .iter()
        .filter_map(|(id, token)| token.as_str().map(|t| (id.clone(), t.trim().to_string())))
        .collect();

    Some(PixelTokens::JsonMap(map))
}

/// "ID|TOKEN" / "ID,TOKEN" 形式（"|"を優先）
fn parse_delimited_pair(raw: &str) -> Option<PixelTokens> {
    let separator = if raw.contains('|') {
        '|'
    } else if raw.contains(',') {
        ','
    } else {
        return None;
    };

    let mut parts = raw.split(separator).map(str::trim);
    let pixel_id = parts.next().filter(|p| !p.is_empty())?;
    let token = parts.next().filter(|t| !t.is_empty())?;

    Some(PixelTokens::Pair {
        pixel_id: pixel_id.to_string(),
        token: token.to_string(),
    })
}

/// トークン単体形式
fn parse_raw_token(raw: &str) -> Option<PixelTokens> {
    let looks_structured = raw.starts_with('{') || raw.contains('|') || raw.contains(',');
    if looks_structured || raw.len() <= RAW_TOKEN_MIN_LENGTH {
        return None;
    }
    Some(PixelTokens::Raw(raw.to_string()))
}

/// x-capi-secretヘッダーの検証方針
#[derive(Clone, PartialEq, Eq)]
pub enum SecretPolicy {
    /// 検証しない
    Disabled,
    /// ヘッダー値が一致しなければ拒否する
    Enforced(String),
}

impl SecretPolicy {
    /// ヘッダー値を検証する
    pub fn verify(&self, header_value: Option<&str>) -> bool {
        match self {
            SecretPolicy::Disabled => true,
            SecretPolicy::Enforced(expected) => header_value == Some(expected.as_str()),
        }
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, SecretPolicy::Enforced(_))
    }
}

impl std::fmt::Debug for SecretPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretPolicy::Disabled => f.write_str("Disabled"),
            SecretPolicy::Enforced(_) => f.write_str("Enforced(..)"),
        }
    }
}

/// Conversions API中継設定
#[derive(Debug, Clone)]
pub struct CapiConfig {
    pixel_id: String,
    pixel_tokens: PixelTokens,
    secret_policy: SecretPolicy,
    graph_api_base_url: Url,
    graph_api_version: String,
}

impl CapiConfig {
    /// 明示的な値で作成（Graph APIは既定値、シークレット検証なし）
    pub fn new(pixel_id: impl Into<String>, pixel_tokens: PixelTokens) -> Self {
        Self {
            pixel_id: pixel_id.into(),
            pixel_tokens,
            secret_policy: SecretPolicy::Disabled,
            graph_api_base_url: Url::parse(DEFAULT_GRAPH_API_BASE_URL)
                .expect("既定のGraph API URLは常に有効"),
            graph_api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
        }
    }

    /// シークレット検証方針を設定
    pub fn with_secret_policy(mut self, secret_policy: SecretPolicy) -> Self {
        self.secret_policy = secret_policy;
        self
    }

    /// Graph APIの接続先を設定
    pub fn with_graph_api(
        mut self,
        base_url: &str,
        version: impl Into<String>,
    ) -> Result<Self, CapiConfigError> {
        self.graph_api_base_url = parse_base_url(base_url)?;
        self.graph_api_version = version.into();
        Ok(self)
    }

    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `PIXEL_ID`: ピクセルID（既定: `DEFAULT_PIXEL_ID`）
    /// - `PIXEL_TOKENS`: トークンマッピング（既定: `{}`）
    /// - `CAPI_SECRET`: 期待するx-capi-secret値
    /// - `CAPI_SECRET_ENFORCED`: `true`/`1`の場合のみシークレットを検証
    /// - `CAPI_GRAPH_API_BASE_URL`: Graph APIのベースURL
    /// - `CAPI_GRAPH_API_VERSION`: Graph APIバージョン
    pub fn from_env() -> Result<Self, CapiConfigError> {
        let pixel_id = get_optional_string(ENV_PIXEL_ID).unwrap_or_else(|| DEFAULT_PIXEL_ID.to_string());
        let pixel_tokens = PixelTokens::parse(
            &get_optional_string(ENV_PIXEL_TOKENS).unwrap_or_else(|| "{}".to_string()),
        );

        let secret = get_optional_string(ENV_CAPI_SECRET);
        let enforced = get_optional_string(ENV_CAPI_SECRET_ENFORCED)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let secret_policy = match secret {
            Some(secret) if enforced => SecretPolicy::Enforced(secret),
            Some(_) => {
                warn!("CAPI_SECRETが設定されていますが、CAPI_SECRET_ENFORCEDが無効なため検証しません");
                SecretPolicy::Disabled
            }
            None => {
                if enforced {
                    warn!("CAPI_SECRET_ENFORCEDが有効ですが、CAPI_SECRETが未設定のため検証しません");
                }
                SecretPolicy::Disabled
            }
        };

        let base_url = get_optional_string(ENV_GRAPH_API_BASE_URL)
            .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE_URL.to_string());
        let graph_api_version = get_optional_string(ENV_GRAPH_API_VERSION)
            .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.to_string());

        let config = Self {
            pixel_id,
            pixel_tokens,
            secret_policy,
            graph_api_base_url: parse_base_url(&base_url)?,
            graph_api_version,
        };

        info!(
            pixel_id = %config.pixel_id,
            token_format = config.pixel_tokens.kind(),
            token_resolved = config.access_token().is_some(),
            secret_enforced = config.secret_policy.is_enforced(),
            graph_api_version = %config.graph_api_version,
            "CapiConfig loaded"
        );

        Ok(config)
    }

    pub fn pixel_id(&self) -> &str {
        &self.pixel_id
    }

    pub fn pixel_tokens(&self) -> &PixelTokens {
        &self.pixel_tokens
    }

    pub fn secret_policy(&self) -> &SecretPolicy {
        &self.secret_policy
    }

    pub fn graph_api_version(&self) -> &str {
        &self.graph_api_version
    }

    /// 設定済みピクセルのアクセストークン
    pub fn access_token(&self) -> Option<&str> {
        self.pixel_tokens.token_for(&self.pixel_id, &self.pixel_id)
    }

    /// イベント送信先URL（`<base>/<version>/<pixel_id>/events`、トークンは含まない）
    pub fn events_url(&self) -> Url {
        let mut url = self.graph_api_base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.graph_api_version)
                .push(&self.pixel_id)
                .push("events");
        }
        url
    }
}

fn parse_base_url(value: &str) -> Result<Url, CapiConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| CapiConfigError::InvalidBaseUrl(format!("{value}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(CapiConfigError::InvalidBaseUrl(value.to_string()));
    }
    Ok(url)
}

/// 文字列環境変数を読み込む（空文字・空白のみはNone扱い）
fn get_optional_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}
