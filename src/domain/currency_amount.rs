// 金額パーサー
//
// クライアントから送られてくる緩いフォーマットの金額（"699k", "399.000", "1,299,000"）を
// custom_data.value用の数値に変換する。
//
// 文法（空白除去後）:
//   amount   = integer [ "." fraction ] [ "k" | "K" ]
//   integer  = digit { digit | "," }
//
// - "," は常に桁区切りとして除去する
// - "." は、k接尾辞がなく、先頭グループが0で始まらず、以降のグループがすべて3桁の場合は桁区切り
//   （"399.000" → 399000）、それ以外は小数点として扱う（"19.99", "1.5k"）
// - "k"/"K" 接尾辞は1000倍
// - 小数第2位で丸めた結果が正の有限値でない場合は`FALLBACK_AMOUNT`

use serde::{Serialize, Serializer};
use serde_json::Value;

/// 有効な金額が得られない場合の既定値
pub const FALLBACK_AMOUNT: f64 = 1.0;

/// 整数としてJSON出力できる上限（2^53）
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 正規化済みの金額
///
/// 整数値の場合はJSON整数（`399000`）、それ以外は浮動小数点としてシリアライズされる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrencyAmount(f64);

impl CurrencyAmount {
    /// 既定値（1）
    pub fn fallback() -> Self {
        Self(FALLBACK_AMOUNT)
    }

    /// 数値として取得
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for CurrencyAmount {
    fn default() -> Self {
        Self::fallback()
    }
}

impl Serialize for CurrencyAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 >= 0.0 && self.0 <= MAX_EXACT_INTEGER {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// リクエストの`value`フィールドを金額に変換する
///
/// 数値・数値文字列・k接尾辞付き文字列を受け付け、
/// 正の値が得られない場合は既定値（1）を返す。
pub fn parse_currency_amount(value: Option<&Value>) -> CurrencyAmount {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_amount_str(s),
        _ => None,
    };

    parsed
        .map(round_cents)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(CurrencyAmount)
        .unwrap_or_default()
}

/// 金額文字列をパースする（文法外の入力は`None`）
pub fn parse_amount_str(input: &str) -> Option<f64> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    let (body, thousands) = match compact.strip_suffix(['k', 'K']) {
        Some(rest) => (rest, true),
        None => (compact.as_str(), false),
    };

    let body = body.replace(',', "");
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let groups: Vec<&str> = body.split('.').collect();
    let numeric = if !thousands && is_dot_grouped(&groups) {
        groups.concat()
    } else if groups.len() <= 2 {
        groups.join(".")
    } else {
        return None;
    };

    if !numeric.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let multiplier = if thousands { 1000.0 } else { 1.0 };
    numeric.parse::<f64>().ok().map(|n| n * multiplier)
}

/// "1.299.000" のように "." が3桁ごとの桁区切りとして使われているか
///
/// 先頭グループが0で始まる場合（"0.500"）は小数として扱う。
fn is_dot_grouped(groups: &[&str]) -> bool {
    let (first, rest) = match groups.split_first() {
        Some(split) => split,
        None => return false,
    };
    !first.is_empty()
        && !first.starts_with('0')
        && first.len() <= 3
        && !rest.is_empty()
        && rest.iter().all(|g| g.len() == 3)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
