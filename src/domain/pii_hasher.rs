// PIIハッシュ化
//
// Conversions APIの顧客情報パラメータ仕様に従い、メールアドレスと電話番号を
// 正規化した上でSHA-256（小文字hex）に変換する。
// 同じ入力からは常に同じダイジェストが得られる必要がある（外部サービス側の照合に使われる）。

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::UserDataInput;

/// 入力をtrim・小文字化した上でSHA-256のhex文字列に変換する
///
/// # Returns
/// 64文字の小文字hex文字列
pub fn sha256_normalized(input: &str) -> String {
    let normalized = input.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// メールアドレスをハッシュ化（空白のみの場合は`None`）
pub fn hash_email(email: &str) -> Option<String> {
    if email.trim().is_empty() {
        return None;
    }
    Some(sha256_normalized(email))
}

/// 電話番号から数字以外の文字をすべて除去する
///
/// 数字が1つも残らない場合は`None`を返す。
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() { None } else { Some(digits) }
}

/// 電話番号を正規化してハッシュ化
pub fn hash_phone(phone: &str) -> Option<String> {
    normalize_phone(phone).map(|digits| sha256_normalized(&digits))
}

/// 送信用にハッシュ化済みのユーザーデータ
///
/// 未設定のフィールドはJSONから省略される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HashedUserData {
    /// ハッシュ化メールアドレス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,

    /// ハッシュ化電話番号（数字のみに正規化済み）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,

    /// クライアントIPアドレス（ハッシュ化しない）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,

    /// クライアントUser-Agent（ハッシュ化しない）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
}

impl HashedUserData {
    /// 受信したユーザーデータからハッシュ化済みデータを構築
    pub fn from_input(input: &UserDataInput) -> Self {
        Self {
            em: input.email.as_deref().and_then(hash_email),
            ph: input.phone.as_deref().and_then(hash_phone),
            client_ip_address: non_blank(input.client_ip_address.as_deref()),
            client_user_agent: non_blank(input.client_user_agent.as_deref()),
        }
    }

    /// すべてのフィールドが未設定かどうか
    pub fn is_empty(&self) -> bool {
        self.em.is_none()
            && self.ph.is_none()
            && self.client_ip_address.is_none()
            && self.client_user_agent.is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // "user@example.com" のSHA-256
    const USER_EXAMPLE_SHA256: &str =
        "b4c9a289323b21a01c3e940f150eb9b8c542587f1abfd8f0e1cc1ffc5e475514";

    #[test]
    fn test_sha256_normalized_known_digest() {
        assert_eq!(sha256_normalized("user@example.com"), USER_EXAMPLE_SHA256);
    }

    #[test]
    fn test_sha256_normalized_is_lowercase_hex() {
        let digest = sha256_normalized("anything");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_email_ignores_case_and_surrounding_whitespace() {
        let canonical = hash_email("user@example.com").unwrap();
        assert_eq!(hash_email("User@Example.com").unwrap(), canonical);
        assert_eq!(hash_email("  USER@EXAMPLE.COM \n").unwrap(), canonical);
    }

    #[test]
    fn test_hash_email_is_deterministic() {
        assert_eq!(hash_email("a@b.c"), hash_email("a@b.c"));
    }

    #[test]
    fn test_hash_email_blank_is_none() {
        assert!(hash_email("").is_none());
        assert!(hash_email("   ").is_none());
    }

    #[test]
    fn test_normalize_phone_strips_non_digits() {
        assert_eq!(normalize_phone("+84 (912) 345-678").as_deref(), Some("84912345678"));
        assert_eq!(normalize_phone("0912.345.678").as_deref(), Some("0912345678"));
    }

    #[test]
    fn test_hash_phone_matches_hash_of_digits() {
        assert_eq!(hash_phone("+84 912-345-678"), Some(sha256_normalized("84912345678")));
    }

    #[test]
    fn test_hash_phone_without_digits_is_none() {
        assert!(hash_phone("no digits here").is_none());
        assert!(hash_phone("").is_none());
        assert!(hash_phone("+-() ").is_none());
    }

    #[test]
    fn test_from_input_passes_ip_and_user_agent_through() {
        let input = UserDataInput {
            email: Some("User@Example.com".to_string()),
            phone: Some("abc".to_string()),
            client_ip_address: Some("203.0.113.7".to_string()),
            client_user_agent: Some("Mozilla/5.0".to_string()),
        };

        let hashed = HashedUserData::from_input(&input);

        assert_eq!(hashed.em.as_deref(), Some(USER_EXAMPLE_SHA256));
        assert!(hashed.ph.is_none());
        assert_eq!(hashed.client_ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(hashed.client_user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_from_input_empty_is_empty() {
        let hashed = HashedUserData::from_input(&UserDataInput::default());
        assert!(hashed.is_empty());

        let json = serde_json::to_value(&hashed).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
