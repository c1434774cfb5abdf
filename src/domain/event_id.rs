// event_id（重複排除キー）生成
//
// リクエストにevent_idが無い場合に使う生成器。テストで固定値を差し込めるようトレイトにしている。

use uuid::Uuid;

/// event_id生成トレイト
pub trait EventIdGenerator: Send + Sync {
    /// 新しいevent_idを生成する
    fn generate(&self) -> String;
}

/// ランダムなUUID v4を生成する実装
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidEventIdGenerator;

impl EventIdGenerator for UuidEventIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// 常に同じIDを返す生成器
#[derive(Debug, Clone)]
pub struct FixedEventIdGenerator(pub String);

impl EventIdGenerator for FixedEventIdGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}
