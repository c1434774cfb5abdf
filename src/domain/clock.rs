// event_time用の時計

use chrono::Utc;

/// 現在時刻（UNIX秒）を返すトレイト
pub trait Clock: Send + Sync {
    fn now_unix_seconds(&self) -> i64;
}

/// システム時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// 固定時刻を返す時計
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix_seconds(&self) -> i64 {
        self.0
    }
}
