//! IdGenerator port - task id 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: `Clock` のタイムスタンプ + ランダムビットによる ULID

use crate::domain::TaskId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は task id を払い出す
///
/// # スレッド安全性
/// - `Send + Sync`: runner はタスク間で共有される
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// UlidGenerator は与えられた clock から ULID を生成
///
/// `FixedClock` ならタイムスタンプ部分は決定的で、ランダム部分が一意性を保ちます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskId::from(ulid)
    }
}
