//! 确定性分桶
//!
//! 同一 (experiment, visitor) 永远落在同一个桶，不依赖随机数或时钟。

use sha2::{Digest, Sha256};

/// 桶的数量，权重按千分比换算
pub const BUCKET_COUNT: u64 = 1000;

/// 计算访客在实验中的桶号，范围 `[0, 1000)`
pub fn bucket(experiment_id: &str, visitor_hash: &str) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(experiment_id.as_bytes());
    hasher.update(b":");
    hasher.update(visitor_hash.as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % BUCKET_COUNT) as u32
}
