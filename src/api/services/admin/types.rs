//! Admin API 类型定义

use serde::{Deserialize, Serialize};

/// 统一响应封装
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CreateExperimentRequest {
    pub code_id: String,
    pub target_confidence: Option<f64>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CreateVariantRequest {
    #[serde(default)]
    pub label: String,
    pub slug: String,
    pub destination_url: String,
    pub weight: u32,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ConcludeRequest {
    /// 指定胜者，留空则使用统计判定
    pub winner_variant_id: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}
