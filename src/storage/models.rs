use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::errors::{QrlinkerError, Result};

/// 可扫描实体
///
/// `content` 保存原始 JSON，按 `content_type` 解析为 [`ContentPayload`]。
/// 解析推迟到分发阶段，存储层读取永远不会因为内容损坏而失败。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    pub id: String,
    pub owner_id: String,
    pub token: String,
    pub content_type: String,
    pub content: String,
    pub destination_url: Option<String>,
    pub password_hash: Option<String>,
    pub active_from: Option<DateTime<Utc>>,
    pub active_until: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub landing_page: bool,
    #[serde(default)]
    pub scan_count: u64,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Code {
    /// 以类型化内容创建新 code
    pub fn new(owner_id: &str, token: &str, payload: &ContentPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            token: token.to_string(),
            content_type: payload.content_type().to_string(),
            content: payload.data_json(),
            destination_url: None,
            password_hash: None,
            active_from: None,
            active_until: None,
            expires_at: None,
            landing_page: false,
            scan_count: 0,
            archived: false,
            created_at: Utc::now(),
        }
    }

    pub fn payload(&self) -> Result<ContentPayload> {
        ContentPayload::parse(&self.content_type, &self.content)
    }
}

/// WiFi 加密方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WifiEncryption {
    #[default]
    Wpa,
    Wep,
    Nopass,
}

/// code 内容，按 content_type 区分的标签联合
///
/// 存储形态：`content_type` 列保存标签，`content` 列保存 `data` 部分的 JSON。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ContentPayload {
    // 直接跳转
    Url {
        url: Option<String>,
    },
    File {
        url: String,
    },

    // 协议 URI
    Phone {
        phone: String,
    },
    Sms {
        phone: String,
        message: Option<String>,
    },
    Email {
        email: String,
        subject: Option<String>,
        body: Option<String>,
    },
    Whatsapp {
        phone: String,
        message: Option<String>,
    },

    // 落地页（由展示层渲染）
    Wifi {
        ssid: String,
        password: Option<String>,
        #[serde(default)]
        encryption: WifiEncryption,
        #[serde(default)]
        hidden: bool,
    },
    Vcard {
        first_name: String,
        last_name: Option<String>,
        organization: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        website: Option<String>,
    },
    Text {
        text: String,
    },
    Event {
        title: String,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        location: Option<String>,
    },
}

impl ContentPayload {
    /// 由存储的两列还原
    pub fn parse(content_type: &str, content: &str) -> Result<Self> {
        let data: serde_json::Value = if content.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(content).map_err(|e| {
                QrlinkerError::malformed_content(format!(
                    "content for type '{}' is not valid JSON: {}",
                    content_type, e
                ))
            })?
        };

        let tagged = serde_json::json!({ "type": content_type, "data": data });
        serde_json::from_value(tagged).map_err(|e| {
            QrlinkerError::malformed_content(format!(
                "content does not match type '{}': {}",
                content_type, e
            ))
        })
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContentPayload::Url { .. } => "url",
            ContentPayload::File { .. } => "file",
            ContentPayload::Phone { .. } => "phone",
            ContentPayload::Sms { .. } => "sms",
            ContentPayload::Email { .. } => "email",
            ContentPayload::Whatsapp { .. } => "whatsapp",
            ContentPayload::Wifi { .. } => "wifi",
            ContentPayload::Vcard { .. } => "vcard",
            ContentPayload::Text { .. } => "text",
            ContentPayload::Event { .. } => "event",
        }
    }

    /// `content` 列的 JSON（去掉标签）
    pub fn data_json(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(serde_json::Value::take))
            .map(|data| data.to_string())
            .unwrap_or_else(|| "{}".to_string())
    }
}

/// 实验状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExperimentStatus {
    Draft,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub code_id: String,
    pub status: ExperimentStatus,
    pub target_confidence: f64,
    pub winner_variant_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Experiment {
    pub fn new(code_id: &str, target_confidence: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code_id: code_id.to_string(),
            status: ExperimentStatus::Draft,
            target_confidence,
            winner_variant_id: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub experiment_id: String,
    pub label: String,
    /// 按字典序最小的 slug 为对照组
    pub slug: String,
    pub destination_url: String,
    /// 流量权重，取值 [1, 100]
    pub weight: u32,
    #[serde(default)]
    pub scan_count: u64,
}

impl Variant {
    pub fn new(experiment_id: &str, slug: &str, destination_url: &str, weight: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            experiment_id: experiment_id.to_string(),
            label: slug.to_string(),
            slug: slug.to_string(),
            destination_url: destination_url.to_string(),
            weight,
            scan_count: 0,
        }
    }
}

/// 运行中的实验及其全部 variant
#[derive(Debug, Clone)]
pub struct RunningExperiment {
    pub experiment: Experiment,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub experiment_id: String,
    pub visitor_hash: String,
    pub variant_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// 上游计算好的设备 / 地理信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContext {
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

/// 待写入的扫码事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScan {
    pub code_id: String,
    pub scanned_at: DateTime<Utc>,
    pub context: ScanContext,
    pub variant_id: Option<String>,
    pub visitor_hash: Option<String>,
}
