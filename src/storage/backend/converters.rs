use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::storage::models::{Assignment, Code, Experiment, ExperimentStatus, Variant};
use migration::entities::{assignment, code, experiment, variant};

/// 将 Sea-ORM Model 转换为 Code
pub fn model_to_code(model: code::Model) -> Code {
    Code {
        id: model.id,
        owner_id: model.owner_id,
        token: model.token,
        content_type: model.content_type,
        content: model.content,
        destination_url: model.destination_url,
        password_hash: model.password_hash.filter(|h| !h.is_empty()),
        active_from: model.active_from,
        active_until: model.active_until,
        expires_at: model.expires_at,
        landing_page: model.landing_page,
        scan_count: model.scan_count.max(0) as u64,
        archived: model.archived,
        created_at: model.created_at,
    }
}

/// 将 Code 转换为 ActiveModel
///
/// 更新时不写 scan_count / created_at，计数只允许通过原子递增修改
pub fn code_to_active_model(code: &Code, is_new: bool) -> code::ActiveModel {
    code::ActiveModel {
        id: Set(code.id.clone()),
        owner_id: Set(code.owner_id.clone()),
        token: Set(code.token.clone()),
        content_type: Set(code.content_type.clone()),
        content: Set(code.content.clone()),
        destination_url: Set(code.destination_url.clone()),
        password_hash: Set(code.password_hash.clone()),
        active_from: Set(code.active_from),
        active_until: Set(code.active_until),
        expires_at: Set(code.expires_at),
        landing_page: Set(code.landing_page),
        scan_count: if is_new {
            Set(code.scan_count as i64)
        } else {
            NotSet
        },
        archived: Set(code.archived),
        created_at: if is_new { Set(code.created_at) } else { NotSet },
    }
}

pub fn model_to_experiment(model: experiment::Model) -> Experiment {
    let status = ExperimentStatus::from_str(&model.status).unwrap_or_else(|_| {
        // 未知状态按 paused 处理，不参与分流
        warn!(
            "Experiment {} has unknown status '{}', treating as paused",
            model.id, model.status
        );
        ExperimentStatus::Paused
    });

    Experiment {
        id: model.id,
        code_id: model.code_id,
        status,
        target_confidence: model.target_confidence,
        winner_variant_id: model.winner_variant_id,
        started_at: model.started_at,
        completed_at: model.completed_at,
        created_at: model.created_at,
    }
}

pub fn experiment_to_active_model(exp: &Experiment) -> experiment::ActiveModel {
    experiment::ActiveModel {
        id: Set(exp.id.clone()),
        code_id: Set(exp.code_id.clone()),
        status: Set(exp.status.as_ref().to_string()),
        target_confidence: Set(exp.target_confidence),
        winner_variant_id: Set(exp.winner_variant_id.clone()),
        started_at: Set(exp.started_at),
        completed_at: Set(exp.completed_at),
        created_at: Set(exp.created_at),
    }
}

pub fn model_to_variant(model: variant::Model) -> Variant {
    Variant {
        id: model.id,
        experiment_id: model.experiment_id,
        label: model.label,
        slug: model.slug,
        destination_url: model.destination_url,
        weight: model.weight.clamp(1, 100) as u32,
        scan_count: model.scan_count.max(0) as u64,
    }
}

pub fn variant_to_active_model(v: &Variant) -> variant::ActiveModel {
    variant::ActiveModel {
        id: Set(v.id.clone()),
        experiment_id: Set(v.experiment_id.clone()),
        label: Set(v.label.clone()),
        slug: Set(v.slug.clone()),
        destination_url: Set(v.destination_url.clone()),
        weight: Set(v.weight as i32),
        scan_count: Set(v.scan_count as i64),
    }
}

pub fn model_to_assignment(model: assignment::Model) -> Assignment {
    Assignment {
        experiment_id: model.experiment_id,
        visitor_hash: model.visitor_hash,
        variant_id: model.variant_id,
        assigned_at: model.assigned_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    fn create_test_code_model() -> code::Model {
        code::Model {
            id: "c-1".to_string(),
            owner_id: "acct-1".to_string(),
            token: "menu".to_string(),
            content_type: "url".to_string(),
            content: r#"{"url":"https://example.com"}"#.to_string(),
            destination_url: None,
            password_hash: Some(String::new()),
            active_from: None,
            active_until: None,
            expires_at: None,
            landing_page: false,
            scan_count: -3,
            archived: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_model_to_code_sanitizes_fields() {
        let code = model_to_code(create_test_code_model());
        // 空密码等同于未设置
        assert!(code.password_hash.is_none());
        assert_eq!(code.scan_count, 0);
        assert_eq!(code.token, "menu");
    }

    #[test]
    fn test_code_update_never_touches_counter() {
        let code = model_to_code(create_test_code_model());
        let am = code_to_active_model(&code, false);
        assert!(matches!(am.scan_count, ActiveValue::NotSet));
        assert!(matches!(am.created_at, ActiveValue::NotSet));

        let am = code_to_active_model(&code, true);
        assert!(matches!(am.scan_count, ActiveValue::Set(0)));
    }

    #[test]
    fn test_model_to_experiment_unknown_status() {
        let model = experiment::Model {
            id: "e-1".to_string(),
            code_id: "c-1".to_string(),
            status: "exploded".to_string(),
            target_confidence: 0.95,
            winner_variant_id: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(model_to_experiment(model).status, ExperimentStatus::Paused);
    }

    #[test]
    fn test_model_to_variant_clamps_weight() {
        let model = variant::Model {
            id: "v-1".to_string(),
            experiment_id: "e-1".to_string(),
            label: "A".to_string(),
            slug: "a".to_string(),
            destination_url: "https://a.example.com".to_string(),
            weight: 0,
            scan_count: 7,
        };
        let v = model_to_variant(model);
        assert_eq!(v.weight, 1);
        assert_eq!(v.scan_count, 7);
    }
}
