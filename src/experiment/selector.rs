//! Variant 选择
//!
//! 纯函数：粘性数据（已有分配）由调用方传入，这里不访问存储。

use super::bucket::{BUCKET_COUNT, bucket};
use crate::errors::{QrlinkerError, Result};
use crate::storage::models::{Assignment, Variant};

/// 选择结果
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub variant: &'a Variant,
    /// 来自已有分配，调用方无需再写入
    pub sticky: bool,
}

/// 为访客选择 variant
///
/// 1. 没有 variant：`NoVariantsConfigured`
/// 2. 已有分配且 variant 仍存在：沿用
/// 3. 只有一个 variant：直接返回
/// 4. 否则按 slug 排序，用桶号落在累计权重区间上
pub fn select<'a>(
    experiment_id: &str,
    visitor_hash: &str,
    variants: &'a [Variant],
    prior: Option<&Assignment>,
) -> Result<Selection<'a>> {
    if variants.is_empty() {
        return Err(QrlinkerError::no_variants_configured(format!(
            "experiment {} is running without variants",
            experiment_id
        )));
    }

    if let Some(prior) = prior
        && let Some(variant) = variants.iter().find(|v| v.id == prior.variant_id)
    {
        return Ok(Selection {
            variant,
            sticky: true,
        });
    }

    if variants.len() == 1 {
        return Ok(Selection {
            variant: &variants[0],
            sticky: false,
        });
    }

    Ok(Selection {
        variant: weighted_pick(experiment_id, visitor_hash, variants),
        sticky: false,
    })
}

fn weighted_pick<'a>(experiment_id: &str, visitor_hash: &str, variants: &'a [Variant]) -> &'a Variant {
    let mut ordered: Vec<&Variant> = variants.iter().collect();
    ordered.sort_by(|a, b| a.slug.cmp(&b.slug));

    let total_weight: u64 = ordered.iter().map(|v| u64::from(v.weight.max(1))).sum();
    let target = f64::from(bucket(experiment_id, visitor_hash));

    let mut cumulative = 0.0;
    for variant in &ordered {
        cumulative += u64::from(variant.weight.max(1)) as f64 / total_weight as f64
            * BUCKET_COUNT as f64;
        if cumulative > target {
            return variant;
        }
    }

    // 浮点累计误差兜底
    ordered[ordered.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn variant(id: &str, slug: &str, weight: u32) -> Variant {
        Variant {
            id: id.to_string(),
            experiment_id: "exp-1".to_string(),
            label: slug.to_uppercase(),
            slug: slug.to_string(),
            destination_url: format!("https://{}.example.com", slug),
            weight,
            scan_count: 0,
        }
    }

    #[test]
    fn test_empty_variants_is_error() {
        let err = select("exp-1", "v", &[], None).unwrap_err();
        assert!(matches!(err, QrlinkerError::NoVariantsConfigured(_)));
    }

    #[test]
    fn test_single_variant_always_chosen() {
        let variants = vec![variant("v-a", "a", 1)];
        for i in 0..50 {
            let s = select("exp-1", &format!("visitor-{}", i), &variants, None).unwrap();
            assert_eq!(s.variant.id, "v-a");
            assert!(!s.sticky);
        }
    }

    #[test]
    fn test_prior_assignment_wins() {
        let variants = vec![variant("v-a", "a", 99), variant("v-b", "b", 1)];
        let prior = Assignment {
            experiment_id: "exp-1".to_string(),
            visitor_hash: "visitor".to_string(),
            variant_id: "v-b".to_string(),
            assigned_at: Utc::now(),
        };
        let s = select("exp-1", "visitor", &variants, Some(&prior)).unwrap();
        assert_eq!(s.variant.id, "v-b");
        assert!(s.sticky);
    }

    #[test]
    fn test_stale_prior_falls_back_to_bucket() {
        let variants = vec![variant("v-a", "a", 50), variant("v-b", "b", 50)];
        let prior = Assignment {
            experiment_id: "exp-1".to_string(),
            visitor_hash: "visitor".to_string(),
            variant_id: "v-deleted".to_string(),
            assigned_at: Utc::now(),
        };
        let s = select("exp-1", "visitor", &variants, Some(&prior)).unwrap();
        assert!(!s.sticky);
        let fresh = select("exp-1", "visitor", &variants, None).unwrap();
        assert_eq!(s.variant.id, fresh.variant.id);
    }

    #[test]
    fn test_selection_ignores_input_order() {
        let forward = vec![variant("v-a", "a", 30), variant("v-b", "b", 70)];
        let reversed = vec![variant("v-b", "b", 70), variant("v-a", "a", 30)];
        for i in 0..500 {
            let visitor = format!("visitor-{}", i);
            let x = select("exp-1", &visitor, &forward, None).unwrap();
            let y = select("exp-1", &visitor, &reversed, None).unwrap();
            assert_eq!(x.variant.id, y.variant.id);
        }
    }

    #[test]
    fn test_weights_converge() {
        let variants = vec![variant("v-a", "a", 30), variant("v-b", "b", 70)];
        let total = 100_000;
        let a_hits = (0..total)
            .filter(|i| {
                select("exp-converge", &format!("{:016x}", i), &variants, None)
                    .unwrap()
                    .variant
                    .id
                    == "v-a"
            })
            .count();
        let share = a_hits as f64 / total as f64;
        assert!((0.28..=0.32).contains(&share), "control share {}", share);
    }

    #[test]
    fn test_three_way_split_covers_all() {
        let variants = vec![
            variant("v-a", "a", 1),
            variant("v-b", "b", 1),
            variant("v-c", "c", 1),
        ];
        let mut seen = std::collections::HashSet::new();
        for i in 0..300 {
            let s = select("exp-3", &format!("visitor-{}", i), &variants, None).unwrap();
            seen.insert(s.variant.id.clone());
        }
        assert_eq!(seen.len(), 3);
    }
}
