//! 胜出 variant 判定

use super::significance::{MAX_SCANS_NEEDED, MIN_SAMPLE, evaluate_with_limits};
use crate::storage::models::Variant;

/// slug 最小的 variant 为对照组
pub fn control(variants: &[Variant]) -> Option<&Variant> {
    variants.iter().min_by(|a, b| a.slug.cmp(&b.slug))
}

/// 使用默认样本门槛判定胜者
pub fn determine_winner(variants: &[Variant], target_confidence: f64) -> Option<String> {
    determine_winner_with_limits(variants, target_confidence, MIN_SAMPLE, MAX_SCANS_NEEDED)
}

/// 判定胜者
///
/// - 按 slug 顺序，第一个显著且正向提升的实验组胜出
/// - 若所有实验组都显著且为负向，对照组胜出
/// - 其余情况（包括不足两个 variant）没有胜者
///
/// `min_sample` 与 `results` 报告使用的门槛一致，样本不足的比较永远不显著
pub fn determine_winner_with_limits(
    variants: &[Variant],
    target_confidence: f64,
    min_sample: u64,
    max_scans_needed: u64,
) -> Option<String> {
    if variants.len() < 2 {
        return None;
    }

    let mut ordered: Vec<&Variant> = variants.iter().collect();
    ordered.sort_by(|a, b| a.slug.cmp(&b.slug));
    let (control, challengers) = ordered.split_first()?;

    let mut all_significantly_worse = true;
    for challenger in challengers {
        let result = evaluate_with_limits(
            control.scan_count,
            challenger.scan_count,
            target_confidence,
            min_sample,
            max_scans_needed,
        );
        if result.is_significant && result.improvement > 0.0 {
            return Some(challenger.id.clone());
        }
        if !(result.is_significant && result.improvement < 0.0) {
            all_significantly_worse = false;
        }
    }

    if all_significantly_worse {
        Some(control.id.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, slug: &str, scans: u64) -> Variant {
        Variant {
            id: id.to_string(),
            experiment_id: "exp-1".to_string(),
            label: slug.to_string(),
            slug: slug.to_string(),
            destination_url: format!("https://example.com/{}", slug),
            weight: 50,
            scan_count: scans,
        }
    }

    #[test]
    fn test_needs_two_variants() {
        assert_eq!(determine_winner(&[], 0.95), None);
        assert_eq!(determine_winner(&[variant("v-a", "a", 1000)], 0.95), None);
    }

    #[test]
    fn test_challenger_wins() {
        let variants = vec![variant("v-b", "b", 220), variant("v-a", "a", 100)];
        assert_eq!(determine_winner(&variants, 0.95), Some("v-b".to_string()));
    }

    #[test]
    fn test_control_wins_when_all_worse() {
        let variants = vec![
            variant("v-a", "a", 300),
            variant("v-b", "b", 100),
            variant("v-c", "c", 120),
        ];
        assert_eq!(determine_winner(&variants, 0.95), Some("v-a".to_string()));
    }

    #[test]
    fn test_no_winner_when_inconclusive() {
        let variants = vec![variant("v-a", "a", 50), variant("v-b", "b", 55)];
        assert_eq!(determine_winner(&variants, 0.95), None);

        // 一个显著更差，另一个不显著
        let variants = vec![
            variant("v-a", "a", 300),
            variant("v-b", "b", 100),
            variant("v-c", "c", 290),
        ];
        assert_eq!(determine_winner(&variants, 0.95), None);
    }

    #[test]
    fn test_first_significant_challenger_in_slug_order() {
        let variants = vec![
            variant("v-c", "c", 400),
            variant("v-a", "a", 100),
            variant("v-b", "b", 300),
        ];
        assert_eq!(determine_winner(&variants, 0.95), Some("v-b".to_string()));
    }

    #[test]
    fn test_min_sample_floor_blocks_winner() {
        // 70 次扫码在默认门槛下足够显著
        let variants = vec![variant("v-a", "a", 10), variant("v-b", "b", 60)];
        assert_eq!(determine_winner(&variants, 0.95), Some("v-b".to_string()));

        assert_eq!(
            determine_winner_with_limits(&variants, 0.95, 1000, MAX_SCANS_NEEDED),
            None
        );
        assert_eq!(
            determine_winner_with_limits(&variants, 0.95, 70, MAX_SCANS_NEEDED),
            Some("v-b".to_string())
        );
    }

    #[test]
    fn test_control_is_smallest_slug() {
        let variants = vec![variant("v-z", "zeta", 1), variant("v-m", "alpha", 1)];
        assert_eq!(control(&variants).map(|v| v.id.as_str()), Some("v-m"));
    }
}
