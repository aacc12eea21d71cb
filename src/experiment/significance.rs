//! 两比例 z 检验
//!
//! 比较对照组与实验组的扫码份额。引擎本身不会失败：
//! 样本不足时返回 "不显著" 以及还需要多少扫码。

use serde::Serialize;

/// 低于该样本量不做检验
pub const MIN_SAMPLE: u64 = 30;
/// 预估所需扫码数的上限
pub const MAX_SCANS_NEEDED: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignificanceResult {
    pub control_rate: f64,
    pub variant_rate: f64,
    /// 相对对照组的提升百分比
    pub improvement: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub confidence: f64,
    pub is_significant: bool,
    pub scans_needed: u64,
}

impl SignificanceResult {
    fn insufficient(total: u64, min_sample: u64) -> Self {
        Self {
            control_rate: 0.0,
            variant_rate: 0.0,
            improvement: 0.0,
            z_score: 0.0,
            p_value: 1.0,
            confidence: 0.0,
            is_significant: false,
            scans_needed: min_sample - total,
        }
    }
}

/// 使用默认样本门槛与上限评估
pub fn evaluate(control_count: u64, variant_count: u64, target_confidence: f64) -> SignificanceResult {
    evaluate_with_limits(
        control_count,
        variant_count,
        target_confidence,
        MIN_SAMPLE,
        MAX_SCANS_NEEDED,
    )
}

pub fn evaluate_with_limits(
    control_count: u64,
    variant_count: u64,
    target_confidence: f64,
    min_sample: u64,
    max_scans_needed: u64,
) -> SignificanceResult {
    let total = control_count.saturating_add(variant_count);
    if total < min_sample {
        return SignificanceResult::insufficient(total, min_sample);
    }

    let n = total as f64;
    let c = control_count as f64;
    let v = variant_count as f64;

    let p1 = c / n;
    let p2 = v / n;
    let pooled = (c + v) / (2.0 * n);
    let se = (pooled * (1.0 - pooled) * (2.0 / n)).sqrt();
    let z_score = if se == 0.0 { 0.0 } else { (p2 - p1) / se };

    let p_value = 2.0 * (1.0 - normal_cdf(z_score.abs()));
    let confidence = (1.0 - p_value).clamp(0.0, 1.0);
    let is_significant = confidence >= target_confidence;

    let improvement = if control_count > 0 {
        (v - c) / c * 100.0
    } else {
        0.0
    };

    let scans_needed = if is_significant {
        0
    } else {
        estimate_scans_needed(total, p_value, target_confidence, max_scans_needed)
    };

    SignificanceResult {
        control_rate: p1,
        variant_rate: p2,
        improvement,
        z_score,
        p_value,
        confidence,
        is_significant,
        scans_needed,
    }
}

/// 粗略估计达到目标置信度还需的扫码数，仅用于提示方向
fn estimate_scans_needed(total: u64, p_value: f64, target_confidence: f64, ceiling: u64) -> u64 {
    let alpha = 1.0 - target_confidence;
    if alpha <= 0.0 {
        return ceiling;
    }

    let estimate = (total as f64 * ((p_value / alpha).sqrt() - 1.0)).ceil();
    if !estimate.is_finite() || estimate >= ceiling as f64 {
        return ceiling;
    }
    (estimate.max(1.0) as u64).min(ceiling)
}

/// 标准正态分布累积函数
///
/// Abramowitz & Stegun 26.2.17，误差 < 7.5e-8
pub fn normal_cdf(z: f64) -> f64 {
    if z < 0.0 {
        return 1.0 - normal_cdf(-z);
    }
    let t = 1.0 / (1.0 + 0.231_641_9 * z);
    let d = 0.398_942_280_401_432_7 * (-0.5 * z * z).exp();
    let tail = d
        * t
        * (0.319_381_530
            + t * (-0.356_563_782 + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    1.0 - tail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_normal_cdf_known_values() {
        assert!(approx(normal_cdf(0.0), 0.5, 1e-6));
        assert!(approx(normal_cdf(1.0), 0.841_344_746, 1e-6));
        assert!(approx(normal_cdf(-1.0), 0.158_655_254, 1e-6));
        assert!(approx(normal_cdf(1.959_964), 0.975, 1e-6));
        assert!(approx(normal_cdf(2.575_829), 0.995, 1e-6));
        assert!(approx(normal_cdf(-3.0), 0.001_349_898, 1e-6));
        assert!(normal_cdf(8.0) <= 1.0);
    }

    #[test]
    fn test_insufficient_sample() {
        let r = evaluate(10, 12, 0.95);
        assert!(!r.is_significant);
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.z_score, 0.0);
        assert_eq!(r.scans_needed, 8);

        assert_eq!(evaluate(0, 0, 0.95).scans_needed, 30);
    }

    #[test]
    fn test_clear_winner_is_significant() {
        let r = evaluate(100, 220, 0.95);
        assert!(r.is_significant);
        assert!(approx(r.improvement, 120.0, 1e-9));
        assert!(r.z_score > 9.0);
        assert!(r.p_value < 1e-6);
        assert!(r.confidence > 0.999);
        assert_eq!(r.scans_needed, 0);
        assert!(approx(r.control_rate, 0.3125, 1e-12));
        assert!(approx(r.variant_rate, 0.6875, 1e-12));
    }

    #[test]
    fn test_close_split_needs_more_scans() {
        let r = evaluate(50, 55, 0.95);
        assert!(!r.is_significant);
        assert!(r.p_value > 0.05);
        assert!(r.scans_needed >= 1);
        assert!(r.scans_needed <= MAX_SCANS_NEEDED);
    }

    #[test]
    fn test_equal_counts() {
        let r = evaluate(40, 40, 0.95);
        assert_eq!(r.z_score, 0.0);
        assert!(approx(r.p_value, 1.0, 1e-6));
        assert!(!r.is_significant);
        assert_eq!(r.improvement, 0.0);
    }

    #[test]
    fn test_z_score_antisymmetric() {
        for (c, v) in [(30, 70), (100, 220), (45, 38), (500, 512)] {
            let forward = evaluate(c, v, 0.95);
            let backward = evaluate(v, c, 0.95);
            assert!(approx(forward.z_score, -backward.z_score, 1e-12));
            assert!(approx(forward.p_value, backward.p_value, 1e-12));
        }
    }

    #[test]
    fn test_zero_control_has_no_improvement() {
        let r = evaluate(0, 40, 0.95);
        assert_eq!(r.improvement, 0.0);
        assert!(r.is_significant);
    }

    #[test]
    fn test_unreachable_target_hits_ceiling() {
        let r = evaluate(50, 55, 1.0);
        assert!(!r.is_significant);
        assert_eq!(r.scans_needed, MAX_SCANS_NEEDED);

        let r = evaluate_with_limits(50, 55, 1.0, 30, 500);
        assert_eq!(r.scans_needed, 500);
    }

    #[test]
    fn test_custom_min_sample() {
        let r = evaluate_with_limits(20, 30, 0.95, 100, MAX_SCANS_NEEDED);
        assert_eq!(r.scans_needed, 50);
        assert!(!r.is_significant);
    }
}
