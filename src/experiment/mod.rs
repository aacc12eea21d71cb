//! A/B 实验引擎
//!
//! 分桶、选择、显著性与胜者判定全部是纯函数，存储由调用方负责。

pub mod bucket;
pub mod selector;
pub mod significance;
pub mod winner;

pub use bucket::bucket;
pub use selector::{Selection, select};
pub use significance::{SignificanceResult, evaluate, evaluate_with_limits, normal_cdf};
pub use winner::{control, determine_winner, determine_winner_with_limits};
