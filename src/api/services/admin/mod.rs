//! Admin API 服务模块
//!
//! 实验生命周期管理与结果查询，全部挂在 `{api_prefix}/v1` 下并由
//! [`AdminAuth`](crate::api::middleware::AdminAuth) 保护。

pub mod error_code;
mod experiments;
mod helpers;
pub mod routes;
mod types;

pub use types::*;

pub use helpers::{api_result, error_from_qrlinker, error_response, success_response};

pub use error_code::ErrorCode;

pub use experiments::{
    conclude_experiment, create_experiment, create_variant, delete_variant, get_results,
    pause_experiment, start_experiment,
};
