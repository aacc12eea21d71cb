//! Admin API 路由配置

use actix_web::web;

use crate::api::constants::API_VERSION;

use super::experiments::{
    conclude_experiment, create_experiment, create_variant, delete_variant, get_results,
    pause_experiment, start_experiment,
};

/// 实验路由 `/experiments`
///
/// 包含：
/// - POST /experiments - 创建实验
/// - POST /experiments/{id}/variants - 添加 variant
/// - GET /experiments/{id}/results - 实验结果
/// - POST /experiments/{id}/start - 启动
/// - POST /experiments/{id}/pause - 暂停
/// - POST /experiments/{id}/conclude - 结束并记录胜者
pub fn experiments_routes() -> actix_web::Scope {
    web::scope("/experiments")
        .route("", web::post().to(create_experiment))
        .route("/{id}/variants", web::post().to(create_variant))
        .route("/{id}/results", web::get().to(get_results))
        .route("/{id}/start", web::post().to(start_experiment))
        .route("/{id}/pause", web::post().to(pause_experiment))
        .route("/{id}/conclude", web::post().to(conclude_experiment))
}

/// variant 路由 `/variants`
pub fn variants_routes() -> actix_web::Scope {
    web::scope("/variants").route("/{id}", web::delete().to(delete_variant))
}

/// `/v1` 下的全部路由
pub fn admin_v1_routes() -> actix_web::Scope {
    web::scope(API_VERSION)
        .service(experiments_routes())
        .service(variants_routes())
}
