//! Admin API 实验管理

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::{info, trace};

use crate::services::{ExperimentService, NewVariant};

use super::helpers::api_result;
use super::types::{
    ConcludeRequest, CreateExperimentRequest, CreateVariantRequest, DeletedResponse,
};

/// 创建 draft 实验
pub async fn create_experiment(
    body: web::Json<CreateExperimentRequest>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let req = body.into_inner();
    info!("Admin API: create experiment on code {}", req.code_id);
    Ok(api_result(
        service.create(&req.code_id, req.target_confidence).await,
    ))
}

pub async fn create_variant(
    path: web::Path<String>,
    body: web::Json<CreateVariantRequest>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let experiment_id = path.into_inner();
    let req = body.into_inner();
    info!(
        "Admin API: add variant '{}' to experiment {}",
        req.slug, experiment_id
    );
    Ok(api_result(
        service
            .add_variant(
                &experiment_id,
                NewVariant {
                    label: req.label,
                    slug: req.slug,
                    destination_url: req.destination_url,
                    weight: req.weight,
                },
            )
            .await,
    ))
}

pub async fn get_results(
    path: web::Path<String>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    trace!("Admin API: results for experiment {}", id);
    Ok(api_result(service.results(&id).await))
}

pub async fn start_experiment(
    path: web::Path<String>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    info!("Admin API: start experiment {}", id);
    Ok(api_result(service.start(&id).await))
}

pub async fn pause_experiment(
    path: web::Path<String>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    info!("Admin API: pause experiment {}", id);
    Ok(api_result(service.pause(&id).await))
}

/// 结束实验，请求体可选
pub async fn conclude_experiment(
    path: web::Path<String>,
    body: Option<web::Json<ConcludeRequest>>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    info!(
        "Admin API: conclude experiment {} (forced winner: {:?})",
        id, req.winner_variant_id
    );
    Ok(api_result(
        service
            .conclude(&id, req.winner_variant_id.as_deref())
            .await,
    ))
}

pub async fn delete_variant(
    path: web::Path<String>,
    service: web::Data<Arc<ExperimentService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    info!("Admin API: delete variant {}", id);
    Ok(api_result(service.delete_variant(&id).await.map(|()| {
        DeletedResponse {
            id: id.clone(),
            deleted: true,
        }
    })))
}
