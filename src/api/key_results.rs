use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use perfhub_core::models::*;
use perfhub_core::Database;
use uuid::Uuid;

use super::{blocking, ApiResult, CurrentActor};

pub async fn list_key_results(
    State(db): State<Database>,
    Path(okr_id): Path<Uuid>,
) -> ApiResult<Json<Vec<KeyResult>>> {
    let key_results = blocking(db, move |db| db.list_key_results_for_okr(okr_id)).await?;
    Ok(Json(key_results))
}

pub async fn create_key_result(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Path(okr_id): Path<Uuid>,
    Json(input): Json<CreateKeyResultInput>,
) -> ApiResult<(StatusCode, Json<KeyResult>)> {
    let key_result = blocking(db, move |db| db.create_key_result(okr_id, input, &actor)).await?;
    Ok((StatusCode::CREATED, Json(key_result)))
}

pub async fn key_result_tree(
    State(db): State<Database>,
    Path(okr_id): Path<Uuid>,
) -> ApiResult<Json<Vec<KeyResultNode>>> {
    Ok(Json(blocking(db, move |db| db.key_result_tree(okr_id)).await?))
}

pub async fn get_key_result(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<KeyResult>> {
    Ok(Json(blocking(db, move |db| db.get_key_result(id)).await?))
}

pub async fn update_key_result(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateKeyResultInput>,
) -> ApiResult<Json<KeyResult>> {
    let key_result = blocking(db, move |db| db.update_key_result(id, input, &actor)).await?;
    Ok(Json(key_result))
}

pub async fn delete_key_result(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::debug!("User {} deleting key result {}", actor.user_id, id);
    blocking(db, move |db| db.delete_key_result(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
