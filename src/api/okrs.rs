use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use perfhub_core::models::*;
use perfhub_core::Database;
use uuid::Uuid;

use super::{blocking, ApiResult, CurrentActor};

pub async fn list_okrs(
    State(db): State<Database>,
    Query(filter): Query<OkrFilter>,
) -> ApiResult<Json<Vec<OkrWithProgress>>> {
    Ok(Json(blocking(db, move |db| db.list_okrs(&filter)).await?))
}

pub async fn create_okr(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<CreateOkrInput>,
) -> ApiResult<(StatusCode, Json<Okr>)> {
    let okr = blocking(db, move |db| db.create_okr(input, &actor)).await?;
    Ok((StatusCode::CREATED, Json(okr)))
}

pub async fn get_okr(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OkrWithProgress>> {
    Ok(Json(
        blocking(db, move |db| db.get_okr_with_computed_progress(id)).await?,
    ))
}

pub async fn update_okr(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOkrInput>,
) -> ApiResult<Json<Okr>> {
    Ok(Json(blocking(db, move |db| db.update_okr(id, input, &actor)).await?))
}

pub async fn set_assignees(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<SetAssigneesInput>,
) -> ApiResult<Json<Okr>> {
    let okr = blocking(db, move |db| {
        db.set_okr_assignees(id, &input.assignees, &actor)
    })
    .await?;
    Ok(Json(okr))
}

pub async fn delete_okr(
    State(db): State<Database>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::debug!("User {} deleting OKR {}", actor.user_id, id);
    blocking(db, move |db| db.delete_okr(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
