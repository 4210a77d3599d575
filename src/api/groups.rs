use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{error::ApiError, extract::JsonBody},
    app::AppState,
    domain::{ChargeStation, Group, GroupId, GroupTree, GroupUpdate, NewChargeStation, NewGroup},
    engine::{CapacityReport, GroupPermissions},
};

/// Body for adding a station through the structural attach path
#[derive(Debug, Deserialize)]
pub struct AttachStationRequest {
    pub name: String,
}

pub async fn list_groups(State(st): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    Ok(Json(st.coordinator.list_groups().await?))
}

pub async fn create_group(
    State(st): State<AppState>,
    JsonBody(input): JsonBody<NewGroup>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let group = st.coordinator.create_group(input).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Group with its stations and connectors
pub async fn get_group(
    State(st): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<Json<GroupTree>, ApiError> {
    Ok(Json(st.coordinator.group_tree(&id).await?))
}

pub async fn update_group(
    State(st): State<AppState>,
    Path(id): Path<GroupId>,
    JsonBody(input): JsonBody<GroupUpdate>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(st.coordinator.update_group(&id, input).await?))
}

pub async fn delete_group(
    State(st): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<StatusCode, ApiError> {
    st.coordinator.delete_group(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn group_capacity(
    State(st): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<Json<CapacityReport>, ApiError> {
    Ok(Json(st.coordinator.check_group_capacity(&id).await?))
}

pub async fn group_permissions(
    State(st): State<AppState>,
    Path(id): Path<GroupId>,
) -> Result<Json<GroupPermissions>, ApiError> {
    Ok(Json(st.coordinator.group_permissions(&id).await?))
}

pub async fn attach_charge_station(
    State(st): State<AppState>,
    Path(id): Path<GroupId>,
    JsonBody(req): JsonBody<AttachStationRequest>,
) -> Result<(StatusCode, Json<ChargeStation>), ApiError> {
    let station = st
        .coordinator
        .attach_charge_station(NewChargeStation {
            name: req.name,
            group_id: id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(station)))
}
