use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::{error::ApiError, extract::JsonBody},
    app::AppState,
    domain::{ChargeStation, ChargeStationId, ChargeStationUpdate, NewChargeStation, StationLoad},
};

pub async fn list_charge_stations(
    State(st): State<AppState>,
) -> Result<Json<Vec<ChargeStation>>, ApiError> {
    Ok(Json(st.coordinator.list_charge_stations().await?))
}

pub async fn create_charge_station(
    State(st): State<AppState>,
    JsonBody(input): JsonBody<NewChargeStation>,
) -> Result<(StatusCode, Json<ChargeStation>), ApiError> {
    let station = st.coordinator.create_charge_station(input).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

pub async fn get_charge_station(
    State(st): State<AppState>,
    Path(id): Path<ChargeStationId>,
) -> Result<Json<StationLoad>, ApiError> {
    Ok(Json(st.coordinator.get_charge_station(&id).await?))
}

pub async fn update_charge_station(
    State(st): State<AppState>,
    Path(id): Path<ChargeStationId>,
    JsonBody(input): JsonBody<ChargeStationUpdate>,
) -> Result<Json<ChargeStation>, ApiError> {
    Ok(Json(st.coordinator.update_charge_station(&id, input).await?))
}

/// Cascade delete; the detach rule does not apply here
pub async fn delete_charge_station(
    State(st): State<AppState>,
    Path(id): Path<ChargeStationId>,
) -> Result<StatusCode, ApiError> {
    st.coordinator.delete_charge_station(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn detach_charge_station(
    State(st): State<AppState>,
    Path(id): Path<ChargeStationId>,
) -> Result<StatusCode, ApiError> {
    st.coordinator.detach_charge_station(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
