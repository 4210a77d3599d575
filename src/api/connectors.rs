use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::{error::ApiError, extract::JsonBody},
    app::AppState,
    domain::{Connector, ConnectorId, ConnectorUpdate, NewConnector},
};

pub async fn list_connectors(State(st): State<AppState>) -> Result<Json<Vec<Connector>>, ApiError> {
    Ok(Json(st.coordinator.list_connectors().await?))
}

pub async fn create_connector(
    State(st): State<AppState>,
    JsonBody(input): JsonBody<NewConnector>,
) -> Result<(StatusCode, Json<Connector>), ApiError> {
    let connector = st.coordinator.create_connector(input).await?;
    Ok((StatusCode::CREATED, Json(connector)))
}

pub async fn get_connector(
    State(st): State<AppState>,
    Path(id): Path<ConnectorId>,
) -> Result<Json<Connector>, ApiError> {
    Ok(Json(st.coordinator.get_connector(&id).await?))
}

pub async fn update_connector(
    State(st): State<AppState>,
    Path(id): Path<ConnectorId>,
    JsonBody(input): JsonBody<ConnectorUpdate>,
) -> Result<Json<Connector>, ApiError> {
    Ok(Json(st.coordinator.update_connector(&id, input).await?))
}

pub async fn delete_connector(
    State(st): State<AppState>,
    Path(id): Path<ConnectorId>,
) -> Result<StatusCode, ApiError> {
    st.coordinator.delete_connector(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
