use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::{
    api::{charge_stations, connectors, groups},
    app::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/:id",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/:id/capacity", get(groups::group_capacity))
        .route("/groups/:id/permissions", get(groups::group_permissions))
        .route("/groups/:id/charge-stations", post(groups::attach_charge_station))
        .route(
            "/charge-stations",
            get(charge_stations::list_charge_stations).post(charge_stations::create_charge_station),
        )
        .route(
            "/charge-stations/:id",
            get(charge_stations::get_charge_station)
                .put(charge_stations::update_charge_station)
                .delete(charge_stations::delete_charge_station),
        )
        .route(
            "/charge-stations/:id/detach",
            post(charge_stations::detach_charge_station),
        )
        .route(
            "/connectors",
            get(connectors::list_connectors).post(connectors::create_connector),
        )
        .route(
            "/connectors/:id",
            get(connectors::get_connector)
                .put(connectors::update_connector)
                .delete(connectors::delete_connector),
        )
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
