use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use crate::{
    api::{authorization, forward},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RouteHistoryRequest {
    #[serde(rename = "vehicleId")]
    vehicle_id: i64,
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "endDate")]
    end_date: String,
}

pub async fn route_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RouteHistoryRequest>,
) -> Response {
    let authorization = match authorization(&headers) {
        Ok(value) => value,
        Err(response) => return response,
    };

    let url = format!("{}/playback/listByVehicleId", state.upstream);
    let result = state
        .client
        .get(url)
        .query(&[
            ("vehicleId", request.vehicle_id.to_string()),
            ("startDate", request.start_date),
            ("endDate", request.end_date),
        ])
        .header("Authorization", authorization)
        .header("Accept", "application/json")
        .send()
        .await;
    forward(result).await
}
