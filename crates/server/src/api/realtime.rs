use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};

use crate::{
    api::{authorization, forward},
    state::AppState,
};

pub async fn realtime(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let authorization = match authorization(&headers) {
        Ok(value) => value,
        Err(response) => return response,
    };

    let url = format!("{}/realtime/listByVehicleId/{}", state.upstream, vehicle_id);
    let result = state
        .client
        .get(url)
        .header("Authorization", authorization)
        .header("Accept", "application/json")
        .send()
        .await;
    forward(result).await
}
