use axum::Router;

use backend_application::AppState;

use crate::handlers::{
    manifest_handlers, ops_handlers, parcel_handlers, scan_handlers, stats_handlers,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/scan", axum::routing::post(scan_handlers::scan))
        .route(
            "/v1/parcels",
            axum::routing::post(parcel_handlers::register_parcels),
        )
        .route(
            "/v1/parcels/:tracking_number",
            axum::routing::get(parcel_handlers::get_parcel),
        )
        .route(
            "/v1/parcels/:tracking_number/history",
            axum::routing::get(parcel_handlers::parcel_history),
        )
        .route(
            "/v1/manifests",
            axum::routing::post(manifest_handlers::create_manifest),
        )
        .route(
            "/v1/manifests/:number",
            axum::routing::get(manifest_handlers::get_manifest),
        )
        .route(
            "/v1/manifests/:number/parcels",
            axum::routing::post(manifest_handlers::add_parcel),
        )
        .route(
            "/v1/manifests/:number/parcels/:tracking_number",
            axum::routing::delete(manifest_handlers::remove_parcel),
        )
        .route(
            "/v1/manifests/:number/finalize",
            axum::routing::post(manifest_handlers::finalize_manifest),
        )
        .route(
            "/v1/manifests/:number/dispatch",
            axum::routing::post(manifest_handlers::dispatch_manifest),
        )
        .route(
            "/v1/manifests/:number/arrive",
            axum::routing::post(manifest_handlers::arrive_manifest),
        )
        .route(
            "/v1/manifests/:number/complete",
            axum::routing::post(manifest_handlers::complete_manifest),
        )
        .route(
            "/v1/stations/:station_id/stats",
            axum::routing::get(stats_handlers::station_stats),
        )
        .route(
            "/v1/operations",
            axum::routing::get(ops_handlers::list_operations),
        )
        .route(
            "/v1/ops/pod-deliveries",
            axum::routing::get(ops_handlers::list_pod_deliveries),
        )
        .route(
            "/v1/ops/pod-deliveries/last",
            axum::routing::get(ops_handlers::last_pod_delivery),
        )
        .route(
            "/v1/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/v1/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/v1/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
