//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use tracing::{error, warn};

use crate::aggregate::{AggregateError, ConnectionReport, SearchOutcome, StationListing};
use crate::domain::{
    GroupId, MappingId, Provider, Route, StationGroup, StationId, StationMapping,
};
use crate::reconcile::{ReconcileError, ReconcileReport};
use crate::sync::SyncReport;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/races/search", get(search_races))
        .route("/api/races/:id", get(route_detail))
        .route("/api/stations", get(all_stations))
        .route("/api/stations/resolve", get(resolve_station))
        .route("/api/stations/:id/destinations", get(destinations))
        .route("/api/status", get(status))
        .route("/api/mappings", get(list_mappings))
        .route("/api/mappings/manual", post(create_manual_mapping))
        .route("/api/mappings/auto", post(run_auto_mapping))
        .route("/api/mappings/:id/deactivate", post(deactivate_mapping))
        .route("/api/mappings/:id/name", put(rename_mapping))
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/auto", post(run_auto_grouping))
        .route("/api/groups/:id/members", post(add_group_member))
        .route("/api/groups/:id/members/:station", delete(remove_group_member))
        .route("/api/groups/:id/primary", put(set_group_primary))
        .route("/api/groups/:id/name", put(rename_group))
        .route("/api/sync", post(sync))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Search both providers for routes between two places.
async fn search_races(
    State(state): State<AppState>,
    Query(req): Query<SearchRacesRequest>,
) -> Result<Json<SearchOutcome>, AppError> {
    let outcome = state
        .aggregator
        .search(&req.from, &req.to, &req.date)
        .await?;
    Ok(Json(outcome))
}

/// Fetch one route, optionally pinned to a provider.
async fn route_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(req): Query<RouteDetailRequest>,
) -> Result<Json<Route>, AppError> {
    let hint = req
        .provider
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(Provider::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest {
            message: e.to_string(),
        })?;

    let route = state.aggregator.get_route_detail(&id, hint).await?;
    Ok(Json(route))
}

async fn all_stations(State(state): State<AppState>) -> Result<Json<StationListing>, AppError> {
    Ok(Json(state.aggregator.get_all_stations().await?))
}

/// Stations reachable from a station name or id.
async fn destinations(
    State(state): State<AppState>,
    Path(station): Path<String>,
) -> Result<Json<StationListing>, AppError> {
    Ok(Json(state.aggregator.get_stations_from(&station).await?))
}

/// Every station equivalent to a name or id.
async fn resolve_station(
    State(state): State<AppState>,
    Query(req): Query<ResolveStationRequest>,
) -> Result<Json<ResolveStationResponse>, AppError> {
    let stations = state
        .aggregator
        .reconciler()
        .resolve_equivalents(&req.q)
        .await?;
    Ok(Json(ResolveStationResponse {
        query: req.q,
        stations,
    }))
}

async fn status(State(state): State<AppState>) -> Json<ConnectionReport> {
    Json(state.aggregator.test_connections().await)
}

async fn list_mappings(
    State(state): State<AppState>,
) -> Result<Json<Vec<StationMapping>>, AppError> {
    Ok(Json(state.aggregator.reconciler().mappings().await?))
}

async fn create_manual_mapping(
    State(state): State<AppState>,
    Json(req): Json<ManualMappingRequest>,
) -> Result<(StatusCode, Json<StationMapping>), AppError> {
    let mapping = state
        .aggregator
        .reconciler()
        .map_manually(&req.station_a, &req.station_b)
        .await?;
    Ok((StatusCode::CREATED, Json(mapping)))
}

async fn run_auto_mapping(
    State(state): State<AppState>,
) -> Result<Json<ReconcileReport>, AppError> {
    Ok(Json(
        state
            .aggregator
            .reconciler()
            .run_automatic_reconciliation()
            .await?,
    ))
}

/// Retire a mapping; the automatic pass will not recreate it.
async fn deactivate_mapping(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<StationMapping>, AppError> {
    let mapping = state
        .aggregator
        .reconciler()
        .deactivate_mapping(MappingId(id))
        .await?;
    Ok(Json(mapping))
}

async fn rename_mapping(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<StationMapping>, AppError> {
    let mapping = state
        .aggregator
        .reconciler()
        .rename_mapping(MappingId(id), &req.name)
        .await?;
    Ok(Json(mapping))
}

async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<StationGroup>>, AppError> {
    Ok(Json(state.aggregator.reconciler().groups().await?))
}

async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<StationGroup>), AppError> {
    let group = state
        .aggregator
        .reconciler()
        .create_group(&req.name, &req.primary, &req.members)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn run_auto_grouping(
    State(state): State<AppState>,
) -> Result<Json<AutoGroupResponse>, AppError> {
    let groups = state.aggregator.reconciler().auto_group().await?;
    Ok(Json(AutoGroupResponse {
        created: groups.len(),
        groups,
    }))
}

async fn add_group_member(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<GroupMemberRequest>,
) -> Result<Json<StationGroup>, AppError> {
    let group = state
        .aggregator
        .reconciler()
        .add_to_group(GroupId(id), &req.station)
        .await?;
    Ok(Json(group))
}

async fn remove_group_member(
    State(state): State<AppState>,
    Path((id, station)): Path<(u64, String)>,
) -> Result<Json<StationGroup>, AppError> {
    let station = StationId::parse(&station).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;
    let group = state
        .aggregator
        .reconciler()
        .remove_from_group(GroupId(id), &station)
        .await?;
    Ok(Json(group))
}

async fn set_group_primary(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<GroupMemberRequest>,
) -> Result<Json<StationGroup>, AppError> {
    let group = state
        .aggregator
        .reconciler()
        .set_group_primary(GroupId(id), &req.station)
        .await?;
    Ok(Json(group))
}

async fn rename_group(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<StationGroup>, AppError> {
    let group = state
        .aggregator
        .reconciler()
        .rename_group(GroupId(id), &req.name)
        .await?;
    Ok(Json(group))
}

/// Pull station lists from both providers and reconcile.
async fn sync(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    Ok(Json(state.sync().await?))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl From<ReconcileError> for AppError {
    fn from(e: ReconcileError) -> Self {
        let message = e.to_string();
        match e {
            ReconcileError::InvalidReference(_) => AppError::BadRequest { message },
            ReconcileError::DuplicateMapping { .. }
            | ReconcileError::StationAlreadyGrouped { .. } => AppError::Conflict { message },
            ReconcileError::Store(_) => AppError::Internal { message },
        }
    }
}

impl From<AggregateError> for AppError {
    fn from(e: AggregateError) -> Self {
        let message = e.to_string();
        match e {
            AggregateError::InvalidRequest(_) => AppError::BadRequest { message },
            AggregateError::NotFound(_) => AppError::NotFound { message },
            AggregateError::AllProvidersUnavailable { .. }
            | AggregateError::ProviderUnavailable(_) => AppError::Unavailable { message },
            AggregateError::Reconcile(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        } else {
            warn!(%status, error = %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, AggregatorConfig, ProviderState};
    use crate::cache::{CacheConfig, CachedProvider};
    use crate::domain::{MappingId, Station};
    use crate::gds::{GdsClient, GdsConfig};
    use crate::paybilet::{PaybiletClient, PaybiletConfig};
    use crate::provider::ProviderError;
    use crate::reconcile::{Reconciler, ReconcilerConfig};
    use crate::store::{JsonFileStore, StationStore};
    use std::sync::Arc;
    use std::time::Duration;

    /// State whose upstreams refuse connections, backed by a temporary store.
    async fn offline_state(dir: &tempfile::TempDir) -> AppState {
        let cache = CacheConfig::default();
        let gds = GdsClient::new(GdsConfig::new("u", "p").with_base_url("http://127.0.0.1:9"))
            .unwrap();
        let paybilet =
            PaybiletClient::new(PaybiletConfig::new("t").with_base_url("http://127.0.0.1:9"))
                .unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json"))
            .await
            .unwrap();
        store
            .save_station(Station::new(Provider::Gds, "1", "Южно-Сахалинск"))
            .await
            .unwrap();
        store
            .save_station(Station::new(Provider::Paybilet, "77", "южно сахалинск"))
            .await
            .unwrap();

        AppState::new(Aggregator::new(
            CachedProvider::new(gds, &cache),
            CachedProvider::new(paybilet, &cache),
            Reconciler::new(Arc::new(store), ReconcilerConfig::default()),
            AggregatorConfig::default().with_call_timeout(Duration::from_secs(2)),
        ))
    }

    fn id(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    #[test]
    fn error_statuses() {
        let cases = [
            (
                AppError::from(AggregateError::InvalidRequest("date".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(ReconcileError::InvalidReference("gds:9".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(ReconcileError::DuplicateMapping {
                    existing: MappingId(1),
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(ReconcileError::StationAlreadyGrouped {
                    station: id("gds:1"),
                    group: GroupId(1),
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(AggregateError::NotFound("route gds:5".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(AggregateError::AllProvidersUnavailable {
                    causes: vec![ProviderError::unavailable(Provider::Gds, "down")],
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::from(AggregateError::Reconcile(ReconcileError::DuplicateMapping {
                    existing: MappingId(2),
                })),
                StatusCode::CONFLICT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn invalid_search_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;

        let result = search_races(
            State(state),
            Query(SearchRacesRequest {
                from: "Южно-Сахалинск".into(),
                to: "".into(),
                date: "22.08.25".into(),
            }),
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn offline_upstreams_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;

        let result = all_stations(State(state.clone())).await;
        assert!(matches!(result, Err(AppError::Unavailable { .. })));

        let Json(report) = status(State(state)).await;
        assert!(!report.gds.reachable);
        assert!(!report.paybilet.reachable);
    }

    #[tokio::test]
    async fn unknown_places_search_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;

        let Json(outcome) = search_races(
            State(state),
            Query(SearchRacesRequest {
                from: "Атлантида".into(),
                to: "Эльдорадо".into(),
                date: "2025-08-22".into(),
            }),
        )
        .await
        .unwrap();

        assert!(outcome.routes.is_empty());
        assert!(
            outcome
                .statuses
                .iter()
                .all(|s| s.state == ProviderState::NotQueried)
        );
    }

    #[tokio::test]
    async fn bad_provider_hint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;

        let result = route_detail(
            State(state),
            Path("gds:5".into()),
            Query(RouteDetailRequest {
                provider: Some("rail".into()),
            }),
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn manual_mapping_then_duplicate_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;
        let request = || ManualMappingRequest {
            station_a: id("gds:1"),
            station_b: id("paybilet:77"),
        };

        let (code, Json(mapping)) =
            create_manual_mapping(State(state.clone()), Json(request()))
                .await
                .unwrap();
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(mapping.confidence, 1.0);

        let again = create_manual_mapping(State(state.clone()), Json(request())).await;
        assert!(matches!(again, Err(AppError::Conflict { .. })));

        let Json(mappings) = list_mappings(State(state)).await.unwrap();
        assert_eq!(mappings.len(), 1);
    }

    #[tokio::test]
    async fn rename_and_retire_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;
        let (_, Json(mapping)) = create_manual_mapping(
            State(state.clone()),
            Json(ManualMappingRequest {
                station_a: id("gds:1"),
                station_b: id("paybilet:77"),
            }),
        )
        .await
        .unwrap();

        let Json(renamed) = rename_mapping(
            State(state.clone()),
            Path(mapping.id.0),
            Json(RenameRequest {
                name: "Южно-Сахалинск АВ".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(renamed.display_name, "Южно-Сахалинск АВ");

        let Json(retired) = deactivate_mapping(State(state.clone()), Path(mapping.id.0))
            .await
            .unwrap();
        assert!(!retired.is_active);

        let missing = deactivate_mapping(State(state), Path(99)).await;
        assert!(matches!(missing, Err(AppError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn group_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;

        let (code, Json(group)) = create_group(
            State(state.clone()),
            Json(CreateGroupRequest {
                name: "Южно-Сахалинск".into(),
                primary: id("gds:1"),
                members: vec![],
            }),
        )
        .await
        .unwrap();
        assert_eq!(code, StatusCode::CREATED);

        let Json(group) = add_group_member(
            State(state.clone()),
            Path(group.id.0),
            Json(GroupMemberRequest {
                station: id("paybilet:77"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(group.member_stations.len(), 2);

        let Json(group) = set_group_primary(
            State(state.clone()),
            Path(group.id.0),
            Json(GroupMemberRequest {
                station: id("paybilet:77"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(group.primary_station.id, id("paybilet:77"));

        let Json(group) = remove_group_member(
            State(state.clone()),
            Path((group.id.0, "paybilet:77".into())),
        )
        .await
        .unwrap();
        assert_eq!(group.primary_station.id, id("gds:1"));

        let Json(group) = rename_group(
            State(state.clone()),
            Path(group.id.0),
            Json(RenameRequest {
                name: "Южный".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(group.name, "Южный");

        let bad = remove_group_member(State(state), Path((group.id.0, "nowhere".into()))).await;
        assert!(matches!(bad, Err(AppError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn sync_with_offline_upstreams_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(&dir).await;

        let Json(report) = sync(State(state)).await.unwrap();

        assert!(report.providers.iter().all(|p| p.error.is_some()));
        assert!(report.reconciliation.is_none());
    }
}
