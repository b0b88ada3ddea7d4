use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use drift_tournament_server::engine::TournamentEngine;
use drift_tournament_server::error::TournamentError;
use drift_tournament_server::persistence::StateSnapshotFile;
use drift_tournament_server::server_protocol::{
    parse_battle_score, parse_competition_create, parse_driver_create, parse_id_list,
    parse_name_body, parse_qualifying_score, parse_viewer_message, ParsedViewerMessage,
};
use drift_tournament_server::server_utils::{
    parse_group_name, parse_port, parse_stage_filter, snapshot_path,
};
use drift_tournament_server::types::{
    AssignmentResult, BattleId, BattleScoreResult, BattleView, ClassificationId,
    ClassificationStandings, CompetitionDriverView, CompetitionId, CompetitionStandings,
    CompetitionSummary, GroupStandingRow, Judge, LeaderboardRow, Notification,
    ProgressionOutcome, TournamentStartResult,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const VIEWER_QUEUE_CAPACITY: usize = 256;
const CLOSE_CODE_SLOW_CONSUMER: u16 = 1008;

type SharedState = Arc<Mutex<ServerState>>;
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone)]
struct ViewerContext {
    competition_id: CompetitionId,
    tx: mpsc::Sender<OutboundMessage>,
}

struct ServerState {
    engine: TournamentEngine,
    snapshot: StateSnapshotFile,
    viewers: HashMap<String, ViewerContext>,
}

impl ServerState {
    fn new(snapshot: StateSnapshotFile) -> Self {
        let engine = TournamentEngine::from_store(snapshot.load());
        Self {
            engine,
            snapshot,
            viewers: HashMap::new(),
        }
    }

    /// Snapshot failures never undo a committed command.
    fn persist(&self) {
        if let Err(error) = self.snapshot.save(self.engine.store()) {
            tracing::warn!(
                path = %self.snapshot.path().display(),
                %error,
                "failed to save tournament snapshot"
            );
        }
    }

    fn publish(&mut self, built: drift_tournament_server::error::Result<Notification>) {
        match built {
            Ok(notification) => broadcast(self, &notification),
            Err(error) => tracing::warn!(%error, "failed to build viewer notification"),
        }
    }
}

struct ApiError(TournamentError);

impl From<TournamentError> for ApiError {
    fn from(error: TournamentError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TournamentError::NotFound(_) => StatusCode::NOT_FOUND,
            TournamentError::State(_) | TournamentError::Validation(_) => StatusCode::BAD_REQUEST,
            TournamentError::Conflict(_) => StatusCode::CONFLICT,
            TournamentError::Io(_) | TournamentError::Serde(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct BattleQuery {
    stage: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ClosedClassificationResponse {
    id: ClassificationId,
    is_closed: bool,
}

#[derive(Serialize)]
struct LeaderboardResponse {
    competition_id: CompetitionId,
    leaderboard: Vec<LeaderboardRow>,
}

#[derive(Serialize)]
struct GroupStandingsResponse {
    competition_id: CompetitionId,
    group: &'static str,
    standings: Vec<GroupStandingRow>,
}

#[derive(Serialize)]
struct BattlesResponse {
    competition_id: CompetitionId,
    battles: Vec<BattleView>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ViewerReply<'a> {
    Pong { t: f64 },
    Error { message: &'a str },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drift_tournament_server=info,server=info")),
        )
        .init();

    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let snapshot = StateSnapshotFile::new(snapshot_path(
        std::env::var("TOURNAMENT_DB_PATH").ok().as_deref(),
    ));
    tracing::info!(path = %snapshot.path().display(), "loading tournament snapshot");
    let state: SharedState = Arc::new(Mutex::new(ServerState::new(snapshot)));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/classifications",
            get(list_classifications).post(create_classification),
        )
        .route("/classifications/{id}/close", post(close_classification))
        .route(
            "/classifications/{id}/standings",
            get(classification_standings),
        )
        .route("/competitions", get(list_competitions).post(create_competition))
        .route("/competitions/{id}", get(competition_summary))
        .route(
            "/competitions/{id}/drivers",
            get(competition_drivers).post(register_drivers),
        )
        .route(
            "/competitions/{id}/judges",
            get(competition_judges).post(assign_judges),
        )
        .route(
            "/competitions/{id}/qualifying/scores",
            post(submit_qualifying_score),
        )
        .route(
            "/competitions/{id}/qualifying/leaderboard",
            get(qualifying_leaderboard),
        )
        .route("/competitions/{id}/tournament/start", post(start_tournament))
        .route(
            "/competitions/{id}/groups/{group}/standings",
            get(group_standings),
        )
        .route("/competitions/{id}/battles", get(list_battles))
        .route("/competitions/{id}/progress", post(progress_competition))
        .route("/competitions/{id}/standings", get(competition_standings))
        .route("/battles/{id}", get(battle_view))
        .route("/battles/{id}/scores", post(submit_battle_score))
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/judges", get(list_judges).post(create_judge))
        .route("/ws/competitions/{id}", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        tracing::info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        tracing::info!("no static file root configured");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%bind_addr, %error, "failed to bind server socket");
            std::process::exit(1);
        }
    };

    tracing::info!(port, "listening");
    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(%error, "server runtime failed");
        std::process::exit(1);
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let fallback = PathBuf::from("static");
    fallback.join("index.html").is_file().then_some(fallback)
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}

async fn create_classification(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let name = parse_name_body(&body)?;
    let mut guard = state.lock().await;
    let created = guard.engine.create_classification(&name)?;
    guard.persist();
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_classifications(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.engine.list_classifications())
}

async fn close_classification(
    State(state): State<SharedState>,
    Path(classification_id): Path<ClassificationId>,
) -> ApiResult<ClosedClassificationResponse> {
    let mut guard = state.lock().await;
    let closed = guard.engine.close_classification(classification_id)?;
    guard.persist();
    Ok(Json(ClosedClassificationResponse {
        id: closed.id,
        is_closed: closed.is_closed,
    }))
}

async fn classification_standings(
    State(state): State<SharedState>,
    Path(classification_id): Path<ClassificationId>,
) -> ApiResult<ClassificationStandings> {
    let guard = state.lock().await;
    Ok(Json(guard.engine.classification_standings(classification_id)?))
}

async fn create_competition(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_competition_create(&body)?;
    let mut guard = state.lock().await;
    let created = guard
        .engine
        .create_competition(request.classification_id, &request.name)?;
    guard.persist();
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_competitions(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.engine.list_competitions())
}

async fn competition_summary(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<CompetitionSummary> {
    let guard = state.lock().await;
    Ok(Json(guard.engine.competition_summary(competition_id)?))
}

async fn competition_drivers(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<Vec<CompetitionDriverView>> {
    let guard = state.lock().await;
    Ok(Json(guard.engine.competition_drivers(competition_id)?))
}

async fn register_drivers(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
    Json(body): Json<Value>,
) -> ApiResult<AssignmentResult> {
    let driver_ids = parse_id_list(&body, "driver_ids")?;
    let mut guard = state.lock().await;
    let result = guard.engine.register_drivers(competition_id, &driver_ids)?;
    guard.persist();
    Ok(Json(result))
}

async fn competition_judges(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<Vec<Judge>> {
    let guard = state.lock().await;
    Ok(Json(guard.engine.competition_judges(competition_id)?))
}

async fn assign_judges(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
    Json(body): Json<Value>,
) -> ApiResult<AssignmentResult> {
    let judge_ids = parse_id_list(&body, "judge_ids")?;
    let mut guard = state.lock().await;
    let result = guard.engine.assign_judges(competition_id, &judge_ids)?;
    guard.persist();
    Ok(Json(result))
}

async fn submit_qualifying_score(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
    Json(body): Json<Value>,
) -> ApiResult<LeaderboardResponse> {
    let input = parse_qualifying_score(&body)?;
    let mut guard = state.lock().await;
    let leaderboard = guard.engine.submit_qualifying_score(competition_id, input)?;
    guard.persist();
    let notification = guard.engine.qualifying_notification(competition_id);
    guard.publish(notification);
    Ok(Json(LeaderboardResponse {
        competition_id,
        leaderboard,
    }))
}

async fn qualifying_leaderboard(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<LeaderboardResponse> {
    let guard = state.lock().await;
    let leaderboard = guard.engine.qualifying_leaderboard(competition_id)?;
    Ok(Json(LeaderboardResponse {
        competition_id,
        leaderboard,
    }))
}

async fn start_tournament(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<TournamentStartResult> {
    let mut guard = state.lock().await;
    let started = guard.engine.start_tournament(competition_id)?;
    guard.persist();
    let notification = guard.engine.tournament_started_notification(&started);
    guard.publish(notification);
    Ok(Json(started))
}

async fn group_standings(
    State(state): State<SharedState>,
    Path((competition_id, group)): Path<(CompetitionId, String)>,
) -> ApiResult<GroupStandingsResponse> {
    let group = parse_group_name(&group)?;
    let guard = state.lock().await;
    let standings = guard.engine.group_standings(competition_id, group)?;
    Ok(Json(GroupStandingsResponse {
        competition_id,
        group: group.as_str(),
        standings,
    }))
}

async fn list_battles(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
    Query(query): Query<BattleQuery>,
) -> ApiResult<BattlesResponse> {
    let stage = parse_stage_filter(query.stage.as_deref())?;
    let guard = state.lock().await;
    let battles = guard.engine.list_battles(competition_id, stage)?;
    Ok(Json(BattlesResponse {
        competition_id,
        battles,
    }))
}

async fn battle_view(
    State(state): State<SharedState>,
    Path(battle_id): Path<BattleId>,
) -> ApiResult<BattleView> {
    let guard = state.lock().await;
    Ok(Json(guard.engine.battle_view(battle_id)?))
}

async fn submit_battle_score(
    State(state): State<SharedState>,
    Path(battle_id): Path<BattleId>,
    Json(body): Json<Value>,
) -> ApiResult<BattleScoreResult> {
    let input = parse_battle_score(&body)?;
    let mut guard = state.lock().await;
    let result = guard.engine.submit_battle_score(battle_id, input)?;
    guard.persist();
    let notification = guard.engine.battle_update_notification(battle_id);
    guard.publish(notification);
    Ok(Json(result))
}

async fn progress_competition(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<ProgressionOutcome> {
    let mut guard = state.lock().await;
    let outcome = guard.engine.progress_competition(competition_id)?;
    if outcome.changed() {
        guard.persist();
        let notification = guard.engine.bootstrap_notification(competition_id);
        guard.publish(notification);
    }
    Ok(Json(outcome))
}

async fn competition_standings(
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> ApiResult<CompetitionStandings> {
    let guard = state.lock().await;
    Ok(Json(guard.engine.competition_standings(competition_id)?))
}

async fn create_driver(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_driver_create(&body)?;
    let mut guard = state.lock().await;
    let created = guard.engine.create_driver(&request.name, request.number)?;
    guard.persist();
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_drivers(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.engine.list_drivers())
}

async fn create_judge(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let name = parse_name_body(&body)?;
    let mut guard = state.lock().await;
    let created = guard.engine.create_judge(&name)?;
    guard.persist();
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_judges(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.engine.list_judges())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Path(competition_id): Path<CompetitionId>,
) -> Result<impl IntoResponse, ApiError> {
    {
        let guard = state.lock().await;
        guard.engine.competition_summary(competition_id)?;
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(state, competition_id, socket)))
}

async fn handle_socket(state: SharedState, competition_id: CompetitionId, socket: WebSocket) {
    let viewer_id = make_id("viewer");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(VIEWER_QUEUE_CAPACITY);

    {
        let mut guard = state.lock().await;
        guard.viewers.insert(
            viewer_id.clone(),
            ViewerContext {
                competition_id,
                tx: tx.clone(),
            },
        );
        send_bootstrap(&mut guard, &viewer_id);
        tracing::debug!(%viewer_id, competition_id, "viewer connected");
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        let raw = match message {
            Message::Text(raw) => raw.to_string(),
            Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Message::Close(_) => break,
            _ => continue,
        };
        handle_viewer_message(&state, &viewer_id, &raw).await;
    }

    {
        let mut guard = state.lock().await;
        guard.viewers.remove(&viewer_id);
    }
    tracing::debug!(%viewer_id, competition_id, "viewer disconnected");
    drop(tx);
    let _ = writer.await;
}

async fn handle_viewer_message(state: &SharedState, viewer_id: &str, raw: &str) {
    let mut guard = state.lock().await;
    match parse_viewer_message(raw) {
        Some(ParsedViewerMessage::Ping { t }) => {
            send_to_viewer(&mut guard, viewer_id, &ViewerReply::Pong { t });
        }
        Some(ParsedViewerMessage::Refresh) => send_bootstrap(&mut guard, viewer_id),
        None => {
            send_to_viewer(
                &mut guard,
                viewer_id,
                &ViewerReply::Error {
                    message: "invalid message",
                },
            );
        }
    }
}

fn send_bootstrap(state: &mut ServerState, viewer_id: &str) {
    let Some(competition_id) = state
        .viewers
        .get(viewer_id)
        .map(|viewer| viewer.competition_id)
    else {
        return;
    };
    match state.engine.bootstrap_notification(competition_id) {
        Ok(notification) => send_to_viewer(state, viewer_id, &notification),
        Err(error) => tracing::warn!(%error, competition_id, "failed to build bootstrap payload"),
    }
}

fn send_to_viewer<T: Serialize>(state: &mut ServerState, viewer_id: &str, message: &T) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, %viewer_id, "failed to encode viewer message");
            return;
        }
    };
    let send_failed = state
        .viewers
        .get(viewer_id)
        .is_some_and(|viewer| viewer.tx.try_send(OutboundMessage::Text(payload)).is_err());
    if send_failed {
        drop_viewer(state, viewer_id);
    }
}

/// Fans a committed notification out to every viewer of its competition.
/// Viewers whose queue is full are dropped.
fn broadcast(state: &mut ServerState, notification: &Notification) {
    let payload = match serde_json::to_string(notification) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, "failed to encode notification");
            return;
        }
    };
    let competition_id = notification.competition_id();
    let mut failed = Vec::new();
    for (viewer_id, viewer) in &state.viewers {
        if viewer.competition_id != competition_id {
            continue;
        }
        if viewer
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
        {
            failed.push(viewer_id.clone());
        }
    }
    for viewer_id in failed {
        drop_viewer(state, &viewer_id);
    }
}

fn drop_viewer(state: &mut ServerState, viewer_id: &str) {
    let Some(viewer) = state.viewers.remove(viewer_id) else {
        return;
    };
    let _ = viewer.tx.try_send(OutboundMessage::Close {
        code: CLOSE_CODE_SLOW_CONSUMER,
        reason: "viewer queue overflow".to_string(),
    });
    tracing::warn!(%viewer_id, competition_id = viewer.competition_id, "dropped slow viewer");
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[cfg(test)]
mod tests {
    use drift_tournament_server::types::GroupName;

    use super::*;

    fn state_with_viewer(competition_id: CompetitionId) -> (ServerState, mpsc::Receiver<OutboundMessage>) {
        let path = std::env::temp_dir().join(format!(
            "drift-server-test-{}.json",
            rand::random::<u64>()
        ));
        let mut state = ServerState::new(StateSnapshotFile::new(path));
        let (tx, rx) = mpsc::channel(2);
        state.viewers.insert(
            "viewer_1".to_string(),
            ViewerContext { competition_id, tx },
        );
        (state, rx)
    }

    #[test]
    fn make_id_is_prefixed_and_unique() {
        let first = make_id("viewer");
        let second = make_id("viewer");
        assert!(first.starts_with("viewer_"));
        assert_ne!(first, second);
    }

    #[test]
    fn api_errors_map_to_http_status() {
        let cases = [
            (TournamentError::not_found("Battle"), StatusCode::NOT_FOUND),
            (TournamentError::state("closed"), StatusCode::BAD_REQUEST),
            (TournamentError::validation("bad"), StatusCode::BAD_REQUEST),
            (TournamentError::conflict("dup"), StatusCode::CONFLICT),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError(error).into_response().status(), status);
        }
    }

    #[test]
    fn response_bodies_are_typed() {
        let error = serde_json::to_value(ErrorBody {
            error: TournamentError::conflict("dup").kind(),
            message: "dup".to_string(),
        })
        .expect("error body");
        assert_eq!(error["error"], "conflict");
        assert_eq!(error["message"], "dup");

        let group = serde_json::to_value(GroupStandingsResponse {
            competition_id: 3,
            group: GroupName::B.as_str(),
            standings: Vec::new(),
        })
        .expect("group body");
        assert_eq!(group["group"], "B");
        assert_eq!(group["competition_id"], 3);
    }

    #[test]
    fn viewer_replies_go_to_the_requesting_viewer() {
        let (mut state, mut rx) = state_with_viewer(1);
        send_to_viewer(&mut state, "viewer_1", &ViewerReply::Pong { t: 4.5 });
        match rx.try_recv() {
            Ok(OutboundMessage::Text(payload)) => {
                assert_eq!(payload, r#"{"type":"pong","t":4.5}"#);
            }
            other => panic!("unexpected outbound message {other:?}"),
        }
        send_to_viewer(
            &mut state,
            "viewer_1",
            &ViewerReply::Error {
                message: "invalid message",
            },
        );
        match rx.try_recv() {
            Ok(OutboundMessage::Text(payload)) => {
                assert_eq!(payload, r#"{"type":"error","message":"invalid message"}"#);
            }
            other => panic!("unexpected outbound message {other:?}"),
        }
    }

    #[test]
    fn broadcast_reaches_only_viewers_of_the_competition() {
        let (mut state, mut rx) = state_with_viewer(1);
        let other = Notification::QualifyingLeaderboard {
            competition_id: 2,
            leaderboard: Vec::new(),
        };
        broadcast(&mut state, &other);
        assert!(rx.try_recv().is_err());

        let mine = Notification::QualifyingLeaderboard {
            competition_id: 1,
            leaderboard: Vec::new(),
        };
        broadcast(&mut state, &mine);
        match rx.try_recv() {
            Ok(OutboundMessage::Text(payload)) => {
                assert!(payload.contains("\"type\":\"qualifying_leaderboard\""));
            }
            other => panic!("unexpected outbound message {other:?}"),
        }
    }

    #[test]
    fn full_viewer_queue_drops_the_viewer() {
        let (mut state, _rx) = state_with_viewer(1);
        let notification = Notification::QualifyingLeaderboard {
            competition_id: 1,
            leaderboard: Vec::new(),
        };
        for _ in 0..3 {
            broadcast(&mut state, &notification);
        }
        assert!(state.viewers.is_empty());
    }
}
