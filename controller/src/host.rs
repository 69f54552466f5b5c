use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
    time::MissedTickBehavior,
};
use tracing::{info, warn};

use heatpump_common::{
    source_from_sensor_topic, ArbiterError, ArbiterStatus, HorizontalVanePosition, RuntimeConfig,
    TemperatureArbiter, VanePosition, INTERNAL_SOURCE_ID, TOPIC_CMD_HORIZONTAL_VANE,
    TOPIC_CMD_SOURCE, TOPIC_CMD_VANE, TOPIC_INTERNAL_TEMP, TOPIC_SENSOR_WILDCARD,
};

use crate::sink::{execute_actions, MqttSink, ProtocolSink};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const COMMAND_QUEUE_DEPTH: usize = 64;
const STATE_PUBLISH_INTERVAL: Duration = Duration::from_secs(10);

type Reply<T> = oneshot::Sender<Result<T, ArbiterError>>;

/// Everything that mutates the arbiter goes through the control task as one
/// of these, so updates, selections and ticks never interleave.
#[derive(Debug)]
enum Command {
    Reading {
        source: String,
        value: f32,
        reply: Option<Reply<()>>,
    },
    Select {
        source: String,
        reply: Option<Reply<()>>,
    },
    Vane {
        label: String,
        reply: Option<Reply<VanePosition>>,
    },
    HorizontalVane {
        label: String,
        reply: Option<Reply<HorizontalVanePosition>>,
    },
    Status {
        reply: oneshot::Sender<ArbiterStatus>,
    },
}

#[derive(Clone)]
struct AppState {
    commands: mpsc::Sender<Command>,
}

#[derive(Clone)]
struct ConfigStore {
    runtime_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct VaneResponse {
    label: &'static str,
    code: u8,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new();
    let mut runtime = store
        .load_runtime_config()
        .await
        .context("failed to load runtime config")?;
    apply_env_overrides(&mut runtime);

    let mut arbiter =
        TemperatureArbiter::new(runtime.arbiter.clone()).context("invalid arbiter configuration")?;
    for id in extra_sources_from_env() {
        arbiter
            .register_source(&id)
            .with_context(|| format!("failed to register temperature source '{id}'"))?;
    }
    info!(
        sources = ?arbiter.sources(),
        timeout_ms = runtime.arbiter.timeout_ms,
        echo_ms = runtime.arbiter.echo_ms,
        "temperature arbiter ready"
    );

    let mut mqtt_options = MqttOptions::new(
        "heatpump-controller-rust",
        runtime.network.mqtt_host.clone(),
        runtime.network.mqtt_port,
    );
    if !runtime.network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(
            runtime.network.mqtt_user.clone(),
            runtime.network.mqtt_pass.clone(),
        );
    }
    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let app_state = AppState { commands };

    subscribe_topics(&mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(
        arbiter,
        MqttSink::new(mqtt),
        command_rx,
        Duration::from_millis(runtime.arbiter.tick_interval_ms),
    );

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/source", post(handle_select_source))
        .route("/api/reading", post(handle_post_reading))
        .route("/api/vane", post(handle_select_vane))
        .route("/api/horizontal_vane", post(handle_select_horizontal_vane))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn apply_env_overrides(runtime: &mut RuntimeConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        runtime.network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        runtime.network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        runtime.network.mqtt_user = user;
    }
    if let Ok(pass) = std::env::var("MQTT_PASS") {
        runtime.network.mqtt_pass = pass;
    }
    if let Some(port) = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        runtime.http_port = port;
    }
}

fn extra_sources_from_env() -> Vec<String> {
    std::env::var("HEATPUMP_SOURCES")
        .map(|raw| parse_source_list(&raw))
        .unwrap_or_default()
}

fn parse_source_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    let topics = [
        TOPIC_SENSOR_WILDCARD,
        TOPIC_INTERNAL_TEMP,
        TOPIC_CMD_SOURCE,
        TOPIC_CMD_VANE,
        TOPIC_CMD_HORIZONTAL_VANE,
    ];

    for topic in topics {
        mqtt.subscribe(topic, QoS::AtMostOnce).await?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, &message.topic, message.payload.to_vec())
                            .await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn spawn_control_loop(
    mut arbiter: TemperatureArbiter,
    mut sink: MqttSink,
    mut commands: mpsc::Receiver<Command>,
    tick_interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut publish = tokio::time::interval(STATE_PUBLISH_INTERVAL);

        loop {
            // Commands first: a reading queued before a tick must be seen by
            // that tick's staleness check.
            tokio::select! {
                biased;
                Some(command) = commands.recv() => {
                    handle_command(&mut arbiter, &mut sink, command, monotonic_ms());
                }
                _ = ticks.tick() => {
                    let actions = arbiter.tick(monotonic_ms());
                    execute_actions(&mut sink, actions);
                }
                _ = publish.tick() => {
                    if let Err(err) = sink.publish_state(&arbiter.status(monotonic_ms())) {
                        warn!("{err:#}");
                    }
                }
            }
        }
    });
}

fn handle_command<S: ProtocolSink>(
    arbiter: &mut TemperatureArbiter,
    sink: &mut S,
    command: Command,
    now_ms: u64,
) {
    match command {
        Command::Reading {
            source,
            value,
            reply,
        } => {
            let result = arbiter.report(&source, value, now_ms).map(|actions| {
                execute_actions(&mut *sink, actions);
            });
            if let Err(err) = &result {
                warn!("rejected temperature reading: {err}");
            }
            respond(reply, result);
        }
        Command::Select { source, reply } => {
            let result = arbiter.select(&source, now_ms).map(|actions| {
                execute_actions(&mut *sink, actions);
            });
            if let Err(err) = &result {
                warn!("rejected temperature source selection: {err}");
            }
            respond(reply, result);
        }
        Command::Vane { label, reply } => {
            let result = VanePosition::from_label(&label).inspect(|position| {
                info!(position = position.as_str(), "vane position selected");
                if let Err(err) = sink.vane(*position) {
                    warn!("{err:#}");
                }
            });
            if let Err(err) = &result {
                warn!("{err}");
            }
            respond(reply, result);
        }
        Command::HorizontalVane { label, reply } => {
            let result = HorizontalVanePosition::from_label(&label).inspect(|position| {
                info!(position = position.as_str(), "horizontal vane position selected");
                if let Err(err) = sink.horizontal_vane(*position) {
                    warn!("{err:#}");
                }
            });
            if let Err(err) = &result {
                warn!("{err}");
            }
            respond(reply, result);
        }
        Command::Status { reply } => {
            let _ = reply.send(arbiter.status(now_ms));
        }
    }
}

fn respond<T>(reply: Option<Reply<T>>, result: Result<T, ArbiterError>) {
    if let Some(reply) = reply {
        let _ = reply.send(result);
    }
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: &str,
    payload: Vec<u8>,
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    let message = String::from_utf8(payload).context("non utf8 mqtt payload")?;
    if let Some(command) = route_message(topic, message.trim()) {
        app_state
            .commands
            .send(command)
            .await
            .context("control loop is not running")?;
    }
    Ok(())
}

fn route_message(topic: &str, message: &str) -> Option<Command> {
    let reading = |source: &str| match message.parse::<f32>() {
        Ok(value) => Some(Command::Reading {
            source: source.to_string(),
            value,
            reply: None,
        }),
        Err(_) => {
            warn!("ignoring non-numeric temperature '{message}' on {topic}");
            None
        }
    };

    match topic {
        TOPIC_INTERNAL_TEMP => reading(INTERNAL_SOURCE_ID),
        TOPIC_CMD_SOURCE => Some(Command::Select {
            source: message.to_string(),
            reply: None,
        }),
        TOPIC_CMD_VANE => Some(Command::Vane {
            label: message.to_string(),
            reply: None,
        }),
        TOPIC_CMD_HORIZONTAL_VANE => Some(Command::HorizontalVane {
            label: message.to_string(),
            reply: None,
        }),
        _ => source_from_sensor_topic(topic).and_then(reading),
    }
}

async fn request<T>(
    state: &AppState,
    build: impl FnOnce(Reply<T>) -> Command,
) -> Result<T, axum::response::Response> {
    let (reply, response) = oneshot::channel();
    if state.commands.send(build(reply)).await.is_err() {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Control loop unavailable",
        ));
    }
    match response.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(error_response(StatusCode::BAD_REQUEST, &err.to_string())),
        Err(_) => Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Control loop unavailable",
        )),
    }
}

async fn current_status(state: &AppState) -> Result<ArbiterStatus, axum::response::Response> {
    let (reply, response) = oneshot::channel();
    let unavailable = || error_response(StatusCode::SERVICE_UNAVAILABLE, "Control loop unavailable");
    state
        .commands
        .send(Command::Status { reply })
        .await
        .map_err(|_| unavailable())?;
    response.await.map_err(|_| unavailable())
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    match current_status(&state).await {
        Ok(status) => Json(status).into_response(),
        Err(response) => response,
    }
}

async fn handle_select_source(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(source) = params.get("value").cloned() else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    if let Err(response) = request(&state, |reply| Command::Select {
        source,
        reply: Some(reply),
    })
    .await
    {
        return response;
    }

    handle_get_status(State(state)).await.into_response()
}

async fn handle_post_reading(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(source) = params.get("source").cloned() else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'source' parameter");
    };
    let Some(Ok(value)) = params.get("value").map(|value| value.parse::<f32>()) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value");
    };

    if let Err(response) = request(&state, |reply| Command::Reading {
        source,
        value,
        reply: Some(reply),
    })
    .await
    {
        return response;
    }

    handle_get_status(State(state)).await.into_response()
}

async fn handle_select_vane(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(label) = params.get("value").cloned() else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    match request(&state, |reply| Command::Vane {
        label,
        reply: Some(reply),
    })
    .await
    {
        Ok(position) => Json(VaneResponse {
            label: position.as_str(),
            code: position.code(),
        })
        .into_response(),
        Err(response) => response,
    }
}

async fn handle_select_horizontal_vane(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(label) = params.get("value").cloned() else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    match request(&state, |reply| Command::HorizontalVane {
        label,
        reply: Some(reply),
    })
    .await
    {
        Ok(position) => Json(VaneResponse {
            label: position.as_str(),
            code: position.code(),
        })
        .into_response(),
        Err(response) => response,
    }
}

impl ConfigStore {
    fn new() -> Self {
        let data_dir = std::env::var("HEATPUMP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.heatpump"));

        Self {
            runtime_path: data_dir.join("runtime.json"),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.runtime_path).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
                .with_context(|| format!("malformed {}", self.runtime_path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
