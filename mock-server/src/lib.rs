//! In-memory stand-in for the amoCRM v2 JSON API.
//!
//! Serves `GET /private/api/v2/json/{kind}/list` and
//! `POST /private/api/v2/json/{kind}/set` for `customers`, `tasks` and
//! `links`, with the same `request`/`response` wrappers, credential query
//! parameters and error envelope as the real service.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const DEFAULT_LOGIN: &str = "test@example.com";
pub const DEFAULT_API_KEY: &str = "secret";

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// Login/API-key pair the server accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub api_key: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

/// Entity collections served by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Customers,
    Tasks,
    Links,
}

impl Kind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "customers" => Some(Kind::Customers),
            "tasks" => Some(Kind::Tasks),
            "links" => Some(Kind::Links),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Customers => "customers",
            Kind::Tasks => "tasks",
            Kind::Links => "links",
        }
    }

    /// Key the list reply puts records under.
    pub fn list_key(self) -> &'static str {
        match self {
            Kind::Customers => "customers",
            Kind::Tasks => "tasks",
            Kind::Links => "leads",
        }
    }
}

/// Stored records, per collection, plus the id sequence.
#[derive(Debug, Default)]
pub struct Store {
    records: HashMap<&'static str, Vec<Map<String, Value>>>,
    next_id: i64,
}

/// An error reply: HTTP status plus the amoCRM error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiFailure {
    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({ "response": { "error": self.message, "error_code": self.code } });
        (self.status, Json(body)).into_response()
    }
}

impl Store {
    pub fn records(&self, kind: Kind) -> &[Map<String, Value>] {
        self.records.get(kind.as_str()).map(Vec::as_slice).unwrap_or_default()
    }

    fn records_mut(&mut self, kind: Kind) -> &mut Vec<Map<String, Value>> {
        self.records.entry(kind.as_str()).or_default()
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Records matching the list filters, in insertion order.
    pub fn list(&self, kind: Kind, params: &HashMap<String, String>, since: Option<i64>) -> Vec<Value> {
        let offset = param_usize(params, "limit_offset").unwrap_or(0);
        let limit = param_usize(params, "limit_rows").unwrap_or(usize::MAX);
        let id = params.get("id").and_then(|v| v.parse::<i64>().ok());

        self.records(kind)
            .iter()
            .filter(|r| id.is_none_or(|id| int(r, "id") == Some(id)))
            .filter(|r| since.is_none_or(|ts| int(r, "last_modified").unwrap_or(0) >= ts))
            .skip(offset)
            .take(limit)
            .cloned()
            .map(Value::Object)
            .collect()
    }

    /// Apply every operation of one `set` request and build the reply
    /// section for `kind`.
    pub fn apply(&mut self, kind: Kind, ops: &Map<String, Value>, now: i64) -> Result<Value, ApiFailure> {
        let mut reply = Map::new();
        for (op, items) in ops {
            let items = records_of(items)?;
            let section = match (kind, op.as_str()) {
                (Kind::Customers | Kind::Tasks, "add") => self.add(kind, items, now),
                (Kind::Customers | Kind::Tasks, "update") => self.update(kind, items, now)?,
                (Kind::Links, "link") => self.link(items),
                (Kind::Links, "unlink") => self.unlink(items),
                _ => {
                    return Err(ApiFailure::bad_request(
                        "201",
                        format!("unsupported operation {}.{op}", kind.as_str()),
                    ))
                }
            };
            reply.insert(op.clone(), section);
        }
        Ok(Value::Object(reply))
    }

    fn add(&mut self, kind: Kind, items: Vec<Map<String, Value>>, now: i64) -> Value {
        let mut created = Vec::with_capacity(items.len());
        for (request_id, mut record) in items.into_iter().enumerate() {
            let id = self.next_id();
            record.insert("id".to_string(), json!(id));
            record
                .entry("last_modified")
                .or_insert_with(|| json!(now));
            self.records_mut(kind).push(record);
            created.push(json!({ "id": id, "request_id": request_id }));
        }
        match kind {
            Kind::Customers => json!({ "customers": created, "errors": [] }),
            _ => Value::Array(created),
        }
    }

    fn update(&mut self, kind: Kind, items: Vec<Map<String, Value>>, now: i64) -> Result<Value, ApiFailure> {
        let mut updated = Vec::with_capacity(items.len());
        for patch in items {
            let id = int(&patch, "id")
                .ok_or_else(|| ApiFailure::bad_request("202", "update without id"))?;
            let record = self
                .records_mut(kind)
                .iter_mut()
                .find(|r| int(r, "id") == Some(id))
                .ok_or_else(|| ApiFailure::bad_request("244", format!("{} {id} not found", kind.as_str())))?;
            record.extend(patch);
            record
                .entry("last_modified")
                .or_insert_with(|| json!(now));
            updated.push(json!({ "id": id }));
        }
        Ok(match kind {
            Kind::Customers => json!({ "customers": updated, "errors": [] }),
            _ => Value::Array(updated),
        })
    }

    fn link(&mut self, items: Vec<Map<String, Value>>) -> Value {
        let linked: Vec<Value> = items.iter().cloned().map(Value::Object).collect();
        self.records_mut(Kind::Links).extend(items);
        Value::Array(linked)
    }

    fn unlink(&mut self, items: Vec<Map<String, Value>>) -> Value {
        let links = self.records_mut(Kind::Links);
        let mut removed = Vec::new();
        for item in items {
            if let Some(pos) = links.iter().position(|l| same_link(l, &item)) {
                removed.push(Value::Object(links.remove(pos)));
            }
        }
        Value::Array(removed)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub credentials: Arc<Credentials>,
}

pub fn app() -> Router {
    app_with(Credentials::default())
}

pub fn app_with(credentials: Credentials) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        credentials: Arc::new(credentials),
    };
    Router::new()
        .route("/private/api/v2/json/{kind}/list", get(list))
        .route("/private/api/v2/json/{kind}/set", post(set))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Credentials::default()).await
}

pub async fn run_with(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock amoCRM listening");
    }
    axum::serve(listener, app_with(credentials)).await
}

async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    authorize(&state, &params)?;
    let kind = parse_kind(&kind)?;
    let since = headers
        .get("if-modified-since")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| NaiveDateTime::parse_from_str(v, HTTP_DATE_FORMAT).ok())
        .map(|dt| dt.and_utc().timestamp());

    let items = state.db.read().await.list(kind, &params, since);
    debug!(kind = kind.as_str(), count = items.len(), "list");
    if items.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let mut response = Map::new();
    response.insert(kind.list_key().to_string(), Value::Array(items));
    response.insert("server_time".to_string(), json!(Utc::now().timestamp()));
    Ok(Json(json!({ "response": response })).into_response())
}

async fn set(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&state, &params)?;
    let kind = parse_kind(&kind)?;
    let ops = body
        .get("request")
        .and_then(|r| r.get(kind.as_str()))
        .and_then(Value::as_object)
        .ok_or_else(|| ApiFailure::bad_request("400", "missing request section"))?;

    let now = Utc::now().timestamp();
    let section = state.db.write().await.apply(kind, ops, now)?;
    debug!(kind = kind.as_str(), "set");
    Ok(Json(json!({
        "response": { kind.as_str(): section, "server_time": now }
    })))
}

fn authorize(state: &AppState, params: &HashMap<String, String>) -> Result<(), ApiFailure> {
    let login = params.get("USER_LOGIN");
    let hash = params.get("USER_HASH");
    if login == Some(&state.credentials.login) && hash == Some(&state.credentials.api_key) {
        return Ok(());
    }
    Err(ApiFailure {
        status: StatusCode::UNAUTHORIZED,
        code: "110",
        message: "Incorrect login or password".to_string(),
    })
}

fn parse_kind(kind: &str) -> Result<Kind, ApiFailure> {
    Kind::parse(kind).ok_or_else(|| ApiFailure {
        status: StatusCode::NOT_FOUND,
        code: "404",
        message: format!("unknown entity {kind}"),
    })
}

fn records_of(items: &Value) -> Result<Vec<Map<String, Value>>, ApiFailure> {
    let Some(items) = items.as_array() else {
        return Err(ApiFailure::bad_request("400", "operation must hold an array"));
    };
    items
        .iter()
        .map(|item| {
            item.as_object()
                .cloned()
                .ok_or_else(|| ApiFailure::bad_request("400", "records must be objects"))
        })
        .collect()
}

fn int(record: &Map<String, Value>, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn param_usize(params: &HashMap<String, String>, key: &str) -> Option<usize> {
    params.get(key).and_then(|v| v.parse().ok())
}

fn same_link(stored: &Map<String, Value>, wanted: &Map<String, Value>) -> bool {
    ["from", "from_id", "to", "to_id"]
        .iter()
        .all(|key| stored.get(*key) == wanted.get(*key))
}
