#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::{oneshot, Mutex, Semaphore};

use gym_desk::models::members::{Member, NewMemberRecord};
use gym_desk::services::admin::AdminRequest;
use gym_desk::services::directory::{DirectoryRequest, DirectoryView};
use gym_desk::services::{start_services, FrontDesk, ServiceError};
use gym_desk::settings::{Api, Settings};

/// In-process stand-in for the membership backend. Counts every request so
/// tests can assert that client-side validation issued none, can be flipped
/// into failure modes per endpoint, and can hold individual requests in
/// flight behind zero-permit semaphores so tests can observe intermediate
/// states deterministically.
#[derive(Clone)]
pub struct Backend {
    pub members: Arc<Mutex<Vec<Member>>>,
    pub hits: Arc<AtomicUsize>,
    pub fail_listing: Arc<AtomicBool>,
    pub fail_updates: Arc<AtomicBool>,
    pub hold_mutations: Arc<AtomicBool>,
    pub mutation_gate: Arc<Semaphore>,
    pub mutation_parked: Arc<Semaphore>,
    pub hold_next_listing: Arc<AtomicBool>,
    pub listing_gate: Arc<Semaphore>,
    pub listing_parked: Arc<Semaphore>,
    next_id: Arc<AtomicI64>,
}

impl Backend {
    fn new(members: Vec<Member>) -> Self {
        let next_id = members.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        Self {
            members: Arc::new(Mutex::new(members)),
            hits: Arc::new(AtomicUsize::new(0)),
            fail_listing: Arc::new(AtomicBool::new(false)),
            fail_updates: Arc::new(AtomicBool::new(false)),
            hold_mutations: Arc::new(AtomicBool::new(false)),
            mutation_gate: Arc::new(Semaphore::new(0)),
            mutation_parked: Arc::new(Semaphore::new(0)),
            hold_next_listing: Arc::new(AtomicBool::new(false)),
            listing_gate: Arc::new(Semaphore::new(0)),
            listing_parked: Arc::new(Semaphore::new(0)),
            next_id: Arc::new(AtomicI64::new(next_id)),
        }
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Lets one held mutation proceed.
    pub fn release_mutation(&self) {
        self.mutation_gate.add_permits(1);
    }

    pub fn release_listing(&self) {
        self.listing_gate.add_permits(1);
    }

    async fn gate_mutation(&self) {
        if self.hold_mutations.load(Ordering::SeqCst) {
            self.mutation_parked.add_permits(1);
            let _permit = self.mutation_gate.acquire().await.expect("gate open");
        }
    }
}

/// Blocks until a gated request has reached its hold point.
pub async fn wait_until_parked(parked: &Semaphore) {
    parked.acquire().await.expect("gate open").forget();
}

pub fn member(id: i64, name: &str, mobile: &str, end_date: &str) -> Member {
    Member {
        id,
        name: name.to_string(),
        mobile_number: mobile.to_string(),
        location: "Downtown".to_string(),
        trainer_name: Some("Coach K".to_string()),
        joining_date: "2024-01-01".to_string(),
        subscription_start_date: Some("2024-01-01".to_string()),
        subscription_end_date: end_date.to_string(),
        weight: Some(80.0),
        is_paid: true,
    }
}

pub fn roster() -> Vec<Member> {
    vec![
        member(1, "Jane Doe", "9998887777", "2099-01-01"),
        member(2, "John Smith", "8887776666", "2020-01-10"),
        member(3, "Janet Jones", "7776665555", "2099-06-01"),
    ]
}

async fn admin_login(
    State(backend): State<Backend>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    let username = body.get("username").and_then(|v| v.as_str());
    let password = body.get("password").and_then(|v| v.as_str());

    if username == Some("admin") && password == Some("secret") {
        (StatusCode::OK, Json(json!({ "admin": true })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "admin": false })))
    }
}

async fn list_members(State(backend): State<Backend>) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    if backend.fail_listing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!([]))).into_response();
    }

    // Snapshot first, then park: a held listing answers with the roster as
    // it was when the request arrived, like a slow response in transit.
    let members = backend.members.lock().await.clone();
    if backend.hold_next_listing.swap(false, Ordering::SeqCst) {
        backend.listing_parked.add_permits(1);
        let _permit = backend.listing_gate.acquire().await.expect("gate open");
    }
    Json(members).into_response()
}

async fn create_member(
    State(backend): State<Backend>,
    Json(record): Json<NewMemberRecord>,
) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    let created = Member {
        id: backend.next_id.fetch_add(1, Ordering::SeqCst),
        name: record.name,
        mobile_number: record.mobile_number,
        location: record.location,
        trainer_name: Some(record.trainer_name),
        joining_date: record.joining_date,
        subscription_start_date: Some(record.subscription_start_date),
        subscription_end_date: record.subscription_end_date,
        weight: None,
        is_paid: record.is_paid,
    };

    backend.members.lock().await.push(created.clone());
    (StatusCode::CREATED, Json(created))
}

async fn update_subscription(
    State(backend): State<Backend>,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    if backend.fail_updates.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    backend.gate_mutation().await;

    let end_date = body
        .get("subscription_end_date")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut members = backend.members.lock().await;
    match members.iter_mut().find(|m| m.id == id) {
        Some(member) => {
            member.subscription_end_date = end_date;
            Json(member.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_member(State(backend): State<Backend>, Path(id): Path<i64>) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    if backend.fail_updates.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    backend.gate_mutation().await;

    let mut members = backend.members.lock().await;
    let before = members.len();
    members.retain(|m| m.id != id);
    if members.len() == before {
        StatusCode::NOT_FOUND.into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn member_login(
    State(backend): State<Backend>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    let mobile = body
        .get("mobile_number")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let members = backend.members.lock().await;
    match members.iter().find(|m| m.mobile_number == mobile) {
        Some(member) => Json(member.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_weight(
    State(backend): State<Backend>,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    if backend.fail_updates.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    backend.gate_mutation().await;

    let weight = body.get("weight").and_then(|v| v.as_f64());

    let mut members = backend.members.lock().await;
    match members.iter_mut().find(|m| m.id == id) {
        Some(member) => {
            member.weight = weight;
            Json(member.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Binds the mock backend on an ephemeral port and returns it with the
/// trailing-slash base URL the client expects.
pub async fn spawn_backend(members: Vec<Member>) -> (Backend, String) {
    let backend = Backend::new(members);

    let app = Router::new()
        .route("/api/admin-login/", post(admin_login))
        .route("/api/admin/viewdetails/", get(list_members))
        .route("/api/admin/create-user/", post(create_member))
        .route("/api/admin/update-user/{id}/", put(update_subscription))
        .route("/api/admin/delete-user/{id}/", delete(delete_member))
        .route("/api/users/login/", post(member_login))
        .route("/api/users/update-weight/{id}/", patch(update_weight))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock backend");
    });

    (backend, format!("http://{}/api/", addr))
}

pub async fn start_front_desk(base_url: String) -> FrontDesk {
    start_services(Settings {
        api: Api { base_url },
    })
    .await
    .expect("start services")
}

pub async fn login_admin(desk: &FrontDesk) {
    let (tx, rx) = oneshot::channel();
    desk.admin
        .send(AdminRequest::Login {
            username: "admin".to_string(),
            password: "secret".to_string(),
            response: tx,
        })
        .await
        .expect("send login");
    rx.await.expect("login response").expect("admin admitted");
}

pub async fn refresh(desk: &FrontDesk) -> Result<(), ServiceError> {
    let (tx, rx) = oneshot::channel();
    desk.directory
        .send(DirectoryRequest::Refresh { response: tx })
        .await
        .expect("send refresh");
    rx.await.expect("refresh response")
}

pub async fn snapshot(
    desk: &FrontDesk,
    query: Option<&str>,
) -> Result<DirectoryView, ServiceError> {
    let (tx, rx) = oneshot::channel();
    desk.directory
        .send(DirectoryRequest::Snapshot {
            query: query.map(str::to_string),
            response: tx,
        })
        .await
        .expect("send snapshot");
    rx.await.expect("snapshot response")
}

/// Snapshot that expects a `Ready` directory and unwraps the list.
pub async fn listed_members(desk: &FrontDesk) -> Vec<Member> {
    match snapshot(desk, None).await.expect("snapshot") {
        DirectoryView::Ready(list) => list,
        DirectoryView::Loading => panic!("directory still loading"),
    }
}
