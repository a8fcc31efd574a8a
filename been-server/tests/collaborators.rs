use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use been_core::CollaboratorError;
use been_core::ports::{LoadMonitor, TaskDescriptor, TaskExecution};
use been_server::infra::collaborators::{HttpLoadMonitor, HttpTaskExecution};
use url::Url;

#[derive(Clone, Default)]
struct FakeCluster {
    tasks: Arc<Mutex<Vec<TaskDescriptor>>>,
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

async fn accept_task(
    State(cluster): State<FakeCluster>,
    Json(task): Json<TaskDescriptor>,
) -> StatusCode {
    if task.host_name == "refused" {
        return StatusCode::CONFLICT;
    }
    cluster.tasks.lock().expect("tasks lock").push(task);
    StatusCode::CREATED
}

async fn list_runtimes() -> Json<Vec<String>> {
    Json(vec!["node-a".into(), "node-b".into()])
}

async fn record_notification(
    State(cluster): State<FakeCluster>,
    Path((name, action)): Path<(String, String)>,
) -> StatusCode {
    cluster
        .notifications
        .lock()
        .expect("notifications lock")
        .push((name, action));
    StatusCode::NO_CONTENT
}

/// Serves a fake task manager under `/tm` and a load monitor under `/lm`.
async fn spawn_cluster() -> (FakeCluster, SocketAddr) {
    let cluster = FakeCluster::default();
    let app = Router::new()
        .route("/tm/tasks", post(accept_task))
        .route("/tm/host-runtimes", get(list_runtimes))
        .route("/lm/nodes/{name}/{action}", post(record_notification))
        .with_state(cluster.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake cluster");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake cluster");
    });
    (cluster, addr)
}

fn base(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}/{path}")).expect("base url")
}

fn descriptor(host: &str) -> TaskDescriptor {
    TaskDescriptor {
        task_id: format!("detector-1-{host}"),
        host_name: host.to_string(),
        properties: BTreeMap::from([("key".to_string(), "hm-op-0000000000000001".to_string())]),
        dependencies: Vec::new(),
    }
}

#[tokio::test]
async fn task_manager_receives_descriptors() {
    let (cluster, addr) = spawn_cluster().await;
    let tasks = HttpTaskExecution::new(base(addr, "tm"), Duration::from_secs(5))
        .expect("task client");

    tasks.submit(descriptor("node-a")).await.expect("submit");

    let seen = cluster.tasks.lock().expect("tasks lock").clone();
    assert_eq!(seen, vec![descriptor("node-a")]);

    let runtimes = tasks.registered_host_runtimes().await.expect("runtimes");
    assert_eq!(runtimes, vec!["node-a".to_string(), "node-b".to_string()]);
}

#[tokio::test]
async fn refused_submission_is_rejected_not_transport() {
    let (_cluster, addr) = spawn_cluster().await;
    let tasks = HttpTaskExecution::new(base(addr, "tm/"), Duration::from_secs(5))
        .expect("task client");

    let err = tasks
        .submit(descriptor("refused"))
        .await
        .expect_err("refused submission");
    assert!(matches!(err, CollaboratorError::Rejected(ref msg) if msg.contains("409")));
}

#[tokio::test]
async fn unreachable_task_manager_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let tasks = HttpTaskExecution::new(base(addr, "tm"), Duration::from_secs(2))
        .expect("task client");
    let err = tasks
        .registered_host_runtimes()
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, CollaboratorError::Transport(_)));
}

#[tokio::test]
async fn load_monitor_is_notified_per_node() {
    let (cluster, addr) = spawn_cluster().await;
    let monitor =
        HttpLoadMonitor::new(base(addr, "lm"), Duration::from_secs(5)).expect("monitor client");

    monitor.node_connected("node-a").await.expect("connected");
    monitor.node_disconnected("node-a").await.expect("disconnected");

    let seen = cluster
        .notifications
        .lock()
        .expect("notifications lock")
        .clone();
    assert_eq!(
        seen,
        vec![
            ("node-a".to_string(), "connected".to_string()),
            ("node-a".to_string(), "disconnected".to_string()),
        ]
    );
}
