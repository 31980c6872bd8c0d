//! Integration tests for the sorted-numbers service.
//!
//! Most tests run a real server on an ephemeral port over the in-memory store
//! and talk to it through `NumbersClient`. The PostgreSQL tests require a
//! reachable database in `POSTGRES_DSN`.
//! Run with: cargo test --test integration -- --ignored

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use sorted_numbers::api::{create_router, AppState};
use sorted_numbers::client::NumbersClient;
use sorted_numbers::config::PoolSettings;
use sorted_numbers::error::{ClientError, StoreError};
use sorted_numbers::store::{
    MemoryNumberStore, MockStoreConfig, NumberStore, PgNumberStore, Record,
};
use sorted_numbers::utils::{serve_until_shutdown, ShutdownOutcome};

/// Server running in the background until dropped.
struct TestServer {
    client: NumbersClient,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

async fn start_server(store: Arc<dyn NumberStore>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(AppState::new(store), Duration::from_secs(5));

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    TestServer {
        client: NumbersClient::new(&format!("http://{addr}")).unwrap(),
        shutdown: Some(tx),
        handle,
    }
}

/// Post each value and return every response body.
async fn post_all(client: &NumbersClient, values: &[i32]) -> Vec<Vec<i32>> {
    let mut responses = Vec::with_capacity(values.len());
    for &n in values {
        responses.push(client.add_number(n).await.unwrap());
    }
    responses
}

// ============================================================
// SCENARIOS OVER THE IN-MEMORY STORE
// ============================================================

#[tokio::test]
async fn test_add_number_scenarios() {
    let cases: Vec<(Vec<i32>, Vec<Vec<i32>>)> = vec![
        (vec![3], vec![vec![3]]),
        (vec![3, 2, 1], vec![vec![3], vec![2, 3], vec![1, 2, 3]]),
        (
            vec![5, 1, 9, 3, 7],
            vec![
                vec![5],
                vec![1, 5],
                vec![1, 5, 9],
                vec![1, 3, 5, 9],
                vec![1, 3, 5, 7, 9],
            ],
        ),
        (
            vec![-5, -10, -1],
            vec![vec![-5], vec![-10, -5], vec![-10, -5, -1]],
        ),
        (vec![0, 5, -3], vec![vec![0], vec![0, 5], vec![-3, 0, 5]]),
        (
            vec![2147483647, -2147483648, 1000000000, -1000000000],
            vec![
                vec![2147483647],
                vec![-2147483648, 2147483647],
                vec![-2147483648, 1000000000, 2147483647],
                vec![-2147483648, -1000000000, 1000000000, 2147483647],
            ],
        ),
    ];

    for (inputs, expected) in cases {
        let server = start_server(Arc::new(MemoryNumberStore::new())).await;
        let responses = post_all(&server.client, &inputs).await;
        assert_eq!(responses, expected, "inputs {inputs:?}");
    }
}

#[tokio::test]
async fn test_duplicate_numbers() {
    let server = start_server(Arc::new(MemoryNumberStore::new())).await;

    post_all(&server.client, &[5, 5, 5]).await;
    let numbers = server.client.add_number(3).await.unwrap();
    assert_eq!(numbers, vec![3, 5, 5, 5]);
}

#[tokio::test]
async fn test_inserted_value_stays_visible() {
    let server = start_server(Arc::new(MemoryNumberStore::new())).await;

    server.client.add_number(42).await.unwrap();
    for n in [-7, 100, 42, 0, i32::MIN] {
        let numbers = server.client.add_number(n).await.unwrap();
        assert!(numbers.contains(&42));
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[tokio::test]
async fn test_concurrent_inserts_all_land() {
    let store = MemoryNumberStore::new();
    let server = start_server(Arc::new(store.clone())).await;

    let mut tasks = Vec::new();
    for n in 0..20 {
        let client = server.client.clone();
        tasks.push(tokio::spawn(async move { client.add_number(n % 7).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let mut expected: Vec<i32> = (0..20).map(|n| n % 7).collect();
    expected.sort();
    let final_numbers = server.client.add_number(i32::MAX).await.unwrap();
    expected.push(i32::MAX);
    assert_eq!(final_numbers, expected);
    assert_eq!(store.len(), 21);
}

#[tokio::test]
async fn test_store_failure_surfaces_as_500() {
    let server = start_server(Arc::new(MemoryNumberStore::with_config(MockStoreConfig {
        fail_insert: true,
        ..Default::default()
    })))
    .await;

    match server.client.add_number(1).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.starts_with("failed to insert number:"), "{message}");
        }
        other => panic!("expected api error, got {other:?}"),
    }

    assert!(server.client.is_ready().await.unwrap());
}

#[tokio::test]
async fn test_ready_reflects_store() {
    let server = start_server(Arc::new(MemoryNumberStore::with_config(MockStoreConfig {
        fail_ping: true,
        ..Default::default()
    })))
    .await;

    assert!(!server.client.is_ready().await.unwrap());
}

// ============================================================
// GRACEFUL SHUTDOWN
// ============================================================

/// Store that delays inserts.
#[derive(Debug, Default)]
struct SlowStore {
    delay: Duration,
    inner: MemoryNumberStore,
}

#[async_trait]
impl NumberStore for SlowStore {
    async fn insert(&self, value: i32) -> Result<Record, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(value).await
    }

    async fn list_sorted(&self) -> Result<Vec<Record>, StoreError> {
        self.inner.list_sorted().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

/// Outcome of a shutdown that raced one slow request.
struct ShutdownRace {
    outcome: ShutdownOutcome,
    request: JoinHandle<Result<Vec<i32>, ClientError>>,
    store: MemoryNumberStore,
}

/// Serve with `serve_until_shutdown`, fire one request, then signal.
async fn shutdown_during_request(delay: Duration, grace: Duration) -> ShutdownRace {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = MemoryNumberStore::new();
    let slow = Arc::new(SlowStore {
        delay,
        inner: store.clone(),
    });
    let router = create_router(AppState::new(slow), Duration::from_secs(30));

    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_until_shutdown(
        listener,
        router,
        async move {
            let _ = signal_rx.await;
        },
        grace,
    ));

    let client = NumbersClient::new(&format!("http://{addr}")).unwrap();
    let request = tokio::spawn(async move { client.add_number(9).await });

    // let the request reach the store before signalling
    tokio::time::sleep(Duration::from_millis(100)).await;
    signal_tx.send(()).unwrap();

    ShutdownRace {
        outcome: server.await.unwrap(),
        request,
        store,
    }
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_request() {
    let race = shutdown_during_request(Duration::from_millis(300), Duration::from_secs(5)).await;

    assert_eq!(race.outcome, ShutdownOutcome::Graceful);
    assert_eq!(race.request.await.unwrap().unwrap(), vec![9]);
    assert_eq!(race.store.len(), 1);
}

#[tokio::test]
async fn test_shutdown_timeout_terminates_request() {
    let delay = Duration::from_millis(800);
    let race = shutdown_during_request(delay, Duration::from_millis(200)).await;

    assert_eq!(race.outcome, ShutdownOutcome::TimedOut);
    assert!(race.store.is_empty());

    let response = tokio::time::timeout(Duration::from_secs(5), race.request)
        .await
        .expect("client should see the dropped connection")
        .unwrap();
    assert!(
        matches!(response, Err(ClientError::Http(_))),
        "expected a connection error, got {response:?}"
    );

    // outlive the insert delay; the aborted handler must never commit
    tokio::time::sleep(delay).await;
    assert!(race.store.is_empty());
}

// ============================================================
// POSTGRESQL
// ============================================================

fn db_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Connect, migrate and empty the table. None when POSTGRES_DSN is unset.
async fn pg_store() -> Option<PgNumberStore> {
    dotenvy::dotenv().ok();
    let dsn = std::env::var("POSTGRES_DSN").ok()?;

    let settings = PoolSettings {
        max_connections: 10,
        min_connections: 2,
        max_lifetime: Duration::from_secs(120),
        max_idle: Duration::from_secs(20),
        health_check_period: Duration::from_secs(30),
        acquire_timeout: Duration::from_secs(5),
    };
    let store = PgNumberStore::connect(&dsn, &settings).await.unwrap();
    store.migrate().await.unwrap();
    sqlx::query("DELETE FROM numbers")
        .execute(store.pool())
        .await
        .unwrap();
    Some(store)
}

#[tokio::test]
#[ignore = "requires POSTGRES_DSN"]
async fn test_postgres_query_layer() {
    let _guard = db_lock().lock().await;
    let Some(store) = pg_store().await else {
        println!("Skipping: POSTGRES_DSN not set");
        return;
    };

    let a = store.insert(7).await.unwrap();
    let b = store.insert(7).await.unwrap();
    store.insert(i32::MIN).await.unwrap();
    store.insert(i32::MAX).await.unwrap();
    assert_ne!(a.id, b.id);

    let first = store.list_sorted().await.unwrap();
    let second = store.list_sorted().await.unwrap();
    assert_eq!(first, second);

    let values: Vec<i32> = first.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![i32::MIN, 7, 7, i32::MAX]);

    store.close().await;
}

#[tokio::test]
#[ignore = "requires POSTGRES_DSN"]
async fn test_postgres_end_to_end() {
    let _guard = db_lock().lock().await;
    let Some(store) = pg_store().await else {
        println!("Skipping: POSTGRES_DSN not set");
        return;
    };

    let server = start_server(Arc::new(store.clone())).await;
    let responses = post_all(&server.client, &[10, -5, 20, -15, 0, 3, -3]).await;
    assert_eq!(
        responses.last().unwrap(),
        &vec![-15, -5, -3, 0, 3, 10, 20]
    );

    // verify directly from the database
    let values: Vec<i32> = store
        .list_sorted()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(values, vec![-15, -5, -3, 0, 3, 10, 20]);
    assert!(server.client.is_ready().await.unwrap());

    drop(server);
    store.close().await;
}
