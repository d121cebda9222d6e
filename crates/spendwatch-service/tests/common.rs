//! Common test utilities for spendwatch integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use spendwatch_core::{SpendingEvent, UserId, UserInfo};
use spendwatch_service::{create_router, AppState, ServiceConfig};
use spendwatch_store::{SpendingStore, SqliteStore};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store handle for seeding and verification.
    pub store: Arc<SqliteStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("spending.db");
        let store = Arc::new(
            SqliteStore::open(&db_path, 5)
                .await
                .expect("Failed to open store"),
        );

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            database_url: format!("sqlite:{}", db_path.display()),
            max_connections: 5,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Insert a user with the given age.
    pub async fn add_user(&self, user_id: i64, age: i64) {
        let user = UserInfo::new(
            UserId::new(user_id).unwrap(),
            format!("User {user_id}"),
            format!("user{user_id}@example.com"),
            age,
        )
        .unwrap();
        self.store.put_user(&user).await.expect("Failed to add user");
    }

    /// Append a spending event for a user.
    pub async fn spend(&self, user_id: i64, amount: &str) {
        let event = SpendingEvent::new(UserId::new(user_id).unwrap(), amount.parse().unwrap(), 2024);
        self.store
            .record_spending(&event)
            .await
            .expect("Failed to record spending");
    }
}
