//! SQLite storage implementation.
//!
//! This module provides the `SqliteStore` implementation of the `SpendingStore` trait.
//!
//! Amounts are stored as decimal text and summed here with checked decimal
//! arithmetic, so no precision is lost to SQLite's integer or REAL math.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;

use spendwatch_core::{
    AgeBandReport, Amount, BandAverage, HighSpenderOutcome, HighSpenderRecord, SpendingEvent,
    UserId, UserInfo, UserTotal, AGE_BANDS,
};

use crate::error::{Result, StoreError};
use crate::schema::bootstrap_statements;
use crate::SpendingStore;

const PING: &str = "SELECT 1";

const USER_AMOUNTS: &str = "SELECT amount FROM user_spending WHERE user_id = ?";

// ?2 is NULL for the open-ended band.
const BAND_AMOUNTS: &str = "SELECT s.amount
    FROM user_spending s
    JOIN user_info u ON s.user_id = u.user_id
    WHERE u.age >= ?1 AND (?2 IS NULL OR u.age <= ?2)";

const INSERT_HIGH_SPENDER: &str =
    "INSERT INTO high_spenders (user_id, total_spending) VALUES (?, ?)";

const SELECT_HIGH_SPENDER: &str =
    "SELECT user_id, total_spending FROM high_spenders WHERE user_id = ?";

const INSERT_USER: &str = "INSERT INTO user_info (user_id, name, email, age) VALUES (?, ?, ?, ?)";

const INSERT_SPENDING: &str = "INSERT INTO user_spending (user_id, amount, year) VALUES (?, ?, ?)";

/// Raw `high_spenders` row.
#[derive(Debug, sqlx::FromRow)]
struct HighSpenderRow {
    user_id: i64,
    total_spending: String,
}

impl TryFrom<HighSpenderRow> for HighSpenderRecord {
    type Error = StoreError;

    fn try_from(row: HighSpenderRow) -> Result<Self> {
        let user_id =
            UserId::new(row.user_id).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let total_spending = decode_amount(&row.total_spending)?;
        Ok(Self::new(user_id, total_spending))
    }
}

fn decode_amount(raw: &str) -> Result<Amount> {
    Amount::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Running sum and row count over stored amounts.
#[derive(Debug, Default)]
struct AmountTotals {
    sum: Decimal,
    count: i64,
}

impl AmountTotals {
    /// Fold one stored amount into the totals.
    ///
    /// `what` names the aggregate in the overflow error.
    fn add(&mut self, raw: &str, what: impl FnOnce() -> String) -> Result<()> {
        let amount = decode_amount(raw)?;
        self.sum = self
            .sum
            .checked_add(amount.as_decimal())
            .ok_or_else(|| StoreError::Overflow(what()))?;
        self.count += 1;
        Ok(())
    }
}

/// Drain a stream of stored amounts into checked decimal totals.
async fn fold_amounts<S, F>(mut rows: S, what: F) -> Result<AmountTotals>
where
    S: Stream<Item = std::result::Result<String, sqlx::Error>> + Unpin,
    F: Fn() -> String,
{
    let mut totals = AmountTotals::default();
    while let Some(raw) = rows.try_next().await? {
        totals.add(&raw, &what)?;
    }
    Ok(totals)
}

/// SQLite-backed storage implementation.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a database file at the given path and bootstrap the schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the database cannot be opened or initialised.
    pub async fn open<P: AsRef<Path>>(path: P, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        Self::connect_with(options, max_connections).await
    }

    /// Connect using a `sqlite:` URL and bootstrap the schema.
    ///
    /// In-memory URLs give every pooled connection its own database, so use
    /// `max_connections = 1` with them.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the URL is invalid or the database
    /// cannot be opened or initialised.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .create_if_missing(true);

        Self::connect_with(options, max_connections).await
    }

    async fn connect_with(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        // Spending rows may reference users that were never loaded.
        let options = options.foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    /// Create all tables if absent. Idempotent.
    async fn bootstrap(&self) -> Result<()> {
        let mut conn = self.acquire().await?;

        for statement in bootstrap_statements() {
            sqlx::query(statement)
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::Unavailable(format!("schema bootstrap failed: {e}")))?;
        }

        tracing::debug!("Schema bootstrap complete");
        Ok(())
    }

    /// Check a connection out of the pool for the duration of one operation.
    ///
    /// The connection is returned when the guard is dropped.
    async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Round-trip a trivial statement to confirm the database answers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if no connection can be acquired
    /// (including after `close`).
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.acquire().await?;
        sqlx::query_scalar::<_, i64>(PING)
            .fetch_one(&mut *conn)
            .await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SpendingStore for SqliteStore {
    // =========================================================================
    // Aggregations
    // =========================================================================

    async fn total_spent(&self, user_id: UserId) -> Result<Option<UserTotal>> {
        let mut conn = self.acquire().await?;

        let rows = sqlx::query_scalar::<_, String>(USER_AMOUNTS)
            .bind(user_id.get())
            .fetch(&mut *conn);
        let totals =
            fold_amounts(rows, move || format!("total spending for user {user_id}")).await?;

        if totals.count == 0 {
            tracing::debug!(user_id = %user_id, "No spending recorded");
            return Ok(None);
        }

        let total_spending =
            Amount::new(totals.sum).map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Some(UserTotal {
            user_id,
            total_spending,
        }))
    }

    async fn average_spending_by_age_band(&self) -> Result<AgeBandReport> {
        let mut conn = self.acquire().await?;
        let mut report = AgeBandReport::new();

        for band in AGE_BANDS {
            let rows = sqlx::query_scalar::<_, String>(BAND_AMOUNTS)
                .bind(band.lower)
                .bind(band.upper)
                .fetch(&mut *conn);
            let totals =
                fold_amounts(rows, move || format!("spending in age band {}", band.label()))
                    .await?;

            report.push(BandAverage::from_totals(band, totals.sum, totals.count));
        }

        Ok(report)
    }

    // =========================================================================
    // High-Spender Ledger
    // =========================================================================

    async fn record_high_spender_if_eligible(
        &self,
        record: &HighSpenderRecord,
    ) -> Result<HighSpenderOutcome> {
        if !record.qualifies() {
            tracing::debug!(
                user_id = %record.user_id,
                total_spending = %record.total_spending,
                "Total does not exceed high-spender threshold"
            );
            return Ok(HighSpenderOutcome::BelowThreshold);
        }

        let mut conn = self.acquire().await?;

        // The primary key decides concurrent writers for the same user.
        let inserted = sqlx::query(INSERT_HIGH_SPENDER)
            .bind(record.user_id.get())
            .bind(record.total_spending.to_string())
            .execute(&mut *conn)
            .await;

        match inserted {
            Ok(_) => {
                tracing::info!(
                    user_id = %record.user_id,
                    total_spending = %record.total_spending,
                    "High spender recorded"
                );
                Ok(HighSpenderOutcome::Inserted)
            }
            Err(err) => {
                match StoreError::unique_violation(err, "high spender", record.user_id.to_string())
                {
                    StoreError::Conflict { .. } => {
                        tracing::debug!(user_id = %record.user_id, "High spender already recorded");
                        Ok(HighSpenderOutcome::AlreadyExists)
                    }
                    other => Err(other),
                }
            }
        }
    }

    async fn get_high_spender(&self, user_id: UserId) -> Result<Option<HighSpenderRecord>> {
        let mut conn = self.acquire().await?;

        sqlx::query_as::<_, HighSpenderRow>(SELECT_HIGH_SPENDER)
            .bind(user_id.get())
            .fetch_optional(&mut *conn)
            .await?
            .map(HighSpenderRecord::try_from)
            .transpose()
    }

    // =========================================================================
    // Data Loading
    // =========================================================================

    async fn put_user(&self, user: &UserInfo) -> Result<()> {
        let mut conn = self.acquire().await?;

        sqlx::query(INSERT_USER)
            .bind(user.user_id.get())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.age)
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::unique_violation(e, "user", user.user_id.to_string()))?;

        Ok(())
    }

    async fn record_spending(&self, event: &SpendingEvent) -> Result<()> {
        let mut conn = self.acquire().await?;

        sqlx::query(INSERT_SPENDING)
            .bind(event.user_id.get())
            .bind(event.amount.to_string())
            .bind(event.year)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::all_tables;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    async fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("spending.db"), 5)
            .await
            .unwrap();
        (store, dir)
    }

    fn uid(value: i64) -> UserId {
        UserId::new(value).unwrap()
    }

    fn amount(raw: &str) -> Amount {
        raw.parse().unwrap()
    }

    async fn add_user(store: &SqliteStore, id: i64, age: i64) {
        let user = UserInfo::new(uid(id), format!("user{id}"), format!("user{id}@example.com"), age)
            .unwrap();
        store.put_user(&user).await.unwrap();
    }

    /// Write a spending row without going through `Amount` validation.
    async fn insert_raw_amount(store: &SqliteStore, id: i64, raw: &str) {
        sqlx::query(INSERT_SPENDING)
            .bind(id)
            .bind(raw)
            .bind(2024)
            .execute(&store.pool)
            .await
            .unwrap();
    }

    async fn spend(store: &SqliteStore, id: i64, raw: &str) {
        store
            .record_spending(&SpendingEvent::new(uid(id), amount(raw), 2024))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn open_creates_all_tables() {
        let (store, _dir) = create_test_store().await;

        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&store.pool)
                .await
                .unwrap();

        for table in all_tables() {
            assert!(names.iter().any(|n| n == table), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spending.db");

        let store = SqliteStore::open(&path, 2).await.unwrap();
        add_user(&store, 1, 30).await;
        spend(&store, 1, "10").await;
        store.close().await;

        let store = SqliteStore::open(&path, 2).await.unwrap();
        let total = store.total_spent(uid(1)).await.unwrap().unwrap();
        assert_eq!(total.total_spending, amount("10"));
    }

    #[tokio::test]
    async fn open_in_missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = SqliteStore::open(dir.path().join("missing").join("spending.db"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn ping_fails_after_close() {
        let (store, _dir) = create_test_store().await;
        store.ping().await.unwrap();

        store.close().await;
        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn in_memory_url_with_single_connection() {
        let store = SqliteStore::connect("sqlite::memory:", 1).await.unwrap();
        add_user(&store, 1, 20).await;
        spend(&store, 1, "3.50").await;
        let total = store.total_spent(uid(1)).await.unwrap().unwrap();
        assert_eq!(total.total_spending.as_decimal(), dec!(3.50));
    }

    // =========================================================================
    // Total spent
    // =========================================================================

    #[tokio::test]
    async fn total_spent_sums_rows() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 7, 30).await;
        spend(&store, 7, "50").await;
        spend(&store, 7, "75").await;

        let total = store.total_spent(uid(7)).await.unwrap().unwrap();
        assert_eq!(total.user_id, uid(7));
        assert_eq!(total.total_spending.as_decimal(), dec!(125.00));
        assert_eq!(total.total_spending.to_string(), "125");
    }

    #[tokio::test]
    async fn total_spent_keeps_sub_cent_precision() {
        let (store, _dir) = create_test_store().await;
        spend(&store, 2, "1000.001").await;
        spend(&store, 2, "0.009").await;
        spend(&store, 2, "0.1").await;

        let total = store.total_spent(uid(2)).await.unwrap().unwrap();
        assert_eq!(total.total_spending.as_decimal(), dec!(1000.110));
    }

    #[tokio::test]
    async fn total_spent_overflow_is_reported() {
        let (store, _dir) = create_test_store().await;
        let max = Decimal::MAX.to_string();
        insert_raw_amount(&store, 3, &max).await;
        insert_raw_amount(&store, 3, &max).await;

        let err = store.total_spent(uid(3)).await.unwrap_err();
        assert!(matches!(err, StoreError::Overflow(_)), "{err:?}");
        assert!(err.to_string().contains("user 3"), "{err}");
    }

    #[tokio::test]
    async fn corrupt_stored_amount_is_serialization_error() {
        let (store, _dir) = create_test_store().await;
        insert_raw_amount(&store, 8, "twelve").await;

        let err = store.total_spent(uid(8)).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)), "{err:?}");
    }

    #[tokio::test]
    async fn total_spent_without_rows_is_none() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 9, 30).await;

        assert!(store.total_spent(uid(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_spending_is_not_missing() {
        let (store, _dir) = create_test_store().await;
        spend(&store, 4, "0").await;

        let total = store.total_spent(uid(4)).await.unwrap().unwrap();
        assert_eq!(total.total_spending, Amount::ZERO);
    }

    #[tokio::test]
    async fn total_spent_ignores_insertion_order() {
        let (first, _dir1) = create_test_store().await;
        let (second, _dir2) = create_test_store().await;
        let amounts = ["0.10", "0.20", "19.99", "1000.01"];

        for raw in amounts {
            spend(&first, 1, raw).await;
        }
        for raw in amounts.iter().rev() {
            spend(&second, 1, raw).await;
        }

        let a = first.total_spent(uid(1)).await.unwrap().unwrap();
        let b = second.total_spent(uid(1)).await.unwrap().unwrap();
        assert_eq!(a.total_spending.as_decimal(), dec!(1020.30));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn total_spent_does_not_require_user_row() {
        let (store, _dir) = create_test_store().await;
        spend(&store, 99, "5").await;

        let total = store.total_spent(uid(99)).await.unwrap().unwrap();
        assert_eq!(total.total_spending, amount("5"));
    }

    // =========================================================================
    // Age bands
    // =========================================================================

    #[tokio::test]
    async fn empty_database_reports_zero_for_every_band() {
        let (store, _dir) = create_test_store().await;

        let report = store.average_spending_by_age_band().await.unwrap();
        assert_eq!(report.len(), 5);
        assert!(report.iter().all(|entry| entry.average == Decimal::ZERO));
    }

    #[tokio::test]
    async fn band_boundaries() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 1, 18).await;
        add_user(&store, 2, 24).await;
        add_user(&store, 3, 47).await;
        add_user(&store, 4, 48).await;
        add_user(&store, 5, 17).await;

        spend(&store, 1, "10").await;
        spend(&store, 2, "20").await;
        spend(&store, 3, "300").await;
        spend(&store, 4, "40").await;
        spend(&store, 4, "60").await;
        spend(&store, 5, "999").await;

        let report = store.average_spending_by_age_band().await.unwrap();
        assert_eq!(report.len(), 5);
        assert_eq!(report.get("18-24"), Some(dec!(15.00)));
        assert_eq!(report.get("25-30"), Some(Decimal::ZERO));
        assert_eq!(report.get("31-36"), Some(Decimal::ZERO));
        assert_eq!(report.get("37-47"), Some(dec!(300.00)));
        assert_eq!(report.get(">48"), Some(dec!(50.00)));
    }

    #[tokio::test]
    async fn band_average_is_per_event() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 1, 26).await;
        add_user(&store, 2, 29).await;
        spend(&store, 1, "10").await;
        spend(&store, 1, "10").await;
        spend(&store, 2, "70").await;

        let report = store.average_spending_by_age_band().await.unwrap();
        // (10 + 10 + 70) / 3 events
        assert_eq!(report.get("25-30"), Some(dec!(30.00)));
    }

    #[tokio::test]
    async fn band_average_is_not_rounded() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 1, 20).await;
        spend(&store, 1, "0.01").await;
        spend(&store, 1, "0.02").await;

        let report = store.average_spending_by_age_band().await.unwrap();
        assert_eq!(report.get("18-24"), Some(dec!(0.015)));
    }

    #[tokio::test]
    async fn band_overflow_is_reported() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 1, 40).await;
        let max = Decimal::MAX.to_string();
        insert_raw_amount(&store, 1, &max).await;
        insert_raw_amount(&store, 1, "1").await;

        let err = store.average_spending_by_age_band().await.unwrap_err();
        assert!(matches!(err, StoreError::Overflow(_)), "{err:?}");
        assert!(err.to_string().contains("37-47"), "{err}");
    }

    #[tokio::test]
    async fn spending_without_user_row_is_unbanded() {
        let (store, _dir) = create_test_store().await;
        spend(&store, 42, "100").await;

        let report = store.average_spending_by_age_band().await.unwrap();
        assert!(report.iter().all(|entry| entry.average == Decimal::ZERO));
    }

    // =========================================================================
    // High-spender ledger
    // =========================================================================

    #[tokio::test]
    async fn threshold_total_is_below_threshold() {
        let (store, _dir) = create_test_store().await;
        let record = HighSpenderRecord::new(uid(1), amount("1000"));

        let outcome = store.record_high_spender_if_eligible(&record).await.unwrap();
        assert_eq!(outcome, HighSpenderOutcome::BelowThreshold);
        assert!(store.get_high_spender(uid(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_write_wins() {
        let (store, _dir) = create_test_store().await;
        let first = HighSpenderRecord::new(uid(1), amount("1000.01"));
        let second = HighSpenderRecord::new(uid(1), amount("5000"));

        assert_eq!(
            store.record_high_spender_if_eligible(&first).await.unwrap(),
            HighSpenderOutcome::Inserted
        );
        assert_eq!(
            store.record_high_spender_if_eligible(&second).await.unwrap(),
            HighSpenderOutcome::AlreadyExists
        );
        assert_eq!(
            store.record_high_spender_if_eligible(&first).await.unwrap(),
            HighSpenderOutcome::AlreadyExists
        );

        let stored = store.get_high_spender(uid(1)).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn sub_cent_total_over_threshold_is_recorded() {
        let (store, _dir) = create_test_store().await;
        let record = HighSpenderRecord::new(uid(6), amount("1000.001"));

        assert_eq!(
            store.record_high_spender_if_eligible(&record).await.unwrap(),
            HighSpenderOutcome::Inserted
        );

        let stored = store.get_high_spender(uid(6)).await.unwrap().unwrap();
        assert_eq!(stored.total_spending.to_string(), "1000.001");
    }

    #[tokio::test]
    async fn below_threshold_does_not_block_later_insert() {
        let (store, _dir) = create_test_store().await;

        let low = HighSpenderRecord::new(uid(3), amount("500"));
        let high = HighSpenderRecord::new(uid(3), amount("1500"));
        assert_eq!(
            store.record_high_spender_if_eligible(&low).await.unwrap(),
            HighSpenderOutcome::BelowThreshold
        );
        assert_eq!(
            store.record_high_spender_if_eligible(&high).await.unwrap(),
            HighSpenderOutcome::Inserted
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_have_one_winner() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);

        let attempts = (0..16).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let total = Amount::new(dec!(2000) + Decimal::from(i)).unwrap();
                let record = HighSpenderRecord::new(uid(5), total);
                store.record_high_spender_if_eligible(&record).await
            })
        });

        let outcomes: Vec<HighSpenderOutcome> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let inserted = outcomes
            .iter()
            .filter(|o| **o == HighSpenderOutcome::Inserted)
            .count();
        let existing = outcomes
            .iter()
            .filter(|o| **o == HighSpenderOutcome::AlreadyExists)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(existing, 15);
        assert!(store.get_high_spender(uid(5)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ledger_does_not_require_user_row() {
        let (store, _dir) = create_test_store().await;
        let record = HighSpenderRecord::new(uid(12345), amount("2000"));

        assert_eq!(
            store.record_high_spender_if_eligible(&record).await.unwrap(),
            HighSpenderOutcome::Inserted
        );
    }

    // =========================================================================
    // Data loading
    // =========================================================================

    #[tokio::test]
    async fn duplicate_user_is_conflict() {
        let (store, _dir) = create_test_store().await;
        add_user(&store, 1, 30).await;

        let dup = UserInfo::new(uid(1), "other", "other@example.com", 40).unwrap();
        let err = store.put_user(&dup).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Conflict { entity: "user", .. }),
            "{err:?}"
        );
    }
}
