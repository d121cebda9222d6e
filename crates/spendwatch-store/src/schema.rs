//! Database schema definitions.
//!
//! The schema is created if absent each time a store is opened. There are no
//! migrations beyond that.

/// Table names.
pub mod table {
    /// User identity records, keyed by `user_id`.
    pub const USER_INFO: &str = "user_info";

    /// Append-only spending events. Many rows per user.
    pub const USER_SPENDING: &str = "user_spending";

    /// High-spender ledger, keyed by `user_id`. One row per user.
    pub const HIGH_SPENDERS: &str = "high_spenders";
}

const CREATE_USER_INFO: &str = "CREATE TABLE IF NOT EXISTS user_info (
    user_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    age INTEGER NOT NULL
)";

// Amounts are decimal text. TEXT affinity keeps SQLite from coercing them to REAL.
const CREATE_USER_SPENDING: &str = "CREATE TABLE IF NOT EXISTS user_spending (
    user_id INTEGER NOT NULL REFERENCES user_info(user_id),
    amount TEXT NOT NULL,
    year INTEGER NOT NULL
)";

const CREATE_USER_SPENDING_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_user_spending_user_id ON user_spending(user_id)";

const CREATE_HIGH_SPENDERS: &str = "CREATE TABLE IF NOT EXISTS high_spenders (
    user_id INTEGER PRIMARY KEY,
    total_spending TEXT NOT NULL
)";

/// Returns the bootstrap statements in execution order.
#[must_use]
pub fn bootstrap_statements() -> Vec<&'static str> {
    vec![
        CREATE_USER_INFO,
        CREATE_USER_SPENDING,
        CREATE_USER_SPENDING_INDEX,
        CREATE_HIGH_SPENDERS,
    ]
}

/// Returns all table names.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![table::USER_INFO, table::USER_SPENDING, table::HIGH_SPENDERS]
}
