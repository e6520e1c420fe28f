//! Embedded PostgreSQL helpers shared by the Diesel adapter suites.
//!
//! Every suite draws a throwaway database from one shared cluster and brings
//! it up to date with the crate's own embedded migrations.

use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle, TemporaryDatabase};
use quiz_backend::outbound::persistence::run_migrations;

/// Password pinned while the shared cluster bootstraps, so reruns against an
/// existing data directory authenticate with the same credentials.
const STABLE_PASSWORD: &str = "quiz_backend_embedded_test";

/// Returns true when `SKIP_TEST_CLUSTER` is set to a truthy value.
///
/// Truthy values: "1", "true", "yes" (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip with a marker when `SKIP_TEST_CLUSTER` is truthy, otherwise panic so
/// CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    let _password = std::env::var_os("PG_PASSWORD")
        .is_none()
        .then(|| env_lock::lock_env([("PG_PASSWORD", Some(STABLE_PASSWORD))]));
    pg_embedded_setup_unpriv::test_support::shared_cluster_handle()
}

/// A fresh database on the shared cluster with every migration applied.
pub fn migrated_database() -> Result<TemporaryDatabase, String> {
    let cluster = shared_cluster_handle().map_err(|err| err.to_string())?;
    let name = format!("quiz_backend_{}", uuid::Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(name.as_str())
        .map_err(|err| err.to_string())?;
    let url = database.url().to_string();
    run_migrations(&url).map_err(|err| err.to_string())?;
    Ok(database)
}
