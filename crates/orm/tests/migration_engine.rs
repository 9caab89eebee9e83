//! Engine behaviour against a real SQLite database

mod common;

use std::sync::Arc;

use common::{Fixture, CONNECTION, LEDGER_TABLE};
use strata_core::{DatabaseConfig, DatabaseConfigs};
use strata_orm::migrations::{BatchSequencer, LedgerStore};
use strata_orm::{
    ConnectionRegistry, ConnectionResolver, DatabaseValue, MigrationConfig, MigrationError, MigrationManager,
    MigrationRunner, MigrationState,
};

const WIDGETS: &str = "20250101000000_create_widgets";

#[tokio::test]
async fn test_ensure_ledger_is_idempotent() {
    let fixture = Fixture::new();
    let connection = fixture.connection().await;
    let ledger = LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE);

    ledger.ensure().await.unwrap();
    ledger.ensure().await.unwrap();

    let tables = fixture
        .scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'migrations'")
        .await;
    assert_eq!(tables, 1);
    assert_eq!(ledger.last_batch().await.unwrap(), 0);
}

#[tokio::test]
async fn test_apply_one_then_revert_one_round_trip() {
    let fixture = Fixture::new();
    fixture.write_change_set(WIDGETS, "CREATE TABLE widgets (id INT);", "DROP TABLE widgets;");

    let result = fixture.runner.apply_one(&format!("{}.sql", WIDGETS), None).await.unwrap();
    assert_eq!(result.connection, CONNECTION);
    assert_eq!(result.batch, Some(1));
    assert_eq!(result.applied_migrations, vec![WIDGETS]);
    assert!(fixture.table_exists("widgets").await);

    let connection = fixture.connection().await;
    let entries = LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE)
        .entries()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, WIDGETS);
    assert_eq!(entries[0].batch, 1);
    assert!(entries[0].migrated_at.is_some());

    let reverted = fixture.runner.revert_one(WIDGETS, None).await.unwrap();
    assert_eq!(reverted.rolled_back_migrations, vec![WIDGETS]);
    assert_eq!(fixture.ledger_rows(WIDGETS).await, 0);
    assert!(!fixture.table_exists("widgets").await);
}

#[tokio::test]
async fn test_apply_one_twice_records_two_rows() {
    let fixture = Fixture::new();
    fixture.write_change_set(
        WIDGETS,
        "CREATE TABLE IF NOT EXISTS widgets (id INT);",
        "DROP TABLE IF EXISTS widgets;",
    );

    let first = fixture.runner.apply_one(WIDGETS, None).await.unwrap();
    let second = fixture.runner.apply_one(WIDGETS, None).await.unwrap();

    assert_eq!(first.batch, Some(1));
    assert_eq!(second.batch, Some(2));
    assert_eq!(fixture.ledger_rows(WIDGETS).await, 2);
}

#[tokio::test]
async fn test_apply_all_twice_applies_nothing_the_second_time() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.write_change_set("20250102000000_create_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

    let first = fixture.runner.apply_all(None).await.unwrap();
    assert_eq!(first.batch, Some(1));
    assert_eq!(
        first.applied_migrations,
        vec!["20250101000000_create_a", "20250102000000_create_b"]
    );

    let second = fixture.runner.apply_all(None).await.unwrap();
    assert_eq!(second.applied_count(), 0);
    assert_eq!(second.batch, None);
    assert_eq!(second.skipped_count, 2);
    assert_eq!(fixture.last_batch().await, 1);
}

#[tokio::test]
async fn test_apply_all_with_no_change_sets_is_a_no_op() {
    let fixture = Fixture::new();

    let result = fixture.runner.apply_all(None).await.unwrap();
    assert_eq!(result.applied_count(), 0);
    assert_eq!(fixture.last_batch().await, 0);
}

#[tokio::test]
async fn test_new_files_go_into_the_next_batch() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.runner.apply_all(None).await.unwrap();

    fixture.write_change_set("20250102000000_create_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");
    let result = fixture.runner.apply_all(None).await.unwrap();

    assert_eq!(result.batch, Some(2));
    assert_eq!(result.applied_migrations, vec!["20250102000000_create_b"]);
    assert_eq!(result.skipped_count, 1);

    let connection = fixture.connection().await;
    let ledger = LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE);
    assert_eq!(BatchSequencer::new(&ledger).next_batch().await.unwrap(), 3);
}

#[tokio::test]
async fn test_revert_batch_runs_newest_change_set_first() {
    let fixture = Fixture::new();
    fixture
        .connection()
        .await
        .execute("CREATE TABLE audit (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)", &[])
        .await
        .unwrap();

    fixture.write_change_set(
        "20250101000000_create_a",
        "CREATE TABLE a (id INT);",
        "DROP TABLE a;\nINSERT INTO audit (name) VALUES ('a');",
    );
    fixture.write_change_set(
        "20250102000000_create_b",
        "CREATE TABLE b (id INT);",
        "DROP TABLE b;\nINSERT INTO audit (name) VALUES ('b');",
    );
    fixture.runner.apply_all(None).await.unwrap();

    let connection = fixture.connection().await;
    let ledger = LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE);
    assert_eq!(
        ledger.entries_for_batch(1).await.unwrap(),
        vec!["20250102000000_create_b", "20250101000000_create_a"]
    );

    let result = fixture.runner.revert_batch(1, None).await.unwrap();
    assert_eq!(result.batches, vec![1]);
    assert_eq!(
        result.rolled_back_migrations,
        vec!["20250102000000_create_b", "20250101000000_create_a"]
    );

    let order: Vec<String> = connection
        .fetch_rows("SELECT name FROM audit ORDER BY id", &[])
        .await
        .unwrap()
        .into_iter()
        .filter_map(|row| row.into_iter().next().and_then(DatabaseValue::into_string))
        .collect();
    assert_eq!(order, vec!["b", "a"]);
    assert_eq!(fixture.last_batch().await, 0);
}

#[tokio::test]
async fn test_fresh_reapplies_everything_as_one_batch() {
    let fixture = Fixture::new();
    fixture.write_change_set(
        "20250101000000_create_a",
        "CREATE TABLE IF NOT EXISTS a (id INT);",
        "DROP TABLE IF EXISTS a;",
    );
    fixture.runner.apply_all(None).await.unwrap();
    fixture.write_change_set(
        "20250102000000_create_b",
        "CREATE TABLE IF NOT EXISTS b (id INT);",
        "DROP TABLE IF EXISTS b;",
    );
    fixture.runner.apply_all(None).await.unwrap();
    assert_eq!(fixture.last_batch().await, 2);

    let result = fixture.runner.fresh(None).await.unwrap();
    assert_eq!(result.batch, Some(1));
    assert_eq!(result.applied_count(), 2);
    assert_eq!(fixture.last_batch().await, 1);

    let connection = fixture.connection().await;
    let entries = LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE)
        .entries()
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.batch == 1));
    // the id counter was reset along with the rows
    assert_eq!(entries[0].id, 1);
}

#[tokio::test]
async fn test_fresh_fails_on_non_idempotent_change_sets() {
    let fixture = Fixture::new();
    fixture.write_change_set(WIDGETS, "CREATE TABLE widgets (id INT);", "DROP TABLE widgets;");
    fixture.runner.apply_all(None).await.unwrap();

    let err = fixture.runner.fresh(None).await.unwrap_err();
    assert!(matches!(err, MigrationError::Statement { ref filename, .. } if filename == WIDGETS));
    assert_eq!(fixture.ledger_rows(WIDGETS).await, 0);
}

#[tokio::test]
async fn test_revert_last_batch_on_empty_ledger_does_nothing() {
    let fixture = Fixture::new();
    let connection = fixture.connection().await;
    LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE)
        .ensure()
        .await
        .unwrap();

    let result = fixture.runner.revert_last_batch(None).await.unwrap();
    assert!(result.batches.is_empty());
    assert_eq!(result.rolled_back_count(), 0);
}

#[tokio::test]
async fn test_revert_last_batch_leaves_older_batches() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.runner.apply_all(None).await.unwrap();
    fixture.write_change_set("20250102000000_create_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");
    fixture.runner.apply_all(None).await.unwrap();

    let result = fixture.runner.revert_last_batch(None).await.unwrap();
    assert_eq!(result.batches, vec![2]);
    assert_eq!(result.rolled_back_migrations, vec!["20250102000000_create_b"]);
    assert!(fixture.table_exists("a").await);
    assert!(!fixture.table_exists("b").await);
    assert_eq!(fixture.last_batch().await, 1);
}

#[tokio::test]
async fn test_revert_all_walks_batches_newest_first() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.runner.apply_all(None).await.unwrap();
    fixture.write_change_set(
        "20250102000000_create_b",
        "CREATE TABLE b (id INT, a_id INT REFERENCES a (id));",
        "DROP TABLE b;",
    );
    fixture.write_change_set("20250103000000_create_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");
    fixture.runner.apply_all(None).await.unwrap();

    let result = fixture.runner.revert_all(None).await.unwrap();
    assert_eq!(result.batches, vec![2, 1]);
    assert_eq!(
        result.rolled_back_migrations,
        vec![
            "20250103000000_create_c",
            "20250102000000_create_b",
            "20250101000000_create_a"
        ]
    );
    assert_eq!(fixture.last_batch().await, 0);
    assert!(!fixture.table_exists("a").await);
}

#[tokio::test]
async fn test_revert_all_stops_at_first_failing_batch() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.runner.apply_all(None).await.unwrap();
    fixture.write_change_set("20250102000000_create_b", "CREATE TABLE b (id INT);", "DROP TABLE missing_b;");
    fixture.runner.apply_all(None).await.unwrap();

    let err = fixture.runner.revert_all(None).await.unwrap_err();
    assert!(matches!(err, MigrationError::Statement { ref filename, .. } if filename == "20250102000000_create_b"));

    // batch 1 was never attempted
    assert!(fixture.table_exists("a").await);
    assert_eq!(fixture.ledger_rows("20250101000000_create_a").await, 1);
    assert_eq!(fixture.ledger_rows("20250102000000_create_b").await, 1);
}

#[tokio::test]
async fn test_apply_all_aborts_on_failing_change_set() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.write_change_set(
        "20250102000000_broken",
        "CREATE TABLE b (id INT);\nCREATE TABLE b (id INT);",
        "DROP TABLE b;",
    );
    fixture.write_change_set("20250103000000_create_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");

    let err = fixture.runner.apply_all(None).await.unwrap_err();
    match err {
        MigrationError::Statement {
            connection,
            filename,
            statement,
            ..
        } => {
            assert_eq!(connection, CONNECTION);
            assert_eq!(filename, "20250102000000_broken");
            assert_eq!(statement, "CREATE TABLE b (id INT)");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(fixture.ledger_rows("20250101000000_create_a").await, 1);
    assert_eq!(fixture.ledger_rows("20250102000000_broken").await, 0);
    assert!(!fixture.table_exists("c").await);
    // the first statement of the failing change-set stays applied
    assert!(fixture.table_exists("b").await);
}

#[tokio::test]
async fn test_revert_one_of_unrecorded_change_set_still_runs() {
    let fixture = Fixture::new();
    fixture.write_change_set(WIDGETS, "CREATE TABLE widgets (id INT);", "DROP TABLE widgets;");
    fixture
        .connection()
        .await
        .execute("CREATE TABLE widgets (id INT)", &[])
        .await
        .unwrap();

    fixture.runner.revert_one(WIDGETS, None).await.unwrap();
    assert!(!fixture.table_exists("widgets").await);
}

#[tokio::test]
async fn test_revert_one_failure_keeps_ledger_row() {
    let fixture = Fixture::new();
    fixture.write_change_set(WIDGETS, "CREATE TABLE widgets (id INT);", "DROP TABLE gadgets;");
    fixture.runner.apply_one(WIDGETS, None).await.unwrap();

    let err = fixture.runner.revert_one(WIDGETS, None).await.unwrap_err();
    assert!(matches!(err, MigrationError::Statement { .. }));
    assert_eq!(fixture.ledger_rows(WIDGETS).await, 1);
}

#[tokio::test]
async fn test_missing_change_set_file_is_a_file_error() {
    let fixture = Fixture::new();

    let err = fixture.runner.apply_one("20990101000000_nope", None).await.unwrap_err();
    assert!(matches!(err, MigrationError::File { .. }));
    assert_eq!(fixture.last_batch().await, 0);
}

#[tokio::test]
async fn test_unknown_connection_is_a_configuration_error() {
    let fixture = Fixture::new();

    let err = fixture.runner.apply_all(Some("warehouse")).await.unwrap_err();
    assert!(matches!(err, MigrationError::Configuration { ref connection, .. } if connection == "warehouse"));
}

#[tokio::test]
async fn test_status_reports_pending_applied_and_missing() {
    let fixture = Fixture::new();
    fixture.write_change_set("20250101000000_create_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fixture.write_change_set("20250102000000_create_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");
    fixture.runner.apply_one("20250101000000_create_a", None).await.unwrap();
    fixture.runner.apply_one("20250102000000_create_b", None).await.unwrap();

    std::fs::remove_file(fixture.runner.manager().path_for("20250102000000_create_b")).unwrap();
    fixture.write_change_set("20250103000000_create_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");

    let statuses = fixture.runner.status(None).await.unwrap();
    let names: Vec<&str> = statuses.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "20250101000000_create_a",
            "20250103000000_create_c",
            "20250102000000_create_b"
        ]
    );

    assert!(matches!(statuses[0].state, MigrationState::Applied { batch: 1, .. }));
    assert_eq!(statuses[1].state, MigrationState::Pending);
    assert_eq!(statuses[2].state, MigrationState::Missing { batch: 2 });
}

async fn ledger_names(registry: &ConnectionRegistry, name: &str) -> Vec<(String, i64)> {
    let connection = registry.resolve(name).await.unwrap();
    LedgerStore::new(connection.as_ref(), name, LEDGER_TABLE)
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| (entry.filename, entry.batch))
        .collect()
}

#[tokio::test]
async fn test_each_connection_keeps_its_own_ledger() {
    let fixture = Fixture::new();
    let configs = DatabaseConfigs::default()
        .with_connection("a", DatabaseConfig::sqlite(fixture.dir.path().join("a.db").to_string_lossy()))
        .with_connection("b", DatabaseConfig::sqlite(fixture.dir.path().join("b.db").to_string_lossy()))
        .with_default("a");
    let registry = Arc::new(ConnectionRegistry::new(configs));
    let manager = MigrationManager::with_config(MigrationConfig {
        migrations_dir: fixture.dir.path().join("migrations"),
        migrations_table: LEDGER_TABLE.to_string(),
    });
    let resolver: Arc<dyn ConnectionResolver> = registry.clone();
    let runner = MigrationRunner::new(manager, resolver);

    fixture.write_change_set(WIDGETS, "CREATE TABLE widgets (id INT);", "DROP TABLE widgets;");

    let on_a = runner.apply_all(Some("a")).await.unwrap();
    let on_b = runner.apply_all(Some("b")).await.unwrap();

    assert_eq!(on_a.batch, Some(1));
    assert_eq!(on_b.batch, Some(1));
    assert_eq!(on_b.applied_migrations, vec![WIDGETS]);
    assert_eq!(ledger_names(&registry, "a").await, vec![(WIDGETS.to_string(), 1)]);
    assert_eq!(ledger_names(&registry, "b").await, vec![(WIDGETS.to_string(), 1)]);

    let reverted = runner.revert_last_batch(Some("a")).await.unwrap();
    assert_eq!(reverted.rolled_back_migrations, vec![WIDGETS]);
    assert!(ledger_names(&registry, "a").await.is_empty());
    assert_eq!(ledger_names(&registry, "b").await, vec![(WIDGETS.to_string(), 1)]);

    let widgets_on_b = registry
        .resolve("b")
        .await
        .unwrap()
        .fetch_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'widgets'", &[])
        .await
        .unwrap();
    assert_eq!(widgets_on_b.as_i64(), Some(1));

    registry.teardown().await;
}
