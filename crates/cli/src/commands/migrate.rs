use anyhow::Context;

use strata_orm::{MigrationRunResult, MigrationState, RollbackResult};

use crate::context::AppContext;

pub async fn run(context: &AppContext, file: &str, connection: Option<&str>) -> anyhow::Result<()> {
    println!("🚀 Migrate: {} on connection {}", file, context.connection_name(connection));

    let result = context.runner.apply_one(file, connection).await?;
    print_run_summary(&result);
    Ok(())
}

pub async fn all(context: &AppContext, connection: Option<&str>) -> anyhow::Result<()> {
    println!("🚀 Migrate all on connection {}", context.connection_name(connection));

    let result = context.runner.apply_all(connection).await?;
    print_run_summary(&result);
    Ok(())
}

pub async fn rollback(context: &AppContext, file: &str, connection: Option<&str>) -> anyhow::Result<()> {
    println!("🔄 Rollback: {} on connection {}", file, context.connection_name(connection));

    let result = context.runner.revert_one(file, connection).await?;
    print_rollback_summary(&result);
    Ok(())
}

/// Revert `batch`, or the last batch when it is omitted or 0
pub async fn rollback_batch(context: &AppContext, batch: Option<i64>, connection: Option<&str>) -> anyhow::Result<()> {
    let connection_name = context.connection_name(connection);

    let result = match batch.filter(|b| *b > 0) {
        Some(batch) => {
            println!("🔄 Rollback batch {} on connection {}", batch, connection_name);
            context.runner.revert_batch(batch, connection).await?
        }
        None => {
            println!("🔄 Rollback last batch on connection {}", connection_name);
            context.runner.revert_last_batch(connection).await?
        }
    };

    print_rollback_summary(&result);
    Ok(())
}

pub async fn rollback_all(context: &AppContext, connection: Option<&str>) -> anyhow::Result<()> {
    println!("🔄 Rollback all on connection {}", context.connection_name(connection));

    let result = context.runner.revert_all(connection).await?;
    print_rollback_summary(&result);
    Ok(())
}

pub async fn fresh(context: &AppContext, connection: Option<&str>) -> anyhow::Result<()> {
    println!(
        "🔄 Fresh: clear history then migrate all on connection {}",
        context.connection_name(connection)
    );

    let result = context.runner.fresh(connection).await?;
    print_run_summary(&result);
    Ok(())
}

pub async fn status(context: &AppContext, connection: Option<&str>, json: bool) -> anyhow::Result<()> {
    let statuses = context.runner.status(connection).await?;

    if json {
        let output = serde_json::to_string_pretty(&statuses).context("failed to serialize status")?;
        println!("{}", output);
        return Ok(());
    }

    println!("Migration Status ({})", context.connection_name(connection));
    println!("================");

    if statuses.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    for status in &statuses {
        match &status.state {
            MigrationState::Applied { batch, migrated_at } => {
                let when = migrated_at
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("  ✅ {} (batch {}, {})", status.name, batch, when);
            }
            MigrationState::Pending => println!("  ⏳ {}", status.name),
            MigrationState::Missing { batch } => {
                println!("  ❓ {} (batch {}, file missing)", status.name, batch)
            }
        }
    }

    let pending = statuses
        .iter()
        .filter(|s| s.state == MigrationState::Pending)
        .count();
    println!("\n{} change-set(s), {} pending", statuses.len(), pending);
    Ok(())
}

pub fn create(context: &AppContext, name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("migration name is required");
    }

    let path = context.runner.manager().create_migration(name)?;
    println!("Created migration: {}", path.display());
    Ok(())
}

fn print_run_summary(result: &MigrationRunResult) {
    match result.batch {
        Some(batch) => println!(
            "✅ Applied {} change-set(s) as batch {} in {}ms",
            result.applied_count(),
            batch,
            result.execution_time_ms
        ),
        None => println!("✅ Up to date ({} already applied)", result.skipped_count),
    }
}

fn print_rollback_summary(result: &RollbackResult) {
    println!(
        "✅ Rolled back {} change-set(s) in {}ms",
        result.rolled_back_count(),
        result.execution_time_ms
    );
}
