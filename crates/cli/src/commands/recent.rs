use serde::Serialize;

use crate::commands::{load_config, runtime, CommandResult};
use vlog_db::{connect_with_config, migrations, ActivityStore, SqlActivityStore, StoredActivity};

#[derive(Debug, Serialize)]
struct RecentReport {
    command: &'static str,
    status: &'static str,
    rows: Vec<StoredActivity>,
}

pub fn run(limit: u32, json_output: bool) -> CommandResult {
    let config = match load_config("recent") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("recent") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let rows: Result<_, (&'static str, String, u8)> =
            match migrations::run_pending(&pool).await {
                Ok(()) => SqlActivityStore::new(pool.clone())
                    .recent(limit)
                    .await
                    .map_err(|error| ("persistence", error.to_string(), 6u8)),
                Err(error) => Err(("migration", error.to_string(), 5u8)),
            };
        pool.close().await;
        rows
    });

    let rows = match result {
        Ok(rows) => rows,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("recent", error_class, message, exit_code);
        }
    };

    if json_output {
        return CommandResult::json("recent", &RecentReport { command: "recent", status: "ok", rows });
    }
    if rows.is_empty() {
        return CommandResult::text("no activities logged yet");
    }
    CommandResult::text(
        rows.iter()
            .map(|stored| format!("#{} {}", stored.position, stored.row.values().join(" | ")))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
