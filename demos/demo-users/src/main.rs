use datapipe::prelude::*;
use datapipe::DataSourceConfig;
use datapipe_sqlx::{JsonRow, SqlxDataSource};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Sqlite;

mod models;

use models::User;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,datapipe_sqlx=debug".into()),
        )
        .init();

    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/application.yaml");
    let config = DataSourceConfig::from_yaml_file(config_path)?.with_env_overrides()?;
    tracing::info!(?config, "datapipe config loaded");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nickname TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            sex INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(&pool)
    .await?;

    let users = SqlxDataSource::<User, i64, Sqlite>::for_entity(pool.clone()).with_config(config.clone());
    let mut last_key = 0;
    for n in 1..=12 {
        let user = User {
            nickname: format!("user{n}"),
            email: format!("user{n}@example.com"),
            sex: if n % 2 == 0 { 2 } else { 1 },
            ..Default::default()
        };
        last_key = users.store(&user).await?.key();
    }
    let last = users.get_item(&last_key).await?;
    tracing::info!(user = ?last, "stored 12 users");

    let page = users.get_list(&Params::new().with_page(2, 5)).await?;
    tracing::info!("page 2:\n{}", serde_json::to_string_pretty(&page)?);

    let params = Params::new()
        .with_page(1, 0)
        .with_scope(|q: QueryBuilder| q.where_eq("sex", 2).order_by("id", false));
    let women = users.get_list(&params).await?;
    tracing::info!(total = women.meta().total, shown = women.len(), "filtered by scope");

    let patch = User {
        nickname: "renamed".into(),
        ..Default::default()
    };
    users.update(&1, &patch).await?;
    let updated = users.get_item(&1).await?;
    tracing::info!(user = ?updated, "updated");

    if let Err(err) = users.update(&404, &patch).await {
        tracing::info!(%err, "strict update rejected a missing key");
    }

    users.delete(&1).await?;
    match users.get_item(&1).await {
        Err(err) if err.is_not_found() => tracing::info!("user 1 deleted"),
        other => tracing::warn!(?other, "user 1 still present"),
    }

    let rows = SqlxDataSource::<JsonRow, i64, Sqlite>::for_table(pool, "users").with_config(config);
    let projected = rows
        .get_list(
            &Params::new()
                .with_page(1, 3)
                .with_scope(|q: QueryBuilder| q.select(&["id", "nickname"]).order_by("id", true)),
        )
        .await?;
    tracing::info!("untyped rows:\n{}", serde_json::to_string_pretty(&projected)?);

    Ok(())
}
