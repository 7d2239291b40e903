use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

/// Connects to MySQL and applies the embedded migrations.
pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
