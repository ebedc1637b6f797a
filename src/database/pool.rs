use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

/// `SET` statement applied to every pooled connection; zero disables the limit.
fn statement_timeout_sql(timeout: Duration) -> String {
    format!("SET statement_timeout = {}", timeout.as_millis())
}

pub async fn create_pool(database_url: &str, statement_timeout: Duration) -> Result<PgPool> {
    let set_timeout = statement_timeout_sql(statement_timeout);
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .after_connect(move |conn, _meta| {
            let set_timeout = set_timeout.clone();
            Box::pin(async move {
                conn.execute(set_timeout.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_timeout_is_set_in_milliseconds() {
        assert_eq!(
            statement_timeout_sql(Duration::from_secs(30)),
            "SET statement_timeout = 30000"
        );
        assert_eq!(
            statement_timeout_sql(Duration::ZERO),
            "SET statement_timeout = 0"
        );
    }
}
