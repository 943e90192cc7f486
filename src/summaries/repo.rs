use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use time::Date;
use uuid::Uuid;

use super::{
    repo_types::{DailyRow, MonthlyRow, RecentExpense, TotalsRow, WeeklyRow},
    services::DashboardPeriods,
};

pub const RECENT_LIMIT: i64 = 5;

/// Switches the current transaction to a read-only snapshot. Must be the
/// first statement after `BEGIN`.
pub async fn snapshot(conn: &mut PgConnection) -> anyhow::Result<()> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(conn)
        .await
        .context("start snapshot")?;
    Ok(())
}

pub async fn totals(
    conn: &mut PgConnection,
    user_id: Uuid,
    p: &DashboardPeriods,
) -> anyhow::Result<TotalsRow> {
    let row = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT
            COUNT(*) AS all_count,
            COALESCE(SUM(amount), 0) AS all_total,
            COUNT(*) FILTER (WHERE expense_date >= $2 AND expense_date < $3) AS month_count,
            COALESCE(SUM(amount) FILTER (WHERE expense_date >= $2 AND expense_date < $3), 0)
                AS month_total,
            COUNT(*) FILTER (WHERE expense_date >= $4 AND expense_date < $5) AS week_count,
            COALESCE(SUM(amount) FILTER (WHERE expense_date >= $4 AND expense_date < $5), 0)
                AS week_total,
            COUNT(*) FILTER (WHERE expense_date = $6) AS today_count,
            COALESCE(SUM(amount) FILTER (WHERE expense_date = $6), 0) AS today_total
        FROM expenses
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(p.month_start)
    .bind(p.next_month_start)
    .bind(p.week_start)
    .bind(p.next_week_start)
    .bind(p.today)
    .fetch_one(conn)
    .await
    .context("dashboard totals")?;
    Ok(row)
}

const MONTHLY_BUCKETS: &str = r#"
    SELECT to_char(expense_date, 'YYYY-MM') AS month,
           to_char(expense_date, 'Mon YYYY') AS label,
           COUNT(*) AS count,
           SUM(amount) AS total
      FROM expenses
     WHERE user_id = $1
     GROUP BY 1, 2
     ORDER BY 1 DESC
"#;

pub async fn all_months(conn: &mut PgConnection, user_id: Uuid) -> anyhow::Result<Vec<MonthlyRow>> {
    let rows = sqlx::query_as::<_, MonthlyRow>(MONTHLY_BUCKETS)
        .bind(user_id)
        .fetch_all(conn)
        .await
        .context("monthly totals")?;
    Ok(rows)
}

/// Per-day sums in `[from, until)`.
pub async fn days_between(
    conn: &mut PgConnection,
    user_id: Uuid,
    from: Date,
    until: Date,
) -> anyhow::Result<Vec<DailyRow>> {
    let rows = sqlx::query_as::<_, DailyRow>(
        r#"
        SELECT expense_date AS date, COUNT(*) AS count, SUM(amount) AS total
          FROM expenses
         WHERE user_id = $1 AND expense_date >= $2 AND expense_date < $3
         GROUP BY expense_date
         ORDER BY expense_date
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(until)
    .fetch_all(conn)
    .await
    .context("daily sums")?;
    Ok(rows)
}

pub async fn recent(conn: &mut PgConnection, user_id: Uuid) -> anyhow::Result<Vec<RecentExpense>> {
    let rows = sqlx::query_as::<_, RecentExpense>(
        r#"
        SELECT title, amount, expense_date, expense_time
          FROM expenses
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(RECENT_LIMIT)
    .fetch_all(conn)
    .await
    .context("recent expenses")?;
    Ok(rows)
}

pub async fn monthly_page(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<MonthlyRow>, i64)> {
    let rows = sqlx::query_as::<_, MonthlyRow>(&format!("{MONTHLY_BUCKETS} LIMIT $2 OFFSET $3"))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("monthly page")?;
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT to_char(expense_date, 'YYYY-MM')) FROM expenses WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("count months")?;
    Ok((rows, total))
}

/// ISO weeks with activity in `[from, until)`.
pub async fn weekly_page(
    db: &PgPool,
    user_id: Uuid,
    from: Date,
    until: Date,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<WeeklyRow>, i64)> {
    let rows = sqlx::query_as::<_, WeeklyRow>(
        r#"
        SELECT EXTRACT(isoyear FROM expense_date)::int4 AS iso_year,
               EXTRACT(week FROM expense_date)::int4 AS week,
               MIN(expense_date) AS start_date,
               MAX(expense_date) AS end_date,
               COUNT(*) AS count,
               SUM(amount) AS total
          FROM expenses
         WHERE user_id = $1 AND expense_date >= $2 AND expense_date < $3
         GROUP BY 1, 2
         ORDER BY 1 DESC, 2 DESC
         LIMIT $4 OFFSET $5
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(until)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("weekly page")?;
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT 1
              FROM expenses
             WHERE user_id = $1 AND expense_date >= $2 AND expense_date < $3
             GROUP BY EXTRACT(isoyear FROM expense_date), EXTRACT(week FROM expense_date)
        ) weeks
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(until)
    .fetch_one(db)
    .await
    .context("count weeks")?;
    Ok((rows, total))
}

pub async fn daily_page(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<DailyRow>, i64)> {
    let rows = sqlx::query_as::<_, DailyRow>(
        r#"
        SELECT expense_date AS date, COUNT(*) AS count, SUM(amount) AS total
          FROM expenses
         WHERE user_id = $1
         GROUP BY expense_date
         ORDER BY expense_date DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("daily page")?;
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT expense_date) FROM expenses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await
            .context("count days")?;
    Ok((rows, total))
}
