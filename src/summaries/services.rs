use rust_decimal::Decimal;
use sqlx::PgPool;
use time::{Date, Duration, Month};
use tracing::debug;
use uuid::Uuid;

use super::{
    dto::{DashboardSnapshot, DayTotal, WeekTotal},
    pagination::{PageRequest, Paged},
    repo,
    repo_types::{Bucket, DailyRow, MonthlyRow, TotalsRow, WeeklyRow},
};
use crate::error::AppError;

pub const MONTHLY_DEFAULT_LIMIT: i64 = 12;
pub const WEEKLY_DEFAULT_LIMIT: i64 = 10;
pub const DAILY_DEFAULT_LIMIT: i64 = 10;

const SERIES_WEEKS: i64 = 4;
const SERIES_DAYS: i64 = 7;

/// Every date boundary one dashboard needs, derived from "today".
/// Ranges are half-open: `[start, next_start)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardPeriods {
    pub today: Date,
    pub week_start: Date,
    pub next_week_start: Date,
    pub month_start: Date,
    pub next_month_start: Date,
    /// Monday of the oldest week in the trailing series.
    pub series_start: Date,
}

fn first_of_next_month(month_start: Date) -> Option<Date> {
    let (year, month) = match month_start.month() {
        Month::December => (month_start.year() + 1, Month::January),
        m => (month_start.year(), m.next()),
    };
    Date::from_calendar_date(year, month, 1).ok()
}

impl DashboardPeriods {
    pub fn for_today(today: Date) -> Result<Self, AppError> {
        let week_start =
            today - Duration::days(i64::from(today.weekday().number_days_from_monday()));
        let month_start = today
            .replace_day(1)
            .map_err(|e| anyhow::anyhow!("month start for {today}: {e}"))?;
        let next_month_start = first_of_next_month(month_start)
            .ok_or_else(|| anyhow::anyhow!("month after {month_start} out of range"))?;
        Ok(Self {
            today,
            week_start,
            next_week_start: week_start + Duration::weeks(1),
            month_start,
            next_month_start,
            series_start: week_start - Duration::weeks(SERIES_WEEKS - 1),
        })
    }
}

fn sum_between(days: &[DailyRow], from: Date, to: Date) -> Decimal {
    days.iter()
        .filter(|d| d.date >= from && d.date <= to)
        .map(|d| d.total)
        .sum()
}

/// Folds per-day sums into the trailing four calendar weeks, oldest first.
/// Weeks with no expenses carry a zero total.
pub fn weekly_series(p: &DashboardPeriods, days: &[DailyRow]) -> Vec<WeekTotal> {
    (0..SERIES_WEEKS)
        .map(|i| {
            let start_date = p.series_start + Duration::weeks(i);
            let end_date = start_date + Duration::days(6);
            WeekTotal {
                start_date,
                end_date,
                total: sum_between(days, start_date, end_date),
            }
        })
        .collect()
}

/// The seven days ending today, oldest first, zero-filled.
pub fn daily_series(p: &DashboardPeriods, days: &[DailyRow]) -> Vec<DayTotal> {
    (0..SERIES_DAYS)
        .rev()
        .map(|back| {
            let date = p.today - Duration::days(back);
            DayTotal {
                date,
                total: sum_between(days, date, date),
            }
        })
        .collect()
}

fn buckets(t: &TotalsRow) -> [Bucket; 4] {
    [
        Bucket { count: t.all_count, total: t.all_total },
        Bucket { count: t.month_count, total: t.month_total },
        Bucket { count: t.week_count, total: t.week_total },
        Bucket { count: t.today_count, total: t.today_total },
    ]
}

/// Every figure of the snapshot is read from the same repeatable-read view.
pub async fn dashboard(
    db: &PgPool,
    user_id: Uuid,
    today: Date,
) -> Result<DashboardSnapshot, AppError> {
    let periods = DashboardPeriods::for_today(today)?;

    let mut tx = db.begin().await?;
    repo::snapshot(&mut *tx).await?;
    let totals = repo::totals(&mut *tx, user_id, &periods).await?;
    let monthly_totals = repo::all_months(&mut *tx, user_id).await?;
    // The seven-day series always falls inside the four-week window.
    let days =
        repo::days_between(&mut *tx, user_id, periods.series_start, periods.next_week_start).await?;
    let recent_expenses = repo::recent(&mut *tx, user_id).await?;
    tx.commit().await?;

    debug!(%user_id, %today, months = monthly_totals.len(), "dashboard computed");
    let [all_time, this_month, this_week, today_bucket] = buckets(&totals);
    Ok(DashboardSnapshot {
        all_time,
        this_month,
        this_week,
        today: today_bucket,
        monthly_totals,
        last_four_weeks: weekly_series(&periods, &days),
        last_seven_days: daily_series(&periods, &days),
        recent_expenses,
    })
}

/// Parses a required `YYYY-MM` into the half-open range of that month.
pub fn parse_month(raw: Option<&str>) -> Result<(Date, Date), AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("month parameter is required (YYYY-MM)"))?;
    let invalid = || AppError::validation("Invalid month format. Use YYYY-MM");

    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    let start = Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;
    let end = first_of_next_month(start).ok_or_else(invalid)?;
    Ok((start, end))
}

pub async fn monthly(
    db: &PgPool,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Paged<MonthlyRow>, AppError> {
    let (rows, total) = repo::monthly_page(db, user_id, page.limit, page.offset()).await?;
    Ok(Paged::new(rows, page, total))
}

pub async fn weekly(
    db: &PgPool,
    user_id: Uuid,
    month: Option<&str>,
    page: PageRequest,
) -> Result<Paged<WeeklyRow>, AppError> {
    let (from, until) = parse_month(month)?;
    let (rows, total) =
        repo::weekly_page(db, user_id, from, until, page.limit, page.offset()).await?;
    Ok(Paged::new(rows, page, total))
}

pub async fn daily(
    db: &PgPool,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Paged<DailyRow>, AppError> {
    let (rows, total) = repo::daily_page(db, user_id, page.limit, page.offset()).await?;
    Ok(Paged::new(rows, page, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn day(date: Date, total: i64) -> DailyRow {
        DailyRow {
            date,
            count: 1,
            total: Decimal::from(total),
        }
    }

    #[test]
    fn periods_start_on_monday() {
        // 2024-06-13 is a Thursday.
        let p = DashboardPeriods::for_today(date!(2024 - 06 - 13)).unwrap();
        assert_eq!(p.week_start, date!(2024 - 06 - 10));
        assert_eq!(p.next_week_start, date!(2024 - 06 - 17));
        assert_eq!(p.month_start, date!(2024 - 06 - 01));
        assert_eq!(p.next_month_start, date!(2024 - 07 - 01));
        assert_eq!(p.series_start, date!(2024 - 05 - 20));
    }

    #[test]
    fn monday_is_its_own_week_start_and_december_rolls_over() {
        let p = DashboardPeriods::for_today(date!(2024 - 12 - 30)).unwrap();
        assert_eq!(p.week_start, date!(2024 - 12 - 30));
        assert_eq!(p.next_month_start, date!(2025 - 01 - 01));
    }

    #[test]
    fn series_are_chronological_and_zero_filled() {
        let p = DashboardPeriods::for_today(date!(2024 - 06 - 13)).unwrap();
        let days = [
            day(date!(2024 - 05 - 20), 3),
            day(date!(2024 - 05 - 26), 4),
            day(date!(2024 - 06 - 10), 5),
            day(date!(2024 - 06 - 13), 7),
        ];

        let weeks = weekly_series(&p, &days);
        let totals: Vec<_> = weeks.iter().map(|w| w.total).collect();
        assert_eq!(
            totals,
            [7, 0, 0, 12].map(Decimal::from).to_vec()
        );
        assert_eq!(weeks[3].start_date, date!(2024 - 06 - 10));
        assert_eq!(weeks[3].end_date, date!(2024 - 06 - 16));

        let last7 = daily_series(&p, &days);
        assert_eq!(last7.len(), 7);
        assert_eq!(last7[0].date, date!(2024 - 06 - 07));
        assert_eq!(last7[6].date, date!(2024 - 06 - 13));
        assert_eq!(last7[6].total, Decimal::from(7));
        assert_eq!(last7[3].total, Decimal::from(5));
        assert_eq!(last7[1].total, Decimal::ZERO);
    }

    #[test]
    fn month_parameter() {
        assert_eq!(
            parse_month(Some("2024-02")).unwrap(),
            (date!(2024 - 02 - 01), date!(2024 - 03 - 01))
        );
        assert_eq!(
            parse_month(Some("2023-12")).unwrap(),
            (date!(2023 - 12 - 01), date!(2024 - 01 - 01))
        );
        for bad in [None, Some(""), Some("2024-13"), Some("2024-1"), Some("24-01"), Some("June")] {
            assert!(matches!(parse_month(bad), Err(AppError::Validation(_))), "{bad:?}");
        }
    }

    async fn seed_user(pool: &PgPool) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash) VALUES ('T', 't@x.com', 'x') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_expense(pool: &PgPool, user_id: Uuid, date: Date, amount: Decimal) {
        sqlx::query(
            "INSERT INTO expenses (user_id, title, amount, expense_date, expense_time) \
             VALUES ($1, 'e', $2, $3, '09:30')",
        )
        .bind(user_id)
        .bind(amount)
        .bind(date)
        .execute(pool)
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn empty_dashboard_is_all_zeros(pool: PgPool) {
        let user = seed_user(&pool).await;
        let snap = dashboard(&pool, user, date!(2024 - 06 - 13)).await.unwrap();
        let zero = Bucket { count: 0, total: Decimal::ZERO };
        assert_eq!(
            [snap.all_time, snap.this_month, snap.this_week, snap.today],
            [zero; 4]
        );
        assert!(snap.monthly_totals.is_empty());
        assert_eq!(snap.last_four_weeks.len(), 4);
        assert_eq!(snap.last_seven_days.len(), 7);
        assert!(snap.last_seven_days.iter().all(|d| d.total.is_zero()));
        assert!(snap.recent_expenses.is_empty());

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["today"]["total"], 0.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn dashboard_buckets_by_period(pool: PgPool) {
        let user = seed_user(&pool).await;
        seed_expense(&pool, user, date!(2024 - 06 - 13), Decimal::new(450, 2)).await;
        seed_expense(&pool, user, date!(2024 - 06 - 11), Decimal::from(10)).await;
        seed_expense(&pool, user, date!(2024 - 06 - 02), Decimal::from(20)).await;
        seed_expense(&pool, user, date!(2024 - 04 - 30), Decimal::from(100)).await;

        let snap = dashboard(&pool, user, date!(2024 - 06 - 13)).await.unwrap();
        assert_eq!(snap.all_time.count, 4);
        assert_eq!(snap.all_time.total, Decimal::new(13450, 2));
        assert_eq!(snap.this_month.count, 3);
        assert_eq!(snap.this_week.total, Decimal::new(1450, 2));
        assert_eq!(snap.today.count, 1);
        let months: Vec<_> = snap.monthly_totals.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2024-06", "2024-04"]);
        assert_eq!(snap.monthly_totals[0].label, "Jun 2024");
        assert_eq!(snap.recent_expenses.len(), 4);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn second_monthly_page_holds_the_older_month(pool: PgPool) {
        let user = seed_user(&pool).await;
        seed_expense(&pool, user, date!(2024 - 05 - 03), Decimal::ONE).await;
        seed_expense(&pool, user, date!(2024 - 06 - 03), Decimal::ONE).await;
        seed_expense(&pool, user, date!(2024 - 06 - 04), Decimal::ONE).await;

        let page = monthly(&pool, user, PageRequest { page: 2, limit: 1 }).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].month, "2024-05");

        let beyond = monthly(&pool, user, PageRequest { page: 9, limit: 1 }).await.unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn weekly_and_daily_buckets(pool: PgPool) {
        let user = seed_user(&pool).await;
        seed_expense(&pool, user, date!(2024 - 06 - 03), Decimal::ONE).await;
        seed_expense(&pool, user, date!(2024 - 06 - 05), Decimal::from(2)).await;
        seed_expense(&pool, user, date!(2024 - 06 - 05), Decimal::ONE).await;
        seed_expense(&pool, user, date!(2024 - 06 - 12), Decimal::TEN).await;
        seed_expense(&pool, user, date!(2024 - 07 - 01), Decimal::TEN).await;

        let req = PageRequest { page: 1, limit: 10 };
        let weeks = weekly(&pool, user, Some("2024-06"), req).await.unwrap();
        assert_eq!(weeks.total, 2);
        assert_eq!(weeks.data[0].week, 24);
        assert_eq!(weeks.data[1].week, 23);
        assert_eq!(weeks.data[1].start_date, date!(2024 - 06 - 03));
        assert_eq!(weeks.data[1].end_date, date!(2024 - 06 - 05));
        assert_eq!(weeks.data[1].count, 3);

        let days = daily(&pool, user, req).await.unwrap();
        assert_eq!(days.total, 4);
        assert_eq!(days.data[0].date, date!(2024 - 07 - 01));
        let june5 = days.data.iter().find(|d| d.date == date!(2024 - 06 - 05)).unwrap();
        assert_eq!((june5.count, june5.total), (2, Decimal::from(3)));
    }
}
