//! Optional, independently combinable filters for listing expenses and their
//! translation into a parameterized query.
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use time::Date;
use uuid::Uuid;

use super::{dto::ExpenseFilterQuery, format::parse_date};
use crate::error::AppError;

const SELECT_EXPENSES: &str = "SELECT e.id, e.user_id, e.title, e.description, e.amount, \
     e.expense_date, e.expense_time, e.created_at, e.updated_at \
     FROM expenses e WHERE e.user_id = ";

/// Every field is optional; present fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_amount(raw: &str, field: &str) -> Result<Decimal, AppError> {
    match Decimal::from_str(raw) {
        Ok(v) if !v.is_sign_negative() => Ok(v),
        _ => Err(AppError::validation(format!("invalid {field} value"))),
    }
}

impl ExpenseFilter {
    /// Parses query-string filters and checks the ranges.
    pub fn from_query(q: &ExpenseFilterQuery) -> Result<Self, AppError> {
        let category_id = present(&q.category_id)
            .map(|s| {
                Uuid::parse_str(s).map_err(|_| AppError::validation("invalid category ID format"))
            })
            .transpose()?;
        let filter = Self {
            category_id,
            start_date: present(&q.start_date).map(parse_date).transpose()?,
            end_date: present(&q.end_date).map(parse_date).transpose()?,
            min_amount: present(&q.min_amount)
                .map(|s| parse_amount(s, "min_amount"))
                .transpose()?,
            max_amount: present(&q.max_amount)
                .map(|s| parse_amount(s, "max_amount"))
                .transpose()?,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::validation("start_date cannot be after end_date"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(AppError::validation(
                    "min_amount cannot be greater than max_amount",
                ));
            }
        }
        Ok(())
    }

    /// Appends one `AND` predicate per present filter, binding values in order.
    ///
    /// The category filter is an `EXISTS` probe rather than a join, so an
    /// expense linked to the category appears once no matter how many rows
    /// the link table holds for it.
    pub fn push_predicates(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(category_id) = self.category_id {
            qb.push(
                " AND EXISTS (SELECT 1 FROM expense_categories ec \
                 WHERE ec.expense_id = e.id AND ec.category_id = ",
            );
            qb.push_bind(category_id);
            qb.push(")");
        }
        if let Some(start) = self.start_date {
            qb.push(" AND e.expense_date >= ").push_bind(start);
        }
        if let Some(end) = self.end_date {
            qb.push(" AND e.expense_date <= ").push_bind(end);
        }
        if let Some(min) = self.min_amount {
            qb.push(" AND e.amount >= ").push_bind(min);
        }
        if let Some(max) = self.max_amount {
            qb.push(" AND e.amount <= ").push_bind(max);
        }
    }

    /// The full listing query for `user_id`, newest first.
    pub fn list_query(&self, user_id: Uuid) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(SELECT_EXPENSES);
        qb.push_bind(user_id);
        self.push_predicates(&mut qb);
        qb.push(" ORDER BY e.created_at DESC, e.id DESC");
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;
    use time::macros::date;

    fn query(pairs: &[(&str, &str)]) -> ExpenseFilterQuery {
        let mut q = ExpenseFilterQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "category_id" => q.category_id = v,
                "start_date" => q.start_date = v,
                "end_date" => q.end_date = v,
                "min_amount" => q.min_amount = v,
                "max_amount" => q.max_amount = v,
                _ => unreachable!(),
            }
        }
        q
    }

    #[test]
    fn empty_query_means_no_filters() {
        let f = ExpenseFilter::from_query(&query(&[("start_date", "  ")])).unwrap();
        assert_eq!(f, ExpenseFilter::default());
    }

    #[test]
    fn parses_every_filter() {
        let cat = Uuid::new_v4();
        let cat_s = cat.to_string();
        let f = ExpenseFilter::from_query(&query(&[
            ("category_id", cat_s.as_str()),
            ("start_date", "01-05-2024"),
            ("end_date", "31-05-2024"),
            ("min_amount", "2.50"),
            ("max_amount", "100"),
        ]))
        .unwrap();
        assert_eq!(f.category_id, Some(cat));
        assert_eq!(f.start_date, Some(date!(2024 - 05 - 01)));
        assert_eq!(f.end_date, Some(date!(2024 - 05 - 31)));
        assert_eq!(f.min_amount, Decimal::from_f64(2.5));
        assert_eq!(f.max_amount, Some(Decimal::from(100)));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let err = ExpenseFilter::from_query(&query(&[
            ("start_date", "02-05-2024"),
            ("end_date", "01-05-2024"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("start_date")));

        let err = ExpenseFilter::from_query(&query(&[
            ("min_amount", "10"),
            ("max_amount", "9.99"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("min_amount")));
    }

    #[test]
    fn equal_bounds_are_allowed() {
        let f = ExpenseFilter::from_query(&query(&[
            ("start_date", "01-05-2024"),
            ("end_date", "01-05-2024"),
            ("min_amount", "5"),
            ("max_amount", "5.00"),
        ]));
        assert!(f.is_ok());
    }

    #[test]
    fn malformed_values_are_rejected() {
        for pair in [
            ("category_id", "not-a-uuid"),
            ("start_date", "2024-05-01"),
            ("min_amount", "abc"),
            ("max_amount", "-1"),
        ] {
            assert!(
                matches!(ExpenseFilter::from_query(&query(&[pair])), Err(AppError::Validation(_))),
                "{pair:?}"
            );
        }
    }

    #[test]
    fn unfiltered_query_only_scopes_by_user() {
        let qb = ExpenseFilter::default().list_query(Uuid::new_v4());
        let sql = qb.sql();
        assert!(sql.ends_with("WHERE e.user_id = $1 ORDER BY e.created_at DESC, e.id DESC"));
        assert!(!sql.contains("expense_categories"));
        assert!(!sql.contains("$2"));
    }

    #[test]
    fn placeholders_follow_predicate_order() {
        let f = ExpenseFilter {
            category_id: Some(Uuid::new_v4()),
            start_date: Some(date!(2024 - 01 - 01)),
            end_date: Some(date!(2024 - 12 - 31)),
            min_amount: Some(Decimal::ONE),
            max_amount: Some(Decimal::ONE_HUNDRED),
        };
        let qb = f.list_query(Uuid::new_v4());
        let sql = qb.sql();
        let positions: Vec<usize> = [
            "ec.category_id = $2",
            "e.expense_date >= $3",
            "e.expense_date <= $4",
            "e.amount >= $5",
            "e.amount <= $6",
        ]
        .iter()
        .map(|needle| sql.find(needle).unwrap_or_else(|| panic!("{needle} missing in {sql}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn sparse_filters_bind_consecutively() {
        let f = ExpenseFilter {
            max_amount: Some(Decimal::TEN),
            start_date: Some(date!(2024 - 01 - 01)),
            ..Default::default()
        };
        let qb = f.list_query(Uuid::new_v4());
        let sql = qb.sql();
        assert!(sql.contains("e.expense_date >= $2"));
        assert!(sql.contains("e.amount <= $3"));
        assert!(!sql.contains("$4"));
    }
}
