//! Query-string filtering and pagination shared by every list endpoint.
//!
//! Each resource exposes a filter object implementing [`QueryFilters`]. The
//! object maps a parameter name onto a predicate; [`apply_filters`] walks the
//! incoming parameters and lets the object narrow the query one parameter at a
//! time. Names the object does not recognise fall through untouched.

use crate::errors::ServiceError;
use crate::tracing::with_metrics;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use utoipa::ToSchema;

pub type QueryParams = HashMap<String, String>;

pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";

/// Named filters for one entity.
pub trait QueryFilters<E: EntityTrait> {
    /// Narrow `query` by the filter called `name`. Unknown names must return
    /// the query unchanged.
    fn apply(&self, name: &str, value: &str, query: Select<E>) -> Result<Select<E>, ServiceError>;
}

/// Apply every non-empty, non-pagination parameter to `query`.
pub fn apply_filters<E, F>(
    filters: &F,
    params: &QueryParams,
    mut query: Select<E>,
) -> Result<Select<E>, ServiceError>
where
    E: EntityTrait,
    F: QueryFilters<E>,
{
    let mut names: Vec<&String> = params.keys().collect();
    names.sort();

    for name in names {
        if name == PAGE_PARAM || name == PER_PAGE_PARAM {
            continue;
        }
        let value = params[name].trim();
        if value.is_empty() {
            continue;
        }
        query = filters.apply(name, value, query)?;
    }

    Ok(query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    /// Reads `page` and `per_page`, falling back to defaults and clamping the
    /// page size to `max_per_page`.
    pub fn from_params(
        params: &QueryParams,
        default_per_page: u64,
        max_per_page: u64,
    ) -> Result<Self, ServiceError> {
        let page = match non_empty(params, PAGE_PARAM) {
            Some(raw) => parse_u64(PAGE_PARAM, raw)?,
            None => 1,
        };
        let per_page = match non_empty(params, PER_PAGE_PARAM) {
            Some(raw) => parse_u64(PER_PAGE_PARAM, raw)?,
            None => default_per_page,
        };

        Ok(Self {
            page: page.max(1),
            per_page: per_page.clamp(1, max_per_page.max(1)),
        })
    }
}

/// One page of results plus totals
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + pagination.per_page - 1) / pagination.per_page
        };
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Count and fetch one page of `query`.
pub async fn fetch_page<E>(
    db: &DatabaseConnection,
    query: Select<E>,
    pagination: Pagination,
) -> Result<Page<E::Model>, ServiceError>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
{
    let paginator = query.paginate(db, pagination.per_page);
    let (total, items) = with_metrics("fetch_page", || async {
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(pagination.page - 1).await?;
        Ok::<_, DbErr>((total, items))
    })
    .await?;
    Ok(Page::new(items, total, pagination))
}

fn non_empty<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn invalid(name: &str, value: &str, expected: &str) -> ServiceError {
    ServiceError::ValidationError(format!(
        "Invalid value '{}' for filter '{}': expected {}",
        value, name, expected
    ))
}

pub fn parse_uuid(name: &str, value: &str) -> Result<uuid::Uuid, ServiceError> {
    uuid::Uuid::parse_str(value).map_err(|_| invalid(name, value, "a UUID"))
}

pub fn parse_date(name: &str, value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid(name, value, "YYYY-MM-DD"))
}

pub fn parse_decimal(name: &str, value: &str) -> Result<Decimal, ServiceError> {
    Decimal::from_str(value).map_err(|_| invalid(name, value, "a decimal number"))
}

pub fn parse_u64(name: &str, value: &str) -> Result<u64, ServiceError> {
    value
        .parse::<u64>()
        .map_err(|_| invalid(name, value, "a non-negative integer"))
}

pub fn parse_i32(name: &str, value: &str) -> Result<i32, ServiceError> {
    value
        .parse::<i32>()
        .map_err(|_| invalid(name, value, "an integer"))
}

pub fn parse_bool(name: &str, value: &str) -> Result<bool, ServiceError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(name, value, "true or false")),
    }
}

/// Parse a status-like enum from its snake_case name.
pub fn parse_enum<T: FromStr>(name: &str, value: &str) -> Result<T, ServiceError> {
    T::from_str(&value.to_ascii_lowercase()).map_err(|_| invalid(name, value, "a known status"))
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Midnight UTC after `date`; use with `lt` for inclusive day ranges.
pub fn end_of_day_exclusive(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date.checked_add_days(Days::new(1)).unwrap_or(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::expense;
    use assert_matches::assert_matches;
    use sea_orm::{ColumnTrait, DbBackend, EntityTrait, QueryFilter, QueryTrait};

    struct ExpenseTestFilters;

    impl QueryFilters<expense::Entity> for ExpenseTestFilters {
        fn apply(
            &self,
            name: &str,
            value: &str,
            query: Select<expense::Entity>,
        ) -> Result<Select<expense::Entity>, ServiceError> {
            Ok(match name {
                "category" => query.filter(expense::Column::Category.eq(value)),
                "min_amount" => {
                    query.filter(expense::Column::Amount.gte(parse_decimal(name, value)?))
                }
                _ => query,
            })
        }
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sql(query: Select<expense::Entity>) -> String {
        query.build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn unknown_and_empty_params_are_ignored() {
        let base = sql(expense::Entity::find());
        let filtered = apply_filters(
            &ExpenseTestFilters,
            &params(&[("colour", "blue"), ("category", "  "), ("page", "2")]),
            expense::Entity::find(),
        )
        .unwrap();
        assert_eq!(sql(filtered), base);
    }

    #[test]
    fn recognised_params_narrow_the_query() {
        let filtered = apply_filters(
            &ExpenseTestFilters,
            &params(&[("category", "travel"), ("min_amount", "10.50")]),
            expense::Entity::find(),
        )
        .unwrap();
        let sql = sql(filtered);
        assert!(sql.contains("\"category\" = 'travel'"), "{sql}");
        assert!(sql.contains("\"amount\" >="), "{sql}");
    }

    #[test]
    fn malformed_values_are_rejected() {
        let result = apply_filters(
            &ExpenseTestFilters,
            &params(&[("min_amount", "lots")]),
            expense::Entity::find(),
        );
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination::from_params(&QueryParams::new(), 20, 100).unwrap();
        assert_eq!(p, Pagination { page: 1, per_page: 20 });

        let p = Pagination::from_params(&params(&[("page", "0"), ("per_page", "500")]), 20, 100)
            .unwrap();
        assert_eq!(p, Pagination { page: 1, per_page: 100 });

        assert!(Pagination::from_params(&params(&[("page", "-1")]), 20, 100).is_err());
    }

    #[test]
    fn page_counts_total_pages() {
        let pagination = Pagination { page: 1, per_page: 10 };
        assert_eq!(Page::new(Vec::<u8>::new(), 0, pagination).total_pages, 0);
        assert_eq!(Page::new(Vec::<u8>::new(), 10, pagination).total_pages, 1);
        assert_eq!(Page::new(Vec::<u8>::new(), 11, pagination).total_pages, 2);
    }

    #[test]
    fn scalar_parsers() {
        assert!(parse_bool("is_active", "YES").unwrap());
        assert!(!parse_bool("is_active", "0").unwrap());
        assert!(parse_bool("is_active", "maybe").is_err());
        assert!(parse_date("date_from", "2024-02-30").is_err());
        assert!(parse_uuid("employee_id", "not-a-uuid").is_err());
        assert_eq!(
            end_of_day_exclusive(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            start_of_day(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
    }
}
