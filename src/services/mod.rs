// Personnel
pub mod departments;
pub mod employees;
pub mod positions;

// Payroll and attendance
pub mod attendance;
pub mod payroll;

// Products, deliveries and money movement
pub mod balance_sheets;
pub mod collections;
pub mod deliveries;
pub mod expenses;
pub mod products;

// Warehousing
pub mod warehouses;

use crate::errors::ServiceError;
use crate::tracing::with_metrics;
use sea_orm::{
    sea_query::{Expr, SimpleExpr},
    ColumnTrait, ConnectionTrait, EntityTrait, PrimaryKeyTrait, QueryFilter,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Largest value a `DECIMAL(14, 2)` money column holds: 999 999 999 999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Loads a row by primary key or returns a `NotFound` naming the entity.
pub(crate) async fn find_or_404<E, C>(
    conn: &C,
    label: &str,
    id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: std::fmt::Display + Clone,
{
    with_metrics("find_by_id", || E::find_by_id(id.clone()).one(conn))
        .await?
        .ok_or_else(|| ServiceError::not_found(label, id))
}

/// Loads a row for modification inside a transaction, writing to it first.
///
/// The no-op `UPDATE .. SET id = id` is the transaction's first statement, so
/// SQLite queues on its busy timeout for the write lock rather than failing a
/// read-to-write upgrade. On PostgreSQL the row stays locked until commit.
pub(crate) async fn lock_for_update<E, C>(
    conn: &C,
    label: &str,
    id_column: E::Column,
    id: Uuid,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let locked = with_metrics("lock_for_update", || {
        E::update_many()
            .col_expr(id_column, SimpleExpr::from(Expr::col(id_column)))
            .filter(id_column.eq(id))
            .exec(conn)
    })
    .await?;
    if locked.rows_affected == 0 {
        return Err(ServiceError::not_found(label, id));
    }
    E::find()
        .filter(id_column.eq(id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found(label, id))
}

/// Trims and drops empty optional text
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn max_amount_fills_a_fourteen_two_column() {
        assert_eq!(MAX_AMOUNT, dec!(999_999_999_999.99));
        assert_eq!(MAX_AMOUNT.scale(), 2);
    }

    #[tokio::test]
    async fn lookups_report_missing_rows_as_not_found() {
        let db = crate::db::establish_connection_with_config(&crate::db::DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        let id = Uuid::new_v4();

        let found = find_or_404::<crate::entities::department::Entity, _>(&db, "Department", id).await;
        assert!(matches!(found, Err(ServiceError::NotFound(msg)) if msg.contains("Department")));

        let locked = lock_for_update::<crate::entities::department::Entity, _>(
            &db,
            "Department",
            crate::entities::department::Column::Id,
            id,
        )
        .await;
        assert!(matches!(locked, Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn optional_text_is_trimmed() {
        assert_eq!(normalize_optional(Some("  note ".into())), Some("note".into()));
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
