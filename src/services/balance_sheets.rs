use crate::{
    entities::{balance_sheet, employee},
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// What to do when an employee has no balance sheet yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Open a sheet whose balance is the delta
    Open,
    /// Leave the employee without a sheet
    Skip,
}

/// Adds `delta` to the employee's balance with a single statement, so
/// concurrent writers never lose each other's changes. `OnMissing::Open` is an
/// `INSERT .. ON CONFLICT (employee_id) DO UPDATE`, which also settles two
/// writers racing to open the same sheet. Call inside the transaction that
/// performs the triggering write.
pub async fn apply_delta<C>(
    conn: &C,
    employee_id: Uuid,
    delta: Decimal,
    on_missing: OnMissing,
) -> Result<Option<balance_sheet::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    match on_missing {
        OnMissing::Open => {
            balance_sheet::Entity::insert(balance_sheet::ActiveModel {
                id: Set(Uuid::new_v4()),
                employee_id: Set(employee_id),
                current_balance: Set(delta),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            })
            .on_conflict(
                OnConflict::column(balance_sheet::Column::EmployeeId)
                    .value(
                        balance_sheet::Column::CurrentBalance,
                        Expr::col((balance_sheet::Entity, balance_sheet::Column::CurrentBalance))
                            .add(delta),
                    )
                    .value(balance_sheet::Column::UpdatedAt, Expr::value(now))
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        }
        OnMissing::Skip => {
            let updated = balance_sheet::Entity::update_many()
                .col_expr(
                    balance_sheet::Column::CurrentBalance,
                    Expr::col(balance_sheet::Column::CurrentBalance).add(delta),
                )
                .col_expr(balance_sheet::Column::UpdatedAt, Expr::value(now))
                .filter(balance_sheet::Column::EmployeeId.eq(employee_id))
                .exec(conn)
                .await?;
            if updated.rows_affected == 0 {
                return Ok(None);
            }
        }
    }

    let sheet = balance_sheet::Entity::find()
        .filter(balance_sheet::Column::EmployeeId.eq(employee_id))
        .one(conn)
        .await?;
    Ok(sheet)
}

/// Publishes a `BalanceChanged` event for a sheet returned by [`apply_delta`].
pub(crate) fn publish_change(
    events: &EventSender,
    sheet: Option<&balance_sheet::Model>,
    delta: Decimal,
    reason: &str,
) {
    if let Some(sheet) = sheet {
        metrics::counter!("ems.balance.changes", 1, "reason" => reason.to_string());
        events.send_or_log(Event::BalanceChanged {
            employee_id: sheet.employee_id,
            delta,
            new_balance: sheet.current_balance,
            reason: reason.to_string(),
        });
    }
}

/// Balance view returned for an employee, whether or not a sheet exists yet
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EmployeeBalance {
    pub employee_id: Uuid,
    pub current_balance: Decimal,
    /// `None` until the first expense, collection or adjustment
    pub balance_sheet_id: Option<Uuid>,
    pub updated_at: Option<chrono::DateTime<Utc>>,
}

impl EmployeeBalance {
    fn from_sheet(employee_id: Uuid, sheet: Option<balance_sheet::Model>) -> Self {
        match sheet {
            Some(sheet) => Self {
                employee_id,
                current_balance: sheet.current_balance,
                balance_sheet_id: Some(sheet.id),
                updated_at: sheet.updated_at,
            },
            None => Self {
                employee_id,
                current_balance: Decimal::ZERO,
                balance_sheet_id: None,
                updated_at: None,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustBalanceInput {
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
}

pub struct BalanceSheetFilters;

impl QueryFilters<balance_sheet::Entity> for BalanceSheetFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<balance_sheet::Entity>,
    ) -> Result<Select<balance_sheet::Entity>, ServiceError> {
        Ok(match name {
            "employee_id" => query.filter(
                balance_sheet::Column::EmployeeId.eq(filters::parse_uuid(name, value)?),
            ),
            "min_balance" => query.filter(
                balance_sheet::Column::CurrentBalance.gte(filters::parse_decimal(name, value)?),
            ),
            "max_balance" => query.filter(
                balance_sheet::Column::CurrentBalance.lte(filters::parse_decimal(name, value)?),
            ),
            _ => query,
        })
    }
}

#[derive(Clone)]
pub struct BalanceSheetService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BalanceSheetService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<balance_sheet::Model>, ServiceError> {
        let query = balance_sheet::Entity::find()
            .order_by_desc(balance_sheet::Column::CurrentBalance)
            .order_by_asc(balance_sheet::Column::Id);
        let query = filters::apply_filters(&BalanceSheetFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    /// Current balance for an employee; zero when no sheet exists yet
    #[instrument(skip(self))]
    pub async fn for_employee(&self, employee_id: Uuid) -> Result<EmployeeBalance, ServiceError> {
        super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", employee_id).await?;

        let sheet = balance_sheet::Entity::find()
            .filter(balance_sheet::Column::EmployeeId.eq(employee_id))
            .one(&*self.db)
            .await?;
        Ok(EmployeeBalance::from_sheet(employee_id, sheet))
    }

    /// Applies a signed manual adjustment, opening the sheet if needed
    #[instrument(skip(self))]
    pub async fn adjust(&self, input: AdjustBalanceInput) -> Result<EmployeeBalance, ServiceError> {
        if input.amount.is_zero() {
            return Err(ServiceError::ValidationError(
                "Adjustment amount must not be zero".to_string(),
            ));
        }
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "Adjustment reason is required".to_string(),
            ));
        }

        super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", input.employee_id)
            .await?;
        let txn = self.db.begin().await?;
        let sheet = apply_delta(&txn, input.employee_id, input.amount, OnMissing::Open).await?;
        txn.commit().await?;

        publish_change(&self.event_sender, sheet.as_ref(), input.amount, "adjustment");
        info!(
            employee_id = %input.employee_id,
            amount = %input.amount,
            reason,
            "Balance adjusted"
        );
        Ok(EmployeeBalance::from_sheet(input.employee_id, sheet))
    }
}
