use crate::{
    entities::{
        employee, product,
        product_delivery::{self, DeliveryStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Select, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

fn too_large(what: &str) -> ServiceError {
    ServiceError::ValidationError(format!(
        "{} exceeds the largest storable amount ({})",
        what,
        super::MAX_AMOUNT
    ))
}

/// Commission owed on `total_amount` at `commission_rate` percent, rounded to
/// cents with halves away from zero.
pub fn commission_for(
    total_amount: Decimal,
    commission_rate: Decimal,
) -> Result<Decimal, ServiceError> {
    total_amount
        .checked_mul(commission_rate)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(|v| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .filter(|v| v.abs() <= super::MAX_AMOUNT)
        .ok_or_else(|| too_large("Commission"))
}

/// `(total_amount, commission_amount)` for a delivery line
pub fn delivery_amounts(
    quantity: i32,
    unit_price: Decimal,
    commission_rate: Decimal,
) -> Result<(Decimal, Decimal), ServiceError> {
    let total = Decimal::from(quantity)
        .checked_mul(unit_price)
        .filter(|v| v.abs() <= super::MAX_AMOUNT)
        .ok_or_else(|| too_large("Delivery total"))?;
    Ok((total, commission_for(total, commission_rate)?))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeliveryInput {
    pub product_id: Uuid,
    pub employee_id: Uuid,
    pub quantity: i32,
    /// Defaults to the product's current price
    pub unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDeliveryInput {
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

pub struct DeliveryFilters;

impl QueryFilters<product_delivery::Entity> for DeliveryFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<product_delivery::Entity>,
    ) -> Result<Select<product_delivery::Entity>, ServiceError> {
        Ok(match name {
            "employee_id" => query.filter(
                product_delivery::Column::EmployeeId.eq(filters::parse_uuid(name, value)?),
            ),
            "product_id" => query.filter(
                product_delivery::Column::ProductId.eq(filters::parse_uuid(name, value)?),
            ),
            "status" => query.filter(
                product_delivery::Column::Status
                    .eq(filters::parse_enum::<DeliveryStatus>(name, value)?),
            ),
            "date_from" => query.filter(
                product_delivery::Column::CreatedAt
                    .gte(filters::start_of_day(filters::parse_date(name, value)?)),
            ),
            "date_to" => query.filter(
                product_delivery::Column::CreatedAt
                    .lt(filters::end_of_day_exclusive(filters::parse_date(name, value)?)),
            ),
            _ => query,
        })
    }
}

fn validate_line(quantity: i32, unit_price: Option<Decimal>) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "Delivery quantity must be greater than zero".to_string(),
        ));
    }
    if matches!(unit_price, Some(price) if price < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "Unit price cannot be negative".to_string(),
        ));
    }
    if matches!(unit_price, Some(price) if price > super::MAX_AMOUNT) {
        return Err(too_large("Unit price"));
    }
    Ok(())
}

/// Product deliveries and their commission. Completion is the only
/// transition that touches product stock.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<product_delivery::Model>, ServiceError> {
        let query = product_delivery::Entity::find()
            .order_by_desc(product_delivery::Column::CreatedAt)
            .order_by_asc(product_delivery::Column::Id);
        let query = filters::apply_filters(&DeliveryFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product_delivery::Model, ServiceError> {
        super::find_or_404::<product_delivery::Entity, _>(&*self.db, "Delivery", id).await
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateDeliveryInput,
    ) -> Result<product_delivery::Model, ServiceError> {
        validate_line(input.quantity, input.unit_price)?;

        let product =
            super::find_or_404::<product::Entity, _>(&*self.db, "Product", input.product_id)
                .await?;
        super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", input.employee_id)
            .await?;

        let unit_price = input.unit_price.unwrap_or(product.price);
        let (total_amount, commission_amount) =
            delivery_amounts(input.quantity, unit_price, product.commission_rate)?;

        let delivery = product_delivery::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            employee_id: Set(input.employee_id),
            quantity: Set(input.quantity),
            unit_price: Set(unit_price),
            total_amount: Set(total_amount),
            commission_amount: Set(commission_amount),
            status: Set(DeliveryStatus::Pending),
            delivered_at: Set(None),
            notes: Set(super::normalize_optional(input.notes)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender.send_or_log(Event::DeliveryCreated {
            delivery_id: delivery.id,
            employee_id: delivery.employee_id,
            commission_amount: delivery.commission_amount,
        });
        metrics::counter!("ems.deliveries.created", 1);
        info!(delivery_id = %delivery.id, total = %total_amount, commission = %commission_amount, "Delivery created");
        Ok(delivery)
    }

    /// Edits a pending delivery and recomputes its amounts at the product's
    /// current commission rate
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateDeliveryInput,
    ) -> Result<product_delivery::Model, ServiceError> {
        let existing = self.get(id).await?;
        if !existing.is_pending() {
            return Err(ServiceError::InvalidStatus(format!(
                "Delivery {} is {} and can no longer be edited",
                id, existing.status
            )));
        }

        let quantity = input.quantity.unwrap_or(existing.quantity);
        let unit_price = input.unit_price.unwrap_or(existing.unit_price);
        validate_line(quantity, Some(unit_price))?;

        let product =
            super::find_or_404::<product::Entity, _>(&*self.db, "Product", existing.product_id)
                .await?;
        let (total_amount, commission_amount) =
            delivery_amounts(quantity, unit_price, product.commission_rate)?;

        let mut active: product_delivery::ActiveModel = existing.into();
        active.quantity = Set(quantity);
        active.unit_price = Set(unit_price);
        active.total_amount = Set(total_amount);
        active.commission_amount = Set(commission_amount);
        if input.notes.is_some() {
            active.notes = Set(super::normalize_optional(input.notes));
        }
        let updated = active.update(&*self.db).await?;

        info!(delivery_id = %updated.id, "Delivery updated");
        Ok(updated)
    }

    /// Marks a pending delivery completed, recomputes its commission and
    /// takes the quantity out of product stock. Stock is allowed to go
    /// negative; that is logged and raised as an event.
    #[instrument(skip(self))]
    pub async fn complete(&self, id: Uuid) -> Result<product_delivery::Model, ServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        // Conditional on `pending` so a delivery is never completed twice
        let transitioned = product_delivery::Entity::update_many()
            .set(product_delivery::ActiveModel {
                status: Set(DeliveryStatus::Completed),
                delivered_at: Set(Some(now)),
                updated_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(product_delivery::Column::Id.eq(id))
            .filter(product_delivery::Column::Status.eq(DeliveryStatus::Pending))
            .exec(&txn)
            .await?;
        if transitioned.rows_affected == 0 {
            let delivery =
                super::find_or_404::<product_delivery::Entity, _>(&txn, "Delivery", id).await?;
            return Err(ServiceError::InvalidStatus(format!(
                "Delivery {} is {} and cannot be completed",
                id, delivery.status
            )));
        }

        let delivery =
            super::find_or_404::<product_delivery::Entity, _>(&txn, "Delivery", id).await?;
        let product =
            super::find_or_404::<product::Entity, _>(&txn, "Product", delivery.product_id).await?;
        let (total_amount, commission_amount) =
            delivery_amounts(delivery.quantity, delivery.unit_price, product.commission_rate)?;

        let mut active: product_delivery::ActiveModel = delivery.into();
        active.total_amount = Set(total_amount);
        active.commission_amount = Set(commission_amount);
        let completed = active.update(&txn).await?;

        product::Entity::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).sub(completed.quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .filter(product::Column::Id.eq(product.id))
            .exec(&txn)
            .await?;

        let stock_after =
            super::find_or_404::<product::Entity, _>(&txn, "Product", product.id).await?;
        txn.commit().await?;

        if stock_after.stock_quantity < 0 {
            warn!(
                product_id = %stock_after.id,
                stock_quantity = stock_after.stock_quantity,
                "Delivery completion left product stock below zero"
            );
            self.event_sender.send_or_log(Event::StockWentNegative {
                product_id: stock_after.id,
                stock_quantity: stock_after.stock_quantity,
            });
        }

        self.event_sender.send_or_log(Event::DeliveryCompleted {
            delivery_id: completed.id,
            product_id: completed.product_id,
            quantity: completed.quantity,
            commission_amount: completed.commission_amount,
        });
        metrics::counter!("ems.deliveries.completed", 1);
        info!(delivery_id = %completed.id, commission = %completed.commission_amount, "Delivery completed");
        Ok(completed)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid) -> Result<product_delivery::Model, ServiceError> {
        let delivery = self.get(id).await?;

        let transitioned = product_delivery::Entity::update_many()
            .set(product_delivery::ActiveModel {
                status: Set(DeliveryStatus::Cancelled),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(product_delivery::Column::Id.eq(id))
            .filter(product_delivery::Column::Status.eq(DeliveryStatus::Pending))
            .exec(&*self.db)
            .await?;
        if transitioned.rows_affected == 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "Delivery {} is {} and cannot be cancelled",
                id, delivery.status
            )));
        }

        self.event_sender.send_or_log(Event::DeliveryCancelled(id));
        info!(delivery_id = %id, "Delivery cancelled");
        self.get(id).await
    }

    /// Completed deliveries are part of the stock history and stay.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let delivery = self.get(id).await?;
        if delivery.is_completed() {
            return Err(ServiceError::InvalidStatus(format!(
                "Delivery {} is completed and cannot be deleted",
                id
            )));
        }
        product_delivery::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        info!(delivery_id = %id, "Delivery deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(3, dec!(12.50), dec!(10), dec!(37.50), dec!(3.75))]
    #[case(1, dec!(0.10), dec!(5), dec!(0.10), dec!(0.01))]
    #[case(1, dec!(0.30), dec!(5), dec!(0.30), dec!(0.02))]
    #[case(7, dec!(19.99), dec!(0), dec!(139.93), dec!(0))]
    #[case(2, dec!(100), dec!(12.5), dec!(200), dec!(25))]
    fn computes_total_and_commission(
        #[case] quantity: i32,
        #[case] unit_price: Decimal,
        #[case] rate: Decimal,
        #[case] total: Decimal,
        #[case] commission: Decimal,
    ) {
        assert_eq!(delivery_amounts(quantity, unit_price, rate).unwrap(), (total, commission));
    }

    #[test]
    fn half_cent_rounds_away_from_zero() {
        // 0.125 -> 0.13, not banker's 0.12
        assert_eq!(commission_for(dec!(1.25), dec!(10)).unwrap(), dec!(0.13));
        assert_eq!(commission_for(dec!(-1.25), dec!(10)).unwrap(), dec!(-0.13));
    }

    #[test]
    fn line_validation() {
        assert!(validate_line(0, None).is_err());
        assert!(validate_line(1, Some(dec!(-0.01))).is_err());
        assert!(validate_line(1, Some(dec!(0))).is_ok());
        assert!(validate_line(1, Some(dec!(1_000_000_000_000))).is_err());
    }

    #[test]
    fn oversized_lines_are_rejected_instead_of_overflowing() {
        assert_matches!(
            delivery_amounts(i32::MAX, dec!(79228162514264337593543950), dec!(10)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            delivery_amounts(i32::MAX, dec!(999_999.99), dec!(0)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            commission_for(Decimal::MAX, dec!(100)),
            Err(ServiceError::ValidationError(_))
        );
        assert!(delivery_amounts(1, super::super::MAX_AMOUNT, dec!(100)).is_ok());
    }

    proptest! {
        #[test]
        fn total_is_quantity_times_price(quantity in 1i32..10_000, cents in 0i64..10_000_000) {
            let unit_price = Decimal::new(cents, 2);
            let (total, _) = delivery_amounts(quantity, unit_price, dec!(7.5)).unwrap();
            prop_assert_eq!(total, Decimal::from(quantity) * unit_price);
        }

        #[test]
        fn commission_has_at_most_two_places_and_is_within_half_a_cent(
            quantity in 1i32..1_000,
            cents in 0i64..1_000_000,
            rate_bp in 0i64..10_000,
        ) {
            let rate = Decimal::new(rate_bp, 2);
            let (total, commission) = delivery_amounts(quantity, Decimal::new(cents, 2), rate).unwrap();
            let exact = total * rate / Decimal::ONE_HUNDRED;
            prop_assert!(commission.scale() <= 2);
            prop_assert!((commission - exact).abs() <= dec!(0.005));
        }
    }
}
