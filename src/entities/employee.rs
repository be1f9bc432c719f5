use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "employees")]
#[schema(as = Employee)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    pub hire_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub salary: Decimal,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// Employment status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::EnumString,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "on_leave")]
    OnLeave,
    #[sea_orm(string_value = "terminated")]
    Terminated,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Department,
    #[sea_orm(
        belongs_to = "super::position::Entity",
        from = "Column::PositionId",
        to = "super::position::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Position,
    #[sea_orm(has_one = "super::balance_sheet::Entity")]
    BalanceSheet,
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::collection::Entity")]
    Collections,
    #[sea_orm(has_many = "super::product_delivery::Entity")]
    ProductDeliveries,
    #[sea_orm(has_many = "super::payroll::Entity")]
    Payrolls,
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
    #[sea_orm(has_many = "super::promotion_history::Entity")]
    PromotionHistories,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::position::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Position.def()
    }
}

impl Related<super::balance_sheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceSheet.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::collection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collections.def()
    }
}

impl Related<super::product_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductDeliveries.def()
    }
}

impl Related<super::payroll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payrolls.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl Related<super::promotion_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromotionHistories.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn employee(status: EmployeeStatus) -> Model {
        Model {
            id: Uuid::new_v4(),
            employee_code: "EMP-001".into(),
            first_name: "Ada".into(),
            last_name: "Okafor".into(),
            email: "ada@example.com".into(),
            phone: None,
            department_id: None,
            position_id: None,
            hire_date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            salary: Decimal::new(450000, 2),
            status,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn full_name_joins_first_and_last() {
        assert_eq!(employee(EmployeeStatus::Active).full_name(), "Ada Okafor");
    }

    #[test]
    fn only_active_status_is_active() {
        assert!(employee(EmployeeStatus::Active).is_active());
        assert!(!employee(EmployeeStatus::OnLeave).is_active());
        assert!(!employee(EmployeeStatus::Terminated).is_active());
    }

    #[test]
    fn status_parses_from_snake_case() {
        assert_eq!(
            EmployeeStatus::from_str("on_leave").unwrap(),
            EmployeeStatus::OnLeave
        );
        assert!(EmployeeStatus::from_str("retired").is_err());
        assert_eq!(EmployeeStatus::Terminated.to_string(), "terminated");
    }
}
