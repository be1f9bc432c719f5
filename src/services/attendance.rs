use crate::{
    entities::{
        attendance::{self, AttendanceStatus},
        employee::{self, EmployeeStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    filters::{self, Page, Pagination, QueryFilters, QueryParams},
};
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInInput {
    pub employee_id: Uuid,
    /// Defaults to now
    pub check_in: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckOutInput {
    /// Defaults to now
    pub check_out: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// `late` once the time of day passes `late_after`
pub fn status_for(check_in: DateTime<Utc>, late_after: NaiveTime) -> AttendanceStatus {
    if check_in.time() > late_after {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

/// Whole elapsed minutes as hours, rounded to two places
pub fn hours_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Decimal {
    let minutes = (check_out - check_in).num_minutes();
    (Decimal::from(minutes) / Decimal::from(60))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct AttendanceFilters;

impl QueryFilters<attendance::Entity> for AttendanceFilters {
    fn apply(
        &self,
        name: &str,
        value: &str,
        query: Select<attendance::Entity>,
    ) -> Result<Select<attendance::Entity>, ServiceError> {
        Ok(match name {
            "employee_id" => query
                .filter(attendance::Column::EmployeeId.eq(filters::parse_uuid(name, value)?)),
            "status" => query.filter(
                attendance::Column::Status
                    .eq(filters::parse_enum::<AttendanceStatus>(name, value)?),
            ),
            "date_from" => {
                query.filter(attendance::Column::WorkDate.gte(filters::parse_date(name, value)?))
            }
            "date_to" => {
                query.filter(attendance::Column::WorkDate.lte(filters::parse_date(name, value)?))
            }
            _ => query,
        })
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    late_after: NaiveTime,
}

impl AttendanceService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        late_after: NaiveTime,
    ) -> Self {
        Self {
            db,
            event_sender,
            late_after,
        }
    }

    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        params: &QueryParams,
        pagination: Pagination,
    ) -> Result<Page<attendance::Model>, ServiceError> {
        let query = attendance::Entity::find()
            .order_by_desc(attendance::Column::WorkDate)
            .order_by_asc(attendance::Column::Id);
        let query = filters::apply_filters(&AttendanceFilters, params, query)?;
        filters::fetch_page(&self.db, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<attendance::Model, ServiceError> {
        super::find_or_404::<attendance::Entity, _>(&*self.db, "Attendance", id).await
    }

    #[instrument(skip(self))]
    pub async fn check_in(&self, input: CheckInInput) -> Result<attendance::Model, ServiceError> {
        let employee =
            super::find_or_404::<employee::Entity, _>(&*self.db, "Employee", input.employee_id)
                .await?;
        if employee.status == EmployeeStatus::Terminated {
            return Err(ServiceError::InvalidStatus(format!(
                "Employee {} is terminated",
                employee.id
            )));
        }

        let check_in = input.check_in.unwrap_or_else(Utc::now);
        let work_date = check_in.date_naive();
        let existing = attendance::Entity::find()
            .filter(attendance::Column::EmployeeId.eq(employee.id))
            .filter(attendance::Column::WorkDate.eq(work_date))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(format!(
                "Employee {} already checked in on {}",
                employee.id, work_date
            )));
        }

        let status = status_for(check_in, self.late_after);
        let record = attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee.id),
            work_date: Set(work_date),
            check_in: Set(check_in),
            check_out: Set(None),
            status: Set(status),
            hours_worked: Set(None),
            notes: Set(super::normalize_optional(input.notes)),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        self.event_sender.send_or_log(Event::CheckedIn {
            attendance_id: record.id,
            employee_id: record.employee_id,
            late: status == AttendanceStatus::Late,
        });
        metrics::counter!("ems.attendance.check_ins", 1, "status" => status.to_string());
        info!(attendance_id = %record.id, status = %status, "Checked in");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn check_out(
        &self,
        id: Uuid,
        input: CheckOutInput,
    ) -> Result<attendance::Model, ServiceError> {
        let record = self.get(id).await?;
        if !record.is_open() {
            return Err(ServiceError::Conflict(format!(
                "Attendance {} is already checked out",
                id
            )));
        }

        let check_out = input.check_out.unwrap_or_else(Utc::now);
        if check_out <= record.check_in {
            return Err(ServiceError::ValidationError(
                "check_out must be after check_in".to_string(),
            ));
        }
        let hours = hours_between(record.check_in, check_out);

        let mut active: attendance::ActiveModel = record.into();
        active.check_out = Set(Some(check_out));
        active.hours_worked = Set(Some(hours));
        if input.notes.is_some() {
            active.notes = Set(super::normalize_optional(input.notes));
        }
        let record = active.update(&*self.db).await?;

        self.event_sender.send_or_log(Event::CheckedOut {
            attendance_id: record.id,
            hours_worked: hours,
        });
        info!(attendance_id = %record.id, hours = %hours, "Checked out");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;
        attendance::Entity::delete_by_id(id).exec(&*self.db).await?;
        info!(attendance_id = %id, "Attendance deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[rstest]
    #[case(at(8, 59), AttendanceStatus::Present)]
    #[case(at(9, 15), AttendanceStatus::Present)]
    #[case(at(9, 16), AttendanceStatus::Late)]
    fn late_after_threshold(#[case] check_in: DateTime<Utc>, #[case] expected: AttendanceStatus) {
        let threshold = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        assert_eq!(status_for(check_in, threshold), expected);
    }

    #[rstest]
    #[case(at(9, 0), at(17, 30), dec!(8.5))]
    #[case(at(9, 0), at(9, 20), dec!(0.33))]
    #[case(at(9, 0), at(9, 1), dec!(0.02))]
    fn hours_are_rounded_to_cents(
        #[case] check_in: DateTime<Utc>,
        #[case] check_out: DateTime<Utc>,
        #[case] expected: Decimal,
    ) {
        assert_eq!(hours_between(check_in, check_out), expected);
    }
}
