use crate::{
    errors::ServiceError,
    filters::{Pagination, QueryParams},
    services::MAX_AMOUNT,
    ApiResponse, AppState,
};
use axum::{http::StatusCode, response::Json};
use rust_decimal::Decimal;
use serde::Serialize;
use validator::{Validate, ValidationError};

/// Result of a create endpoint: `201 Created` with the usual envelope
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Result of a delete endpoint: `204 No Content`
pub type NoContentResult = Result<StatusCode, ServiceError>;

/// Standard created response
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Validate request input; field messages end up in the error's `details`
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    Ok(input.validate()?)
}

/// Page and page size for a list request, bounded by configuration
pub fn pagination(state: &AppState, params: &QueryParams) -> Result<Pagination, ServiceError> {
    Pagination::from_params(
        params,
        state.config.api_default_page_size,
        state.config.api_max_page_size,
    )
}

/// Money that may be zero: `0 ..= MAX_AMOUNT`
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("decimal_too_large"));
    }
    Ok(())
}

pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("decimal_positive"));
    }
    validate_amount(value)
}

/// Signed money such as a balance adjustment
pub fn validate_signed_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_amount(&value.abs())
}

pub fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_range"));
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_validators() {
        assert!(validate_amount(&dec!(0)).is_ok());
        assert!(validate_amount(&dec!(-0.01)).is_err());
        assert!(validate_amount(&dec!(999_999_999_999.99)).is_ok());
        assert!(validate_amount(&dec!(1_000_000_000_000)).is_err());
        assert!(validate_amount(&dec!(79228162514264337593543950)).is_err());
        assert!(validate_positive_amount(&dec!(0)).is_err());
        assert!(validate_positive_amount(&dec!(0.01)).is_ok());
        assert!(validate_signed_amount(&dec!(-1_000_000_000_000)).is_err());
        assert!(validate_signed_amount(&dec!(-15)).is_ok());
        assert!(validate_percentage(&dec!(100)).is_ok());
        assert!(validate_percentage(&dec!(100.5)).is_err());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank(" x ").is_ok());
    }
}
