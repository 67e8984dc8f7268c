use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Role;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    #[schema(example = "Salon Anna")]
    pub company_name: String,

    #[validate(length(equal = 3, message = "Currency code must be 3 letters"))]
    #[schema(example = "EUR")]
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Company name must not be empty"))]
    pub company_name: Option<String>,

    #[validate(length(equal = 3, message = "Currency code must be 3 letters"))]
    pub currency_code: Option<String>,
}

/// Commission is a percentage between 0 and 100.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRequest {
    pub role: Option<Role>,
    #[schema(value_type = Option<String>, example = "40.00")]
    pub commission_rate: Option<Decimal>,
}
