use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use tutorlink_core::{Availability, BookingStatus, UserRole, VerificationStatus};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[validate(length(min = 2, max = 128))]
    pub full_name: String,
    #[schema(value_type = String)]
    pub role: UserRole,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(max = 255))]
    pub specialization: Option<String>,
    pub cv_file_path: Option<String>,
    #[serde(default)]
    pub certificate_file_paths: Vec<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 255))]
    pub email: String,
    #[validate(length(max = 64))]
    pub password: String,
}

fn default_duration() -> i32 {
    tutorlink_core::DEFAULT_DURATION_MINUTES
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBookingSchema {
    pub tutor_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[schema(value_type = String)]
    pub session_date: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBookingSchema {
    #[schema(value_type = String)]
    pub status: BookingStatus,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewReviewSchema {
    pub booking_id: i32,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifySchema {
    #[schema(value_type = String)]
    pub status: VerificationStatus,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTutorSchema {
    #[validate(length(max = 255))]
    pub specialization: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
    #[validate(range(min = 0.))]
    pub hourly_rate: Option<f64>,
    #[schema(value_type = Object)]
    pub availability: Option<Availability>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::validation(e.to_string()))?;

        extracted_json.0.validate().map_err(|errors| {
            let details: HashMap<String, String> = errors
                .field_errors()
                .into_iter()
                .map(|(field, errors)| {
                    let message = errors
                        .iter()
                        .filter_map(|e| e.message.as_ref())
                        .map(|m| m.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");

                    let message = if message.is_empty() {
                        errors
                            .iter()
                            .map(|e| e.code.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    } else {
                        message
                    };

                    (field.to_string(), message)
                })
                .collect();

            ServerError::Validation {
                message: "Request body is invalid".to_string(),
                details: Some(details),
            }
        })?;

        Ok(Self(extracted_json.0))
    }
}
