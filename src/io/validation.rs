//! Request DTOs and structural validation for the HTTP API
//!
//! Shape checks live here so the service only ever sees well-formed input.

use crate::domain::types::ShipmentStatus;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const MIN_TEXT_LEN: usize = 2;
const MAX_TEXT_LEN: usize = 100;

/// One or more field violations, reported together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationError(pub Vec<String>);

/// Body of `POST /api/shipment/create`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "deserialize_eta")]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
}

/// RFC 3339 with an offset, or a bare date/date-time read as UTC
fn parse_eta(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(eta) = raw.parse::<DateTime<Utc>>() {
        return Some(eta);
    }
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    raw.parse::<NaiveDate>().ok().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|n| n.and_utc())
}

fn deserialize_eta<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_eta(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date-time: {raw}"))),
    }
}

/// Body of `PUT /api/shipment/{trackingId}/status`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<ShipmentStatus>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Validated create input
#[derive(Debug, Clone, PartialEq)]
pub struct NewShipment {
    pub origin: String,
    pub destination: String,
    pub estimated_delivery_date: DateTime<Utc>,
}

/// Validated status update input
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: ShipmentStatus,
    pub location: String,
}

/// Required, 2-100 characters, letters/spaces/hyphens only
fn check_place(field: &str, value: Option<&str>, errors: &mut Vec<String>) {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        errors.push(format!("{field} is required"));
        return;
    };

    let len = value.chars().count();
    if !(MIN_TEXT_LEN..=MAX_TEXT_LEN).contains(&len) {
        errors.push(format!(
            "{field} must be between {MIN_TEXT_LEN} and {MAX_TEXT_LEN} characters"
        ));
    }

    if !value.chars().all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '-') {
        errors.push(format!("{field} must contain only letters, spaces, and hyphens"));
    }
}

impl CreateShipmentRequest {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewShipment, ValidationError> {
        let mut errors = Vec::new();
        check_place("Origin", self.origin.as_deref(), &mut errors);
        check_place("Destination", self.destination.as_deref(), &mut errors);

        match self.estimated_delivery_date {
            None => errors.push("Estimated Delivery Date is required".to_string()),
            Some(eta) if eta <= now => {
                errors.push("Estimated Delivery Date must be in the future".to_string())
            }
            Some(_) => {}
        }

        match (self.origin, self.destination, self.estimated_delivery_date) {
            (Some(origin), Some(destination), Some(estimated_delivery_date)) if errors.is_empty() => {
                Ok(NewShipment { origin, destination, estimated_delivery_date })
            }
            _ => Err(ValidationError(errors)),
        }
    }
}

impl UpdateStatusRequest {
    pub fn validate(self) -> Result<StatusChange, ValidationError> {
        let mut errors = Vec::new();
        if self.status.is_none() {
            errors.push("Status is required".to_string());
        }
        check_place("Location", self.location.as_deref(), &mut errors);

        match (self.status, self.location) {
            (Some(status), Some(location)) if errors.is_empty() => {
                Ok(StatusChange { status, location })
            }
            _ => Err(ValidationError(errors)),
        }
    }
}
