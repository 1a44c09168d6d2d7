//! Shared types for the shipment tracker

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;

/// Lifecycle state of a shipment
///
/// Discriminants are the stable numeric codes accepted by the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShipmentStatus {
    Created = 0,
    PickedUp = 1,
    InTransit = 2,
    ArrivedAtFacility = 3,
    OutForDelivery = 4,
    Delivered = 5,
    Delayed = 6,
    Exception = 7,
}

impl ShipmentStatus {
    /// All states in code order
    pub const ALL: [ShipmentStatus; 8] = [
        ShipmentStatus::Created,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::ArrivedAtFacility,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Delayed,
        ShipmentStatus::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "Created",
            ShipmentStatus::PickedUp => "PickedUp",
            ShipmentStatus::InTransit => "InTransit",
            ShipmentStatus::ArrivedAtFacility => "ArrivedAtFacility",
            ShipmentStatus::OutForDelivery => "OutForDelivery",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Delayed => "Delayed",
            ShipmentStatus::Exception => "Exception",
        }
    }

    #[inline]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        *self == ShipmentStatus::Delivered
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown shipment status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for ShipmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Accepts either the state name ("InTransit") or its numeric code (2)
impl<'de> Deserialize<'de> for ShipmentStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct StatusVisitor;

        impl<'de> Visitor<'de> for StatusVisitor {
            type Value = ShipmentStatus;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a shipment status name or code 0-7")
            }

            fn visit_str<E>(self, value: &str) -> Result<ShipmentStatus, E>
            where
                E: de::Error,
            {
                value.parse().map_err(|_| E::custom(format!("unknown shipment status `{value}`")))
            }

            fn visit_u64<E>(self, value: u64) -> Result<ShipmentStatus, E>
            where
                E: de::Error,
            {
                ShipmentStatus::from_code(value)
                    .ok_or_else(|| E::custom(format!("unknown shipment status code {value}")))
            }

            fn visit_i64<E>(self, value: i64) -> Result<ShipmentStatus, E>
            where
                E: de::Error,
            {
                match u64::try_from(value) {
                    Ok(code) => self.visit_u64(code),
                    Err(_) => Err(E::custom(format!("unknown shipment status code {value}"))),
                }
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

/// Business-facing tracking code, `DHL` followed by six digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    pub const PREFIX: &'static str = "DHL";

    /// Build the canonical code for a numeric suffix
    pub fn from_suffix(suffix: u32) -> Self {
        Self(format!("{}{:06}", Self::PREFIX, suffix))
    }

    /// Wrap an arbitrary caller-supplied value (lookups only, not validated)
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Check `DHL` + exactly 6 ASCII digits
    pub fn is_well_formed(raw: &str) -> bool {
        raw.strip_prefix(Self::PREFIX)
            .is_some_and(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TrackingId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!("InTransit".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::InTransit);
        assert_eq!("delivered".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::Delivered);
        assert!("Lost".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn test_status_codes_follow_declaration_order() {
        for (i, status) in ShipmentStatus::ALL.iter().enumerate() {
            assert_eq!(status.code() as usize, i);
            assert_eq!(ShipmentStatus::from_code(i as u64), Some(*status));
        }
        assert_eq!(ShipmentStatus::from_code(8), None);
    }

    #[test]
    fn test_status_deserialize_name_or_code() {
        let by_name: ShipmentStatus = serde_json::from_str(r#""OutForDelivery""#).unwrap();
        let by_code: ShipmentStatus = serde_json::from_str("4").unwrap();
        assert_eq!(by_name, ShipmentStatus::OutForDelivery);
        assert_eq!(by_code, ShipmentStatus::OutForDelivery);
        assert!(serde_json::from_str::<ShipmentStatus>("-1").is_err());
        assert!(serde_json::from_str::<ShipmentStatus>(r#""Teleported""#).is_err());
    }

    #[test]
    fn test_status_serializes_as_name() {
        assert_eq!(serde_json::to_string(&ShipmentStatus::PickedUp).unwrap(), r#""PickedUp""#);
    }

    #[test]
    fn test_tracking_id_format() {
        assert_eq!(TrackingId::from_suffix(905514).as_str(), "DHL905514");
        assert!(TrackingId::is_well_formed("DHL905514"));
        assert!(!TrackingId::is_well_formed("DHL90551"));
        assert!(!TrackingId::is_well_formed("DHL9055140"));
        assert!(!TrackingId::is_well_formed("UPS905514"));
        assert!(!TrackingId::is_well_formed("DHL90551a"));
    }
}
