use serde::{Deserialize, Serialize};

use super::{LocationId, OrganizationId};

/// Column limit shared by every free-text registry field.
pub const MAX_FIELD_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Location {
    pub id: LocationId,
    pub organization_id: OrganizationId,
    pub city: Option<String>,
    pub country: Option<String>,
    pub content: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    /// Both coordinates are known.
    pub fn is_geocoded(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// The location has an address to look up and has not been looked up yet.
    pub fn is_geocodable(&self) -> bool {
        has_text(self.content.as_deref()) && !self.is_geocoded()
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Attributes accepted when creating or replacing a location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocationInput {
    pub city: Option<String>,
    pub country: Option<String>,
    pub content: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("content can't be blank")]
    ContentBlank,
    #[error("{0} is too long (maximum is {MAX_FIELD_LENGTH} characters)")]
    TooLong(&'static str),
    #[error("{0} is out of range")]
    CoordinateOutOfRange(&'static str),
}

impl LocationInput {
    pub fn validate(&self) -> Result<(), LocationError> {
        if !has_text(self.content.as_deref()) {
            return Err(LocationError::ContentBlank);
        }

        for (field, value) in [
            ("city", &self.city),
            ("country", &self.country),
            ("content", &self.content),
        ] {
            if value
                .as_deref()
                .is_some_and(|v| v.chars().count() > MAX_FIELD_LENGTH)
            {
                return Err(LocationError::TooLong(field));
            }
        }

        if self.latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
            return Err(LocationError::CoordinateOutOfRange("latitude"));
        }
        if self
            .longitude
            .is_some_and(|lng| !(-180.0..=180.0).contains(&lng))
        {
            return Err(LocationError::CoordinateOutOfRange("longitude"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(content: Option<&str>, latitude: Option<f64>, longitude: Option<f64>) -> Location {
        Location {
            id: LocationId::new(1),
            organization_id: OrganizationId::new(1),
            city: Some("New York".to_string()),
            country: Some("US".to_string()),
            content: content.map(str::to_string),
            latitude,
            longitude,
        }
    }

    #[test]
    fn geocoded_requires_both_coordinates() {
        assert!(location(None, Some(40.7), Some(-74.0)).is_geocoded());
        assert!(!location(None, Some(40.7), None).is_geocoded());
        assert!(!location(None, None, Some(-74.0)).is_geocoded());
        assert!(!location(None, None, None).is_geocoded());
    }

    #[test]
    fn geocodable_requires_content_and_missing_coordinates() {
        assert!(location(Some("525 W 19th St"), None, None).is_geocodable());
        assert!(location(Some("525 W 19th St"), Some(40.7), None).is_geocodable());
        assert!(!location(Some("525 W 19th St"), Some(40.7), Some(-74.0)).is_geocodable());
        assert!(!location(None, None, None).is_geocodable());
        assert!(!location(Some("  "), None, None).is_geocodable());
    }

    #[test]
    fn validate_requires_content() {
        let input = LocationInput {
            city: Some("Berlin".to_string()),
            ..Default::default()
        };
        assert_eq!(input.validate(), Err(LocationError::ContentBlank));
    }

    #[test]
    fn validate_limits_field_length() {
        let input = LocationInput {
            content: Some("Potsdamer Str. 77".to_string()),
            city: Some("b".repeat(MAX_FIELD_LENGTH + 1)),
            ..Default::default()
        };
        assert_eq!(input.validate(), Err(LocationError::TooLong("city")));

        let input = LocationInput {
            content: Some("c".repeat(MAX_FIELD_LENGTH)),
            country: Some("DE".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn validate_checks_coordinate_ranges() {
        let input = LocationInput {
            content: Some("Somewhere".to_string()),
            latitude: Some(91.0),
            longitude: Some(0.0),
            ..Default::default()
        };
        assert_eq!(
            input.validate(),
            Err(LocationError::CoordinateOutOfRange("latitude"))
        );
    }
}
