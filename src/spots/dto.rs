use serde::{Deserialize, Serialize};

use super::repo::{Spot, SpotImage};
use crate::{auth::dto::UserName, error::FieldErrors};

pub const MAX_PAGE: i64 = 10;
pub const MAX_SIZE: i64 = 20;
pub const NAME_MAX_CHARS: usize = 49;
pub const NO_PREVIEW: &str = "No preview image available.";

/// Body of `POST /spots` and `PUT /spots/{id}`, as sent by the client.
#[derive(Debug, Default, Deserialize)]
pub struct SpotBody {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// A spot body that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotInput {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
    pub price: f64,
}

fn required(value: Option<String>, field: &'static str, msg: &str, errors: &mut FieldErrors) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.insert(field, msg.into());
            String::new()
        }
    }
}

fn in_range(value: Option<f64>, bound: f64, field: &'static str, msg: &str, errors: &mut FieldErrors) -> f64 {
    match value {
        Some(v) if v.is_finite() && v.abs() <= bound => v,
        _ => {
            errors.insert(field, msg.into());
            0.0
        }
    }
}

impl SpotBody {
    pub fn validate(self) -> Result<SpotInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let address = required(self.address, "address", "Street address is required", &mut errors);
        let city = required(self.city, "city", "City is required", &mut errors);
        let state = required(self.state, "state", "State is required", &mut errors);
        let country = required(self.country, "country", "Country is required", &mut errors);
        let lat = in_range(self.lat, 90.0, "lat", "Latitude is not valid", &mut errors);
        let lng = in_range(self.lng, 180.0, "lng", "Longitude is not valid", &mut errors);

        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
            errors.insert("name", "Name must be less than 50 characters".into());
        }
        let description = required(self.description, "description", "Description is required", &mut errors);

        let price = match self.price {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => {
                errors.insert("price", "Price per day is required".into());
                0.0
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(SpotInput {
            address,
            city,
            state,
            country,
            lat,
            lng,
            name,
            description,
            price,
        })
    }
}

/// Raw `GET /spots` query string. Kept as text so bad values become field errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub min_lat: Option<String>,
    pub max_lat: Option<String>,
    pub min_lng: Option<String>,
    pub max_lng: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotFilter {
    pub page: i64,
    pub size: i64,
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lng: Option<f64>,
    pub max_lng: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SpotFilter {
    pub fn offset(&self) -> i64 {
        self.size * (self.page - 1)
    }
}

fn int_param(raw: Option<String>, default: i64, max: i64, field: &'static str, msg: &str, errors: &mut FieldErrors) -> i64 {
    match raw.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(text) => match text.parse::<i64>() {
            Ok(v) if (1..=max).contains(&v) => v,
            _ => {
                errors.insert(field, msg.into());
                default
            }
        },
    }
}

fn decimal_param(raw: Option<String>, min: Option<f64>, field: &'static str, msg: &str, errors: &mut FieldErrors) -> Option<f64> {
    let text = raw?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && min.map_or(true, |m| v >= m) => Some(v),
        _ => {
            errors.insert(field, msg.into());
            None
        }
    }
}

impl SpotQuery {
    pub fn validate(self) -> Result<SpotFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let filter = SpotFilter {
            page: int_param(self.page, 1, MAX_PAGE, "page", "Page must be greater than or equal to 1", &mut errors),
            size: int_param(self.size, MAX_SIZE, MAX_SIZE, "size", "Size must be greater than or equal to 1", &mut errors),
            min_lat: decimal_param(self.min_lat, None, "minLat", "Minimum latitude is invalid", &mut errors),
            max_lat: decimal_param(self.max_lat, None, "maxLat", "Maximum latitude is invalid", &mut errors),
            min_lng: decimal_param(self.min_lng, None, "minLng", "Minimum longitude is invalid", &mut errors),
            max_lng: decimal_param(self.max_lng, None, "maxLng", "Maximum longitude is invalid", &mut errors),
            min_price: decimal_param(
                self.min_price,
                Some(0.0),
                "minPrice",
                "Minimum price must be greater than or equal to 0",
                &mut errors,
            ),
            max_price: decimal_param(
                self.max_price,
                Some(0.0),
                "maxPrice",
                "Maximum price must be greater than or equal to 0",
                &mut errors,
            ),
        };
        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(errors)
        }
    }
}

/// A spot in list views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSummary {
    #[serde(flatten)]
    pub spot: Spot,
    pub avg_rating: Option<f64>,
    pub preview_image: String,
}

#[derive(Debug, Serialize)]
pub struct SpotList {
    #[serde(rename = "Spots")]
    pub spots: Vec<SpotSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotDetails {
    #[serde(flatten)]
    pub spot: Spot,
    pub num_reviews: i64,
    pub avg_star_rating: Option<f64>,
    #[serde(rename = "SpotImages")]
    pub images: Vec<SpotImage>,
    #[serde(rename = "Owner")]
    pub owner: UserName,
}

#[derive(Debug, Deserialize)]
pub struct ImageBody {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub preview: bool,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: &'static str,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good_body() -> SpotBody {
        SpotBody {
            address: Some("123 Disney Lane".into()),
            city: Some("San Francisco".into()),
            state: Some("California".into()),
            country: Some("United States of America".into()),
            lat: Some(37.7645358),
            lng: Some(-122.4730327),
            name: Some("App Academy".into()),
            description: Some("Place where web developers are created".into()),
            price: Some(123.0),
        }
    }

    #[test]
    fn valid_body_passes() {
        let input = good_body().validate().unwrap();
        assert_eq!(input.city, "San Francisco");
        assert_eq!(input.price, 123.0);
    }

    #[test]
    fn empty_body_reports_every_field() {
        let errors = SpotBody::default().validate().unwrap_err();
        assert_eq!(errors.len(), 9);
        assert_eq!(errors["address"], "Street address is required");
        assert_eq!(errors["price"], "Price per day is required");
        assert_eq!(errors["name"], "Name must be less than 50 characters");
    }

    #[test]
    fn long_name_and_bad_coordinates_are_rejected() {
        let body = SpotBody {
            name: Some("x".repeat(50)),
            lat: Some(91.0),
            lng: Some(-181.0),
            ..good_body()
        };
        let errors = body.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["lat"], "Latitude is not valid");
        assert_eq!(errors["lng"], "Longitude is not valid");
    }

    #[test]
    fn query_defaults() {
        let filter = SpotQuery::default().validate().unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.size, 20);
        assert_eq!(filter.offset(), 0);
        assert!(filter.min_price.is_none());
    }

    #[test]
    fn query_parses_filters_and_offset() {
        let q = SpotQuery {
            page: Some("3".into()),
            size: Some("5".into()),
            min_lat: Some("10.5".into()),
            max_price: Some("200".into()),
            ..Default::default()
        };
        let filter = q.validate().unwrap();
        assert_eq!(filter.offset(), 10);
        assert_eq!(filter.min_lat, Some(10.5));
        assert_eq!(filter.max_price, Some(200.0));
    }

    #[test]
    fn query_rejects_out_of_range_values() {
        let q = SpotQuery {
            page: Some("0".into()),
            size: Some("abc".into()),
            max_lat: Some("north".into()),
            min_price: Some("-1".into()),
            ..Default::default()
        };
        let errors = q.validate().unwrap_err();
        assert_eq!(errors["page"], "Page must be greater than or equal to 1");
        assert_eq!(errors["size"], "Size must be greater than or equal to 1");
        assert_eq!(errors["maxLat"], "Maximum latitude is invalid");
        assert_eq!(errors["minPrice"], "Minimum price must be greater than or equal to 0");
    }
}
