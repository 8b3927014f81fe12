// src/dtos/listing.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::listing::{
    ApprovalStatus, Category, ListingFilter, Location, NearbyPlace, RentType,
};
use crate::services::listing::{ListingWithOwner, OwnerSummary};

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<OwnerSummary> for OwnerResponse {
    fn from(owner: OwnerSummary) -> Self {
        Self {
            id: owner.id,
            username: owner.username,
            email: owner.email,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: Location,
    pub category: Category,
    pub rent_type: RentType,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
    pub furnished: bool,
    pub image: String,
    pub additional_images: Vec<String>,
    pub amenities: Vec<String>,
    pub features: Vec<String>,
    pub nearby_places: Vec<NearbyPlace>,
    pub available: bool,
    pub rating: f64,
    pub review_count: i32,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// `null` if the owner account no longer exists.
    pub owner: Option<OwnerResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Convert from the hydrated model to the response DTO
impl From<ListingWithOwner> for ListingResponse {
    fn from(ListingWithOwner { listing: l, owner }: ListingWithOwner) -> Self {
        Self {
            id: l.id,
            title: l.title,
            description: l.description,
            price: l.price,
            location: l.location.0,
            category: l.category,
            rent_type: l.rent_type,
            bedrooms: l.bedrooms,
            bathrooms: l.bathrooms,
            area: l.area,
            furnished: l.furnished,
            image: l.image,
            additional_images: l.additional_images.0,
            amenities: l.amenities.0,
            features: l.features.0,
            nearby_places: l.nearby_places.0,
            available: l.available,
            rating: l.rating,
            review_count: l.review_count,
            status: l.status,
            rejection_reason: l.rejection_reason,
            reviewed_by: l.reviewed_by,
            reviewed_at: l.reviewed_at,
            owner: owner.map(OwnerResponse::from),
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

/// Query string for `GET /listings`. Values are kept raw so a bad value is a
/// validation error rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub rent_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub furnished: Option<String>,
    pub status: Option<String>,
}

impl ListingQuery {
    pub fn into_filter(self) -> Result<ListingFilter, AppError> {
        Ok(ListingFilter {
            category: parse_opt(self.category, "category", |s| s.parse())?,
            rent_type: parse_opt(self.rent_type, "rentType", |s| s.parse())?,
            min_price: parse_opt(self.min_price, "minPrice", parse_price)?,
            max_price: parse_opt(self.max_price, "maxPrice", parse_price)?,
            furnished: parse_opt(self.furnished, "furnished", |s| Ok(s.eq_ignore_ascii_case("true")))?,
            status: parse_opt(self.status, "status", |s| s.parse())?,
            ..Default::default()
        })
    }
}

fn parse_price(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| format!("`{raw}` is not a valid number"))
}

fn parse_opt<T>(
    value: Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<T>, AppError> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => parse(raw)
            .map(Some)
            .map_err(|e| AppError::validation(format!("{name}: {e}"))),
        None => Ok(None),
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_unfiltered() {
        assert_eq!(ListingQuery::default().into_filter().unwrap(), ListingFilter::default());
    }

    #[test]
    fn query_values_are_typed() {
        let query = ListingQuery {
            category: Some("Farm House".into()),
            rent_type: Some("daily".into()),
            min_price: Some("100".into()),
            max_price: Some("".into()),
            furnished: Some("false".into()),
            status: None,
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.category, Some(Category::FarmHouse));
        assert_eq!(filter.rent_type, Some(RentType::Daily));
        assert_eq!(filter.min_price, Some(100.0));
        assert_eq!(filter.max_price, None);
        assert_eq!(filter.furnished, Some(false));
    }

    #[test]
    fn bad_price_is_validation_error() {
        let query = ListingQuery { min_price: Some("cheap".into()), ..Default::default() };
        assert!(matches!(query.into_filter(), Err(AppError::Validation(_))));
    }
}
