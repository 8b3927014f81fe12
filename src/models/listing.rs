use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_category")]
pub enum Category {
    Villa,
    Studio,
    #[serde(rename = "Farm House")]
    #[sqlx(rename = "Farm House")]
    FarmHouse,
    Apartment,
    #[serde(rename = "PG/Hostel")]
    #[sqlx(rename = "PG/Hostel")]
    PgHostel,
    #[serde(rename = "Shop/Office")]
    #[sqlx(rename = "Shop/Office")]
    ShopOffice,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Villa,
        Category::Studio,
        Category::FarmHouse,
        Category::Apartment,
        Category::PgHostel,
        Category::ShopOffice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Villa => "Villa",
            Category::Studio => "Studio",
            Category::FarmHouse => "Farm House",
            Category::Apartment => "Apartment",
            Category::PgHostel => "PG/Hostel",
            Category::ShopOffice => "Shop/Office",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category `{wanted}`"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rent_type")]
pub enum RentType {
    Daily,
    #[default]
    Monthly,
    Yearly,
}

impl std::str::FromStr for RentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RentType::Daily),
            "monthly" => Ok(RentType::Monthly),
            "yearly" => Ok(RentType::Yearly),
            other => Err(format!("Unknown rent type `{other}`")),
        }
    }
}

/// Approval state. Only `Pending` has outgoing transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("Unknown status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Area is required"))]
    pub area: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Pin code is required"))]
    pub pin_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,
    pub distance: String,
}

/// The validated, owner-editable part of a listing.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ListingDraft {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
    #[validate(nested)]
    pub location: Location,
    pub category: Category,
    pub rent_type: RentType,
    #[validate(range(min = 0, message = "Bedrooms must not be negative"))]
    pub bedrooms: i32,
    #[validate(range(min = 0, message = "Bathrooms must not be negative"))]
    pub bathrooms: i32,
    #[validate(range(min = 0.0, message = "Area must not be negative"))]
    pub area: f64,
    pub furnished: bool,
    pub available: bool,
    pub amenities: Vec<String>,
    pub features: Vec<String>,
    pub nearby_places: Vec<NearbyPlace>,
}

/// Admin decision recorded atomically with the status change.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRecord {
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Uuid,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: Json<Location>,
    pub category: Category,
    pub rent_type: RentType,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
    pub furnished: bool,
    pub image: String,
    pub additional_images: Json<Vec<String>>,
    pub amenities: Json<Vec<String>>,
    pub features: Json<Vec<String>>,
    pub nearby_places: Json<Vec<NearbyPlace>>,
    pub available: bool,
    pub rating: f64,
    pub review_count: i32,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Build a pending listing. `images` must not be empty; the first path is primary.
    pub fn new(owner_id: Uuid, draft: ListingDraft, images: &[String]) -> Option<Self> {
        let (image, additional) = images.split_first()?;
        let now = Utc::now();

        Some(Self {
            id: Uuid::new_v4(),
            owner_id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            location: Json(draft.location),
            category: draft.category,
            rent_type: draft.rent_type,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            area: draft.area,
            furnished: draft.furnished,
            image: image.clone(),
            additional_images: Json(additional.to_vec()),
            amenities: Json(draft.amenities),
            features: Json(draft.features),
            nearby_places: Json(draft.nearby_places),
            available: draft.available,
            rating: 0.0,
            review_count: 0,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the owner-editable fields. Owner, images and approval fields are untouched.
    pub fn apply(&mut self, draft: ListingDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.price = draft.price;
        self.location = Json(draft.location);
        self.category = draft.category;
        self.rent_type = draft.rent_type;
        self.bedrooms = draft.bedrooms;
        self.bathrooms = draft.bathrooms;
        self.area = draft.area;
        self.furnished = draft.furnished;
        self.available = draft.available;
        self.amenities = Json(draft.amenities);
        self.features = Json(draft.features);
        self.nearby_places = Json(draft.nearby_places);
    }

    pub fn draft(&self) -> ListingDraft {
        ListingDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            location: self.location.0.clone(),
            category: self.category,
            rent_type: self.rent_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area: self.area,
            furnished: self.furnished,
            available: self.available,
            amenities: self.amenities.0.clone(),
            features: self.features.0.clone(),
            nearby_places: self.nearby_places.0.clone(),
        }
    }

    /// Swap in a new image set; returns the paths it replaced.
    pub fn replace_images(&mut self, images: &[String]) -> Vec<String> {
        let previous = self.image_paths();
        if let Some((image, additional)) = images.split_first() {
            self.image = image.clone();
            self.additional_images = Json(additional.to_vec());
        }
        previous
    }

    /// Primary image followed by additional images.
    pub fn image_paths(&self) -> Vec<String> {
        std::iter::once(self.image.clone())
            .chain(self.additional_images.0.iter().cloned())
            .collect()
    }
}

/// Query over listings. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub category: Option<Category>,
    pub rent_type: Option<RentType>,
    pub furnished: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub owner_id: Option<Uuid>,
    pub status: Option<ApprovalStatus>,
    pub limit: Option<i64>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        self.category.map_or(true, |c| listing.category == c)
            && self.rent_type.map_or(true, |r| listing.rent_type == r)
            && self.furnished.map_or(true, |f| listing.furnished == f)
            && self.min_price.map_or(true, |min| listing.price >= min)
            && self.max_price.map_or(true, |max| listing.price <= max)
            && self.owner_id.map_or(true, |o| listing.owner_id == o)
            && self.status.map_or(true, |s| listing.status == s)
    }
}
