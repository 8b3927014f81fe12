//! Multipart listing forms.
//!
//! Browsers and API clients submit the same listing in several shapes: tags
//! repeated, `[]`-suffixed or as a JSON array string; the location as a JSON
//! string or as flattened `location[city]` keys. Everything is normalized here
//! so the rest of the pipeline only sees typed values.

use axum::extract::Multipart;
use serde::de::DeserializeOwned;

use super::IncomingFile;
use crate::error::{AppError, Result};
use crate::models::listing::{Category, Coordinates, ListingDraft, Location, NearbyPlace, RentType};

const IMAGE_FIELDS: [&str; 2] = ["images", "images[]"];

/// Text fields in submission order.
#[derive(Debug, Default, Clone)]
pub struct FormFields {
    values: Vec<(String, String)>,
}

impl FormFields {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.push((name.into(), value.into()));
    }

    /// First non-blank value for `name`, trimmed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    /// Whether `name` was submitted at all, in any list form.
    pub fn has(&self, name: &str) -> bool {
        let suffixed = format!("{name}[]");
        self.values.iter().any(|(key, _)| key == name || *key == suffixed)
    }

    /// Every value submitted for `name` or `name[]`, with JSON array strings expanded.
    pub fn list(&self, name: &str) -> Vec<String> {
        let suffixed = format!("{name}[]");
        let mut out = Vec::new();

        for (_, raw) in self.values.iter().filter(|(key, _)| key == name || *key == suffixed) {
            let raw = raw.trim();
            if raw.starts_with('[') {
                if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
                    out.extend(items.into_iter().map(|s| s.trim().to_string()));
                    continue;
                }
            }
            out.push(raw.to_string());
        }

        out.retain(|item| !item.is_empty());
        out
    }

    /// Values for `prefix[key]` fields, keyed by the bracketed part.
    fn nested(&self, prefix: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
        let open = format!("{prefix}[");
        self.values.iter().filter_map(move |(key, value)| {
            key.strip_prefix(open.as_str())
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|inner| (inner, value.trim()))
        })
    }
}

/// A parsed multipart listing submission.
#[derive(Debug, Default)]
pub struct ListingForm {
    pub fields: FormFields,
    pub files: Vec<IncomingFile>,
}

/// Drain a multipart body, enforcing file count and size limits while reading.
///
/// Empty file parts (a file input left blank) are skipped.
pub async fn read_listing_form(
    mut multipart: Multipart,
    max_files: usize,
    max_file_size: usize,
) -> Result<ListingForm> {
    let mut form = ListingForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if !IMAGE_FIELDS.contains(&name.as_str()) {
            let value = field.text().await?;
            form.fields.push(name, value);
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > max_file_size {
                return Err(AppError::too_large(format!(
                    "File too large. Maximum size is {max_file_size} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            continue;
        }
        if form.files.len() == max_files {
            return Err(AppError::too_large(format!("Too many files. Maximum is {max_files}")));
        }

        form.files.push(IncomingFile {
            file_name,
            content_type,
            bytes: bytes.into(),
        });
    }

    Ok(form)
}

/// Listing fields as submitted. `None` means the field was absent.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub location: Option<Location>,
    pub category: Option<Category>,
    pub rent_type: Option<RentType>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area: Option<f64>,
    pub furnished: Option<bool>,
    pub available: Option<bool>,
    pub amenities: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub nearby_places: Option<Vec<NearbyPlace>>,
}

impl ListingInput {
    pub fn from_fields(fields: &FormFields) -> Result<Self> {
        Ok(Self {
            title: fields.get("title").map(str::to_owned),
            description: fields.get("description").map(str::to_owned),
            price: parse_amount(fields, "price")?,
            location: parse_location(fields)?,
            category: parse_with(fields, "category", |raw| raw.parse())?,
            rent_type: parse_with(fields, "rentType", |raw| raw.parse())?,
            bedrooms: parse_number(fields, "bedrooms")?,
            bathrooms: parse_number(fields, "bathrooms")?,
            area: parse_amount(fields, "area")?,
            furnished: parse_with(fields, "furnished", parse_bool)?,
            available: parse_with(fields, "available", parse_bool)?,
            amenities: fields.has("amenities").then(|| fields.list("amenities")),
            features: fields.has("features").then(|| fields.list("features")),
            nearby_places: match fields.get("nearbyPlaces") {
                Some(raw) => Some(parse_json(raw, "nearbyPlaces")?),
                None => None,
            },
        })
    }

    /// Build a full draft for creation. Missing required fields are validation errors.
    pub fn into_draft(self) -> Result<ListingDraft> {
        let draft = ListingDraft {
            title: required(self.title, "title")?,
            description: required(self.description, "description")?,
            price: required(self.price, "price")?,
            location: required(self.location, "location")?,
            category: required(self.category, "category")?,
            rent_type: self.rent_type.unwrap_or_default(),
            bedrooms: required(self.bedrooms, "bedrooms")?,
            bathrooms: required(self.bathrooms, "bathrooms")?,
            area: required(self.area, "area")?,
            furnished: self.furnished.unwrap_or(false),
            available: self.available.unwrap_or(true),
            amenities: self.amenities.unwrap_or_default(),
            features: self.features.unwrap_or_default(),
            nearby_places: self.nearby_places.unwrap_or_default(),
        };
        validator::Validate::validate(&draft)?;
        Ok(draft)
    }

    /// Overlay submitted fields on an existing draft and validate the result.
    pub fn merge_into(self, mut draft: ListingDraft) -> Result<ListingDraft> {
        macro_rules! overlay {
            ($input:ident, $draft:ident; $($field:ident),*) => {
                $(if let Some(value) = $input.$field { $draft.$field = value; })*
            };
        }
        let input = self;
        overlay!(
            input, draft;
            title, description, price, location, category, rent_type, bedrooms, bathrooms, area,
            furnished, available, amenities, features, nearby_places
        );
        validator::Validate::validate(&draft)?;
        Ok(draft)
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::validation(format!("{field} is required")))
}

fn parse_with<T>(
    fields: &FormFields,
    name: &str,
    parse: impl Fn(&str) -> std::result::Result<T, String>,
) -> Result<Option<T>> {
    fields
        .get(name)
        .map(|raw| parse(raw).map_err(|e| AppError::validation(format!("{name}: {e}"))))
        .transpose()
}

fn parse_number<T: std::str::FromStr>(fields: &FormFields, name: &str) -> Result<Option<T>> {
    parse_with(fields, name, |raw| {
        raw.parse::<T>().map_err(|_| format!("`{raw}` is not a valid number"))
    })
}

/// Like `parse_number`, but NaN and infinities are rejected.
fn parse_amount(fields: &FormFields, name: &str) -> Result<Option<f64>> {
    parse_with(fields, name, |raw| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("`{raw}` is not a valid number"))
    })
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        other => Err(format!("`{other}` is not a boolean")),
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str, name: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| AppError::validation(format!("{name}: malformed JSON ({e})")))
}

fn parse_location(fields: &FormFields) -> Result<Option<Location>> {
    if let Some(raw) = fields.get("location") {
        return parse_json(raw, "location").map(Some);
    }

    let mut location = Location {
        address: String::new(),
        area: String::new(),
        city: String::new(),
        state: String::new(),
        pin_code: String::new(),
        landmark: None,
        coordinates: None,
    };
    let (mut lat, mut lng) = (None, None);
    let mut seen = false;

    for (key, value) in fields.nested("location") {
        seen = true;
        match key {
            "address" => location.address = value.to_string(),
            "area" => location.area = value.to_string(),
            "city" => location.city = value.to_string(),
            "state" => location.state = value.to_string(),
            "pinCode" => location.pin_code = value.to_string(),
            "landmark" if !value.is_empty() => location.landmark = Some(value.to_string()),
            "coordinates][lat" => lat = value.parse::<f64>().ok().filter(|v| v.is_finite()),
            "coordinates][lng" => lng = value.parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => {}
        }
    }

    if let (Some(lat), Some(lng)) = (lat, lng) {
        location.coordinates = Some(Coordinates { lat, lng });
    }
    Ok(seen.then_some(location))
}
