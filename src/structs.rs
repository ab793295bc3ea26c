use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Shown on cards when a hostel has no images yet.
pub const PLACEHOLDER_IMAGE: &str = "https://images.unsplash.com/photo-1566073771259-6a8506099945?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80";

pub const MAX_IMAGES_PER_CATEGORY: usize = 3;

pub const DEFAULT_CURRENCY: &str = "GHS";

pub const CURRENCIES: [(&str, &str); 10] = [
    ("USD", "$"),
    ("GHS", "₵"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CAD", "C$"),
    ("AUD", "A$"),
    ("ZAR", "R"),
    ("NGN", "₦"),
    ("KES", "KSh"),
];

pub fn currency_symbol(code: &str) -> &'static str {
    CURRENCIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, symbol)| *symbol)
        .unwrap_or("")
}

pub const AMENITIES: [&str; 15] = [
    "Free WiFi",
    "Breakfast Included",
    "Kitchen",
    "Laundry",
    "Private Rooms",
    "24/7 Reception",
    "Lockers",
    "Air Conditioning",
    "Bike Rental",
    "Bar/Cafe",
    "Tours/Activities",
    "Outdoor Area",
    "Shuttle Service",
    "Laundry Service",
    "24/7 Security",
];

#[derive(
    Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Available,
    Limited,
    Unavailable,
}

impl Availability {
    pub const ALL: [Availability; 3] = [
        Availability::Available,
        Availability::Limited,
        Availability::Unavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Limited => "limited",
            Availability::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(Availability::Available),
            "limited" => Ok(Availability::Limited),
            "unavailable" => Ok(Availability::Unavailable),
            other => Err(format!("Unknown availability: {other}")),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum ImageCategory {
    Exterior,
    CommonArea,
    Bedroom,
    Bathroom,
}

impl ImageCategory {
    pub const ALL: [ImageCategory; 4] = [
        ImageCategory::Exterior,
        ImageCategory::CommonArea,
        ImageCategory::Bedroom,
        ImageCategory::Bathroom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageCategory::Exterior => "exterior",
            ImageCategory::CommonArea => "commonArea",
            ImageCategory::Bedroom => "bedroom",
            ImageCategory::Bathroom => "bathroom",
        }
    }

    /// Name of the file input carrying this category in the listing form.
    pub fn form_field(&self) -> &'static str {
        match self {
            ImageCategory::Exterior => "exterior",
            ImageCategory::CommonArea => "common_area",
            ImageCategory::Bedroom => "bedroom",
            ImageCategory::Bathroom => "bathroom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImageCategory::Exterior => "Exterior",
            ImageCategory::CommonArea => "Common area",
            ImageCategory::Bedroom => "Bedroom",
            ImageCategory::Bathroom => "Bathroom",
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Hostel {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub location: String,
    pub address: String,
    pub postal_code: String,
    pub price_min: f64,
    pub price_max: f64,
    pub currency: String,
    pub max_capacity: i64,
    pub description: String,
    #[sqlx(json)]
    pub amenities: Vec<String>,
    pub availability: Availability,
    pub phone: Option<String>,
    pub email: String,
    pub website: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// First exterior image, else the first image of any kind.
    pub cover_image: Option<String>,
    #[sqlx(skip)]
    pub images: Vec<HostelImage>,
}

impl Hostel {
    /// Price shown on cards and used by the price filter.
    pub fn price(&self) -> f64 {
        self.price_min
    }

    pub fn image(&self) -> &str {
        self.cover_image.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }

    pub fn images_of(&self, category: ImageCategory) -> Vec<&str> {
        self.images
            .iter()
            .filter(|img| img.image_type == category)
            .map(|img| img.image_url.as_str())
            .collect()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct HostelImage {
    pub id: i64,
    pub hostel_id: String,
    pub image_url: String,
    pub image_type: ImageCategory,
    pub created_at: String,
}

/// Image that made it to the pinning service and still needs a row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub image_url: String,
    pub image_type: ImageCategory,
}

/// Validated listing fields, as written by create and update.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct HostelInput {
    pub name: String,
    pub location: String,
    pub address: String,
    pub postal_code: String,
    pub price_min: f64,
    pub price_max: f64,
    pub currency: String,
    pub max_capacity: i64,
    pub description: String,
    pub amenities: Vec<String>,
    #[serde(default)]
    pub availability: Availability,
    pub phone: Option<String>,
    pub email: String,
    pub website: Option<String>,
}

impl HostelInput {
    pub fn validate(&mut self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("location", &self.location),
            ("address", &self.address),
            ("postalCode", &self.postal_code),
            ("description", &self.description),
            ("email", &self.email),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Please fill in the following fields: {}",
                missing.join(", ")
            ));
        }
        if !self.email.contains('@') {
            return Err("Invalid email address".to_string());
        }
        if !self.price_min.is_finite() || !self.price_max.is_finite() || self.price_min < 0.0 {
            return Err("Prices must be non-negative numbers".to_string());
        }
        if self.price_min > self.price_max {
            return Err("Minimum price must not exceed maximum price".to_string());
        }
        if self.max_capacity < 1 {
            return Err("Maximum capacity must be at least 1".to_string());
        }
        self.currency = self.currency.trim().to_uppercase();
        if !CURRENCIES.iter().any(|(code, _)| *code == self.currency) {
            return Err(format!("Unsupported currency: {}", self.currency));
        }

        let mut seen = Vec::with_capacity(self.amenities.len());
        for amenity in self.amenities.drain(..) {
            let amenity = amenity.trim().to_string();
            if !amenity.is_empty() && !seen.contains(&amenity) {
                seen.push(amenity);
            }
        }
        self.amenities = seen;

        self.phone = self.phone.take().filter(|p| !p.trim().is_empty());
        self.website = self
            .website
            .take()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());
        if let Some(website) = &self.website {
            let scheme = reqwest::Url::parse(website).map(|url| url.scheme().to_string());
            if !matches!(scheme.as_deref(), Ok("http" | "https")) {
                return Err("Website must be an http or https address".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct OwnerHostelStat {
    pub id: String,
    pub name: String,
    pub location: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> HostelInput {
        HostelInput {
            name: "Backpackers Paradise".into(),
            location: "Accra, Ghana".into(),
            address: "12 Oxford Street".into(),
            postal_code: "GA-123".into(),
            price_min: 100.0,
            price_max: 150.0,
            currency: "ghs".into(),
            max_capacity: 20,
            description: "Close to the beach".into(),
            amenities: vec!["Kitchen".into(), " Kitchen ".into(), "Free WiFi".into(), "".into()],
            availability: Availability::Available,
            phone: Some("  ".into()),
            email: "stay@example.com".into(),
            website: None,
        }
    }

    #[test]
    fn validate_normalises_fields() {
        let mut form = input();
        form.validate().unwrap();
        assert_eq!(form.currency, "GHS");
        assert_eq!(form.amenities, vec!["Kitchen", "Free WiFi"]);
        assert_eq!(form.phone, None);
    }

    #[test]
    fn validate_lists_missing_fields() {
        let mut form = input();
        form.name = " ".into();
        form.email.clear();
        let err = form.validate().unwrap_err();
        assert_eq!(err, "Please fill in the following fields: name, email");
    }

    #[test]
    fn validate_rejects_inverted_price_range() {
        let mut form = input();
        form.price_min = 200.0;
        assert!(form.validate().is_err());
    }

    #[test]
    fn validate_only_accepts_web_links() {
        let mut form = input();
        form.website = Some("javascript:alert(document.cookie)".into());
        assert!(form.validate().is_err());

        let mut form = input();
        form.website = Some("data:text/html,<script>alert(1)</script>".into());
        assert!(form.validate().is_err());

        let mut form = input();
        form.website = Some(" https://paradise.example.com ".into());
        form.validate().unwrap();
        assert_eq!(form.website.as_deref(), Some("https://paradise.example.com"));
    }

    #[test]
    fn availability_defaults_to_available() {
        let json = r#"{"name":"a","location":"b","address":"c","postal_code":"d","price_min":1,
            "price_max":2,"currency":"USD","max_capacity":1,"description":"e","amenities":[],
            "phone":null,"email":"x@y","website":null}"#;
        let form: HostelInput = serde_json::from_str(json).unwrap();
        assert_eq!(form.availability, Availability::Available);
        assert_eq!("Limited".parse::<Availability>(), Ok(Availability::Limited));
        assert!("soon".parse::<Availability>().is_err());
    }
}
