//! Listing search filters.
//!
//! Every active criterion is a predicate over a single hostel; a hostel is kept
//! when all active predicates hold. Inactive criteria (blank text, missing
//! bounds, empty sets) match everything, so the default criteria return the
//! input unchanged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    structs::{Availability, Hostel},
};

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub query: Option<String>,
    pub location: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub amenities: BTreeSet<String>,
    pub availability: BTreeSet<Availability>,
}

/// Raw `?query=..&amenities=a&amenities=b` parameters as they arrive on the URL.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub location: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// One entry per repeated key, taken verbatim.
    pub amenities: Vec<String>,
    /// One entry per repeated key; each may also be comma-separated.
    pub availability: Vec<String>,
}

fn parse_price(key: &str, raw: &str) -> Result<Option<f64>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .map(Some)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {key}: {raw}")))
}

impl SearchParams {
    /// Builds params from raw query pairs.
    ///
    /// HTML checkbox groups repeat their key (`amenities=a&amenities=b`) and
    /// empty number inputs arrive as `price_min=`; both are accepted here.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, AppError> {
        let mut params = SearchParams::default();
        for (key, value) in pairs {
            match key.as_str() {
                "query" => params.query = Some(value),
                "location" => params.location = Some(value),
                "price_min" => params.price_min = parse_price(&key, &value)?,
                "price_max" => params.price_max = parse_price(&key, &value)?,
                "amenities" => params.amenities.push(value),
                "availability" => params.availability.push(value),
                _ => log::debug!("Ignoring unknown search parameter {:?}", key),
            }
        }
        Ok(params)
    }
}

impl TryFrom<SearchParams> for FilterCriteria {
    type Error = AppError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        let availability = params
            .availability
            .iter()
            .flat_map(|raw| raw.split(','))
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .map(|status| status.parse::<Availability>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(AppError::BadRequest)?;
        let amenities = params
            .amenities
            .iter()
            .map(|amenity| amenity.trim())
            .filter(|amenity| !amenity.is_empty())
            .map(str::to_string)
            .collect();

        Ok(FilterCriteria {
            query: params.query,
            location: params.location,
            price_min: params.price_min,
            price_max: params.price_max,
            amenities,
            availability,
        })
    }
}

fn active_text(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        active_text(&self.query).is_none()
            && active_text(&self.location).is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.amenities.is_empty()
            && self.availability.is_empty()
    }

    pub fn matches(&self, hostel: &Hostel) -> bool {
        if let Some(query) = active_text(&self.query) {
            if !hostel.name.to_lowercase().contains(&query)
                && !hostel.location.to_lowercase().contains(&query)
            {
                return false;
            }
        }
        if let Some(location) = active_text(&self.location) {
            if !hostel.location.to_lowercase().contains(&location) {
                return false;
            }
        }

        let price = hostel.price();
        if self.price_min.is_some_and(|min| price < min) {
            return false;
        }
        if self.price_max.is_some_and(|max| price > max) {
            return false;
        }

        if !self
            .amenities
            .iter()
            .all(|amenity| hostel.amenities.contains(amenity))
        {
            return false;
        }

        self.availability.is_empty() || self.availability.contains(&hostel.availability)
    }
}

/// Keeps the hostels matching every active criterion, in their original order.
pub fn apply(hostels: &[Hostel], criteria: &FilterCriteria) -> Vec<Hostel> {
    if criteria.is_empty() {
        return hostels.to_vec();
    }
    hostels
        .iter()
        .filter(|hostel| criteria.matches(hostel))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hostel(id: &str, name: &str, location: &str, price: f64, amenities: &[&str]) -> Hostel {
        Hostel {
            id: id.to_string(),
            owner_id: "owner".to_string(),
            name: name.to_string(),
            location: location.to_string(),
            address: String::new(),
            postal_code: String::new(),
            price_min: price,
            price_max: price + 50.0,
            currency: "GHS".to_string(),
            max_capacity: 10,
            description: String::new(),
            amenities: amenities.iter().map(|a| a.to_string()).collect(),
            availability: Availability::Available,
            phone: None,
            email: "x@example.com".to_string(),
            website: None,
            created_at: String::new(),
            updated_at: String::new(),
            cover_image: None,
            images: Vec::new(),
        }
    }

    fn fixtures() -> Vec<Hostel> {
        let mut limited = hostel("2", "Urban Oasis Hostel", "Kumasi, Ghana", 200.0, &["Free WiFi", "Bar"]);
        limited.availability = Availability::Limited;
        let mut closed = hostel("4", "City Central Hostel", "Accra, Ghana", 130.0, &["Kitchen"]);
        closed.availability = Availability::Unavailable;
        vec![
            hostel("1", "Backpackers Paradise", "Accra, Ghana", 150.0, &["Free WiFi", "Kitchen", "Lockers"]),
            limited,
            hostel("3", "Beachfront Bungalows", "Cape Coast, Ghana", 180.0, &["Free WiFi", "Pool"]),
            closed,
            hostel("6", "Nomad's Hub", "Tamale, Ghana", 120.0, &["Free WiFi", "Kitchen"]),
        ]
    }

    fn ids(hostels: &[Hostel]) -> Vec<&str> {
        hostels.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn empty_criteria_is_identity() {
        let all = fixtures();
        assert_eq!(apply(&all, &FilterCriteria::default()), all);

        let blank = FilterCriteria {
            query: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(apply(&all, &blank), all);
    }

    #[test]
    fn price_range_is_inclusive() {
        let all = vec![
            hostel("a", "A", "X", 120.0, &[]),
            hostel("b", "B", "X", 150.0, &[]),
            hostel("c", "C", "X", 220.0, &[]),
        ];
        let criteria = FilterCriteria {
            price_min: Some(100.0),
            price_max: Some(200.0),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&all, &criteria)), vec!["a", "b"]);

        let edge = FilterCriteria {
            price_min: Some(150.0),
            price_max: Some(220.0),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&all, &edge)), vec!["b", "c"]);
    }

    #[test]
    fn query_matches_name_or_location_case_insensitively() {
        let all = fixtures();
        let criteria = FilterCriteria {
            query: Some("accra".into()),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&all, &criteria)), vec!["1", "4"]);

        let by_name = FilterCriteria {
            query: Some("OASIS".into()),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&all, &by_name)), vec!["2"]);
    }

    #[test]
    fn location_filter_ignores_name() {
        let all = fixtures();
        let criteria = FilterCriteria {
            location: Some("paradise".into()),
            ..Default::default()
        };
        assert!(apply(&all, &criteria).is_empty());
    }

    #[test]
    fn amenities_use_and_semantics() {
        let all = fixtures();
        let criteria = FilterCriteria {
            amenities: ["Free WiFi".to_string(), "Kitchen".to_string()].into(),
            ..Default::default()
        };
        let result = apply(&all, &criteria);
        assert_eq!(ids(&result), vec!["1", "6"]);
        for h in &result {
            assert!(criteria.amenities.iter().all(|a| h.amenities.contains(a)));
        }
    }

    #[test]
    fn availability_is_set_membership() {
        let all = fixtures();
        let criteria = FilterCriteria {
            availability: [Availability::Available, Availability::Limited].into(),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&all, &criteria)), vec!["1", "2", "3", "6"]);
    }

    #[test]
    fn combined_filters_are_subset_and_idempotent() {
        let all = fixtures();
        let criteria = FilterCriteria {
            query: Some("ghana".into()),
            price_min: Some(125.0),
            price_max: Some(190.0),
            amenities: ["Free WiFi".to_string()].into(),
            availability: [Availability::Available].into(),
            ..Default::default()
        };
        let once = apply(&all, &criteria);
        assert_eq!(ids(&once), vec!["1", "3"]);
        assert!(once.iter().all(|h| all.contains(h)));
        assert_eq!(apply(&once, &criteria), once);
    }

    #[test]
    fn params_parse_sets() {
        let params = SearchParams {
            amenities: vec![" Free WiFi".into(), "Kitchen".into(), "".into()],
            availability: vec!["available,limited".into()],
            ..Default::default()
        };
        let criteria = FilterCriteria::try_from(params).unwrap();
        assert_eq!(criteria.amenities.len(), 2);
        assert!(criteria.amenities.contains("Free WiFi"));
        assert!(criteria.availability.contains(&Availability::Limited));

        let bad = SearchParams {
            availability: vec!["sometimes".into()],
            ..Default::default()
        };
        assert!(FilterCriteria::try_from(bad).is_err());
    }

    #[test]
    fn pairs_merge_repeated_keys_and_skip_blank_prices() {
        let pairs = vec![
            ("query".to_string(), "accra".to_string()),
            ("price_min".to_string(), "".to_string()),
            ("price_max".to_string(), "200".to_string()),
            ("amenities".to_string(), "Free WiFi".to_string()),
            ("amenities".to_string(), "Kitchen".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        let params = SearchParams::from_pairs(pairs).unwrap();
        assert_eq!(params.price_min, None);
        assert_eq!(params.price_max, Some(200.0));
        assert_eq!(params.amenities, vec!["Free WiFi", "Kitchen"]);

        let bad = vec![("price_min".to_string(), "cheap".to_string())];
        assert!(SearchParams::from_pairs(bad).is_err());
    }

    #[test]
    fn amenity_with_comma_still_matches() {
        let all = vec![hostel("1", "Harbour House", "Accra", 90.0, &["Bar, Cafe", "Kitchen"])];
        let pairs = vec![
            ("amenities".to_string(), "Bar, Cafe".to_string()),
            ("amenities".to_string(), "Kitchen".to_string()),
        ];
        let params = SearchParams::from_pairs(pairs).unwrap();
        let criteria = FilterCriteria::try_from(params).unwrap();
        assert_eq!(criteria.amenities.len(), 2);
        assert_eq!(ids(&apply(&all, &criteria)), vec!["1"]);
    }
}
