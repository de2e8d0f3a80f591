use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::MalformedItem;

/// Item type tag that marks extraction candidates. Everything else in the
/// payload (ads, collections, toponyms) is ignored upstream.
pub const BUSINESS_TYPE: &str = "business";

/// One entry of a captured payload's item sequence, as the search API
/// serves it. Fields the map UI populates lazily are all optional;
/// `ratingData`, `phones` and friends are kept as raw JSON so nothing is
/// lost between capture and persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    #[serde(default, rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "ratingData")]
    pub rating_data: Option<Value>,
    pub phones: Option<Value>,
    pub urls: Option<Value>,
    #[serde(rename = "workingTimeText")]
    pub working_time_text: Option<Value>,
    #[serde(rename = "socialLinks")]
    pub social_links: Option<Value>,
    pub metro: Option<Vec<TransitHint>>,
    pub stops: Option<Vec<TransitHint>>,
}

impl RawItem {
    pub fn is_business(&self) -> bool {
        self.kind == BUSINESS_TYPE
    }
}

/// Transit proximity hint as served (`distanceValue` is meters).
#[derive(Debug, Clone, Deserialize)]
pub struct TransitHint {
    pub name: String,
    #[serde(rename = "distanceValue")]
    pub distance_value: Number,
}

/// Canonical output record. Absent source fields stay absent in the
/// serialized output; "no phones listed" and "empty phone list" are
/// different observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessRecord {
    pub title: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phones: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Value>,
    #[serde(rename = "workingTime", skip_serializing_if = "Option::is_none")]
    pub working_time: Option<Value>,
    #[serde(rename = "socialLinks", skip_serializing_if = "Option::is_none")]
    pub social_links: Option<Value>,
    #[serde(
        rename = "nearestMetroStations",
        skip_serializing_if = "Option::is_none"
    )]
    pub nearest_metro_stations: Option<Vec<TransitStop>>,
    #[serde(rename = "nearestBusStops", skip_serializing_if = "Option::is_none")]
    pub nearest_bus_stops: Option<Vec<TransitStop>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitStop {
    pub name: String,
    pub distance: Number,
}

impl TransitStop {
    fn from_hint(hint: &TransitHint) -> Self {
        Self {
            name: hint.name.clone(),
            distance: hint.distance_value.clone(),
        }
    }
}

/// Maps one business-typed raw item to its canonical record.
///
/// `title` and `address` are mandatory; an item without them is reported as
/// [`MalformedItem`] and the caller decides whether to skip or abort.
/// Non-business items must be filtered out before calling this.
pub fn extract(item: &RawItem) -> Result<BusinessRecord, MalformedItem> {
    let title = item
        .title
        .clone()
        .ok_or(MalformedItem { field: "title" })?;
    let address = item
        .address
        .clone()
        .ok_or(MalformedItem { field: "address" })?;

    Ok(BusinessRecord {
        title,
        address,
        rating: item.rating_data.clone(),
        phones: item.phones.clone(),
        urls: item.urls.clone(),
        working_time: item.working_time_text.clone(),
        social_links: item.social_links.clone(),
        nearest_metro_stations: item
            .metro
            .as_ref()
            .map(|hints| hints.iter().map(TransitStop::from_hint).collect()),
        nearest_bus_stops: item
            .stops
            .as_ref()
            .map(|hints| hints.iter().map(TransitStop::from_hint).collect()),
    })
}
