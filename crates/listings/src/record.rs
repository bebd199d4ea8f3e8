use foundation::geo::LngLat;
use serde::{Deserialize, Serialize};

/// Attribution link shown on a listing badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub name: String,
    pub url: String,
}

/// A listing as delivered by the data backend.
///
/// Everything except `id` may be missing; coordinates are checked by the
/// projector, not here.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainRecord {
    pub id: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub county: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<u32>,
    pub address: Option<String>,
    pub url: Option<String>,
    pub images: Vec<String>,
    pub sources: Option<Vec<SourceLink>>,
    pub eircode: Option<String>,
    pub town: Option<String>,
    pub size_sqm: Option<f64>,
}

/// The indexable projection of one [`DomainRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointFeature {
    pub id: String,
    pub lng: f64,
    pub lat: f64,
    /// Zero when the record carries no price.
    pub price: f64,
    pub title: Option<String>,
    pub beds: Option<u32>,
    pub baths: Option<u32>,
    pub county: Option<String>,
    pub address: Option<String>,
    pub url: Option<String>,
    pub eircode: Option<String>,
    pub town: Option<String>,
    pub size_sqm: Option<f64>,
    pub image_url: Option<String>,
    pub source_links: Vec<SourceLink>,
}

impl PointFeature {
    pub fn at(&self) -> LngLat {
        LngLat::new(self.lng, self.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::DomainRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_and_null_fields_deserialize() {
        let json = r#"{
            "id": "abc",
            "lat": 53.35,
            "lng": null,
            "sizeSqm": 92.5,
            "images": ["a.jpg", "b.jpg"]
        }"#;
        let r: DomainRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.id, "abc");
        assert_eq!(r.lat, Some(53.35));
        assert_eq!(r.lng, None);
        assert_eq!(r.size_sqm, Some(92.5));
        assert_eq!(r.images.len(), 2);
        assert!(r.sources.is_none());
    }
}
