use std::rc::Rc;

use foundation::geo::LngLat;
use tracing::debug;

use crate::county::CountyTable;
use crate::record::{DomainRecord, PointFeature, SourceLink};
use crate::source::source_label;

/// Upper bound on attribution links carried per point.
pub const MAX_SOURCE_LINKS: usize = 8;

/// Label used when a primary URL has no readable host.
const FALLBACK_SOURCE_NAME: &str = "Source";

/// Turns backend records into indexable point features.
///
/// Records without finite, in-range coordinates are dropped here so nothing
/// downstream has to re-check them.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    counties: Rc<CountyTable>,
}

impl Projector {
    pub fn new(counties: Rc<CountyTable>) -> Self {
        Self { counties }
    }

    pub fn counties(&self) -> &CountyTable {
        &self.counties
    }

    pub fn project(&self, records: &[DomainRecord]) -> Vec<PointFeature> {
        let out: Vec<PointFeature> = records.iter().filter_map(|r| self.project_one(r)).collect();
        let rejected = records.len() - out.len();
        if rejected > 0 {
            debug!(rejected, kept = out.len(), "records without usable coordinates");
        }
        out
    }

    pub fn project_one(&self, record: &DomainRecord) -> Option<PointFeature> {
        let at = LngLat::new(record.lng?, record.lat?);
        if !at.is_valid() {
            return None;
        }

        let county = non_blank(record.county.as_deref())
            .map(str::to_string)
            .or_else(|| {
                let code = non_blank(record.eircode.as_deref())?;
                self.counties.county_for(code).map(str::to_string)
            });

        Some(PointFeature {
            id: record.id.clone(),
            lng: at.lng,
            lat: at.lat,
            price: record.price.filter(|p| p.is_finite()).unwrap_or(0.0),
            title: record.title.clone(),
            beds: record.beds,
            baths: record.baths,
            county,
            address: record.address.clone(),
            url: record.url.clone(),
            eircode: record.eircode.clone(),
            town: record.town.clone(),
            size_sqm: record.size_sqm,
            image_url: record.images.first().cloned(),
            source_links: source_links(record),
        })
    }
}

/// Explicit sources win; otherwise one link derived from the primary URL.
fn source_links(record: &DomainRecord) -> Vec<SourceLink> {
    if let Some(sources) = record.sources.as_ref().filter(|s| !s.is_empty()) {
        return sources.iter().take(MAX_SOURCE_LINKS).cloned().collect();
    }
    match non_blank(record.url.as_deref()) {
        Some(url) => vec![SourceLink {
            name: source_label(url).unwrap_or_else(|| FALLBACK_SOURCE_NAME.to_string()),
            url: url.to_string(),
        }],
        None => Vec::new(),
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{MAX_SOURCE_LINKS, Projector};
    use crate::county::CountyTable;
    use crate::record::{DomainRecord, SourceLink};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn record(id: &str, lng: f64, lat: f64) -> DomainRecord {
        DomainRecord {
            id: id.to_string(),
            lng: Some(lng),
            lat: Some(lat),
            ..DomainRecord::default()
        }
    }

    #[test]
    fn drops_records_without_usable_coordinates() {
        let mut missing = record("b", 0.0, 0.0);
        missing.lat = None;
        let records = vec![
            record("a", -6.26, 53.35),
            missing,
            record("c", f64::INFINITY, 53.0),
            record("d", -6.0, 91.0),
        ];
        let points = Projector::default().project(&records);
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn optional_fields_default_sensibly() {
        let p = Projector::default()
            .project_one(&record("a", -6.26, 53.35))
            .unwrap();
        assert_eq!(p.price, 0.0);
        assert_eq!(p.title, None);
        assert_eq!(p.image_url, None);
        assert!(p.source_links.is_empty());
    }

    #[test]
    fn first_image_and_derived_source() {
        let mut r = record("a", -6.26, 53.35);
        r.images = vec!["one.jpg".into(), "two.jpg".into()];
        r.url = Some("https://www.sherryfitz.ie/p/1".into());
        let p = Projector::default().project_one(&r).unwrap();
        assert_eq!(p.image_url.as_deref(), Some("one.jpg"));
        assert_eq!(
            p.source_links,
            vec![SourceLink {
                name: "SherryFitz".into(),
                url: "https://www.sherryfitz.ie/p/1".into(),
            }]
        );
    }

    #[test]
    fn explicit_sources_are_capped() {
        let mut r = record("a", -6.26, 53.35);
        r.url = Some("https://ignored.example/".into());
        r.sources = Some(
            (0..12)
                .map(|i| SourceLink {
                    name: format!("s{i}"),
                    url: format!("https://s{i}.example/"),
                })
                .collect(),
        );
        let p = Projector::default().project_one(&r).unwrap();
        assert_eq!(p.source_links.len(), MAX_SOURCE_LINKS);
        assert_eq!(p.source_links[0].name, "s0");
    }

    #[test]
    fn county_falls_back_to_routing_key_table() {
        let mut table = CountyTable::new();
        table.insert("D02", "Dublin");
        let projector = Projector::new(Rc::new(table));

        let mut r = record("a", -6.26, 53.35);
        r.eircode = Some("d02 x285".into());
        assert_eq!(
            projector.project_one(&r).unwrap().county.as_deref(),
            Some("Dublin")
        );

        r.county = Some("Wicklow".into());
        assert_eq!(
            projector.project_one(&r).unwrap().county.as_deref(),
            Some("Wicklow")
        );
    }
}
