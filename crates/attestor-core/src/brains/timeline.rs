//! Timeline and geolocation consistency.
//!
//! Orders GPS-and-timestamp-tagged evidence by capture time and checks the
//! implied travel speed between consecutive items. Speeds above the
//! configured threshold (default 1000 km/h) are physically implausible for
//! a single capture device and reported as Critical. Capture timestamps
//! after ingestion are reported as Medium.

use crate::brain::Brain;
use crate::types::{EvidenceRecord, Finding, GeoPoint, MetaValue, ModuleResult, Severity};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Brain checking capture-time ordering and travel plausibility.
#[derive(Debug)]
pub struct TimelineBrain {
    max_speed_kmh: f64,
}

impl TimelineBrain {
    /// Create the brain with an impossible-travel threshold in km/h.
    #[must_use]
    pub fn new(max_speed_kmh: f64) -> Self {
        Self { max_speed_kmh }
    }
}

/// (capture time seconds, location) for records that carry both.
fn capture_point(record: &EvidenceRecord) -> Option<(f64, GeoPoint)> {
    let ts = record.metadata.get("exif.timestamp")?.as_number()?;
    let lat = record.metadata.get("exif.gps.lat")?.as_number()?;
    let lon = record.metadata.get("exif.gps.lon")?.as_number()?;
    Some((ts, GeoPoint { lat, lon }))
}

/// Great-circle distance between two points in kilometers.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

impl Brain for TimelineBrain {
    fn name(&self) -> &'static str {
        "timeline"
    }

    fn analyze(&self, evidence: &[EvidenceRecord]) -> ModuleResult {
        let started = std::time::Instant::now();
        if evidence.is_empty() {
            return super::no_evidence_result(self.name(), started);
        }

        let mut findings = Vec::new();

        // Future capture timestamps relative to ingestion.
        for record in evidence {
            if let Some(ts) = record.metadata.get("exif.timestamp").and_then(MetaValue::as_number)
            {
                let ingested_s = record.ingested_at_ms as f64 / 1000.0;
                if ts > ingested_s {
                    findings.push(
                        Finding::new(
                            Severity::Medium,
                            "timeline-geolocation",
                            format!("evidence {} captured after its own ingestion", record.id.0),
                            0.9,
                        )
                        .with_detail("evidence_id", record.id.0)
                        .with_detail("capture_ts", ts),
                    );
                }
            }
        }

        // Impossible travel between consecutive located captures.
        let mut points: Vec<(u64, f64, GeoPoint)> = evidence
            .iter()
            .filter_map(|r| capture_point(r).map(|(ts, p)| (r.id.0, ts, p)))
            .collect();
        points.sort_by(|a, b| a.1.total_cmp(&b.1));

        for pair in points.windows(2) {
            let (id_a, ts_a, loc_a) = pair[0];
            let (id_b, ts_b, loc_b) = pair[1];
            let dt_h = (ts_b - ts_a) / 3600.0;
            if dt_h <= 0.0 {
                continue;
            }
            let speed = haversine_km(loc_a, loc_b) / dt_h;
            if speed > self.max_speed_kmh {
                findings.push(
                    Finding::new(
                        Severity::Critical,
                        "timeline-geolocation",
                        format!(
                            "impossible travel between evidence {id_a} and {id_b}: {speed:.0} km/h"
                        ),
                        0.95,
                    )
                    .with_detail("speed_kmh", speed)
                    .with_detail("threshold_kmh", self.max_speed_kmh),
                );
            }
        }

        let usable = points.len();
        let confidence = if findings.iter().any(|f| f.severity == Severity::Critical) {
            0.2
        } else if usable < 2 {
            // Nothing to cross-check; weak but not suspicious.
            0.6
        } else {
            0.95 - 0.1 * findings.len() as f64
        };

        ModuleResult::new(
            self.name(),
            confidence.clamp(0.0, 1.0),
            findings,
            super::elapsed_ms(started),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceId, EvidenceKind, now_ms};
    use std::collections::BTreeMap;

    fn located(id: u64, ts: f64, lat: f64, lon: f64) -> EvidenceRecord {
        let mut metadata = BTreeMap::new();
        metadata.insert("exif.timestamp".to_string(), MetaValue::Number(ts));
        metadata.insert("exif.gps.lat".to_string(), MetaValue::Number(lat));
        metadata.insert("exif.gps.lon".to_string(), MetaValue::Number(lon));
        EvidenceRecord {
            id: EvidenceId(id),
            kind: EvidenceKind::Image,
            source: format!("{id}.jpg"),
            declared_size: 1,
            ingested_at_ms: now_ms(),
            metadata,
        }
    }

    #[test]
    fn haversine_known_distance() {
        // Paris to London is roughly 344 km.
        let paris = GeoPoint { lat: 48.8566, lon: 2.3522 };
        let london = GeoPoint { lat: 51.5074, lon: -0.1278 };
        let d = haversine_km(paris, london);
        assert!((330.0..360.0).contains(&d), "got {d}");
    }

    #[test]
    fn impossible_travel_is_critical() {
        // Paris and Tokyo one minute apart.
        let a = located(0, 1_000_000.0, 48.8566, 2.3522);
        let b = located(1, 1_000_060.0, 35.6762, 139.6503);
        let result = TimelineBrain::new(1000.0).analyze(&[a, b]);
        assert!(result.has_critical());
        assert!(result.confidence <= 0.2);
    }

    #[test]
    fn plausible_travel_passes() {
        // Paris and London twelve hours apart: well under 1000 km/h.
        let a = located(0, 0.0, 48.8566, 2.3522);
        let b = located(1, 12.0 * 3600.0, 51.5074, -0.1278);
        let result = TimelineBrain::new(1000.0).analyze(&[a, b]);
        assert!(!result.has_critical());
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn future_capture_is_flagged() {
        let mut record = located(0, 0.0, 0.0, 0.0);
        let future_s = (record.ingested_at_ms as f64 / 1000.0) + 86_400.0;
        record
            .metadata
            .insert("exif.timestamp".to_string(), MetaValue::Number(future_s));
        let result = TimelineBrain::new(1000.0).analyze(&[record]);
        assert!(result.findings.iter().any(|f| f.severity == Severity::Medium));
    }

    #[test]
    fn threshold_is_configurable() {
        // 600 km in one hour: fine at 1000 km/h, flagged at 500.
        let a = located(0, 0.0, 48.8566, 2.3522);
        let b = located(1, 3600.0, 44.8378, -0.5792); // Paris -> Bordeaux ~500 km
        let strict = TimelineBrain::new(100.0).analyze(&[a.clone(), b.clone()]);
        let lax = TimelineBrain::new(1000.0).analyze(&[a, b]);
        assert!(strict.has_critical());
        assert!(!lax.has_critical());
    }
}
