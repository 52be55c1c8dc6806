//! Geographic location value object.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use topo_core::{FieldPath, IssueKind, Issues};

/// Geographic position in decimal degrees, kept as strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// -90.0 to 90.0, positive is north.
    pub latitude: String,
    /// -180.0 to 180.0, positive is east.
    pub longitude: String,
}

impl Location {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self { latitude: latitude.into(), longitude: longitude.into() }
    }

    pub fn validate(&self, path: &FieldPath, issues: &mut Issues) {
        check_degrees(&self.latitude, 90.0, &path.key("latitude"), issues);
        check_degrees(&self.longitude, 180.0, &path.key("longitude"), issues);
    }

    /// `(latitude, longitude)` when both parse and are in range.
    pub fn degrees(&self) -> Option<(f64, f64)> {
        let lat = parse_degrees(&self.latitude)?;
        let lon = parse_degrees(&self.longitude)?;
        (lat.abs() <= 90.0 && lon.abs() <= 180.0).then_some((lat, lon))
    }
}

fn parse_degrees(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn check_degrees(raw: &str, bound: f64, loc: &FieldPath, issues: &mut Issues) {
    match parse_degrees(raw) {
        None => issues.push(loc.clone(), IssueKind::ValueError, format!("{:?} is not a decimal degree value", raw)),
        Some(v) if v < -bound => issues.push(loc.clone(), IssueKind::GreaterThanEqual, format!("ensure this value is greater than or equal to {}", -bound)),
        Some(v) if v > bound => issues.push(loc.clone(), IssueKind::LessThanEqual, format!("ensure this value is less than or equal to {}", bound)),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues_for(loc: &Location) -> Vec<(String, IssueKind)> {
        let mut issues = Issues::new();
        loc.validate(&FieldPath::from_dotted("spec.location"), &mut issues);
        issues.into_errors().iter().map(|e| (e.loc.to_string(), e.kind)).collect()
    }

    #[test]
    fn accepts_range_bounds() {
        assert!(issues_for(&Location::new("-90", "180.0")).is_empty());
        assert_eq!(Location::new(" 51.05 ", "3.72").degrees(), Some((51.05, 3.72)));
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert_eq!(
            issues_for(&Location::new("90.5", "-180.1")),
            vec![
                ("spec.location.latitude".to_string(), IssueKind::LessThanEqual),
                ("spec.location.longitude".to_string(), IssueKind::GreaterThanEqual),
            ]
        );
        assert_eq!(
            issues_for(&Location::new("north", "NaN")),
            vec![
                ("spec.location.latitude".to_string(), IssueKind::ValueError),
                ("spec.location.longitude".to_string(), IssueKind::ValueError),
            ]
        );
        assert_eq!(Location::new("91", "0").degrees(), None);
    }
}
