//! Query parameters for the metric data endpoint, built from the selector
//! controls of a metrics panel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label the metric type dropdown shows while nothing is chosen.
pub const METRIC_TYPE_PLACEHOLDER: &str = "Metric Type:";

/// Scan class dropdown. Picking a class limits the scan type checkboxes to
/// that class and resets the metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanClass {
    Fmri,
    Dti,
    T1,
}

impl ScanClass {
    pub fn label(self) -> &'static str {
        match self {
            ScanClass::Fmri => "FMRI",
            ScanClass::Dti => "DTI",
            ScanClass::T1 => "T1",
        }
    }
}

impl fmt::Display for ScanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScanClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FMRI" => Ok(ScanClass::Fmri),
            "DTI" => Ok(ScanClass::Dti),
            "T1" => Ok(ScanClass::T1),
            other => Err(format!("unknown scan class `{other}`")),
        }
    }
}

/// Current state of a panel's selector controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub study: Option<String>,
    pub phantom: Option<String>,
    /// Checked sites, in the order they were checked.
    pub sites: Vec<String>,
    /// Checked scan types, in the order they were checked.
    pub scan_types: Vec<String>,
    /// Metric type dropdown label.
    pub metric_type: Option<String>,
    pub scan_class: Option<ScanClass>,
}

impl Selection {
    pub fn new(study: impl Into<String>, phantom: impl Into<String>) -> Self {
        Self {
            study: Some(study.into()),
            phantom: Some(phantom.into()),
            ..Self::default()
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.toggle_site(site);
        self
    }

    pub fn with_scan_type(mut self, scan_type: impl Into<String>) -> Self {
        self.toggle_scan_type(scan_type);
        self
    }

    pub fn with_metric_type(mut self, metric_type: impl Into<String>) -> Self {
        self.metric_type = Some(metric_type.into());
        self
    }

    /// Check or uncheck a site checkbox.
    pub fn toggle_site(&mut self, site: impl Into<String>) {
        toggle(&mut self.sites, site.into());
    }

    pub fn toggle_scan_type(&mut self, scan_type: impl Into<String>) {
        toggle(&mut self.scan_types, scan_type.into());
    }

    pub fn set_metric_type(&mut self, label: impl Into<String>) {
        self.metric_type = Some(label.into());
    }

    /// Switch scan class. The metric type goes back to the placeholder since
    /// metric types differ per class.
    pub fn set_scan_class(&mut self, class: ScanClass) {
        self.scan_class = Some(class);
        self.metric_type = None;
    }

    /// Metric type unless the dropdown still shows its placeholder.
    fn chosen_metric_type(&self) -> Option<&str> {
        non_blank(self.metric_type.as_deref()).filter(|m| *m != METRIC_TYPE_PLACEHOLDER)
    }
}

fn toggle(list: &mut Vec<String>, item: String) {
    if let Some(pos) = list.iter().position(|s| *s == item) {
        list.remove(pos);
    } else {
        list.push(item);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parameters of one metric data request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub studies: String,
    /// Comma-joined site names.
    pub sites: String,
    /// Comma-joined scan types.
    pub scantypes: String,
    pub metrictypes: String,
    pub isphantom: String,
    /// Ask the server to match sites and types by name rather than id.
    pub byname: String,
}

impl QueryParams {
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("studies", self.studies.as_str()),
            ("sites", self.sites.as_str()),
            ("scantypes", self.scantypes.as_str()),
            ("metrictypes", self.metrictypes.as_str()),
            ("isphantom", self.isphantom.as_str()),
            ("byname", self.byname.as_str()),
        ]
    }

    /// `application/x-www-form-urlencoded` rendering.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

/// Build request parameters, or `None` when a required control is unset.
///
/// Study, phantom flag, at least one site, at least one scan type and a
/// metric type are required. A `None` result means: do not fetch, leave the
/// current chart as it is.
pub fn build_query(selection: &Selection) -> Option<QueryParams> {
    let study = non_blank(selection.study.as_deref())?;
    let phantom = non_blank(selection.phantom.as_deref())?;
    let metric_type = selection.chosen_metric_type()?;
    if selection.sites.is_empty() || selection.scan_types.is_empty() {
        return None;
    }

    Some(QueryParams {
        studies: study.to_string(),
        sites: selection.sites.join(","),
        scantypes: selection.scan_types.join(","),
        metrictypes: metric_type.to_string(),
        isphantom: phantom.to_string(),
        byname: "1".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Selection {
        Selection::new("SPINS", "False")
            .with_site("CMH")
            .with_site("ZHH")
            .with_scan_type("T1")
            .with_scan_type("DTI60-1000")
            .with_metric_type("snr")
    }

    #[test]
    fn complete_selection_builds_params() {
        let params = build_query(&complete()).unwrap();
        assert_eq!(params.studies, "SPINS");
        assert_eq!(params.sites, "CMH,ZHH");
        assert_eq!(params.scantypes, "T1,DTI60-1000");
        assert_eq!(params.metrictypes, "snr");
        assert_eq!(params.isphantom, "False");
        assert_eq!(params.byname, "1");
    }

    #[test]
    fn any_missing_field_yields_none() {
        let mut s = complete();
        s.study = None;
        assert!(build_query(&s).is_none());

        let mut s = complete();
        s.phantom = Some("  ".into());
        assert!(build_query(&s).is_none());

        let mut s = complete();
        s.sites.clear();
        assert!(build_query(&s).is_none());

        let mut s = complete();
        s.scan_types.clear();
        assert!(build_query(&s).is_none());

        let mut s = complete();
        s.metric_type = None;
        assert!(build_query(&s).is_none());
    }

    #[test]
    fn placeholder_metric_type_counts_as_unset() {
        let s = complete().with_metric_type("Metric Type: ");
        assert!(build_query(&s).is_none());
    }

    #[test]
    fn scan_class_change_resets_metric_type() {
        let mut s = complete();
        s.set_scan_class(ScanClass::Dti);
        assert_eq!(s.metric_type, None);
        assert!(build_query(&s).is_none());
    }

    #[test]
    fn toggling_unchecks_and_preserves_order() {
        let mut s = complete();
        s.toggle_site("CMH");
        s.toggle_site("CMH");
        assert_eq!(s.sites, vec!["ZHH", "CMH"]);
    }

    #[test]
    fn query_string_is_form_encoded() {
        let qs = build_query(&complete()).unwrap().to_query_string();
        assert_eq!(
            qs,
            "studies=SPINS&sites=CMH%2CZHH&scantypes=T1%2CDTI60-1000&metrictypes=snr&isphantom=False&byname=1"
        );
    }

    #[test]
    fn scan_class_parses_case_insensitively() {
        assert_eq!("fmri".parse::<ScanClass>(), Ok(ScanClass::Fmri));
        assert!("pet".parse::<ScanClass>().is_err());
    }
}
