use std::fmt;

use serde::{Deserialize, Serialize};

/// Pages the dashboard navigates to from click handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NavTarget {
    /// Session detail page, opened from a chart point.
    Session(String),
    /// Session lookup by human-readable name (navbar search box).
    SessionByName(String),
    /// Comment form for one scan.
    ScanComment(u64),
    /// Blacklist form for one scan.
    ScanBlacklist(u64),
}

impl NavTarget {
    /// Site-relative path, e.g. `/session/1739`.
    pub fn path(&self) -> String {
        match self {
            NavTarget::Session(id) => format!("/session/{id}"),
            NavTarget::SessionByName(name) => format!("/session_by_name/{name}"),
            NavTarget::ScanComment(scan_id) => format!("/scan_comment/{scan_id}"),
            NavTarget::ScanBlacklist(scan_id) => format!("/scan_blacklist/{scan_id}"),
        }
    }

    /// Absolute URL under `origin` (`scheme://host[:port]`).
    pub fn absolute(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for NavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Navbar "find session" box. Blank input does not navigate.
pub fn find_session(search_text: &str) -> Option<NavTarget> {
    let text = search_text.trim();
    (!text.is_empty()).then(|| NavTarget::SessionByName(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(NavTarget::Session("1739".into()).path(), "/session/1739");
        assert_eq!(
            NavTarget::SessionByName("SPN01_CMH_0001_01".into()).path(),
            "/session_by_name/SPN01_CMH_0001_01"
        );
        assert_eq!(NavTarget::ScanComment(42).path(), "/scan_comment/42");
        assert_eq!(NavTarget::ScanBlacklist(42).path(), "/scan_blacklist/42");
    }

    #[test]
    fn absolute_url_joins_origin() {
        let target = NavTarget::Session("7".into());
        assert_eq!(target.absolute("http://dashboard:5000/"), "http://dashboard:5000/session/7");
        assert_eq!(target.absolute("http://dashboard:5000"), "http://dashboard:5000/session/7");
    }

    #[test]
    fn blank_search_does_not_navigate() {
        assert_eq!(find_session("   "), None);
        assert_eq!(
            find_session(" SPN01_CMH_0001_01 "),
            Some(NavTarget::SessionByName("SPN01_CMH_0001_01".into()))
        );
    }
}
