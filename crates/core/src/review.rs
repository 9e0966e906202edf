//! QC review state of the scans listed on a session page.
//!
//! Like the metrics panel, the board performs no I/O: [`ReviewBoard::submit`]
//! returns the request body to POST and [`ReviewBoard::complete`] applies the
//! server's answer.

use std::collections::BTreeMap;
use std::fmt;

use qc_metrics_protocol::{QcSearchRecord, ThemeToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::navigation::NavTarget;

/// Banner shown under a scan whose review update failed.
pub const REVIEW_FAILED_MESSAGE: &str = "Update failed, please contact an admin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    /// Approve with a comment describing a problem.
    Flag,
    Blacklist,
    /// Remove the existing review.
    Delete,
    /// Replace the comment of an existing review, keeping its badge.
    Update,
}

impl ReviewAction {
    /// Badge a scan carries once this action succeeded.
    pub fn badge(self) -> Option<Badge> {
        match self {
            ReviewAction::Approve => Some(Badge::Reviewed),
            ReviewAction::Flag => Some(Badge::Flagged),
            ReviewAction::Blacklist => Some(Badge::Blacklisted),
            ReviewAction::Delete | ReviewAction::Update => None,
        }
    }

    /// Whether the action opens the comment form first.
    pub fn takes_comment(self) -> bool {
        matches!(
            self,
            ReviewAction::Flag | ReviewAction::Blacklist | ReviewAction::Update
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Reviewed,
    Flagged,
    Blacklisted,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::Reviewed => "Reviewed",
            Badge::Flagged => "Flagged",
            Badge::Blacklisted => "Blacklisted",
        }
    }

    pub fn token(self) -> ThemeToken {
        match self {
            Badge::Reviewed => ThemeToken::BadgeApproved,
            Badge::Flagged => ThemeToken::BadgeFlagged,
            Badge::Blacklisted => ThemeToken::BadgeBlacklisted,
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// JSON body posted to the review endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub scan: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delete: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub update: bool,
}

impl ReviewRequest {
    fn new(scan: u64, action: ReviewAction, comment: Option<String>) -> Self {
        let approve = match action {
            ReviewAction::Approve | ReviewAction::Flag => Some(true),
            ReviewAction::Blacklist => Some(false),
            ReviewAction::Delete | ReviewAction::Update => None,
        };
        Self {
            scan,
            approve,
            comment: if action.takes_comment() { comment } else { None },
            delete: action == ReviewAction::Delete,
            update: action == ReviewAction::Update,
        }
    }
}

/// Successful answer of the review endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub user: String,
    pub timestamp: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("scan {0} already has a review update in flight")]
    InFlight(u64),
    #[error("scan {0} has no review update in flight")]
    NotPending(u64),
}

/// What the page shows for one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReview {
    pub badge: Option<Badge>,
    pub comment: Option<String>,
    /// "user at timestamp" of the last successful review.
    pub signature: Option<String>,
    pub comments_visible: bool,
    pub failed: bool,
    #[serde(skip)]
    pending: Option<ReviewRequestState>,
}

#[derive(Debug, Clone, PartialEq)]
struct ReviewRequestState {
    action: ReviewAction,
    comment: Option<String>,
}

impl ScanReview {
    /// Loading indicator in place of the review buttons.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewBoard {
    scans: BTreeMap<u64, ScanReview>,
}

impl ReviewBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a review update. Clears an earlier failure banner for the scan.
    pub fn submit(
        &mut self,
        scan: u64,
        action: ReviewAction,
        comment: Option<String>,
    ) -> Result<ReviewRequest, ReviewError> {
        let state = self.scans.entry(scan).or_default();
        if state.pending.is_some() {
            return Err(ReviewError::InFlight(scan));
        }
        let request = ReviewRequest::new(scan, action, comment);
        state.failed = false;
        state.pending = Some(ReviewRequestState {
            action,
            comment: request.comment.clone(),
        });
        Ok(request)
    }

    /// Apply the server's answer to the update in flight for `scan`.
    ///
    /// A failure raises the scan's "contact an admin" banner. Repeated
    /// failures leave a single banner.
    pub fn complete<E: fmt::Display>(
        &mut self,
        scan: u64,
        outcome: Result<ReviewResponse, E>,
    ) -> Result<(), ReviewError> {
        let state = self.scans.get_mut(&scan).ok_or(ReviewError::NotPending(scan))?;
        let pending = state.pending.take().ok_or(ReviewError::NotPending(scan))?;

        match outcome {
            Ok(response) => {
                state.failed = false;
                match pending.action {
                    ReviewAction::Delete => {
                        state.badge = None;
                        state.comment = None;
                        state.signature = None;
                        state.comments_visible = false;
                        return Ok(());
                    }
                    // the badge of the edited review stays
                    ReviewAction::Update => {}
                    action => state.badge = action.badge(),
                }
                if pending.action.takes_comment() {
                    state.comment = pending.comment;
                    state.comments_visible = state.comment.is_some();
                }
                state.signature = Some(format!("{} at {}", response.user, response.timestamp));
            }
            Err(err) => {
                tracing::warn!(scan, action = ?pending.action, error = %err, "QC review update failed");
                state.failed = true;
            }
        }
        Ok(())
    }

    pub fn scan(&self, scan: u64) -> Option<&ScanReview> {
        self.scans.get(&scan)
    }

    pub fn badge(&self, scan: u64) -> Option<Badge> {
        self.scans.get(&scan).and_then(|s| s.badge)
    }

    /// Failure banners, one per failed scan.
    pub fn banners(&self) -> Vec<(u64, &'static str)> {
        self.scans
            .iter()
            .filter(|(_, s)| s.failed)
            .map(|(&scan, _)| (scan, REVIEW_FAILED_MESSAGE))
            .collect()
    }

    /// Show or hide a scan's comment list. Returns the new visibility.
    pub fn toggle_comments(&mut self, scan: u64) -> bool {
        let state = self.scans.entry(scan).or_default();
        state.comments_visible = !state.comments_visible;
        state.comments_visible
    }
}

/// Scan id of a scan table row, whose element id reads `scan_<id>`.
pub fn scan_id_from_row(row_id: &str) -> Option<u64> {
    row_id.split('_').nth(1)?.parse().ok()
}

/// Target and title of the comment modal for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    pub scan_id: u64,
    pub title: String,
    pub target: NavTarget,
}

impl CommentForm {
    pub fn comment(scan_id: u64, scan_name: &str, base_title: &str) -> Self {
        Self::new(NavTarget::ScanComment(scan_id), scan_id, scan_name, base_title)
    }

    pub fn blacklist(scan_id: u64, scan_name: &str, base_title: &str) -> Self {
        Self::new(NavTarget::ScanBlacklist(scan_id), scan_id, scan_name, base_title)
    }

    fn new(target: NavTarget, scan_id: u64, scan_name: &str, base_title: &str) -> Self {
        Self {
            scan_id,
            title: format!("{base_title} - {scan_name}"),
            target,
        }
    }
}

/// Cells of the QC search results table.
pub fn search_rows(records: &[QcSearchRecord]) -> Vec<Vec<String>> {
    records.iter().map(|r| r.cells().to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> Result<ReviewResponse, String> {
        Ok(ReviewResponse {
            user: "dawn".into(),
            timestamp: "2024-03-01 10:00".into(),
        })
    }

    #[test]
    fn approve_sets_badge_and_signature() {
        let mut board = ReviewBoard::new();
        let req = board.submit(7, ReviewAction::Approve, Some("ignored".into())).unwrap();
        assert_eq!(req.approve, Some(true));
        assert_eq!(req.comment, None);
        assert!(board.scan(7).unwrap().is_loading());

        board.complete(7, ok()).unwrap();
        let scan = board.scan(7).unwrap();
        assert!(!scan.is_loading());
        assert_eq!(scan.badge, Some(Badge::Reviewed));
        assert_eq!(scan.signature.as_deref(), Some("dawn at 2024-03-01 10:00"));
    }

    #[test]
    fn blacklist_carries_comment() {
        let mut board = ReviewBoard::new();
        let req = board.submit(3, ReviewAction::Blacklist, Some("motion".into())).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"scan": 3, "approve": false, "comment": "motion"})
        );
        board.complete(3, ok()).unwrap();
        assert_eq!(board.badge(3), Some(Badge::Blacklisted));
        assert_eq!(board.scan(3).unwrap().comment.as_deref(), Some("motion"));
        assert!(board.scan(3).unwrap().comments_visible);
    }

    #[test]
    fn delete_clears_review() {
        let mut board = ReviewBoard::new();
        board.submit(3, ReviewAction::Flag, Some("ghosting".into())).unwrap();
        board.complete(3, ok()).unwrap();

        let req = board.submit(3, ReviewAction::Delete, None).unwrap();
        assert!(req.delete);
        assert_eq!(req.approve, None);
        board.complete(3, ok()).unwrap();
        let scan = board.scan(3).unwrap();
        assert_eq!(scan.badge, None);
        assert_eq!(scan.comment, None);
        assert_eq!(scan.signature, None);
    }

    #[test]
    fn update_edits_comment_and_keeps_badge() {
        let mut board = ReviewBoard::new();
        board.submit(5, ReviewAction::Flag, Some("ghosting".into())).unwrap();
        board.complete(5, ok()).unwrap();

        let req = board.submit(5, ReviewAction::Update, Some("mild ghosting".into())).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"scan": 5, "comment": "mild ghosting", "update": true})
        );
        board
            .complete(
                5,
                Ok::<_, String>(ReviewResponse {
                    user: "kim".into(),
                    timestamp: "2024-03-02 09:30".into(),
                }),
            )
            .unwrap();
        let scan = board.scan(5).unwrap();
        assert_eq!(scan.badge, Some(Badge::Flagged));
        assert_eq!(scan.comment.as_deref(), Some("mild ghosting"));
        assert_eq!(scan.signature.as_deref(), Some("kim at 2024-03-02 09:30"));
    }

    #[test]
    fn failed_update_raises_banner_and_keeps_review() {
        let mut board = ReviewBoard::new();
        board.submit(6, ReviewAction::Approve, None).unwrap();
        board.complete(6, ok()).unwrap();
        board.submit(6, ReviewAction::Update, Some("late note".into())).unwrap();
        board.complete(6, Err::<ReviewResponse, _>("HTTP 500")).unwrap();

        let scan = board.scan(6).unwrap();
        assert_eq!(scan.badge, Some(Badge::Reviewed));
        assert_eq!(scan.comment, None);
        assert_eq!(board.banners(), vec![(6, REVIEW_FAILED_MESSAGE)]);
    }

    #[test]
    fn failure_banner_is_not_duplicated() {
        let mut board = ReviewBoard::new();
        for _ in 0..3 {
            board.submit(9, ReviewAction::Approve, None).unwrap();
            board
                .complete(9, Err::<ReviewResponse, _>("HTTP 500"))
                .unwrap();
        }
        assert_eq!(board.banners(), vec![(9, REVIEW_FAILED_MESSAGE)]);
        assert!(!board.scan(9).unwrap().is_loading());
        assert_eq!(board.badge(9), None);
    }

    #[test]
    fn resubmitting_clears_banner() {
        let mut board = ReviewBoard::new();
        board.submit(9, ReviewAction::Approve, None).unwrap();
        board.complete(9, Err::<ReviewResponse, _>("timeout")).unwrap();
        board.submit(9, ReviewAction::Approve, None).unwrap();
        assert!(board.banners().is_empty());
    }

    #[test]
    fn one_update_per_scan_at_a_time() {
        let mut board = ReviewBoard::new();
        board.submit(1, ReviewAction::Approve, None).unwrap();
        assert_eq!(
            board.submit(1, ReviewAction::Flag, None),
            Err(ReviewError::InFlight(1))
        );
        // other scans are independent
        assert!(board.submit(2, ReviewAction::Approve, None).is_ok());
        assert_eq!(board.complete(5, ok()), Err(ReviewError::NotPending(5)));
    }

    #[test]
    fn comments_toggle() {
        let mut board = ReviewBoard::new();
        assert!(board.toggle_comments(4));
        assert!(!board.toggle_comments(4));
    }

    #[test]
    fn row_ids_and_comment_forms() {
        assert_eq!(scan_id_from_row("scan_1234"), Some(1234));
        assert_eq!(scan_id_from_row("scan"), None);

        let form = CommentForm::blacklist(12, "SPN01_CMH_0001_01_T1", "Add comment");
        assert_eq!(form.title, "Add comment - SPN01_CMH_0001_01_T1");
        assert_eq!(form.target.path(), "/scan_blacklist/12");
        assert_eq!(CommentForm::comment(12, "x", "t").target.path(), "/scan_comment/12");
    }

    #[test]
    fn search_rows_render_nulls_empty() {
        let rows = search_rows(&[QcSearchRecord {
            name: "x".into(),
            approved: None,
            comment: None,
        }]);
        assert_eq!(rows, vec![vec!["x".to_string(), String::new(), String::new()]]);
    }
}
