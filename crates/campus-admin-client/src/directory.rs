use std::collections::HashSet;

use campus_types::UserId;
use campus_types::models::DirectoryUser;

use crate::backend::UserPage;
use crate::error::ApiError;

/// Fetch the next page once less than this much scroll distance remains.
pub const SCROLL_THRESHOLD_PX: f64 = 120.0;

/// Remaining scroll distance of a scroll container.
pub fn remaining_scroll(scroll_height: f64, scroll_top: f64, client_height: f64) -> f64 {
    (scroll_height - scroll_top - client_height).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub added: usize,
    pub duplicates: usize,
    pub admins_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageApplied {
    Merged(MergeStats),
    /// `cleared` is true when the failed page was the first one.
    Failed { cleared: bool, message: String },
    /// The response did not belong to the request in flight.
    Stale,
}

/// Paginated, append-only list of users the admin can message.
///
/// Pages are merged by id with the first occurrence winning, so a page that
/// overlaps one already loaded never duplicates a row. Admin accounts are
/// dropped on merge.
#[derive(Debug)]
pub struct UserDirectory {
    users: Vec<DirectoryUser>,
    seen: HashSet<UserId>,
    page_size: u32,
    /// Last page applied; 0 before the first successful page.
    current_page: u32,
    last_page: u32,
    in_flight: Option<u32>,
    error: Option<String>,
}

impl UserDirectory {
    pub fn new(page_size: u32) -> Self {
        Self {
            users: Vec::new(),
            seen: HashSet::new(),
            page_size,
            current_page: 0,
            last_page: 0,
            in_flight: None,
            error: None,
        }
    }

    pub fn users(&self) -> &[DirectoryUser] {
        &self.users
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_more(&self) -> bool {
        self.current_page == 0 || self.current_page < self.last_page
    }

    /// Infinite-scroll trigger.
    pub fn should_fetch_more(&self, remaining_px: f64) -> bool {
        remaining_px < SCROLL_THRESHOLD_PX && !self.is_loading() && self.has_more()
    }

    /// Reserve the next page. `None` if a page is already in flight or there
    /// is nothing left to load.
    pub fn begin_page(&mut self) -> Option<u32> {
        if self.is_loading() || !self.has_more() {
            return None;
        }
        let page = self.current_page + 1;
        self.in_flight = Some(page);
        Some(page)
    }

    /// Start paging again from page 1 while keeping loaded rows. Rows that
    /// come back again are deduplicated on merge.
    pub fn restart(&mut self) {
        self.current_page = 0;
        self.last_page = 0;
        self.in_flight = None;
    }

    pub fn apply_page(&mut self, page: u32, result: Result<UserPage, ApiError>) -> PageApplied {
        if self.in_flight != Some(page) {
            return PageApplied::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(resp) => {
                let mut stats = MergeStats::default();
                for user in resp.users {
                    if user.is_admin() {
                        stats.admins_skipped += 1;
                    } else if self.seen.insert(user.id) {
                        self.users.push(user);
                        stats.added += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
                self.current_page = resp.current_page.max(page);
                self.last_page = resp.last_page;
                self.error = None;
                PageApplied::Merged(stats)
            }
            Err(err) => {
                let message = err.user_message("load users");
                self.error = Some(message.clone());
                // First page: show an empty/error state instead of stale rows.
                let cleared = page == 1;
                if cleared {
                    self.users.clear();
                    self.seen.clear();
                    self.current_page = 0;
                    self.last_page = 0;
                }
                PageApplied::Failed { cleared, message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, role: &str) -> DirectoryUser {
        DirectoryUser {
            id,
            display_name: format!("user{id}"),
            email: format!("user{id}@example.edu"),
            role: role.into(),
            status: None,
            avatar_url: None,
            university_name: None,
            dormitory_name: None,
            last_login_at: None,
            product_count: 0,
            sold_counter: 0,
        }
    }

    fn page(ids: &[UserId], current_page: u32, last_page: u32) -> UserPage {
        UserPage {
            users: ids.iter().map(|&id| user(id, "user")).collect(),
            current_page,
            last_page,
        }
    }

    fn ids(dir: &UserDirectory) -> Vec<UserId> {
        dir.users().iter().map(|u| u.id).collect()
    }

    #[test]
    fn overlapping_pages_are_deduplicated() {
        let mut dir = UserDirectory::new(3);
        let p1 = dir.begin_page().unwrap();
        assert_eq!(p1, 1);
        dir.apply_page(p1, Ok(page(&[1, 2, 3], 1, 2)));

        let p2 = dir.begin_page().unwrap();
        assert_eq!(p2, 2);
        let applied = dir.apply_page(p2, Ok(page(&[3, 4], 2, 2)));

        assert_eq!(ids(&dir), vec![1, 2, 3, 4]);
        assert_eq!(
            applied,
            PageApplied::Merged(MergeStats { added: 1, duplicates: 1, admins_skipped: 0 })
        );
        assert!(!dir.has_more());
        assert!(dir.begin_page().is_none());
    }

    #[test]
    fn first_occurrence_wins() {
        let mut dir = UserDirectory::new(2);
        let p = dir.begin_page().unwrap();
        dir.apply_page(p, Ok(page(&[1], 1, 2)));

        let mut renamed = user(1, "user");
        renamed.display_name = "later copy".into();
        let p = dir.begin_page().unwrap();
        dir.apply_page(p, Ok(UserPage { users: vec![renamed], current_page: 2, last_page: 2 }));

        assert_eq!(dir.users()[0].display_name, "user1");
    }

    #[test]
    fn admins_are_not_listed() {
        let mut dir = UserDirectory::new(5);
        let p = dir.begin_page().unwrap();
        let resp = UserPage {
            users: vec![user(1, "user"), user(2, "admin"), user(3, "ADMIN")],
            current_page: 1,
            last_page: 1,
        };
        let applied = dir.apply_page(p, Ok(resp));
        assert_eq!(ids(&dir), vec![1]);
        assert_eq!(
            applied,
            PageApplied::Merged(MergeStats { added: 1, duplicates: 0, admins_skipped: 2 })
        );
    }

    #[test]
    fn only_one_page_in_flight() {
        let mut dir = UserDirectory::new(5);
        assert_eq!(dir.begin_page(), Some(1));
        assert_eq!(dir.begin_page(), None);
        assert!(!dir.should_fetch_more(0.0));
    }

    #[test]
    fn scroll_threshold() {
        let mut dir = UserDirectory::new(5);
        let p = dir.begin_page().unwrap();
        dir.apply_page(p, Ok(page(&[1], 1, 3)));

        assert!(dir.should_fetch_more(remaining_scroll(1000.0, 800.0, 100.0)));
        assert!(!dir.should_fetch_more(remaining_scroll(1000.0, 500.0, 100.0)));
        assert!(!dir.should_fetch_more(120.0));
        assert!(dir.should_fetch_more(119.9));
    }

    #[test]
    fn first_page_failure_clears_list() {
        let mut dir = UserDirectory::new(5);
        let p = dir.begin_page().unwrap();
        dir.apply_page(p, Ok(page(&[1, 2], 1, 2)));
        dir.restart();

        let p = dir.begin_page().unwrap();
        assert_eq!(p, 1);
        let applied = dir.apply_page(p, Err(ApiError::Timeout));
        assert_eq!(
            applied,
            PageApplied::Failed { cleared: true, message: "Failed to load users.".into() }
        );
        assert!(dir.users().is_empty());
        assert_eq!(dir.error(), Some("Failed to load users."));
        // Retrying starts again from page 1.
        assert_eq!(dir.begin_page(), Some(1));
    }

    #[test]
    fn later_page_failure_keeps_rows() {
        let mut dir = UserDirectory::new(5);
        let p = dir.begin_page().unwrap();
        dir.apply_page(p, Ok(page(&[1, 2], 1, 3)));

        let p = dir.begin_page().unwrap();
        let applied = dir.apply_page(p, Err(ApiError::Network("reset".into())));
        assert!(matches!(applied, PageApplied::Failed { cleared: false, .. }));
        assert_eq!(ids(&dir), vec![1, 2]);
        assert_eq!(dir.begin_page(), Some(2));

        dir.apply_page(2, Ok(page(&[3], 2, 3)));
        assert_eq!(dir.error(), None);
        assert_eq!(ids(&dir), vec![1, 2, 3]);
    }

    #[test]
    fn response_for_other_page_is_stale() {
        let mut dir = UserDirectory::new(5);
        let p = dir.begin_page().unwrap();
        assert_eq!(dir.apply_page(p + 1, Ok(page(&[9], 2, 2))), PageApplied::Stale);
        assert!(dir.users().is_empty());
        assert!(dir.is_loading());
    }
}
