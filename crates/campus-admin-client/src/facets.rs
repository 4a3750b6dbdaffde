use campus_types::models::{DirectoryUser, FacetOptions};

use crate::error::ApiError;

pub const SELECT_UNIVERSITY_FIRST: &str = "Please select a university first.";

/// Value of a single dropdown facet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Named(String),
}

impl Selection {
    pub fn named(value: impl Into<String>) -> Self {
        Self::Named(value.into())
    }

    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(v) => Some(v),
        }
    }
}

/// Current facet values. Only [`FacetResolver`] mutates these so the
/// university/dormitory pairing stays consistent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FacetFilter {
    search: String,
    university: Selection,
    dormitory: Selection,
}

impl FacetFilter {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn university(&self) -> &Selection {
        &self.university
    }

    pub fn dormitory(&self) -> &Selection {
        &self.dormitory
    }

    pub fn matches(&self, user: &DirectoryUser) -> bool {
        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty()
            && !user.display_name.to_lowercase().contains(&needle)
            && !user.email.to_lowercase().contains(&needle)
        {
            return false;
        }
        if let Some(uni) = self.university.as_named() {
            if user.university_name.as_deref() != Some(uni) {
                return false;
            }
        }
        if let Some(dorm) = self.dormitory.as_named() {
            if user.dormitory_name.as_deref() != Some(dorm) {
                return false;
            }
        }
        true
    }
}

/// Loads university -> dormitory options once and owns the filter values
/// that narrow the directory.
#[derive(Debug, Default)]
pub struct FacetResolver {
    options: Option<FacetOptions>,
    loading: bool,
    error: Option<String>,
    filter: FacetFilter,
    advisory: Option<String>,
}

impl FacetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> &FacetFilter {
        &self.filter
    }

    pub fn options(&self) -> Option<&FacetOptions> {
        self.options.as_ref()
    }

    /// While true the dropdowns render placeholder rows.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Non-blocking validation hint ("select a university first").
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    /// Returns false when options are already loaded or loading.
    pub fn begin_load(&mut self) -> bool {
        if self.loading || self.options.is_some() {
            return false;
        }
        self.loading = true;
        self.error = None;
        true
    }

    /// Store loaded options. Returns true when a stale university selection
    /// had to be reset to "all".
    pub fn apply_load(&mut self, result: Result<FacetOptions, ApiError>) -> bool {
        self.loading = false;
        match result {
            Ok(options) => {
                let uni_known = self
                    .filter
                    .university
                    .as_named()
                    .is_none_or(|uni| options.contains_university(uni));
                let dorm_known = match (self.filter.university.as_named(), self.filter.dormitory.as_named()) {
                    (Some(uni), Some(dorm)) => options.has_dormitory(uni, dorm),
                    _ => true,
                };
                let reset = !uni_known;
                if reset {
                    self.filter.university = Selection::All;
                }
                if reset || !dorm_known {
                    self.filter.dormitory = Selection::All;
                }
                self.options = Some(options);
                self.error = None;
                reset
            }
            Err(err) => {
                self.error = Some(err.user_message("load filters"));
                false
            }
        }
    }

    pub fn university_choices(&self) -> Vec<&str> {
        self.options
            .as_ref()
            .map(|o| o.universities().collect())
            .unwrap_or_default()
    }

    /// Dormitories of the selected university; empty while it is "all".
    pub fn dormitory_choices(&self) -> Vec<&str> {
        match (self.options.as_ref(), self.filter.university.as_named()) {
            (Some(options), Some(uni)) => options
                .dormitories(uni)
                .map(|d| d.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.filter.search = text.into();
    }

    /// Change the university facet. Always resets the dormitory facet and
    /// clears the advisory. A university unknown to the loaded options is
    /// rejected.
    pub fn select_university(&mut self, selection: Selection) -> bool {
        if let (Some(options), Some(uni)) = (self.options.as_ref(), selection.as_named()) {
            if !options.contains_university(uni) {
                return false;
            }
        }
        self.filter.university = selection;
        self.filter.dormitory = Selection::All;
        self.advisory = None;
        true
    }

    /// The dormitory dropdown only opens once a university is chosen.
    pub fn open_dormitory_picker(&mut self) -> bool {
        if self.filter.university == Selection::All {
            self.advisory = Some(SELECT_UNIVERSITY_FIRST.to_string());
            return false;
        }
        true
    }

    pub fn select_dormitory(&mut self, selection: Selection) -> bool {
        let Some(dorm) = selection.as_named() else {
            self.filter.dormitory = Selection::All;
            return true;
        };
        let Some(uni) = self.filter.university.as_named() else {
            self.advisory = Some(SELECT_UNIVERSITY_FIRST.to_string());
            return false;
        };
        let known = self
            .options
            .as_ref()
            .is_some_and(|o| o.has_dormitory(uni, dorm));
        if !known {
            return false;
        }
        self.filter.dormitory = selection;
        true
    }

    pub fn narrow<'a>(&self, users: &'a [DirectoryUser]) -> Vec<&'a DirectoryUser> {
        users.iter().filter(|u| self.filter.matches(u)).collect()
    }
}
