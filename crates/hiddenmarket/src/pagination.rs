//! Result-window arithmetic and navigation links.
//!
//! Everything here is computed from the total count and the requested row
//! range; nothing re-queries the index. Navigation links preserve every query
//! parameter of the current path and only replace the row-range parameters.

use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Pager widget length.
const MAX_SHOWN_PAGES: u64 = 10;

/// One result window, 1-based inclusive. `to_number < from_number` means the
/// page is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub from_number: u64,
    pub to_number: u64,
}

impl Page {
    #[must_use]
    pub fn size(&self) -> u64 {
        if self.to_number < self.from_number {
            0
        } else {
            self.to_number - self.from_number + 1
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// Computes the current page and its neighbors for a search response.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationManager {
    total_count: u64,
    from_number: u64,
    to_number: u64,
    page_size: u64,
    current_path: String,
}

impl PaginationManager {
    /// Build a manager over an already-known total.
    ///
    /// The requested window is fixed up on entry: `from_number` is raised to
    /// 1, a non-positive window resets to the default page size and an
    /// oversized one is clamped to the maximum.
    #[must_use]
    pub fn new(
        total_count: u64,
        from_number: u64,
        to_number: u64,
        current_path: impl Into<String>,
        settings: &Settings,
    ) -> Self {
        // Cap the start row first so the window arithmetic below stays in
        // range even for `from=u64::MAX`.
        let headroom = settings.max_page_size.max(settings.offices_per_page).max(1);
        let from_number = from_number.clamp(1, u64::MAX - headroom);
        let mut to_number = if to_number < from_number {
            from_number + settings.offices_per_page - 1
        } else {
            to_number
        };
        if to_number - from_number + 1 > settings.max_page_size {
            to_number = from_number + settings.max_page_size - 1;
        }
        Self {
            total_count,
            from_number,
            to_number,
            page_size: to_number - from_number + 1,
            current_path: current_path.into(),
        }
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// The window actually served, clamped to the result set.
    ///
    /// A zero total or a `from_number` beyond the total yields an empty page
    /// rather than an error.
    #[must_use]
    pub fn current_page(&self) -> Page {
        if self.total_count == 0 || self.from_number > self.total_count {
            return Page {
                from_number: self.from_number,
                to_number: self.from_number - 1,
            };
        }
        Page {
            from_number: self.from_number,
            to_number: self.to_number.min(self.total_count),
        }
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.from_number > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.to_number < self.total_count
    }

    #[must_use]
    pub fn previous_page(&self) -> Option<Page> {
        if !self.has_previous() {
            return None;
        }
        let from_number = self.from_number.saturating_sub(self.page_size).max(1);
        Some(Page {
            from_number,
            to_number: self.from_number - 1,
        })
    }

    #[must_use]
    pub fn next_page(&self) -> Option<Page> {
        if !self.has_next() {
            return None;
        }
        let from_number = self.to_number + 1;
        Some(Page {
            from_number,
            to_number: (from_number + self.page_size - 1).min(self.total_count),
        })
    }

    /// All navigable windows, capped to the pager length, centered-ish on the
    /// current page when the result set is long.
    #[must_use]
    pub fn pages(&self) -> Vec<Page> {
        if self.total_count == 0 {
            return Vec::new();
        }
        let total_pages = self.total_count.div_ceil(self.page_size);
        let current_index = (self.from_number - 1) / self.page_size;
        let first = current_index
            .saturating_sub(MAX_SHOWN_PAGES / 2)
            .min(total_pages.saturating_sub(MAX_SHOWN_PAGES));
        (first..total_pages.min(first + MAX_SHOWN_PAGES))
            .map(|index| {
                let from_number = index * self.page_size + 1;
                Page {
                    from_number,
                    to_number: (from_number + self.page_size - 1).min(self.total_count),
                }
            })
            .collect()
    }

    /// The current path with only the `from`/`to` query parameters replaced.
    #[must_use]
    pub fn url_for(&self, page: Page) -> String {
        let (path, query) = match self.current_path.split_once('?') {
            Some((path, query)) => (path, query),
            None => (self.current_path.as_str(), ""),
        };
        let mut parts: Vec<String> = Vec::new();
        let mut saw_from = false;
        let mut saw_to = false;
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let key = pair.split_once('=').map_or(pair, |(key, _)| key);
            match key {
                "from" => {
                    parts.push(format!("from={}", page.from_number));
                    saw_from = true;
                }
                "to" => {
                    parts.push(format!("to={}", page.to_number));
                    saw_to = true;
                }
                _ => parts.push(pair.to_string()),
            }
        }
        if !saw_from {
            parts.push(format!("from={}", page.from_number));
        }
        if !saw_to {
            parts.push(format!("to={}", page.to_number));
        }
        format!("{path}?{}", parts.join("&"))
    }
}
