//! Pagination windows and navigation links.
//!
//! A list request selects a window of the matching documents with an offset and an
//! optional limit. Once the total number of matches is known, [`PageWindow::links`]
//! computes the windows of the first, previous, next and last pages relative to the
//! requested one. How a window is rendered (offset/limit or page number) is up to
//! the caller.

use serde::{Deserialize, Serialize};

/// A window over an ordered result set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageWindow {
    /// Number of matches skipped before the window starts.
    pub offset: u64,
    /// Maximum number of matches in the window, unbounded when `None`.
    pub limit: Option<u64>,
}

/// Windows of the neighbouring pages of a [`PageWindow`].
///
/// A relation is `None` when it does not exist: `first` and `prev` on the first
/// page, `next` and `last` on the last one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub first: Option<PageWindow>,
    pub prev: Option<PageWindow>,
    pub next: Option<PageWindow>,
    pub last: Option<PageWindow>,
}

impl PageLinks {
    /// Returns `true` if there is no page to link to.
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.prev.is_none() && self.next.is_none() && self.last.is_none()
    }

    /// Iterates over the existing relations with their link relation names.
    pub fn relations(&self) -> impl Iterator<Item = (&'static str, PageWindow)> {
        [
            ("first", self.first),
            ("prev", self.prev),
            ("next", self.next),
            ("last", self.last),
        ]
        .into_iter()
        .filter_map(|(rel, window)| window.map(|w| (rel, w)))
    }
}

impl PageWindow {
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// Computes the navigation links for this window given the total number of matches.
    ///
    /// Returns empty links when the window is unbounded, since it then always reaches
    /// the end of the result set.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let links = PageWindow::new(20, Some(10)).links(45);
    ///
    /// assert_eq!(links.prev, Some(PageWindow::new(10, Some(10))));
    /// assert_eq!(links.last, Some(PageWindow::new(40, Some(10))));
    /// ```
    pub fn links(&self, total: u64) -> PageLinks {
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => return PageLinks::default(),
        };
        let window = |offset| Some(PageWindow::new(offset, Some(limit)));
        let mut links = PageLinks::default();

        if self.offset > 0 {
            links.first = window(0);
            links.prev = window(self.offset.saturating_sub(limit));
        }

        if self.offset.saturating_add(limit) < total {
            links.next = window(self.offset + limit);
            links.last = window((total - 1) / limit * limit);
        }

        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_links_in_every_direction() {
        let links = PageWindow::new(20, Some(10)).links(45);

        assert_eq!(links.first, Some(PageWindow::new(0, Some(10))));
        assert_eq!(links.prev, Some(PageWindow::new(10, Some(10))));
        assert_eq!(links.next, Some(PageWindow::new(30, Some(10))));
        assert_eq!(links.last, Some(PageWindow::new(40, Some(10))));
        assert_eq!(links.relations().count(), 4);
    }

    #[test]
    fn first_and_last_pages_omit_unreachable_relations() {
        let first = PageWindow::new(0, Some(2)).links(5);
        assert_eq!(first.first, None);
        assert_eq!(first.prev, None);
        assert_eq!(first.last, Some(PageWindow::new(4, Some(2))));

        let last = PageWindow::new(4, Some(2)).links(5);
        assert_eq!(last.next, None);
        assert_eq!(last.last, None);
        assert_eq!(last.prev, Some(PageWindow::new(2, Some(2))));
    }

    #[test]
    fn unaligned_offsets_clamp_the_previous_page() {
        let links = PageWindow::new(3, Some(10)).links(8);

        assert_eq!(links.prev, Some(PageWindow::new(0, Some(10))));
        assert_eq!(links.next, None);
    }

    #[test]
    fn windows_covering_everything_have_no_links() {
        assert!(PageWindow::new(0, Some(10)).links(10).is_empty());
        assert!(PageWindow::new(0, None).links(1000).is_empty());
        assert!(PageWindow::new(0, Some(10)).links(0).is_empty());
    }
}
