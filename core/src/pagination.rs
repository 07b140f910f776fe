//! Offset pagination state for the list screens.
//!
//! # Design
//! `Paginator` does no I/O. A load is split into `begin_load` (or one of the
//! triggers `refresh`, `load_more`, `set_filter`), which hands out a
//! `LoadTicket`, and `complete`, which applies the host's result for that
//! ticket. Each replace load opens a new generation; a ticket from an older
//! generation is discarded on completion, so a slow response can never
//! overwrite a newer refresh or filter change.
//!
//! The end of the list is decided from the server's `count` only:
//! `has_more = (page + 1) * page_size < count`.

use crate::error::ApiError;
use crate::types::{Filter, Page};

pub const PAGE_SIZE_DEFAULT: u32 = 10;
pub const PAGE_SIZE_LARGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Discard current items (first page, refresh, filter change).
    Replace,
    /// Append to current items (scroll end reached).
    Append,
}

/// Identifies one in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub page: u32,
    pub mode: LoadMode,
    pub generation: u64,
    pub index: u32,
    pub size: u32,
}

/// What `complete` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { received: usize },
    Failed,
    /// The ticket belongs to an older generation; nothing changed.
    Stale,
}

#[derive(Debug)]
pub struct Paginator<T> {
    items: Vec<T>,
    filter: Option<Filter>,
    page_size: u32,
    next_page: u32,
    has_more: bool,
    total_items: u64,
    loading_initial: bool,
    loading_more: bool,
    in_flight_append: Option<u32>,
    error: Option<ApiError>,
    generation: u64,
}

impl<T> Paginator<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            filter: None,
            page_size: page_size.max(1),
            next_page: 0,
            has_more: true,
            total_items: 0,
            loading_initial: false,
            loading_more: false,
            in_flight_append: None,
            error: None,
            generation: 0,
        }
    }

    pub fn with_filter(page_size: u32, filter: Filter) -> Self {
        let mut paginator = Self::new(page_size);
        paginator.filter = Some(filter);
        paginator
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Last successfully loaded page, if any.
    pub fn current_page(&self) -> Option<u32> {
        self.next_page.checked_sub(1)
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn is_loading_initial(&self) -> bool {
        self.loading_initial
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading_initial || self.loading_more
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start loading `page`.
    ///
    /// Returns `None` for an append of a page that is already in flight.
    pub fn begin_load(&mut self, page: u32, mode: LoadMode) -> Option<LoadTicket> {
        match mode {
            LoadMode::Append => {
                if self.in_flight_append == Some(page) {
                    tracing::trace!(page, "append already in flight");
                    return None;
                }
                self.in_flight_append = Some(page);
                self.loading_more = true;
                self.error = None;
                Some(self.ticket(page, mode))
            }
            LoadMode::Replace => Some(self.begin_replace(page)),
        }
    }

    fn begin_replace(&mut self, page: u32) -> LoadTicket {
        self.generation += 1;
        self.in_flight_append = None;
        self.loading_more = false;
        self.loading_initial = true;
        self.error = None;
        self.ticket(page, LoadMode::Replace)
    }

    fn ticket(&self, page: u32, mode: LoadMode) -> LoadTicket {
        LoadTicket {
            page,
            mode,
            generation: self.generation,
            index: page.saturating_mul(self.page_size),
            size: self.page_size,
        }
    }

    /// Next page, when the end of the list has been reached on screen.
    /// Nothing until a first page has loaded: a failed first page waits for
    /// `retry`.
    pub fn load_more(&mut self) -> Option<LoadTicket> {
        if self.next_page == 0 || !self.has_more || self.is_loading() {
            return None;
        }
        self.begin_load(self.next_page, LoadMode::Append)
    }

    /// Back to page 0, replacing the current items.
    pub fn refresh(&mut self) -> LoadTicket {
        self.next_page = 0;
        self.has_more = true;
        self.begin_replace(0)
    }

    pub fn retry(&mut self) -> LoadTicket {
        self.refresh()
    }

    pub fn set_filter(&mut self, filter: Filter) -> LoadTicket {
        self.filter = Some(filter);
        self.refresh()
    }

    /// Apply the outcome of the load identified by `ticket`.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<Page<T>, ApiError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                page = ticket.page,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "discarding stale page"
            );
            return LoadOutcome::Stale;
        }

        let outcome = match result {
            Ok(page) => {
                let received = page.items.len();
                match ticket.mode {
                    LoadMode::Replace => self.items = page.items,
                    LoadMode::Append => self.items.extend(page.items),
                }
                let loaded = u64::from(ticket.page) + 1;
                self.has_more = loaded * u64::from(ticket.size) < page.count;
                self.total_items = page.count;
                self.next_page = ticket.page + 1;
                self.error = None;
                LoadOutcome::Loaded { received }
            }
            Err(err) => {
                if ticket.mode == LoadMode::Replace {
                    self.items.clear();
                    self.total_items = 0;
                }
                self.error = Some(err);
                LoadOutcome::Failed
            }
        };

        match ticket.mode {
            LoadMode::Replace => self.loading_initial = false,
            LoadMode::Append => {
                if self.in_flight_append == Some(ticket.page) {
                    self.in_flight_append = None;
                    self.loading_more = false;
                }
            }
        }
        outcome
    }

    /// Run a load synchronously: `fetch` performs the round-trip for the ticket.
    pub fn run<F>(&mut self, ticket: LoadTicket, fetch: F) -> LoadOutcome
    where
        F: FnOnce(&LoadTicket, Option<&Filter>) -> Result<Page<T>, ApiError>,
    {
        let result = fetch(&ticket, self.filter.as_ref());
        self.complete(ticket, result)
    }
}
