use super::{
    filter::{self, FilterCriteria, Membership},
    sort::{self, SortOption},
};
use crate::{display::CatalogStats, models::CatalogItem};

/// How many results the renderer shows.
///
/// The counter only grows; a new filter selection should start from a fresh
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    shown: usize,
    step: usize,
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self::new(20)
    }
}

impl PaginationWindow {
    /// Window showing `step` items and growing by `step`. A zero step becomes 1.
    pub fn new(step: usize) -> Self {
        let step = step.max(1);
        Self { shown: step, step }
    }

    /// Items currently revealed, before clamping to the result count.
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// Increment applied by [`reveal_more`](Self::reveal_more).
    pub fn step(&self) -> usize {
        self.step
    }

    /// Reveal one more step of results.
    pub fn reveal_more(&mut self) {
        self.shown = self.shown.saturating_add(self.step);
    }

    /// Number of items to render out of `total`.
    pub fn visible(&self, total: usize) -> usize {
        self.shown.min(total)
    }

    /// Whether results beyond the visible ones exist.
    pub fn has_more(&self, total: usize) -> bool {
        total > self.shown
    }
}

/// Everything the user selected for the current view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Filters applied before sorting.
    pub criteria: FilterCriteria,
    /// Chosen order; `None` keeps catalog order.
    pub sort: Option<SortOption>,
}

/// What the renderer should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// The catalog itself is empty.
    NoData,
    /// The catalog has items but none passed the filters.
    NoMatches,
    /// At least one result is visible.
    Results,
}

/// Filtered, sorted and paginated slice of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogView {
    /// Visible results in display order.
    pub items: Vec<CatalogItem>,
    /// Counts over the whole filtered result.
    pub stats: CatalogStats,
    /// More results can be revealed.
    pub has_more: bool,
    /// Which presentation applies.
    pub state: ViewState,
}

impl CatalogView {
    /// Number of results rendered.
    pub fn visible(&self) -> usize {
        self.items.len()
    }
}

/// Run the filter, sort and pagination stages over `catalog`.
pub fn build_view(
    catalog: &[CatalogItem],
    query: &CatalogQuery,
    membership: &impl Membership,
    window: &PaginationWindow,
) -> CatalogView {
    let outcome = filter::apply(catalog, &query.criteria, membership);
    let mut items = outcome.items;
    sort::sort(&mut items, query.sort);

    let stats = CatalogStats::collect(catalog.len(), &items, outcome.hidden_adult);
    let filtered = items.len();
    let has_more = window.has_more(filtered);
    items.truncate(window.visible(filtered));

    let state = if catalog.is_empty() {
        ViewState::NoData
    } else if filtered == 0 {
        ViewState::NoMatches
    } else {
        ViewState::Results
    };

    CatalogView {
        items,
        stats,
        has_more,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::filter::NoMembership;

    fn catalog(count: u64) -> Vec<CatalogItem> {
        (1..=count)
            .map(|id| CatalogItem::named(Some(id), format!("Game {id:02}")))
            .collect()
    }

    #[test]
    fn window_grows_by_step() {
        let mut window = PaginationWindow::default();
        assert_eq!(window.visible(45), 20);
        assert!(window.has_more(45));

        window.reveal_more();
        window.reveal_more();
        assert_eq!(window.shown(), 60);
        assert_eq!(window.visible(45), 45);
        assert!(!window.has_more(45));
        assert!(!window.has_more(60));
    }

    #[test]
    fn zero_step_is_clamped() {
        let window = PaginationWindow::new(0);
        assert_eq!(window.step(), 1);
        assert_eq!(window.visible(10), 1);
    }

    #[test]
    fn view_paginates_sorted_results() {
        let query = CatalogQuery {
            sort: Some(SortOption::NameDesc),
            ..CatalogQuery::default()
        };
        let view = build_view(&catalog(25), &query, &NoMembership, &PaginationWindow::default());

        assert_eq!(view.state, ViewState::Results);
        assert_eq!(view.stats.total, 25);
        assert_eq!(view.stats.filtered, 25);
        assert_eq!(view.visible(), 20);
        assert!(view.has_more);
        assert_eq!(view.items[0].name, "Game 25");
    }

    #[test]
    fn distinguishes_no_data_from_no_matches() {
        let window = PaginationWindow::default();
        let empty = build_view(&[], &CatalogQuery::default(), &NoMembership, &window);
        assert_eq!(empty.state, ViewState::NoData);

        let mut query = CatalogQuery::default();
        query.criteria.keywords = "portal".into();
        let none = build_view(&catalog(3), &query, &NoMembership, &window);
        assert_eq!(none.state, ViewState::NoMatches);
        assert_eq!(none.stats.total, 3);
        assert!(!none.has_more);
    }
}
