//! Filter, sort and pagination stages between the cache and the renderer.

/// Conjunctive filter predicates.
pub mod filter;
/// Deterministic orderings.
pub mod sort;
/// Pagination and view assembly.
pub mod view;

pub use filter::{
    apply, available_tags, FilterCriteria, FilterOutcome, Membership, MembershipFilter,
    NoMembership,
};
pub use sort::{sort, sorted, SortOption};
pub use view::{build_view, CatalogQuery, CatalogView, PaginationWindow, ViewState};
