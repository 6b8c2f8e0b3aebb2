//! # Filtering, Ordering and Paging
//!
//! List requests carry a JSON filter body whose values use the bracket-operator
//! grammar described in [`parser`]:
//!
//! ```json
//! {"create_time": "[-]2022-01-02 00:00:00,2022-01-04 01:00:00", "id": "[!*]2,3"}
//! ```
//!
//! - [`conditions`]: filter body to predicates and a `Condition`
//! - [`sort`]: `orderBy`/`orderDir` to ordering expressions
//! - [`pagination`]: `page`/`perPage` window and the `Content-Range` header

pub mod conditions;
pub mod pagination;
pub mod parser;
pub mod sort;

pub use conditions::{apply_filters, echo_filters, parse_filters};
pub use pagination::{Page, calculate_content_range};
pub use parser::{FilterLiteral, FilterOperator, FilterPredicate, parse, parse_expression};
pub use sort::{parse_order, resolve_ordering};
