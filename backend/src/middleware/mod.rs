//! Request middleware.
//!
//! Register [`ErrorFilter`] before [`Correlation`] so the correlation scope
//! encloses error rendering:
//!
//! ```text
//! App::new().wrap(ErrorFilter::new(formatter)).wrap(Correlation)
//! ```

pub mod correlation;
pub mod error_filter;

pub use correlation::{CORRELATION_HEADER, Correlation};
pub use error_filter::ErrorFilter;
