#![forbid(unsafe_code)]

//! Test harness for calview.
//!
//! - [`dom::MockHost`]: an in-memory document implementing
//!   [`calview_core::host::Host`], with builders for calendar markup and
//!   accessors for everything the engine writes.
//! - [`driver::Harness`]: dispatches simulated clicks, keys, scrolls,
//!   intersection readings and timer expiry into a
//!   [`CalendarView`](calview_core::CalendarView).

pub mod dom;
pub mod driver;

pub use dom::{MockHost, MockObserver, NodeId};
pub use driver::Harness;
