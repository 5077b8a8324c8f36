//! Entity types for the v2 API.

pub mod customer;
pub mod link;
pub mod task;

pub use customer::{Customer, CustomerField};
pub use link::{Link, LinkField};
pub use task::{ElementType, Task, TaskField};
