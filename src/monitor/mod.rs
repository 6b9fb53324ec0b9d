//! The monitoring core: velocity computation, severity classification and
//! the per-cycle orchestration that ties them together.

pub mod classifier;
pub mod cycle;
pub mod velocity;
