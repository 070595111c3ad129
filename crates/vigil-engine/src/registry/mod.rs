//! View binding registry.
//!
//! Each resource cache owns one [`ViewRegistry`]: a map from identity key
//! to [`ViewHandle`], mutated only by applying diff operations.
//!
//! ```text
//! Vec<DiffOp> ──apply──▶ ViewRegistry ──▶ Vec<ViewChange>
//!                          │
//!                          ├─ lookup(key) -> Option<&ViewHandle>
//!                          └─ for_each(|handle| ..)
//! ```

mod handle;
mod view;

pub use handle::{HandleId, ViewHandle};
pub use view::ViewRegistry;
