mod snap;

pub use snap::{NodedArrangement, SnapNoder, DEFAULT_MAX_PASSES};
