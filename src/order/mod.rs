mod monotonic;

pub use monotonic::{MonotonicOrder, OrderedPath};
