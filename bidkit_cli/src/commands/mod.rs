pub mod fetch;
pub mod live;
pub mod prefetch;
