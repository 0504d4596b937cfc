mod client;
mod errors;
mod request;
pub mod types;
mod user_agent;
pub use self::client::Client;
pub use self::errors::Error;
pub use self::request::{BidRequest, Publisher, RequestSlot, User};
