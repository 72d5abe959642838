pub mod http_client;
pub mod user_agent;

pub use http_client::{HttpClient, ProbeOutcome};
pub use user_agent::random_user_agent;
