//! Data models for the station amenity tracker.
//!
//! Field names serialize as camelCase to match the web client.

mod amenity;
mod inspection;
mod issue;
mod report;
mod role;
mod settings;
mod station;
mod user;

pub use amenity::*;
pub use inspection::*;
pub use issue::*;
pub use report::*;
pub use role::*;
pub use settings::*;
pub use station::*;
pub use user::*;
