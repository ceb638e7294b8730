//! HTTP API handlers for gnosis-cs

pub mod groups;
pub mod health;
pub mod images;
pub mod profile_groups;
pub mod profiles;
pub mod streams;

pub use groups::group_routes;
pub use health::health_routes;
pub use images::image_routes;
pub use profile_groups::profile_group_routes;
pub use profiles::profile_routes;
pub use streams::stream_routes;
