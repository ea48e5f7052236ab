//! HTTP API handlers for confhub-server

pub mod conferences;
pub mod dashboard;
pub mod health;
pub mod papers;
pub mod profile;
pub mod reviewers;

pub use conferences::conference_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use papers::paper_routes;
pub use profile::profile_routes;
pub use reviewers::reviewer_routes;
