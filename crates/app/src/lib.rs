pub mod applicants;
pub mod auth;
pub mod pages;
pub mod problem;
pub mod router;
pub mod seed;
pub mod telemetry;
