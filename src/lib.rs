mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod middleware;
}
mod api {
    pub mod handlers;
    pub mod routes;
}
mod config;
mod constants;

pub use api::routes::routes;
pub use api::*;
pub use authentication::*;
pub use config::Config;
pub use constants::*;
pub use database::*;
