mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;
}

pub mod services {
    pub mod catalog;
    pub mod composition;
    pub mod follows;
    pub mod membership;
    pub mod recipes;
    pub mod shopping_cart;
    pub mod users;
    pub mod views;
}

pub mod config;
pub mod routes;

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
