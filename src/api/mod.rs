pub mod error;
pub mod models;
pub mod routes;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use routes::router;
pub use server::run;
