pub mod handlers;
pub mod principal;
pub mod response;
mod routes;

pub use routes::create_router;
