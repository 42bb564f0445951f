pub mod playlist;
pub mod routes;
pub mod types;

pub use routes::routes;
