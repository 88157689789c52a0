pub mod auth;
pub mod cookies;
pub mod extract;
pub mod middleware;
pub mod multipart;
pub mod response;
pub mod rest;
pub mod routes;
pub mod state;
pub mod users;
pub mod validation;

// Re-export the router builder and state to make them easily accessible
// to the binary that will build the web server.
pub use routes::api_router;
pub use state::AppState;
