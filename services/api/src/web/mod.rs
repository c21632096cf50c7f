pub mod rest;
pub mod state;

// Re-export the pieces the server binary wires together.
pub use rest::ApiDoc;
pub use state::AppState;
