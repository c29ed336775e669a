// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod api;
pub mod app_dirs;
pub mod collage;
pub mod config;
pub mod error;
pub mod feedback;
pub mod game;
pub mod geometry;
pub mod leaderboard;
pub mod local_store;
pub mod logging;
pub mod placement;
pub mod runtime;
pub mod scheduler;
