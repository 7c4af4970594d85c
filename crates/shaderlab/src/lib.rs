//! HTTP surface of the GLSL playground: the JSON endpoints backed by
//! `shaderstore` and the static file mounts the browser client loads from.
pub mod api;
pub mod server;

pub use api::{ApiError, AppState, SaveRequest};
pub use server::{router, serve, SHADERS_MOUNT};
