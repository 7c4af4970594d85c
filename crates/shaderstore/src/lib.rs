//! Storage core of the GLSL playground: lists the chapter/exercise tree under a
//! shaders root and persists or deletes shader sources in it.
//!
//! ```text
//! <shaders_root>/<chapter>/<exercise>/fragment.glsl
//!                                    /vertex.glsl   (optional)
//! ```
//!
//! `ShaderStore` is the entry point; `build_structure` is exposed separately
//! for one-off listings that should bypass the cache.
mod cache;
mod error;
mod model;
mod path;
mod scan;
mod slug;
mod store;

pub use cache::{StructureCache, DEFAULT_TTL};
pub use error::StoreError;
pub use model::{
    creation_time, format_timestamp, Chapter, Exercise, Structure, FRAGMENT_FILE, VERTEX_FILE,
};
pub use path::{confine, normalize_lexically, plain_component};
pub use scan::build_structure;
pub use slug::slugify;
pub use store::{DeleteOutcome, ExerciseRef, ExerciseSources, ShaderStore};
