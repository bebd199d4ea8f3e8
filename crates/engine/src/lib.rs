//! Viewport-synchronized clustering for a map of listings.
//!
//! The host owns a [`MapSurface`] and a [`listings::ViewStore`], pushes
//! [`Command`]s in, calls [`ClusterEngine::tick`] once per frame and reads
//! [`EngineEvent`]s back out.

pub mod config;
pub mod engine;
pub mod expansion;
pub mod focus;
pub mod hover;
pub mod markers;
pub mod ready;
pub mod surface;
pub mod viewport;
pub mod visible;

pub use config::*;
pub use engine::*;
pub use expansion::*;
pub use focus::*;
pub use hover::*;
pub use markers::*;
pub use ready::*;
pub use surface::*;
pub use viewport::*;
pub use visible::*;
