//! BoxLink Core Library
//!
//! Platform-agnostic scene model, pointer interaction and cross-tab
//! replication for the BoxLink diagram canvas.

pub mod collaboration;
pub mod config;
pub mod controller;
pub mod editor;
pub mod geometry;
pub mod input;
pub mod scene;
pub mod selection;
pub mod shapes;
pub mod snapshot;
pub mod sync;

pub use collaboration::ReplicationClient;
pub use config::{ConfigError, EditorConfig, ReplicationConfig};
pub use controller::{InteractionController, InteractionState};
pub use editor::{Editor, EditorEvent};
pub use input::{Modifiers, MouseButton, PointerEvent};
pub use scene::{CanvasOptions, Proximity, Scene};
pub use selection::{Selection, SelectionMode};
pub use snapshot::{Envelope, IncomingSnapshot, SceneSnapshot, SnapshotError};
pub use sync::{ConnectionState, ReplicationChannel, ReplicationError};
