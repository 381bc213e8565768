//! BoxLink Render Library
//!
//! Draws a [`boxlink_core::Scene`] onto any [`DrawingSurface`].
//! [`RecordingSurface`] captures commands headlessly; the optional
//! `vello-renderer` feature adds a Vello-backed surface.

mod recording;
mod renderer;
mod surface;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use recording::{DrawCommand, RecordingSurface};
pub use renderer::{RenderOptions, SceneRenderer};
pub use surface::{DrawingSurface, TextAlign, TextBaseline, draw_path};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;
