//! RasterFE: a layered raster image editor.
//!
//! A [`LayerStack`] holds named [`Layer`]s, each optionally carrying a
//! [`RasterImage`].  Every editing operation targets the stack's current
//! layer.  Images load from and save to plain PPM, PNG and JPEG; whole stacks
//! round-trip through a layered-project manifest ([`project`]); the
//! [`ops::scripting`] module drives it all from a line-based command language.

pub mod canvas;
pub mod cli;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;

pub use canvas::{Layer, LayerStack, MAX_CHANNEL_VALUE, Pixel, RasterImage};
pub use error::{EditorError, EditorResult};
pub use io::FileType;
pub use ops::adjustments::TransformKind;
pub use ops::filters::FilterKind;
pub use ops::scripting::{Command, ScriptError, ScriptReport, ScriptSession};
