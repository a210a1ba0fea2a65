//! svag-sprite - compile SVG icons into a symbol sprite
//!
//! A directory of icons becomes a single hidden `<svg>` holding one
//! `<symbol id="{symbol_prefix}--{path-derived-id}">` per icon, each run
//! through the optimizer with its internal ids namespaced so the symbols
//! cannot collide. A file source is taken to be a finished sprite and is
//! only optimized.
//!
//! ```no_run
//! let sprite = svag_sprite::compile(&svag_sprite::CompileOptions {
//!     source: "assets/icons".into(),
//!     ..Default::default()
//! })?;
//! # Ok::<(), svag_sprite::SpriteError>(())
//! ```

mod ast;
mod compiler;
mod config;
mod error;
mod ids;
mod invoke;
mod optimize;
mod options;
mod parse;
mod resolve;
mod serialize;
mod symbol;
mod walk;

pub use ast::*;
pub use compiler::*;
pub use config::*;
pub use error::*;
pub use ids::{CleanupIdsParams, PrefixIdsParams};
pub use invoke::*;
pub use optimize::*;
pub use options::*;
pub use parse::*;
pub use resolve::*;
pub use serialize::*;
pub use symbol::*;
pub use walk::*;
