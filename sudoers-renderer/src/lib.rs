//! # sudoers-renderer
//!
//! Tera-based renderer that turns a [`DesiredGrant`] into the single-line
//! sudoers rule installed for it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sudoers_core::DesiredGrant;
//! use sudoers_renderer::Renderer;
//!
//! fn show(grant: &DesiredGrant) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(line) = renderer.render_grant(grant) {
//!             println!("{line}");
//!         }
//!     }
//! }
//! ```
//!
//! [`DesiredGrant`]: sudoers_core::DesiredGrant

pub mod context;
pub mod engine;
pub mod error;

pub use context::GrantContext;
pub use engine::{render, Renderer};
pub use error::RenderError;
