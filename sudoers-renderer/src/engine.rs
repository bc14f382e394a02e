//! Tera rendering engine: [`Renderer`].
//!
//! # Output format
//!
//! One line, no trailing newline:
//!
//! ```text
//! xavier, donalias ALL = (testapp) ALL
//! ```
//!
//! Principals and the application name are substituted verbatim. Nothing is
//! escaped, so the syntax checker run by the installer is the only guard
//! against malformed or injected rules.

use tera::Tera;

use sudoers_core::DesiredGrant;

use crate::context::GrantContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded template: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const GRANT_TEMPLATE_NAME: &str = "grant.tera";
const GRANT_TEMPLATE: &str = include_str!("templates/grant.tera");

fn build_tera() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(GRANT_TEMPLATE_NAME, GRANT_TEMPLATE.trim_end_matches('\n'))?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders grant content from the embedded template.
///
/// Create once with [`Renderer::new`] and reuse across a pass.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { tera: build_tera()? })
    }

    /// Render the rule for `application` and its ordered `principals`.
    pub fn render(&self, application: &str, principals: &[String]) -> Result<String, RenderError> {
        self.render_with_context(&GrantContext::new(application, principals))
    }

    pub fn render_grant(&self, grant: &DesiredGrant) -> Result<String, RenderError> {
        self.render_with_context(&GrantContext::from_grant(grant))
    }

    pub fn render_with_context(&self, ctx: &GrantContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        Ok(self.tera.render(GRANT_TEMPLATE_NAME, &tera_ctx)?)
    }
}

/// One-shot convenience wrapper around [`Renderer::render`].
pub fn render(application: &str, principals: &[String]) -> Result<String, RenderError> {
    Renderer::new()?.render(application, principals)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
