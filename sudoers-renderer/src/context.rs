//! Template context: serializable rendering payload built from a grant.

use serde::{Deserialize, Serialize};

use sudoers_core::DesiredGrant;

use crate::error::RenderError;

/// Values substituted into the grant template, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantContext {
    pub application: String,
    pub principals: Vec<String>,
}

impl GrantContext {
    pub fn new(application: &str, principals: &[String]) -> Self {
        Self {
            application: application.to_string(),
            principals: principals.to_vec(),
        }
    }

    pub fn from_grant(grant: &DesiredGrant) -> Self {
        Self::new(&grant.app.0, &grant.principals)
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
