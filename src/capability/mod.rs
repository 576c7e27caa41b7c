//! Capability units: named, independently callable operations the chains
//! sequence. The description is the only thing the planner sees of a unit, so
//! it documents every accepted input shape and the output.

pub mod builtin;
mod error;
mod input;
mod registry;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use error::CapabilityError;
pub use input::{StructuredInput, parse_input, validate_content_id, validate_language_code};
pub use registry::{CapabilityRegistry, DuplicateCapability};

#[async_trait]
pub trait Capability: Send + Sync {
    /// Stable identifier; registry key and the `name` of tool-role messages.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Runs the unit. `input` is either a bare video id or a JSON object
    /// matching the shape in `description`.
    async fn call(&self, cancel: &CancellationToken, input: &str)
    -> Result<String, CapabilityError>;
}
