//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type.

pub mod shell_script;

use async_trait::async_trait;
use shellform_common::{ResourceConfig, ResourceState, Result};

/// Trait for resource operations
///
/// Every operation returns the resulting state. On error the caller keeps
/// the state it passed in.
#[async_trait]
pub trait Resource {
    /// Resource type name
    fn type_name() -> &'static str;

    /// Create a new resource
    async fn create(&self, config: &ResourceConfig) -> Result<ResourceState>;

    /// Refresh an existing resource. The returned state has an empty id
    /// when the resource no longer exists.
    async fn read(&self, config: &ResourceConfig, state: &ResourceState) -> Result<ResourceState>;

    /// Update an existing resource in place
    async fn update(&self, config: &ResourceConfig, state: &ResourceState)
        -> Result<ResourceState>;

    /// Delete a resource
    async fn delete(&self, config: &ResourceConfig, state: &ResourceState)
        -> Result<ResourceState>;
}
