//! Test harness
//!
//! Drives a container factory on behalf of a test: creates the container
//! for the configured base URI, starts it, hands out an HTTP client and
//! stops the container again on tear-down.

use testbed_descriptor::AppDescriptor;
use tracing::info;
use url::Url;

use crate::config::HarnessConfig;
use crate::errors::ContainerError;
use crate::factory::{TestContainer, TestContainerFactory};
use crate::mapping::append_path;

pub struct TestHarness {
    container: Box<dyn TestContainer>,
    client: reqwest::Client,
}

impl TestHarness {
    /// Deploy `descriptor` using configuration from the environment
    pub async fn setup(
        factory: &dyn TestContainerFactory,
        descriptor: AppDescriptor,
    ) -> Result<Self, ContainerError> {
        Self::setup_with_config(factory, descriptor, &HarnessConfig::from_env()?).await
    }

    pub async fn setup_with_config(
        factory: &dyn TestContainerFactory,
        descriptor: AppDescriptor,
        config: &HarnessConfig,
    ) -> Result<Self, ContainerError> {
        if factory.supports() != descriptor.kind() {
            return Err(ContainerError::invalid(format!(
                "container factory supports {:?} descriptors, not {:?}",
                factory.supports(),
                descriptor.kind()
            )));
        }

        let base_uri = config.base_uri()?;
        let mut container = factory.create(&base_uri, descriptor)?;
        container.start().await?;

        let client = container.client().unwrap_or_default();
        info!("Test container started at {}", container.base_uri());

        Ok(Self { container, client })
    }

    pub fn base_uri(&self) -> &Url {
        self.container.base_uri()
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// URI of a resource below the base URI
    pub fn resource(&self, path: &str) -> Url {
        append_path(self.container.base_uri(), path)
    }

    /// Stop the container
    pub async fn tear_down(mut self) -> Result<(), ContainerError> {
        self.container.stop().await
    }
}
