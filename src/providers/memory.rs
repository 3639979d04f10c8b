//! A provider backed by in-memory objects.
//!
//! Serves live objects and data source results from maps supplied up
//! front, and plans changes purely from its schema: configured attributes
//! win, computed attributes carry over from the prior object unless the
//! object is being replaced, and force-new attributes trigger replacement.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::addrs::{ResourceInstanceAddress, ResourceMode};
use crate::error::ProviderError;
use crate::state::ObjectStatus;

use super::{
    DataSourceRead, PlanResourceChangeRequest, PlanResourceChangeResponse, Provider,
    ProviderSchema, ReadDataSourceRequest, ReadResourceRequest, ReadResourceResponse,
    ResourceSchema,
};

/// Provider serving objects from memory.
#[derive(Debug)]
pub struct InMemoryProvider {
    /// Schema used for validation and planning.
    schema: ProviderSchema,
    /// Live managed objects by address.
    live: RwLock<HashMap<ResourceInstanceAddress, Value>>,
    /// Data source results by address.
    data: RwLock<HashMap<ResourceInstanceAddress, DataSourceRead>>,
}

impl InMemoryProvider {
    /// Creates a provider with no live objects.
    #[must_use]
    pub fn new(schema: ProviderSchema) -> Self {
        Self {
            schema,
            live: RwLock::new(HashMap::new()),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a live managed object.
    #[must_use]
    pub fn with_live_object(mut self, address: ResourceInstanceAddress, value: Value) -> Self {
        self.live.get_mut().insert(address, value);
        self
    }

    /// Adds a data source result.
    #[must_use]
    pub fn with_data(mut self, address: ResourceInstanceAddress, value: Value) -> Self {
        self.data.get_mut().insert(address, DataSourceRead::Ready(value));
        self
    }

    /// Marks a data source as only readable at apply time.
    #[must_use]
    pub fn with_deferred_data(mut self, address: ResourceInstanceAddress) -> Self {
        self.data.get_mut().insert(address, DataSourceRead::Deferred);
        self
    }

    /// Removes a live object, as if it had been deleted out of band.
    pub async fn delete_live_object(&self, address: &ResourceInstanceAddress) -> Option<Value> {
        self.live.write().await.remove(address)
    }

    fn resource_schema(
        &self,
        mode: ResourceMode,
        type_name: &str,
    ) -> Result<&ResourceSchema, ProviderError> {
        self.schema.schema_for(mode, type_name).ok_or_else(|| ProviderError::Diagnostic {
            summary: String::from("Unsupported resource type"),
            detail: format!("{mode} resource type {type_name} is not supported by this provider"),
        })
    }

    fn check_config(
        schema: &ResourceSchema,
        address: &ResourceInstanceAddress,
        config: &serde_json::Map<String, Value>,
    ) -> Result<(), ProviderError> {
        let problems = schema.validate_config(config);
        if problems.is_empty() {
            return Ok(());
        }
        Err(ProviderError::Diagnostic {
            summary: String::from("Invalid configuration"),
            detail: format!("{address}: {}", problems.join("; ")),
        })
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn read_resource(
        &self,
        request: ReadResourceRequest,
    ) -> Result<ReadResourceResponse, ProviderError> {
        self.resource_schema(ResourceMode::Managed, &request.address.resource.type_name)?;

        let new_state = self.live.read().await.get(&request.address).cloned();
        if new_state.is_none() {
            debug!("{} not found in live objects", request.address);
        }

        Ok(ReadResourceResponse {
            new_state,
            private: request.prior.private,
        })
    }

    async fn plan_resource_change(
        &self,
        request: PlanResourceChangeRequest,
    ) -> Result<PlanResourceChangeResponse, ProviderError> {
        let schema =
            self.resource_schema(ResourceMode::Managed, &request.address.resource.type_name)?;
        Self::check_config(schema, &request.address, &request.proposed)?;

        let mut planned = request.proposed;
        let mut unknown = request.unknown;

        let requires_replace = request.prior.as_ref().map_or_else(Vec::new, |prior| {
            schema.requires_replace(&prior.attributes, &Value::Object(planned.clone()))
        });

        let carry_over = request
            .prior
            .as_ref()
            .filter(|p| requires_replace.is_empty() && p.status != ObjectStatus::Tainted);

        for name in schema.computed_attributes() {
            if planned.contains_key(name) || unknown.contains(name) {
                continue;
            }
            match carry_over.and_then(|p| p.attributes.get(name)) {
                Some(value) => {
                    planned.insert(name.to_string(), value.clone());
                }
                None => {
                    unknown.insert(name.to_string());
                }
            }
        }

        Ok(PlanResourceChangeResponse {
            planned: Value::Object(planned),
            unknown,
            requires_replace,
            private: request.prior.and_then(|p| p.private),
        })
    }

    async fn read_data_source(
        &self,
        request: ReadDataSourceRequest,
    ) -> Result<DataSourceRead, ProviderError> {
        let schema = self.resource_schema(ResourceMode::Data, &request.address.resource.type_name)?;
        Self::check_config(schema, &request.address, &request.config)?;

        self.data
            .read()
            .await
            .get(&request.address)
            .cloned()
            .ok_or_else(|| ProviderError::Diagnostic {
                summary: String::from("No matching object"),
                detail: format!("{} matched nothing", request.address),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::AttributeSchema;
    use crate::state::ResourceInstanceObject;
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    fn schema() -> ProviderSchema {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            String::from("ami"),
            AttributeSchema { required: true, computed: false, force_new: true },
        );
        attributes.insert(String::from("size"), AttributeSchema::default());
        attributes.insert(
            String::from("id"),
            AttributeSchema { required: false, computed: true, force_new: false },
        );

        let mut schema = ProviderSchema::default();
        schema
            .resource_types
            .insert(String::from("aws_instance"), ResourceSchema { version: 1, attributes });
        schema
    }

    fn addr() -> ResourceInstanceAddress {
        "aws_instance.web".parse().expect("parse")
    }

    fn plan_request(prior: Option<ResourceInstanceObject>, ami: &str) -> PlanResourceChangeRequest {
        let mut proposed = serde_json::Map::new();
        proposed.insert(String::from("ami"), json!(ami));
        proposed.insert(String::from("size"), json!("large"));
        PlanResourceChangeRequest {
            address: addr(),
            prior,
            proposed,
            unknown: BTreeSet::new(),
            create_before_destroy: false,
        }
    }

    #[tokio::test]
    async fn test_plan_update_carries_computed() {
        let provider = InMemoryProvider::new(schema());
        let prior = ResourceInstanceObject::new(json!({"ami": "a", "size": "small", "id": "i-1"}));

        let resp = provider
            .plan_resource_change(plan_request(Some(prior), "a"))
            .await
            .expect("plan");

        assert!(resp.requires_replace.is_empty());
        assert_eq!(resp.planned["id"], json!("i-1"));
        assert!(resp.unknown.is_empty());
    }

    #[tokio::test]
    async fn test_plan_replace_marks_computed_unknown() {
        let provider = InMemoryProvider::new(schema());
        let prior = ResourceInstanceObject::new(json!({"ami": "a", "size": "small", "id": "i-1"}));

        let resp = provider
            .plan_resource_change(plan_request(Some(prior), "b"))
            .await
            .expect("plan");

        assert_eq!(resp.requires_replace, vec![String::from("ami")]);
        assert!(resp.unknown.contains("id"));
        assert!(resp.planned.get("id").is_none());
    }

    #[tokio::test]
    async fn test_plan_rejects_invalid_config() {
        let provider = InMemoryProvider::new(schema());
        let mut request = plan_request(None, "a");
        request.proposed.remove("ami");

        let err = provider.plan_resource_change(request).await.expect_err("must fail");
        assert!(err.to_string().contains("ami"));
    }

    #[tokio::test]
    async fn test_read_resource_gone() {
        let provider = InMemoryProvider::new(schema()).with_live_object(addr(), json!({"ami": "a"}));
        let request = ReadResourceRequest {
            address: addr(),
            prior: ResourceInstanceObject::new(json!({"ami": "a"})),
        };

        let found = provider.read_resource(request.clone()).await.expect("read");
        assert_eq!(found.new_state, Some(json!({"ami": "a"})));

        provider.delete_live_object(&addr()).await;
        let gone = provider.read_resource(request).await.expect("read");
        assert_eq!(gone.new_state, None);
    }
}
