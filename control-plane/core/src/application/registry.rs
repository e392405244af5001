// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Unit Registry
//!
//! Name → [`Unit`] and URI → [`Resource`] lookup the transport dispatches
//! through. Resources resolve against static registrations first, then
//! against the first [`ResourceFactory`] that accepts the URI.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::context::CallContext;
use crate::domain::errors::{UnitError, UnitResult};
use crate::domain::events::CorrelationScope;
use crate::domain::resource::{Resource, ResourceFactory, Subscription};
use crate::domain::unit::{StreamChunk, Unit, UnitKind};

#[derive(Default)]
pub struct UnitRegistry {
    units: RwLock<BTreeMap<String, Unit>>,
    resources: RwLock<BTreeMap<String, Arc<dyn Resource>>>,
    factories: RwLock<Vec<Arc<dyn ResourceFactory>>>,
    correlation: CorrelationScope,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Correlation scope applied to every unit registered afterwards.
    pub fn with_correlation(mut self, scope: CorrelationScope) -> Self {
        self.correlation = scope;
        self
    }

    /// Rejects duplicate names and units whose schemas are malformed.
    pub fn register_unit(&self, unit: Unit) -> UnitResult<()> {
        check_schemas(&unit)?;
        let mut units = self.units.write();
        if units.contains_key(unit.name()) {
            return Err(UnitError::already_exists(format!("unit {} already registered", unit.name())));
        }
        debug!(unit = %unit.name(), kind = ?unit.kind(), "unit registered");
        let unit = unit.with_correlation(self.correlation);
        units.insert(unit.name().to_string(), unit);
        Ok(())
    }

    pub fn register_units<I>(&self, units: I) -> UnitResult<()>
    where
        I: IntoIterator<Item = Unit>,
    {
        for unit in units {
            self.register_unit(unit)?;
        }
        Ok(())
    }

    pub fn register_resource(&self, resource: Arc<dyn Resource>) -> UnitResult<()> {
        let mut resources = self.resources.write();
        let uri = resource.uri().to_string();
        if resources.contains_key(&uri) {
            return Err(UnitError::already_exists(format!("resource {} already registered", uri)));
        }
        debug!(uri = %uri, "resource registered");
        resources.insert(uri, resource);
        Ok(())
    }

    pub fn register_factory(&self, factory: Arc<dyn ResourceFactory>) {
        debug!(pattern = %factory.pattern(), "resource factory registered");
        self.factories.write().push(factory);
    }

    pub fn unit(&self, name: &str) -> UnitResult<Unit> {
        self.units
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| UnitError::not_found(format!("unit {} not found", name)))
    }

    pub fn resource(&self, uri: &str) -> UnitResult<Arc<dyn Resource>> {
        if let Some(resource) = self.resources.read().get(uri) {
            return Ok(resource.clone());
        }
        let factory = self
            .factories
            .read()
            .iter()
            .find(|factory| factory.can_create(uri))
            .cloned();
        match factory {
            Some(factory) => factory.create(uri),
            None => Err(UnitError::not_found(format!("resource {} not found", uri))),
        }
    }

    /// All units in name order.
    pub fn units(&self) -> Vec<Unit> {
        self.units.read().values().cloned().collect()
    }

    pub fn commands(&self) -> Vec<Unit> {
        self.units_of(UnitKind::Command)
    }

    pub fn queries(&self) -> Vec<Unit> {
        self.units_of(UnitKind::Query)
    }

    pub fn units_in_domain(&self, domain: &str) -> Vec<Unit> {
        self.units
            .read()
            .values()
            .filter(|unit| unit.domain() == domain)
            .cloned()
            .collect()
    }

    /// Statically registered resources in URI order.
    pub fn resources(&self) -> Vec<Arc<dyn Resource>> {
        self.resources.read().values().cloned().collect()
    }

    pub fn factories(&self) -> Vec<Arc<dyn ResourceFactory>> {
        self.factories.read().clone()
    }

    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    pub async fn execute(&self, ctx: &CallContext, name: &str, input: Value) -> UnitResult<Value> {
        let unit = self.unit(name)?;
        unit.execute(ctx, input).await
    }

    pub async fn execute_stream(
        &self,
        ctx: &CallContext,
        name: &str,
        input: Value,
        outbound: &mpsc::Sender<StreamChunk>,
    ) -> UnitResult<()> {
        let unit = self.unit(name)?;
        unit.execute_stream(ctx, input, outbound).await
    }

    pub async fn get_resource(&self, ctx: &CallContext, uri: &str) -> UnitResult<Value> {
        let resource = self.resource(uri)?;
        resource.get(ctx).await
    }

    pub fn watch_resource(&self, ctx: &CallContext, uri: &str) -> UnitResult<Subscription> {
        self.resource(uri)?.watch(ctx)
    }

    fn units_of(&self, kind: UnitKind) -> Vec<Unit> {
        self.units
            .read()
            .values()
            .filter(|unit| unit.kind() == kind)
            .cloned()
            .collect()
    }
}

fn check_schemas(unit: &Unit) -> UnitResult<()> {
    for (side, schema) in [("input", unit.input_schema()), ("output", unit.output_schema())] {
        schema.check().map_err(|e| {
            UnitError::invalid_input(format!("unit {} {} schema: {}", unit.name(), side, e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::watch::{fetch_from, spawn_poller, Constant, PollSpec};
    use crate::domain::errors::ErrorCode;
    use crate::domain::resource::ResourceOperation;
    use crate::domain::schema::Schema;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct StaticResource {
        uri: String,
    }

    #[async_trait]
    impl Resource for StaticResource {
        fn uri(&self) -> &str {
            &self.uri
        }

        fn domain(&self) -> &str {
            "demo"
        }

        fn schema(&self) -> Schema {
            Schema::object().property("uri", Schema::string())
        }

        async fn get(&self, _ctx: &CallContext) -> UnitResult<Value> {
            Ok(json!({ "uri": self.uri }))
        }

        fn watch(self: Arc<Self>, ctx: &CallContext) -> UnitResult<Subscription> {
            let spec = PollSpec::new(self.uri.clone(), Duration::from_secs(1));
            Ok(spawn_poller(ctx, spec, Arc::new(Constant(ResourceOperation::Refresh)), fetch_from(self)))
        }
    }

    struct ThingFactory;

    impl ResourceFactory for ThingFactory {
        fn can_create(&self, uri: &str) -> bool {
            uri.strip_prefix("asms://thing/").is_some_and(|id| !id.is_empty())
        }

        fn create(&self, uri: &str) -> UnitResult<Arc<dyn Resource>> {
            Ok(Arc::new(StaticResource { uri: uri.to_string() }))
        }

        fn pattern(&self) -> &str {
            "asms://thing/*"
        }
    }

    fn noop(name: &str) -> Unit {
        Unit::query(name.to_string(), "noop").handler(|_ctx, _input| async { Ok(json!({})) })
    }

    #[test]
    fn test_duplicate_names_and_uris_are_rejected() {
        let registry = UnitRegistry::new();
        registry.register_unit(noop("demo.a")).unwrap();
        let err = registry.register_unit(noop("demo.a")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);

        let resource: Arc<dyn Resource> = Arc::new(StaticResource { uri: "asms://demo".into() });
        registry.register_resource(resource.clone()).unwrap();
        assert!(registry.register_resource(resource).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_malformed_schemas_are_rejected_at_registration() {
        let registry = UnitRegistry::new();
        let undeclared = Unit::command("demo.bad", "requires a field it never declares")
            .input(Schema::object().property("model", Schema::string()).require(["model", "input"]))
            .handler(|_ctx, _input| async { Ok(json!({})) });
        let err = registry.register_unit(undeclared).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.message().contains("demo.bad input schema"));
        assert!(err.message().contains("\"input\" is not a declared property"));

        let mut no_items = Schema::string_array();
        no_items.items = None;
        let bad_output = Unit::query("demo.list", "list without item schema")
            .output(Schema::object().property("items", no_items))
            .handler(|_ctx, _input| async { Ok(json!({})) });
        let err = registry.register_unit(bad_output).unwrap_err();
        assert!(err.message().contains("demo.list output schema"));

        assert!(registry.is_empty());
    }

    #[test]
    fn test_listings_are_name_ordered_and_split_by_kind() {
        let registry = UnitRegistry::new();
        registry
            .register_units([
                noop("demo.zeta"),
                Unit::command("demo.alpha", "mutates").handler(|_ctx, _input| async { Ok(json!({})) }),
                noop("other.beta"),
            ])
            .unwrap();

        let names: Vec<_> = registry.units().iter().map(|u| u.name().to_string()).collect();
        assert_eq!(names, vec!["demo.alpha", "demo.zeta", "other.beta"]);
        assert_eq!(registry.commands().len(), 1);
        assert_eq!(registry.queries().len(), 2);
        assert_eq!(registry.units_in_domain("demo").len(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_unit_and_uri_are_not_found() {
        let registry = UnitRegistry::new();
        let ctx = CallContext::background();
        let err = registry.execute(&ctx, "demo.missing", json!({})).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = registry.get_resource(&ctx, "asms://nowhere").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_static_resource_wins_over_factory() {
        let registry = UnitRegistry::new();
        registry.register_factory(Arc::new(ThingFactory));
        registry
            .register_resource(Arc::new(StaticResource { uri: "asms://thing/fixed".into() }))
            .unwrap();

        let ctx = CallContext::background();
        let fixed = registry.get_resource(&ctx, "asms://thing/fixed").await.unwrap();
        assert_eq!(fixed["uri"], "asms://thing/fixed");
        let built = registry.get_resource(&ctx, "asms://thing/42").await.unwrap();
        assert_eq!(built["uri"], "asms://thing/42");
        assert!(registry.resource("asms://thing/").is_err());
        assert_eq!(registry.factories()[0].pattern(), "asms://thing/*");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_through_registry() {
        let registry = UnitRegistry::new();
        registry.register_factory(Arc::new(ThingFactory));
        let mut sub = registry
            .watch_resource(&CallContext::background(), "asms://thing/7")
            .unwrap();
        let update = sub.recv().await.unwrap();
        assert_eq!(update.operation, ResourceOperation::Refresh);
        assert_eq!(update.data.unwrap()["uri"], "asms://thing/7");
    }
}
