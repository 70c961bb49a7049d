//! Binding declarations and plans
//!
//! A type declares its bindings once through [`Bindable::bindings`]. The
//! declaration is validated into a [`BindingPlan`] the first time the type is
//! bound and cached for the life of the process.
//!
//! # Example
//!
//! ```rust
//! use labrack::binder::{Bindable, FieldBinding, RawRequest};
//!
//! #[derive(Debug, Default)]
//! struct PortFilter {
//!     limit: i32,
//!     site: String,
//! }
//!
//! impl Bindable for PortFilter {
//!     fn bindings() -> Vec<FieldBinding<Self>> {
//!         vec![
//!             FieldBinding::query("limit", "limit", |f: &mut Self, v| f.limit = v).required(),
//!             FieldBinding::header("site", "X-Lab-Site", |f: &mut Self, v| f.site = v),
//!         ]
//!     }
//! }
//!
//! let request = RawRequest::new().with_query("limit", "25");
//! let filter = PortFilter::bind(&request).unwrap();
//! assert_eq!(filter.limit, 25);
//! assert_eq!(filter.site, "");
//! ```

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use thiserror::Error;
use tracing::debug;

use super::kind::{BindScalar, ScalarKind, ScalarValue};
use super::request::{RequestParts, Source};

type Setter<T> = Arc<dyn Fn(&mut T, ScalarValue) + Send + Sync>;

/// Binding failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The binding declaration itself is invalid
    #[error("invalid binding declaration for {target}: {reason}")]
    Configuration { target: &'static str, reason: String },

    /// A required field received a value that does not parse
    #[error("invalid value for field '{field}' from {origin} '{key}': {reason}")]
    InvalidValue {
        field: String,
        /// Request part the value was read from
        origin: Source,
        key: String,
        reason: String,
    },
}

/// One field bound from one request source
pub struct FieldBinding<T> {
    field: String,
    source: Source,
    key: String,
    required: bool,
    kind: ScalarKind,
    setter: Setter<T>,
}

impl<T: 'static> FieldBinding<T> {
    /// Bind `field` from `source` under `key`; the value kind follows `V`
    pub fn new<V, F>(field: &str, source: Source, key: &str, setter: F) -> Self
    where
        V: BindScalar,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            field: field.to_string(),
            source,
            key: key.to_string(),
            required: false,
            kind: V::KIND,
            setter: Arc::new(move |target, value| {
                if let Some(value) = V::from_value(value) {
                    setter(target, value);
                }
            }),
        }
    }

    pub fn query<V, F>(field: &str, key: &str, setter: F) -> Self
    where
        V: BindScalar,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(field, Source::Query, key, setter)
    }

    pub fn path<V, F>(field: &str, key: &str, setter: F) -> Self
    where
        V: BindScalar,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(field, Source::Path, key, setter)
    }

    pub fn header<V, F>(field: &str, key: &str, setter: F) -> Self
    where
        V: BindScalar,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(field, Source::Header, key, setter)
    }

    /// Fail the bind when a present value does not parse
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Re-target this binding onto a parent type through `accessor`
    pub fn lift<P: 'static>(self, prefix: &str, accessor: fn(&mut P) -> &mut T) -> FieldBinding<P> {
        let setter = self.setter;
        FieldBinding {
            field: format!("{}.{}", prefix, self.field),
            source: self.source,
            key: self.key,
            required: self.required,
            kind: self.kind,
            setter: Arc::new(move |parent: &mut P, value| setter(accessor(parent), value)),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    fn normalized_key(&self) -> String {
        match self.source {
            Source::Header => self.key.to_ascii_lowercase(),
            Source::Query | Source::Path => self.key.clone(),
        }
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("source", &self.source)
            .field("key", &self.key)
            .field("required", &self.required)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Lift every binding of a nested bindable structure onto its parent
pub fn nested<P, C>(prefix: &str, accessor: fn(&mut P) -> &mut C) -> Vec<FieldBinding<P>>
where
    P: 'static,
    C: Bindable,
{
    C::bindings()
        .into_iter()
        .map(|binding| binding.lift(prefix, accessor))
        .collect()
}

/// A validated binding declaration
pub struct BindingPlan<T> {
    bindings: Vec<FieldBinding<T>>,
    sources: Vec<Source>,
}

impl<T: 'static> BindingPlan<T> {
    /// Validate a declaration: keys must be non-empty, and no two fields may
    /// read the same key from the same source
    pub fn new(bindings: Vec<FieldBinding<T>>) -> Result<Self, BindError> {
        let target = std::any::type_name::<T>();
        let mut seen_keys = HashSet::new();
        let mut seen_fields = HashSet::new();

        for binding in &bindings {
            if binding.key.trim().is_empty() {
                return Err(BindError::Configuration {
                    target,
                    reason: format!("field '{}' has an empty {} key", binding.field, binding.source),
                });
            }
            if !seen_fields.insert(binding.field.clone()) {
                return Err(BindError::Configuration {
                    target,
                    reason: format!("field '{}' is bound twice", binding.field),
                });
            }
            if !seen_keys.insert((binding.source, binding.normalized_key())) {
                return Err(BindError::Configuration {
                    target,
                    reason: format!(
                        "{} key '{}' is bound by more than one field",
                        binding.source, binding.key
                    ),
                });
            }
        }

        let sources = Source::ALL
            .into_iter()
            .filter(|source| bindings.iter().any(|b| b.source == *source))
            .collect();

        Ok(Self { bindings, sources })
    }

    /// Sources referenced by at least one binding, in visiting order
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn references(&self, source: Source) -> bool {
        self.sources.contains(&source)
    }

    pub fn bindings(&self) -> &[FieldBinding<T>] {
        &self.bindings
    }

    /// Bind request values onto `target`
    ///
    /// Missing or empty values leave the field's current value in place. An
    /// unparsable value does the same for optional fields and fails the bind
    /// for required ones.
    pub fn bind<R>(&self, target: &mut T, request: &R) -> Result<(), BindError>
    where
        R: RequestParts + ?Sized,
    {
        for source in &self.sources {
            for binding in self.bindings.iter().filter(|b| b.source == *source) {
                let Some(raw) = request
                    .value(*source, &binding.key)
                    .filter(|raw| !raw.is_empty())
                else {
                    continue;
                };

                match binding.kind.parse(raw) {
                    Ok(value) => (binding.setter)(target, value),
                    Err(e) if binding.required => {
                        return Err(BindError::InvalidValue {
                            field: binding.field.clone(),
                            origin: *source,
                            key: binding.key.clone(),
                            reason: e.to_string(),
                        })
                    }
                    Err(e) => {
                        debug!(
                            field = %binding.field,
                            source = %source,
                            error = %e,
                            "keeping default for unparsable optional value"
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl<T> fmt::Debug for BindingPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingPlan")
            .field("bindings", &self.bindings)
            .field("sources", &self.sources)
            .finish()
    }
}

/// A structure populated from request values
pub trait Bindable: Default + Send + 'static {
    /// Field bindings in declaration order
    fn bindings() -> Vec<FieldBinding<Self>>;

    /// The validated, cached plan for this type
    fn plan() -> Result<Arc<BindingPlan<Self>>, BindError> {
        plan_for::<Self>()
    }

    /// Build a value from defaults, then overlay request values
    fn bind<R>(request: &R) -> Result<Self, BindError>
    where
        R: RequestParts + ?Sized,
    {
        let plan = Self::plan()?;
        let mut target = Self::default();
        plan.bind(&mut target, request)?;
        Ok(target)
    }
}

type PlanCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static PLANS: OnceLock<PlanCache> = OnceLock::new();

fn plan_for<T: Bindable>() -> Result<Arc<BindingPlan<T>>, BindError> {
    let plans = PLANS.get_or_init(PlanCache::default);
    let type_id = TypeId::of::<T>();

    let cached = plans
        .read()
        .ok()
        .and_then(|plans| plans.get(&type_id).cloned());
    if let Some(plan) = cached.and_then(|plan| plan.downcast::<BindingPlan<T>>().ok()) {
        return Ok(plan);
    }

    let plan = Arc::new(BindingPlan::new(T::bindings())?);
    if let Ok(mut plans) = plans.write() {
        plans.insert(type_id, Arc::clone(&plan) as Arc<dyn Any + Send + Sync>);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::RawRequest;
    use uuid::Uuid;

    #[derive(Debug)]
    struct Limit {
        value: i32,
    }

    impl Default for Limit {
        fn default() -> Self {
            Self { value: 5 }
        }
    }

    impl Bindable for Limit {
        fn bindings() -> Vec<FieldBinding<Self>> {
            vec![FieldBinding::query("value", "limit", |t: &mut Self, v| t.value = v)]
        }
    }

    #[derive(Debug)]
    struct RequiredLimit {
        value: i32,
    }

    impl Default for RequiredLimit {
        fn default() -> Self {
            Self { value: 5 }
        }
    }

    impl Bindable for RequiredLimit {
        fn bindings() -> Vec<FieldBinding<Self>> {
            vec![FieldBinding::query("value", "limit", |t: &mut Self, v| t.value = v).required()]
        }
    }

    #[derive(Debug, Default)]
    struct Rack {
        row: u8,
        label: String,
    }

    impl Bindable for Rack {
        fn bindings() -> Vec<FieldBinding<Self>> {
            vec![
                FieldBinding::query("row", "row", |t: &mut Self, v| t.row = v),
                FieldBinding::header("label", "X-Rack-Label", |t: &mut Self, v| t.label = v),
            ]
        }
    }

    #[derive(Debug, Default)]
    struct PlacementRequest {
        device_id: Uuid,
        dry_run: bool,
        rack: Rack,
    }

    impl Bindable for PlacementRequest {
        fn bindings() -> Vec<FieldBinding<Self>> {
            let mut bindings = vec![
                FieldBinding::path("device_id", "device_id", |t: &mut Self, v| t.device_id = v)
                    .required(),
                FieldBinding::query("dry_run", "dryRun", |t: &mut Self, v| t.dry_run = v),
            ];
            bindings.extend(nested("rack", rack_of));
            bindings
        }
    }

    fn rack_of(request: &mut PlacementRequest) -> &mut Rack {
        &mut request.rack
    }

    #[derive(Debug, Default)]
    struct Clashing {
        a: String,
        b: String,
    }

    impl Bindable for Clashing {
        fn bindings() -> Vec<FieldBinding<Self>> {
            vec![
                FieldBinding::header("a", "X-Token", |t: &mut Self, v| t.a = v),
                FieldBinding::header("b", "x-token", |t: &mut Self, v| t.b = v),
            ]
        }
    }

    #[derive(Debug, Default)]
    struct EmptyKey {
        a: String,
    }

    impl Bindable for EmptyKey {
        fn bindings() -> Vec<FieldBinding<Self>> {
            vec![FieldBinding::query("a", " ", |t: &mut Self, v| t.a = v)]
        }
    }

    #[test]
    fn test_missing_value_keeps_default() {
        let bound = Limit::bind(&RawRequest::new()).unwrap();
        assert_eq!(bound.value, 5);
        let bound = Limit::bind(&RawRequest::new().with_query("limit", "")).unwrap();
        assert_eq!(bound.value, 5);
    }

    #[test]
    fn test_present_value_overrides_default() {
        let bound = Limit::bind(&RawRequest::new().with_query("limit", "12")).unwrap();
        assert_eq!(bound.value, 12);
    }

    #[test]
    fn test_unparsable_optional_value_keeps_default() {
        let bound = Limit::bind(&RawRequest::new().with_query("limit", "abc")).unwrap();
        assert_eq!(bound.value, 5);
    }

    #[test]
    fn test_unparsable_required_value_fails_with_field_and_source() {
        let error = RequiredLimit::bind(&RawRequest::new().with_query("limit", "abc")).unwrap_err();
        match error {
            BindError::InvalidValue {
                field, origin, key, ..
            } => {
                assert_eq!(field, "value");
                assert_eq!(origin, Source::Query);
                assert_eq!(key, "limit");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_value_message_names_field_and_origin() {
        let error = RequiredLimit::bind(&RawRequest::new().with_query("limit", "abc")).unwrap_err();
        let message = error.to_string();
        assert!(message.starts_with("invalid value for field 'value' from query 'limit': expected i32"));
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn test_missing_required_value_keeps_default() {
        let bound = RequiredLimit::bind(&RawRequest::new()).unwrap();
        assert_eq!(bound.value, 5);
    }

    #[test]
    fn test_nested_structures_bind_through_accessor() {
        let device_id = Uuid::new_v4();
        let request = RawRequest::new()
            .with_path("device_id", device_id.to_string())
            .with_query("dryRun", "true")
            .with_query("row", "7")
            .with_header("x-rack-label", "B07");
        let bound = PlacementRequest::bind(&request).unwrap();
        assert_eq!(bound.device_id, device_id);
        assert!(bound.dry_run);
        assert_eq!(bound.rack.row, 7);
        assert_eq!(bound.rack.label, "B07");
    }

    #[test]
    fn test_nested_field_names_carry_prefix() {
        let error = PlacementRequest::bind(&RawRequest::new().with_path("device_id", "nope"))
            .unwrap_err();
        assert!(matches!(error, BindError::InvalidValue { ref field, .. } if field == "device_id"));

        let plan = PlacementRequest::plan().unwrap();
        let fields: Vec<&str> = plan.bindings().iter().map(FieldBinding::field).collect();
        assert_eq!(fields, vec!["device_id", "dry_run", "rack.row", "rack.label"]);
    }

    #[test]
    fn test_plan_records_referenced_sources() {
        assert_eq!(Limit::plan().unwrap().sources(), &[Source::Query]);
        let plan = PlacementRequest::plan().unwrap();
        assert_eq!(plan.sources(), &[Source::Query, Source::Path, Source::Header]);
        let plan = Rack::plan().unwrap();
        assert!(!plan.references(Source::Path));
    }

    #[test]
    fn test_plan_is_cached() {
        let first = Rack::plan().unwrap();
        let second = Rack::plan().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_duplicate_header_keys_are_configuration_errors() {
        let error = Clashing::plan().unwrap_err();
        assert!(matches!(error, BindError::Configuration { .. }));
        assert!(error.to_string().contains("x-token") || error.to_string().contains("X-Token"));
    }

    #[test]
    fn test_empty_keys_are_configuration_errors() {
        assert!(matches!(
            EmptyKey::bind(&RawRequest::new()),
            Err(BindError::Configuration { .. })
        ));
    }
}
