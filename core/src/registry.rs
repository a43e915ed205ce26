//! Per-endpoint schema registry.
//!
//! A registry declares which HTTP methods an endpoint supports and, for each,
//! the optional input shape and the required output shape. A method without
//! a descriptor is not supported by the endpoint.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::schema::Shape;

/// Input/output shapes of one method.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub input: Option<Shape>,
    pub output: Shape,
}

impl Descriptor {
    pub fn new(input: Shape, output: Shape) -> Self {
        Self {
            input: Some(input),
            output,
        }
    }

    pub fn output(output: Shape) -> Self {
        Self {
            input: None,
            output,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    methods: BTreeMap<HttpMethod, Descriptor>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Build a registry from `(method name, descriptor)` pairs.
    ///
    /// Method names are case-insensitive. An unknown name fails immediately,
    /// as does a name that normalizes to a method already listed; a `None`
    /// descriptor leaves the method unsupported.
    pub fn from_methods<'a, I>(entries: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (&'a str, Option<Descriptor>)>,
    {
        let mut seen = BTreeSet::new();
        let mut builder = Self::builder();
        for (name, descriptor) in entries {
            let method = validate_method_name(name)?;
            if !seen.insert(method) {
                return Err(duplicate_method(name));
            }
            if let Some(descriptor) = descriptor {
                builder = builder.method(name, descriptor)?;
            }
        }
        Ok(builder.build())
    }

    pub fn descriptor(&self, method: HttpMethod) -> Option<&Descriptor> {
        self.methods.get(&method)
    }

    pub fn output(&self, method: HttpMethod) -> Option<&Shape> {
        self.descriptor(method).map(|d| &d.output)
    }

    pub fn input(&self, method: HttpMethod) -> Option<&Shape> {
        self.descriptor(method).and_then(|d| d.input.as_ref())
    }

    pub fn supports(&self, method: HttpMethod) -> bool {
        self.descriptor(method).is_some()
    }

    /// Supported methods, in `GET, POST, PUT, PATCH, DELETE` order.
    pub fn methods(&self) -> Vec<HttpMethod> {
        self.methods.keys().copied().collect()
    }
}

fn validate_method_name(name: &str) -> Result<HttpMethod, ApiError> {
    HttpMethod::parse(name)
        .map_err(|_| ApiError::invalid_registry(format!("Invalid HTTP method in schema registry: {name}")))
}

fn duplicate_method(name: &str) -> ApiError {
    ApiError::invalid_registry(format!("Duplicate HTTP method in schema registry: {name}"))
}

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    methods: BTreeMap<HttpMethod, Descriptor>,
}

impl SchemaRegistryBuilder {
    /// Declare a method by name. Fails if the name is not a supported verb
    /// or the method already has a descriptor.
    pub fn method(mut self, name: &str, descriptor: Descriptor) -> Result<Self, ApiError> {
        let method = validate_method_name(name)?;
        if self.methods.contains_key(&method) {
            return Err(duplicate_method(name));
        }
        self.methods.insert(method, descriptor);
        Ok(self)
    }

    // The typed setters below replace an earlier descriptor for the same verb.

    pub fn get(mut self, descriptor: Descriptor) -> Self {
        self.methods.insert(HttpMethod::Get, descriptor);
        self
    }

    pub fn post(mut self, descriptor: Descriptor) -> Self {
        self.methods.insert(HttpMethod::Post, descriptor);
        self
    }

    pub fn put(mut self, descriptor: Descriptor) -> Self {
        self.methods.insert(HttpMethod::Put, descriptor);
        self
    }

    pub fn patch(mut self, descriptor: Descriptor) -> Self {
        self.methods.insert(HttpMethod::Patch, descriptor);
        self
    }

    pub fn delete(mut self, descriptor: Descriptor) -> Self {
        self.methods.insert(HttpMethod::Delete, descriptor);
        self
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            methods: self.methods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_methods_keys_by_normalized_name() {
        let output = Shape::any();
        let registry = SchemaRegistry::from_methods([
            ("get", Some(Descriptor::output(output.clone()))),
            ("POST", Some(Descriptor::new(Shape::any(), output.clone()))),
            ("delete", None),
        ])
        .unwrap();

        assert_eq!(registry.methods(), vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(registry.output(HttpMethod::Get).unwrap().id(), output.id());
        assert!(registry.input(HttpMethod::Get).is_none());
        assert!(registry.input(HttpMethod::Post).is_some());
        assert!(!registry.supports(HttpMethod::Delete));
    }

    #[test]
    fn from_methods_rejects_unknown_names() {
        let err = SchemaRegistry::from_methods([("FETCH", Some(Descriptor::output(Shape::any())))])
            .unwrap_err();
        assert!(err.message().contains("FETCH"));
        assert_eq!(err.code(), Some("INVALID_REGISTRY"));
    }

    #[test]
    fn from_methods_rejects_unknown_names_even_when_undefined() {
        let err = SchemaRegistry::from_methods([("HEAD", None)]).unwrap_err();
        assert!(err.message().contains("HEAD"));
    }

    #[test]
    fn from_methods_rejects_names_that_normalize_to_the_same_method() {
        let err = SchemaRegistry::from_methods([
            ("get", Some(Descriptor::output(Shape::any()))),
            ("GET", Some(Descriptor::output(Shape::any()))),
        ])
        .unwrap_err();
        assert_eq!(err.message(), "Duplicate HTTP method in schema registry: GET");
        assert_eq!(err.code(), Some("INVALID_REGISTRY"));

        let err = SchemaRegistry::from_methods([
            ("delete", None),
            ("Delete", Some(Descriptor::output(Shape::any()))),
        ])
        .unwrap_err();
        assert!(err.message().contains("Duplicate"));
    }

    #[test]
    fn method_by_name_refuses_a_second_descriptor() {
        let err = SchemaRegistry::builder()
            .put(Descriptor::output(Shape::any()))
            .method("put", Descriptor::output(Shape::any()))
            .unwrap_err();
        assert_eq!(err.message(), "Duplicate HTTP method in schema registry: put");
    }

    #[test]
    fn typed_setter_replaces_earlier_descriptor() {
        let first = Shape::any();
        let second = Shape::any();
        let registry = SchemaRegistry::builder()
            .put(Descriptor::output(first))
            .put(Descriptor::output(second.clone()))
            .build();
        assert_eq!(registry.output(HttpMethod::Put).unwrap().id(), second.id());
        assert_eq!(registry.methods(), vec![HttpMethod::Put]);
    }
}
