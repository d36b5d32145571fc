//! Schema definition: an ordered tree of typed field declarations.

use crate::binder;
use crate::errors::ValidationError;
use crate::source::RawSource;
use crate::value::BoundParams;

/// The declared kind of a field's value.
///
/// A recursive sum type: scalars, nested objects (a sub-schema), and
/// homogeneous arrays. Nullability is a property of the [`Field`], not
/// the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer. Decimal strings convert.
    Integer,
    /// 64-bit float. Numeric strings convert.
    Float,
    /// Boolean. The literals `"true"` and `"false"` convert.
    Boolean,
    /// Nested object validated against a sub-schema.
    Object(Schema),
    /// Homogeneous array of the given element kind.
    Array(Box<FieldKind>),
}

impl FieldKind {
    /// Lowercase kind name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

/// A single named field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, looked up verbatim in the raw sources.
    pub name: String,
    /// Declared value kind.
    pub kind: FieldKind,
    /// Whether the field may be absent (binds to null). On an
    /// [`FieldKind::Object`] field this marks the whole subtree nilable.
    pub nullable: bool,
}

/// An immutable, ordered set of field declarations.
///
/// Built once per channel type via [`Schema::builder`] and interpreted by
/// the binder for every session of that type. Binding failures are
/// deterministic for identical raw input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Start building a schema.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    /// The declared fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate and convert raw request data into typed parameters.
    ///
    /// Fields are processed in declaration order; the first failure is
    /// returned (fail-fast).
    pub fn bind(&self, source: &RawSource) -> Result<BoundParams, ValidationError> {
        binder::bind(self, source)
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Declare a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            nullable: false,
        });
        self
    }

    /// Declare a nullable field (binds to null when absent).
    ///
    /// On an object kind this marks the whole subtree nilable: it binds
    /// to null only when all of its immediate keys are absent.
    #[must_use]
    pub fn nullable(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            nullable: true,
        });
        self
    }

    /// Finish building. The schema is immutable from here on.
    #[must_use]
    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_declaration_order() {
        let schema = Schema::builder()
            .field("b", FieldKind::Integer)
            .field("a", FieldKind::String)
            .nullable("c", FieldKind::Boolean)
            .build();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn nullable_flag_set() {
        let schema = Schema::builder()
            .field("id", FieldKind::Integer)
            .nullable("name", FieldKind::String)
            .build();
        assert!(!schema.fields()[0].nullable);
        assert!(schema.fields()[1].nullable);
    }

    #[test]
    fn empty_schema() {
        let schema = Schema::builder().build();
        assert!(schema.is_empty());
        assert_eq!(schema.len(), 0);
    }

    #[test]
    fn kind_names() {
        assert_eq!(FieldKind::String.name(), "string");
        assert_eq!(FieldKind::Integer.name(), "integer");
        assert_eq!(FieldKind::Float.name(), "float");
        assert_eq!(FieldKind::Boolean.name(), "boolean");
        assert_eq!(FieldKind::Object(Schema::default()).name(), "object");
        assert_eq!(FieldKind::Array(Box::new(FieldKind::String)).name(), "array");
    }

    #[test]
    fn nested_object_kind() {
        let inner = Schema::builder().field("age", FieldKind::Integer).build();
        let schema = Schema::builder()
            .nullable("profile", FieldKind::Object(inner.clone()))
            .build();
        match &schema.fields()[0].kind {
            FieldKind::Object(sub) => assert_eq!(sub, &inner),
            other => panic!("expected object kind, got {other:?}"),
        }
    }
}
