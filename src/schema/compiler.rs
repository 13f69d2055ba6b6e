//! Manifest set → validator table.
//!
//! Each manifest name owns one slot in the table. The slot is reserved before
//! the type's fields are resolved, so a field that refers back to a type still
//! under construction (directly or through a cycle) gets a
//! [`Validator::Named`] handle to the reserved slot instead of recursing.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::manifest::{FieldManifest, ManifestKind, PrimitiveKind, TypeManifest, TypeRef};
use super::validator::{ArrayMember, ObjectValidator, ValidationError, Validator};
use super::SchemaConfigError;

/// Validators for every type of a manifest set.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    manifests: Vec<TypeManifest>,
    slots: HashMap<String, usize>,
    table: Vec<Validator>,
    builds: usize,
}

/// Summary of one compiled type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    /// Type name.
    pub name: String,
    /// Manifest kind.
    pub kind: String,
    /// Declared field names, in order.
    pub fields: Vec<String>,
}

impl CompiledSchema {
    /// Compile a manifest set.
    pub fn compile(manifests: Vec<TypeManifest>) -> Result<Self, SchemaConfigError> {
        let (slots, table, builds) = {
            let mut compiler = Compiler::new(&manifests)?;
            for manifest in &manifests {
                compiler.resolve_named(&manifest.name, &manifest.name)?;
            }
            (compiler.slots, compiler.table, compiler.builds)
        };
        let table = table
            .into_iter()
            .zip(manifests.iter())
            .map(|(validator, manifest)| {
                validator.ok_or_else(|| SchemaConfigError::InvalidManifest {
                    name: manifest.name.clone(),
                    reason: "type was never built".to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(types = manifests.len(), builds, "compiled schema");
        Ok(Self {
            manifests,
            slots,
            table,
            builds,
        })
    }

    /// Validator for a type, if the type is defined.
    pub fn validator(&self, type_name: &str) -> Option<TypeValidator<'_>> {
        self.slots.get(type_name).map(|&slot| TypeValidator {
            schema: self,
            slot,
        })
    }

    /// Validate `value` against the named type. Returns `None` when the type
    /// is not part of this schema.
    pub fn validate(
        &self,
        type_name: &str,
        value: &JsonValue,
    ) -> Option<Result<JsonValue, ValidationError>> {
        self.validator(type_name).map(|v| v.validate(value))
    }

    /// Whether the type is defined.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.slots.contains_key(type_name)
    }

    /// Manifest of a type.
    pub fn describe(&self, type_name: &str) -> Option<&TypeManifest> {
        self.slots.get(type_name).map(|&slot| &self.manifests[slot])
    }

    /// Summaries of all types, in manifest order.
    pub fn summaries(&self) -> Vec<TypeSummary> {
        self.manifests
            .iter()
            .map(|m| TypeSummary {
                name: m.name.clone(),
                kind: m.kind.as_str().to_string(),
                fields: m.fields.iter().map(|f| f.name.clone()).collect(),
            })
            .collect()
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Whether the schema defines no types.
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// How many type builds compilation performed.
    pub fn build_count(&self) -> usize {
        self.builds
    }
}

/// Validator for one named type of a [`CompiledSchema`].
#[derive(Debug, Clone, Copy)]
pub struct TypeValidator<'a> {
    schema: &'a CompiledSchema,
    slot: usize,
}

impl TypeValidator<'_> {
    /// Check `value`, returning its coerced form.
    pub fn validate(&self, value: &JsonValue) -> Result<JsonValue, ValidationError> {
        self.schema.table[self.slot].validate(value, &self.schema.table)
    }
}

struct Compiler<'a> {
    manifests: HashMap<&'a str, (usize, &'a TypeManifest)>,
    slots: HashMap<String, usize>,
    table: Vec<Option<Validator>>,
    builds: usize,
}

impl<'a> Compiler<'a> {
    fn new(manifests: &'a [TypeManifest]) -> Result<Self, SchemaConfigError> {
        let mut index = HashMap::with_capacity(manifests.len());
        for (i, manifest) in manifests.iter().enumerate() {
            check_manifest(manifest)?;
            if index.insert(manifest.name.as_str(), (i, manifest)).is_some() {
                return Err(SchemaConfigError::DuplicateType(manifest.name.clone()));
            }
        }
        Ok(Self {
            manifests: index,
            slots: HashMap::with_capacity(manifests.len()),
            table: vec![None; manifests.len()],
            builds: 0,
        })
    }

    /// Handle to a named manifest type, building it on first use.
    fn resolve_named(&mut self, name: &str, owner: &str) -> Result<Validator, SchemaConfigError> {
        let handle = |slot| Validator::Named {
            name: name.to_string(),
            slot,
        };
        if let Some(&slot) = self.slots.get(name) {
            return Ok(handle(slot));
        }

        let (slot, manifest) = *self
            .manifests
            .get(name)
            .ok_or_else(|| SchemaConfigError::UndefinedType {
                name: name.to_string(),
                referenced_by: owner.to_string(),
            })?;

        // Reserve the slot before descending into fields.
        self.slots.insert(name.to_string(), slot);
        self.builds += 1;
        let validator = self.build(manifest)?;
        self.table[slot] = Some(validator);
        Ok(handle(slot))
    }

    fn build(&mut self, manifest: &'a TypeManifest) -> Result<Validator, SchemaConfigError> {
        let name = manifest.name.as_str();
        match &manifest.kind {
            ManifestKind::Document | ManifestKind::Object => {
                Ok(Validator::Object(ObjectValidator {
                    type_name: Some(name.to_string()),
                    document: manifest.kind == ManifestKind::Document,
                    fields: self.build_fields(&manifest.fields, name)?,
                }))
            }
            ManifestKind::Array => self.build_array(&manifest.of, name),
            ManifestKind::Primitive(kind) => Ok(primitive(kind, false)),
        }
    }

    fn build_fields(
        &mut self,
        fields: &[FieldManifest],
        owner: &str,
    ) -> Result<Vec<(String, Validator)>, SchemaConfigError> {
        fields
            .iter()
            .map(|field| {
                let context = format!("{owner}.{}", field.name);
                let validator = self.resolve_ref(&field.ty, &context)?;
                Ok((field.name.clone(), validator))
            })
            .collect()
    }

    fn build_array(&mut self, of: &[TypeRef], owner: &str) -> Result<Validator, SchemaConfigError> {
        if of.is_empty() {
            return Err(SchemaConfigError::InvalidManifest {
                name: owner.to_string(),
                reason: "array declares no member types".to_string(),
            });
        }
        let members = of
            .iter()
            .map(|member| {
                Ok(ArrayMember {
                    name: member.member_name().to_string(),
                    validator: self.resolve_ref(member, owner)?,
                })
            })
            .collect::<Result<Vec<_>, SchemaConfigError>>()?;
        Ok(Validator::Array(members))
    }

    /// Resolve a type reference. Built-in primitives win over manifest names.
    fn resolve_ref(&mut self, ty: &TypeRef, owner: &str) -> Result<Validator, SchemaConfigError> {
        match ty.type_name.as_str() {
            "array" => self.build_array(&ty.of, owner),
            "object" => {
                check_field_names(&ty.fields, owner)?;
                Ok(Validator::Object(ObjectValidator {
                    type_name: ty.name.clone(),
                    document: false,
                    fields: self.build_fields(&ty.fields, owner)?,
                }))
            }
            "document" => Err(SchemaConfigError::InvalidManifest {
                name: owner.to_string(),
                reason: "documents cannot be declared inline".to_string(),
            }),
            name => match PrimitiveKind::builtin(name) {
                Some(kind) => Ok(primitive(&kind, true)),
                None => {
                    let handle = self.resolve_named(name, owner)?;
                    // Fields of a named reference type normalize `_ref` too.
                    if self.is_reference(name) {
                        return Ok(primitive(&PrimitiveKind::Reference, true));
                    }
                    Ok(handle)
                }
            },
        }
    }

    fn is_reference(&self, name: &str) -> bool {
        self.manifests.get(name).is_some_and(|(_, manifest)| {
            manifest.kind == ManifestKind::Primitive(PrimitiveKind::Reference)
        })
    }
}

fn primitive(kind: &PrimitiveKind, as_field: bool) -> Validator {
    match kind {
        PrimitiveKind::String | PrimitiveKind::Text | PrimitiveKind::Url => Validator::String,
        PrimitiveKind::Number => Validator::Number,
        PrimitiveKind::Boolean => Validator::Boolean,
        PrimitiveKind::Datetime => Validator::Datetime,
        PrimitiveKind::Date => Validator::Date,
        PrimitiveKind::Reference => Validator::Reference {
            normalize: as_field,
        },
        PrimitiveKind::Image => Validator::Asset { kind: "image" },
        PrimitiveKind::File => Validator::Asset { kind: "file" },
        PrimitiveKind::Slug => Validator::Slug,
        PrimitiveKind::Block => Validator::Block,
        PrimitiveKind::Unknown(_) => Validator::Any,
    }
}

fn check_manifest(manifest: &TypeManifest) -> Result<(), SchemaConfigError> {
    let invalid = |reason: &str| SchemaConfigError::InvalidManifest {
        name: manifest.name.clone(),
        reason: reason.to_string(),
    };
    if manifest.name.trim().is_empty() {
        return Err(invalid("type name is empty"));
    }
    match manifest.kind {
        ManifestKind::Array if manifest.of.is_empty() => {
            Err(invalid("array declares no member types"))
        }
        ManifestKind::Document | ManifestKind::Object => {
            check_field_names(&manifest.fields, &manifest.name)
        }
        _ => Ok(()),
    }
}

fn check_field_names(fields: &[FieldManifest], owner: &str) -> Result<(), SchemaConfigError> {
    let mut seen = std::collections::HashSet::new();
    for field in fields {
        if field.name.is_empty() || !seen.insert(field.name.as_str()) {
            return Err(SchemaConfigError::InvalidManifest {
                name: owner.to_string(),
                reason: format!("empty or duplicate field name '{}'", field.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifests(value: JsonValue) -> Vec<TypeManifest> {
        serde_json::from_value(value).expect("valid manifest json")
    }

    fn cyclic_set() -> Vec<TypeManifest> {
        manifests(json!([
            {"name": "A", "type": "document", "fields": [{"name": "b", "type": "B"}]},
            {"name": "B", "type": "object", "fields": [{"name": "a", "type": "A"}]},
            {"name": "C", "type": "object", "fields": [{"name": "self", "type": "C"}]}
        ]))
    }

    #[test]
    fn test_cyclic_types_compile_once_each() {
        let schema = CompiledSchema::compile(cyclic_set()).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.build_count(), 3);
        assert!(schema.has_type("A") && schema.has_type("B") && schema.has_type("C"));
    }

    #[test]
    fn test_mutual_recursion_validates_nested_values() {
        let schema = CompiledSchema::compile(cyclic_set()).unwrap();
        let doc = json!({"_type": "A", "b": {"_type": "B", "a": {"_type": "A"}}});
        assert!(schema.validate("A", &doc).unwrap().is_ok());

        let bad = json!({"_type": "A", "b": {"_type": "B", "a": {"_type": "B"}}});
        let err = schema.validate("A", &bad).unwrap().unwrap_err();
        assert_eq!(err.path_string(), "b.a._type");
    }

    #[test]
    fn test_self_recursion_validates_deep_values() {
        let schema = CompiledSchema::compile(cyclic_set()).unwrap();
        let mut value = json!({"_type": "C"});
        for _ in 0..50 {
            value = json!({"_type": "C", "self": value});
        }
        assert!(schema.validate("C", &value).unwrap().is_ok());
    }

    #[test]
    fn test_shared_type_is_built_once() {
        let schema = CompiledSchema::compile(manifests(json!([
            {"name": "post", "type": "document", "fields": [
                {"name": "seo", "type": "seo"},
                {"name": "social", "type": "seo"},
                {"name": "sections", "type": "array", "of": [{"type": "seo"}, {"type": "post"}]}
            ]},
            {"name": "seo", "type": "object", "fields": [{"name": "title", "type": "string"}]}
        ])))
        .unwrap();
        assert_eq!(schema.build_count(), 2);
    }

    #[test]
    fn test_duplicate_and_undefined_types_fail() {
        let dup = manifests(json!([
            {"name": "x", "type": "object"},
            {"name": "x", "type": "document"}
        ]));
        assert!(matches!(
            CompiledSchema::compile(dup),
            Err(SchemaConfigError::DuplicateType(name)) if name == "x"
        ));

        let undefined = manifests(json!([
            {"name": "post", "type": "document", "fields": [{"name": "meta", "type": "missing"}]}
        ]));
        match CompiledSchema::compile(undefined) {
            Err(SchemaConfigError::UndefinedType { name, referenced_by }) => {
                assert_eq!(name, "missing");
                assert_eq!(referenced_by, "post.meta");
            }
            other => panic!("expected undefined type error, got {other:?}"),
        }

        let empty_array = manifests(json!([{"name": "list", "type": "array"}]));
        assert!(matches!(
            CompiledSchema::compile(empty_array),
            Err(SchemaConfigError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_unknown_kinds_accept_anything() {
        let schema = CompiledSchema::compile(manifests(json!([
            {"name": "spot", "type": "geopoint"},
            {"name": "place", "type": "document", "fields": [{"name": "where", "type": "spot"}]}
        ])))
        .unwrap();
        let doc = json!({"_type": "place", "where": {"lat": 1.5, "lng": 2}});
        assert!(schema.validate("place", &doc).unwrap().is_ok());
    }

    #[test]
    fn test_article_reference_field() {
        let schema = CompiledSchema::compile(manifests(json!([
            {"name": "article", "type": "document", "fields": [
                {"name": "title", "type": "string"},
                {"name": "body", "type": "array", "of": [{"type": "block"}]},
                {"name": "author", "type": "reference", "to": [{"type": "person"}]}
            ]}
        ])))
        .unwrap();

        let ok = json!({
            "_type": "article",
            "title": "Hi",
            "author": {"_ref": "drafts.person-1", "_type": "reference"}
        });
        let coerced = schema.validate("article", &ok).unwrap().unwrap();
        assert_eq!(coerced["author"]["_ref"], "person-1");

        let bad = json!({"_type": "article", "title": "Hi", "author": "person-1"});
        let err = schema.validate("article", &bad).unwrap().unwrap_err();
        assert_eq!(err.path_string(), "author");

        assert!(schema.validate("person", &ok).is_none());
    }

    #[test]
    fn test_named_reference_type_normalizes_as_field() {
        let schema = CompiledSchema::compile(manifests(json!([
            {"name": "authorRef", "type": "reference", "to": [{"type": "person"}]},
            {"name": "article", "type": "document", "fields": [
                {"name": "author", "type": "authorRef"},
                {"name": "editor", "type": "reference"},
                {"name": "credits", "type": "array", "of": [{"type": "authorRef"}]}
            ]}
        ])))
        .unwrap();

        let doc = json!({
            "_type": "article",
            "author": {"_ref": "drafts.p1", "_type": "reference"},
            "editor": {"_ref": "drafts.p1", "_type": "reference"},
            "credits": [{"_key": "c1", "_ref": "versions.spring.p2", "_type": "reference"}]
        });
        let coerced = schema.validate("article", &doc).unwrap().unwrap();
        assert_eq!(coerced["author"]["_ref"], "p1");
        assert_eq!(coerced["editor"]["_ref"], "p1");
        assert_eq!(coerced["credits"][0]["_ref"], "p2");

        // Validated on its own, the reference type keeps the qualifier.
        let top = json!({"_ref": "drafts.p1", "_type": "reference"});
        assert_eq!(schema.validate("authorRef", &top).unwrap().unwrap()["_ref"], "drafts.p1");

        let err = schema
            .validate("article", &json!({"_type": "article", "author": "p1"}))
            .unwrap()
            .unwrap_err();
        assert_eq!(err.path_string(), "author");
    }

    #[test]
    fn test_recursive_unions_validate_deep_nesting() {
        let schema = CompiledSchema::compile(manifests(json!([
            {"name": "T", "type": "array", "of": [{"type": "T"}, {"type": "U"}]},
            {"name": "U", "type": "array", "of": [{"type": "T"}, {"type": "string"}]}
        ])))
        .unwrap();

        let nest = |leaf: JsonValue| {
            let mut value = json!([leaf]);
            for _ in 0..60 {
                value = json!([value]);
            }
            value
        };

        // Every level has two alternatives; without memoized outcomes this
        // would take on the order of 1.5^60 checks.
        let err = schema.validate("T", &nest(json!(1))).unwrap().unwrap_err();
        assert_eq!(err.expected, "one of [T, U]");
        assert!(schema.validate("T", &nest(json!("leaf"))).unwrap().is_ok());
    }

    #[test]
    fn test_named_array_member_objects() {
        let schema = CompiledSchema::compile(manifests(json!([
            {"name": "page", "type": "document", "fields": [
                {"name": "blocks", "type": "array", "of": [
                    {"type": "object", "name": "cta", "fields": [{"name": "label", "type": "string"}]},
                    {"type": "image"}
                ]}
            ]}
        ])))
        .unwrap();
        let doc = json!({"_type": "page", "blocks": [
            {"_type": "cta", "_key": "c1", "label": "Go"},
            {"_type": "image", "_key": "i1", "asset": {"_ref": "image-aa-1x1-png"}}
        ]});
        assert!(schema.validate("page", &doc).unwrap().is_ok());

        let bad = json!({"_type": "page", "blocks": [{"_type": "cta", "_key": "c1", "label": 1}]});
        let err = schema.validate("page", &bad).unwrap().unwrap_err();
        assert_eq!(err.path_string(), "blocks[_key==\"c1\"].label");
    }

    #[test]
    fn test_summaries_and_describe() {
        let schema = CompiledSchema::compile(cyclic_set()).unwrap();
        let summaries = schema.summaries();
        assert_eq!(summaries[0].name, "A");
        assert_eq!(summaries[0].kind, "document");
        assert_eq!(summaries[0].fields, vec!["b".to_string()]);
        assert_eq!(schema.describe("B").unwrap().fields[0].name, "a");
        assert!(schema.describe("Z").is_none());
    }
}
