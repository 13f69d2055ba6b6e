//! Type manifest wire model.
//!
//! A manifest set is a flat list of named type definitions supplied at
//! runtime. Types refer to each other by name, so the set forms a graph that
//! may contain cycles.

use serde::{Deserialize, Serialize, Serializer};

/// One named type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeManifest {
    /// Unique type name.
    pub name: String,
    /// What sort of type this is.
    #[serde(rename = "type")]
    pub kind: ManifestKind,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordered fields, for documents and objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldManifest>,
    /// Member types, for arrays.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub of: Vec<TypeRef>,
    /// Target types, for references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<TargetRef>,
}

impl TypeManifest {
    /// A document type with the given fields.
    pub fn document(name: &str, fields: Vec<FieldManifest>) -> Self {
        Self::with_kind(name, ManifestKind::Document).fields(fields)
    }

    fn with_kind(name: &str, kind: ManifestKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            title: None,
            fields: Vec::new(),
            of: Vec::new(),
            to: Vec::new(),
        }
    }

    fn fields(mut self, fields: Vec<FieldManifest>) -> Self {
        self.fields = fields;
        self
    }
}

/// Kind of a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ManifestKind {
    /// Top-level document with identity attributes.
    Document,
    /// Embedded object.
    Object,
    /// List of one or more member types.
    Array,
    /// Scalar or structured primitive.
    Primitive(PrimitiveKind),
}

impl From<String> for ManifestKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "document" => ManifestKind::Document,
            "object" => ManifestKind::Object,
            "array" => ManifestKind::Array,
            _ => ManifestKind::Primitive(PrimitiveKind::from(raw)),
        }
    }
}

impl From<ManifestKind> for String {
    fn from(kind: ManifestKind) -> Self {
        kind.as_str().to_string()
    }
}

impl ManifestKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            ManifestKind::Document => "document",
            ManifestKind::Object => "object",
            ManifestKind::Array => "array",
            ManifestKind::Primitive(p) => p.as_str(),
        }
    }
}

/// Built-in primitive kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Plain string.
    String,
    /// Multi-line string.
    Text,
    /// URL string.
    Url,
    /// JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// RFC 3339 timestamp.
    Datetime,
    /// `YYYY-MM-DD` date.
    Date,
    /// Reference to another document.
    Reference,
    /// Image with an asset reference.
    Image,
    /// File with an asset reference.
    File,
    /// URL slug object.
    Slug,
    /// Rich-text block.
    Block,
    /// A kind this server does not know; validated permissively.
    Unknown(String),
}

impl PrimitiveKind {
    /// Look up a built-in kind by name. Returns `None` for names that are not
    /// built in, so callers can fall back to manifest lookup.
    pub fn builtin(name: &str) -> Option<Self> {
        let kind = match name {
            "string" => PrimitiveKind::String,
            "text" => PrimitiveKind::Text,
            "url" => PrimitiveKind::Url,
            "number" => PrimitiveKind::Number,
            "boolean" => PrimitiveKind::Boolean,
            "datetime" => PrimitiveKind::Datetime,
            "date" => PrimitiveKind::Date,
            "reference" => PrimitiveKind::Reference,
            "image" => PrimitiveKind::Image,
            "file" => PrimitiveKind::File,
            "slug" => PrimitiveKind::Slug,
            "block" => PrimitiveKind::Block,
            _ => return None,
        };
        Some(kind)
    }

    /// Wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Text => "text",
            PrimitiveKind::Url => "url",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Datetime => "datetime",
            PrimitiveKind::Date => "date",
            PrimitiveKind::Reference => "reference",
            PrimitiveKind::Image => "image",
            PrimitiveKind::File => "file",
            PrimitiveKind::Slug => "slug",
            PrimitiveKind::Block => "block",
            PrimitiveKind::Unknown(name) => name,
        }
    }
}

impl From<String> for PrimitiveKind {
    fn from(raw: String) -> Self {
        PrimitiveKind::builtin(&raw).unwrap_or(PrimitiveKind::Unknown(raw))
    }
}

/// A field of a document or object type.
///
/// The field's `name` and its type share one JSON object, so a member name
/// set on `ty` is not written out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldManifest {
    /// Field name.
    pub name: String,
    /// Declared type of the field.
    #[serde(flatten)]
    pub ty: TypeRef,
}

impl Serialize for FieldManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            name: &'a str,
            #[serde(flatten)]
            ty: TypeRef,
        }

        let ty = TypeRef {
            name: None,
            ..self.ty.clone()
        };
        Wire {
            name: &self.name,
            ty,
        }
        .serialize(serializer)
    }
}

impl FieldManifest {
    /// A field of the given type.
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// A reference to a type: a built-in primitive, another manifest by name, or
/// an inline `array`/`object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Member name, used as the `_type` of inline array members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Members of an inline array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub of: Vec<TypeRef>,
    /// Targets of a reference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<TargetRef>,
    /// Fields of an inline object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldManifest>,
}

impl TypeRef {
    /// Reference to a named type.
    pub fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            name: None,
            of: Vec::new(),
            to: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// The `_type` an array element of this member carries.
    pub fn member_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_name)
    }
}

/// Target of a reference. Accepts either `"person"` or `{"type": "person"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTarget")]
pub struct TargetRef {
    /// Target type name.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TargetRef {
    /// Target of the given type.
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Name(String),
    Ref {
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl From<RawTarget> for TargetRef {
    fn from(raw: RawTarget) -> Self {
        match raw {
            RawTarget::Name(type_name) | RawTarget::Ref { type_name } => Self { type_name },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_manifest() {
        let manifest: TypeManifest = serde_json::from_value(json!({
            "name": "article",
            "type": "document",
            "fields": [
                {"name": "title", "type": "string"},
                {"name": "body", "type": "array", "of": [{"type": "block"}]},
                {"name": "author", "type": "reference", "to": [{"type": "person"}]},
                {"name": "editor", "type": "reference", "to": ["person"]}
            ]
        }))
        .unwrap();

        assert_eq!(manifest.kind, ManifestKind::Document);
        assert_eq!(manifest.fields.len(), 4);
        assert_eq!(manifest.fields[1].ty.of[0].type_name, "block");
        assert_eq!(manifest.fields[2].ty.to, vec![TargetRef::new("person")]);
        assert_eq!(manifest.fields[3].ty.to, vec![TargetRef::new("person")]);
    }

    #[test]
    fn test_field_serializes_a_single_name() {
        let mut ty = TypeRef::named("object");
        ty.name = Some("seo".to_string());
        ty.fields = vec![FieldManifest::new("title", TypeRef::named("string"))];
        let field = FieldManifest::new("meta", ty);

        let wire = serde_json::to_string(&field).unwrap();
        assert_eq!(wire.matches("\"name\":\"meta\"").count(), 1);
        assert!(!wire.contains("\"seo\""));

        let back: FieldManifest = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.name, "meta");
        assert_eq!(back.ty.type_name, "object");
        assert_eq!(back.ty.fields[0].name, "title");
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let manifest: TypeManifest =
            serde_json::from_value(json!({"name": "spot", "type": "geopoint"})).unwrap();
        assert_eq!(
            manifest.kind,
            ManifestKind::Primitive(PrimitiveKind::Unknown("geopoint".to_string()))
        );
        let back = serde_json::to_value(&manifest).unwrap();
        assert_eq!(back["type"], "geopoint");
    }
}
