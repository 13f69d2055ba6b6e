//! Patch units.
//!
//! A [`PatchUnit`] is one ordered set of field edits against a single
//! document (by id, optionally guarded by an expected revision) or against
//! every document a query matches. Verbs are always emitted in the order the
//! store applies them: set, setIfMissing, unset, inc, dec, insert,
//! diffMatchPatch.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::error::{McpError, Result};
use crate::path::{PathAddress, PathSegment};

/// Documents a patch applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PatchTarget {
    /// A single document.
    Id {
        /// Document id.
        id: String,
        /// Reject the patch unless the document is at this revision.
        #[serde(rename = "ifRevisionID", skip_serializing_if = "Option::is_none")]
        if_revision: Option<String>,
    },
    /// Every document matched by a query.
    Query {
        /// Filter query.
        query: String,
        /// Query parameters.
        #[serde(skip_serializing_if = "Map::is_empty")]
        params: Map<String, JsonValue>,
    },
}

/// Path → value pairs, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(Vec<(PathAddress, JsonValue)>);

impl FieldValues {
    /// Pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = &(PathAddress, JsonValue)> {
        self.0.iter()
    }

    /// Whether there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add a pair; a later value for the same path replaces the earlier one.
    pub fn insert(&mut self, path: PathAddress, value: JsonValue) {
        match self.0.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = value,
            None => self.0.push((path, value)),
        }
    }

    fn merge(&mut self, other: FieldValues) {
        for (path, value) in other.0 {
            self.insert(path, value);
        }
    }
}

impl FromIterator<(PathAddress, JsonValue)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (PathAddress, JsonValue)>>(iter: I) -> Self {
        let mut values = FieldValues::default();
        for (path, value) in iter {
            values.insert(path, value);
        }
        values
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, value) in &self.0 {
            map.serialize_entry(&path.to_string(), value)?;
        }
        map.end()
    }
}

/// Where inserted items go relative to the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    /// Before the selected element.
    Before,
    /// After the selected element.
    After,
    /// In place of the selected element(s).
    Replace,
}

impl InsertPosition {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Before => "before",
            InsertPosition::After => "after",
            InsertPosition::Replace => "replace",
        }
    }
}

/// Positional array insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOperation {
    /// Placement relative to `selector`.
    pub position: InsertPosition,
    /// Array element the insert is relative to.
    pub selector: PathAddress,
    /// Items to insert; never empty.
    pub items: Vec<JsonValue>,
}

impl Serialize for InsertOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.position.as_str(), &self.selector)?;
        map.serialize_entry("items", &self.items)?;
        map.end()
    }
}

/// One verb of a patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchOperation {
    /// Assign values.
    Set(FieldValues),
    /// Assign values where the path is currently absent.
    SetIfMissing(FieldValues),
    /// Remove paths.
    Unset(Vec<PathAddress>),
    /// Add to numbers.
    Inc(FieldValues),
    /// Subtract from numbers.
    Dec(FieldValues),
    /// Insert array items.
    Insert(InsertOperation),
    /// Apply diff-match-patch text patches to strings.
    DiffMatchPatch(FieldValues),
}

impl PatchOperation {
    /// Position of this verb in the application order.
    pub fn rank(&self) -> u8 {
        match self {
            PatchOperation::Set(_) => 0,
            PatchOperation::SetIfMissing(_) => 1,
            PatchOperation::Unset(_) => 2,
            PatchOperation::Inc(_) => 3,
            PatchOperation::Dec(_) => 4,
            PatchOperation::Insert(_) => 5,
            PatchOperation::DiffMatchPatch(_) => 6,
        }
    }

    /// Wire name of the verb.
    pub fn verb(&self) -> &'static str {
        match self {
            PatchOperation::Set(_) => "set",
            PatchOperation::SetIfMissing(_) => "setIfMissing",
            PatchOperation::Unset(_) => "unset",
            PatchOperation::Inc(_) => "inc",
            PatchOperation::Dec(_) => "dec",
            PatchOperation::Insert(_) => "insert",
            PatchOperation::DiffMatchPatch(_) => "diffMatchPatch",
        }
    }

    /// Fold a later operation of the same verb into this one.
    fn absorb(&mut self, other: PatchOperation) -> Option<PatchOperation> {
        match (self, other) {
            (PatchOperation::Set(a), PatchOperation::Set(b))
            | (PatchOperation::SetIfMissing(a), PatchOperation::SetIfMissing(b))
            | (PatchOperation::Inc(a), PatchOperation::Inc(b))
            | (PatchOperation::Dec(a), PatchOperation::Dec(b))
            | (PatchOperation::DiffMatchPatch(a), PatchOperation::DiffMatchPatch(b)) => {
                a.merge(b);
                None
            }
            (PatchOperation::Unset(a), PatchOperation::Unset(b)) => {
                for path in b {
                    if !a.contains(&path) {
                        a.push(path);
                    }
                }
                None
            }
            (_, other) => Some(other),
        }
    }
}

/// A validated, ordered patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchUnit {
    /// Documents the patch applies to.
    #[serde(flatten)]
    pub target: PatchTarget,
    /// Verbs in application order.
    pub operations: Vec<PatchOperation>,
}

impl PatchUnit {
    /// Id of the single targeted document, if the patch targets one.
    pub fn document_id(&self) -> Option<&str> {
        match &self.target {
            PatchTarget::Id { id, .. } => Some(id),
            PatchTarget::Query { .. } => None,
        }
    }
}

/// Programmatic construction of a [`PatchUnit`].
///
/// Verbs may be added in any order; [`PatchBuilder::build`] merges repeated
/// verbs and sorts them into application order.
#[derive(Debug, Clone)]
pub struct PatchBuilder {
    target: PatchTarget,
    revision: Option<String>,
    operations: Vec<PatchOperation>,
}

impl PatchBuilder {
    /// Patch a single document.
    pub fn for_id(id: impl Into<String>) -> Self {
        Self::new(PatchTarget::Id {
            id: id.into(),
            if_revision: None,
        })
    }

    /// Patch every document matched by `query`.
    pub fn for_query(query: impl Into<String>, params: Map<String, JsonValue>) -> Self {
        Self::new(PatchTarget::Query {
            query: query.into(),
            params,
        })
    }

    fn new(target: PatchTarget) -> Self {
        Self {
            target,
            revision: None,
            operations: Vec::new(),
        }
    }

    /// Guard the patch with an expected revision. Only id targets accept one.
    pub fn if_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Add a verb.
    pub fn operation(mut self, operation: PatchOperation) -> Self {
        self.operations.push(operation);
        self
    }

    /// `set` one path.
    pub fn set(self, path: PathAddress, value: JsonValue) -> Self {
        self.operation(PatchOperation::Set(FieldValues::from_iter([(path, value)])))
    }

    /// `setIfMissing` one path.
    pub fn set_if_missing(self, path: PathAddress, value: JsonValue) -> Self {
        self.operation(PatchOperation::SetIfMissing(FieldValues::from_iter([(path, value)])))
    }

    /// `unset` one path.
    pub fn unset(self, path: PathAddress) -> Self {
        self.operation(PatchOperation::Unset(vec![path]))
    }

    /// `inc` one path.
    pub fn inc(self, path: PathAddress, amount: JsonValue) -> Self {
        self.operation(PatchOperation::Inc(FieldValues::from_iter([(path, amount)])))
    }

    /// `dec` one path.
    pub fn dec(self, path: PathAddress, amount: JsonValue) -> Self {
        self.operation(PatchOperation::Dec(FieldValues::from_iter([(path, amount)])))
    }

    /// Positional insert.
    pub fn insert(self, insert: InsertOperation) -> Self {
        self.operation(PatchOperation::Insert(insert))
    }

    /// `diffMatchPatch` one path.
    pub fn diff_match_patch(self, path: PathAddress, patch: impl Into<String>) -> Self {
        self.operation(PatchOperation::DiffMatchPatch(FieldValues::from_iter([(
            path,
            JsonValue::String(patch.into()),
        )])))
    }

    /// Validate and order the patch.
    pub fn build(mut self) -> Result<PatchUnit> {
        if let Some(revision) = self.revision.take() {
            match &mut self.target {
                PatchTarget::Id { if_revision, .. } => *if_revision = Some(revision),
                PatchTarget::Query { .. } => {
                    return Err(McpError::InvalidArg {
                        name: "ifRevisionID".to_string(),
                        reason: "a query-targeted patch cannot carry a revision guard"
                            .to_string(),
                    })
                }
            }
        }
        check_target(&self.target)?;

        let mut operations: Vec<PatchOperation> = Vec::new();
        for operation in self.operations {
            check_operation(&operation)?;
            let pending = match operations
                .iter_mut()
                .find(|existing| existing.rank() == operation.rank())
            {
                Some(existing) => existing.absorb(operation),
                None => Some(operation),
            };
            if let Some(operation) = pending {
                operations.push(operation);
            }
        }
        operations.sort_by_key(PatchOperation::rank);

        Ok(PatchUnit {
            target: self.target,
            operations,
        })
    }
}

fn check_target(target: &PatchTarget) -> Result<()> {
    match target {
        PatchTarget::Id { id, .. } if id.trim().is_empty() => Err(McpError::InvalidArg {
            name: "id".to_string(),
            reason: "document id is empty".to_string(),
        }),
        PatchTarget::Query { query, .. } if query.trim().is_empty() => Err(McpError::InvalidArg {
            name: "query".to_string(),
            reason: "query is empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_operation(operation: &PatchOperation) -> Result<()> {
    let verb = operation.verb();
    let invalid = |path: &PathAddress, reason: &str| McpError::InvalidArg {
        name: format!("{verb}.{path}"),
        reason: reason.to_string(),
    };
    let write_paths = |values: &FieldValues| {
        values
            .iter()
            .find(|(p, _)| !p.is_write_path())
            .map_or(Ok(()), |(p, _)| Err(invalid(p, "index ranges cannot be written")))
    };

    match operation {
        PatchOperation::Set(values) | PatchOperation::SetIfMissing(values) => write_paths(values),
        PatchOperation::Unset(paths) => paths
            .iter()
            .find(|p| !p.is_write_path())
            .map_or(Ok(()), |p| Err(invalid(p, "index ranges cannot be unset"))),
        PatchOperation::Inc(values) | PatchOperation::Dec(values) => {
            write_paths(values)?;
            match values.iter().find(|(_, v)| !v.is_number()) {
                Some((p, _)) => Err(invalid(p, "amount must be a number")),
                None => Ok(()),
            }
        }
        PatchOperation::DiffMatchPatch(values) => {
            write_paths(values)?;
            match values.iter().find(|(_, v)| !v.is_string()) {
                Some((p, _)) => Err(invalid(p, "patch must be a string")),
                None => Ok(()),
            }
        }
        PatchOperation::Insert(insert) => {
            if insert.items.is_empty() {
                return Err(invalid(&insert.selector, "insert needs at least one item"));
            }
            match insert.selector.last() {
                PathSegment::Index(_) | PathSegment::KeyMatch(_) => Ok(()),
                _ => Err(invalid(
                    &insert.selector,
                    "insert selector must address an array element",
                )),
            }
        }
    }
}

/// `unset` accepts one path or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single path.
    One(String),
    /// Several paths.
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        }
    }
}

/// Insert instruction as supplied by a caller.
///
/// Either one of `before`/`after`/`replace` carries the selector path, or the
/// legacy form gives `at` plus `position`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsertSpec {
    /// Items to insert.
    #[serde(default)]
    pub items: Vec<JsonValue>,
    /// Placement, for the legacy `at` form.
    pub position: Option<InsertPosition>,
    /// Insert before this element.
    pub before: Option<String>,
    /// Insert after this element.
    pub after: Option<String>,
    /// Replace this element.
    pub replace: Option<String>,
    /// Legacy selector.
    pub at: Option<String>,
}

impl InsertSpec {
    /// Resolve to an insert operation. `Ok(None)` means there is nothing
    /// well-formed to insert and the step should be skipped.
    pub fn resolve(self) -> Result<Option<InsertOperation>> {
        let modern: Vec<(InsertPosition, String)> = [
            (InsertPosition::Before, self.before),
            (InsertPosition::After, self.after),
            (InsertPosition::Replace, self.replace),
        ]
        .into_iter()
        .filter_map(|(position, path)| path.map(|p| (position, p)))
        .collect();

        let invalid = |reason: &str| McpError::InvalidArg {
            name: "insert".to_string(),
            reason: reason.to_string(),
        };
        if modern.len() > 1 {
            return Err(invalid("give only one of 'before', 'after' or 'replace'"));
        }
        if !modern.is_empty() && self.at.is_some() {
            return Err(invalid(
                "'at' cannot be combined with 'before', 'after' or 'replace'",
            ));
        }

        let (position, raw_selector) = match (modern.into_iter().next(), self.at) {
            (Some((position, path)), _) => {
                if self.position.is_some_and(|p| p != position) {
                    return Err(invalid("'position' contradicts the selector key"));
                }
                (position, path)
            }
            (None, Some(at)) => match self.position {
                Some(position) => (position, at),
                None => {
                    warn!(at = %at, "dropping insert without a position");
                    return Ok(None);
                }
            },
            (None, None) => {
                warn!("dropping insert without a selector");
                return Ok(None);
            }
        };

        if self.items.is_empty() {
            warn!(selector = %raw_selector, "dropping insert without items");
            return Ok(None);
        }

        Ok(Some(InsertOperation {
            position,
            selector: PathAddress::parse(&raw_selector)?,
            items: self.items,
        }))
    }
}

/// Patch instruction as supplied by a caller: a target plus verbs keyed by
/// path strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchSpec {
    /// Target document id.
    pub id: Option<String>,
    /// Expected current revision of the target document.
    #[serde(alias = "ifRevisionID")]
    pub if_revision_id: Option<String>,
    /// Target query.
    pub query: Option<String>,
    /// Query parameters.
    #[serde(default)]
    pub params: Map<String, JsonValue>,
    /// `set` verb.
    #[serde(default)]
    pub set: Map<String, JsonValue>,
    /// `setIfMissing` verb.
    #[serde(default)]
    pub set_if_missing: Map<String, JsonValue>,
    /// `unset` verb.
    pub unset: Option<OneOrMany>,
    /// `inc` verb.
    #[serde(default, alias = "increment")]
    pub inc: Map<String, JsonValue>,
    /// `dec` verb.
    #[serde(default, alias = "decrement")]
    pub dec: Map<String, JsonValue>,
    /// `insert` verb.
    pub insert: Option<InsertSpec>,
    /// `diffMatchPatch` verb.
    #[serde(default, alias = "textDiffPatch")]
    pub diff_match_patch: Map<String, JsonValue>,
}

impl PatchSpec {
    /// Parse every path and build the patch.
    pub fn build(self) -> Result<PatchUnit> {
        let mut builder = match (self.id, self.query) {
            (Some(_), Some(_)) => {
                return Err(McpError::InvalidArg {
                    name: "id".to_string(),
                    reason: "give either 'id' or 'query', not both".to_string(),
                })
            }
            (Some(id), None) => {
                let builder = PatchBuilder::for_id(id);
                match self.if_revision_id {
                    Some(revision) => builder.if_revision(revision),
                    None => builder,
                }
            }
            (None, Some(query)) => {
                let builder = PatchBuilder::for_query(query, self.params);
                match self.if_revision_id {
                    Some(revision) => builder.if_revision(revision),
                    None => builder,
                }
            }
            (None, None) => return Err(McpError::MissingArg("id or query".to_string())),
        };

        let verbs: [(fn(FieldValues) -> PatchOperation, Map<String, JsonValue>); 5] = [
            (PatchOperation::Set, self.set),
            (PatchOperation::SetIfMissing, self.set_if_missing),
            (PatchOperation::Inc, self.inc),
            (PatchOperation::Dec, self.dec),
            (PatchOperation::DiffMatchPatch, self.diff_match_patch),
        ];
        for (verb, fields) in verbs {
            if !fields.is_empty() {
                builder = builder.operation(verb(parse_fields(fields)?));
            }
        }

        if let Some(unset) = self.unset {
            let paths = unset
                .into_vec()
                .iter()
                .map(|p| PathAddress::parse(p))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if !paths.is_empty() {
                builder = builder.operation(PatchOperation::Unset(paths));
            }
        }

        if let Some(insert) = self.insert {
            if let Some(insert) = insert.resolve()? {
                builder = builder.insert(insert);
            }
        }

        builder.build()
    }
}

fn parse_fields(fields: Map<String, JsonValue>) -> Result<FieldValues> {
    fields
        .into_iter()
        .map(|(path, value)| Ok((PathAddress::parse(&path)?, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: JsonValue) -> PatchSpec {
        serde_json::from_value(value).expect("valid patch spec")
    }

    fn path(raw: &str) -> PathAddress {
        PathAddress::parse(raw).unwrap()
    }

    #[test]
    fn test_set_is_emitted_before_unset_in_either_order() {
        let a = PatchBuilder::for_id("doc")
            .unset(path("title"))
            .set(path("title"), json!("x"))
            .build()
            .unwrap();
        let b = PatchBuilder::for_id("doc")
            .set(path("title"), json!("x"))
            .unset(path("title"))
            .build()
            .unwrap();

        for patch in [a, b] {
            let verbs: Vec<_> = patch.operations.iter().map(|o| o.verb()).collect();
            assert_eq!(verbs, vec!["set", "unset"]);
        }
    }

    #[test]
    fn test_full_verb_order() {
        let patch = spec(json!({
            "id": "doc",
            "diffMatchPatch": {"body": "@@ -1,1 +1,1 @@\n-a\n+b\n"},
            "insert": {"items": [1], "before": "tags[0]"},
            "dec": {"stock": 1},
            "inc": {"views": 1},
            "unset": "draftNote",
            "setIfMissing": {"tags": []},
            "set": {"title": "Hello"}
        }))
        .build()
        .unwrap();
        let verbs: Vec<_> = patch.operations.iter().map(|o| o.verb()).collect();
        assert_eq!(
            verbs,
            vec!["set", "setIfMissing", "unset", "inc", "dec", "insert", "diffMatchPatch"]
        );
    }

    #[test]
    fn test_repeated_verbs_merge() {
        let patch = PatchBuilder::for_id("doc")
            .set(path("a"), json!(1))
            .unset(path("b"))
            .set(path("a"), json!(2))
            .set(path("c"), json!(3))
            .unset(path("b"))
            .build()
            .unwrap();
        assert_eq!(patch.operations.len(), 2);
        assert_eq!(
            serde_json::to_value(&patch.operations).unwrap(),
            json!([{"set": {"a": 2, "c": 3}}, {"unset": ["b"]}])
        );
    }

    #[test]
    fn test_insert_modern_selector() {
        let patch = spec(json!({
            "id": "doc",
            "insert": {"items": ["x"], "position": "after", "after": "tags[-1]"}
        }))
        .build()
        .unwrap();
        match &patch.operations[0] {
            PatchOperation::Insert(insert) => {
                assert_eq!(insert.selector, path("tags[-1]"));
                assert_eq!(insert.position, InsertPosition::After);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_legacy_selector() {
        let patch = spec(json!({
            "id": "doc",
            "insert": {"items": [{"_key": "n"}], "position": "replace", "at": "body[_key==\"k\"]"}
        }))
        .build()
        .unwrap();
        assert_eq!(
            serde_json::to_value(&patch.operations[0]).unwrap(),
            json!({"insert": {"replace": "body[_key==\"k\"]", "items": [{"_key": "n"}]}})
        );
    }

    #[test]
    fn test_unresolvable_insert_is_dropped() {
        let patch = spec(json!({
            "id": "doc",
            "set": {"title": "x"},
            "insert": {"items": ["x"], "position": "after"}
        }))
        .build()
        .unwrap();
        assert_eq!(patch.operations.len(), 1);
        assert_eq!(patch.operations[0].verb(), "set");

        let patch = spec(json!({"id": "doc", "insert": {"items": [], "after": "tags[0]"}}))
            .build()
            .unwrap();
        assert!(patch.operations.is_empty());
    }

    #[test]
    fn test_conflicting_insert_forms_are_rejected() {
        let both = spec(json!({
            "id": "doc",
            "insert": {"items": [1], "after": "tags[0]", "at": "tags[1]", "position": "after"}
        }));
        assert!(matches!(both.build(), Err(McpError::InvalidArg { .. })));

        let two_keys = spec(json!({
            "id": "doc",
            "insert": {"items": [1], "after": "tags[0]", "before": "tags[1]"}
        }));
        assert!(matches!(two_keys.build(), Err(McpError::InvalidArg { .. })));

        let contradiction = spec(json!({
            "id": "doc",
            "insert": {"items": [1], "after": "tags[0]", "position": "before"}
        }));
        assert!(matches!(contradiction.build(), Err(McpError::InvalidArg { .. })));

        let not_element = spec(json!({"id": "doc", "insert": {"items": [1], "after": "tags"}}));
        assert!(matches!(not_element.build(), Err(McpError::InvalidArg { .. })));
    }

    #[test]
    fn test_unset_accepts_single_path() {
        let patch = spec(json!({"id": "doc", "unset": "meta.old"})).build().unwrap();
        assert_eq!(patch.operations, vec![PatchOperation::Unset(vec![path("meta.old")])]);
    }

    #[test]
    fn test_bad_paths_fail_with_path_syntax() {
        let err = spec(json!({"id": "doc", "set": {"items[": 1}})).build().unwrap_err();
        assert!(matches!(err, McpError::PathSyntax(_)));

        let err = spec(json!({"id": "doc", "insert": {"items": [1], "after": "tags[_key==]"}}))
            .build()
            .unwrap_err();
        assert!(matches!(err, McpError::PathSyntax(_)));
    }

    #[test]
    fn test_target_rules() {
        assert!(matches!(
            spec(json!({"set": {"a": 1}})).build(),
            Err(McpError::MissingArg(_))
        ));
        assert!(matches!(
            spec(json!({"id": "a", "query": "*"})).build(),
            Err(McpError::InvalidArg { .. })
        ));
        assert!(matches!(
            spec(json!({"query": "*[_type == \"post\"]", "ifRevisionID": "r1"})).build(),
            Err(McpError::InvalidArg { .. })
        ));
        assert!(matches!(
            PatchBuilder::for_query("*", Map::new()).if_revision("r1").build(),
            Err(McpError::InvalidArg { .. })
        ));
    }

    #[test]
    fn test_revision_guard_is_serialized() {
        let patch = spec(json!({"id": "doc", "ifRevisionID": "rev-1", "set": {"a": 1}}))
            .build()
            .unwrap();
        assert_eq!(patch.document_id(), Some("doc"));
        let wire = serde_json::to_value(&patch).unwrap();
        assert_eq!(wire["id"], "doc");
        assert_eq!(wire["ifRevisionID"], "rev-1");
        assert_eq!(wire["operations"][0]["set"]["a"], 1);
    }

    #[test]
    fn test_numeric_and_text_verbs_are_checked() {
        assert!(spec(json!({"id": "d", "inc": {"n": "1"}})).build().is_err());
        assert!(spec(json!({"id": "d", "diffMatchPatch": {"t": 1}})).build().is_err());
        assert!(spec(json!({"id": "d", "set": {"rows[1:2]": 1}})).build().is_err());
        assert!(spec(json!({"id": "d", "increment": {"n": 2}})).build().is_ok());
    }
}
