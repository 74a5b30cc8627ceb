use crate::obs::TraceSink;
use convert_case::Case;
use relmap_model::EnumRepr;
use std::{fmt, sync::Arc};

/// Maximum length for table schema identifiers.
pub const MAX_TABLE_NAME_LEN: usize = 64;

/// Maximum length for field schema identifiers.
pub const MAX_FIELD_NAME_LEN: usize = 128;

///
/// CompilerOptions
///
/// Explicit knobs for one compiler instance. Defaults reproduce the
/// conventional layout; hosts override what their dialect needs.
///

#[derive(Clone)]
pub struct CompilerOptions {
    /// Field name treated as the identity convention by key deduction.
    pub identity_ident: String,
    /// Root segment of every relation table's owner-identity fields.
    pub anchor_ident: String,
    /// Synthetic column ident for a map relation's key.
    pub map_key_ident: String,
    /// Synthetic column ident for a list relation's position.
    pub list_index_ident: String,
    /// Root segment for relation element fields.
    pub element_ident: String,
    /// Storage form for enumerated scalars without an explicit directive.
    pub enum_storage: EnumRepr,
    /// Case normalization applied to derived (non-renamed) names.
    pub name_case: Option<Case<'static>>,
    pub max_table_name_len: usize,
    pub max_field_name_len: usize,
    /// Reject reserved words as final table/field names.
    pub check_reserved: bool,
    /// Optional trace sink receiving structured translation events.
    pub trace: Option<Arc<dyn TraceSink>>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            identity_ident: "Id".to_string(),
            anchor_ident: "Owner".to_string(),
            map_key_ident: "Key".to_string(),
            list_index_ident: "Index".to_string(),
            element_ident: "Value".to_string(),
            enum_storage: EnumRepr::Numeric,
            name_case: None,
            max_table_name_len: MAX_TABLE_NAME_LEN,
            max_field_name_len: MAX_FIELD_NAME_LEN,
            check_reserved: true,
            trace: None,
        }
    }
}

impl CompilerOptions {
    #[must_use]
    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    #[must_use]
    pub const fn with_name_case(mut self, case: Case<'static>) -> Self {
        self.name_case = Some(case);
        self
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("identity_ident", &self.identity_ident)
            .field("anchor_ident", &self.anchor_ident)
            .field("map_key_ident", &self.map_key_ident)
            .field("list_index_ident", &self.list_index_ident)
            .field("element_ident", &self.element_ident)
            .field("enum_storage", &self.enum_storage)
            .field("name_case", &self.name_case)
            .field("max_table_name_len", &self.max_table_name_len)
            .field("max_field_name_len", &self.max_field_name_len)
            .field("check_reserved", &self.check_reserved)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

///
/// RESERVED
/// Final table and field names that clash with the relational vocabulary.
///

static RESERVED: &[&str] = &[
    "all", "alter", "and", "any", "as", "asc", "between", "by", "cascade", "case", "check",
    "column", "constraint", "create", "cross", "current", "default", "delete", "desc",
    "distinct", "drop", "else", "end", "except", "exists", "foreign", "from", "full", "group",
    "having", "in", "inner", "insert", "intersect", "into", "is", "join", "left",
    "like", "limit", "not", "null", "offset", "on", "or", "order", "outer", "primary",
    "references", "right", "select", "set", "table", "then", "to", "union", "unique",
    "update", "values", "when", "where", "with",
];

/// Whether a final name collides with a reserved word (case-insensitive).
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    RESERVED.contains(&lowered.as_str())
}
