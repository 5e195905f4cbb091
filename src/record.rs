use serde::{Deserialize, Serialize};

/// Declared value kind of a column.
///
/// The kind is a display and validation hint. Filtering semantics come from
/// the operator a condition uses, never from the kind.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Number,
    Currency,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ValueKind,
}

impl Column {
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Column {
            name: name.to_string(),
            kind,
        }
    }
}

/// Columns of the link-listing table, in display order.
pub const LISTING_COLUMNS: [(&str, ValueKind); 9] = [
    ("Domain", ValueKind::Text),
    ("Niche 1", ValueKind::Text),
    ("Niche 2", ValueKind::Text),
    ("Traffic", ValueKind::Number),
    ("DR", ValueKind::Number),
    ("DA", ValueKind::Number),
    ("Language", ValueKind::Text),
    ("Price", ValueKind::Currency),
    ("Spam Score", ValueKind::Number),
];

/// Ordered list of the columns every record in a working set carries.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    /// The fixed schema of the listings table.
    pub fn listings() -> Self {
        Schema::new(
            LISTING_COLUMNS
                .iter()
                .map(|(name, kind)| Column::new(name, *kind))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of a column, matched exactly by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of a column, ignoring ASCII case. Used for typed user input.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.index_of(name).or_else(|| {
            self.columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::listings()
    }
}

/// Stable identity of a record within one loaded working set.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub usize);

/// One row of the table. Values line up with the schema's columns.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Record {
    values: Box<[String]>,
}

impl Record {
    /// Builds a record with exactly `width` fields: missing trailing values
    /// become empty strings, surplus values are dropped.
    pub fn with_width(mut values: Vec<String>, width: usize) -> Self {
        values.resize(width, String::new());
        Record {
            values: values.into_boxed_slice(),
        }
    }

    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get<'a>(&'a self, schema: &Schema, column: &str) -> Option<&'a str> {
        schema.index_of(column).map(|i| self.value(i))
    }
}

/// The immutable working set. Replaced wholesale on reload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordSet {
    schema: Schema,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        let width = schema.len();
        let records = records
            .into_iter()
            .map(|r| {
                if r.values.len() == width {
                    r
                } else {
                    Record::with_width(r.values.into_vec(), width)
                }
            })
            .collect();
        RecordSet { schema, records }
    }

    pub fn empty(schema: Schema) -> Self {
        RecordSet {
            schema,
            records: Vec::new(),
        }
    }

    /// Convenience constructor from rows of `(column, value)` pairs.
    /// Columns not mentioned in a row are left empty.
    pub fn from_pairs(schema: Schema, rows: &[&[(&str, &str)]]) -> Self {
        let records = rows
            .iter()
            .map(|pairs| {
                let mut values = vec![String::new(); schema.len()];
                for (name, value) in pairs.iter() {
                    if let Some(i) = schema.index_of(name) {
                        values[i] = value.to_string();
                    }
                }
                Record::with_width(values, schema.len())
            })
            .collect();
        RecordSet { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> {
        (0..self.records.len()).map(RecordId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records.iter().enumerate().map(|(i, r)| (RecordId(i), r))
    }
}
