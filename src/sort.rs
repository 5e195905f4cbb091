use crate::record::{Record, RecordId, RecordSet, Schema};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// The single active sort key.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: &str) -> Self {
        SortState {
            column: column.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    /// Header click: the same column flips direction, a new column starts
    /// ascending.
    pub fn toggle(&mut self, column: &str) {
        if self.column == column {
            self.direction = self.direction.flipped();
        } else {
            self.column = column.to_string();
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Order ids in place by the state's column.
///
/// Values compare lexicographically as plain strings; `"10"` sorts before
/// `"9"`. The sort is stable in both directions because descending order
/// reverses the comparison, not the result. An unknown column leaves the
/// input order untouched.
pub fn sort_ids(set: &RecordSet, ids: &mut [RecordId], state: &SortState) {
    let Some(column) = set.schema().index_of(&state.column) else {
        return;
    };

    ids.sort_by(|a, b| {
        let lhs = set.get(*a).map(|r| r.value(column)).unwrap_or("");
        let rhs = set.get(*b).map(|r| r.value(column)).unwrap_or("");
        state.direction.apply(lhs.cmp(rhs))
    });
}

/// Record-returning form of [`sort_ids`], for callers holding a filtered
/// slice of records.
pub fn sort<'a>(
    mut records: Vec<&'a Record>,
    schema: &Schema,
    state: &SortState,
) -> Vec<&'a Record> {
    if let Some(column) = schema.index_of(&state.column) {
        records.sort_by(|a, b| state.direction.apply(a.value(column).cmp(b.value(column))));
    }
    records
}
