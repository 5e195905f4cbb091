use crate::predicate::{FilterCondition, contains_ignore_case, evaluate};
use crate::record::{Record, RecordId, RecordSet, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Active per-column conditions, at most one per column.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConditionSet {
    conditions: BTreeMap<String, FilterCondition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        ConditionSet::default()
    }

    /// Insert a condition, replacing any previous one on the same column.
    pub fn insert(&mut self, condition: FilterCondition) -> Option<FilterCondition> {
        self.conditions.insert(condition.column.clone(), condition)
    }

    pub fn remove(&mut self, column: &str) -> Option<FilterCondition> {
        self.conditions.remove(column)
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    pub fn get(&self, column: &str) -> Option<&FilterCondition> {
        self.conditions.get(column)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterCondition> {
        self.conditions.values()
    }
}

impl FromIterator<FilterCondition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = FilterCondition>>(iter: I) -> Self {
        let mut set = ConditionSet::new();
        for condition in iter {
            set.insert(condition);
        }
        set
    }
}

/// Inclusion test built once per recomputation: the lowercased free text and
/// each condition resolved to its column position.
struct Matcher<'a> {
    needle: String,
    conditions: Vec<(Option<usize>, &'a FilterCondition)>,
}

impl<'a> Matcher<'a> {
    fn new(schema: &Schema, free_text: &str, conditions: &'a ConditionSet) -> Self {
        Matcher {
            needle: free_text.to_lowercase(),
            conditions: conditions
                .iter()
                .map(|c| (schema.index_of(&c.column), c))
                .collect(),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        let text_match = self.needle.is_empty()
            || record
                .values()
                .iter()
                .any(|v| contains_ignore_case(v, &self.needle));

        text_match
            && self.conditions.iter().all(|(index, condition)| {
                // unknown columns read as the empty string
                let field = index.map(|i| record.value(i)).unwrap_or("");
                evaluate(field, condition)
            })
    }
}

/// Ids of the records passing both filter layers, in source order.
///
/// # Arguments
/// * `set` - The working record set
/// * `free_text` - Text searched in every column; empty matches everything
/// * `conditions` - Per-column conditions, all of which must hold
///
/// # Returns
/// * `Vec<RecordId>` - Matching ids in their original relative order
pub fn filter_ids(set: &RecordSet, free_text: &str, conditions: &ConditionSet) -> Vec<RecordId> {
    if free_text.is_empty() && conditions.is_empty() {
        return set.ids().collect();
    }

    let matcher = Matcher::new(set.schema(), free_text, conditions);
    set.iter()
        .filter(|(_, record)| matcher.matches(record))
        .map(|(id, _)| id)
        .collect()
}

/// Record-returning form of [`filter_ids`].
pub fn filter<'a>(
    set: &'a RecordSet,
    free_text: &str,
    conditions: &ConditionSet,
) -> Vec<&'a Record> {
    filter_ids(set, free_text, conditions)
        .into_iter()
        .filter_map(|id| set.get(id))
        .collect()
}
