//! Patterns, columns and triggers.

use serde::{Deserialize, Serialize};

use crate::limits::CHANNELS_MAX;
use crate::tstamp::Tstamp;
use crate::value::Value;

/// Reference to one playable instance of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatInstRef {
    pub pattern: usize,
    pub instance: usize,
}

impl PatInstRef {
    pub fn new(pattern: usize, instance: usize) -> Self {
        PatInstRef { pattern, instance }
    }
}

/// An authored event: name, argument and row position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    pub argument: Value,
    pub position: Tstamp,
}

impl Trigger {
    pub fn new(name: impl Into<String>, argument: Value, position: Tstamp) -> Self {
        Trigger {
            name: name.into(),
            argument,
            position,
        }
    }
}

/// One pattern column; columns map 1:1 to channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    triggers: Vec<Trigger>,
}

impl Column {
    pub fn new() -> Self {
        Column::default()
    }

    /// Append a trigger, keeping position order (stable for equal positions).
    pub fn add_trigger(&mut self, trigger: Trigger) {
        let index = self
            .triggers
            .partition_point(|t| t.position <= trigger.position);
        self.triggers.insert(index, trigger);
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Index of the first trigger at or after `position`.
    pub fn first_trigger_at(&self, position: Tstamp) -> usize {
        self.triggers.partition_point(|t| t.position < position)
    }
}

/// A pattern: a length in beat time and up to one column per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub length: Tstamp,
    columns: Vec<Column>,
}

impl Pattern {
    pub fn new(length: Tstamp) -> Self {
        Pattern {
            length,
            columns: Vec::new(),
        }
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_mut(&mut self, index: usize) -> &mut Column {
        debug_assert!(index < CHANNELS_MAX);
        if self.columns.len() <= index {
            self.columns.resize_with(index + 1, Column::new);
        }
        &mut self.columns[index]
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_stay_position_sorted_and_stable() {
        let mut col = Column::new();
        col.add_trigger(Trigger::new("b", Value::None, Tstamp::from_beats(1)));
        col.add_trigger(Trigger::new("a", Value::None, Tstamp::ZERO));
        col.add_trigger(Trigger::new("c", Value::None, Tstamp::from_beats(1)));

        let names: Vec<&str> = col.triggers().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn first_trigger_lookup() {
        let mut col = Column::new();
        col.add_trigger(Trigger::new("a", Value::None, Tstamp::ZERO));
        col.add_trigger(Trigger::new("b", Value::None, Tstamp::from_beats(2)));

        assert_eq!(col.first_trigger_at(Tstamp::ZERO), 0);
        assert_eq!(col.first_trigger_at(Tstamp::new(0, 1)), 1);
        assert_eq!(col.first_trigger_at(Tstamp::from_beats(2)), 1);
        assert_eq!(col.first_trigger_at(Tstamp::from_beats(3)), 2);
    }

    #[test]
    fn pattern_grows_columns_on_demand() {
        let mut pat = Pattern::new(Tstamp::from_beats(4));
        pat.column_mut(3)
            .add_trigger(Trigger::new("x", Value::None, Tstamp::ZERO));
        assert_eq!(pat.column_count(), 4);
        assert!(pat.column(0).unwrap().triggers().is_empty());
        assert_eq!(pat.column(3).unwrap().triggers().len(), 1);
    }
}
