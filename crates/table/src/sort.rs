use std::cmp::Ordering;

use crate::record::TableRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Column sort chosen by clicking headers. Purely a view concern; the stored row order
/// is never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    key: Option<String>,
    direction: Option<SortDirection>,
}

impl SortState {
    pub fn by(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction: Some(direction),
        }
    }

    /// Direction applied to `key`, if it is the sort column.
    pub fn direction_for(&self, key: &str) -> Option<SortDirection> {
        if self.key.as_deref() == Some(key) {
            self.direction
        } else {
            None
        }
    }

    /// Header click: a new column sorts ascending, the same column flips, and a third
    /// click clears the sort.
    pub fn toggle(&mut self, key: &str) {
        match self.direction_for(key) {
            None => *self = Self::by(key, SortDirection::Ascending),
            Some(SortDirection::Ascending) => self.direction = Some(SortDirection::Descending),
            Some(SortDirection::Descending) => *self = Self::default(),
        }
    }

    /// Returns `rows` in display order. Rows missing the sort field go last; ties keep
    /// their stored order.
    pub fn apply<'a, R: TableRecord>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let mut ordered: Vec<&R> = rows.iter().collect();
        let (Some(key), Some(direction)) = (self.key.as_deref(), self.direction) else {
            return ordered;
        };
        ordered.sort_by(|a, b| match (a.field(key), b.field(key)) {
            (Some(left), Some(right)) => {
                let ordering = left.sort_cmp(&right);
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        ordered
    }
}
