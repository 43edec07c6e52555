use minidesk_table::{validate_record, FieldConfig, TableCommand, TableRecord};

use crate::reducer::{StoreError, StoreEvent};

pub(crate) fn contains<R: TableRecord>(rows: &[R], id: &str) -> bool {
    rows.iter().any(|row| row.id() == id)
}

/// Validates and appends a new row.
pub(crate) fn insert<R: TableRecord>(
    rows: &[R],
    row: R,
    fields: &[FieldConfig],
) -> Result<Vec<R>, StoreError> {
    validate_record(&row, fields)?;
    let mut next = rows.to_vec();
    next.push(row);
    Ok(next)
}

/// Validates `row` and replaces the row with the same id. `None` when no such row exists
/// or nothing changed.
pub(crate) fn replace<R: TableRecord + PartialEq>(
    rows: &[R],
    row: R,
    fields: &[FieldConfig],
) -> Result<Option<Vec<R>>, StoreError> {
    match rows.iter().find(|current| current.id() == row.id()) {
        None => Ok(None),
        Some(current) if *current == row => Ok(None),
        Some(_) => {
            validate_record(&row, fields)?;
            Ok(Some(TableCommand::Commit(row).apply(rows)))
        }
    }
}

/// Removes the row with `id`. `None` when it does not exist.
pub(crate) fn remove<R: TableRecord>(rows: &[R], id: &str) -> Option<Vec<R>> {
    contains(rows, id).then(|| TableCommand::Remove(id.to_string()).apply(rows))
}

/// Applies `change` to the row with `id`.
pub(crate) fn modify<R: TableRecord>(
    rows: &[R],
    id: &str,
    change: impl Fn(&mut R),
) -> Option<Vec<R>> {
    contains(rows, id).then(|| {
        rows.iter()
            .cloned()
            .map(|mut row| {
                if row.id() == id {
                    change(&mut row);
                }
                row
            })
            .collect()
    })
}

/// Turns a row-level result into the new state and the matching event.
pub(crate) fn settle<S: Clone, R>(
    state: &S,
    result: Result<Option<Vec<R>>, StoreError>,
    install: impl FnOnce(&mut S, Vec<R>),
) -> (S, StoreEvent) {
    match result {
        Ok(Some(rows)) => {
            let mut next = state.clone();
            install(&mut next, rows);
            (next, StoreEvent::Changed)
        }
        Ok(None) => (state.clone(), StoreEvent::Unchanged),
        Err(error) => (state.clone(), StoreEvent::Refused(error)),
    }
}
