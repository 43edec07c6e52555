use minidesk_table::{
    render_table, Cell, CellMode, ColumnConfig, FieldConfig, FieldError, FieldIssue, FieldValue,
    SortDirection, SortState, TableBody, TableCommand, TableEditor, TableError, TableKey,
    TableOptions, TableRecord,
};

#[derive(Debug, Clone, PartialEq)]
struct Expense {
    id: String,
    name: String,
    amount: f64,
    fixed: bool,
}

impl Expense {
    fn new(id: &str, name: &str, amount: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount,
            fixed: false,
        }
    }
}

impl TableRecord for Expense {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "name" => Some(self.name.as_str().into()),
            "amount" => Some(self.amount.into()),
            _ => None,
        }
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        match (key, value) {
            ("name", FieldValue::Text(name)) => self.name = name,
            ("amount", FieldValue::Number(amount)) => self.amount = amount,
            (other, _) => return Err(FieldError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn is_protected(&self) -> bool {
        self.fixed
    }
}

fn fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::text("name", "Name").required(),
        FieldConfig::number("amount", "Amount").min(0.0),
    ]
}

fn columns() -> Vec<ColumnConfig<Expense>> {
    vec![
        ColumnConfig::new("name", "Name", 160.0),
        ColumnConfig::new("amount", "Amount", 80.0),
    ]
}

#[test]
fn negative_amount_is_refused_and_edit_stays_open() {
    let data = vec![Expense::new("1", "Rent", 1200.0)];
    let mut editor = TableEditor::new(fields());
    editor.start_edit(&data[0]);
    editor.edit_change("amount", "-5");

    let err = editor.save_edit().unwrap_err();
    assert_eq!(err.issue_for("amount"), Some(&FieldIssue::BelowMin(0.0)));
    assert_eq!(editor.editing_id(), Some("1"));
    assert_eq!(data, vec![Expense::new("1", "Rent", 1200.0)]);

    let view = render_table(&data, &columns(), &editor, &TableOptions::default());
    let row = &view.rows()[0];
    assert!(row.editing);
    match &row.cells[1] {
        Cell::Input { value, error, .. } => {
            assert_eq!(value, "-5");
            assert_eq!(error.as_deref(), Some("must be at least 0"));
        }
        other => panic!("expected input cell, got {other:?}"),
    }
}

#[test]
fn blank_required_name_blocks_save() {
    let data = vec![Expense::new("1", "Rent", 1200.0)];
    let mut editor = TableEditor::new(fields());
    editor.start_edit(&data[0]);
    editor.edit_change("name", "   ");
    let err = editor.save_edit().unwrap_err();
    assert_eq!(err.to_string(), "Name is required");
}

#[test]
fn successful_save_commits_through_the_owner() {
    let data = vec![Expense::new("1", "Rent", 1200.0), Expense::new("2", "Gym", 30.0)];
    let mut editor = TableEditor::new(fields());
    editor.start_edit(&data[1]);
    editor.edit_change("amount", "35");
    let command = editor.save_edit().unwrap();
    let data = command.apply(&data);
    assert_eq!(data[1].amount, 35.0);
    assert_eq!(data[0], Expense::new("1", "Rent", 1200.0));
    assert_eq!(editor.editing_id(), Some("2"));
    editor.finish_edit();
    assert!(editor.editing_id().is_none());
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Start(usize),
    Change(&'static str, &'static str),
    Save,
    Finish,
    Cancel,
    Delete(usize),
    Key(TableKey),
}

#[test]
fn at_most_one_row_is_edited_across_mixed_interactions() {
    let mut data = vec![
        Expense::new("1", "Rent", 1200.0),
        Expense::new("2", "Gym", 30.0),
        Expense::new("3", "Phone", 45.0),
        Expense::new("4", "Water", 20.0),
    ];
    let steps = [
        Step::Start(0),
        Step::Start(1),
        Step::Change("amount", "-1"),
        Step::Save,
        Step::Start(2),
        Step::Start(2),
        Step::Change("name", "Mobile"),
        Step::Key(TableKey::Other),
        Step::Start(0),
        Step::Delete(1),
        Step::Cancel,
        Step::Cancel,
        Step::Start(3),
        Step::Delete(3),
        Step::Start(1),
        Step::Change("amount", "40"),
        Step::Key(TableKey::Enter),
        Step::Finish,
        Step::Start(0),
        Step::Key(TableKey::Escape),
        Step::Start(2),
        Step::Start(0),
        Step::Save,
        Step::Delete(0),
    ];

    let mut editor = TableEditor::new(fields());
    for (n, step) in steps.into_iter().enumerate() {
        let command = match step {
            Step::Start(i) => {
                if let Some(row) = data.get(i) {
                    editor.start_edit(row);
                }
                TableCommand::None
            }
            Step::Change(key, raw) => {
                editor.edit_change(key, raw);
                TableCommand::None
            }
            Step::Save => editor.save_edit().unwrap_or(TableCommand::None),
            Step::Finish => {
                editor.finish_edit();
                TableCommand::None
            }
            Step::Cancel => {
                editor.cancel_edit();
                TableCommand::None
            }
            Step::Delete(i) => match data.get(i).cloned() {
                Some(row) => editor.delete_row(&row).unwrap_or(TableCommand::None),
                None => TableCommand::None,
            },
            Step::Key(key) => editor.key_down(key).unwrap_or(TableCommand::None),
        };
        data = command.apply(&data);

        let editing: Vec<_> = data.iter().filter(|row| editor.is_editing(&row.id)).collect();
        assert!(editing.len() <= 1, "step {n} ({step:?}) left {} rows editing", editing.len());
        match (editor.editing_id(), editor.edit_form()) {
            (Some(id), Some(form)) => {
                assert_eq!(form.draft().id, id, "step {n}: draft belongs to another row");
                assert_eq!(editing.len(), 1, "step {n}: edited row {id} is not in the data");
            }
            (None, None) => assert!(editing.is_empty()),
            _ => panic!("step {n}: editing id and form disagree"),
        }
    }
    assert!(editor.editing_id().is_none());
    let names: Vec<_> = data.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["Phone", "Water"]);
    assert_eq!(data[0].amount, 40.0);
}

#[test]
fn deleting_the_edited_row_clears_edit_state() {
    let data = vec![Expense::new("1", "Rent", 1200.0), Expense::new("2", "Gym", 30.0)];
    let mut editor = TableEditor::new(fields());
    editor.start_edit(&data[0]);
    let command = editor.delete_row(&data[0]).unwrap();
    assert_eq!(command, TableCommand::Remove("1".into()));
    assert!(editor.editing_id().is_none());

    editor.start_edit(&data[1]);
    editor.delete_row(&data[0]).unwrap();
    assert_eq!(editor.editing_id(), Some("2"));
}

#[test]
fn protected_rows_are_not_deleted() {
    let mut rent = Expense::new("1", "Rent", 1200.0);
    rent.fixed = true;
    let mut editor = TableEditor::new(fields());
    assert_eq!(
        editor.delete_row(&rent),
        Err(TableError::Protected("Rent".into()))
    );
}

#[test]
fn empty_data_renders_placeholder() {
    let editor = TableEditor::<Expense>::new(fields());
    let options = TableOptions {
        placeholder: "No expenses".into(),
        ..TableOptions::default()
    };
    let view = render_table(&[], &columns(), &editor, &options);
    assert_eq!(view.body, TableBody::Placeholder("No expenses".into()));
    assert_eq!(view.headers.len(), 2);
    assert!(view.rows().is_empty());
}

#[test]
fn display_rows_use_custom_render_and_row_class() {
    let data = vec![Expense::new("1", "Rent", 1200.0), Expense::new("2", "Gym", 30.0)];
    let editor = TableEditor::new(fields());
    let mut columns = columns();
    columns.push(
        ColumnConfig::new("flag", "", 24.0).with_render(|row: &Expense, mode| match mode {
            CellMode::Display => Cell::Flag(row.amount > 100.0),
            CellMode::Editing => Cell::Empty,
        }),
    );
    let big = |row: &Expense| (row.amount > 100.0).then(|| "large".to_string());
    let options = TableOptions {
        row_class: Some(&big),
        ..TableOptions::default()
    };
    let view = render_table(&data, &columns, &editor, &options);
    let rows = view.rows();
    assert_eq!(rows[0].cells[0], Cell::text("Rent"));
    assert_eq!(rows[0].cells[1], Cell::text("1200"));
    assert_eq!(rows[0].cells[2], Cell::Flag(true));
    assert_eq!(rows[0].class.as_deref(), Some("large"));
    assert_eq!(rows[1].class, None);
    assert!(rows.iter().all(|row| !row.editing));
}

#[test]
fn sorting_orders_rows_without_touching_data() {
    let data = vec![
        Expense::new("1", "Rent", 1200.0),
        Expense::new("2", "Gym", 30.0),
        Expense::new("3", "Phone", 45.0),
    ];
    let editor = TableEditor::new(fields());
    let mut sort = SortState::default();
    sort.toggle("amount");
    let options = TableOptions {
        sort: Some(&sort),
        ..TableOptions::default()
    };
    let view = render_table(&data, &columns(), &editor, &options);
    let ids: Vec<_> = view.rows().iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3", "1"]);
    assert_eq!(view.headers[1].sort, Some(SortDirection::Ascending));

    sort.toggle("amount");
    assert_eq!(sort.direction_for("amount"), Some(SortDirection::Descending));
    let ordered: Vec<_> = sort.apply(&data).iter().map(|row| row.id.clone()).collect();
    assert_eq!(ordered, vec!["1", "3", "2"]);
    sort.toggle("amount");
    assert_eq!(sort, SortState::default());
    assert_eq!(data[0].id, "1");
}
