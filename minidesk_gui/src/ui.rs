use std::time::{Duration, Instant};

use chrono::{Datelike, Weekday};
use eframe::egui::{self, Align2, Color32, RichText, Ui};
use minidesk_filetree::{NodeKind, TreeEvent, TreeModal};
use minidesk_settings::ViewMode;
use minidesk_stores::{
    CalendarEvent, NotificationKind, ShoppingItem, TodoItem, Transaction, TransactionKind,
};
use minidesk_table::{Cell, TableBody, TableKey, TableView};

use crate::state::{Desk, Page, TableInput};

const ERROR_COLOR: Color32 = Color32::from_rgb(239, 68, 68);
const SUCCESS_COLOR: Color32 = Color32::from_rgb(34, 197, 94);
const INFO_COLOR: Color32 = Color32::from_rgb(59, 130, 246);
const ROW_HEIGHT: f32 = 20.0;

pub fn draw(desk: &mut Desk, ctx: &egui::Context) {
    desk.poll_hydration();
    if desk.is_hydrating() {
        ctx.request_repaint_after(Duration::from_millis(50));
    }

    egui::TopBottomPanel::top("navigation").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading("MiniDesk");
            ui.separator();
            for page in Page::ALL {
                ui.selectable_value(&mut desk.page, page, page.label());
            }
            if desk.is_hydrating() {
                ui.separator();
                ui.spinner();
            }
        });
    });

    match desk.page {
        Page::Todo => todo_page(desk, ctx),
        Page::Shopping => shopping_page(desk, ctx),
        Page::Notes => notes_page(desk, ctx),
        Page::Finance => finance_page(desk, ctx),
        Page::Expenses => expenses_page(desk, ctx),
        Page::Calendar => calendar_page(desk, ctx),
    }

    toasts(desk, ctx);
}

fn todo_page(desk: &mut Desk, ctx: &egui::Context) {
    let mut inputs = Vec::new();
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading(format!("Todo ({} open)", desk.todo.state().open_count()));
        ui.horizontal(|ui| {
            let drafts = &mut desk.drafts;
            let title = ui.add(
                egui::TextEdit::singleline(&mut drafts.todo_title)
                    .hint_text("What needs doing?")
                    .desired_width(260.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut drafts.todo_due)
                    .hint_text("YYYY-MM-DD")
                    .desired_width(100.0),
            );
            ui.add(
                egui::DragValue::new(&mut drafts.todo_priority)
                    .clamp_range(1..=5)
                    .prefix("p"),
            );
            if ui.button("Add").clicked() || submitted(ui, &title) {
                desk.add_todo();
            }
            if ui.button("Clear completed").clicked() {
                desk.clear_completed_todos();
            }
        });
        ui.separator();
        let done = |item: &TodoItem| item.done.then(|| "done".to_string());
        let view = desk.todo_table.view(&desk.todo.state().items, "No todos yet", Some(&done));
        inputs = draw_table(ui, "todo_table", &view);
    });
    for input in inputs {
        desk.todo_input(input);
    }
}

fn shopping_page(desk: &mut Desk, ctx: &egui::Context) {
    let mut inputs = Vec::new();
    egui::CentralPanel::default().show(ctx, |ui| {
        let remaining = desk.shopping.state().remaining().count();
        ui.heading(format!("Shopping ({remaining} to buy)"));
        ui.horizontal(|ui| {
            let drafts = &mut desk.drafts;
            let name = ui.add(
                egui::TextEdit::singleline(&mut drafts.shopping_name)
                    .hint_text("Item")
                    .desired_width(220.0),
            );
            ui.add(
                egui::DragValue::new(&mut drafts.shopping_quantity)
                    .clamp_range(0.0..=9999.0)
                    .speed(0.25),
            );
            ui.add(
                egui::TextEdit::singleline(&mut drafts.shopping_unit)
                    .hint_text("unit")
                    .desired_width(60.0),
            );
            if ui.button("Add").clicked() || submitted(ui, &name) {
                desk.add_shopping_item();
            }
            if ui.button("Clear bought").clicked() {
                desk.clear_bought();
            }
        });
        ui.separator();
        let bought = |item: &ShoppingItem| item.bought.then(|| "done".to_string());
        let view = desk.shopping_table.view(
            &desk.shopping.state().items,
            "The shopping list is empty",
            Some(&bought),
        );
        inputs = draw_table(ui, "shopping_table", &view);
    });
    for input in inputs {
        desk.shopping_input(input);
    }
}

fn notes_page(desk: &mut Desk, ctx: &egui::Context) {
    let mut events = Vec::new();
    let mut deletions = Vec::new();
    egui::SidePanel::left("notes_tree")
        .default_width(240.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("+ Note").clicked() {
                    events.push(TreeEvent::OpenCreate {
                        parent: None,
                        folder: false,
                    });
                }
                if ui.button("+ Folder").clicked() {
                    events.push(TreeEvent::OpenCreate {
                        parent: None,
                        folder: true,
                    });
                }
            });
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                let rows = desk.tree_view.rows(&desk.notes.state().tree);
                if rows.is_empty() {
                    ui.weak("No notes yet");
                }
                for row in rows {
                    ui.horizontal(|ui| {
                        ui.add_space(row.depth as f32 * 14.0);
                        let icon = match (row.kind, row.expanded) {
                            (NodeKind::Folder, true) => "📂",
                            (NodeKind::Folder, false) => "📁",
                            (NodeKind::File, _) => "📄",
                        };
                        let label = format!("{icon} {}", row.name);
                        let response = ui.selectable_label(row.selected, label);
                        if response.clicked() {
                            events.push(match row.kind {
                                NodeKind::Folder => TreeEvent::ClickFolder(row.full_path.clone()),
                                NodeKind::File => TreeEvent::ClickFile(row.full_path.clone()),
                            });
                        }
                        response.context_menu(|ui| {
                            if row.kind == NodeKind::Folder {
                                if ui.button("New note here").clicked() {
                                    events.push(TreeEvent::OpenCreate {
                                        parent: Some(row.full_path.clone()),
                                        folder: false,
                                    });
                                    ui.close_menu();
                                }
                                if ui.button("New folder here").clicked() {
                                    events.push(TreeEvent::OpenCreate {
                                        parent: Some(row.full_path.clone()),
                                        folder: true,
                                    });
                                    ui.close_menu();
                                }
                                if row.expanded && ui.button("Collapse all").clicked() {
                                    events.push(TreeEvent::CollapseFolder(row.full_path.clone()));
                                    ui.close_menu();
                                }
                            }
                            if row.selected && ui.button("Close").clicked() {
                                events.push(TreeEvent::Deselect);
                                ui.close_menu();
                            }
                            if ui.button("Rename").clicked() {
                                events.push(TreeEvent::OpenRename(row.full_path.clone()));
                                ui.close_menu();
                            }
                            if ui.button("Delete").clicked() {
                                deletions.push(row.full_path.clone());
                                ui.close_menu();
                            }
                        })
                    });
                }
            });
        });

    let mut edited = None;
    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(node) = desk.notes.state().tree.selected_node() else {
            ui.centered_and_justified(|ui| ui.weak("Select a note or create one"));
            return;
        };
        ui.heading(node.full_path.as_str());
        ui.separator();
        let mut content = node.content().unwrap_or_default().to_string();
        let response = egui::ScrollArea::vertical()
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut content)
                        .desired_width(f32::INFINITY)
                        .desired_rows(24)
                        .font(egui::TextStyle::Monospace),
                )
            })
            .inner;
        if response.changed() {
            edited = Some((node.full_path.clone(), content));
        }
    });
    if let Some((path, content)) = edited {
        desk.update_note(&path, content);
    }

    events.extend(tree_modal(desk.tree_view.modal(), ctx));
    for event in events {
        desk.tree_event(event);
    }
    for path in deletions {
        desk.delete_note(&path);
    }
}

fn tree_modal(modal: &TreeModal, ctx: &egui::Context) -> Vec<TreeEvent> {
    let title = match modal {
        TreeModal::Closed => return Vec::new(),
        TreeModal::Create { folder: true, .. } => "New folder",
        TreeModal::Create { .. } => "New note",
        TreeModal::Rename { .. } => "Rename",
    };
    let mut events = Vec::new();
    let mut input = modal.input().unwrap_or_default().to_string();
    let shown = egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_TOP, [0.0, 80.0])
        .show(ctx, |ui| {
            let response = ui.text_edit_singleline(&mut input);
            let enter = submitted(ui, &response);
            if !enter {
                response.request_focus();
            }
            if response.changed() {
                events.push(TreeEvent::Input(input.clone()));
            }
            if let Some(error) = modal.error() {
                ui.colored_label(ERROR_COLOR, error);
            }
            ui.horizontal(|ui| {
                if ui.button("OK").clicked() || enter {
                    events.push(TreeEvent::Submit);
                }
                if ui.button("Cancel").clicked() {
                    events.push(TreeEvent::Dismiss);
                }
            });
        });
    if let Some(shown) = shown {
        if shown.response.clicked_elsewhere() {
            events.push(TreeEvent::Dismiss);
        }
    }
    events
}

fn finance_page(desk: &mut Desk, ctx: &egui::Context) {
    let mut transaction_inputs = Vec::new();
    let mut category_inputs = Vec::new();
    let mut add_transaction = false;
    let mut add_category = false;

    egui::SidePanel::right("finance_categories")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Categories");
            ui.horizontal(|ui| {
                let name = ui.add(
                    egui::TextEdit::singleline(&mut desk.drafts.category_name)
                        .hint_text("New category")
                        .desired_width(150.0),
                );
                add_category = ui.button("Add").clicked() || submitted(ui, &name);
            });
            let view = desk.category_table.view(
                &desk.finance.state().categories,
                "No categories",
                None,
            );
            category_inputs = draw_table(ui, "category_table", &view);

            ui.separator();
            ui.heading("Spending by category");
            let currency = &desk.currency;
            for total in desk.finance.state().by_category(desk.finance_view, desk.today) {
                if total.expense > 0.0 {
                    ui.label(format!("{}: {:.2} {currency}", total.category, total.expense));
                }
            }
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading("Finance");
            egui::ComboBox::from_id_source("finance_view")
                .selected_text(desk.finance_view.label())
                .show_ui(ui, |ui| {
                    for view in ViewMode::ALL {
                        ui.selectable_value(&mut desk.finance_view, view, view.label());
                    }
                });
        });
        let summary = desk.finance.state().summary(desk.finance_view, desk.today);
        let currency = desk.currency.clone();
        ui.horizontal(|ui| {
            ui.colored_label(SUCCESS_COLOR, format!("Income {:.2} {currency}", summary.income));
            ui.separator();
            ui.colored_label(ERROR_COLOR, format!("Expense {:.2} {currency}", summary.expense));
            ui.separator();
            ui.strong(format!("Balance {:.2} {currency}", summary.balance));
        });
        ui.separator();

        ui.horizontal(|ui| {
            let drafts = &mut desk.drafts;
            ui.add(
                egui::TextEdit::singleline(&mut drafts.tx_date)
                    .hint_text("today")
                    .desired_width(90.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut drafts.tx_description)
                    .hint_text("Description")
                    .desired_width(180.0),
            );
            egui::ComboBox::from_id_source("tx_category")
                .selected_text(drafts.tx_category.clone())
                .width(110.0)
                .show_ui(ui, |ui| {
                    for category in &desk.finance.state().categories {
                        ui.selectable_value(
                            &mut drafts.tx_category,
                            category.name.clone(),
                            category.name.as_str(),
                        );
                    }
                });
            let amount = ui.add(
                egui::TextEdit::singleline(&mut drafts.tx_amount)
                    .hint_text("0.00")
                    .desired_width(80.0),
            );
            ui.selectable_value(&mut drafts.tx_kind, TransactionKind::Expense, "Expense");
            ui.selectable_value(&mut drafts.tx_kind, TransactionKind::Income, "Income");
            add_transaction = ui.button("Add").clicked() || submitted(ui, &amount);
        });
        ui.separator();

        let rows: Vec<_> = desk
            .finance
            .state()
            .transactions_in(desk.finance_view, desk.today)
            .into_iter()
            .cloned()
            .collect();
        let kind = |tx: &Transaction| Some(tx.kind.as_str().to_string());
        let placeholder = format!("No transactions ({})", desk.finance_view.label());
        let view = desk.transaction_table.view(&rows, &placeholder, Some(&kind));
        transaction_inputs = draw_table(ui, "transaction_table", &view);
    });

    if add_category {
        desk.add_category();
    }
    if add_transaction {
        desk.add_transaction();
    }
    for input in category_inputs {
        desk.category_input(input);
    }
    for input in transaction_inputs {
        desk.transaction_input(input);
    }
}

fn expenses_page(desk: &mut Desk, ctx: &egui::Context) {
    let mut inputs = Vec::new();
    egui::CentralPanel::default().show(ctx, |ui| {
        let state = desk.expenses.state();
        ui.heading(format!(
            "Recurring expenses: {:.2} {} per month",
            state.monthly_total(),
            desk.currency
        ));
        let due: Vec<_> = state
            .due_in(desk.today.year(), desk.today.month())
            .into_iter()
            .filter(|(date, _)| *date >= desk.today)
            .map(|(date, item)| format!("{} on {}", item.name, date.format("%b %-d")))
            .collect();
        if !due.is_empty() {
            ui.weak(format!("Still due this month: {}", due.join(", ")));
        }
        ui.horizontal(|ui| {
            let drafts = &mut desk.drafts;
            let name = ui.add(
                egui::TextEdit::singleline(&mut drafts.expense_name)
                    .hint_text("Name")
                    .desired_width(180.0),
            );
            ui.add(
                egui::TextEdit::singleline(&mut drafts.expense_amount)
                    .hint_text("Amount")
                    .desired_width(80.0),
            );
            ui.add(
                egui::DragValue::new(&mut drafts.expense_due_day)
                    .clamp_range(1..=31)
                    .prefix("day "),
            );
            ui.add(
                egui::TextEdit::singleline(&mut drafts.expense_category)
                    .hint_text("Category")
                    .desired_width(110.0),
            );
            if ui.button("Add").clicked() || submitted(ui, &name) {
                desk.add_expense();
            }
        });
        ui.separator();
        let view = desk.expense_table.view(
            &desk.expenses.state().items,
            "No recurring expenses",
            None,
        );
        inputs = draw_table(ui, "expense_table", &view);
    });
    for input in inputs {
        desk.expense_input(input);
    }
}

fn calendar_page(desk: &mut Desk, ctx: &egui::Context) {
    let mut inputs = Vec::new();
    let mut shift = 0;
    let mut picked = None;
    let mut add_event = false;

    egui::SidePanel::left("calendar_month")
        .default_width(320.0)
        .show(ctx, |ui| {
            let month = desk.calendar_month;
            ui.horizontal(|ui| {
                if ui.button("◀").clicked() {
                    shift = -1;
                }
                ui.strong(month.format("%B %Y").to_string());
                if ui.button("▶").clicked() {
                    shift = 1;
                }
            });
            let days = desk.calendar.state().month_days(month.year(), month.month());
            egui::Grid::new("month_grid").num_columns(7).show(ui, |ui| {
                for weekday in ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"] {
                    ui.weak(weekday);
                }
                ui.end_row();
                for day in days {
                    let mut text = RichText::new(day.date.day().to_string());
                    if !day.in_month {
                        text = text.weak();
                    }
                    if day.date == desk.today {
                        text = text.strong();
                    }
                    if day.event_count > 0 {
                        text = text.color(INFO_COLOR);
                    }
                    if ui
                        .selectable_label(day.date == desk.calendar_day, text)
                        .clicked()
                    {
                        picked = Some(day.date);
                    }
                    if day.date.weekday() == Weekday::Sun {
                        ui.end_row();
                    }
                }
            });

            ui.separator();
            ui.strong(desk.calendar_day.format("%A, %B %-d").to_string());
            let events = desk.calendar.state().events_on(desk.calendar_day);
            if events.is_empty() {
                ui.weak("Nothing planned");
            }
            for event in events {
                let time = event
                    .time
                    .map(|time| time.format("%H:%M").to_string())
                    .unwrap_or_else(|| "all day".to_string());
                ui.label(format!("{time}  {}", event.title));
            }
            ui.separator();
            let drafts = &mut desk.drafts;
            let title =
                ui.add(egui::TextEdit::singleline(&mut drafts.event_title).hint_text("Title"));
            ui.add(
                egui::TextEdit::singleline(&mut drafts.event_time).hint_text("HH:MM (optional)"),
            );
            ui.add(egui::TextEdit::singleline(&mut drafts.event_notes).hint_text("Notes"));
            add_event = ui.button("Add event").clicked() || submitted(ui, &title);
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Upcoming");
        let today = desk.today;
        let past = move |event: &CalendarEvent| {
            (event.date < today).then(|| "past".to_string())
        };
        let view = desk.event_table.view(&desk.calendar.state().events, "No events", Some(&past));
        inputs = draw_table(ui, "event_table", &view);
    });

    if shift != 0 {
        desk.shift_month(shift);
    }
    if let Some(date) = picked {
        desk.calendar_day = date;
    }
    if add_event {
        desk.add_event();
    }
    for input in inputs {
        desk.event_input(input);
    }
}

/// Draws a table view model and collects what the user did with it.
/// 繪製表格檢視模型並收集使用者操作。
fn draw_table(ui: &mut Ui, id: &str, view: &TableView) -> Vec<TableInput> {
    let mut inputs = Vec::new();
    egui::ScrollArea::vertical().id_source(id).show(ui, |ui| {
        egui::Grid::new(id)
            .striped(true)
            .num_columns(view.headers.len() + 1)
            .show(ui, |ui| {
                for header in &view.headers {
                    let arrow = match header.sort {
                        Some(minidesk_table::SortDirection::Ascending) => " ▲",
                        Some(minidesk_table::SortDirection::Descending) => " ▼",
                        None => "",
                    };
                    let label = RichText::new(format!("{}{arrow}", header.label)).strong();
                    let button = egui::Button::new(label).frame(false);
                    if ui.add_sized([header.width, ROW_HEIGHT], button).clicked() {
                        inputs.push(TableInput::Sort(header.key.clone()));
                    }
                }
                ui.label("");
                ui.end_row();

                let rows = match &view.body {
                    TableBody::Placeholder(message) => {
                        ui.weak(message.as_str());
                        ui.end_row();
                        return;
                    }
                    TableBody::Rows(rows) => rows,
                };
                for row in rows {
                    let tint = row.class.as_deref().and_then(|class| class_color(ui, class));
                    for (cell, header) in row.cells.iter().zip(&view.headers) {
                        draw_cell(ui, id, &row.id, cell, header.width, tint, &mut inputs);
                    }
                    ui.horizontal(|ui| {
                        if row.editing {
                            if ui.small_button("Save").clicked() {
                                inputs.push(TableInput::Key(TableKey::Enter));
                            }
                            if ui.small_button("Cancel").clicked()
                                || ui.input(|input| input.key_pressed(egui::Key::Escape))
                            {
                                inputs.push(TableInput::Key(TableKey::Escape));
                            }
                        } else if ui.small_button("Edit").clicked() {
                            inputs.push(TableInput::StartEdit(row.id.clone()));
                        }
                        let delete = ui
                            .add_enabled(!row.protected, egui::Button::new("Delete").small())
                            .on_disabled_hover_text("Built-in entries cannot be deleted");
                        if delete.clicked() {
                            inputs.push(TableInput::Delete(row.id.clone()));
                        }
                    });
                    ui.end_row();
                }
            });
    });
    inputs
}

fn draw_cell(
    ui: &mut Ui,
    table: &str,
    row_id: &str,
    cell: &Cell,
    width: f32,
    tint: Option<Color32>,
    inputs: &mut Vec<TableInput>,
) {
    match cell {
        Cell::Text(text) => {
            let mut text = RichText::new(text.as_str());
            if let Some(color) = tint {
                text = text.color(color);
            }
            ui.label(text);
        }
        Cell::Empty => {
            ui.weak("—");
        }
        Cell::Flag(checked) => {
            let mut checked = *checked;
            if ui.checkbox(&mut checked, "").changed() {
                inputs.push(TableInput::Flag(row_id.to_string()));
            }
        }
        Cell::Input {
            key, value, error, ..
        } => {
            ui.vertical(|ui| {
                let mut text = value.clone();
                let response = ui.add(egui::TextEdit::singleline(&mut text).desired_width(width));
                if response.changed() {
                    inputs.push(TableInput::Change {
                        key: key.clone(),
                        raw: text,
                    });
                }
                if submitted(ui, &response) {
                    inputs.push(TableInput::Key(TableKey::Enter));
                }
                if let Some(error) = error {
                    ui.colored_label(ERROR_COLOR, RichText::new(error.as_str()).small());
                }
            });
        }
        Cell::Select {
            key,
            value,
            options,
            error,
        } => {
            ui.vertical(|ui| {
                egui::ComboBox::from_id_source((table, row_id, key.as_str()))
                    .selected_text(value.as_str())
                    .width(width)
                    .show_ui(ui, |ui| {
                        for option in options {
                            if ui.selectable_label(option == value, option.as_str()).clicked() {
                                inputs.push(TableInput::Change {
                                    key: key.clone(),
                                    raw: option.clone(),
                                });
                            }
                        }
                    });
                if let Some(error) = error {
                    ui.colored_label(ERROR_COLOR, RichText::new(error.as_str()).small());
                }
            });
        }
    }
}

fn class_color(ui: &Ui, class: &str) -> Option<Color32> {
    match class {
        "done" | "past" => Some(ui.visuals().weak_text_color()),
        "income" => Some(SUCCESS_COLOR),
        _ => None,
    }
}

/// Enter pressed while `response`'s text field had focus.
fn submitted(ui: &Ui, response: &egui::Response) -> bool {
    response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter))
}

fn toasts(desk: &mut Desk, ctx: &egui::Context) {
    let now = Instant::now();
    let visible: Vec<_> = desk
        .notifications
        .visible(now)
        .map(|toast| (toast.id, toast.message.clone(), toast.kind))
        .collect();
    if visible.is_empty() {
        return;
    }
    let mut dismissed = Vec::new();
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(Align2::RIGHT_BOTTOM, [-16.0, -16.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            for (id, message, kind) in visible {
                let color = match kind {
                    NotificationKind::Success => SUCCESS_COLOR,
                    NotificationKind::Error => ERROR_COLOR,
                    NotificationKind::Info => INFO_COLOR,
                };
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(color, message);
                        if ui.small_button("✕").clicked() {
                            dismissed.push(id);
                        }
                    });
                });
            }
        });
    for id in dismissed {
        desk.notifications.dismiss(id);
    }
    ctx.request_repaint_after(Duration::from_millis(250));
}
