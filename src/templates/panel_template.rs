use serde::Serialize;

use crate::controller::panel::PanelStatus;
use crate::item::{FieldDescriptor, Item};

pub const LOADING_TEXT: &str = "Loading...";
pub const EMPTY_TEXT: &str = "No items found.";
pub const ACTIONS_HEADER: &str = "Actions";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormInput {
    pub name: String,
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    pub index: usize,
    pub cells: Vec<String>,
    /// Whether Edit/Delete can target this row.
    pub actionable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelBody {
    Loading { message: String },
    Empty { message: String },
    Table { headers: Vec<String>, rows: Vec<TableRow> },
}

/// Render-agnostic snapshot of everything a panel displays.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PanelView {
    pub title: String,
    pub inputs: Vec<FormInput>,
    pub submit_label: String,
    pub show_cancel: bool,
    pub body: PanelBody,
}

pub fn build_panel_view(
    title: &str,
    fields: &[FieldDescriptor],
    items: &[Item],
    draft: &Item,
    editing: bool,
    status: PanelStatus,
) -> PanelView {
    let inputs = fields
        .iter()
        .map(|f| FormInput {
            name: f.name.clone(),
            label: f.label.clone(),
            value: draft.display(&f.name),
        })
        .collect();

    let body = match status {
        PanelStatus::Loading => PanelBody::Loading {
            message: LOADING_TEXT.into(),
        },
        PanelStatus::Empty => PanelBody::Empty {
            message: EMPTY_TEXT.into(),
        },
        PanelStatus::Populated => {
            let mut headers: Vec<String> = fields.iter().map(|f| f.label.clone()).collect();
            headers.push(ACTIONS_HEADER.into());
            let rows = items
                .iter()
                .enumerate()
                .map(|(index, item)| TableRow {
                    index,
                    cells: fields.iter().map(|f| item.display(&f.name)).collect(),
                    actionable: item.id().is_some(),
                })
                .collect();
            PanelBody::Table { headers, rows }
        }
    };

    PanelView {
        title: title.to_string(),
        inputs,
        submit_label: if editing { "Update" } else { "Add" }.into(),
        show_cancel: editing,
        body,
    }
}
