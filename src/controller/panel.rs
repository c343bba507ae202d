use serde_json::Value;
use tracing::{debug, error, info};

use crate::errors::{CrudError, CrudResult};
use crate::item::{FieldDescriptor, FieldValue, Item, ItemId};
use crate::services::CrudTransport;
use crate::templates::panel_template::{build_panel_view, PanelView};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this item?";

/// Caller-supplied configuration of a panel.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelProps {
    pub title: String,
    pub endpoint: String,
    pub fields: Vec<FieldDescriptor>,
}

impl PanelProps {
    pub fn new(title: &str, endpoint: &str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            title: title.to_string(),
            endpoint: endpoint.to_string(),
            fields,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelStatus {
    Loading,
    Empty,
    Populated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelMode {
    Creating,
    Editing(ItemId),
}

/// Handle for one in-flight list fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    endpoint: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The collection was replaced with this many items.
    Applied(usize),
    /// A newer fetch was issued first; this result was dropped.
    Stale,
    /// Endpoint unchanged, nothing fetched.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated(ItemId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Declined,
    Deleted,
}

/// Interactive yes/no gate used before deleting.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

fn member_path(endpoint: &str, id: &ItemId) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), id)
}

/// List + form controller for one REST resource.
///
/// Failures of every remote operation are logged here and also returned, so
/// a UI layer may surface them; local state is left as it was on failure.
pub struct CrudPanel<T: CrudTransport> {
    transport: T,
    title: String,
    endpoint: String,
    fields: Vec<FieldDescriptor>,
    items: Vec<Item>,
    loading: bool,
    draft: Item,
    editing: Option<ItemId>,
    fetch_seq: u64,
}

impl<T: CrudTransport> CrudPanel<T> {
    pub fn new(transport: T, props: PanelProps) -> Self {
        Self {
            transport,
            title: props.title,
            endpoint: props.endpoint,
            fields: props.fields,
            items: Vec::new(),
            loading: true,
            draft: Item::new(),
            editing: None,
            fetch_seq: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn draft(&self) -> &Item {
        &self.draft
    }

    pub fn editing(&self) -> Option<&ItemId> {
        self.editing.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn mode(&self) -> PanelMode {
        match &self.editing {
            Some(id) => PanelMode::Editing(id.clone()),
            None => PanelMode::Creating,
        }
    }

    pub fn status(&self) -> PanelStatus {
        if self.loading {
            PanelStatus::Loading
        } else if self.items.is_empty() {
            PanelStatus::Empty
        } else {
            PanelStatus::Populated
        }
    }

    /// Current input value for a field; absent keys show as empty.
    pub fn form_value(&self, name: &str) -> String {
        self.draft.display(name)
    }

    pub fn view(&self) -> PanelView {
        build_panel_view(
            &self.title,
            &self.fields,
            &self.items,
            &self.draft,
            self.editing.is_some(),
            self.status(),
        )
    }

    pub async fn mount(&mut self) -> CrudResult<FetchOutcome> {
        self.refresh().await
    }

    /// Switches the resource path, refetching only when it actually changed.
    pub async fn set_endpoint(&mut self, endpoint: &str) -> CrudResult<FetchOutcome> {
        if self.endpoint == endpoint {
            return Ok(FetchOutcome::Skipped);
        }
        self.endpoint = endpoint.to_string();
        self.refresh().await
    }

    pub async fn refresh(&mut self) -> CrudResult<FetchOutcome> {
        let ticket = self.begin_fetch();
        let result = self.transport.get(&ticket.endpoint).await;
        self.finish_fetch(&ticket, result)
    }

    /// Marks a fetch as in flight and hands out its sequence ticket.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_seq += 1;
        self.loading = true;
        FetchTicket {
            seq: self.fetch_seq,
            endpoint: self.endpoint.clone(),
        }
    }

    /// Applies a fetch result if its ticket is the newest one issued.
    ///
    /// A failed fetch keeps the previous collection.
    pub fn finish_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: CrudResult<Value>,
    ) -> CrudResult<FetchOutcome> {
        if ticket.seq != self.fetch_seq {
            debug!(
                seq = ticket.seq,
                latest = self.fetch_seq,
                endpoint = %ticket.endpoint,
                "dropping stale fetch result"
            );
            return Ok(FetchOutcome::Stale);
        }
        self.loading = false;

        let decoded = result.and_then(|body| {
            serde_json::from_value::<Vec<Item>>(body).map_err(CrudError::from)
        });
        match decoded {
            Ok(items) => {
                let count = items.len();
                self.items = items;
                debug!(endpoint = %ticket.endpoint, count, "items loaded");
                Ok(FetchOutcome::Applied(count))
            }
            Err(err) => {
                error!(error = %err, endpoint = %ticket.endpoint, "failed to fetch items");
                Err(err)
            }
        }
    }

    /// Shallow merge of one field into the draft. No request is issued.
    pub fn change_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.draft.set(name, value);
    }

    /// Loads an item into the draft and targets it for the next submit.
    pub fn edit(&mut self, item: &Item) -> CrudResult<()> {
        let id = item.id().ok_or(CrudError::MissingId)?;
        self.draft = item.clone();
        self.editing = Some(id);
        Ok(())
    }

    pub fn edit_row(&mut self, index: usize) -> CrudResult<()> {
        let item = self
            .items
            .get(index)
            .cloned()
            .ok_or_else(|| CrudError::NotFound(format!("row {index}")))?;
        self.edit(&item)
    }

    /// Leaves edit mode, discarding the draft. Returns false when not editing.
    pub fn cancel(&mut self) -> bool {
        if self.editing.is_none() {
            return false;
        }
        self.reset_form();
        true
    }

    fn reset_form(&mut self) {
        self.draft.clear();
        self.editing = None;
    }

    /// Creates or updates the draft, then refetches the list.
    ///
    /// The outcome reflects the mutation; a failed refetch afterwards is only
    /// logged.
    pub async fn submit(&mut self) -> CrudResult<SubmitOutcome> {
        let body = self.draft.to_json();
        let result = match &self.editing {
            Some(id) => {
                let path = member_path(&self.endpoint, id);
                self.transport
                    .put(&path, &body)
                    .await
                    .map(|_| SubmitOutcome::Updated(id.clone()))
            }
            None => self
                .transport
                .post(&self.endpoint, &body)
                .await
                .map(|_| SubmitOutcome::Created),
        };

        match result {
            Ok(outcome) => {
                info!(endpoint = %self.endpoint, ?outcome, "item saved");
                self.reset_form();
                let _ = self.refresh().await;
                Ok(outcome)
            }
            Err(err) => {
                error!(error = %err, endpoint = %self.endpoint, "failed to save item");
                Err(err)
            }
        }
    }

    /// Deletes an item after confirmation, then refetches the list.
    pub async fn delete(
        &mut self,
        id: &ItemId,
        confirm: &impl Confirm,
    ) -> CrudResult<DeleteOutcome> {
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(DeleteOutcome::Declined);
        }
        let path = member_path(&self.endpoint, id);
        match self.transport.delete(&path).await {
            Ok(_) => {
                info!(endpoint = %self.endpoint, %id, "item deleted");
                let _ = self.refresh().await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => {
                error!(error = %err, endpoint = %self.endpoint, %id, "failed to delete item");
                Err(err)
            }
        }
    }

    pub async fn delete_row(
        &mut self,
        index: usize,
        confirm: &impl Confirm,
    ) -> CrudResult<DeleteOutcome> {
        let id = self
            .items
            .get(index)
            .ok_or_else(|| CrudError::NotFound(format!("row {index}")))?
            .id()
            .ok_or(CrudError::MissingId)?;
        self.delete(&id, confirm).await
    }
}
