use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{oneshot, RwLock};

use super::{RequestHandler, Service, ServiceError};
use crate::models::members::{format_date, parse_date, Member};
use crate::models::sessions::AdminSession;
use crate::repositories::gym::GymApi;

/// The cached directory. While `Loading` the previous list is not shown; a
/// failed fetch degrades to an empty `Ready` list rather than wedging in
/// `Loading`.
#[derive(Clone, Debug)]
pub enum DirectoryView {
    Loading,
    Ready(Vec<Member>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditState {
    Viewing,
    Editing { draft: Option<NaiveDate> },
    Saving { draft: Option<NaiveDate> },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteState {
    Idle,
    Proposed,
    Deleting,
}

/// Per-record editor and deletion state, keyed by member id. The two flags
/// are independent; only same-record duplicates are excluded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordState {
    pub edit: EditState,
    pub delete: DeleteState,
}

impl Default for RecordState {
    fn default() -> Self {
        Self {
            edit: EditState::Viewing,
            delete: DeleteState::Idle,
        }
    }
}

pub enum DirectoryRequest {
    Refresh {
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Snapshot {
        query: Option<String>,
        response: oneshot::Sender<Result<DirectoryView, ServiceError>>,
    },
    InspectRecord {
        id: i64,
        response: oneshot::Sender<RecordState>,
    },
    BeginEdit {
        id: i64,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    UpdateDraft {
        id: i64,
        end_date: NaiveDate,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    CancelEdit {
        id: i64,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Save {
        id: i64,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    ProposeDelete {
        id: i64,
        response: oneshot::Sender<Result<String, ServiceError>>,
    },
    CancelDelete {
        id: i64,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    ConfirmDelete {
        id: i64,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
}

/// Case-insensitive substring match on the name, raw substring match on the
/// mobile number. Pure over the last full fetch; never re-queries.
pub fn filter_members(query: &str, members: &[Member]) -> Vec<Member> {
    if query.is_empty() {
        return members.to_vec();
    }

    let needle = query.to_lowercase();
    members
        .iter()
        .filter(|m| m.name.to_lowercase().contains(&needle) || m.mobile_number.contains(query))
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct DirectoryHandler {
    api: GymApi,
    session: Arc<RwLock<AdminSession>>,
    view: Arc<RwLock<DirectoryView>>,
    records: Arc<DashMap<i64, RecordState>>,
    refresh_generation: Arc<AtomicU64>,
}

impl DirectoryHandler {
    pub fn new(api: GymApi, session: Arc<RwLock<AdminSession>>) -> Self {
        Self {
            api,
            session,
            view: Arc::new(RwLock::new(DirectoryView::Loading)),
            records: Arc::new(DashMap::new()),
            refresh_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn authorize(&self) -> Result<(), ServiceError> {
        if self.session.read().await.is_authorized() {
            Ok(())
        } else {
            Err(ServiceError::AuthDenied(
                "admin session required".to_string(),
            ))
        }
    }

    /// Full refetch of the directory. Each call takes a fresh generation;
    /// a response that resolves after a newer refresh started is discarded
    /// so a slow fetch cannot overwrite fresher state. The generation bump
    /// and the view writes share the view's write lock, so the holder of
    /// the latest generation always installs its result and the view never
    /// settles in `Loading`.
    async fn refresh(&self) -> Result<(), ServiceError> {
        self.authorize().await?;

        let generation = {
            let mut view = self.view.write().await;
            *view = DirectoryView::Loading;
            self.refresh_generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let fetched = self.api.list_members().await;

        let mut view = self.view.write().await;
        if self.refresh_generation.load(Ordering::SeqCst) != generation {
            return Ok(());
        }

        match fetched {
            Ok(list) => {
                log::debug!("Directory refreshed with {} members.", list.len());
                *view = DirectoryView::Ready(list);
                Ok(())
            }
            Err(e) => {
                log::error!("Directory listing failed, degrading to empty: {}", e);
                *view = DirectoryView::Ready(Vec::new());
                Err(ServiceError::Fetch(e.to_string()))
            }
        }
    }

    async fn snapshot(&self, query: Option<String>) -> Result<DirectoryView, ServiceError> {
        self.authorize().await?;

        let view = self.view.read().await.clone();
        match (view, query) {
            (DirectoryView::Ready(list), Some(query)) => {
                Ok(DirectoryView::Ready(filter_members(&query, &list)))
            }
            (view, _) => Ok(view),
        }
    }

    async fn find_member(&self, id: i64) -> Result<Member, ServiceError> {
        if let DirectoryView::Ready(list) = &*self.view.read().await {
            if let Some(member) = list.iter().find(|m| m.id == id) {
                return Ok(member.clone());
            }
        }

        Err(ServiceError::UnknownRecord(id))
    }

    fn record_state(&self, id: i64) -> RecordState {
        self.records
            .get(&id)
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// Seeds the draft from the cached record, not from the backend;
    /// concurrent edits by another actor are not detected.
    async fn begin_edit(&self, id: i64) -> Result<(), ServiceError> {
        self.authorize().await?;
        let member = self.find_member(id).await?;

        let mut entry = self.records.entry(id).or_default();
        match entry.edit {
            EditState::Saving { .. } => Err(ServiceError::Busy("Save".to_string(), id)),
            _ => {
                entry.edit = EditState::Editing {
                    draft: parse_date(&member.subscription_end_date),
                };
                Ok(())
            }
        }
    }

    async fn update_draft(&self, id: i64, end_date: NaiveDate) -> Result<(), ServiceError> {
        self.authorize().await?;

        let mut entry = self.records.entry(id).or_default();
        match entry.edit {
            EditState::Editing { .. } => {
                entry.edit = EditState::Editing {
                    draft: Some(end_date),
                };
                Ok(())
            }
            EditState::Saving { .. } => Err(ServiceError::Busy("Save".to_string(), id)),
            EditState::Viewing => Err(ServiceError::Validation(
                "record is not being edited".to_string(),
            )),
        }
    }

    async fn cancel_edit(&self, id: i64) -> Result<(), ServiceError> {
        self.authorize().await?;

        let mut entry = self.records.entry(id).or_default();
        match entry.edit {
            EditState::Saving { .. } => Err(ServiceError::Busy("Save".to_string(), id)),
            _ => {
                entry.edit = EditState::Viewing;
                Ok(())
            }
        }
    }

    async fn save(&self, id: i64) -> Result<(), ServiceError> {
        self.authorize().await?;

        let draft = {
            let mut entry = self.records.entry(id).or_default();
            match entry.edit {
                EditState::Editing { draft } => {
                    entry.edit = EditState::Saving { draft };
                    draft
                }
                EditState::Saving { .. } => return Err(ServiceError::Busy("Save".to_string(), id)),
                EditState::Viewing => {
                    return Err(ServiceError::Validation(
                        "record is not being edited".to_string(),
                    ))
                }
            }
        };

        // An unset draft goes out as an empty string, as the reference
        // client sends it.
        let end_date = draft.map(format_date).unwrap_or_default();

        match self.api.update_subscription(id, &end_date).await {
            Ok(updated) => {
                if let Some(mut entry) = self.records.get_mut(&id) {
                    entry.edit = EditState::Viewing;
                }
                log::info!("Extended access for {}.", updated.name);
                let _ = self.refresh().await;
                Ok(())
            }
            Err(e) => {
                // Keep the draft so a retry needs no re-entry.
                if let Some(mut entry) = self.records.get_mut(&id) {
                    entry.edit = EditState::Editing { draft };
                }
                Err(ServiceError::Mutation(
                    "Subscription update".to_string(),
                    e.to_string(),
                ))
            }
        }
    }

    async fn propose_delete(&self, id: i64) -> Result<String, ServiceError> {
        self.authorize().await?;
        let member = self.find_member(id).await?;

        let mut entry = self.records.entry(id).or_default();
        match entry.delete {
            DeleteState::Deleting => Err(ServiceError::Busy("Deletion".to_string(), id)),
            _ => {
                entry.delete = DeleteState::Proposed;
                Ok(member.name)
            }
        }
    }

    async fn cancel_delete(&self, id: i64) -> Result<(), ServiceError> {
        self.authorize().await?;

        let mut entry = self.records.entry(id).or_default();
        match entry.delete {
            DeleteState::Deleting => Err(ServiceError::Busy("Deletion".to_string(), id)),
            _ => {
                entry.delete = DeleteState::Idle;
                Ok(())
            }
        }
    }

    async fn confirm_delete(&self, id: i64) -> Result<(), ServiceError> {
        self.authorize().await?;

        {
            let mut entry = self.records.entry(id).or_default();
            match entry.delete {
                DeleteState::Proposed => entry.delete = DeleteState::Deleting,
                DeleteState::Deleting => {
                    return Err(ServiceError::Busy("Deletion".to_string(), id))
                }
                DeleteState::Idle => {
                    return Err(ServiceError::Validation(
                        "no deletion proposed for this record".to_string(),
                    ))
                }
            }
        }

        match self.api.delete_member(id).await {
            Ok(()) => {
                self.records.remove(&id);
                log::info!("Member {} removed.", id);
                let _ = self.refresh().await;
                Ok(())
            }
            Err(e) => {
                if let Some(mut entry) = self.records.get_mut(&id) {
                    entry.delete = DeleteState::Proposed;
                }
                Err(ServiceError::Mutation(
                    "Member deletion".to_string(),
                    e.to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl RequestHandler<DirectoryRequest> for DirectoryHandler {
    async fn handle_request(&self, request: DirectoryRequest) {
        match request {
            DirectoryRequest::Refresh { response } => {
                let _ = response.send(self.refresh().await);
            }
            DirectoryRequest::Snapshot { query, response } => {
                let _ = response.send(self.snapshot(query).await);
            }
            DirectoryRequest::InspectRecord { id, response } => {
                let _ = response.send(self.record_state(id));
            }
            DirectoryRequest::BeginEdit { id, response } => {
                let _ = response.send(self.begin_edit(id).await);
            }
            DirectoryRequest::UpdateDraft {
                id,
                end_date,
                response,
            } => {
                let _ = response.send(self.update_draft(id, end_date).await);
            }
            DirectoryRequest::CancelEdit { id, response } => {
                let _ = response.send(self.cancel_edit(id).await);
            }
            DirectoryRequest::Save { id, response } => {
                let _ = response.send(self.save(id).await);
            }
            DirectoryRequest::ProposeDelete { id, response } => {
                let _ = response.send(self.propose_delete(id).await);
            }
            DirectoryRequest::CancelDelete { id, response } => {
                let _ = response.send(self.cancel_delete(id).await);
            }
            DirectoryRequest::ConfirmDelete { id, response } => {
                let _ = response.send(self.confirm_delete(id).await);
            }
        }
    }
}

pub struct DirectoryService;

impl DirectoryService {
    pub fn new() -> Self {
        DirectoryService {}
    }
}

#[async_trait]
impl Service<DirectoryRequest, DirectoryHandler> for DirectoryService {}
