use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, RwLock};

use super::directory::DirectoryRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::members::{format_date, Member, MemberDraft, NewMemberRecord};
use crate::models::sessions::AdminSession;
use crate::repositories::gym::GymApi;

pub enum IntakeRequest {
    Submit {
        draft: MemberDraft,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
}

/// Validation happens before any network call; a rejected draft issues zero
/// requests. `is_paid` is forced true and dates serialize to `YYYY-MM-DD`;
/// the optional start date goes out as an empty string when unset, as the
/// reference client sends it.
pub fn compose_record(draft: &MemberDraft) -> Result<NewMemberRecord, ServiceError> {
    if draft.name.trim().is_empty() {
        return Err(ServiceError::Validation("name is required".to_string()));
    }
    if draft.mobile_number.trim().is_empty() {
        return Err(ServiceError::Validation(
            "mobile number is required".to_string(),
        ));
    }
    if draft.location.trim().is_empty() {
        return Err(ServiceError::Validation("location is required".to_string()));
    }

    let (Some(joining), Some(end)) = (draft.joining_date, draft.subscription_end_date) else {
        return Err(ServiceError::Validation(
            "joining and subscription end dates must both be selected".to_string(),
        ));
    };

    Ok(NewMemberRecord {
        name: draft.name.clone(),
        mobile_number: draft.mobile_number.clone(),
        location: draft.location.clone(),
        trainer_name: draft.trainer_name.clone(),
        joining_date: format_date(joining),
        subscription_start_date: draft
            .subscription_start_date
            .map(format_date)
            .unwrap_or_default(),
        subscription_end_date: format_date(end),
        is_paid: true,
    })
}

#[derive(Clone)]
pub struct IntakeRequestHandler {
    api: GymApi,
    session: Arc<RwLock<AdminSession>>,
    directory: mpsc::Sender<DirectoryRequest>,
}

impl IntakeRequestHandler {
    pub fn new(
        api: GymApi,
        session: Arc<RwLock<AdminSession>>,
        directory: mpsc::Sender<DirectoryRequest>,
    ) -> Self {
        Self {
            api,
            session,
            directory,
        }
    }

    async fn submit(&self, draft: &MemberDraft) -> Result<Member, ServiceError> {
        if !self.session.read().await.is_authorized() {
            return Err(ServiceError::AuthDenied(
                "admin session required".to_string(),
            ));
        }

        let record = compose_record(draft)?;

        let created = self.api.create_member(&record).await.map_err(|e| {
            ServiceError::Mutation("Member registration".to_string(), e.to_string())
        })?;

        log::info!("Registered member {} ({}).", created.name, created.id);

        // Invalidate-and-reload: the directory always refetches in full
        // after a mutation.
        let (refresh_tx, _refresh_rx) = oneshot::channel();
        let _ = self
            .directory
            .send(DirectoryRequest::Refresh {
                response: refresh_tx,
            })
            .await;

        Ok(created)
    }
}

#[async_trait]
impl RequestHandler<IntakeRequest> for IntakeRequestHandler {
    async fn handle_request(&self, request: IntakeRequest) {
        match request {
            IntakeRequest::Submit { draft, response } => {
                let result = self.submit(&draft).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct IntakeService;

impl IntakeService {
    pub fn new() -> Self {
        IntakeService {}
    }
}

#[async_trait]
impl Service<IntakeRequest, IntakeRequestHandler> for IntakeService {}
