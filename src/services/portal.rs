use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{oneshot, RwLock};

use super::{RequestHandler, Service, ServiceError};
use crate::models::members::Member;
use crate::models::sessions::MemberSession;
use crate::models::status::{classify_now, StatusSummary};
use crate::repositories::gym::GymApi;

pub enum PortalRequest {
    Login {
        mobile_number: String,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
    Logout {
        response: oneshot::Sender<()>,
    },
    UpdateWeight {
        weight: f64,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
    Snapshot {
        response: oneshot::Sender<PortalSnapshot>,
    },
}

/// What the member-facing view renders: the session member (if any), the
/// transient post-update acknowledgment, and the status block derived from
/// the member's own subscription end date.
#[derive(Clone, Debug)]
pub struct PortalSnapshot {
    pub member: Option<Member>,
    pub just_updated: bool,
    pub status: Option<StatusSummary>,
}

#[derive(Clone)]
pub struct PortalRequestHandler {
    api: GymApi,
    session: Arc<RwLock<MemberSession>>,
}

impl PortalRequestHandler {
    pub fn new(api: GymApi, session: Arc<RwLock<MemberSession>>) -> Self {
        Self { api, session }
    }

    /// The mobile number is the credential, exactly as typed. An unknown
    /// number and a transport failure both read as access denied; the member
    /// is not told which it was.
    async fn login(&self, mobile_number: &str) -> Result<Member, ServiceError> {
        let found = self.api.login_member(mobile_number).await.map_err(|e| {
            log::warn!("Member lookup failed: {}", e);
            ServiceError::AuthDenied("number not found".to_string())
        })?;

        let Some(member) = found else {
            return Err(ServiceError::AuthDenied("number not found".to_string()));
        };

        log::info!("Member session opened for {}.", member.id);
        self.session.write().await.login(member.clone());
        Ok(member)
    }

    async fn logout(&self) {
        self.session.write().await.logout();
        log::info!("Member session closed.");
    }

    /// Sends the raw value; no client-side range check. Success replaces the
    /// cached member and opens the acknowledgment window.
    async fn update_weight(&self, weight: f64) -> Result<Member, ServiceError> {
        let id = {
            let session = self.session.read().await;
            match session.member() {
                Some(member) => member.id,
                None => {
                    return Err(ServiceError::AuthDenied(
                        "no member session".to_string(),
                    ))
                }
            }
        };

        let updated = self
            .api
            .update_weight(id, weight)
            .await
            .map_err(|e| ServiceError::Mutation("Weight update".to_string(), e.to_string()))?;

        // A logout may have landed while the request was in flight; the
        // result must not resurrect the session.
        let mut session = self.session.write().await;
        match session.member() {
            Some(current) if current.id == id => {
                session.replace_member(updated.clone());
                session.mark_updated();
            }
            _ => log::debug!("Member session closed during weight update; result dropped."),
        }
        Ok(updated)
    }

    async fn snapshot(&self) -> PortalSnapshot {
        let session = self.session.read().await;
        let member = session.member().cloned();
        let status = member
            .as_ref()
            .map(|m| classify_now(&m.subscription_end_date));

        PortalSnapshot {
            member,
            just_updated: session.just_updated(),
            status,
        }
    }
}

#[async_trait]
impl RequestHandler<PortalRequest> for PortalRequestHandler {
    async fn handle_request(&self, request: PortalRequest) {
        match request {
            PortalRequest::Login {
                mobile_number,
                response,
            } => {
                let result = self.login(&mobile_number).await;
                let _ = response.send(result);
            }
            PortalRequest::Logout { response } => {
                self.logout().await;
                let _ = response.send(());
            }
            PortalRequest::UpdateWeight { weight, response } => {
                let result = self.update_weight(weight).await;
                let _ = response.send(result);
            }
            PortalRequest::Snapshot { response } => {
                let _ = response.send(self.snapshot().await);
            }
        }
    }
}

pub struct PortalService;

impl PortalService {
    pub fn new() -> Self {
        PortalService {}
    }
}

#[async_trait]
impl Service<PortalRequest, PortalRequestHandler> for PortalService {}
