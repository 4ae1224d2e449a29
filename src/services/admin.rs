use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{oneshot, RwLock};

use super::{RequestHandler, Service, ServiceError};
use crate::models::sessions::AdminSession;
use crate::repositories::gym::GymApi;

pub enum AdminRequest {
    Login {
        username: String,
        password: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Logout {
        response: oneshot::Sender<()>,
    },
    CheckAccess {
        response: oneshot::Sender<bool>,
    },
}

#[derive(Clone)]
pub struct AdminRequestHandler {
    api: GymApi,
    session: Arc<RwLock<AdminSession>>,
}

impl AdminRequestHandler {
    pub fn new(api: GymApi, session: Arc<RwLock<AdminSession>>) -> Self {
        Self { api, session }
    }

    /// One credential exchange per session. Anything other than a 2xx with
    /// `{ admin: true }` leaves the gate closed.
    async fn login(&self, username: &str, password: &str) -> Result<(), ServiceError> {
        let admitted = self
            .api
            .login_admin(username, password)
            .await
            .map_err(|e| {
                log::warn!("Admin credential exchange failed: {}", e);
                ServiceError::AuthDenied("invalid credentials".to_string())
            })?;

        if !admitted {
            return Err(ServiceError::AuthDenied("invalid credentials".to_string()));
        }

        self.session.write().await.login();
        log::info!("Admin session opened for {}", username);
        Ok(())
    }

    async fn logout(&self) {
        self.session.write().await.logout();
        log::info!("Admin session closed.");
    }

    async fn check_access(&self) -> bool {
        self.session.read().await.is_authorized()
    }
}

#[async_trait]
impl RequestHandler<AdminRequest> for AdminRequestHandler {
    async fn handle_request(&self, request: AdminRequest) {
        match request {
            AdminRequest::Login {
                username,
                password,
                response,
            } => {
                let result = self.login(&username, &password).await;
                let _ = response.send(result);
            }
            AdminRequest::Logout { response } => {
                self.logout().await;
                let _ = response.send(());
            }
            AdminRequest::CheckAccess { response } => {
                let _ = response.send(self.check_access().await);
            }
        }
    }
}

pub struct AdminService;

impl AdminService {
    pub fn new() -> Self {
        AdminService {}
    }
}

#[async_trait]
impl Service<AdminRequest, AdminRequestHandler> for AdminService {}
