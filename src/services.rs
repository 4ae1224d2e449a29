use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::models::sessions::{AdminSession, MemberSession};
use crate::repositories::gym::GymApi;
use crate::settings::Settings;

pub mod admin;
pub mod directory;
pub mod intake;
pub mod portal;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Access denied: {0}")]
    AuthDenied(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{0} failed: {1}")]
    Mutation(String, String),
    #[error("Directory fetch failed: {0}")]
    Fetch(String),
    #[error("{0} already in flight for member {1}")]
    Busy(String, i64),
    #[error("No member with id {0} in the directory")]
    UnknownRecord(i64),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Handles through which an embedding interface drives the front-end core.
/// One sender per service; every operation is a message carrying its own
/// response channel.
pub struct FrontDesk {
    pub admin: mpsc::Sender<admin::AdminRequest>,
    pub directory: mpsc::Sender<directory::DirectoryRequest>,
    pub intake: mpsc::Sender<intake::IntakeRequest>,
    pub portal: mpsc::Sender<portal::PortalRequest>,
}

pub async fn start_services(settings: Settings) -> Result<FrontDesk, anyhow::Error> {
    let api = GymApi::new(settings.api.base_url);
    let admin_session = Arc::new(RwLock::new(AdminSession::default()));
    let member_session = Arc::new(RwLock::new(MemberSession::default()));

    let (admin_tx, mut admin_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (directory_tx, mut directory_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (intake_tx, mut intake_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (portal_tx, mut portal_rx) = mpsc::channel(CHANNEL_CAPACITY);

    log::info!("Starting admin service.");
    let mut admin_service = admin::AdminService::new();
    let admin_api = api.clone();
    let admin_session_clone = admin_session.clone();
    tokio::spawn(async move {
        admin_service
            .run(
                admin::AdminRequestHandler::new(admin_api, admin_session_clone),
                &mut admin_rx,
            )
            .await;
    });

    log::info!("Starting directory service.");
    let mut directory_service = directory::DirectoryService::new();
    let directory_api = api.clone();
    let directory_session = admin_session.clone();
    tokio::spawn(async move {
        directory_service
            .run(
                directory::DirectoryHandler::new(directory_api, directory_session),
                &mut directory_rx,
            )
            .await;
    });

    log::info!("Starting intake service.");
    let mut intake_service = intake::IntakeService::new();
    let intake_api = api.clone();
    let intake_directory_tx = directory_tx.clone();
    tokio::spawn(async move {
        intake_service
            .run(
                intake::IntakeRequestHandler::new(intake_api, admin_session, intake_directory_tx),
                &mut intake_rx,
            )
            .await;
    });

    log::info!("Starting portal service.");
    let mut portal_service = portal::PortalService::new();
    tokio::spawn(async move {
        portal_service
            .run(
                portal::PortalRequestHandler::new(api, member_session),
                &mut portal_rx,
            )
            .await;
    });

    Ok(FrontDesk {
        admin: admin_tx,
        directory: directory_tx,
        intake: intake_tx,
        portal: portal_tx,
    })
}
