use crate::api::ApiClient;
use crate::error::ActionError;
use crate::event::{AppEvent, SequenceOrigin};
use crate::session::sequence::SequenceId;
use crate::session::{Epoch, SessionId};
use eframe::egui;
use serde_json::{Map, Value};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, OnceLock};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: mime::Mime,
}

pub trait Backend {
    fn create_session(&self, epoch: Epoch);
    fn fetch_history(&self, epoch: Epoch, session: SessionId);
    fn send_message(&self, epoch: Epoch, session: SessionId, text: String);
    fn enhance_context(&self, epoch: Epoch, session: SessionId);
    fn generate_sequences(&self, epoch: Epoch, session: SessionId, context: Map<String, Value>);
    fn modify_sequences(&self, epoch: Epoch, session: SessionId, instruction: String);
    fn list_sequences(&self, epoch: Epoch, session: SessionId);
    fn update_sequence(&self, epoch: Epoch, id: SequenceId, content: String);
    fn upload_document(&self, document: SelectedDocument);
}

#[derive(Clone)]
pub struct HelixClient {
    api: ApiClient,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
    repaint: Arc<OnceLock<egui::Context>>,
}

impl HelixClient {
    pub fn new(api: ApiClient, tx: mpsc::Sender<AppEvent>, runtime_handle: Handle) -> Self {
        Self {
            api,
            tx,
            runtime_handle,
            repaint: Arc::new(OnceLock::new()),
        }
    }

    pub fn attach_repaint(&self, ctx: egui::Context) {
        let _ = self.repaint.set(ctx);
    }

    fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = AppEvent> + Send + 'static,
    {
        let pending = task(self.api.clone());
        let tx = self.tx.clone();
        let repaint = Arc::clone(&self.repaint);

        self.runtime_handle.spawn(async move {
            let event = pending.await;
            let name = event.name();
            if tx.send(event).is_err() {
                warn!(event = name, "event channel closed, dropping completion");
                return;
            }
            if let Some(ctx) = repaint.get() {
                ctx.request_repaint();
            }
        });
    }
}

impl Backend for HelixClient {
    fn create_session(&self, epoch: Epoch) {
        info!("starting new session");
        self.spawn(move |api| async move {
            AppEvent::SessionCreated {
                epoch,
                result: api.create_session().await,
            }
        });
    }

    fn fetch_history(&self, epoch: Epoch, session: SessionId) {
        self.spawn(move |api| async move {
            AppEvent::HistoryLoaded {
                epoch,
                result: api.history(session).await,
            }
        });
    }

    fn send_message(&self, epoch: Epoch, session: SessionId, text: String) {
        self.spawn(move |api| async move {
            AppEvent::MessageReplied {
                epoch,
                result: api.send_message(session, &text).await,
            }
        });
    }

    fn enhance_context(&self, epoch: Epoch, session: SessionId) {
        self.spawn(move |api| async move {
            AppEvent::ContextEnhanced {
                epoch,
                result: api.enhance_context(session).await,
            }
        });
    }

    fn generate_sequences(&self, epoch: Epoch, session: SessionId, context: Map<String, Value>) {
        self.spawn(move |api| async move {
            AppEvent::SequencesLoaded {
                epoch,
                origin: SequenceOrigin::Generate,
                result: api.generate_sequences(session, &context).await,
            }
        });
    }

    fn modify_sequences(&self, epoch: Epoch, session: SessionId, instruction: String) {
        self.spawn(move |api| async move {
            AppEvent::SequencesLoaded {
                epoch,
                origin: SequenceOrigin::Modify,
                result: api.modify_sequences(session, &instruction).await,
            }
        });
    }

    fn list_sequences(&self, epoch: Epoch, session: SessionId) {
        self.spawn(move |api| async move {
            AppEvent::SequencesLoaded {
                epoch,
                origin: SequenceOrigin::Refresh,
                result: api.list_sequences(session).await,
            }
        });
    }

    fn update_sequence(&self, epoch: Epoch, id: SequenceId, content: String) {
        self.spawn(move |api| async move {
            AppEvent::SequenceSaved {
                epoch,
                id,
                result: api.update_sequence(id, &content).await,
            }
        });
    }

    fn upload_document(&self, document: SelectedDocument) {
        info!(file = %document.file_name, "uploading document");
        self.spawn(move |api| async move {
            let result = match tokio::fs::read(&document.path).await {
                Ok(bytes) => {
                    debug!(file = %document.file_name, bytes = bytes.len(), "read document");
                    api.upload_document(document.file_name, &document.mime, bytes)
                        .await
                        .map_err(ActionError::from)
                }
                Err(source) => Err(ActionError::ReadFile {
                    path: document.path,
                    source,
                }),
            };
            AppEvent::DocumentUploaded(result)
        });
    }
}
