use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use goodtime_core::{models::Session, storage::SessionStorage, Result as CoreResult};

use crate::repository::SessionRepository;

#[derive(Debug, thiserror::Error)]
pub enum SessionManagerError {
    #[error("Session not found: {0}")]
    NotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] goodtime_core::Error),

    #[error("Task join error: {0}")]
    JoinError(String),
}

pub type Result<T> = std::result::Result<T, SessionManagerError>;

impl From<SessionManagerError> for goodtime_core::Error {
    fn from(error: SessionManagerError) -> Self {
        match error {
            SessionManagerError::NotFound(id) => {
                goodtime_core::Error::NotFound(format!("session {}", id))
            }
            SessionManagerError::Storage(e) => e,
            SessionManagerError::JoinError(msg) => {
                goodtime_core::Error::Io(std::io::Error::other(msg))
            }
        }
    }
}

/// Session history backed by `sessions.csv`
pub struct SessionManager {
    data_dir: PathBuf,
    cache: Arc<RwLock<Vec<Session>>>,
}

impl SessionManager {
    pub fn new(data_dir: PathBuf) -> CoreResult<Self> {
        let sessions = SessionStorage::new(data_dir.clone()).load()?;
        tracing::info!("Loaded {} sessions", sessions.len());

        Ok(Self {
            data_dir,
            cache: Arc::new(RwLock::new(sessions)),
        })
    }

    pub async fn get_all(&self) -> Vec<Session> {
        self.cache.read().await.clone()
    }

    /// Append a session and return it with its assigned id
    pub async fn add(&self, mut session: Session) -> Result<Session> {
        let mut cache = self.cache.write().await;
        session.id = SessionStorage::next_id(&cache);

        let data_dir = self.data_dir.clone();
        let to_append = session.clone();
        tokio::task::spawn_blocking(move || SessionStorage::new(data_dir).append(&to_append))
            .await
            .map_err(|e| SessionManagerError::JoinError(e.to_string()))??;

        cache.push(session.clone());
        Ok(session)
    }

    /// Replace the stored session `id`. Notes already attached survive a replacement without notes.
    pub async fn update(&self, id: i64, mut session: Session) -> Result<Session> {
        let mut cache = self.cache.write().await;
        let mut sessions = cache.clone();
        let existing = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionManagerError::NotFound(id))?;

        session.id = id;
        if session.notes.is_none() {
            session.notes = existing.notes.take();
        }
        *existing = session.clone();

        self.rewrite(&sessions).await?;
        *cache = sessions;
        Ok(session)
    }

    pub async fn update_notes(&self, id: i64, notes: String) -> Result<Session> {
        let mut cache = self.cache.write().await;
        let mut sessions = cache.clone();
        let existing = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionManagerError::NotFound(id))?;

        existing.notes = if notes.is_empty() { None } else { Some(notes) };
        let updated = existing.clone();

        self.rewrite(&sessions).await?;
        *cache = sessions;
        Ok(updated)
    }

    async fn rewrite(&self, sessions: &[Session]) -> Result<()> {
        let data_dir = self.data_dir.clone();
        let to_save = sessions.to_vec();

        tokio::task::spawn_blocking(move || SessionStorage::new(data_dir).save_all(&to_save))
            .await
            .map_err(|e| SessionManagerError::JoinError(e.to_string()))??;
        Ok(())
    }
}

impl SessionRepository for SessionManager {
    fn insert_session(&self, session: Session) -> BoxFuture<'_, CoreResult<i64>> {
        Box::pin(async move {
            let session = self.add(session).await?;
            Ok(session.id)
        })
    }

    fn update_session(&self, id: i64, session: Session) -> BoxFuture<'_, CoreResult<()>> {
        Box::pin(async move {
            self.update(id, session).await?;
            Ok(())
        })
    }

    fn update_session_notes(&self, id: i64, notes: String) -> BoxFuture<'_, CoreResult<()>> {
        Box::pin(async move {
            self.update_notes(id, notes).await?;
            Ok(())
        })
    }
}
