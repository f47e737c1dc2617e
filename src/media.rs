use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Kind of media a handle refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "wav",
        }
    }
}

/// Opaque, revocable reference to media bytes held by a [`MediaLibrary`].
///
/// Handles are cheap to clone and carry no bytes themselves; they stay valid
/// until revoked or until the library is dropped with the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MediaHandle {
    pub id: Uuid,
    pub kind: MediaKind,
    pub byte_len: usize,
}

impl MediaHandle {
    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// Session-local locator, analogous to a browser object URL
    pub fn uri(&self) -> String {
        format!("blob:cinenode/{}", self.id)
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} bytes)", self.uri(), self.mime_type(), self.byte_len)
    }
}

/// Session-scoped store of decoded media
#[derive(Debug, Clone, Default)]
pub struct MediaLibrary {
    entries: Arc<RwLock<HashMap<Uuid, Arc<[u8]>>>>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `bytes` and hand out a handle for them
    pub async fn register(&self, kind: MediaKind, bytes: Vec<u8>) -> MediaHandle {
        let handle = MediaHandle {
            id: Uuid::new_v4(),
            kind,
            byte_len: bytes.len(),
        };

        self.entries
            .write()
            .await
            .insert(handle.id, Arc::from(bytes.into_boxed_slice()));

        debug!("📼 Registered {}", handle);
        handle
    }

    /// Bytes behind a handle, or `None` once it has been revoked
    pub async fn resolve(&self, handle: &MediaHandle) -> Option<Arc<[u8]>> {
        self.entries.read().await.get(&handle.id).cloned()
    }

    pub async fn contains(&self, handle: &MediaHandle) -> bool {
        self.entries.read().await.contains_key(&handle.id)
    }

    /// Release a handle. Returns whether it was still live.
    pub async fn revoke(&self, handle: &MediaHandle) -> bool {
        let removed = self.entries.write().await.remove(&handle.id).is_some();
        if removed {
            debug!("🗑️ Revoked {}", handle.uri());
        }
        removed
    }

    /// Release every handle, returning how many were live
    pub async fn revoke_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Total bytes currently held
    pub async fn total_bytes(&self) -> usize {
        self.entries.read().await.values().map(|b| b.len()).sum()
    }
}
