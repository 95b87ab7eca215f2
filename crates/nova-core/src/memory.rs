//! Memory panel: the profile name and facts the backend has extracted.

use crate::api::Backend;
use crate::display::{DisplaySink, MemoryView};

/// Fetches the global memory and renders it. On failure the panel keeps
/// whatever it showed before.
pub async fn load_memory(backend: &dyn Backend, sink: &dyn DisplaySink) -> bool {
    match backend.fetch_memory().await {
        Ok(memory) => {
            let view = MemoryView::from(memory);
            tracing::debug!(facts = view.facts.len(), "Loaded memory");
            sink.set_memory(view);
            true
        }
        Err(e) => {
            tracing::error!("Failed to load memory: {}", e);
            false
        }
    }
}

/// Stores the user's name on the backend, then refreshes the panel.
pub async fn set_profile_name(backend: &dyn Backend, sink: &dyn DisplaySink, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }

    if let Err(e) = backend.set_profile_name(name).await {
        tracing::error!("Failed to set profile name: {}", e);
        return false;
    }
    load_memory(backend, sink).await
}
