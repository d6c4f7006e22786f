use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

/// Video ids that have already been announced. Lives as long as the process and only grows.
#[derive(Debug, Clone, Default)]
pub struct NotifiedVideos {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl NotifiedVideos {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `video_id`, returning `true` if it had not been seen before.
    ///
    /// The lookup and the insert share one critical section, so two concurrent callers
    /// with the same id cannot both get `true`.
    pub fn insert_if_new(&self, video_id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.contains(video_id) {
            return false;
        }
        ids.insert(video_id.to_string())
    }

    #[must_use]
    pub fn contains(&self, video_id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(video_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
