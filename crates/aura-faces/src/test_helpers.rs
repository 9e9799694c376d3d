//! Scripted face provider for exercising resolution flows without AWS.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aura_core::models::{FaceDetection, FaceMatch};

use crate::error::{FaceProviderError, FaceProviderResult};
use crate::provider::{FaceProvider, ImageSource};

fn describe(source: &ImageSource) -> String {
    match source {
        ImageSource::Key(key) => key.clone(),
        ImageSource::Bytes(data) => format!("{} bytes", data.len()),
    }
}

#[derive(Default)]
struct StubState {
    detect_results: VecDeque<FaceProviderResult<Vec<FaceDetection>>>,
    search_results: VecDeque<FaceProviderResult<Vec<FaceMatch>>>,
    index_results: VecDeque<FaceProviderResult<Option<String>>>,
    minted: usize,
    detect_calls: Vec<String>,
    search_calls: Vec<String>,
    index_calls: Vec<(String, String)>,
    deleted_keys: Vec<String>,
    ensured_collections: Vec<String>,
}

/// Face provider whose responses are scripted per call.
///
/// Each operation pops the next queued result; when the queue is empty the
/// stub falls back to a benign default (no detections, no match, a freshly
/// minted `stub-face-N` key on indexing). Calls are recorded for assertions.
#[derive(Clone, Default)]
pub struct StubFaceProvider {
    inner: Arc<Mutex<StubState>>,
}

impl StubFaceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_detections(&self, detections: Vec<FaceDetection>) {
        self.inner
            .lock()
            .unwrap()
            .detect_results
            .push_back(Ok(detections));
    }

    pub fn push_detect_error(&self, err: FaceProviderError) {
        self.inner
            .lock()
            .unwrap()
            .detect_results
            .push_back(Err(err));
    }

    /// Script the next search to return a single match.
    pub fn push_match(&self, external_id: &str, similarity: f32) {
        self.inner
            .lock()
            .unwrap()
            .search_results
            .push_back(Ok(vec![FaceMatch {
                external_id: external_id.to_string(),
                similarity,
            }]));
    }

    pub fn push_no_match(&self) {
        self.inner
            .lock()
            .unwrap()
            .search_results
            .push_back(Ok(Vec::new()));
    }

    pub fn push_search_error(&self, err: FaceProviderError) {
        self.inner
            .lock()
            .unwrap()
            .search_results
            .push_back(Err(err));
    }

    pub fn push_indexed(&self, external_key: &str) {
        self.inner
            .lock()
            .unwrap()
            .index_results
            .push_back(Ok(Some(external_key.to_string())));
    }

    /// Script the next indexing attempt to find no indexable face.
    pub fn push_index_skip(&self) {
        self.inner.lock().unwrap().index_results.push_back(Ok(None));
    }

    pub fn push_index_error(&self, err: FaceProviderError) {
        self.inner.lock().unwrap().index_results.push_back(Err(err));
    }

    pub fn detect_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().detect_calls.clone()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().search_calls.clone()
    }

    /// Recorded `(image, external_ref)` pairs passed to `index_face`.
    pub fn index_calls(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().index_calls.clone()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted_keys.clone()
    }

    pub fn ensured_collections(&self) -> Vec<String> {
        self.inner.lock().unwrap().ensured_collections.clone()
    }
}

#[async_trait]
impl FaceProvider for StubFaceProvider {
    async fn detect_faces(&self, image: ImageSource) -> FaceProviderResult<Vec<FaceDetection>> {
        let mut state = self.inner.lock().unwrap();
        state.detect_calls.push(describe(&image));
        state.detect_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn search_faces(
        &self,
        _collection_id: &str,
        image: ImageSource,
        _max_faces: i32,
        _threshold: f32,
    ) -> FaceProviderResult<Vec<FaceMatch>> {
        let mut state = self.inner.lock().unwrap();
        state.search_calls.push(describe(&image));
        state.search_results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn index_face(
        &self,
        _collection_id: &str,
        image: ImageSource,
        external_ref: &str,
    ) -> FaceProviderResult<Option<String>> {
        let mut state = self.inner.lock().unwrap();
        state
            .index_calls
            .push((describe(&image), external_ref.to_string()));
        match state.index_results.pop_front() {
            Some(result) => result,
            None => {
                state.minted += 1;
                Ok(Some(format!("stub-face-{}", state.minted)))
            }
        }
    }

    async fn delete_faces(
        &self,
        _collection_id: &str,
        external_keys: &[String],
    ) -> FaceProviderResult<()> {
        self.inner
            .lock()
            .unwrap()
            .deleted_keys
            .extend(external_keys.iter().cloned());
        Ok(())
    }

    async fn list_faces(&self, _collection_id: &str) -> FaceProviderResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn ensure_collection(&self, collection_id: &str) -> FaceProviderResult<()> {
        self.inner
            .lock()
            .unwrap()
            .ensured_collections
            .push(collection_id.to_string());
        Ok(())
    }
}
