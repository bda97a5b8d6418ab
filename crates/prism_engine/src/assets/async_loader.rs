//! Asynchronous resource loader
//!
//! A pool of worker threads drains a FIFO of load tasks and runs the
//! CPU-side decoders (OBJ, image, shader source). Decoded payloads queue
//! onto an upload FIFO in the order decoding finished; the main thread
//! drains that FIFO inside a per-frame budget window, performs the GPU
//! upload, installs the finished resource into the [`ResourceManager`] and
//! fires the completion callback. Callbacks therefore run exactly once, on
//! the main thread, in upload order.
//!
//! Cancellation is not supported. A task that has been submitted will reach
//! either `Completed` or `Failed`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use super::obj_loader::{ObjError, ObjLoader};
use super::resource_manager::ResourceManager;
use super::shader_loader::ShaderLoader;
use super::image_loader::ImageData;
use super::{MeshHandle, ResourceKind, ShaderHandle, TextureHandle};
use crate::render::{Mesh, RenderDevice, RenderError, Shader, Texture};

/// Loader errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// CPU-side decode failed
    #[error("Decode error: {0}")]
    Decode(String),
    /// OBJ parse failed
    #[error("OBJ error: {0}")]
    Obj(#[from] ObjError),
    /// GPU upload or program linkage failed
    #[error("Upload error: {0}")]
    Upload(#[from] RenderError),
    /// The loader has been shut down
    #[error("Loader is shut down")]
    ShutDown,
}

/// Lifecycle state of a load task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Queued, no worker has picked it up
    Pending,
    /// A worker is decoding
    Running,
    /// Decoded, waiting for the main-thread upload window
    WaitingUpload,
    /// Uploaded and installed in the resource manager
    Completed,
    /// Decode or upload failed; `error_message` explains why
    Failed,
}

/// Identifier of a submitted load task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Handle to a finished resource, by kind
#[derive(Debug, Clone)]
pub enum LoadedResource {
    /// A decoded and uploaded mesh
    Mesh(MeshHandle),
    /// A decoded and uploaded texture
    Texture(TextureHandle),
    /// A loaded and linked shader
    Shader(ShaderHandle),
}

/// Completion callback: `(state, resource, error_message)`
///
/// `Completed` implies a resource, `Failed` implies an error message.
pub type LoadCallback = Box<dyn FnOnce(LoadState, Option<LoadedResource>, Option<String>) + Send>;

#[derive(Debug)]
struct TaskInner {
    state: LoadState,
    error: Option<String>,
    result: Option<LoadedResource>,
}

/// Shared view of one submitted load task
#[derive(Debug)]
pub struct AsyncTask {
    id: TaskId,
    name: String,
    kind: ResourceKind,
    inner: Mutex<TaskInner>,
}

impl AsyncTask {
    fn new(id: TaskId, name: String, kind: ResourceKind) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            kind,
            inner: Mutex::new(TaskInner {
                state: LoadState::Pending,
                error: None,
                result: None,
            }),
        })
    }

    /// Task id
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Name the resource will be registered under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of resource being loaded
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.inner.lock().unwrap().state
    }

    /// Failure cause, set once the task is `Failed`
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    /// Finished resource, set once the task is `Completed`
    #[must_use]
    pub fn result(&self) -> Option<LoadedResource> {
        self.inner.lock().unwrap().result.clone()
    }

    fn set_running(&self) {
        self.inner.lock().unwrap().state = LoadState::Running;
    }

    fn set_waiting_upload(&self) {
        self.inner.lock().unwrap().state = LoadState::WaitingUpload;
    }

    fn set_failed(&self, error: String) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = LoadState::Failed;
        inner.error = Some(error);
        inner.result = None;
    }

    fn set_completed(&self, resource: LoadedResource) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = LoadState::Completed;
        inner.result = Some(resource);
    }
}

#[derive(Debug)]
enum Request {
    Mesh(PathBuf),
    Texture(PathBuf),
    Shader(PathBuf),
}

enum Payload {
    Mesh(Mesh),
    Texture(Texture),
    Shader(Shader),
}

struct WorkItem {
    task: Arc<AsyncTask>,
    request: Request,
    payload: Option<Payload>,
    // Decode failure reason; the Failed transition itself happens in
    // finish_task so state and callback change together on the main thread.
    failure: Option<String>,
    callback: Option<LoadCallback>,
}

/// Background resource loader with a main-thread upload window
pub struct AsyncResourceLoader {
    resources: Arc<ResourceManager>,
    task_tx: Mutex<Option<Sender<WorkItem>>>,
    upload_rx: Receiver<WorkItem>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: Arc<AtomicBool>,
    next_task_id: AtomicU64,
}

impl AsyncResourceLoader {
    /// Create a loader with an explicit worker count (clamped to at least 1)
    #[must_use]
    pub fn new(resources: Arc<ResourceManager>, worker_threads: usize) -> Self {
        let worker_threads = worker_threads.max(1);
        let (task_tx, task_rx) = unbounded::<WorkItem>();
        let (upload_tx, upload_rx) = unbounded::<WorkItem>();
        let shutting_down = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_threads);
        for index in 0..worker_threads {
            let task_rx = task_rx.clone();
            let upload_tx = upload_tx.clone();
            let shutting_down = Arc::clone(&shutting_down);
            let worker = std::thread::Builder::new()
                .name(format!("asset-loader-{index}"))
                .spawn(move || worker_loop(&task_rx, &upload_tx, &shutting_down));
            match worker {
                Ok(handle) => workers.push(handle),
                Err(err) => log::error!("Failed to spawn loader worker {}: {}", index, err),
            }
        }
        log::info!("Async resource loader started with {} workers", workers.len());

        Self {
            resources,
            task_tx: Mutex::new(Some(task_tx)),
            upload_rx,
            workers: Mutex::new(workers),
            shutting_down,
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Create a loader sized to the machine's available parallelism
    #[must_use]
    pub fn with_default_workers(resources: Arc<ResourceManager>) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self::new(resources, workers)
    }

    /// The manager finished resources are installed into
    #[must_use]
    pub fn resources(&self) -> &Arc<ResourceManager> {
        &self.resources
    }

    /// Whether shutdown has begun
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Number of decoded tasks waiting for the upload window
    #[must_use]
    pub fn pending_uploads(&self) -> usize {
        self.upload_rx.len()
    }

    /// Queue a background OBJ mesh load
    ///
    /// # Errors
    /// Returns [`LoadError::ShutDown`] after shutdown has begun.
    pub fn load_mesh_async<F>(
        &self,
        path: impl Into<PathBuf>,
        name: &str,
        callback: F,
    ) -> Result<Arc<AsyncTask>, LoadError>
    where
        F: FnOnce(LoadState, Option<LoadedResource>, Option<String>) + Send + 'static,
    {
        self.submit(Request::Mesh(path.into()), name, ResourceKind::Mesh, callback)
    }

    /// Queue a background image texture load
    ///
    /// # Errors
    /// Returns [`LoadError::ShutDown`] after shutdown has begun.
    pub fn load_texture_async<F>(
        &self,
        path: impl Into<PathBuf>,
        name: &str,
        callback: F,
    ) -> Result<Arc<AsyncTask>, LoadError>
    where
        F: FnOnce(LoadState, Option<LoadedResource>, Option<String>) + Send + 'static,
    {
        self.submit(
            Request::Texture(path.into()),
            name,
            ResourceKind::Texture,
            callback,
        )
    }

    /// Queue a background shader source load from `<stem>.vert`/`<stem>.frag`
    ///
    /// # Errors
    /// Returns [`LoadError::ShutDown`] after shutdown has begun.
    pub fn load_shader_async<F>(
        &self,
        stem: impl Into<PathBuf>,
        name: &str,
        callback: F,
    ) -> Result<Arc<AsyncTask>, LoadError>
    where
        F: FnOnce(LoadState, Option<LoadedResource>, Option<String>) + Send + 'static,
    {
        self.submit(
            Request::Shader(stem.into()),
            name,
            ResourceKind::Shader,
            callback,
        )
    }

    fn submit<F>(
        &self,
        request: Request,
        name: &str,
        kind: ResourceKind,
        callback: F,
    ) -> Result<Arc<AsyncTask>, LoadError>
    where
        F: FnOnce(LoadState, Option<LoadedResource>, Option<String>) + Send + 'static,
    {
        let sender = self.task_tx.lock().unwrap();
        let Some(sender) = sender.as_ref() else {
            return Err(LoadError::ShutDown);
        };
        let id = TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed));
        let task = AsyncTask::new(id, name.to_string(), kind);
        log::debug!("Queued {} load '{}' ({:?})", kind, name, request);
        let item = WorkItem {
            task: Arc::clone(&task),
            request,
            payload: None,
            failure: None,
            callback: Some(Box::new(callback)),
        };
        sender.send(item).map_err(|_| LoadError::ShutDown)?;
        Ok(task)
    }

    /// Drain the upload FIFO on the main thread
    ///
    /// Processes up to `budget` tasks (`None` means all currently queued):
    /// uploads decoded payloads to the device, installs the finished
    /// resource under the task's requested name, and fires the completion
    /// callback exactly once. A `WaitingUpload` task without a payload is a
    /// defect; it is converted to `Failed` and logged as an error.
    ///
    /// Returns the number of tasks processed.
    pub fn process_completed_tasks(
        &self,
        device: &mut dyn RenderDevice,
        budget: Option<usize>,
    ) -> usize {
        let mut processed = 0;
        while budget.map_or(true, |limit| processed < limit) {
            let Ok(mut item) = self.upload_rx.try_recv() else {
                break;
            };
            self.finish_task(device, &mut item);
            processed += 1;
        }
        processed
    }

    fn finish_task(&self, device: &mut dyn RenderDevice, item: &mut WorkItem) {
        let task = Arc::clone(&item.task);
        let state = task.state();
        if let Some(reason) = item.failure.take() {
            task.set_failed(reason);
        } else if state == LoadState::WaitingUpload {
            match item.payload.take() {
                Some(payload) => match self.upload(device, &task.name, payload) {
                    Ok(resource) => task.set_completed(resource),
                    Err(err) => {
                        log::error!("Upload of '{}' failed: {}", task.name, err);
                        task.set_failed(err.to_string());
                    }
                },
                // Completed-without-payload is a defect in the decode path.
                None => {
                    log::error!(
                        "Task '{}' reached the upload window with no payload",
                        task.name
                    );
                    task.set_failed("decoded payload missing".to_string());
                }
            }
        }

        if let Some(callback) = item.callback.take() {
            let inner = task.inner.lock().unwrap();
            let (state, result, error) = (inner.state, inner.result.clone(), inner.error.clone());
            drop(inner);
            callback(state, result, error);
        }
    }

    fn upload(
        &self,
        device: &mut dyn RenderDevice,
        name: &str,
        payload: Payload,
    ) -> Result<LoadedResource, LoadError> {
        match payload {
            Payload::Mesh(mut mesh) => {
                mesh.upload(device)?;
                Ok(LoadedResource::Mesh(self.resources.register_mesh(name, mesh)))
            }
            Payload::Texture(mut texture) => {
                texture.upload(device)?;
                Ok(LoadedResource::Texture(
                    self.resources.register_texture(name, texture),
                ))
            }
            Payload::Shader(mut shader) => {
                shader.upload(device)?;
                Ok(LoadedResource::Shader(
                    self.resources.register_shader(name, shader),
                ))
            }
        }
    }

    /// Stop the loader
    ///
    /// Workers finish their current task; queued tasks that were never
    /// picked up are failed rather than decoded. One final unbudgeted pass
    /// over the upload FIFO runs so every callback observes `Completed` or
    /// `Failed`. Calling `shutdown` again is a no-op.
    pub fn shutdown(&self, device: &mut dyn RenderDevice) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("Shutting down async resource loader");
        // Dropping the sender ends the worker receive loops once the queue
        // drains.
        drop(self.task_tx.lock().unwrap().take());
        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for worker in workers {
            if worker.join().is_err() {
                log::error!("Loader worker panicked during shutdown");
            }
        }
        let processed = self.process_completed_tasks(device, None);
        log::debug!("Loader shutdown flushed {} tasks", processed);
    }
}

impl Drop for AsyncResourceLoader {
    fn drop(&mut self) {
        // Without a device no uploads can run; just stop the workers.
        self.shutting_down.store(true, Ordering::Release);
        drop(self.task_tx.lock().unwrap().take());
        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for worker in workers {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    task_rx: &Receiver<WorkItem>,
    upload_tx: &Sender<WorkItem>,
    shutting_down: &AtomicBool,
) {
    while let Ok(mut item) = task_rx.recv() {
        if shutting_down.load(Ordering::Acquire) {
            item.failure = Some("loader shutting down".to_string());
        } else {
            item.task.set_running();
            match decode(&item.request) {
                Ok(payload) => {
                    item.payload = Some(payload);
                    item.task.set_waiting_upload();
                }
                Err(err) => {
                    log::warn!("Decode of '{}' failed: {}", item.task.name(), err);
                    item.failure = Some(err.to_string());
                }
            }
        }
        // Receiver outlives the workers; a send failure means the loader
        // itself is gone.
        if upload_tx.send(item).is_err() {
            break;
        }
    }
}

fn decode(request: &Request) -> Result<Payload, LoadError> {
    match request {
        Request::Mesh(path) => Ok(Payload::Mesh(ObjLoader::load_obj(path)?)),
        Request::Texture(path) => Ok(Payload::Texture(
            ImageData::from_file(path)?.into_texture()?,
        )),
        Request::Shader(stem) => Ok(Payload::Shader(ShaderLoader::load_sources(stem)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessDevice;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn drive(loader: &AsyncResourceLoader, device: &mut HeadlessDevice, want: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut processed = 0;
        while processed < want && Instant::now() < deadline {
            processed += loader.process_completed_tasks(device, None);
            std::thread::sleep(Duration::from_millis(5));
        }
        processed
    }

    #[test]
    fn missing_file_fails_with_message_and_single_callback() {
        let resources = Arc::new(ResourceManager::new());
        let loader = AsyncResourceLoader::new(Arc::clone(&resources), 1);
        let mut device = HeadlessDevice::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = Arc::clone(&calls);
        let task = loader
            .load_mesh_async("missing/ship.obj", "ship", move |state, resource, error| {
                calls_in_cb.fetch_add(1, Ordering::SeqCst);
                assert_eq!(state, LoadState::Failed);
                assert!(resource.is_none());
                assert!(!error.unwrap().is_empty());
            })
            .unwrap();

        assert_eq!(drive(&loader, &mut device, 1), 1);
        assert_eq!(task.state(), LoadState::Failed);
        assert!(task.result().is_none());
        assert!(task.error_message().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(resources.get_mesh("ship").is_none());
        loader.shutdown(&mut device);
    }

    #[test]
    fn failed_state_is_not_observable_before_its_callback() {
        let resources = Arc::new(ResourceManager::new());
        let loader = AsyncResourceLoader::new(Arc::clone(&resources), 1);
        let mut device = HeadlessDevice::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = Arc::clone(&calls);
        let task = loader
            .load_mesh_async("missing/rock.obj", "rock", move |_, _, _| {
                calls_in_cb.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // The worker parks the failed item in the upload FIFO; the terminal
        // transition and the callback both belong to the drain below.
        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.pending_uploads() == 0 {
            assert!(Instant::now() < deadline, "worker never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_ne!(task.state(), LoadState::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(loader.process_completed_tasks(&mut device, None), 1);
        assert_eq!(task.state(), LoadState::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        loader.shutdown(&mut device);
    }

    #[test]
    fn mesh_load_completes_and_registers() {
        let dir = std::env::temp_dir().join("prism_loader_mesh_ok");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tri.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let resources = Arc::new(ResourceManager::new());
        let loader = AsyncResourceLoader::new(Arc::clone(&resources), 2);
        let mut device = HeadlessDevice::new();

        let task = loader
            .load_mesh_async(&path, "tri", |state, resource, error| {
                assert_eq!(state, LoadState::Completed);
                assert!(matches!(resource, Some(LoadedResource::Mesh(_))));
                assert!(error.is_none());
            })
            .unwrap();

        assert_eq!(drive(&loader, &mut device, 1), 1);
        assert_eq!(task.state(), LoadState::Completed);
        let mesh = resources.get_mesh("tri").unwrap();
        assert!(mesh.read().unwrap().is_uploaded());
        assert_eq!(device.live_mesh_buffers, 1);

        loader.shutdown(&mut device);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn shader_load_links_program() {
        let dir = std::env::temp_dir().join("prism_loader_shader_ok");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("lit.vert"), "void main() {}").unwrap();
        fs::write(dir.join("lit.frag"), "void main() {}").unwrap();

        let resources = Arc::new(ResourceManager::new());
        let loader = AsyncResourceLoader::new(Arc::clone(&resources), 1);
        let mut device = HeadlessDevice::new();

        loader
            .load_shader_async(dir.join("lit"), "lit", |state, _, _| {
                assert_eq!(state, LoadState::Completed);
            })
            .unwrap();
        assert_eq!(drive(&loader, &mut device, 1), 1);
        let shader = resources.get_shader("lit").unwrap();
        assert!(shader.read().unwrap().is_uploaded());
        assert_eq!(device.live_programs, 1);

        loader.shutdown(&mut device);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn budget_limits_tasks_per_window() {
        let resources = Arc::new(ResourceManager::new());
        let loader = AsyncResourceLoader::new(Arc::clone(&resources), 2);
        let mut device = HeadlessDevice::new();

        for i in 0..3 {
            loader
                .load_texture_async(format!("missing_{i}.png"), &format!("t{i}"), |_, _, _| {})
                .unwrap();
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.pending_uploads() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(loader.pending_uploads(), 3);
        assert_eq!(loader.process_completed_tasks(&mut device, Some(2)), 2);
        assert_eq!(loader.process_completed_tasks(&mut device, Some(2)), 1);
        loader.shutdown(&mut device);
    }

    #[test]
    fn shutdown_is_reentrant_and_rejects_new_work() {
        let resources = Arc::new(ResourceManager::new());
        let loader = AsyncResourceLoader::new(resources, 1);
        let mut device = HeadlessDevice::new();

        loader.shutdown(&mut device);
        loader.shutdown(&mut device);
        assert!(loader.is_shut_down());
        assert!(matches!(
            loader.load_mesh_async("a.obj", "a", |_, _, _| {}),
            Err(LoadError::ShutDown)
        ));
    }
}
