//! Single-worker request queue for asynchronous clients.
//!
//! Tasks are executed strictly in submission order on one dedicated thread.
//! Each completion callback runs on that thread right after its exchange, while
//! the engine's exclusive lock is still held, so callbacks never overlap with
//! each other or with a synchronous call on the same client.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::client::connection::Engine;
use crate::error::{HttpError, Result};
use crate::types::{HttpRequest, ResponseCallback};

struct Task {
    request: HttpRequest,
    callback: ResponseCallback,
}

#[derive(Default)]
struct Queue {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    ready: Condvar,
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl Dispatcher {
    /// Start the worker thread.
    pub(crate) fn start(engine: Arc<Engine>) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let queue = shared.clone();
        let worker = thread::Builder::new()
            .name("strand-http-worker".to_string())
            .spawn(move || run(&engine, &queue))?;

        Ok(Dispatcher {
            shared,
            worker_id: worker.thread().id(),
            worker: Some(worker),
        })
    }

    /// Queue `request`; `callback` receives its response on the worker thread.
    pub(crate) fn submit(&self, request: HttpRequest, callback: ResponseCallback) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        if queue.shutdown {
            return Err(HttpError::ShuttingDown);
        }
        queue.tasks.push_back(Task { request, callback });
        debug!(queued = queue.tasks.len(), "request queued");
        drop(queue);

        self.shared.ready.notify_one();
        Ok(())
    }

    /// Number of tasks waiting to be dequeued.
    pub(crate) fn pending(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }

    /// Stop accepting work and drop queued tasks. The task in flight, if any,
    /// still completes.
    pub(crate) fn close(&self) {
        let dropped = {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
            std::mem::take(&mut queue.tasks)
        };
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "discarding queued requests");
        }
        drop(dropped);
        self.shared.ready.notify_all();
    }

    /// [`close`](Self::close), then wait for the worker.
    pub(crate) fn shutdown(&mut self) {
        self.close();
        if let Some(worker) = self.worker.take() {
            // The last client handle can be released from inside a callback.
            if thread::current().id() == self.worker_id {
                return;
            }
            if worker.join().is_err() {
                warn!("request worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(engine: &Engine, shared: &Shared) {
    debug!("request worker started");
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            while queue.tasks.is_empty() && !queue.shutdown {
                shared.ready.wait(&mut queue);
            }
            match queue.tasks.pop_front() {
                Some(task) => task,
                None => break,
            }
        };

        let _exclusive = engine.exclusive();
        let response = engine.execute(&task.request);
        let callback = task.callback;
        if panic::catch_unwind(AssertUnwindSafe(move || callback(response))).is_err() {
            warn!(url = %task.request.url, "response callback panicked");
        }
    }
    debug!("request worker stopped");
}
