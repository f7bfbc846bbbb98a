use std::{
    collections::BTreeSet,
    future::Future,
    io::ErrorKind,
    path::PathBuf,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use tokio::{
    fs,
    sync::{mpsc, oneshot},
};

use super::{DbError, validate_name};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// Pending result of a single store operation.
///
/// Resolves once the worker reports success or failure for it. A request
/// whose transaction went away before it ran resolves to
/// [`DbError::TransactionInactive`].
#[derive(Debug)]
#[must_use = "requests still run when dropped, but their outcome is lost"]
pub struct Request<T> {
    done: oneshot::Receiver<Result<T, DbError>>,
}

impl<T> Request<T> {
    fn failed(err: DbError) -> Self {
        let (tx, done) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { done }
    }
}

impl<T> Future for Request<T> {
    type Output = Result<T, DbError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.done).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(DbError::TransactionInactive)),
            Poll::Pending => Poll::Pending,
        }
    }
}

type Completion<T> = oneshot::Sender<Result<T, DbError>>;

enum Op {
    Put {
        store: String,
        key: String,
        value: String,
        done: Completion<()>,
    },
    Get {
        store: String,
        key: String,
        done: Completion<Option<String>>,
    },
    Clear {
        store: String,
        done: Completion<()>,
    },
    Count {
        store: String,
        done: Completion<usize>,
    },
    Commit {
        done: Completion<()>,
    },
}

#[derive(Debug)]
struct Shared {
    scope: BTreeSet<String>,
    mode: TransactionMode,
    active: AtomicBool,
    ops: mpsc::UnboundedSender<Op>,
}

impl Shared {
    fn issue<T>(&self, op: impl FnOnce(Completion<T>) -> Op) -> Request<T> {
        if !self.active.load(Ordering::Acquire) {
            return Request::failed(DbError::TransactionInactive);
        }
        let (tx, done) = oneshot::channel();
        // A closed queue drops `tx`, which the request reports as inactive.
        let _ = self.ops.send(op(tx));
        Request { done }
    }
}

/// Requests issued through a transaction run one at a time, in issue
/// order, on a dedicated worker task.
#[derive(Debug)]
pub struct Transaction {
    shared: Arc<Shared>,
}

impl Transaction {
    pub(super) fn start(
        dir: PathBuf,
        scope: BTreeSet<String>,
        mode: TransactionMode,
        record_quota: Option<usize>,
    ) -> Self {
        let (ops, queue) = mpsc::unbounded_channel();
        tokio::spawn(drive(dir, queue, record_quota));
        Self {
            shared: Arc::new(Shared {
                scope,
                mode,
                active: AtomicBool::new(true),
                ops,
            }),
        }
    }

    pub fn mode(&self) -> TransactionMode {
        self.shared.mode
    }

    pub fn object_store(&self, name: &str) -> Result<ObjectStore, DbError> {
        if !self.shared.scope.contains(name) {
            return Err(DbError::NotFound(format!(
                "object store `{name}` is not in this transaction's scope"
            )));
        }
        Ok(ObjectStore {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }

    /// Resolves after every request issued before it has completed. Later
    /// requests fail with [`DbError::TransactionInactive`].
    pub fn commit(&self) -> Request<()> {
        if !self.shared.active.swap(false, Ordering::AcqRel) {
            return Request::failed(DbError::TransactionInactive);
        }
        let (tx, done) = oneshot::channel();
        let _ = self.shared.ops.send(Op::Commit { done: tx });
        Request { done }
    }
}

#[derive(Clone, Debug)]
pub struct ObjectStore {
    name: String,
    shared: Arc<Shared>,
}

impl ObjectStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put(&self, key: &str, value: &str) -> Request<()> {
        if let Err(err) = self.writable().and_then(|()| validate_name(key)) {
            return Request::failed(err);
        }
        self.shared.issue(|done| Op::Put {
            store: self.name.clone(),
            key: key.to_string(),
            value: value.to_string(),
            done,
        })
    }

    pub fn get(&self, key: &str) -> Request<Option<String>> {
        if let Err(err) = validate_name(key) {
            return Request::failed(err);
        }
        self.shared.issue(|done| Op::Get {
            store: self.name.clone(),
            key: key.to_string(),
            done,
        })
    }

    pub fn clear(&self) -> Request<()> {
        if let Err(err) = self.writable() {
            return Request::failed(err);
        }
        self.shared.issue(|done| Op::Clear {
            store: self.name.clone(),
            done,
        })
    }

    pub fn count(&self) -> Request<usize> {
        self.shared.issue(|done| Op::Count {
            store: self.name.clone(),
            done,
        })
    }

    fn writable(&self) -> Result<(), DbError> {
        match self.shared.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(DbError::ReadOnly),
        }
    }
}

async fn drive(dir: PathBuf, mut queue: mpsc::UnboundedReceiver<Op>, record_quota: Option<usize>) {
    while let Some(op) = queue.recv().await {
        match op {
            Op::Put {
                store,
                key,
                value,
                done,
            } => {
                let _ = done.send(put_record(dir.join(store), &key, &value, record_quota).await);
            }
            Op::Get { store, key, done } => {
                let path = dir.join(store).join(key);
                let outcome = match fs::read_to_string(path).await {
                    Ok(value) => Ok(Some(value)),
                    Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                    Err(err) => Err(DbError::from(err)),
                };
                let _ = done.send(outcome);
            }
            Op::Clear { store, done } => {
                let _ = done.send(clear_store(dir.join(store)).await);
            }
            Op::Count { store, done } => {
                let _ = done.send(count_records(dir.join(store)).await);
            }
            Op::Commit { done } => {
                let _ = done.send(Ok(()));
                break;
            }
        }
    }
}

async fn put_record(
    store_dir: PathBuf,
    key: &str,
    value: &str,
    record_quota: Option<usize>,
) -> Result<(), DbError> {
    let path = store_dir.join(key);
    if let Some(limit) = record_quota {
        if !fs::try_exists(&path).await? && count_records(store_dir).await? >= limit {
            return Err(DbError::QuotaExceeded { limit });
        }
    }
    fs::write(path, value).await?;
    Ok(())
}

async fn clear_store(path: PathBuf) -> Result<(), DbError> {
    match fs::remove_dir_all(&path).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(DbError::from(err)),
    }
    fs::create_dir_all(&path).await?;
    Ok(())
}

async fn count_records(path: PathBuf) -> Result<usize, DbError> {
    let mut entries = fs::read_dir(path).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}
