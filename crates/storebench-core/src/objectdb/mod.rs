//! Embedded transactional object store.
//!
//! Databases are versioned and hold named object stores. Schema changes
//! only happen inside the upgrade step of [`ObjectDbFactory::open`]; all
//! record access goes through a [`Transaction`].

mod transaction;

use std::{
    collections::BTreeSet,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

pub use transaction::{ObjectStore, Request, Transaction, TransactionMode};

const META_FILE: &str = "meta.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Meta {
    version: u32,
    stores: BTreeSet<String>,
}

#[derive(Clone, Debug)]
pub struct ObjectDbFactory {
    root: PathBuf,
    record_quota: Option<usize>,
}

impl ObjectDbFactory {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self, DbError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            record_quota: None,
        })
    }

    /// Caps the number of records each object store may hold. Overwriting
    /// an existing key never counts against the cap.
    pub fn with_record_quota(mut self, records: usize) -> Self {
        self.record_quota = Some(records);
        self
    }

    /// Opens `name` at `version`, creating it if absent.
    ///
    /// `on_upgrade` runs only when the database is new or `version` is
    /// higher than the stored one. If it fails, the stored schema is left
    /// untouched and the open fails.
    pub async fn open<F>(&self, name: &str, version: u32, on_upgrade: F) -> Result<Database, DbError>
    where
        F: FnOnce(&mut UpgradeContext) -> Result<(), DbError>,
    {
        validate_name(name)?;
        if version == 0 {
            return Err(DbError::InvalidVersion);
        }

        let dir = self.root.join(name);
        let meta_path = dir.join(META_FILE);
        let mut meta = match fs::read(&meta_path).await {
            Ok(bytes) => serde_json::from_slice::<Meta>(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Meta::default(),
            Err(err) => return Err(DbError::from(err)),
        };

        if version < meta.version {
            return Err(DbError::Version {
                requested: version,
                current: meta.version,
            });
        }

        if version > meta.version {
            debug!(database = name, from = meta.version, to = version, "upgrade needed");
            let mut upgrade = UpgradeContext {
                old_version: meta.version,
                new_version: version,
                stores: meta.stores.clone(),
            };
            on_upgrade(&mut upgrade)?;

            for store in upgrade.stores.difference(&meta.stores) {
                fs::create_dir_all(dir.join(store)).await?;
            }
            meta = Meta {
                version,
                stores: upgrade.stores,
            };
            fs::create_dir_all(&dir).await?;
            fs::write(&meta_path, serde_json::to_vec(&meta)?).await?;
        }

        Ok(Database {
            name: name.to_string(),
            dir,
            version: meta.version,
            stores: meta.stores,
            record_quota: self.record_quota,
        })
    }

    /// Removes a database with all of its records. Missing databases are
    /// not an error.
    pub async fn delete_database(&self, name: &str) -> Result<(), DbError> {
        validate_name(name)?;
        match fs::remove_dir_all(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DbError::from(err)),
        }
    }
}

/// Schema view handed to the upgrade callback.
#[derive(Debug)]
pub struct UpgradeContext {
    old_version: u32,
    new_version: u32,
    stores: BTreeSet<String>,
}

impl UpgradeContext {
    /// Zero when the database did not exist before this open.
    pub fn old_version(&self) -> u32 {
        self.old_version
    }

    pub fn new_version(&self) -> u32 {
        self.new_version
    }

    pub fn contains(&self, store: &str) -> bool {
        self.stores.contains(store)
    }

    pub fn create_object_store(&mut self, store: &str) -> Result<(), DbError> {
        validate_name(store)?;
        if !self.stores.insert(store.to_string()) {
            return Err(DbError::Constraint(format!("object store `{store}` already exists")));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Database {
    name: String,
    dir: PathBuf,
    version: u32,
    stores: BTreeSet<String>,
    record_quota: Option<usize>,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn object_store_names(&self) -> impl Iterator<Item = &str> {
        self.stores.iter().map(String::as_str)
    }

    /// Starts a transaction scoped to `stores`. Must be called from within
    /// a tokio runtime.
    pub fn transaction(&self, stores: &[&str], mode: TransactionMode) -> Result<Transaction, DbError> {
        let mut scope = BTreeSet::new();
        for store in stores {
            if !self.stores.contains(*store) {
                return Err(DbError::NotFound(format!("object store `{store}`")));
            }
            scope.insert(store.to_string());
        }
        Ok(Transaction::start(self.dir.clone(), scope, mode, self.record_quota))
    }
}

/// Database, store and record names all map to a single path segment.
fn validate_name(name: &str) -> Result<(), DbError> {
    if name.is_empty() {
        return Err(DbError::InvalidKey("key cannot be empty".to_string()));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(segment)), None) if segment == name => Ok(()),
        _ => Err(DbError::InvalidKey(format!(
            "`{name}` must be a single path segment"
        ))),
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("version must be at least 1")]
    InvalidVersion,
    #[error("requested version {requested} is lower than stored version {current}")]
    Version { requested: u32, current: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("quota exceeded: object store already holds {limit} records")]
    QuotaExceeded { limit: usize },
    #[error("transaction is read-only")]
    ReadOnly,
    #[error("transaction is no longer active")]
    TransactionInactive,
    #[error("metadata encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
