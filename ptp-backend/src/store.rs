//! Pump persistence.
//!
//! `PumpStore` is a cheap, cloneable handle over either an in-memory map (tests
//! and throwaway deployments) or a sled database. The sled layout is two
//! trees:
//!
//! - `pumps`: big-endian creation sequence -> JSON encoded [`Pump`]
//! - `pump_ids`: pump UUID bytes -> sequence key
//!
//! Keying records by sequence keeps sled's natural iteration order equal to
//! creation order, so listing newest-first is a reverse scan.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use ptp_common::{Address, NewPump, Pump, PumpError};
use sled::{
    transaction::{ConflictableTransactionResult, TransactionError},
    Db, Transactional, Tree,
};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const PUMPS_TREE: &str = "pumps";
const PUMP_IDS_TREE: &str = "pump_ids";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Pump(#[from] PumpError),

    #[error("pump db error: {0}")]
    Db(#[from] sled::Error),

    #[error("failed to encode or decode pump record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("failed to prepare pump db at {path}: {message}")]
    Open { path: String, message: String },

    #[error("pump store lock poisoned")]
    Poisoned,
}

#[derive(Clone)]
pub struct PumpStore {
    backend: Arc<PumpBackend>,
}

enum PumpBackend {
    InMemory(Mutex<MemoryPumps>),
    Persistent(PersistentPumps),
}

#[derive(Default)]
struct MemoryPumps {
    order: Vec<Uuid>,
    pumps: HashMap<Uuid, Pump>,
}

struct PersistentPumps {
    db: Db,
    pumps: Tree,
    ids: Tree,
}

impl PumpStore {
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(PumpBackend::InMemory(Mutex::new(MemoryPumps::default()))),
        }
    }

    pub fn persistent(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| StoreError::Open {
                    path: path_ref.display().to_string(),
                    message: err.to_string(),
                })?;
            }
        }

        let db = sled::open(path_ref)?;
        let pumps = db.open_tree(PUMPS_TREE)?;
        let ids = db.open_tree(PUMP_IDS_TREE)?;
        info!(path = %path_ref.display(), records = pumps.len(), "opened pump db");

        Ok(Self {
            backend: Arc::new(PumpBackend::Persistent(PersistentPumps { db, pumps, ids })),
        })
    }

    pub fn kind(&self) -> &'static str {
        match &*self.backend {
            PumpBackend::InMemory(_) => "memory",
            PumpBackend::Persistent(_) => "sled",
        }
    }

    /// All pumps, newest first.
    pub fn list(&self) -> Result<Vec<Pump>, StoreError> {
        match &*self.backend {
            PumpBackend::InMemory(store) => {
                let guard = store.lock().map_err(|_| StoreError::Poisoned)?;
                Ok(guard
                    .order
                    .iter()
                    .rev()
                    .filter_map(|id| guard.pumps.get(id).cloned())
                    .collect())
            }
            PumpBackend::Persistent(store) => store
                .pumps
                .iter()
                .rev()
                .map(|entry| {
                    let (_, bytes) = entry?;
                    decode(&bytes)
                })
                .collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> Result<Pump, StoreError> {
        match &*self.backend {
            PumpBackend::InMemory(store) => {
                let guard = store.lock().map_err(|_| StoreError::Poisoned)?;
                guard
                    .pumps
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| PumpError::NotFound(id).into())
            }
            PumpBackend::Persistent(store) => {
                let key = store.sequence_key(id)?;
                let bytes = store.pumps.get(&key)?.ok_or(PumpError::NotFound(id))?;
                decode(&bytes)
            }
        }
    }

    /// Persist a validated pump definition, assigning its id and timestamp.
    pub fn create(&self, new: NewPump) -> Result<Pump, StoreError> {
        let pump = Pump::create(new);

        match &*self.backend {
            PumpBackend::InMemory(store) => {
                let mut guard = store.lock().map_err(|_| StoreError::Poisoned)?;
                guard.order.push(pump.id);
                guard.pumps.insert(pump.id, pump.clone());
            }
            PumpBackend::Persistent(store) => {
                let key = store.db.generate_id()?.to_be_bytes();
                let bytes = serde_json::to_vec(&pump)?;
                (&store.pumps, &store.ids)
                    .transaction(|(pumps, ids)| -> ConflictableTransactionResult<(), ()> {
                        pumps.insert(&key[..], bytes.as_slice())?;
                        ids.insert(&pump.id.as_bytes()[..], &key[..])?;
                        Ok(())
                    })
                    .map_err(|err| match err {
                        TransactionError::Storage(err) => StoreError::Db(err),
                        TransactionError::Abort(()) => StoreError::Db(sled::Error::Unsupported(
                            "pump insert aborted".into(),
                        )),
                    })?;
                store.db.flush()?;
            }
        }

        info!(pump_id = %pump.id, name = %pump.name, required_eth = %pump.required_eth, "created pump");
        Ok(pump)
    }

    /// Add `address` to the pump's participants. Adding an existing
    /// participant returns the pump unchanged.
    ///
    /// The read-modify-write is atomic per pump: the memory backend holds the
    /// lock across it and the sled backend retries a compare-and-swap, so
    /// concurrent writers can never duplicate an address.
    pub fn add_participant(&self, id: Uuid, address: Address) -> Result<Pump, StoreError> {
        match &*self.backend {
            PumpBackend::InMemory(store) => {
                let mut guard = store.lock().map_err(|_| StoreError::Poisoned)?;
                let pump = guard.pumps.get_mut(&id).ok_or(PumpError::NotFound(id))?;
                if pump.add_participant(address) {
                    debug!(pump_id = %id, participant = ?address, "added participant");
                }
                Ok(pump.clone())
            }
            PumpBackend::Persistent(store) => {
                let key = store.sequence_key(id)?;
                loop {
                    let current = store.pumps.get(&key)?.ok_or(PumpError::NotFound(id))?;
                    let mut pump = decode(&current)?;
                    if !pump.add_participant(address) {
                        return Ok(pump);
                    }

                    let updated = serde_json::to_vec(&pump)?;
                    match store.pumps.compare_and_swap(&key, Some(current), Some(updated))? {
                        Ok(()) => {
                            store.db.flush()?;
                            debug!(pump_id = %id, participant = ?address, "added participant");
                            return Ok(pump);
                        }
                        Err(_) => {
                            debug!(pump_id = %id, "participant update raced, retrying");
                        }
                    }
                }
            }
        }
    }
}

impl PersistentPumps {
    fn sequence_key(&self, id: Uuid) -> Result<sled::IVec, StoreError> {
        self.ids
            .get(id.as_bytes())?
            .ok_or_else(|| PumpError::NotFound(id).into())
    }
}

fn decode(bytes: &[u8]) -> Result<Pump, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptp_common::{parse_address, EthAmount};

    fn launch(name: &str) -> NewPump {
        NewPump::new(
            name,
            None,
            parse_address("0x1111111111111111111111111111111111111111").unwrap(),
            EthAmount::parse("0.01").unwrap(),
        )
        .unwrap()
    }

    fn participant(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    /// Sled's flusher thread may still hold the file lock right after the
    /// previous handle is dropped.
    fn reopen(path: &Path) -> PumpStore {
        let mut attempts = 0;
        loop {
            match PumpStore::persistent(path) {
                Ok(store) => return store,
                Err(StoreError::Db(_)) if attempts < 100 => {
                    attempts += 1;
                    std::thread::sleep(std::time::Duration::from_millis(20));
                }
                Err(err) => panic!("failed to reopen pump db: {err}"),
            }
        }
    }

    fn exercise_store(store: &PumpStore) {
        let first = store.create(launch("first")).unwrap();
        let second = store.create(launch("second")).unwrap();

        let names: Vec<_> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["second", "first"]);

        let updated = store.add_participant(first.id, participant(7)).unwrap();
        assert_eq!(updated.participants, vec![participant(7)]);
        let again = store.add_participant(first.id, participant(7)).unwrap();
        assert_eq!(again.participants.len(), 1);

        assert_eq!(store.get(second.id).unwrap().participants.len(), 0);
        assert!(matches!(
            store.add_participant(Uuid::new_v4(), participant(7)),
            Err(StoreError::Pump(PumpError::NotFound(_)))
        ));
    }

    #[test]
    fn memory_store_orders_and_dedups() {
        exercise_store(&PumpStore::in_memory());
    }

    #[test]
    fn sled_store_orders_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        exercise_store(&PumpStore::persistent(dir.path().join("pumps.db")).unwrap());
    }

    #[test]
    fn sled_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pumps.db");

        let created = {
            let store = PumpStore::persistent(&path).unwrap();
            let pump = store.create(launch("durable")).unwrap();
            store.add_participant(pump.id, participant(3)).unwrap();
            pump
        };

        let reopened = reopen(&path);
        let pump = reopened.get(created.id).unwrap();
        assert_eq!(pump.name, "durable");
        assert_eq!(pump.participants, vec![participant(3)]);
        assert_eq!(pump.created_at, created.created_at);
    }

    #[test]
    fn concurrent_writers_never_duplicate_a_participant() {
        let dir = tempfile::tempdir().unwrap();
        for store in [
            PumpStore::in_memory(),
            PumpStore::persistent(dir.path().join("race.db")).unwrap(),
        ] {
            let pump = store.create(launch("race")).unwrap();

            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = store.clone();
                    std::thread::spawn(move || {
                        // half the writers share one address, the rest are distinct
                        let address = if i % 2 == 0 { participant(1) } else { participant(100 + i) };
                        store.add_participant(pump.id, address).unwrap();
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let participants = store.get(pump.id).unwrap().participants;
            assert_eq!(participants.len(), 9, "store kind {}", store.kind());
            assert_eq!(participants.iter().filter(|a| **a == participant(1)).count(), 1);
        }
    }
}
