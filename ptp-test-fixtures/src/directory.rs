use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use ptp_common::{Address, NewPump, Pump};
use ptp_orchestrator::{DirectoryError, PumpDirectory};
use uuid::Uuid;

/// [`PumpDirectory`] kept in memory, newest pump first.
#[derive(Default)]
pub struct InMemoryPumpDirectory {
    pumps: Mutex<Vec<Pump>>,
    registrations: AtomicUsize,
}

impl InMemoryPumpDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pumps(&self) -> Vec<Pump> {
        self.pumps.lock().unwrap().clone()
    }

    /// Number of `add_participant` calls received, including repeats.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PumpDirectory for InMemoryPumpDirectory {
    async fn list(&self) -> Result<Vec<Pump>, DirectoryError> {
        Ok(self.pumps())
    }

    async fn create(&self, pump: &NewPump) -> Result<Pump, DirectoryError> {
        let created = Pump::create(pump.clone());
        self.pumps.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn add_participant(&self, pump_id: Uuid, participant: Address) -> Result<Pump, DirectoryError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        let mut pumps = self.pumps.lock().unwrap();
        let pump = pumps
            .iter_mut()
            .find(|p| p.id == pump_id)
            .ok_or_else(|| DirectoryError::NotFound("Pump not found".into()))?;
        pump.add_participant(participant);
        Ok(pump.clone())
    }
}
