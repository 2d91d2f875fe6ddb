//! Embedded-mode gate: the local MDM channel only answers while the
//! `embeddedmode\Parameters\Flags` value holds the machine key.
//!
//! [`EmbeddedModeGate::acquire`] snapshots the current flag, writes the key,
//! and hands back a [`GateGuard`]. Dropping the guard (or calling
//! [`GateGuard::release`]) restores the snapshot byte-for-byte, or deletes the
//! value if it did not exist. Restore failures are logged, never returned.
//!
//! The gate mutates system-wide state, so one acquire must bracket a whole
//! query batch; `acquire` takes `&mut self` so a gate cannot hand out two
//! guards at once.

pub mod error;
pub mod machine;
#[cfg(windows)]
pub mod registry;

pub use error::{GateError, GateResult};
pub use machine::{HardwareIdSource, MachineKey, StaticHardwareId};
#[cfg(windows)]
pub use machine::WmiHardwareId;
#[cfg(windows)]
pub use registry::RegistryFlagStore;

/// Encoding of a stored flag value (mirrors the registry value types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagKind {
    #[default]
    None,
    String,
    ExpandString,
    Binary,
    DWord,
    DWordBigEndian,
    Link,
    MultiString,
    ResourceList,
    FullResourceDescriptor,
    ResourceRequirementsList,
    QWord,
}

/// A raw flag value and its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagValue {
    pub kind: FlagKind,
    pub data: Vec<u8>,
}

/// Backing storage for the embedded-mode flag.
pub trait FlagStore {
    /// Current value, or `None` if the value does not exist.
    fn read(&self) -> GateResult<Option<FlagValue>>;

    /// Create or overwrite the value.
    fn write(&mut self, value: &FlagValue) -> GateResult<()>;

    /// Remove the value; a missing value is not an error.
    fn delete(&mut self) -> GateResult<()>;
}

/// State of the flag captured before the gate writes to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbeddedFlagsSnapshot {
    pub exists: bool,
    pub kind: FlagKind,
    pub data: Vec<u8>,
}

impl EmbeddedFlagsSnapshot {
    fn capture(store: &impl FlagStore) -> Self {
        match store.read() {
            Ok(Some(value)) => Self {
                exists: true,
                kind: value.kind,
                data: value.data,
            },
            Ok(None) => Self::default(),
            Err(e) => {
                // Treated as absent: restore will then delete the value.
                tracing::warn!(error = %e, "could not read embedded-mode flag, assuming absent");
                Self::default()
            }
        }
    }
}

/// Owns the flag store and the machine key used to open the channel.
pub struct EmbeddedModeGate<S: FlagStore> {
    store: S,
    key: MachineKey,
}

impl<S: FlagStore> EmbeddedModeGate<S> {
    pub fn new(store: S, key: MachineKey) -> Self {
        Self { store, key }
    }

    /// Snapshot the flag and write the machine key.
    ///
    /// The guard exists before the write, so a failed write still restores.
    pub fn acquire(&mut self) -> GateResult<GateGuard<'_, S>> {
        let digest = self.key.digest()?;
        let snapshot = EmbeddedFlagsSnapshot::capture(&self.store);
        tracing::debug!(existed = snapshot.exists, kind = ?snapshot.kind, "embedded-mode flag snapshot taken");

        let guard = GateGuard {
            store: &mut self.store,
            snapshot: Some(snapshot),
        };
        guard.store.write(&FlagValue {
            kind: FlagKind::Binary,
            data: digest.to_vec(),
        })?;
        tracing::info!("embedded-mode flag set");
        Ok(guard)
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Restores the captured snapshot when released or dropped.
pub struct GateGuard<'a, S: FlagStore> {
    store: &'a mut S,
    snapshot: Option<EmbeddedFlagsSnapshot>,
}

impl<S: FlagStore> GateGuard<'_, S> {
    /// Restore the snapshot now.
    pub fn release(mut self) {
        self.restore();
    }

    /// The state that will be restored.
    pub fn snapshot(&self) -> Option<&EmbeddedFlagsSnapshot> {
        self.snapshot.as_ref()
    }

    fn restore(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        let result = if snapshot.exists {
            self.store.write(&FlagValue {
                kind: snapshot.kind,
                data: snapshot.data,
            })
        } else {
            self.store.delete()
        };
        match result {
            Ok(()) => tracing::info!(existed = snapshot.exists, "embedded-mode flag restored"),
            Err(e) => tracing::error!(error = %e, "failed to restore embedded-mode flag"),
        }
    }
}

impl<S: FlagStore> Drop for GateGuard<'_, S> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// In-process flag store for tests and hosts without a registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlagStore {
    pub value: Option<FlagValue>,
    /// Make every `write` fail (exercises error paths).
    pub fail_writes: bool,
    /// Number of successful writes.
    pub writes: usize,
}

impl MemoryFlagStore {
    pub fn with_value(value: FlagValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }
}

impl FlagStore for MemoryFlagStore {
    fn read(&self) -> GateResult<Option<FlagValue>> {
        Ok(self.value.clone())
    }

    fn write(&mut self, value: &FlagValue) -> GateResult<()> {
        if self.fail_writes {
            return Err(GateError::Store {
                operation: "write Flags".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            });
        }
        self.value = Some(value.clone());
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self) -> GateResult<()> {
        self.value = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "4C4C4544-0042-3510-8052-B4C04F564433";

    fn gate(store: MemoryFlagStore) -> EmbeddedModeGate<MemoryFlagStore> {
        EmbeddedModeGate::new(store, MachineKey::new(StaticHardwareId(UUID.into())))
    }

    fn original() -> FlagValue {
        FlagValue {
            kind: FlagKind::DWord,
            data: vec![0x01, 0x00, 0x00, 0x00],
        }
    }

    #[test]
    fn acquire_writes_machine_key() {
        let mut gate = gate(MemoryFlagStore::default());
        let expected = MachineKey::new(StaticHardwareId(UUID.into()))
            .digest()
            .unwrap();
        let guard = gate.acquire().unwrap();
        assert_eq!(
            guard.store.value,
            Some(FlagValue {
                kind: FlagKind::Binary,
                data: expected.to_vec()
            })
        );
        guard.release();
    }

    #[test]
    fn release_restores_existing_value_exactly() {
        let mut gate = gate(MemoryFlagStore::with_value(original()));
        let guard = gate.acquire().unwrap();
        assert_eq!(guard.snapshot().unwrap().data, original().data);
        guard.release();
        assert_eq!(gate.store().value, Some(original()));
    }

    #[test]
    fn release_deletes_value_that_did_not_exist() {
        let mut gate = gate(MemoryFlagStore::default());
        gate.acquire().unwrap().release();
        assert_eq!(gate.store().value, None);
    }

    #[test]
    fn drop_restores_on_early_exit() {
        fn failing_batch(gate: &mut EmbeddedModeGate<MemoryFlagStore>) -> Result<(), String> {
            let _guard = gate.acquire().map_err(|e| e.to_string())?;
            Err("query failed".into())
        }

        let mut gate = gate(MemoryFlagStore::with_value(original()));
        assert!(failing_batch(&mut gate).is_err());
        assert_eq!(gate.store().value, Some(original()));
    }

    #[test]
    fn drop_restores_on_panic() {
        let mut gate = gate(MemoryFlagStore::with_value(original()));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = gate.acquire().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(gate.store().value, Some(original()));
    }

    #[test]
    fn failed_write_is_reported_and_restore_failure_is_swallowed() {
        let mut store = MemoryFlagStore::with_value(original());
        store.fail_writes = true;
        let mut gate = gate(store);
        assert!(matches!(gate.acquire(), Err(GateError::Store { .. })));
        // Restore also failed to write, but nothing was changed either.
        assert_eq!(gate.store().value, Some(original()));
    }

    #[test]
    fn failed_write_on_missing_flag_leaves_it_missing() {
        let store = MemoryFlagStore {
            fail_writes: true,
            ..MemoryFlagStore::default()
        };
        let mut gate = gate(store);
        assert!(matches!(gate.acquire(), Err(GateError::Store { .. })));
        assert_eq!(gate.store().value, None);
        assert_eq!(gate.store().writes, 0);
    }

    #[test]
    fn identity_failure_leaves_store_untouched() {
        let mut gate = EmbeddedModeGate::new(
            MemoryFlagStore::with_value(original()),
            MachineKey::new(StaticHardwareId("garbage".into())),
        );
        assert!(matches!(gate.acquire(), Err(GateError::Identity { .. })));
        assert_eq!(gate.store().writes, 0);
    }
}
