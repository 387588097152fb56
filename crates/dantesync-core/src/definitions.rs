// ── Definition diff cache ──
//
// Consumers regenerate selectable definitions (choices, presets) from the
// snapshot. Pushing identical definitions again is wasted work for the
// UI layer, so each kind is fingerprinted and only pushed on change.

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::CoreError;
use crate::model::Domain;

/// Category of generated definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DefinitionKind {
    Actions,
    Feedbacks,
    Presets,
    Variables,
}

/// Hex SHA-256 over a canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint any serializable value.
    ///
    /// Object keys are hashed in sorted order, so field order does not
    /// affect the result.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, CoreError> {
        let canonical = serde_json::to_value(value)
            .and_then(|v| serde_json::to_vec(&v))
            .map_err(|e| CoreError::Internal(format!("cannot fingerprint definitions: {e}")))?;
        Ok(Self::from_bytes(&canonical))
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Domain {
    /// Fingerprint of everything definition generators read: device names
    /// and the names and indices of rx and tx channels.
    ///
    /// Subscription state is excluded, so routing changes alone do not
    /// invalidate definitions.
    pub fn structure_fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for device in &self.devices {
            hasher.update(device.id.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(device.name.as_bytes());
            hasher.update(b"\x1e");
            for rx in &device.rx_channels {
                hasher.update(b"rx");
                hasher.update(rx.index.to_le_bytes());
                hasher.update(rx.name.as_bytes());
                hasher.update(b"\x1f");
            }
            for tx in &device.tx_channels {
                hasher.update(b"tx");
                hasher.update(tx.index.to_le_bytes());
                hasher.update(tx.name.as_bytes());
                hasher.update(b"\x1f");
            }
            hasher.update(b"\x1d");
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

/// Receives definitions that actually changed.
pub trait DefinitionSink: Send + Sync {
    fn push(&self, kind: DefinitionKind, definitions: &serde_json::Value);
}

impl<F> DefinitionSink for F
where
    F: Fn(DefinitionKind, &serde_json::Value) + Send + Sync,
{
    fn push(&self, kind: DefinitionKind, definitions: &serde_json::Value) {
        self(kind, definitions);
    }
}

/// Last pushed fingerprint per [`DefinitionKind`].
pub struct DefinitionCache<S> {
    sink: S,
    fingerprints: DashMap<DefinitionKind, Fingerprint>,
}

impl<S: DefinitionSink> DefinitionCache<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            fingerprints: DashMap::new(),
        }
    }

    /// Push `definitions` if they differ from the last push for `kind`.
    ///
    /// Returns whether a push happened.
    pub fn update<T: Serialize + ?Sized>(
        &self,
        kind: DefinitionKind,
        definitions: &T,
    ) -> Result<bool, CoreError> {
        let value = serde_json::to_value(definitions)
            .map_err(|e| CoreError::Internal(format!("cannot serialize {kind} definitions: {e}")))?;
        let fingerprint = Fingerprint::of(&value)?;

        if self
            .fingerprints
            .get(&kind)
            .is_some_and(|stored| *stored == fingerprint)
        {
            debug!(%kind, "definitions unchanged, push suppressed");
            return Ok(false);
        }

        self.sink.push(kind, &value);
        debug!(%kind, %fingerprint, "definitions pushed");
        self.fingerprints.insert(kind, fingerprint);
        Ok(true)
    }

    /// Forget the stored fingerprint so the next update pushes.
    pub fn invalidate(&self, kind: DefinitionKind) {
        self.fingerprints.remove(&kind);
    }

    pub fn clear(&self) {
        self.fingerprints.clear();
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::model::{Device, RxChannel};

    fn counting_cache() -> (DefinitionCache<impl DefinitionSink>, Arc<AtomicUsize>) {
        let pushes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pushes);
        let cache = DefinitionCache::new(move |_: DefinitionKind, _: &serde_json::Value| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (cache, pushes)
    }

    #[test]
    fn identical_definitions_push_once() {
        let (cache, pushes) = counting_cache();
        let defs = json!({ "choices": [{ "id": "1@dev", "label": "In1@Stagebox" }] });

        assert!(matches!(cache.update(DefinitionKind::Actions, &defs), Ok(true)));
        assert!(matches!(cache.update(DefinitionKind::Actions, &defs), Ok(false)));
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn kinds_are_tracked_separately() {
        let (cache, pushes) = counting_cache();
        let defs = json!(["a", "b"]);

        assert!(matches!(cache.update(DefinitionKind::Actions, &defs), Ok(true)));
        assert!(matches!(cache.update(DefinitionKind::Feedbacks, &defs), Ok(true)));
        assert_eq!(pushes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn changed_definitions_push_again() {
        let (cache, pushes) = counting_cache();
        assert!(matches!(cache.update(DefinitionKind::Presets, &json!([1])), Ok(true)));
        assert!(matches!(cache.update(DefinitionKind::Presets, &json!([1, 2])), Ok(true)));
        cache.invalidate(DefinitionKind::Presets);
        assert!(matches!(cache.update(DefinitionKind::Presets, &json!([1, 2])), Ok(true)));
        assert_eq!(pushes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn key_order_does_not_change_fingerprint() {
        let a = Fingerprint::of(&json!({ "id": 1, "label": "x" })).ok();
        let b = Fingerprint::of(&json!({ "label": "x", "id": 1 })).ok();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn routing_changes_keep_structure_fingerprint() {
        let mut device = Device {
            id: "dev".into(),
            name: "Stagebox".into(),
            rx_channels: vec![RxChannel {
                index: 1,
                name: "In1".into(),
                ..RxChannel::default()
            }],
            tx_channels: Vec::new(),
        };
        let before = Domain {
            id: "dom".into(),
            name: "Main".into(),
            devices: vec![Arc::new(device.clone())],
        };

        device.rx_channels[0].subscribed_device = "Amp".into();
        device.rx_channels[0].subscribed_channel = "Out1".into();
        let routed = Domain {
            devices: vec![Arc::new(device.clone())],
            ..before.clone()
        };
        assert_eq!(before.structure_fingerprint(), routed.structure_fingerprint());

        device.rx_channels[0].name = "Vox".into();
        let renamed = Domain {
            devices: vec![Arc::new(device)],
            ..before.clone()
        };
        assert_ne!(before.structure_fingerprint(), renamed.structure_fingerprint());
    }
}
