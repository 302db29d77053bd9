// Control mapping and MIDI learn.
//
// Modes:
//   Idle            -- messages drive whatever they're bound to; parameter
//                      controls edit values as normal
//   Learning        -- parameter controls designate instead of edit
//   AwaitingControl -- a target is designated; the next control message is
//                      bound to it, the table is persisted, and we drop back
//                      to Idle
//
// Bindings are keyed by (channel, control); learning an existing key
// overwrites it, and several keys may drive the same target. A binding whose
// track index is past the current track count is kept but inert until a track
// occupies that index again. Nothing here ever prunes bindings on its own.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::pipeline::params::ParamKey;
use crate::pipeline::persistence::BindingStore;
use crate::pipeline::tracks::TrackRegistry;
use crate::shared::{ControlMessage, MIDI_MAX};

pub const BINDINGS_STORE_KEY: &str = "neonseq.controlBindings";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlKey {
    pub channel: u8,
    pub control: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingTarget {
    pub track: usize,
    pub param: ParamKey,
}

// Flat form of one binding, for the store and for snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub channel: u8,
    pub control: u8,
    pub track: usize,
    pub param: ParamKey,
}

impl BindingRecord {
    pub fn split(self) -> (ControlKey, BindingTarget) {
        (
            ControlKey { channel: self.channel, control: self.control },
            BindingTarget { track: self.track, param: self.param },
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LearnMode {
    #[default]
    Idle,
    Learning,
    AwaitingControl(BindingTarget),
}

/// How a gesture on a parameter control is to be read. Checked once, before
/// dispatching; a control is never both designated and edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    EditValue,
    Designate,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MessageOutcome {
    Learned { key: ControlKey, target: BindingTarget },
    Applied { track: usize, param: ParamKey, value: f32 },
    Ignored,
}

#[derive(Debug, Default)]
pub struct ControlMapper {
    bindings: BTreeMap<ControlKey, BindingTarget>,
    mode: LearnMode,
}

impl ControlMapper {
    pub fn new() -> Self {
        Self::default()
    }

    // Starts from whatever table the store holds. Unreadable data is logged
    // and treated as no bindings at all.
    pub fn restore(store: &dyn BindingStore) -> Self {
        let mut mapper = Self::new();
        let Some(raw) = store.get(BINDINGS_STORE_KEY) else {
            return mapper;
        };
        match serde_json::from_str::<Vec<BindingRecord>>(&raw) {
            Ok(records) => {
                mapper.bindings = records.into_iter().map(BindingRecord::split).collect();
                info!("restored {} control bindings", mapper.bindings.len());
            }
            Err(e) => warn!("ignoring unreadable control bindings: {e}"),
        }
        mapper
    }

    pub fn mode(&self) -> LearnMode {
        self.mode
    }

    pub fn is_learning(&self) -> bool {
        self.mode != LearnMode::Idle
    }

    pub fn interaction(&self) -> Interaction {
        match self.mode {
            LearnMode::Idle => Interaction::EditValue,
            LearnMode::Learning | LearnMode::AwaitingControl(_) => Interaction::Designate,
        }
    }

    // Idle <-> Learning. Turning learn off abandons any pending target.
    pub fn toggle_learn(&mut self) -> LearnMode {
        self.mode = match self.mode {
            LearnMode::Idle => LearnMode::Learning,
            LearnMode::Learning | LearnMode::AwaitingControl(_) => LearnMode::Idle,
        };
        debug!("learn mode: {:?}", self.mode);
        self.mode
    }

    /// Pick the target the next control message will be bound to. Only
    /// meaningful while learning; a later designation replaces an earlier one.
    pub fn designate(&mut self, target: BindingTarget, num_tracks: usize) -> bool {
        if !self.is_learning() || target.track >= num_tracks {
            return false;
        }
        self.mode = LearnMode::AwaitingControl(target);
        true
    }

    pub fn handle(
        &mut self,
        msg: ControlMessage,
        tracks: &mut TrackRegistry,
        store: &mut dyn BindingStore,
    ) -> MessageOutcome {
        let key = msg.key();

        if let LearnMode::AwaitingControl(target) = self.mode {
            self.bindings.insert(key, target);
            self.mode = LearnMode::Idle;
            info!(
                "learned ch{} cc{} -> track {} {:?}",
                key.channel, key.control, target.track, target.param
            );
            self.persist_or_warn(store);
            return MessageOutcome::Learned { key, target };
        }

        let Some(target) = self.bindings.get(&key).copied() else {
            return MessageOutcome::Ignored;
        };
        let normalized = msg.value.min(MIDI_MAX) as f32 / MIDI_MAX as f32;
        let value = target.param.denormalize(normalized);
        match tracks.set_parameter(target.track, target.param, value) {
            Some(stored) => MessageOutcome::Applied {
                track: target.track,
                param: target.param,
                value: stored,
            },
            None => MessageOutcome::Ignored, // stale: no track at that index right now
        }
    }

    pub fn bindings(&self) -> &BTreeMap<ControlKey, BindingTarget> {
        &self.bindings
    }

    pub fn binding(&self, key: ControlKey) -> Option<BindingTarget> {
        self.bindings.get(&key).copied()
    }

    pub fn records(&self) -> Vec<BindingRecord> {
        self.bindings
            .iter()
            .map(|(k, t)| BindingRecord {
                channel: k.channel,
                control: k.control,
                track: t.track,
                param: t.param,
            })
            .collect()
    }

    pub fn unbind(&mut self, key: ControlKey, store: &mut dyn BindingStore) -> bool {
        let removed = self.bindings.remove(&key).is_some();
        if removed {
            self.persist_or_warn(store);
        }
        removed
    }

    // Wholesale replacement, then persisted.
    pub fn replace(&mut self, records: &[BindingRecord], store: &mut dyn BindingStore) {
        self.bindings = records.iter().map(|r| r.split()).collect();
        self.persist_or_warn(store);
    }

    pub fn persist(&self, store: &mut dyn BindingStore) -> Result<(), crate::error::StoreError> {
        let json = serde_json::to_string(&self.records())?;
        store.set(BINDINGS_STORE_KEY, &json)
    }

    fn persist_or_warn(&self, store: &mut dyn BindingStore) {
        if let Err(e) = self.persist(store) {
            warn!("could not persist control bindings: {e}");
        }
    }
}
