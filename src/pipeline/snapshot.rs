// Snapshot documents: the whole session as one JSON record.
//
// Current documents are version 3. Version 2 is the older browser-era pattern
// format (grid + effects keyed by track index); it's still accepted and
// converted on the way in, never written.
//
// Parsing is the only stage that can fail. A `SnapshotDoc` coming out of
// `parse` is already normalized and validated, so applying it to a live
// session can't go wrong halfway through.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SnapshotError;
use crate::pipeline::mapping::{BindingRecord, ControlMapper};
use crate::pipeline::params::ParamKey;
use crate::pipeline::pattern::PatternStore;
use crate::pipeline::scheduler::Tempo;
use crate::pipeline::tracks::TrackRegistry;
use crate::shared::{DEFAULT_BPM, DEFAULT_STEPS, INITIAL_TRACKS, MAX_BPM, MAX_STEPS, MAX_TRACKS, MIN_BPM};

pub const SNAPSHOT_VERSION: u32 = 3;
const LEGACY_VERSION: u32 = 2;

fn default_bpm() -> f32 {
    DEFAULT_BPM
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDoc {
    pub version: u32,
    #[serde(default)]
    pub num_tracks: usize,
    #[serde(default)]
    pub num_steps: usize,
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    #[serde(default)]
    pub swing_percent: u32,
    #[serde(default)]
    pub grid: Vec<Vec<bool>>,
    #[serde(default)]
    pub tracks: Vec<TrackDoc>,
    #[serde(default)]
    pub bindings: Vec<BindingRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDoc {
    // Keyed by parameter name; unknown names are skipped on load, missing
    // ones keep the new track's default.
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<char>,
}

impl TrackDoc {
    pub fn param_values(&self) -> impl Iterator<Item = (ParamKey, f32)> + '_ {
        self.params
            .iter()
            .filter_map(|(name, &v)| ParamKey::from_name(name).map(|k| (k, v)))
    }
}

impl SnapshotDoc {
    pub fn capture(
        pattern: &PatternStore,
        tracks: &TrackRegistry,
        tempo: Tempo,
        mapper: &ControlMapper,
    ) -> Self {
        let track_docs = tracks
            .iter()
            .enumerate()
            .map(|(i, entry)| TrackDoc {
                params: entry
                    .params()
                    .iter()
                    .map(|(k, v)| (k.name().to_string(), v))
                    .collect(),
                muted: pattern.is_muted(i),
                sample: entry.sample().name().map(str::to_string),
                key: entry.key_binding(),
            })
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            num_tracks: pattern.num_tracks(),
            num_steps: pattern.num_steps(),
            bpm: tempo.bpm,
            swing_percent: tempo.swing_percent as u32,
            grid: pattern.rows().to_vec(),
            tracks: track_docs,
            bindings: mapper.records(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn tempo(&self) -> Tempo {
        Tempo { bpm: self.bpm, swing_percent: self.swing_percent.min(100) as u8 }
    }

    pub fn cell(&self, track: usize, step: usize) -> bool {
        self.grid
            .get(track)
            .and_then(|row| row.get(step))
            .copied()
            .unwrap_or(false)
    }

    pub fn track(&self, track: usize) -> Option<&TrackDoc> {
        self.tracks.get(track)
    }

    // Fill in zero counts, then reject what can't be loaded.
    fn normalize(mut self) -> Result<Self, SnapshotError> {
        if self.num_tracks == 0 {
            self.num_tracks = if self.grid.is_empty() { INITIAL_TRACKS } else { self.grid.len() };
        }
        if self.num_steps == 0 {
            self.num_steps = DEFAULT_STEPS;
        }
        if self.num_tracks > MAX_TRACKS {
            return Err(SnapshotError::Invalid(format!(
                "{} tracks (at most {MAX_TRACKS})",
                self.num_tracks
            )));
        }
        if self.num_steps > MAX_STEPS {
            return Err(SnapshotError::Invalid(format!(
                "{} steps (at most {MAX_STEPS})",
                self.num_steps
            )));
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(SnapshotError::Invalid(format!("bpm {}", self.bpm)));
        }
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        self.swing_percent = self.swing_percent.min(100);
        Ok(self)
    }
}

/// Parse and validate a document of any supported version. Nothing live is
/// touched here; an error means the caller's state stays exactly as it was.
pub fn parse(text: &str) -> Result<SnapshotDoc, SnapshotError> {
    let value: Value = serde_json::from_str(text)?;
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| SnapshotError::Invalid("missing version".to_string()))?;
    let doc = match u32::try_from(version) {
        Ok(SNAPSHOT_VERSION) => serde_json::from_value::<SnapshotDoc>(value)?,
        Ok(LEGACY_VERSION) => serde_json::from_value::<LegacyDoc>(value)?.upgrade(),
        _ => {
            return Err(SnapshotError::UnsupportedVersion {
                found: u32::try_from(version).unwrap_or(u32::MAX),
                supported: SNAPSHOT_VERSION,
            });
        }
    };
    doc.normalize()
}

// Version 2: effects are keyed by stringified track index, with the short
// names the old sliders used.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDoc {
    #[serde(default)]
    num_tracks: usize,
    #[serde(default)]
    bpm: Option<f32>,
    #[serde(default)]
    swing: Option<u32>,
    grid: Vec<Vec<bool>>,
    #[serde(default)]
    effects: BTreeMap<String, BTreeMap<String, f32>>,
    #[serde(default)]
    mutes: Vec<Option<bool>>,
    #[serde(default)]
    key_bindings: Vec<Option<String>>,
}

fn legacy_param(name: &str) -> Option<ParamKey> {
    match name {
        "volume" => Some(ParamKey::Volume),
        "pan" => Some(ParamKey::Pan),
        "reverb" => Some(ParamKey::ReverbMix),
        "delay" => Some(ParamKey::DelayMix),
        "saturation" => Some(ParamKey::Saturation),
        _ => None,
    }
}

impl LegacyDoc {
    fn upgrade(self) -> SnapshotDoc {
        let num_tracks = match self.num_tracks {
            0 => self.grid.len(),
            n => n,
        };
        let num_steps = self.grid.iter().map(Vec::len).max().unwrap_or(DEFAULT_STEPS);

        // past MAX_TRACKS the document gets rejected anyway
        let tracks = (0..num_tracks.max(self.grid.len()).min(MAX_TRACKS + 1))
            .map(|t| {
                let params = self
                    .effects
                    .get(&t.to_string())
                    .map(|fx| {
                        fx.iter()
                            .filter_map(|(name, &v)| {
                                legacy_param(name).map(|k| (k.name().to_string(), v))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                TrackDoc {
                    params,
                    muted: self.mutes.get(t).copied().flatten().unwrap_or(false),
                    sample: None,
                    key: self
                        .key_bindings
                        .get(t)
                        .and_then(|k| k.as_deref())
                        .and_then(|k| k.chars().next()),
                }
            })
            .collect();

        SnapshotDoc {
            version: SNAPSHOT_VERSION,
            num_tracks,
            num_steps,
            // a zero bpm meant "not set"
            bpm: self.bpm.filter(|&b| b > 0.0).unwrap_or(DEFAULT_BPM),
            swing_percent: self.swing.unwrap_or(0),
            grid: self.grid,
            tracks,
            bindings: Vec::new(),
        }
    }
}
