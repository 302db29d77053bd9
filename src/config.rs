// Runtime settings, read from <project_dir>/.neonseq/config.json.
// Every field is optional in the file; anything missing takes the default.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::pipeline::persistence::neonseq_dir;
use crate::pipeline::scheduler::Tempo;
use crate::shared::{DEFAULT_BPM, DEFAULT_STEPS, INITIAL_TRACKS, MAX_BPM, MAX_STEPS, MAX_TRACKS, MIN_BPM};

const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub initial_tracks: usize,
    pub num_steps: usize,
    pub bpm: f32,
    pub swing_percent: u8,
    // how far ahead of the clock ticks get scheduled
    pub lookahead_ms: u64,
    pub poll_interval_ms: u64,
    pub sample_dir: Option<PathBuf>,
    pub midi_port: Option<String>,
    pub play_bars: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_tracks: INITIAL_TRACKS,
            num_steps: DEFAULT_STEPS,
            bpm: DEFAULT_BPM,
            swing_percent: 0,
            lookahead_ms: 100,
            poll_interval_ms: 5,
            sample_dir: None,
            midi_port: None,
            play_bars: None,
        }
    }
}

impl Config {
    pub fn load(project_dir: &Path) -> Self {
        let path = neonseq_dir(project_dir).join(CONFIG_FILE);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => {
                info!("no config at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str::<Config>(&data) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                warn!("ignoring unreadable config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn sanitized(mut self) -> Self {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            self.bpm = DEFAULT_BPM;
        }
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        self.swing_percent = self.swing_percent.min(100);
        self.num_steps = self.num_steps.clamp(1, MAX_STEPS);
        self.initial_tracks = self.initial_tracks.clamp(1, MAX_TRACKS);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self
    }

    pub fn tempo(&self) -> Tempo {
        Tempo { bpm: self.bpm, swing_percent: self.swing_percent }
    }

    pub fn sample_dir(&self, project_dir: &Path) -> PathBuf {
        match &self.sample_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_dir.join(dir),
            None => project_dir.to_path_buf(),
        }
    }

    // Playback length for the headless driver, in steps.
    pub fn play_steps(&self, num_steps: usize) -> u64 {
        match self.play_bars {
            Some(bars) => bars as u64 * 16,
            None => num_steps as u64 * 4,
        }
    }
}
