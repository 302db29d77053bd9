// Per-track effect parameters: the keys, their ranges, and how a stored value
// is routed onto the external audio chain.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKey {
    Volume,
    Pan,
    ReverbMix,
    ReverbDecay,
    DelayMix,
    DelayTime,
    Saturation,
}

pub const NUM_PARAMS: usize = 7;

// Delay feedback follows the delay mix at this ratio.
pub const DELAY_FEEDBACK_RATIO: f32 = 0.6;

impl ParamKey {
    pub const ALL: [ParamKey; NUM_PARAMS] = [
        ParamKey::Volume,
        ParamKey::Pan,
        ParamKey::ReverbMix,
        ParamKey::ReverbDecay,
        ParamKey::DelayMix,
        ParamKey::DelayTime,
        ParamKey::Saturation,
    ];

    /// Inclusive `(min, max)` range the stored value is clamped to.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamKey::Volume => (-40.0, 6.0), // dB
            ParamKey::Pan => (-1.0, 1.0),
            ParamKey::ReverbMix => (0.0, 1.0),
            ParamKey::ReverbDecay => (0.1, 10.0), // seconds
            ParamKey::DelayMix => (0.0, 1.0),
            ParamKey::DelayTime => (0.0, 1.0), // seconds
            ParamKey::Saturation => (0.0, 1.0),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParamKey::ReverbDecay => 1.5,
            ParamKey::DelayTime => 0.25,
            _ => 0.0,
        }
    }

    // NaN clamps to the default rather than poisoning the chain
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    // 0..=1 onto the declared range, linearly
    pub fn denormalize(self, normalized: f32) -> f32 {
        let (min, max) = self.range();
        min + normalized.clamp(0.0, 1.0) * (max - min)
    }

    // Same spelling serde uses.
    pub fn name(self) -> &'static str {
        match self {
            ParamKey::Volume => "volume",
            ParamKey::Pan => "pan",
            ParamKey::ReverbMix => "reverbMix",
            ParamKey::ReverbDecay => "reverbDecay",
            ParamKey::DelayMix => "delayMix",
            ParamKey::DelayTime => "delayTime",
            ParamKey::Saturation => "saturation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    // Short display text for a slider readout.
    pub fn format(self, value: f32) -> String {
        match self {
            ParamKey::Volume => {
                let db = value.round();
                if db > 0.0 { format!("+{db}dB") } else { format!("{db}dB") }
            }
            ParamKey::Pan => {
                let pct = (value * 100.0).round() as i32;
                match pct {
                    0 => "C".to_string(),
                    p if p < 0 => format!("L{}", -p),
                    p => format!("R{p}"),
                }
            }
            ParamKey::ReverbMix | ParamKey::DelayMix | ParamKey::Saturation => {
                format!("{}%", (value * 100.0).round() as i32)
            }
            ParamKey::ReverbDecay | ParamKey::DelayTime => {
                // two decimals at most, trailing zeros dropped
                let secs = (value * 100.0).round() / 100.0;
                format!("{secs}s")
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One write the external chain receives for a parameter change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChainWrite {
    Param(ParamKey, f32),
    DelayFeedback(f32),
    SaturationBypass(bool),
}

// The fixed routing table from a (clamped) stored value to chain writes.
// Saturation also flips the distortion bypass: any amount > 0 enables it.
pub fn route(key: ParamKey, value: f32) -> Vec<ChainWrite> {
    match key {
        ParamKey::DelayMix => vec![
            ChainWrite::Param(key, value),
            ChainWrite::DelayFeedback(value * DELAY_FEEDBACK_RATIO),
        ],
        ParamKey::Saturation => vec![
            ChainWrite::Param(key, value),
            ChainWrite::SaturationBypass(value <= 0.0),
        ],
        _ => vec![ChainWrite::Param(key, value)],
    }
}

// Exactly one value per key, always.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackParams {
    values: [f32; NUM_PARAMS],
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            values: ParamKey::ALL.map(ParamKey::default_value),
        }
    }
}

impl TrackParams {
    pub fn get(&self, key: ParamKey) -> f32 {
        self.values[key.index()]
    }

    // Returns the clamped value that was stored.
    pub fn set(&mut self, key: ParamKey, value: f32) -> f32 {
        let clamped = key.clamp(value);
        self.values[key.index()] = clamped;
        clamped
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, f32)> + '_ {
        ParamKey::ALL.iter().map(|&k| (k, self.get(k)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_key() {
        let p = TrackParams::default();
        assert_eq!(p.get(ParamKey::Volume), 0.0);
        assert_eq!(p.get(ParamKey::ReverbDecay), 1.5);
        assert_eq!(p.get(ParamKey::DelayTime), 0.25);
        assert_eq!(p.iter().count(), NUM_PARAMS);
    }

    #[test]
    fn clamps_to_declared_range() {
        let mut p = TrackParams::default();
        assert_eq!(p.set(ParamKey::Volume, 100.0), 6.0);
        assert_eq!(p.set(ParamKey::Volume, -999.0), -40.0);
        assert_eq!(p.set(ParamKey::ReverbDecay, 0.0), 0.1);
        assert_eq!(p.set(ParamKey::Pan, f32::NAN), 0.0);
    }

    #[test]
    fn denormalize_spans_range() {
        assert_eq!(ParamKey::Pan.denormalize(0.0), -1.0);
        assert_eq!(ParamKey::Pan.denormalize(1.0), 1.0);
        assert_eq!(ParamKey::Volume.denormalize(0.5), -17.0);
    }

    #[test]
    fn saturation_routes_bypass() {
        assert_eq!(
            route(ParamKey::Saturation, 0.0),
            vec![
                ChainWrite::Param(ParamKey::Saturation, 0.0),
                ChainWrite::SaturationBypass(true)
            ]
        );
        assert!(route(ParamKey::Saturation, 0.3).contains(&ChainWrite::SaturationBypass(false)));
    }

    #[test]
    fn delay_mix_drives_feedback() {
        let writes = route(ParamKey::DelayMix, 0.5);
        assert!(writes.contains(&ChainWrite::DelayFeedback(0.3)));
    }

    #[test]
    fn formats_readouts() {
        assert_eq!(ParamKey::Volume.format(3.0), "+3dB");
        assert_eq!(ParamKey::Volume.format(-12.0), "-12dB");
        assert_eq!(ParamKey::Pan.format(0.0), "C");
        assert_eq!(ParamKey::Pan.format(-0.5), "L50");
        assert_eq!(ParamKey::Pan.format(0.25), "R25");
        assert_eq!(ParamKey::ReverbMix.format(0.25), "25%");
        assert_eq!(ParamKey::ReverbDecay.format(1.5), "1.5s");
        assert_eq!(ParamKey::DelayTime.format(0.25), "0.25s");
        assert_eq!(ParamKey::ReverbDecay.format(2.0), "2s");
    }
}
