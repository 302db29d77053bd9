// Session: the one place the sequencer's state is mutated.
//
// Every operation here (UI actions, inbound control messages, tick
// processing, snapshot loads) runs to completion before the next one starts,
// on whichever thread owns the Session. That is what makes a control message
// land wholly before or wholly after a tick, and what keeps a tick from ever
// seeing a half-resized grid.
//
// Pattern rows and track entries are kept in lockstep: index i in the
// PatternStore and index i in the TrackRegistry are always the same track.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use crate::audio_api::{AudioBackend, SampleResolver};
use crate::error::SnapshotError;
use crate::pipeline::mapping::{
    BindingTarget, ControlKey, ControlMapper, Interaction, LearnMode, MessageOutcome,
};
use crate::pipeline::params::ParamKey;
use crate::pipeline::pattern::PatternStore;
use crate::pipeline::persistence::BindingStore;
use crate::pipeline::scheduler::{Scheduler, Tempo};
use crate::pipeline::snapshot::{self, SnapshotDoc};
use crate::pipeline::tracks::{TrackId, TrackRegistry};
use crate::shared::{
    ControlMessage, DEFAULT_STEPS, INITIAL_TRACKS, MAX_STEPS, MAX_TRACKS, Timestamp, UiEvent,
};

/// What a parameter-control gesture turned out to be.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamGesture {
    Edited(f32),
    Designated(BindingTarget),
    Ignored,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub num_tracks: usize,
    pub num_steps: usize,
    // (track, sample name) for every name nothing could resolve
    pub missing_samples: Vec<(usize, String)>,
}

pub struct Session {
    pattern: PatternStore,
    tracks: TrackRegistry,
    scheduler: Scheduler,
    mapper: ControlMapper,
    backend: Box<dyn AudioBackend>,
    store: Box<dyn BindingStore>,
    subscribers: Vec<Sender<UiEvent>>,
}

impl Session {
    // Four empty tracks of sixteen steps at the default tempo.
    pub fn new(backend: Box<dyn AudioBackend>, store: Box<dyn BindingStore>) -> Self {
        Self::with_layout(backend, store, INITIAL_TRACKS, DEFAULT_STEPS, Tempo::default())
    }

    pub fn with_layout(
        backend: Box<dyn AudioBackend>,
        store: Box<dyn BindingStore>,
        num_tracks: usize,
        num_steps: usize,
        tempo: Tempo,
    ) -> Self {
        let mapper = ControlMapper::restore(&*store);
        let mut scheduler = Scheduler::default();
        scheduler.set_bpm(tempo.bpm);
        scheduler.set_swing(tempo.swing_percent);
        let mut session = Self {
            pattern: PatternStore::new(0, num_steps.clamp(1, MAX_STEPS)),
            tracks: TrackRegistry::new(),
            scheduler,
            mapper,
            backend,
            store,
            subscribers: Vec::new(),
        };
        for _ in 0..num_tracks.clamp(1, MAX_TRACKS) {
            session.push_track();
        }
        session
    }

    /// A new receiver for presentation-layer events. Dropped receivers are
    /// forgotten on the next event.
    pub fn subscribe_ui(&mut self) -> Receiver<UiEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: UiEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn num_tracks(&self) -> usize {
        self.pattern.num_tracks()
    }

    pub fn num_steps(&self) -> usize {
        self.pattern.num_steps()
    }

    pub fn pattern(&self) -> &PatternStore {
        &self.pattern
    }

    pub fn tracks(&self) -> &TrackRegistry {
        &self.tracks
    }

    pub fn mapper(&self) -> &ControlMapper {
        &self.mapper
    }

    pub fn track_id(&self, track: usize) -> Option<TrackId> {
        self.tracks.id_of(track)
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.index_of(id)
    }

    // ---- structure ----

    fn push_track(&mut self) -> usize {
        let row = self.pattern.add_track();
        let idx = self.tracks.create_track(&mut *self.backend);
        debug_assert_eq!(row, idx);
        idx
    }

    // None once MAX_TRACKS is reached.
    pub fn add_track(&mut self) -> Option<usize> {
        if self.num_tracks() >= MAX_TRACKS {
            return None;
        }
        let idx = self.push_track();
        info!("added track {idx}");
        self.emit(UiEvent::TracksChanged { count: self.num_tracks() });
        Some(idx)
    }

    // The chain goes first, then the row; higher tracks shift down by one.
    // Bindings that pointed past the new end stay put, inert.
    pub fn remove_track(&mut self, track: usize) -> bool {
        if self.num_tracks() <= 1 || track >= self.num_tracks() {
            return false;
        }
        self.tracks.destroy_track(track);
        self.pattern.remove_track(track);
        info!("removed track {track}");
        self.emit(UiEvent::TracksChanged { count: self.num_tracks() });
        true
    }

    pub fn toggle_cell(&mut self, track: usize, step: usize) -> bool {
        self.pattern.toggle_cell(track, step)
    }

    pub fn set_cell(&mut self, track: usize, step: usize, on: bool) -> bool {
        self.pattern.set_cell(track, step, on)
    }

    /// Resizing while running rebuilds the tick sequence: stop, resize,
    /// start again from `now`.
    pub fn resize_steps(&mut self, new_count: usize, now: Timestamp) -> bool {
        if new_count == 0 || new_count > MAX_STEPS {
            return false;
        }
        let was_running = self.stop();
        self.pattern.resize_steps(new_count);
        if was_running {
            self.start(now);
        }
        true
    }

    // ---- parameters ----

    pub fn set_param(&mut self, track: usize, key: ParamKey, value: f32) -> Option<f32> {
        let stored = self.tracks.set_parameter(track, key, value)?;
        self.emit(UiEvent::ParamChanged { track, key, value: stored });
        Some(stored)
    }

    pub fn param(&self, track: usize, key: ParamKey) -> Option<f32> {
        self.tracks.parameter(track, key)
    }

    /// A gesture on a parameter control. While learning it designates the
    /// control as the binding target and leaves the value alone; otherwise
    /// it's a plain edit.
    pub fn param_gesture(&mut self, track: usize, key: ParamKey, value: f32) -> ParamGesture {
        if track >= self.num_tracks() {
            return ParamGesture::Ignored;
        }
        match self.mapper.interaction() {
            Interaction::Designate => {
                let target = BindingTarget { track, param: key };
                if !self.mapper.designate(target, self.num_tracks()) {
                    return ParamGesture::Ignored;
                }
                self.emit(UiEvent::LearnModeChanged(self.mapper.mode()));
                ParamGesture::Designated(target)
            }
            Interaction::EditValue => match self.set_param(track, key, value) {
                Some(stored) => ParamGesture::Edited(stored),
                None => ParamGesture::Ignored,
            },
        }
    }

    // ---- mute / keys / samples ----

    pub fn set_mute(&mut self, track: usize, muted: bool) -> bool {
        if !self.pattern.set_muted(track, muted) {
            return false;
        }
        self.tracks.set_mute(track, muted);
        self.emit(UiEvent::MuteChanged { track, muted });
        true
    }

    pub fn toggle_mute(&mut self, track: usize) -> Option<bool> {
        if track >= self.num_tracks() {
            return None;
        }
        let muted = !self.pattern.is_muted(track);
        self.set_mute(track, muted);
        Some(muted)
    }

    pub fn assign_key(&mut self, track: usize, key: Option<char>) -> bool {
        self.tracks.set_key_binding(track, key)
    }

    // Toggles the mute of the first track bound to `key`.
    pub fn press_key(&mut self, key: char) -> Option<usize> {
        let track = self.tracks.track_for_key(key)?;
        self.toggle_mute(track);
        Some(track)
    }

    pub fn assign_sample(&mut self, track: usize, name: &str, samples: &dyn SampleResolver) -> bool {
        if track >= self.num_tracks() {
            return false;
        }
        match samples.resolve(name) {
            Some(handle) => self.tracks.set_sample(track, name, handle),
            None => {
                warn!("no sample named {name:?}");
                false
            }
        }
    }

    pub fn clear_sample(&mut self, track: usize) -> bool {
        self.tracks.clear_sample(track)
    }

    // ---- transport ----

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn current_step(&self) -> Option<usize> {
        self.scheduler.current_step()
    }

    pub fn tempo(&self) -> Tempo {
        self.scheduler.tempo()
    }

    pub fn start(&mut self, at: Timestamp) -> bool {
        self.scheduler.start(at, self.pattern.num_steps())
    }

    pub fn stop(&mut self) -> bool {
        if !self.scheduler.stop() {
            return false;
        }
        self.emit(UiEvent::CursorCleared);
        true
    }

    pub fn set_bpm(&mut self, bpm: f32) -> bool {
        self.scheduler.set_bpm(bpm)
    }

    pub fn set_swing(&mut self, percent: u8) {
        self.scheduler.set_swing(percent);
    }

    /// Fire every tick due by `horizon`. For each, every unmuted track with
    /// the step set and a playable sample is retriggered at the tick's time.
    /// Returns how many triggers went out.
    pub fn advance(&mut self, horizon: Timestamp) -> usize {
        let mut fired = 0;
        while let Some(tick) = self.scheduler.poll(horizon) {
            for track in 0..self.pattern.num_tracks() {
                if self.pattern.cell(track, tick.step)
                    && !self.pattern.is_muted(track)
                    && self.tracks.trigger(track, tick.at)
                {
                    debug!("trigger track {track} step {} at {:.3}s", tick.step, tick.at);
                    fired += 1;
                }
            }
        }
        fired
    }

    // Deliver cursor moves whose audio time has arrived.
    pub fn drain_ui(&mut self, now: Timestamp) {
        while let Some(notice) = self.scheduler.due_cursor(now) {
            self.emit(UiEvent::StepCursor { step: notice.step, at: notice.at });
        }
    }

    // ---- control mapping ----

    pub fn learn_mode(&self) -> LearnMode {
        self.mapper.mode()
    }

    pub fn toggle_learn(&mut self) -> LearnMode {
        let mode = self.mapper.toggle_learn();
        self.emit(UiEvent::LearnModeChanged(mode));
        mode
    }

    pub fn handle_control(&mut self, msg: ControlMessage) -> MessageOutcome {
        debug!("control ch{} cc{} = {}", msg.channel, msg.control, msg.value);
        let outcome = self.mapper.handle(msg, &mut self.tracks, &mut *self.store);
        match outcome {
            MessageOutcome::Learned { key, target } => {
                self.emit(UiEvent::BindingLearned { key, target });
                self.emit(UiEvent::LearnModeChanged(self.mapper.mode()));
            }
            MessageOutcome::Applied { track, param, value } => {
                self.emit(UiEvent::ParamChanged { track, key: param, value });
            }
            MessageOutcome::Ignored => {}
        }
        outcome
    }

    // Forget one control's binding; the stored table is rewritten.
    pub fn unbind_control(&mut self, key: ControlKey) -> bool {
        self.mapper.unbind(key, &mut *self.store)
    }

    // Apply everything the control input has delivered so far.
    pub fn poll_control(&mut self, rx: &Receiver<ControlMessage>) -> usize {
        let mut handled = 0;
        while let Ok(msg) = rx.try_recv() {
            self.handle_control(msg);
            handled += 1;
        }
        handled
    }

    // ---- snapshots ----

    pub fn snapshot(&self) -> SnapshotDoc {
        SnapshotDoc::capture(&self.pattern, &self.tracks, self.scheduler.tempo(), &self.mapper)
    }

    pub fn save_snapshot(&self) -> Result<String, SnapshotError> {
        self.snapshot().to_json()
    }

    /// Replace the whole session with a document. A document that doesn't
    /// parse or validate changes nothing.
    pub fn load_snapshot(
        &mut self,
        text: &str,
        samples: &dyn SampleResolver,
    ) -> Result<LoadReport, SnapshotError> {
        let doc = snapshot::parse(text)?;
        Ok(self.apply_snapshot(&doc, samples))
    }

    fn apply_snapshot(&mut self, doc: &SnapshotDoc, samples: &dyn SampleResolver) -> LoadReport {
        self.stop();
        self.tracks.destroy_all();
        self.pattern.clear_tracks();
        if doc.num_steps != self.pattern.num_steps() {
            self.pattern.resize_steps(doc.num_steps);
        }
        let tempo = doc.tempo();
        self.scheduler.set_bpm(tempo.bpm);
        self.scheduler.set_swing(tempo.swing_percent);

        let mut report = LoadReport {
            num_tracks: doc.num_tracks,
            num_steps: doc.num_steps,
            missing_samples: Vec::new(),
        };
        for t in 0..doc.num_tracks {
            self.push_track();
            for s in 0..doc.num_steps {
                self.pattern.set_cell(t, s, doc.cell(t, s));
            }
            let Some(track_doc) = doc.track(t) else {
                continue;
            };
            for (key, value) in track_doc.param_values() {
                self.tracks.set_parameter(t, key, value);
            }
            if track_doc.muted {
                self.pattern.set_muted(t, true);
                self.tracks.set_mute(t, true);
            }
            self.tracks.set_key_binding(t, track_doc.key);
            if let Some(name) = &track_doc.sample {
                match samples.resolve(name) {
                    Some(handle) => {
                        self.tracks.set_sample(t, name, handle);
                    }
                    None => {
                        warn!("track {t}: sample {name:?} is missing");
                        self.tracks.mark_missing(t, name);
                        report.missing_samples.push((t, name.clone()));
                    }
                }
            }
        }
        self.mapper.replace(&doc.bindings, &mut *self.store);

        info!(
            "loaded snapshot: {} tracks x {} steps, {} bindings",
            doc.num_tracks,
            doc.num_steps,
            doc.bindings.len()
        );
        self.emit(UiEvent::TracksChanged { count: self.num_tracks() });
        report
    }
}
