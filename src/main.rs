use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use neonseq::audio::{ChannelBackend, SamplePool};
use neonseq::audio_api::{AudioCommand, Clock, SystemClock};
use neonseq::config::Config;
use neonseq::control_input;
use neonseq::loader::sample_loader;
use neonseq::middle::Session;
use neonseq::pipeline::persistence::{self, FileStore};
use neonseq::pipeline::snapshot::SNAPSHOT_VERSION;
use neonseq::shared::UiEvent;

const AUDIO_QUEUE: usize = 1024;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let config = Config::load(&project_dir);

    let mut pool = SamplePool::default();
    sample_loader::fill_pool(&mut pool, &config.sample_dir(&project_dir));

    // Rendering lives outside this binary; here the command stream just gets logged.
    let (backend, audio_rx) = ChannelBackend::bounded(AUDIO_QUEUE);
    let audio_thread = thread::spawn(move || {
        for cmd in audio_rx.iter() {
            match cmd {
                AudioCommand::Trigger { chain, at } => debug!("audio: trigger chain {} at {at:.3}s", chain.0),
                AudioCommand::RegisterSample { id, buffer } => {
                    debug!("audio: sample {} ({} frames)", id.0, buffer.len())
                }
                other => debug!("audio: {other:?}"),
            }
        }
    });

    let store = FileStore::open(&project_dir);
    debug!("binding store: {}", store.path().display());
    let mut session = Session::with_layout(
        Box::new(backend),
        Box::new(store),
        config.initial_tracks,
        config.num_steps,
        config.tempo(),
    );

    let restored = match persistence::load_session(&project_dir) {
        Some(text) => match session.load_snapshot(&text, &pool) {
            Ok(report) => {
                for (track, name) in &report.missing_samples {
                    warn!("track {track}: {name} not found in the sample pool");
                }
                true
            }
            Err(e) => {
                warn!("saved session not loaded: {e}");
                false
            }
        },
        None => false,
    };
    if !restored {
        // fresh session: hand out pool samples in order
        let names: Vec<String> = pool.entries().iter().map(|e| e.name.clone()).collect();
        for (track, name) in names.iter().take(session.num_tracks()).enumerate() {
            session.assign_sample(track, name, &pool);
        }
    }

    let (control_tx, control_rx) = crossbeam_channel::unbounded();
    let _control = match control_input::connect(config.midi_port.as_deref(), control_tx) {
        Ok(input) => {
            info!("MIDI control input: {}", input.port_name());
            Some(input)
        }
        Err(e) => {
            warn!("running without MIDI control input: {e}");
            None
        }
    };

    let ui = session.subscribe_ui();
    let clock = SystemClock::new();
    let lookahead = config.lookahead_ms as f64 / 1000.0;
    let poll = Duration::from_millis(config.poll_interval_ms);

    let start = clock.now();
    let end = start
        + config.play_steps(session.num_steps()) as f64 * session.tempo().step_duration();
    session.start(start);
    loop {
        let now = clock.now();
        if now >= end {
            break;
        }
        session.poll_control(&control_rx);
        session.advance(now + lookahead);
        session.drain_ui(now);
        for event in ui.try_iter() {
            match event {
                UiEvent::StepCursor { step, .. } => debug!("cursor {step}"),
                other => info!("{other:?}"),
            }
        }
        thread::sleep(poll);
    }
    session.stop();

    let snapshot = session.save_snapshot()?;
    persistence::save_session(&project_dir, &snapshot)?;
    info!(
        "session saved (v{SNAPSHOT_VERSION}, {} tracks) to {}",
        session.num_tracks(),
        persistence::neonseq_dir(&project_dir).display()
    );

    drop(session); // closes the audio queue
    if audio_thread.join().is_err() {
        warn!("audio log thread panicked");
    }
    Ok(())
}
