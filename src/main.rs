//! Wavelens - watch a live mic, a WAV file or the keyboard synth through the
//! analysis pipeline, logging beats and a per-second feature summary.

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use wavelens::analysis::{AudioFeatures, FeatureExtractor};
use wavelens::audio::{list_devices, AudioManager};
use wavelens::cli::{Args, Command, KeyScript};
use wavelens::error::AudioResult;
use wavelens::params::{
    audio_constants::FRAME_RATE_HZ, AudioConfig, BeatConfig, FFTConfig, SynthConfig,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> AudioResult<()> {
    let mut manager = AudioManager::new(AudioConfig::default(), SynthConfig::default())?;
    let seconds = command.seconds().unwrap_or(0.0);

    match command {
        Command::Devices => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No input devices found");
            }
            for device in devices {
                println!(
                    "[{}] {} ({} ch, {}Hz)",
                    device.index, device.name, device.channels, device.sample_rate
                );
            }
            Ok(())
        }
        Command::Mic { device, .. } => {
            manager.start_microphone(device)?;
            monitor(&mut manager, seconds, None)
        }
        Command::Play { file, .. } => {
            manager.load_file(&file)?;
            monitor(&mut manager, seconds, None)
        }
        Command::Synth {
            keys,
            step,
            waveform,
            ..
        } => {
            manager.start_synthesizer()?;
            if let Some(synth) = manager.synthesizer() {
                for _ in 0..waveform {
                    synth.cycle_waveform();
                }
            }
            monitor(&mut manager, seconds, Some(KeyScript::new(&keys, step)))
        }
    }
}

/// Frame-rate consumer loop: pull, analyze, log
fn monitor(
    manager: &mut AudioManager,
    seconds: f64,
    mut script: Option<KeyScript>,
) -> AudioResult<()> {
    let mut extractor = FeatureExtractor::new(FFTConfig::default(), BeatConfig::default())?;
    let frame = Duration::from_secs_f64(1.0 / FRAME_RATE_HZ as f64);
    let start = Instant::now();

    let mut generation = manager.generation();
    let mut next_summary = 1.0;
    let mut beats = 0usize;

    log::info!("Monitoring {} for {:.1}s", manager.source_name(), seconds);

    loop {
        let frame_start = Instant::now();
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed >= seconds {
            break;
        }

        if manager.generation() != generation {
            extractor.reset();
            generation = manager.generation();
        }

        if let (Some(script), Some(synth)) = (script.as_mut(), manager.synthesizer()) {
            let change = script.advance(elapsed);
            if let Some(key) = change.release {
                synth.note_off(key);
            }
            if let Some(key) = change.press {
                synth.note_on(key);
            }
        }

        let samples = manager.samples_for_fft(extractor.window_size());
        let features = extractor.process(&samples);

        if features.is_beat {
            beats += 1;
            log_beat(&features);
        }

        if elapsed >= next_summary {
            log_summary(manager, &features, beats);
            next_summary += 1.0;
            beats = 0;
        }

        thread::sleep(frame.saturating_sub(frame_start.elapsed()));
    }

    if let Some(faults) = manager.current().map(|s| s.fault_count()).filter(|&n| n > 0) {
        log::warn!("{} stream faults during run", faults);
    }
    manager.stop();
    Ok(())
}

fn log_beat(features: &AudioFeatures) {
    log::info!(
        "BEAT {:.2} | {:>5.1} bpm | bass {:.2} mid {:.2} treble {:.2}",
        features.beat_strength,
        features.tempo_bpm,
        features.bass,
        features.mid,
        features.treble
    );
}

fn log_summary(manager: &AudioManager, features: &AudioFeatures, beats: usize) {
    let mut line = format!(
        "{} | energy {:.2} rms {:.3} peak {:.3} centroid {:.2} | {} beats",
        manager.source_name(),
        features.energy(),
        features.rms,
        features.peak,
        features.spectral_centroid,
        beats
    );
    if let Some(file) = manager.file_player() {
        line.push_str(&format!(
            " | {:.1}/{:.1}s ({:.0}%)",
            file.current_time(),
            file.duration(),
            file.progress() * 100.0
        ));
    }
    if let Some(synth) = manager.synthesizer() {
        let notes: Vec<String> = synth.get_active_notes().iter().map(|n| n.name()).collect();
        line.push_str(&format!(" | notes [{}]", notes.join(" ")));
    }
    log::info!("{}", line);
}
