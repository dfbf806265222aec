//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "wavelens")]
#[command(about = "Real-time audio analysis and keyboard synth", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List audio input devices
    Devices,

    /// Analyze live microphone input
    Mic {
        /// Input device index (see `devices`); host default if omitted
        #[arg(short, long, value_name = "INDEX")]
        device: Option<usize>,

        /// How long to run (seconds)
        #[arg(short, long, default_value = "10")]
        seconds: f64,
    },

    /// Play and analyze a WAV file (loops)
    Play {
        /// WAV file to play
        file: PathBuf,

        /// How long to run (seconds)
        #[arg(short, long, default_value = "10")]
        seconds: f64,
    },

    /// Play a key sequence on the synthesizer and analyze it
    Synth {
        /// Keys to play in order (a w s e d f t g y h u j k l p ;), space = rest
        #[arg(short, long, default_value = "asdfghjk")]
        keys: String,

        /// Time each key is held (seconds)
        #[arg(long, default_value = "0.25")]
        step: f64,

        /// Waveform changes before playing (0 = sine, 1 = square, ...)
        #[arg(short, long, default_value = "0")]
        waveform: usize,

        /// How long to run (seconds)
        #[arg(short, long, default_value = "10")]
        seconds: f64,
    },
}

impl Command {
    /// Run time for the monitoring loop, if the command has one
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Command::Devices => None,
            Command::Mic { seconds, .. }
            | Command::Play { seconds, .. }
            | Command::Synth { seconds, .. } => Some(*seconds),
        }
    }
}

/// Note-on/off transition produced by [`KeyScript::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyChange {
    pub release: Option<char>,
    pub press: Option<char>,
}

/// Plays a string of keys in a loop, one key per `step` seconds
#[derive(Debug, Clone)]
pub struct KeyScript {
    keys: Vec<char>,
    step: f64,
    current: Option<usize>,
}

impl KeyScript {
    pub fn new(keys: &str, step: f64) -> Self {
        Self {
            keys: keys.chars().collect(),
            step: step.max(0.01),
            current: None,
        }
    }

    /// Key transitions needed to be at the right step `elapsed` seconds in
    pub fn advance(&mut self, elapsed: f64) -> KeyChange {
        if self.keys.is_empty() {
            return KeyChange::default();
        }
        let index = (elapsed.max(0.0) / self.step) as usize % self.keys.len();
        if self.current == Some(index) {
            return KeyChange::default();
        }

        let release = self.current.map(|i| self.keys[i]).filter(|k| *k != ' ');
        let press = Some(self.keys[index]).filter(|k| *k != ' ');
        self.current = Some(index);
        KeyChange { release, press }
    }

    /// Key currently held, if any
    pub fn held(&self) -> Option<char> {
        self.current.map(|i| self.keys[i]).filter(|k| *k != ' ')
    }
}
