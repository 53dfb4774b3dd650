//! Courtsim CLI - Courtroom Dialogue Simulator
//!
//! A command-line front-end for running simulated courtroom scenes:
//! scripted scenarios or AI-generated proceedings with optional live
//! user turns.

use clap::{Parser, ValueEnum};
use colored::Colorize;
use courtsim_core::{
    ChannelRecognizer, DialogueMode, ElevenLabsSynthesizer, EventKind, MockGenerator,
    OpenAiGenerator, SimConfig, SimulationController, SimulationEvent, TurnGenerator, audio,
    default_config,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Play the scenario's pre-authored script.
    Scripted,
    /// Generate the proceedings turn by turn.
    Ai,
}

impl From<CliMode> for DialogueMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Scripted => DialogueMode::Scripted,
            CliMode::Ai => DialogueMode::Ai,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "courtsim",
    version,
    about = "Courtroom Dialogue Simulator",
    long_about = "Runs a simulated courtroom scene with synthesized voices.\n\
                  While a scene is playing, type 'p' to pause, 'r' to resume,\n\
                  's' to stop. In AI mode, any other input is taken as your\n\
                  spoken statement when it is your turn."
)]
struct Cli {
    /// Scenario to play (name or id from the config)
    #[arg(value_name = "SCENARIO", default_value = "Opening Statements")]
    scenario: String,

    /// Dialogue mode
    #[arg(short, long, value_enum, default_value_t = CliMode::Scripted)]
    mode: CliMode,

    /// TOML config with participants and scenarios (defaults to the
    /// built-in courtroom cast)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the session audio to a WAV file when the scene ends
    /// (the filename defaults to one derived from the scenario name)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    save_audio: Option<Option<PathBuf>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => default_config(),
    };

    let scenario = config.find_scenario(&cli.scenario)?.clone();
    let lines = config.lines_for(&scenario);
    let participants = config.participants.clone();

    let synthesizer = Arc::new(ElevenLabsSynthesizer::new(
        env::var("ELEVENLABS_API_KEY").ok(),
    ));

    let generator: Arc<dyn TurnGenerator> = match env::var("OPENAI_API_KEY") {
        Ok(api_key) if !api_key.trim().is_empty() => {
            let api_base = env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            Arc::new(OpenAiGenerator::new(api_base, api_key))
        }
        _ => {
            eprintln!(
                "{}",
                "Warning: OPENAI_API_KEY not set. AI turns use canned lines.".yellow()
            );
            Arc::new(MockGenerator)
        }
    };

    let (recognizer, transcripts) = ChannelRecognizer::new();
    let controller = Arc::new(
        SimulationController::new(synthesizer, generator).with_recognizer(Arc::new(recognizer)),
    );

    subscribe_console_output(&controller);

    // Print header
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - {}", "Courtsim".bold(), scenario.name)
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    if !scenario.description.is_empty() {
        println!("  {}", scenario.description.dimmed());
    }
    println!();
    println!("{}", "Participants:".bold());
    for (i, p) in participants.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            i + 1,
            p.display_name.bright_cyan(),
            p.role.display_name().yellow()
        );
    }
    println!();
    println!(
        "{}",
        "Controls: p = pause, r = resume, s = stop".dimmed()
    );
    println!("{}", "─".repeat(70).dimmed());

    // Keyboard controls (and user transcripts in AI mode) come from stdin.
    let control = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let mut input = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = input.next_line().await {
                match line.trim() {
                    "" => {}
                    "p" => controller.pause(),
                    "r" => controller.resume(),
                    "s" => controller.stop(),
                    text => {
                        // Ignored unless a user turn is waiting.
                        let _ = transcripts.try_send(text.to_string());
                    }
                }
            }
        })
    };

    controller
        .run(cli.mode.into(), &participants, Some(&lines))
        .await;
    control.abort();

    if let Some(path) = &cli.save_audio {
        let path = match path {
            Some(path) => path.clone(),
            None => PathBuf::from(audio::session_filename(&scenario.name)),
        };
        let recording = controller.session_recording();
        if recording.samples.is_empty() {
            eprintln!("{}", "No audio was played; nothing to save.".yellow());
        } else {
            audio::write_wav(&path, &recording.samples, recording.sample_rate)?;
            println!(
                "{} {}",
                "Session audio saved to".bold(),
                path.display().to_string().bright_white()
            );
        }
    }

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", "  Court is adjourned.".bright_green().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    Ok(())
}

/// Print lifecycle events to the console.
fn subscribe_console_output(controller: &Arc<SimulationController>) {
    let events = controller.events();

    events.subscribe(EventKind::LineStart, |event| {
        if let SimulationEvent::LineStart {
            text,
            speaker,
            participant_name,
        } = event
        {
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                participant_name.bright_cyan().bold(),
                format!("({})", speaker.display_name()).yellow()
            );
            for line in textwrap(text, 66).lines() {
                println!("  {}", line);
            }
            println!();
        }
    });

    events.subscribe(EventKind::Pause, |_| {
        println!("{}", "  ⏸ Paused".yellow());
    });

    events.subscribe(EventKind::Resume, |_| {
        println!("{}", "  ▶ Resumed".green());
    });

    events.subscribe(EventKind::Stop, |_| {
        println!("{}", "  ⏹ Stopped".red());
    });

    events.subscribe(EventKind::UserSpeechStart, |_| {
        println!(
            "{}",
            "  🎤 Your turn - type your statement and press Enter:"
                .bright_magenta()
                .bold()
        );
    });

    events.subscribe(EventKind::UserSpeechRecognized, |event| {
        if let SimulationEvent::UserSpeechRecognized { transcript } = event {
            println!("{} {}", "▶ You:".bright_magenta().bold(), transcript);
            println!();
        }
    });

    events.subscribe(EventKind::UserSpeechError, |event| {
        if let SimulationEvent::UserSpeechError { reason } = event {
            eprintln!("{} {}", "  Speech input unavailable:".yellow(), reason);
        }
    });

    events.subscribe(EventKind::Complete, |_| {
        println!("{}", "  The proceedings have concluded.".bright_green());
    });
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        if current_line_len + word.len() + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word.len();
    }

    result
}
