use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use voxflow::audio::CpalPlayer;
use voxflow::engines::{
    HttpGenerator, HttpSynthesizer, HttpTranscriber, Player, Synthesizer,
};
use voxflow::pipeline::{Coordinator, TurnOutcome};
use voxflow::Config;

/// Vox - streaming voice-assistant turn pipeline
#[derive(Parser)]
#[command(name = "vox", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive pipeline: WAV paths on stdin, one per line
    Run,
    /// Process a single utterance from a WAV file
    Turn {
        /// Path to the recorded utterance
        file: String,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis output
    TestSynth {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the speech synthesis engine.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voxflow=info",
        1 => "info,voxflow=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::Turn { file }) => turn_from_file(&file).await,
        Some(Command::TestSpeaker) => test_speaker().await,
        Some(Command::TestSynth { text }) => test_synth(&text).await,
        Some(Command::Run) | None => run_pipeline().await,
    }
}

/// Build the coordinator with the HTTP engines and the local audio device
fn build_coordinator(config: &Config) -> anyhow::Result<Arc<Coordinator>> {
    let coordinator = Coordinator::new(
        Arc::new(HttpTranscriber::new(&config.engines)),
        Arc::new(HttpGenerator::new(&config.engines)),
        Arc::new(HttpSynthesizer::new(&config.engines)),
        Arc::new(CpalPlayer::new()?),
        config.pipeline.clone(),
        config.retry.clone(),
    )?;
    Ok(Arc::new(coordinator))
}

/// Interactive loop: each stdin line is a WAV path to feed the pipeline
async fn run_pipeline() -> anyhow::Result<()> {
    let config = Config::load()?;
    let coordinator = build_coordinator(&config)?;

    tracing::info!(
        base_url = %config.engines.base_url,
        llm_model = %config.engines.llm_model,
        "voxflow ready"
    );
    println!("Enter WAV file paths, one per line (Ctrl-D to exit)");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let path = line.trim().to_string();
                if path.is_empty() {
                    continue;
                }

                // Spawn per utterance so intake stays responsive; the
                // coordinator's barge-in lock drops overlapping submissions
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    submit_utterance(&coordinator, &path).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Read one WAV file and run it through a turn
async fn submit_utterance(coordinator: &Coordinator, path: &str) {
    let audio = match tokio::fs::read(path).await {
        Ok(audio) => audio,
        Err(e) => {
            tracing::error!(path, error = %e, "failed to read utterance");
            return;
        }
    };

    match coordinator.process_utterance(&audio).await {
        Ok(TurnOutcome::Completed {
            transcript, reply, ..
        }) => {
            println!("you: {transcript}");
            println!("vox: {reply}");
        }
        Ok(TurnOutcome::Silent) => println!("(heard nothing)"),
        Ok(TurnOutcome::Busy) => println!("(busy, utterance dropped)"),
        Err(e) => tracing::error!(path, error = %e, "turn failed"),
    }
}

/// Process a single utterance and exit
async fn turn_from_file(file: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let coordinator = build_coordinator(&config)?;

    let audio = tokio::fs::read(file).await?;
    match coordinator.process_utterance(&audio).await? {
        TurnOutcome::Completed {
            transcript,
            reply,
            stats,
        } => {
            println!("you: {transcript}");
            println!("vox: {reply}");
            println!(
                "({} clips played, {} skipped)",
                stats.played, stats.skipped
            );
        }
        TurnOutcome::Silent => println!("(heard nothing)"),
        TurnOutcome::Busy => println!("(busy, utterance dropped)"),
    }

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let player = CpalPlayer::new()?;

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);
    player.play_samples(samples, sample_rate).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test synthesis output end to end
async fn test_synth(text: &str) -> anyhow::Result<()> {
    println!("Testing synthesis with text: \"{text}\"\n");

    let config = Config::load()?;
    let synthesizer = HttpSynthesizer::new(&config.engines);

    println!("Synthesizing speech...");
    let audio = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio data", audio.len());

    if audio.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            audio[0], audio[1], audio[2], audio[3]
        );
    }

    println!("Playing audio...");
    let player = CpalPlayer::new()?;
    player.play(&audio).await?;

    println!("\n---");
    println!("If you heard the speech, synthesis is working!");

    Ok(())
}
