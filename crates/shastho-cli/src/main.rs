use std::path::{Path, PathBuf};

use base64::Engine;
use clap::{Parser, Subcommand};

use shastho_core::config::Config;
use shastho_core::types::{InlineImage, UserProfile};
use shastho_live::{LiveEvent, LiveSession};
use shastho_media::capture::WavFileCapture;
use shastho_triage::{classify, specialist, ChatSession, GeminiClient};

#[derive(Parser)]
#[command(
    name = "shastho",
    about = "Amar Shastho AI — live health companion and symptom triage chat",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a live audio/video companion session
    Live {
        /// 16kHz mono WAV file used as the microphone feed
        #[arg(long)]
        mic: String,

        /// Still image used as the camera feed
        #[arg(long)]
        camera: Option<String>,
    },

    /// Run the symptom triage chat with a simulated specialist
    Triage,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;

    if config.gemini().resolve_api_key().is_none() {
        tracing::error!(
            "API key is missing; set {} or the config file's gemini.api_key",
            config.gemini().api_key_env
        );
    }

    match cli.command {
        Commands::Live { mic, camera } => run_live(&config, &mic, camera).await?,
        Commands::Triage => run_triage(&config).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
        },
        Commands::Status => {
            println!("Amar Shastho AI v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("Live model: {}", config.live().model);
            println!("Text model: {}", config.triage().model);
            println!(
                "API key: {}",
                if config.gemini().resolve_api_key().is_some() {
                    "configured"
                } else {
                    "missing"
                }
            );
        }
    }

    Ok(())
}

async fn run_live(config: &Config, mic: &str, camera: Option<String>) -> anyhow::Result<()> {
    let capture = WavFileCapture::new(mic, camera.map(PathBuf::from));
    let (mut session, mut events) = LiveSession::connect(config, Box::new(capture)).await?;
    println!("Connected. Press Ctrl-C to end the call.");

    let volume = session.volume();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.disconnect().await;
                println!("Session ended.");
                break;
            }
            event = events.recv() => match event {
                Some(LiveEvent::Text(text)) => println!("{text}"),
                Some(LiveEvent::Audio(chunk)) => {
                    tracing::debug!(
                        start_at = chunk.start_at,
                        duration = chunk.buffer.duration(),
                        volume = *volume.borrow(),
                        "scheduled reply audio"
                    );
                }
                Some(LiveEvent::TurnComplete) => {}
                Some(LiveEvent::Closed) => {
                    session.disconnect().await;
                    println!("Session ended.");
                    break;
                }
                Some(LiveEvent::Error(e)) => {
                    session.disconnect().await;
                    eprintln!("Session error: {e}");
                    break;
                }
                None => break,
            }
        }
    }

    Ok(())
}

async fn run_triage(config: &Config) -> anyhow::Result<()> {
    let client = GeminiClient::new(&config.gemini());
    let triage = config.triage();

    let name: String = dialoguer::Input::new()
        .with_prompt("আপনার নাম")
        .interact_text()?;
    let age: String = dialoguer::Input::new()
        .with_prompt("বয়স")
        .interact_text()?;
    let genders = ["পুরুষ", "মহিলা", "অন্যান্য"];
    let gender_values = ["male", "female", "other"];
    let gender_index = dialoguer::Select::new()
        .with_prompt("লিঙ্গ")
        .items(&genders)
        .default(0)
        .interact()?;
    let symptoms: String = dialoguer::Input::new()
        .with_prompt("আপনার সমস্যা/লক্ষণ")
        .interact_text()?;

    let profile = UserProfile {
        name,
        age,
        gender: gender_values[gender_index].to_string(),
        symptoms,
    };

    println!("বিশ্লেষণ করা হচ্ছে...");
    let classification = classify(&client, &triage, &profile).await;
    let persona = specialist(classification.specialist_id);
    println!();
    println!("{} ({})", persona.name, persona.specialty);
    println!("{}", classification.reasoning);
    println!();

    let mut session = ChatSession::start(
        client.clone(),
        &triage,
        classification.specialist_id,
        &profile,
    );
    println!("{}", session.greeting());
    println!("(commands: /photo <path>, /report, /quit)");

    loop {
        let line: String = dialoguer::Input::new().with_prompt("আপনি").interact_text()?;
        let line = line.trim().to_string();

        if line == "/quit" {
            break;
        }

        if line == "/report" {
            let report = shastho_triage::generate_report(
                &client,
                &triage,
                &profile,
                session.transcript(),
            )
            .await;
            let path = shastho_export::write_report_pdf(
                &report,
                persona.english_name,
                persona.english_specialty,
                &config.export().output_dir,
            )?;
            println!("রিপোর্ট তৈরি হয়েছে: {}", path.display());
            continue;
        }

        if let Some(path) = line.strip_prefix("/photo ") {
            let caption: String = dialoguer::Input::new()
                .with_prompt("ছবির সাথে বার্তা")
                .allow_empty(true)
                .interact_text()?;
            match load_image(Path::new(path.trim())) {
                Ok(image) => {
                    let reply = session.send_turn(&caption, Some(image)).await;
                    println!("{}: {reply}", persona.name);
                }
                Err(e) => eprintln!("ছবি পড়া যায়নি: {e}"),
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let reply = session.send_turn(&line, None).await;
        println!("{}: {reply}", persona.name);
    }

    Ok(())
}

fn load_image(path: &Path) -> anyhow::Result<InlineImage> {
    let bytes = std::fs::read(path)?;
    let mime_type = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Ok(InlineImage {
        mime_type: mime_type.to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}
