use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use inboxai::input::{UnsupportedRecognizer, recognizer_from_config};
use inboxai::speech::select_voice;
use inboxai::transcript::Item;
use inboxai::{
    Backend, Config, ConfigOverrides, Dispatcher, Entry, HttpBackend, JsonFileStore, PayloadFormat,
    Popup, Role, SilentSpeech, Speaker, SpeechEngine, SpeechRecognizer, SystemSpeech, Theme,
    ThemePreference,
};

/// InboxAI - Voice and text chat for your inbox assistant
#[derive(Parser)]
#[command(name = "inboxai", version, about)]
struct Cli {
    /// Backend endpoint receiving commands
    #[arg(long, env = "INBOXAI_ENDPOINT")]
    endpoint: Option<String>,

    /// Request body shape: "command" or "email"
    #[arg(long, env = "INBOXAI_FORMAT")]
    format: Option<PayloadFormat>,

    /// Sender reported by the "email" body shape
    #[arg(long, env = "INBOXAI_SENDER")]
    sender: Option<String>,

    /// Directory for persisted preferences
    #[arg(long, env = "INBOXAI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Do not speak replies
    #[arg(long, env = "INBOXAI_NO_SPEECH")]
    no_speech: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Send one command and print the reply
    Ask {
        /// Command text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Show the current theme
    Theme {
        /// Flip and persist the theme
        #[arg(long)]
        toggle: bool,
    },
    /// List installed voices
    Voices,
    /// Speak text through the configured voice
    Say {
        /// Text to speak
        #[arg(default_value = "Hi, this is InboxAI. How can I help you?")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,inboxai=info",
        1 => "info,inboxai=debug",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
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
    let overrides = ConfigOverrides {
        endpoint: cli.endpoint,
        payload_format: cli.format,
        sender: cli.sender,
        disable_speech: cli.no_speech,
        data_dir: cli.data_dir,
    };
    let config = Config::load(overrides)?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Action::Ask { text }) => ask(&config, &text.join(" ")).await,
        Some(Action::Theme { toggle }) => theme(&config, toggle),
        Some(Action::Voices) => voices(&config),
        Some(Action::Say { text }) => say(&config, &text),
        None => chat(config).await,
    }
}

fn recognizer(config: &Config) -> Box<dyn SpeechRecognizer> {
    recognizer_from_config(&config.speech, &config.api_keys).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "speech recognition disabled");
        Box::new(UnsupportedRecognizer::new(config.speech.locale.clone()))
    })
}

fn speech_engine(config: &Config) -> Box<dyn SpeechEngine> {
    if config.speech.enabled {
        Box::new(SystemSpeech::detect())
    } else {
        Box::new(SilentSpeech)
    }
}

/// Chat line handled by the client instead of the backend
#[derive(Debug, PartialEq, Eq)]
enum MetaCommand<'a> {
    Quit,
    Theme,
    Voices,
    /// Recognize a recorded clip; the path may be empty
    Listen(&'a str),
}

impl<'a> MetaCommand<'a> {
    /// Parse a meta-command; the name must be a whole word
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        let (name, arg) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(name, arg)| (name, arg.trim()));

        match (name, arg) {
            (":quit", "") => Some(Self::Quit),
            (":theme", "") => Some(Self::Theme),
            (":voices", "") => Some(Self::Voices),
            (":listen", path) => Some(Self::Listen(path)),
            _ => None,
        }
    }
}

/// Interactive chat on stdin/stdout
async fn chat(config: Config) -> anyhow::Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config)?);
    let dispatcher = Dispatcher::new(backend);

    let mut popup = Popup::open(
        speech_engine(&config),
        JsonFileStore::new(config.preferences_path()),
        recognizer(&config),
        config.greeting.clone(),
    );

    for notice in popup.take_notices() {
        eprintln!("note: {}", notice.message());
    }
    println!(
        "Type a command and press Enter. :theme toggles the theme, :voices reloads voices, :listen <file.wav> sends speech, :quit exits."
    );

    let mut view = TerminalView::default();
    view.render(&popup);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = JoinSet::new();

    tracing::info!(endpoint = %config.endpoint, "chat ready");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                // Any input counts as the unlocking user gesture
                popup.gesture();

                let submission = match MetaCommand::parse(&line) {
                    Some(MetaCommand::Quit) => break,
                    Some(MetaCommand::Theme) => {
                        let theme = popup.toggle_theme();
                        println!("theme: {theme}");
                        None
                    }
                    Some(MetaCommand::Voices) => {
                        popup.voices_changed();
                        println!("{} voices available", popup.speaker().voices().len());
                        None
                    }
                    Some(MetaCommand::Listen("")) => {
                        eprintln!("usage: :listen <file.wav>");
                        None
                    }
                    Some(MetaCommand::Listen(path)) => match tokio::fs::read(path).await {
                        Ok(audio) => popup.listen(&audio).await,
                        Err(e) => {
                            eprintln!("cannot read {path}: {e}");
                            None
                        }
                    },
                    None => popup.submit_text(&line),
                };

                if let Some(submission) = submission {
                    let dispatcher = dispatcher.clone();
                    pending.spawn(async move { dispatcher.dispatch(submission).await });
                }
                view.render(&popup);
            }
            Some(done) = pending.join_next(), if !pending.is_empty() => {
                match done {
                    Ok(completion) => {
                        popup.complete(completion);
                    }
                    Err(e) => tracing::error!(error = %e, "request task failed"),
                }
                view.render(&popup);
            }
        }
    }

    // Let outstanding replies land before exiting
    while let Some(done) = pending.join_next().await {
        if let Ok(completion) = done {
            popup.complete(completion);
            view.render(&popup);
        }
    }

    Ok(())
}

/// Send one command and print the reply
async fn ask(config: &Config, text: &str) -> anyhow::Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(config)?);
    let dispatcher = Dispatcher::new(backend);

    let mut popup = Popup::open(
        SilentSpeech,
        JsonFileStore::new(config.preferences_path()),
        Box::new(UnsupportedRecognizer::new(config.speech.locale.clone())),
        config.greeting.clone(),
    );

    match popup.ask(&dispatcher, text).await {
        Some(reply) => println!("{reply}"),
        None => anyhow::bail!("command is empty"),
    }
    Ok(())
}

/// Show or toggle the persisted theme
fn theme(config: &Config, toggle: bool) -> anyhow::Result<()> {
    let mut preference = ThemePreference::load(JsonFileStore::new(config.preferences_path()));
    if toggle {
        preference.toggle();
    }
    println!("{}", preference.theme());
    Ok(())
}

/// List installed voices, marking the one replies would use
fn voices(config: &Config) -> anyhow::Result<()> {
    let engine = SystemSpeech::detect();
    if !engine.is_available() {
        anyhow::bail!("no speech synthesizer found (install espeak-ng)");
    }

    let voices = engine.voices();
    let chosen = select_voice(&voices, &config.speech.locale);
    for voice in &voices {
        let marker = if chosen == Some(voice) { "*" } else { " " };
        println!("{marker} {:<12} {}", voice.lang, voice.name);
    }
    Ok(())
}

/// Speak text and wait for playback to finish
fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    let mut speaker = Speaker::new(SystemSpeech::detect(), config.speech.locale.clone());
    if !speaker.engine().is_available() {
        anyhow::bail!("no speech synthesizer found (install espeak-ng)");
    }

    speaker.unlock();
    if !speaker.speak(text) {
        anyhow::bail!("nothing was spoken");
    }
    speaker.engine_mut().wait()?;
    Ok(())
}

/// Prints transcript rows as they appear
#[derive(Default)]
struct TerminalView {
    shown: usize,
    thinking: usize,
}

impl TerminalView {
    fn render<E: SpeechEngine, S: inboxai::KeyValueStore>(&mut self, popup: &Popup<E, S>) {
        let theme = popup.theme();
        let transcript = popup.transcript();

        for entry in transcript.entries().skip(self.shown) {
            println!("{}", format_entry(entry, theme));
        }
        self.shown = transcript.len();

        let thinking = transcript
            .items()
            .iter()
            .filter(|item| matches!(item, Item::Thinking(_)))
            .count();
        if thinking > self.thinking {
            println!("{}", paint("  … Thinking...", DIM));
        }
        self.thinking = thinking;
    }
}

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

fn paint(text: &str, style: &str) -> String {
    format!("{style}{text}{RESET}")
}

fn format_entry(entry: &Entry, theme: Theme) -> String {
    let (label, style) = match (entry.role, theme) {
        (Role::User, Theme::Dark) => ("you", "\x1b[96m"),
        (Role::User, Theme::Light) => ("you", "\x1b[34m"),
        (Role::Bot, Theme::Dark) => ("inboxai", "\x1b[97m"),
        (Role::Bot, Theme::Light) => ("inboxai", "\x1b[32m"),
    };

    let time = entry.at.with_timezone(&chrono::Local).format("%H:%M");
    let text = entry.text.replace('\n', "\n        ");
    format!("{} {} {text}", paint(&format!("[{time}]"), DIM), paint(&format!("{label}>"), style))
}
