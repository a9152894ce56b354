//! Terminal client for the interview digital twin

use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twin_interview::client::{
    HttpApiClient, InterviewBackend, LoggingClient, ProfileStore, SessionClient, SessionId,
};
use twin_interview::config::ClientConfig;
use twin_interview::profile::{Profile, ProfileEdit, UserRecord, EDITABLE_FIELDS};
use twin_interview::runtime::{InterviewHandle, UiEvent};
use twin_interview::state_machine::ConvContext;
use twin_interview::transcript::{ChatSurface, Message};

/// Longest message accepted at the prompt
const MAX_INPUT_CHARS: usize = 500;

#[derive(Parser)]
#[command(name = "twin-interview")]
#[command(version)]
#[command(about = "Chat with a candidate's digital twin")]
struct Cli {
    /// Base URL of the remote API (overrides TWIN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Chat surface: visitor or interview (overrides TWIN_CHAT_SURFACE)
    #[arg(long, global = true)]
    surface: Option<ChatSurface>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation (the default)
    Chat(ChatArgs),

    /// List stored profiles
    List,

    /// Print a stored profile as JSON
    Show {
        /// Profile id
        subject: String,
    },

    /// Create a new profile and print its id
    Create(CreateArgs),

    /// Change a single profile field
    Set(SetArgs),

    /// Print the server-side transcript of a session
    History {
        /// Session id
        session: String,
    },
}

#[derive(Args, Default)]
struct ChatArgs {
    /// Profile the twin impersonates (overrides TWIN_SUBJECT_ID)
    subject: Option<String>,
}

#[derive(Args)]
struct CreateArgs {
    /// JSON file with a profile to start from (as printed by `show`)
    #[arg(long)]
    from: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    location: Option<String>,
}

impl CreateArgs {
    fn edits(&self) -> impl Iterator<Item = ProfileEdit> {
        [
            self.name.clone().map(ProfileEdit::Name),
            self.email.clone().map(ProfileEdit::Email),
            self.phone.clone().map(ProfileEdit::Phone),
            self.location.clone().map(ProfileEdit::Location),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Args)]
struct SetArgs {
    /// Profile id
    subject: String,

    /// Field key, e.g. name, email, target_position
    field: String,

    /// New value; list fields take comma-separated values
    value: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twin_interview=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Configuration
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(surface) = cli.surface {
        config.surface = surface;
    }

    let client = LoggingClient::new(HttpApiClient::from_config(&config)?);
    tracing::info!(api = %config.api_base_url, surface = %config.surface, "Remote API configured");

    match cli.command.unwrap_or(Commands::Chat(ChatArgs::default())) {
        Commands::Chat(args) => {
            if let Some(subject) = args.subject {
                config.subject_id = subject;
            }
            chat(client, &config).await?;
        }
        Commands::List => list_profiles(&client).await?,
        Commands::Show { subject } => {
            let record = client.get_profile(&subject).await?;
            println!("{}", serde_json::to_string_pretty(&record.profile_data)?);
        }
        Commands::Create(args) => {
            let record = create_profile(&client, &args).await?;
            println!("Created profile {}", record.id);
        }
        Commands::Set(args) => set_field(&client, &args).await?,
        Commands::History { session } => {
            print_history(&client, &SessionId::new(session), config.surface).await?;
        }
    }

    Ok(())
}

async fn chat<C>(client: C, config: &ClientConfig) -> Result<(), Box<dyn Error>>
where
    C: InterviewBackend + 'static,
{
    let client = Arc::new(client);
    let surface = config.surface;
    let handle = InterviewHandle::spawn(
        ConvContext::new(config.subject_id.as_str(), surface),
        Arc::clone(&client),
    );

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(UiEvent::MessageAppended { message }) => print_message(surface, &message),
                Ok(UiEvent::TranscriptCleared) => println!("--- new conversation ---"),
                Ok(UiEvent::StateChange { awaiting_reply, .. }) => {
                    if awaiting_reply {
                        println!("(thinking...)");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Display fell behind the conversation");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    handle.initialize().await?;
    println!("Commands: /reset, /session, /history, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "/quit" | "/exit" => break,
            "/reset" => handle.reset().await?,
            "/session" => match handle.snapshot().session_id {
                Some(id) => println!("session: {id}"),
                None => println!("no session yet"),
            },
            "/history" => match handle.snapshot().session_id {
                Some(id) => {
                    if let Err(e) = print_history(client.as_ref(), &id, surface).await {
                        println!("Could not load history: {e}");
                    }
                }
                None => println!("no session yet"),
            },
            _ if input.chars().count() > MAX_INPUT_CHARS => {
                println!("Messages are limited to {MAX_INPUT_CHARS} characters.");
            }
            _ if handle.snapshot().awaiting_reply => {
                println!("(still waiting for the last reply)");
            }
            _ => handle.send(input).await?,
        }
    }

    handle.teardown().await;
    printer.await?;
    Ok(())
}

fn print_message(surface: ChatSurface, message: &Message) {
    println!(
        "[{}] {}: {}",
        message.timestamp.format("%H:%M:%S"),
        surface.label(message.role),
        message.content
    );
}

async fn print_history<C>(
    client: &C,
    session_id: &SessionId,
    surface: ChatSurface,
) -> Result<(), Box<dyn Error>>
where
    C: SessionClient + ?Sized,
{
    let messages = client.fetch_history(session_id).await?;
    if messages.is_empty() {
        println!("No messages in session {session_id}");
    }
    for message in &messages {
        print_message(surface, message);
    }
    Ok(())
}

async fn list_profiles<S: ProfileStore>(store: &S) -> Result<(), Box<dyn Error>> {
    let profiles = store.list_profiles().await?;
    if profiles.is_empty() {
        println!("No profiles stored");
    }
    for profile in profiles {
        let name = if profile.name.is_empty() {
            "(unnamed)"
        } else {
            profile.name.as_str()
        };
        println!("{}\t{name}", profile.id);
    }
    Ok(())
}

/// Build a profile from a file and flags, validate it, then store it
async fn create_profile<S: ProfileStore>(
    store: &S,
    args: &CreateArgs,
) -> Result<UserRecord, Box<dyn Error>> {
    let mut profile = match &args.from {
        Some(path) => serde_json::from_str::<Profile>(&tokio::fs::read_to_string(path).await?)?,
        None => Profile::default(),
    };
    for edit in args.edits() {
        profile.apply(edit);
    }
    profile.validate()?;

    let record = store.create_profile(&profile).await?;
    tracing::info!(subject = %record.id, "Profile created");
    Ok(record)
}

/// Read, edit, validate, then write back a single profile field
async fn set_field<S: ProfileStore>(store: &S, args: &SetArgs) -> Result<(), Box<dyn Error>> {
    let edit = ProfileEdit::parse(&args.field, &args.value)
        .map_err(|e| format!("{e} (expected one of: {})", EDITABLE_FIELDS.join(", ")))?;

    let mut profile = store.get_profile(&args.subject).await?.profile_data;
    profile.apply(edit);
    profile.validate()?;

    let record = store.update_profile(&args.subject, &profile).await?;
    tracing::info!(subject = %record.id, field = %args.field, "Profile updated");
    println!("Updated {} on profile {}", args.field, record.id);
    Ok(())
}
