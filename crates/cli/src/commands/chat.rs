//! `daycoach chat` — Single-message or interactive tutoring session.

use daycoach_assistant::{
    format_for_display, AssistantReply, AssistantService, ChatRequest, ContextAggregator,
    ReplyStatus,
};
use daycoach_config::AppConfig;
use daycoach_core::context::RequestType;
use daycoach_core::locale::Locale;
use daycoach_core::session::SessionId;
use daycoach_core::tier::Tier;
use daycoach_memory::{InMemoryCurriculum, InMemoryProgressStore, InMemorySessionStore};
use daycoach_providers::{build_from_config, ModelRouter};
use daycoach_telemetry::UsageLedger;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEMO_CURRICULUM: &str = "demos/curriculum.toml";

#[derive(clap::Args)]
pub struct ChatArgs {
    /// Send a single message instead of entering interactive mode
    #[arg(short, long)]
    message: Option<String>,

    /// Learner id
    #[arg(long, default_value = "demo")]
    user: String,

    /// Subscription tier (free, premium, pro_plus)
    #[arg(long, default_value = "free")]
    tier: Tier,

    /// Course day the learner is on
    #[arg(long, default_value_t = 1)]
    day: u32,

    /// Course language id
    #[arg(long, default_value = "python")]
    language: String,

    /// Reply locale; defaults to `filter.default_locale`
    #[arg(long)]
    locale: Option<String>,

    /// chat, explain, hint, or code_review
    #[arg(long, default_value = "chat")]
    request_type: RequestType,

    /// Curriculum TOML; defaults to `curriculum_path` or the bundled demo
    #[arg(long)]
    curriculum: Option<PathBuf>,

    /// Print replies as JSON
    #[arg(long)]
    json: bool,
}

struct Session {
    service: AssistantService,
    progress: Arc<InMemoryProgressStore>,
    ledger: Arc<UsageLedger>,
}

pub async fn run(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DAYCOACH_API_KEY    (highest priority)");
        eprintln!("    OPENROUTER_API_KEY  (recommended backend)");
        eprintln!("    OPENAI_API_KEY");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let curriculum_path = args
        .curriculum
        .clone()
        .or_else(|| config.curriculum_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEMO_CURRICULUM));
    let curriculum = InMemoryCurriculum::load(&curriculum_path)
        .map_err(|e| format!("{e} (pass --curriculum or set curriculum_path)"))?;
    tracing::debug!(path = %curriculum_path.display(), days = curriculum.len(), "Curriculum ready");

    let session = build(&config, curriculum, &args);
    let locale = Locale::from_code(args.locale.as_deref().unwrap_or(&config.filter.default_locale));

    let request = |message: &str, day: u32, session_id: Option<SessionId>| {
        let mut request = ChatRequest::new(&args.user, message, day, &args.language)
            .with_tier(args.tier)
            .with_locale(locale)
            .with_request_type(args.request_type);
        if let Some(id) = session_id {
            request = request.with_session(id);
        }
        request
    };

    if let Some(message) = &args.message {
        eprint!("  Thinking...");
        let reply = session.service.chat(&request(message, args.day, None)).await;
        eprint!("\r              \r");
        print_reply(&reply, args.json)?;
    } else {
        println!();
        println!("  DayCoach — Interactive Mode");
        println!();
        println!("  Learner:   {}", args.user);
        println!("  Course:    {} (day {})", args.language, args.day);
        println!("  Tier:      {}", args.tier);
        println!("  Model:     {}", config.models.for_tier(args.tier).model);
        println!();
        println!("  Type your question and press Enter.");
        println!("  `/day N` moves to another course day, `/new` starts a fresh conversation.");
        println!("  Type 'exit' or Ctrl+D to quit.");
        println!();

        let mut day = args.day;
        let mut session_id: Option<SessionId> = None;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        prompt()?;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            match line {
                "" => {}
                "exit" | "quit" => break,
                "/new" => {
                    session_id = None;
                    println!("  Started a new conversation.");
                }
                _ if line.starts_with("/day") => match line["/day".len()..].trim().parse::<u32>() {
                    Ok(next) => {
                        day = next;
                        session.progress.set_position(&args.user, day, &args.language);
                        session.service.on_progress_changed(&args.user);
                        session_id = None;
                        println!("  Moved to day {day}.");
                    }
                    Err(_) => eprintln!("  Usage: /day <number>"),
                },
                message => {
                    eprint!("  ...");
                    let reply = session.service.chat(&request(message, day, session_id.clone())).await;
                    eprint!("\r     \r");
                    if reply.status == ReplyStatus::Answered {
                        session_id = reply.session_id.clone();
                    }
                    print_reply(&reply, args.json)?;
                }
            }
            prompt()?;
        }
        println!();
    }

    print_usage(&session.ledger);
    Ok(())
}

fn build(config: &AppConfig, curriculum: InMemoryCurriculum, args: &ChatArgs) -> Session {
    let progress = Arc::new(InMemoryProgressStore::new());
    progress.set_position(&args.user, args.day, &args.language);

    let aggregator = Arc::new(ContextAggregator::new(
        progress.clone(),
        progress.clone(),
        Arc::new(curriculum),
        config.cache.context_ttl(),
    ));

    let ledger = Arc::new(UsageLedger::new());
    let router = Arc::new(
        ModelRouter::new(build_from_config(config), config.models.clone())
            .with_reporter(ledger.clone())
            .with_timeout(config.request_timeout()),
    );

    let service = AssistantService::from_config(
        config,
        aggregator,
        router,
        Arc::new(InMemorySessionStore::new()),
    );

    Session {
        service,
        progress,
        ledger,
    }
}

fn print_reply(reply: &AssistantReply, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
        return Ok(());
    }

    let label = match &reply.status {
        ReplyStatus::Answered if reply.fallback_used => "Tutor (fallback model)",
        ReplyStatus::Answered => "Tutor",
        ReplyStatus::Cached => "Tutor (cached)",
        ReplyStatus::Rejected { .. } => "Rejected",
        ReplyStatus::Failed => "Error",
    };
    println!();
    for line in format_for_display(&reply.response).lines() {
        println!("  {label} > {line}");
    }
    println!();
    Ok(())
}

fn print_usage(ledger: &UsageLedger) {
    let summary = ledger.summary();
    if summary.calls == 0 {
        return;
    }
    eprintln!(
        "  Usage: {} call(s), {} failed, {} fallback, {} tokens, ~${:.6}",
        summary.calls,
        summary.failures,
        summary.fallbacks,
        summary.total_tokens,
        summary.estimated_cost_usd
    );
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
