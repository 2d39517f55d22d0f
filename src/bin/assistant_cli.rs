use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use assistant_platform::core::traits::DEFAULT_MESSAGE_PAGE_SIZE;
use assistant_platform::{
    Assistant, HttpAssistantsClient, LanguageModelLevel, Medium, OpenAiPlatform, Platform, Role,
    RunStatus, Thread,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_INTERVAL: Duration = Duration::from_millis(750);
const MAX_POLLS_PER_TURN: usize = 240;

struct CliConfig {
    action: String,
    name: String,
    instructions: String,
    medium: Medium,
    level: LanguageModelLevel,
    model: Option<String>,
    context: Option<String>,
    delete_assistant: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assistant_platform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = parse_config(std::env::args().skip(1).collect())?;
    let client = HttpAssistantsClient::new(None)
        .map_err(|e| format!("failed to build assistants client: {e}"))?;
    let platform = OpenAiPlatform::new(Arc::new(client));

    platform
        .suggest_model(config.medium, config.level, &[])
        .map_err(|e| format!("{} cannot serve medium {}: {e}", platform.name(), config.medium))?;

    let mut assistant = Assistant::new(config.action.clone(), config.medium)
        .with_name(config.name.clone())
        .with_instructions(config.instructions.clone());
    if let Some(model) = &config.model {
        assistant = assistant.with_language_model(model.clone());
    }

    let outcome = platform
        .reconcile_assistant(&mut assistant, config.level, &[])
        .await?;
    eprintln!(
        "assistant_cli: action={}, assistant={}, model={}, outcome={outcome:?}, commands=/exit /quit /new",
        assistant.action(),
        assistant.service_id.as_deref().unwrap_or("-"),
        platform.target_model(&assistant),
    );

    let mut thread = open_thread(&platform, &assistant, &config).await?;
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        let bytes = stdin.read_line(&mut input)?;
        if bytes == 0 {
            break;
        }

        let user_text = input.trim();
        if user_text.is_empty() {
            continue;
        }

        if user_text.eq_ignore_ascii_case("/exit") || user_text.eq_ignore_ascii_case("/quit") {
            break;
        }

        if user_text.eq_ignore_ascii_case("/new") {
            platform.delete_thread(&thread).await?;
            thread = open_thread(&platform, &assistant, &config).await?;
            println!("(thread reset)");
            continue;
        }

        if let Err(err) = platform.reply(&assistant, &mut thread, user_text).await {
            eprintln!("error: {err}");
            continue;
        }

        if let Err(err) = wait_for_run(&platform, &mut thread).await {
            eprintln!("error: {err}");
            continue;
        }

        print_latest_reply(&platform, &thread).await;
    }

    platform.delete_thread(&thread).await?;
    if config.delete_assistant {
        platform.delete_assistant(&assistant).await?;
    }

    Ok(())
}

/// Starts a thread and waits out its opening run so replies can be added.
async fn open_thread(
    platform: &OpenAiPlatform,
    assistant: &Assistant,
    config: &CliConfig,
) -> Result<Thread, Box<dyn std::error::Error>> {
    let mut thread = Thread::new(config.action.clone(), config.medium);
    platform
        .start_thread(assistant, &mut thread, config.context.as_deref())
        .await?;
    wait_for_run(platform, &mut thread).await?;
    Ok(thread)
}

async fn wait_for_run(
    platform: &OpenAiPlatform,
    thread: &mut Thread,
) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..MAX_POLLS_PER_TURN {
        platform.refresh_thread(thread).await?;
        if thread.is_settled() {
            return Ok(());
        }
        if thread.status == Some(RunStatus::RequiresAction) {
            return Err("run requires action; function calling is not supported".into());
        }
        if thread.status.is_none() {
            return Err(format!(
                "run ended with unrecognized status {:?}",
                thread.raw_status.as_deref().unwrap_or_default()
            )
            .into());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Err("timed out waiting for the run to settle".into())
}

async fn print_latest_reply(platform: &OpenAiPlatform, thread: &Thread) {
    let page = match platform
        .fetch_messages(thread, DEFAULT_MESSAGE_PAGE_SIZE, None)
        .await
    {
        Ok(page) => page,
        Err(err) => {
            eprintln!("error: {err}");
            return;
        }
    };

    let Some(latest) = page
        .iter()
        .rev()
        .find(|message| message.role() == Role::Assistant)
    else {
        println!("[no assistant reply; status={:?}]", thread.raw_status);
        return;
    };

    for content in latest.content() {
        match content.text() {
            Some(text) => println!("{text}"),
            None => println!("[{content:?}]"),
        }
    }
}

fn parse_config(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig {
        action: std::env::var("ASSISTANT_CLI_ACTION")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "chat".to_string()),
        name: "assistant_cli".to_string(),
        instructions: "You are a helpful assistant.".to_string(),
        medium: Medium::Text,
        level: LanguageModelLevel::default(),
        model: std::env::var("ASSISTANT_CLI_MODEL")
            .ok()
            .filter(|value| !value.trim().is_empty()),
        context: None,
        delete_assistant: false,
    };

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--action" => config.action = flag_value(&args, i)?,
            "--name" => config.name = flag_value(&args, i)?,
            "--instructions" => config.instructions = flag_value(&args, i)?,
            "--context" => config.context = Some(flag_value(&args, i)?),
            "--model" => config.model = Some(flag_value(&args, i)?),
            "--medium" => {
                config.medium = parse_medium(&flag_value(&args, i)?)
                    .ok_or("invalid --medium value (expected text|json|code)")?;
            }
            "--level" => {
                config.level = parse_level(&flag_value(&args, i)?)
                    .ok_or("invalid --level value (expected basic|standard|advanced)")?;
            }
            "--delete-assistant" => {
                config.delete_assistant = true;
                i += 1;
                continue;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(format!("unknown argument: {other}").into());
            }
        }
        i += 2;
    }

    Ok(config)
}

fn flag_value(args: &[String], i: usize) -> Result<String, Box<dyn std::error::Error>> {
    let flag = &args[i];
    let value = args
        .get(i + 1)
        .ok_or_else(|| format!("missing value for {flag}"))?
        .trim()
        .to_string();
    if value.is_empty() {
        return Err(format!("{flag} must be non-empty").into());
    }
    Ok(value)
}

fn parse_medium(value: &str) -> Option<Medium> {
    match value.to_ascii_lowercase().as_str() {
        "text" => Some(Medium::Text),
        "json" => Some(Medium::Json),
        "code" => Some(Medium::Code),
        _ => None,
    }
}

fn parse_level(value: &str) -> Option<LanguageModelLevel> {
    match value.to_ascii_lowercase().as_str() {
        "basic" => Some(LanguageModelLevel::Basic),
        "standard" => Some(LanguageModelLevel::Standard),
        "advanced" => Some(LanguageModelLevel::Advanced),
        _ => None,
    }
}

fn print_help() {
    println!(
        "Usage:\n  cargo run --bin assistant_cli -- [--action ACTION] [--name NAME] [--instructions TEXT] [--medium text|json|code] [--level basic|standard|advanced] [--model MODEL] [--context TEXT] [--delete-assistant]\n\nEnv:\n  OPENAI_API_KEY\n  OPENAI_BASE_URL\n  ASSISTANT_CLI_ACTION\n  ASSISTANT_CLI_MODEL\n  RUST_LOG\n\nCommands:\n  /new     delete the current thread and start over\n  /exit    quit\n  /quit    quit"
    );
}
