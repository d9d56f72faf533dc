use std::io::Write;

use clap::{Args, Parser, Subcommand};
use client::api::{AddMessageRequest, CreateSessionRequest, CreateSessionResponse, SessionRef};
use client::{DisplayMessage, Message, Role, SessionSummary, StreamEvent, Transcript, TurnOutcome, TurnStream};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest_eventsource::{Event as SseEvent, EventSource};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEV_USER_HEADER: &str = "x-dev-user";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing credentials; pass --token (CHATRELAY_TOKEN) or --dev-user (CHATRELAY_DEV_USER)")]
    MissingCredentials,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("event stream failed: {0}")]
    Stream(String),
    #[error("answer dropped after {discarded} characters: {reason}")]
    AnswerDropped { reason: String, discarded: usize },
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "chatrelay-cli", about = "chatrelay sessions and streaming chat from the terminal")]
struct Cli {
    #[arg(long, env = "CHATRELAY_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Session JWT issued by the auth provider.
    #[arg(long, env = "CHATRELAY_TOKEN")]
    token: Option<String>,

    /// User id for servers running with AUTH_DEV_BYPASS.
    #[arg(long, env = "CHATRELAY_DEV_USER")]
    dev_user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    token: Option<String>,
    dev_user: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Sessions(SessionsCommand),
    /// Print a session's messages as JSON.
    Messages {
        session_id: i64,
    },
    /// Ask one question and stream the answer.
    Ask {
        #[arg(long)]
        session: Option<i64>,
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Interactive conversation; `/new` starts over, `/quit` leaves.
    Chat {
        #[arg(long)]
        session: Option<i64>,
    },
}

#[derive(Args, Debug)]
struct SessionsCommand {
    #[command(subcommand)]
    command: SessionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionsSubcommand {
    List,
    Delete { session_id: i64 },
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext {
        base_url: cli.base_url,
        token: cli.token,
        dev_user: cli.dev_user,
    };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Sessions(sessions) => run_sessions(&ctx, sessions).await,
        Command::Messages { session_id } => {
            let messages = session_messages(&ctx, session_id).await?;
            print_json(&serde_json::to_value(&messages)?)
        }
        Command::Ask { session, question } => run_ask(&ctx, session, &question.join(" ")).await,
        Command::Chat { session } => run_chat(&ctx, session).await,
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            status: status.as_u16(),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_sessions(cli: &CliContext, sessions: SessionsCommand) -> Result<(), CliError> {
    match sessions.command {
        SessionsSubcommand::List => {
            let json = api_request(cli, reqwest::Method::GET, "/api/rpc/getSessions", None).await?;
            let sessions: Vec<SessionSummary> = serde_json::from_value(json)?;
            for session in sessions {
                println!("{}\t{}", session.id, session.name);
            }
            Ok(())
        }
        SessionsSubcommand::Delete { session_id } => {
            let body = serde_json::to_value(SessionRef { session_id: Some(session_id) })?;
            api_request(cli, reqwest::Method::POST, "/api/rpc/deleteSession", Some(body)).await?;
            eprintln!("deleted session {session_id}");
            Ok(())
        }
        SessionsSubcommand::Clear => {
            api_request(cli, reqwest::Method::POST, "/api/rpc/deleteAllSessions", None).await?;
            eprintln!("deleted all sessions");
            Ok(())
        }
    }
}

async fn run_ask(cli: &CliContext, session: Option<i64>, question: &str) -> Result<(), CliError> {
    let mut transcript = Transcript::new();
    let session_id = submit_question(cli, session, question, &mut transcript).await?;
    stream_answer(cli, session_id, &mut transcript).await?;
    Ok(())
}

async fn run_chat(cli: &CliContext, session: Option<i64>) -> Result<(), CliError> {
    let mut session_id = session;
    let mut transcript = match session {
        Some(id) => Transcript::from_history(&session_messages(cli, id).await?),
        None => Transcript::new(),
    };
    for message in transcript.messages() {
        println!("{}", format_turn(message));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        match question {
            "/quit" | "/exit" => break,
            "/new" => {
                transcript.clear();
                session_id = None;
                eprintln!("started a new conversation");
                continue;
            }
            _ => {}
        }

        let id = submit_question(cli, session_id, question, &mut transcript).await?;
        session_id = Some(id);

        match stream_answer(cli, id, &mut transcript).await {
            Ok(_) => {}
            Err(error @ (CliError::AnswerDropped { .. } | CliError::Stream(_))) => {
                eprintln!("{error}");
            }
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

/// Persist the user's question: the first one creates the session.
async fn submit_question(
    cli: &CliContext,
    session: Option<i64>,
    question: &str,
    transcript: &mut Transcript,
) -> Result<i64, CliError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(CliError::EmptyQuestion);
    }

    if let Some(id) = session {
        let body = serde_json::to_value(AddMessageRequest {
            session_id: Some(id),
            role: Role::User,
            content: question.to_owned(),
        })?;
        api_request(cli, reqwest::Method::POST, "/api/rpc/addMessage", Some(body)).await?;
        transcript.push_user(question);
        return Ok(id);
    }

    let body = serde_json::to_value(CreateSessionRequest { question: question.to_owned() })?;
    let json = api_request(cli, reqwest::Method::POST, "/api/rpc/createSession", Some(body)).await?;
    let created: CreateSessionResponse = serde_json::from_value(json)?;
    eprintln!("session {}", created.session_id);
    transcript.push(&created.message);
    Ok(created.session_id)
}

/// Consume the relay for one answer, printing the streamed bot message as it
/// grows in the transcript and persisting it once `[DONE]` is seen.
async fn stream_answer(
    cli: &CliContext,
    session_id: i64,
    transcript: &mut Transcript,
) -> Result<String, CliError> {
    let request = http_client(cli)?
        .get(relay_url(&cli.base_url, session_id))
        .header(ACCEPT, "text/event-stream");
    let mut source = EventSource::new(request).map_err(|e| CliError::Stream(e.to_string()))?;

    let mut turn = TurnStream::new();
    let mut indicator = ThinkingIndicator::default();
    let mut printed = 0_usize;
    let result = loop {
        let event = match source.next().await {
            Some(Ok(event)) => event,
            Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                let message = response.text().await.unwrap_or_default();
                break Err(CliError::ServerError { status: status.as_u16(), message });
            }
            Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                break Err(drop_turn(&mut turn, transcript, "stream ended before [DONE]".to_owned()));
            }
            Some(Err(error)) => break Err(drop_turn(&mut turn, transcript, error.to_string())),
        };

        let message = match event {
            SseEvent::Open => {
                turn.open();
                show_indicator(&mut indicator, turn.is_thinking() && printed == 0)?;
                continue;
            }
            SseEvent::Message(message) => message,
        };

        match turn.feed(&message.data, transcript) {
            TurnOutcome::Appended => {
                show_indicator(&mut indicator, false)?;
                let fresh = unprinted(transcript, printed);
                print!("{fresh}");
                std::io::stdout().flush()?;
                printed += fresh.len();
            }
            TurnOutcome::Persist(answer) => break Ok(answer),
            TurnOutcome::Dropped { partial, reason } => {
                break Err(CliError::AnswerDropped { reason, discarded: partial.chars().count() });
            }
            TurnOutcome::Malformed(reason) => eprintln!("skipping malformed chunk: {reason}"),
            TurnOutcome::Skipped | TurnOutcome::Ignored => {}
        }
    };
    source.close();
    println!();

    let answer = match result {
        Ok(answer) => answer,
        Err(error) => {
            show_indicator(&mut indicator, false)?;
            return Err(error);
        }
    };
    let body = serde_json::to_value(AddMessageRequest {
        session_id: Some(session_id),
        role: Role::Bot,
        content: answer.clone(),
    })?;
    api_request(cli, reqwest::Method::POST, "/api/rpc/addMessage", Some(body)).await?;
    turn.finish();
    show_indicator(&mut indicator, turn.is_thinking())?;
    Ok(answer)
}

fn drop_turn(turn: &mut TurnStream, transcript: &mut Transcript, reason: String) -> CliError {
    match turn.handle(StreamEvent::Error(reason.clone()), transcript) {
        TurnOutcome::Dropped { partial, reason } => CliError::AnswerDropped {
            reason,
            discarded: partial.chars().count(),
        },
        _ => CliError::Stream(reason),
    }
}

/// Text of the trailing bot message not yet written to the terminal.
fn unprinted(transcript: &Transcript, printed: usize) -> &str {
    match transcript.last() {
        Some(message) if message.role == Role::Bot => message.content.get(printed..).unwrap_or_default(),
        _ => "",
    }
}

fn format_turn(message: &DisplayMessage) -> String {
    format!("{}: {}", message.role, message.content)
}

/// "thinking…" marker on stderr, shown until the first delta arrives.
#[derive(Debug, Default)]
struct ThinkingIndicator {
    shown: bool,
}

impl ThinkingIndicator {
    const SHOW: &'static str = "thinking\u{2026}";
    const CLEAR: &'static str = "\r\x1b[K";

    /// Terminal text needed to move to `visible`, if anything changes.
    fn update(&mut self, visible: bool) -> Option<&'static str> {
        if self.shown == visible {
            return None;
        }
        self.shown = visible;
        Some(if visible { Self::SHOW } else { Self::CLEAR })
    }
}

fn show_indicator(indicator: &mut ThinkingIndicator, visible: bool) -> Result<(), CliError> {
    if let Some(text) = indicator.update(visible) {
        let mut stderr = std::io::stderr();
        stderr.write_all(text.as_bytes())?;
        stderr.flush()?;
    }
    Ok(())
}

async fn session_messages(cli: &CliContext, session_id: i64) -> Result<Vec<Message>, CliError> {
    let body = serde_json::to_value(SessionRef { session_id: Some(session_id) })?;
    let json = api_request(cli, reqwest::Method::POST, "/api/rpc/getSessionMessages", Some(body)).await?;
    Ok(serde_json::from_value(json)?)
}

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let client = http_client(cli)?;
    let url = format!("{}{}", cli.base_url.trim_end_matches('/'), path);

    let request = client.request(method, &url);
    let request = if let Some(json) = body {
        request.json(&json)
    } else {
        request
    };

    let response = request.send().await?;
    let status = response.status();
    let value = response
        .json::<Value>()
        .await
        .unwrap_or_else(|_| Value::Null);

    if !status.is_success() {
        return Err(CliError::ServerError {
            status: status.as_u16(),
            message: value.to_string(),
        });
    }

    Ok(value)
}

fn http_client(cli: &CliContext) -> Result<reqwest::Client, CliError> {
    Ok(reqwest::Client::builder()
        .default_headers(auth_headers(cli)?)
        .build()?)
}

/// A bearer token wins over the development user header.
fn auth_headers(cli: &CliContext) -> Result<HeaderMap, CliError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = cli.token.as_deref().filter(|t| !t.trim().is_empty()) {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token.trim()))?);
    } else if let Some(user) = cli.dev_user.as_deref().filter(|u| !u.trim().is_empty()) {
        headers.insert(DEV_USER_HEADER, HeaderValue::from_str(user.trim())?);
    } else {
        return Err(CliError::MissingCredentials);
    }
    Ok(headers)
}

fn relay_url(base_url: &str, session_id: i64) -> String {
    format!("{}/relay?sessionId={session_id}", base_url.trim_end_matches('/'))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
