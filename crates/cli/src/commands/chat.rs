use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::commands::{load_config, runtime, CommandResult};
use vlog_agent::{AgentRuntime, ConversationSession, SessionId};
use vlog_core::config::AppConfig;
use vlog_db::{connect_with_config, migrations, SqlActivityStore};

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];
const RESET_WORDS: &[&str] = &["reset", "start over"];

/// Interactive conversation over stdin/stdout.
pub fn run() -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let input = BufReader::new(tokio::io::stdin());
        let output = tokio::io::stdout();
        run_with_io(&config, input, output).await
    })
}

/// Drives one session from `input` lines, writing assistant replies to
/// `output`, until the input ends or the user types an exit word.
pub async fn run_with_io<R, W>(config: &AppConfig, input: R, mut output: W) -> CommandResult
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let pool = match connect_with_config(&config.database).await {
        Ok(pool) => pool,
        Err(error) => return CommandResult::failure("chat", "db_connectivity", error.to_string(), 4),
    };
    if let Err(error) = migrations::run_pending(&pool).await {
        pool.close().await;
        return CommandResult::failure("chat", "migration", error.to_string(), 5);
    }

    let agent = AgentRuntime::from_config(config, Arc::new(SqlActivityStore::new(pool.clone())));
    let (session_id, session) = agent.start_session().await;
    let outcome = converse(&agent, session_id, &session, input, &mut output).await;
    agent.end_session(session_id).await;
    pool.close().await;

    let saved = match outcome {
        Ok(saved) => saved,
        Err(failure) => return failure,
    };
    info!(event_name = "cli.chat.finished", saved, "chat session finished");

    if let Err(error) = output.write_all(b"\n").await {
        return CommandResult::failure("chat", "io", error.to_string(), 7);
    }
    if let Err(error) = output.flush().await {
        return CommandResult::failure("chat", "io", error.to_string(), 7);
    }
    CommandResult::success("chat", format!("conversation ended; {saved} activities saved"))
}

/// Returns how many activities were saved before the input ended.
async fn converse<R, W>(
    agent: &AgentRuntime,
    session_id: SessionId,
    session: &ConversationSession,
    input: R,
    output: &mut W,
) -> Result<usize, CommandResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let io_failure =
        |error: std::io::Error| CommandResult::failure("chat", "io", error.to_string(), 7);
    let mut saved = 0usize;
    let mut lines = input.lines();
    let mut transcript = vec![session.opening_prompt()];

    loop {
        for message in transcript.drain(..) {
            output.write_all(format!("{message}\n> ").as_bytes()).await.map_err(io_failure)?;
        }
        output.flush().await.map_err(io_failure)?;

        let Some(line) = lines.next_line().await.map_err(io_failure)? else {
            return Ok(saved);
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let lowered = text.to_lowercase();
        if EXIT_WORDS.contains(&lowered.as_str()) {
            return Ok(saved);
        }
        if RESET_WORDS.contains(&lowered.as_str()) {
            transcript.push(session.reset().await);
            continue;
        }

        let reply = agent
            .handle_message(session_id, text)
            .await
            .map_err(|error| CommandResult::failure("chat", "session", error.to_string(), 8))?;
        transcript.push(reply.message);
        if reply.saved_position.is_some() {
            saved += 1;
            transcript.push(session.fresh_start_prompt().to_string());
        }
    }
}
