use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use turnkit::api::ApiClient;
use turnkit::config::Config;
use turnkit::tools::WorkspaceFileStore;
use turnkit::types::{InterruptDecision, Role};
use turnkit::{EngineUpdate, InterruptCoordinator, TurnPhase, TurnStatus};

/// Prints message text as it grows; tracks how much of each entry is out.
#[derive(Default)]
struct Printer {
    printed: HashMap<usize, usize>,
}

impl Printer {
    fn show(&mut self, update: EngineUpdate) {
        match update {
            EngineUpdate::MessageUpserted { index, message } => {
                if message.role == Role::User {
                    return;
                }
                let seen = self.printed.entry(index).or_insert(0);
                if *seen == 0 {
                    match (message.role, message.is_error) {
                        (_, true) => print!("\n[error] "),
                        (Role::Tool, _) => print!("\n[tool {}] ", message.id),
                        _ => println!(),
                    }
                }
                if let Some(fresh) = message.content.get(*seen..) {
                    print!("{fresh}");
                    *seen = message.content.len();
                }
                let _ = std::io::stdout().flush();
            }
            EngineUpdate::InterruptPending { interrupt, preview } => {
                println!("\n\n== approval needed: {} ==", interrupt.tool_name);
                println!("{}", interrupt.description);
                if !interrupt.is_direct_question {
                    println!("{:#}", interrupt.parameters);
                }
                if let Some(preview) = preview {
                    println!("-- {} --", preview.path);
                    print!("{}", preview.rendered_diff());
                }
            }
            EngineUpdate::InterruptCleared | EngineUpdate::PhaseChanged(_) => {}
        }
    }
}

/// Runs one coordinator call while printing its updates as they arrive.
/// Ctrl-C cancels the sub-stream.
async fn pump<F>(
    call: F,
    cancel: tokio_util::sync::CancellationToken,
    updates: &mut mpsc::UnboundedReceiver<EngineUpdate>,
    printer: &mut Printer,
) -> turnkit::Result<TurnStatus>
where
    F: Future<Output = turnkit::Result<TurnStatus>>,
{
    let interrupt_watch = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    tokio::pin!(call);
    let result = loop {
        tokio::select! {
            result = &mut call => break result,
            Some(update) = updates.recv() => printer.show(update),
        }
    };
    interrupt_watch.abort();

    while let Ok(update) = updates.try_recv() {
        printer.show(update);
    }
    println!();
    result
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

async fn ask_decision(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<InterruptDecision>> {
    loop {
        let Some(answer) = prompt(lines, "approve? [y/n] ").await? else {
            return Ok(None);
        };
        let decision = match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => InterruptDecision::approve(),
            "n" | "no" => InterruptDecision::reject(),
            _ => continue,
        };
        let note = prompt(lines, "note (optional): ").await?.unwrap_or_default();
        let note = note.trim();
        return Ok(Some(if note.is_empty() {
            decision
        } else {
            decision.with_text(note)
        }));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("TURNKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = Config::load()?;
    config.validate()?;

    let client = ApiClient::new(&config)?;
    let store = WorkspaceFileStore::new(config.working_dir.clone());
    let (tx, mut updates) = mpsc::unbounded_channel();
    let mut coordinator =
        InterruptCoordinator::new(Arc::new(client), Arc::new(store)).with_updates(tx);
    let mut printer = Printer::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("turnkit: {} (empty line or Ctrl-D to quit)", config.turn_url());

    while let Some(text) = prompt(&mut lines, "> ").await? {
        let text = text.trim();
        if text.is_empty() {
            break;
        }

        let cancel = coordinator.cancel_token();
        let mut status = pump(
            coordinator.send_turn(text),
            cancel,
            &mut updates,
            &mut printer,
        )
        .await;

        while let Ok(TurnStatus::Interrupted) = status {
            let Some(decision) = ask_decision(&mut lines).await? else {
                return Ok(());
            };
            let cancel = coordinator.cancel_token();
            status = pump(
                coordinator.resolve_interrupt(decision),
                cancel,
                &mut updates,
                &mut printer,
            )
            .await;
            if let Err(error) = &status {
                if coordinator.phase() == TurnPhase::Interrupted {
                    eprintln!("[error] {error}");
                    status = Ok(TurnStatus::Interrupted);
                }
            }
        }

        match status {
            Ok(TurnStatus::Failed { error }) => tracing::debug!(%error, "turn failed"),
            Err(error) => eprintln!("[error] {error}"),
            _ => {}
        }
    }

    Ok(())
}
