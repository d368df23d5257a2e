use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use policybot::composer::{build_messages, render_context};
use policybot::{global_cache, logging, AnswerComposer, AssistantArgs, Conversation, Index};
use policybot::{Answer, RetrievalResult};
use tracing::{debug, error, warn};

#[derive(Parser, Debug)]
#[command(
    name = "policy-bot",
    about = "Ask questions about admissions, fees, attendance and HR policies, answered from the policy corpus"
)]
struct BotCli {
    #[command(flatten)]
    assistant: AssistantArgs,

    /// Single question to answer; omit to start an interactive session
    #[arg(long)]
    query: Option<String>,

    /// Only print the retrieved context and prompt (skip the chat model)
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Print the retrieved passages and their scores after each answer
    #[arg(long, default_value_t = false)]
    show_sources: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = BotCli::parse();
    logging::init(cli.verbose);

    let composer = cli
        .assistant
        .build_composer()
        .context("failed to configure OpenAI clients")?;
    let index = global_cache()
        .get_or_build(&cli.assistant.corpus, composer.embedder())
        .with_context(|| format!("failed to index {}", cli.assistant.corpus.display()))?;
    if index.is_empty() {
        warn!(
            corpus = %cli.assistant.corpus.display(),
            "corpus contains no paragraphs; answers will have no context"
        );
    }

    if let Some(query) = cli.query.as_deref() {
        return ask(&cli, &composer, &index, query);
    }

    let stdin = io::stdin();
    let mut conversation = Conversation::new();
    run_session(&cli, &composer, &index, &mut conversation, stdin.lock())
}

fn ask(cli: &BotCli, composer: &AnswerComposer, index: &Index, query: &str) -> Result<()> {
    if cli.dry_run {
        let sources = composer.retrieve(index, query)?;
        print_dry_run(query, &sources);
        return Ok(());
    }
    let answer = composer.answer(index, query)?;
    print_answer(cli, &answer);
    Ok(())
}

fn run_session<R: BufRead>(
    cli: &BotCli,
    composer: &AnswerComposer,
    index: &Index,
    conversation: &mut Conversation,
    input: R,
) -> Result<()> {
    eprintln!("Ask about policies, leave, fees, admissions... (empty line or `exit` to quit)");
    prompt()?;
    for line in input.lines() {
        let line = line.context("failed to read question")?;
        let query = line.trim();
        if query.is_empty() || query.eq_ignore_ascii_case("exit") {
            break;
        }
        if cli.dry_run {
            match composer.retrieve(index, query) {
                Ok(sources) => print_dry_run(query, &sources),
                Err(err) => error!(error = %err, "question failed"),
            }
        } else {
            match composer.answer_in(conversation, index, query) {
                Ok(answer) => print_answer(cli, &answer),
                Err(err) => error!(error = %err, "question failed"),
            }
        }
        prompt()?;
    }
    debug!(messages = conversation.len(), "session ended");
    Ok(())
}

fn prompt() -> Result<()> {
    let mut stderr = io::stderr();
    write!(stderr, "> ")?;
    stderr.flush()?;
    Ok(())
}

fn print_answer(cli: &BotCli, answer: &Answer) {
    println!("{}", answer.text);
    if cli.show_sources {
        println!("\n--- Sources ---\n{}", render_sources(&answer.sources));
    }
}

fn print_dry_run(query: &str, sources: &[RetrievalResult]) {
    println!("--- Retrieved Context ---\n{}\n", render_context(sources));
    println!("--- Scores ---\n{}", render_sources(sources));
    let messages = build_messages(query, sources);
    for message in &messages {
        println!("--- {} ---\n{}\n", message.role.as_str(), message.content);
    }
    println!("dry-run enabled; skipping chat model call.");
}

fn render_sources(sources: &[RetrievalResult]) -> String {
    if sources.is_empty() {
        return String::from("(none)");
    }
    sources
        .iter()
        .map(|source| {
            let preview: String = source.text.chars().take(80).collect();
            format!(
                "[{}] score {:.4} | {}",
                source.chunk_id,
                source.score,
                preview.replace('\n', " ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
