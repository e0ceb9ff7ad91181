use std::env;
use std::io::{self, Write};

use anyhow::Result;
use codeoptimizer_qa::{Config, QueryService, RemotePredictor};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Ask(&'a str),
    Complete(&'a str),
    Questions,
    Stats,
    Reload(&'a str),
    Install(&'a str),
    Assets,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    // Autocomplete input keeps its trailing space, which selects next-word mode.
    if let Some(text) = line.strip_prefix(":complete ") {
        return Command::Complete(text);
    }

    let line = line.trim();
    if !line.starts_with(':') {
        return if line.is_empty() { Command::Empty } else { Command::Ask(line) };
    }

    let (name, arg) = line.split_once(' ').unwrap_or((line, ""));
    match name {
        ":complete" => Command::Complete(arg),
        ":questions" => Command::Questions,
        ":stats" => Command::Stats,
        ":reload" => Command::Reload(arg.trim()),
        ":install" => Command::Install(arg.trim()),
        ":assets" => Command::Assets,
        ":quit" | ":exit" => Command::Quit,
        other => Command::Unknown(other),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut config = Config::from_env();

    // Question source may also be given as the first argument
    if let Some(path) = env::args().nth(1) {
        config.data_path = path.into();
    }

    let predictor_config = config.predictor_config();
    let mut service = QueryService::load(config)?;

    if predictor_config.url.is_some() {
        match RemotePredictor::new(predictor_config) {
            Ok(predictor) => service = service.with_predictor(Box::new(predictor)),
            Err(e) => warn!("Prediction model unavailable, answering from similarity only: {}", e),
        }
    }

    info!("Q&A system initialized with {} questions", service.stats().question_count);
    println!("Ask a question, or use :complete <text>, :questions, :stats, :reload <path>, :install <path>, :assets, :quit");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break; // EOF (Ctrl+D)
        }
        let line = line.trim_end_matches(['\n', '\r']);

        match parse_command(line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Ask(question) => print_json(&service.answer_question(question))?,
            Command::Complete(text) => print_json(&service.autocomplete(text))?,
            Command::Questions => print_json(&service.list_questions())?,
            Command::Stats => print_json(&service.stats())?,
            Command::Assets => print_json(&service.asset_status())?,
            Command::Reload(path) => {
                let path = if path.is_empty() { service.config().data_path.clone() } else { path.into() };
                match service.reload(&path) {
                    Ok(count) => println!("Reloaded {} questions from {:?}", count, path),
                    Err(e) => error!("Reload failed, still serving previous data: {}", e),
                }
            }
            Command::Install(path) => match service.install_source(path) {
                Ok(count) => println!("Installed {} questions", count),
                Err(e) => error!("Install failed: {:#}", e),
            },
            Command::Unknown(name) => eprintln!("Unknown command: {}", name),
        }
    }

    Ok(())
}
