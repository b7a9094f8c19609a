use std::io::{self, BufRead, Write};

use remote::BoxFuture;
use runtime::{Prompt, TextRequest};

/// Terminal dialogs. Reads run on the blocking pool.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask_text(&self, request: TextRequest) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            let line = tokio::task::spawn_blocking(move || {
                match &request.initial {
                    Some(initial) => print!("{} [{initial}] ", request.title),
                    None => print!("{} ", request.title),
                }
                read_line().map(|line| resolve_answer(&line, request.initial.as_deref()))
            })
            .await;
            line.ok().flatten()
        })
    }

    fn confirm(&self, message: String) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let answer = tokio::task::spawn_blocking(move || {
                print!("{message} [y/N] ");
                read_line()
            })
            .await;
            answer.ok().flatten().is_some_and(|line| is_yes(&line))
        })
    }
}

/// `None` on end of input.
fn read_line() -> Option<String> {
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// A bare Enter keeps the prefilled answer.
fn resolve_answer(line: &str, initial: Option<&str>) -> String {
    match initial {
        Some(initial) if line.trim().is_empty() => initial.to_string(),
        _ => line.to_string(),
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
