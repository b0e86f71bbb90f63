use std::{
    fs,
    path::PathBuf,
    process,
};
use clap::Parser;
use rustyline::{error::ReadlineError, DefaultEditor};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use lizp::{Engine, Error};

#[derive(Parser, Debug)]
#[command(name = "lizp", version, about = "A small untyped lambda calculus", long_about = None)]
struct Cli {
    /// Source file to run. Without one, an interactive session starts.
    file: Option<PathBuf>,

    /// Log filter, e.g. `lizp=debug`. Falls back to `RUST_LOG`.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    /// Don't print the banner.
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
        None => return,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn report(errors: &[Error], code: &str) {
    for err in errors {
        eprintln!("error: {}", err.in_context(code));
    }
}

fn run_file(path: &PathBuf) -> Result<bool, Box<dyn std::error::Error>> {
    let code = fs::read_to_string(path)
        .map_err(|err| format!("could not read '{}': {}", path.display(), err))?;
    let mut engine = Engine::new();
    match engine.execute(&code) {
        Ok(outcomes) => {
            for outcome in outcomes {
                println!("{}", outcome);
            }
            Ok(true)
        },
        Err(errors) => {
            report(&errors, &code);
            Ok(false)
        },
    }
}

/// How many more delimiters `line` opens than it closes, ignoring string contents.
fn balance(line: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        match (in_string, c) {
            (true, _) if escaped => escaped = false,
            (true, '\\') => escaped = true,
            (true, '"') => in_string = false,
            (true, _) => {},
            (false, '"') => in_string = true,
            (false, ';') => break,
            (false, '(') | (false, '{') => depth += 1,
            (false, ')') | (false, '}') => depth -= 1,
            (false, _) => {},
        }
    }
    depth
}

fn run_command(engine: &Engine, command: &str) -> bool {
    match command {
        ":env" => {
            for (name, value) in engine.bindings() {
                println!("{} = {}", name, value);
            }
        },
        ":stats" => {
            let stats = engine.stats();
            println!(
                "environments: {} ({} linked), bindings: {}, unbound parameters: {}",
                stats.total_envs,
                stats.linked_envs,
                stats.total_bindings,
                stats.unbound_slots,
            );
        },
        ":quit" | ":q" => return false,
        _ => eprintln!("unknown command '{}' (try :env, :stats or :quit)", command),
    }
    true
}

fn repl(quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        println!("Lizp Version {}", env!("CARGO_PKG_VERSION"));
    }

    let mut rl = DefaultEditor::new()?;
    let mut engine = Engine::new();
    let mut buf = String::new();
    let mut depth = 0;

    loop {
        let prompt = if buf.is_empty() { "lizp> " } else { "...   " };
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                buf.clear();
                depth = 0;
                continue;
            },
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        if buf.is_empty() && line.trim().starts_with(':') {
            rl.add_history_entry(line.as_str())?;
            if run_command(&engine, line.trim()) {
                continue;
            } else {
                break;
            }
        }

        if !buf.is_empty() {
            buf.push('\n');
        }
        buf.push_str(&line);
        depth += balance(&line);

        // Wait until every open delimiter is closed.
        if depth > 0 {
            continue;
        }

        rl.add_history_entry(buf.as_str())?;
        match engine.execute(&buf) {
            Ok(outcomes) => {
                for outcome in outcomes {
                    println!("{}", outcome);
                }
            },
            Err(errors) => report(&errors, &buf),
        }
        buf.clear();
        depth = 0;
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let result = match &cli.file {
        Some(path) => run_file(path),
        None => repl(cli.quiet).map(|()| true),
    };

    match result {
        Ok(true) => {},
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(2);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_counts_open_delimiters() {
        assert_eq!(balance("{(\\x.x) 1}"), 0);
        assert_eq!(balance("{(\\x."), 2);
        assert_eq!(balance("x) 1}"), -2);
        assert_eq!(balance("\"({\" {"), 1);
        assert_eq!(balance("\"a\\\"(\" ; ("), 0);
    }
}
