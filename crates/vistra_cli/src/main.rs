//! Interactive command shell for the scene engine.
//!
//! # Responsibility
//! - Run script files given on the command line, then read commands from
//!   stdin one statement per line.
//! - Drain the replay queue between interactive lines and print collected
//!   messages.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use vistra_core::{CommandEngine, Session, Severity};

const USAGE: &str = "usage: vistra [--log-level LEVEL] [--log-dir DIR] [script...]";

struct Args {
    log_level: Option<String>,
    log_dir: Option<String>,
    scripts: Vec<String>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args {
        log_level: None,
        log_dir: None,
        scripts: Vec::new(),
    };
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--log-level" => {
                args.log_level = Some(raw.next().ok_or("--log-level requires a value")?);
            }
            "--log-dir" => {
                args.log_dir = Some(raw.next().ok_or("--log-dir requires a value")?);
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            other => args.scripts.push(other.to_string()),
        }
    }
    Ok(args)
}

fn print_messages(session: &mut Session) {
    for message in session.messages.drain() {
        match message.severity {
            Severity::Info => println!("{}", message.text),
            severity => eprintln!("{}: {}", severity.as_str(), message.text),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(log_dir) = &args.log_dir {
        let level = args
            .log_level
            .as_deref()
            .unwrap_or_else(|| vistra_core::default_log_level());
        if let Err(err) = vistra_core::init_logging(level, log_dir) {
            eprintln!("logging setup failed: {err}");
            return ExitCode::FAILURE;
        }
    }

    let mut session = Session::new();
    let mut engine = CommandEngine::new();

    for path in &args.scripts {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("cannot read script `{path}`: {err}");
                return ExitCode::FAILURE;
            }
        };
        let errors = engine.run_script(&mut session, &source);
        print_messages(&mut session);
        if errors > 0 {
            eprintln!("{path}: {errors} statement(s) reported errors");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        // Cooperative idle ticks: drain any queued replay commands before
        // prompting for the next interactive line.
        while engine.idle(&mut session) {}
        print_messages(&mut session);

        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if !engine.execute(&mut session, line.trim_end()) {
            break;
        }
        print_messages(&mut session);
    }

    print_messages(&mut session);
    ExitCode::SUCCESS
}
