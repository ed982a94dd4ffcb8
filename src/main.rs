use clap::Parser;
use serde::Serialize;

use complua::{Complua, CompluaOptions, CompileError};

#[derive(Parser)]
#[command(name = "complua")]
#[command(about = "A source-to-source compiler for an extended Lua dialect")]
#[command(version)]
struct Cli {
    /// Output file
    #[arg(short = 'o', default_value = "out.luac")]
    output: String,

    /// Expand #debug directives
    #[arg(long = "debug")]
    debug: bool,

    /// Output the result as JSON (ok, output, error)
    #[arg(long = "json")]
    json: bool,

    /// Input source file
    #[arg()]
    input: String,
}

#[derive(Serialize)]
struct CompileReport {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("complua: cannot read {}: {}", cli.input, e);
            std::process::exit(1);
        }
    };

    let compiler = Complua::new(CompluaOptions {
        debug: cli.debug,
        ..Default::default()
    });

    match compiler.compile(&source, &cli.input) {
        Ok(program) => {
            if let Err(e) = std::fs::write(&cli.output, program) {
                eprintln!("complua: cannot write {}: {}", cli.output, e);
                std::process::exit(1);
            }
            if cli.json {
                let report = CompileReport {
                    ok: true,
                    output: Some(cli.output.clone()),
                    error: None,
                };
                println!("{}", serde_json::to_string(&report).unwrap_or_default());
            }
        }
        Err(err) => {
            // Unmappable interpreter output is printed raw; everything
            // else gets the single-line diagnostic form
            let message = match &err {
                CompileError::Interpreter(raw) => raw.clone(),
                other => format!("complua: {}", other),
            };
            if cli.json {
                let report = CompileReport {
                    ok: false,
                    output: None,
                    error: Some(message.clone()),
                };
                println!("{}", serde_json::to_string(&report).unwrap_or_default());
            }
            eprintln!("{}", message);
            std::process::exit(1);
        }
    }
}
