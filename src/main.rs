mod report;

use std::io::{self, IsTerminal, Read};
use tabula::{Options, Template};

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let template_text = match std::fs::read_to_string(&config.template_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: cannot read template '{}': {err}", config.template_path);
            std::process::exit(1);
        }
    };

    let input = match &config.input_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("error: cannot read input '{path}': {err}");
                std::process::exit(1);
            }
        },
        None => match read_stdin_input() {
            Ok(text) => text,
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        },
    };

    let template = match Template::parse(&template_text) {
        Ok(template) => template,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let result = match template.run_with_metrics(&input, &Options::default()) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&result.table) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: cannot serialize records: {err}");
                std::process::exit(1);
            }
        }
    } else {
        report::print_run(&result.table, &result.metrics, config.color);
    }
}

struct CliConfig {
    template_path: String,
    input_path: Option<String>,
    json: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut template_path: Option<String> = None;
    let mut input_path: Option<String> = None;
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("tabula {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--json" => json = true,
            "--color" => color = true,
            "--no-color" => color = false,
            "--template" | "-t" => {
                let value = args.next().ok_or_else(|| "error: --template expects a path".to_string())?;
                set_once(&mut template_path, value, "template")?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a path".to_string())?;
                set_once(&mut input_path, value, "input")?;
            }
            _ if arg.starts_with("--template=") => {
                let value = arg.trim_start_matches("--template=").to_string();
                set_once(&mut template_path, value, "template")?;
            }
            _ if arg.starts_with("--input=") => {
                let value = arg.trim_start_matches("--input=").to_string();
                set_once(&mut input_path, value, "input")?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                // Positionals: template path first, then input path.
                if template_path.is_none() {
                    template_path = Some(arg);
                } else if input_path.is_none() {
                    input_path = Some(arg);
                } else {
                    return Err(format!("error: unexpected argument '{arg}'"));
                }
            }
        }
    }

    let template_path = template_path
        .ok_or_else(|| format!("error: no template provided\n\n{}", help_text()))?;

    Ok(CliConfig { template_path, input_path, json, color })
}

fn set_once(slot: &mut Option<String>, value: String, what: &str) -> Result<(), String> {
    if slot.is_some() {
        return Err(format!("error: {what} provided multiple times"));
    }
    *slot = Some(value);
    Ok(())
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "tabula {version}

Template-driven text extraction CLI.

Usage:
  tabula [OPTIONS] <template> [input]
  tabula [OPTIONS] --template <path> [--input <path>]

Options:
  -t, --template <path>      Template file to apply.
  -i, --input <path>         Input text file. If omitted, reads stdin.
  --json                     Print records as JSON instead of a table.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success.
  1  Template or run error.
  2  Invalid arguments or missing template.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
