use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rlox::ast_printer::AstPrinter;
use rlox::diagnostics::Diagnostics;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Dump the AST as JSON instead of the prefix form
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session
    Repl,
}

/// Reads the contents of a file into a `Vec<u8>` via a memory map.
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length files cannot be mapped.
    if len == 0 {
        return Ok(Vec::new());
    }

    let mmap =
        unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap.to_vec())
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'rlox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// One pass of the full pipeline: scan → parse → resolve → interpret.
///
/// `next_id` carries the parser's expression-id watermark between calls so
/// the interpreter's side-table stays consistent across an interactive
/// session.  Evaluation is skipped as soon as any static error is flagged.
fn run(
    source: &[u8],
    interpreter: &mut Interpreter,
    diagnostics: &mut Diagnostics,
    next_id: &mut u32,
) {
    let mut tokens = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                debug!("Lex error: {}", e);
                diagnostics.push(&e);
            }
        }
    }

    let mut parser = Parser::with_id_base(&tokens, *next_id);
    let statements = parser.parse(diagnostics);
    *next_id = parser.id_watermark();

    if diagnostics.had_error() {
        return;
    }

    let mut resolver = Resolver::new(interpreter, diagnostics);
    resolver.resolve_all(&statements);

    if diagnostics.had_error() {
        return;
    }

    interpreter.interpret(&statements, diagnostics);
}

fn run_file(filename: PathBuf) -> Result<()> {
    info!("Running file {:?}", filename);

    let buf = read_file(&filename)?;

    let mut interpreter = Interpreter::new();
    let mut diagnostics = Diagnostics::new();
    let mut next_id: u32 = 0;

    run(&buf, &mut interpreter, &mut diagnostics, &mut next_id);

    if diagnostics.had_error() {
        std::process::exit(65);
    }
    if diagnostics.had_runtime_error() {
        std::process::exit(70);
    }

    Ok(())
}

fn run_prompt() -> Result<()> {
    info!("Starting interactive session");

    // One interpreter for the whole session: globals and resolved locals
    // survive across lines.
    let mut interpreter = Interpreter::new();
    let mut diagnostics = Diagnostics::new();
    let mut next_id: u32 = 0;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("rlox > ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let line = line.trim_end();
        if line == "exit" {
            break;
        }

        run(
            line.as_bytes(),
            &mut interpreter,
            &mut diagnostics,
            &mut next_id,
        );

        // A bad line must not poison the rest of the session.
        diagnostics.reset();
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let buf = read_file(&filename)?;
                let scanner = Scanner::new(&buf);
                let mut tokenized = true;

                for token in scanner {
                    match token {
                        Ok(token) => {
                            debug!("Scanned token: {}", token);

                            println!("{}", token);
                        }

                        Err(e) => {
                            tokenized = false;

                            debug!("Tokenization error: {}", e);

                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");

                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
            }
            None => {
                info!("No filepath provided for Tokenize");

                println!("No input filepath was provided. Exiting...");

                std::process::exit(0);
            }
        },

        Commands::Parse { filename, json } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let buf = read_file(&filename)?;

                let tokens: Vec<_> = Scanner::new(&buf).filter_map(Result::ok).collect();
                let mut parser = Parser::new(&tokens);

                match parser.parse_expression() {
                    Ok(expr) => {
                        info!("Expression parsed successfully");

                        if json {
                            println!("{}", serde_json::to_string_pretty(&expr)?);
                        } else {
                            println!("{}", AstPrinter::print(&expr));
                        }
                    }

                    Err(e) => {
                        debug!("Parse error: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                }

                info!("Parse subcommand completed");
            }
            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                run_file(filename)?;
            }

            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Repl => {
            run_prompt()?;
        }
    }

    Ok(())
}
