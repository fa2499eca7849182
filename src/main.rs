use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use expr_tree::{
    Environment, Error, Functions, Lexer, NoResolve, Prompt, build_and_evaluate_named,
    build_named_expression_tree,
};
use miette::IntoDiagnostic;
use miette::WrapErr;

#[derive(Parser, Debug)]
#[command(version, about = "Parse and evaluate arithmetic expressions")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct Source {
    /// Expression text. Read from stdin when neither this nor `--file` is given.
    expression: Option<String>,

    /// Read the expression from a file instead.
    #[arg(short, long, conflicts_with = "expression")]
    file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print one token per line.
    Tokenize {
        #[command(flatten)]
        source: Source,
    },
    /// Print the expression tree in prefix notation.
    Parse {
        #[command(flatten)]
        source: Source,
    },
    /// Evaluate the expression with sin, cos, tan and ln available.
    Eval {
        #[command(flatten)]
        source: Source,

        /// Bind a variable, e.g. `--var x=2`. May be repeated.
        #[arg(short = 'D', long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, f64)>,

        /// Fail on unbound variables instead of asking for them.
        #[arg(long)]
        no_prompt: bool,
    },
}

fn parse_binding(binding: &str) -> Result<(String, f64), String> {
    let (name, value) = binding
        .split_once('=')
        .ok_or_else(|| format!("`{binding}` is not of the form NAME=VALUE"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn read_source(source: Source) -> miette::Result<(Option<String>, String)> {
    if let Some(filename) = source.file {
        let text = fs::read_to_string(&filename)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
        return Ok((Some(filename.display().to_string()), text));
    }
    if let Some(expression) = source.expression {
        return Ok((None, expression));
    }

    println!("Enter expression:");
    io::stdout().flush().into_diagnostic()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .into_diagnostic()
        .wrap_err("reading expression from stdin failed")?;
    Ok((None, line))
}

fn fail(e: Error) -> ! {
    let code = match &e {
        Error::Lex(lex) => {
            eprintln!("[line {}] Error: {lex}", lex.line());
            65
        }
        Error::Parse(parse) => {
            eprintln!("[line {}] Error: {parse}", parse.line());
            65
        }
        Error::Eval(eval) => {
            eprintln!("Error: {eval}");
            70
        }
    };
    eprintln!("{:?}", miette::Report::new(e));
    std::process::exit(code);
}

fn main() -> miette::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Tokenize { source } => {
            let (filename, text) = read_source(source)?;
            for token in Lexer::new(filename.as_deref(), &text) {
                match token {
                    Ok(token) => println!("{token}"),
                    Err(e) => fail(e.into()),
                }
            }
        }
        Commands::Parse { source } => {
            let (filename, text) = read_source(source)?;
            let functions = Functions::builtin();
            match build_named_expression_tree(filename.as_deref(), &text, &functions) {
                Ok(tree) => println!("{tree}"),
                Err(e) => fail(e),
            }
        }
        Commands::Eval {
            source,
            vars,
            no_prompt,
        } => {
            let (filename, text) = read_source(source)?;
            let mut environment = Environment::with_builtins();
            for (name, value) in vars {
                environment.define(name, value);
            }

            let result = if no_prompt {
                build_and_evaluate_named(filename.as_deref(), &text, &mut environment, NoResolve)
            } else {
                build_and_evaluate_named(
                    filename.as_deref(),
                    &text,
                    &mut environment,
                    Prompt::stdio(),
                )
            };
            match result {
                Ok(value) => println!("Result: {value:?}"),
                Err(e) => fail(e),
            }
        }
    }
    Ok(())
}
