use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docc_lib::compiler::{self, AsmOutput};
use docc_lib::core::Diagnostics;
use docc_lib::{asm, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::path::{Path, PathBuf};

mod includes;
use includes::FsIncludes;

/// below this a parser may give up on plain text
const MIN_RETRY_LIMIT: u64 = 16;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// log more, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// how often a parser may decline a symbol before the rest of the input
    /// is given up on
    #[arg(
        long,
        default_value_t = 1024,
        global = true,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(MIN_RETRY_LIMIT..)
    )]
    retry_limit: usize,

    #[cfg(feature = "dev")]
    #[arg(short = 's', long, global = true)]
    show_symbols: bool,

    #[cfg(feature = "dev")]
    #[arg(short = 'a', long, global = true)]
    show_ast: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a docscript document to docasm text
    Script(ScriptArgs),
    /// Assemble docasm text to an object stream
    Asm(AsmArgs),
    /// Compile a docscript document straight to an object stream
    Build(BuildArgs),
}

#[derive(Args)]
struct ScriptArgs {
    input: PathBuf,

    /// defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// directories searched for included files
    #[arg(short = 'I', long = "include")]
    include_dirs: Vec<PathBuf>,

    /// name the source position of every construct in a comment
    #[arg(long)]
    annotate: bool,
}

#[derive(Args)]
struct AsmArgs {
    input: PathBuf,

    /// defaults to the input with the extension `dco`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// print the offset of every object
    #[arg(short, long)]
    listing: bool,

    /// resolve `invoke` operands, as NAME=ID
    #[arg(short, long = "function", value_parser = parse_function)]
    functions: Vec<(String, u64)>,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    script: ScriptArgs,

    #[arg(short, long)]
    listing: bool,

    #[arg(short, long = "function", value_parser = parse_function)]
    functions: Vec<(String, u64)>,
}

fn parse_function(arg: &str) -> Result<(String, u64)> {
    let Some((name, id)) = arg.split_once('=') else {
        bail!("expected NAME=ID, got '{arg}'");
    };
    let id = id.parse().with_context(|| format!("'{id}' is not a function id"))?;
    Ok((name.to_owned(), id))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn,docc_lib=off",
        1 => "info,docc_lib=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config {
        retry_limit: cli.retry_limit,
        ..Config::default()
    };

    #[cfg(feature = "dev")]
    if cli.show_symbols {
        return show_symbols(&cli.command, &config);
    }

    let diagnostics = match &cli.command {
        Command::Script(args) => {
            config.annotate = args.annotate;
            let (file, src) = read(&args.input)?;
            let mut includes = FsIncludes {
                dirs: args.include_dirs.clone(),
            };
            let out = compiler::compile_script(&file, &src, &config, &mut includes)?;

            #[cfg(feature = "dev")]
            if cli.show_ast {
                println!("{:#?}", out.decls);
                return Ok(());
            }

            match &args.output {
                Some(path) => std::fs::write(path, &out.assembly)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => print!("{}", out.assembly),
            }
            out.diagnostics
        }
        Command::Asm(args) => {
            config.functions = args.functions.iter().cloned().collect();
            let (file, src) = read(&args.input)?;
            let out = compiler::assemble(&file, &src, &config)?;

            #[cfg(feature = "dev")]
            if cli.show_ast {
                println!("{:#?}", out.decls);
                return Ok(());
            }

            write_objects(&out, &args.input, args.output.as_deref(), args.listing)?
        }
        Command::Build(args) => {
            config.annotate = args.script.annotate;
            config.functions = args.functions.iter().cloned().collect();
            let (file, src) = read(&args.script.input)?;
            let mut includes = FsIncludes {
                dirs: args.script.include_dirs.clone(),
            };
            let (_script, out) = compiler::build(&file, &src, &config, &mut includes)?;

            #[cfg(feature = "dev")]
            if cli.show_ast {
                println!("{:#?}", _script.decls);
                return Ok(());
            }

            write_objects(
                &out,
                &args.script.input,
                args.script.output.as_deref(),
                args.listing,
            )?
        }
    };

    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
    if diagnostics.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn read(path: &Path) -> Result<(String, String)> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok((path.display().to_string(), src))
}

/// Writes the object stream and hands back the diagnostics
fn write_objects(
    out: &AsmOutput,
    input: &Path,
    output: Option<&Path>,
    listing: bool,
) -> Result<Diagnostics> {
    if listing {
        print!("{}", asm::listing(&out.decls, &out.labels));
    }
    let path = output
        .map(Path::to_owned)
        .unwrap_or_else(|| input.with_extension("dco"));
    std::fs::write(&path, &out.bytecode)
        .with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!(
        objects = out.objects.len(),
        bytes = out.bytecode.len(),
        path = %path.display(),
        "written"
    );
    Ok(out.diagnostics.clone())
}

#[cfg(feature = "dev")]
fn show_symbols(command: &Command, config: &Config) -> Result<()> {
    use docc_lib::core::Symbol;
    use docc_lib::{lexer, script};

    let mut symbols: Vec<Symbol> = vec![];
    match command {
        Command::Script(ScriptArgs { input, .. })
        | Command::Build(BuildArgs {
            script: ScriptArgs { input, .. },
            ..
        }) => {
            let (_, src) = read(input)?;
            lexer::lex(&src, &mut script::Tokenizer::new(), &mut symbols)?;
        }
        Command::Asm(AsmArgs { input, .. }) => {
            let (_, src) = read(input)?;
            lexer::lex(&src, &mut asm::Tokenizer::new(), &mut symbols)?;
        }
    }
    for sym in symbols {
        println!("{sym}");
    }
    Ok(())
}
