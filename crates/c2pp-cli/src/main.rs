use c2pp_engine::{Options, Translation, Translator};
use clap::Parser;
use miette::{IntoDiagnostic, NamedSource, Result, WrapErr};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "c2pp")]
#[command(author, version, about = "Translate C idioms into C++")]
struct Cli {
    /// C source file to translate (stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Options file in TOML format
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every diagnostic with its source excerpt
    #[arg(long)]
    diagnostics: bool,

    /// Leave out the banner comment
    #[arg(long)]
    no_banner: bool,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))?;

    init_tracing();

    let cli = Cli::parse();
    run(&cli)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli.config.as_deref(), cli.no_banner)?;
    let (name, source) = read_input(cli.input.as_deref())?;

    let translator = Translator::new(options);
    let translation = translator.translate_named(&name, &source);

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &translation.output)
                .map_err(|e| miette::miette!("Failed to write {}: {}", path.display(), e))?;
            tracing::info!(output = %path.display(), "wrote translation");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(translation.output.as_bytes()).into_diagnostic()?;
            stdout.flush().into_diagnostic()?;
        }
    }

    report(&translation, &name, &source, cli.diagnostics);
    Ok(())
}

fn load_options(config: Option<&Path>, no_banner: bool) -> Result<Options> {
    let mut options = match config {
        Some(path) => Options::from_file(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to load options from {}", path.display()))?,
        None => Options::default(),
    };
    if no_banner {
        options.output.banner = None;
    }
    Ok(options)
}

fn read_input(input: Option<&Path>) -> Result<(String, String)> {
    match input {
        Some(path) if path != Path::new("-") => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
            Ok((path.display().to_string(), source))
        }
        _ => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source).into_diagnostic()?;
            Ok(("<stdin>".to_string(), source))
        }
    }
}

fn report(translation: &Translation, name: &str, source: &str, verbose: bool) {
    if translation.diagnostics.is_empty() {
        return;
    }
    if !verbose {
        tracing::warn!(
            count = translation.diagnostics.len(),
            "some constructs were left untranslated; rerun with --diagnostics for details"
        );
        return;
    }
    for diagnostic in &translation.diagnostics {
        let report = miette::Report::new(diagnostic.clone())
            .with_source_code(NamedSource::new(name, source.to_string()));
        eprintln!("{:?}", report);
    }
}
