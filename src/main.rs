//! Command-line interface for preeti-unicode.

use clap::{ArgAction, Parser, ValueEnum};
use preeti_unicode::{
    Config, ConversionError, ConvertOptions, Converter, OutputFormat, RegistryError,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

const SAMPLES: &[(&str, &str)] = &[
    ("standard", "g]kfn"),
    ("standard", "d]/f] gfd /fd xf] ."),
    ("standard", "lxdfno"),
    ("standard", "sd{ / wd{"),
    ("standard", "lzIff k|b]z"),
    ("standard", "@)&( ;fn"),
    ("preeti_plus", "é gdM lzjfo"),
    ("kantipur", "Qmd É"),
];

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum FormatArg {
    #[default]
    Text,
    Spans,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Spans => OutputFormat::Spans,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error("cannot read '{path}': {source}")]
    Input { path: PathBuf, source: io::Error },

    #[error("cannot write '{path}': {source}")]
    Output { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line editor: {0}")]
    Editor(#[from] ReadlineError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CliError {
    /// Whether the reader of our output went away, e.g. `| head`.
    fn is_broken_pipe(&self) -> bool {
        match self {
            CliError::Io(e) | CliError::Conversion(ConversionError::Io(e)) => {
                e.kind() == io::ErrorKind::BrokenPipe
            }
            _ => false,
        }
    }
}

/// The argument of a `:variant` command, if `line` is one.
fn variant_command(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(":variant")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert Preeti font text to Unicode (Nepali)")]
struct Cli {
    /// Text to convert. Read from --input or stdin when absent.
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// Read input from FILE instead of stdin.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Write output to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Font variant (standard, preeti_plus, kantipur, or a registered one).
    /// Detected per line when omitted.
    #[arg(short = 'v', long)]
    variant: Option<String>,

    /// Font name hint for variant detection, e.g. 'Preeti Plus'.
    #[arg(short = 'n', long)]
    font_name: Option<String>,

    /// Keep ASCII digits instead of converting them to Devanagari digits.
    #[arg(long, action = ArgAction::SetTrue)]
    no_convert_numbers: bool,

    /// Variant definition file (JSON) to register. May be repeated.
    #[arg(long = "definition", value_name = "FILE")]
    definitions: Vec<PathBuf>,

    /// Settings file (JSON).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 'spans' prints, per line, which rule or table produced each piece.
    #[arg(short = 'f', long, value_enum, default_value_t = FormatArg::default())]
    format: FormatArg,

    /// Stop after this many lines.
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Convert the lines of a file on all cores.
    #[arg(short = 'p', long = "parallel", action = ArgAction::SetTrue)]
    parallel: bool,

    /// Print the registered variants.
    #[arg(long, action = ArgAction::SetTrue)]
    list_variants: bool,

    /// Print the definition of a variant as JSON.
    #[arg(long, value_name = "VARIANT")]
    export_variant: Option<String>,

    /// Convert a built-in set of samples and time them.
    #[arg(long, action = ArgAction::SetTrue)]
    sample: bool,

    /// Log errors only.
    #[arg(long, action = ArgAction::SetTrue)]
    silent: bool,
}

/// What a single invocation does.
enum Mode<'a> {
    ListVariants,
    Export(&'a str),
    Samples,
    Interactive,
    Convert,
}

impl Cli {
    fn mode(&self) -> Mode<'_> {
        let has_input = !self.text.is_empty() || self.input.is_some();
        if self.list_variants {
            Mode::ListVariants
        } else if let Some(name) = &self.export_variant {
            Mode::Export(name)
        } else if self.sample && !has_input && self.output.is_none() {
            Mode::Samples
        } else if !has_input && !self.sample && io::stdin().is_terminal() {
            Mode::Interactive
        } else {
            Mode::Convert
        }
    }

    fn load_config(&self) -> Result<Config, ConversionError> {
        let base = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        let mut config = base.with_env_overrides()?;
        config.definition_files.extend(self.definitions.iter().cloned());
        config.localize_digits &= !self.no_convert_numbers;
        Ok(config)
    }

    fn options(&self, config: &Config) -> ConvertOptions {
        ConvertOptions {
            variant: self.variant.clone(),
            font_name: self.font_name.clone(),
            localize_digits: config.localize_digits,
            format: self.format.into(),
            max_lines: self.max_lines,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.silent);

    match run(&cli) {
        Ok(()) => {}
        Err(err) if err.is_broken_pipe() => {}
        Err(err) => {
            eprintln!("preeti-unicode: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(silent: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if silent { "error" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let converter = Converter::with_config(cli.load_config()?)?;
    let options = cli.options(converter.config());

    match cli.mode() {
        Mode::ListVariants => print_variants(&converter),
        Mode::Export(name) => {
            let definition = converter.get_variant(name)?.to_definition();
            println!("{}", definition.to_json().map_err(ConversionError::from)?);
        }
        Mode::Samples => print_samples(&converter),
        Mode::Interactive => Session::new(&converter, options)?.run()?,
        Mode::Convert => {
            let mut writer = open_output(cli.output.as_deref())?;
            if !cli.text.is_empty() {
                let joined = cli.text.join(" ");
                converter.convert_file(joined.as_bytes(), &mut writer, &options)?;
            }
            if cli.input.is_some() || cli.text.is_empty() {
                let reader = open_input(cli.input.as_deref())?;
                if cli.parallel {
                    converter.convert_file_parallel(reader, &mut writer, &options)?;
                } else {
                    converter.convert_file(reader, &mut writer, &options)?;
                }
            }
            writer.flush()?;
            if cli.sample {
                eprintln!("note: --sample ignored because input was given");
            }
        }
    }
    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>, CliError> {
    let Some(path) = path else {
        return Ok(Box::new(io::stdin().lock()));
    };
    File::open(path)
        .map(|file| Box::new(BufReader::new(file)) as Box<dyn BufRead>)
        .map_err(|source| CliError::Input {
            path: path.to_path_buf(),
            source,
        })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };
    File::create(path)
        .map(|file| Box::new(BufWriter::new(file)) as Box<dyn Write>)
        .map_err(|source| CliError::Output {
            path: path.to_path_buf(),
            source,
        })
}

fn print_variants(converter: &Converter) {
    let registry = converter.registry();
    let default = registry.default_variant();
    for name in registry.list_variants() {
        let Ok(variant) = registry.get_variant(&name) else {
            continue;
        };
        let meta = variant.metadata();
        let flag = if name == default { '*' } else { ' ' };
        println!("{flag} {name:<14} {:<18} {}", meta.display_name, meta.description);
    }
}

/// Interactive line-by-line conversion.
struct Session<'a> {
    converter: &'a Converter,
    options: ConvertOptions,
    editor: DefaultEditor,
    history: Option<PathBuf>,
}

impl<'a> Session<'a> {
    fn new(converter: &'a Converter, options: ConvertOptions) -> Result<Self, CliError> {
        let mut editor = DefaultEditor::new()?;
        let history = dirs::cache_dir().and_then(|mut dir| {
            dir.push("preeti-unicode");
            std::fs::create_dir_all(&dir).ok()?;
            Some(dir.join("history.txt"))
        });
        if let Some(path) = &history {
            // first run has no history yet
            let _ = editor.load_history(path);
        }
        Ok(Self {
            converter,
            options,
            editor,
            history,
        })
    }

    fn run(mut self) -> Result<(), CliError> {
        println!("Type Preeti text to convert. ':variant NAME' switches font, ':quit' exits.");
        loop {
            let line = match self.editor.readline("preeti> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("(Ctrl-D or :quit to leave)");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("line editor: {err}");
                    break;
                }
            };
            self.editor.add_history_entry(line.as_str())?;

            let trimmed = line.trim();
            if let Some(name) = variant_command(trimmed) {
                self.switch_variant(name);
                continue;
            }
            match trimmed {
                "" => {}
                ":quit" | ":exit" => break,
                _ => self.convert(&line),
            }
        }
        self.save_history();
        Ok(())
    }

    fn switch_variant(&mut self, name: &str) {
        if name.is_empty() {
            self.options.variant = None;
            println!("variant: detected per line");
            return;
        }
        match self.converter.get_variant(name) {
            Ok(variant) => {
                println!("variant: {}", variant.name());
                self.options.variant = Some(variant.name().to_string());
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    fn convert(&self, line: &str) {
        let mut out = Vec::new();
        match self.converter.convert_file(line.as_bytes(), &mut out, &self.options) {
            Ok(_) => print!("{}", String::from_utf8_lossy(&out)),
            Err(err) => eprintln!("{err}"),
        }
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.history
            && let Err(err) = self.editor.save_history(path)
        {
            eprintln!("warning: history not saved to {}: {err}", path.display());
        }
    }
}

fn print_samples(converter: &Converter) {
    let column = SAMPLES
        .iter()
        .map(|(_, text)| UnicodeWidthStr::width(*text))
        .max()
        .unwrap_or(0);
    let rule = "-".repeat(column + 32);

    println!("{rule}");
    let started = Instant::now();
    for (variant, text) in SAMPLES {
        let converted = converter.convert(text, Some(*variant), true);
        let pad = column - UnicodeWidthStr::width(*text);
        println!("{variant:<12} {text}{} => {converted}", " ".repeat(pad));
    }
    let elapsed = started.elapsed();
    println!("{rule}");

    let per_sample = elapsed.as_secs_f64() * 1e6 / SAMPLES.len() as f64;
    println!("{} samples, {per_sample:.1} μs each", SAMPLES.len());
}
