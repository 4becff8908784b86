//! Command-line interface for sedml-rs

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use sedml::limits::Limits;
#[cfg(feature = "cli")]
use sedml::reader::{read_file_with_options, ReaderOptions};
#[cfg(feature = "cli")]
use sedml::{write_sedml_to_file, Document, NodeId, Severity, WriterSettings};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "sedml")]
#[command(author, version, about = "SED-ML reading, checking and rewriting tool", long_about = None)]
struct Cli {
    /// Log more detail (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Apply strict input limits
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a document and report its diagnostics
    Validate {
        /// Path to the SED-ML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Lowest severity to report
        #[arg(short, long, value_enum, default_value = "warning")]
        severity: SeverityArg,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Read a document and write it back out
    Echo {
        /// Path to the SED-ML file to read
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path of the file to write
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Spaces per nesting level (0 for a single line)
        #[arg(short, long, default_value_t = 2)]
        indent: usize,

        /// Omit the XML declaration
        #[arg(long)]
        no_declaration: bool,
    },

    /// Print the element tree of a document
    Info {
        /// Path to the SED-ML file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[cfg(feature = "cli")]
#[derive(ValueEnum, Clone, Copy, Debug)]
enum SeverityArg {
    Warning,
    Error,
    Fatal,
}

#[cfg(feature = "cli")]
impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
            SeverityArg::Fatal => Severity::Fatal,
        }
    }
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = if cli.strict {
        ReaderOptions::new().with_limits(Limits::strict())
    } else {
        ReaderOptions::new()
    };

    let result = match cli.command {
        Commands::Validate {
            file,
            severity,
            json,
        } => cmd_validate(file, severity.into(), json, &options),
        Commands::Echo {
            input,
            output,
            indent,
            no_declaration,
        } => cmd_echo(input, output, indent, no_declaration, &options),
        Commands::Info { file } => cmd_info(file, &options),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "warn",
        1 => "sedml=debug",
        _ => "sedml=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn cmd_validate(
    file: PathBuf,
    minimum: Severity,
    json: bool,
    options: &ReaderOptions,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut doc = read_file_with_options(&file, options)?;
    doc.check_consistency();

    let reported: Vec<_> = doc
        .diagnostics()
        .iter()
        .filter(|d| d.severity >= minimum)
        .collect();

    if json {
        let output = serde_json::json!({
            "file": file.display().to_string(),
            "level": doc.level(),
            "version": doc.version(),
            "errors": doc.diagnostics().error_count(),
            "diagnostics": reported,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if reported.is_empty() {
        println!("✓ {} has no diagnostics", file.display());
    } else {
        println!("{} diagnostic(s) in {}:", reported.len(), file.display());
        for diagnostic in &reported {
            println!("  {}", diagnostic);
        }
    }

    Ok(if doc.diagnostics().error_count() > 0 { 1 } else { 0 })
}

#[cfg(feature = "cli")]
fn cmd_echo(
    input: PathBuf,
    output: PathBuf,
    indent: usize,
    no_declaration: bool,
    options: &ReaderOptions,
) -> Result<i32, Box<dyn std::error::Error>> {
    let doc = read_file_with_options(&input, options)?;
    for diagnostic in doc.diagnostics().iter().filter(|d| d.is_error()) {
        eprintln!("  {}", diagnostic);
    }

    let settings = WriterSettings::new()
        .with_indent(indent)
        .with_xml_declaration(!no_declaration)
        .with_program("sedml", sedml::VERSION);
    write_sedml_to_file(&doc, &output, &settings)?;
    println!("Wrote {}", output.display());
    Ok(0)
}

#[cfg(feature = "cli")]
fn cmd_info(file: PathBuf, options: &ReaderOptions) -> Result<i32, Box<dyn std::error::Error>> {
    let doc = read_file_with_options(&file, options)?;
    println!(
        "SED-ML Level {} Version {} ({} elements, {} diagnostics)",
        doc.level(),
        doc.version(),
        doc.num_nodes(),
        doc.diagnostics().len()
    );
    print_tree(&doc, doc.root(), 0);
    Ok(0)
}

#[cfg(feature = "cli")]
fn print_tree(doc: &Document, id: NodeId, depth: usize) {
    let Some(element) = doc.element(id) else {
        return;
    };
    let mut line = format!("{}{}", "  ".repeat(depth), element.element_name());
    if let Some(sid) = element.id() {
        line.push_str(&format!(" id={}", sid));
    }
    if let Some(name) = element.name() {
        line.push_str(&format!(" name=\"{}\"", name));
    }
    for attribute in element.kind().fields() {
        if let Ok(value) = element.get_attribute(attribute.name) {
            line.push_str(&format!(" {}={}", attribute.name, value.to_xml_string()));
        }
    }
    println!("{}", line);
    for child in element.children() {
        print_tree(doc, *child, depth + 1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
