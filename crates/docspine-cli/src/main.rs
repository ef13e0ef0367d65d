use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docspine_config::Config;
use docspine_engine::{
    ContentEditor, ElementType, FileStore, FileSystemStore, InsertPosition, LoadError, LoadOptions,
    MutationError, StructureIndex, io, load_tree, validate_structure,
};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod output;

use output::Printer;

const EXIT_ERROR: u8 = 1;
const EXIT_NOT_FOUND: u8 = 3;
const EXIT_INVALID: u8 = 4;
const EXIT_WRITE_FAILED: u8 = 5;

#[derive(Parser)]
#[command(name = "docspine")]
#[command(about = "Navigate and edit AsciiDoc and Markdown documentation by section")]
#[command(version)]
struct Cli {
    /// Documentation root (overrides the config file)
    #[arg(long, global = true)]
    docs_root: Option<PathBuf>,

    /// Config file to use instead of ~/.config/docspine/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the section tree of every document
    #[command(alias = "str")]
    Structure {
        /// Deepest level to show below each document's root sections
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Show one section and its content
    Section {
        /// Composite path such as `guide:install.linux`
        path: String,
    },

    /// Search section titles and element content
    Search {
        query: String,

        /// Only search at or below this path
        #[arg(long)]
        scope: Option<String>,

        /// Maximum number of results (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List all sections at one heading level
    Level { level: usize },

    /// List code blocks, tables, images and other elements
    Elements {
        /// code, table, image, list, plantuml, admonition or blockquote
        #[arg(long = "type")]
        element_type: Option<ElementType>,
    },

    /// Check for include cycles, broken includes and orphaned files
    Validate,

    /// Replace the content of a section
    Update {
        path: String,

        #[arg(long)]
        content: String,

        /// Do not put the original heading back when the content has none
        #[arg(long)]
        no_preserve_title: bool,
    },

    /// Insert content before, after or at the end of a section
    Insert {
        path: String,

        #[arg(long)]
        position: InsertPosition,

        #[arg(long)]
        content: String,
    },
}

struct Settings {
    docs_root: PathBuf,
    config: Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(LoadError::Index(_)) = err.downcast_ref::<LoadError>() {
        return EXIT_INVALID;
    }
    match err.downcast_ref::<MutationError>() {
        Some(MutationError::SectionNotFound(_)) => EXIT_NOT_FOUND,
        Some(MutationError::HeadingLevelMismatch { .. }) => EXIT_INVALID,
        Some(MutationError::Write(_)) => EXIT_WRITE_FAILED,
        _ => EXIT_ERROR,
    }
}

fn settings(cli: &Cli) -> Result<Settings> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?
            .with_context(|| format!("Config file not found: {}", path.display()))?,
        None => Config::load()?.unwrap_or_default(),
    };
    let docs_root = cli
        .docs_root
        .clone()
        .unwrap_or_else(|| config.docs_root.clone());
    io::validate_docs_root(&docs_root)?;
    debug!("Using docs root {}", docs_root.display());
    Ok(Settings { docs_root, config })
}

fn load(settings: &Settings) -> Result<(StructureIndex, Vec<PathBuf>)> {
    let options = LoadOptions {
        max_include_depth: settings.config.max_include_depth,
        exclude: settings.config.exclude.clone(),
    };
    let tree = load_tree(&settings.docs_root, &options).with_context(|| {
        format!(
            "Failed to load documents from {}",
            settings.docs_root.display()
        )
    })?;
    for (file, err) in &tree.failures {
        warn!("{}: {err}", file.display());
    }
    Ok((tree.index, tree.files))
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = settings(cli)?;
    let (index, files) = load(&settings)?;
    let printer = Printer::new(cli.format == Format::Json, &index);

    match &cli.command {
        Commands::Structure { max_depth } => {
            printer.structure(&index.get_structure(*max_depth))?;
        }
        Commands::Section { path } => {
            let Some(found) = index.locate(path) else {
                eprintln!("Section not found: {path}");
                return Ok(ExitCode::from(EXIT_NOT_FOUND));
            };
            let location = &found.source_location;
            let content = section_text(location.file(), location.line, location.end_line)?;
            printer.section(&found, &content)?;
        }
        Commands::Search {
            query,
            scope,
            limit,
        } => {
            if let Some(scope) = scope
                && !index.scope_exists(scope)
            {
                warn!("Scope '{scope}' does not match any indexed section");
            }
            let limit = limit.unwrap_or(settings.config.search_limit);
            let results = index.search(query, scope.as_deref(), limit);
            printer.search(query, &results)?;
        }
        Commands::Level { level } => {
            printer.sections(&index.sections_at_level(*level))?;
        }
        Commands::Elements { element_type } => {
            printer.elements(&index.elements(*element_type))?;
        }
        Commands::Validate => {
            let report = validate_structure(&index, &settings.docs_root, &files);
            printer.report(&report)?;
            if !report.valid {
                return Ok(ExitCode::from(EXIT_INVALID));
            }
        }
        Commands::Update {
            path,
            content,
            no_preserve_title,
        } => {
            let editor = ContentEditor::new(&index, &FileSystemStore);
            let outcome = editor.update_section(path, content, !no_preserve_title)?;
            printer.outcome(&outcome)?;
        }
        Commands::Insert {
            path,
            position,
            content,
        } => {
            let editor = ContentEditor::new(&index, &FileSystemStore);
            let outcome = editor.insert_content(path, *position, content)?;
            printer.outcome(&outcome)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// The section's own lines as they are on disk.
fn section_text(file: &Path, line: usize, end_line: Option<usize>) -> Result<String> {
    let text = FileSystemStore
        .read_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let count = end_line.map_or(usize::MAX, |end| end + 1 - line);
    Ok(text
        .lines()
        .skip(line.saturating_sub(1))
        .take(count)
        .collect::<Vec<_>>()
        .join("\n"))
}
