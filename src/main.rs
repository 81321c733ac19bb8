//! FicheGen CLI
//!
//! Commands:
//!   serve - Start the web app (default)
//!   render - Render a sheet Markdown file to PDF
//!   templates - List saved PDF templates
//!   info - Show providers, models and key status

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use fichegen::config::{load_env_file, ApiKeys, Config, ProviderKind};
use fichegen::server::{self, AppState};
use fichegen::sheet::{pdf_file_name, render_sheet, CoverMeta, FontSet, PdfStyle};
use fichegen::{Audience, TemplateStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fichegen")]
#[command(about = "Teaching and revision sheets from PDF textbooks, powered by LLMs")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.fichegen/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Environment file with API keys (default: .env in the working directory)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web app
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for saved PDF templates
        #[arg(short, long)]
        templates_dir: Option<PathBuf>,
    },

    /// Render a sheet Markdown file to PDF
    Render {
        /// Markdown file
        input: PathBuf,

        /// Output PDF (default: input name with .pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Saved template to style the PDF with
        #[arg(short, long)]
        template: Option<String>,

        /// teacher or student
        #[arg(short, long, default_value = "teacher", value_parser = parse_audience)]
        audience: Audience,
    },

    /// List saved PDF templates
    Templates,

    /// Show providers, models and API key status
    Info,
}

fn parse_audience(value: &str) -> std::result::Result<Audience, String> {
    match value.to_ascii_lowercase().as_str() {
        "teacher" | "enseignant" => Ok(Audience::Teacher),
        "student" | "eleve" | "élève" => Ok(Audience::Student),
        other => Err(format!("unknown audience '{}' (teacher or student)", other)),
    }
}

/// No subcommand means `serve` with its defaults.
fn command_or_serve(command: Option<Commands>) -> Commands {
    command.unwrap_or(Commands::Serve { host: None, port: None, templates_dir: None })
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "fichegen=debug,tower_http=debug" } else { "fichegen=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let env_file = load_env_file(cli.env_file.as_deref())?;
    if let Some(path) = &env_file {
        tracing::debug!("Loaded environment from {:?}", path);
    }
    let mut config = load_config(&cli)?;

    match command_or_serve(cli.command) {
        Commands::Serve { host, port, templates_dir } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = templates_dir {
                config.templates_dir = dir;
            }
            let keys = ApiKeys::from_env();
            for kind in ProviderKind::all() {
                if !keys.has(kind) {
                    println!(
                        "{} {} not set; {} requests need a key typed in the UI",
                        "!".yellow(),
                        kind.env_var(),
                        kind.name()
                    );
                }
            }
            server::run(AppState::new(config, keys)?).await?;
        }

        Commands::Render { input, output, template, audience } => {
            let markdown = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {:?}", input))?;
            let style = match template {
                Some(name) => TemplateStore::open(&config.templates_dir)?.load(&name)?,
                None => PdfStyle::default(),
            };
            let file_base = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Fiche")
                .to_string();
            let output = output.unwrap_or_else(|| input.with_file_name(pdf_file_name(&file_base)));

            let fonts = FontSet::load(&config.font_regular, &config.font_bold);
            let cover = CoverMeta::for_file(&file_base);
            let bytes = render_sheet(&markdown, audience, &style, &cover, &fonts)?;
            std::fs::write(&output, &bytes).with_context(|| format!("Failed to write {:?}", output))?;

            println!(
                "{} Wrote {} ({} KB)",
                "✓".green(),
                output.display().to_string().cyan(),
                bytes.len() / 1024
            );
        }

        Commands::Templates => {
            let store = TemplateStore::open(&config.templates_dir)?;
            let names = store.list()?;
            if names.is_empty() {
                println!("No templates in {}", store.dir().display().to_string().dimmed());
                return Ok(());
            }
            println!("Templates in {}:", store.dir().display().to_string().dimmed());
            for name in names {
                match store.load(&name) {
                    Ok(style) => println!(
                        "  {} {}  {}",
                        "•".cyan(),
                        name.bold(),
                        format!("({}, {:?}, {:?})", style.base_template.label(), style.page_format, style.orientation)
                            .dimmed()
                    ),
                    Err(e) => println!("  {} {}  {}", "•".red(), name.bold(), e.to_string().red()),
                }
            }
        }

        Commands::Info => {
            let keys = ApiKeys::from_env();
            println!("{} v{}", config.app_name.green().bold(), env!("CARGO_PKG_VERSION"));
            println!();
            for kind in ProviderKind::all() {
                let status = if keys.has(kind) {
                    "key set".green()
                } else {
                    format!("{} not set", kind.env_var()).yellow()
                };
                println!("  {} ({})", kind.name().bold(), status);
                for model in kind.models() {
                    println!("    {} {}", "-".dimmed(), model);
                }
            }
            println!();
            println!("  Templates: {}", config.templates_dir.display());
            println!("  ToC pages: {}", config.toc_pages);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs_serve_defaults() {
        let cli = Cli::try_parse_from(["fichegen"]).unwrap();
        assert!(cli.command.is_none());
        match command_or_serve(cli.command) {
            Commands::Serve { host, port, templates_dir } => {
                assert!(host.is_none());
                assert!(port.is_none());
                assert!(templates_dir.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_explicit_subcommand_is_kept() {
        let cli = Cli::try_parse_from(["fichegen", "serve", "--port", "9000"]).unwrap();
        match command_or_serve(cli.command) {
            Commands::Serve { port, .. } => assert_eq!(port, Some(9000)),
            _ => panic!("expected serve"),
        }
        let cli = Cli::try_parse_from(["fichegen", "info"]).unwrap();
        assert!(matches!(command_or_serve(cli.command), Commands::Info));
    }
}
