//! Docsearch CLI: search documents, read summaries and pivot on shared entities
//!
//! Talks to Azure AI Search, the Gremlin graph and the LLM directly using the
//! same configuration as `docsearch-server`.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use docsearch::document::{group_by_library, Document};
use docsearch::graph::{group_related_by_library, EntityKind, EntitySelection, RelatedDocument};
use docsearch::http::handler::DocumentView;
use docsearch::library::{metadata_rows, table_rows, LibraryTable};
use docsearch::{AppConfig, Services, Session, View};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "docsearch", version, about = "Document search and entity explorer")]
struct Cli {
    /// YAML configuration file, overridden by environment variables
    #[arg(long, global = true, env = "DOCSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Full-text search across all libraries
    Search {
        /// Search text
        query: String,
    },
    /// Show a document's metadata and entities
    Show {
        /// Exact document name
        name: String,
    },
    /// Summarize a document
    Summary {
        /// Exact document name
        name: String,
    },
    /// Find documents mentioning any of the given entities
    Similar {
        #[arg(long = "person")]
        people: Vec<String>,

        #[arg(long = "org")]
        organizations: Vec<String>,

        #[arg(long = "location")]
        locations: Vec<String>,
    },
    /// Start an interactive browsing session
    Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match connect(cli.config.as_deref()) {
        Ok(services) => match cli.command {
            Commands::Search { query } => run_search(&services, &query, &cli.format).await,
            Commands::Show { name } => run_show(&services, &name, &cli.format).await,
            Commands::Summary { name } => run_summary(&services, &name, &cli.format).await,
            Commands::Similar {
                people,
                organizations,
                locations,
            } => {
                let mut selection = EntitySelection::new();
                for name in people {
                    selection.select(EntityKind::Person, name);
                }
                for name in organizations {
                    selection.select(EntityKind::Organization, name);
                }
                for name in locations {
                    selection.select(EntityKind::Location, name);
                }
                run_similar(&services, &selection, &cli.format).await
            }
            Commands::Shell => run_shell(services, &cli.format).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn connect(config: Option<&std::path::Path>) -> Result<Arc<Services>, Box<dyn std::error::Error>> {
    let config = AppConfig::load(config)?;
    Ok(Arc::new(Services::from_config(&config)?))
}

async fn run_search(services: &Services, query: &str, format: &OutputFormat) -> CliResult {
    let page = services.index.search(query).await?;
    print_results(&library_tables(&page.documents), format)
}

fn library_tables(docs: &[Document]) -> Vec<LibraryTable> {
    group_by_library(docs)
        .iter()
        .map(|(library, docs)| table_rows(library, docs))
        .collect()
}

fn print_results(tables: &[LibraryTable], format: &OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
        OutputFormat::Table => {
            if tables.is_empty() {
                println!("No documents found.");
                return Ok(());
            }

            let total: usize = tables.iter().map(|t| t.len()).sum();
            println!("Found {} documents across {} libraries", total, tables.len());

            for lib in tables {
                println!("\n{} ({} documents)", lib.library, lib.len());
                if !lib.custom_layout {
                    println!("No custom display format for library: {}", lib.library);
                }

                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                let mut header = vec!["Key".to_string()];
                header.extend(lib.columns.iter().cloned());
                table.set_header(header);

                for row in &lib.rows {
                    let mut cells = vec![row.key.clone()];
                    cells.extend(row.cells.iter().cloned());
                    table.add_row(cells);
                }
                println!("{}", table);
            }
        }
    }
    Ok(())
}

async fn fetch(services: &Services, name: &str) -> Result<Document, Box<dyn std::error::Error>> {
    services
        .index
        .find_by_name(name)
        .await?
        .ok_or_else(|| format!("Document not found: {}", name).into())
}

async fn run_show(services: &Services, name: &str, format: &OutputFormat) -> CliResult {
    let doc = fetch(services, name).await?;
    print_document(&doc, format)
}

fn print_document(doc: &Document, format: &OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&DocumentView::from(doc))?);
        }
        OutputFormat::Table => {
            println!("{} [{}]", doc.display_name(), doc.library_name());

            match metadata_rows(doc) {
                Some(rows) => {
                    let mut table = Table::new();
                    table.set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(vec!["Field", "Value"]);
                    for row in rows {
                        table.add_row(vec![row.label, row.value]);
                    }
                    println!("{}", table);
                }
                None => println!("No specific metadata fields available for this library type."),
            }

            for (kind, names) in [
                (EntityKind::Person, &doc.people),
                (EntityKind::Organization, &doc.organizations),
                (EntityKind::Location, &doc.locations),
            ] {
                if names.is_empty() {
                    println!("{}: none", kind);
                } else {
                    println!("{}: {}", kind, names.join(", "));
                }
            }
            println!("Content: {} characters", doc.content().chars().count());
        }
    }
    Ok(())
}

async fn run_summary(services: &Services, name: &str, format: &OutputFormat) -> CliResult {
    let doc = fetch(services, name).await?;
    let summary = services.summaries.summary_for_document(&doc).await?;
    print_summary(doc.display_name(), &summary, format)
}

fn print_summary(name: &str, summary: &str, format: &OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "name": name, "summary": summary });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => println!("{}", summary),
    }
    Ok(())
}

async fn run_similar(
    services: &Services,
    selection: &EntitySelection,
    format: &OutputFormat,
) -> CliResult {
    if selection.is_empty() {
        return Err("Please select at least one entity to find similar documents.".into());
    }
    let docs = services.graph.related_documents(selection).await?;
    print_similar(&docs, selection, format)
}

fn print_similar(
    docs: &[RelatedDocument],
    selection: &EntitySelection,
    format: &OutputFormat,
) -> CliResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(docs)?);
        }
        OutputFormat::Table => {
            if docs.is_empty() {
                println!("No similar documents found with the selected entities.");
                return Ok(());
            }

            for (library, group) in group_related_by_library(docs) {
                println!("\n{} ({} documents)", library, group.len());

                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["Document", "People", "Organizations", "Locations"]);

                for doc in &group {
                    let mut row = vec![doc.document.clone()];
                    for kind in EntityKind::ALL {
                        // `*` marks entities that are part of the selection
                        let names: Vec<String> = doc
                            .mentions(kind, selection)
                            .into_iter()
                            .map(|m| if m.selected { format!("*{}", m.name) } else { m.name })
                            .collect();
                        row.push(names.join(", "));
                    }
                    table.add_row(row);
                }
                println!("{}", table);
            }
            println!("Entities marked * are part of your selection.");
        }
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :search <text>         Search documents (bare text works too)");
    println!("  :open <key>            Open a search result, e.g. HR_0");
    println!("  :select <kind> <name>  Toggle an entity (person, org, location)");
    println!("  :clear                 Clear selected entities");
    println!("  :similar               Find documents sharing the selected entities");
    println!("  :prev                  Return to the previous similar results");
    println!("  :view <name>           Open a document from the similar results");
    println!("  :back                  Go back one view");
    println!("  :summary               Summarize the open document");
    println!("  :path                  Show the search path");
    println!("  :quit                  Exit shell");
}

async fn run_shell(services: Arc<Services>, format: &OutputFormat) -> CliResult {
    println!("Docsearch Interactive Shell");
    println!("Type a query to search, or :help for commands. :quit to exit.\n");

    let mut session = Session::new(services);
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        eprint!("docsearch> ");

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (trimmed, ""),
        };

        match command {
            ":quit" | ":exit" | ":q" => break,
            ":help" | ":h" => print_help(),
            _ => {
                if let Err(e) = shell_command(&mut session, command, arg, trimmed, format).await {
                    eprintln!("Error: {}", e);
                }
            }
        }
    }

    println!("Bye!");
    Ok(())
}

async fn shell_command(
    session: &mut Session,
    command: &str,
    arg: &str,
    line: &str,
    format: &OutputFormat,
) -> CliResult {
    match command {
        ":search" => {
            session.search(arg).await?;
            print_results(&library_tables(shown_results(session)), format)?;
        }
        ":open" => {
            let doc = session.open_result(arg)?;
            print_document(doc, format)?;
        }
        ":view" => {
            let doc = session.open_similar(arg).await?;
            print_document(doc, format)?;
        }
        ":select" => {
            let (kind, name) = arg
                .split_once(char::is_whitespace)
                .ok_or("usage: :select <person|org|location> <name>")?;
            let kind: EntityKind = kind.parse()?;
            let name = name.trim();
            let selected = session.toggle_entity(kind, name)?;
            println!("{} {}", if selected { "Selected" } else { "Deselected" }, name);
            println!("{}", session.selection().describe());
        }
        ":clear" => {
            session.clear_entities();
            println!("Selection cleared");
        }
        ":similar" => {
            session.find_similar().await?;
            print_path(session);
            print_similar(&session.state().similar_docs, session.selection(), format)?;
        }
        ":prev" => {
            session.previous_results().await?;
            print_path(session);
            print_similar(&session.state().similar_docs, session.selection(), format)?;
        }
        ":back" => {
            let view = match session.back() {
                View::Search => "search results",
                View::Document => "document",
                View::Similar => "similar documents",
            };
            println!("Back to {}", view);
        }
        ":summary" => {
            let summary = session.summary().await?;
            let name = session
                .current_document()
                .map(|d| d.display_name().to_string())
                .unwrap_or_default();
            print_summary(&name, &summary, format)?;
        }
        ":path" => print_path(session),
        _ if command.starts_with(':') => {
            return Err(format!("unknown command '{}', try :help", command).into());
        }
        _ => {
            session.search(line).await?;
            print_results(&library_tables(shown_results(session)), format)?;
        }
    }
    Ok(())
}

fn shown_results(session: &Session) -> &[Document] {
    session.state().search_results.as_deref().unwrap_or_default()
}

fn print_path(session: &Session) {
    let path = session.search_path();
    if path.is_empty() {
        println!("No search path yet");
    }
    for step in path {
        println!("{}", step);
    }
}
