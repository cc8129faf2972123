mod config;
mod render;
mod watch;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sidenote_anchor::{Highlighter, HtmlDocument, HtmlSurface, Locator, DEFAULT_PANEL_ID};
use sidenote_core::{
    resolve, AnnotationId, AnnotationKind, AnnotationPatch, AnnotationTree, NewAnnotation,
    SessionKey, StoreSnapshot, SESSION_POLL_INTERVAL,
};
use sidenote_storage::{export_file_name, AnnotationStore, FileSlots};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "sidenote")]
#[command(about = "Per-conversation notes, todos and questions", long_about = None)]
struct Cli {
    /// Directory holding one JSON file per conversation
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
    #[command(flatten)]
    session: SessionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct SessionArgs {
    /// Conversation page address
    #[arg(long, global = true)]
    url: Option<String>,
    /// Visible page heading; repeatable
    #[arg(long = "heading", global = true)]
    headings: Vec<String>,
    /// Use a session key directly instead of resolving one
    #[arg(long, global = true, conflicts_with = "url")]
    key: Option<String>,
}

impl SessionArgs {
    fn session_key(&self) -> Option<SessionKey> {
        if let Some(key) = &self.key {
            return Some(SessionKey::from(key.as_str()));
        }
        let url = self.url.as_deref()?;
        resolve(url, self.headings.as_slice())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the session key for --url/--heading
    Key,
    /// Show the annotation tree
    List {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Add a root item, or a child with --parent
    Add {
        content: String,
        #[arg(long, default_value = "finding")]
        kind: AnnotationKind,
        #[arg(long)]
        parent: Option<AnnotationId>,
        /// Mark the item as captured from the page
        #[arg(long, default_value_t = false)]
        from_source: bool,
    },
    /// Change an item's text or kind
    Edit {
        id: AnnotationId,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        kind: Option<AnnotationKind>,
    },
    Done {
        id: AnnotationId,
    },
    Reopen {
        id: AnnotationId,
    },
    /// Delete an item; its children become top-level items
    Rm {
        id: AnnotationId,
    },
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Import {
        path: PathBuf,
    },
    /// Find captured text in an HTML page
    Locate {
        #[arg(long)]
        html: PathBuf,
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        text: Option<String>,
        /// Locate a stored item that was captured from the page
        #[arg(long)]
        id: Option<AnnotationId>,
        #[arg(long, default_value = DEFAULT_PANEL_ID)]
        panel_id: String,
    },
    /// Follow the session named in a location file
    Watch {
        #[arg(long)]
        url_file: PathBuf,
        #[arg(long, default_value_t = SESSION_POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.data_dir.as_deref(), cli.debug);
    config::init_logging(&config);
    debug!(event = "config_loaded", data_dir = %config.data_dir.display());

    match cli.command {
        Commands::Key => {
            let Some(key) = cli.session.session_key() else {
                bail!("session unresolved");
            };
            println!("{key}");
        }
        Commands::Locate {
            html,
            text,
            id,
            panel_id,
        } => {
            let text = match (text, id) {
                (_, Some(id)) => {
                    let store = open_store(&config.data_dir, &cli.session)?;
                    let snapshot = store.load()?;
                    captured_text(&snapshot, id)?.to_string()
                }
                (Some(text), None) => text,
                (None, None) => bail!("pass the text to find, or --id"),
            };
            locate(&html, &text, panel_id)?
        }
        Commands::Watch {
            url_file,
            interval_ms,
        } => {
            watch::run(
                &config.data_dir,
                &url_file,
                Duration::from_millis(interval_ms.max(1)),
            )
            .await?
        }
        command => {
            let mut store = open_store(&config.data_dir, &cli.session)?;
            run_store_command(&mut store, command)?;
        }
    }

    Ok(())
}

fn open_store(data_dir: &Path, session: &SessionArgs) -> Result<AnnotationStore<FileSlots>> {
    let Some(key) = session.session_key() else {
        bail!("session unresolved: pass --url for a supported conversation page, or --key");
    };
    debug!(event = "session_resolved", key = %key);
    Ok(AnnotationStore::new(FileSlots::new(data_dir), Some(key)))
}

fn run_store_command(store: &mut AnnotationStore<FileSlots>, command: Commands) -> Result<()> {
    match command {
        Commands::List { filter, json } => {
            let snapshot = store.load()?;
            let tree = AnnotationTree::build(&snapshot);
            let tree = match filter.as_deref() {
                Some(query) => tree.filter(query),
                None => tree,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&render::render_json(&tree))?);
            } else {
                println!("{}", render::render_text(&tree));
            }
        }
        Commands::Add {
            content,
            kind,
            parent,
            from_source,
        } => {
            let content = content.trim();
            if content.is_empty() {
                bail!("content is empty");
            }
            let mut draft = match parent {
                Some(parent) => NewAnnotation::child(parent, content, kind),
                None => NewAnnotation::root(content, kind),
            };
            if from_source {
                draft = draft.captured();
            }
            let record = store.create(draft)?;
            println!("Added [{}] {}", record.id, record.content);
        }
        Commands::Edit { id, content, kind } => {
            let patch = AnnotationPatch {
                content: content.map(|text| text.trim().to_string()),
                kind,
                completed: None,
            };
            if patch.is_empty() {
                bail!("nothing to change: pass --content or --kind");
            }
            if patch.content.as_deref() == Some("") {
                bail!("content is empty");
            }
            update(store, id, &patch)?;
            println!("Updated [{id}]");
        }
        Commands::Done { id } => {
            update(store, id, &AnnotationPatch::completed(true))?;
            println!("Completed [{id}]");
        }
        Commands::Reopen { id } => {
            update(store, id, &AnnotationPatch::completed(false))?;
            println!("Reopened [{id}]");
        }
        Commands::Rm { id } => {
            if !store.remove(id)? {
                bail!("Item [{id}] not found");
            }
            println!("Removed [{id}]");
        }
        Commands::Export { out } => {
            let payload = store.export_json()?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(export_file_name(chrono::Local::now().date_naive()))
            });
            fs::write(&path, payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(event = "store_exported", path = %path.display());
            println!("Exported to {}", path.display());
        }
        Commands::Import { path } => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let report = store.import_json(&content)?;
            println!("Data imported successfully ({} items)", report.records);
        }
        Commands::Key | Commands::Locate { .. } | Commands::Watch { .. } => {
            bail!("command does not operate on a store")
        }
    }
    Ok(())
}

fn update(
    store: &mut AnnotationStore<FileSlots>,
    id: AnnotationId,
    patch: &AnnotationPatch,
) -> Result<()> {
    if !store.update(id, patch)? {
        bail!("Item [{id}] not found");
    }
    Ok(())
}

/// Text of a stored item that can be searched for in the page.
fn captured_text(snapshot: &StoreSnapshot, id: AnnotationId) -> Result<&str> {
    let Some(record) = snapshot.get(id) else {
        bail!("Item [{id}] not found");
    };
    if !record.from_source {
        bail!("Item [{id}] was not captured from the page");
    }
    Ok(&record.content)
}

fn locate(html: &Path, text: &str, panel_id: String) -> Result<()> {
    let source =
        fs::read_to_string(html).with_context(|| format!("Failed to read {}", html.display()))?;
    let document = HtmlDocument::parse(&source);
    let mut surface = HtmlSurface::new(&document);
    let mut highlighter = Highlighter::new();
    let locator = Locator::with_panel_id(panel_id);

    let found = locator.locate(&document, &mut surface, &mut highlighter, text, Instant::now())?;
    println!("Found \"{}\" in {}", found.phrase, document.describe(found.element));
    println!("{}", found.text.trim());
    highlighter.dismiss(&mut surface, &found.element);
    Ok(())
}
