use crate::render::render_text;
use anyhow::Result;
use sidenote_core::{resolve, AnnotationTree, SessionKey, SessionWatcher};
use sidenote_storage::{AnnotationStore, FileSlots};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Current page as written by the host: address on the first line, one
/// heading per following line.
pub fn parse_location(content: &str) -> Option<(String, Vec<String>)> {
    let mut lines = content.lines();
    let url = lines.next()?.trim();
    if url.is_empty() {
        return None;
    }
    let headings = lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    Some((url.to_string(), headings))
}

fn read_key(url_file: &Path) -> Option<SessionKey> {
    let content = match std::fs::read_to_string(url_file) {
        Ok(content) => content,
        Err(err) => {
            warn!(event = "location_read_failed", path = %url_file.display(), error = %err);
            return None;
        }
    };
    let (url, headings) = parse_location(&content)?;
    resolve(&url, headings.as_slice())
}

fn show(store: &AnnotationStore<FileSlots>) {
    match store.load() {
        Ok(snapshot) => println!("{}", render_text(&AnnotationTree::build(&snapshot))),
        Err(err) => warn!(event = "store_load_failed", error = %err),
    }
}

/// Poll `url_file` until interrupted, reloading the tree whenever the
/// resolved session key changes.
pub async fn run(data_dir: &Path, url_file: &Path, interval: Duration) -> Result<()> {
    let mut watcher = SessionWatcher::new();
    let mut store = AnnotationStore::new(FileSlots::new(data_dir), None);
    let mut ticker = tokio::time::interval(interval);
    info!(
        event = "watch_started",
        path = %url_file.display(),
        interval_ms = interval.as_millis() as u64
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(change) = watcher.observe(read_key(url_file)) else {
                    continue;
                };
                info!(
                    event = "session_changed",
                    previous = change.previous.as_ref().map(SessionKey::as_str).unwrap_or("-"),
                    current = change.current.as_ref().map(SessionKey::as_str).unwrap_or("-")
                );
                store.set_key(change.current);
                match store.key() {
                    Some(key) => {
                        println!("== {key}");
                        show(&store);
                    }
                    None => println!("== no active session"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(event = "watch_stopped");
                return Ok(());
            }
        }
    }
}
