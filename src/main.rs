use anyhow::{Context, Result};
use std::path::Path;

use dropzone_queue::{
    config, validation, FileMeta, QueueEvent, SimulatedUploader, SqliteHistoryStore, UploadConfig,
    UploadQueue, UploadStatus,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: dropzone-queue <file>...");
        return Ok(());
    }

    let config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Failed to load configuration: {}. Using defaults.", e);
        UploadConfig::default()
    });

    let history = SqliteHistoryStore::open_default()
        .await
        .context("failed to open upload history store")?;

    let mut queue = UploadQueue::new(config, SimulatedUploader::new(), history);

    let mut events = queue.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                QueueEvent::UploadProgress {
                    progress_percent,
                    speed_bytes_per_sec,
                    ..
                } => log::debug!(
                    "progress {}% at {}",
                    progress_percent,
                    validation::format_upload_speed(speed_bytes_per_sec)
                ),
                other => log::info!("{:?}", other),
            }
        }
    });

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("cannot read file metadata for {}", path))?;
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());

        files.push(FileMeta {
            mime_type: guess_mime_type(&name),
            name,
            size_bytes: metadata.len(),
        });
    }

    let report = queue.add_files(&files).await;
    log::info!("Queued {} of {} files", report.added_count(), files.len());

    if !queue.config().auto_upload {
        queue.start_upload(None).await;
    }

    let stats = queue.stats();
    println!(
        "Done: {} complete, {} failed of {} total",
        stats.complete, stats.failed, stats.total
    );

    for item in queue.items() {
        match item.status {
            UploadStatus::Complete => println!(
                "  ✅ {} ({})",
                item.name,
                validation::format_file_size(item.size_bytes)
            ),
            UploadStatus::Failed => println!(
                "  ❌ {}: {}",
                item.name,
                item.error.as_deref().unwrap_or("unknown error")
            ),
            _ => println!("  •  {} ({})", item.name, item.status),
        }
    }

    drop(queue);
    printer.await.ok();

    Ok(())
}

/// Rough MIME guess from the file extension, good enough for the demo and
/// for type-pattern validation.
fn guess_mime_type(name: &str) -> String {
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "zip" => "application/zip",
        "json" => "application/json",
        _ => "application/octet-stream",
    };

    mime.to_string()
}
