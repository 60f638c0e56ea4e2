//! Command implementations. Each returns after printing its output.

use anyhow::{Context, Result};
use depot::{Bytes, ListOptions, ObjectMeta, StorageEngine};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

pub fn backends(engine: &StorageEngine) -> Result<()> {
    let registry = engine.registry();
    if registry.is_empty() {
        println!("No backends configured");
        return Ok(());
    }
    for definition in registry.iter() {
        match definition.directory() {
            Some(dir) => println!(
                "{:<20} {:<8} directory={}",
                definition.name(),
                definition.kind(),
                dir
            ),
            None => println!("{:<20} {}", definition.name(), definition.kind()),
        }
    }
    Ok(())
}

pub fn resolve(engine: &StorageEngine, identifier: &str) -> Result<()> {
    let handle = engine.resolve(identifier)?;
    println!("backend: {}", handle.backend_name());
    println!("kind:    {}", handle.definition().kind());
    println!("path:    {}", handle.normalized_path());
    println!("id:      {}", handle.identifier());
    Ok(())
}

pub async fn cat(engine: &StorageEngine, identifier: &str) -> Result<()> {
    let data = engine.read(identifier).await?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

pub async fn put(
    engine: &StorageEngine,
    identifier: &str,
    file: Option<PathBuf>,
    data: Option<String>,
) -> Result<()> {
    let contents = match (file, data) {
        (Some(path), _) => Bytes::from(
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?,
        ),
        (None, Some(data)) => Bytes::from(data),
        (None, None) => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read stdin")?;
            Bytes::from(buf)
        }
    };

    let size = contents.len();
    engine.write(identifier, contents).await?;
    tracing::info!(identifier, size, "Wrote object");
    Ok(())
}

pub async fn rm(engine: &StorageEngine, identifier: &str) -> Result<()> {
    engine.delete(identifier).await?;
    tracing::info!(identifier, "Deleted object");
    Ok(())
}

pub async fn exists(engine: &StorageEngine, identifier: &str) -> Result<()> {
    println!("{}", engine.exists(identifier).await?);
    Ok(())
}

pub async fn stat(engine: &StorageEngine, identifier: &str) -> Result<()> {
    let meta = engine.head(identifier).await?;
    println!("path:          {}", meta.path);
    println!("size:          {}", meta.size);
    if let Some(ts) = meta.last_modified {
        println!("last_modified: {}", ts);
    }
    if let Some(etag) = &meta.etag {
        println!("etag:          {}", etag);
    }
    Ok(())
}

pub async fn ls(engine: &StorageEngine, identifier: &str, limit: Option<usize>) -> Result<()> {
    let objects = engine
        .list_with_options(identifier, ListOptions { limit })
        .await?;
    for meta in &objects {
        println!("{}", format_entry(meta));
    }
    Ok(())
}

pub async fn mv(engine: &StorageEngine, from: &str, to: &str) -> Result<()> {
    engine.move_object(from, to).await?;
    tracing::info!(from, to, "Moved object");
    Ok(())
}

pub async fn cp(engine: &StorageEngine, from: &str, to: &str) -> Result<()> {
    engine.copy(from, to).await?;
    tracing::info!(from, to, "Copied object");
    Ok(())
}

fn format_entry(meta: &ObjectMeta) -> String {
    format!("{:>12}  {}", meta.size, meta.path)
}
