use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use crate::cli::LogTypeArg;
use crate::logging::LogKind;

const FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

fn selected(log_type: LogTypeArg) -> Vec<LogKind> {
    match log_type {
        LogTypeArg::All => LogKind::ALL.to_vec(),
        LogTypeArg::App => vec![LogKind::App],
        LogTypeArg::Error => vec![LogKind::Error],
        LogTypeArg::Security => vec![LogKind::Security],
    }
}

/// Last `count` lines of `content`.
fn tail(content: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

pub async fn view_logs(directory: &Path, log_type: LogTypeArg, lines: usize, follow: bool, clear: bool) -> Result<()> {
    let paths: Vec<PathBuf> = selected(log_type).iter().map(|k| k.path(directory)).collect();

    if clear {
        for path in &paths {
            if fs::try_exists(path).await.unwrap_or(false) {
                fs::write(path, b"")
                    .await
                    .with_context(|| format!("Failed to clear {}", path.display()))?;
                info!("Cleared {}", path.display());
                println!("Cleared {}", path.display());
            }
        }
        return Ok(());
    }

    let mut offsets = Vec::with_capacity(paths.len());
    for path in &paths {
        if paths.len() > 1 {
            println!("==> {} <==", path.display());
        }
        match fs::read_to_string(path).await {
            Ok(content) => {
                for line in tail(&content, lines) {
                    println!("{}", line);
                }
                offsets.push(content.len() as u64);
            }
            Err(_) => {
                println!("(no log file yet)");
                offsets.push(0);
            }
        }
    }

    if !follow {
        return Ok(());
    }

    debug!("Following {} log files", paths.len());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(FOLLOW_INTERVAL) => {
                for (path, offset) in paths.iter().zip(offsets.iter_mut()) {
                    print_appended(path, offset).await?;
                }
            }
        }
    }
    Ok(())
}

/// Prints whatever was written after `offset` and moves it forward.
async fn print_appended(path: &Path, offset: &mut u64) -> Result<()> {
    let Ok(metadata) = fs::metadata(path).await else {
        return Ok(());
    };
    let len = metadata.len();
    if len < *offset {
        // Truncated by --clear
        *offset = 0;
    }
    if len == *offset {
        return Ok(());
    }

    let mut file = fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.seek(std::io::SeekFrom::Start(*offset)).await?;
    let mut appended = String::new();
    file.read_to_string(&mut appended).await?;
    *offset += appended.len() as u64;
    print!("{}", appended);
    Ok(())
}
