use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use futures::TryStreamExt;
use pathy::any::S3_ANCHOR;
use pathy::providers::{EndpointProvider, Provider, ProviderRegistry, create_s3_client};
use pathy::{AnyPath, Backends, MkdirOptions, PurePath, RmOptions, StoragePath};
use tokio::io::AsyncReadExt;

#[derive(Parser, Debug)]
#[command(name = "pathy", version, about = "Work with local and S3 paths through one interface")]
struct Cli {
    /// S3 provider used for s3:// paths
    #[arg(long, default_value = "aws")]
    provider: String,

    /// Custom S3 endpoint; implies the `endpoint` provider
    #[arg(long)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List immediate children
    Ls { path: String },
    /// List descendants matching a pattern (`*`, `**`, `?`)
    Glob {
        path: String,
        pattern: Option<String>,
    },
    /// Print contents
    Cat { path: String },
    /// Write stdin to a path
    Put { path: String },
    /// Create an empty entity if missing
    Touch { path: String },
    /// Create a directory
    Mkdir {
        #[arg(short, long)]
        parents: bool,
        path: String,
    },
    /// Delete an entity
    Rm {
        #[arg(short, long)]
        recursive: bool,
        path: String,
    },
    /// Move an entity
    Mv { from: String, to: String },
    /// Show how a path parses and what is behind it
    Stat { path: String },
}

impl Command {
    fn paths(&self) -> Vec<&str> {
        match self {
            Command::Ls { path }
            | Command::Glob { path, .. }
            | Command::Cat { path }
            | Command::Put { path }
            | Command::Touch { path }
            | Command::Mkdir { path, .. }
            | Command::Rm { path, .. }
            | Command::Stat { path } => vec![path.as_str()],
            Command::Mv { from, to } => vec![from.as_str(), to.as_str()],
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let backends = backends_for(&cli).await?;
    let path = |raw: &str| -> Result<AnyPath> {
        backends
            .path(raw)
            .with_context(|| format!("Invalid path: {raw}"))
    };

    match &cli.command {
        Command::Ls { path: raw } => {
            let mut children = path(raw)?.ls();
            while let Some(child) = children.try_next().await? {
                if !write_line(&child)? {
                    break;
                }
            }
        }
        Command::Glob { path: raw, pattern } => {
            let mut found = path(raw)?.glob(pattern.as_deref());
            while let Some(hit) = found.try_next().await? {
                if !write_line(&hit)? {
                    break;
                }
            }
        }
        Command::Cat { path: raw } => {
            let mut out = ChunkWriter::new(io::stdout());
            path(raw)?.read_callback(|chunk| out.push(&chunk)).await?;
            out.finish().context("Failed to write to stdout")?;
        }
        Command::Put { path: raw } => {
            let target = path(raw)?;
            let mut sink = target.write_stream().await?;
            let mut stdin = tokio::io::stdin();
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let n = stdin.read(&mut buf).await.context("Failed to read stdin")?;
                if n == 0 {
                    break;
                }
                sink.write(&buf[..n]).await?;
            }
            sink.close().await?;
        }
        Command::Touch { path: raw } => path(raw)?.touch().await?,
        Command::Mkdir {
            parents,
            path: raw,
        } => {
            path(raw)?
                .mkdir(MkdirOptions { parents: *parents })
                .await?
        }
        Command::Rm {
            recursive,
            path: raw,
        } => {
            path(raw)?
                .rm(RmOptions {
                    recursive: *recursive,
                })
                .await?
        }
        Command::Mv { from, to } => {
            let moved = path(from)?.mv(&path(to)?).await?;
            println!("{}", moved.to_string().green());
        }
        Command::Stat { path: raw } => {
            let p = path(raw)?;
            println!("{:<10} {}", "backend".bold(), p.backend());
            println!("{:<10} {:?}", "anchor".bold(), p.anchor());
            println!("{:<10} {:?}", "parents".bold(), p.parents());
            println!("{:<10} {:?}", "name".bold(), p.name());
            println!("{:<10} {:?}", "ext".bold(), p.ext());
            println!("{:<10} {}", "exists".bold(), p.exists().await?);
            println!("{:<10} {}", "file".bold(), p.is_file().await?);
            match p.is_dir().await {
                Ok(is_dir) => println!("{:<10} {}", "dir".bold(), is_dir),
                Err(e) if e.is_unsupported() => println!("{:<10} {}", "dir".bold(), "n/a".dimmed()),
                Err(e) => return Err(e.into()),
            }
            if let Some(object) = p.as_s3().filter(|o| !o.key().is_empty()) {
                let bucket = object.bucket();
                let head = bucket
                    .client()
                    .head_object(bucket.name(), &object.key())
                    .await?;
                if let Some(meta) = head {
                    println!("{:<10} {}", "size".bold(), meta.size);
                    if let Some(content_type) = meta.content_type {
                        println!("{:<10} {}", "type".bold(), content_type);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Only builds an S3 client when an argument needs one.
async fn backends_for(cli: &Cli) -> Result<Backends> {
    let backends = Backends::new();
    if !cli.command.paths().iter().any(|p| p.starts_with(S3_ANCHOR)) {
        return Ok(backends);
    }

    let config = match &cli.endpoint_url {
        Some(url) => EndpointProvider::new(url.clone()).build_config().await?,
        None => {
            let registry = ProviderRegistry::new();
            let provider = registry.get(&cli.provider).ok_or_else(|| {
                anyhow!(
                    "Unknown provider '{}' (available: {})",
                    cli.provider,
                    registry.list().join(", ")
                )
            })?;
            provider.build_config().await?
        }
    };

    let client = create_s3_client(config)
        .await
        .context("Failed to initialize S3 client")?;
    Ok(backends.with_s3(Arc::new(client)))
}

/// Copies streamed chunks to `out`, keeping the first write error.
///
/// A closed pipe ends the copy quietly, like `write_line`.
struct ChunkWriter<W: Write> {
    out: W,
    closed: bool,
    failed: Option<io::Error>,
}

impl<W: Write> ChunkWriter<W> {
    fn new(out: W) -> Self {
        ChunkWriter {
            out,
            closed: false,
            failed: None,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        if self.closed || self.failed.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(chunk) {
            self.record(e);
        }
    }

    fn record(&mut self, e: io::Error) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            self.closed = true;
        } else {
            self.failed = Some(e);
        }
    }

    fn finish(mut self) -> io::Result<()> {
        if !self.closed && self.failed.is_none() {
            if let Err(e) = self.out.flush() {
                self.record(e);
            }
        }
        match self.failed {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Print one path; `false` once stdout is gone (e.g. piped into `head`).
fn write_line(path: &AnyPath) -> Result<bool> {
    match writeln!(io::stdout(), "{path}") {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(e) => Err(e.into()),
    }
}
