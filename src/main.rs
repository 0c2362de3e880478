//! drive_reconcile CLI - upload, list and fetch files on Google Drive.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;

use drive_reconcile::auth::{CREDENTIALS_JSON_ENV, CREDENTIALS_PATH_ENV};
use drive_reconcile::models::format_size;
use drive_reconcile::{
    extract_id, Authenticator, Downloader, DriveClient, FolderWalker, Reconciler, RemoteStore,
    TraversalMode, UploadRequest,
};

/// CLI tool for reconciling files with Google Drive.
#[derive(Parser)]
#[command(name = "drive_reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = CREDENTIALS_PATH_ENV)]
    credentials: Option<PathBuf>,

    /// Inline service account JSON document (takes precedence over --credentials).
    #[arg(long, env = CREDENTIALS_JSON_ENV, hide_env_values = true)]
    credentials_json: Option<String>,

    /// Restrict listings to this Shared Drive.
    #[arg(long, env = "SHARED_DRIVE_ID")]
    drive_id: Option<String>,

    /// Log filter, e.g. `debug` or `drive_reconcile=trace` (defaults to RUST_LOG, then `info`).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ID of the folder with the given name.
    FindFolder {
        name: String,
    },

    /// List the folders (and optionally files) in a folder.
    List {
        /// Folder URL or ID.
        folder: String,

        /// Walk every sub-folder.
        #[arg(long, short = 'r')]
        recursive: bool,

        /// With --recursive, print nested folders too instead of only direct children.
        #[arg(long, requires = "recursive")]
        aggregate: bool,

        /// Also list files directly in the folder.
        #[arg(long, short = 'f')]
        files: bool,
    },

    /// Create a folder.
    Mkdir {
        name: String,

        /// Parent folder URL or ID.
        #[arg(long, short = 'p')]
        parent: String,
    },

    /// Upload files to a folder, updating same-named files in place.
    Upload {
        /// File patterns to upload (supports glob patterns like *.tar, file_{1,2,3}.txt).
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Destination folder URL or ID.
        #[arg(long, short = 't')]
        to: String,

        /// Remote name, when uploading a single file.
        #[arg(long)]
        name: Option<String>,

        /// Content type, guessed from the extension by default.
        #[arg(long)]
        content_type: Option<String>,

        /// Always create a new file even if one with the same name exists.
        #[arg(long)]
        no_replace: bool,
    },

    /// Download a file to local filesystem.
    Download {
        /// File URL or ID to download.
        file: String,

        /// Local destination path (file or directory).
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,
    },

    /// Delete a file or folder.
    Delete {
        /// File or folder URL or ID.
        file: String,
    },
}

impl Cli {
    fn authenticator(&self) -> Result<Authenticator> {
        if let Some(document) = &self.credentials_json {
            return Authenticator::from_json(document).context("Invalid inline credentials");
        }
        match &self.credentials {
            Some(path) => Authenticator::from_file(path)
                .with_context(|| format!("Failed to load credentials from {:?}", path)),
            None => anyhow::bail!(
                "No credentials: pass --credentials or set {} or {}",
                CREDENTIALS_PATH_ENV,
                CREDENTIALS_JSON_ENV
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = env_logger::Env::default().default_filter_or("info");
    let mut logger = env_logger::Builder::from_env(env);
    if let Some(level) = &cli.log_level {
        logger.parse_filters(level);
    }
    logger.format_timestamp(None).init();

    let mut client = DriveClient::new(cli.authenticator()?);
    if let Some(drive_id) = &cli.drive_id {
        client = client.with_drive_id(drive_id);
    }

    match cli.command {
        Commands::FindFolder { name } => {
            let id = FolderWalker::new(&client)
                .find_container_by_name(&name)
                .await
                .with_context(|| format!("Failed to look up folder: {}", name))?;
            println!("{}", id);
        }

        Commands::List {
            folder,
            recursive,
            aggregate,
            files,
        } => {
            let folder_id = extract_id(&folder)
                .with_context(|| format!("Invalid folder URL or ID: {}", folder))?;

            let mode = if aggregate {
                TraversalMode::Aggregated
            } else {
                TraversalMode::Flat
            };
            let walker = FolderWalker::new(&client).with_mode(mode);

            let mut entries = walker.list_child_containers(&folder_id, recursive).await;
            if files {
                entries.extend(walker.list_child_objects(&folder_id).await);
            }

            if entries.is_empty() {
                println!("No entries found.");
            } else {
                println!("{:<44} {:<5} {}", "ID", "KIND", "NAME");
                println!("{}", "-".repeat(80));
                for entry in entries {
                    println!("{}", entry);
                }
            }
        }

        Commands::Mkdir { name, parent } => {
            let parent_id = extract_id(&parent)
                .with_context(|| format!("Invalid folder URL or ID: {}", parent))?;

            let id = FolderWalker::new(&client)
                .create_child_container(&parent_id, &name)
                .await
                .with_context(|| format!("Failed to create folder {} in {}", name, parent_id))?;
            println!("{}", id);
        }

        Commands::Upload {
            patterns,
            to,
            name,
            content_type,
            no_replace,
        } => {
            let folder_id = extract_id(&to)
                .with_context(|| format!("Invalid folder URL or ID: {}", to))?;

            let files_to_upload = expand_patterns(&patterns)?;
            if files_to_upload.is_empty() {
                anyhow::bail!("No files to upload");
            }
            if name.is_some() && files_to_upload.len() > 1 {
                anyhow::bail!("--name needs exactly one file, got {}", files_to_upload.len());
            }

            println!("Uploading {} file(s) to {}...", files_to_upload.len(), folder_id);

            let reconciler = Reconciler::new(&client);
            let mut failures = 0;
            for (idx, file_path) in files_to_upload.iter().enumerate() {
                let mut request =
                    UploadRequest::from_path(file_path, folder_id.as_str()).replace(!no_replace);
                if let Some(name) = &name {
                    request = request.display_name(name);
                }
                if let Some(content_type) = &content_type {
                    request = request.content_type(content_type);
                }

                let filename = file_path.file_name().unwrap_or_default().to_string_lossy();
                print!("[{}/{}] Uploading {}... ", idx + 1, files_to_upload.len(), filename);
                std::io::stdout().flush()?;

                match reconciler.reconcile_upload(&request).await {
                    Ok(outcome) => println!("OK, {} ({})", outcome.action, outcome.remote_id),
                    Err(e) => {
                        failures += 1;
                        println!("FAILED");
                        eprintln!("  Error: {}", e);
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} upload(s) failed", failures);
            }
            println!("Done.");
        }

        Commands::Download { file, to } => {
            let file_id = extract_id(&file)
                .with_context(|| format!("Invalid file URL or ID: {}", file))?;

            let final_path = if to.is_dir() || to.to_string_lossy().ends_with('/') {
                std::fs::create_dir_all(&to)
                    .with_context(|| format!("Failed to create directory: {:?}", to))?;
                let metadata = client
                    .get_file(&file_id)
                    .await
                    .with_context(|| format!("Failed to fetch metadata of {}", file_id))?;
                to.join(&metadata.name)
            } else {
                if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create directory: {:?}", parent))?;
                }
                to
            };

            let output = tokio::fs::File::create(&final_path)
                .await
                .with_context(|| format!("Failed to create {:?}", final_path))?;

            let bytes = Downloader::new(&client, file_id.as_str(), output)
                .run(|status| println!("Download {}%.", (status.progress * 100.0) as u32))
                .await
                .with_context(|| format!("Failed to download file: {}", file_id))?;

            println!("Saved {} to {:?}", format_size(bytes), final_path);
        }

        Commands::Delete { file } => {
            let file_id = extract_id(&file)
                .with_context(|| format!("Invalid file URL or ID: {}", file))?;

            client
                .delete(&file_id)
                .await
                .with_context(|| format!("Failed to delete: {}", file_id))?;
            println!("Deleted {}", file_id);
        }
    }

    Ok(())
}

/// Expand glob and brace patterns into a sorted, de-duplicated file list.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        for expanded in expand_braces(pattern) {
            let matches: Vec<PathBuf> = glob(&expanded)
                .with_context(|| format!("Invalid glob pattern: {}", expanded))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();

            if !matches.is_empty() {
                files.extend(matches);
                continue;
            }

            // Unmatched patterns are tried as literal paths.
            let path = PathBuf::from(&expanded);
            if path.is_file() {
                files.push(path);
            } else {
                log::warn!("No files matched pattern: {}", expanded);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Expand brace patterns like file_{1,2,3}.txt into multiple patterns.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(start) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(len) = pattern[start..].find('}') else {
        return vec![pattern.to_string()];
    };
    let end = start + len;
    let (prefix, suffix) = (&pattern[..start], &pattern[end + 1..]);

    pattern[start + 1..end]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{}{}{}", prefix, alt.trim(), suffix)))
        .collect()
}
