//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::help::{command_name, uses_index};
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_copy_summary, format_download_summary, format_record_summary,
    format_records_json_lines, format_records_sql, format_verify_json_lines, format_verify_table,
};
use crate::concurrency::WorkerPool;
use crate::config::{ConfigLoader, HasherConfig};
use crate::copy::{Copier, ExistingPolicy};
use crate::download::{
    read_url_list, DownloadReport, DownloadState, Downloader, Fetcher, HttpFetcher,
};
use crate::error::ApiError;
use crate::report::ItemFailure;
use crate::store::HashStore;
use crate::tree::indexer::Indexer;
use crate::tree::walker::Walker;
use crate::verify::{VerificationResult, VerificationStatus, Verifier};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rendered command output plus the items that failed along the way.
///
/// The process exits non-zero when `failures` is non-empty, even though the
/// command itself ran to completion.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub rendered: String,
    pub failures: Vec<ItemFailure>,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runtime context for CLI execution: workspace, resolved config and shared services.
pub struct RunContext {
    workspace_root: PathBuf,
    config: HasherConfig,
    pool: WorkerPool,
    fetcher: Option<Arc<dyn Fetcher>>,
    color: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(workspace_root, config)
    }

    /// Create run context from an already loaded configuration.
    pub fn from_config(workspace_root: PathBuf, config: HasherConfig) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        let pool = WorkerPool::from_config(config.hashing.workers);
        Ok(Self {
            workspace_root,
            config,
            pool,
            fetcher: None,
            color: std::io::stdout().is_terminal(),
        })
    }

    /// Override the configured worker count (`--workers`).
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if let Some(n) = workers {
            self.pool = WorkerPool::new(n);
        }
        self
    }

    /// Use `fetcher` for downloads instead of building an HTTP client.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Force colored (or plain) table output regardless of the terminal.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.store.resolve_index_path(&self.workspace_root)
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        if uses_index(command) {
            info!(command = name, index = %self.index_path().display(), "Command started");
        } else {
            info!(command = name, "Command started");
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::WorkerError(format!("Failed to create runtime: {}", e)))?;
        let result = runtime.block_on(self.execute_inner(command));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => info!(
                command = name,
                failures = output.failures.len(),
                elapsed_ms,
                "Command finished"
            ),
            Err(e) => warn!(command = name, error = %e, elapsed_ms, "Command failed"),
        }
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Hash {
                dir,
                sql_only,
                dry_run,
                ..
            } => self.handle_hash(dir, *sql_only, *dry_run).await,
            Commands::Verify {
                mismatches_only,
                untracked,
                root,
                format,
            } => {
                self.handle_verify(*mismatches_only, *untracked, root.as_deref(), *format)
                    .await
            }
            Commands::Copy {
                compress,
                level,
                skip_existing,
                no_hash_existing,
                record,
                src,
                dst,
            } => {
                let existing = ExistingPolicy::from_flags(*skip_existing, *no_hash_existing);
                self.handle_copy(*compress, *level, existing, *record, src, dst)
                    .await
            }
            Commands::Download {
                compress,
                level,
                no_clobber,
                record,
                source,
                dst,
            } => {
                self.handle_download(*compress, *level, *no_clobber, *record, source, dst)
                    .await
            }
        }
    }

    async fn handle_hash(
        &self,
        dir: &Path,
        sql_only: bool,
        dry_run: bool,
    ) -> Result<CommandOutput, ApiError> {
        let mut store = HashStore::load(self.index_path(), &self.workspace_root)?;
        let walker = Walker::with_config(self.resolve(dir), self.config.hashing.walker_config());
        let report = Indexer::new(self.pool.clone(), self.config.hashing.buffer_size)
            .hash_tree(&mut store, &walker)
            .await?;

        if dry_run {
            info!(records = report.records.len(), "Dry run, index not written");
        } else {
            store.save()?;
        }

        let rendered = if sql_only {
            format_records_sql(&report.records)
        } else {
            format_records_json_lines(&report.records)?
        };
        Ok(CommandOutput {
            rendered,
            failures: report.failures,
        })
    }

    async fn handle_verify(
        &self,
        mismatches_only: bool,
        untracked: bool,
        root: Option<&Path>,
        format: OutputFormat,
    ) -> Result<CommandOutput, ApiError> {
        let mut store = HashStore::load(self.index_path(), &self.workspace_root)?;
        let untracked_walker = untracked.then(|| {
            let scan_root = root
                .map(|r| self.resolve(r))
                .unwrap_or_else(|| self.workspace_root.clone());
            Walker::with_config(scan_root, self.config.hashing.walker_config())
        });

        let report = Verifier::new(self.pool.clone(), self.config.hashing.buffer_size)
            .verify(&mut store, untracked_walker.as_ref())
            .await?;

        // Matches refreshed last_seen; nothing else changes the index
        if report.count(VerificationStatus::Match) > 0 {
            store.save()?;
        }

        let selected: Vec<&VerificationResult> = if mismatches_only {
            HashStore::query_mismatches_only(&report.results).collect()
        } else {
            report.results.iter().collect()
        };
        let rendered = match format {
            OutputFormat::Json => format_verify_json_lines(selected.iter().copied())?,
            OutputFormat::Text => format_verify_table(selected.iter().copied(), self.color),
        };

        let failures = report
            .results
            .iter()
            .filter(|r| r.status == VerificationStatus::Unreadable)
            .map(|r| ItemFailure::new(r.path.clone(), r.error.as_deref().unwrap_or("unreadable")))
            .collect();
        Ok(CommandOutput { rendered, failures })
    }

    async fn handle_copy(
        &self,
        compress: bool,
        level: Option<u32>,
        existing: ExistingPolicy,
        record: bool,
        src: &Path,
        dst: &Path,
    ) -> Result<CommandOutput, ApiError> {
        // Load first so a corrupt index fails the command before anything is written
        let store = self.load_store_if(record)?;
        let options = self.config.copy.options(compress, level, existing);
        let report = Copier::new(self.pool.clone(), self.config.hashing.buffer_size, options)
            .with_walker_config(self.config.hashing.walker_config())
            .copy(&self.resolve(src), &self.resolve(dst))
            .await?;

        let written = report.copied.iter().map(|c| c.destination.clone()).collect();
        let mut output = CommandOutput {
            rendered: format_copy_summary(&report),
            failures: report.failures,
        };
        if let Some(store) = store {
            self.record_written(store, written, &mut output).await?;
        }
        Ok(output)
    }

    async fn handle_download(
        &self,
        compress: bool,
        level: Option<u32>,
        no_clobber: bool,
        record: bool,
        source: &str,
        dst: &Path,
    ) -> Result<CommandOutput, ApiError> {
        let store = self.load_store_if(record)?;
        let level = level.unwrap_or(self.config.copy.compression_level);
        let options = self.config.download.options(compress, level, no_clobber);
        let fetcher: Arc<dyn Fetcher> = match &self.fetcher {
            Some(fetcher) => Arc::clone(fetcher),
            None => Arc::new(HttpFetcher::new(
                self.config.download.connect_timeout(),
                &self.config.download.user_agent,
            )?),
        };
        let downloader = Downloader::new(fetcher, options);
        let dst = self.resolve(dst);

        let list_path = self.resolve(Path::new(source));
        let report = if list_path.is_file() {
            debug!(list = %list_path.display(), "Reading URL list");
            let urls = read_url_list(&list_path)?;
            downloader.download_batch(urls, &dst).await
        } else {
            let outcome = downloader.download_one(source, &dst).await?;
            DownloadReport {
                outcomes: vec![outcome],
            }
        };

        let failures = report
            .outcomes
            .iter()
            .filter(|o| !o.state.is_success())
            .map(|o| ItemFailure::new(o.url.clone(), o.error.as_deref().unwrap_or("failed")))
            .collect();
        let mut output = CommandOutput {
            rendered: format_download_summary(&report),
            failures,
        };
        if let Some(store) = store {
            let stored = report
                .outcomes
                .iter()
                .filter(|o| o.state == DownloadState::Stored)
                .filter_map(|o| o.local_path.clone())
                .collect();
            self.record_written(store, stored, &mut output).await?;
        }
        Ok(output)
    }

    fn load_store_if(&self, record: bool) -> Result<Option<HashStore>, ApiError> {
        if !record {
            return Ok(None);
        }
        Ok(Some(HashStore::load(self.index_path(), &self.workspace_root)?))
    }

    /// Hash freshly written files into the index and save it.
    async fn record_written(
        &self,
        mut store: HashStore,
        files: Vec<PathBuf>,
        output: &mut CommandOutput,
    ) -> Result<(), ApiError> {
        let report = Indexer::new(self.pool.clone(), self.config.hashing.buffer_size)
            .hash_files(&mut store, files)
            .await?;
        store.save()?;
        output.rendered.push('\n');
        output.rendered.push_str(&format_record_summary(&report));
        output.failures.extend(report.failures);
        Ok(())
    }

    /// Relative CLI paths are taken relative to the workspace.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}
