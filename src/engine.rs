//! The inspection engine: one attached process, one scan session, one watch
//!
//! [`Engine`] is the single owner of mutable state. Selecting a process
//! atomically invalidates everything derived from the previous one: the
//! active watch is cancelled and joined, the scan session is cleared and
//! the old handle is closed.

use crate::config::Config;
use crate::core::types::{
    Address, HandleState, MemoryChunk, MemoryResult, ProcessAccessError, ProcessId, ProcessInfo,
    ScanSession, ScanStateError, Settings, ValueSize, WatchId,
};
use crate::memory::{self, MemoryScanner, MemoryWriter};
use crate::process::{ProcessSource, SystemProcesses, TargetHandle};
use crate::watch::{WatchRegistry, WatchSubscription, WatchTarget};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Engine {
    config: Config,
    source: Arc<dyn ProcessSource>,
    scanner: MemoryScanner,
    target: Option<Arc<TargetHandle>>,
    session: Option<ScanSession>,
    generation: u64,
    watches: WatchRegistry,
    settings: Settings,
}

impl Engine {
    pub fn new(config: Config, source: Arc<dyn ProcessSource>) -> MemoryResult<Self> {
        let settings = Settings {
            value_size: config.settings.value_size()?,
        };
        let scanner = MemoryScanner::new(&config.scanner)?;
        let watches = WatchRegistry::new(&config.watch);
        debug!(?scanner, ?watches, "engine created");

        Ok(Engine {
            config,
            source,
            scanner,
            target: None,
            session: None,
            generation: 0,
            watches,
            settings,
        })
    }

    /// An engine over the processes of this machine
    pub fn with_system_processes(config: Config) -> MemoryResult<Self> {
        Self::new(config, Arc::new(SystemProcesses::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn open_target(&self) -> MemoryResult<&Arc<TargetHandle>> {
        match &self.target {
            Some(target) if target.is_open() => Ok(target),
            _ => Err(ProcessAccessError::NotAttached.into()),
        }
    }

    /// Drops the watch, the session and the handle
    async fn invalidate(&mut self) {
        self.watches.unlisten().await;
        self.session = None;
        self.next_generation();
        if let Some(old) = self.target.take() {
            old.close();
        }
    }

    // ----- process selection -----

    /// Opens `pid` and makes it the target, returning its token
    ///
    /// On failure the previous target stays attached.
    pub async fn select_process(&mut self, pid: ProcessId) -> MemoryResult<String> {
        if !self.config.attach.allow_reattach {
            if let Some(current) = self.target.as_ref().filter(|t| t.is_open()) {
                if current.pid() == pid {
                    return Err(ProcessAccessError::AlreadyOpen(pid).into());
                }
            }
        }

        let opened = self.source.open(pid)?;
        let target = Arc::new(TargetHandle::new(opened)?);

        self.invalidate().await;
        info!(pid, name = %target.info().name, regions = target.regions().len(), "attached");
        self.target = Some(target);
        Ok(pid.to_string())
    }

    /// Processes whose name contains `query`, case-insensitively, ordered by pid
    pub fn list_processes(&self, query: &str) -> Vec<ProcessInfo> {
        let mut processes = match self.source.processes() {
            Ok(processes) => processes,
            Err(e) => {
                warn!(error = %e, "process enumeration failed");
                return Vec::new();
            }
        };
        processes.retain(|p| p.name_matches(query));
        processes.sort_by_key(|p| p.pid);
        processes
    }

    /// The attached process, while its handle is open
    pub fn current_process(&self) -> Option<ProcessInfo> {
        self.open_target().ok().map(|t| t.info().clone())
    }

    pub fn handle_state(&self) -> HandleState {
        if self.open_target().is_ok() {
            HandleState::Open
        } else {
            HandleState::Closed
        }
    }

    /// Re-enumerates the target's regions, returning how many there are
    pub fn refresh_regions(&self) -> MemoryResult<usize> {
        Ok(self.open_target()?.refresh_regions()?.len())
    }

    /// Closes the target and forgets the session and watch
    pub async fn detach(&mut self) {
        if let Some(target) = &self.target {
            info!(pid = target.pid(), "detaching");
        }
        self.invalidate().await;
    }

    // ----- scanning -----

    /// Starts a new session from every address holding `value`
    ///
    /// `size` defaults to the engine settings. The previous session is
    /// replaced even when nothing matches.
    pub fn populate_with_value(
        &mut self,
        value: u64,
        size: Option<usize>,
    ) -> MemoryResult<Vec<MemoryChunk>> {
        let size = match size {
            Some(size) => ValueSize::try_from(size)?,
            None => self.settings.value_size,
        };
        let value = size.check(value)?;
        let target = Arc::clone(self.open_target()?);

        let generation = self.next_generation();
        let session = self.scanner.populate(&target, value, size, generation)?;
        let chunks = session.chunks();
        self.session = Some(session);
        Ok(chunks)
    }

    /// Keeps candidates currently equal to `value`
    pub fn scan_next(&mut self, value: u64) -> MemoryResult<Vec<MemoryChunk>> {
        let session = self
            .session
            .as_ref()
            .ok_or(ScanStateError::NoActiveSession)?;
        let value = session.value_size().check(value)?;
        let target = Arc::clone(self.open_target()?);

        let generation = self.generation + 1;
        let next = self.scanner.scan_next(&target, session, value, generation);
        self.generation = generation;
        let chunks = next.chunks();
        self.session = Some(next);
        Ok(chunks)
    }

    /// Keeps candidates that changed (or didn't) since they were last observed
    ///
    /// An empty result leaves the session untouched so the opposite
    /// question can still be asked of the same candidates.
    pub fn expect_change(&mut self, is_changed: bool) -> MemoryResult<Vec<MemoryChunk>> {
        let session = self
            .session
            .as_ref()
            .ok_or(ScanStateError::NoActiveSession)?;
        let target = Arc::clone(self.open_target()?);

        let generation = self.generation + 1;
        let next = self
            .scanner
            .expect_change(&target, session, is_changed, generation);
        if next.is_empty() {
            debug!(is_changed, "expect_change matched nothing; session kept");
            return Ok(Vec::new());
        }

        self.generation = generation;
        let chunks = next.chunks();
        self.session = Some(next);
        Ok(chunks)
    }

    /// Forgets the scan session
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            self.next_generation();
            debug!("scan session cleared");
        }
    }

    /// Forgets everything: watch, session, target and settings
    pub async fn reset_state(&mut self) {
        self.invalidate().await;
        self.settings = Settings {
            value_size: self.config.settings.value_size().unwrap_or_default(),
        };
        info!("engine state reset");
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    // ----- watching -----

    /// Starts watching, replacing any active watch
    pub async fn watch(
        &mut self,
        watched: WatchTarget,
        size: usize,
    ) -> MemoryResult<WatchSubscription> {
        let size = ValueSize::try_from(size)?;
        let target = Arc::clone(self.open_target()?);
        self.watches.watch(target, watched, size).await
    }

    /// Cancels the active watch, if any
    pub async fn unlisten(&mut self) -> Option<WatchId> {
        self.watches.unlisten().await
    }

    pub fn active_watch(&self) -> Option<WatchId> {
        self.watches.active()
    }

    // ----- writing -----

    /// Writes `value` as `size` bytes; nothing is written when validation fails
    pub fn write(&self, address: Address, size: usize, value: u64) -> MemoryResult<()> {
        let size = ValueSize::try_from(size)?;
        let value = size.check(value)?;
        let target = self.open_target()?;
        MemoryWriter::new(target).write(address, size, value)
    }

    /// Writes the in-air/on-ground sequence at `address`
    pub fn bhop(&self, address: Address, size: usize) -> MemoryResult<()> {
        let size = ValueSize::try_from(size)?;
        let target = self.open_target()?;
        MemoryWriter::new(target).bhop(address, size)
    }

    // ----- neighbors and settings -----

    /// Values around `offset` at the session's width, or the settings width
    pub fn neighbors(&self, offset: Address) -> MemoryResult<Vec<MemoryChunk>> {
        let target = self.open_target()?;
        let size = self
            .session
            .as_ref()
            .map(ScanSession::value_size)
            .unwrap_or(self.settings.value_size);
        Ok(memory::neighbors(
            target,
            offset,
            size,
            self.config.neighbors.radius,
        ))
    }

    /// Every aligned value of the scanned regions at `size`, or the settings width
    pub fn process_memory(&self, size: Option<usize>) -> MemoryResult<Vec<MemoryChunk>> {
        let size = match size {
            Some(size) => ValueSize::try_from(size)?,
            None => self.settings.value_size,
        };
        let target = self.open_target()?;
        self.scanner.snapshot(target, size)
    }

    /// Replaces the engine settings; the current session keeps its own width
    pub fn change_settings(&mut self, value_size: usize) -> MemoryResult<Settings> {
        let value_size = ValueSize::try_from(value_size)?;
        self.settings = Settings { value_size };
        debug!(value_size = value_size.bytes(), "settings changed");
        Ok(self.settings)
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("target", &self.target)
            .field("candidates", &self.session.as_ref().map(ScanSession::len))
            .field("generation", &self.generation)
            .field("settings", &self.settings)
            .finish()
    }
}
