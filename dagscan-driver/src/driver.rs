//! The upload driver (SPEC_FULL.md §4.4, dagscan CORE component C4): makes
//! forward progress on an entire upload by interleaving leaf (file) DAG
//! builds with interior (directory) builds, promoting a directory out of
//! `AwaitingChildren` only once every child has reached `Completed`.

use std::sync::Arc;

use cid::Cid;
use dagscan_interface::{
    DagScan, DagScanError, FileAccessor, Repository, ScanKind, ScanState,
};
use dagscan_scan::ScanTransitions;
use dagscan_unixfs::EmitCallback;
use tokio_util::sync::CancellationToken;

use crate::config::DriverConfig;

/// Drives scans for one upload at a time to completion (SPEC_FULL.md §5:
/// "single-threaded cooperative over one upload"). Multiple `Driver`s MAY
/// run concurrently over different uploads; correctness across uploads is
/// a repository responsibility (no two drivers may operate on overlapping
/// scans).
pub struct Driver {
    repo: Arc<dyn Repository>,
    accessor: Arc<dyn FileAccessor>,
    _config: DriverConfig,
}

impl Driver {
    pub fn new(repo: Arc<dyn Repository>, accessor: Arc<dyn FileAccessor>) -> Self {
        Self::with_config(repo, accessor, DriverConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn Repository>,
        accessor: Arc<dyn FileAccessor>,
        config: DriverConfig,
    ) -> Self {
        Self {
            repo,
            accessor,
            _config: config,
        }
    }

    /// Recovers interrupted work: every scan of `upload_id` left `Running`
    /// (crashed mid-build) or `Canceled` is transitioned back to `Pending`
    /// so the next `Run` picks it up from scratch (SPEC_FULL.md §4.4
    /// `Restart`).
    pub async fn restart(&self, upload_id: &str) -> Result<(), DagScanError> {
        let upload_id = upload_id.to_string();
        let stuck = self
            .repo
            .scans_for_upload_by_status(&upload_id, &[ScanState::Running, ScanState::Canceled])
            .await?;
        for mut scan in stuck {
            scan.restart()?;
            self.repo.update_dag_scan(&scan).await?;
            tracing::info!(fs_entry_id = %scan.fs_entry_id, upload_id = %scan.upload_id, "restarted interrupted scan");
        }
        Ok(())
    }

    /// Makes forward progress until no scan for `upload_id` is `Pending`
    /// or `AwaitingChildren` (SPEC_FULL.md §4.4 `Run`). Returns once the
    /// upload has converged (every scan terminal) or the CORE can make no
    /// further progress from its own side (remaining `AwaitingChildren`
    /// scans all have at least one non-terminal child).
    ///
    /// A repository error aborts immediately and is returned to the
    /// caller (SPEC_FULL.md §7: persistence failures abort the driver;
    /// per-scan failures do not).
    pub async fn run(
        &self,
        upload_id: &str,
        ctx: &CancellationToken,
        emit: &dyn EmitCallback,
    ) -> Result<(), DagScanError> {
        loop {
            let scans = self
                .repo
                .scans_for_upload_by_status(
                    &upload_id.to_string(),
                    &[ScanState::Pending, ScanState::AwaitingChildren],
                )
                .await?;
            if scans.is_empty() {
                tracing::info!(upload_id, "driver pass found no runnable scans; upload converged");
                return Ok(());
            }

            let mut executions = 0usize;
            for mut scan in scans {
                if ctx.is_cancelled() {
                    tracing::warn!(upload_id, "cancellation observed between scans; yielding");
                    return Ok(());
                }
                match scan.state {
                    ScanState::Pending => {
                        self.execute_scan(&mut scan, ctx, emit).await?;
                        executions += 1;
                    }
                    ScanState::AwaitingChildren => {
                        self.handle_awaiting_children(&mut scan).await?;
                        if scan.state == ScanState::Pending {
                            self.execute_scan(&mut scan, ctx, emit).await?;
                            executions += 1;
                        }
                    }
                    _ => {}
                }
            }

            if executions == 0 {
                tracing::info!(
                    upload_id,
                    "driver pass made no progress; remaining scans await children elsewhere"
                );
                return Ok(());
            }
        }
    }

    /// Checks whether a directory scan's children have all reached a
    /// terminal state and, if so, either promotes it to `Pending` or
    /// poisons it with `Failed` (SPEC_FULL.md §4.4 `HandleAwaitingChildren`).
    async fn handle_awaiting_children(&self, scan: &mut DagScan) -> Result<(), DagScanError> {
        let children = self.repo.child_scans(scan).await?;

        if let Some(failed_child) = children.iter().find(|c| c.state == ScanState::Failed) {
            let child_message = failed_child.error_message.clone().unwrap_or_default();
            scan.fail(format!("child scan failed: {child_message}"))?;
            self.repo.update_dag_scan(scan).await?;
            tracing::warn!(
                fs_entry_id = %scan.fs_entry_id,
                child = %failed_child.fs_entry_id,
                "directory scan failed: child scan failed"
            );
            return Ok(());
        }

        if children.iter().all(|c| c.state == ScanState::Completed) {
            scan.children_completed()?;
            self.repo.update_dag_scan(scan).await?;
            tracing::debug!(fs_entry_id = %scan.fs_entry_id, "directory scan promoted: all children completed");
        }

        Ok(())
    }

    /// Executes a single `Pending` scan to a terminal state, persisting
    /// every transition along the way (SPEC_FULL.md §4.4 `ExecuteScan`).
    async fn execute_scan(
        &self,
        scan: &mut DagScan,
        ctx: &CancellationToken,
        emit: &dyn EmitCallback,
    ) -> Result<(), DagScanError> {
        scan.start()?;
        self.repo.update_dag_scan(scan).await?;
        tracing::debug!(fs_entry_id = %scan.fs_entry_id, kind = ?scan.kind, "scan started");

        let result = self.produce(scan, ctx, emit).await;

        match result {
            Ok(cid) => {
                scan.complete(cid)?;
                tracing::info!(fs_entry_id = %scan.fs_entry_id, %cid, "scan completed");
            }
            Err(DagScanError::Canceled) => {
                scan.cancel()?;
                tracing::warn!(fs_entry_id = %scan.fs_entry_id, "scan canceled");
            }
            Err(err) if err.aborts_driver() => {
                // Persistence is broken; leave the scan Running so a
                // later Restart recovers it rather than risking a write
                // against a store that just failed.
                return Err(err);
            }
            Err(err) => {
                scan.fail(err.to_string())?;
                tracing::error!(fs_entry_id = %scan.fs_entry_id, error = %err, "scan failed");
            }
        }

        self.repo.update_dag_scan(scan).await?;
        Ok(())
    }

    async fn produce(
        &self,
        scan: &DagScan,
        ctx: &CancellationToken,
        emit: &dyn EmitCallback,
    ) -> Result<Cid, DagScanError> {
        match scan.kind {
            ScanKind::File => {
                dagscan_unixfs::produce_file(
                    self.repo.as_ref(),
                    self.accessor.as_ref(),
                    ctx,
                    scan,
                    emit,
                )
                .await
            }
            ScanKind::Directory => {
                dagscan_unixfs::produce_directory(self.repo.as_ref(), scan, emit).await
            }
        }
    }
}
