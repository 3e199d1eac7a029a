//! # dagscan-scan
//!
//! The per-entry scan state machine (dagscan CORE component C1,
//! SPEC_FULL.md §4.1): six states, a fixed set of named transitions, and
//! the invariant that any disallowed call returns `InvalidTransition`
//! without mutating the scan.
//!
//! ```text
//! Pending           → Running            (Start)
//! Running           → Completed          (Complete(cid))
//! Running           → Failed             (Fail(msg))
//! Running           → Canceled           (Cancel)
//! Pending           → Canceled           (Cancel)
//! AwaitingChildren  → Canceled           (Cancel)
//! AwaitingChildren  → Failed             (Fail(msg))      // child failed
//! AwaitingChildren  → Pending            (ChildrenCompleted, directory only)
//! Running           → Pending            (Restart)
//! Canceled          → Pending            (Restart)
//! ```

use chrono::Utc;
use cid::Cid;
use dagscan_interface::{DagScan, DagScanError, ScanKind, ScanState};

fn invalid(from: ScanState, attempted: &'static str) -> DagScanError {
    DagScanError::InvalidTransition {
        from: from.as_str(),
        attempted,
    }
}

/// The named transitions of SPEC_FULL.md §4.1, implemented directly on
/// `DagScan` rather than through a deeper type hierarchy (SPEC_FULL.md §9
/// "polymorphism over scan kinds").
pub trait ScanTransitions {
    /// `Pending → Running`.
    fn start(&mut self) -> Result<(), DagScanError>;

    /// `Running → Completed`; sets `cid` and clears `error_message`.
    fn complete(&mut self, cid: Cid) -> Result<(), DagScanError>;

    /// `Running | AwaitingChildren → Failed`; sets `error_message`.
    fn fail(&mut self, message: impl Into<String>) -> Result<(), DagScanError>;

    /// `Pending | Running | AwaitingChildren → Canceled`.
    fn cancel(&mut self) -> Result<(), DagScanError>;

    /// `AwaitingChildren → Pending`. Directory scans only.
    fn children_completed(&mut self) -> Result<(), DagScanError>;

    /// `Running | Canceled → Pending`. Used by the driver's `Restart` op
    /// to recover interrupted work (SPEC_FULL.md §4.4).
    fn restart(&mut self) -> Result<(), DagScanError>;
}

impl ScanTransitions for DagScan {
    fn start(&mut self) -> Result<(), DagScanError> {
        if self.state != ScanState::Pending {
            return Err(invalid(self.state, "Start"));
        }
        self.state = ScanState::Running;
        touch(self);
        Ok(())
    }

    fn complete(&mut self, cid: Cid) -> Result<(), DagScanError> {
        if self.state != ScanState::Running {
            return Err(invalid(self.state, "Complete"));
        }
        self.state = ScanState::Completed;
        self.cid = Some(cid);
        self.error_message = None;
        touch(self);
        Ok(())
    }

    fn fail(&mut self, message: impl Into<String>) -> Result<(), DagScanError> {
        match self.state {
            ScanState::Running | ScanState::AwaitingChildren => {
                self.state = ScanState::Failed;
                self.error_message = Some(message.into());
                touch(self);
                Ok(())
            }
            other => Err(invalid(other, "Fail")),
        }
    }

    fn cancel(&mut self) -> Result<(), DagScanError> {
        match self.state {
            ScanState::Pending | ScanState::Running | ScanState::AwaitingChildren => {
                self.state = ScanState::Canceled;
                touch(self);
                Ok(())
            }
            other => Err(invalid(other, "Cancel")),
        }
    }

    fn children_completed(&mut self) -> Result<(), DagScanError> {
        if self.kind != ScanKind::Directory {
            return Err(invalid(self.state, "ChildrenCompleted (file scan)"));
        }
        if self.state != ScanState::AwaitingChildren {
            return Err(invalid(self.state, "ChildrenCompleted"));
        }
        self.state = ScanState::Pending;
        touch(self);
        Ok(())
    }

    fn restart(&mut self) -> Result<(), DagScanError> {
        match self.state {
            ScanState::Running | ScanState::Canceled => {
                self.state = ScanState::Pending;
                touch(self);
                Ok(())
            }
            other => Err(invalid(other, "Restart")),
        }
    }
}

fn touch(scan: &mut DagScan) {
    scan.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> DagScan {
        DagScan::new_file("fs-1", "upload-1")
    }

    fn dir() -> DagScan {
        DagScan::new_directory("fs-2", "upload-1")
    }

    fn any_cid() -> Cid {
        // sha2-256 multihash code (0x12) over 32 arbitrary bytes; codec
        // (0x70, dag-pb) is irrelevant to the state machine, which never
        // inspects it.
        let mh = multihash::Multihash::<64>::wrap(0x12, &[7u8; 32]).unwrap();
        Cid::new_v1(0x70, mh)
    }

    #[test]
    fn file_scan_starts_pending_directory_scan_starts_awaiting_children() {
        assert_eq!(file().state, ScanState::Pending);
        assert_eq!(dir().state, ScanState::AwaitingChildren);
    }

    #[test]
    fn happy_path_file() {
        let mut s = file();
        s.start().unwrap();
        assert_eq!(s.state, ScanState::Running);
        s.complete(any_cid()).unwrap();
        assert_eq!(s.state, ScanState::Completed);
        assert_eq!(s.cid, Some(any_cid()));
        assert!(s.error_message.is_none());
    }

    #[test]
    fn happy_path_directory_promotion() {
        let mut s = dir();
        s.children_completed().unwrap();
        assert_eq!(s.state, ScanState::Pending);
        s.start().unwrap();
        s.complete(any_cid()).unwrap();
        assert_eq!(s.state, ScanState::Completed);
    }

    #[test]
    fn fail_sets_message_and_clears_on_later_complete_is_impossible() {
        let mut s = file();
        s.start().unwrap();
        s.fail("disk exploded").unwrap();
        assert_eq!(s.state, ScanState::Failed);
        assert_eq!(s.error_message.as_deref(), Some("disk exploded"));
        // Failed is terminal: Complete must not succeed afterwards.
        let before = s.clone();
        let err = s.complete(any_cid()).unwrap_err();
        assert!(matches!(err, DagScanError::InvalidTransition { .. }));
        assert_eq!(s, before, "a rejected transition must not mutate the scan");
    }

    #[test]
    fn awaiting_children_can_fail_on_child_failure() {
        let mut s = dir();
        s.fail("child scan failed: boom").unwrap();
        assert_eq!(s.state, ScanState::Failed);
        assert_eq!(s.error_message.as_deref(), Some("child scan failed: boom"));
    }

    #[test]
    fn cancel_from_each_non_terminal_state() {
        for mut s in [file(), dir()] {
            let mut running = s.clone();
            running.start().unwrap();
            running.cancel().unwrap();
            assert_eq!(running.state, ScanState::Canceled);

            s.cancel().unwrap();
            assert_eq!(s.state, ScanState::Canceled);
        }
    }

    #[test]
    fn restart_from_running_and_canceled() {
        let mut s = file();
        s.start().unwrap();
        s.restart().unwrap();
        assert_eq!(s.state, ScanState::Pending);

        let mut s = file();
        s.cancel().unwrap();
        s.restart().unwrap();
        assert_eq!(s.state, ScanState::Pending);
    }

    #[test]
    fn children_completed_rejected_for_file_scans() {
        let mut s = file();
        let before = s.clone();
        let err = s.children_completed().unwrap_err();
        assert!(matches!(err, DagScanError::InvalidTransition { .. }));
        assert_eq!(s, before);
    }

    #[test]
    fn terminal_states_reject_every_transition_but_canceled_restart() {
        let cid = any_cid();
        let terminal_scans = {
            let mut completed = file();
            completed.start().unwrap();
            completed.complete(cid).unwrap();

            let mut failed = file();
            failed.start().unwrap();
            failed.fail("x").unwrap();

            let mut canceled = file();
            canceled.cancel().unwrap();

            [completed, failed, canceled]
        };

        for scan in &terminal_scans {
            for op in TransitionAttempt::ALL {
                if matches!(scan.state, ScanState::Canceled) && op == TransitionAttempt::Restart {
                    continue; // the one legal exit from a terminal state
                }
                let mut s = scan.clone();
                let before = s.clone();
                let result = op.apply(&mut s, cid);
                assert!(
                    result.is_err(),
                    "expected {:?} from {:?} to be rejected",
                    op,
                    scan.state
                );
                assert_eq!(s, before, "rejected transition mutated the scan");
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TransitionAttempt {
        Start,
        Complete,
        Fail,
        Cancel,
        ChildrenCompleted,
        Restart,
    }

    impl TransitionAttempt {
        const ALL: [TransitionAttempt; 6] = [
            TransitionAttempt::Start,
            TransitionAttempt::Complete,
            TransitionAttempt::Fail,
            TransitionAttempt::Cancel,
            TransitionAttempt::ChildrenCompleted,
            TransitionAttempt::Restart,
        ];

        fn apply(self, s: &mut DagScan, cid: Cid) -> Result<(), DagScanError> {
            match self {
                Self::Start => s.start(),
                Self::Complete => s.complete(cid),
                Self::Fail => s.fail("x"),
                Self::Cancel => s.cancel(),
                Self::ChildrenCompleted => s.children_completed(),
                Self::Restart => s.restart(),
            }
        }
    }
}
