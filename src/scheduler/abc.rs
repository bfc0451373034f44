//! The external ABC-frame boundary (SPEC_FULL.md §4.9/§6a): Flow 1/2
//! compose short ABC scripts (`&if`, `&mfs`, `&st`, `compress2rs`, ...)
//! against whatever AIG currently sits in ABC's working frame. Kept
//! behind a trait so the scheduler compiles and is unit-testable
//! without an `abc` binary on PATH, matching the pattern
//! `examples/original_source/src/scheduler/rrrRotatingThresholdScheduler.h`
//! uses for its ABC calls (an opaque external-tool boundary the
//! scheduler drives but never inspects the internals of).

use crate::error::{Error, Result};
use crate::network::Network;

/// An external ABC session: reads/writes AIGER through its working
/// frame and executes a script string against it.
pub trait AbcSession {
    /// Load `net` into the ABC frame, run `script`, and return the
    /// resulting network.
    fn run_script(&mut self, net: &Network, script: &str) -> Result<Network>;
}

/// Shells out to an external `abc` binary, serialized by the caller
/// through the single mutex SPEC_FULL.md §5 requires (the scheduler,
/// not this type, owns that lock — every `AbcSession` call happens
/// with it already held).
pub struct ProcessAbcSession {
    binary: std::path::PathBuf,
}

impl ProcessAbcSession {
    pub fn new(binary: impl Into<std::path::PathBuf>) -> Self {
        ProcessAbcSession { binary: binary.into() }
    }
}

impl Default for ProcessAbcSession {
    fn default() -> Self {
        ProcessAbcSession::new("abc")
    }
}

impl AbcSession for ProcessAbcSession {
    fn run_script(&mut self, net: &Network, script: &str) -> Result<Network> {
        let in_dir = std::env::temp_dir();
        let in_path = in_dir.join(format!("rrr_in_{}.aag", std::process::id()));
        let out_path = in_dir.join(format!("rrr_out_{}.aag", std::process::id()));
        crate::aiger::write(net, &in_path)?;

        let full_script = format!("read_aiger {}; {}; write_aiger {}", in_path.display(), script, out_path.display());
        let output = std::process::Command::new(&self.binary)
            .arg("-c")
            .arg(&full_script)
            .output()
            .map_err(|e| Error::Unsupported(format!("failed to run abc: {e}")))?;
        if !output.status.success() {
            return Err(Error::Unsupported(format!(
                "abc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let result = crate::aiger::read(&out_path);
        let _ = std::fs::remove_file(&in_path);
        let _ = std::fs::remove_file(&out_path);
        result
    }
}

/// A no-op session for environments without ABC installed and for
/// unit tests: every script is a pass-through (`Flow` 1/2 still run
/// their optimizer rounds, they just see no ABC-side improvement).
#[derive(Default)]
pub struct NullAbcSession;

impl AbcSession for NullAbcSession {
    fn run_script(&mut self, net: &Network, _script: &str) -> Result<Network> {
        Ok(net.structural_clone())
    }
}
