//! Secure element reached through an external helper program.
//!
//! The helper owns the hardware session (vendor SDK, PKCS#11 module, TEE
//! client). It is invoked as:
//!
//! ```text
//! <program> [args...] sign <padding> <hash>   stdin: hex message   stdout: hex signature
//! <program> [args...] public-key                                   stdout: hex public key
//! ```
//!
//! Exit status 75 (`EX_TEMPFAIL`) reports a transient fault; any other
//! non-zero status is permanent. A helper still running at its deadline is
//! killed and the call reported as transient.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use alloy::primitives::hex;

use crate::secure_element::{SecureElement, SecureElementError, SignScheme};

const EX_TEMPFAIL: i32 = 75;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct CommandSecureElement {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSecureElement {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each helper invocation to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, operation: &[&str], input: Option<&[u8]>) -> Result<Vec<u8>, SecureElementError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SecureElementError::Permanent(format!("cannot start '{}': {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(input) = input {
                // A helper that exits without reading stdin is judged by its exit status.
                if let Err(e) = stdin.write_all(hex::encode(input).as_bytes()) {
                    tracing::debug!(error = %e, "Secure element helper closed stdin early");
                }
            }
        }

        self.wait_for_exit(&mut child)?;

        let output = child.wait_with_output().map_err(|e| {
            SecureElementError::Transient(format!("waiting for '{}' failed: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return match output.status.code() {
                Some(EX_TEMPFAIL) => Err(SecureElementError::Transient(stderr)),
                Some(code) => Err(SecureElementError::Permanent(format!(
                    "helper exited with status {}: {}",
                    code, stderr
                ))),
                None => Err(SecureElementError::Transient(format!(
                    "helper terminated by signal: {}",
                    stderr
                ))),
            };
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        hex::decode(stdout.trim()).map_err(|e| {
            SecureElementError::Permanent(format!("helper returned malformed hex: {}", e))
        })
    }

    /// Block until the helper exits, killing it once the deadline passes.
    ///
    /// Helper output is a single hex line, well under the pipe buffer, so
    /// the helper never blocks on a full stdout while we poll.
    fn wait_for_exit(&self, child: &mut Child) -> Result<(), SecureElementError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            match child.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) if Instant::now() >= deadline => {
                    if let Err(e) = child.kill() {
                        tracing::warn!(error = %e, "Failed to kill secure element helper");
                    }
                    let _ = child.wait();
                    tracing::warn!(
                        program = %self.program,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Secure element helper timed out"
                    );
                    return Err(SecureElementError::Transient(format!(
                        "helper '{}' did not finish within {} ms",
                        self.program,
                        self.timeout.as_millis()
                    )));
                }
                Ok(None) => std::thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    return Err(SecureElementError::Transient(format!(
                        "waiting for '{}' failed: {}",
                        self.program, e
                    )))
                }
            }
        }
    }
}

impl SecureElement for CommandSecureElement {
    fn sign(&self, message: &[u8], scheme: SignScheme) -> Result<Vec<u8>, SecureElementError> {
        self.run(
            &["sign", scheme.padding.as_str(), scheme.hash.as_str()],
            Some(message),
        )
    }

    fn public_key(&self) -> Result<Vec<u8>, SecureElementError> {
        self.run(&["public-key"], None)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
