//! Transform stages applied to single items by pool workers.
//!
//! Each transform is pure with respect to the file system except for its
//! declared output path. A failure is always per-item: it surfaces in the
//! result stream and never terminates the pool.

mod normalize;
mod thumbnail;

pub use normalize::NormalizeTransform;
pub use thumbnail::ThumbnailTransform;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::{DerivedArtifact, MediaItem};
use crate::probe::ProbeError;

/// Errors from applying a transform to one item.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The external tool could not be launched.
    #[error("Failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The external tool exited non-zero.
    #[error("{tool} failed with exit code {exit_code} on {path}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        path: PathBuf,
    },

    /// Probing the source failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// One transform stage, safe to share across workers.
pub trait Transform: Send + Sync {
    /// Stage name for logging.
    fn name(&self) -> &str;

    /// Apply the transform to one item, producing its derived artifact.
    fn apply(&self, item: &MediaItem) -> Result<DerivedArtifact, TransformError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared mock tool runner for transform tests.

    use std::ffi::OsString;
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::tools::{ToolOutput, ToolRunner};

    type Behavior = Box<dyn Fn(&str, &[OsString]) -> io::Result<ToolOutput> + Send + Sync>;

    /// Records invocations and answers with a configurable behavior.
    pub struct MockRunner {
        pub calls: Arc<Mutex<Vec<(String, Vec<OsString>)>>>,
        behavior: Behavior,
    }

    impl MockRunner {
        pub fn new(behavior: Behavior) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                behavior,
            }
        }

        /// Runner that reports success and optionally creates the output
        /// file named by the last argument.
        pub fn succeeding(create_output: bool) -> Self {
            Self::new(Box::new(move |_program, args| {
                if create_output {
                    if let Some(dest) = args.last() {
                        let _ = std::fs::write(dest, b"artifact");
                    }
                }
                Ok(ToolOutput {
                    success: true,
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }))
        }

        /// Runner that reports a non-zero exit.
        pub fn failing(exit_code: i32) -> Self {
            Self::new(Box::new(move |_program, _args| {
                Ok(ToolOutput {
                    success: false,
                    exit_code,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    impl ToolRunner for MockRunner {
        fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
            self.calls
                .lock()
                .push((program.to_string(), args.to_vec()));
            (self.behavior)(program, args)
        }
    }
}
