// Worker process supervision
// Spawns the backend worker, captures its output, and discovers the port it listens on

pub mod args;
pub mod diagnostics;
pub mod scanner;
pub mod supervisor;
pub mod termination;

pub use args::WorkerArgs;
pub use diagnostics::{DiagnosticLog, DIAGNOSTIC_CAPACITY};
pub use scanner::{PortScanner, PORT_MARKER};
pub use supervisor::{LaunchRequest, PortReady, PortWatch, Supervisor};
pub use termination::{TerminationReason, TerminationStrategy};
