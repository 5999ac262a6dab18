mod exec;
mod probe;

pub use exec::{CommandExecutor, CommandOutcome, CommandOutput, SystemCommandExecutor};
pub use probe::{MediaProber, ProbedDuration};
