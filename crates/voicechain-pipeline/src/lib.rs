//! The chained voice pipeline: session ledger plus the orchestrator that
//! drives one voice turn through transcribe → complete → synthesize.

pub mod ledger;
pub mod orchestrator;
pub mod remote;

pub use ledger::SessionLedger;
pub use orchestrator::{ChainedPipeline, TurnOutcome};
pub use remote::ChainedDelegate;
