pub use crate::biased_mux::{BiasedMuxPorts, BiasedMuxTb};
pub use crate::commit_fifo::{CommitFifoPorts, CommitFifoTb};
pub use crate::config::{load_config, load_config_from_str, HarnessConfig};
pub use crate::dut::Dut;
pub use crate::executor::{Driver, Executor, Step};
pub use crate::fifo::{FifoPorts, FifoTb};
pub use crate::fwd_pipe::{FwdPipePorts, FwdPipeTb};
pub use crate::golden::{Accepted, GoldenModel};
pub use crate::harness::{run, Failure, RunSummary, Side, Target, Testbench, Verdict};
pub use crate::junit::write_junit_xml;
pub use crate::monitor::{Handshake, Monitor};
pub use crate::scoreboard::{Ordering, Scoreboard};
pub use crate::signal::{Assignments, Signal, SignalTable, Snapshot};
pub use crate::test::{SuiteReport, TestSuite};
pub use crate::value::{Packet, Width, Word};
pub use crate::{ConfigError, HarnessError};
