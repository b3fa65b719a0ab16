pub mod bench_cmd;
pub mod lookup_cmd;
pub mod stats_cmd;
pub mod validate_cmd;
pub mod watch_cmd;

pub use bench_cmd::cmd_bench;
pub use lookup_cmd::cmd_lookup;
pub use stats_cmd::cmd_stats;
pub use validate_cmd::cmd_validate;
pub use watch_cmd::cmd_watch;
