use clap::Parser;
use private_tab::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();
    // CLI --log-level takes precedence over PRIVATE_TAB_DEBUG_LEVEL, then config (applied later)
    private_tab::debug::init_log_bridge(cli.log_level.map(|l| l.to_level_filter()));

    log::info!("Starting private-tab {}", private_tab::VERSION);
    let code = cli::process_cli(cli);
    log::logger().flush();
    // Nothing left to drop; exit with the command's status
    std::process::exit(code);
}
