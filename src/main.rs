use {clap::Parser, std::panic};

use beta_scope::{Cli, run};

#[tokio::main]
async fn main() {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    // Dependencies stay quiet, our own modules report progress in debug builds
    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Error)
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, global_level)
        .filter(Some("beta_scope"), my_code_level)
        .init();

    let args = Cli::parse();
    log::info!("beta-scope starting: {:?}", args.command);

    if let Err(e) = run(args).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
