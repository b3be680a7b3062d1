use clap::Parser;

use iplocator::config::{Cli, Command, StaticConfig, init_config};
use iplocator::errors::IpLocatorError;
use iplocator::runtime::modes::run_server;
use iplocator::system::logging::init_logging;

/// 打印启动错误，`IpLocatorError` 使用彩色格式
fn report_startup_error(err: &anyhow::Error) {
    match err.downcast_ref::<IpLocatorError>() {
        Some(e) => eprintln!("{}\n  ({:#})", e.format_colored(), err),
        None => eprintln!("[ERROR] {:#}", err),
    }
}

fn generate_config(output: Option<&str>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            StaticConfig::default().save_to_file(path)?;
            println!("Sample configuration written to {}", path);
        }
        None => print!("{}", StaticConfig::generate_sample_config()),
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::GenerateConfig { output } = cli.command() {
        return generate_config(output.as_deref());
    }

    let config = init_config(cli.config.as_deref())?;
    let _log_guard = init_logging(&config.logging)?;

    tracing::info!(
        "iplocator {} starting (limiter: {}, source: {})",
        env!("CARGO_PKG_VERSION"),
        config.rate_limiter.kind,
        config.source.kind
    );

    run_server(&config).await
}

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        report_startup_error(&err);
        std::process::exit(1);
    }
}
