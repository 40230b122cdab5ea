use clap::Parser;
use tracing::{debug, info, warn};

use aircheck::config::Config;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let cfg = Config::parse(args.config);

    std::fs::create_dir_all(&cfg.log.dir).expect("create log directory");
    let _log_guard = utils::set_log_with_daily_file(
        format!(
            "aircheck={},tower_http=info,sea_orm=warn",
            cfg.log.level
        ),
        &cfg.log.dir,
        "aircheck.log",
    );

    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    let listener = tokio::net::TcpListener::bind(cfg.http.listen)
        .await
        .unwrap();

    aircheck::serve(cfg, listener, shutdown_signal()).await;
    info!("Server shutdown");
}

async fn shutdown_signal() {
    let signal = aircheck::shutdown::wait_for_stop_signal().await;
    debug!("Received signal: {}", signal);
}
