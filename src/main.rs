use clap::Parser;
use tokio_util::sync::CancellationToken;

mod config;
mod sink;
mod task;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ffmpeg_pipe", log::LevelFilter::Info)
        .filter_module("es_decode", log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

async fn run(cli: config::Cli) -> anyhow::Result<task::Summary> {
    ffmpeg_pipe::init()?;
    let config = cli.into_config()?;

    let cancel = CancellationToken::new();
    let task = task::DecodeTask::new(cancel.clone());
    let decode = task.run(config);
    tokio::pin!(decode);

    loop {
        tokio::select! {
            result = &mut decode => return result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, stopping after the current chunk");
                cancel.cancel();
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = config::Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(summary) => log::info!("{}", summary),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
