//! `parlord`: the relay server binary. Loads settings, opens the
//! on-disk state, binds a TCP transport, and pumps the main loop forever.

use {clap::Parser, parlor_sdk::transport::tcp::TcpServerTransport, parlor_server::{context::ServerContext, settings::Cli}};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = cli.resolve()?;
    std::fs::create_dir_all(&settings.data_dir)?;

    let mut ctx = ServerContext::load(&settings)?;
    log::info!("listening on {}", settings.listen_addr);
    let mut transport = TcpServerTransport::bind(&settings.listen_addr).await?;

    loop {
        parlor_server::run_once(&mut ctx, &mut transport).await?;
    }
}
