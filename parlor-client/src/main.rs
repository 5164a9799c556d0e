//! `parlor`: the interactive client binary. Resolves settings, unlocks
//! the local key store, connects to the relay, and hands off to the
//! REPL.

use {
    clap::Parser,
    parlor_client::{keystore::KeyStore, machine_id, repl, session::Client, settings::Cli},
    parlor_sdk::transport::tcp::TcpClientTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = cli.resolve()?;
    std::fs::create_dir_all(&settings.data_dir)?;

    let machine_id = machine_id::machine_identifier()?;
    let keystore = KeyStore::load(settings.data_dir.join("keys.db"), &machine_id)?;

    log::info!("connecting to {}", settings.server_addr);
    let transport = TcpClientTransport::connect(&settings.server_addr).await?;
    let client = Client::new(transport, keystore);

    repl::run(client).await
}
