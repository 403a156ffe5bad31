use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use raffle_client::{
    client,
    wallets,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORAGE_DIR: &str = "~/.raffle-tui";
const LOG_FILE_PREFIX: &str = "raffle-tui.log";

enum Command {
    Run {
        config: client::AppConfig,
        log_dir: PathBuf,
    },
    Register {
        registry_path: PathBuf,
        chain_id: u64,
        contract_id: String,
    },
}

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: raffle-tui [--devnet | --testnet | --local] [--rpc-url <url>]\n\
         --wallet <name> [--wallet-dir <path>] [--registry <path>]\n\
         [--storage-dir <path>] [--log-dir <path>]\n\
         raffle-tui --register <contract-id> --chain-id <id> [--registry <path>]\n\
         \n\
         Flags:\n\
           --devnet              Connect to Fuel devnet (default RPC {})\n\
           --testnet             Connect to Fuel testnet (default RPC {})\n\
           --local               Connect to a local Fuel node (default RPC {})\n\
           --rpc-url <url>       Override the RPC URL for the selected network (devnet if none)\n\
           --wallet <name>       forc-wallet profile used to sign entries\n\
           --wallet-dir <path>   Override forc-wallet directory (defaults to ~/.fuel/wallets)\n\
           --registry <path>     Address registry (defaults to {})\n\
           --storage-dir <path>  Client storage directory (defaults to {})\n\
           --log-dir <path>      Log directory (defaults to <storage-dir>/logs)\n\
           --register <id>       Record a raffle deployment and exit\n\
           --chain-id <id>       Chain the deployment passed to --register lives on",
        client::DEFAULT_DEVNET_RPC_URL,
        client::DEFAULT_TESTNET_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
        deployments::RegistryStore::default_path().display(),
        DEFAULT_STORAGE_DIR,
    );
    std::process::exit(0);
}

fn take_once(
    slot: &mut Option<String>,
    flag: &str,
    value: Option<String>,
) -> Result<()> {
    let value = value.ok_or_else(|| eyre!("{flag} requires an argument"))?;
    if slot.is_some() {
        return Err(eyre!("{flag} may only be specified once"));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    #[derive(Clone, Copy)]
    enum NetworkFlag {
        Devnet,
        Testnet,
        Local,
    }

    let mut args = args.into_iter();
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut registry: Option<String> = None;
    let mut storage_dir: Option<String> = None;
    let mut log_dir: Option<String> = None;
    let mut register: Option<String> = None;
    let mut chain_id: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--devnet" | "--testnet" | "--local" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --devnet/--testnet/--local"
                    ));
                }
                network_flag = Some(match arg.as_str() {
                    "--devnet" => NetworkFlag::Devnet,
                    "--testnet" => NetworkFlag::Testnet,
                    _ => NetworkFlag::Local,
                });
            }
            "--rpc-url" => take_once(&mut custom_url, "--rpc-url", args.next())?,
            "--wallet-dir" => take_once(&mut wallet_dir, "--wallet-dir", args.next())?,
            "--wallet" => take_once(&mut wallet_name, "--wallet", args.next())?,
            "--registry" => take_once(&mut registry, "--registry", args.next())?,
            "--storage-dir" => take_once(&mut storage_dir, "--storage-dir", args.next())?,
            "--log-dir" => take_once(&mut log_dir, "--log-dir", args.next())?,
            "--register" => take_once(&mut register, "--register", args.next())?,
            "--chain-id" => take_once(&mut chain_id, "--chain-id", args.next())?,
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let registry_path = registry
        .as_deref()
        .map(wallets::expand_path)
        .unwrap_or_else(deployments::RegistryStore::default_path);

    if let Some(contract_id) = register {
        let chain_id = chain_id
            .ok_or_else(|| eyre!("--register requires --chain-id <id>"))?
            .parse::<u64>()
            .wrap_err("--chain-id must be an unsigned integer")?;
        return Ok(Command::Register {
            registry_path,
            chain_id,
            contract_id,
        });
    }
    if chain_id.is_some() {
        return Err(eyre!("--chain-id is only valid together with --register"));
    }

    let network = match network_flag {
        None | Some(NetworkFlag::Devnet) => client::NetworkTarget::Devnet {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_DEVNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Testnet) => client::NetworkTarget::Testnet {
            url: custom_url
                .unwrap_or_else(|| client::DEFAULT_TESTNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Local) => client::NetworkTarget::LocalNode {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_LOCAL_RPC_URL.to_string()),
        },
    };

    let wallet = wallet_name.ok_or_else(|| {
        eyre!("Specify --wallet <name> to select a forc-wallet profile")
    })?;
    let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;
    let storage_dir =
        wallets::expand_path(storage_dir.as_deref().unwrap_or(DEFAULT_STORAGE_DIR));
    let log_dir = log_dir
        .as_deref()
        .map(wallets::expand_path)
        .unwrap_or_else(|| storage_dir.join("logs"));

    Ok(Command::Run {
        config: client::AppConfig {
            network,
            wallets: client::WalletConfig::ForcKeystore { owner: wallet, dir },
            registry_path,
            storage_dir,
        },
        log_dir,
    })
}

/// Logs go to a daily file; the terminal belongs to the UI.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!(e))?;
    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    match parse_cli_args(std::env::args().skip(1))? {
        Command::Register {
            registry_path,
            chain_id,
            contract_id,
        } => {
            raffle_client::parse_contract_id(&contract_id)
                .ok_or_else(|| eyre!("{contract_id} is not a valid contract id"))?;
            let added = deployments::record_deployment(&registry_path, chain_id, &contract_id)
                .map_err(|e| eyre!(e))?;
            if added {
                println!("Registered {contract_id} for chain {chain_id}");
            } else {
                println!("{contract_id} is already registered for chain {chain_id}");
            }
            Ok(())
        }
        Command::Run { config, log_dir } => {
            let _guard = init_tracing(&log_dir)?;
            tracing::info!("starting raffle client");
            deployments::ensure_registry(&config.registry_path).map_err(|e| eyre!(e))?;
            client::run_app(config).await
        }
    }
}
