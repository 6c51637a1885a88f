use clap::{command, Parser};
use cml_chain::address::Address;
use cml_chain::builders::input_builder::{InputBuilderResult, SingleInputBuilder};
use cml_chain::builders::output_builder::SingleOutputBuilderResult;
use cml_chain::builders::tx_builder::{ChangeSelectionAlgo, SignedTxBuilder};
use cml_chain::Serialize;
use cml_crypto::{Ed25519KeyHash, RawBytesEncoding, TransactionHash};
use tracing::info;
use tracing_subscriber::fmt::Subscriber;

use brook_cardano_lib::hash::hash_transaction_canonical;
use brook_cardano_lib::protocol_params::constant_tx_builder;
use brook_cardano_lib::transaction::TransactionOutputExtension;
use brook_cardano_lib::{AssetClass, NetworkId, OutputRef};
use brook_explorer::client::Explorer;
use brook_explorer::data::ExplorerConfig;
use brook_explorer::CardanoNetwork;
use brook_offchain::constants::{MAX_LP_CAP, TRADABLE_TOKEN_SUPPLY};
use brook_offchain::creds::operator_creds;
use brook_offchain::deployment::{decode_plutus_v2, deploy_reference_output, ProtocolScripts, ValidatorRole};
use brook_offchain::lifecycle::{
    burn_pool_asset, create_pool, mint_pool_asset, MintedToken, PoolSeed, PoolSetupProgress,
};
use brook_offchain::prover::{OperatorProver, TxProver};

#[tokio::main]
async fn main() {
    let subscriber = Subscriber::new();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");
    let args = AppArgs::parse();
    let raw_config = std::fs::read_to_string(args.config_path).expect("Cannot load configuration file");
    let config: AppConfig = serde_json::from_str(&raw_config).expect("Invalid configuration file");

    let explorer = Explorer::new(config.explorer.clone());
    let (operator_sk, operator_addr, operator_cred) =
        operator_creds(config.operator_private_key, config.network_id);
    let prover = OperatorProver::new(operator_sk.to_bech32());

    match args.command {
        Command::SetupPool => {
            setup_pool(&config, &explorer, &prover, &operator_addr, operator_cred.0).await
        }
        Command::BurnToken { token } => {
            burn_token(&config, token, &explorer, &prover, &operator_addr, operator_cred.0).await
        }
        Command::DeployReferences => {
            deploy_references(&config, &explorer, &prover, &operator_addr).await
        }
    }
}

/// Mints the LP, identity and tradable tokens and seeds the pool with them.
/// Progress is checkpointed after every confirmed transaction, so a rerun
/// picks up where the previous one stopped.
async fn setup_pool(
    config: &AppConfig<'_>,
    explorer: &Explorer,
    prover: &OperatorProver,
    operator_addr: &Address,
    pk_hash: Ed25519KeyHash,
) {
    let mut progress = PoolSetupProgress::load(config.setup_progress_path)
        .await
        .expect("Corrupt progress file");

    let mint_steps: [(&str, u64, fn(&mut PoolSetupProgress) -> &mut Option<MintedToken>); 3] = [
        (config.pool.lp_name, MAX_LP_CAP, |p| &mut p.lp_token),
        (config.pool.identity_name, 1, |p| &mut p.identity_token),
        (config.pool.tradable_name, TRADABLE_TOKEN_SUPPLY, |p| {
            &mut p.tradable_token
        }),
    ];
    for (token_name, quantity, slot) in mint_steps {
        if slot(&mut progress).is_none() {
            info!("minting {} x{}", token_name, quantity);
            let input = get_largest_utxo(explorer, operator_addr).await;
            let (tx_builder, minted) = mint_pool_asset(token_name, quantity, pk_hash, input, operator_addr)
                .expect("Mint assembly failed");
            submit_and_confirm(explorer, prover, tx_builder).await;
            *slot(&mut progress) = Some(minted);
            progress
                .save(config.setup_progress_path)
                .await
                .expect("Cannot persist progress");
        }
    }

    if progress.pool_utxo.is_none() {
        let nft = recorded_token(&progress.identity_token);
        let lp = recorded_token(&progress.lp_token);
        let tradable = recorded_token(&progress.tradable_token);
        let pool_script = decode_plutus_v2(&config.scripts.pool_script)
            .expect("Malformed pool script")
            .hash();
        info!("seeding pool under validator {}", pool_script.to_hex());
        let inputs = collect_operator_inputs(explorer, operator_addr).await;
        let seed = PoolSeed {
            nft,
            lp,
            asset_x: AssetClass::Native,
            asset_y: tradable.into(),
            reserves_x: config.pool.reserves_native,
            reserves_y: config.pool.reserves_tradable,
            lp_fee_num: config.pool.lp_fee_num,
            lq_lower_bound: config.pool.lq_lower_bound,
        };
        let tx_builder = create_pool(seed, pool_script, inputs, operator_addr, config.network_id)
            .expect("Pool assembly failed");
        let tx_hash = submit_and_confirm(explorer, prover, tx_builder).await;
        let pool_utxo = OutputRef::new(tx_hash, 0);
        progress.pool_utxo = Some(pool_utxo);
        progress
            .save(config.setup_progress_path)
            .await
            .expect("Cannot persist progress");
        info!("pool seeded at {}", pool_utxo);
    } else {
        info!("pool already seeded, nothing to do");
    }
}

async fn burn_token(
    config: &AppConfig<'_>,
    selector: SetupToken,
    explorer: &Explorer,
    prover: &OperatorProver,
    operator_addr: &Address,
    pk_hash: Ed25519KeyHash,
) {
    let mut progress = PoolSetupProgress::load(config.setup_progress_path)
        .await
        .expect("Corrupt progress file");
    let slot = match selector {
        SetupToken::Lp => &mut progress.lp_token,
        SetupToken::Identity => &mut progress.identity_token,
        SetupToken::Tradable => &mut progress.tradable_token,
    };
    let minted = slot.clone().expect("Token is not recorded in the progress file");
    let token = minted.token().expect("Corrupt token record");
    info!("burning {} x{}", token, minted.quantity);
    let utxo = explorer
        .utxo_by_asset(token)
        .await
        .expect("Token not found on-chain");
    let input = SingleInputBuilder::new(utxo.input, utxo.output)
        .payment_key()
        .expect("Token UTxO must be P2PK");
    let tx_builder =
        burn_pool_asset(&minted, pk_hash, input, operator_addr).expect("Burn assembly failed");
    submit_and_confirm(explorer, prover, tx_builder).await;
    *slot = None;
    progress
        .save(config.setup_progress_path)
        .await
        .expect("Cannot persist progress");
}

/// Publishes all protocol validators as reference scripts in a single
/// transaction, one output per validator in `ValidatorRole::ALL` order.
async fn deploy_references(
    config: &AppConfig<'_>,
    explorer: &Explorer,
    prover: &OperatorProver,
    operator_addr: &Address,
) {
    let script_hexes = [
        &config.scripts.pool_script,
        &config.scripts.swap_script,
        &config.scripts.deposit_script,
        &config.scripts.redeem_script,
    ];
    let mut tx_builder = constant_tx_builder();
    for script_hex in script_hexes {
        let output = deploy_reference_output(script_hex, config.network_id)
            .expect("Malformed validator script");
        tx_builder
            .add_output(SingleOutputBuilderResult::new(output))
            .expect("Cannot add reference output");
    }
    let input = get_largest_utxo(explorer, operator_addr).await;
    tx_builder.add_input(input).expect("Cannot add input");
    let signed_tx_builder = tx_builder
        .build(ChangeSelectionAlgo::Default, operator_addr)
        .expect("Cannot balance deployment tx");
    let tx_hash = submit_and_confirm(explorer, prover, signed_tx_builder).await;
    for (ix, role) in ValidatorRole::ALL.into_iter().enumerate() {
        info!("{:?} reference script at {}", role, OutputRef::new(tx_hash, ix as u64));
    }
}

async fn submit_and_confirm(
    explorer: &Explorer,
    prover: &OperatorProver,
    candidate: SignedTxBuilder,
) -> TransactionHash {
    let tx = prover.prove(candidate);
    let tx_hash = hash_transaction_canonical(&tx.body);
    let tx_bytes = tx.to_cbor_bytes();
    info!("submitting tx {}", tx_hash.to_hex());
    explorer.submit_tx(&tx_bytes).await.expect("Node rejected tx");
    explorer
        .wait_for_transaction_confirmation(tx_hash)
        .await
        .expect("Tx not confirmed in time");
    tx_hash
}

fn recorded_token(slot: &Option<MintedToken>) -> brook_cardano_lib::Token {
    slot.as_ref()
        .expect("Token is not recorded in the progress file")
        .token()
        .expect("Corrupt token record")
}

async fn get_largest_utxo(explorer: &Explorer, addr: &Address) -> InputBuilderResult {
    let mut utxos = explorer.utxos_by_address(addr.clone(), 0, 50).await;
    utxos.sort_by_key(|utxo| utxo.output.value().coin);
    let utxo = utxos.pop().expect("No UTxOs at the operator address");
    SingleInputBuilder::new(utxo.input, utxo.output)
        .payment_key()
        .expect("Operator UTxO must be P2PK")
}

async fn collect_operator_inputs(explorer: &Explorer, addr: &Address) -> Vec<InputBuilderResult> {
    explorer
        .utxos_by_address(addr.clone(), 0, 50)
        .await
        .into_iter()
        .filter_map(|utxo| SingleInputBuilder::new(utxo.input, utxo.output).payment_key().ok())
        .collect()
}

#[derive(Parser)]
#[command(name = "brook-administration")]
#[command(version = "1.0.0")]
#[command(about = "Brook AMM Administration", long_about = None)]
struct AppArgs {
    /// Path to the JSON configuration file.
    #[arg(long, short)]
    config_path: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Mint the pool token triple and seed the pool, resuming from the last checkpoint.
    SetupPool,
    /// Burn one of the setup tokens recorded in the progress file.
    BurnToken {
        #[arg(long, value_enum)]
        token: SetupToken,
    },
    /// Publish the protocol validators as reference scripts.
    DeployReferences,
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum SetupToken {
    Lp,
    Identity,
    Tradable,
}

#[derive(serde::Deserialize)]
#[serde(bound = "'de: 'a")]
#[serde(rename_all = "camelCase")]
pub struct AppConfig<'a> {
    pub network_id: NetworkId,
    pub explorer: ExplorerConfig,
    pub operator_private_key: &'a str, //todo: store encrypted
    pub setup_progress_path: &'a str,
    pub scripts: ProtocolScripts,
    pub pool: PoolSettings<'a>,
}

#[derive(serde::Deserialize)]
#[serde(bound = "'de: 'a")]
#[serde(rename_all = "camelCase")]
pub struct PoolSettings<'a> {
    pub lp_name: &'a str,
    pub identity_name: &'a str,
    pub tradable_name: &'a str,
    pub reserves_native: u64,
    pub reserves_tradable: u64,
    pub lp_fee_num: u64,
    pub lq_lower_bound: u64,
}
