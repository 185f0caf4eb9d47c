//! CLI framework for the cosign coordinator

use alloy::primitives::{Address, B256, U256};
use clap::{Args, Parser, Subcommand};
use cosign_keyring::{EnvKeyring, Keyring, OwnerKey};
use cosign_log::{debug, info, warn, LogFormat};
use cosign_types::{format_ether, parse_ether, SafeAccountConfig, SafeDeployment};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::config::ClientConfig;
use crate::coordinator::{
    ApprovalMode, ConfirmOutcome, ConfirmationPolicy, Coordinator, Execution, Session, Signers,
    TransferRequest, WalletSetup, WorkflowPlan, WorkflowReport,
};
use crate::keys::KeysHandler;
use crate::links::ExplorerLinks;
use crate::relay::{HttpRelay, RelayService};
use crate::wallet::{http_wallet_service, WalletService};
use crate::{ClientError, Result};

/// Cosign threshold-transaction CLI
#[derive(Parser, Debug)]
#[command(name = "cosign")]
#[command(about = "Propose, confirm and execute multi-owner Safe transactions")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global_opts: GlobalOpts,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global CLI options
#[derive(Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Home directory holding config.toml (default ~/.cosign)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Chain JSON-RPC endpoint
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Safe Transaction Service endpoint
    #[arg(long, global = true)]
    pub relay_url: Option<String>,

    /// Safe to operate on instead of the configured one
    #[arg(long, global = true)]
    pub safe: Option<Address>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format (json, text)
    #[arg(long, default_value = "json", global = true)]
    pub log_format: LogFormat,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Workflow(WorkflowCommands),

    /// Inspect owner keys
    Keys(KeysCmd),

    /// Configuration management
    Config(ConfigCmd),

    /// Print version information
    Version,
}

/// Commands that talk to the chain or the relay
#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Deploy or bind, fund, propose, confirm and execute in one go
    Run(RunCmd),

    /// Deploy a new Safe with the configured owners and threshold
    Deploy,

    /// Send ether to the Safe
    Fund(FundCmd),

    /// Propose a transfer out of the Safe
    Propose(ProposeCmd),

    /// List transactions the relay holds for the Safe
    Pending,

    /// Confirm a proposed transaction as another owner
    Confirm(ConfirmCmd),

    /// Execute a confirmed transaction
    Execute(ExecuteCmd),

    /// Show balance, owners, threshold and nonce of the Safe
    Balance,
}

impl WorkflowCommands {
    /// Key chosen with `--from` or `--owner`
    pub fn key_name(&self) -> Option<&str> {
        match self {
            WorkflowCommands::Fund(cmd) => cmd.from.as_deref(),
            WorkflowCommands::Propose(cmd) => cmd.from.as_deref(),
            WorkflowCommands::Confirm(cmd) => cmd.owner.as_deref(),
            WorkflowCommands::Execute(cmd) => cmd.owner.as_deref(),
            _ => None,
        }
    }
}

/// Full workflow command
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Attempt execution even when the confirmation step failed
    #[arg(long)]
    pub proceed_on_confirm_failure: bool,

    /// How the second owner approves (relay, on-chain)
    #[arg(long)]
    pub approval: Option<ApprovalMode>,
}

/// Fund command
#[derive(Parser, Debug)]
pub struct FundCmd {
    /// Amount in ether (default workflow.fund_amount)
    #[arg(long)]
    pub amount: Option<String>,

    /// Key that pays (default workflow.funder)
    #[arg(long)]
    pub from: Option<String>,
}

/// Propose command
#[derive(Parser, Debug)]
pub struct ProposeCmd {
    /// Recipient (default workflow.destination, else the Safe itself)
    #[arg(long)]
    pub to: Option<Address>,

    /// Amount in ether (default workflow.transfer_amount)
    #[arg(long)]
    pub amount: Option<String>,

    /// Proposing owner key (default workflow.proposer)
    #[arg(long)]
    pub from: Option<String>,
}

/// Confirm command
#[derive(Parser, Debug)]
pub struct ConfirmCmd {
    /// Safe transaction hash to confirm
    pub safe_tx_hash: B256,

    /// Confirming owner key (default workflow.confirmer)
    #[arg(long)]
    pub owner: Option<String>,

    /// How to approve (relay, on-chain)
    #[arg(long)]
    pub approval: Option<ApprovalMode>,
}

/// Execute command
#[derive(Parser, Debug)]
pub struct ExecuteCmd {
    /// Safe transaction hash to execute
    pub safe_tx_hash: B256,

    /// Executing owner key (default workflow.executor)
    #[arg(long)]
    pub owner: Option<String>,
}

/// Key inspection commands
#[derive(Parser, Debug)]
pub struct KeysCmd {
    #[command(subcommand)]
    pub action: KeysAction,
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// List configured keys and their addresses
    List(ListKeysCmd),

    /// Show a single key
    Show(ShowKeyCmd),
}

#[derive(Parser, Debug)]
pub struct ListKeysCmd {
    /// Print only addresses
    #[arg(short, long)]
    pub address: bool,
}

#[derive(Parser, Debug)]
pub struct ShowKeyCmd {
    /// Key name, e.g. owner1
    pub name: String,

    /// Print only the address
    #[arg(short, long)]
    pub address: bool,
}

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Write a default config.toml
    Init(ConfigInitCmd),

    /// Set a value by dotted key, e.g. workflow.threshold
    Set(ConfigSetCmd),
}

#[derive(Parser, Debug)]
pub struct ConfigInitCmd {
    /// Replace an existing config.toml
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigSetCmd {
    pub key: String,
    pub value: String,
}

/// CLI handler that executes commands
pub struct CliHandler {
    global_opts: GlobalOpts,
    config: ClientConfig,
}

impl CliHandler {
    /// Load the configuration and apply environment and flag overrides
    pub fn new(global_opts: GlobalOpts) -> Result<Self> {
        let mut config = ClientConfig::load_or_default(global_opts.home.as_deref())?;
        config.apply_env_overrides()?;

        if let Some(url) = &global_opts.rpc_url {
            config.network.rpc_url = url.clone();
        }
        if let Some(url) = &global_opts.relay_url {
            config.network.relay_url = url.clone();
        }
        if let Some(safe) = global_opts.safe {
            config.workflow.safe_address = Some(safe);
        }

        Ok(Self {
            global_opts,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Workflow(cmd) => self.handle_workflow(cmd).await,
            Commands::Keys(cmd) => {
                let shown = match &cmd.action {
                    KeysAction::Show(show) => Some(show.name.as_str()),
                    KeysAction::List(_) => None,
                };
                let keyring = self.keyring(shown);
                KeysHandler::new(&keyring, self.config.workflow.key_names())
                    .handle_keys(cmd)
                    .await
            }
            Commands::Config(cmd) => self.handle_config(cmd),
            Commands::Version => {
                println!("cosign {}", env!("CARGO_PKG_VERSION"));
                println!("safe contracts: v1.3.0");
                Ok(())
            }
        }
    }

    async fn handle_workflow(&self, command: WorkflowCommands) -> Result<()> {
        self.config.validate()?;
        let keyring = self.keyring(command.key_name());
        let relay = HttpRelay::new(&self.config.network.relay_url)?;

        if let WorkflowCommands::Pending = command {
            return self.handle_pending(&relay).await;
        }

        let wallets = self.wallet_service(&keyring).await?;
        let coordinator = Coordinator::new(&wallets, &relay);

        match command {
            WorkflowCommands::Run(cmd) => self.handle_run(&coordinator, &keyring, cmd).await,
            WorkflowCommands::Deploy => self.handle_deploy(&coordinator, &keyring).await,
            WorkflowCommands::Fund(cmd) => self.handle_fund(&coordinator, &keyring, cmd).await,
            WorkflowCommands::Propose(cmd) => {
                self.handle_propose(&coordinator, &keyring, cmd).await
            }
            WorkflowCommands::Confirm(cmd) => {
                self.handle_confirm(&coordinator, &keyring, cmd).await
            }
            WorkflowCommands::Execute(cmd) => {
                self.handle_execute(&coordinator, &keyring, cmd).await
            }
            WorkflowCommands::Balance => self.handle_balance(&coordinator, &keyring).await,
            WorkflowCommands::Pending => Ok(()),
        }
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_run(
        &self,
        coordinator: &Coordinator<'_>,
        keyring: &EnvKeyring,
        cmd: RunCmd,
    ) -> Result<()> {
        let workflow = &self.config.workflow;
        let signers = Signers {
            proposer: keyring.get_key(&workflow.proposer).await?,
            confirmer: keyring.get_key(&workflow.confirmer).await?,
            executor: keyring.get_key(&workflow.executor).await?,
            funder: keyring.get_key(&workflow.funder).await?,
        };

        let setup = match workflow.safe_address {
            Some(safe) => WalletSetup::Existing(safe),
            None => WalletSetup::Deploy(self.deployment(keyring).await?),
        };
        let on_confirm_failure = if cmd.proceed_on_confirm_failure {
            ConfirmationPolicy::Proceed
        } else {
            workflow.on_confirm_failure
        };
        let plan = WorkflowPlan {
            setup,
            funding: Some(parse_ether(&workflow.fund_amount)?),
            transfer: TransferRequest::from_ether(workflow.destination, &workflow.transfer_amount)?,
            approval: cmd.approval.unwrap_or(workflow.approval),
            on_confirm_failure,
        };

        let report = coordinator.run(&plan, &signers).await?;
        self.print_report(&report);
        Ok(())
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_deploy(&self, coordinator: &Coordinator<'_>, keyring: &EnvKeyring) -> Result<()> {
        if let Some(existing) = self.config.workflow.safe_address {
            warn!(safe = %existing, "a safe is already configured, deploying a new one anyway");
        }
        let deployer = keyring.get_key(&self.config.workflow.proposer).await?;
        let setup = WalletSetup::Deploy(self.deployment(keyring).await?);
        let session = coordinator.initialize(&setup, &deployer).await?;

        self.print_deployed(session.address());
        println!(
            "Use it with --safe {0} or `cosign config set workflow.safe_address {0}`",
            session.address()
        );
        Ok(())
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_fund(
        &self,
        coordinator: &Coordinator<'_>,
        keyring: &EnvKeyring,
        cmd: FundCmd,
    ) -> Result<()> {
        let funder = keyring
            .get_key(cmd.from.as_deref().unwrap_or(&self.config.workflow.funder))
            .await?;
        let amount = parse_ether(cmd.amount.as_deref().unwrap_or(&self.config.workflow.fund_amount))?;

        let session = self.session(coordinator, &funder).await?;
        let receipt = coordinator.fund(&session, &funder, amount).await?;

        println!(
            "Deposit Transaction: {}",
            self.links().transaction(receipt.transaction_hash)
        );
        Ok(())
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_propose(
        &self,
        coordinator: &Coordinator<'_>,
        keyring: &EnvKeyring,
        cmd: ProposeCmd,
    ) -> Result<()> {
        let workflow = &self.config.workflow;
        let proposer = keyring
            .get_key(cmd.from.as_deref().unwrap_or(&workflow.proposer))
            .await?;
        let request = TransferRequest::from_ether(
            cmd.to.or(workflow.destination),
            cmd.amount.as_deref().unwrap_or(&workflow.transfer_amount),
        )?;

        let session = self.session(coordinator, &proposer).await?;
        let proposal = coordinator.propose(&session, &request).await?;

        println!("Transaction proposed: {}", proposal.safe_tx_hash);
        println!("Nonce: {}", proposal.transaction.nonce);
        Ok(())
    }

    #[tracing::instrument(skip(self, relay))]
    async fn handle_pending(&self, relay: &HttpRelay) -> Result<()> {
        let safe = self.safe_address()?;
        let pending = relay.get_pending_transactions(safe).await?;
        if pending.is_empty() {
            println!("No pending transactions for {safe}");
        }
        for tx in pending {
            println!(
                "{} nonce={} status={} confirmations={}/{} value={} ETH to={}",
                tx.safe_tx_hash,
                tx.nonce,
                tx.status(),
                tx.confirmations.len(),
                tx.confirmations_required,
                format_ether(tx.value),
                tx.to
            );
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_confirm(
        &self,
        coordinator: &Coordinator<'_>,
        keyring: &EnvKeyring,
        cmd: ConfirmCmd,
    ) -> Result<()> {
        let owner = keyring
            .get_key(cmd.owner.as_deref().unwrap_or(&self.config.workflow.confirmer))
            .await?;
        let mode = cmd.approval.unwrap_or(self.config.workflow.approval);

        let session = self.session(coordinator, &owner).await?;
        match coordinator
            .confirm(&session, &owner, cmd.safe_tx_hash, mode)
            .await?
        {
            ConfirmOutcome::Confirmed { receipt, .. } => {
                println!("Transaction confirmed: {}", cmd.safe_tx_hash);
                if let Some(receipt) = receipt {
                    println!(
                        "Approval Transaction: {}",
                        self.links().transaction(receipt.transaction_hash)
                    );
                }
                Ok(())
            }
            ConfirmOutcome::Failed {
                safe_tx_hash,
                error,
                ..
            } => Err(ClientError::ConfirmationFailed {
                safe_tx_hash,
                source: error,
            }),
        }
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_execute(
        &self,
        coordinator: &Coordinator<'_>,
        keyring: &EnvKeyring,
        cmd: ExecuteCmd,
    ) -> Result<()> {
        let executor = keyring
            .get_key(cmd.owner.as_deref().unwrap_or(&self.config.workflow.executor))
            .await?;

        let session = self.session(coordinator, &executor).await?;
        let execution = coordinator
            .execute(&session, &executor, cmd.safe_tx_hash)
            .await?;

        self.print_execution(&execution);
        Ok(())
    }

    #[tracing::instrument(skip(self, coordinator, keyring))]
    async fn handle_balance(&self, coordinator: &Coordinator<'_>, keyring: &EnvKeyring) -> Result<()> {
        let owner = keyring.get_key(&self.config.workflow.proposer).await?;
        let session = self.session(coordinator, &owner).await?;
        let handle = session.handle();

        let links = self.links();
        println!("Safe: {}", links.address(session.address()));
        println!("Balance: {} ETH", format_ether(handle.balance().await?));
        println!("Threshold: {}", handle.threshold().await?);
        println!("Nonce: {}", handle.nonce().await?);
        for owner in handle.owners().await? {
            println!("Owner: {owner}");
        }
        Ok(())
    }

    fn handle_config(&self, cmd: ConfigCmd) -> Result<()> {
        let home = self.global_opts.home.as_deref();
        match cmd.action {
            ConfigAction::Show => {
                let path = ClientConfig::config_file(home);
                println!("# {}", path.display());
                let rendered = toml::to_string_pretty(&self.config)
                    .map_err(crate::config::ConfigError::from)?;
                println!("{rendered}");
                Ok(())
            }
            ConfigAction::Init(init_cmd) => {
                if init_cmd.overwrite {
                    warn!("Overwriting existing configuration...");
                }
                ClientConfig::init(home, init_cmd.overwrite)?;
                println!(
                    "Configuration written to {}",
                    ClientConfig::config_file(home).display()
                );
                Ok(())
            }
            ConfigAction::Set(set_cmd) => {
                // the stored file, without environment or flag overrides
                let mut stored = ClientConfig::load_or_default(home)?;
                stored.set(&set_cmd.key, &set_cmd.value)?;

                let dir = ClientConfig::config_dir(home);
                std::fs::create_dir_all(&dir).map_err(crate::config::ConfigError::from)?;
                stored.save_to_file(ClientConfig::config_file(home))?;

                info!(key = %set_cmd.key, value = %set_cmd.value, "configuration updated");
                println!("{} = {}", set_cmd.key, set_cmd.value);
                Ok(())
            }
        }
    }

    /// Keys named by the workflow, plus one picked on the command line
    fn keyring(&self, extra: Option<&str>) -> EnvKeyring {
        let mut names = self.config.workflow.key_names();
        if let Some(name) = extra {
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
        EnvKeyring::from_env(names)
    }

    /// Wallet service holding every key that resolves
    async fn wallet_service(&self, keyring: &EnvKeyring) -> Result<impl WalletService> {
        let mut keys = Vec::new();
        for info in keyring.list_keys().await? {
            keys.push(keyring.get_key(&info.name).await?);
        }
        debug!(keys = keys.len(), "owner keys resolved");

        let wallets = http_wallet_service(
            Url::parse(&self.config.network.rpc_url)?,
            self.config.network.chain_id,
            self.config.contracts,
            &keys,
        )?;
        wallets.check_chain_id().await?;
        Ok(wallets)
    }

    async fn deployment(&self, keyring: &EnvKeyring) -> Result<SafeDeployment> {
        let workflow = &self.config.workflow;
        let mut owners = Vec::with_capacity(workflow.owners.len());
        for entry in &workflow.owners {
            owners.push(resolve_owner(keyring, entry).await?);
        }

        let salt_nonce = workflow.salt_nonce.unwrap_or_else(default_salt_nonce);
        Ok(SafeDeployment {
            account: SafeAccountConfig::new(owners, workflow.threshold),
            salt_nonce: U256::from(salt_nonce),
        })
    }

    fn safe_address(&self) -> Result<Address> {
        self.config.workflow.safe_address.ok_or_else(|| {
            cosign_errors::Error::invalid_configuration(
                "no safe configured; pass --safe, set COSIGN_SAFE_ADDRESS or run `cosign deploy`",
            )
            .into()
        })
    }

    async fn session(&self, coordinator: &Coordinator<'_>, owner: &OwnerKey) -> Result<Session> {
        let setup = WalletSetup::Existing(self.safe_address()?);
        coordinator.initialize(&setup, owner).await
    }

    fn links(&self) -> ExplorerLinks {
        ExplorerLinks::new(
            &self.config.network.explorer_url,
            &self.config.network.app_prefix,
        )
    }

    fn print_deployed(&self, safe: Address) {
        let links = self.links();
        println!("Your Safe has been deployed:");
        println!("{}", links.address(safe));
        println!("{}", links.safe_app(safe));
    }

    fn print_execution(&self, execution: &Execution) {
        println!(
            "[Before Transaction] Safe Balance: {} ETH",
            format_ether(execution.balance_before)
        );
        println!("Transaction executed:");
        println!(
            "{}",
            self.links().transaction(execution.receipt.transaction_hash)
        );
        println!(
            "[After Transaction] Safe Balance: {} ETH",
            format_ether(execution.balance_after)
        );
    }

    fn print_report(&self, report: &WorkflowReport) {
        if report.deployed {
            self.print_deployed(report.safe);
        }
        if let Some(funding) = &report.funding {
            println!(
                "Deposit Transaction: {}",
                self.links().transaction(funding.transaction_hash)
            );
        }
        println!("Transaction proposed: {}", report.proposal.safe_tx_hash);
        match &report.confirmation {
            ConfirmOutcome::Confirmed { safe_tx_hash, .. } => {
                println!("Transaction confirmed: {safe_tx_hash}")
            }
            ConfirmOutcome::Failed { error, .. } => {
                println!("Error confirming transaction: {error}")
            }
        }
        self.print_execution(&report.execution);
    }
}

/// A literal address, or the address of the named key
async fn resolve_owner(keyring: &dyn Keyring, entry: &str) -> Result<Address> {
    if let Ok(address) = entry.parse::<Address>() {
        return Ok(address);
    }
    Ok(keyring.get_key(entry).await?.address())
}

fn default_salt_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Parse CLI arguments and execute commands
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let level = if cli.global_opts.verbose {
        "debug"
    } else {
        "info"
    };
    cosign_log::init_tracing_with_level(level, cli.global_opts.log_format)
        .map_err(|e| ClientError::Logging(e.to_string()))?;

    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }

    let handler = CliHandler::new(cli.global_opts)?;
    handler.execute(cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use clap::CommandFactory;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn opts(home: Option<PathBuf>) -> GlobalOpts {
        GlobalOpts {
            home,
            rpc_url: None,
            relay_url: None,
            safe: None,
            verbose: false,
            log_format: LogFormat::Text,
        }
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_generation() {
        let mut cmd = Cli::command();
        let help = cmd.render_help().to_string();
        assert!(help.contains("cosign"));
        assert!(help.contains("propose"));
        assert!(help.contains("confirm"));
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::parse_from([
            "cosign",
            "--rpc-url",
            "http://localhost:8545",
            "--safe",
            "0xaBd9784444Cedd834937BD82C55D72E8f7D5fcE7",
            "--log-format",
            "text",
            "--verbose",
            "pending",
        ]);

        assert_eq!(
            cli.global_opts.rpc_url,
            Some("http://localhost:8545".to_string())
        );
        assert_eq!(
            cli.global_opts.safe,
            Some(address!("abd9784444cedd834937bd82c55d72e8f7d5fce7"))
        );
        assert_eq!(cli.global_opts.log_format, LogFormat::Text);
        assert!(cli.global_opts.verbose);
        assert!(matches!(
            cli.command,
            Commands::Workflow(WorkflowCommands::Pending)
        ));
    }

    #[test]
    fn test_default_log_format_is_json() {
        let cli = Cli::parse_from(["cosign", "version"]);
        assert_eq!(cli.global_opts.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from([
            "cosign",
            "run",
            "--proceed-on-confirm-failure",
            "--approval",
            "on-chain",
        ]);

        if let Commands::Workflow(WorkflowCommands::Run(run_cmd)) = cli.command {
            assert!(run_cmd.proceed_on_confirm_failure);
            assert_eq!(run_cmd.approval, Some(ApprovalMode::OnChain));
        } else {
            panic!("Expected run command");
        }
    }

    #[test]
    fn test_confirm_command() {
        let hash = format!("0x{}", "ab".repeat(32));
        let cli = Cli::parse_from(["cosign", "confirm", &hash, "--owner", "owner3"]);

        if let Commands::Workflow(WorkflowCommands::Confirm(confirm_cmd)) = cli.command {
            assert_eq!(confirm_cmd.safe_tx_hash, B256::repeat_byte(0xab));
            assert_eq!(confirm_cmd.owner.as_deref(), Some("owner3"));
            assert_eq!(confirm_cmd.approval, None);
        } else {
            panic!("Expected confirm command");
        }
    }

    #[test]
    fn test_invalid_hash_rejected() {
        assert!(Cli::try_parse_from(["cosign", "execute", "0x1234"]).is_err());
        assert!(Cli::try_parse_from(["cosign", "--safe", "nope", "balance"]).is_err());
    }

    #[test]
    fn test_propose_command() {
        let cli = Cli::parse_from([
            "cosign",
            "propose",
            "--to",
            "0x90F79bf6EB2c4f870365E785982E1f101E93b906",
            "--amount",
            "0.25",
        ]);

        if let Commands::Workflow(WorkflowCommands::Propose(propose_cmd)) = cli.command {
            assert_eq!(
                propose_cmd.to,
                Some(address!("90f79bf6eb2c4f870365e785982e1f101e93b906"))
            );
            assert_eq!(propose_cmd.amount.as_deref(), Some("0.25"));
            assert!(propose_cmd.from.is_none());
        } else {
            panic!("Expected propose command");
        }
    }

    #[test]
    fn test_handler_applies_flag_overrides() {
        let temp_dir = tempdir().unwrap();
        let mut global_opts = opts(Some(temp_dir.path().to_path_buf()));
        global_opts.relay_url = Some("http://localhost:8000".to_string());
        global_opts.safe = Some(address!("abd9784444cedd834937bd82c55d72e8f7d5fce7"));

        let handler = CliHandler::new(global_opts).unwrap();
        assert_eq!(handler.config().network.relay_url, "http://localhost:8000");
        assert_eq!(
            handler.safe_address().unwrap(),
            address!("abd9784444cedd834937bd82c55d72e8f7d5fce7")
        );
    }

    #[test]
    fn test_config_set_persists() {
        let temp_dir = tempdir().unwrap();
        let home = temp_dir.path().join("home");
        let handler = CliHandler::new(opts(Some(home.clone()))).unwrap();

        handler
            .handle_config(ConfigCmd {
                action: ConfigAction::Set(ConfigSetCmd {
                    key: "workflow.threshold".into(),
                    value: "3".into(),
                }),
            })
            .unwrap();

        let stored = ClientConfig::load_from_file(ClientConfig::config_file(Some(&home))).unwrap();
        assert_eq!(stored.workflow.threshold, 3);

        let err = handler
            .handle_config(ConfigCmd {
                action: ConfigAction::Set(ConfigSetCmd {
                    key: "workflow.colour".into(),
                    value: "blue".into(),
                }),
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn test_resolve_owner_accepts_addresses_and_names() {
        let keyring = EnvKeyring::from_vars(
            ["owner2"],
            HashMap::from([(
                "OWNER_2_PRIVATE_KEY".to_string(),
                "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d".to_string(),
            )]),
        );

        assert_eq!(
            resolve_owner(&keyring, "0x90F79bf6EB2c4f870365E785982E1f101E93b906")
                .await
                .unwrap(),
            address!("90f79bf6eb2c4f870365e785982e1f101e93b906")
        );
        assert_eq!(
            resolve_owner(&keyring, "owner2").await.unwrap(),
            address!("70997970c51812dc3a010c7d01b50e0d17dc79c8")
        );
        assert!(matches!(
            resolve_owner(&keyring, "owner3").await,
            Err(ClientError::Keyring(_))
        ));
    }

    #[test]
    fn test_workflow_key_name() {
        let hash = format!("0x{}", "cd".repeat(32));
        let cli = Cli::parse_from(["cosign", "execute", &hash, "--owner", "treasury"]);
        let Commands::Workflow(workflow) = cli.command else {
            panic!("Expected workflow command");
        };
        assert_eq!(workflow.key_name(), Some("treasury"));

        let cli = Cli::parse_from(["cosign", "balance"]);
        let Commands::Workflow(workflow) = cli.command else {
            panic!("Expected workflow command");
        };
        assert_eq!(workflow.key_name(), None);
    }

    #[test]
    fn test_default_salt_nonce_is_time_based() {
        assert!(default_salt_nonce() > 1_600_000_000_000);
    }
}
