//! Configuration for sedao-sim

use sedao_types::{Amount, LedgerResult};
use serde::{Deserialize, Serialize};

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// CSV file with one row per slot
    #[serde(default = "default_input")]
    pub input: String,

    /// Where the JSON report is written
    #[serde(default = "default_output")]
    pub output: String,

    /// Number of member principals to create
    #[serde(default = "default_members")]
    pub members: usize,

    /// Decimal places of the payment asset
    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Payment-asset units issued to each member before joining
    #[serde(default = "default_initial_balance")]
    pub initial_balance: String,

    /// Allowance each member grants the ledger
    #[serde(default = "default_approval_amount")]
    pub approval_amount: String,

    /// Payment required to join
    #[serde(default = "default_admission_amount")]
    pub admission_amount: String,

    /// Energy price per kWh
    #[serde(default = "default_kwh_price")]
    pub kwh_price: String,

    /// Pause between slots in milliseconds
    #[serde(default = "default_slot_delay_ms")]
    pub slot_delay_ms: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            members: default_members(),
            decimals: default_decimals(),
            initial_balance: default_initial_balance(),
            approval_amount: default_approval_amount(),
            admission_amount: default_admission_amount(),
            kwh_price: default_kwh_price(),
            slot_delay_ms: default_slot_delay_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_input() -> String {
    "data/sim.csv".to_string()
}

fn default_output() -> String {
    "sim_report.json".to_string()
}

fn default_members() -> usize {
    14
}

fn default_decimals() -> u32 {
    6
}

fn default_initial_balance() -> String {
    "250".to_string()
}

fn default_approval_amount() -> String {
    "800".to_string()
}

fn default_admission_amount() -> String {
    "50".to_string()
}

fn default_kwh_price() -> String {
    "0.2".to_string()
}

fn default_slot_delay_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SimConfig {
    /// Load configuration: defaults, then the optional file, then `SEDAO_*`
    /// environment variables (nested keys separated by `__`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&SimConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SEDAO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn initial_balance(&self) -> LedgerResult<Amount> {
        Amount::parse_units(&self.initial_balance, self.decimals)
    }

    pub fn approval_amount(&self) -> LedgerResult<Amount> {
        Amount::parse_units(&self.approval_amount, self.decimals)
    }

    pub fn admission_amount(&self) -> LedgerResult<Amount> {
        Amount::parse_units(&self.admission_amount, self.decimals)
    }

    /// Price per Wh in base units (kWh price / 1000, rounded down)
    pub fn wh_price(&self) -> LedgerResult<Amount> {
        let kwh = Amount::parse_units(&self.kwh_price, self.decimals)?;
        Ok(Amount::new(kwh.0 / 1_000))
    }
}
