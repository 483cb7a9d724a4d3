use clap::ValueEnum;
use pagecheck_client::RetryProfile;
use pagecheck_core::Strategy;

pub mod analyzer;
pub mod commands;
pub mod settings;

pub use analyzer::{AnalysisFailure, AnalysisState, PageAnalyzer, Status};
pub use settings::Settings;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Table,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    #[default]
    Mobile,
    Desktop,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Mobile => Strategy::Mobile,
            StrategyArg::Desktop => Strategy::Desktop,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ProfileArg {
    Serverless,
    #[default]
    Standard,
    Extended,
}

impl From<ProfileArg> for RetryProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Serverless => RetryProfile::Serverless,
            ProfileArg::Standard => RetryProfile::Standard,
            ProfileArg::Extended => RetryProfile::Extended,
        }
    }
}
