// src/stage/catalog.rs

//! The fixed, ordered list of pipeline stages.
//!
//! Each stage assumes the previous stage's output exists (e.g. the warehouse
//! load reads production tables populated by the staging transform), so the
//! order is a deployment-time decision and cannot be changed by config.

use std::fmt;
use std::str::FromStr;

/// Identifier of one of the six pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    DataGeneration,
    DataIngestion,
    StagingToProduction,
    WarehouseLoad,
    DataQualityChecks,
    AnalyticsGeneration,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [StageId; 6] = [
        StageId::DataGeneration,
        StageId::DataIngestion,
        StageId::StagingToProduction,
        StageId::WarehouseLoad,
        StageId::DataQualityChecks,
        StageId::AnalyticsGeneration,
    ];

    /// Name used in logs and as the key of `steps_executed` in the report.
    pub fn display_name(self) -> &'static str {
        match self {
            StageId::DataGeneration => "Data Generation",
            StageId::DataIngestion => "Data Ingestion",
            StageId::StagingToProduction => "Staging to Production",
            StageId::WarehouseLoad => "Warehouse Load",
            StageId::DataQualityChecks => "Data Quality Checks",
            StageId::AnalyticsGeneration => "Analytics Generation",
        }
    }

    /// Key used for `[stage.<key>]` overrides in the config file.
    pub fn config_key(self) -> &'static str {
        match self {
            StageId::DataGeneration => "data_generation",
            StageId::DataIngestion => "data_ingestion",
            StageId::StagingToProduction => "staging_to_production",
            StageId::WarehouseLoad => "warehouse_load",
            StageId::DataQualityChecks => "data_quality_checks",
            StageId::AnalyticsGeneration => "analytics_generation",
        }
    }

    /// Built-in argv for the external collaborator behind this stage.
    pub fn default_command(self) -> Vec<String> {
        let script = match self {
            StageId::DataGeneration => "scripts/data_generation/generate_data.py",
            StageId::DataIngestion => "scripts/ingestion/ingest_to_staging.py",
            StageId::StagingToProduction => "scripts/transformation/staging_to_production.py",
            StageId::WarehouseLoad => "scripts/transformation/load_warehouse.py",
            StageId::DataQualityChecks => "scripts/quality_checks/validate_data.py",
            StageId::AnalyticsGeneration => "scripts/transformation/generate_analytics.py",
        };
        vec!["python".to_string(), script.to_string()]
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        StageId::ALL
            .into_iter()
            .find(|id| id.config_key() == key)
            .ok_or_else(|| {
                let known: Vec<&str> = StageId::ALL.iter().map(|id| id.config_key()).collect();
                format!("unknown stage '{key}' (expected one of: {})", known.join(", "))
            })
    }
}
