use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{ParamValue, Params};
use crate::runner::{EMAIL_TEMPLATE, EMPLOYEE_TEMPLATE};

const DEFAULT_DATABASE: &str = "report.db";
const DEFAULT_TEMPLATES_DIR: &str = "templates";
const DEFAULT_TITLE: &str = "Employee Report";
const DEFAULT_MIN_SALARY: f64 = 150_000.0;
const DEFAULT_CONDITION: &str = "LAST_NAME = 'Smith' ORDER BY FIRST_NAME";

/// Resolved application configuration: CLI over config file over defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: PathBuf,
    pub templates_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub output_dir: PathBuf,
    pub title: String,
    pub min_salary: f64,
    pub condition: String,
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            database: cli_database,
            templates_dir: cli_templates_dir,
            artifacts_dir: cli_artifacts_dir,
            output_dir: cli_output_dir,
            title: cli_title,
            min_salary: cli_min_salary,
            condition: cli_condition,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            database: file_database,
            templates_dir: file_templates_dir,
            artifacts_dir: file_artifacts_dir,
            output_dir: file_output_dir,
            title: file_title,
            min_salary: file_min_salary,
            condition: file_condition,
        } = file_config;

        Ok(Self {
            database: cli_database
                .or(file_database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            templates_dir: cli_templates_dir
                .or(file_templates_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR)),
            artifacts_dir: cli_artifacts_dir
                .or(file_artifacts_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            output_dir: cli_output_dir
                .or(file_output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            title: cli_title
                .or(file_title)
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            min_salary: cli_min_salary.or(file_min_salary).unwrap_or(DEFAULT_MIN_SALARY),
            condition: cli_condition
                .or(file_condition)
                .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
        })
    }

    /// Fail fast before any step runs: the template resources must exist.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.templates_dir.is_dir(),
            "templates directory {:?} does not exist",
            self.templates_dir
        );
        for name in [EMPLOYEE_TEMPLATE, EMAIL_TEMPLATE] {
            let path = self.template_path(name);
            anyhow::ensure!(path.is_file(), "template {:?} does not exist", path);
        }
        anyhow::ensure!(
            !self.condition.trim().is_empty(),
            "condition parameter must not be empty"
        );
        Ok(())
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{name}.yaml"))
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.artifacts_dir.join(file_name)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// The parameter set for the employee report fill.
    pub fn params(&self) -> Params {
        Params::new()
            .with("title", ParamValue::Text(self.title.clone()))
            .with("minSalary", ParamValue::Number(self.min_salary))
            .with("condition", ParamValue::Filter(self.condition.clone()))
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "report-forge",
    about = "Seed a demo employee database and export filled reports to PDF and DOCX",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "REPORT_FORGE_DATABASE",
        value_name = "PATH",
        help = "SQLite database path (':memory:' is accepted)"
    )]
    pub database: Option<PathBuf>,

    #[arg(
        long,
        env = "REPORT_FORGE_TEMPLATES_DIR",
        value_name = "DIR",
        help = "Directory containing the report template sources"
    )]
    pub templates_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "REPORT_FORGE_ARTIFACTS_DIR",
        value_name = "DIR",
        help = "Directory the compiled report artifacts are written to"
    )]
    pub artifacts_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "REPORT_FORGE_OUTPUT_DIR",
        value_name = "DIR",
        help = "Directory the exported PDF/DOCX files are written to"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_name = "TEXT", help = "Report title parameter")]
    pub title: Option<String>,

    #[arg(
        long,
        value_name = "N",
        help = "Minimum salary parameter for the employee report"
    )]
    pub min_salary: Option<f64>,

    #[arg(
        long,
        value_name = "FILTER",
        help = "Filter condition parameter (filter-clause grammar, e.g. \"LAST_NAME = 'Smith' ORDER BY FIRST_NAME\")"
    )]
    pub condition: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    database: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    title: Option<String>,
    min_salary: Option<f64>,
    condition: Option<String>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let config = AppConfig::from_args(CliArgs::default()).expect("defaults resolve");
        assert_eq!(config.database, PathBuf::from("report.db"));
        assert_eq!(config.title, "Employee Report");
        assert_eq!(config.min_salary, 150_000.0);
        assert_eq!(config.condition, "LAST_NAME = 'Smith' ORDER BY FIRST_NAME");
    }

    #[test]
    fn cli_overrides_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("config.yaml");
        fs::write(&file, "title: From File\nmin_salary: 1.0\n").expect("write config");

        let args = CliArgs {
            config: Some(file),
            title: Some("From CLI".into()),
            ..CliArgs::default()
        };
        let config = AppConfig::from_args(args).expect("resolve");
        assert_eq!(config.title, "From CLI", "CLI wins over the file");
        assert_eq!(config.min_salary, 1.0, "file wins over the default");
    }

    #[test]
    fn unsupported_config_extension_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("config.toml");
        fs::write(&file, "title = \"x\"\n").expect("write config");

        let args = CliArgs {
            config: Some(file),
            ..CliArgs::default()
        };
        assert!(AppConfig::from_args(args).is_err());
    }

    #[test]
    fn params_carry_the_three_reference_parameters() {
        let config = AppConfig::from_args(CliArgs::default()).expect("defaults resolve");
        let params = config.params();
        assert!(params.contains("title"));
        assert!(params.contains("minSalary"));
        assert!(params.contains("condition"));
        assert_eq!(params.len(), 3);
    }
}
