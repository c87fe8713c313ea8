//! Command-line front end for the resource planner.
//!
//! # Responsibility
//! - Map subcommands onto core planner and roster services.
//! - Hand grid sessions to external editors as JSON files.
//!
//! # Invariants
//! - Every failure is reported on stderr with a non-zero exit code.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::{info, warn};
use resplan_core::config::MAX_WEEK_COUNT;
use resplan_core::db::{open_db, DbError};
use resplan_core::report::utilization::{hours_by_project, sum_hours};
use resplan_core::{
    init_logging, week_window, ConfigError, EditSet, EntryStatus, GridSession, PlannerConfig,
    PlannerError, PlannerService, ReconcilePolicy, ReconcileWarning, RosterError, RosterService,
    SkillLevel, SqliteRecordStore, StoreTable, SubmitStatus,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "resplan")]
#[command(version)]
#[command(about = "Plan employee hours per project and week", long_about = None)]
struct Cli {
    /// SQLite database file; overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Adds an employee to the roster
    AddEmployee { name: String },

    /// Lists rostered employees
    Employees,

    /// Records a skill for a rostered employee
    AddSkill {
        employee: String,
        skill: String,

        /// Beginner, Intermediate or Expert
        #[arg(short, long, default_value = "Beginner")]
        level: String,
    },

    /// Lists the skills of one employee
    Skills { employee: String },

    /// Prints the hour grid of one employee and status
    Grid {
        #[arg(short, long)]
        employee: String,

        /// Confirmed, Tentative, BD or Leave
        #[arg(short, long, default_value = "Confirmed")]
        status: String,

        /// First week of the window (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Number of weeks, 1 to 52; defaults to the config value
        #[arg(short, long, value_parser = parse_week_count)]
        weeks: Option<usize>,

        /// Writes the editable session as JSON for a later `apply`
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Applies an edit set to a session written by `grid --out`
    Apply {
        #[arg(long)]
        session: PathBuf,

        #[arg(long)]
        edits: PathBuf,

        /// full_replace or incremental_upsert; defaults to the config policy
        #[arg(short, long)]
        policy: Option<String>,
    },

    /// Prints weekly totals and utilization of one employee
    Utilization {
        #[arg(short, long)]
        employee: String,

        #[arg(long)]
        start: Option<NaiveDate>,

        /// Number of weeks, 1 to 52; defaults to the config value
        #[arg(short, long, value_parser = parse_week_count)]
        weeks: Option<usize>,

        /// Also lists hours per week and project
        #[arg(long)]
        by_project: bool,
    },
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Config(ConfigError),
    Db(DbError),
    Planner(PlannerError),
    Roster(RosterError),
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, message: String },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{message}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Planner(err) => write!(f, "{err}"),
            Self::Roster(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "`{}`: {source}", path.display()),
            Self::Json { path, message } => write!(f, "`{}`: {message}", path.display()),
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<PlannerError> for CliError {
    fn from(value: PlannerError) -> Self {
        Self::Planner(value)
    }
}

impl From<RosterError> for CliError {
    fn from(value: RosterError) -> Self {
        Self::Roster(value)
    }
}

type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    start_logging(&config);

    match cli.command {
        Commands::AddEmployee { name } => add_employee(&config, &name),
        Commands::Employees => list_employees(&config),
        Commands::AddSkill {
            employee,
            skill,
            level,
        } => add_skill(&config, &employee, &skill, &level),
        Commands::Skills { employee } => list_skills(&config, &employee),
        Commands::Grid {
            employee,
            status,
            start,
            weeks,
            out,
        } => show_grid(&config, &employee, &status, start, weeks, out.as_deref()),
        Commands::Apply {
            session,
            edits,
            policy,
        } => apply_edits(&config, &session, &edits, policy.as_deref()),
        Commands::Utilization {
            employee,
            start,
            weeks,
            by_project,
        } => show_utilization(&config, &employee, start, weeks, by_project),
    }
}

fn load_config(cli: &Cli) -> CliResult<PlannerConfig> {
    let mut config = match &cli.config {
        Some(path) => PlannerConfig::from_json_file(path)?,
        None => PlannerConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn start_logging(config: &PlannerConfig) {
    let Some(log_dir) = &config.log_dir else {
        return;
    };
    let log_dir = if log_dir.is_absolute() {
        log_dir.clone()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(log_dir),
            Err(err) => {
                eprintln!("warning: logging disabled: {err}");
                return;
            }
        }
    };
    // Planning still works without logs.
    if let Err(err) = init_logging(&config.log_level, &log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn window(config: &PlannerConfig, start: Option<NaiveDate>, weeks: Option<usize>) -> Vec<String> {
    let start = start.unwrap_or_else(|| Local::now().date_naive());
    week_window(start, weeks.unwrap_or(config.week_count))
}

fn parse_week_count(value: &str) -> Result<usize, String> {
    let count: usize = value
        .parse()
        .map_err(|_| format!("`{value}` is not a week count"))?;
    if count == 0 || count > MAX_WEEK_COUNT {
        return Err(format!("week count must be within 1..={MAX_WEEK_COUNT}"));
    }
    Ok(count)
}

fn parse_status(value: &str) -> CliResult<EntryStatus> {
    EntryStatus::parse(value).ok_or_else(|| {
        CliError::Usage(format!(
            "unknown status `{value}`; expected one of {}",
            EntryStatus::ALL.map(EntryStatus::as_str).join(", ")
        ))
    })
}

fn add_employee(config: &PlannerConfig, name: &str) -> CliResult<()> {
    let conn = open_db(&config.db_path)?;
    let roster = RosterService::new(
        SqliteRecordStore::new(&conn, StoreTable::Employees),
        SqliteRecordStore::new(&conn, StoreTable::Skills),
    );
    let added = roster.add_employee(name)?;
    println!("added employee {added}");
    Ok(())
}

fn list_employees(config: &PlannerConfig) -> CliResult<()> {
    let conn = open_db(&config.db_path)?;
    let roster = RosterService::new(
        SqliteRecordStore::new(&conn, StoreTable::Employees),
        SqliteRecordStore::new(&conn, StoreTable::Skills),
    );
    for employee in roster.list_employees()? {
        println!("{employee}");
    }
    Ok(())
}

fn add_skill(config: &PlannerConfig, employee: &str, skill: &str, level: &str) -> CliResult<()> {
    let level = SkillLevel::parse(level).ok_or_else(|| {
        CliError::Usage(format!(
            "unknown skill level `{level}`; expected one of {}",
            SkillLevel::ALL.map(SkillLevel::as_str).join(", ")
        ))
    })?;
    let conn = open_db(&config.db_path)?;
    let roster = RosterService::new(
        SqliteRecordStore::new(&conn, StoreTable::Employees),
        SqliteRecordStore::new(&conn, StoreTable::Skills),
    );
    let added = roster.add_skill(employee, skill, level)?;
    println!("{}: {} ({})", added.employee, added.skill, added.level);
    Ok(())
}

fn list_skills(config: &PlannerConfig, employee: &str) -> CliResult<()> {
    let conn = open_db(&config.db_path)?;
    let roster = RosterService::new(
        SqliteRecordStore::new(&conn, StoreTable::Employees),
        SqliteRecordStore::new(&conn, StoreTable::Skills),
    );
    for skill in roster.skills_for(employee)? {
        println!("{}\t{}", skill.skill, skill.level);
    }
    Ok(())
}

fn show_grid(
    config: &PlannerConfig,
    employee: &str,
    status: &str,
    start: Option<NaiveDate>,
    weeks: Option<usize>,
    out: Option<&Path>,
) -> CliResult<()> {
    let status = parse_status(status)?;
    let weeks = window(config, start, weeks);
    let conn = open_db(&config.db_path)?;
    let planner = PlannerService::new(SqliteRecordStore::new(&conn, StoreTable::Entries));
    let session = planner.open_grid(employee, status, &weeks)?;

    println!("row\t{}", session.grid.column_names().join("\t"));
    for row in &session.grid.rows {
        println!("{}\t{}\t{}", row.row_id, row.project, join_hours(&row.cells));
    }
    println!("\tTotal\t{}", join_hours(&sum_hours(&session.grid)));
    println!(
        "revision={} fingerprint={}",
        session.revision, session.fingerprint
    );

    if let Some(path) = out {
        let raw = serde_json::to_string_pretty(&session).map_err(|err| CliError::Json {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        fs::write(path, raw).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "event=session_export module=cli status=ok rows={} weeks={}",
            session.grid.rows.len(),
            weeks.len()
        );
    }
    Ok(())
}

fn apply_edits(
    config: &PlannerConfig,
    session_path: &Path,
    edits_path: &Path,
    policy: Option<&str>,
) -> CliResult<()> {
    let policy = match policy {
        Some(value) => ReconcilePolicy::parse(value).ok_or_else(|| {
            CliError::Usage(format!(
                "unknown policy `{value}`; expected full_replace or incremental_upsert"
            ))
        })?,
        None => config.policy,
    };
    let session: GridSession = read_json(session_path)?;
    let edits: EditSet = read_json(edits_path)?;

    let conn = open_db(&config.db_path)?;
    let planner = PlannerService::new(SqliteRecordStore::new(&conn, StoreTable::Entries));
    let report = planner.submit(&session, &edits, policy)?;

    for warning in &report.warnings {
        match warning {
            ReconcileWarning::MissingIdentifier { row } => {
                eprintln!("warning: {row} has no project name and was skipped");
            }
        }
    }
    match report.status {
        SubmitStatus::Unchanged => println!("no changes"),
        SubmitStatus::Saved { revision } => println!("saved revision={revision}"),
    }
    Ok(())
}

fn show_utilization(
    config: &PlannerConfig,
    employee: &str,
    start: Option<NaiveDate>,
    weeks: Option<usize>,
    by_project: bool,
) -> CliResult<()> {
    let weeks = window(config, start, weeks);
    let conn = open_db(&config.db_path)?;
    let planner = PlannerService::new(SqliteRecordStore::new(&conn, StoreTable::Entries));

    let totals = planner.weekly_totals(employee, &weeks)?;
    let summary = planner.utilization(employee, &weeks, config.full_time_hours)?;
    println!("week\tsubmitted\tall\tlevel");
    for (week, submitted) in summary.iter().zip(totals) {
        println!(
            "{}\t{}\t{}\t{}",
            week.week,
            submitted,
            week.total_hours,
            week.level.as_str()
        );
    }

    if by_project {
        let entries = planner.load_entries()?;
        for row in hours_by_project(&entries, employee) {
            println!("{}\t{}\t{}", row.week, row.project, row.hours);
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        warn!("event=json_read module=cli status=error");
        CliError::Json {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })
}

fn join_hours(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join("\t")
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn weeks_flag_is_bounded() {
        for weeks in ["0", "53", "20000000", "-1"] {
            let parsed = Cli::try_parse_from(["resplan", "grid", "-e", "E1", "--weeks", weeks]);
            assert!(parsed.is_err(), "weeks {weeks}");
            let parsed = Cli::try_parse_from(["resplan", "utilization", "-e", "E1", "-w", weeks]);
            assert!(parsed.is_err(), "weeks {weeks}");
        }

        let cli = Cli::try_parse_from(["resplan", "grid", "-e", "E1", "--weeks", "52"]).unwrap();
        assert!(matches!(cli.command, Commands::Grid { weeks: Some(52), .. }));
    }
}
