//! Command dispatch

use std::path::Path;

use anyhow::{bail, Context, Result};
use elec_core::calculations::{
    box_fill, conduit_fill, dwelling_load, voltage_drop, BoxDescriptor, CalculationItem,
    CircuitDescriptor, ConduitDescriptor, DwellingDescriptor,
};
use elec_core::categories::ConductorType;
use elec_core::code_tables::CodeTables;
use elec_core::job::Job;
use elec_core::store::JobStore;
use serde::Serialize;

use crate::cli::{Cli, Commands, ConfigAction, JobAction, OutputFormat};
use crate::config::Config;
use crate::output;
use crate::shorthand::{ApplianceArg, WireArg};

/// Whether every result printed was within limits
pub type Verdict = bool;

struct Session {
    format: OutputFormat,
    config: Config,
    tables: CodeTables,
}

impl Session {
    fn emit<T: Serialize>(&self, value: &T, render: impl FnOnce(&T) -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Table => print!("{}", render(value)),
        }
        Ok(())
    }
}

fn load_tables(cli_path: Option<&Path>, config: &Config) -> Result<CodeTables> {
    match cli_path.or(config.tables_path.as_deref()) {
        Some(path) => CodeTables::load(path)
            .with_context(|| format!("Failed to load code tables from {}", path.display())),
        None => Ok(CodeTables::nec_2023().clone()),
    }
}

pub fn execute(cli: Cli) -> Result<Verdict> {
    if let Commands::Config { action } = &cli.command {
        return config_command(action, cli.format);
    }

    let config = Config::load()?;
    let session = Session {
        format: cli.format.unwrap_or(config.output_format),
        tables: load_tables(cli.tables.as_deref(), &config)?,
        config,
    };
    tracing::debug!(edition = session.tables.edition(), "code tables ready");

    match cli.command {
        Commands::Box {
            volume,
            box_type,
            dims,
            wire,
            ground,
            device,
            clamp,
            fitting,
            label,
        } => {
            let descriptor = match volume {
                Some(v) => BoxDescriptor::with_volume(box_type, dims, v),
                None => BoxDescriptor::standard(box_type, dims),
            };
            let wires: Vec<_> = [
                (ConductorType::Wire, wire),
                (ConductorType::Ground, ground),
                (ConductorType::Device, device),
                (ConductorType::Clamp, clamp),
                (ConductorType::SupportFitting, fitting),
            ]
            .into_iter()
            .flat_map(|(kind, args)| args.into_iter().map(move |a: WireArg| a.into_spec(kind)))
            .collect();

            let result = box_fill::calculate_with(&session.tables, &descriptor, &wires)
                .with_context(|| format!("Box fill '{}' failed", label))?;
            session.emit(&result, output::render_box_fill)?;
            Ok(result.within_limits)
        }

        Commands::Conduit {
            conduit_type,
            size,
            area,
            wire,
            label,
        } => {
            let conduit = match area {
                Some(a) => ConduitDescriptor::with_area(conduit_type, size, a),
                None => ConduitDescriptor::standard(conduit_type, size),
            };
            let wires: Vec<_> = wire.into_iter().map(|a| a.into_spec(ConductorType::Wire)).collect();

            let result = conduit_fill::calculate_with(&session.tables, &conduit, &wires)
                .with_context(|| format!("Conduit fill '{}' failed", label))?;
            session.emit(&result, output::render_conduit_fill)?;
            Ok(result.within_limits)
        }

        Commands::Dwelling {
            sqft,
            voltage,
            name,
            small_appliance,
            laundry,
            appliance,
            motor,
        } => {
            let voltage = voltage.unwrap_or(session.config.default_service_voltage);
            let dwelling = DwellingDescriptor::new(name, sqft, voltage).with_circuits(small_appliance, laundry);
            let appliances: Vec<_> = appliance
                .into_iter()
                .map(|a: ApplianceArg| a.into_spec(false, voltage))
                .chain(motor.into_iter().map(|a| a.into_spec(true, voltage)))
                .collect();

            let result = dwelling_load::calculate_with(&session.tables, &dwelling, &appliances)
                .with_context(|| format!("Dwelling load '{}' failed", dwelling.name))?;
            session.emit(&result, output::render_dwelling_load)?;
            Ok(true)
        }

        Commands::VoltageDrop {
            system,
            material,
            raceway,
            temperature_rating,
            gauge,
            length,
            amps,
            volts,
            pf,
            limit,
            label,
        } => {
            let circuit = CircuitDescriptor {
                system_type: system,
                material,
                raceway,
                temperature_rating,
                gauge,
                length_ft: length,
                load_amps: amps,
                source_voltage: volts,
                power_factor: pf,
                limit_percent: limit,
            };

            let result = voltage_drop::calculate_with(&session.tables, &circuit)
                .with_context(|| format!("Voltage drop '{}' failed", label))?;
            session.emit(&result, output::render_voltage_drop)?;
            Ok(result.within_limits)
        }

        Commands::Calc { input } => {
            let item = read_item(&input)?;
            let outcome = item
                .calculate(&session.tables)
                .with_context(|| format!("{} '{}' failed", item.calc_type(), item.label()))?;
            session.emit(&outcome, output::render_outcome)?;
            Ok(outcome.within_limits())
        }

        Commands::Job { action } => job_command(&session, action),

        Commands::Tables => {
            session.emit(&session.tables.summary(), output::render_tables)?;
            Ok(true)
        }

        Commands::Config { action } => config_command(&action, cli.format),
    }
}

fn read_item(path: &Path) -> Result<CalculationItem> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid calculation item in {}", path.display()))
}

fn job_command(session: &Session, action: JobAction) -> Result<Verdict> {
    let user = session.config.user();
    match action {
        JobAction::New {
            file,
            number,
            client,
            owner,
        } => {
            let mut store = JobStore::new(&file);
            if store.exists() {
                bail!("{} already exists", file.display());
            }
            store.lock(&user)?;

            let mut job = Job::new(owner.unwrap_or_else(|| user.clone()), number, client);
            job.settings.code_edition = session.tables.edition().to_string();
            job.settings.default_service_voltage = session.config.default_service_voltage;
            store.save(&job)?;

            session.emit(&job, |job| format!("Created {} ({})\n", file.display(), job.meta.job_number))?;
            Ok(true)
        }

        JobAction::Show { file } => {
            let store = JobStore::new(&file);
            let job = store.load()?;
            if let Some(holder) = store.foreign_lock() {
                tracing::warn!(user = %holder.user_id, machine = %holder.machine, "job is locked, read-only");
            }
            session.emit(&job, output::render_job)?;
            let all_within = job
                .box_fills
                .values()
                .filter_map(|r| r.result.as_ref().map(|res| res.within_limits))
                .chain(
                    job.conduit_fills
                        .values()
                        .filter_map(|r| r.result.as_ref().map(|res| res.within_limits)),
                )
                .chain(
                    job.voltage_drops
                        .values()
                        .filter_map(|r| r.result.as_ref().map(|res| res.within_limits)),
                )
                .all(|pass| pass);
            Ok(all_within)
        }

        JobAction::Add { file, input } => {
            let item = read_item(&input)?;
            let mut store = JobStore::new(&file);
            store.lock(&user)?;
            let mut job = store.load()?;

            let (kind, id) = job.import_item(&item)?;
            let report = job.recalculate(kind, &id, &session.tables);
            if let Some(e) = report.error {
                return Err(e).with_context(|| format!("'{}' could not be calculated, job left unchanged", item.label()));
            }
            store.save(&job)?;

            session.emit(&report, |r| output::render_reports(std::slice::from_ref(r)))?;
            Ok(report.within_limits.unwrap_or(true))
        }

        JobAction::Recalc { file } => {
            let mut store = JobStore::new(&file);
            store.lock(&user)?;
            let mut job = store.load()?;

            let reports = job.recalculate_all(&session.tables);
            store.save(&job)?;

            session.emit(&reports, |r| output::render_reports(r))?;
            let failed = reports.iter().filter(|r| !r.is_ok()).count();
            if failed > 0 {
                bail!("{} of {} record(s) failed to calculate", failed, reports.len());
            }
            Ok(reports.iter().all(|r| r.within_limits != Some(false)))
        }
    }
}

fn config_command(action: &ConfigAction, format: Option<OutputFormat>) -> Result<Verdict> {
    let path = Config::config_path()?;
    match action {
        ConfigAction::Show => {
            let config = Config::load_from(&path)?;
            match format.unwrap_or(config.output_format) {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Table => println!("{}", config),
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save_to(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session() -> Session {
        Session {
            format: OutputFormat::Json,
            config: Config {
                user_id: Some("tester".to_string()),
                ..Config::default()
            },
            tables: CodeTables::nec_2023().clone(),
        }
    }

    fn write_item(dir: &TempDir, name: &str, json: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, json).unwrap();
        path
    }

    const GOOD_BOX: &str = r#"{
        "type": "BoxFill",
        "label": "J-1",
        "box": { "box_type": "device", "dimensions": "3x2x3.5", "volume_in3": 18.0 },
        "wires": [ { "conductor_type": "wire", "gauge": "14", "quantity": 2 } ]
    }"#;

    const UNKNOWN_CONDUIT: &str = r#"{
        "type": "ConduitFill",
        "label": "C-9",
        "conduit": { "conduit_type": "emt", "trade_size": "9" },
        "wires": [ { "conductor_type": "wire", "gauge": "12", "quantity": 3 } ]
    }"#;

    const LONG_BRANCH: &str = r#"{
        "type": "VoltageDrop",
        "label": "Barn",
        "circuit": { "gauge": "12", "length_ft": 100.0, "load_amps": 20.0, "source_voltage": 120.0 }
    }"#;

    fn new_job(session: &Session, file: &Path) {
        let action = JobAction::New {
            file: file.to_path_buf(),
            number: "24-100".to_string(),
            client: "Client".to_string(),
            owner: None,
        };
        assert!(job_command(session, action).unwrap());
    }

    #[test]
    fn test_job_add_then_recalc() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("job.elj");
        let session = session();
        new_job(&session, &file);

        let input = write_item(&dir, "box.json", GOOD_BOX);
        let within = job_command(&session, JobAction::Add { file: file.clone(), input }).unwrap();
        assert!(within);

        let job = JobStore::new(&file).load().unwrap();
        assert_eq!(job.box_fills.len(), 1);
        assert_eq!(job.meta.owner, "tester");
        assert!(job.box_fills.values().all(|r| r.result.is_some()));

        assert!(job_command(&session, JobAction::Recalc { file: file.clone() }).unwrap());
        assert!(!lock_exists(&file));
    }

    #[test]
    fn test_job_voltage_drop_out_of_limits() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("job.elj");
        let session = session();
        new_job(&session, &file);

        let input = write_item(&dir, "drop.json", LONG_BRANCH);
        let within = job_command(&session, JobAction::Add { file: file.clone(), input }).unwrap();
        assert!(!within);

        let job = JobStore::new(&file).load().unwrap();
        assert_eq!(job.voltage_drops.len(), 1);
        assert!(!job_command(&session, JobAction::Show { file: file.clone() }).unwrap());
        assert!(!job_command(&session, JobAction::Recalc { file }).unwrap());
    }

    #[test]
    fn test_job_add_failure_leaves_job_unchanged() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("job.elj");
        let session = session();
        new_job(&session, &file);

        let input = write_item(&dir, "conduit.json", UNKNOWN_CONDUIT);
        let err = job_command(&session, JobAction::Add { file: file.clone(), input }).unwrap_err();
        assert_eq!(
            err.downcast_ref::<elec_core::CalcError>().map(|e| e.error_code()),
            Some("UNKNOWN_CODE_LOOKUP")
        );

        let job = JobStore::new(&file).load().unwrap();
        assert!(job.conduit_fills.is_empty());
        assert!(job.wires.is_empty());
    }

    #[test]
    fn test_job_recalc_reports_failed_records() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("job.elj");
        let session = session();
        new_job(&session, &file);

        // Stored through the library so the bad record reaches the file
        let mut store = JobStore::new(&file);
        store.lock("tester").unwrap();
        let mut job = store.load().unwrap();
        let item: CalculationItem = serde_json::from_str(UNKNOWN_CONDUIT).unwrap();
        job.import_item(&item).unwrap();
        store.save(&job).unwrap();
        store.unlock();

        let err = job_command(&session, JobAction::Recalc { file: file.clone() }).unwrap_err();
        assert!(err.to_string().contains("1 of 1 record(s) failed"));
    }

    #[test]
    fn test_job_new_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("job.elj");
        let session = session();
        new_job(&session, &file);

        let action = JobAction::New {
            file: file.clone(),
            number: String::new(),
            client: String::new(),
            owner: None,
        };
        assert!(job_command(&session, action).is_err());
    }

    fn lock_exists(file: &Path) -> bool {
        JobStore::new(file).foreign_lock().is_some()
    }
}
