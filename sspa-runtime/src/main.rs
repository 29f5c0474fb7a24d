use anyhow::{anyhow, Result};
use clap::{arg, ArgAction, Command};
use log::info;
use serde::Serialize;
use sspa_algorithms::{run_method, solver::GoodLpSolver, RunOptions, RunSummary};
use sspa_instances::{
    Assignment, GeneratedInstances, GenerationParams, InstanceSource, InstanceStore,
};
use sspa_structs::{
    config::Settings,
    core::{InstanceKey, Method},
};
use sspa_utils::{jsonify, load_json_or_path, write_json_file};
use std::{io::Read, path::PathBuf, thread, time::Duration};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sspa-runtime")
        .about("Generates, solves and verifies student-project allocation instances")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("generate_instances")
                .about("Generates instances and saves them below a directory")
                .arg(arg!(<NUM_PROJECTS> "Number of projects").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<NUM_STUDENTS> "Number of students").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<COUNT> "Number of instances, indexed from 0").value_parser(clap::value_parser!(usize)))
                .arg(
                    arg!(--dir [DIR] "Directory holding the instances")
                        .default_value("instances")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--params [PARAMS] "Generation parameters json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "Save instances as zlib compressed json")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("solve")
                .about("Runs one method on one instance")
                .arg(
                    arg!(<METHOD> "local_branching, variable_fixing or solver_alone")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(arg!(<NUM_PROJECTS> "Number of projects").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<NUM_STUDENTS> "Number of students").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<INDEX> "Instance index").value_parser(clap::value_parser!(usize)))
                .args(run_args())
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the run summary will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "If output file is set, the run summary will be compressed as zlib")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("verify_solution")
                .about("Verifies an assignment and prints its objective")
                .arg(arg!(<NUM_PROJECTS> "Number of projects").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<NUM_STUDENTS> "Number of students").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<INDEX> "Instance index").value_parser(clap::value_parser!(usize)))
                .arg(
                    arg!(<SOLUTION> "Assignment or run summary json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--instances [DIR] "Directory holding saved instances (default: generate)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("benchmark")
                .about("Runs several methods over several instances in parallel")
                .arg(arg!(<NUM_PROJECTS> "Number of projects").value_parser(clap::value_parser!(usize)))
                .arg(arg!(<NUM_STUDENTS> "Number of students").value_parser(clap::value_parser!(usize)))
                .arg(
                    arg!(--count [COUNT] "Number of instances, indexed from 0")
                        .default_value("1")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--methods [METHODS] "Comma separated methods")
                        .default_value("local_branching,variable_fixing,solver_alone")
                        .value_parser(clap::value_parser!(String)),
                )
                .args(run_args())
                .arg(
                    arg!(--output [OUTPUT_DIR] "If set, one run summary per run is saved below this directory")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn run_args() -> [clap::Arg; 3] {
    [
        arg!(--"time-limit" [SECS] "Global time limit per run in seconds")
            .default_value("60")
            .value_parser(clap::value_parser!(f64)),
        arg!(--settings [SETTINGS] "Settings json string or path to json file")
            .value_parser(clap::value_parser!(String)),
        arg!(--instances [DIR] "Directory holding saved instances (default: generate)")
            .value_parser(clap::value_parser!(PathBuf)),
    ]
}

fn enable_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    enable_logging();
    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("generate_instances", sub_m)) => generate_instances(
            *sub_m.get_one::<usize>("NUM_PROJECTS").unwrap(),
            *sub_m.get_one::<usize>("NUM_STUDENTS").unwrap(),
            *sub_m.get_one::<usize>("COUNT").unwrap(),
            sub_m.get_one::<PathBuf>("dir").unwrap().clone(),
            sub_m.get_one::<String>("params").cloned(),
            *sub_m.get_one::<bool>("compress").unwrap(),
        ),
        Some(("solve", sub_m)) => solve(
            sub_m.get_one::<String>("METHOD").unwrap().clone(),
            InstanceKey::new(
                *sub_m.get_one::<usize>("NUM_PROJECTS").unwrap(),
                *sub_m.get_one::<usize>("NUM_STUDENTS").unwrap(),
                *sub_m.get_one::<usize>("INDEX").unwrap(),
            ),
            *sub_m.get_one::<f64>("time-limit").unwrap(),
            sub_m.get_one::<String>("settings").cloned(),
            sub_m.get_one::<PathBuf>("instances").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
            *sub_m.get_one::<bool>("compress").unwrap(),
        ),
        Some(("verify_solution", sub_m)) => verify_solution(
            InstanceKey::new(
                *sub_m.get_one::<usize>("NUM_PROJECTS").unwrap(),
                *sub_m.get_one::<usize>("NUM_STUDENTS").unwrap(),
                *sub_m.get_one::<usize>("INDEX").unwrap(),
            ),
            sub_m.get_one::<String>("SOLUTION").unwrap().clone(),
            sub_m.get_one::<PathBuf>("instances").cloned(),
        ),
        Some(("benchmark", sub_m)) => benchmark(
            *sub_m.get_one::<usize>("NUM_PROJECTS").unwrap(),
            *sub_m.get_one::<usize>("NUM_STUDENTS").unwrap(),
            *sub_m.get_one::<usize>("count").unwrap(),
            sub_m.get_one::<String>("methods").unwrap().clone(),
            *sub_m.get_one::<f64>("time-limit").unwrap(),
            sub_m.get_one::<String>("settings").cloned(),
            sub_m.get_one::<PathBuf>("instances").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

pub fn generate_instances(
    num_projects: usize,
    num_students: usize,
    count: usize,
    dir: PathBuf,
    params: Option<String>,
    compress: bool,
) -> Result<()> {
    let params: GenerationParams = match params {
        Some(params) => load_json_or_path(&params)?,
        None => GenerationParams::default(),
    };
    params.validate()?;
    let store = InstanceStore::new(dir).compressed(compress);
    let written = store.populate(num_projects, num_students, count, &params)?;
    println!(
        "{} instances written below {:?} ({} already present)",
        written.len(),
        store.root(),
        count - written.len()
    );
    Ok(())
}

fn load_settings(settings: Option<String>) -> Result<Settings> {
    match settings {
        Some(settings) => load_json_or_path(&settings),
        None => Ok(Settings::default()),
    }
}

fn instance_source(instances: Option<PathBuf>) -> Box<dyn InstanceSource + Sync> {
    match instances {
        Some(dir) => Box::new(InstanceStore::new(dir)),
        None => Box::new(GeneratedInstances::default()),
    }
}

fn time_limit(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| anyhow!("Invalid time limit: {}", secs))
}

pub fn solve(
    method: String,
    key: InstanceKey,
    time_limit_secs: f64,
    settings: Option<String>,
    instances: Option<PathBuf>,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    let method: Method = method.parse()?;
    let settings = load_settings(settings)?;
    let source = instance_source(instances);
    let mut solver = GoodLpSolver::new();

    let result = run_method(
        method,
        source.as_ref(),
        &key,
        time_limit(time_limit_secs)?,
        &settings,
        &mut solver,
        RunOptions::default(),
    )?;
    let summary = result.summary();
    if let Some(path) = output_file {
        write_json_file(&path, &summary, compress)?;
        println!("run summary written to: {:?}", path);
    } else {
        println!("{}", jsonify(&summary)?);
    }
    if let Some(failure) = result.failure() {
        eprintln!("Run aborted: {}", failure);
    }
    if !result.has_solution() {
        eprintln!("No solution found");
        std::process::exit(85);
    }
    Ok(())
}

/// Accepts a bare assignment as well as a run summary carrying one.
fn load_assignment(solution: &str) -> Result<Assignment> {
    let solution = if solution == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        solution.to_string()
    };
    let value: serde_json::Value = load_json_or_path(&solution)?;
    let value = match value.get("assignment") {
        Some(assignment) if value.get("method").is_some() => assignment.clone(),
        _ => value,
    };
    if value.is_null() {
        return Err(anyhow!("The run summary carries no assignment"));
    }
    Ok(serde_json::from_value(value)?)
}

pub fn verify_solution(key: InstanceKey, solution: String, instances: Option<PathBuf>) -> Result<()> {
    let assignment = load_assignment(&solution)?;
    let instance = instance_source(instances).load(&key)?;
    match instance.evaluate(&assignment) {
        Ok(objective) => {
            println!("Solution is valid, objective {}", objective);
            Ok(())
        }
        Err(e) => {
            eprintln!("Verification error: Invalid solution: {}", e);
            std::process::exit(1);
        }
    }
}

#[derive(Serialize)]
struct BenchmarkRow {
    method: Method,
    key: InstanceKey,
    summary: Option<RunSummary>,
    error: Option<String>,
}

pub fn benchmark(
    num_projects: usize,
    num_students: usize,
    count: usize,
    methods: String,
    time_limit_secs: f64,
    settings: Option<String>,
    instances: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let methods = methods
        .split(',')
        .map(|m| m.trim().parse::<Method>())
        .collect::<Result<Vec<_>>>()?;
    let settings = load_settings(settings)?;
    let time_limit = time_limit(time_limit_secs)?;
    let source = instance_source(instances);
    let runs: Vec<(Method, InstanceKey)> = (0..count)
        .flat_map(|index| {
            methods
                .iter()
                .map(move |&method| (method, InstanceKey::new(num_projects, num_students, index)))
        })
        .collect();
    info!("benchmarking {} runs of {:.1}s", runs.len(), time_limit.as_secs_f64());

    let rows: Vec<BenchmarkRow> = thread::scope(|s| {
        let handles: Vec<_> = runs
            .iter()
            .map(|&(method, key)| {
                let source = source.as_ref();
                let settings = &settings;
                s.spawn(move || {
                    let mut solver = GoodLpSolver::new();
                    let outcome = run_method(
                        method,
                        source,
                        &key,
                        time_limit,
                        settings,
                        &mut solver,
                        RunOptions::default(),
                    );
                    match outcome {
                        Ok(result) => BenchmarkRow {
                            method,
                            key,
                            summary: Some(result.summary()),
                            error: None,
                        },
                        Err(e) => BenchmarkRow {
                            method,
                            key,
                            summary: None,
                            error: Some(e.to_string()),
                        },
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .zip(&runs)
            .map(|(handle, &(method, key))| {
                handle.join().unwrap_or_else(|_| BenchmarkRow {
                    method,
                    key,
                    summary: None,
                    error: Some("run panicked".to_string()),
                })
            })
            .collect()
    });

    for row in &rows {
        match (&row.summary, &row.error) {
            (Some(summary), _) => println!(
                "{:<16} {:<32} {:?} objective={} iterations={} elapsed={:.2}s",
                row.method.as_str(),
                row.key.to_string(),
                summary.status,
                summary
                    .objective
                    .map_or_else(|| "-".to_string(), |o| o.to_string()),
                summary.iterations,
                summary.elapsed_secs
            ),
            (None, error) => println!(
                "{:<16} {:<32} error: {}",
                row.method.as_str(),
                row.key.to_string(),
                error.as_deref().unwrap_or("unknown")
            ),
        }
        if let Some(dir) = &output_dir {
            let path = dir.join(format!("{}_{}.json", row.method, row.key));
            write_json_file(&path, row, false)?;
        }
    }
    if let Some(dir) = output_dir {
        println!("run summaries written below: {:?}", dir);
    }
    Ok(())
}
