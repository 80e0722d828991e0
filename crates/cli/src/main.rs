use clap::{Parser, Subcommand};
use std::sync::{Arc, Barrier};
use triage_core::config::capacity_file_path;
use triage_core::{
    AdmissionRequest, Collaborators, ConfigSources, CoreConfig, EmergencyDepartment,
    TemporaryIdentity, TriageError, UrgencyClassifier, UrgencyLevel,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Emergency triage and appointment capacity CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report service health
    Health,
    /// Print the configuration resolved from the environment
    Config,
    /// Classify an urgency level
    Classify {
        /// Slug, staff label or number 1-4 (e.g. "critical", "Urgente", "3")
        level: String,
    },
    /// List every urgency level with its response target
    Levels,
    /// Run concurrent admissions against an in-memory department
    Simulate {
        /// Number of beds in the pool
        #[arg(long, default_value_t = 20)]
        beds: u32,
        /// Number of simultaneous arrivals
        #[arg(long, default_value_t = 30)]
        arrivals: usize,
        /// Urgency level for every arrival
        #[arg(long, default_value = "urgent")]
        urgency: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Health) => {
            let health = api_shared::HealthService::check_health();
            println!("ok: {}, {}", health.ok, health.message);
        }
        Some(Commands::Config) => {
            let sources = ConfigSources::from_env();
            let capacity_file = capacity_file_path(&sources);
            match CoreConfig::from_sources(sources) {
                Ok(cfg) => print_config(&cfg, capacity_file.as_deref()),
                Err(e) => eprintln!("Error resolving configuration: {}", e),
            }
        }
        Some(Commands::Classify { level }) => match UrgencyClassifier.classify(&level) {
            Ok(c) => println!(
                "{} ({}): priority {}, respond within {} minutes",
                c.level.label(),
                c.level.slug(),
                c.display_priority,
                c.target_response.num_minutes()
            ),
            Err(e) => eprintln!("Error classifying urgency: {}", e),
        },
        Some(Commands::Levels) => {
            for level in UrgencyLevel::ALL {
                println!(
                    "{}. {:<14} {:<12} {} minutes",
                    level.display_priority(),
                    level.label(),
                    level.slug(),
                    level.target_response().num_minutes()
                );
            }
        }
        Some(Commands::Simulate {
            beds,
            arrivals,
            urgency,
        }) => {
            let cfg = CoreConfig::with_bed_count(beds)?;
            let department = EmergencyDepartment::new(Arc::new(cfg), Collaborators::in_memory());
            let outcome = simulate(&department, arrivals, &urgency)?;
            println!(
                "Admitted: {}, refused (no beds): {}, available beds left: {}",
                outcome.admitted,
                outcome.refused,
                department.available_bed_count()?
            );
        }
        None => {
            println!("Use 'triage --help' for commands");
        }
    }

    Ok(())
}

fn print_config(cfg: &CoreConfig, capacity_file: Option<&std::path::Path>) {
    println!("Beds: {}", cfg.bed_count());
    for bed in cfg.beds() {
        println!("  bed {} on floor {}", bed.number, bed.floor);
    }
    println!("Default daily appointment max: {}", cfg.default_daily_max());
    for (provider, max) in cfg.provider_overrides() {
        println!("  provider {}: {}", provider, max);
    }
    match cfg.emergency_provider() {
        Some(provider) => println!("Emergency provider: {}", provider),
        None => println!("Emergency provider: (none, history links disabled)"),
    }
    match capacity_file {
        Some(path) => println!("Capacity file: {}", path.display()),
        None => println!("Capacity file: (none)"),
    }
}

struct SimulationOutcome {
    admitted: usize,
    refused: usize,
}

/// Release `arrivals` admissions at once and count how many got a bed.
fn simulate(
    department: &EmergencyDepartment,
    arrivals: usize,
    urgency: &str,
) -> Result<SimulationOutcome, TriageError> {
    let barrier = Barrier::new(arrivals);
    let results: Vec<Result<(), TriageError>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..arrivals)
            .map(|i| {
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    department
                        .admit_emergency(AdmissionRequest {
                            urgency: urgency.to_string(),
                            symptoms: "simulated arrival".into(),
                            temporary_identity: Some(TemporaryIdentity {
                                name: format!("Arrival {}", i + 1),
                                approximate_age: 40,
                            }),
                            ..Default::default()
                        })
                        .map(|_| ())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Err(TriageError::LockPoisoned)))
            .collect()
    });

    let mut outcome = SimulationOutcome {
        admitted: 0,
        refused: 0,
    };
    for result in results {
        match result {
            Ok(()) => outcome.admitted += 1,
            Err(TriageError::NoBedsAvailable) => outcome.refused += 1,
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}
