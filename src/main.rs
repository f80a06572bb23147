//! compliance-ledger CLI
//!
//! Run compliance calculations, banking and pooling from the command line
//! against a JSON state file.
//!
//! # Usage
//!
//! ```bash
//! # Load routes into the ledger
//! compliance-ledger import-routes --input routes.json
//!
//! # Compute, bank and apply
//! compliance-ledger compute --ship IMO-9321483 --year 2024
//! compliance-ledger bank --ship IMO-9321483 --year 2024
//! compliance-ledger apply --ship IMO-9321483 --year 2025
//!
//! # Pool three ships
//! compliance-ledger pool --name north-sea --year 2025 --ships A,B,C --format json
//!
//! # Generate a random fleet for testing
//! compliance-ledger generate --ships 10 --routes-per-ship 3 --year 2024,2025
//! ```

use compliance_ledger::config::LedgerConfig;
use compliance_ledger::core::route::Route;
use compliance_ledger::core::ship::ShipId;
use compliance_ledger::ledger::ComplianceLedger;
use compliance_ledger::repository::memory::{InMemoryStore, StoreSnapshot};
use compliance_ledger::repository::RouteRepository;
use compliance_ledger::simulation::fleet::{generate_fleet, FleetConfig};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

const DEFAULT_STATE: &str = "ledger-state.json";

fn print_usage() {
    eprintln!(
        r#"compliance-ledger: GHG intensity compliance, banking and pooling

USAGE:
    compliance-ledger <COMMAND> [OPTIONS]

COMMANDS:
    import-routes   Load routes from a JSON file into the ledger
    compute         Compute and store a ship's balance for a year
    bank            Bank the surplus of a ship-year
    apply           Apply banked surplus to a ship-year deficit
    pool            Create a compliance pool
    expire          Expire banked records whose horizon has passed
    compare         Compare routes against the latest baseline
    generate        Generate a random fleet of routes (for testing)
    help            Show this message

COMMON OPTIONS:
    --state <FILE>      Ledger state file (default: ledger-state.json)
    --config <FILE>     Ledger configuration file (JSON)
    --format <FORMAT>   Output format: text (default) or json

COMMAND OPTIONS:
    import-routes   --input <FILE>
    compute         --ship <ID> --year <YEAR>
    bank            --ship <ID> --year <YEAR>
    apply           --ship <ID> --year <YEAR>
    pool            --name <NAME> --year <YEAR> --ships <ID,ID,...>
    expire          --year <CURRENT_YEAR>
    generate        --ships <N> --routes-per-ship <N> --year <YEAR,...> [--output <FILE>]

ENVIRONMENT:
    RUST_LOG        Log filter (default: info)

EXAMPLES:
    compliance-ledger import-routes --input routes.json
    compliance-ledger compute --ship IMO-9321483 --year 2025
    compliance-ledger pool --name north-sea --year 2025 --ships A,B,C --format json
    compliance-ledger generate --ships 20 --year 2024,2025 --output routes.json"#
    );
}

/// JSON schema for route input and `generate` output.
#[derive(serde::Deserialize, serde::Serialize)]
struct RouteInput {
    ship_id: String,
    year: i32,
    ghg_intensity: String,
    fuel_consumption: String,
    #[serde(default)]
    vessel_type: String,
    #[serde(default)]
    fuel_type: String,
    #[serde(default)]
    distance: Option<String>,
    #[serde(default)]
    total_emissions: Option<String>,
    #[serde(default)]
    is_baseline: bool,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct RoutesFile {
    routes: Vec<RouteInput>,
}

#[derive(Serialize)]
struct BalanceOutput {
    ship_id: String,
    year: i32,
    balance: String,
    status: String,
}

#[derive(Serialize)]
struct ExpiredOutput {
    expired: usize,
    records: Vec<compliance_ledger::core::banking::BankingRecord>,
}

/// Options shared by every command. Each command checks the ones it needs.
#[derive(Default)]
struct Options {
    state: Option<String>,
    config: Option<String>,
    format: Option<String>,
    input: Option<String>,
    output: Option<String>,
    ship: Option<String>,
    ships: Option<String>,
    name: Option<String>,
    year: Option<String>,
    routes_per_ship: Option<String>,
}

impl Options {
    fn parse(args: &[String]) -> Self {
        let mut opts = Options::default();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            i += 1;
            let value = args.get(i).cloned().unwrap_or_else(|| {
                eprintln!("{} requires a value", flag);
                process::exit(1);
            });
            match flag {
                "--state" => opts.state = Some(value),
                "--config" => opts.config = Some(value),
                "--format" => opts.format = Some(value),
                "--input" => opts.input = Some(value),
                "--output" => opts.output = Some(value),
                "--ship" => opts.ship = Some(value),
                "--ships" => opts.ships = Some(value),
                "--name" => opts.name = Some(value),
                "--year" => opts.year = Some(value),
                "--routes-per-ship" => opts.routes_per_ship = Some(value),
                _ => {
                    eprintln!("Unknown option: {}", flag);
                    process::exit(1);
                }
            }
            i += 1;
        }
        opts
    }

    fn json(&self) -> bool {
        match self.format.as_deref() {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                eprintln!("--format requires 'text' or 'json', got '{}'", other);
                process::exit(1);
            }
        }
    }

    fn require<'a>(value: &'a Option<String>, flag: &str) -> &'a str {
        value.as_deref().unwrap_or_else(|| {
            eprintln!("Error: {} is required", flag);
            process::exit(1);
        })
    }

    fn ship(&self) -> ShipId {
        ShipId::new(Self::require(&self.ship, "--ship <ID>"))
    }

    fn year(&self) -> i32 {
        let raw = Self::require(&self.year, "--year <YEAR>");
        raw.parse().unwrap_or_else(|_| {
            eprintln!("--year requires a number, got '{}'", raw);
            process::exit(1);
        })
    }
}

/// Opened ledger plus the store behind it, for saving afterwards.
struct Session {
    store: Arc<InMemoryStore>,
    ledger: ComplianceLedger,
    state_path: String,
}

impl Session {
    fn open(opts: &Options) -> Self {
        let config = match &opts.config {
            Some(path) => LedgerConfig::from_file(path).unwrap_or_else(|e| {
                eprintln!("Error loading config: {}", e);
                process::exit(1);
            }),
            None => LedgerConfig::default(),
        };

        let state_path = opts
            .state
            .clone()
            .unwrap_or_else(|| DEFAULT_STATE.to_string());
        let snapshot = if Path::new(&state_path).exists() {
            let content = fs::read_to_string(&state_path).unwrap_or_else(|e| {
                eprintln!("Error reading state '{}': {}", state_path, e);
                process::exit(1);
            });
            serde_json::from_str::<StoreSnapshot>(&content).unwrap_or_else(|e| {
                eprintln!("Error parsing state '{}': {}", state_path, e);
                process::exit(1);
            })
        } else {
            debug!("state file {} not found, starting empty", state_path);
            StoreSnapshot::default()
        };

        let store = Arc::new(InMemoryStore::from_snapshot(snapshot));
        let ledger = ComplianceLedger::in_memory(store.clone(), config);
        Self {
            store,
            ledger,
            state_path,
        }
    }

    fn save(&self) {
        let snapshot = self.store.snapshot().unwrap_or_else(|e| {
            eprintln!("Error reading store: {}", e);
            process::exit(1);
        });
        let json = to_json(&snapshot);
        fs::write(&self.state_path, json).unwrap_or_else(|e| {
            eprintln!("Error writing state '{}': {}", self.state_path, e);
            process::exit(1);
        });
        info!("state saved to {}", self.state_path);
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        process::exit(1);
    })
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", err);
    process::exit(1);
}

fn parse_decimal(field: &str, raw: &str) -> Decimal {
    raw.parse().unwrap_or_else(|e| {
        eprintln!("Invalid {} '{}': {}", field, raw, e);
        process::exit(1);
    })
}

fn cmd_import_routes(args: &[String]) {
    let opts = Options::parse(args);
    let path = Options::require(&opts.input, "--input <FILE>");
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    let file: RoutesFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "routes": [
    {{ "ship_id": "IMO-9321483", "year": 2025, "ghg_intensity": "91.0", "fuel_consumption": "5000" }}
  ]
}}"#
        );
        process::exit(1);
    });

    let session = Session::open(&opts);
    let mut imported = 0usize;
    for input in file.routes {
        let intensity = parse_decimal("ghg_intensity", &input.ghg_intensity);
        let fuel = parse_decimal("fuel_consumption", &input.fuel_consumption);
        if intensity < Decimal::ZERO || fuel < Decimal::ZERO {
            fail(format!(
                "route of {} in {} has a negative intensity or fuel consumption",
                input.ship_id, input.year
            ));
        }
        let mut route = Route::new(ShipId::new(&input.ship_id), input.year, intensity, fuel)
            .with_vessel_type(input.vessel_type)
            .with_fuel_type(input.fuel_type);
        if let Some(distance) = &input.distance {
            route = route.with_distance(parse_decimal("distance", distance));
        }
        if let Some(emissions) = &input.total_emissions {
            route = route.with_total_emissions(parse_decimal("total_emissions", emissions));
        }

        let stored = RouteRepository::insert(&*session.store, route).unwrap_or_else(|e| fail(e));
        if input.is_baseline {
            RouteRepository::set_baseline(&*session.store, stored.id()).unwrap_or_else(|e| fail(e));
        }
        imported += 1;
    }
    session.save();

    if opts.json() {
        println!("{}", to_json(&serde_json::json!({ "imported": imported })));
    } else {
        println!("Imported {} routes into {}", imported, session.state_path);
    }
}

fn cmd_compute(args: &[String]) {
    let opts = Options::parse(args);
    let (ship, year) = (opts.ship(), opts.year());
    let session = Session::open(&opts);
    let calculator = session.ledger.calculator();

    calculator
        .compute_balance(&ship, year)
        .unwrap_or_else(|e| fail(e));
    let record = calculator.record(&ship, year).unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        let output = BalanceOutput {
            ship_id: ship.to_string(),
            year,
            balance: record.balance().to_string(),
            status: record.status().as_str().to_string(),
        };
        println!("{}", to_json(&output));
    } else {
        println!("=== Compliance Balance ===");
        println!("Ship:     {}", ship);
        println!("Year:     {}", year);
        println!("Balance:  {} gCO2e", record.balance());
        println!("Status:   {}", record.status().as_str().to_uppercase());
    }
}

fn cmd_bank(args: &[String]) {
    let opts = Options::parse(args);
    let (ship, year) = (opts.ship(), opts.year());
    let session = Session::open(&opts);

    let record = session
        .ledger
        .banking()
        .bank_surplus(&ship, year)
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        println!("{}", to_json(&record));
    } else {
        println!("=== Surplus Banked ===");
        println!("Ship:         {}", record.ship_id());
        println!("Origin Year:  {}", record.year());
        println!("Amount:       {}", record.banked_amount());
        println!("Expires:      {}", record.expiry_year());
    }
}

fn cmd_apply(args: &[String]) {
    let opts = Options::parse(args);
    let (ship, year) = (opts.ship(), opts.year());
    let session = Session::open(&opts);

    let outcome = session
        .ledger
        .banking()
        .apply_banked_surplus(&ship, year)
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        println!("{}", to_json(&outcome));
    } else {
        println!("{}", outcome);
    }
}

fn cmd_pool(args: &[String]) {
    let opts = Options::parse(args);
    let name = Options::require(&opts.name, "--name <NAME>");
    let year = opts.year();
    let ships: Vec<ShipId> = Options::require(&opts.ships, "--ships <ID,ID,...>")
        .split(',')
        .map(|s| ShipId::new(s.trim()))
        .collect();
    let session = Session::open(&opts);

    let created = session
        .ledger
        .pooling()
        .create_pool(name, year, &ships)
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        println!("{}", to_json(&created));
    } else {
        println!("{}", created);
    }
}

fn cmd_expire(args: &[String]) {
    let opts = Options::parse(args);
    let year = opts.year();
    let session = Session::open(&opts);

    let records = session
        .ledger
        .banking()
        .expire_records(year)
        .unwrap_or_else(|e| fail(e));
    session.save();

    if opts.json() {
        let output = ExpiredOutput {
            expired: records.len(),
            records,
        };
        println!("{}", to_json(&output));
    } else if records.is_empty() {
        println!("No banked records due to expire in {}.", year);
    } else {
        for record in &records {
            println!(
                "  Expired {} banked by {} in {} (expiry {})",
                record.banked_amount(),
                record.ship_id(),
                record.year(),
                record.expiry_year()
            );
        }
        println!("\nTotal expired: {}", records.len());
    }
}

fn cmd_compare(args: &[String]) {
    let opts = Options::parse(args);
    let session = Session::open(&opts);

    let report = session
        .ledger
        .compare_routes()
        .unwrap_or_else(|e| fail(e));

    if opts.json() {
        println!("{}", to_json(&report));
    } else {
        println!("{}", report);
    }
}

fn cmd_generate(args: &[String]) {
    let opts = Options::parse(args);
    let parse_count = |value: &Option<String>, flag: &str, default: usize| -> usize {
        match value {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                eprintln!("{} requires a number", flag);
                process::exit(1);
            }),
            None => default,
        }
    };
    let ship_count = parse_count(&opts.ships, "--ships", 10);
    let routes_per_ship = parse_count(&opts.routes_per_ship, "--routes-per-ship", 3);
    let years: Vec<i32> = match &opts.year {
        Some(raw) => raw
            .split(',')
            .map(|s| {
                s.trim().parse().unwrap_or_else(|_| {
                    eprintln!("--year requires a comma-separated list of years");
                    process::exit(1);
                })
            })
            .collect(),
        None => FleetConfig::default().years,
    };

    let config = FleetConfig {
        ship_count,
        years,
        routes_per_ship_year: routes_per_ship,
        ..Default::default()
    };
    let routes = generate_fleet(&config);

    let output = RoutesFile {
        routes: routes
            .iter()
            .map(|r| RouteInput {
                ship_id: r.ship_id().to_string(),
                year: r.year(),
                ghg_intensity: r.ghg_intensity().to_string(),
                fuel_consumption: r.fuel_consumption().to_string(),
                vessel_type: r.vessel_type().to_string(),
                fuel_type: r.fuel_type().to_string(),
                distance: Some(r.distance().to_string()),
                total_emissions: None,
                is_baseline: r.is_baseline(),
            })
            .collect(),
    };
    let json = to_json(&output);

    if let Some(path) = &opts.output {
        fs::write(path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} routes across {} ships → {}",
            routes.len(),
            ship_count,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "import-routes" => cmd_import_routes(rest),
        "compute" => cmd_compute(rest),
        "bank" => cmd_bank(rest),
        "apply" => cmd_apply(rest),
        "pool" => cmd_pool(rest),
        "expire" => cmd_expire(rest),
        "compare" => cmd_compare(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
