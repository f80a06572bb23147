//! Fleet compliance walkthrough.
//!
//! Computes yearly balances for a small fleet, banks a surplus, covers a
//! later deficit with it and pools the remaining ships.

use compliance_ledger::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  compliance-ledger: Fleet Banking & Pooling  ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let store = Arc::new(InMemoryStore::new());
    let ledger = ComplianceLedger::in_memory(store.clone(), LedgerConfig::default());

    let aurora = ShipId::new("IMO-9321483");
    let borealis = ShipId::new("IMO-9405662");
    let cygnus = ShipId::new("IMO-9512837");

    let routes = [
        Route::new(aurora.clone(), 2024, dec!(82.3), dec!(115))
            .with_vessel_type("Container")
            .with_fuel_type("LNG")
            .as_baseline(),
        Route::new(aurora.clone(), 2025, dec!(90.0), dec!(100)).with_fuel_type("HFO"),
        Route::new(borealis.clone(), 2025, dec!(84.1), dec!(260)).with_fuel_type("LNG"),
        Route::new(cygnus.clone(), 2025, dec!(93.5), dec!(180)).with_fuel_type("HFO"),
    ];
    for route in routes {
        RouteRepository::insert(&*store, route)?;
    }

    // --- Step 1: Balances ---
    println!("━━━ Step 1: Compliance Balances ━━━\n");
    let calculator = ledger.calculator();
    for (ship, year) in [
        (&aurora, 2024),
        (&aurora, 2025),
        (&borealis, 2025),
        (&cygnus, 2025),
    ] {
        let balance = calculator.compute_balance(ship, year)?;
        let status = ComplianceStatus::from_balance(balance);
        println!("  {} {}: {:>16} gCO2e  [{}]", ship, year, balance, status.as_str());
    }
    println!();

    // --- Step 2: Banking ---
    println!("━━━ Step 2: Bank 2024 Surplus, Apply to 2025 ━━━\n");
    let banking = ledger.banking();
    let record = banking.bank_surplus(&aurora, 2024)?;
    println!(
        "  Banked {} from {} (expires {})",
        record.banked_amount(),
        record.year(),
        record.expiry_year()
    );
    let outcome = banking.apply_banked_surplus(&aurora, 2025)?;
    println!("{}", outcome);

    // --- Step 3: Pooling ---
    println!("━━━ Step 3: Pool 2025 Balances ━━━\n");
    let created = ledger
        .pooling()
        .create_pool("north-atlantic", 2025, &[borealis.clone(), cygnus.clone()])?;
    println!("{}", created);

    // --- Step 4: Comparison ---
    println!("━━━ Step 4: Baseline Comparison ━━━\n");
    println!("{}", ledger.compare_routes()?);

    Ok(())
}
