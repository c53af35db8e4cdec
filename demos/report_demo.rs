//! Simulate a few thousand visitors against two experiments and print the
//! significance report for each.
//!
//! Run with: `cargo run --example report_demo`

use rand::Rng;
use splitest::{MemoryStore, SplitTester, VisitorIdentity};

fn main() -> splitest::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let tester = SplitTester::new(MemoryStore::new());
    let agent = Some("Mozilla/5.0 (demo)");

    tester.get_or_create_experiment("signup-button", &["green button", "red button"])?;
    tester.get_or_create_experiment(
        "headline",
        &["Ship faster", "Build better", "Debug less"],
    )?;

    let mut rng = rand::thread_rng();
    for _ in 0..4000 {
        let mut visitor = VisitorIdentity::new();

        // re-fetch each request, as a handler would: completion locks in
        // the winner as soon as the sample is large enough
        let button = tester.experiment("signup-button").expect("created above");
        let headline = tester.experiment("headline").expect("created above");

        let arm = tester.pick_alternative(&button, &mut visitor, agent)?;
        // the green button converts a little better
        let rate = if arm.content() == "green button" {
            0.11
        } else {
            0.08
        };
        if rng.gen_bool(rate) {
            tester.score_conversion("signup-button", &mut visitor);
        }

        tester.pick_alternative(&headline, &mut visitor, agent)?;
        if rng.gen_bool(0.05) {
            tester.score_conversion("headline", &mut visitor);
        }
    }

    for experiment in tester.experiments() {
        println!("== {} ({})", experiment.name(), experiment.significance_test_name());
        println!(
            "   {} participants, {} conversions ({})",
            experiment.participants(),
            experiment.conversions(),
            experiment.pretty_conversion_rate(),
        );
        for arm in experiment.alternatives() {
            println!(
                "   [{}] {}/{} ({})",
                arm.content(),
                arm.conversions(),
                arm.participants(),
                arm.pretty_conversion_rate(),
            );
        }
        println!("   {}", experiment.result_description());
        println!("   check by hand: {}", experiment.assumptions_to_check().join(", "));
        println!();
    }

    Ok(())
}
