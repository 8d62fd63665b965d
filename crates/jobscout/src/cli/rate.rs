//! `jobscout rate <text>` normalizes and rates one salary text offline.

use anyhow::Result;
use clap::Args;
use jobscout::criteria::{RatingPolicy, SalaryRange};
use jobscout::rating::{Rating, RatingClassifier};
use jobscout::salary;

#[derive(Args, Debug)]
pub struct RateArgs {
    /// Lower bound of the desired yearly salary
    #[arg(long)]
    min: f64,

    /// Upper bound of the desired yearly salary
    #[arg(long)]
    max: f64,

    /// Top tier width, percent of the range
    #[arg(long, default_value_t = 10.0)]
    top: f64,

    /// Bottom cut, percent of the range
    #[arg(long, default_value_t = 10.0)]
    bottom: f64,

    /// Keep text without a salary as unrated instead of excluding it
    #[arg(long)]
    include_no_salary: bool,

    /// Salary text, e.g. "$90,000 - $100,000 a year"
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
}

/// Run the rate command.
pub fn run(args: RateArgs, json: bool) -> Result<()> {
    let range = SalaryRange::new(args.min, args.max);
    let policy = RatingPolicy {
        top_percent: args.top,
        bottom_percent: args.bottom,
        include_no_salary: args.include_no_salary,
        require_experience: false,
    };
    policy.validate()?;
    if range.min > range.max {
        anyhow::bail!("--min {} exceeds --max {}", range.min, range.max);
    }

    let text = args.text.join(" ");
    let estimate = salary::parse_salary(&text);
    let classifier = RatingClassifier::new(range, policy, &[]);
    let rating = classifier.classify(estimate.as_ref().map(|e| e.yearly), "");

    let label = match rating {
        Rating::Rated(tier) => format!("tier {} ({})", tier.number(), tier.label()),
        Rating::Unrated => "unrated".to_string(),
        Rating::Excluded => "excluded".to_string(),
    };

    if json {
        let value = serde_json::json!({
            "text": text,
            "period": estimate.as_ref().map(|e| format!("{:?}", e.period).to_lowercase()),
            "amounts": estimate.as_ref().map(|e| e.amounts.clone()),
            "yearly": estimate.as_ref().map(|e| e.yearly),
            "rating": label,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let t = classifier.thresholds();
    match &estimate {
        Some(e) => println!("  yearly:  {:.2} ({:?})", e.yearly, e.period),
        None => println!("  yearly:  not found"),
    }
    println!("  rating:  {label}");
    println!(
        "  cuts:    top {:.0}, bottom {:.0}, buffer {:.0}..{:.0}",
        t.top, t.bottom, t.buffer_low, t.buffer_high
    );
    Ok(())
}
