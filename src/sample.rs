//! Sample applicant data
//!
//! Generates a CSV of made-up loan applicants, handy for trying the uploader
//! against a real bucket.

use anyhow::{Context, Result};
use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const FIRST_NAMES: &[&str] = &[
    "Ava", "Ben", "Chloe", "Daniel", "Emma", "Farah", "George", "Hana", "Ivan", "Julia", "Kofi",
    "Lena", "Mateo", "Nora", "Omar", "Priya", "Quinn", "Rosa", "Sam", "Tariq",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Brown", "Chen", "Diaz", "Evans", "Fischer", "Garcia", "Hughes", "Ito", "Johnson",
    "Khan", "Lopez", "Miller", "Nguyen", "Okafor", "Patel", "Reyes", "Smith", "Tanaka", "Walker",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

const EMPLOYMENT_STATUSES: &[&str] = &["employed", "self-employed", "unemployed", "retired"];

/// One generated row; field order is the CSV column order
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantRecord {
    pub email: String,
    pub full_name: String,
    pub age: u32,
    pub monthly_income: u32,
    pub credit_score: u32,
    pub employment_status: String,
    pub debt_to_income_ratio: f64,
    pub existing_loans: u32,
}

impl ApplicantRecord {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
        let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");
        let domain = EMAIL_DOMAINS.choose(rng).copied().unwrap_or("example.com");
        let tag: u32 = rng.gen_range(1..10_000);

        Self {
            email: format!(
                "{}.{}{}@{}",
                first.to_lowercase(),
                last.to_lowercase(),
                tag,
                domain
            ),
            full_name: format!("{} {}", first, last),
            age: rng.gen_range(21..=75),
            monthly_income: rng.gen_range(2000..=15000),
            credit_score: rng.gen_range(500..=850),
            employment_status: EMPLOYMENT_STATUSES
                .choose(rng)
                .copied()
                .unwrap_or("employed")
                .to_string(),
            debt_to_income_ratio: (rng.gen_range(0.1..0.6_f64) * 100.0).round() / 100.0,
            existing_loans: rng.gen_range(0..=3),
        }
    }
}

/// Generate `count` applicants
pub fn generate_applicants<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<ApplicantRecord> {
    (0..count).map(|_| ApplicantRecord::random(rng)).collect()
}

/// Write applicants as CSV with a header row
pub fn write_csv<W: std::io::Write>(writer: W, records: &[ApplicantRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record).context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Generate `count` applicants into `user_data_{timestamp}.csv` under `output_dir`
pub fn generate_user_data(count: usize, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let path = output_dir.join(format!("user_data_{}.csv", timestamp));

    let records = generate_applicants(&mut rand::thread_rng(), count);
    let file = fs::File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    write_csv(file, &records)?;

    tracing::info!("Generated {} applicants in {:?}", count, path);
    Ok(path)
}
