mod advisor;
mod catalog;
mod code;
mod model;
mod parser;
mod reconcile;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use advisor::Eligibility;
use catalog::{Catalog, CatalogBuilder};
use code::CourseCode;
use model::{Category, Framework};
use parser::{ExtractConfig, Extraction, FormatVariant};

#[derive(Parser)]
#[command(name = "studyplan", about = "Study-plan course extractor and catalog reconciler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract course catalogs from plain-text study plans
    Extract {
        /// Study-plan text files, one program each
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Catalog key (default: input file stem; single input only)
        #[arg(short, long)]
        key: Option<String>,
        /// Program display name (default: the key)
        #[arg(long)]
        name: Option<String>,
        /// Declared program total, checked against the extracted sum
        #[arg(long)]
        total_credits: Option<u32>,
        /// Force a table layout instead of detecting it
        #[arg(short, long, value_enum)]
        format: Option<FormatVariant>,
        /// Records allowed before the first section header
        #[arg(long, default_value = "5")]
        unresolved_limit: usize,
        /// Continuation lines merged into a record with unknown credit hours
        #[arg(long, default_value = "6")]
        lookahead_budget: usize,
        /// Largest credit value accepted as plausible
        #[arg(long, default_value = "12")]
        max_credit_hours: u8,
        /// Where <key>.json files are written
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Compare two catalogs of the same program
    Reconcile {
        a: PathBuf,
        b: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Credit totals and framework breakdown of a catalog
    Summary {
        catalog: PathBuf,
        /// List courses whose credit hours differ from this value
        #[arg(long)]
        unusual_ch: Option<u8>,
    },
    /// Cross-category duplicates and dangling prerequisite codes
    Check {
        #[arg(required = true)]
        catalogs: Vec<PathBuf>,
    },
    /// Courses a student can take next
    Advise {
        catalog: PathBuf,
        /// Completed course codes
        #[arg(short, long, num_args = 1..)]
        completed: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            inputs,
            key,
            name,
            total_credits,
            format,
            unresolved_limit,
            lookahead_budget,
            max_credit_hours,
            out_dir,
        } => {
            if key.is_some() && inputs.len() > 1 {
                anyhow::bail!("--key applies to a single input; got {}", inputs.len());
            }
            let config = ExtractConfig {
                variant: format,
                unresolved_limit,
                lookahead_budget,
                max_credit_hours,
            };
            let jobs: Vec<ExtractJob> = inputs
                .into_iter()
                .map(|path| {
                    let key = key.clone().unwrap_or_else(|| file_stem(&path));
                    let name = name.clone().unwrap_or_else(|| key.clone());
                    ExtractJob {
                        path,
                        key,
                        name,
                        total_credits,
                    }
                })
                .collect();

            println!("Extracting {} documents...", jobs.len());
            let results = extract_documents(&jobs, &config)?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;

            let mut failed = 0;
            for (job, result) in jobs.iter().zip(results) {
                match result {
                    Ok(extraction) => write_extraction(job, &extraction, &out_dir)?,
                    Err(e) => {
                        failed += 1;
                        println!("{}: FAILED: {:#}", job.path.display(), e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} documents failed", failed, jobs.len());
            }
            Ok(())
        }
        Commands::Reconcile { a, b, json } => {
            let left = load_catalog(&a)?;
            let right = load_catalog(&b)?;
            let report = reconcile::reconcile(&left, &right);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
            Ok(())
        }
        Commands::Summary { catalog, unusual_ch } => {
            let catalog = load_catalog(&catalog)?;
            print_summary(&catalog, unusual_ch);
            Ok(())
        }
        Commands::Check { catalogs } => {
            let catalogs = catalogs
                .iter()
                .map(|p| load_catalog(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let mut warnings: Vec<_> = catalogs.iter().flat_map(reconcile::cross_category_warnings).collect();
            warnings.extend(reconcile::unreferenced_prerequisites(&catalogs));
            if warnings.is_empty() {
                println!("No problems found in {} catalogs.", catalogs.len());
            }
            for w in &warnings {
                println!("warning: {w}");
            }
            Ok(())
        }
        Commands::Advise { catalog, completed } => {
            let catalog = load_catalog(&catalog)?;
            let completed: HashSet<CourseCode> = completed.iter().map(|c| CourseCode::from(c.as_str())).collect();
            for code in completed.iter().filter(|c| !catalog.contains(c)) {
                warn!("Completed course {} is not in {}", code, catalog.key);
            }
            print_advice(&catalog, &completed);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ExtractJob {
    path: PathBuf,
    key: String,
    name: String,
    total_credits: Option<u32>,
}

fn extract_documents(
    jobs: &[ExtractJob],
    config: &ExtractConfig,
) -> anyhow::Result<Vec<anyhow::Result<Extraction>>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results = jobs
        .par_iter()
        .map(|job| {
            let result = extract_one(job, config);
            pb.inc(1);
            result
        })
        .collect();

    pb.finish_and_clear();
    Ok(results)
}

fn extract_one(job: &ExtractJob, config: &ExtractConfig) -> anyhow::Result<Extraction> {
    let text = std::fs::read_to_string(&job.path)
        .with_context(|| format!("reading {}", job.path.display()))?;
    let builder = CatalogBuilder::new(&job.key, &job.name)
        .source(job.path.display().to_string())
        .total_credits(job.total_credits)
        .extracted_at(Utc::now());
    let extraction = parser::extract(&text, builder, config)
        .with_context(|| format!("extracting {}", job.path.display()))?;
    Ok(extraction)
}

fn write_extraction(job: &ExtractJob, extraction: &Extraction, out_dir: &Path) -> anyhow::Result<()> {
    let catalog = &extraction.catalog;
    let out = out_dir.join(format!("{}.json", job.key));
    std::fs::write(&out, catalog.to_json_pretty()?)
        .with_context(|| format!("writing {}", out.display()))?;
    info!("Wrote {}", out.display());

    let summary = catalog.credit_summary();
    println!(
        "{}: {} records, {} CH ({:?} layout) -> {}",
        job.path.display(),
        catalog.len(),
        summary.total,
        extraction.variant,
        out.display()
    );
    if summary.matches_declared() == Some(false) {
        println!(
            "  note: declared total {} CH, extracted {} CH",
            summary.declared.unwrap_or_default(),
            summary.total
        );
    }
    for w in &extraction.warnings {
        println!("  warning: {w}");
    }
    Ok(())
}

fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut catalog = Catalog::from_json(&text).with_context(|| format!("parsing {}", path.display()))?;
    if catalog.key.is_empty() {
        catalog.key = file_stem(path);
    }
    Ok(catalog)
}

fn print_summary(catalog: &Catalog, unusual_ch: Option<u8>) {
    let summary = catalog.credit_summary();
    println!("{} ({})", catalog.name, catalog.key);
    println!("{:<24} | {:>7} | {:>4}", "Category", "Courses", "CH");
    println!("{}", "-".repeat(41));
    for (category, ch) in &summary.per_category {
        println!("{:<24} | {:>7} | {:>4}", category, catalog.bucket(*category).len(), ch);
    }
    println!("{}", "-".repeat(41));
    println!("{:<24} | {:>7} | {:>4}", "Total", catalog.len(), summary.total);
    match (summary.declared, summary.matches_declared()) {
        (Some(declared), Some(false)) => println!("Declared total: {} CH (differs by {})", declared, declared.abs_diff(summary.total)),
        (Some(declared), _) => println!("Declared total: {} CH", declared),
        (None, _) => {}
    }

    println!("\n--- Frameworks ---");
    for (framework, count) in catalog.framework_counts() {
        let label = framework.map_or("(none)", Framework::label);
        println!("  {:<7} {}", label, count);
    }

    if let Some(expected) = unusual_ch {
        let unusual = catalog.unusual_credit_hours(expected);
        println!("\n--- Not {} CH ({}) ---", expected, unusual.len());
        for r in unusual {
            println!("  {:<10} {:>2} CH  {}", r.code, r.credit_hours, truncate(&r.name, 40));
        }
    }
}

fn print_advice(catalog: &Catalog, completed: &HashSet<CourseCode>) {
    let have = advisor::completed_credit_hours(catalog, completed);
    let advice = advisor::advise(catalog, completed);
    let eligible = advice.iter().filter(|(_, e)| e.is_eligible()).count();
    println!("{} completed courses, {} CH", completed.len(), have);
    println!("\n--- Eligible ({}) ---", eligible);
    for (r, status) in &advice {
        if !status.is_eligible() {
            continue;
        }
        println!(
            "  {:<10} L{} {:>2} CH  {:<40} {}",
            r.code,
            r.level.unwrap_or(1),
            r.credit_hours,
            truncate(&r.name, 40),
            short_category(r.category)
        );
    }
    println!("\n--- Not yet ({}) ---", advice.len() - eligible);
    for (r, status) in &advice {
        let reason = match status {
            Eligibility::Eligible => continue,
            Eligibility::Blocked { missing } => {
                let codes: Vec<&str> = missing.iter().map(CourseCode::as_str).collect();
                format!("needs {}", codes.join(", "))
            }
            Eligibility::NeedsCredits { required, have } => format!("needs {required} CH (have {have})"),
            Eligibility::NeedsApproval(condition) => condition.clone(),
        };
        println!("  {:<10} {:<40} {}", r.code, truncate(&r.name, 40), reason);
    }
}

fn short_category(category: Category) -> &'static str {
    match category {
        Category::University => "university",
        Category::College => "college",
        Category::Department => "department",
        Category::Elective => "elective",
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".into())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
