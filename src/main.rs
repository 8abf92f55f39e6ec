use std::process::ExitCode;

use clap::Parser;
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::{ProgressBar, ProgressStyle};

use hierlabel::cli::{open_store, Cli, Command, LabelsArgs, ReverseArgs, TableIdsArgs};
use hierlabel::config::LabelConfig;
use hierlabel::error::{HierLabelError, Result};
use hierlabel::pipeline::run_labels;
use hierlabel::store::{RecordStore, SqliteRecordStore};
use hierlabel::tools::{reverse_values, TableIds};
use hierlabel::types::LabelMode;
use hierlabel::writer::BatchProgress;

fn main() -> ExitCode {
    hierlabel::observability::init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            if e.is_config() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = cli.effective_config(Some(&cwd))?;

    match &cli.command {
        Command::Labels(args) => cmd_labels(config, args),
        Command::TableIds(args) => cmd_table_ids(&config, args),
        Command::ReverseValues(args) => cmd_reverse_values(&config, args),
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

fn cmd_labels(mut config: LabelConfig, args: &LabelsArgs) -> Result<()> {
    let store = open_store(&config)?;
    if args.interactive {
        prompt_missing(&store, &mut config)?;
    }
    let job = config.resolve()?;

    println!(
        "{} {} ({}, {})",
        style("Labeling").bold().cyan(),
        style(&job.table).bold(),
        job.options.direction,
        job.options.mode
    );

    let pb = progress_bar()?;
    let report = run_labels(&store, &job, args.dry_run, |p| advance(&pb, p))?;
    pb.finish_and_clear();

    if report.is_noop() {
        println!("{}", style("No changes to apply").yellow());
    } else if args.dry_run {
        for a in &report.assignments {
            println!("{}\t{}", a.id, a.label);
        }
        println!(
            "{} {} labels computed, nothing written",
            style("Dry run:").bold(),
            report.assignments.len()
        );
    } else if let Some(summary) = report.written {
        println!(
            "{} {} records in {} batches",
            style("Updated").green().bold(),
            summary.records,
            summary.batches
        );
    }
    if report.metrics.unlabeled > 0 {
        println!(
            "{} {} records could not be placed in the hierarchy",
            style("Note:").yellow(),
            report.metrics.unlabeled
        );
    }
    if args.metrics {
        println!("{}", serde_json::to_string_pretty(&report.metrics.to_json())?);
    }
    Ok(())
}

fn cmd_table_ids(config: &LabelConfig, args: &TableIdsArgs) -> Result<()> {
    let store = open_store(config)?;
    let table = args
        .table
        .as_deref()
        .or(config.table.as_deref())
        .ok_or_else(|| HierLabelError::config("no table selected"))?;
    let schema = store
        .describe_table(table)?
        .ok_or_else(|| HierLabelError::config(format!("table '{table}' not found")))?;
    let ids = TableIds::collect(&schema, args.fields, args.views);
    print!("{}", ids.render(args.format, args.indent)?);
    Ok(())
}

fn cmd_reverse_values(config: &LabelConfig, args: &ReverseArgs) -> Result<()> {
    let store = open_store(config)?;
    println!(
        "{} {}.{}",
        style("Reversing").bold().cyan(),
        args.table,
        args.field
    );
    let pb = progress_bar()?;
    let report = reverse_values(
        &store,
        &args.table,
        &args.field,
        args.view.as_deref(),
        |p| advance(&pb, p),
    )?;
    pb.finish_and_clear();

    if report.reversed == 0 {
        println!("{}", style("No changes to apply").yellow());
    } else {
        println!(
            "{} {} of {} records",
            style("Updated").green().bold(),
            report.written.records,
            report.scanned
        );
    }
    Ok(())
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .map_err(|e| HierLabelError::Other(format!("progress template: {e}")))?
            .progress_chars("=> "),
    );
    pb.set_message("Updating");
    Ok(pb)
}

fn advance(pb: &ProgressBar, p: &BatchProgress) {
    pb.set_length(p.total as u64);
    pb.set_position(p.applied as u64);
    pb.set_message(format!("Batch {}/{}", p.batch, p.total_batches));
}

/// Ask for whatever the merged config leaves unset.
fn prompt_missing(store: &SqliteRecordStore, config: &mut LabelConfig) -> Result<()> {
    let theme = ColorfulTheme::default();

    if config.table.is_none() {
        let tables = store.table_names()?;
        config.table = Some(pick(&theme, "Table", &tables)?);
    }
    let table = config.table.clone().unwrap_or_default();
    let Some(schema) = store.describe_table(&table)? else {
        return Err(HierLabelError::config(format!("table '{table}' not found")));
    };
    let fields: Vec<String> = schema.fields.iter().map(|f| f.name.clone()).collect();

    if config.view.is_none() && !schema.views.is_empty() {
        let mut choices = vec!["(table order)".to_string()];
        choices.extend(schema.views.iter().cloned());
        let picked = pick(&theme, "View", &choices)?;
        if picked != choices[0] {
            config.view = Some(picked);
        }
    }
    if config.link_field.is_none() {
        config.link_field = Some(pick(&theme, "Link field", &fields)?);
    }
    if config.mode == LabelMode::Path && config.label_field.is_none() {
        config.label_field = Some(pick(&theme, "Label field", &fields)?);
    }
    if config.output_field.is_none() {
        config.output_field = Some(pick(&theme, "Output field", &fields)?);
    }
    Ok(())
}

fn pick(theme: &ColorfulTheme, prompt: &str, items: &[String]) -> Result<String> {
    if items.is_empty() {
        return Err(HierLabelError::config(format!("nothing to choose for {prompt}")));
    }
    let idx = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .map_err(|e| HierLabelError::Other(format!("prompt failed: {e}")))?;
    Ok(items[idx].clone())
}
