use crate::config::{DynamicRecord, MappingConfig};
use crate::error::{SheetError, SheetResult};
use crate::excel::{read_header_row, RecordExporter, RecordImporter};
use crate::grid::codec;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

/// Execute the export command
pub fn export(
    template: PathBuf,
    mapping: PathBuf,
    data: PathBuf,
    output: PathBuf,
    verbose: bool,
) -> SheetResult<()> {
    println!("{}", "sheetbind - Export".bold().green());
    println!("   Template: {}", template.display());
    println!("   Data:     {}", data.display());
    println!("   Output:   {}\n", output.display());

    let config = MappingConfig::load(&mapping)?;
    let text = fs::read_to_string(&data).map_err(|e| {
        SheetError::invalid(format!("cannot read data {}: {}", data.display(), e))
    })?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| SheetError::invalid(format!("data {} is not JSON: {}", data.display(), e)))?;
    let records = config.records_from_json(&json)?;

    if verbose {
        println!(
            "   Sheet {} from row {}, {} columns, {} records\n",
            config.sheet,
            config.start_row,
            config.columns.len(),
            records.len()
        );
    }

    let mut exporter = RecordExporter::new(config.sheet, config.start_row);
    if let Some(map) = config.header_map.clone() {
        exporter = exporter.with_header_map(map);
    }
    let summary = exporter.save_as(&template, &records, &output)?;

    println!("{}", "Export complete".bold().green());
    println!(
        "   {} rows written, {} columns mapped",
        summary.rows_written,
        summary.columns
    );
    if summary.columns == 0 {
        println!(
            "{}",
            "   warning: no field matched a header column".yellow()
        );
    }
    println!("   Workbook: {}\n", output.display());

    Ok(())
}

/// Execute the import command
pub fn import(
    input: PathBuf,
    mapping: PathBuf,
    output: Option<PathBuf>,
    verbose: bool,
) -> SheetResult<()> {
    let config = MappingConfig::load(&mapping)?;
    let schema = config.schema()?;
    let header_row = config.start_row.checked_sub(1).ok_or_else(|| {
        SheetError::invalid("start_row must be at least 1 (row 0 is the header row)")
    })?;

    let mut importer = RecordImporter::new(config.sheet, header_row);
    if let Some(map) = config.header_map.clone() {
        importer = importer.with_header_map(map);
    }
    let records: Vec<DynamicRecord> = importer.import_file(&input, &schema)?;
    let records = config.apply_kinds(records)?;

    let json: Vec<serde_json::Value> = records.iter().map(DynamicRecord::to_json).collect();
    let text = serde_json::to_string_pretty(&json)?;

    match output {
        Some(path) => {
            fs::write(&path, text)?;
            eprintln!("{}", "Import complete".bold().green());
            eprintln!("   {} records -> {}", records.len(), path.display());
        }
        None => {
            println!("{}", text);
            if verbose {
                eprintln!("   {} records read from {}", records.len(), input.display());
            }
        }
    }

    Ok(())
}

/// Execute the headers command: list the titles of a header row
pub fn headers(input: PathBuf, sheet: usize, row: u32) -> SheetResult<()> {
    let workbook = codec::open_path(&input)?;
    let worksheet = workbook.sheet(sheet)?;
    let entries = read_header_row(worksheet, row);

    println!(
        "{} {} (row {})",
        "Sheet".bold(),
        worksheet.name().bright_blue(),
        row
    );
    if entries.is_empty() {
        println!("{}", "   no header titles found".yellow());
        return Ok(());
    }
    for entry in &entries {
        let styled = if entry.style.is_some() { " (styled)" } else { "" };
        println!(
            "   {:>4}  {}{}",
            entry.column_index,
            entry.title.cyan(),
            styled.dimmed()
        );
    }

    Ok(())
}
