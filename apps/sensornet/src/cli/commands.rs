//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::QueryArgs;
use crate::api;
use crate::config::Config;
use sensornet_core::{
    Bound, CsvDirectory, Engine, Fields, Frame, Predicate, Predicates, RowId, SensorNetError,
    Table, TableStore, Value,
    primitives::{MAX_DELETE_BATCH, MAX_SET_VALUES},
};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    fn print_json(self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    fn info(self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

/// Split `field=value` at the first `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, &str), SensorNetError> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim().to_string(), value)),
        _ => Err(SensorNetError::InvalidPredicate(format!(
            "expected FIELD=VALUE, got '{}'",
            raw
        ))),
    }
}

/// Build a field map from `--set` assignments. An empty value is `Null`.
pub fn parse_fields(assignments: &[String]) -> Result<Fields, SensorNetError> {
    let mut fields = Fields::new();
    for raw in assignments {
        let (field, value) = parse_assignment(raw)?;
        if fields.insert(field.clone(), Value::parse(value)).is_some() {
            return Err(SensorNetError::InvalidPredicate(format!(
                "field '{}' assigned more than once",
                field
            )));
        }
    }
    Ok(fields)
}

/// `low..high` with either side optional.
fn parse_range(raw: &str) -> Result<Predicate, SensorNetError> {
    let (low, high) = raw.split_once("..").ok_or_else(|| {
        SensorNetError::InvalidPredicate(format!("expected LOW..HIGH, got '{}'", raw))
    })?;
    let bound = |side: &str| match side.trim() {
        "" => Bound::Unbounded,
        value => Bound::Included(Value::parse(value)),
    };
    Ok(Predicate::Range(bound(low), bound(high)))
}

/// Turn `--eq`, `--range` and `--in` flags into predicates.
///
/// Naming the same field twice is an error rather than a silent override.
pub fn build_predicates(args: &QueryArgs) -> Result<Predicates, SensorNetError> {
    let mut predicates = Predicates::new();
    let mut add = |field: String, predicate: Predicate| {
        if predicates.contains_key(&field) {
            return Err(SensorNetError::InvalidPredicate(format!(
                "field '{}' has more than one condition",
                field
            )));
        }
        predicates.insert(field, predicate);
        Ok(())
    };

    for raw in &args.eq {
        let (field, value) = parse_assignment(raw)?;
        add(field, Predicate::Exact(Value::parse(value)))?;
    }
    for raw in &args.range {
        let (field, value) = parse_assignment(raw)?;
        add(field, parse_range(value)?)?;
    }
    for raw in &args.any {
        let (field, value) = parse_assignment(raw)?;
        let set: Vec<Value> = value.split(',').map(|v| Value::parse(v.trim())).collect();
        if set.len() > MAX_SET_VALUES {
            return Err(SensorNetError::InvalidPredicate(format!(
                "set of {} values exceeds maximum {}",
                set.len(),
                MAX_SET_VALUES
            )));
        }
        add(field, Predicate::Any(set))?;
    }

    Ok(predicates)
}

// =============================================================================
// RENDERING
// =============================================================================

fn pad_line(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(v, w)| format!("{:<width$}", v, width = *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string();
    line.push('\n');
    line
}

/// Render a frame as an aligned text table.
pub fn render_frame(frame: &Frame) -> String {
    let cells: Vec<Vec<String>> = frame
        .rows()
        .iter()
        .map(|row| row.iter().map(Value::to_cell).collect())
        .collect();

    let widths: Vec<usize> = frame
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i).map(|c| c.chars().count()))
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = pad_line(frame.columns(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&pad_line(&rule, &widths));
    for row in &cells {
        out.push_str(&pad_line(row, &widths));
    }
    out
}

fn frame_json(table: Table, frame: &Frame) -> serde_json::Value {
    serde_json::json!({
        "table": table,
        "count": frame.len(),
        "rows": frame.to_records(),
    })
}

// =============================================================================
// ENGINE ACCESS
// =============================================================================

/// Open the configured data directory, repairing files as needed.
pub fn open_engine(config: &Config) -> Result<Engine, SensorNetError> {
    Engine::open(&config.data_dir, config.delimiter_byte()?)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config, out: Output) -> Result<(), SensorNetError> {
    let engine = open_engine(config)?;
    let addr = config.server.addr();

    out.info(&format!(
        "Sensornet server starting\n\n\
         Configuration:\n  \
         Address:  {}\n  \
         Data dir: {}\n\n\
         Press Ctrl+C to stop\n",
        addr,
        config.data_dir.display()
    ));

    api::run_server(&addr, engine).await
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Show row counts per table.
pub fn cmd_status(config: &Config, out: Output) -> Result<(), SensorNetError> {
    let engine = open_engine(config)?;
    let status = engine.status();

    if out.json {
        out.print_json(&serde_json::json!({
            "data_dir": config.data_dir.to_string_lossy(),
            "stations": status.stations,
            "places": status.places,
            "sensors": status.sensors,
            "records": status.records,
            "total": status.total(),
        }));
        return Ok(());
    }

    println!("Sensornet Status");
    println!("================");
    println!("Data dir: {}", config.data_dir.display());
    println!();
    println!("Stations: {}", status.stations);
    println!("Places:   {}", status.places);
    println!("Sensors:  {}", status.sensors);
    println!("Records:  {}", status.records);
    Ok(())
}

/// List the columns of a table or its union view.
pub fn cmd_fields(
    config: &Config,
    out: Output,
    table: Table,
    union: bool,
) -> Result<(), SensorNetError> {
    let engine = open_engine(config)?;
    let fields: Vec<String> = if union {
        engine.union_fields(table)?
    } else {
        engine.fields(table).iter().map(ToString::to_string).collect()
    };

    if out.json {
        out.print_json(&serde_json::json!({ "table": table, "union": union, "fields": fields }));
    } else {
        for field in fields {
            println!("{}", field);
        }
    }
    Ok(())
}

/// Filter, then project, a table or its union view.
pub fn cmd_query(
    config: &Config,
    out: Output,
    table: Table,
    args: &QueryArgs,
    union: bool,
) -> Result<(), SensorNetError> {
    let predicates = build_predicates(args)?;
    let engine = open_engine(config)?;
    let fields = args.fields.as_deref();

    let frame = if union {
        engine.union_query(table, &predicates, fields)?
    } else {
        engine.query(table, &predicates, fields)?
    };

    if out.json {
        out.print_json(&frame_json(table, &frame));
    } else {
        print!("{}", render_frame(&frame));
        out.info(&format!("({} rows)", frame.len()));
    }
    Ok(())
}

// =============================================================================
// MUTATION COMMANDS
// =============================================================================

/// Insert a row and print its id.
pub fn cmd_insert(
    config: &Config,
    out: Output,
    table: Table,
    assignments: &[String],
) -> Result<(), SensorNetError> {
    let fields = parse_fields(assignments)?;
    let mut engine = open_engine(config)?;
    let id = engine.insert(table, fields)?;

    if out.json {
        out.print_json(&serde_json::json!({ "table": table, "id": id }));
    } else {
        println!("Inserted {} id {}", table, id);
    }
    Ok(())
}

/// Update fields of a row.
pub fn cmd_update(
    config: &Config,
    out: Output,
    table: Table,
    id: u64,
    assignments: &[String],
) -> Result<(), SensorNetError> {
    let fields = parse_fields(assignments)?;
    let updated: Vec<String> = fields.keys().cloned().collect();
    let mut engine = open_engine(config)?;
    engine.update(table, RowId(id), fields)?;

    if out.json {
        out.print_json(&serde_json::json!({ "table": table, "id": id, "updated": updated }));
    } else {
        println!("Updated {} id {}: {}", table, id, updated.join(", "));
    }
    Ok(())
}

/// Delete a batch of ids.
pub fn cmd_delete(
    config: &Config,
    out: Output,
    table: Table,
    ids: &[u64],
) -> Result<(), SensorNetError> {
    if ids.len() > MAX_DELETE_BATCH {
        return Err(SensorNetError::SerializationError(format!(
            "Delete batch of {} ids exceeds maximum {}",
            ids.len(),
            MAX_DELETE_BATCH
        )));
    }
    let ids: Vec<RowId> = ids.iter().copied().map(RowId).collect();
    let mut engine = open_engine(config)?;
    let removed = engine.delete(table, &ids)?;

    if out.json {
        out.print_json(&serde_json::json!({ "table": table, "removed": removed }));
    } else {
        println!("Deleted {} of {} {} rows", removed, ids.len(), table);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write header-only files for all four tables.
///
/// Refuses to touch a directory that already holds a table file unless
/// `force` is set.
pub fn cmd_init(config: &Config, out: Output, force: bool) -> Result<(), SensorNetError> {
    let dir = CsvDirectory::with_delimiter(&config.data_dir, config.delimiter_byte()?);

    let existing: Vec<Table> = Table::ALL
        .into_iter()
        .filter(|t| dir.path_for(*t).exists())
        .collect();
    if !existing.is_empty() && !force {
        return Err(SensorNetError::IoError(format!(
            "Data directory {} already holds table files. Use --force to overwrite.",
            config.data_dir.display()
        )));
    }

    std::fs::create_dir_all(dir.root()).map_err(|e| {
        SensorNetError::IoError(format!(
            "Cannot create data directory {}: {}",
            dir.root().display(),
            e
        ))
    })?;
    dir.flush(&TableStore::new())?;

    if out.json {
        out.print_json(&serde_json::json!({
            "data_dir": config.data_dir.to_string_lossy(),
            "overwritten": existing,
        }));
    } else {
        out.info(&format!(
            "Initialized empty tables in {}",
            config.data_dir.display()
        ));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config_for(dir: &Path) -> Config {
        Config::default().with_overrides(Some(dir.to_path_buf()), None)
    }

    const QUIET: Output = Output {
        json: false,
        quiet: true,
    };

    #[test]
    fn assignment_splits_at_first_equals() {
        let (field, value) = parse_assignment("name=a=b").expect("parse");
        assert_eq!(field, "name");
        assert_eq!(value, "a=b");
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn fields_parse_values() {
        let fields = parse_fields(&[
            "altitude=1800".to_string(),
            "longitude=8.5".to_string(),
            "status=".to_string(),
            "place_code=P-01".to_string(),
        ])
        .expect("fields");
        assert_eq!(fields["altitude"], Value::Integer(1800));
        assert_eq!(fields["longitude"], Value::Float(8.5));
        assert_eq!(fields["status"], Value::Null);
        assert_eq!(fields["place_code"], Value::from("P-01"));
    }

    #[test]
    fn duplicate_assignment_rejected() {
        assert!(parse_fields(&["a=1".to_string(), "a=2".to_string()]).is_err());
    }

    #[test]
    fn predicates_from_flags() {
        let args = QueryArgs {
            eq: vec!["region=Alpine".to_string()],
            range: vec!["measured_value=..10".to_string(), "altitude=1000..".to_string()],
            any: vec!["id=1, 3,5".to_string()],
            fields: None,
        };
        let predicates = build_predicates(&args).expect("predicates");

        assert_eq!(predicates["region"], Predicate::exact("Alpine"));
        assert_eq!(predicates["measured_value"], Predicate::at_most(10));
        assert_eq!(predicates["altitude"], Predicate::at_least(1000));
        assert_eq!(predicates["id"], Predicate::any([1, 3, 5]));
    }

    #[test]
    fn empty_range_is_noop() {
        let args = QueryArgs {
            range: vec!["region=..".to_string()],
            ..QueryArgs::default()
        };
        let predicates = build_predicates(&args).expect("predicates");
        assert!(predicates["region"].is_noop());
    }

    #[test]
    fn conflicting_conditions_rejected() {
        let args = QueryArgs {
            eq: vec!["id=1".to_string()],
            any: vec!["id=2,3".to_string()],
            ..QueryArgs::default()
        };
        assert!(matches!(
            build_predicates(&args),
            Err(SensorNetError::InvalidPredicate(_))
        ));
    }

    #[test]
    fn range_without_separator_rejected() {
        let args = QueryArgs {
            range: vec!["altitude=1000".to_string()],
            ..QueryArgs::default()
        };
        assert!(build_predicates(&args).is_err());
    }

    #[test]
    fn render_aligns_columns() {
        let frame = Frame::with_rows(
            ["id", "name"],
            vec![
                vec![Value::Integer(0), Value::from("Summit")],
                vec![Value::Integer(10), Value::Null],
            ],
        )
        .expect("frame");

        assert_eq!(
            render_frame(&frame),
            "id  name\n--  ------\n0   Summit\n10\n"
        );
    }

    #[test]
    fn init_refuses_existing_tables() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = config_for(tmp.path());

        cmd_init(&config, QUIET, false).expect("first init");
        assert!(tmp.path().join("record.csv").exists());
        assert!(matches!(
            cmd_init(&config, QUIET, false),
            Err(SensorNetError::IoError(_))
        ));
        cmd_init(&config, QUIET, true).expect("forced init");
    }

    #[test]
    fn insert_update_delete_through_commands() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = config_for(tmp.path());

        cmd_insert(&config, QUIET, Table::Station, &["name=Summit".to_string()]).expect("insert");
        cmd_update(&config, QUIET, Table::Station, 0, &["region=Alpine".to_string()])
            .expect("update");

        let engine = open_engine(&config).expect("open");
        let stations = engine.store().get_all(Table::Station);
        assert_eq!(stations.value(0, "region"), Some(&Value::from("Alpine")));

        cmd_delete(&config, QUIET, Table::Station, &[0]).expect("delete");
        assert_eq!(open_engine(&config).expect("open").status().total(), 0);
    }
}
