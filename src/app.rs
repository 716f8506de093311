use csv::Writer;
use elblog::{DecodeError, DecoderBuilder, Field, Generation, ParseError, Parser, Record, Schema, Value};
use prettytable::{Cell, Row, Table};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::result;
use std::str::FromStr;

pub(crate) type AppResult<T> = result::Result<T, AppError>;

#[derive(Fail, Debug)]
pub(crate) enum AppError {
    #[fail(display = "{}", _0)]
    Decode(#[cause] DecodeError),
    #[fail(display = "Unknown Schema \"{}\"", _0)]
    UnknownSchema(String),
    #[fail(display = "Unknown Field \"{}\"", _0)]
    UnknownField(String),
    #[fail(display = "Unknown Output Mode \"{}\"", _0)]
    UnknownOutputMode(String),
    #[fail(display = "{}", _0)]
    WriteCsv(#[cause] csv::Error),
    #[fail(display = "{}", _0)]
    WriteJson(#[cause] json::Error),
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> AppError {
        AppError::Decode(err)
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> AppError {
        AppError::WriteCsv(err)
    }
}

impl From<json::Error> for AppError {
    fn from(err: json::Error) -> AppError {
        AppError::WriteJson(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> AppError {
        AppError::Io(err)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum OutputMode {
    Table,
    Csv,
    Json,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        match s {
            "table" => Ok(OutputMode::Table),
            "csv" => Ok(OutputMode::Csv),
            "json" => Ok(OutputMode::Json),
            _ => Err("unknown output mode".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DataSource {
    File(PathBuf),
    Stdin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Options {
    pub(crate) schema: Schema,
    pub(crate) output: OutputMode,
    pub(crate) fields: Vec<Field>,
    pub(crate) skip_invalid: bool,
    pub(crate) parallel: bool,
}

pub(crate) fn parse_schema(s: &str) -> AppResult<Schema> {
    if s == "auto" {
        return Ok(Schema::Auto);
    }

    s.parse::<Generation>()
        .map(Schema::Fixed)
        .map_err(|_| AppError::UnknownSchema(s.to_string()))
}

pub(crate) fn parse_fields(s: &str) -> AppResult<Vec<Field>> {
    s.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<Field>().map_err(|_| AppError::UnknownField(name.to_string())))
        .collect()
}

impl Options {
    pub(crate) fn new(
        schema: &str,
        output: &str,
        fields: Option<&str>,
        skip_invalid: bool,
        parallel: bool,
    ) -> AppResult<Self> {
        let schema = parse_schema(schema)?;
        let output = output
            .parse::<OutputMode>()
            .map_err(|_| AppError::UnknownOutputMode(output.to_string()))?;
        let fields = match (fields, schema) {
            (Some(names), _) => parse_fields(names)?,
            (None, Schema::Fixed(g)) => g.fields().to_vec(),
            (None, Schema::Auto) => Field::all().to_vec(),
        };

        Ok(Options {
            schema,
            output,
            fields,
            skip_invalid,
            parallel,
        })
    }
}

fn open(data_source: &DataSource) -> AppResult<Box<dyn io::Read>> {
    match data_source {
        DataSource::File(path) => Ok(Box::new(File::open(path)?)),
        DataSource::Stdin => Ok(Box::new(io::stdin())),
    }
}

// Applies the skip policy to one failed line.
fn on_parse_error(options: &Options, line: usize, error: ParseError) -> AppResult<()> {
    if options.skip_invalid {
        warn!("skipping line {}: {}", line, error);
        Ok(())
    } else {
        Err(AppError::Decode(DecodeError::Parse { line, error }))
    }
}

fn for_each_record<F>(data_source: &DataSource, options: &Options, mut f: F) -> AppResult<()>
where
    F: FnMut(Record) -> AppResult<()>,
{
    let rdr = open(data_source)?;

    if options.parallel {
        #[cfg(feature = "parallel")]
        {
            let parser = Parser::new(options.schema);
            let results = elblog::parallel::decode_all(&parser, rdr)?;
            for (i, result) in results.into_iter().enumerate() {
                match result {
                    Ok(record) => f(record)?,
                    Err(error) => on_parse_error(options, i + 1, error)?,
                }
            }
            return Ok(());
        }

        #[cfg(not(feature = "parallel"))]
        warn!("built without the parallel feature, parsing sequentially");
    }

    let mut dec = DecoderBuilder::new().schema(options.schema).from_reader(rdr);
    while dec.has_more() {
        match dec.decode() {
            Ok(Some(record)) => f(record)?,
            Ok(None) => break,
            Err(DecodeError::Parse { line, error }) => on_parse_error(options, line, error)?,
            Err(err) => return Err(AppError::from(err)),
        }
    }

    Ok(())
}

fn to_json(value: Value) -> json::JsonValue {
    match value {
        Value::Int(i) => i.into(),
        Value::Duration(d) => match d.num_nanoseconds() {
            Some(n) => (n as f64 / 1e9).into(),
            None => (d.num_seconds() as f64).into(),
        },
        Value::Null => json::Null,
        other => other.to_string().into(),
    }
}

pub(crate) fn run<W: io::Write>(data_source: DataSource, options: &Options, out: &mut W) -> AppResult<()> {
    let fields = &options.fields;

    match options.output {
        OutputMode::Table => {
            let mut table = Table::new();
            table.set_titles(Row::new(fields.iter().map(|f| Cell::new(f.name())).collect()));
            for_each_record(&data_source, options, |record| {
                let cells = fields.iter().map(|f| Cell::new(&record.get(*f).to_string())).collect();
                table.add_row(Row::new(cells));
                Ok(())
            })?;
            table.print(out)?;
        }
        OutputMode::Csv => {
            let mut wtr = Writer::from_writer(out);
            wtr.write_record(fields.iter().map(|f| f.name()))?;
            for_each_record(&data_source, options, |record| {
                wtr.write_record(fields.iter().map(|f| record.get(*f).to_string()))?;
                Ok(())
            })?;
            wtr.flush()?;
        }
        OutputMode::Json => {
            let mut data = json::JsonValue::new_array();
            for_each_record(&data_source, options, |record| {
                let mut obj = json::JsonValue::new_object();
                for field in fields.iter() {
                    obj[field.name()] = to_json(record.get(*field));
                }
                data.push(obj)?;
                Ok(())
            })?;
            writeln!(out, "{}", data.dump())?;
        }
    }

    Ok(())
}
