use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mbgate_server::GatewayStats;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RegistersOutput<'a> {
    pub target: &'a str,
    pub unit_id: u8,
    pub start: u16,
    pub count: usize,
    pub values: &'a [u16],
}

pub fn print_registers(out: &RegistersOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "VALUE", "HEX"]);
            for (address, value) in register_rows(out.start, out.values) {
                table.add_row(vec![
                    address.to_string(),
                    value.to_string(),
                    format!("{value:#06x}"),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (address, value) in register_rows(out.start, out.values) {
                println!("{address}={value}");
            }
        }
        OutputFormat::Raw => {
            let bytes: Vec<u8> = out.values.iter().flat_map(|v| v.to_be_bytes()).collect();
            print_raw(&bytes);
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WriteOutput<'a> {
    pub target: &'a str,
    pub unit_id: u8,
    pub function: &'static str,
    pub start: u16,
    pub count: usize,
}

pub fn print_write(out: &WriteOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TARGET", "FUNCTION", "START", "COUNT"])
                .add_row(vec![
                    out.target.to_string(),
                    out.function.to_string(),
                    out.start.to_string(),
                    out.count.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "wrote {} register(s) at {} on {} ({})",
                out.count, out.start, out.target, out.function
            );
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    accepted: u64,
    requests: u64,
    exceptions: u64,
    malformed: u64,
}

pub fn print_stats(stats: &GatewayStats, format: OutputFormat) {
    let out = StatsOutput {
        accepted: stats.accepted,
        requests: stats.requests,
        exceptions: stats.exceptions,
        malformed: stats.malformed,
    };
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["ACCEPTED", "REQUESTS", "EXCEPTIONS", "MALFORMED"])
                .add_row(vec![
                    out.accepted.to_string(),
                    out.requests.to_string(),
                    out.exceptions.to_string(),
                    out.malformed.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "accepted={} requests={} exceptions={} malformed={}",
                out.accepted, out.requests, out.exceptions, out.malformed
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn register_rows(start: u16, values: &[u16]) -> impl Iterator<Item = (u32, u16)> + '_ {
    values
        .iter()
        .enumerate()
        .map(move |(offset, value)| (start as u32 + offset as u32, *value))
}
