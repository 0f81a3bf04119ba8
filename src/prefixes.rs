//! CSV subnet validation.
use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Read},
    net::{IpAddr, Ipv4Addr},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result};
use cidr::{IpCidr, IpInet};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use thiserror::Error;

/// Characters dropped from a flattened CSV row before it is parsed.
const STRIPPED_CHARS: [char; 6] = [',', ' ', '[', ']', '\'', '"'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("empty prefix")]
    Empty,
    #[error("'{input}' is not a valid IP network: {reason}")]
    Invalid { input: String, reason: String },
    #[error("unreadable CSV row: {0}")]
    Unreadable(String),
}

impl PrefixError {
    fn invalid(input: &str, reason: impl fmt::Display) -> Self {
        PrefixError::Invalid {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A parsed subnet together with the text it was parsed from. Host bits in
/// the input are accepted and masked away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    input: String,
    network: IpCidr,
}

impl Subnet {
    pub fn parse(input: &str) -> Result<Self, PrefixError> {
        if input.is_empty() {
            return Err(PrefixError::Empty);
        }
        let inet = match input.split_once('/') {
            // Dotted suffixes are IPv4 netmasks or hostmasks.
            Some((addr, mask)) if mask.contains('.') => parse_masked(input, addr, mask)?,
            Some(_) => IpInet::from_str(input).map_err(|err| PrefixError::invalid(input, err))?,
            None => {
                // A bare address is a single-host network.
                let addr =
                    IpAddr::from_str(input).map_err(|err| PrefixError::invalid(input, err))?;
                let len = match addr {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                IpInet::new(addr, len).map_err(|err| PrefixError::invalid(input, err))?
            }
        };
        Ok(Subnet {
            input: input.to_string(),
            network: inet.network(),
        })
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// `network/length`, always with an explicit length.
    pub fn canonical(&self) -> String {
        format!(
            "{}/{}",
            self.network.first_address(),
            self.network.network_length()
        )
    }

    /// False when the input had host bits set or was not written in
    /// canonical form.
    pub fn matches_input(&self) -> bool {
        self.canonical() == self.input
    }
}

fn parse_masked(input: &str, addr: &str, mask: &str) -> Result<IpInet, PrefixError> {
    let addr = Ipv4Addr::from_str(addr).map_err(|err| PrefixError::invalid(input, err))?;
    let mask = Ipv4Addr::from_str(mask).map_err(|err| PrefixError::invalid(input, err))?;
    let len = mask_prefix_len(mask)
        .ok_or_else(|| PrefixError::invalid(input, format!("{mask} is not a valid netmask")))?;
    IpInet::new(IpAddr::V4(addr), len).map_err(|err| PrefixError::invalid(input, err))
}

/// Prefix length for a contiguous netmask (`255.255.0.0`) or hostmask
/// (`0.0.255.255`). Netmask wins when both readings fit.
fn mask_prefix_len(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    if bits.leading_ones() + bits.trailing_zeros() == 32 {
        return Some(bits.leading_ones() as u8);
    }
    let inverted = !bits;
    if inverted.leading_ones() + inverted.trailing_zeros() == 32 {
        return Some(inverted.leading_ones() as u8);
    }
    None
}

/// A row that could not be turned into a subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub row: usize,
    pub raw: String,
    pub error: PrefixError,
}

/// Result of validating a CSV file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvScan {
    pub prefixes: Vec<String>,
    pub rejected: Vec<RejectedRow>,
}

/// Join the fields of a record and drop separators, brackets, quotes and
/// spaces, so a multi-column row collapses into a single token.
pub fn flatten_record(record: &StringRecord) -> String {
    record
        .iter()
        .collect::<String>()
        .trim()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Row text as a list of quoted fields, e.g. `['10.0.0.0/8']`.
fn display_record(record: &StringRecord) -> String {
    let fields: Vec<String> = record
        .iter()
        .map(|field| {
            if field.contains('\'') && !field.contains('"') {
                format!("\"{field}\"")
            } else {
                format!("'{}'", field.replace('\'', "\\'"))
            }
        })
        .collect();
    format!("[{}]", fields.join(", "))
}

/// Validate every line of `reader` as one CSV row. Bad rows, blank lines
/// included, are reported and skipped; no row aborts the scan.
pub fn scan_csv<R: Read>(reader: R) -> CsvScan {
    let mut scan = CsvScan::default();

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let row = index + 1;
        let parsed = match line {
            Ok(line) => parse_line(&line),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => Err(err.into()),
            Err(err) => {
                // Anything but bad UTF-8 means the file cannot be read further.
                warn!("Stopped reading CSV at row {row}: {err}");
                break;
            }
        };
        match parsed {
            Ok(record) => check_record(&mut scan, row, &record),
            Err(err) => {
                println!("ROW {row} : FAILURE TO ADD");
                warn!("Could not read CSV row {row}: {err}");
                scan.rejected.push(RejectedRow {
                    row,
                    raw: String::new(),
                    error: PrefixError::Unreadable(err.to_string()),
                });
            }
        }
    }

    info!(
        "Validated {} prefix(es), rejected {} row(s)",
        scan.prefixes.len(),
        scan.rejected.len()
    );
    scan
}

/// Parse one line as a CSV record; an empty line gives an empty record.
fn parse_line(line: &str) -> csv::Result<StringRecord> {
    let mut record = StringRecord::new();
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .read_record(&mut record)?;
    Ok(record)
}

fn check_record(scan: &mut CsvScan, row: usize, record: &StringRecord) {
    // Report against the row as written, parse the flattened token.
    let raw = display_record(record);
    let flat = flatten_record(record);
    match Subnet::parse(&flat) {
        Ok(subnet) => {
            if !subnet.matches_input() {
                println!(
                    "Warning, input subnet {} does not match network address {}",
                    subnet.input(),
                    subnet.canonical()
                );
            }
            println!("ROW {row} : {raw} Added SUCCESSFULLY");
            scan.prefixes.push(subnet.canonical());
        }
        Err(error) => {
            println!("ROW {row} : {raw} FAILURE TO ADD");
            println!("Error parsing prefix '{flat}' Ignoring...");
            println!();
            debug!("Row {row} rejected: {error}");
            scan.rejected.push(RejectedRow { row, raw, error });
        }
    }
}

/// Open `path` and validate its rows.
pub fn load_prefixes(path: &Path) -> Result<CsvScan> {
    let file =
        File::open(path).with_context(|| format!("failed to open CSV file {}", path.display()))?;
    println!("Opened File {} successfully", path.display());
    Ok(scan_csv(file))
}
