use std::io::IsTerminal;

use carecard::ndef::{FieldKey, Fields, NdefRecord, StructuredTagData};
use carecard::session::{SyncOutcome, SyncReport, TapReport, WriteOutcome};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn field_rows<K: FieldKey>(table: &mut Table, section: &str, fields: &Fields<K>) {
    for (key, value) in fields.iter() {
        table.add_row(vec![section, key.label(), value]);
    }
}

fn pretty_fields<K: FieldKey>(section: &str, fields: &Fields<K>) {
    if fields.is_empty() {
        return;
    }
    println!("{section}:");
    for (key, value) in fields.iter() {
        println!("  {}: {value}", key.label());
    }
}

pub fn print_tag_data(data: &StructuredTagData, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SECTION", "FIELD", "VALUE"]);
            if let Some(url) = &data.vcard_url {
                table.add_row(vec!["URL", "vCard", url.as_str()]);
            }
            field_rows(&mut table, "Personal", &data.personal_info);
            field_rows(&mut table, "Emergency", &data.emergency_contact);
            for (index, policy) in data.insurance_policies.iter().enumerate() {
                field_rows(&mut table, &format!("Policy {}", index + 1), policy);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if data.is_empty() {
                println!("(tag is empty)");
                return;
            }
            if let Some(url) = &data.vcard_url {
                println!("vCard URL: {url}");
            }
            pretty_fields("Personal", &data.personal_info);
            pretty_fields("Emergency contact", &data.emergency_contact);
            for (index, policy) in data.insurance_policies.iter().enumerate() {
                pretty_fields(&format!("Policy {}", index + 1), policy);
            }
        }
    }
}

pub fn print_write_outcome(outcome: &WriteOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Table => {
            let mut table = new_table(vec!["STATUS", "RECORDS", "BYTES", "MESSAGE"]);
            table.add_row(vec![
                status_label(outcome),
                outcome.records_written.to_string(),
                outcome.bytes_written.to_string(),
                outcome.message.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}: {}", status_label(outcome), outcome.message),
    }
}

fn status_label(outcome: &WriteOutcome) -> String {
    serde_json::to_value(outcome.status)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn policy_number(policy: &carecard::ndef::Policy) -> &str {
    policy.value(carecard::ndef::PolicyField::PolicyNumber)
}

pub fn print_sync_report(report: &SyncReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["POLICY", "CHANGE", "TAG", "REMOTE"]);
            for policy in &report.tag_only {
                table.add_row(vec![policy_number(policy), "tag only", "present", "-"]);
            }
            for policy in &report.remote_only {
                table.add_row(vec![policy_number(policy), "remote only", "-", "present"]);
            }
            for diff in &report.field_differences {
                table.add_row(vec![
                    diff.policy_number.as_str(),
                    diff.field.label(),
                    diff.tag_value.as_deref().unwrap_or("-"),
                    diff.remote_value.as_deref().unwrap_or("-"),
                ]);
            }
            println!("{table}");
            println!("needs sync: {}", report.needs_sync);
        }
        OutputFormat::Pretty => {
            if !report.needs_sync {
                println!("in sync");
                return;
            }
            for policy in &report.tag_only {
                println!("- {} (tag only)", policy_number(policy));
            }
            for policy in &report.remote_only {
                println!("+ {} (remote only)", policy_number(policy));
            }
            for diff in &report.field_differences {
                println!(
                    "~ {} {}: {:?} -> {:?}",
                    diff.policy_number,
                    diff.field.label(),
                    diff.tag_value.as_deref().unwrap_or(""),
                    diff.remote_value.as_deref().unwrap_or(""),
                );
            }
        }
    }
}

/// The write result, then the policies still waiting to be uploaded.
pub fn print_sync_outcome(outcome: &SyncOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Table => {
            print_write_outcome(&outcome.write, format);
            if !outcome.tag_only.is_empty() {
                let mut table = new_table(vec!["POLICY", "INSURER", "STATUS"]);
                for policy in &outcome.tag_only {
                    table.add_row(vec![
                        policy_number(policy),
                        policy.value(carecard::ndef::PolicyField::Insurer),
                        policy.value(carecard::ndef::PolicyField::Status),
                    ]);
                }
                println!("tag only (not on remote):");
                println!("{table}");
            }
        }
        OutputFormat::Pretty => {
            print_write_outcome(&outcome.write, format);
            for policy in &outcome.tag_only {
                println!("- {} (tag only, upload pending)", policy_number(policy));
            }
        }
    }
}

/// One line per tap, since `watch` streams.
pub fn print_tap_report(report: &TapReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table | OutputFormat::Pretty => {
            let status = serde_json::to_value(report.status)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_default();
            println!(
                "[{}] {} uid={} {}",
                report.mode,
                status,
                report.uid.as_deref().unwrap_or("-"),
                report.message.as_deref().unwrap_or(""),
            );
            if let Some(data) = &report.data {
                print_tag_data(data, OutputFormat::Pretty);
            }
        }
    }
}

#[derive(Serialize)]
struct RecordOutput {
    tnf: u8,
    #[serde(rename = "type")]
    record_type: String,
    payload_len: usize,
    payload: String,
}

impl From<&NdefRecord> for RecordOutput {
    fn from(record: &NdefRecord) -> Self {
        Self {
            tnf: record.tnf.as_u8(),
            record_type: record.type_str(),
            payload_len: record.payload.len(),
            payload: hex::encode(&record.payload),
        }
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    records: Vec<RecordOutput>,
    data: &'a StructuredTagData,
}

pub fn print_decoded(records: &[NdefRecord], data: &StructuredTagData, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DecodedOutput {
            records: records.iter().map(RecordOutput::from).collect(),
            data,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = new_table(vec!["#", "TNF", "TYPE", "PAYLOAD"]);
            for (index, record) in records.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    format!("{:?}", record.tnf),
                    record.type_str(),
                    format!("{} bytes", record.payload.len()),
                ]);
            }
            println!("{table}");
            print_tag_data(data, format);
        }
    }
}

/// What `encode` produced.
#[derive(Debug, Serialize)]
pub struct EncodedOutput {
    pub records: usize,
    pub message_len: usize,
    pub message: String,
    /// Absent when the message is too long for a one-byte TLV length.
    pub tlv: Option<String>,
}

pub fn print_encoded(encoded: &EncodedOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(encoded),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FORM", "BYTES", "HEX"]);
            table.add_row(vec![
                "message".to_string(),
                encoded.message_len.to_string(),
                encoded.message.clone(),
            ]);
            if let Some(tlv) = &encoded.tlv {
                table.add_row(vec!["tlv".to_string(), (tlv.len() / 2).to_string(), tlv.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", encoded.message);
            if let Some(tlv) = &encoded.tlv {
                println!("{tlv}");
            }
        }
    }
}

pub fn print_readers(readers: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(readers),
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "READER"]);
            for (index, name) in readers.iter().enumerate() {
                table.add_row(vec![index.to_string(), name.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for name in readers {
                println!("{name}");
            }
        }
    }
}
