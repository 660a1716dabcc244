//! Booking schema listing

use anyhow::Result;
use risk_core::{BookingField, FieldSpec};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Required")]
    required: &'static str,
}

fn domain(spec: FieldSpec) -> String {
    match spec {
        FieldSpec::Categorical(labels) => labels.join(" | "),
        FieldSpec::Flag => "0 | 1".to_string(),
        FieldSpec::Integer { min, max } => format!("{}..={}", min, max),
        FieldSpec::Real { min, max } => format!("{}..={}", min, max),
    }
}

fn rows() -> Vec<FieldRow> {
    BookingField::ALL
        .iter()
        .map(|field| FieldRow {
            field: field.name(),
            kind: field.spec().type_name(),
            domain: domain(field.spec()),
            required: if field.is_derivable() {
                "derived if absent"
            } else {
                "yes"
            },
        })
        .collect()
}

pub fn show_schema(format: OutputFormat) -> Result<()> {
    print_table(&rows(), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_cover_every_field() {
        let rows = rows();
        assert_eq!(rows.len(), BookingField::ALL.len());
        assert_eq!(rows[0].field, "hotel");
        assert_eq!(rows[0].domain, "City Hotel | Resort Hotel");
        let lead_time = rows.iter().find(|r| r.field == "lead_time").unwrap();
        assert_eq!(lead_time.domain, "0..=365");
        let derived = rows.iter().filter(|r| r.required != "yes").count();
        assert_eq!(derived, 2);
    }
}
