//! Kubernetes resource-quantity parsing: CPU millicores and human-sized
//! memory strings, normalized to the CPU-core / MB units
//! `ClustermanResources` uses everywhere else.

use crate::error::ConnectorError;

/// Parse a Kubernetes CPU quantity (`"2"`, `"500m"`) into whole cores.
pub fn parse_cpu_quantity(raw: &str) -> Result<f64, ConnectorError> {
    if let Some(milli) = raw.strip_suffix('m') {
        milli
            .parse::<f64>()
            .map(|v| v / 1000.0)
            .map_err(|e| ConnectorError::ResourceParse { raw: raw.to_string(), reason: e.to_string() })
    } else {
        raw.parse::<f64>()
            .map_err(|e| ConnectorError::ResourceParse { raw: raw.to_string(), reason: e.to_string() })
    }
}

/// Parse a Kubernetes memory quantity (`"512Mi"`, `"2Gi"`, `"128974848"`,
/// or the defensive `"128974848m"` milli-byte form some sources emit) into
/// MB. The milli-byte suffix is normalized (divided by 1000) before the
/// binary/decimal unit suffix is interpreted.
pub fn parse_memory_quantity(raw: &str) -> Result<f64, ConnectorError> {
    let (raw, milli) = match raw.strip_suffix('m') {
        Some(rest) if rest.chars().all(|c| c.is_ascii_digit()) => (rest, true),
        _ => (raw, false),
    };

    let (number_part, unit) = split_number_and_unit(raw);
    let bytes_per_unit: f64 = match unit {
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "K" | "k" => 1000.0,
        "M" => 1_000_000.0,
        "G" => 1_000_000_000.0,
        "" => 1.0,
        other => {
            return Err(ConnectorError::ResourceParse {
                raw: raw.to_string(),
                reason: format!("unrecognized memory unit suffix {other:?}"),
            })
        }
    };

    let value: f64 = number_part
        .parse()
        .map_err(|e: std::num::ParseFloatError| ConnectorError::ResourceParse { raw: raw.to_string(), reason: e.to_string() })?;

    let bytes = if milli { value / 1000.0 } else { value } * bytes_per_unit;
    Ok(bytes / (1024.0 * 1024.0))
}

fn split_number_and_unit(raw: &str) -> (&str, &str) {
    let split_at = raw.find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-').unwrap_or(raw.len());
    raw.split_at(split_at)
}
