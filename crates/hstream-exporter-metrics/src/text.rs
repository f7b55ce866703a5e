//! Prometheus text exposition format, version 0.0.4.

use std::fmt::{self, Write};

use crate::types::{CollectedMetric, MetricValue};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Writes one family: `# HELP`, `# TYPE`, then every sample line.
pub(crate) fn encode_family<W: Write>(out: &mut W, family: &CollectedMetric) -> fmt::Result {
    let name = family.descriptor.name.as_str();
    writeln!(out, "# HELP {name} {}", escape_help(&family.descriptor.help))?;
    writeln!(
        out,
        "# TYPE {name} {}",
        family.descriptor.metric_type.as_prometheus_type()
    )?;

    for sample in &family.samples {
        let labels = sample.labels.as_slice();
        match &sample.value {
            MetricValue::Counter(value) | MetricValue::Gauge(value) => {
                write_line(out, name, "", labels, None, *value)?;
            }
            MetricValue::Histogram {
                buckets,
                count,
                sum,
            } => {
                let mut cumulative = 0_u64;
                for (bound, hits) in buckets {
                    cumulative = cumulative.saturating_add(*hits);
                    let le = ("le", format_value(*bound));
                    write_line(out, name, "_bucket", labels, Some(le), cumulative as f64)?;
                }
                write_line(out, name, "_sum", labels, None, *sum)?;
                write_line(out, name, "_count", labels, None, *count as f64)?;
            }
            MetricValue::Summary {
                quantiles,
                count,
                sum,
            } => {
                for (quantile, value) in quantiles {
                    let q = ("quantile", format_value(*quantile));
                    write_line(out, name, "", labels, Some(q), *value)?;
                }
                write_line(out, name, "_sum", labels, None, *sum)?;
                write_line(out, name, "_count", labels, None, *count as f64)?;
            }
        }
    }

    Ok(())
}

fn write_line<W: Write>(
    out: &mut W,
    name: &str,
    suffix: &str,
    labels: &[(String, String)],
    extra: Option<(&str, String)>,
    value: f64,
) -> fmt::Result {
    write!(out, "{name}{suffix}")?;

    let extra = extra.as_ref().map(|(key, value)| (*key, value.as_str()));
    let mut pairs = labels
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .chain(extra)
        .peekable();

    if pairs.peek().is_some() {
        out.write_char('{')?;
        for (index, (key, value)) in pairs.enumerate() {
            if index > 0 {
                out.write_char(',')?;
            }
            write!(out, "{key}=\"{}\"", escape_label_value(value))?;
        }
        out.write_char('}')?;
    }

    writeln!(out, " {}", format_value(value))
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
