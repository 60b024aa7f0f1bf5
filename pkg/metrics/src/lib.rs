use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

pub mod lease;

pub use lease::{LeaseGcMetrics, LeaseGcRecorder};

/// A lightweight, thread-safe metrics registry that renders in Prometheus text exposition format.
///
/// Operations on a metric that was never registered, or with the wrong
/// number of label values, are silently ignored.
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, Counter>>,
    counter_vecs: RwLock<BTreeMap<String, CounterVec>>,
    histogram_vecs: RwLock<BTreeMap<String, HistogramVec>>,
}

/// Monotonically increasing counter.
pub struct Counter {
    value: AtomicU64,
    help: String,
}

/// Family of counters partitioned by label values.
pub struct CounterVec {
    help: String,
    label_names: Vec<String>,
    series: Mutex<BTreeMap<Vec<String>, u64>>,
}

/// Family of histograms partitioned by label values.
pub struct HistogramVec {
    help: String,
    label_names: Vec<String>,
    /// Upper bounds, ascending. `+Inf` is implicit.
    buckets: Vec<f64>,
    series: Mutex<BTreeMap<Vec<String>, HistogramSeries>>,
}

#[derive(Clone)]
struct HistogramSeries {
    /// Non-cumulative per-bucket counts; cumulated on render.
    bucket_counts: Vec<u64>,
    sum: f64,
    count: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            counter_vecs: RwLock::new(BTreeMap::new()),
            histogram_vecs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a counter. If it already exists, this is a no-op.
    pub fn register_counter(&self, name: &str, help: &str) {
        let mut counters = self.counters.write().unwrap();
        counters.entry(name.to_string()).or_insert_with(|| Counter {
            value: AtomicU64::new(0),
            help: help.to_string(),
        });
    }

    /// Register a labeled counter family. If it already exists, this is a no-op.
    pub fn register_counter_vec(&self, name: &str, help: &str, label_names: &[&str]) {
        let mut vecs = self.counter_vecs.write().unwrap();
        vecs.entry(name.to_string()).or_insert_with(|| CounterVec {
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            series: Mutex::new(BTreeMap::new()),
        });
    }

    /// Register a labeled histogram family. If it already exists, this is a no-op.
    pub fn register_histogram_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) {
        let mut buckets = buckets.to_vec();
        buckets.sort_by(|a, b| a.total_cmp(b));
        buckets.dedup();

        let mut vecs = self.histogram_vecs.write().unwrap();
        vecs.entry(name.to_string()).or_insert_with(|| HistogramVec {
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            buckets,
            series: Mutex::new(BTreeMap::new()),
        });
    }

    /// Increment a counter by 1.
    pub fn counter_inc(&self, name: &str) {
        let counters = self.counters.read().unwrap();
        if let Some(c) = counters.get(name) {
            c.value.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment the series of a labeled counter by 1.
    pub fn counter_vec_inc(&self, name: &str, label_values: &[&str]) {
        let vecs = self.counter_vecs.read().unwrap();
        if let Some(v) = vecs.get(name)
            && v.label_names.len() == label_values.len()
        {
            let key = label_values.iter().map(|s| s.to_string()).collect();
            *v.series.lock().unwrap().entry(key).or_insert(0) += 1;
        }
    }

    /// Record one observation in a labeled histogram.
    pub fn histogram_observe(&self, name: &str, label_values: &[&str], value: f64) {
        let vecs = self.histogram_vecs.read().unwrap();
        let Some(h) = vecs.get(name) else {
            return;
        };
        if h.label_names.len() != label_values.len() {
            return;
        }

        let key = label_values.iter().map(|s| s.to_string()).collect();
        let mut series = h.series.lock().unwrap();
        let entry = series.entry(key).or_insert_with(|| HistogramSeries {
            bucket_counts: vec![0; h.buckets.len()],
            sum: 0.0,
            count: 0,
        });
        if let Some(idx) = h.buckets.iter().position(|upper| value <= *upper) {
            entry.bucket_counts[idx] += 1;
        }
        entry.sum += value;
        entry.count += 1;
    }

    pub fn counter_value(&self, name: &str) -> Option<u64> {
        let counters = self.counters.read().unwrap();
        counters.get(name).map(|c| c.value.load(Ordering::Relaxed))
    }

    pub fn counter_vec_value(&self, name: &str, label_values: &[&str]) -> Option<u64> {
        let vecs = self.counter_vecs.read().unwrap();
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        vecs.get(name)?.series.lock().unwrap().get(&key).copied()
    }

    /// Number of observations recorded for one histogram series.
    pub fn histogram_count(&self, name: &str, label_values: &[&str]) -> Option<u64> {
        let vecs = self.histogram_vecs.read().unwrap();
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        vecs.get(name)?
            .series
            .lock()
            .unwrap()
            .get(&key)
            .map(|s| s.count)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut output = String::new();

        // Counters
        let counters = self.counters.read().unwrap();
        for (name, counter) in counters.iter() {
            let _ = writeln!(output, "# HELP {} {}", name, counter.help);
            let _ = writeln!(output, "# TYPE {} counter", name);
            let _ = writeln!(output, "{} {}", name, counter.value.load(Ordering::Relaxed));
        }

        // Labeled counters
        let counter_vecs = self.counter_vecs.read().unwrap();
        for (name, vec) in counter_vecs.iter() {
            let _ = writeln!(output, "# HELP {} {}", name, vec.help);
            let _ = writeln!(output, "# TYPE {} counter", name);
            for (values, count) in vec.series.lock().unwrap().iter() {
                let labels = format_labels(&vec.label_names, values, None);
                let _ = writeln!(output, "{}{} {}", name, labels, count);
            }
        }

        // Histograms
        let histogram_vecs = self.histogram_vecs.read().unwrap();
        for (name, vec) in histogram_vecs.iter() {
            let _ = writeln!(output, "# HELP {} {}", name, vec.help);
            let _ = writeln!(output, "# TYPE {} histogram", name);
            for (values, series) in vec.series.lock().unwrap().iter() {
                let mut cumulative = 0;
                for (upper, n) in vec.buckets.iter().zip(&series.bucket_counts) {
                    cumulative += n;
                    let le = upper.to_string();
                    let labels = format_labels(&vec.label_names, values, Some(&le));
                    let _ = writeln!(output, "{}_bucket{} {}", name, labels, cumulative);
                }
                let labels = format_labels(&vec.label_names, values, Some("+Inf"));
                let _ = writeln!(output, "{}_bucket{} {}", name, labels, series.count);

                let labels = format_labels(&vec.label_names, values, None);
                let _ = writeln!(output, "{}_sum{} {}", name, labels, series.sum);
                let _ = writeln!(output, "{}_count{} {}", name, labels, series.count);
            }
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_labels(names: &[String], values: &[String], le: Option<&str>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(n, v)| format!("{}=\"{}\"", n, escape_label_value(v)))
        .collect();
    if let Some(le) = le {
        pairs.push(format!("le=\"{}\"", le));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_render() {
        let registry = MetricsRegistry::new();
        registry.register_counter("culled_total", "Leases culled");
        registry.counter_inc("culled_total");
        registry.counter_inc("culled_total");
        registry.counter_inc("never_registered");

        assert_eq!(registry.counter_value("culled_total"), Some(2));
        assert_eq!(registry.counter_value("never_registered"), None);

        let out = registry.render();
        assert!(out.contains("# HELP culled_total Leases culled\n"));
        assert!(out.contains("# TYPE culled_total counter\n"));
        assert!(out.contains("culled_total 2\n"));
    }

    #[test]
    fn test_counter_vec_series() {
        let registry = MetricsRegistry::new();
        registry.register_counter_vec("calls_total", "Calls", &["code", "reason"]);
        registry.counter_vec_inc("calls_total", &["200", ""]);
        registry.counter_vec_inc("calls_total", &["200", ""]);
        registry.counter_vec_inc("calls_total", &["409", "Conflict"]);
        // Wrong arity is dropped.
        registry.counter_vec_inc("calls_total", &["500"]);

        assert_eq!(registry.counter_vec_value("calls_total", &["200", ""]), Some(2));
        assert_eq!(
            registry.counter_vec_value("calls_total", &["409", "Conflict"]),
            Some(1)
        );
        assert_eq!(registry.counter_vec_value("calls_total", &["500"]), None);

        let out = registry.render();
        assert!(out.contains("calls_total{code=\"200\",reason=\"\"} 2\n"));
        assert!(out.contains("calls_total{code=\"409\",reason=\"Conflict\"} 1\n"));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let registry = MetricsRegistry::new();
        registry.register_histogram_vec("latency_seconds", "Latency", &["code"], &[1.0, 0.1]);
        registry.histogram_observe("latency_seconds", &["200"], 0.0625);
        registry.histogram_observe("latency_seconds", &["200"], 0.5);
        registry.histogram_observe("latency_seconds", &["200"], 3.0);

        assert_eq!(registry.histogram_count("latency_seconds", &["200"]), Some(3));

        let out = registry.render();
        assert!(out.contains("# TYPE latency_seconds histogram\n"));
        assert!(out.contains("latency_seconds_bucket{code=\"200\",le=\"0.1\"} 1\n"));
        assert!(out.contains("latency_seconds_bucket{code=\"200\",le=\"1\"} 2\n"));
        assert!(out.contains("latency_seconds_bucket{code=\"200\",le=\"+Inf\"} 3\n"));
        assert!(out.contains("latency_seconds_sum{code=\"200\"} 3.5625\n"));
        assert!(out.contains("latency_seconds_count{code=\"200\"} 3\n"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let registry = MetricsRegistry::new();
        registry.register_counter_vec("errors_total", "Errors", &["reason"]);
        registry.counter_vec_inc("errors_total", &["say \"hi\"\n"]);
        assert!(registry
            .render()
            .contains("errors_total{reason=\"say \\\"hi\\\"\\n\"} 1\n"));
    }
}
