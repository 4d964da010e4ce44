//! Prometheus metrics of the indexer.
//!
//! Everything is registered on the global [`REGISTRY`] and exposed by the
//! optional metrics server. Pipeline components record through the small
//! helper functions at the bottom of this module so that label sets stay
//! consistent.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use sysinfo::{Disks, System};

use crate::models::{ContractKind, EventStatus, Network};

lazy_static! {
	/// Global Prometheus registry.
	pub static ref REGISTRY: Registry = Registry::new();

	/// Current CPU usage as a percentage (0-100) across all cores.
	pub static ref CPU_USAGE: Gauge = {
		let gauge = Gauge::new("cpu_usage_percentage", "Current CPU usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	pub static ref MEMORY_USAGE_PERCENT: Gauge = {
		let gauge = Gauge::new("memory_usage_percentage", "Memory usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	pub static ref MEMORY_USAGE: Gauge = {
		let gauge = Gauge::new("memory_usage_bytes", "Memory usage in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	pub static ref TOTAL_MEMORY: Gauge = {
		let gauge = Gauge::new("total_memory_bytes", "Total memory in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	pub static ref AVAILABLE_MEMORY: Gauge = {
		let gauge = Gauge::new("available_memory_bytes", "Available memory in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Used space summed over every mounted filesystem.
	pub static ref DISK_USAGE: Gauge = {
		let gauge = Gauge::new("disk_usage_bytes", "Used disk space in bytes").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	pub static ref DISK_USAGE_PERCENT: Gauge = {
		let gauge = Gauge::new("disk_usage_percentage", "Disk usage percentage").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Networks configured for indexing.
	pub static ref NETWORKS_INDEXED: Gauge = {
		let gauge = Gauge::new("indexer_networks_indexed", "Number of networks being indexed").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Events processed by the listener, by outcome.
	///
	/// `status` is SUCCESS or FAILURE, or SKIPPED for logs that were already recorded.
	pub static ref EVENTS_APPLIED: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("indexer_events_applied_total", "Number of events processed by the listener"),
			&["network", "kind", "status"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	/// Checkpoint of the events loader.
	pub static ref LAST_LOADED_BLOCK: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("indexer_last_loaded_block", "Highest block fully loaded by the events loader"),
			&["network"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Size of the registration graph.
	pub static ref REGISTERED_CONTRACTS: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("indexer_registered_contracts", "Number of contracts in the registration graph"),
			&["network", "kind"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	pub static ref REORGS_DETECTED: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("indexer_reorgs_detected_total", "Number of chain reorganizations detected"),
			&["network"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};
}

/// Gather all metrics and encode them in the Prometheus text format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let encoder = TextEncoder::new();
	let metric_families = REGISTRY.gather();
	let mut buffer = Vec::new();
	encoder.encode(&metric_families, &mut buffer)?;
	Ok(buffer)
}

/// Refreshes CPU, memory and disk gauges.
pub fn update_system_metrics() {
	let mut sys = System::new_all();
	sys.refresh_all();

	CPU_USAGE.set(sys.global_cpu_usage() as f64);

	let total_memory = sys.total_memory();
	let memory_usage = sys.used_memory();
	TOTAL_MEMORY.set(total_memory as f64);
	AVAILABLE_MEMORY.set(sys.available_memory() as f64);
	MEMORY_USAGE.set(memory_usage as f64);
	MEMORY_USAGE_PERCENT.set(percentage(memory_usage, total_memory));

	let disks = Disks::new_with_refreshed_list();
	let (total_disk_space, total_disk_available) = disks
		.list()
		.iter()
		.fold((0u64, 0u64), |(total, available), disk| {
			(total + disk.total_space(), available + disk.available_space())
		});
	let used_disk_space = total_disk_space.saturating_sub(total_disk_available);
	DISK_USAGE.set(used_disk_space as f64);
	DISK_USAGE_PERCENT.set(percentage(used_disk_space, total_disk_space));
}

fn percentage(part: u64, total: u64) -> f64 {
	if total > 0 {
		(part as f64 / total as f64) * 100.0
	} else {
		0.0
	}
}

/// Refreshes the gauges derived from configuration.
pub fn update_indexing_metrics(networks: &[Network]) {
	NETWORKS_INDEXED.set(networks.len() as f64);
}

pub fn record_event(network: &str, kind: ContractKind, status: EventStatus) {
	EVENTS_APPLIED
		.with_label_values(&[network, kind.as_str(), &status.to_string()])
		.inc();
}

pub fn record_skipped_event(network: &str, kind: ContractKind) {
	EVENTS_APPLIED
		.with_label_values(&[network, kind.as_str(), "SKIPPED"])
		.inc();
}

pub fn record_last_loaded_block(network: &str, block: u64) {
	LAST_LOADED_BLOCK.with_label_values(&[network]).set(block as f64);
}

pub fn record_registered_contracts(network: &str, kind: ContractKind, count: usize) {
	REGISTERED_CONTRACTS
		.with_label_values(&[network, kind.as_str()])
		.set(count as f64);
}

pub fn record_reorg(network: &str) {
	REORGS_DETECTED.with_label_values(&[network]).inc();
}
