//! HTTP server exposing `/metrics` for Prometheus scraping.

use actix_web::middleware::{Compress, DefaultHeaders, NormalizePath};
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
	repositories::{NetworkRepository, NetworkService},
	utils::metrics::{gather_metrics, update_indexing_metrics, update_system_metrics},
};

pub type NetworkServiceArc = Arc<Mutex<NetworkService<NetworkRepository>>>;

pub type NetworkServiceData = web::Data<NetworkServiceArc>;

async fn metrics_handler(network_service: NetworkServiceData) -> impl Responder {
	update_system_metrics();
	{
		let networks: Vec<_> = network_service
			.lock()
			.await
			.get_all()
			.into_values()
			.collect();
		update_indexing_metrics(&networks);
	}

	match gather_metrics() {
		Ok(buffer) => HttpResponse::Ok()
			.content_type("text/plain; version=0.0.4; charset=utf-8")
			.body(buffer),
		Err(e) => {
			error!("Error gathering metrics: {}", e);
			HttpResponse::InternalServerError().finish()
		}
	}
}

/// Binds on all interfaces when running in a container, keeping the port
fn resolve_bind_address(bind_address: &str, in_docker: bool) -> String {
	if !in_docker {
		return bind_address.to_string();
	}
	match bind_address.split(':').nth(1) {
		Some(port) => format!("0.0.0.0:{}", port),
		None => "0.0.0.0:8081".to_string(),
	}
}

pub fn create_metrics_server(
	bind_address: String,
	network_service: NetworkServiceArc,
) -> std::io::Result<actix_web::dev::Server> {
	let in_docker = std::env::var("IN_DOCKER").unwrap_or_default() == "true";
	let actual_bind_address = resolve_bind_address(&bind_address, in_docker);

	info!(
		"Starting metrics server on {} (actual bind: {})",
		bind_address, actual_bind_address
	);

	Ok(HttpServer::new(move || {
		App::new()
			.wrap(Compress::default())
			.wrap(NormalizePath::trim())
			.wrap(DefaultHeaders::new())
			.app_data(web::Data::new(network_service.clone()))
			.route("/metrics", web::get().to(metrics_handler))
	})
	.workers(2)
	.bind(actual_bind_address)?
	.shutdown_timeout(5)
	.run())
}
