use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Clients keyed by network slug
#[derive(Default)]
pub struct ClientStorage<T> {
	pub clients: Arc<RwLock<HashMap<String, Arc<T>>>>,
}

impl<T> ClientStorage<T> {
	pub fn new() -> Self {
		Self {
			clients: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}
