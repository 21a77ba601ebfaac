use std::sync::Arc;

use arcstr::ArcStr;
use bytes::Bytes;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::BridgeSettings;
use super::error::CommandError;
use crate::config::ConfigurationProcessor;
use crate::gateway::BusGateway;
use crate::line::{LineDriver, WatchEvent};
use crate::registry::SubscriptionRegistry;
use crate::router::MessageRouter;
use crate::topic::TopicScheme;

#[derive(Debug)]
enum Command {
	/// Message delivered by the transport
	Inbound { topic: String, payload: Bytes },
	/// Session lost: subscribe to everything again
	Resubscribe(oneshot::Sender<usize>),
	/// Wait for queued line operations, answer with the binding count
	Settle(oneshot::Sender<usize>),
}

/// Owns the registry and serializes every change to it.
pub struct BridgeActor {
	registry: SubscriptionRegistry,
	processor: ConfigurationProcessor,
	router: MessageRouter,
	gateway: Arc<dyn BusGateway>,
	config_topic: ArcStr,
	command_rx: Receiver<Command>,
	watch_rx: Receiver<WatchEvent>,
	shutdown_rx: oneshot::Receiver<()>,
}

impl BridgeActor {
	/// Start the actor. It subscribes to the configuration topic before
	/// handling any message.
	pub fn spawn(
		gateway: Arc<dyn BusGateway>,
		driver: Arc<dyn LineDriver>,
		scheme: TopicScheme,
		settings: BridgeSettings,
	) -> (BridgeController, BridgeHandler) {
		let (command_tx, command_rx) =
			channel(settings.command_channel_capacity);
		let (watch_tx, watch_rx) = channel(settings.watch_channel_capacity);
		let (shutdown_tx, shutdown_rx) = oneshot::channel();

		let actor = Self {
			registry: SubscriptionRegistry::new(
				Arc::clone(&gateway),
				driver,
				watch_tx,
			),
			processor: ConfigurationProcessor::new(
				Arc::clone(&gateway),
				scheme.clone(),
			),
			router: MessageRouter::new(Arc::clone(&gateway)),
			gateway,
			config_topic: scheme.config_topic(),
			command_rx,
			watch_rx,
			shutdown_rx,
		};
		let join_handler = tokio::spawn(async move { actor.run().await });

		let controller = BridgeController {
			shutdown_tx,
			join_handler,
		};
		let handler = BridgeHandler { command_tx };
		(controller, handler)
	}

	async fn run(mut self) {
		self.subscribe_config_topic().await;
		loop {
			tokio::select! {
				_ = &mut self.shutdown_rx => {
					info!("BridgeActor: Shutdown signal received");
					break;
				}
				Some(event) = self.watch_rx.recv() => {
					self.router.on_watch_event(&mut self.registry, event).await;
				}
				cmd = self.command_rx.recv() => {
					let Some(cmd) = cmd else {
						info!("BridgeActor: Command channel closed, exiting");
						break;
					};
					self.handle_command(cmd).await;
				}
			}
		}
		info!("BridgeActor: Exiting run loop");
		self.cleanup().await;
	}

	async fn subscribe_config_topic(&self) -> bool {
		match self.gateway.subscribe(&self.config_topic).await {
			| Ok(()) => {
				info!(topic = %self.config_topic, "Waiting for gpio configuration");
				true
			}
			| Err(err) => {
				error!(
					topic = %self.config_topic,
					error = %err,
					"Failed to subscribe to configuration topic"
				);
				false
			}
		}
	}

	async fn handle_command(&mut self, cmd: Command) {
		match cmd {
			| Command::Inbound { topic, payload } => {
				self.handle_inbound(&topic, &payload).await;
			}
			| Command::Resubscribe(response_tx) => {
				let config = usize::from(self.subscribe_config_topic().await);
				let count = config + self.registry.resubscribe_all().await;
				if response_tx.send(count).is_err() {
					debug!("BridgeActor: Resubscribe response not delivered");
				}
			}
			| Command::Settle(response_tx) => {
				self.registry.settle().await;
				if response_tx.send(self.registry.count()).is_err() {
					debug!("BridgeActor: Settle response not delivered");
				}
			}
		}
	}

	async fn handle_inbound(&mut self, topic: &str, payload: &[u8]) {
		if topic == self.config_topic.as_str() {
			match self
				.processor
				.handle_payload(&mut self.registry, payload)
				.await
			{
				| Ok(count) => debug!(pins = count, "Configuration applied"),
				| Err(err) => {
					warn!(topic = %topic, error = %err, "Rejected gpio configuration");
				}
			}
			return;
		}
		self.router.route(&mut self.registry, topic, payload);
	}

	/// Release every line and drop the configuration subscription.
	async fn cleanup(&mut self) {
		self.registry.clear().await;
		if let Err(err) = self.gateway.unsubscribe(&self.config_topic).await {
			error!(
				topic = %self.config_topic,
				error = %err,
				"Failed to unsubscribe from configuration topic"
			);
		}
	}
}

/// Stops the bridge actor.
pub struct BridgeController {
	shutdown_tx: oneshot::Sender<()>,
	join_handler: JoinHandle<()>,
}

impl BridgeController {
	/// Signal shutdown and wait until every line has been released.
	pub async fn shutdown(self) -> Result<(), JoinError> {
		let _ = self.shutdown_tx.send(()).inspect_err(|_| {
			warn!("BridgeController: Shutdown signal already sent");
		});
		self.join_handler.await.inspect_err(|e| {
			warn!(error = ?e, "BridgeController: Actor run failed");
		})
	}
}

/// Feeds the bridge actor. Cheap to clone.
#[derive(Clone)]
pub struct BridgeHandler {
	command_tx: Sender<Command>,
}

impl BridgeHandler {
	/// Queue a message received from the bus. Waits while the queue is full,
	/// so delivery order is preserved.
	pub async fn dispatch_incoming_message(
		&self,
		topic: String,
		payload: Bytes,
	) -> Result<(), CommandError> {
		self.command_tx
			.send(Command::Inbound { topic, payload })
			.await
			.map_err(|_| CommandError::ChannelClosed)
	}

	/// Subscribe again to the configuration topic and every bound topic.
	/// Returns the number of topics subscribed.
	pub async fn resubscribe_all(&self) -> Result<usize, CommandError> {
		let (tx, rx) = oneshot::channel();
		self.command_tx
			.send(Command::Resubscribe(tx))
			.await
			.map_err(|_| CommandError::ChannelClosed)?;
		rx.await.map_err(|_| CommandError::ResponseLost)
	}

	/// Wait until every message queued so far has been handled and its line
	/// operations have completed. Returns the number of bindings.
	pub async fn settle(&self) -> Result<usize, CommandError> {
		let (tx, rx) = oneshot::channel();
		self.command_tx
			.send(Command::Settle(tx))
			.await
			.map_err(|_| CommandError::ChannelClosed)?;
		rx.await.map_err(|_| CommandError::ResponseLost)
	}
}
