pub mod broker_trait;
pub mod error;
pub mod inmemory;
pub mod lapin_broker;
pub mod queue;

pub use broker_trait::{consumer_tag, Broker, Delivery};
pub use error::BrokerError;
pub use lapin_broker::LapinBroker;
pub use queue::QueueName;
