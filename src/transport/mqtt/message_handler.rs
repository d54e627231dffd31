//! Pure routing of MQTT event-loop events
//!
//! The bridge only publishes, so the interesting events are the ConnAck,
//! publish acknowledgments, and broker-initiated disconnects.

use super::connection::ConnectionState;
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::Event;

/// Pure routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                Packet::PubAck(ack) => EventRoute::PublishAcknowledged { packet_id: ack.pkid },
                Packet::Disconnect(_) => EventRoute::Disconnected,
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// State the connection moves to after a routed event, if it changes
    pub fn next_state(route: &EventRoute) -> Option<ConnectionState> {
        match route {
            EventRoute::ConnectionAcknowledged => Some(ConnectionState::Connected),
            EventRoute::Disconnected => Some(ConnectionState::Disconnected(
                "Broker disconnected".to_string(),
            )),
            EventRoute::PublishAcknowledged { .. }
            | EventRoute::InfrastructureEvent(_)
            | EventRoute::OutgoingEvent => None,
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Connection acknowledged - ready to publish
    ConnectionAcknowledged,
    /// QoS 1 publish acknowledged by the broker
    PublishAcknowledged { packet_id: u16 },
    /// MQTT broker disconnected
    Disconnected,
    /// Infrastructure event (ping, etc.)
    InfrastructureEvent(String),
    /// Outgoing event
    OutgoingEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::v5::mqttbytes::v5::{ConnAck, ConnectReturnCode, PubAck, PubAckReason};

    #[test]
    fn test_route_connack() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
            properties: None,
        }));
        let route = MessageHandler::route_mqtt_event(&event);
        assert_eq!(route, EventRoute::ConnectionAcknowledged);
        assert_eq!(
            MessageHandler::next_state(&route),
            Some(ConnectionState::Connected)
        );
    }

    #[test]
    fn test_route_puback() {
        let event = Event::Incoming(Packet::PubAck(PubAck {
            pkid: 7,
            reason: PubAckReason::Success,
            properties: None,
        }));
        let route = MessageHandler::route_mqtt_event(&event);
        assert_eq!(route, EventRoute::PublishAcknowledged { packet_id: 7 });
        assert_eq!(MessageHandler::next_state(&route), None);
    }

    #[test]
    fn test_disconnect_changes_state() {
        assert!(matches!(
            MessageHandler::next_state(&EventRoute::Disconnected),
            Some(ConnectionState::Disconnected(_))
        ));
    }
}
