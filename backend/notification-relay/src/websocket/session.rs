use super::dispatch::Dispatcher;
use super::messages::ServerEvent;
use crate::metrics;
use crate::registry::ConnectionId;
use crate::state::RelayState;
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use std::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

/// One socket connection.
///
/// Owns the handle for its whole life: `connect` and hub attachment on
/// start, `on_disconnect` and hub detachment on stop. Outbound frames from
/// the router arrive on the hub stream and are written in arrival order.
pub struct WsSession {
    id: ConnectionId,
    state: RelayState,
    hb: Instant,
}

impl WsSession {
    pub fn new(state: RelayState) -> Self {
        Self {
            id: ConnectionId::new(),
            state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let interval = self.state.config.websocket.heartbeat_interval();
        let timeout = self.state.config.websocket.client_timeout();

        ctx.run_interval(interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                warn!(connection_id = %act.id, "Socket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn dispatcher(&self) -> &Dispatcher {
        &self.state.dispatcher
    }

    fn write(&self, event: &ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match event.to_frame() {
            Ok(frame) => ctx.text(frame),
            Err(e) => error!(connection_id = %self.id, event = event.name(), error = %e, "Failed to encode frame"),
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        let outbound = self.state.hub.attach(self.id);
        ctx.add_stream(UnboundedReceiverStream::new(outbound));
        self.state.registry.connect(self.id);
        metrics::connection_opened();

        info!(connection_id = %self.id, "Client connected");
        self.write(&ServerEvent::welcome(self.id), ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let released = self.state.registry.on_disconnect(self.id);
        self.state.hub.detach(self.id);
        metrics::connection_closed();

        let user_id = released.and_then(|c| c.user_id);
        info!(connection_id = %self.id, user_id = ?user_id, "Client disconnected");
    }
}

// Frames routed to this connection by the relay
impl StreamHandler<String> for WsSession {
    fn handle(&mut self, frame: String, ctx: &mut Self::Context) {
        ctx.text(frame);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        debug!(connection_id = %self.id, "Outbound stream closed");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "Socket protocol error");
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(msg) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            ws::Message::Pong(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Text(text) => {
                self.hb = Instant::now();
                let ack = self.dispatcher().dispatch(&self.state, self.id, &text);
                self.write(&ack, ctx);
            }
            ws::Message::Binary(_) => {
                self.write(
                    &ServerEvent::error("UNSUPPORTED_FRAME", "binary frames are not supported"),
                    ctx,
                );
            }
            ws::Message::Close(reason) => {
                debug!(connection_id = %self.id, reason = ?reason, "Close frame received");
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) => {
                ctx.stop();
            }
            ws::Message::Nop => {}
        }
    }
}
