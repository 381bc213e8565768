//! Same-origin tab replication over the browser `BroadcastChannel` API.

use super::{ReplicationChannel, ReplicationError, Result};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{BroadcastChannel, MessageEvent};

/// Replication channel named after the session; messages never loop back to the sender.
pub struct BroadcastChannelTransport {
    session: String,
    channel: BroadcastChannel,
    inbox: Rc<RefCell<Vec<String>>>,
    // Keep the closure alive for as long as the channel is
    _on_message: Closure<dyn Fn(MessageEvent)>,
}

impl BroadcastChannelTransport {
    pub fn open(session: &str) -> Result<Self> {
        let channel = BroadcastChannel::new(session)
            .map_err(|e| ReplicationError::Transport(format!("{e:?}")))?;
        let inbox = Rc::new(RefCell::new(Vec::new()));

        let inbox_msg = inbox.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            match e.data().dyn_into::<js_sys::JsString>() {
                Ok(txt) => inbox_msg.borrow_mut().push(String::from(txt)),
                Err(_) => log::warn!("Ignoring non-string broadcast message"),
            }
        }) as Box<dyn Fn(MessageEvent)>);
        channel.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        log::info!("Opened broadcast channel {session}");
        Ok(Self {
            session: session.to_string(),
            channel,
            inbox,
            _on_message: on_message,
        })
    }
}

impl ReplicationChannel for BroadcastChannelTransport {
    fn session(&self) -> &str {
        &self.session
    }

    fn publish(&mut self, payload: String) -> Result<()> {
        self.channel
            .post_message(&JsValue::from_str(&payload))
            .map_err(|e| ReplicationError::Transport(format!("{e:?}")))
    }

    fn poll(&mut self) -> Result<Vec<String>> {
        Ok(std::mem::take(&mut *self.inbox.borrow_mut()))
    }
}

impl Drop for BroadcastChannelTransport {
    fn drop(&mut self) {
        self.channel.set_onmessage(None);
        self.channel.close();
    }
}
