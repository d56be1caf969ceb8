use crate::classic::{ClassicClient, Payload, PollError, RegisterReader};
use log::{debug, info, warn};
use std::future::Future;
use tokio::{
    select,
    sync::mpsc,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum Message {
    Measurement(String, Payload),
}

pub fn classic_event_loop<R>(
    controller: String,
    polling_delay: Duration,
    mut client: ClassicClient<R>,
    tx: mpsc::Sender<Message>,
    cancel: CancellationToken,
) -> impl Future<Output = ()> + Send
where
    R: RegisterReader + Send + 'static,
{
    async move {
        let mut poll_timer = time::interval(polling_delay);
        poll_timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            let result = select! {
                _ = cancel.cancelled() => break,
                result = async {
                    poll_timer.tick().await;
                    client.poll().await
                } => result,
            };

            match result {
                Ok(payload) => {
                    debug!("Read {} values from {controller}", payload.len());

                    if tx.send(Message::Measurement(controller.clone(), payload)).await.is_err() {
                        break;
                    }
                },
                Err(PollError::Transport(e)) => warn!("Unable to read from {controller}: {e}"),
                Err(PollError::Decode(e)) => warn!("Unable to decode registers of {controller}: {e}"),
            }
        }

        info!("Shutting down poll timer for {controller}");
    }
}
