mod classic;
mod config;
mod eventloop;
#[cfg(feature = "mqtt")]
mod mqtt;
mod options;
mod output;

use anyhow::Result;
use classic::{ClassicClient, ModbusReader};
use log::{error, info};
use std::{collections::HashMap, io::Write};
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let options = options::Options::new();
    let config = config::Config::load(&options)?;

    info!(
        "{} polling {} controller(s) every {:?}",
        config.client_id,
        config.controllers.len(),
        config.poll_interval()
    );

    let output = output::Output::connect(&config).await?;

    let (tx, mut rx) = mpsc::channel(config.controllers.len());
    let cancel = CancellationToken::new();
    let mut controllers = HashMap::new();

    for controller in &config.controllers {
        info!(
            "Polling {} at {}:{} unit {}",
            controller.name, controller.host, controller.port, controller.unit_id
        );

        let reader = ModbusReader::new(
            controller.host.clone(),
            controller.port,
            controller.unit_id,
            config.request_timeout(),
            controller.keep_connection,
        );

        let id = controller.device.identifier.0.clone();
        controllers.insert(id.clone(), controller);

        tokio::spawn(eventloop::classic_event_loop(
            id,
            config.poll_interval(),
            ClassicClient::new(controller.host.clone(), reader),
            tx.clone(),
            cancel.clone(),
        ));
    }

    drop(tx);

    loop {
        select! {
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                output.shutdown().await;
                break Ok(());
            },
            event = rx.recv() => match event {
                Some(eventloop::Message::Measurement(id, payload)) => {
                    let Some(controller) = controllers.get(&id) else {
                        continue;
                    };

                    if let Err(e) = output.publish(controller, &payload).await {
                        error!("{e:#}");
                    }
                },
                None => break Ok(()),
            },
        }
    }
}
