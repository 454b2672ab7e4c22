use mbgate_server::{Gateway, GatewayConfig, GatewayError, GatewayStats};
use mbgate_transport::ReadyNotifier;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::ServeArgs;
use crate::exit::{gateway_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = gateway_config(&args);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| gateway_error("runtime startup failed", GatewayError::Runtime(err)))?;

    let stats = runtime
        .block_on(serve(config))
        .map_err(|err| gateway_error("gateway failed", err))?;

    print_stats(&stats, format);
    Ok(SUCCESS)
}

fn gateway_config(args: &ServeArgs) -> GatewayConfig {
    let notify = args.daemon.then(|| match &args.notify_socket {
        Some(path) => ReadyNotifier::new(path.clone()),
        None => ReadyNotifier::from_env(),
    });

    GatewayConfig {
        bind_ip: args.bind,
        port: args.port,
        notify,
        ..GatewayConfig::new(args.regsize)
    }
}

async fn serve(config: GatewayConfig) -> mbgate_server::Result<GatewayStats> {
    let gateway = Gateway::bind(config)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(shutdown.clone()));

    gateway.serve(shutdown).await
}

async fn cancel_on_interrupt(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("interrupt received, shutting down");
                shutdown.cancel();
            }
            Err(err) => warn!(error = %err, "failed to listen for interrupt"),
        },
    }
}
